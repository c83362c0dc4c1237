use super::{regs::Reg, WiFi};

proc_bitfield::bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct BbControl(pub u16): Debug {
        pub index: u8 @ 0..=7,
        pub direction: u8 @ 12..=15,
    }
}

pub const BB_DIR_WRITE: u8 = 5;
pub const BB_DIR_READ: u8 = 6;

#[inline]
pub const fn is_bb_index_writable(index: u8) -> bool {
    matches!(
        index,
        0x01..=0x0C
            | 0x13..=0x15
            | 0x1B..=0x26
            | 0x28..=0x4C
            | 0x4E..=0x5C
            | 0x62
            | 0x63
            | 0x65
            | 0x67
            | 0x68
    )
}

impl WiFi {
    #[inline]
    pub fn bb_control(&self) -> BbControl {
        self.bb_control
    }

    fn store_bb(&mut self, index: u8) {
        if is_bb_index_writable(index) {
            let value = self.regs.get(Reg::BbWrite) as u8;
            self.regs.bb_mut()[index as usize] = value;
        } else {
            #[cfg(feature = "log")]
            slog::warn!(self.logger, "Write to read-only BB register {:#04X}", index);
        }
    }

    /// Latches a new baseband address and direction. A write transfers the current data latch
    /// immediately, a read refreshes the read port.
    pub(super) fn write_bb_control(&mut self, value: BbControl) {
        self.bb_control = value;
        let index = value.index();
        match value.direction() {
            BB_DIR_WRITE => self.store_bb(index),
            BB_DIR_READ => {
                let value = self.regs.bb()[index as usize];
                self.regs.set(Reg::BbRead, value as u16);
            }
            _ => {
                #[cfg(feature = "log")]
                slog::warn!(
                    self.logger,
                    "Unknown BB transfer direction {:#X}",
                    value.direction()
                );
            }
        }
    }

    /// Data written after a write-direction control word goes straight to the latched address.
    pub(super) fn write_bb_data(&mut self, mask: u16, value: u16) {
        self.regs.write(Reg::BbWrite, 0, mask, value);
        if self.bb_control.direction() == BB_DIR_WRITE {
            self.store_bb(self.bb_control.index());
        }
    }
}
