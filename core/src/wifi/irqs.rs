use super::{regs::Reg, WiFi};
use crate::host::Host;

proc_bitfield::bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Irqs(pub u16): Debug {
        pub rx_complete: bool @ 0,
        pub tx_complete: bool @ 1,
        pub rx_event_inc: bool @ 2,
        pub tx_error_inc: bool @ 3,
        pub rx_event_overflow: bool @ 4,
        pub tx_error_overflow: bool @ 5,
        pub rx_start: bool @ 6,
        pub tx_start: bool @ 7,
        pub tx_buf_count_expired: bool @ 8,
        pub rx_buf_count_expired: bool @ 9,
        pub rf_wakeup: bool @ 11,
        pub multiplay_cmd_done: bool @ 12,
        pub post_beacon: bool @ 13,
        pub beacon: bool @ 14,
        pub pre_beacon: bool @ 15,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Irq {
    RxComplete = 0,
    TxComplete = 1,
    TxBufCountExpired = 8,
    RfWakeup = 11,
    PostBeacon = 13,
    Beacon = 14,
    PreBeacon = 15,
}

impl Irq {
    #[inline]
    pub const fn mask(self) -> u16 {
        1 << self as u8
    }
}

impl WiFi {
    #[inline]
    pub fn irqs_requested(&self) -> Irqs {
        Irqs(self.regs.get(Reg::Irf))
    }

    #[inline]
    pub fn irqs_enabled(&self) -> Irqs {
        Irqs(self.regs.get(Reg::Ie))
    }

    /// Raises `irq` in the flag register; the host line is only requested if it's enabled.
    pub(crate) fn send_interrupt(&mut self, irq: Irq, host: &mut impl Host) {
        self.raise_irqs(irq.mask(), host);
    }

    /// Sets `bits` in the flag register, requesting the host line if any of them is enabled.
    pub(super) fn raise_irqs(&mut self, bits: u16, host: &mut impl Host) {
        self.regs.write(Reg::IrfSet, 0, 0xFFFF, bits);
        if self.regs.get(Reg::Ie) & bits != 0 {
            host.request_irq();
        }
    }

    /// Called after the enable register changes, since enabling an already-raised flag requests
    /// the line too.
    pub(super) fn update_irq_enable(&mut self, prev_enabled: u16, host: &mut impl Host) {
        let pending = self.regs.get(Reg::Irf);
        let newly_enabled = self.regs.get(Reg::Ie) & !prev_enabled;
        if pending & newly_enabled != 0 {
            host.request_irq();
        }
    }
}
