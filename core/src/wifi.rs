mod bb;
mod buffers;
mod io;
mod irqs;
mod link;
mod regs;
mod timing;

pub use bb::{is_bb_index_writable, BbControl, BB_DIR_READ, BB_DIR_WRITE};
pub use buffers::{Window, RAM_HALFWORDS, RX_HEADER_HALFWORDS};
pub use io::reg_at;
pub use irqs::{Irq, Irqs};
pub use link::{ConnectError, Frame, FrameClass, Link, PeerHandle, PeerId, TxSlot};
pub use regs::{
    Desc, Policy, PowerForce, PowerState, ReadKind, Reg, RegFile, RxControl, TxRequests,
    TxSlotLoc, UsCompareControl, CONFIG_MASKS, CONFIG_RESETS, ID,
};

use crate::{
    bus::{AccessType, CpuAccess},
    host::Host,
};
use crossbeam_channel::Receiver;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreationError {
    ZeroInboxCapacity,
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Builder {
    /// Preloaded into `W_MACADDR`, as the firmware would.
    pub mac_addr: [u8; 6],
    /// Drop non-beacon unicast frames that aren't addressed to this instance.
    pub address_filtering: bool,
    /// Frames that can be waiting for this instance's next tick before further ones are lost.
    pub inbox_capacity: usize,
}

impl Builder {
    #[inline]
    pub fn new() -> Self {
        Builder {
            mac_addr: [0; 6],
            address_filtering: true,
            inbox_capacity: 64,
        }
    }

    /// # Errors
    /// - [`CreationError::ZeroInboxCapacity`]: `inbox_capacity` is 0, so no frame could ever be
    ///   received.
    pub fn build(
        self,
        #[cfg(feature = "log")] logger: &slog::Logger,
    ) -> Result<WiFi, CreationError> {
        if self.inbox_capacity == 0 {
            return Err(CreationError::ZeroInboxCapacity);
        }
        let (link, inbox) = Link::new(
            self.inbox_capacity,
            #[cfg(feature = "log")]
            logger.new(slog::o!("link" => "")),
        );
        let mut regs = RegFile::new();
        for (i, bytes) in self.mac_addr.chunks_exact(2).enumerate() {
            regs.set_at(Reg::Macaddr, i, u16::from_le_bytes([bytes[0], bytes[1]]));
        }
        Ok(WiFi {
            #[cfg(feature = "log")]
            logger: logger.clone(),
            regs,
            bb_control: BbControl(0),
            link: Arc::new(link),
            inbox,
            address_filtering: self.address_filtering,
            scheduled: false,
        })
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

/// One emulated wireless controller.
///
/// Everything except the [`Link`] is private to the console that owns the instance; the link is
/// the part peers and the host environment share.
pub struct WiFi {
    #[cfg(feature = "log")]
    logger: slog::Logger,
    regs: RegFile,
    bb_control: BbControl,
    link: Arc<Link>,
    inbox: Receiver<Frame>,
    address_filtering: bool,
    scheduled: bool,
}

impl WiFi {
    #[inline]
    pub fn regs(&self) -> &RegFile {
        &self.regs
    }

    #[inline]
    pub fn link(&self) -> &Arc<Link> {
        &self.link
    }

    #[inline]
    pub fn scheduled(&self) -> bool {
        self.scheduled
    }

    #[inline]
    pub fn read(&mut self, reg: Reg, index: usize, host: &mut impl Host) -> u16 {
        self.read_reg::<CpuAccess>(reg, index, host)
    }

    #[inline]
    pub fn write(&mut self, reg: Reg, index: usize, mask: u16, value: u16, host: &mut impl Host) {
        self.write_reg::<CpuAccess>(reg, index, mask, value, host);
    }

    pub(crate) fn read_reg<A: AccessType>(
        &mut self,
        reg: Reg,
        index: usize,
        host: &mut impl Host,
    ) -> u16 {
        let desc = reg.desc();
        assert!(
            index < desc.len,
            "{reg:?} index {index} out of range (len {})",
            desc.len
        );
        match desc.read {
            ReadKind::Stored => self.regs.get_at(reg, index),
            ReadKind::Derived => match reg {
                Reg::Id => ID,
                Reg::RxbufWrcsr => self.rx_write_cursor(),
                _ => 0,
            },
            ReadKind::Port => self.read_rx_data::<A>(host),
            ReadKind::WriteOnly => 0,
        }
    }

    pub(crate) fn write_reg<A: AccessType>(
        &mut self,
        reg: Reg,
        index: usize,
        mask: u16,
        value: u16,
        host: &mut impl Host,
    ) {
        let desc = reg.desc();
        assert!(
            index < desc.len,
            "{reg:?} index {index} out of range (len {})",
            desc.len
        );
        if desc.policy == Policy::ReadOnly {
            #[cfg(feature = "log")]
            if !A::IS_DEBUG {
                slog::warn!(
                    self.logger,
                    "Write to read-only register {:?}[{}]: {:#06X} & {:#06X}",
                    reg,
                    index,
                    value,
                    mask
                );
            }
            return;
        }

        match reg {
            Reg::Ie => {
                let prev_enabled = self.regs.get(Reg::Ie);
                self.regs.write(reg, index, mask, value);
                self.update_irq_enable(prev_enabled, host);
            }

            Reg::Rxcnt => {
                self.regs.write(reg, index, mask, value);
                if RxControl(value & mask).latch_write_addr() {
                    self.latch_rx_write_addr();
                }
            }

            Reg::Powerstate => {
                self.regs.write(reg, index, mask, value);
                if PowerState(value & mask).request_sleep() {
                    let state = self
                        .regs
                        .power_state()
                        .with_request_sleep(false)
                        .with_asleep(true);
                    self.regs.set(Reg::Powerstate, state.0);
                }
            }

            Reg::Powerforce => {
                self.regs.write(reg, index, mask, value);
                self.apply_power_force(host);
            }

            Reg::TxbufWrData => self.write_tx_data(value & mask, host),

            Reg::TxbufLoc => {
                self.regs.write(reg, index, mask, value);
                if index != TxSlot::Beacon.index() {
                    self.transfer_requested(host);
                }
            }

            Reg::BeaconInt => {
                self.regs.write(reg, index, mask, value);
                let interval = self.regs.get(Reg::BeaconInt);
                self.regs.set(Reg::BeaconCount, interval);
            }

            Reg::TxreqSet => {
                self.regs.write(reg, index, mask, value);
                self.transfer_requested(host);
            }

            Reg::UsCountcnt => {
                self.regs.write(reg, index, mask, value);
                if self.should_schedule() {
                    self.schedule_init(host);
                }
            }

            Reg::UsComparecnt => {
                self.regs.write(reg, index, mask, value);
                if UsCompareControl(value & mask).force_beacon_irq() {
                    self.send_interrupt(Irq::Beacon, host);
                }
            }

            Reg::BbCnt => {
                let control = BbControl((self.bb_control.0 & !mask) | (value & mask));
                // Transfers start on the direction byte
                if mask & 0xFF00 != 0 {
                    self.write_bb_control(control);
                } else {
                    self.bb_control = control;
                }
            }

            Reg::BbWrite => self.write_bb_data(mask, value),

            Reg::IrfSet => self.raise_irqs(value & mask, host),

            _ => {
                self.regs.write(reg, index, mask, value);
            }
        }
    }

    /// Applies `W_POWERFORCE` if its apply bit is set; coming out of forced sleep raises the
    /// wakeup interrupt.
    fn apply_power_force(&mut self, host: &mut impl Host) {
        let force = PowerForce(self.regs.get(Reg::Powerforce));
        if !force.apply() {
            return;
        }
        let state = self.regs.power_state();
        let was_asleep = state.asleep();
        self.regs
            .set(Reg::Powerstate, state.with_asleep(force.sleep()).0);
        if was_asleep && !force.sleep() {
            self.send_interrupt(Irq::RfWakeup, host);
        }
    }
}

#[cfg(test)]
impl Builder {
    pub(crate) fn build_for_tests(self) -> WiFi {
        self.build(
            #[cfg(feature = "log")]
            &slog::Logger::root(slog::Discard, slog::o!()),
        )
        .unwrap()
    }
}
