use super::{irqs::Irq, link::Frame, regs::Reg, WiFi};
use crate::{bus::AccessType, host::Host};

/// Halfwords in the buffer region.
pub const RAM_HALFWORDS: u16 = 0x1000;

/// Size of the header the hardware prepends to every received frame, in halfwords.
pub const RX_HEADER_HALFWORDS: u16 = 6;

/// A circular window over the buffer region. All fields are in halfword units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub begin: u16,
    pub end: u16,
    pub gap: u16,
    pub gap_disp: u16,
}

impl Window {
    #[inline]
    fn skip_gap(&self, addr: u16) -> u16 {
        if self.gap_disp != 0 && addr >= self.gap && addr < self.gap.wrapping_add(self.gap_disp) {
            self.gap.wrapping_add(self.gap_disp)
        } else {
            addr
        }
    }

    /// Returns the address following `addr`, skipping the gap and wrapping from `end` back to
    /// `begin`. An empty window only wraps at the end of the buffer region.
    pub fn advance(&self, addr: u16) -> u16 {
        let mut next = self.skip_gap(addr.wrapping_add(1));
        if self.end > self.begin && next >= self.end {
            next = self.skip_gap(self.begin + (next - self.end) % (self.end - self.begin));
        }
        next & (RAM_HALFWORDS - 1)
    }

    /// Number of halfwords the window can hold.
    #[inline]
    pub fn capacity(&self) -> u16 {
        self.end.saturating_sub(self.begin)
    }
}

impl WiFi {
    pub fn rx_window(&self) -> Window {
        Window {
            begin: (self.regs.get(Reg::RxbufBegin) & 0x1FFE) >> 1,
            end: (self.regs.get(Reg::RxbufEnd) & 0x1FFE) >> 1,
            gap: self.regs.get(Reg::RxbufGap) >> 1,
            gap_disp: self.regs.get(Reg::RxbufGapdisp),
        }
    }

    pub fn tx_window(&self) -> Window {
        Window {
            begin: 0,
            end: RAM_HALFWORDS,
            gap: self.regs.get(Reg::TxbufGap) >> 1,
            gap_disp: self.regs.get(Reg::TxbufGapdisp),
        }
    }

    /// The halfword address incoming frames are written to. The register stores it as a byte
    /// offset; reads of it report halfwords.
    #[inline]
    pub fn rx_write_cursor(&self) -> u16 {
        self.regs.get(Reg::RxbufWrcsr) >> 1
    }

    #[inline]
    fn set_rx_write_cursor(&mut self, addr: u16) {
        self.regs.set(Reg::RxbufWrcsr, addr << 1);
    }

    /// Copies the write address into the write cursor, as done by setting `W_RXCNT` bit 0.
    pub(super) fn latch_rx_write_addr(&mut self) {
        let addr = self.regs.get(Reg::RxbufWrAddr);
        self.set_rx_write_cursor(addr);
    }

    /// Serves a read of `W_RXBUF_RD_DATA`: returns the halfword under the read cursor and, except
    /// for debug reads, advances the cursor and consumes one unit of the RX count.
    ///
    /// This is the only register read with side effects.
    pub(super) fn read_rx_data<A: AccessType>(&mut self, host: &mut impl Host) -> u16 {
        let addr = self.regs.get(Reg::RxbufReadcsr);
        let value = host.read_ram_16(addr << 1);
        if !A::IS_DEBUG {
            let next = self.rx_window().advance(addr);
            self.regs.set(Reg::RxbufReadcsr, next);
            let count = self.regs.get(Reg::RxbufCount);
            self.regs.set(Reg::RxbufCount, count.saturating_sub(1));
        }
        value
    }

    /// Stores a halfword written to `W_TXBUF_WR_DATA` and advances the TX write address, raising
    /// the count-expired interrupt once the programmed number of halfwords has been written.
    pub(super) fn write_tx_data(&mut self, value: u16, host: &mut impl Host) {
        let addr = self.regs.get(Reg::TxbufWrAddr) >> 1;
        host.write_ram_16(addr << 1, value);
        let next = self.tx_window().advance(addr);
        self.regs.set(Reg::TxbufWrAddr, next << 1);

        let count = self.regs.get(Reg::TxbufCount);
        if count != 0 {
            self.regs.set(Reg::TxbufCount, count - 1);
            if count == 1 {
                self.send_interrupt(Irq::TxBufCountExpired, host);
            }
        }
    }

    /// Whether this instance would accept `frame` at all, before looking at buffer space.
    fn accepts(&self, frame: &Frame) -> bool {
        if !self.regs.rx_control().enabled() {
            return false;
        }
        if !self.address_filtering || frame.class.is_beacon() {
            return true;
        }
        match frame.dest() {
            Some(dest) => dest[0] & 1 != 0 || dest == self.regs.mac_addr(),
            None => true,
        }
    }

    /// Writes a received frame into the RX window behind its RX header, then pads the write cursor
    /// to a word boundary.
    ///
    /// Returns `false` if the frame was dropped, because receiving is disabled, it's addressed to
    /// someone else, or the window doesn't have room for it next to the unread data.
    pub(super) fn receive_frame(&mut self, frame: &Frame, host: &mut impl Host) -> bool {
        if !self.accepts(frame) {
            #[cfg(feature = "log")]
            slog::trace!(self.logger, "Dropped frame from peer {}: filtered", frame.src.0);
            return false;
        }

        let window = self.rx_window();
        let units = frame.rx_units();
        let count = self.regs.get(Reg::RxbufCount);
        if count as u32 + units as u32 > window.capacity() as u32 {
            #[cfg(feature = "log")]
            slog::trace!(
                self.logger,
                "Dropped frame from peer {}: RX window full ({} + {} > {})",
                frame.src.0,
                count,
                units,
                window.capacity()
            );
            return false;
        }

        let header = frame.rx_header();
        let mut addr = self.rx_write_cursor();
        for &value in header.iter().chain(frame.data.iter()) {
            host.write_ram_16(addr << 1, value);
            addr = window.advance(addr);
        }
        if (RX_HEADER_HALFWORDS + frame.data.len() as u16) & 1 != 0 {
            addr = window.advance(addr);
        }
        self.set_rx_write_cursor(addr);
        self.regs.set(Reg::RxbufCount, count + units);
        self.send_interrupt(Irq::RxComplete, host);
        true
    }
}
