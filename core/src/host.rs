//! The boundary between a controller and the emulated console that owns it.

/// Size of the buffer memory region the controller's cursors index into.
pub const RAM_SIZE: usize = 0x2000;
pub const RAM_MASK: u16 = RAM_SIZE as u16 - 1;

/// Services the owning console provides to its controller.
///
/// All RAM offsets are byte offsets into the 8 KiB buffer region; the controller always passes
/// halfword-aligned offsets already masked to the region size.
pub trait Host {
    fn read_ram_16(&mut self, addr: u16) -> u16;
    fn write_ram_16(&mut self, addr: u16, value: u16);

    /// Asserts the controller's interrupt line in the console's interrupt controller.
    fn request_irq(&mut self);

    /// Arms one call to [`WiFi::count_ms`](crate::WiFi::count_ms), one emulated millisecond from
    /// now.
    fn schedule_ms(&mut self);
}

/// A plain buffer memory region, for hosts that don't map it anywhere else.
#[derive(Clone)]
pub struct Ram(Box<[u8; RAM_SIZE]>);

impl Ram {
    pub fn new() -> Self {
        Ram(Box::new([0; RAM_SIZE]))
    }

    #[inline]
    pub fn read_le(&self, addr: u16) -> u16 {
        let addr = (addr & RAM_MASK & !1) as usize;
        u16::from_le_bytes([self.0[addr], self.0[addr | 1]])
    }

    #[inline]
    pub fn write_le(&mut self, addr: u16, value: u16) {
        let addr = (addr & RAM_MASK & !1) as usize;
        self.0[addr..addr + 2].copy_from_slice(&value.to_le_bytes());
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; RAM_SIZE] {
        &self.0
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8; RAM_SIZE] {
        &mut self.0
    }
}

impl Default for Ram {
    fn default() -> Self {
        Self::new()
    }
}
