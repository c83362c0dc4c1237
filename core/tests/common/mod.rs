#![allow(dead_code)]

use dust_wifi::{
    host::{Host, Ram},
    wifi::{Builder, Irq, Reg},
    WiFi,
};

#[derive(Default)]
pub struct TestHost {
    pub ram: Ram,
    pub irq_requests: u32,
    pub schedule_requests: u32,
}

impl Host for TestHost {
    fn read_ram_16(&mut self, addr: u16) -> u16 {
        self.ram.read_le(addr)
    }

    fn write_ram_16(&mut self, addr: u16, value: u16) {
        self.ram.write_le(addr, value);
    }

    fn request_irq(&mut self) {
        self.irq_requests += 1;
    }

    fn schedule_ms(&mut self) {
        self.schedule_requests += 1;
    }
}

pub struct Console {
    pub wifi: WiFi,
    pub host: TestHost,
}

/// RX window used by every console: bytes 0xC00..0x1000 of the buffer region.
pub const RX_BEGIN: u16 = 0x4C00;
pub const RX_END: u16 = 0x5000;
pub const RX_BEGIN_HALFWORDS: u16 = 0x600;
pub const RX_CAPACITY: u16 = 0x200;

pub fn build(builder: Builder) -> WiFi {
    builder
        .build(
            #[cfg(feature = "log")]
            &slog::Logger::root(slog::Discard, slog::o!()),
        )
        .unwrap()
}

impl Console {
    pub fn new(mac_addr: [u8; 6]) -> Self {
        Self::with_builder(Builder {
            mac_addr,
            ..Builder::new()
        })
    }

    pub fn with_builder(builder: Builder) -> Self {
        let mut console = Console {
            wifi: build(builder),
            host: TestHost::default(),
        };
        console.write(Reg::RxbufBegin, 0, RX_BEGIN);
        console.write(Reg::RxbufEnd, 0, RX_END);
        console.write(Reg::RxbufWrAddr, 0, RX_BEGIN_HALFWORDS);
        console.write(Reg::RxbufReadcsr, 0, RX_BEGIN_HALFWORDS);
        console.write(Reg::Rxcnt, 0, 0x8001);
        console.write(Reg::Ie, 0, Irq::RxComplete.mask());
        console
    }

    pub fn read(&mut self, reg: Reg, index: usize) -> u16 {
        self.wifi.read(reg, index, &mut self.host)
    }

    pub fn write(&mut self, reg: Reg, index: usize, value: u16) {
        self.wifi.write(reg, index, 0xFFFF, value, &mut self.host);
    }

    /// Places a TX description for `frame` at halfword `addr` and points `slot_index` at it.
    pub fn load_tx_slot(&mut self, slot_index: usize, addr: u16, rate: u16, frame: &[u16]) {
        let base = addr << 1;
        self.host.ram.write_le(base + 0x8, rate);
        self.host
            .ram
            .write_le(base + 0xA, frame.len() as u16 * 2 + 4);
        for (i, &value) in frame.iter().enumerate() {
            self.host.ram.write_le(base + 0xC + i as u16 * 2, value);
        }
        self.write(Reg::TxbufLoc, slot_index, 0x8000 | addr);
    }

    pub fn rx_halfwords(&self, len: u16) -> Vec<u16> {
        (0..len)
            .map(|i| self.host.ram.read_le((RX_BEGIN_HALFWORDS + i) << 1))
            .collect()
    }

    pub fn connect(&mut self, other: &mut Console) {
        self.wifi.add_connection(other.wifi.handle()).unwrap();
        other.wifi.add_connection(self.wifi.handle()).unwrap();
    }
}

/// A data frame with the given destination address.
pub fn data_frame(dest: [u16; 3], payload: u16) -> Vec<u16> {
    vec![0x0008, 0x0000, dest[0], dest[1], dest[2], payload]
}

pub const BROADCAST: [u16; 3] = [0xFFFF; 3];
