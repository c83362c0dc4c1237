use super::{regs::Reg, WiFi};
use crate::{bus::AccessType, host::Host};

/// Maps a halfword offset in the I/O window to the register (and array index) behind it.
pub fn reg_at(offset: u16) -> Option<(Reg, usize)> {
    let offset = offset & 0xFFE;
    let index = |base: u16| (offset - base) as usize >> 1;
    Some(match offset {
        0x000 => (Reg::Id, 0),
        0x006 => (Reg::ModeWep, 0),
        0x010 => (Reg::Irf, 0),
        0x012 => (Reg::Ie, 0),
        0x018..=0x01C => (Reg::Macaddr, index(0x018)),
        0x020..=0x024 => (Reg::Bssid, index(0x020)),
        0x02A => (Reg::AidFull, 0),
        0x030 => (Reg::Rxcnt, 0),
        0x03C => (Reg::Powerstate, 0),
        0x040 => (Reg::Powerforce, 0),

        0x050 => (Reg::RxbufBegin, 0),
        0x052 => (Reg::RxbufEnd, 0),
        0x054 => (Reg::RxbufWrcsr, 0),
        0x056 => (Reg::RxbufWrAddr, 0),
        0x058 => (Reg::RxbufRdAddr, 0),
        0x05A => (Reg::RxbufReadcsr, 0),
        0x05C => (Reg::RxbufCount, 0),
        0x060 => (Reg::RxbufRdData, 0),
        0x062 => (Reg::RxbufGap, 0),
        0x064 => (Reg::RxbufGapdisp, 0),

        0x068 => (Reg::TxbufWrAddr, 0),
        0x06C => (Reg::TxbufCount, 0),
        0x070 => (Reg::TxbufWrData, 0),
        0x074 => (Reg::TxbufGap, 0),
        0x076 => (Reg::TxbufGapdisp, 0),

        0x080 => (Reg::TxbufLoc, 4),
        0x08C => (Reg::BeaconInt, 0),
        0x090 => (Reg::TxbufLoc, 1),
        0x0A0 => (Reg::TxbufLoc, 0),
        0x0A4 => (Reg::TxbufLoc, 2),
        0x0A8 => (Reg::TxbufLoc, 3),
        0x0AC => (Reg::TxreqReset, 0),
        0x0AE => (Reg::TxreqSet, 0),
        0x0B0 => (Reg::TxreqRead, 0),
        0x0B8 => (Reg::TxStat, 0),

        0x0E8 => (Reg::UsCountcnt, 0),
        0x0EA => (Reg::UsComparecnt, 0),
        0x0F0..=0x0F6 => (Reg::UsCompare, index(0x0F0)),
        0x0F8..=0x0FE => (Reg::UsCount, index(0x0F8)),
        0x110 => (Reg::PreBeacon, 0),
        0x11C => (Reg::BeaconCount, 0),
        0x11E => (Reg::PostBeacon, 0),

        0x120 | 0x122 | 0x124 => (Reg::Config, index(0x120)),
        0x128 => (Reg::Config, 3),
        0x130 | 0x132 => (Reg::Config, 4 + index(0x130)),
        0x140..=0x14C => (Reg::Config, 6 + index(0x140)),
        0x150 => (Reg::Config, 13),
        0x154 => (Reg::Config, 14),

        0x158 => (Reg::BbCnt, 0),
        0x15A => (Reg::BbWrite, 0),
        0x15C => (Reg::BbRead, 0),
        0x15E => (Reg::BbBusy, 0),

        0x21C => (Reg::IrfSet, 0),

        _ => return None,
    })
}

impl WiFi {
    fn read_io<A: AccessType>(&mut self, addr: u16, host: &mut impl Host) -> u16 {
        if let Some((reg, index)) = reg_at(addr) {
            return self.read_reg::<A>(reg, index, host);
        }
        #[cfg(feature = "log")]
        if !A::IS_DEBUG {
            slog::warn!(self.logger, "Unknown read @ {:#05X}", addr & 0xFFF);
        }
        0
    }

    fn write_io<A: AccessType>(&mut self, addr: u16, mask: u16, value: u16, host: &mut impl Host) {
        if let Some((reg, index)) = reg_at(addr) {
            self.write_reg::<A>(reg, index, mask, value, host);
            return;
        }
        #[cfg(feature = "log")]
        if !A::IS_DEBUG {
            slog::warn!(
                self.logger,
                "Unknown write @ {:#05X}: {:#06X} & {:#06X}",
                addr & 0xFFF,
                value,
                mask
            );
        }
    }

    pub fn read_8<A: AccessType>(&mut self, addr: u16, host: &mut impl Host) -> u8 {
        (self.read_16::<A>(addr & !1, host) >> ((addr & 1) << 3)) as u8
    }

    pub fn read_16<A: AccessType>(&mut self, addr: u16, host: &mut impl Host) -> u16 {
        match addr >> 13 & 3 {
            0 | 3 => self.read_io::<A>(addr, host),
            2 => host.read_ram_16(addr & 0x1FFE),
            _ => 0,
        }
    }

    pub fn read_32<A: AccessType>(&mut self, addr: u16, host: &mut impl Host) -> u32 {
        let addr = addr & !3;
        self.read_16::<A>(addr, host) as u32 | (self.read_16::<A>(addr | 2, host) as u32) << 16
    }

    pub fn write_8<A: AccessType>(&mut self, addr: u16, value: u8, host: &mut impl Host) {
        let shift = (addr & 1) << 3;
        match addr >> 13 & 3 {
            0 | 3 => self.write_io::<A>(addr, 0xFF << shift, (value as u16) << shift, host),
            2 => {
                let addr = addr & 0x1FFE;
                let prev = host.read_ram_16(addr);
                host.write_ram_16(addr, (prev & !(0xFF << shift)) | (value as u16) << shift);
            }
            _ => {}
        }
    }

    pub fn write_16<A: AccessType>(&mut self, addr: u16, value: u16, host: &mut impl Host) {
        match addr >> 13 & 3 {
            0 | 3 => self.write_io::<A>(addr, 0xFFFF, value, host),
            2 => host.write_ram_16(addr & 0x1FFE, value),
            _ => {}
        }
    }

    pub fn write_32<A: AccessType>(&mut self, addr: u16, value: u32, host: &mut impl Host) {
        let addr = addr & !3;
        self.write_16::<A>(addr, value as u16, host);
        self.write_16::<A>(addr | 2, (value >> 16) as u16, host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bus::{CpuAccess, DebugAccess},
        wifi::{test_host::TestHost, Builder},
    };

    #[test]
    fn config_offsets_cover_every_index() {
        let mut seen = [false; 15];
        for offset in (0x120..0x158).step_by(2) {
            if let Some((Reg::Config, index)) = reg_at(offset) {
                assert!(!seen[index], "CONFIG[{index}] mapped twice");
                seen[index] = true;
            }
        }
        assert_eq!(seen, [true; 15]);
        assert_eq!(reg_at(0x0A4), Some((Reg::TxbufLoc, 2)));
        assert_eq!(reg_at(0x0FF), Some((Reg::UsCount, 3)));
        assert_eq!(reg_at(0x002), None);
    }

    #[test]
    fn io_and_ram_regions() {
        let mut host = TestHost::new();
        let mut wifi = Builder::new().build_for_tests();
        assert_eq!(wifi.read_16::<CpuAccess>(0x0000, &mut host), 0x1440);
        assert_eq!(wifi.read_16::<CpuAccess>(0x7000, &mut host), 0x1440);
        assert_eq!(wifi.read_16::<CpuAccess>(0x2000, &mut host), 0);

        wifi.write_16::<CpuAccess>(0x4010, 0xBEEF, &mut host);
        assert_eq!(host.ram.read_le(0x0010), 0xBEEF);
        wifi.write_8::<CpuAccess>(0x4011, 0x12, &mut host);
        assert_eq!(wifi.read_16::<CpuAccess>(0x4010, &mut host), 0x12EF);
        assert_eq!(wifi.read_8::<CpuAccess>(0x4010, &mut host), 0xEF);
    }

    #[test]
    fn byte_writes_only_touch_their_half() {
        let mut host = TestHost::new();
        let mut wifi = Builder::new().build_for_tests();
        wifi.write_16::<CpuAccess>(0x01A, 0x1234, &mut host);
        wifi.write_8::<CpuAccess>(0x01B, 0xAB, &mut host);
        assert_eq!(wifi.regs().get_at(Reg::Macaddr, 1), 0xAB34);
        assert_eq!(wifi.read_8::<CpuAccess>(0x01A, &mut host), 0x34);
    }

    #[test]
    fn word_access_splits_into_halfwords() {
        let mut host = TestHost::new();
        let mut wifi = Builder::new().build_for_tests();
        wifi.write_32::<CpuAccess>(0x0AC, 0x0005_0000, &mut host);
        assert_eq!(wifi.read_16::<CpuAccess>(0x0B0, &mut host), 0x0015);
        wifi.write_32::<CpuAccess>(0x0AC, 0x0000_0001, &mut host);
        assert_eq!(wifi.read_32::<CpuAccess>(0x0B0, &mut host), 0x0014);
    }

    #[test]
    fn debug_reads_of_rx_data_do_not_consume() {
        let mut host = TestHost::new();
        let mut wifi = Builder::new().build_for_tests();
        host.ram.write_le(0x0000, 0x5555);
        wifi.write_16::<CpuAccess>(0x05C, 1, &mut host);
        assert_eq!(wifi.read_16::<DebugAccess>(0x060, &mut host), 0x5555);
        assert_eq!(wifi.read_16::<CpuAccess>(0x05C, &mut host), 1);
        assert_eq!(wifi.read_16::<CpuAccess>(0x060, &mut host), 0x5555);
        assert_eq!(wifi.read_16::<CpuAccess>(0x05C, &mut host), 0);
    }
}
