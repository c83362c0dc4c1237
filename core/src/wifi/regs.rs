use bitflags::bitflags;

/// Hardware-visible registers, identified independently of their I/O address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Reg {
    Id,
    ModeWep,
    Irf,
    Ie,
    Macaddr,
    Bssid,
    AidFull,
    Rxcnt,
    Powerstate,
    Powerforce,
    RxbufBegin,
    RxbufEnd,
    RxbufWrcsr,
    RxbufWrAddr,
    RxbufRdAddr,
    RxbufReadcsr,
    RxbufCount,
    RxbufRdData,
    RxbufGap,
    RxbufGapdisp,
    TxbufWrAddr,
    TxbufCount,
    TxbufWrData,
    TxbufGap,
    TxbufGapdisp,
    TxbufLoc,
    BeaconInt,
    TxreqReset,
    TxreqSet,
    TxreqRead,
    TxStat,
    UsCountcnt,
    UsComparecnt,
    UsCompare,
    UsCount,
    PreBeacon,
    BeaconCount,
    PostBeacon,
    Config,
    BbCnt,
    BbWrite,
    BbRead,
    BbBusy,
    IrfSet,
}

/// How a write reaches the register's backing storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Policy {
    /// Writes are dropped.
    ReadOnly,
    /// `cur = (cur & !m) | (value & m)`
    Masked,
    /// `cur |= value & m`
    Set,
    /// `cur &= !(value & m)`
    Clear,
    /// Not stored; the write only triggers an action.
    Strobe,
    /// Routed to the baseband bridge.
    Indirect,
}

/// How a read is served.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadKind {
    Stored,
    /// Computed from stored state without side effects.
    Derived,
    /// Reading consumes data; debug reads only peek.
    Port,
    /// Reads as zero.
    WriteOnly,
}

#[derive(Clone, Copy, Debug)]
pub struct Desc {
    pub len: usize,
    pub storage: Option<usize>,
    pub policy: Policy,
    pub read: ReadKind,
    writable: &'static [u16],
    reset: &'static [u16],
}

impl Desc {
    const fn new(
        len: usize,
        storage: Option<usize>,
        policy: Policy,
        read: ReadKind,
        writable: &'static [u16],
        reset: &'static [u16],
    ) -> Self {
        Desc {
            len,
            storage,
            policy,
            read,
            writable,
            reset,
        }
    }

    #[inline]
    pub fn writable(&self, index: usize) -> u16 {
        self.writable[if self.writable.len() == 1 { 0 } else { index }]
    }

    #[inline]
    pub fn reset(&self, index: usize) -> u16 {
        self.reset[if self.reset.len() == 1 { 0 } else { index }]
    }
}

pub const ID: u16 = 0x1440;

pub const CONFIG_RESETS: [u16; 15] = [
    0x0048, 0x4840, 0x0000, 0x0000, 0x0142, 0x8064, 0x0000, 0x2443, 0x0042, 0x0016, 0x0016, 0x0016,
    0x162C, 0x0204, 0x0058,
];

pub const CONFIG_MASKS: [u16; 15] = [
    0x81FF, 0xFFFF, 0xFFFF, 0xFFFF, 0x0FFF, 0x8FFF, 0xFFFF, 0xFFFF, 0x00FF, 0x00FF, 0x00FF, 0x00FF,
    0xFFFF, 0xFF3F, 0x7A7F,
];

mod slot {
    pub const MODE_WEP: usize = 0;
    pub const IRF: usize = 1;
    pub const IE: usize = 2;
    pub const MACADDR: usize = 3;
    pub const BSSID: usize = 6;
    pub const AID_FULL: usize = 9;
    pub const RXCNT: usize = 10;
    pub const POWERSTATE: usize = 11;
    pub const POWERFORCE: usize = 12;
    pub const RXBUF_BEGIN: usize = 13;
    pub const RXBUF_END: usize = 14;
    pub const RXBUF_WRCSR: usize = 15;
    pub const RXBUF_WR_ADDR: usize = 16;
    pub const RXBUF_RD_ADDR: usize = 17;
    pub const RXBUF_READCSR: usize = 18;
    pub const RXBUF_COUNT: usize = 19;
    pub const RXBUF_GAP: usize = 20;
    pub const RXBUF_GAPDISP: usize = 21;
    pub const TXBUF_WR_ADDR: usize = 22;
    pub const TXBUF_COUNT: usize = 23;
    pub const TXBUF_GAP: usize = 24;
    pub const TXBUF_GAPDISP: usize = 25;
    pub const TXBUF_LOC: usize = 26;
    pub const BEACON_INT: usize = 31;
    pub const TXREQ: usize = 32;
    pub const TXSTAT: usize = 33;
    pub const US_COUNTCNT: usize = 34;
    pub const US_COMPARECNT: usize = 35;
    pub const US_COMPARE: usize = 36;
    pub const US_COUNT: usize = 40;
    pub const PRE_BEACON: usize = 44;
    pub const BEACON_COUNT: usize = 45;
    pub const POST_BEACON: usize = 46;
    pub const CONFIG: usize = 47;
    pub const BB_WRITE: usize = 62;
    pub const BB_READ: usize = 63;
    pub const LEN: usize = 64;
}

impl Reg {
    pub const ALL: [Reg; 44] = [
        Reg::Id,
        Reg::ModeWep,
        Reg::Irf,
        Reg::Ie,
        Reg::Macaddr,
        Reg::Bssid,
        Reg::AidFull,
        Reg::Rxcnt,
        Reg::Powerstate,
        Reg::Powerforce,
        Reg::RxbufBegin,
        Reg::RxbufEnd,
        Reg::RxbufWrcsr,
        Reg::RxbufWrAddr,
        Reg::RxbufRdAddr,
        Reg::RxbufReadcsr,
        Reg::RxbufCount,
        Reg::RxbufRdData,
        Reg::RxbufGap,
        Reg::RxbufGapdisp,
        Reg::TxbufWrAddr,
        Reg::TxbufCount,
        Reg::TxbufWrData,
        Reg::TxbufGap,
        Reg::TxbufGapdisp,
        Reg::TxbufLoc,
        Reg::BeaconInt,
        Reg::TxreqReset,
        Reg::TxreqSet,
        Reg::TxreqRead,
        Reg::TxStat,
        Reg::UsCountcnt,
        Reg::UsComparecnt,
        Reg::UsCompare,
        Reg::UsCount,
        Reg::PreBeacon,
        Reg::BeaconCount,
        Reg::PostBeacon,
        Reg::Config,
        Reg::BbCnt,
        Reg::BbWrite,
        Reg::BbRead,
        Reg::BbBusy,
        Reg::IrfSet,
    ];

    #[allow(clippy::match_same_arms)]
    pub const fn desc(self) -> Desc {
        use Policy::*;
        use ReadKind::*;
        const ALL: &[u16] = &[0xFFFF];
        const NONE: &[u16] = &[0];
        const ZERO: &[u16] = &[0];
        match self {
            Reg::Id => Desc::new(1, None, ReadOnly, Derived, NONE, &[ID]),
            Reg::ModeWep => Desc::new(1, Some(slot::MODE_WEP), Masked, Stored, &[0x007F], ZERO),
            Reg::Irf => Desc::new(1, Some(slot::IRF), Clear, Stored, ALL, ZERO),
            Reg::Ie => Desc::new(1, Some(slot::IE), Masked, Stored, &[0xFBFF], ZERO),
            Reg::Macaddr => Desc::new(3, Some(slot::MACADDR), Masked, Stored, ALL, ZERO),
            Reg::Bssid => Desc::new(3, Some(slot::BSSID), Masked, Stored, ALL, ZERO),
            Reg::AidFull => Desc::new(1, Some(slot::AID_FULL), Masked, Stored, &[0x07FF], ZERO),
            Reg::Rxcnt => Desc::new(1, Some(slot::RXCNT), Masked, Stored, &[0xFF0E], ZERO),
            Reg::Powerstate => Desc::new(
                1,
                Some(slot::POWERSTATE),
                Masked,
                Stored,
                &[0x0003],
                &[0x0200],
            ),
            Reg::Powerforce => {
                Desc::new(1, Some(slot::POWERFORCE), Masked, Stored, &[0x8001], ZERO)
            }
            Reg::RxbufBegin => Desc::new(1, Some(slot::RXBUF_BEGIN), Masked, Stored, ALL, ZERO),
            Reg::RxbufEnd => Desc::new(1, Some(slot::RXBUF_END), Masked, Stored, ALL, ZERO),
            Reg::RxbufWrcsr => Desc::new(1, Some(slot::RXBUF_WRCSR), ReadOnly, Derived, NONE, ZERO),
            Reg::RxbufWrAddr => {
                Desc::new(1, Some(slot::RXBUF_WR_ADDR), Masked, Stored, &[0x0FFF], ZERO)
            }
            Reg::RxbufRdAddr => {
                Desc::new(1, Some(slot::RXBUF_RD_ADDR), Masked, Stored, &[0x1FFE], ZERO)
            }
            Reg::RxbufReadcsr => {
                Desc::new(1, Some(slot::RXBUF_READCSR), Masked, Stored, &[0x0FFF], ZERO)
            }
            Reg::RxbufCount => {
                Desc::new(1, Some(slot::RXBUF_COUNT), Masked, Stored, &[0x0FFF], ZERO)
            }
            Reg::RxbufRdData => Desc::new(1, None, ReadOnly, Port, NONE, ZERO),
            Reg::RxbufGap => Desc::new(1, Some(slot::RXBUF_GAP), Masked, Stored, &[0x1FFE], ZERO),
            Reg::RxbufGapdisp => {
                Desc::new(1, Some(slot::RXBUF_GAPDISP), Masked, Stored, &[0x0FFF], ZERO)
            }
            Reg::TxbufWrAddr => {
                Desc::new(1, Some(slot::TXBUF_WR_ADDR), Masked, Stored, &[0x1FFE], ZERO)
            }
            Reg::TxbufCount => {
                Desc::new(1, Some(slot::TXBUF_COUNT), Masked, Stored, &[0x0FFF], ZERO)
            }
            Reg::TxbufWrData => Desc::new(1, None, Strobe, WriteOnly, ALL, ZERO),
            Reg::TxbufGap => Desc::new(1, Some(slot::TXBUF_GAP), Masked, Stored, &[0x1FFE], ZERO),
            Reg::TxbufGapdisp => {
                Desc::new(1, Some(slot::TXBUF_GAPDISP), Masked, Stored, &[0x0FFF], ZERO)
            }
            Reg::TxbufLoc => Desc::new(5, Some(slot::TXBUF_LOC), Masked, Stored, ALL, ZERO),
            Reg::BeaconInt => Desc::new(1, Some(slot::BEACON_INT), Masked, Stored, &[0x03FF], ZERO),
            Reg::TxreqReset => Desc::new(1, Some(slot::TXREQ), Clear, WriteOnly, &[0x000F], ZERO),
            Reg::TxreqSet => Desc::new(1, Some(slot::TXREQ), Set, WriteOnly, &[0x000F], ZERO),
            Reg::TxreqRead => Desc::new(1, Some(slot::TXREQ), ReadOnly, Stored, NONE, &[0x0010]),
            Reg::TxStat => Desc::new(1, Some(slot::TXSTAT), ReadOnly, Stored, NONE, ZERO),
            Reg::UsCountcnt => {
                Desc::new(1, Some(slot::US_COUNTCNT), Masked, Stored, &[0x0001], ZERO)
            }
            Reg::UsComparecnt => {
                Desc::new(1, Some(slot::US_COMPARECNT), Masked, Stored, &[0x0001], ZERO)
            }
            Reg::UsCompare => Desc::new(
                4,
                Some(slot::US_COMPARE),
                Masked,
                Stored,
                &[0xFC00, 0xFFFF, 0xFFFF, 0xFFFF],
                ZERO,
            ),
            Reg::UsCount => Desc::new(
                4,
                Some(slot::US_COUNT),
                Masked,
                Stored,
                &[0xFFFF, 0xFFFF, 0xFFFF, 0x0000],
                ZERO,
            ),
            Reg::PreBeacon => Desc::new(1, Some(slot::PRE_BEACON), Masked, Stored, ALL, ZERO),
            Reg::BeaconCount => Desc::new(1, Some(slot::BEACON_COUNT), Masked, Stored, ALL, ZERO),
            Reg::PostBeacon => Desc::new(1, Some(slot::POST_BEACON), Masked, Stored, ALL, ZERO),
            Reg::Config => Desc::new(
                15,
                Some(slot::CONFIG),
                Masked,
                Stored,
                &CONFIG_MASKS,
                &CONFIG_RESETS,
            ),
            Reg::BbCnt => Desc::new(1, None, Indirect, WriteOnly, ALL, ZERO),
            Reg::BbWrite => Desc::new(1, Some(slot::BB_WRITE), Masked, WriteOnly, ALL, ZERO),
            Reg::BbRead => Desc::new(1, Some(slot::BB_READ), ReadOnly, Stored, NONE, ZERO),
            Reg::BbBusy => Desc::new(1, None, ReadOnly, Derived, NONE, ZERO),
            Reg::IrfSet => Desc::new(1, Some(slot::IRF), Set, WriteOnly, ALL, ZERO),
        }
    }

    /// Whether this register's storage is reset by its own descriptor rather than shared with
    /// (and reset through) another register.
    const fn owns_storage(self) -> bool {
        !matches!(self, Reg::TxreqReset | Reg::TxreqSet | Reg::IrfSet)
    }
}

proc_bitfield::bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct RxControl(pub u16): Debug {
        pub latch_write_addr: bool @ 0,
        pub enabled: bool @ 15,
    }
}

proc_bitfield::bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct PowerState(pub u16): Debug {
        pub request_sleep: bool @ 1,
        pub asleep: bool @ 9,
    }
}

proc_bitfield::bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct PowerForce(pub u16): Debug {
        pub sleep: bool @ 0,
        pub apply: bool @ 15,
    }
}

proc_bitfield::bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct TxSlotLoc(pub u16): Debug {
        pub addr: u16 @ 0..=11,
        pub enabled: bool @ 15,
    }
}

proc_bitfield::bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct UsCompareControl(pub u16): Debug {
        pub enabled: bool @ 0,
        pub force_beacon_irq: bool @ 1,
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct TxRequests: u16 {
        const LOC1 = 1 << 0;
        const CMD = 1 << 1;
        const LOC2 = 1 << 2;
        const LOC3 = 1 << 3;
        const UNKNOWN = 1 << 4;
    }
}

/// Register and baseband storage.
///
/// Writes through [`RegFile::write`] follow each register's [`Policy`]; the `set*` methods bypass
/// it and are how the controller updates state the program can only read.
#[derive(Clone)]
pub struct RegFile {
    values: [u16; slot::LEN],
    bb: [u8; 0x100],
}

impl RegFile {
    pub(crate) fn new() -> Self {
        let mut values = [0; slot::LEN];
        for reg in Reg::ALL {
            let desc = reg.desc();
            if let (Some(base), true) = (desc.storage, reg.owns_storage()) {
                for i in 0..desc.len {
                    values[base + i] = desc.reset(i);
                }
            }
        }

        let mut bb = [0; 0x100];
        bb[0x00] = 0x6D;
        bb[0x4D] = 0xBF;
        bb[0x5D] = 0x01;
        bb[0x64] = 0xFF;

        RegFile { values, bb }
    }

    fn slot(reg: Reg, index: usize) -> Option<usize> {
        let desc = reg.desc();
        assert!(
            index < desc.len,
            "{reg:?} index {index} out of range (len {})",
            desc.len
        );
        desc.storage.map(|base| base + index)
    }

    #[inline]
    pub fn get(&self, reg: Reg) -> u16 {
        self.get_at(reg, 0)
    }

    /// Returns the stored value, or 0 for registers without storage.
    #[inline]
    pub fn get_at(&self, reg: Reg, index: usize) -> u16 {
        Self::slot(reg, index).map_or(0, |i| self.values[i])
    }

    #[inline]
    pub(crate) fn set(&mut self, reg: Reg, value: u16) {
        self.set_at(reg, 0, value);
    }

    #[inline]
    pub(crate) fn set_at(&mut self, reg: Reg, index: usize, value: u16) {
        if let Some(i) = Self::slot(reg, index) {
            self.values[i] = value;
        }
    }

    /// Applies a program write and returns the bits that were actually written
    /// (`value & mask & writable`).
    pub(crate) fn write(&mut self, reg: Reg, index: usize, mask: u16, value: u16) -> u16 {
        let desc = reg.desc();
        let slot = Self::slot(reg, index);
        let bits = mask & desc.writable(index);
        let Some(i) = slot else {
            return value & bits;
        };
        let cur = &mut self.values[i];
        match desc.policy {
            Policy::ReadOnly => return 0,
            Policy::Masked => *cur = (*cur & !bits) | (value & bits),
            Policy::Set => *cur |= value & bits,
            Policy::Clear => *cur &= !(value & bits),
            Policy::Strobe | Policy::Indirect => {}
        }
        value & bits
    }

    #[inline]
    pub fn bb(&self) -> &[u8; 0x100] {
        &self.bb
    }

    #[inline]
    pub(crate) fn bb_mut(&mut self) -> &mut [u8; 0x100] {
        &mut self.bb
    }

    #[inline]
    pub fn rx_control(&self) -> RxControl {
        RxControl(self.get(Reg::Rxcnt))
    }

    #[inline]
    pub fn power_state(&self) -> PowerState {
        PowerState(self.get(Reg::Powerstate))
    }

    #[inline]
    pub fn tx_slot_loc(&self, slot: usize) -> TxSlotLoc {
        TxSlotLoc(self.get_at(Reg::TxbufLoc, slot))
    }

    #[inline]
    pub fn tx_requests(&self) -> TxRequests {
        TxRequests::from_bits_retain(self.get(Reg::TxreqRead))
    }

    #[inline]
    pub fn us_compare_control(&self) -> UsCompareControl {
        UsCompareControl(self.get(Reg::UsComparecnt))
    }

    #[inline]
    pub fn mac_addr(&self) -> [u16; 3] {
        [
            self.get_at(Reg::Macaddr, 0),
            self.get_at(Reg::Macaddr, 1),
            self.get_at(Reg::Macaddr, 2),
        ]
    }

    /// Reads a 4-halfword little-endian counter register as one value.
    pub(crate) fn get_wide(&self, reg: Reg) -> u64 {
        (0..4).rev().fold(0, |acc, i| acc << 16 | self.get_at(reg, i) as u64)
    }

    pub(crate) fn set_wide(&mut self, reg: Reg, value: u64) {
        for i in 0..4 {
            self.set_at(reg, i, (value >> (i * 16)) as u16 & reg.desc().writable(i));
        }
    }
}
