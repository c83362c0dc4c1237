use super::{irqs::Irq, link::TxSlot, regs::Reg, WiFi};
use crate::host::Host;

/// Microseconds per tick.
const US_PER_TICK: u64 = 1000;
const US_COUNT_MASK: u64 = (1 << 48) - 1;

impl WiFi {
    #[inline]
    fn us_counter_enabled(&self) -> bool {
        self.regs.get(Reg::UsCountcnt) & 1 != 0
    }

    /// Whether the host should arm another tick: something needs servicing and no tick is armed
    /// yet.
    #[inline]
    pub fn should_schedule(&self) -> bool {
        (self.link.has_peers() || self.us_counter_enabled()) && !self.scheduled
    }

    /// Arms the next tick, unless one is already armed.
    pub fn schedule_init(&mut self, host: &mut impl Host) {
        if self.scheduled {
            return;
        }
        self.scheduled = true;
        host.schedule_ms();
    }

    /// Handles one elapsed millisecond: advances the timers, runs a packet bus pass, and re-arms
    /// itself only while there's still something to service.
    pub fn count_ms(&mut self, host: &mut impl Host) {
        self.scheduled = false;
        if self.us_counter_enabled() {
            self.advance_us_counter(host);
            self.advance_beacon(host);
            self.advance_post_beacon(host);
        }
        self.process_packets(host);
        if self.should_schedule() {
            self.schedule_init(host);
        }
    }

    fn advance_us_counter(&mut self, host: &mut impl Host) {
        let prev = self.regs.get_wide(Reg::UsCount);
        let cur = (prev + US_PER_TICK) & US_COUNT_MASK;
        self.regs.set_wide(Reg::UsCount, cur);

        if !self.regs.us_compare_control().enabled() {
            return;
        }
        let compare = self.regs.get_wide(Reg::UsCompare) & !0x3FF;
        let matched = if cur > prev {
            compare > prev && compare <= cur
        } else {
            compare > prev || compare <= cur
        };
        if matched {
            self.send_interrupt(Irq::Beacon, host);
        }
    }

    fn advance_beacon(&mut self, host: &mut impl Host) {
        let count = self.regs.get(Reg::BeaconCount);
        if count == 0 {
            return;
        }
        let count = count - 1;
        if count == 0 {
            let interval = self.regs.get(Reg::BeaconInt);
            self.regs.set(Reg::BeaconCount, interval);
            self.send_interrupt(Irq::Beacon, host);
            if self.regs.tx_slot_loc(TxSlot::Beacon.index()).enabled() {
                self.transfer(TxSlot::Beacon, host);
            }
        } else {
            self.regs.set(Reg::BeaconCount, count);
            let pre_beacon = self.regs.get(Reg::PreBeacon) >> 10;
            if pre_beacon != 0 && count == pre_beacon {
                self.send_interrupt(Irq::PreBeacon, host);
            }
        }
    }

    fn advance_post_beacon(&mut self, host: &mut impl Host) {
        let count = self.regs.get(Reg::PostBeacon);
        if count == 0 {
            return;
        }
        self.regs.set(Reg::PostBeacon, count - 1);
        if count == 1 {
            self.send_interrupt(Irq::PostBeacon, host);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wifi::{test_host::TestHost, Builder};

    #[test]
    fn idle_controller_stops_ticking_until_needed() {
        let mut host = TestHost::new();
        let mut wifi = Builder::new().build_for_tests();
        let other = Builder::new().build_for_tests();
        assert!(!wifi.should_schedule());

        wifi.write(Reg::UsCountcnt, 0, 0xFFFF, 1, &mut host);
        assert!(wifi.scheduled());
        assert_eq!(host.schedule_requests, 1);
        wifi.count_ms(&mut host);
        assert_eq!(host.schedule_requests, 2);

        wifi.write(Reg::UsCountcnt, 0, 0xFFFF, 0, &mut host);
        wifi.count_ms(&mut host);
        assert_eq!(host.schedule_requests, 2);
        assert!(!wifi.scheduled());
        assert!(!wifi.should_schedule());

        wifi.add_connection(other.handle()).unwrap();
        assert!(wifi.should_schedule());
    }

    #[test]
    fn arming_twice_is_a_no_op() {
        let mut host = TestHost::new();
        let mut wifi = Builder::new().build_for_tests();
        wifi.schedule_init(&mut host);
        wifi.schedule_init(&mut host);
        assert_eq!(host.schedule_requests, 1);
        assert!(!wifi.should_schedule());
    }

    #[test]
    fn us_counter_matches_compare_within_tick() {
        let mut host = TestHost::new();
        let mut wifi = Builder::new().build_for_tests();
        wifi.write(Reg::UsCompare, 0, 0xFFFF, 0x0BFF, &mut host);
        wifi.write(Reg::UsComparecnt, 0, 0xFFFF, 1, &mut host);
        wifi.write(Reg::UsCountcnt, 0, 0xFFFF, 1, &mut host);

        wifi.count_ms(&mut host);
        wifi.count_ms(&mut host);
        assert!(!wifi.irqs_requested().beacon());
        assert_eq!(wifi.read(Reg::UsCount, 0, &mut host), 2000);
        wifi.count_ms(&mut host);
        assert!(wifi.irqs_requested().beacon());
    }

    #[test]
    fn stopped_counter_keeps_its_value() {
        let mut host = TestHost::new();
        let mut wifi = Builder::new().build_for_tests();
        wifi.write(Reg::UsCount, 0, 0xFFFF, 0x1234, &mut host);
        wifi.count_ms(&mut host);
        assert_eq!(wifi.read(Reg::UsCount, 0, &mut host), 0x1234);
    }

    #[test]
    fn beacon_interval_and_pre_beacon() {
        let mut host = TestHost::new();
        let mut wifi = Builder::new().build_for_tests();
        wifi.write(Reg::BeaconInt, 0, 0xFFFF, 3, &mut host);
        assert_eq!(wifi.read(Reg::BeaconCount, 0, &mut host), 3);
        wifi.write(Reg::PreBeacon, 0, 0xFFFF, 2 << 10, &mut host);
        wifi.write(Reg::UsCountcnt, 0, 0xFFFF, 1, &mut host);

        wifi.count_ms(&mut host);
        assert!(wifi.irqs_requested().pre_beacon());
        assert!(!wifi.irqs_requested().beacon());
        wifi.count_ms(&mut host);
        wifi.count_ms(&mut host);
        assert!(wifi.irqs_requested().beacon());
        assert_eq!(wifi.read(Reg::BeaconCount, 0, &mut host), 3);
    }

    #[test]
    fn post_beacon_counts_down_once() {
        let mut host = TestHost::new();
        let mut wifi = Builder::new().build_for_tests();
        wifi.write(Reg::Ie, 0, 0xFFFF, Irq::PostBeacon.mask(), &mut host);
        wifi.write(Reg::PostBeacon, 0, 0xFFFF, 2, &mut host);
        wifi.write(Reg::UsCountcnt, 0, 0xFFFF, 1, &mut host);
        wifi.count_ms(&mut host);
        assert_eq!(host.irq_requests, 0);
        wifi.count_ms(&mut host);
        wifi.count_ms(&mut host);
        assert!(wifi.irqs_requested().post_beacon());
        assert_eq!(host.irq_requests, 1);
    }

    #[test]
    fn compare_control_can_force_beacon_irq() {
        let mut host = TestHost::new();
        let mut wifi = Builder::new().build_for_tests();
        wifi.write(Reg::UsComparecnt, 0, 0xFFFF, 2, &mut host);
        assert!(wifi.irqs_requested().beacon());
        assert_eq!(wifi.read(Reg::UsComparecnt, 0, &mut host), 0);
    }
}
