//! Unit tests for rts-core primitives.

#[cfg(test)]
mod ids {
    use crate::{CoreError, NodeIndex, UnitId};

    #[test]
    fn index_roundtrip() {
        let id = UnitId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(UnitId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn invalid_sentinel() {
        assert_eq!(UnitId::INVALID.0, u32::MAX);
        assert!(!NodeIndex::default().is_valid());
        assert!(NodeIndex(0).is_valid());
    }

    #[test]
    fn display() {
        assert_eq!(UnitId(7).to_string(), "UnitId(7)");
    }

    #[test]
    fn unit_id_from_slot() {
        assert_eq!(UnitId::from_index(7).unwrap(), UnitId(7));
        let overflow = u32::MAX as usize + 1;
        assert!(matches!(
            UnitId::from_index(overflow),
            Err(CoreError::IdSpaceExhausted { kind: "unit", count }) if count == overflow
        ));
    }
}

#[cfg(test)]
mod node {
    use crate::{NetRole, PathNodeType};

    #[test]
    fn only_ground_respects_terrain() {
        assert!(PathNodeType::Ground.respects_terrain());
        assert!(!PathNodeType::Air.respects_terrain());
    }

    #[test]
    fn roles() {
        assert!(NetRole::Standalone.is_authoritative());
        assert!(NetRole::Host.is_authoritative());
        assert!(!NetRole::Client.is_authoritative());
        assert!(NetRole::Host.relays());
        assert!(!NetRole::Standalone.relays());
    }
}

#[cfg(test)]
mod planar {
    use glam::Vec3;

    use crate::planar::{distance, rotate_y, scrub_nan};

    #[test]
    fn distance_ignores_height() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 10.0, 4.0);
        assert!((distance(a, b) - 5.0).abs() < 1e-5);
    }

    #[test]
    fn rotate_quarter_turn() {
        let r = rotate_y(Vec3::X, 90.0);
        assert!(r.x.abs() < 1e-5);
        assert!((r.z + 1.0).abs() < 1e-5, "got {r}");
    }

    #[test]
    fn scrub_replaces_nan_only() {
        let v = scrub_nan(Vec3::new(f32::NAN, 2.0, f32::NAN));
        assert_eq!(v, Vec3::new(0.0, 2.0, 0.0));
    }
}

#[cfg(test)]
mod time {
    use crate::{CoreError, SimClock, SimConfig, Tick};

    #[test]
    fn tick_arithmetic() {
        let t = Tick(10);
        assert_eq!(t + 5, Tick(15));
        assert_eq!(t.offset(3), Tick(13));
        assert_eq!(Tick(15) - Tick(10), 5u64);
        assert_eq!(Tick(3).since(Tick(9)), 0);
    }

    #[test]
    fn clock_dt_and_elapsed() {
        let mut clock = SimClock::new(30);
        assert!((clock.dt() - 1.0 / 30.0).abs() < 1e-7);
        for _ in 0..60 {
            clock.advance();
        }
        assert!((clock.elapsed_secs() - 2.0).abs() < 1e-9);
        assert_eq!(clock.ticks_for_secs(0.5), 15);
    }

    #[test]
    fn zero_rate_is_clamped() {
        assert_eq!(SimClock::new(0).tick_hz, 1);
    }

    #[test]
    fn validate_rejects_unrunnable_configs() {
        assert!(SimConfig::default().validate().is_ok());
        let stopped = SimConfig { tick_hz: 0, ..SimConfig::default() };
        assert!(matches!(stopped.validate(), Err(CoreError::Config(_))));
        let no_workers = SimConfig { solver_threads: Some(0), ..SimConfig::default() };
        assert!(matches!(no_workers.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn config_end_tick() {
        let cfg = SimConfig { total_ticks: 90, ..SimConfig::default() };
        assert_eq!(cfg.end_tick(), Tick(90));
        assert_eq!(cfg.make_clock().tick_hz, 30);
    }
}

#[cfg(test)]
mod rng {
    use crate::{UnitId, UnitRng};

    #[test]
    fn same_seed_same_choice() {
        let items = [1, 2, 3, 4, 5, 6, 7, 8];
        let mut a = UnitRng::new(99, UnitId(3));
        let mut b = UnitRng::new(99, UnitId(3));
        for _ in 0..16 {
            assert_eq!(a.choose(&items), b.choose(&items));
        }
    }

    #[test]
    fn choose_empty_is_none() {
        let mut r = UnitRng::new(1, UnitId(0));
        let empty: [u8; 0] = [];
        assert!(r.choose(&empty).is_none());
    }
}
