//! Unit tests for er-core primitives.

#[cfg(test)]
mod ids {
    use crate::{EdgeId, HospitalId, NodeId};

    #[test]
    fn index_roundtrip() {
        let id = NodeId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(NodeId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn ordering() {
        assert!(HospitalId(1) < HospitalId(2));
        assert!(NodeId(100) > NodeId(99));
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(NodeId::INVALID.0, u32::MAX);
        assert_eq!(EdgeId::INVALID.0, u32::MAX);
        assert_eq!(HospitalId::default(), HospitalId::INVALID);
    }

    #[test]
    fn display() {
        assert_eq!(HospitalId(7).to_string(), "HospitalId(7)");
    }
}

#[cfg(test)]
mod geo {
    use crate::{CityBounds, GeoPoint};

    #[test]
    fn zero_distance() {
        let p = GeoPoint::new(12.9716, 77.5946);
        assert!(p.distance_m(p) < 0.01);
    }

    #[test]
    fn one_degree_latitude() {
        let a = GeoPoint::new(12.0, 77.0);
        let b = GeoPoint::new(13.0, 77.0);
        let d = a.distance_m(b);
        assert!((d - 111_195.0).abs() < 200.0, "got {d}");
    }

    #[test]
    fn validity() {
        assert!(GeoPoint::new(12.97, 77.59).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 77.59).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
    }

    #[test]
    fn default_bounds_are_bengaluru() {
        let b = CityBounds::default();
        assert!(b.validate().is_ok());
        assert!(b.contains(GeoPoint::new(12.9716, 77.5946)));
        assert!(!b.contains(GeoPoint::new(28.61, 77.20))); // Delhi
    }

    #[test]
    fn degenerate_bounds_rejected() {
        assert!(CityBounds::new(12.9, 12.9, 77.8, 77.3).validate().is_err());
        assert!(CityBounds::new(12.9, 13.0, 77.8, 77.3).validate().is_err());
        assert!(CityBounds::new(f64::NAN, 12.0, 77.8, 77.3).validate().is_err());
    }

    #[test]
    fn tolerance_extends_containment() {
        let b = CityBounds::default();
        let just_outside = GeoPoint::new(b.north + 0.01, 77.6);
        assert!(!b.contains(just_outside));
        assert!(b.contains_with_tolerance(just_outside));
        assert!(!b.contains_with_tolerance(GeoPoint::new(b.north + 1.0, 77.6)));
    }

    #[test]
    fn enclosing_and_around() {
        let pts = [GeoPoint::new(1.0, 2.0), GeoPoint::new(3.0, -1.0)];
        let b = CityBounds::enclosing(pts).unwrap();
        assert_eq!((b.north, b.south, b.east, b.west), (3.0, 1.0, 2.0, -1.0));
        assert!(CityBounds::enclosing(std::iter::empty()).is_none());

        let a = CityBounds::around(pts[0], pts[1], 0.5);
        assert_eq!(a.north, 3.5);
        assert_eq!(a.west, -1.5);
    }
}

#[cfg(test)]
mod emergency {
    use crate::{Condition, CoreError, Priority};

    #[test]
    fn parse_codes_case_insensitively() {
        assert_eq!("Cardiac".parse::<Condition>().unwrap(), Condition::Cardiac);
        assert_eq!(" critical ".parse::<Priority>().unwrap(), Priority::Critical);
    }

    #[test]
    fn unknown_codes_rejected() {
        assert!(matches!(
            "sniffles".parse::<Condition>(),
            Err(CoreError::UnknownCondition(_))
        ));
        assert!(matches!("asap".parse::<Priority>(), Err(CoreError::UnknownPriority(_))));
    }

    #[test]
    fn trauma_requires_center() {
        assert!(Condition::Trauma.requires_trauma_center());
        assert!(!Condition::Cardiac.requires_trauma_center());
        assert!(Condition::Cardiac.required_specialties().contains(&"cardiology"));
    }
}

#[cfg(test)]
mod context {
    use chrono::NaiveDate;

    use crate::{ContextualInfo, TrafficLeg};

    #[test]
    fn flags_from_datetime() {
        // 2025-08-21 is a Thursday.
        let at = NaiveDate::from_ymd_opt(2025, 8, 21)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        let c = ContextualInfo::from_datetime(at, false);
        assert_eq!(c.day_of_week, 3);
        assert_eq!(c.month, 8);
        assert!((c.hour - 8.5).abs() < 1e-9);
        assert!(c.is_rush_hour);
        assert!(!c.is_night);
        assert!(!c.is_weekend);
        assert!(c.is_school_time);
    }

    #[test]
    fn holiday_suppresses_school_time() {
        let c = ContextualInfo::from_parts(9.0, 1, 3, true);
        assert!(!c.is_school_time);
    }

    #[test]
    fn advancing_past_midnight_rolls_the_day() {
        let sunday_late = ContextualInfo::from_parts(23.5, 6, 5, false);
        let next = sunday_late.advanced_by(60.0);
        assert_eq!(next.day_of_week, 0);
        assert!((next.hour - 0.5).abs() < 1e-9);
        assert!(next.is_night);
        assert!(!next.is_weekend);
    }

    #[test]
    fn traffic_ratio_defaults_to_one() {
        let unknown = TrafficLeg { distance_km: 3.0, duration_normal_min: 0.0, duration_traffic_min: 5.0 };
        assert_eq!(unknown.traffic_ratio(), 1.0);
        let slow = TrafficLeg { distance_km: 3.0, duration_normal_min: 10.0, duration_traffic_min: 15.0 };
        assert!((slow.traffic_ratio() - 1.5).abs() < 1e-12);
    }
}

#[cfg(test)]
mod snapshot {
    use std::sync::Arc;

    use crate::Snapshot;

    #[test]
    fn publish_bumps_version_and_keeps_old_readers() {
        let snap = Snapshot::new(vec![1, 2, 3]);
        let before = snap.current();
        assert_eq!(before.version, 1);

        let v = snap.publish(vec![4]);
        assert_eq!(v, 2);
        // The reader that grabbed the old Arc still sees the old value.
        assert_eq!(before.value, vec![1, 2, 3]);
        assert_eq!(snap.current().value, vec![4]);
    }

    #[test]
    fn failed_publish_with_changes_nothing() {
        let snap = Snapshot::new(10u32);
        let r: Result<u64, &str> = snap.publish_with(|_| Err("nope"));
        assert!(r.is_err());
        assert_eq!(snap.version(), 1);
        assert_eq!(**snap.current(), 10);
    }

    #[test]
    fn concurrent_readers_see_whole_values() {
        let snap = Arc::new(Snapshot::new(vec![0u32; 64]));
        std::thread::scope(|s| {
            let writer = Arc::clone(&snap);
            s.spawn(move || {
                for i in 1..200u32 {
                    writer.publish(vec![i; 64]);
                }
            });
            for _ in 0..4 {
                let reader = Arc::clone(&snap);
                s.spawn(move || {
                    for _ in 0..500 {
                        let cur = reader.current();
                        let first = cur.value[0];
                        assert!(cur.value.iter().all(|&x| x == first));
                    }
                });
            }
        });
        assert_eq!(snap.version(), 200);
    }
}

#[cfg(test)]
mod rng {
    use crate::SeededRng;

    #[test]
    fn same_seed_same_stream() {
        let mut a = SeededRng::new(42);
        let mut b = SeededRng::new(42);
        for _ in 0..16 {
            assert_eq!(a.random::<u64>(), b.random::<u64>());
        }
    }

    #[test]
    fn streams_differ() {
        let mut a = SeededRng::for_stream(42, 0);
        let mut b = SeededRng::for_stream(42, 1);
        assert_ne!(a.random::<u64>(), b.random::<u64>());
    }

    #[test]
    fn distributions_have_sane_means() {
        let mut rng = SeededRng::new(7);
        let n = 20_000;
        let normal: f64 = (0..n).map(|_| rng.normal(25.0, 8.0)).sum::<f64>() / n as f64;
        let expo: f64 = (0..n).map(|_| rng.exponential(2.0)).sum::<f64>() / n as f64;
        let pois: f64 = (0..n).map(|_| rng.poisson(0.5) as f64).sum::<f64>() / n as f64;
        assert!((normal - 25.0).abs() < 0.5, "normal mean {normal}");
        assert!((expo - 2.0).abs() < 0.1, "exponential mean {expo}");
        assert!((pois - 0.5).abs() < 0.05, "poisson mean {pois}");
    }

    #[test]
    fn degenerate_parameters_do_not_panic() {
        let mut rng = SeededRng::new(7);
        assert_eq!(rng.normal(3.0, f64::NAN), 3.0);
        assert_eq!(rng.exponential(0.0), 0.0);
        assert_eq!(rng.exponential(-1.0), 0.0);
        assert_eq!(rng.poisson(0.0), 0);
        assert_eq!(rng.poisson(f64::NAN), 0);
    }
}
