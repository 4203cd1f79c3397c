//! Unit tests for er-hospital.

#[cfg(test)]
mod helpers {
    use er_core::{GeoPoint, HospitalId};
    use crate::Hospital;

    /// The five Bengaluru hospitals used across the workspace demos.
    pub fn bengaluru() -> Vec<Hospital> {
        vec![
            Hospital::new(HospitalId(1), "Manipal Hospital Whitefield", GeoPoint::new(12.9698, 77.7500), 200)
                .with_specialties(["cardiology", "neurology", "trauma"])
                .with_trauma_center(true)
                .with_wait_time(20.0),
            Hospital::new(HospitalId(2), "Apollo Hospital Bannerghatta", GeoPoint::new(12.9056, 77.5936), 300)
                .with_specialties(["cardiac surgery", "oncology", "neurosurgery"])
                .with_trauma_center(true)
                .with_wait_time(15.0),
            Hospital::new(HospitalId(3), "Fortis Hospital Cunningham Road", GeoPoint::new(12.9926, 77.5985), 150)
                .with_specialties(["emergency medicine", "pediatrics"])
                .with_wait_time(30.0),
            Hospital::new(HospitalId(4), "Narayana Health City", GeoPoint::new(12.8539, 77.6648), 500)
                .with_specialties(["cardiac surgery", "neurosurgery", "trauma", "pediatrics"])
                .with_trauma_center(true)
                .with_wait_time(10.0),
            Hospital::new(HospitalId(5), "St. Johns Medical College Hospital", GeoPoint::new(12.9279, 77.6271), 250)
                .with_specialties(["general medicine", "surgery", "pediatrics"])
                .with_wait_time(25.0),
        ]
    }

    pub fn ub_city() -> GeoPoint {
        GeoPoint::new(12.9716, 77.5946)
    }
}

// ── Records ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod hospital {
    use er_core::{GeoPoint, HospitalId};
    use crate::{Hospital, HospitalError};

    #[test]
    fn specialties_are_normalized() {
        let h = Hospital::new(HospitalId(1), "A", GeoPoint::new(12.9, 77.6), 10)
            .with_specialties([" Cardiology ", "TRAUMA", ""]);
        assert!(h.has_specialty("cardiology"));
        assert!(h.has_specialty("trauma"));
        assert_eq!(h.specialties.len(), 2);
    }

    #[test]
    fn validation() {
        let ok = Hospital::new(HospitalId(1), "A", GeoPoint::new(12.9, 77.6), 10);
        assert!(ok.validate().is_ok());
        let zero = Hospital::new(HospitalId(1), "A", GeoPoint::new(12.9, 77.6), 0);
        assert!(matches!(zero.validate(), Err(HospitalError::InvalidRecord(_))));
        assert!(ok.clone().with_wait_time(-1.0).validate().is_err());
        assert!(ok.clone().with_wait_time(f64::NAN).validate().is_err());
        let bad_loc = Hospital::new(HospitalId(1), "A", GeoPoint::new(95.0, 77.6), 10);
        assert!(bad_loc.validate().is_err());
    }

    #[test]
    fn free_beds_saturate() {
        let h = Hospital::new(HospitalId(1), "A", GeoPoint::new(12.9, 77.6), 10).with_occupancy(14);
        assert_eq!(h.free_beds(), 0);
    }
}

// ── Ranking ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod ranking {
    use er_core::{Condition, ContextualInfo, GeoPoint, HospitalId};
    use crate::{Hospital, SuitabilityWeights, rank_hospitals, specialty_match};

    #[test]
    fn specialty_grading() {
        let hs = super::helpers::bengaluru();
        // Trauma center + cardiology.
        assert_eq!(specialty_match(&hs[0], Condition::Cardiac), 1.0);
        // Trauma requires a trauma center.
        assert_eq!(specialty_match(&hs[2], Condition::Trauma), 0.0);
        assert_eq!(specialty_match(&hs[3], Condition::Trauma), 1.0);
        // Emergency medicine only.
        assert_eq!(specialty_match(&hs[2], Condition::Cardiac), 0.3);
        // Non-time-critical exact match needs no trauma center.
        assert_eq!(specialty_match(&hs[2], Condition::Pediatric), 1.0);
        // Time-critical exact match without trauma center.
        let h = hs[4].clone().with_specialties(["neurology"]);
        assert_eq!(specialty_match(&h, Condition::Stroke), 0.9);
    }

    #[test]
    fn trauma_center_with_lower_wait_ranks_first_for_cardiac() {
        let at = super::helpers::ub_city();
        let site = GeoPoint::new(12.95, 77.60);
        let hospitals = vec![
            Hospital::new(HospitalId(1), "Community", site, 200)
                .with_specialties(["cardiology"])
                .with_wait_time(40.0),
            Hospital::new(HospitalId(2), "Trauma", site, 200)
                .with_specialties(["cardiology"])
                .with_trauma_center(true)
                .with_wait_time(10.0),
        ];
        let ranked = rank_hospitals(&hospitals, at, Condition::Cardiac, &ContextualInfo::default(), &SuitabilityWeights::default());
        assert_eq!(ranked[0].hospital.id, HospitalId(2));
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn ranking_is_deterministic_and_sorted() {
        let hs = super::helpers::bengaluru();
        let ctx = ContextualInfo::from_parts(8.0, 2, 5, false);
        let w = SuitabilityWeights::default();
        let a = rank_hospitals(&hs, super::helpers::ub_city(), Condition::Stroke, &ctx, &w);
        for _ in 0..10 {
            assert_eq!(rank_hospitals(&hs, super::helpers::ub_city(), Condition::Stroke, &ctx, &w), a);
        }
        assert!(a.windows(2).all(|p| p[0].score >= p[1].score));
        assert!(a.iter().all(|r| (0.0..=1.0).contains(&r.score)));
    }

    #[test]
    fn equal_scores_break_on_lower_id() {
        let site = GeoPoint::new(12.95, 77.60);
        let hospitals = vec![
            Hospital::new(HospitalId(9), "B", site, 100),
            Hospital::new(HospitalId(3), "A", site, 100),
        ];
        let ranked = rank_hospitals(&hospitals, site, Condition::General, &ContextualInfo::default(), &SuitabilityWeights::default());
        assert_eq!(ranked[0].hospital.id, HospitalId(3));
        assert_eq!(ranked[0].score, ranked[1].score);
    }

    #[test]
    fn hospitals_without_emergency_services_are_skipped() {
        let mut hs = super::helpers::bengaluru();
        hs[1].emergency_services = false;
        let ranked = rank_hospitals(&hs, super::helpers::ub_city(), Condition::General, &ContextualInfo::default(), &SuitabilityWeights::default());
        assert_eq!(ranked.len(), 4);
        assert!(ranked.iter().all(|r| r.hospital.id != HospitalId(2)));
    }

    #[test]
    fn rush_hour_penalizes_distance_more() {
        let hs = super::helpers::bengaluru();
        let w = SuitabilityWeights::default();
        let at = super::helpers::ub_city();
        let calm = rank_hospitals(&hs, at, Condition::General, &ContextualInfo::from_parts(12.0, 2, 5, false), &w);
        let rush = rank_hospitals(&hs, at, Condition::General, &ContextualInfo::from_parts(8.0, 2, 5, false), &w);
        let find = |v: &[crate::RankedHospital]| v.iter().find(|r| r.hospital.id == HospitalId(1)).map(|r| r.breakdown.distance).unwrap();
        assert!(find(&rush) < find(&calm));
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod registry {
    use er_core::{Condition, ContextualInfo, GeoPoint, HospitalId};
    use crate::{HospitalError, HospitalRegistry, StaticHospitals, SuitabilityWeights};

    fn loaded() -> HospitalRegistry {
        let reg = HospitalRegistry::new(SuitabilityWeights::default());
        reg.load(super::helpers::bengaluru()).unwrap();
        reg
    }

    #[test]
    fn load_publishes_new_version() {
        let reg = HospitalRegistry::default();
        assert!(reg.is_empty());
        let v0 = reg.version();
        let v1 = reg.load(super::helpers::bengaluru()).unwrap();
        assert!(v1 > v0);
        assert_eq!(reg.len(), 5);
    }

    #[test]
    fn invalid_load_leaves_snapshot_untouched() {
        let reg = loaded();
        let before = reg.version();
        let mut bad = super::helpers::bengaluru();
        bad[3].capacity = 0;
        assert!(reg.load(bad).is_err());
        let mut dup = super::helpers::bengaluru();
        dup[4].id = HospitalId(1);
        assert!(matches!(reg.load(dup), Err(HospitalError::DuplicateId(HospitalId(1)))));
        assert_eq!(reg.version(), before);
        assert_eq!(reg.len(), 5);
    }

    #[test]
    fn wait_time_refresh_keeps_identity() {
        let reg = loaded();
        let held = reg.current();
        reg.update_wait_time(HospitalId(3), 5.0).unwrap();

        let h = reg.get(HospitalId(3)).unwrap();
        assert_eq!(h.current_wait_time, 5.0);
        assert_eq!(h.name, "Fortis Hospital Cunningham Road");
        // A reader holding the old snapshot still sees the old value.
        assert_eq!(held.iter().find(|h| h.id == HospitalId(3)).unwrap().current_wait_time, 30.0);
    }

    #[test]
    fn wait_time_refresh_rejects_bad_input() {
        let reg = loaded();
        assert!(reg.update_wait_time(HospitalId(3), -2.0).is_err());
        assert!(matches!(
            reg.update_wait_time(HospitalId(42), 2.0),
            Err(HospitalError::UnknownHospital(HospitalId(42)))
        ));
    }

    #[test]
    fn wait_time_refresh_publishes_once() {
        let reg = loaded();
        let before = reg.version();
        let v = reg.update_wait_time(HospitalId(2), 7.5).unwrap();
        assert_eq!(v, before + 1);
        assert_eq!(reg.version(), v);

        // A rejected refresh publishes nothing.
        assert!(reg.update_wait_time(HospitalId(99), 1.0).is_err());
        assert!(reg.update_wait_time(HospitalId(2), f64::INFINITY).is_err());
        assert_eq!(reg.version(), v);
        assert_eq!(reg.get(HospitalId(2)).unwrap().current_wait_time, 7.5);
    }

    #[test]
    fn rank_reflects_refresh() {
        let reg = loaded();
        let ctx = ContextualInfo::default();
        let at = super::helpers::ub_city();
        let before = reg.rank(at, Condition::General, &ctx);
        reg.update_wait_time(HospitalId(3), 0.0).unwrap();
        let after = reg.rank(at, Condition::General, &ctx);
        let score = |v: &[crate::RankedHospital]| v.iter().find(|r| r.hospital.id == HospitalId(3)).unwrap().score;
        assert!(score(&after) > score(&before));
    }

    #[test]
    fn nearest_prefers_emergency_services() {
        let reg = loaded();
        let (h, km) = reg.nearest(super::helpers::ub_city()).unwrap();
        assert_eq!(h.id, HospitalId(3));
        assert!(km < 3.0);

        let mut hs = super::helpers::bengaluru();
        hs[2].emergency_services = false;
        reg.load(hs).unwrap();
        assert_ne!(reg.nearest(super::helpers::ub_city()).unwrap().0.id, HospitalId(3));
        assert!(HospitalRegistry::default().nearest(GeoPoint::new(12.9, 77.6)).is_none());
    }

    #[test]
    fn refresh_from_source() {
        let reg = HospitalRegistry::default();
        reg.refresh(&StaticHospitals(super::helpers::bengaluru())).unwrap();
        assert_eq!(reg.len(), 5);
    }

    #[test]
    fn concurrent_rank_and_refresh() {
        let reg = loaded();
        let at = super::helpers::ub_city();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..200 {
                        let ranked = reg.rank(at, Condition::Cardiac, &ContextualInfo::default());
                        assert_eq!(ranked.len(), 5);
                    }
                });
            }
            s.spawn(|| {
                for i in 0..200 {
                    reg.update_wait_time(HospitalId(1 + i % 5), i as f64).unwrap();
                }
            });
        });
    }
}

// ── CSV ───────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod loader {
    use std::io::Cursor;

    use er_core::HospitalId;
    use crate::{
        CsvHospitalSource, HospitalDataSource, HospitalError, load_hospitals_reader,
        write_hospitals_csv,
    };

    #[test]
    fn parse_csv() {
        let csv = "id,name,lat,lon,capacity,occupancy,specialties,trauma_center,emergency_services,current_wait_time\n\
                   1,Manipal,12.9698,77.75,200,,Cardiology;trauma,true,true,20\n\
                   7,Clinic,12.95,77.60,40,12,,false,false,0\n";
        let hs = load_hospitals_reader(Cursor::new(csv)).unwrap();
        assert_eq!(hs.len(), 2);
        assert_eq!(hs[0].id, HospitalId(1));
        assert!(hs[0].has_specialty("cardiology"));
        assert_eq!(hs[0].occupancy, 0);
        assert!(hs[0].trauma_center);
        assert_eq!(hs[1].occupancy, 12);
        assert!(hs[1].specialties.is_empty());
        assert!(!hs[1].emergency_services);
    }

    #[test]
    fn invalid_rows_rejected() {
        let header = "id,name,lat,lon,capacity,occupancy,specialties,trauma_center,emergency_services,current_wait_time\n";
        let zero_capacity = format!("{header}1,A,12.9,77.6,0,,x,true,true,1\n");
        assert!(matches!(load_hospitals_reader(Cursor::new(zero_capacity)), Err(HospitalError::InvalidRecord(_))));
        let garbage = format!("{header}one,A,12.9,77.6,10,,x,true,true,1\n");
        assert!(matches!(load_hospitals_reader(Cursor::new(garbage)), Err(HospitalError::Parse(_))));
    }

    #[test]
    fn write_then_read_file() {
        let hs = super::helpers::bengaluru();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hospitals.csv");
        write_hospitals_csv(std::fs::File::create(&path).unwrap(), &hs).unwrap();
        let loaded = CsvHospitalSource::new(&path).load().unwrap();
        assert_eq!(loaded, hs);
    }

    #[test]
    fn missing_file_is_io_error() {
        let r = CsvHospitalSource::new("/nonexistent/hospitals.csv").load();
        assert!(matches!(r, Err(HospitalError::Io(_))));
    }
}
