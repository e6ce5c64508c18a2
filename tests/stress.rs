// FieldAlert - Irrigation decision engine
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Volume tests: many zones, long observation streams, invariants held
//! throughout.

use chrono::{DateTime, Duration, TimeZone, Utc};
use fieldalert::balance::ReferenceEtEstimator;
use fieldalert::soil::{Depth, SoilProfile, TextureClass};
use fieldalert::{EngineConfig, FieldAlertEngine, RawObservation, ZoneConfig};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
}

const TEXTURES: [TextureClass; 4] = [
    TextureClass::Sand,
    TextureClass::Loam,
    TextureClass::SiltLoam,
    TextureClass::Clay,
];

#[test]
fn test_many_zones_long_streams() {
    let config = EngineConfig {
        max_zones: 64,
        ..Default::default()
    };
    let mut engine =
        FieldAlertEngine::new(config, Box::new(ReferenceEtEstimator::diurnal(7.0))).unwrap();

    let zone_ids: Vec<String> = (0..32).map(|i| format!("zone-{i:02}")).collect();
    for (i, id) in zone_ids.iter().enumerate() {
        engine
            .register_zone(
                id.as_str(),
                ZoneConfig::new(
                    SoilProfile::from_texture(TEXTURES[i % TEXTURES.len()]),
                    "corn",
                ),
            )
            .unwrap();
    }

    // A week of 3-hourly observations per zone, with staggered rain and a
    // mid-week depth reading.
    for step in 0..(7 * 8) {
        let ts = t0() + Duration::hours(step * 3);
        for (i, id) in zone_ids.iter().enumerate() {
            let mut raw = RawObservation::new(id.clone(), ts, 27.0, 25.0).with_vpd(1.6);
            if (step + i as i64) % 16 == 0 {
                raw = raw.with_rainfall(8.0);
            }
            if step == 28 {
                raw = raw.with_depth(Depth::Twelve, 0.2);
            }
            engine.ingest(&raw).unwrap();

            let state = engine.balance(id).unwrap().unwrap();
            assert!(state.smd_mm >= 0.0);
            assert!(state.smd_mm <= state.effective_whc_mm);
        }
    }

    // Every zone evaluated its full history independently.
    for id in &zone_ids {
        let record = engine.evaluate(id).unwrap();
        assert_eq!(&record.zone_id, id);
        assert!((0.0..=1.0).contains(&record.cwsi));
    }
    assert_eq!(engine.zone_count(), 32);
}

#[test]
fn test_interleaved_zone_streams_stay_isolated() {
    let mut engine = FieldAlertEngine::new(
        EngineConfig::default(),
        Box::new(ReferenceEtEstimator::constant(20.0)),
    )
    .unwrap();

    for id in ["wet", "dry"] {
        engine
            .register_zone(
                id,
                ZoneConfig::new(SoilProfile::from_texture(TextureClass::SiltLoam), "corn"),
            )
            .unwrap();
    }

    // "wet" gets rain every tick, "dry" never does.
    for day in 0..10 {
        let ts = t0() + Duration::days(day);
        engine
            .ingest(
                &RawObservation::new("wet", ts, 24.0, 23.5)
                    .with_vpd(1.0)
                    .with_rainfall(25.0),
            )
            .unwrap();
        engine
            .ingest(&RawObservation::new("dry", ts, 24.0, 23.5).with_vpd(1.0))
            .unwrap();
    }

    let wet = engine.balance("wet").unwrap().unwrap();
    let dry = engine.balance("dry").unwrap().unwrap();
    assert_eq!(wet.smd_mm, 0.0);
    assert!(dry.smd_mm > wet.smd_mm);
    assert!(engine.evaluate("dry").unwrap().triggered);
    assert!(!engine.evaluate("wet").unwrap().triggered);
}

#[test]
fn test_history_grows_append_only() {
    let mut engine = FieldAlertEngine::new(
        EngineConfig::default(),
        Box::new(ReferenceEtEstimator::constant(5.0)),
    )
    .unwrap();
    engine
        .register_zone(
            "zone-a",
            ZoneConfig::new(SoilProfile::from_texture(TextureClass::Loam), "corn"),
        )
        .unwrap();

    for step in 0..200 {
        let ts = t0() + Duration::hours(step);
        engine
            .ingest(&RawObservation::new("zone-a", ts, 25.0, 24.0).with_vpd(1.2))
            .unwrap();
        engine.evaluate("zone-a").unwrap();

        let history = engine.history("zone-a").unwrap();
        assert_eq!(history.len(), (step + 1) as usize);
        assert!(history.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }
}
