// FieldAlert Testdata - Drydown decision demo
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Stream a synthetic two-week drydown through the engine and print the
//! daily decisions.
//!
//! Run with: cargo run -p fieldalert-testdata --features engine --example drydown_decisions

use fieldalert::balance::ReferenceEtEstimator;
use fieldalert::soil::{SoilProfile, TextureClass};
use fieldalert::{EngineConfig, FieldAlertEngine, ZoneConfig};
use fieldalert_testdata::{generate, GeneratorConfig, Scenario};

fn main() {
    let dataset = generate(
        &GeneratorConfig::new()
            .with_zone_id("north-40")
            .with_duration_days(14.0)
            .with_scenario(Scenario::Drydown)
            .with_seed(42),
    )
    .expect("generator config is valid");

    let mut engine = FieldAlertEngine::new(
        EngineConfig::default(),
        Box::new(ReferenceEtEstimator::diurnal(7.0)),
    )
    .expect("engine config is valid");
    engine
        .register_zone(
            "north-40",
            ZoneConfig::new(SoilProfile::from_texture(TextureClass::SiltLoam), "corn"),
        )
        .expect("zone registers");

    println!("day | SMD (mm) | depletion | CWSI | decision");
    println!("----+----------+-----------+------+----------");

    for (i, record) in dataset.records.iter().enumerate() {
        let raw = record.to_raw_observation("north-40");
        if let Err(e) = engine.ingest(&raw) {
            eprintln!("rejected record {i}: {e}");
            continue;
        }

        // Evaluate once per day, at noon.
        if i % 24 == 12 {
            match engine.evaluate("north-40") {
                Ok(decision) => println!(
                    "{:>3} | {:>8.1} | {:>8.0}% | {:>4.2} | {}",
                    i / 24 + 1,
                    decision.smd_mm,
                    decision.smd_depletion * 100.0,
                    decision.cwsi,
                    decision.rationale.as_str()
                ),
                Err(e) => eprintln!("evaluation failed: {e}"),
            }
        }
    }

    if let Ok(Some(last)) = engine.last_decision("north-40") {
        println!(
            "\nfinal: triggered={} ({}) at {}",
            last.triggered,
            last.rationale.as_str(),
            last.timestamp
        );
    }
}
