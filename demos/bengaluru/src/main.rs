//! bengaluru — end-to-end demo of the emergency routing workspace.
//!
//! Builds a synthetic road grid over the Bengaluru service area, trains (or
//! loads) the traffic models, dispatches one cardiac call from UB City and
//! then runs a small batch of generated calls.
//!
//! Set `RUST_LOG=info` (or `debug` for per-request state transitions) to see
//! the workspace logs.

mod hospitals;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use log::info;

use er_core::{CityBounds, Condition, GeoPoint, Priority};
use er_dispatch::{
    CsvDispatchLog, DispatchLog, DispatchOrchestrator, EmergencyRequest, StaticContextSource,
};
use er_spatial::{GridSpec, RoadNetwork};
use er_traffic::synthetic::{self, train_test_split};
use er_traffic::{JsonModelStore, ModelStore, TrafficError, TrafficPredictionEngine, TrainingConfig};

// ── Constants ─────────────────────────────────────────────────────────────────

const MODEL_PATH:       &str  = "models/traffic_models.json";
const DISPATCH_LOG:     &str  = "output/dispatch_log.csv";
const TRAINING_SAMPLES: usize = 5_000;
const SIMULATED_CALLS:  usize = 3;
const SEED:             u64   = 42;

// ── Model loading ─────────────────────────────────────────────────────────────

fn load_or_train(store: &impl ModelStore, path: &Path) -> Result<TrafficPredictionEngine> {
    match store.load(path) {
        Ok(set) => {
            println!("Loaded traffic models from {} (best: {})", path.display(), set.best);
            Ok(TrafficPredictionEngine::from_model_set(set))
        }
        Err(TrafficError::ModelNotFound(_)) => {
            println!("No saved models, training on {TRAINING_SAMPLES} synthetic samples...");
            let config = TrainingConfig::default();
            let data = synthetic::generate(TRAINING_SAMPLES, SEED);
            let split = train_test_split(&data, config.test_fraction, config.seed)?;

            let started = Instant::now();
            let mut engine = TrafficPredictionEngine::new(config);
            let report = engine.train(
                &split.train.features,
                &split.train.targets,
                &split.eval.features,
                &split.eval.targets,
            )?;
            println!("Trained in {:.1?}", started.elapsed());
            for v in &report.variants {
                println!(
                    "  {:<18} MAE {:.4}  RMSE {:.4}  R² {:.3}",
                    v.kind.as_str(), v.metrics.mae, v.metrics.rmse, v.metrics.r2
                );
            }
            println!("  best: {}", report.best);

            if let Some(set) = engine.model_set() {
                store.save(set, path)?;
            }
            Ok(engine)
        }
        Err(e) => Err(e.into()),
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::init();

    println!("=== bengaluru — emergency route optimization ===");
    println!();

    // 1. Road network.
    let network = RoadNetwork::build(CityBounds::default(), &GridSpec::default())?;
    println!("Road network: {} nodes, {} edges", network.node_count(), network.edge_count());

    // 2. Traffic models.
    let engine = load_or_train(&JsonModelStore, Path::new(MODEL_PATH))?;

    // 3. Orchestrator with hospitals, a live-conditions source and two logs.
    if let Some(dir) = Path::new(DISPATCH_LOG).parent() {
        std::fs::create_dir_all(dir)?;
    }
    let memory_log = Arc::new(DispatchLog::new());
    let orchestrator = DispatchOrchestrator::builder(network, engine)
        .hospitals(hospitals::load()?)
        .context_source(Arc::new(StaticContextSource::at(chrono::Local::now().naive_local())))
        .sink(memory_log.clone())
        .sink(Arc::new(CsvDispatchLog::open(Path::new(DISPATCH_LOG))?))
        .build()?;
    info!("orchestrator ready");

    let status = orchestrator.status();
    println!("System status: {}", serde_json::to_string_pretty(&status)?);
    println!();

    // 4. One cardiac call from UB City.
    let mut call = EmergencyRequest::new(GeoPoint::new(12.9716, 77.5946), Condition::Cardiac, Priority::Critical)
        .with_call_id("EMG_20250821_001");
    call.age = Some(65);
    call.gender = Some("M".into());
    call.address = Some("UB City Mall, Bengaluru".into());

    let response = orchestrator.handle_emergency(&call)?;
    println!("Dispatch recommendation:");
    println!("{}", serde_json::to_string_pretty(&response)?);
    println!();

    // 5. Traffic outlook for the recommended trip.
    if let Some(rec) = response.as_optimized() {
        let outlook = orchestrator.predict_traffic(call.location(), rec.recommended_hospital.location, &[])?;
        println!("Traffic outlook to {}:", rec.recommended_hospital.name);
        for (minutes, p) in &outlook.predictions {
            println!("  +{minutes:>2} min  multiplier {:.2}  ± {:.2}", p.multiplier, p.uncertainty);
        }
        println!();
    }

    // 6. A small batch of generated calls.
    let summary = orchestrator.simulate(SIMULATED_CALLS, SEED);
    println!("Simulation: {} calls", summary.total);
    println!("  success rate:      {:.1}%", summary.success_rate * 100.0);
    if let Some(t) = summary.avg_travel_time_min {
        println!("  avg travel time:   {t:.1} min");
    }
    println!("  avg processing:    {:.1} ms", summary.avg_processing_ms);
    println!();

    // 7. Performance over the last day.
    if let Some(report) = memory_log.performance_report(chrono::Duration::hours(24)) {
        println!("Performance report: {}", serde_json::to_string_pretty(&report)?);
    }
    println!("Dispatch log written to {DISPATCH_LOG}");

    Ok(())
}
