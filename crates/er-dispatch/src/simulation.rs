//! Batch dispatch of generated calls, for smoke tests and the demo.

use std::time::Instant;

use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use er_core::{CityBounds, Condition, CoreError, GeoPoint, Priority, SeededRng};

use crate::orchestrator::DispatchOrchestrator;
use crate::recommendation::{DispatchResponse, DispatchStatus};
use crate::request::EmergencyRequest;

const CONDITIONS: [Condition; 5] = [
    Condition::Cardiac,
    Condition::Stroke,
    Condition::Trauma,
    Condition::Respiratory,
    Condition::General,
];
const PRIORITIES: [Priority; 3] = [Priority::Critical, Priority::High, Priority::Medium];
const GENDERS: [&str; 2] = ["M", "F"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulatedCall {
    pub request: EmergencyRequest,
    /// `Err` holds the validation message of a rejected call.
    pub response: Result<DispatchResponse, String>,
    pub processing_ms: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub total: usize,
    pub optimized: usize,
    pub fallback: usize,
    pub rejected: usize,
    /// Share of calls that got an optimized recommendation.
    pub success_rate: f64,
    /// Mean travel time over optimized responses.
    pub avg_travel_time_min: Option<f64>,
    pub avg_processing_ms: f64,
    pub results: Vec<SimulatedCall>,
}

/// `n` reproducible calls spread uniformly over `bounds`.
pub fn generate_requests(bounds: &CityBounds, n: usize, seed: u64) -> Vec<EmergencyRequest> {
    let mut rng = SeededRng::new(seed);
    (0..n)
        .map(|i| {
            let location = GeoPoint::new(
                rng.uniform(bounds.south, bounds.north),
                rng.uniform(bounds.west, bounds.east),
            );
            let condition = CONDITIONS[rng.gen_range(0..CONDITIONS.len())];
            let priority = PRIORITIES[rng.gen_range(0..PRIORITIES.len())];
            let mut request = EmergencyRequest::new(location, condition, priority)
                .with_call_id(format!("SIM-{seed}-{:03}", i + 1));
            request.age = Some(rng.gen_range(18..85));
            request.gender = Some(GENDERS[rng.gen_range(0..GENDERS.len())].to_string());
            request.address = Some(format!("Test Location {}", i + 1));
            request
        })
        .collect()
}

impl DispatchOrchestrator {
    /// Dispatch `n` generated calls concurrently and summarize the outcome.
    pub fn simulate(&self, n: usize, seed: u64) -> SimulationSummary {
        let bounds = *self.network().bounds();
        let requests = generate_requests(&bounds, n, seed);
        info!("simulating {n} emergency calls (seed {seed})");

        let results: Vec<SimulatedCall> = requests
            .into_par_iter()
            .map(|request| {
                let started = Instant::now();
                let response = self.handle_emergency(&request).map_err(|e: CoreError| e.to_string());
                SimulatedCall {
                    request,
                    response,
                    processing_ms: started.elapsed().as_secs_f64() * 1_000.0,
                }
            })
            .collect();

        let summary = summarize(results);
        info!(
            "simulation done: {}/{} optimized, {} fallback, {} rejected",
            summary.optimized, summary.total, summary.fallback, summary.rejected
        );
        summary
    }
}

fn summarize(results: Vec<SimulatedCall>) -> SimulationSummary {
    let total = results.len();
    let mut optimized = 0;
    let mut fallback = 0;
    let mut travel = Vec::new();
    for call in &results {
        match &call.response {
            Ok(r) if r.status() == DispatchStatus::Optimized => {
                optimized += 1;
                travel.extend(r.estimated_time_min());
            }
            Ok(_) => fallback += 1,
            Err(_) => {}
        }
    }
    let processing: f64 = results.iter().map(|c| c.processing_ms).sum();
    SimulationSummary {
        total,
        optimized,
        fallback,
        rejected: total - optimized - fallback,
        success_rate: if total == 0 { 0.0 } else { optimized as f64 / total as f64 },
        avg_travel_time_min: (!travel.is_empty()).then(|| travel.iter().sum::<f64>() / travel.len() as f64),
        avg_processing_ms: if total == 0 { 0.0 } else { processing / total as f64 },
        results,
    }
}
