//! `DispatchOrchestrator`: the per-request decision pipeline.
//!
//! # Algorithm
//!
//! 1. Validate the request at the boundary (the only error a caller sees).
//! 2. Gather context with bounded latency ([`ContextGatherer`]).
//! 3. Rank hospitals by suitability and keep the top `N`.
//! 4. For each of the `N`, on its own worker thread: generate route
//!    candidates, predict travel time for each and keep the candidate with
//!    the lowest travel time (ties: higher confidence, then candidate order).
//! 5. Wait for the workers until `candidate_timeout` after they started.  A
//!    worker still running then is reported as a timeout and left detached;
//!    its result is discarded.
//! 6. Pick the hospital minimizing `travel_time + wait_time` over the
//!    results that arrived (ties: higher confidence, then lower hospital id).
//!
//! A hospital with no road route gets a straight-line estimate and may be
//! listed as an alternative, but never wins.  When no hospital could be
//! evaluated at all the response is a [`FallbackRecommendation`].
//!
//! # Snapshots
//!
//! The network, model set and hospital list are read once per request from
//! their [`Snapshot`]s, so a concurrent rebuild or retrain never changes the
//! data a request is working on.

use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Instant;

use chrono::{Local, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use er_core::{
    ContextSnapshot, CoreError, CoreResult, GeoPoint, Priority, Snapshot, VehicleClass, Versioned,
};
use er_hospital::{Hospital, HospitalRegistry, nearest_hospital, rank_hospitals};
use er_spatial::{MultiObjectiveRouter, RoadNetwork, RouteCandidate, Router, SpatialError};
use er_traffic::{
    FeatureVector, SpeedPolicy, TrafficError, TrafficForecast, TrafficPrediction,
    TrafficPredictionEngine, TravelTimePrediction,
};

use crate::analytics::{DispatchLogEntry, DispatchSink};
use crate::config::DispatchConfig;
use crate::context::{ContextGatherer, ContextSource, StaticContextSource};
use crate::recommendation::{
    AlternativeOption, ConditionsSummary, Degradation, DispatchRecommendation, DispatchResponse,
    DispatchStatus, FallbackRecommendation, HospitalSummary, PerformanceMetrics, RequestState,
    RouteSummary,
};
use crate::request::{EmergencyRequest, ValidatedRequest};
use crate::route::{RouteOptimizer, RouteStats};
use crate::DispatchResult;

const FALLBACK_MESSAGE: &str = "Using standard emergency protocols";
const FALLBACK_GUIDANCE: &str = "Dispatch to nearest available hospital using standard routes";

// ── Builder ───────────────────────────────────────────────────────────────────

/// Fluent builder for [`DispatchOrchestrator`].
///
/// | Method              | Default                                   |
/// |---------------------|-------------------------------------------|
/// | `.hospitals(v)`     | no hospitals (every call falls back)      |
/// | `.router(r)`        | `MultiObjectiveRouter::default()`         |
/// | `.context_source(s)`| `StaticContextSource` at local time       |
/// | `.config(c)`        | `DispatchConfig::default()`               |
/// | `.sink(s)`          | none                                      |
pub struct OrchestratorBuilder {
    network:   RoadNetwork,
    engine:    TrafficPredictionEngine,
    hospitals: Vec<Hospital>,
    router:    Option<Arc<dyn Router>>,
    context:   Option<Arc<dyn ContextSource>>,
    config:    DispatchConfig,
    sinks:     Vec<Arc<dyn DispatchSink>>,
}

impl OrchestratorBuilder {
    pub fn new(network: RoadNetwork, engine: TrafficPredictionEngine) -> Self {
        Self {
            network,
            engine,
            hospitals: Vec::new(),
            router: None,
            context: None,
            config: DispatchConfig::default(),
            sinks: Vec::new(),
        }
    }

    pub fn hospitals(mut self, hospitals: Vec<Hospital>) -> Self {
        self.hospitals = hospitals;
        self
    }

    pub fn router(mut self, router: impl Router + 'static) -> Self {
        self.router = Some(Arc::new(router));
        self
    }

    pub fn context_source(mut self, source: Arc<dyn ContextSource>) -> Self {
        self.context = Some(source);
        self
    }

    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn DispatchSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn build(self) -> DispatchResult<DispatchOrchestrator> {
        self.config.validate()?;
        let hospitals = HospitalRegistry::new(self.config.weights.clone());
        hospitals.load(self.hospitals)?;

        let source = self
            .context
            .unwrap_or_else(|| Arc::new(StaticContextSource::at(Local::now().naive_local())));
        let engine = self.engine.with_policy(self.config.speed_policy());

        Ok(DispatchOrchestrator {
            network: Snapshot::new(self.network),
            engine: Snapshot::new(engine),
            hospitals,
            router: self.router.unwrap_or_else(|| Arc::new(MultiObjectiveRouter::default())),
            context: ContextGatherer::new(source, self.config.context_timeout()),
            config: self.config,
            sinks: self.sinks,
        })
    }
}

// ── Outputs other than recommendations ────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub status: String,
    pub models_loaded: usize,
    pub best_model: Option<String>,
    pub network_nodes: usize,
    pub network_edges: usize,
    pub hospitals_loaded: usize,
    pub network_version: u64,
    pub model_version: u64,
    pub hospital_version: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrafficOutlook {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub current_conditions: ConditionsSummary,
    pub route_distance_km: f64,
    pub base_duration_min: f64,
    /// `true` when no road route exists and the figures above are a
    /// straight-line estimate.
    pub route_estimated: bool,
    /// `None` when no model is trained.
    pub current: Option<TrafficPrediction>,
    pub predictions: TrafficForecast,
    pub degradations: Vec<Degradation>,
}

// ── Per-request internals ─────────────────────────────────────────────────────

struct RequestTrace {
    label: String,
    states: Vec<RequestState>,
}

impl RequestTrace {
    fn new(label: String) -> Self {
        debug!("{label}: {:?}", RequestState::Received);
        Self { label, states: vec![RequestState::Received] }
    }

    fn advance(&mut self, next: RequestState) {
        if let Some(&last) = self.states.last() {
            debug_assert!(last.can_advance_to(next), "{last:?} -> {next:?}");
        }
        debug!("{}: {next:?}", self.label);
        self.states.push(next);
    }
}

/// Inputs shared by every candidate worker of one request.  Owned, so a
/// worker that outlives its request keeps them alive on its own.
struct EvalScope {
    network:    Arc<Versioned<RoadNetwork>>,
    engine:     Arc<Versioned<TrafficPredictionEngine>>,
    router:     Arc<dyn Router>,
    context:    ContextSnapshot,
    features:   FeatureVector,
    origin:     GeoPoint,
    priority:   Priority,
    policy:     SpeedPolicy,
    routes:     usize,
    /// Predicted current multiplier; `None` uses the live traffic ratio.
    multiplier: Option<f64>,
}

struct Evaluated {
    rank:       usize,
    hospital:   Hospital,
    route:      RouteCandidate,
    stats:      RouteStats,
    prediction: TravelTimePrediction,
}

impl Evaluated {
    fn total_time(&self) -> f64 {
        self.prediction.travel_time_min + self.hospital.current_wait_time
    }
}

enum Outcome {
    Evaluated(Box<Evaluated>),
    /// No road route; straight-line travel estimate in minutes.
    Estimated { rank: usize, hospital: Hospital, travel_min: f64 },
    Failed,
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

pub struct DispatchOrchestrator {
    network:   Snapshot<RoadNetwork>,
    engine:    Snapshot<TrafficPredictionEngine>,
    hospitals: HospitalRegistry,
    router:    Arc<dyn Router>,
    context:   ContextGatherer,
    config:    DispatchConfig,
    sinks:     Vec<Arc<dyn DispatchSink>>,
}

impl DispatchOrchestrator {
    pub fn builder(network: RoadNetwork, engine: TrafficPredictionEngine) -> OrchestratorBuilder {
        OrchestratorBuilder::new(network, engine)
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn hospitals(&self) -> &HospitalRegistry {
        &self.hospitals
    }

    pub fn network(&self) -> Arc<Versioned<RoadNetwork>> {
        self.network.current()
    }

    pub fn engine(&self) -> Arc<Versioned<TrafficPredictionEngine>> {
        self.engine.current()
    }

    /// Swap in a rebuilt network.  Requests already running finish on the
    /// old one.
    pub fn publish_network(&self, network: RoadNetwork) -> u64 {
        let version = self.network.publish(network);
        info!("road network v{version} published");
        version
    }

    /// Swap in a retrained model set.
    pub fn publish_engine(&self, engine: TrafficPredictionEngine) -> u64 {
        let version = self.engine.publish(engine.with_policy(self.config.speed_policy()));
        info!("traffic models v{version} published");
        version
    }

    pub fn status(&self) -> SystemStatus {
        let network = self.network.current();
        let engine = self.engine.current();
        SystemStatus {
            status: "operational".into(),
            models_loaded: engine.model_count(),
            best_model: engine.best_model().map(|k| k.to_string()),
            network_nodes: network.node_count(),
            network_edges: network.edge_count(),
            hospitals_loaded: self.hospitals.len(),
            network_version: network.version,
            model_version: engine.version,
            hospital_version: self.hospitals.version(),
        }
    }

    /// Decide hospital and route for one call.
    ///
    /// Only malformed input is an error.  Everything that goes wrong after
    /// validation degrades the response instead.
    pub fn handle_emergency(&self, request: &EmergencyRequest) -> CoreResult<DispatchResponse> {
        let started = Instant::now();
        let network = self.network.current();
        let engine = self.engine.current();
        let hospitals = self.hospitals.current();

        let validated = request.validate(network.bounds())?;
        let mut trace = RequestTrace::new(
            validated.call_id.clone().unwrap_or_else(|| format!("call@{}", validated.location)),
        );
        let mut degradations = Vec::new();

        let (context, ctx_degradations) = self.context.gather(validated.location, validated.location);
        degradations.extend(ctx_degradations);
        trace.advance(RequestState::ContextReady);

        let ranked = rank_hospitals(
            &hospitals,
            validated.location,
            validated.patient.condition,
            &context.contextual,
            self.hospitals.weights(),
        );
        if ranked.is_empty() {
            warn!("{}: no emergency-capable hospital loaded", trace.label);
            return Ok(self.finish_fallback(&validated, &hospitals, degradations, trace, started));
        }
        trace.advance(RequestState::HospitalsRanked);

        let features = FeatureVector::from_context(&context);
        let multiplier = match engine.predict(&features) {
            Ok(p) => Some(p.multiplier),
            Err(TrafficError::ModelNotTrained) => {
                warn!("{}: traffic model not trained, using base durations", trace.label);
                degradations.push(Degradation::ModelNotTrained);
                None
            }
            Err(e) => {
                warn!("{}: current multiplier unavailable: {e}", trace.label);
                None
            }
        };
        let top = &ranked[..ranked.len().min(self.config.top_n)];
        let scope = Arc::new(EvalScope {
            network: Arc::clone(&network),
            engine: Arc::clone(&engine),
            router: Arc::clone(&self.router),
            context,
            features,
            origin: validated.location,
            priority: validated.patient.priority,
            policy: self.config.speed_policy(),
            routes: self.config.routes_per_hospital,
            multiplier,
        });

        let deadline = Instant::now() + self.config.candidate_timeout();
        let (tx, rx) = mpsc::sync_channel(top.len());
        for (rank, candidate) in top.iter().enumerate() {
            let tx = tx.clone();
            let scope = Arc::clone(&scope);
            let hospital = candidate.hospital.clone();
            let estimate_min = self.config.straight_line_minutes(candidate.distance_km);
            thread::spawn(move || {
                let result = evaluate_candidate(&scope, rank, hospital, estimate_min);
                // The receiver is gone if the request already gave up.
                let _ = tx.send((rank, result));
            });
        }
        drop(tx);

        let mut slots: Vec<Option<(Outcome, Vec<Degradation>)>> = top.iter().map(|_| None).collect();
        let mut pending = top.len();
        while pending > 0 {
            let wait = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(wait) {
                Ok((rank, result)) => {
                    slots[rank] = Some(result);
                    pending -= 1;
                }
                Err(mpsc::RecvTimeoutError::Timeout | mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
        let results: Vec<(Outcome, Vec<Degradation>)> = slots
            .into_iter()
            .zip(top)
            .map(|(slot, candidate)| {
                slot.unwrap_or_else(|| {
                    let id = candidate.hospital.id;
                    warn!("{}: {id} missed its {:?} deadline", trace.label, self.config.candidate_timeout());
                    (Outcome::Failed, vec![Degradation::CandidateTimeout { hospital: id }])
                })
            })
            .collect();

        let mut evaluated = Vec::new();
        let mut estimated = Vec::new();
        for (outcome, found) in results {
            degradations.extend(found);
            match outcome {
                Outcome::Evaluated(e) => evaluated.push(*e),
                Outcome::Estimated { rank, hospital, travel_min } => estimated.push((rank, hospital, travel_min)),
                Outcome::Failed => {}
            }
        }

        if evaluated.is_empty() {
            warn!("{}: no candidate hospital could be evaluated", trace.label);
            return Ok(self.finish_fallback(&validated, &hospitals, degradations, trace, started));
        }
        trace.advance(RequestState::RoutesGenerated);
        trace.advance(RequestState::Predicted);

        evaluated.sort_by(|a, b| {
            a.total_time()
                .total_cmp(&b.total_time())
                .then(b.prediction.confidence.total_cmp(&a.prediction.confidence))
                .then(a.hospital.id.cmp(&b.hospital.id))
        });
        estimated.sort_by(|a, b| {
            (a.2 + a.1.current_wait_time)
                .total_cmp(&(b.2 + b.1.current_wait_time))
                .then(a.1.id.cmp(&b.1.id))
        });

        let mut ranked_options = evaluated.into_iter();
        let Some(winner) = ranked_options.next() else {
            return Ok(self.finish_fallback(&validated, &hospitals, degradations, trace, started));
        };
        let alternatives: Vec<AlternativeOption> = ranked_options
            .map(|e| AlternativeOption {
                hospital_id: e.hospital.id,
                hospital_name: e.hospital.name.clone(),
                travel_time_min: e.prediction.travel_time_min,
                total_time_min: e.total_time(),
                rank: e.rank + 1,
                estimated: false,
            })
            .chain(estimated.into_iter().map(|(rank, h, travel)| AlternativeOption {
                hospital_id: h.id,
                hospital_name: h.name.clone(),
                travel_time_min: travel,
                total_time_min: travel + h.current_wait_time,
                rank: rank + 1,
                estimated: true,
            }))
            .take(self.config.alternatives)
            .collect();

        trace.advance(RequestState::Recommended);
        let recommendation =
            self.build_recommendation(validated, winner, alternatives, &scope.context, degradations, trace, started);
        info!(
            "{}: {} via {} route, {:.1} min (confidence {:.2})",
            recommendation.call_id.as_deref().unwrap_or("call"),
            recommendation.recommended_hospital.name,
            recommendation.optimal_route.algorithm,
            recommendation.optimal_route.estimated_time_min,
            recommendation.optimal_route.confidence,
        );
        let response = DispatchResponse::Optimized(recommendation);
        self.record(&response, started);
        Ok(response)
    }

    /// Multi-horizon traffic forecast for a trip.
    ///
    /// An empty `horizons` slice uses the configured horizons.
    pub fn predict_traffic(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        horizons: &[u32],
    ) -> CoreResult<TrafficOutlook> {
        let network = self.network.current();
        let engine = self.engine.current();
        for point in [origin, destination] {
            if !point.is_valid() {
                return Err(CoreError::InvalidInput(format!("{point} is not a valid location")));
            }
            if !network.bounds().contains_with_tolerance(point) {
                return Err(CoreError::OutOfBounds { point });
            }
        }
        let horizons = if horizons.is_empty() { &self.config.horizons[..] } else { horizons };

        let (context, mut degradations) = self.context.gather(origin, destination);
        let optimizer = RouteOptimizer::new(&network, self.router.as_ref());
        let (distance_km, base_min, route_estimated) =
            match optimizer.route_options(origin, destination, &context, 1, VehicleClass::Civilian) {
                Ok(routes) if !routes.is_empty() => {
                    (routes[0].total_distance_km(), routes[0].base_duration_min(), false)
                }
                _ => {
                    let km = origin.distance_km(destination);
                    (km, self.config.straight_line_minutes(km), true)
                }
            };

        let features = FeatureVector::from_context(&context).with_route(distance_km, base_min);
        let (current, predictions) = match engine.predict(&features) {
            Ok(current) => match engine.predict_horizons(&features, horizons) {
                Ok(forecast) => (Some(current), forecast),
                Err(e) => {
                    warn!("horizon forecast failed: {e}");
                    (Some(current), TrafficForecast::new())
                }
            },
            Err(TrafficError::ModelNotTrained) => {
                degradations.push(Degradation::ModelNotTrained);
                (None, TrafficForecast::new())
            }
            Err(e) => {
                warn!("traffic prediction failed: {e}");
                (None, TrafficForecast::new())
            }
        };

        Ok(TrafficOutlook {
            origin,
            destination,
            current_conditions: ConditionsSummary::from(&context),
            route_distance_km: distance_km,
            base_duration_min: base_min,
            route_estimated,
            current,
            predictions,
            degradations,
        })
    }

    // ── Response assembly ─────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn build_recommendation(
        &self,
        request: ValidatedRequest,
        winner: Evaluated,
        alternatives: Vec<AlternativeOption>,
        context: &ContextSnapshot,
        degradations: Vec<Degradation>,
        trace: RequestTrace,
        started: Instant,
    ) -> DispatchRecommendation {
        let now = Utc::now();
        let p = winner.prediction;
        let route_efficiency = if p.normal_travel_time_min > 0.0 {
            p.time_saved_min / p.normal_travel_time_min
        } else {
            0.0
        };
        DispatchRecommendation {
            status: DispatchStatus::Optimized,
            call_id: request.call_id,
            timestamp: now,
            emergency_location: request.location,
            patient: request.patient,
            recommended_hospital: HospitalSummary::from(&winner.hospital),
            optimal_route: RouteSummary {
                algorithm: winner.route.algorithm.as_str().to_string(),
                coordinates: winner.stats.coordinates,
                distance_km: winner.stats.total_distance_km,
                estimated_time_min: p.travel_time_min,
                normal_travel_time_min: p.normal_travel_time_min,
                time_saved_min: p.time_saved_min,
                confidence: p.confidence,
            },
            alternatives,
            current_conditions: ConditionsSummary::from(context),
            eta_minutes: p.travel_time_min,
            eta: now + chrono::Duration::milliseconds((p.travel_time_min * 60_000.0).round() as i64),
            performance: PerformanceMetrics {
                processing_time_ms: elapsed_ms(started),
                confidence_score: p.confidence,
                route_efficiency,
            },
            degradations,
            states: trace.states,
        }
    }

    fn finish_fallback(
        &self,
        request: &ValidatedRequest,
        hospitals: &[Hospital],
        degradations: Vec<Degradation>,
        mut trace: RequestTrace,
        started: Instant,
    ) -> DispatchResponse {
        trace.advance(RequestState::Failed);
        trace.advance(RequestState::Fallback);

        let nearest = nearest_hospital(hospitals, request.location);
        let fallback = FallbackRecommendation {
            status: DispatchStatus::Fallback,
            call_id: request.call_id.clone(),
            timestamp: Utc::now(),
            emergency_location: request.location,
            patient: request.patient.clone(),
            message: FALLBACK_MESSAGE.to_string(),
            recommendation: FALLBACK_GUIDANCE.to_string(),
            nearest_hospital: nearest.map(|(h, _)| HospitalSummary::from(h)),
            straight_line_km: nearest.map(|(_, km)| km),
            estimated_time_min: nearest.map(|(_, km)| self.config.straight_line_minutes(km)),
            degradations,
            states: trace.states,
        };
        warn!(
            "{}: fallback to {}",
            trace.label,
            fallback.nearest_hospital.as_ref().map_or("no hospital", |h| h.name.as_str())
        );
        let response = DispatchResponse::Fallback(fallback);
        self.record(&response, started);
        response
    }

    fn record(&self, response: &DispatchResponse, started: Instant) {
        if self.sinks.is_empty() {
            return;
        }
        let entry = DispatchLogEntry::from_response(response, elapsed_ms(started));
        for sink in &self.sinks {
            if let Err(e) = sink.record(&entry) {
                warn!("dispatch log write failed: {e}");
            }
        }
    }
}

// ── Candidate evaluation ──────────────────────────────────────────────────────

/// Route search and travel-time prediction for one hospital.  Runs on a
/// worker thread; `estimate_min` is the straight-line travel estimate used
/// when no road route exists.
fn evaluate_candidate(
    scope: &EvalScope,
    rank: usize,
    hospital: Hospital,
    estimate_min: f64,
) -> (Outcome, Vec<Degradation>) {
    let id = hospital.id;
    let mut degradations = Vec::new();

    let mut optimizer = RouteOptimizer::new(&scope.network, scope.router.as_ref())
        .with_policy(scope.policy.clone())
        .with_priority(scope.priority);
    if let Some(m) = scope.multiplier {
        optimizer = optimizer.with_traffic_multiplier(m);
    }

    let routes = match optimizer.route_options(
        scope.origin,
        hospital.location,
        &scope.context,
        scope.routes,
        VehicleClass::Ambulance,
    ) {
        Ok(routes) if !routes.is_empty() => routes,
        Ok(_) | Err(SpatialError::NoRoute { .. }) => {
            debug!("no road route to {id}, using straight-line estimate");
            degradations.push(Degradation::NoRouteFound { hospital: id });
            return (Outcome::Estimated { rank, hospital, travel_min: estimate_min }, degradations);
        }
        Err(e) => {
            warn!("route search to {id} failed: {e}");
            degradations.push(Degradation::CandidateFailed { hospital: id, reason: e.to_string() });
            return (Outcome::Failed, degradations);
        }
    };

    let mut best: Option<(RouteCandidate, TravelTimePrediction)> = None;
    let mut prediction_failed = None;
    for route in routes {
        let prediction = predict_route(scope, &route).unwrap_or_else(|e| {
            prediction_failed = Some(e.to_string());
            TravelTimePrediction::baseline(route.base_duration_min(), &scope.policy)
        });
        let improves = best.as_ref().is_none_or(|(_, b)| {
            prediction.travel_time_min < b.travel_time_min
                || (prediction.travel_time_min == b.travel_time_min && prediction.confidence > b.confidence)
        });
        if improves {
            best = Some((route, prediction));
        }
    }
    if let Some(reason) = prediction_failed {
        degradations.push(Degradation::PredictionFailed { hospital: id, reason });
    }

    let Some((route, prediction)) = best else {
        return (Outcome::Failed, degradations);
    };
    match optimizer.route_stats(&route.path, &scope.context) {
        Ok(stats) => {
            let evaluated = Evaluated { rank, hospital, route, stats, prediction };
            (Outcome::Evaluated(Box::new(evaluated)), degradations)
        }
        Err(e) => {
            degradations.push(Degradation::CandidateFailed { hospital: id, reason: e.to_string() });
            (Outcome::Failed, degradations)
        }
    }
}

fn predict_route(
    scope: &EvalScope,
    route: &RouteCandidate,
) -> Result<TravelTimePrediction, TrafficError> {
    let base = route.base_duration_min();
    let features = scope.features.clone().with_route(route.total_distance_km(), base);
    match scope.engine.predict_travel_time_with(&scope.policy, &features, base, VehicleClass::Ambulance, scope.priority) {
        Err(TrafficError::ModelNotTrained) => Ok(TravelTimePrediction::baseline(base, &scope.policy)),
        other => other,
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1_000.0
}

