//! `RouteOptimizer` — context-aware route candidates and route statistics.
//!
//! # Cost
//!
//! Edges are weighted by expected travel time under current conditions:
//!
//! ```text
//! cost(e) = base_secs(e) * (1 + (multiplier / speed_factor - 1) * sensitivity(e))
//! ```
//!
//! `multiplier` is the current traffic multiplier, `speed_factor` the
//! vehicle's speed advantage and `sensitivity` the road class's exposure to
//! congestion (arterials 1.0, local streets 0.6).  With a multiplier of 1 for
//! a civilian vehicle this is plain free-flow time.

use serde::{Deserialize, Serialize};

use er_core::{ContextSnapshot, EdgeId, GeoPoint, NodeId, Priority, VehicleClass};
use er_spatial::{RoadNetwork, RouteCandidate, Router, SpatialError, SpatialResult};
use er_traffic::SpeedPolicy;

/// Multipliers are clamped to this range before weighting edges.
const MULTIPLIER_RANGE: (f64, f64) = (0.1, 10.0);

/// Geometric and metric summary of one path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteStats {
    pub coordinates: Vec<GeoPoint>,
    pub total_distance_km: f64,
    /// Free-flow duration.
    pub base_duration_min: f64,
    /// Duration under the context's traffic ratio, weighted by road class.
    pub expected_duration_min: f64,
    pub num_segments: usize,
    /// Free-flow average speed; 0 for a trivial path.
    pub avg_speed_kmh: f64,
    pub straight_line_km: f64,
    /// Path length over straight-line distance; 1 for a trivial path.
    pub detour_ratio: f64,
}

pub struct RouteOptimizer<'a> {
    network: &'a RoadNetwork,
    router: &'a dyn Router,
    policy: SpeedPolicy,
    /// Selects the critical speed factor for ambulances.
    priority: Priority,
    /// Overrides the context's own traffic ratio when set.
    multiplier: Option<f64>,
}

impl<'a> RouteOptimizer<'a> {
    pub fn new(network: &'a RoadNetwork, router: &'a dyn Router) -> Self {
        Self {
            network,
            router,
            policy: SpeedPolicy::default(),
            priority: Priority::default(),
            multiplier: None,
        }
    }

    pub fn with_policy(mut self, policy: SpeedPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Use a predicted multiplier instead of the context's live ratio.
    pub fn with_traffic_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    pub fn network(&self) -> &RoadNetwork {
        self.network
    }

    /// The multiplier edges are weighted with for `context`.
    pub fn effective_multiplier(&self, context: &ContextSnapshot) -> f64 {
        let m = self.multiplier.unwrap_or_else(|| {
            context.traffic_legs.first().map_or(1.0, |leg| leg.traffic_ratio())
        });
        if m.is_finite() { m.clamp(MULTIPLIER_RANGE.0, MULTIPLIER_RANGE.1) } else { 1.0 }
    }

    /// Up to `num_routes` distinct candidates between the nodes nearest to
    /// `origin` and `destination`, ascending by context-adjusted cost.
    pub fn route_options(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        context: &ContextSnapshot,
        num_routes: usize,
        vehicle: VehicleClass,
    ) -> SpatialResult<Vec<RouteCandidate>> {
        let from = self.network.nearest_node(origin)?;
        let to = self.network.nearest_node(destination)?;
        let relative = self.effective_multiplier(context) / self.policy.speed_factor(vehicle, self.priority);
        let cost = move |n: &RoadNetwork, e: EdgeId| {
            let sensitivity = n.edge_class[e.index()].congestion_sensitivity();
            n.edge_travel_secs(e) * (1.0 + (relative - 1.0) * sensitivity)
        };
        self.router.find_routes(self.network, from, to, num_routes, &cost)
    }

    /// Deterministic summary of `path`; no external calls.
    ///
    /// Fails with [`SpatialError::BrokenPath`] if two consecutive nodes are
    /// not joined by an edge.
    pub fn route_stats(&self, path: &[NodeId], context: &ContextSnapshot) -> SpatialResult<RouteStats> {
        let mut coordinates = Vec::with_capacity(path.len());
        for &node in path {
            coordinates.push(self.network.position(node)?);
        }

        let multiplier = self.effective_multiplier(context);
        let (mut meters, mut secs, mut expected_secs) = (0.0, 0.0, 0.0);
        for pair in path.windows(2) {
            let edge = self
                .network
                .edge_between(pair[0], pair[1])
                .ok_or(SpatialError::BrokenPath(pair[0], pair[1]))?;
            let base = self.network.edge_travel_secs(edge);
            let sensitivity = self.network.edge_class[edge.index()].congestion_sensitivity();
            meters += self.network.edge_length_m[edge.index()];
            secs += base;
            expected_secs += base * (1.0 + (multiplier - 1.0) * sensitivity);
        }

        let total_distance_km = meters / 1_000.0;
        let straight_line_km = match (coordinates.first(), coordinates.last()) {
            (Some(a), Some(b)) => a.distance_km(*b),
            _ => 0.0,
        };
        Ok(RouteStats {
            num_segments: path.len().saturating_sub(1),
            avg_speed_kmh: if secs > 0.0 { total_distance_km / (secs / 3_600.0) } else { 0.0 },
            detour_ratio: if straight_line_km > 0.0 { total_distance_km / straight_line_km } else { 1.0 },
            base_duration_min: secs / 60.0,
            expected_duration_min: expected_secs / 60.0,
            total_distance_km,
            straight_line_km,
            coordinates,
        })
    }
}
