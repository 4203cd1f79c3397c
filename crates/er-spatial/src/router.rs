//! Multi-objective route search.
//!
//! # Diversity
//!
//! [`MultiObjectiveRouter`] does not enumerate k-shortest paths of a single
//! objective (which mostly yields the same corridor with small detours).
//! Instead it runs Dijkstra once per [`SearchObjective`]:
//!
//! | Objective     | Edge weight                                         |
//! |---------------|-----------------------------------------------------|
//! | `Fastest`     | caller's cost function                              |
//! | `Shortest`    | edge length                                         |
//! | `FewestTurns` | 1 per segment                                       |
//! | `Alternative` | caller's cost, edges already used penalized         |
//!
//! Every objective breaks its own ties on the caller's cost.  Results are
//! de-duplicated by node path, re-scored under the caller's cost and sorted
//! ascending; ties go to lower total distance, then the lexicographically
//! smaller node sequence.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::fmt;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use er_core::{EdgeId, NodeId};

use crate::network::RoadNetwork;
use crate::{SpatialError, SpatialResult};

/// Weight given to the caller's cost when it only breaks ties.
const TIE_WEIGHT: f64 = 1e-9;

// ── Cost functions ────────────────────────────────────────────────────────────

/// Per-edge traversal cost.  Non-finite or negative costs mark an edge as
/// impassable.
pub trait EdgeCost: Sync {
    fn edge_cost(&self, network: &RoadNetwork, edge: EdgeId) -> f64;
}

impl<F> EdgeCost for F
where
    F: Fn(&RoadNetwork, EdgeId) -> f64 + Sync,
{
    #[inline]
    fn edge_cost(&self, network: &RoadNetwork, edge: EdgeId) -> f64 {
        self(network, edge)
    }
}

/// Free-flow travel time in seconds.
pub struct BaseTravelTime;

impl EdgeCost for BaseTravelTime {
    #[inline]
    fn edge_cost(&self, network: &RoadNetwork, edge: EdgeId) -> f64 {
        network.edge_travel_secs(edge)
    }
}

// ── Objectives ────────────────────────────────────────────────────────────────

/// Which search objective produced a candidate.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchObjective {
    Fastest,
    Shortest,
    FewestTurns,
    Alternative,
}

impl SearchObjective {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchObjective::Fastest     => "fastest",
            SearchObjective::Shortest    => "shortest",
            SearchObjective::FewestTurns => "fewest_turns",
            SearchObjective::Alternative => "alternative",
        }
    }
}

impl fmt::Display for SearchObjective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── RouteCandidate ────────────────────────────────────────────────────────────

/// One candidate path between two nodes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteCandidate {
    /// Nodes from origin to destination inclusive.
    pub path: Vec<NodeId>,
    /// Edges traversed, `path.len() - 1` of them.
    pub edges: Vec<EdgeId>,
    pub algorithm: SearchObjective,
    pub total_distance_m: f64,
    /// Free-flow duration in seconds.
    pub base_duration_secs: f64,
    /// Total cost under the cost function of the search that returned it.
    pub cost: f64,
}

impl RouteCandidate {
    pub fn total_distance_km(&self) -> f64 {
        self.total_distance_m / 1_000.0
    }

    pub fn base_duration_min(&self) -> f64 {
        self.base_duration_secs / 60.0
    }

    pub fn segment_count(&self) -> usize {
        self.edges.len()
    }

    /// `true` if origin and destination are the same node.
    pub fn is_trivial(&self) -> bool {
        self.edges.is_empty()
    }

    fn from_edges(
        network: &RoadNetwork,
        origin: NodeId,
        edges: Vec<EdgeId>,
        algorithm: SearchObjective,
        cost: &dyn EdgeCost,
    ) -> Self {
        let mut path = Vec::with_capacity(edges.len() + 1);
        path.push(origin);
        path.extend(edges.iter().map(|e| network.edge_to[e.index()]));
        let total_distance_m = edges.iter().map(|e| network.edge_length_m[e.index()]).sum();
        let base_duration_secs = edges.iter().map(|&e| network.edge_travel_secs(e)).sum();
        let total_cost = edges.iter().map(|&e| cost.edge_cost(network, e)).sum();
        Self { path, edges, algorithm, total_distance_m, base_duration_secs, cost: total_cost }
    }
}

// ── Router trait ──────────────────────────────────────────────────────────────

/// Pluggable route search.
///
/// Implementations must be `Send + Sync`: one router is shared by every
/// concurrently running dispatch request.
pub trait Router: Send + Sync {
    /// Return up to `k` distinct paths from `origin` to `destination`,
    /// ascending by cost under `cost`.
    ///
    /// Fails with [`SpatialError::NoRoute`] when the two nodes are not
    /// connected.
    fn find_routes(
        &self,
        network: &RoadNetwork,
        origin: NodeId,
        destination: NodeId,
        k: usize,
        cost: &dyn EdgeCost,
    ) -> SpatialResult<Vec<RouteCandidate>>;
}

// ── MultiObjectiveRouter ──────────────────────────────────────────────────────

/// Default [`Router`]: one Dijkstra run per objective.
#[derive(Clone, Debug)]
pub struct MultiObjectiveRouter {
    /// Extra relative cost per round on edges already used by a candidate.
    pub alternative_penalty: f64,
    /// How many penalized rounds to try when the fixed objectives did not
    /// yield `k` distinct paths.
    pub max_alternative_rounds: usize,
}

impl Default for MultiObjectiveRouter {
    fn default() -> Self {
        Self { alternative_penalty: 0.6, max_alternative_rounds: 4 }
    }
}

impl Router for MultiObjectiveRouter {
    fn find_routes(
        &self,
        network: &RoadNetwork,
        origin: NodeId,
        destination: NodeId,
        k: usize,
        cost: &dyn EdgeCost,
    ) -> SpatialResult<Vec<RouteCandidate>> {
        for node in [origin, destination] {
            if !network.contains_node(node) {
                return Err(SpatialError::NodeNotFound(node));
            }
        }
        if k == 0 {
            return Ok(Vec::new());
        }
        if origin == destination {
            return Ok(vec![RouteCandidate::from_edges(
                network, origin, Vec::new(), SearchObjective::Fastest, cost,
            )]);
        }

        let mut found: Vec<RouteCandidate> = Vec::with_capacity(k);
        let mut seen: HashSet<Vec<NodeId>> = HashSet::new();
        let mut accept = |edges: Vec<EdgeId>, objective: SearchObjective, found: &mut Vec<RouteCandidate>| {
            let cand = RouteCandidate::from_edges(network, origin, edges, objective, cost);
            if seen.insert(cand.path.clone()) {
                found.push(cand);
            }
        };

        // Fastest first: if it fails the nodes are disconnected and every
        // other objective would fail too.
        let (edges, _) = shortest_path(network, origin, destination, cost)?;
        accept(edges, SearchObjective::Fastest, &mut found);

        let by_length = |n: &RoadNetwork, e: EdgeId| {
            n.edge_length_m[e.index()] + TIE_WEIGHT * cost.edge_cost(n, e)
        };
        let by_segments = |n: &RoadNetwork, e: EdgeId| 1.0 + TIE_WEIGHT * cost.edge_cost(n, e);

        if found.len() < k {
            let (edges, _) = shortest_path(network, origin, destination, &by_length)?;
            accept(edges, SearchObjective::Shortest, &mut found);
        }
        if found.len() < k {
            let (edges, _) = shortest_path(network, origin, destination, &by_segments)?;
            accept(edges, SearchObjective::FewestTurns, &mut found);
        }

        let mut round = 1;
        while found.len() < k && round <= self.max_alternative_rounds {
            let used: HashSet<EdgeId> = found.iter().flat_map(|c| c.edges.iter().copied()).collect();
            let factor = 1.0 + self.alternative_penalty * round as f64;
            let penalized = |n: &RoadNetwork, e: EdgeId| {
                let c = cost.edge_cost(n, e);
                if used.contains(&e) { c * factor } else { c }
            };
            let (edges, _) = shortest_path(network, origin, destination, &penalized)?;
            accept(edges, SearchObjective::Alternative, &mut found);
            round += 1;
        }

        found.sort_by(|a, b| {
            a.cost
                .total_cmp(&b.cost)
                .then(a.total_distance_m.total_cmp(&b.total_distance_m))
                .then_with(|| a.path.cmp(&b.path))
        });
        found.truncate(k);
        Ok(found)
    }
}

// ── Dijkstra ──────────────────────────────────────────────────────────────────

/// Single-objective Dijkstra over the CSR graph.
///
/// Returns the edge sequence and its total cost.  Heap ties are broken by
/// `NodeId`, so results are deterministic.
pub fn shortest_path(
    network: &RoadNetwork,
    from: NodeId,
    to: NodeId,
    cost: &dyn EdgeCost,
) -> SpatialResult<(Vec<EdgeId>, f64)> {
    for node in [from, to] {
        if !network.contains_node(node) {
            return Err(SpatialError::NodeNotFound(node));
        }
    }
    if from == to {
        return Ok((Vec::new(), 0.0));
    }

    let n = network.node_count();
    let mut dist = vec![f64::INFINITY; n];
    let mut prev_edge = vec![EdgeId::INVALID; n];
    dist[from.index()] = 0.0;

    let mut heap: BinaryHeap<Reverse<(OrderedFloat<f64>, NodeId)>> = BinaryHeap::new();
    heap.push(Reverse((OrderedFloat(0.0), from)));

    while let Some(Reverse((OrderedFloat(d), node))) = heap.pop() {
        if node == to {
            return Ok((reconstruct(network, &prev_edge, to), d));
        }
        if d > dist[node.index()] {
            continue;
        }
        for edge in network.out_edges(node) {
            let w = cost.edge_cost(network, edge);
            if !w.is_finite() || w < 0.0 {
                continue;
            }
            let neighbor = network.edge_to[edge.index()];
            let next = d + w;
            if next < dist[neighbor.index()] {
                dist[neighbor.index()] = next;
                prev_edge[neighbor.index()] = edge;
                heap.push(Reverse((OrderedFloat(next), neighbor)));
            }
        }
    }

    Err(SpatialError::NoRoute { from, to })
}

fn reconstruct(network: &RoadNetwork, prev_edge: &[EdgeId], to: NodeId) -> Vec<EdgeId> {
    let mut edges = Vec::new();
    let mut cur = to;
    loop {
        let e = prev_edge[cur.index()];
        if e == EdgeId::INVALID {
            break;
        }
        edges.push(e);
        cur = network.edge_from[e.index()];
    }
    edges.reverse();
    edges
}
