//! Road network representation and builder.
//!
//! # Data layout
//!
//! The graph uses **Compressed Sparse Row (CSR)** format for outgoing edges.
//! Given a `NodeId n`, its outgoing edges occupy the slice:
//!
//! ```text
//! edge_to[ node_out_start[n] .. node_out_start[n+1] ]
//! ```
//!
//! All edge arrays are sorted by source node and indexed by `EdgeId`, so a
//! node's outgoing edges are a contiguous scan in Dijkstra's inner loop.
//!
//! # Immutability
//!
//! A `RoadNetwork` has no mutating methods after [`RoadNetworkBuilder::build`].
//! Rebuilding for new bounds produces a new instance that is published
//! through an `er_core::Snapshot`; requests never see a network change under
//! them.

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use er_core::{CityBounds, EdgeId, GeoPoint, NodeId};

use crate::{SpatialError, SpatialResult};

// ── Road class ────────────────────────────────────────────────────────────────

/// Functional class of a road segment.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadClass {
    /// High-capacity corridor; fast free-flow but absorbs most congestion.
    Arterial,
    #[default]
    Local,
}

impl RoadClass {
    /// Share of the city-wide congestion multiplier felt on this class of
    /// road.  1.0 = full effect.
    pub fn congestion_sensitivity(self) -> f64 {
        match self {
            RoadClass::Arterial => 1.0,
            RoadClass::Local    => 0.6,
        }
    }
}

// ── R-tree node entry ─────────────────────────────────────────────────────────

/// Entry stored in the R-tree spatial index: a 2-D `[lat, lon]` point with
/// the associated `NodeId`.
#[derive(Clone)]
struct NodeEntry {
    point: [f64; 2], // [lat, lon]
    id: NodeId,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    /// Squared Euclidean distance in lat/lon space.  Sufficient for
    /// nearest-node queries within a city.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlat = self.point[0] - point[0];
        let dlon = self.point[1] - point[1];
        dlat * dlat + dlon * dlon
    }
}

// ── RoadNetwork ───────────────────────────────────────────────────────────────

/// Directed road graph in CSR format plus a spatial index for node snapping.
///
/// Fields are `pub` for direct indexed access on hot paths.  Do not
/// construct directly; use [`RoadNetworkBuilder`] or [`RoadNetwork::build`].
pub struct RoadNetwork {
    // ── Node data ─────────────────────────────────────────────────────────
    /// Geographic position of each node.  Indexed by `NodeId`.
    pub node_pos: Vec<GeoPoint>,

    // ── CSR edge adjacency ────────────────────────────────────────────────
    /// CSR row pointer.  Length = `node_count + 1`.
    pub node_out_start: Vec<u32>,

    // ── Edge data (indexed by EdgeId = position in sorted order) ──────────
    /// Source node of each edge; used for route reconstruction.
    pub edge_from: Vec<NodeId>,

    /// Destination node of each edge.
    pub edge_to: Vec<NodeId>,

    /// Length of each edge in metres.
    pub edge_length_m: Vec<f64>,

    /// Free-flow travel time in milliseconds.
    pub edge_travel_ms: Vec<u32>,

    /// Functional class of each edge.
    pub edge_class: Vec<RoadClass>,

    // ── Spatial data ──────────────────────────────────────────────────────
    bounds: CityBounds,
    spatial_idx: RTree<NodeEntry>,
}

impl RoadNetwork {
    /// Construct an empty network with no nodes or edges.
    ///
    /// Any snapping request against it fails and any routing request
    /// returns [`SpatialError::NoRoute`].
    pub fn empty() -> Self {
        RoadNetworkBuilder::new().build()
    }

    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_pos.is_empty()
    }

    /// Serviceable region.  Either the bounds the network was built for or
    /// the bounding box of its nodes.
    pub fn bounds(&self) -> &CityBounds {
        &self.bounds
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// Iterator over the `EdgeId`s of all outgoing edges from `node`.
    #[inline]
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        (start..end).map(|i| EdgeId(i as u32))
    }

    /// Out-degree of `node` (number of outgoing edges).
    #[inline]
    pub fn out_degree(&self, node: NodeId) -> usize {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        end - start
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        node.index() < self.node_count()
    }

    pub fn position(&self, node: NodeId) -> SpatialResult<GeoPoint> {
        self.node_pos
            .get(node.index())
            .copied()
            .ok_or(SpatialError::NodeNotFound(node))
    }

    /// Free-flow traversal time of `edge` in seconds.
    #[inline]
    pub fn edge_travel_secs(&self, edge: EdgeId) -> f64 {
        self.edge_travel_ms[edge.index()] as f64 / 1_000.0
    }

    /// Fastest direct edge from `from` to `to`, if any.
    pub fn edge_between(&self, from: NodeId, to: NodeId) -> Option<EdgeId> {
        if !self.contains_node(from) {
            return None;
        }
        self.out_edges(from)
            .filter(|e| self.edge_to[e.index()] == to)
            .min_by_key(|e| self.edge_travel_ms[e.index()])
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// Return the `NodeId` of the nearest road node to `pos`.
    ///
    /// Returns `None` only if the network has no nodes.  Does not check
    /// bounds; see [`nearest_node`](Self::nearest_node).
    pub fn snap_to_node(&self, pos: GeoPoint) -> Option<NodeId> {
        self.spatial_idx
            .nearest_neighbor(&[pos.lat, pos.lon])
            .map(|e| e.id)
    }

    /// Snap `pos` to the closest graph node.
    ///
    /// Fails with [`SpatialError::OutOfBounds`] if `pos` is not a valid
    /// coordinate or lies beyond the bounds tolerance.
    pub fn nearest_node(&self, pos: GeoPoint) -> SpatialResult<NodeId> {
        if !pos.is_valid() || !self.bounds.contains_with_tolerance(pos) {
            return Err(SpatialError::OutOfBounds { point: pos });
        }
        self.snap_to_node(pos)
            .ok_or(SpatialError::OutOfBounds { point: pos })
    }

    /// Return up to `k` nearest nodes to `pos`, sorted by ascending distance.
    pub fn k_nearest_nodes(&self, pos: GeoPoint, k: usize) -> Vec<NodeId> {
        self.spatial_idx
            .nearest_neighbor_iter(&[pos.lat, pos.lon])
            .take(k)
            .map(|e| e.id)
            .collect()
    }
}

// ── RoadNetworkBuilder ────────────────────────────────────────────────────────

/// Construct a [`RoadNetwork`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use er_core::GeoPoint;
/// use er_spatial::RoadNetworkBuilder;
///
/// let mut b = RoadNetworkBuilder::new();
/// let a = b.add_node(GeoPoint::new(12.97, 77.59));
/// let c = b.add_node(GeoPoint::new(12.98, 77.60));
/// b.add_road(a, c, 1_200.0, 90_000); // 1.2 km, 90 s
/// let net = b.build();
/// assert_eq!(net.node_count(), 2);
/// assert_eq!(net.edge_count(), 2); // bidirectional
/// ```
pub struct RoadNetworkBuilder {
    nodes:     Vec<GeoPoint>,
    raw_edges: Vec<RawEdge>,
    bounds:    Option<CityBounds>,
}

struct RawEdge {
    from:      NodeId,
    to:        NodeId,
    length_m:  f64,
    travel_ms: u32,
    class:     RoadClass,
}

impl RoadNetworkBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new(), raw_edges: Vec::new(), bounds: None }
    }

    /// Pre-allocate for the expected number of nodes and edges.
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            nodes:     Vec::with_capacity(nodes),
            raw_edges: Vec::with_capacity(edges),
            bounds:    None,
        }
    }

    /// Declare the serviceable bounds.  Without this the bounding box of the
    /// nodes (with default tolerance) is used.
    pub fn bounds(&mut self, bounds: CityBounds) -> &mut Self {
        self.bounds = Some(bounds);
        self
    }

    /// Add a road node and return its `NodeId` (sequential from 0).
    pub fn add_node(&mut self, pos: GeoPoint) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(pos);
        id
    }

    /// Add a **directed** local-road edge from `from` to `to`.
    pub fn add_directed_edge(&mut self, from: NodeId, to: NodeId, length_m: f64, travel_ms: u32) {
        self.add_directed_edge_with_class(from, to, length_m, travel_ms, RoadClass::Local);
    }

    pub fn add_directed_edge_with_class(
        &mut self,
        from: NodeId,
        to: NodeId,
        length_m: f64,
        travel_ms: u32,
        class: RoadClass,
    ) {
        self.raw_edges.push(RawEdge { from, to, length_m, travel_ms, class });
    }

    /// Convenience: add edges in **both directions** for a two-way segment.
    pub fn add_road(&mut self, a: NodeId, b: NodeId, length_m: f64, travel_ms: u32) {
        self.add_road_with_class(a, b, length_m, travel_ms, RoadClass::Local);
    }

    pub fn add_road_with_class(
        &mut self,
        a: NodeId,
        b: NodeId,
        length_m: f64,
        travel_ms: u32,
        class: RoadClass,
    ) {
        self.add_directed_edge_with_class(a, b, length_m, travel_ms, class);
        self.add_directed_edge_with_class(b, a, length_m, travel_ms, class);
    }

    /// Look up the position of a node added earlier.
    pub fn node_pos(&self, id: NodeId) -> GeoPoint {
        self.nodes[id.index()]
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.raw_edges.len() }

    /// Consume the builder and produce a [`RoadNetwork`].
    ///
    /// Time complexity: O(E log E) for edge sort + O(N log N) for R-tree bulk
    /// load, where N = nodes, E = edges.
    pub fn build(self) -> RoadNetwork {
        let node_count = self.nodes.len();
        let edge_count = self.raw_edges.len();

        // Stable sort keeps insertion order among a node's edges, so edge
        // ids (and therefore routing tie-breaks) are reproducible.
        let mut raw = self.raw_edges;
        raw.sort_by_key(|e| e.from.0);

        let edge_from:      Vec<NodeId>    = raw.iter().map(|e| e.from).collect();
        let edge_to:        Vec<NodeId>    = raw.iter().map(|e| e.to).collect();
        let edge_length_m:  Vec<f64>       = raw.iter().map(|e| e.length_m).collect();
        let edge_travel_ms: Vec<u32>       = raw.iter().map(|e| e.travel_ms).collect();
        let edge_class:     Vec<RoadClass> = raw.iter().map(|e| e.class).collect();

        let mut node_out_start = vec![0u32; node_count + 1];
        for e in &raw {
            node_out_start[e.from.index() + 1] += 1;
        }
        for i in 1..=node_count {
            node_out_start[i] += node_out_start[i - 1];
        }
        debug_assert_eq!(node_out_start[node_count] as usize, edge_count);

        let entries: Vec<NodeEntry> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, &pos)| NodeEntry {
                point: [pos.lat, pos.lon],
                id: NodeId(i as u32),
            })
            .collect();
        let spatial_idx = RTree::bulk_load(entries);

        let bounds = self
            .bounds
            .or_else(|| CityBounds::enclosing(self.nodes.iter().copied()))
            .unwrap_or_default();

        RoadNetwork {
            node_pos: self.nodes,
            node_out_start,
            edge_from,
            edge_to,
            edge_length_m,
            edge_travel_ms,
            edge_class,
            bounds,
            spatial_idx,
        }
    }
}

impl Default for RoadNetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}
