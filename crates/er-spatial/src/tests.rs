//! Unit tests for er-spatial.
//!
//! Most tests use a hand-crafted network so expected routes can be asserted
//! exactly; the grid tests exercise the synthetic builder.

#[cfg(test)]
mod helpers {
    use er_core::{GeoPoint, NodeId};
    use crate::{RoadClass, RoadNetwork, RoadNetworkBuilder};

    /// Small network with three genuinely different corridors from n0 to n5.
    ///
    /// ```text
    ///   n0 ──arterial── n1 ──arterial── n2 ──arterial── n5   fast, long
    ///    │                                              │
    ///    └──── n3 ──────────── n4 ──────────────────────┘    slow, short
    ///    │                                              │
    ///    └────────────────── n6 ────────────────────────┘    two segments
    /// ```
    pub fn corridors() -> (RoadNetwork, [NodeId; 7]) {
        let mut b = RoadNetworkBuilder::new();
        let n0 = b.add_node(GeoPoint::new(12.90, 77.50));
        let n1 = b.add_node(GeoPoint::new(12.92, 77.52));
        let n2 = b.add_node(GeoPoint::new(12.92, 77.56));
        let n3 = b.add_node(GeoPoint::new(12.90, 77.53));
        let n4 = b.add_node(GeoPoint::new(12.90, 77.56));
        let n5 = b.add_node(GeoPoint::new(12.90, 77.58));
        let n6 = b.add_node(GeoPoint::new(12.88, 77.54));

        // Fast: 3 × 60 s = 180 s, 3 × 4 km = 12 km, 4 segments incl. n2→n5
        b.add_road_with_class(n0, n1, 4_000.0, 60_000, RoadClass::Arterial);
        b.add_road_with_class(n1, n2, 4_000.0, 60_000, RoadClass::Arterial);
        b.add_road_with_class(n2, n5, 4_000.0, 60_000, RoadClass::Arterial);
        // Short: 3 × 2.5 km = 7.5 km but 3 × 150 s = 450 s
        b.add_road(n0, n3, 2_500.0, 150_000);
        b.add_road(n3, n4, 2_500.0, 150_000);
        b.add_road(n4, n5, 2_500.0, 150_000);
        // Two segments: 2 × 5 km = 10 km, 2 × 300 s = 600 s
        b.add_road(n0, n6, 5_000.0, 300_000);
        b.add_road(n6, n5, 5_000.0, 300_000);

        (b.build(), [n0, n1, n2, n3, n4, n5, n6])
    }
}

// ── Builder & network structure ────────────────────────────────────────────────

#[cfg(test)]
mod builder {
    use er_core::{GeoPoint, NodeId};
    use crate::RoadNetworkBuilder;

    #[test]
    fn empty_build() {
        let net = RoadNetworkBuilder::new().build();
        assert_eq!(net.node_count(), 0);
        assert_eq!(net.edge_count(), 0);
        assert!(net.is_empty());
    }

    #[test]
    fn csr_out_edges() {
        let (net, [n0, n1, _, _, _, n5, _]) = super::helpers::corridors();
        assert_eq!(net.out_degree(n0), 3);
        assert_eq!(net.out_degree(n1), 2);
        assert_eq!(net.out_degree(n5), 3);
        for e in net.out_edges(n0) {
            assert_eq!(net.edge_from[e.index()], n0);
        }
    }

    #[test]
    fn directed_only_edge() {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_node(GeoPoint::new(0.0, 0.0));
        let c = b.add_node(GeoPoint::new(0.0, 1.0));
        b.add_directed_edge(a, c, 100.0, 10_000);
        let net = b.build();
        assert_eq!(net.edge_count(), 1);
        assert_eq!(net.out_degree(c), 0);
        assert!(net.edge_between(a, c).is_some());
        assert!(net.edge_between(c, a).is_none());
        assert!(net.edge_between(NodeId(9), a).is_none());
    }

    #[test]
    fn bounds_default_to_node_extent() {
        let (net, _) = super::helpers::corridors();
        let b = net.bounds();
        assert_eq!(b.north, 12.92);
        assert_eq!(b.south, 12.88);
        assert_eq!(b.west, 77.50);
        assert_eq!(b.east, 77.58);
    }
}

// ── Spatial snap ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod snap {
    use er_core::GeoPoint;
    use crate::{RoadNetworkBuilder, SpatialError};

    #[test]
    fn snap_exact_and_nearest() {
        let (net, [n0, n1, ..]) = super::helpers::corridors();
        assert_eq!(net.nearest_node(GeoPoint::new(12.90, 77.50)).unwrap(), n0);
        assert_eq!(net.nearest_node(GeoPoint::new(12.919, 77.519)).unwrap(), n1);
    }

    #[test]
    fn slightly_outside_bounds_still_snaps() {
        let (net, [n0, ..]) = super::helpers::corridors();
        // 0.02° west of the western edge, inside the 0.05° tolerance.
        assert_eq!(net.nearest_node(GeoPoint::new(12.90, 77.48)).unwrap(), n0);
    }

    #[test]
    fn far_outside_bounds_rejected() {
        let (net, _) = super::helpers::corridors();
        let r = net.nearest_node(GeoPoint::new(28.61, 77.20));
        assert!(matches!(r, Err(SpatialError::OutOfBounds { .. })));
        let r = net.nearest_node(GeoPoint::new(f64::NAN, 77.5));
        assert!(matches!(r, Err(SpatialError::OutOfBounds { .. })));
    }

    #[test]
    fn empty_network_cannot_snap() {
        let net = RoadNetworkBuilder::new().build();
        assert!(net.snap_to_node(GeoPoint::new(12.97, 77.59)).is_none());
        assert!(net.nearest_node(GeoPoint::new(12.97, 77.59)).is_err());
    }

    #[test]
    fn k_nearest_order() {
        let (net, nodes) = super::helpers::corridors();
        let nearest = net.k_nearest_nodes(GeoPoint::new(12.90, 77.50), 2);
        assert_eq!(nearest[0], nodes[0]);
        assert_eq!(nearest.len(), 2);
    }
}

// ── Dijkstra ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod dijkstra {
    use er_core::{GeoPoint, NodeId};
    use crate::{BaseTravelTime, RoadNetworkBuilder, SpatialError, shortest_path};

    #[test]
    fn trivial_same_node() {
        let (net, [n0, ..]) = super::helpers::corridors();
        let (edges, cost) = shortest_path(&net, n0, n0, &BaseTravelTime).unwrap();
        assert!(edges.is_empty());
        assert_eq!(cost, 0.0);
    }

    #[test]
    fn fastest_follows_arterials() {
        let (net, [n0, n1, n2, _, _, n5, _]) = super::helpers::corridors();
        let (edges, cost) = shortest_path(&net, n0, n5, &BaseTravelTime).unwrap();
        assert_eq!(cost, 180.0);
        let nodes: Vec<NodeId> = edges.iter().map(|e| net.edge_to[e.index()]).collect();
        assert_eq!(nodes, vec![n1, n2, n5]);
    }

    #[test]
    fn impassable_edges_are_skipped() {
        let (net, [n0, _, _, n3, _, n5, _]) = super::helpers::corridors();
        // Close every arterial: the slow short corridor becomes fastest.
        let closed = |n: &crate::RoadNetwork, e: er_core::EdgeId| match n.edge_class[e.index()] {
            crate::RoadClass::Arterial => f64::INFINITY,
            crate::RoadClass::Local => n.edge_travel_secs(e),
        };
        let (edges, cost) = shortest_path(&net, n0, n5, &closed).unwrap();
        assert_eq!(cost, 450.0);
        assert_eq!(net.edge_to[edges[0].index()], n3);
    }

    #[test]
    fn no_route_disconnected() {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_node(GeoPoint::new(0.0, 0.0));
        let c = b.add_node(GeoPoint::new(1.0, 0.0));
        let net = b.build();
        let result = shortest_path(&net, a, c, &BaseTravelTime);
        assert!(matches!(result, Err(SpatialError::NoRoute { .. })));
    }

    #[test]
    fn unknown_node_rejected() {
        let (net, [n0, ..]) = super::helpers::corridors();
        let r = shortest_path(&net, n0, NodeId(99), &BaseTravelTime);
        assert!(matches!(r, Err(SpatialError::NodeNotFound(NodeId(99)))));
    }
}

// ── Multi-objective search ────────────────────────────────────────────────────

#[cfg(test)]
mod find_routes {
    use std::collections::HashSet;

    use er_core::{CityBounds, GeoPoint, NodeId, SeededRng};
    use crate::{
        BaseTravelTime, GridSpec, MultiObjectiveRouter, RoadNetwork, RoadNetworkBuilder, Router,
        SearchObjective, SpatialError,
    };

    #[test]
    fn objectives_produce_distinct_corridors() {
        let (net, [n0, n1, _, n3, _, n5, n6]) = super::helpers::corridors();
        let routes = MultiObjectiveRouter::default()
            .find_routes(&net, n0, n5, 3, &BaseTravelTime)
            .unwrap();

        assert_eq!(routes.len(), 3);
        assert_eq!(routes[0].algorithm, SearchObjective::Fastest);
        assert_eq!(routes[0].path[1], n1);
        assert_eq!(routes[1].algorithm, SearchObjective::Shortest);
        assert_eq!(routes[1].path[1], n3);
        assert_eq!(routes[2].algorithm, SearchObjective::FewestTurns);
        assert_eq!(routes[2].path, vec![n0, n6, n5]);

        assert_eq!(routes[0].cost, 180.0);
        assert_eq!(routes[1].total_distance_m, 7_500.0);
        assert_eq!(routes[2].segment_count(), 2);
    }

    #[test]
    fn k_limits_result_count() {
        let (net, [n0, _, _, _, _, n5, _]) = super::helpers::corridors();
        let router = MultiObjectiveRouter::default();
        assert!(router.find_routes(&net, n0, n5, 0, &BaseTravelTime).unwrap().is_empty());
        let one = router.find_routes(&net, n0, n5, 1, &BaseTravelTime).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].algorithm, SearchObjective::Fastest);
    }

    #[test]
    fn same_node_is_single_trivial_route() {
        let (net, [n0, ..]) = super::helpers::corridors();
        let routes = MultiObjectiveRouter::default()
            .find_routes(&net, n0, n0, 3, &BaseTravelTime)
            .unwrap();
        assert_eq!(routes.len(), 1);
        assert!(routes[0].is_trivial());
        assert_eq!(routes[0].path, vec![n0]);
    }

    #[test]
    fn disconnected_is_no_route() {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_node(GeoPoint::new(0.0, 0.0));
        let c = b.add_node(GeoPoint::new(0.0, 0.1));
        let d = b.add_node(GeoPoint::new(0.1, 0.1));
        b.add_road(a, c, 100.0, 10_000);
        let net = b.build();
        let r = MultiObjectiveRouter::default().find_routes(&net, a, d, 3, &BaseTravelTime);
        assert!(matches!(r, Err(SpatialError::NoRoute { .. })));
    }

    /// For random origin/destination pairs on the synthetic grid: at most k
    /// results, pairwise distinct paths, non-decreasing cost, valid paths.
    #[test]
    fn grid_properties_hold_for_random_pairs() {
        let net = RoadNetwork::build(CityBounds::default(), &GridSpec::default()).unwrap();
        let router = MultiObjectiveRouter::default();
        let mut rng = SeededRng::new(11);

        for _ in 0..40 {
            let o = NodeId(rng.gen_range(0..net.node_count() as u32));
            let d = NodeId(rng.gen_range(0..net.node_count() as u32));
            let k = rng.gen_range(1..=5usize);
            let routes = router.find_routes(&net, o, d, k, &BaseTravelTime).unwrap();

            assert!(!routes.is_empty() && routes.len() <= k);
            let distinct: HashSet<_> = routes.iter().map(|r| r.path.clone()).collect();
            assert_eq!(distinct.len(), routes.len());
            for w in routes.windows(2) {
                assert!(w[0].cost <= w[1].cost);
            }
            for r in &routes {
                assert_eq!(r.path.first(), Some(&o));
                assert_eq!(r.path.last(), Some(&d));
                assert_eq!(r.edges.len() + 1, r.path.len());
            }
        }
    }

    #[test]
    fn repeated_searches_are_identical() {
        let net = RoadNetwork::build(CityBounds::default(), &GridSpec::default()).unwrap();
        let router = MultiObjectiveRouter::default();
        let o = NodeId(0);
        let d = NodeId(net.node_count() as u32 - 1);
        let a = router.find_routes(&net, o, d, 4, &BaseTravelTime).unwrap();
        let b = router.find_routes(&net, o, d, 4, &BaseTravelTime).unwrap();
        let pa: Vec<_> = a.iter().map(|r| r.path.clone()).collect();
        let pb: Vec<_> = b.iter().map(|r| r.path.clone()).collect();
        assert_eq!(pa, pb);
    }
}

// ── Synthetic grid ────────────────────────────────────────────────────────────

#[cfg(test)]
mod grid {
    use er_core::{CityBounds, GeoPoint};
    use crate::{GridSpec, RoadClass, RoadNetwork, SpatialError};

    #[test]
    fn builds_requested_topology() {
        let spec = GridSpec { rows: 5, cols: 6, diagonal_probability: 0.0, ..GridSpec::default() };
        let net = RoadNetwork::build(CityBounds::default(), &spec).unwrap();
        assert_eq!(net.node_count(), 30);
        // 5 rows × 5 horizontal + 4 × 6 vertical segments, both directions.
        assert_eq!(net.edge_count(), 2 * (5 * 5 + 4 * 6));
        assert!(net.edge_class.contains(&RoadClass::Arterial));
        assert!(net.edge_class.contains(&RoadClass::Local));
    }

    #[test]
    fn same_spec_same_network() {
        let a = RoadNetwork::build(CityBounds::default(), &GridSpec::default()).unwrap();
        let b = RoadNetwork::build(CityBounds::default(), &GridSpec::default()).unwrap();
        assert_eq!(a.edge_travel_ms, b.edge_travel_ms);
        assert_eq!(a.edge_to, b.edge_to);
    }

    #[test]
    fn degenerate_bounds_fail() {
        let flat = CityBounds::new(12.9, 12.9, 77.8, 77.4);
        let r = RoadNetwork::build(flat, &GridSpec::default());
        assert!(matches!(r, Err(SpatialError::GraphBuild(_))));
    }

    #[test]
    fn too_small_grid_fails() {
        let spec = GridSpec { rows: 1, ..GridSpec::default() };
        let r = RoadNetwork::build(CityBounds::default(), &spec);
        assert!(matches!(r, Err(SpatialError::GraphBuild(_))));
    }

    #[test]
    fn non_finite_shape_parameters_fail() {
        for p in [f64::NAN, -0.1, 1.5] {
            let spec = GridSpec { diagonal_probability: p, ..GridSpec::default() };
            let r = RoadNetwork::build(CityBounds::default(), &spec);
            assert!(matches!(r, Err(SpatialError::GraphBuild(_))), "diagonal probability {p}");
        }
        let spec = GridSpec { curviness: f64::NAN, ..GridSpec::default() };
        assert!(RoadNetwork::build(CityBounds::default(), &spec).is_err());

        let json = r#"{"rows": 4, "cols": 4, "diagonal_probability": 1.0}"#;
        let spec: GridSpec = serde_json::from_str(json).unwrap();
        assert!(RoadNetwork::build(CityBounds::default(), &spec).is_ok());
    }

    #[test]
    fn corners_snap_to_corner_nodes() {
        let bounds = CityBounds::default();
        let net = RoadNetwork::build(bounds, &GridSpec::default()).unwrap();
        let sw = net.nearest_node(GeoPoint::new(bounds.south, bounds.west)).unwrap();
        assert_eq!(sw.0, 0);
        let ne = net.nearest_node(GeoPoint::new(bounds.north, bounds.east)).unwrap();
        assert_eq!(ne.index(), net.node_count() - 1);
    }
}
