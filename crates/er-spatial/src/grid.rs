//! Synthetic road network over a bounded region.
//!
//! Real topology sourcing is outside this crate; `RoadNetwork::build` lays a
//! jittered street grid over the bounds so the dispatcher always has a
//! routable network:
//!
//! - every `arterial_every`-th row and column is an arterial corridor,
//! - the rest are local streets with slower, jittered speeds,
//! - a seeded fraction of grid cells get a diagonal local shortcut, so the
//!   shortest, fastest and fewest-segment paths genuinely differ.
//!
//! The layout is a pure function of `(bounds, spec)`.

use serde::{Deserialize, Serialize};

use er_core::{CityBounds, GeoPoint, NodeId, SeededRng};

use crate::{RoadClass, RoadNetwork, RoadNetworkBuilder, SpatialError, SpatialResult};

/// Synthetic grid parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSpec {
    /// Node rows (south → north).  Must be ≥ 2.
    pub rows: usize,
    /// Node columns (west → east).  Must be ≥ 2.
    pub cols: usize,
    /// Every n-th row/column is an arterial.
    pub arterial_every: usize,
    pub arterial_speed_kmh: f64,
    pub local_speed_kmh: f64,
    /// Relative ± speed jitter applied per segment.
    pub speed_jitter: f64,
    /// Maximum relative excess of road length over straight-line length.
    pub curviness: f64,
    /// Probability that a grid cell gets a diagonal shortcut.
    pub diagonal_probability: f64,
    pub seed: u64,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            rows: 24,
            cols: 24,
            arterial_every: 4,
            arterial_speed_kmh: 45.0,
            local_speed_kmh: 22.0,
            speed_jitter: 0.15,
            curviness: 0.25,
            diagonal_probability: 0.2,
            seed: 42,
        }
    }
}

impl GridSpec {
    fn validate(&self) -> SpatialResult<()> {
        if self.rows < 2 || self.cols < 2 {
            return Err(SpatialError::GraphBuild(format!(
                "no usable topology: a {}x{} grid has no roads",
                self.rows, self.cols
            )));
        }
        if !(self.arterial_speed_kmh > 0.0 && self.local_speed_kmh > 0.0) {
            return Err(SpatialError::GraphBuild("road speeds must be positive".into()));
        }
        if !(0.0..1.0).contains(&self.speed_jitter) || !self.curviness.is_finite() || self.curviness < 0.0 {
            return Err(SpatialError::GraphBuild("jitter must be in [0, 1) and curviness ≥ 0".into()));
        }
        if !(0.0..=1.0).contains(&self.diagonal_probability) {
            return Err(SpatialError::GraphBuild(format!(
                "diagonal probability {} must be in [0, 1]",
                self.diagonal_probability
            )));
        }
        Ok(())
    }
}

impl RoadNetwork {
    /// Build a synthetic network covering `bounds`.
    ///
    /// Fails with [`SpatialError::GraphBuild`] for degenerate bounds or a
    /// grid too small to contain any road.
    pub fn build(bounds: CityBounds, spec: &GridSpec) -> SpatialResult<RoadNetwork> {
        bounds
            .validate()
            .map_err(|e| SpatialError::GraphBuild(e.to_string()))?;
        spec.validate()?;

        let (rows, cols) = (spec.rows, spec.cols);
        let mut rng = SeededRng::new(spec.seed);
        let mut b = RoadNetworkBuilder::with_capacity(rows * cols, rows * cols * 5);
        b.bounds(bounds);

        let lat_step = bounds.lat_span() / (rows - 1) as f64;
        let lon_step = bounds.lon_span() / (cols - 1) as f64;
        for r in 0..rows {
            for c in 0..cols {
                b.add_node(GeoPoint::new(
                    bounds.south + r as f64 * lat_step,
                    bounds.west + c as f64 * lon_step,
                ));
            }
        }
        let id = |r: usize, c: usize| NodeId((r * cols + c) as u32);
        let every = spec.arterial_every.max(1);

        for r in 0..rows {
            for c in 0..cols {
                if c + 1 < cols {
                    let class = if r % every == 0 { RoadClass::Arterial } else { RoadClass::Local };
                    add_segment(&mut b, &mut rng, spec, id(r, c), id(r, c + 1), class);
                }
                if r + 1 < rows {
                    let class = if c % every == 0 { RoadClass::Arterial } else { RoadClass::Local };
                    add_segment(&mut b, &mut rng, spec, id(r, c), id(r + 1, c), class);
                }
                if r + 1 < rows && c + 1 < cols && rng.gen_bool(spec.diagonal_probability) {
                    let (a, z) = if rng.gen_bool(0.5) {
                        (id(r, c), id(r + 1, c + 1))
                    } else {
                        (id(r, c + 1), id(r + 1, c))
                    };
                    add_segment(&mut b, &mut rng, spec, a, z, RoadClass::Local);
                }
            }
        }

        let net = b.build();
        log::info!(
            "built synthetic road network: {} nodes, {} directed edges over {:?}",
            net.node_count(),
            net.edge_count(),
            (bounds.south, bounds.west, bounds.north, bounds.east),
        );
        Ok(net)
    }
}

fn add_segment(
    b: &mut RoadNetworkBuilder,
    rng: &mut SeededRng,
    spec: &GridSpec,
    from: NodeId,
    to: NodeId,
    class: RoadClass,
) {
    let straight_m = b.node_pos(from).distance_m(b.node_pos(to));
    let length_m = straight_m * rng.uniform(1.0, 1.0 + spec.curviness);
    let base_kmh = match class {
        RoadClass::Arterial => spec.arterial_speed_kmh,
        RoadClass::Local    => spec.local_speed_kmh,
    };
    let kmh = base_kmh * rng.uniform(1.0 - spec.speed_jitter, 1.0 + spec.speed_jitter);
    let travel_ms = (length_m / (kmh / 3.6) * 1_000.0).round().max(1.0) as u32;
    b.add_road_with_class(from, to, length_m, travel_ms, class);
}
