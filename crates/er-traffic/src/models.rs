//! Regression model variants behind the [`Predictor`] enum.
//!
//! Every variant maps a scaled feature row to a traffic multiplier and
//! reports a native spread alongside the point estimate:
//!
//! | Variant            | Point estimate          | Native spread                  |
//! |--------------------|-------------------------|--------------------------------|
//! | `RandomForest`     | mean over trees         | std-dev across trees           |
//! | `GradientBoosting` | boosted sum of stages   | training residual std-dev      |
//! | `Ridge`            | linear, L2-regularized  | training residual std-dev      |

use std::fmt;

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use er_core::SeededRng;

use crate::tree::{RegressionTree, TreeParams};
use crate::{TrafficError, TrafficResult};

// ── ModelKind ─────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    RandomForest,
    GradientBoosting,
    Ridge,
}

impl ModelKind {
    /// Enumeration order; also the tie-break order for best-model selection.
    pub const ALL: [ModelKind; 3] =
        [ModelKind::RandomForest, ModelKind::GradientBoosting, ModelKind::Ridge];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::RandomForest => "random_forest",
            ModelKind::GradientBoosting => "gradient_boosting",
            ModelKind::Ridge => "ridge",
        }
    }

    /// Salt mixed into the training seed so variants draw independent streams.
    fn stream(self) -> u64 {
        match self {
            ModelKind::RandomForest => 1_000,
            ModelKind::GradientBoosting => 2_000,
            ModelKind::Ridge => 3_000,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Hyper-parameters ──────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Fraction of features tried at each split.
    pub feature_fraction: f64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self { n_trees: 40, max_depth: 10, min_samples_leaf: 2, feature_fraction: 0.33 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    pub n_stages: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Row fraction drawn without replacement per stage.
    pub subsample: f64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self { n_stages: 60, learning_rate: 0.1, max_depth: 3, min_samples_leaf: 4, subsample: 0.8 }
    }
}

// ── Predictor ─────────────────────────────────────────────────────────────────

/// One fitted model variant.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predictor {
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
    Ridge(RidgeRegression),
}

impl Predictor {
    pub fn kind(&self) -> ModelKind {
        match self {
            Predictor::RandomForest(_) => ModelKind::RandomForest,
            Predictor::GradientBoosting(_) => ModelKind::GradientBoosting,
            Predictor::Ridge(_) => ModelKind::Ridge,
        }
    }

    /// Fit the variant `kind` on scaled rows `x` against targets `y`.
    pub fn fit(
        kind: ModelKind,
        x: &[Vec<f64>],
        y: &[f64],
        config: &crate::TrainingConfig,
    ) -> TrafficResult<Self> {
        if x.is_empty() {
            return Err(TrafficError::Training("empty training set".into()));
        }
        if x.len() != y.len() {
            return Err(TrafficError::ShapeMismatch {
                what: "training targets",
                expected: x.len(),
                got: y.len(),
            });
        }
        let seed = config.seed.wrapping_add(kind.stream());
        Ok(match kind {
            ModelKind::RandomForest => {
                Predictor::RandomForest(RandomForest::fit(x, y, &config.forest, seed))
            }
            ModelKind::GradientBoosting => {
                Predictor::GradientBoosting(GradientBoosting::fit(x, y, &config.boosting, seed))
            }
            ModelKind::Ridge => Predictor::Ridge(RidgeRegression::fit(x, y, config.ridge_alpha)?),
        })
    }

    /// `(point estimate, native spread)`.
    pub fn predict(&self, row: &[f64]) -> (f64, f64) {
        match self {
            Predictor::RandomForest(m) => m.predict(row),
            Predictor::GradientBoosting(m) => (m.predict(row), m.residual_std),
            Predictor::Ridge(m) => (m.predict(row), m.residual_std),
        }
    }
}

// ── Random forest ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &ForestParams, seed: u64) -> Self {
        let n = x.len();
        let n_features = x[0].len();
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_leaf: params.min_samples_leaf,
            max_features: Some(((n_features as f64 * params.feature_fraction).ceil() as usize).max(1)),
        };

        // One RNG stream per tree, so the result does not depend on how
        // rayon schedules the work.
        let trees = (0..params.n_trees.max(1))
            .into_par_iter()
            .map(|t| {
                let mut rng = SeededRng::for_stream(seed, t as u64);
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, &bootstrap, &tree_params, &mut rng)
            })
            .collect();
        Self { trees }
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    fn predict(&self, row: &[f64]) -> (f64, f64) {
        let votes: Vec<f64> = self.trees.iter().map(|t| t.predict(row)).collect();
        mean_std(&votes)
    }
}

// ── Gradient boosting ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GradientBoosting {
    init: f64,
    learning_rate: f64,
    stages: Vec<RegressionTree>,
    residual_std: f64,
}

impl GradientBoosting {
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &BoostingParams, seed: u64) -> Self {
        let n = x.len();
        let init = y.iter().sum::<f64>() / n as f64;
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_leaf: params.min_samples_leaf,
            max_features: None,
        };
        let take = ((n as f64 * params.subsample.clamp(0.05, 1.0)).round() as usize).clamp(1, n);

        let mut rng = SeededRng::new(seed);
        let mut fitted = vec![init; n];
        let mut residual = vec![0.0; n];
        let mut rows: Vec<usize> = (0..n).collect();
        let mut stages = Vec::with_capacity(params.n_stages);

        for _ in 0..params.n_stages {
            for i in 0..n {
                residual[i] = y[i] - fitted[i];
            }
            rng.shuffle(&mut rows);
            let tree = RegressionTree::fit(x, &residual, &rows[..take], &tree_params, &mut rng);
            for i in 0..n {
                fitted[i] += params.learning_rate * tree.predict(&x[i]);
            }
            stages.push(tree);
        }

        let errors: Vec<f64> = y.iter().zip(&fitted).map(|(t, p)| t - p).collect();
        let (_, residual_std) = mean_std(&errors);
        Self { init, learning_rate: params.learning_rate, stages, residual_std }
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    fn predict(&self, row: &[f64]) -> f64 {
        self.init + self.learning_rate * self.stages.iter().map(|t| t.predict(row)).sum::<f64>()
    }
}

// ── Ridge regression ──────────────────────────────────────────────────────────

/// Linear model with an L2 penalty on the weights (not the intercept).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RidgeRegression {
    intercept: f64,
    weights: Vec<f64>,
    residual_std: f64,
}

impl RidgeRegression {
    /// Solves `(XcᵀXc + αI) w = Xcᵀyc` on centered data.
    pub fn fit(x: &[Vec<f64>], y: &[f64], alpha: f64) -> TrafficResult<Self> {
        let n = x.len() as f64;
        let d = x[0].len();

        let mut x_mean = vec![0.0; d];
        for row in x {
            for (m, v) in x_mean.iter_mut().zip(row) {
                *m += v / n;
            }
        }
        let y_mean = y.iter().sum::<f64>() / n;

        let xc = DMatrix::from_fn(x.len(), d, |r, c| x[r][c] - x_mean[c]);
        let yc = DVector::from_iterator(y.len(), y.iter().map(|t| t - y_mean));
        let gram = xc.tr_mul(&xc) + DMatrix::identity(d, d) * alpha.max(1e-9);
        let rhs = xc.tr_mul(&yc);

        let weights = solve(gram, &rhs)?;
        let intercept = y_mean - weights.iter().zip(&x_mean).map(|(w, m)| w * m).sum::<f64>();
        let mut model = Self { intercept, weights, residual_std: 0.0 };
        let errors: Vec<f64> = x.iter().zip(y).map(|(row, t)| t - model.predict(row)).collect();
        model.residual_std = mean_std(&errors).1;
        Ok(model)
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    fn predict(&self, row: &[f64]) -> f64 {
        self.intercept + self.weights.iter().zip(row).map(|(w, v)| w * v).sum::<f64>()
    }
}

/// Solve the symmetric positive-definite system `a · w = b`.  LU covers
/// the case where rounding leaves `a` just short of positive-definite.
fn solve(a: DMatrix<f64>, b: &DVector<f64>) -> TrafficResult<Vec<f64>> {
    let w = match a.clone().cholesky() {
        Some(chol) => chol.solve(b),
        None => a
            .lu()
            .solve(b)
            .ok_or_else(|| TrafficError::Training("ridge system is singular".into()))?,
    };
    if w.iter().any(|v| !v.is_finite()) {
        return Err(TrafficError::Training("ridge solution is not finite".into()));
    }
    Ok(w.iter().copied().collect())
}

/// Population mean and standard deviation.
pub(crate) fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
