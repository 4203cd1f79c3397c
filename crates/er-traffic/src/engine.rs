//! `TrafficPredictionEngine` — training, best-model selection, and
//! multiplier / travel-time prediction.
//!
//! # Uncertainty
//!
//! A prediction's uncertainty combines two sources:
//!
//! ```text
//! uncertainty = sqrt(disagreement² + spread²)
//! ```
//!
//! where `disagreement` is the std-dev of the point estimates of every
//! trained variant and `spread` is the best variant's native spread (see
//! [`crate::models`]).  It is always `>= 0`.
//!
//! # Travel time
//!
//! ```text
//! adjusted   = multiplier / speed_factor(vehicle, priority)
//! travel     = max(base * adjusted, min_travel_minutes)
//! time_saved = base * multiplier - travel
//! confidence = clamp(1 - uncertainty / (multiplier * uncertainty_scale), 0, 1)
//! ```

use std::collections::BTreeMap;

use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use er_core::{Priority, VehicleClass};

use crate::features::{FeatureVector, NUM_FEATURES};
use crate::metrics::ModelMetrics;
use crate::models::{BoostingParams, ForestParams, ModelKind, Predictor, mean_std};
use crate::scaler::StandardScaler;
use crate::{TrafficError, TrafficResult};

/// Current model artifact layout.
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Predicted multipliers never fall below this.
const MIN_MULTIPLIER: f64 = 0.1;

// ── Configuration ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub seed: u64,
    /// Held-out fraction used by [`crate::synthetic::train_test_split`].
    pub test_fraction: f64,
    pub models: Vec<ModelKind>,
    pub forest: ForestParams,
    pub boosting: BoostingParams,
    pub ridge_alpha: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_fraction: 0.2,
            models: ModelKind::ALL.to_vec(),
            forest: ForestParams::default(),
            boosting: BoostingParams::default(),
            ridge_alpha: 1.0,
        }
    }
}

/// Documented travel-time constants.  Not learned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedPolicy {
    pub ambulance_speed_factor: f64,
    /// Used instead of `ambulance_speed_factor` for critical calls.
    pub critical_speed_factor: f64,
    pub min_travel_minutes: f64,
    pub uncertainty_scale: f64,
}

impl Default for SpeedPolicy {
    fn default() -> Self {
        Self {
            ambulance_speed_factor: 1.3,
            critical_speed_factor: 1.45,
            min_travel_minutes: 0.5,
            uncertainty_scale: 1.0,
        }
    }
}

impl SpeedPolicy {
    pub fn speed_factor(&self, vehicle: VehicleClass, priority: Priority) -> f64 {
        match (vehicle, priority) {
            (VehicleClass::Civilian, _) => 1.0,
            (VehicleClass::Ambulance, Priority::Critical) => self.critical_speed_factor,
            (VehicleClass::Ambulance, _) => self.ambulance_speed_factor,
        }
    }

    pub fn confidence(&self, multiplier: f64, uncertainty: f64) -> f64 {
        let denom = multiplier * self.uncertainty_scale;
        if denom <= 0.0 || !uncertainty.is_finite() {
            return 0.0;
        }
        (1.0 - uncertainty / denom).clamp(0.0, 1.0)
    }
}

// ── Outputs ───────────────────────────────────────────────────────────────────

/// Multiplier estimate for one feature vector.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrafficPrediction {
    pub multiplier: f64,
    pub uncertainty: f64,
}

/// Per-horizon forecast keyed by minutes ahead.
pub type TrafficForecast = BTreeMap<u32, TrafficPrediction>;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TravelTimePrediction {
    pub travel_time_min: f64,
    pub time_saved_min: f64,
    pub normal_travel_time_min: f64,
    pub confidence: f64,
    pub multiplier: f64,
    pub uncertainty: f64,
}

impl TravelTimePrediction {
    /// Used when no model is available: travel at base duration, no
    /// confidence.
    pub fn baseline(base_duration_min: f64, policy: &SpeedPolicy) -> Self {
        Self {
            travel_time_min: base_duration_min.max(policy.min_travel_minutes),
            time_saved_min: 0.0,
            normal_travel_time_min: base_duration_min,
            confidence: 0.0,
            multiplier: 1.0,
            uncertainty: 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariantReport {
    pub kind: ModelKind,
    pub metrics: ModelMetrics,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub variants: Vec<VariantReport>,
    pub best: ModelKind,
    pub train_rows: usize,
    pub eval_rows: usize,
}

impl TrainingReport {
    pub fn metrics(&self, kind: ModelKind) -> Option<&ModelMetrics> {
        self.variants.iter().find(|v| v.kind == kind).map(|v| &v.metrics)
    }
}

// ── ModelSet ──────────────────────────────────────────────────────────────────

/// Everything needed to predict: the scaler, every fitted variant, and which
/// one is best.  This is the unit that is persisted and published.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelSet {
    pub format_version: u32,
    pub scaler: StandardScaler,
    pub variants: Vec<Predictor>,
    pub best: ModelKind,
    pub report: TrainingReport,
}

impl ModelSet {
    pub fn best_predictor(&self) -> Option<&Predictor> {
        self.variants.iter().find(|p| p.kind() == self.best)
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct TrafficPredictionEngine {
    model_set: Option<ModelSet>,
    config: TrainingConfig,
    policy: SpeedPolicy,
}

impl TrafficPredictionEngine {
    pub fn new(config: TrainingConfig) -> Self {
        Self { model_set: None, config, policy: SpeedPolicy::default() }
    }

    pub fn with_policy(mut self, policy: SpeedPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn from_model_set(model_set: ModelSet) -> Self {
        Self { model_set: Some(model_set), ..Self::default() }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn policy(&self) -> &SpeedPolicy {
        &self.policy
    }

    pub fn model_set(&self) -> Option<&ModelSet> {
        self.model_set.as_ref()
    }

    pub fn is_trained(&self) -> bool {
        self.model_set.is_some()
    }

    pub fn model_count(&self) -> usize {
        self.model_set.as_ref().map_or(0, |s| s.variants.len())
    }

    pub fn best_model(&self) -> Option<ModelKind> {
        self.model_set.as_ref().map(|s| s.best)
    }

    /// Fit every configured variant on the training set, score each on the
    /// evaluation set and keep the lowest-RMSE variant as best (ties go to
    /// the earlier variant in `config.models`).
    ///
    /// Deterministic for a fixed `config.seed`.  On error the previously
    /// trained model set, if any, is left in place.
    pub fn train(
        &mut self,
        train_x: &[FeatureVector],
        train_y: &[f64],
        eval_x: &[FeatureVector],
        eval_y: &[f64],
    ) -> TrafficResult<TrainingReport> {
        if train_x.len() != train_y.len() {
            return Err(TrafficError::ShapeMismatch {
                what: "training targets",
                expected: train_x.len(),
                got: train_y.len(),
            });
        }
        if eval_x.len() != eval_y.len() {
            return Err(TrafficError::ShapeMismatch {
                what: "evaluation targets",
                expected: eval_x.len(),
                got: eval_y.len(),
            });
        }
        if train_x.is_empty() || eval_x.is_empty() {
            return Err(TrafficError::Training("training and evaluation sets must be non-empty".into()));
        }
        if self.config.models.is_empty() {
            return Err(TrafficError::Training("no model variants configured".into()));
        }
        for fv in train_x.iter().chain(eval_x) {
            fv.validate()?;
        }

        let raw: Vec<[f64; NUM_FEATURES]> = train_x.iter().map(FeatureVector::to_row).collect();
        let scaler = StandardScaler::fit(&raw);
        let x: Vec<Vec<f64>> = raw.iter().map(|r| scaler.transform(r)).collect();
        let ex: Vec<Vec<f64>> = eval_x.iter().map(|fv| scaler.transform(&fv.to_row())).collect();

        let config = &self.config;
        let fitted: Vec<TrafficResult<(Predictor, ModelMetrics)>> = config
            .models
            .par_iter()
            .map(|&kind| {
                let model = Predictor::fit(kind, &x, train_y, config)?;
                let predicted: Vec<f64> = ex.iter().map(|row| model.predict(row).0).collect();
                Ok((model, ModelMetrics::evaluate(&predicted, eval_y)))
            })
            .collect();

        let mut variants = Vec::with_capacity(fitted.len());
        let mut reports = Vec::with_capacity(fitted.len());
        for result in fitted {
            let (model, metrics) = result?;
            info!(
                "trained {}: MAE={:.4} RMSE={:.4} R2={:.4}",
                model.kind(),
                metrics.mae,
                metrics.rmse,
                metrics.r2
            );
            reports.push(VariantReport { kind: model.kind(), metrics });
            variants.push(model);
        }

        let mut best = &reports[0];
        for r in &reports[1..] {
            if r.metrics.rmse < best.metrics.rmse {
                best = r;
            }
        }
        let report = TrainingReport {
            best: best.kind,
            variants: reports.clone(),
            train_rows: train_x.len(),
            eval_rows: eval_x.len(),
        };
        info!("best traffic model: {}", report.best);

        self.model_set = Some(ModelSet {
            format_version: MODEL_FORMAT_VERSION,
            scaler,
            variants,
            best: report.best,
            report: report.clone(),
        });
        Ok(report)
    }

    pub fn predict(&self, features: &FeatureVector) -> TrafficResult<TrafficPrediction> {
        let set = self.model_set.as_ref().ok_or(TrafficError::ModelNotTrained)?;
        let best = set.best_predictor().ok_or(TrafficError::ModelNotTrained)?;
        features.validate()?;

        let row = set.scaler.transform(&features.to_row());
        let (point, spread) = best.predict(&row);
        let points: Vec<f64> = set.variants.iter().map(|p| p.predict(&row).0).collect();
        let (_, disagreement) = mean_std(&points);

        Ok(TrafficPrediction {
            multiplier: point.max(MIN_MULTIPLIER),
            uncertainty: (disagreement * disagreement + spread * spread).sqrt(),
        })
    }

    /// One independent prediction per horizon on the horizon-shifted
    /// features.  Duplicate horizons collapse to a single entry.
    pub fn predict_horizons(
        &self,
        features: &FeatureVector,
        horizons: &[u32],
    ) -> TrafficResult<TrafficForecast> {
        horizons
            .iter()
            .map(|&h| Ok((h, self.predict(&features.shifted_by(h as f64))?)))
            .collect()
    }

    pub fn predict_travel_time(
        &self,
        features: &FeatureVector,
        base_duration_min: f64,
        vehicle: VehicleClass,
        priority: Priority,
    ) -> TrafficResult<TravelTimePrediction> {
        self.predict_travel_time_with(&self.policy, features, base_duration_min, vehicle, priority)
    }

    /// As [`predict_travel_time`](Self::predict_travel_time) under an
    /// explicit policy.
    pub fn predict_travel_time_with(
        &self,
        policy: &SpeedPolicy,
        features: &FeatureVector,
        base_duration_min: f64,
        vehicle: VehicleClass,
        priority: Priority,
    ) -> TrafficResult<TravelTimePrediction> {
        let TrafficPrediction { multiplier, uncertainty } = self.predict(features)?;
        let base = base_duration_min.max(0.0);
        let adjusted = multiplier / policy.speed_factor(vehicle, priority);
        let travel = (base * adjusted).max(policy.min_travel_minutes);
        Ok(TravelTimePrediction {
            travel_time_min: travel,
            time_saved_min: base * multiplier - travel,
            normal_travel_time_min: base,
            confidence: policy.confidence(multiplier, uncertainty),
            multiplier,
            uncertainty,
        })
    }
}
