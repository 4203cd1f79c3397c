//! `er-traffic` — traffic multiplier forecasting.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                       |
//! |-----------------|----------------------------------------------------------------|
//! | [`features`]    | `FeatureVector` (fixed 30-field schema)                        |
//! | [`scaler`]      | `StandardScaler` over the numerical columns                    |
//! | [`tree`]        | CART `RegressionTree`                                          |
//! | [`models`]      | `Predictor` variants: random forest, gradient boosting, ridge  |
//! | [`metrics`]     | `ModelMetrics` (MAE / RMSE / R²)                               |
//! | [`engine`]      | `TrafficPredictionEngine`, `ModelSet`, `SpeedPolicy`           |
//! | [`synthetic`]   | Seeded training data and train/test split                      |
//! | [`persistence`] | `ModelStore` trait, `JsonModelStore`                           |
//! | [`error`]       | `TrafficError`, `TrafficResult<T>`                             |

pub mod engine;
pub mod error;
pub mod features;
pub mod metrics;
pub mod models;
pub mod persistence;
pub mod scaler;
pub mod synthetic;
pub mod tree;


pub use engine::{
    MODEL_FORMAT_VERSION, ModelSet, SpeedPolicy, TrafficForecast, TrafficPrediction,
    TrafficPredictionEngine, TrainingConfig, TrainingReport, TravelTimePrediction, VariantReport,
};
pub use error::{TrafficError, TrafficResult};
pub use features::{FEATURE_NAMES, FeatureVector, NUM_FEATURES};
pub use metrics::ModelMetrics;
pub use models::{ModelKind, Predictor};
pub use persistence::{JsonModelStore, ModelStore};
pub use scaler::StandardScaler;
pub use synthetic::{Dataset, Split};
