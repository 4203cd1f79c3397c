//! Held-out error metrics.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

impl ModelMetrics {
    /// Compare `predicted` against `actual` pairwise.  R² is 0 when the
    /// targets are constant.
    pub fn evaluate(predicted: &[f64], actual: &[f64]) -> Self {
        let n = predicted.len().min(actual.len());
        if n == 0 {
            return Self::default();
        }
        let nf = n as f64;
        let mean = actual[..n].iter().sum::<f64>() / nf;
        let (mut abs, mut sq, mut tot) = (0.0, 0.0, 0.0);
        for (p, a) in predicted.iter().zip(actual) {
            abs += (p - a).abs();
            sq += (p - a).powi(2);
            tot += (a - mean).powi(2);
        }
        Self {
            mae: abs / nf,
            rmse: (sq / nf).sqrt(),
            r2: if tot > 0.0 { 1.0 - sq / tot } else { 0.0 },
        }
    }
}
