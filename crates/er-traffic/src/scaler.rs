//! Standard scaling for the numerical feature columns.

use serde::{Deserialize, Serialize};

use crate::features::{NUM_FEATURES, NUMERICAL_FEATURES};

/// Per-column `(x - mean) / std` for [`NUMERICAL_FEATURES`]; every other
/// column passes through unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    std:  Vec<f64>,
}

impl Default for StandardScaler {
    /// Identity transform.
    fn default() -> Self {
        Self { mean: vec![0.0; NUM_FEATURES], std: vec![1.0; NUM_FEATURES] }
    }
}

impl StandardScaler {
    /// Fit column statistics on `rows`.  Constant columns keep `std = 1`.
    pub fn fit(rows: &[[f64; NUM_FEATURES]]) -> Self {
        let mut scaler = Self::default();
        if rows.is_empty() {
            return scaler;
        }
        let n = rows.len() as f64;
        for &col in &NUMERICAL_FEATURES {
            let mean = rows.iter().map(|r| r[col]).sum::<f64>() / n;
            let var = rows.iter().map(|r| (r[col] - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            scaler.mean[col] = mean;
            scaler.std[col] = if std > 1e-12 { std } else { 1.0 };
        }
        scaler
    }

    pub fn transform(&self, row: &[f64; NUM_FEATURES]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(&x, (&m, &s))| (x - m) / s)
            .collect()
    }
}
