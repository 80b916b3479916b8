// src/diagnostics.rs

use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pca::{column_sample_variance, PcaFit, StandardizedData};

/// Numeric quality checks of a single fit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FitDiagnostics {
    pub n_samples: usize,
    pub n_features: usize,
    pub n_components: usize,
    /// ||C Cᵀ - I||_F over the component rows.
    pub orthogonality_error: f64,
    /// Largest absolute column mean of the standardized data.
    pub max_abs_column_mean: f64,
    /// Sum of per-column sample variances of the standardized data.
    pub total_variance: f64,
    /// Sum of the explained variances of the kept components.
    pub retained_variance: f64,
    /// `retained_variance / total_variance`, 0 when the data has no variance.
    pub retained_variance_fraction: f64,
}

impl FitDiagnostics {
    pub fn from_fit(fit: &PcaFit, standardized: &StandardizedData) -> Self {
        let total = total_variance(standardized.data().view());
        let retained = fit.explained_variance().sum();
        FitDiagnostics {
            n_samples: standardized.n_samples(),
            n_features: standardized.n_features(),
            n_components: fit.n_components(),
            orthogonality_error: orthogonality_error(fit.components().view()),
            max_abs_column_mean: max_abs_column_mean(standardized.data().view()),
            total_variance: total,
            retained_variance: retained,
            retained_variance_fraction: if total > 0.0 { retained / total } else { 0.0 },
        }
    }
}

impl fmt::Display for FitDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PCA fit {}x{} -> {} components: orthogonality error {:.3e}, max |column mean| {:.3e}, \
             retained variance {:.6} of {:.6} ({:.2}%)",
            self.n_samples,
            self.n_features,
            self.n_components,
            self.orthogonality_error,
            self.max_abs_column_mean,
            self.retained_variance,
            self.total_variance,
            self.retained_variance_fraction * 100.0
        )
    }
}

/// Frobenius norm of `C Cᵀ - I` for a matrix whose rows are expected to be orthonormal.
pub fn orthogonality_error(components: ArrayView2<f64>) -> f64 {
    let mut gram: Array2<f64> = components.dot(&components.t());
    for i in 0..gram.nrows() {
        gram[[i, i]] -= 1.0;
    }
    gram.iter().map(|v| v * v).sum::<f64>().sqrt()
}

/// Largest absolute per-column mean, 0 for an empty matrix.
pub fn max_abs_column_mean(data: ArrayView2<f64>) -> f64 {
    data.mean_axis(Axis(0))
        .map(|means| means.iter().fold(0.0_f64, |acc, m| acc.max(m.abs())))
        .unwrap_or(0.0)
}

/// Sum of per-column sample variances (ddof = 1), 0 when there are fewer than 2 rows.
pub fn total_variance(data: ArrayView2<f64>) -> f64 {
    column_sample_variance(data).map(|v| v.sum()).unwrap_or(0.0)
}
