// Principal component analysis (PCA) engine

use log::{debug, info, trace, warn};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::diagnostics::FitDiagnostics;
use crate::error::PcaError;
use crate::linalg_backends::{BackendEigh, LinAlgBackendProvider};

/// Standard deviations below this are treated as zero when scaling.
const DEGENERATE_STD_THRESHOLD: f64 = 1e-9;

/// How the input columns are standardized before the scatter matrix is formed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Standardization {
    /// Subtract the per-column mean only.
    #[default]
    Center,
    /// Subtract the per-column mean and divide by the population standard deviation (ddof = 0).
    CenterAndScale,
}

/// What to do with a zero-variance column under `Standardization::CenterAndScale`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegenerateColumnPolicy {
    /// Fail with `PcaError::DegenerateColumn`.
    #[default]
    Reject,
    /// Leave the column centered (scale factor 1.0) and log a warning.
    KeepCentered,
}

/// What to do when more components are requested than the data has features.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentCountPolicy {
    /// Deliver all available components and log a warning. The fit records both counts.
    #[default]
    Clamp,
    /// Fail with `PcaError::ComponentCountExceedsFeatures`.
    Reject,
}

/// Configuration for [`SimplePca`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcaConfig {
    /// Number of principal components (K) to keep. Must be at least 1.
    pub n_components: usize,
    /// Standardization applied by `fit_transform`.
    pub standardization: Standardization,
    /// Handling of zero-variance columns when scaling.
    pub degenerate_column_policy: DegenerateColumnPolicy,
    /// Handling of K larger than the number of features.
    pub component_count_policy: ComponentCountPolicy,
}

impl Default for PcaConfig {
    /// Two components, mean-centering only, strict on degenerate columns, clamping K.
    fn default() -> Self {
        PcaConfig {
            n_components: 2,
            standardization: Standardization::Center,
            degenerate_column_policy: DegenerateColumnPolicy::Reject,
            component_count_policy: ComponentCountPolicy::Clamp,
        }
    }
}

/// Centered (and optionally scaled) data produced by [`SimplePca::standardize`].
///
/// This is the fit state of a single call. It is handed from one pipeline step to the
/// next instead of living inside the engine.
#[derive(Clone, Debug)]
pub struct StandardizedData {
    data: Array2<f64>,
    mean: Array1<f64>,
    scale: Option<Array1<f64>>,
}

impl StandardizedData {
    /// The standardized matrix, shape (n_samples, n_features).
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Per-column mean of the original data.
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Per-column scale factors, `None` when the data was only centered.
    /// Degenerate columns kept under `DegenerateColumnPolicy::KeepCentered` carry 1.0.
    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.scale.as_ref()
    }

    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.data.ncols()
    }
}

/// Result of [`SimplePca::fit_transform`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PcaFit {
    /// Projected data, shape (n_samples, k_components).
    projection: Array2<f64>,
    /// Principal components as rows, shape (k_components, n_features).
    components: Array2<f64>,
    /// Sample variance (ddof = 1) of each projected column, descending.
    explained_variance: Array1<f64>,
    /// Explained variance divided by the total variance of the standardized data.
    explained_variance_ratio: Array1<f64>,
    mean: Array1<f64>,
    scale: Option<Array1<f64>>,
    n_components_requested: usize,
}

impl PcaFit {
    /// The projected data, shape (n_samples, k_components).
    pub fn projection(&self) -> &Array2<f64> {
        &self.projection
    }

    /// Consumes the fit and returns the projected data.
    pub fn into_projection(self) -> Array2<f64> {
        self.projection
    }

    /// Unit-norm, mutually orthogonal components as rows, shape (k_components, n_features).
    pub fn components(&self) -> &Array2<f64> {
        &self.components
    }

    pub fn explained_variance(&self) -> &Array1<f64> {
        &self.explained_variance
    }

    pub fn explained_variance_ratio(&self) -> &Array1<f64> {
        &self.explained_variance_ratio
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.scale.as_ref()
    }

    /// Number of components actually delivered.
    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    /// Number of components the engine was configured with.
    pub fn n_components_requested(&self) -> usize {
        self.n_components_requested
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Projects new data onto the fitted components.
    ///
    /// The fitted mean (and scale, if the fit was scaled) is applied to `x` before
    /// projecting. `x` may have zero rows.
    ///
    /// # Errors
    /// Returns `DimensionMismatch` if `x` does not have the fitted number of features,
    /// and `NonFiniteInput` if it contains NaN or infinite values.
    pub fn transform(&self, mut x: Array2<f64>) -> Result<Array2<f64>, PcaError> {
        if x.ncols() != self.n_features() {
            return Err(PcaError::DimensionMismatch {
                expected: self.n_features(),
                found: x.ncols(),
            });
        }
        if x.nrows() == 0 {
            return Ok(Array2::zeros((0, self.n_components())));
        }
        check_finite(x.view())?;

        x -= &self.mean;
        if let Some(scale) = &self.scale {
            x /= scale;
        }
        Ok(x.dot(&self.components.t()))
    }
}

/// Principal component analysis engine.
///
/// The engine only holds its configuration. Every call to [`SimplePca::fit_transform`]
/// computes its own standardized data and returns everything it derived in a [`PcaFit`],
/// so one engine can serve concurrent fits.
///
/// # Examples
///
/// ```
/// use ndarray::array;
/// use simple_pca::SimplePca;
///
/// let data = array![
///     [-1.0, -1.0, 1.0],
///     [-2.0, -1.0, 1.0],
///     [-3.0, -2.0, 2.0],
///     [1.0, 1.0, 3.0],
///     [2.0, 1.0, 1.0],
///     [3.0, 2.0, 9.0]
/// ];
///
/// let pca = SimplePca::new(2);
/// let fit = pca.fit_transform(data).unwrap();
/// assert_eq!(fit.projection().dim(), (6, 2));
/// ```
#[derive(Clone, Debug, Default)]
pub struct SimplePca {
    config: PcaConfig,
    backend: LinAlgBackendProvider<f64>,
}

impl SimplePca {
    /// Creates an engine keeping `n_components` components, with default policies.
    pub fn new(n_components: usize) -> Self {
        Self::with_config(PcaConfig {
            n_components,
            ..PcaConfig::default()
        })
    }

    pub fn with_config(config: PcaConfig) -> Self {
        Self {
            config,
            backend: LinAlgBackendProvider::new(),
        }
    }

    pub fn config(&self) -> &PcaConfig {
        &self.config
    }

    /// Centers (and with `CenterAndScale`, scales) the columns of `x`.
    ///
    /// `x` is consumed and modified in place.
    ///
    /// # Errors
    /// - `InvalidInputShape` if `x` has fewer than 2 rows or no columns.
    /// - `NonFiniteInput` if `x` contains NaN or infinite values.
    /// - `DegenerateColumn` if scaling is requested, a column has zero variance, and the
    ///   policy is `DegenerateColumnPolicy::Reject`.
    pub fn standardize(
        &self,
        mut x: Array2<f64>,
        mode: Standardization,
    ) -> Result<StandardizedData, PcaError> {
        check_shape(x.view())?;
        check_finite(x.view())?;

        let mean = x.mean_axis(Axis(0)).ok_or(PcaError::InvalidInputShape {
            n_samples: x.nrows(),
            n_features: x.ncols(),
            reason: "cannot compute column means of an empty matrix",
        })?;
        x -= &mean;

        let scale = match mode {
            Standardization::Center => None,
            Standardization::CenterAndScale => {
                let std_dev = x.map_axis(Axis(0), |column| column.std(0.0));
                let mut sanitized = Array1::<f64>::ones(std_dev.len());
                for (column, &s) in std_dev.iter().enumerate() {
                    if s.abs() >= DEGENERATE_STD_THRESHOLD {
                        sanitized[column] = s;
                        continue;
                    }
                    match self.config.degenerate_column_policy {
                        DegenerateColumnPolicy::Reject => {
                            return Err(PcaError::DegenerateColumn { column });
                        }
                        DegenerateColumnPolicy::KeepCentered => {
                            warn!(
                                "Column {} has zero variance; leaving it centered but unscaled.",
                                column
                            );
                        }
                    }
                }
                x /= &sanitized;
                Some(sanitized)
            }
        };

        Ok(StandardizedData { data: x, mean, scale })
    }

    /// Unnormalized scatter matrix `x_stdᵀ · x_std`, shape (n_features, n_features).
    ///
    /// This is not divided by N or N-1, so its eigenvalues are (N-1) times the variance
    /// along the matching eigenvector.
    pub fn covariance(&self, standardized: &StandardizedData) -> Array2<f64> {
        standardized.data.t().dot(&standardized.data)
    }

    /// Eigendecomposes the scatter matrix and keeps the K directions of largest variance.
    ///
    /// The data is projected onto all D eigenvectors and the sample variance (ddof = 1) of
    /// each projection ranks them; ties keep the solver's order.
    ///
    /// Returns the K variances in descending order and the K components as rows of a
    /// (K, n_features) matrix. Component signs are solver dependent.
    ///
    /// # Errors
    /// - `InvalidConfiguration` if the engine was built with zero components.
    /// - `ComponentCountExceedsFeatures` if K > D under `ComponentCountPolicy::Reject`.
    /// - `NumericFailure` if the eigensolver fails or returns non-finite values.
    pub fn eigen_decompose(
        &self,
        standardized: &StandardizedData,
    ) -> Result<(Array1<f64>, Array2<f64>), PcaError> {
        let n_features = standardized.n_features();
        let k_components = self.resolve_n_components(n_features)?;

        let scatter = self.covariance(standardized);
        let eig = self
            .backend
            .eigh_upper(&scatter)
            .map_err(|e| PcaError::NumericFailure(format!("Eigen decomposition of scatter matrix failed: {}", e)))?;
        if eig.eigenvalues.iter().chain(eig.eigenvectors.iter()).any(|v| !v.is_finite()) {
            return Err(PcaError::NumericFailure(
                "Eigen decomposition of scatter matrix produced non-finite values.".to_string(),
            ));
        }
        trace!("Scatter matrix eigenvalues: {:?}", eig.eigenvalues);

        let all_projections = standardized.data.dot(&eig.eigenvectors);
        let all_variances = self.variance(&all_projections)?;

        let mut order: Vec<usize> = (0..n_features).collect();
        order.sort_by(|&a, &b| {
            all_variances[b]
                .partial_cmp(&all_variances[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        order.truncate(k_components);

        let explanation = all_variances.select(Axis(0), &order);
        let components = eig.eigenvectors.select(Axis(1), &order).reversed_axes();
        Ok((explanation, components))
    }

    /// Projects the standardized data onto `components` (rows), giving (n_samples, K).
    ///
    /// # Errors
    /// Returns `DimensionMismatch` if the components are not of length n_features.
    pub fn project(
        &self,
        standardized: &StandardizedData,
        components: &Array2<f64>,
    ) -> Result<Array2<f64>, PcaError> {
        if components.ncols() != standardized.n_features() {
            return Err(PcaError::DimensionMismatch {
                expected: standardized.n_features(),
                found: components.ncols(),
            });
        }
        Ok(standardized.data.dot(&components.t()))
    }

    /// Sample variance (ddof = 1) of each column of `projection`.
    ///
    /// # Errors
    /// Returns `InvalidInputShape` if `projection` has fewer than 2 rows.
    pub fn variance(&self, projection: &Array2<f64>) -> Result<Array1<f64>, PcaError> {
        column_sample_variance(projection.view())
    }

    /// Standardizes `x` with the configured mode, then reduces it to K components.
    ///
    /// # Errors
    /// Any [`PcaError`] raised by the individual steps; see [`SimplePca::standardize`]
    /// and [`SimplePca::eigen_decompose`].
    pub fn fit_transform(&self, x: Array2<f64>) -> Result<PcaFit, PcaError> {
        self.fit_transform_with(x, self.config.standardization)
    }

    /// Same as [`SimplePca::fit_transform`] with an explicit standardization mode.
    pub fn fit_transform_with(
        &self,
        x: Array2<f64>,
        mode: Standardization,
    ) -> Result<PcaFit, PcaError> {
        info!(
            "Fitting PCA on {} samples x {} features ({:?}, {} components requested)",
            x.nrows(),
            x.ncols(),
            mode,
            self.config.n_components
        );

        let standardized = self.standardize(x, mode)?;
        let (_ranking_variance, components) = self.eigen_decompose(&standardized)?;
        let projection = self.project(&standardized, &components)?;
        let explained_variance = self.variance(&projection)?;

        let total_variance = column_sample_variance(standardized.data.view())?.sum();
        let explained_variance_ratio = if total_variance > 0.0 {
            explained_variance.mapv(|v| v / total_variance)
        } else {
            Array1::zeros(explained_variance.len())
        };

        let fit = PcaFit {
            projection,
            components,
            explained_variance,
            explained_variance_ratio,
            mean: standardized.mean.clone(),
            scale: standardized.scale.clone(),
            n_components_requested: self.config.n_components,
        };

        if log::log_enabled!(log::Level::Debug) {
            debug!("{}", FitDiagnostics::from_fit(&fit, &standardized));
        }
        Ok(fit)
    }

    fn resolve_n_components(&self, n_features: usize) -> Result<usize, PcaError> {
        let requested = self.config.n_components;
        if requested == 0 {
            return Err(PcaError::InvalidConfiguration(
                "n_components must be at least 1".to_string(),
            ));
        }
        if requested <= n_features {
            return Ok(requested);
        }
        match self.config.component_count_policy {
            ComponentCountPolicy::Reject => Err(PcaError::ComponentCountExceedsFeatures {
                requested,
                available: n_features,
            }),
            ComponentCountPolicy::Clamp => {
                warn!(
                    "Requested {} components but data has only {} features; returning {} components.",
                    requested, n_features, n_features
                );
                Ok(n_features)
            }
        }
    }
}

/// Sample variance (ddof = 1) of each column.
pub(crate) fn column_sample_variance(data: ArrayView2<f64>) -> Result<Array1<f64>, PcaError> {
    if data.nrows() < 2 {
        return Err(PcaError::InvalidInputShape {
            n_samples: data.nrows(),
            n_features: data.ncols(),
            reason: "sample variance needs at least 2 rows",
        });
    }
    Ok(data.var_axis(Axis(0), 1.0))
}

fn check_shape(x: ArrayView2<f64>) -> Result<(), PcaError> {
    let (n_samples, n_features) = x.dim();
    let reason = if n_samples == 0 || n_features == 0 {
        "input has zero samples or zero features"
    } else if n_samples < 2 {
        "at least 2 samples are needed"
    } else {
        return Ok(());
    };
    Err(PcaError::InvalidInputShape {
        n_samples,
        n_features,
        reason,
    })
}

fn check_finite(x: ArrayView2<f64>) -> Result<(), PcaError> {
    match x.indexed_iter().find(|(_, v)| !v.is_finite()) {
        Some(((row, column), _)) => Err(PcaError::NonFiniteInput { row, column }),
        None => Ok(()),
    }
}
