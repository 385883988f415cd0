use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_FLOW_ALPHA, DEFAULT_ITERATIONS, DEFAULT_MATCH_RADIUS, DEFAULT_MSE_RADIUS,
    DEFAULT_MSE_THRESHOLD, DEFAULT_PATCH_RADIUS, DEFAULT_PYRAMID_LEVELS, DEFAULT_WINDOW_RADIUS,
    MAX_CONSERVATIVENESS, MAX_WINDOW_RADIUS,
};
use crate::error::{LumenError, Result};
use crate::filters::SpatialStrategy;
use crate::integrate::{IntegrationStrategy, TrustParams};
use crate::io::{FileFormat, SampleFormat};
use crate::motion::hierarchical::HierarchicalParams;
use crate::motion::patch_match::PatchMatchParams;
use crate::motion::variational::VariationalParams;
use crate::motion::{ConditionParams, TemporalStrategy};

/// Accepts both `guided-color` and `guided_color` spellings.
fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace('_', "-")
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpatialKind {
    None,
    #[default]
    Guided,
    GuidedColor,
    Bilateral,
    Wavelet,
    Despeckle,
    SavitzkyGolay,
}

impl FromStr for SpatialKind {
    type Err = LumenError;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "none" => Ok(Self::None),
            "guided" => Ok(Self::Guided),
            "guided-color" => Ok(Self::GuidedColor),
            "bilateral" => Ok(Self::Bilateral),
            "wavelet" => Ok(Self::Wavelet),
            "despeckle" => Ok(Self::Despeckle),
            "savitzky-golay" | "savgol" => Ok(Self::SavitzkyGolay),
            _ => Err(LumenError::UnknownStrategy {
                category: "spatial",
                name: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for SpatialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Guided => "guided",
            Self::GuidedColor => "guided-color",
            Self::Bilateral => "bilateral",
            Self::Wavelet => "wavelet",
            Self::Despeckle => "despeckle",
            Self::SavitzkyGolay => "savitzky-golay",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemporalKind {
    #[default]
    PatchMatch,
    HierarchicalPatchMatch,
    HornSchunck,
    RobustFlow,
}

impl FromStr for TemporalKind {
    type Err = LumenError;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "patch-match" | "patchmatch" => Ok(Self::PatchMatch),
            "hierarchical-patch-match" | "hierarchical" => Ok(Self::HierarchicalPatchMatch),
            "horn-schunck" => Ok(Self::HornSchunck),
            "robust-flow" => Ok(Self::RobustFlow),
            _ => Err(LumenError::UnknownStrategy {
                category: "temporal",
                name: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for TemporalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::PatchMatch => "patch-match",
            Self::HierarchicalPatchMatch => "hierarchical-patch-match",
            Self::HornSchunck => "horn-schunck",
            Self::RobustFlow => "robust-flow",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntegrationKind {
    #[default]
    Mse,
    /// Recognised, not available.
    RobustAverage,
}

impl FromStr for IntegrationKind {
    type Err = LumenError;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "mse" => Ok(Self::Mse),
            "robust-average" => Ok(Self::RobustAverage),
            _ => Err(LumenError::UnknownStrategy {
                category: "integration",
                name: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for IntegrationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mse => f.write_str("mse"),
            Self::RobustAverage => f.write_str("robust-average"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeightingKind {
    #[default]
    None,
    Luma,
    Variance,
}

impl FromStr for WeightingKind {
    type Err = LumenError;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "none" => Ok(Self::None),
            "luma" => Ok(Self::Luma),
            "variance" => Ok(Self::Variance),
            other => Err(LumenError::Config(format!("unknown weighting '{other}'"))),
        }
    }
}

/// Serialisable run configuration, as read from TOML or assembled from CLI
/// flags. Validate with [`WindowSpec::from_config`] before use.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenoiseConfig {
    /// Align and measure error on `ln(1 + x)` samples.
    pub log_domain: bool,
    /// Continue past failed frames and report them at the end.
    pub keep_going: bool,
    /// Directory for colorized vector-field dumps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_vectors: Option<PathBuf>,
    /// Also dump per-channel error maps into `debug_vectors`.
    pub debug_error_maps: bool,
    pub window: WindowConfig,
    pub spatial: SpatialConfig,
    pub temporal: TemporalConfig,
    pub conditioning: ConditioningConfig,
    pub integration: IntegrationConfig,
    pub output: OutputConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Neighbor frames on each side of the center.
    pub radius: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_frame: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_frame: Option<i64>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_WINDOW_RADIUS,
            first_frame: None,
            last_frame: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    pub kind: SpatialKind,
    pub radius: usize,
    /// Guided-filter regularization.
    pub epsilon: f32,
    pub sigma_spatial: f32,
    pub sigma_range: f32,
    /// Soft thresholds for the wavelet layers, finest first.
    pub thresholds: Vec<f32>,
    /// Despeckle outlier threshold.
    pub threshold: f32,
    /// Savitzky-Golay polynomial order.
    pub order: usize,
    pub weighting: WeightingKind,
    /// Track providing the per-pixel variance for `weighting = "variance"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variance_source: Option<PathBuf>,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            kind: SpatialKind::Guided,
            radius: 2,
            epsilon: 1e-3,
            sigma_spatial: 2.0,
            sigma_range: 0.05,
            thresholds: vec![0.02, 0.01, 0.005],
            threshold: 0.05,
            order: 2,
            weighting: WeightingKind::None,
            variance_source: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalConfig {
    pub kind: TemporalKind,
    pub match_radius: usize,
    pub patch_radius: usize,
    pub iterations: usize,
    pub levels: usize,
    pub global_prior: bool,
    /// Smoothness weight for the variational solvers.
    pub alpha: f32,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            kind: TemporalKind::PatchMatch,
            match_radius: DEFAULT_MATCH_RADIUS,
            patch_radius: DEFAULT_PATCH_RADIUS,
            iterations: DEFAULT_ITERATIONS,
            levels: DEFAULT_PYRAMID_LEVELS,
            global_prior: true,
            alpha: DEFAULT_FLOW_ALPHA,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditioningConfig {
    /// 0 disables the backward pass and consistency gating.
    pub confidence_threshold: f32,
    pub conservativeness: i32,
    /// 0 disables vector smoothing.
    pub vector_filter_strength: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    pub kind: IntegrationKind,
    /// Only meaningful for `kind = "mse"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mse_radius: Option<usize>,
    /// Only meaningful for `kind = "mse"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mse_threshold: Option<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub prefix: String,
    pub format: FileFormat,
    pub sample_format: SampleFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            prefix: "denoised".into(),
            format: FileFormat::Tiff,
            sample_format: SampleFormat::U16,
        }
    }
}

impl DenoiseConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| LumenError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| LumenError::Config(e.to_string()))
    }

    /// Requested `[first, last]` range, if either end is set.
    pub fn frame_range(&self) -> Option<(Option<i64>, Option<i64>)> {
        match (self.window.first_frame, self.window.last_frame) {
            (None, None) => None,
            range => Some(range),
        }
    }
}

/// Validated, immutable per-run window configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowSpec {
    pub radius: usize,
    pub spatial: SpatialStrategy,
    pub temporal: TemporalStrategy,
    pub integration: IntegrationStrategy,
    pub conditioning: ConditionParams,
    pub log_domain: bool,
}

impl WindowSpec {
    /// Resolve every strategy and check every parameter. All configuration
    /// errors surface here, before any frame is touched.
    pub fn from_config(config: &DenoiseConfig) -> Result<Self> {
        if config.window.radius > MAX_WINDOW_RADIUS {
            return Err(LumenError::Config(format!(
                "window radius {} exceeds the maximum of {MAX_WINDOW_RADIUS}",
                config.window.radius
            )));
        }
        if let (Some(first), Some(last)) = (config.window.first_frame, config.window.last_frame) {
            if first > last {
                return Err(LumenError::Config(format!(
                    "first frame {first} is after last frame {last}"
                )));
            }
        }

        Ok(Self {
            radius: config.window.radius,
            spatial: resolve_spatial(&config.spatial)?,
            temporal: resolve_temporal(&config.temporal)?,
            integration: resolve_integration(&config.integration)?,
            conditioning: resolve_conditioning(&config.conditioning)?,
            log_domain: config.log_domain,
        })
    }

    /// Whether the aligner must also produce a backward field.
    pub fn needs_backward(&self) -> bool {
        self.conditioning.confidence_threshold > 0.0
    }

    pub fn trust_params(&self) -> TrustParams {
        match &self.integration {
            IntegrationStrategy::Mse(params) => *params,
        }
    }
}

fn positive(name: &str, value: f32) -> Result<f32> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(LumenError::Config(format!("{name} must be positive, got {value}")))
    }
}

fn at_least_one(name: &str, value: usize) -> Result<usize> {
    if value >= 1 {
        Ok(value)
    } else {
        Err(LumenError::Config(format!("{name} must be at least 1")))
    }
}

fn resolve_spatial(cfg: &SpatialConfig) -> Result<SpatialStrategy> {
    if cfg.weighting == WeightingKind::Variance && cfg.variance_source.is_none() {
        return Err(LumenError::Config(
            "variance weighting requires a variance source".into(),
        ));
    }
    Ok(match cfg.kind {
        SpatialKind::None => SpatialStrategy::None,
        SpatialKind::Guided => SpatialStrategy::Guided {
            radius: at_least_one("spatial radius", cfg.radius)?,
            epsilon: positive("spatial epsilon", cfg.epsilon)?,
        },
        SpatialKind::GuidedColor => SpatialStrategy::GuidedColor {
            radius: at_least_one("spatial radius", cfg.radius)?,
            epsilon: positive("spatial epsilon", cfg.epsilon)?,
        },
        SpatialKind::Bilateral => SpatialStrategy::Bilateral {
            radius: at_least_one("spatial radius", cfg.radius)?,
            sigma_spatial: positive("sigma_spatial", cfg.sigma_spatial)?,
            sigma_range: positive("sigma_range", cfg.sigma_range)?,
        },
        SpatialKind::Wavelet => {
            if cfg.thresholds.is_empty() {
                return Err(LumenError::Config(
                    "wavelet filtering needs at least one threshold".into(),
                ));
            }
            if cfg.thresholds.iter().any(|t| !t.is_finite() || *t < 0.0) {
                return Err(LumenError::Config(
                    "wavelet thresholds must be non-negative".into(),
                ));
            }
            SpatialStrategy::Wavelet {
                layers: cfg.thresholds.len(),
                thresholds: cfg.thresholds.clone(),
            }
        }
        SpatialKind::Despeckle => SpatialStrategy::Despeckle {
            threshold: positive("despeckle threshold", cfg.threshold)?,
        },
        SpatialKind::SavitzkyGolay => {
            let radius = at_least_one("spatial radius", cfg.radius)?;
            if cfg.order > 2 * radius {
                return Err(LumenError::Config(format!(
                    "Savitzky-Golay order {} needs a radius of at least {}",
                    cfg.order,
                    cfg.order.div_ceil(2)
                )));
            }
            SpatialStrategy::SavitzkyGolay {
                radius,
                order: cfg.order,
            }
        }
    })
}

fn resolve_temporal(cfg: &TemporalConfig) -> Result<TemporalStrategy> {
    let iterations = at_least_one("iterations", cfg.iterations)?;
    Ok(match cfg.kind {
        TemporalKind::PatchMatch => TemporalStrategy::PatchMatch(PatchMatchParams {
            match_radius: at_least_one("match radius", cfg.match_radius)?,
            patch_radius: cfg.patch_radius,
            iterations,
        }),
        TemporalKind::HierarchicalPatchMatch => {
            TemporalStrategy::HierarchicalPatchMatch(HierarchicalParams {
                levels: cfg.levels,
                match_radius: at_least_one("match radius", cfg.match_radius)?,
                patch_radius: cfg.patch_radius,
                iterations,
                global_prior: cfg.global_prior,
            })
        }
        TemporalKind::HornSchunck => TemporalStrategy::HornSchunck(VariationalParams {
            alpha: positive("alpha", cfg.alpha)?,
            iterations,
            levels: cfg.levels,
        }),
        TemporalKind::RobustFlow => TemporalStrategy::RobustFlow(VariationalParams {
            alpha: positive("alpha", cfg.alpha)?,
            iterations,
            levels: cfg.levels,
        }),
    })
}

fn resolve_integration(cfg: &IntegrationConfig) -> Result<IntegrationStrategy> {
    match cfg.kind {
        IntegrationKind::Mse => {
            let mse_threshold = cfg.mse_threshold.unwrap_or(DEFAULT_MSE_THRESHOLD);
            Ok(IntegrationStrategy::Mse(TrustParams {
                mse_radius: cfg.mse_radius.unwrap_or(DEFAULT_MSE_RADIUS),
                mse_threshold: positive("mse threshold", mse_threshold)?,
            }))
        }
        other => {
            if cfg.mse_radius.is_some() || cfg.mse_threshold.is_some() {
                return Err(LumenError::Config(format!(
                    "MSE parameters given with integration method '{other}'"
                )));
            }
            Err(LumenError::UnimplementedIntegration(other.to_string()))
        }
    }
}

fn resolve_conditioning(cfg: &ConditioningConfig) -> Result<ConditionParams> {
    if !(0.0..=1.0).contains(&cfg.confidence_threshold) {
        return Err(LumenError::Config(format!(
            "confidence threshold must lie in [0, 1], got {}",
            cfg.confidence_threshold
        )));
    }
    if cfg.conservativeness.unsigned_abs() > MAX_CONSERVATIVENESS.unsigned_abs() {
        return Err(LumenError::Config(format!(
            "conservativeness must lie in [-{MAX_CONSERVATIVENESS}, {MAX_CONSERVATIVENESS}]"
        )));
    }
    if !cfg.vector_filter_strength.is_finite() || cfg.vector_filter_strength < 0.0 {
        return Err(LumenError::Config(format!(
            "vector filter strength must be non-negative, got {}",
            cfg.vector_filter_strength
        )));
    }
    Ok(ConditionParams {
        confidence_threshold: cfg.confidence_threshold,
        conservativeness: cfg.conservativeness,
        vector_filter_strength: cfg.vector_filter_strength,
    })
}
