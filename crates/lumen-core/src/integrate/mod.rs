pub mod accumulator;
pub mod decision;
pub mod observer;

pub use accumulator::TemporalAccumulator;
pub use decision::{decide, CenterView, Decision, NeighborView};
pub use observer::{DecisionObserver, NoOpObserver, VectorDumpObserver};

/// Threshold-based trust parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrustParams {
    /// Radius of the windowed MSE.
    pub mse_radius: usize,
    /// Smoothed error must stay strictly below this to accept the neighbor.
    pub mse_threshold: f32,
}

/// Temporal integration strategy, resolved from configuration.
///
/// Only methods that are implemented have a variant here; recognised but
/// unavailable methods are rejected while validating the configuration.
#[derive(Clone, Debug, PartialEq)]
pub enum IntegrationStrategy {
    Mse(TrustParams),
}

impl std::fmt::Display for IntegrationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mse(p) => write!(f, "MSE (r={}, t={})", p.mse_radius, p.mse_threshold),
        }
    }
}
