/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Number of output frames processed concurrently per batch. The source frame
/// cache holds at most `FRAME_BATCH_SIZE + 2 * radius` decoded frames.
pub const FRAME_BATCH_SIZE: usize = 8;

/// B3 spline 1D kernel coefficients: [1, 4, 6, 4, 1] / 16.
pub const B3_KERNEL: [f32; 5] = [1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0];

/// Small epsilon to avoid division by zero in floating-point comparisons.
pub const EPSILON: f32 = 1e-10;

/// ITU-R BT.601 luminance coefficient for the red channel.
pub const LUMINANCE_R: f32 = 0.299;

/// ITU-R BT.601 luminance coefficient for the green channel.
pub const LUMINANCE_G: f32 = 0.587;

/// ITU-R BT.601 luminance coefficient for the blue channel.
pub const LUMINANCE_B: f32 = 0.114;

/// Guided-filter radius used when smoothing displacement fields.
pub const VECTOR_FILTER_RADIUS: usize = 2;

/// Penalty added to the reconstruction error where the forward/backward
/// consistency check rejected the motion vector.
pub const REJECTION_PENALTY: f32 = 1.0;

/// Penalty added to the reconstruction error where the warped neighbor is
/// occluded according to the alpha masks.
pub const OCCLUSION_PENALTY: f32 = 1.0;

/// Lower bound for luma-derived spatial weights.
pub const MIN_LUMA_WEIGHT: f32 = 1e-3;

/// Patch radius used by patch-match when comparing candidate displacements.
pub const DEFAULT_PATCH_RADIUS: usize = 2;

/// Default number of pyramid levels for hierarchical alignment.
pub const DEFAULT_PYRAMID_LEVELS: usize = 3;

/// Gaussian blur sigma used for building alignment pyramids.
pub const PYRAMID_BLUR_SIGMA: f32 = 1.0;

/// Pyramid levels stop once the shorter side would fall below this size.
pub const MIN_PYRAMID_SIDE: usize = 16;

/// Default smoothness weight for the variational flow solvers.
pub const DEFAULT_FLOW_ALPHA: f32 = 0.05;

/// Charbonnier epsilon for the robust variational flow.
pub const CHARBONNIER_EPSILON: f32 = 1e-3;

/// Default window radius (frames on each side of the center).
pub const DEFAULT_WINDOW_RADIUS: usize = 2;

/// Default search radius for patch-match, in pixels.
pub const DEFAULT_MATCH_RADIUS: usize = 4;

/// Default iteration count for the motion estimators.
pub const DEFAULT_ITERATIONS: usize = 4;

/// Default radius of the windowed MSE used for the trust decision.
pub const DEFAULT_MSE_RADIUS: usize = 2;

/// Default MSE acceptance threshold (samples normalized to [0, 1]).
pub const DEFAULT_MSE_THRESHOLD: f32 = 0.002;

/// Frame rate reported for sources that carry no timing information.
pub const DEFAULT_FRAME_RATE: f64 = 25.0;

/// SER timestamps count 100 ns ticks.
pub const SER_TICKS_PER_SECOND: f64 = 10_000_000.0;

/// Largest accepted window radius.
pub const MAX_WINDOW_RADIUS: usize = 32;

/// Accepted range for the consistency conservativeness exponent.
pub const MAX_CONSERVATIVENESS: i32 = 16;

/// Channel name of the alpha/mask plane, both on input and for the
/// integration amount on output.
pub const ALPHA_CHANNEL: &str = "A";
