//! Physical constants and solver defaults

/// Speed of light in vacuum (m/s)
pub const SPEED_OF_LIGHT_MPS: f64 = 299_792_458.0;

/// Mean Earth radius for the spherical model (m)
pub const MEAN_EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Arcseconds in one degree
pub const ARCSECONDS_PER_DEGREE: f64 = 3600.0;

/// Default domain-step tolerance (degrees, or microseconds for emission time)
pub const DEFAULT_XATOL: f64 = 1e-10;

/// Default function-value tolerance (s²)
pub const DEFAULT_FATOL: f64 = 1e-10;

/// Default iteration budget for the simplex search
pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

/// Default function evaluation budget for the simplex search
pub const DEFAULT_MAX_EVALUATIONS: usize = 20_000;

/// Minimum receivers for a position-only solve
pub const MIN_RECEIVERS_FIXED_EMISSION: usize = 3;

/// Minimum receivers when the emission time is estimated as well
pub const MIN_RECEIVERS_FREE_EMISSION: usize = 4;
