//! Application-wide constants and default values.

// # Brightness transition tuning

/// Extra seconds added to every guard window. The bridge keeps reporting a
/// snapped value for a while after a transition nominally ends.
pub const DEFAULT_SETTLE_BUFFER: f64 = 2.0;

/// Floor for sweep durations, in seconds.
pub const MIN_SWEEP: f64 = 0.1;

/// Sweep stored on stopped records. Only ever used as a divisor guard.
pub const NOMINAL_SWEEP: f64 = 1.0;

/// Smallest brightness change worth sending (1/254 of full scale, in percent).
pub const DEFAULT_MIN_STEP: f64 = 0.4;

/// Seconds for a full 0% to 100% sweep when a command gives none.
pub const DEFAULT_SWEEP_TIME: f64 = 5.0;

pub const DEFAULT_MAX_BRIGHTNESS: f64 = 100.0;
pub const DEFAULT_MIN_BRIGHTNESS: f64 = 0.0;

/// Below this a resolved brightness is treated as "unknown" and the raw
/// dimming value is fetched from the bridge instead.
pub const BRIGHTNESS_EPSILON: f64 = 0.1;

// # Colour temperature

/// Kelvin range assumed when a light publishes no mirek schema.
pub const DEFAULT_MIN_COLOR_TEMP_KELVIN: u32 = 2000;
pub const DEFAULT_MAX_COLOR_TEMP_KELVIN: u32 = 6535;

// # Validation limits

pub const MINIMUM_SWEEP_TIME: f64 = MIN_SWEEP;
pub const MAXIMUM_SWEEP_TIME: f64 = 3600.0;
pub const MINIMUM_SETTLE_BUFFER: f64 = 0.0;
pub const MAXIMUM_SETTLE_BUFFER: f64 = 60.0;
pub const MINIMUM_MIN_STEP: f64 = 0.0;
pub const MAXIMUM_MIN_STEP: f64 = 10.0;
pub const MINIMUM_REQUEST_TIMEOUT_MS: u64 = 100;
pub const MAXIMUM_REQUEST_TIMEOUT_MS: u64 = 60_000;

// # Bridge transport

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 3000;
pub const CLIP_RESOURCE_PATH: &str = "clip/v2/resource";
pub const APPLICATION_KEY_HEADER: &str = "hue-application-key";

// # IPC

pub const SOCKET_FILE_NAME: &str = "huedimmer.sock";
pub const IPC_POLL_INTERVAL_MS: u64 = 10;
pub const IPC_READ_TIMEOUT_MS: u64 = 2000;
/// Client-side wait for a response; covers several bridge round-trips.
pub const IPC_CLIENT_TIMEOUT_MS: u64 = 30_000;

// # Files

pub const CONFIG_DIR_NAME: &str = "huedimmer";
pub const CONFIG_FILE_NAME: &str = "huedimmer.toml";

// # Exit codes

pub const EXIT_FAILURE: i32 = 1;
