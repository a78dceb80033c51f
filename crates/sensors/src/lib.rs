//! Hardware-facing signal trackers for the in-call proximity policy.
//!
//! Each tracker turns a raw platform signal into the discrete value the
//! policy engine consumes:
//! - `proximity.rs`   - distance readings → near/far with hysteresis
//! - `orientation.rs` - accelerometer samples → flat/upright, debounced
//! - `display.rs`     - display on/off flips of the default display
//!
//! The platform owns the actual sensors; it hands readings in through the
//! capability traits declared here and never calls into policy code directly.

mod display;
mod orientation;
mod proximity;

pub use display::{DisplayQuery, DisplayStateTracker, DEFAULT_DISPLAY_ID};
pub use orientation::{
    tilt_degrees, Orientation, OrientationConfig, OrientationSource, OrientationTracker,
    HORIZONTAL_DEBOUNCE, UPRIGHT_ANGLE_DEGREES, UPRIGHT_DEBOUNCE,
};
pub use proximity::{
    classify, ClassifierConfig, ProximityClassifier, ProximityReading, ProximitySensor,
    DEFAULT_SENSITIVITY_THRESHOLD,
};

/// Callback invoked with every raw proximity distance the hardware reports.
pub type ProximityCallback = std::sync::Arc<dyn Fn(f32) + Send + Sync + 'static>;

pub fn new_proximity_callback<F>(f: F) -> ProximityCallback
where
    F: Fn(f32) + Send + Sync + 'static,
{
    std::sync::Arc::new(f)
}
