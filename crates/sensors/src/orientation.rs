//! Device orientation derived from accelerometer samples.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Tilt from vertical above which the device counts as held upright.
pub const UPRIGHT_ANGLE_DEGREES: f64 = 50.0;

/// How long a flat reading must persist before it is reported.
pub const HORIZONTAL_DEBOUNCE: Duration = Duration::from_millis(500);

/// How long an upright reading must persist before it is reported.
pub const UPRIGHT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Discretized device orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Tracking disabled, or no stable sample yet.
    #[default]
    Unknown,
    /// Lying flat (e.g. on a table).
    Horizontal,
    /// Anything else, typically held upright.
    Other,
}

impl Orientation {
    pub fn label(&self) -> &'static str {
        match self {
            Orientation::Unknown => "unknown",
            Orientation::Horizontal => "horizontal",
            Orientation::Other => "other",
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Platform handle that turns orientation tracking on and off.
///
/// The platform runs an [`OrientationTracker`] over its accelerometer feed
/// while enabled and reports changes back to the session.
pub trait OrientationSource: Send + Sync {
    fn enable(&self, enabled: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientationConfig {
    pub upright_angle_degrees: f64,
    #[serde(with = "millis")]
    pub horizontal_debounce: Duration,
    #[serde(with = "millis")]
    pub upright_debounce: Duration,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            upright_angle_degrees: UPRIGHT_ANGLE_DEGREES,
            horizontal_debounce: HORIZONTAL_DEBOUNCE,
            upright_debounce: UPRIGHT_DEBOUNCE,
        }
    }
}

impl OrientationConfig {
    fn debounce_for(&self, orientation: Orientation) -> Duration {
        match orientation {
            Orientation::Horizontal => self.horizontal_debounce,
            _ => self.upright_debounce,
        }
    }
}

/// Angle in degrees between the device's z axis and gravity.
///
/// Returns `None` for an all-zero sample, which carries no direction.
pub fn tilt_degrees(x: f64, y: f64, z: f64) -> Option<f64> {
    if x == 0.0 && y == 0.0 && z == 0.0 {
        return None;
    }
    Some((x * x + y * y).sqrt().atan2(z).to_degrees())
}

/// Debounced accelerometer → orientation classifier.
#[derive(Debug, Clone)]
pub struct OrientationTracker {
    config: OrientationConfig,
    enabled: bool,
    current: Orientation,
    pending: Option<(Orientation, Instant)>,
}

impl Default for OrientationTracker {
    fn default() -> Self {
        Self::new(OrientationConfig::default())
    }
}

impl OrientationTracker {
    pub fn new(config: OrientationConfig) -> Self {
        Self {
            config,
            enabled: false,
            current: Orientation::Unknown,
            pending: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn current(&self) -> Orientation {
        self.current
    }

    /// Disabling drops any pending candidate and resets to `Unknown`.
    pub fn enable(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.current = Orientation::Unknown;
            self.pending = None;
        }
    }

    /// Feed one accelerometer sample.
    ///
    /// Returns the new orientation once a changed candidate has persisted
    /// for its debounce window.
    pub fn on_sample(&mut self, x: f64, y: f64, z: f64, now: Instant) -> Option<Orientation> {
        if !self.enabled {
            return None;
        }
        let tilt = tilt_degrees(x, y, z)?;
        let candidate = if tilt > self.config.upright_angle_degrees {
            Orientation::Other
        } else {
            Orientation::Horizontal
        };

        if candidate == self.current {
            self.pending = None;
            return None;
        }

        match self.pending {
            Some((pending, since)) if pending == candidate => {
                if now.duration_since(since) < self.config.debounce_for(candidate) {
                    return None;
                }
                self.current = candidate;
                self.pending = None;
                tracing::debug!(orientation = %candidate, tilt, "orientation changed");
                Some(candidate)
            }
            _ => {
                self.pending = Some((candidate, now));
                None
            }
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
