//! Proximity classification with hysteresis.
//!
//! Pure domain logic plus the capability trait the platform implements for
//! the physical sensor.

use serde::{Deserialize, Serialize};

use crate::ProximityCallback;

/// Distance at or below which an object counts as "near".
pub const DEFAULT_SENSITIVITY_THRESHOLD: f32 = 4.0;

/// The two proximity signals. They are not complementary: right after a
/// mid-range reading the sensor can be neither far nor near.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProximityReading {
    pub near: bool,
    pub far: bool,
}

impl Default for ProximityReading {
    fn default() -> Self {
        Self {
            near: false,
            far: true,
        }
    }
}

/// Classify one raw distance against the previous reading.
///
/// Only a reading at exactly `max_range` counts as far and clears "near".
/// Any other reading keeps the previous "near" unless it is within the
/// sensitivity threshold, which sets it. Intermediate sensor noise between
/// the threshold and the maximum range therefore never toggles "near".
#[allow(clippy::float_cmp)]
pub fn classify(
    raw_distance: f32,
    max_range: f32,
    sensitivity_threshold: f32,
    previous: ProximityReading,
) -> ProximityReading {
    if raw_distance == max_range {
        return ProximityReading {
            near: false,
            far: true,
        };
    }

    ProximityReading {
        near: previous.near || raw_distance <= sensitivity_threshold,
        far: false,
    }
}

/// Tunables for the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub sensitivity_threshold: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            sensitivity_threshold: DEFAULT_SENSITIVITY_THRESHOLD,
        }
    }
}

/// Physical proximity sensor, as exposed by the platform.
///
/// `subscribe` must not invoke the callback synchronously.
pub trait ProximitySensor: Send + Sync {
    /// Maximum distance the sensor can report. Readings equal to it mean "far".
    fn max_range(&self) -> f32;

    /// Start delivering raw distance readings to `callback`.
    fn subscribe(&self, callback: ProximityCallback);

    /// Stop delivering readings.
    fn unsubscribe(&self);
}

/// Stateful wrapper around [`classify`] that remembers the last reading.
#[derive(Debug, Clone)]
pub struct ProximityClassifier {
    max_range: Option<f32>,
    config: ClassifierConfig,
    reading: ProximityReading,
}

impl ProximityClassifier {
    pub fn new(max_range: f32, config: ClassifierConfig) -> Self {
        Self {
            max_range: Some(max_range),
            config,
            reading: ProximityReading::default(),
        }
    }

    /// Classifier for a device without a proximity sensor. Ignores all input.
    pub fn unavailable() -> Self {
        Self {
            max_range: None,
            config: ClassifierConfig::default(),
            reading: ProximityReading::default(),
        }
    }

    pub fn for_sensor(sensor: Option<&dyn ProximitySensor>, config: ClassifierConfig) -> Self {
        match sensor {
            Some(sensor) => Self::new(sensor.max_range(), config),
            None => Self::unavailable(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.max_range.is_some()
    }

    pub fn reading(&self) -> ProximityReading {
        self.reading
    }

    /// Feed a raw distance. Returns `None` when no sensor is available.
    pub fn on_distance(&mut self, raw_distance: f32) -> Option<ProximityReading> {
        let max_range = self.max_range?;
        let next = classify(
            raw_distance,
            max_range,
            self.config.sensitivity_threshold,
            self.reading,
        );
        if next != self.reading {
            tracing::debug!(
                raw_distance,
                near = next.near,
                far = next.far,
                "proximity reading changed"
            );
        }
        self.reading = next;
        Some(next)
    }

    /// Forget the last reading (back to far).
    pub fn reset(&mut self) {
        self.reading = ProximityReading::default();
    }
}
