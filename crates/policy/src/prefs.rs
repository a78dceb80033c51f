//! User preferences that gate the policy.
//!
//! Preferences are re-read from the [`PreferenceStore`] on every recompute,
//! so a toggle in settings takes effect on the next event. Read failures
//! never fail a recompute: the affected key falls back to its default.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PreferenceError;

pub const KEY_PROXIMITY_SENSOR_DISABLED: &str = "proximity-sensor-disabled";
pub const KEY_AUTO_SPEAKER_ENABLED: &str = "auto-speaker-enabled";
pub const KEY_AUTO_SPEAKER_INCALL_ONLY: &str = "auto-speaker-incall-only";
pub const KEY_AUTO_SPEAKER_DELAY_MS: &str = "auto-speaker-delay-ms";
pub const KEY_AUTO_ANSWER_INCALL_ONLY: &str = "auto-answer-incall-only";

/// Default delay before switching to speaker.
pub const DEFAULT_AUTO_SPEAKER_DELAY_MS: u64 = 3000;

/// Key/value preference backend.
///
/// Missing keys return `default`. `Err` is reserved for type mismatches and
/// backend failures.
pub trait PreferenceStore: Send + Sync {
    fn get_bool(&self, key: &str, default: bool) -> Result<bool, PreferenceError>;
    fn get_int(&self, key: &str, default: i64) -> Result<i64, PreferenceError>;
}

/// Snapshot of every preference the policy reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityPreferences {
    /// The user turned the proximity screen-off behavior off entirely.
    pub sensor_disabled: bool,
    /// Route to speaker when the phone is moved away from the ear.
    pub auto_speaker: bool,
    /// Restrict auto speaker to incoming/ongoing calls. Also keeps the
    /// screen-off lock engaged while ringing.
    pub auto_speaker_incall_only: bool,
    pub auto_speaker_delay_ms: u64,
    /// Answer a ringing call when the phone is raised to the ear.
    pub auto_answer: bool,
}

impl Default for ProximityPreferences {
    fn default() -> Self {
        Self {
            sensor_disabled: false,
            auto_speaker: false,
            auto_speaker_incall_only: false,
            auto_speaker_delay_ms: DEFAULT_AUTO_SPEAKER_DELAY_MS,
            auto_answer: false,
        }
    }
}

impl ProximityPreferences {
    pub fn auto_speaker_delay(&self) -> Duration {
        Duration::from_millis(self.auto_speaker_delay_ms)
    }

    /// Read all keys, substituting defaults for anything unreadable.
    pub fn load(store: &dyn PreferenceStore) -> Self {
        let defaults = Self::default();
        let delay = read_int(
            store,
            KEY_AUTO_SPEAKER_DELAY_MS,
            defaults.auto_speaker_delay_ms as i64,
        );
        let auto_speaker_delay_ms = u64::try_from(delay).unwrap_or_else(|_| {
            tracing::warn!(delay, "negative auto speaker delay, using default");
            defaults.auto_speaker_delay_ms
        });

        Self {
            sensor_disabled: read_bool(
                store,
                KEY_PROXIMITY_SENSOR_DISABLED,
                defaults.sensor_disabled,
            ),
            auto_speaker: read_bool(store, KEY_AUTO_SPEAKER_ENABLED, defaults.auto_speaker),
            auto_speaker_incall_only: read_bool(
                store,
                KEY_AUTO_SPEAKER_INCALL_ONLY,
                defaults.auto_speaker_incall_only,
            ),
            auto_speaker_delay_ms,
            auto_answer: read_bool(store, KEY_AUTO_ANSWER_INCALL_ONLY, defaults.auto_answer),
        }
    }

    /// Write every field into a memory store under its preference key.
    pub fn apply_to(&self, store: &MemoryPreferenceStore) {
        store.set_bool(KEY_PROXIMITY_SENSOR_DISABLED, self.sensor_disabled);
        store.set_bool(KEY_AUTO_SPEAKER_ENABLED, self.auto_speaker);
        store.set_bool(KEY_AUTO_SPEAKER_INCALL_ONLY, self.auto_speaker_incall_only);
        store.set_int(KEY_AUTO_SPEAKER_DELAY_MS, self.auto_speaker_delay_ms as i64);
        store.set_bool(KEY_AUTO_ANSWER_INCALL_ONLY, self.auto_answer);
    }
}

fn read_bool(store: &dyn PreferenceStore, key: &str, default: bool) -> bool {
    store.get_bool(key, default).unwrap_or_else(|e| {
        tracing::warn!(key, error = %e, default, "preference read failed");
        default
    })
}

fn read_int(store: &dyn PreferenceStore, key: &str, default: i64) -> i64 {
    store.get_int(key, default).unwrap_or_else(|e| {
        tracing::warn!(key, error = %e, default, "preference read failed");
        default
    })
}

/// Thread-safe in-memory store, optionally seeded from a JSON object.
///
/// Booleans also accept `0`/`1`, matching how system settings store flags.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a JSON object such as `{"auto-speaker-enabled": true}`.
    pub fn from_json(json: &str) -> Result<Self, PreferenceError> {
        let values: HashMap<String, Value> = serde_json::from_str(json)?;
        Ok(Self {
            values: RwLock::new(values),
        })
    }

    pub fn set_bool(&self, key: &str, value: bool) {
        self.set(key, Value::Bool(value));
    }

    pub fn set_int(&self, key: &str, value: i64) {
        self.set(key, Value::from(value));
    }

    pub fn remove(&self, key: &str) {
        if let Ok(mut guard) = self.values.write() {
            guard.remove(key);
        }
    }

    fn set(&self, key: &str, value: Value) {
        if let Ok(mut guard) = self.values.write() {
            guard.insert(key.to_string(), value);
        }
    }

    fn get(&self, key: &str) -> Result<Option<Value>, PreferenceError> {
        let guard = self
            .values
            .read()
            .map_err(|e| PreferenceError::Unavailable(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get_bool(&self, key: &str, default: bool) -> Result<bool, PreferenceError> {
        match self.get(key)? {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(b),
            Some(Value::Number(n)) if n.as_i64() == Some(0) => Ok(false),
            Some(Value::Number(n)) if n.as_i64() == Some(1) => Ok(true),
            Some(_) => Err(PreferenceError::TypeMismatch {
                key: key.to_string(),
                expected: "bool",
            }),
        }
    }

    fn get_int(&self, key: &str, default: i64) -> Result<i64, PreferenceError> {
        match self.get(key)? {
            None => Ok(default),
            Some(Value::Number(n)) => n.as_i64().ok_or_else(|| PreferenceError::TypeMismatch {
                key: key.to_string(),
                expected: "integer",
            }),
            Some(_) => Err(PreferenceError::TypeMismatch {
                key: key.to_string(),
                expected: "integer",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenStore;

    impl PreferenceStore for BrokenStore {
        fn get_bool(&self, _key: &str, _default: bool) -> Result<bool, PreferenceError> {
            Err(PreferenceError::Unavailable("disk gone".to_string()))
        }

        fn get_int(&self, _key: &str, _default: i64) -> Result<i64, PreferenceError> {
            Err(PreferenceError::Unavailable("disk gone".to_string()))
        }
    }

    #[test]
    fn test_empty_store_yields_defaults() {
        let prefs = ProximityPreferences::load(&MemoryPreferenceStore::new());
        assert_eq!(prefs, ProximityPreferences::default());
        assert_eq!(prefs.auto_speaker_delay(), Duration::from_millis(3000));
    }

    #[test]
    fn test_failing_store_falls_back_to_defaults() {
        let prefs = ProximityPreferences::load(&BrokenStore);
        assert_eq!(prefs, ProximityPreferences::default());
    }

    #[test]
    fn test_json_seed_with_integer_flags() {
        let store = MemoryPreferenceStore::from_json(
            r#"{
                "auto-speaker-enabled": 1,
                "auto-speaker-incall-only": false,
                "auto-speaker-delay-ms": 1500,
                "auto-answer-incall-only": true
            }"#,
        )
        .unwrap();
        let prefs = ProximityPreferences::load(&store);
        assert!(prefs.auto_speaker);
        assert!(!prefs.auto_speaker_incall_only);
        assert!(prefs.auto_answer);
        assert_eq!(prefs.auto_speaker_delay_ms, 1500);
    }

    #[test]
    fn test_type_mismatch_falls_back_per_key() {
        let store = MemoryPreferenceStore::new();
        store.set(KEY_AUTO_SPEAKER_ENABLED, Value::String("yes".to_string()));
        store.set_int(KEY_AUTO_SPEAKER_DELAY_MS, 800);

        assert!(matches!(
            store.get_bool(KEY_AUTO_SPEAKER_ENABLED, false),
            Err(PreferenceError::TypeMismatch { .. })
        ));
        let prefs = ProximityPreferences::load(&store);
        assert!(!prefs.auto_speaker);
        assert_eq!(prefs.auto_speaker_delay_ms, 800);
    }

    #[test]
    fn test_negative_delay_uses_default() {
        let store = MemoryPreferenceStore::new();
        store.set_int(KEY_AUTO_SPEAKER_DELAY_MS, -5);
        let prefs = ProximityPreferences::load(&store);
        assert_eq!(prefs.auto_speaker_delay_ms, DEFAULT_AUTO_SPEAKER_DELAY_MS);
    }

    #[test]
    fn test_apply_to_round_trips_through_store() {
        let wanted = ProximityPreferences {
            sensor_disabled: true,
            auto_speaker: true,
            auto_speaker_incall_only: true,
            auto_speaker_delay_ms: 250,
            auto_answer: true,
        };
        let store = MemoryPreferenceStore::new();
        wanted.apply_to(&store);
        assert_eq!(ProximityPreferences::load(&store), wanted);

        store.remove(KEY_AUTO_SPEAKER_DELAY_MS);
        assert_eq!(
            ProximityPreferences::load(&store).auto_speaker_delay_ms,
            DEFAULT_AUTO_SPEAKER_DELAY_MS
        );
    }

    #[test]
    fn test_invalid_json_seed_is_an_error() {
        assert!(matches!(
            MemoryPreferenceStore::from_json("[1, 2"),
            Err(PreferenceError::Invalid(_))
        ));
    }
}
