//! In-call proximity policy.
//!
//! Decides when the screen-off proximity lock is held, when call audio moves
//! between earpiece and speaker, and when a ringing call is auto-answered.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Domain Layer                             │
//! │  decide.rs       - SignalSnapshot and pure decisions        │
//! │  subscription.rs - Sensor subscription reasons (bitset)     │
//! │  prefs.rs        - Preference keys, defaults and loading    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Collaborator Layer                          │
//! │  actuators.rs - Wake lock, audio router, telephony traits   │
//! │  timer.rs     - Cancellable deferred tasks (tokio)          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Application Layer                          │
//! │  session.rs - Serialized entry points, recompute, teardown  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use nearcall_policy::{Collaborators, ProximitySession, SessionConfig};
//!
//! let session = ProximitySession::new(collaborators, SessionConfig::default());
//! session.on_call_state_changed(CallState::Idle, CallState::Outgoing, &CallList::default());
//! session.on_proximity_distance(0.0);
//! session.tear_down();
//! ```

mod actuators;
mod decide;
mod error;
mod prefs;
mod session;
mod subscription;
mod timer;

pub use actuators::{AudioRouter, LockState, TelephonyControl, WakeLockHandle};
pub use decide::{
    decide_lock, decide_speaker, screen_on_immediately, should_auto_answer, LockAction,
    SignalSnapshot, SpeakerAction,
};
pub use error::{ActuatorError, PreferenceError};
pub use prefs::{
    MemoryPreferenceStore, PreferenceStore, ProximityPreferences, DEFAULT_AUTO_SPEAKER_DELAY_MS,
    KEY_AUTO_ANSWER_INCALL_ONLY, KEY_AUTO_SPEAKER_DELAY_MS, KEY_AUTO_SPEAKER_ENABLED,
    KEY_AUTO_SPEAKER_INCALL_ONLY, KEY_PROXIMITY_SENSOR_DISABLED,
};
pub use session::{Collaborators, ProximitySession, SessionConfig};
pub use subscription::{SubscriptionChange, SubscriptionReason, SubscriptionReasons};
pub use timer::{Scheduler, TimerHandle, TimerTask, TokioScheduler};

// Re-export the signal and call types the session API speaks in.
pub use nearcall_call::{ActiveCall, AudioRoute, CallList, CallState, CallStatus};
pub use nearcall_sensors::{
    DisplayQuery, Orientation, OrientationSource, ProximityCallback, ProximitySensor,
};
