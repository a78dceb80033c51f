//! Simulated platform devices.
//!
//! Each device prints and records the calls the policy makes on it. Route
//! requests are not echoed back synchronously; the runner feeds them to the
//! session after each step, like the platform's route-changed callback.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use nearcall_policy::{
    ActuatorError, AudioRoute, AudioRouter, DisplayQuery, Orientation, OrientationSource,
    ProximityCallback, ProximitySensor, TelephonyControl, WakeLockHandle,
};
use nearcall_sensors::OrientationTracker;

/// One call the policy made on a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    AcquireWakeLock,
    ReleaseWakeLock { restore_immediately: bool },
    SetAudioRoute(AudioRoute),
    AcceptRingingCall,
    SubscribeProximity,
    UnsubscribeProximity,
    EnableOrientation(bool),
}

impl fmt::Display for ActuatorCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActuatorCall::AcquireWakeLock => write!(f, "wake_lock.acquire()"),
            ActuatorCall::ReleaseWakeLock {
                restore_immediately,
            } => write!(
                f,
                "wake_lock.release(restore_immediately={restore_immediately})"
            ),
            ActuatorCall::SetAudioRoute(route) => write!(f, "audio.set_route({route})"),
            ActuatorCall::AcceptRingingCall => write!(f, "telephony.accept_ringing_call()"),
            ActuatorCall::SubscribeProximity => write!(f, "proximity.subscribe()"),
            ActuatorCall::UnsubscribeProximity => write!(f, "proximity.unsubscribe()"),
            ActuatorCall::EnableOrientation(enabled) => {
                write!(f, "orientation.enable({enabled})")
            }
        }
    }
}

/// Shared, ordered record of actuator calls.
#[derive(Debug, Clone, Default)]
pub struct Transcript(Arc<Mutex<Vec<ActuatorCall>>>);

impl Transcript {
    pub fn record(&self, call: ActuatorCall) {
        println!("    -> {call}");
        tracing::debug!(%call, "actuator call");
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    pub fn calls(&self) -> Vec<ActuatorCall> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) struct SimWakeLock {
    held: AtomicBool,
    transcript: Transcript,
}

impl SimWakeLock {
    pub(crate) fn new(transcript: Transcript) -> Self {
        Self {
            held: AtomicBool::new(false),
            transcript,
        }
    }
}

impl WakeLockHandle for SimWakeLock {
    fn acquire(&self) -> Result<(), ActuatorError> {
        self.transcript.record(ActuatorCall::AcquireWakeLock);
        self.held.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self, restore_immediately: bool) -> Result<(), ActuatorError> {
        self.transcript.record(ActuatorCall::ReleaseWakeLock {
            restore_immediately,
        });
        self.held.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

pub(crate) struct SimAudioRouter {
    requested: Mutex<Option<AudioRoute>>,
    transcript: Transcript,
}

impl SimAudioRouter {
    pub(crate) fn new(transcript: Transcript) -> Self {
        Self {
            requested: Mutex::new(None),
            transcript,
        }
    }

    /// Route requested since the last call, if any.
    pub(crate) fn take_requested(&self) -> Option<AudioRoute> {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl AudioRouter for SimAudioRouter {
    fn set_route(&self, route: AudioRoute) -> Result<(), ActuatorError> {
        self.transcript.record(ActuatorCall::SetAudioRoute(route));
        *self
            .requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(route);
        Ok(())
    }
}

pub(crate) struct SimTelephony {
    transcript: Transcript,
}

impl SimTelephony {
    pub(crate) fn new(transcript: Transcript) -> Self {
        Self { transcript }
    }
}

impl TelephonyControl for SimTelephony {
    fn accept_ringing_call(&self) -> Result<(), ActuatorError> {
        self.transcript.record(ActuatorCall::AcceptRingingCall);
        Ok(())
    }
}

pub(crate) struct SimDisplay {
    screen_on: AtomicBool,
}

impl SimDisplay {
    pub(crate) fn new() -> Self {
        Self {
            screen_on: AtomicBool::new(true),
        }
    }

    pub(crate) fn set_screen_on(&self, on: bool) {
        self.screen_on.store(on, Ordering::SeqCst);
    }
}

impl DisplayQuery for SimDisplay {
    fn is_screen_on(&self) -> bool {
        self.screen_on.load(Ordering::SeqCst)
    }
}

pub(crate) struct SimProximity {
    max_range: f32,
    callback: Mutex<Option<ProximityCallback>>,
    transcript: Transcript,
}

impl SimProximity {
    pub(crate) fn new(max_range: f32, transcript: Transcript) -> Self {
        Self {
            max_range,
            callback: Mutex::new(None),
            transcript,
        }
    }

    /// Deliver a reading. Returns `false` when nobody is subscribed.
    pub(crate) fn emit(&self, distance: f32) -> bool {
        let callback = self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match callback {
            Some(callback) => {
                callback(distance);
                true
            }
            None => false,
        }
    }
}

impl ProximitySensor for SimProximity {
    fn max_range(&self) -> f32 {
        self.max_range
    }

    fn subscribe(&self, callback: ProximityCallback) {
        self.transcript.record(ActuatorCall::SubscribeProximity);
        *self.callback.lock().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    fn unsubscribe(&self) {
        self.transcript.record(ActuatorCall::UnsubscribeProximity);
        *self.callback.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Accelerometer whose samples are classified by an [`OrientationTracker`].
pub(crate) struct SimAccelerometer {
    tracker: Mutex<OrientationTracker>,
    transcript: Transcript,
}

impl SimAccelerometer {
    pub(crate) fn new(transcript: Transcript) -> Self {
        Self {
            tracker: Mutex::new(OrientationTracker::default()),
            transcript,
        }
    }

    pub(crate) fn sample(&self, x: f64, y: f64, z: f64, now: Instant) -> Option<Orientation> {
        self.tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_sample(x, y, z, now)
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_enabled()
    }
}

impl OrientationSource for SimAccelerometer {
    fn enable(&self, enabled: bool) {
        self.transcript.record(ActuatorCall::EnableOrientation(enabled));
        self.tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .enable(enabled);
    }
}
