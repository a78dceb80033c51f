//! Recording fakes for every session collaborator.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use nearcall_policy::{
    ActuatorError, AudioRoute, AudioRouter, Collaborators, DisplayQuery, MemoryPreferenceStore,
    OrientationSource, ProximityCallback, ProximityPreferences, ProximitySensor, ProximitySession,
    Scheduler, SessionConfig, TelephonyControl, TimerHandle, TimerTask, TokioScheduler,
    WakeLockHandle,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

pub const MAX_RANGE: f32 = 5.0;
pub const NEAR: f32 = 0.0;
pub const FAR: f32 = MAX_RANGE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Acquire,
    Release { restore_immediately: bool },
    Route(AudioRoute),
    Accept,
    Subscribe,
    Unsubscribe,
    Orientation(bool),
}

#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<Call>>>);

impl Log {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

pub struct FakeWakeLock {
    log: Log,
    held: AtomicBool,
}

impl WakeLockHandle for FakeWakeLock {
    fn acquire(&self) -> Result<(), ActuatorError> {
        self.log.push(Call::Acquire);
        self.held.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self, restore_immediately: bool) -> Result<(), ActuatorError> {
        self.log.push(Call::Release {
            restore_immediately,
        });
        self.held.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

pub struct FakeRouter {
    log: Log,
}

impl AudioRouter for FakeRouter {
    fn set_route(&self, route: AudioRoute) -> Result<(), ActuatorError> {
        self.log.push(Call::Route(route));
        Ok(())
    }
}

/// Telephony that rejects its first `failures` accepts.
pub struct FakeTelephony {
    log: Log,
    failures: AtomicUsize,
}

impl TelephonyControl for FakeTelephony {
    fn accept_ringing_call(&self) -> Result<(), ActuatorError> {
        self.log.push(Call::Accept);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ActuatorError::Telephony("modem busy".to_string()));
        }
        Ok(())
    }
}

/// Scheduler that keeps tasks until the test runs them. Cancelling a handle
/// does not drop its task, so a superseded task can still be fired late.
#[derive(Default)]
pub struct ManualScheduler {
    tasks: Mutex<Vec<Option<TimerTask>>>,
}

impl ManualScheduler {
    pub fn scheduled(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    /// Run the `index`-th scheduled task, ignoring cancellation.
    pub fn fire(&self, index: usize) {
        let task = self.tasks.lock().unwrap()[index].take();
        if let Some(task) = task {
            task();
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, _delay: Duration, task: TimerTask) -> TimerHandle {
        self.tasks.lock().unwrap().push(Some(task));
        TimerHandle::new(CancellationToken::new())
    }
}

pub struct FakeDisplay {
    pub screen_on: AtomicBool,
}

impl DisplayQuery for FakeDisplay {
    fn is_screen_on(&self) -> bool {
        self.screen_on.load(Ordering::SeqCst)
    }
}

pub struct FakeOrientation {
    log: Log,
}

impl OrientationSource for FakeOrientation {
    fn enable(&self, enabled: bool) {
        self.log.push(Call::Orientation(enabled));
    }
}

/// Proximity hardware that delivers readings only while subscribed.
pub struct FakeProximity {
    log: Log,
    callback: Mutex<Option<ProximityCallback>>,
}

impl FakeProximity {
    pub fn emit(&self, distance: f32) {
        let callback = self.callback.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback(distance);
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.callback.lock().unwrap().is_some()
    }
}

impl ProximitySensor for FakeProximity {
    fn max_range(&self) -> f32 {
        MAX_RANGE
    }

    fn subscribe(&self, callback: ProximityCallback) {
        self.log.push(Call::Subscribe);
        *self.callback.lock().unwrap() = Some(callback);
    }

    fn unsubscribe(&self) {
        self.log.push(Call::Unsubscribe);
        *self.callback.lock().unwrap() = None;
    }
}

/// Route session logs through the test harness. Set `RUST_LOG` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub struct Rig {
    pub session: ProximitySession,
    pub log: Log,
    pub prefs: Arc<MemoryPreferenceStore>,
    pub sensor: Arc<FakeProximity>,
    pub display: Arc<FakeDisplay>,
}

pub struct RigBuilder {
    prefs: ProximityPreferences,
    with_sensor: bool,
    with_telephony: bool,
    telephony_failures: usize,
    scheduler: Option<Arc<ManualScheduler>>,
}

impl RigBuilder {
    pub fn prefs(mut self, prefs: ProximityPreferences) -> Self {
        self.prefs = prefs;
        self
    }

    pub fn without_sensor(mut self) -> Self {
        self.with_sensor = false;
        self
    }

    pub fn without_telephony(mut self) -> Self {
        self.with_telephony = false;
        self
    }

    pub fn failing_accepts(mut self, failures: usize) -> Self {
        self.telephony_failures = failures;
        self
    }

    pub fn scheduler(mut self, scheduler: Arc<ManualScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Must be called inside a tokio runtime.
    pub fn build(self) -> Rig {
        init_tracing();
        let log = Log::default();
        let prefs = Arc::new(MemoryPreferenceStore::new());
        self.prefs.apply_to(&prefs);

        let sensor = Arc::new(FakeProximity {
            log: log.clone(),
            callback: Mutex::new(None),
        });
        let display = Arc::new(FakeDisplay {
            screen_on: AtomicBool::new(true),
        });

        let io = Collaborators {
            wake_lock: Some(Arc::new(FakeWakeLock {
                log: log.clone(),
                held: AtomicBool::new(false),
            })),
            audio_router: Arc::new(FakeRouter { log: log.clone() }),
            telephony: self.with_telephony.then(|| {
                Arc::new(FakeTelephony {
                    log: log.clone(),
                    failures: AtomicUsize::new(self.telephony_failures),
                }) as Arc<dyn TelephonyControl>
            }),
            display: display.clone(),
            proximity: self
                .with_sensor
                .then(|| sensor.clone() as Arc<dyn ProximitySensor>),
            orientation: Arc::new(FakeOrientation { log: log.clone() }),
            preferences: prefs.clone(),
            scheduler: match self.scheduler {
                Some(manual) => manual as Arc<dyn Scheduler>,
                None => Arc::new(TokioScheduler::try_current().expect("tokio runtime")),
            },
        };

        Rig {
            session: ProximitySession::new(io, SessionConfig::default()),
            log,
            prefs,
            sensor,
            display,
        }
    }
}

impl Rig {
    pub fn builder() -> RigBuilder {
        RigBuilder {
            prefs: ProximityPreferences::default(),
            with_sensor: true,
            with_telephony: true,
            telephony_failures: 0,
            scheduler: None,
        }
    }

    pub fn speaker_prefs() -> ProximityPreferences {
        ProximityPreferences {
            auto_speaker: true,
            ..ProximityPreferences::default()
        }
    }

    pub fn auto_answer_prefs() -> ProximityPreferences {
        ProximityPreferences {
            auto_answer: true,
            ..ProximityPreferences::default()
        }
    }

    pub fn speaker_routes(&self) -> usize {
        self.log.count(Call::Route(AudioRoute::Speaker))
    }
}
