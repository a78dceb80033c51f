//! Call-UI session: owns the signal snapshot and drives the actuators.
//!
//! Every entry point takes the session lock, refreshes preferences, mutates
//! the snapshot and runs the recompute it needs before releasing the lock.
//! Actuator calls are made while the lock is held, so collaborators must not
//! call back into the session synchronously.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use nearcall_call::{AudioRoute, CallList, CallState, CallStateAggregator, CallStatus, Trigger};
use nearcall_sensors::{
    new_proximity_callback, ClassifierConfig, DisplayQuery, DisplayStateTracker, Orientation,
    OrientationSource, ProximityClassifier, ProximitySensor,
};

use crate::actuators::{AudioRouter, LockState, ScreenLock, TelephonyControl, WakeLockHandle};
use crate::decide::{self, LockAction, SignalSnapshot, SpeakerAction};
use crate::prefs::{PreferenceStore, ProximityPreferences};
use crate::subscription::{SubscriptionChange, SubscriptionReason, SubscriptionReasons};
use crate::timer::{Scheduler, TimerHandle};

/// Platform services the session talks to.
pub struct Collaborators {
    /// `None` when the platform has no proximity screen-off lock.
    pub wake_lock: Option<Arc<dyn WakeLockHandle>>,
    pub audio_router: Arc<dyn AudioRouter>,
    /// `None` when no telephony control handle could be obtained.
    pub telephony: Option<Arc<dyn TelephonyControl>>,
    pub display: Arc<dyn DisplayQuery>,
    /// `None` on devices without a proximity sensor.
    pub proximity: Option<Arc<dyn ProximitySensor>>,
    pub orientation: Arc<dyn OrientationSource>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub scheduler: Arc<dyn Scheduler>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionConfig {
    pub classifier: ClassifierConfig,
}

struct PendingSpeakerActivation {
    generation: u64,
    route: AudioRoute,
    delay: Duration,
    timer: TimerHandle,
}

struct SessionState {
    snapshot: SignalSnapshot,
    prefs: ProximityPreferences,
    classifier: ProximityClassifier,
    calls: CallStateAggregator,
    display: DisplayStateTracker,
    lock: ScreenLock,
    subscriptions: SubscriptionReasons,
    pending_speaker: Option<PendingSpeakerActivation>,
    next_generation: u64,
    last_answered_call: Option<String>,
    torn_down: bool,
}

struct Shared {
    state: Mutex<SessionState>,
    io: Collaborators,
}

/// Proximity policy for one call-UI session.
///
/// Dropping the session tears it down.
pub struct ProximitySession {
    shared: Arc<Shared>,
}

impl ProximitySession {
    pub fn new(io: Collaborators, config: SessionConfig) -> Self {
        let prefs = ProximityPreferences::load(io.preferences.as_ref());
        let classifier = ProximityClassifier::for_sensor(io.proximity.as_deref(), config.classifier);

        let lock = match &io.wake_lock {
            Some(handle) if classifier.is_available() && !prefs.sensor_disabled => {
                ScreenLock::new(Arc::clone(handle))
            }
            Some(handle) => {
                // Never leave a lock behind that this session will not manage.
                ScreenLock::new(Arc::clone(handle)).release(true);
                ScreenLock::detached()
            }
            None => ScreenLock::detached(),
        };

        tracing::info!(
            sensor_available = classifier.is_available(),
            sensor_disabled = prefs.sensor_disabled,
            wake_lock = io.wake_lock.is_some(),
            "proximity session started"
        );

        let snapshot = SignalSnapshot {
            sensor_disabled_by_preference: prefs.sensor_disabled,
            ..SignalSnapshot::default()
        };

        let state = SessionState {
            snapshot,
            prefs,
            classifier,
            calls: CallStateAggregator::new(),
            display: DisplayStateTracker::new(),
            lock,
            subscriptions: SubscriptionReasons::default(),
            pending_speaker: None,
            next_generation: 0,
            last_answered_call: None,
            torn_down: false,
        };

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                io,
            }),
        }
    }

    /// Raw distance from the proximity sensor.
    pub fn on_proximity_distance(&self, raw_distance: f32) {
        self.shared.on_proximity_distance(raw_distance);
    }

    pub fn on_orientation_changed(&self, orientation: Orientation) {
        self.shared.update(|state, _| {
            state.snapshot.orientation = orientation;
            state.recompute_lock();
        });
    }

    pub fn on_call_state_changed(&self, old_state: CallState, new_state: CallState, calls: &CallList) {
        self.shared.update(|state, shared| {
            let change = state.calls.on_call_state_changed(old_state, new_state, calls);
            state.snapshot.apply_call_status(change.status);
            state.update_subscriptions(shared);

            for trigger in change.triggers() {
                match trigger {
                    Trigger::Resync => state.resync(shared),
                    Trigger::OutgoingAnswered => {
                        let far = state.snapshot.proximity_far;
                        state.recompute_speaker_route(far, shared);
                        state.recompute_lock();
                    }
                    Trigger::Incoming => {
                        let near = state.snapshot.proximity_near;
                        state.maybe_auto_answer(near, &shared.io);
                        state.recompute_lock();
                    }
                }
            }
        });
    }

    pub fn on_audio_route_changed(&self, route: AudioRoute) {
        self.shared.update(|state, _| {
            if !state.calls.on_audio_route_changed(route) {
                return;
            }
            state.snapshot.audio_route = route;
            if route != AudioRoute::Earpiece {
                // Speaker already on, or audio left the handset.
                state.cancel_pending_speaker();
            }
            state.recompute_lock();
        });
    }

    /// Call UI moved in or out of the foreground.
    ///
    /// Going to the background because the screen turned off still counts
    /// as showing; only another app taking over hides the UI.
    pub fn on_in_call_showing(&self, showing: bool) {
        self.shared.update(|state, shared| {
            if showing {
                state.snapshot.ui_showing = true;
            } else if shared.io.display.is_screen_on() {
                state.snapshot.ui_showing = false;
            }
            state.recompute_lock();
        });
    }

    pub fn on_dialpad_visible(&self, visible: bool) {
        self.shared.update(|state, _| {
            state.snapshot.dialpad_visible = visible;
            state.recompute_lock();
        });
    }

    pub fn set_attempting_video_call(&self, attempting: bool) {
        self.shared.update(|state, _| {
            tracing::info!(attempting, "attempting video call changed");
            state.snapshot.is_attempting_video_call = attempting;
            state.recompute_lock();
        });
    }

    /// Display-changed notification. Orientation tracking follows the
    /// default display's power state.
    pub fn on_display_changed(&self, display_id: u32, is_on: bool) {
        self.shared.update(|state, shared| {
            if let Some(on) = state.display.on_display_changed(display_id, is_on) {
                shared.io.orientation.enable(on);
            }
        });
    }

    /// Release the lock, cancel pending work and stop all listeners.
    /// Later events are ignored.
    pub fn tear_down(&self) {
        self.shared.tear_down();
    }

    pub fn snapshot(&self) -> SignalSnapshot {
        self.shared.lock().snapshot
    }

    pub fn call_status(&self) -> CallStatus {
        self.shared.lock().calls.status()
    }

    pub fn preferences(&self) -> ProximityPreferences {
        self.shared.lock().prefs
    }

    pub fn lock_state(&self) -> LockState {
        self.shared.lock().lock.state()
    }

    pub fn has_pending_speaker_activation(&self) -> bool {
        self.shared.lock().pending_speaker.is_some()
    }

    pub fn subscription_reasons(&self) -> SubscriptionReasons {
        self.shared.lock().subscriptions
    }

    pub fn is_torn_down(&self) -> bool {
        self.shared.lock().torn_down
    }
}

impl Drop for ProximitySession {
    fn drop(&mut self) {
        self.tear_down();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` inside the critical section with fresh preferences.
    fn update<F>(self: &Arc<Self>, f: F)
    where
        F: FnOnce(&mut SessionState, &Arc<Shared>),
    {
        let mut state = self.lock();
        if state.torn_down {
            tracing::trace!("event after teardown ignored");
            return;
        }
        state.refresh_preferences(self.io.preferences.as_ref());
        f(&mut *state, self);
    }

    fn on_proximity_distance(self: &Arc<Self>, raw_distance: f32) {
        self.update(|state, shared| {
            let Some(reading) = state.classifier.on_distance(raw_distance) else {
                return;
            };
            state.snapshot.apply_reading(reading);
            state.recompute_speaker_route(reading.far, shared);
            state.maybe_auto_answer(reading.near, &shared.io);
        });
    }

    fn on_speaker_timer(&self, generation: u64) {
        let mut state = self.lock();
        if state.torn_down {
            return;
        }
        match state.pending_speaker.take() {
            Some(pending) if pending.generation == generation => {
                tracing::info!(
                    generation,
                    route = %pending.route,
                    delay_ms = pending.delay.as_millis() as u64,
                    "activating deferred audio route"
                );
                if let Err(e) = self.io.audio_router.set_route(pending.route) {
                    tracing::warn!(error = %e, "deferred audio route change failed");
                }
            }
            other => {
                state.pending_speaker = other;
                tracing::trace!(generation, "superseded speaker activation ignored");
            }
        }
    }

    fn tear_down(&self) {
        let mut state = self.lock();
        if state.torn_down {
            return;
        }
        state.torn_down = true;
        state.cancel_pending_speaker();

        self.io.orientation.enable(false);
        state.subscriptions.clear();
        if let Some(sensor) = &self.io.proximity {
            sensor.unsubscribe();
        }
        state.lock.release(true);

        tracing::info!("proximity session torn down");
    }
}

impl SessionState {
    fn refresh_preferences(&mut self, store: &dyn PreferenceStore) {
        let prefs = ProximityPreferences::load(store);
        if prefs != self.prefs {
            tracing::debug!(?prefs, "preferences changed");
        }
        self.prefs = prefs;
        self.snapshot.sensor_disabled_by_preference = prefs.sensor_disabled;
    }

    /// Offhook, video or RTT changed.
    fn resync(&mut self, shared: &Arc<Shared>) {
        self.snapshot.orientation = Orientation::Unknown;
        shared.io.orientation.enable(self.snapshot.is_offhook);
        if !self.snapshot.is_offhook {
            self.cancel_pending_speaker();
        }
        self.recompute_lock();
    }

    fn recompute_lock(&mut self) {
        if !self.classifier.is_available() {
            return;
        }
        let action = decide::decide_lock(&self.snapshot, &self.prefs);
        tracing::debug!(
            ?action,
            offhook = self.snapshot.is_offhook,
            horizontal = self.snapshot.is_horizontal(),
            ui_showing = self.snapshot.ui_showing,
            dialpad_visible = self.snapshot.dialpad_visible,
            audio_route = %self.snapshot.audio_route,
            "recompute screen-off lock"
        );
        match action {
            LockAction::Skip => {}
            LockAction::Engage => self.lock.engage(),
            LockAction::Release {
                restore_immediately,
            } => self.lock.release(restore_immediately),
        }
    }

    fn recompute_speaker_route(&mut self, wants_speaker: bool, shared: &Arc<Shared>) {
        self.cancel_pending_speaker();
        if !self.classifier.is_available() {
            return;
        }

        match decide::decide_speaker(wants_speaker, &self.snapshot, &self.prefs) {
            SpeakerAction::Nothing => {}
            SpeakerAction::Schedule { delay, route } => self.schedule_route(delay, route, shared),
            SpeakerAction::RouteNow(route) => {
                tracing::info!(route = %route, "routing audio");
                if let Err(e) = shared.io.audio_router.set_route(route) {
                    tracing::warn!(error = %e, "audio route change failed");
                }
            }
        }
    }

    fn schedule_route(&mut self, delay: Duration, route: AudioRoute, shared: &Arc<Shared>) {
        self.next_generation += 1;
        let generation = self.next_generation;
        let weak = Arc::downgrade(shared);

        let timer = shared.io.scheduler.schedule(
            delay,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.on_speaker_timer(generation);
                }
            }),
        );

        tracing::info!(
            generation,
            route = %route,
            delay_ms = delay.as_millis() as u64,
            "deferred audio route scheduled"
        );
        self.pending_speaker = Some(PendingSpeakerActivation {
            generation,
            route,
            delay,
            timer,
        });
    }

    fn cancel_pending_speaker(&mut self) {
        if let Some(pending) = self.pending_speaker.take() {
            pending.timer.cancel();
            tracing::debug!(generation = pending.generation, "deferred audio route cancelled");
        }
    }

    fn maybe_auto_answer(&mut self, near: bool, io: &Collaborators) {
        let Some(telephony) = &io.telephony else {
            return;
        };
        if !near {
            return;
        }
        let screen_on = io.display.is_screen_on();
        if !decide::should_auto_answer(near, &self.snapshot, &self.prefs, true, screen_on) {
            return;
        }

        let ringing = self.calls.ringing_call_id().map(str::to_owned);
        if ringing.is_some() && ringing == self.last_answered_call {
            tracing::debug!(call_id = ?ringing, "ringing call already auto-answered");
            return;
        }

        tracing::info!(call_id = ?ringing, "auto-answering ringing call");
        match telephony.accept_ringing_call() {
            Ok(()) => self.last_answered_call = ringing,
            // Leave the call eligible so the next near reading retries.
            Err(e) => tracing::warn!(error = %e, call_id = ?ringing, "auto-answer failed"),
        }
    }

    /// Register the sensor for whichever reasons currently hold. Reasons that
    /// turn on are applied before reasons that turn off so a hand-over
    /// (ringing → offhook) never drops the hardware subscription.
    fn update_subscriptions(&mut self, shared: &Arc<Shared>) {
        let wanted = [
            (SubscriptionReason::Offhook, self.snapshot.is_offhook),
            (
                SubscriptionReason::Ringing,
                self.snapshot.has_incoming_call && self.prefs.auto_answer,
            ),
        ];
        let ordered = wanted
            .iter()
            .filter(|(_, active)| *active)
            .chain(wanted.iter().filter(|(_, active)| !*active));

        for &(reason, active) in ordered {
            let change = self.subscriptions.set(reason, active);
            self.apply_subscription_change(change, reason, shared);
        }
    }

    fn apply_subscription_change(
        &mut self,
        change: SubscriptionChange,
        reason: SubscriptionReason,
        shared: &Arc<Shared>,
    ) {
        let Some(sensor) = &shared.io.proximity else {
            return;
        };
        match change {
            SubscriptionChange::Unchanged => {}
            SubscriptionChange::Subscribe => {
                let weak = Arc::downgrade(shared);
                sensor.subscribe(new_proximity_callback(move |distance| {
                    if let Some(shared) = weak.upgrade() {
                        shared.on_proximity_distance(distance);
                    }
                }));
                tracing::info!(?reason, "proximity sensor subscribed");
            }
            SubscriptionChange::Unsubscribe => {
                sensor.unsubscribe();
                // Readings go stale once nobody listens.
                self.classifier.reset();
                self.snapshot.apply_reading(self.classifier.reading());
                tracing::info!(?reason, "proximity sensor unsubscribed");
            }
        }
    }
}
