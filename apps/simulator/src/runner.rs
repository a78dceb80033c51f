//! Replays scenario steps against a live session.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use nearcall_policy::{
    Collaborators, MemoryPreferenceStore, ProximitySensor, ProximitySession, SessionConfig,
    TelephonyControl, TokioScheduler,
};
use nearcall_sensors::DEFAULT_DISPLAY_ID;

use crate::devices::{
    SimAccelerometer, SimAudioRouter, SimDisplay, SimProximity, SimTelephony, SimWakeLock,
    Transcript,
};
use crate::scenario::{Scenario, ScenarioStep};

pub struct Simulation {
    session: ProximitySession,
    preferences: Arc<MemoryPreferenceStore>,
    router: Arc<SimAudioRouter>,
    display: Arc<SimDisplay>,
    proximity: Arc<SimProximity>,
    accelerometer: Arc<SimAccelerometer>,
    transcript: Transcript,
}

impl Simulation {
    /// Build the devices and start a session. Must run inside a tokio runtime.
    pub fn new(scenario: &Scenario) -> anyhow::Result<Self> {
        let scheduler =
            TokioScheduler::try_current().context("simulation needs a tokio runtime")?;

        let transcript = Transcript::default();
        let preferences = Arc::new(MemoryPreferenceStore::new());
        scenario.preferences.apply_to(&preferences);

        let router = Arc::new(SimAudioRouter::new(transcript.clone()));
        let display = Arc::new(SimDisplay::new());
        let proximity = Arc::new(SimProximity::new(
            scenario.proximity_max_range,
            transcript.clone(),
        ));
        let accelerometer = Arc::new(SimAccelerometer::new(transcript.clone()));

        let io = Collaborators {
            wake_lock: Some(Arc::new(SimWakeLock::new(transcript.clone()))),
            audio_router: router.clone(),
            telephony: scenario.has_telephony.then(|| {
                Arc::new(SimTelephony::new(transcript.clone())) as Arc<dyn TelephonyControl>
            }),
            display: display.clone(),
            proximity: scenario
                .has_proximity_sensor
                .then(|| proximity.clone() as Arc<dyn ProximitySensor>),
            orientation: accelerometer.clone(),
            preferences: preferences.clone(),
            scheduler: Arc::new(scheduler),
        };

        Ok(Self {
            session: ProximitySession::new(io, SessionConfig::default()),
            preferences,
            router,
            display,
            proximity,
            accelerometer,
            transcript,
        })
    }

    pub fn session(&self) -> &ProximitySession {
        &self.session
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub async fn run(&self, steps: &[ScenarioStep]) {
        for (index, step) in steps.iter().enumerate() {
            println!("[{:>2}] {}", index + 1, step.describe());
            self.step(step).await;
        }
    }

    pub async fn step(&self, step: &ScenarioStep) {
        match step {
            ScenarioStep::Proximity { distance } => {
                if !self.proximity.emit(*distance) {
                    println!("    (sensor not subscribed, reading dropped)");
                }
            }
            ScenarioStep::CallState { old, new, calls } => {
                self.session.on_call_state_changed(*old, *new, calls);
            }
            ScenarioStep::AudioRoute { route } => self.session.on_audio_route_changed(*route),
            ScenarioStep::UiShowing { showing } => self.session.on_in_call_showing(*showing),
            ScenarioStep::Dialpad { visible } => self.session.on_dialpad_visible(*visible),
            ScenarioStep::AttemptingVideo { attempting } => {
                self.session.set_attempting_video_call(*attempting);
            }
            ScenarioStep::Orientation { orientation } => {
                self.session.on_orientation_changed(*orientation);
            }
            ScenarioStep::Accelerometer { x, y, z } => {
                if !self.accelerometer.is_enabled() {
                    println!("    (accelerometer disabled, sample dropped)");
                    return;
                }
                let now = tokio::time::Instant::now().into_std();
                if let Some(orientation) = self.accelerometer.sample(*x, *y, *z, now) {
                    println!("    orientation is now {orientation}");
                    self.session.on_orientation_changed(orientation);
                }
            }
            ScenarioStep::Display { display_id, on } => {
                if *display_id == DEFAULT_DISPLAY_ID {
                    self.display.set_screen_on(*on);
                }
                self.session.on_display_changed(*display_id, *on);
            }
            ScenarioStep::Preference { key, value } => self.set_preference(key, value),
            ScenarioStep::WaitMs { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            ScenarioStep::Teardown => self.session.tear_down(),
        }
        self.settle_audio_route();
    }

    /// Report route requests back to the session, as the platform would.
    fn settle_audio_route(&self) {
        while let Some(route) = self.router.take_requested() {
            self.session.on_audio_route_changed(route);
        }
    }

    fn set_preference(&self, key: &str, value: &serde_json::Value) {
        if let Some(flag) = value.as_bool() {
            self.preferences.set_bool(key, flag);
        } else if let Some(number) = value.as_i64() {
            self.preferences.set_int(key, number);
        } else {
            tracing::warn!(key, %value, "unsupported preference value, ignored");
        }
    }
}
