//! Signal snapshot and the decisions derived from it.
//!
//! Pure domain logic - no I/O, no locking. The session feeds it the current
//! snapshot and carries out whatever it returns.

use std::time::Duration;

use nearcall_call::{AudioRoute, CallStatus};
use nearcall_sensors::{Orientation, ProximityReading};
use serde::{Deserialize, Serialize};

use crate::prefs::ProximityPreferences;

/// Everything the policy knows about the device and the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub orientation: Orientation,
    /// Whether the call UI is the foreground surface.
    pub ui_showing: bool,
    pub has_incoming_call: bool,
    pub has_ongoing_call: bool,
    pub is_outgoing: bool,
    pub is_offhook: bool,
    pub is_video_call: bool,
    pub is_rtt_call: bool,
    pub is_attempting_video_call: bool,
    pub dialpad_visible: bool,
    pub audio_route: AudioRoute,
    pub proximity_near: bool,
    pub proximity_far: bool,
    pub sensor_disabled_by_preference: bool,
}

impl Default for SignalSnapshot {
    fn default() -> Self {
        Self {
            orientation: Orientation::Unknown,
            ui_showing: false,
            has_incoming_call: false,
            has_ongoing_call: false,
            is_outgoing: false,
            is_offhook: false,
            is_video_call: false,
            is_rtt_call: false,
            is_attempting_video_call: false,
            dialpad_visible: false,
            audio_route: AudioRoute::Earpiece,
            proximity_near: false,
            proximity_far: true,
            sensor_disabled_by_preference: false,
        }
    }
}

impl SignalSnapshot {
    pub fn apply_call_status(&mut self, status: CallStatus) {
        self.has_incoming_call = status.has_incoming_call;
        self.has_ongoing_call = status.has_ongoing_call;
        self.is_outgoing = status.is_outgoing;
        self.is_offhook = status.is_offhook;
        self.is_video_call = status.is_video_call;
        self.is_rtt_call = status.is_rtt_call;
    }

    pub fn apply_reading(&mut self, reading: ProximityReading) {
        self.proximity_near = reading.near;
        self.proximity_far = reading.far;
    }

    pub fn is_horizontal(&self) -> bool {
        self.orientation == Orientation::Horizontal
    }
}

/// Whether the screen must stay on regardless of proximity.
///
/// Flat on a table with the call UI in the background, or with the dialpad
/// up, the user is looking at the screen rather than holding it to the ear.
pub fn screen_on_immediately(snapshot: &SignalSnapshot) -> bool {
    matches!(
        snapshot.audio_route,
        AudioRoute::WiredHeadset | AudioRoute::Speaker | AudioRoute::Bluetooth
    ) || snapshot.is_attempting_video_call
        || snapshot.is_video_call
        || snapshot.is_rtt_call
        || (snapshot.is_horizontal() && !snapshot.ui_showing)
        || (snapshot.is_horizontal() && snapshot.dialpad_visible)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockAction {
    /// Proximity disabled by the user: leave the lock alone.
    Skip,
    Engage,
    Release { restore_immediately: bool },
}

pub fn decide_lock(snapshot: &SignalSnapshot, prefs: &ProximityPreferences) -> LockAction {
    if snapshot.sensor_disabled_by_preference {
        return LockAction::Skip;
    }

    let override_on = screen_on_immediately(snapshot);
    let in_use = snapshot.is_offhook
        || (snapshot.has_incoming_call && prefs.auto_speaker_incall_only);

    if in_use && !override_on {
        LockAction::Engage
    } else {
        LockAction::Release {
            restore_immediately: override_on,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerAction {
    Nothing,
    Schedule { delay: Duration, route: AudioRoute },
    RouteNow(AudioRoute),
}

/// Speaker routing for one proximity update.
///
/// `wants_speaker` is true when the phone has moved away from the body.
/// Switching to speaker is delayed so a brief hand or pocket occlusion does
/// not flip routing; returning to the earpiece is immediate.
pub fn decide_speaker(
    wants_speaker: bool,
    snapshot: &SignalSnapshot,
    prefs: &ProximityPreferences,
) -> SpeakerAction {
    if !snapshot.is_offhook || !prefs.auto_speaker || snapshot.audio_route.is_external() {
        return SpeakerAction::Nothing;
    }

    if wants_speaker {
        if snapshot.audio_route == AudioRoute::Speaker {
            return SpeakerAction::Nothing;
        }
        if prefs.auto_speaker_incall_only && snapshot.is_outgoing {
            return SpeakerAction::Nothing;
        }
        SpeakerAction::Schedule {
            delay: prefs.auto_speaker_delay(),
            route: AudioRoute::Speaker,
        }
    } else {
        SpeakerAction::RouteNow(AudioRoute::Earpiece)
    }
}

/// Whether a ringing call should be answered because the phone is at the ear.
pub fn should_auto_answer(
    near: bool,
    snapshot: &SignalSnapshot,
    prefs: &ProximityPreferences,
    telephony_available: bool,
    screen_on: bool,
) -> bool {
    near && telephony_available && screen_on && !snapshot.has_ongoing_call && prefs.auto_answer
}
