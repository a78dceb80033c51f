//! Folds call-state notifications into derived call status.
//!
//! Pure bookkeeping - no I/O. The policy engine decides what to do with the
//! returned [`ChangeSet`].

use serde::{Deserialize, Serialize};

use crate::state::{AudioRoute, CallList, CallState};

/// Booleans derived from the latest call-state notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CallStatus {
    pub has_incoming_call: bool,
    pub has_ongoing_call: bool,
    pub is_outgoing: bool,
    /// Outgoing pending, outgoing, or ongoing.
    pub is_offhook: bool,
    pub is_video_call: bool,
    pub is_rtt_call: bool,
}

impl CallStatus {
    pub fn derive(new_state: CallState, calls: &CallList) -> Self {
        let has_ongoing_call = new_state == CallState::InCall && calls.has_live_call;
        let is_offhook = matches!(
            new_state,
            CallState::PendingOutgoing | CallState::Outgoing
        ) || has_ongoing_call;

        let active = calls.active_call.as_ref();
        Self {
            has_incoming_call: new_state == CallState::Incoming,
            has_ongoing_call,
            is_outgoing: new_state == CallState::Outgoing,
            is_offhook,
            is_video_call: active.is_some_and(|c| c.is_video),
            is_rtt_call: active.is_some_and(|c| c.is_rtt),
        }
    }
}

/// Which engine sub-routines a call-state change requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Offhook, video or RTT flipped: full resync.
    Resync,
    /// An outgoing call was just answered by the remote side.
    OutgoingAnswered,
    /// A call started ringing.
    Incoming,
}

/// Result of one call-state notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub status: CallStatus,
    pub resync: bool,
    pub outgoing_answered: bool,
    pub incoming: bool,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        !self.resync && !self.outgoing_answered && !self.incoming
    }

    /// Triggers in the order the engine must run them.
    pub fn triggers(&self) -> impl Iterator<Item = Trigger> + '_ {
        [
            (self.resync, Trigger::Resync),
            (self.outgoing_answered, Trigger::OutgoingAnswered),
            (self.incoming, Trigger::Incoming),
        ]
        .into_iter()
        .filter_map(|(set, trigger)| set.then_some(trigger))
    }
}

/// Tracks call status and audio route across notifications.
#[derive(Debug, Clone, Default)]
pub struct CallStateAggregator {
    status: CallStatus,
    ringing_call_id: Option<String>,
    audio_route: AudioRoute,
}

impl CallStateAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> CallStatus {
        self.status
    }

    pub fn audio_route(&self) -> AudioRoute {
        self.audio_route
    }

    pub fn ringing_call_id(&self) -> Option<&str> {
        self.ringing_call_id.as_deref()
    }

    pub fn on_call_state_changed(
        &mut self,
        old_state: CallState,
        new_state: CallState,
        calls: &CallList,
    ) -> ChangeSet {
        let previous = self.status;
        let status = CallStatus::derive(new_state, calls);

        let resync = status.is_offhook != previous.is_offhook
            || status.is_video_call != previous.is_video_call
            || status.is_rtt_call != previous.is_rtt_call;
        let outgoing_answered = old_state == CallState::Outgoing && status.has_ongoing_call;
        let incoming = status.has_incoming_call
            && (!previous.has_incoming_call || calls.ringing_call_id != self.ringing_call_id);

        self.ringing_call_id = if status.has_incoming_call {
            calls.ringing_call_id.clone()
        } else {
            None
        };
        self.status = status;

        let change = ChangeSet {
            status,
            resync,
            outgoing_answered,
            incoming,
        };

        if !change.is_empty() {
            tracing::debug!(
                old = %old_state,
                new = %new_state,
                offhook = status.is_offhook,
                video = status.is_video_call,
                rtt = status.is_rtt_call,
                resync,
                outgoing_answered,
                incoming,
                "call state changed"
            );
        }
        change
    }

    /// Record a new audio route. Returns `true` if it differs from the last one.
    pub fn on_audio_route_changed(&mut self, route: AudioRoute) -> bool {
        if route == self.audio_route {
            return false;
        }
        tracing::debug!(from = %self.audio_route, to = %route, "audio route changed");
        self.audio_route = route;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ActiveCall;

    fn live(video: bool, rtt: bool) -> CallList {
        CallList {
            has_live_call: true,
            active_call: Some(ActiveCall {
                id: "call-1".to_string(),
                is_video: video,
                is_rtt: rtt,
            }),
            ringing_call_id: None,
        }
    }

    fn ringing(id: &str) -> CallList {
        CallList {
            has_live_call: true,
            active_call: None,
            ringing_call_id: Some(id.to_string()),
        }
    }

    #[test]
    fn test_offhook_derivation() {
        let none = CallList::default();
        assert!(CallStatus::derive(CallState::PendingOutgoing, &none).is_offhook);
        assert!(CallStatus::derive(CallState::Outgoing, &none).is_offhook);
        assert!(!CallStatus::derive(CallState::Incoming, &none).is_offhook);
        assert!(!CallStatus::derive(CallState::Idle, &none).is_offhook);
        // InCall without a live call (just disconnected) is not offhook.
        assert!(!CallStatus::derive(CallState::InCall, &none).is_offhook);
        assert!(CallStatus::derive(CallState::InCall, &live(false, false)).is_offhook);
    }

    #[test]
    fn test_video_and_rtt_default_false_without_active_call() {
        let status = CallStatus::derive(CallState::InCall, &CallList::default());
        assert!(!status.is_video_call);
        assert!(!status.is_rtt_call);

        let status = CallStatus::derive(CallState::InCall, &live(true, true));
        assert!(status.is_video_call);
        assert!(status.is_rtt_call);
    }

    #[test]
    fn test_going_offhook_triggers_resync_once() {
        let mut agg = CallStateAggregator::new();
        let change = agg.on_call_state_changed(
            CallState::Idle,
            CallState::PendingOutgoing,
            &CallList::default(),
        );
        assert!(change.resync);
        assert!(!change.outgoing_answered);

        let change = agg.on_call_state_changed(
            CallState::PendingOutgoing,
            CallState::Outgoing,
            &CallList::default(),
        );
        assert!(change.is_empty());
    }

    #[test]
    fn test_outgoing_to_in_call_is_dedicated_trigger() {
        let mut agg = CallStateAggregator::new();
        agg.on_call_state_changed(CallState::Idle, CallState::Outgoing, &CallList::default());

        let change =
            agg.on_call_state_changed(CallState::Outgoing, CallState::InCall, &live(false, false));
        assert!(!change.resync);
        assert!(change.outgoing_answered);
        assert_eq!(
            change.triggers().collect::<Vec<_>>(),
            vec![Trigger::OutgoingAnswered]
        );
    }

    #[test]
    fn test_video_upgrade_triggers_resync() {
        let mut agg = CallStateAggregator::new();
        agg.on_call_state_changed(CallState::Idle, CallState::InCall, &live(false, false));
        let change =
            agg.on_call_state_changed(CallState::InCall, CallState::InCall, &live(true, false));
        assert!(change.resync);
        assert!(change.status.is_video_call);
    }

    #[test]
    fn test_incoming_is_rising_edge_or_new_ringing_call() {
        let mut agg = CallStateAggregator::new();
        let change = agg.on_call_state_changed(CallState::Idle, CallState::Incoming, &ringing("a"));
        assert!(change.incoming);
        assert_eq!(agg.ringing_call_id(), Some("a"));

        let change =
            agg.on_call_state_changed(CallState::Incoming, CallState::Incoming, &ringing("a"));
        assert!(!change.incoming);

        let change =
            agg.on_call_state_changed(CallState::Incoming, CallState::Incoming, &ringing("b"));
        assert!(change.incoming);
        assert_eq!(agg.ringing_call_id(), Some("b"));

        let change =
            agg.on_call_state_changed(CallState::Incoming, CallState::Idle, &CallList::default());
        assert!(!change.incoming);
        assert_eq!(agg.ringing_call_id(), None);
    }

    #[test]
    fn test_audio_route_change_detection() {
        let mut agg = CallStateAggregator::new();
        assert!(!agg.on_audio_route_changed(AudioRoute::Earpiece));
        assert!(agg.on_audio_route_changed(AudioRoute::Speaker));
        assert!(!agg.on_audio_route_changed(AudioRoute::Speaker));
        assert_eq!(agg.audio_route(), AudioRoute::Speaker);
    }

    #[test]
    fn test_call_list_deserializes_with_defaults() {
        let calls: CallList = serde_json::from_str(r#"{"ringing_call_id":"x"}"#).unwrap();
        assert!(!calls.has_live_call);
        assert_eq!(calls.ringing_call_id.as_deref(), Some("x"));
    }
}
