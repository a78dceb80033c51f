//! Call-state value types.

use serde::{Deserialize, Serialize};

/// Coarse state of the in-call UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    /// No calls.
    #[default]
    Idle,
    /// A call is ringing.
    Incoming,
    /// Dial requested, not yet handed to the network.
    PendingOutgoing,
    /// Dialing / alerting the remote side.
    Outgoing,
    /// At least one call is connected or on hold.
    InCall,
}

impl CallState {
    pub fn label(&self) -> &'static str {
        match self {
            CallState::Idle => "idle",
            CallState::Incoming => "incoming",
            CallState::PendingOutgoing => "pending_outgoing",
            CallState::Outgoing => "outgoing",
            CallState::InCall => "in_call",
        }
    }
}

impl std::fmt::Display for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Where call audio is currently played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioRoute {
    #[default]
    Earpiece,
    Speaker,
    Bluetooth,
    WiredHeadset,
}

impl AudioRoute {
    pub fn label(&self) -> &'static str {
        match self {
            AudioRoute::Earpiece => "earpiece",
            AudioRoute::Speaker => "speaker",
            AudioRoute::Bluetooth => "bluetooth",
            AudioRoute::WiredHeadset => "wired_headset",
        }
    }

    /// Routes that take audio away from the handset entirely.
    pub fn is_external(&self) -> bool {
        matches!(self, AudioRoute::Bluetooth | AudioRoute::WiredHeadset)
    }
}

impl std::fmt::Display for AudioRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Capabilities of the foreground call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActiveCall {
    pub id: String,
    #[serde(default)]
    pub is_video: bool,
    #[serde(default)]
    pub is_rtt: bool,
}

/// What the call list looks like at the moment of a state change.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CallList {
    /// Whether any call is alive. A disconnected call can keep the UI in
    /// `InCall` for a moment, so the state alone is not enough.
    #[serde(default)]
    pub has_live_call: bool,

    /// The active (foreground, connected) call, if any.
    #[serde(default)]
    pub active_call: Option<ActiveCall>,

    /// Id of the call currently ringing, if any.
    #[serde(default)]
    pub ringing_call_id: Option<String>,
}
