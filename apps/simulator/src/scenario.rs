//! Scenario scripts.

use std::path::{Path, PathBuf};

use nearcall_policy::{AudioRoute, CallList, CallState, Orientation, ProximityPreferences};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const BUILTIN: &str = include_str!("../scenarios/answer_and_walk_away.json");

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scenario: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("scenario has no steps")]
    Empty,
}

/// One scripted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Raw distance from the proximity sensor.
    Proximity { distance: f32 },
    CallState {
        old: CallState,
        new: CallState,
        #[serde(default)]
        calls: CallList,
    },
    AudioRoute { route: AudioRoute },
    UiShowing { showing: bool },
    Dialpad { visible: bool },
    AttemptingVideo { attempting: bool },
    /// Classified orientation, bypassing the accelerometer.
    Orientation { orientation: Orientation },
    /// Raw accelerometer sample in m/s².
    Accelerometer { x: f64, y: f64, z: f64 },
    Display {
        #[serde(default)]
        display_id: u32,
        on: bool,
    },
    /// Change a stored preference mid-session.
    Preference {
        key: String,
        value: serde_json::Value,
    },
    WaitMs { ms: u64 },
    Teardown,
}

impl ScenarioStep {
    pub fn describe(&self) -> String {
        match self {
            ScenarioStep::Proximity { distance } => format!("proximity distance={distance}"),
            ScenarioStep::CallState { old, new, .. } => format!("call state {old} -> {new}"),
            ScenarioStep::AudioRoute { route } => format!("audio route {route}"),
            ScenarioStep::UiShowing { showing } => format!("in-call ui showing={showing}"),
            ScenarioStep::Dialpad { visible } => format!("dialpad visible={visible}"),
            ScenarioStep::AttemptingVideo { attempting } => {
                format!("attempting video={attempting}")
            }
            ScenarioStep::Orientation { orientation } => format!("orientation {orientation}"),
            ScenarioStep::Accelerometer { x, y, z } => format!("accelerometer ({x}, {y}, {z})"),
            ScenarioStep::Display { display_id, on } => format!("display {display_id} on={on}"),
            ScenarioStep::Preference { key, value } => format!("preference {key}={value}"),
            ScenarioStep::WaitMs { ms } => format!("wait {ms}ms"),
            ScenarioStep::Teardown => "teardown".to_string(),
        }
    }
}

/// Device setup plus the steps to replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub name: String,
    pub preferences: ProximityPreferences,
    pub has_proximity_sensor: bool,
    pub proximity_max_range: f32,
    pub has_telephony: bool,
    pub steps: Vec<ScenarioStep>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "scenario".to_string(),
            preferences: ProximityPreferences::default(),
            has_proximity_sensor: true,
            proximity_max_range: 5.0,
            has_telephony: true,
            steps: Vec::new(),
        }
    }
}

/// A script is either a full scenario or a bare list of steps.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScriptFile {
    Full(Scenario),
    Steps(Vec<ScenarioStep>),
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        let scenario = match serde_json::from_str(json)? {
            ScriptFile::Full(scenario) => scenario,
            ScriptFile::Steps(steps) => Scenario {
                steps,
                ..Scenario::default()
            },
        };
        if scenario.steps.is_empty() {
            return Err(ScenarioError::Empty);
        }
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let json = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Answer a ringing call at the ear, then put the phone down on a table.
    pub fn builtin() -> Result<Self, ScenarioError> {
        Self::from_json(BUILTIN)
    }
}
