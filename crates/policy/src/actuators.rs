//! Platform actuators the policy drives.
//!
//! All requests are fire-and-forget: the engine logs failures and moves on.

use std::sync::Arc;

use nearcall_call::AudioRoute;
use serde::{Deserialize, Serialize};

use crate::error::ActuatorError;

/// Proximity screen-off wake lock. While held, the platform blanks the
/// screen whenever the proximity sensor reports "near".
pub trait WakeLockHandle: Send + Sync {
    fn acquire(&self) -> Result<(), ActuatorError>;

    /// `restore_immediately == false` keeps the screen off until the sensor
    /// next reports "far".
    fn release(&self, restore_immediately: bool) -> Result<(), ActuatorError>;

    fn is_held(&self) -> bool;
}

pub trait AudioRouter: Send + Sync {
    fn set_route(&self, route: AudioRoute) -> Result<(), ActuatorError>;
}

/// Must tolerate being asked to accept when nothing is ringing.
pub trait TelephonyControl: Send + Sync {
    fn accept_ringing_call(&self) -> Result<(), ActuatorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    Held,
    #[default]
    Released,
}

/// Idempotent front for the wake lock.
///
/// A detached lock (no sensor, or proximity disabled when the session
/// started) ignores every request and always reports `Released`.
pub(crate) struct ScreenLock {
    handle: Option<Arc<dyn WakeLockHandle>>,
}

impl ScreenLock {
    pub(crate) fn new(handle: Arc<dyn WakeLockHandle>) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    pub(crate) fn detached() -> Self {
        Self { handle: None }
    }

    pub(crate) fn state(&self) -> LockState {
        match &self.handle {
            Some(handle) if handle.is_held() => LockState::Held,
            _ => LockState::Released,
        }
    }

    pub(crate) fn engage(&self) {
        let Some(handle) = &self.handle else {
            return;
        };
        if handle.is_held() {
            tracing::trace!("wake lock already acquired");
            return;
        }
        tracing::info!("acquiring proximity wake lock");
        if let Err(e) = handle.acquire() {
            tracing::warn!(error = %e, "failed to acquire proximity wake lock");
        }
    }

    pub(crate) fn release(&self, restore_immediately: bool) {
        let Some(handle) = &self.handle else {
            return;
        };
        if !handle.is_held() {
            tracing::trace!("wake lock already released");
            return;
        }
        tracing::info!(restore_immediately, "releasing proximity wake lock");
        if let Err(e) = handle.release(restore_immediately) {
            tracing::warn!(error = %e, "failed to release proximity wake lock");
        }
    }
}
