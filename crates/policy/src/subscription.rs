//! Reasons for keeping the proximity sensor subscribed.
//!
//! Two independent features need the sensor. The hardware subscription is a
//! single handle, so it stays registered while any reason is set.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionReason {
    /// A call is offhook: speaker routing follows the sensor.
    Offhook,
    /// A call is ringing with auto-answer enabled.
    Ringing,
}

impl SubscriptionReason {
    fn bit(self) -> u8 {
        match self {
            SubscriptionReason::Offhook => 0b01,
            SubscriptionReason::Ringing => 0b10,
        }
    }
}

/// What the caller must do to the hardware after a reason changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionChange {
    Unchanged,
    Subscribe,
    Unsubscribe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubscriptionReasons(u8);

impl SubscriptionReasons {
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, reason: SubscriptionReason) -> bool {
        self.0 & reason.bit() != 0
    }

    pub fn set(&mut self, reason: SubscriptionReason, active: bool) -> SubscriptionChange {
        let was_empty = self.is_empty();
        if active {
            self.0 |= reason.bit();
        } else {
            self.0 &= !reason.bit();
        }

        match (was_empty, self.is_empty()) {
            (true, false) => SubscriptionChange::Subscribe,
            (false, true) => SubscriptionChange::Unsubscribe,
            _ => SubscriptionChange::Unchanged,
        }
    }

    pub fn clear(&mut self) -> SubscriptionChange {
        let was_empty = self.is_empty();
        self.0 = 0;
        if was_empty {
            SubscriptionChange::Unchanged
        } else {
            SubscriptionChange::Unsubscribe
        }
    }
}
