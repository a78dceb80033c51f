//! Primary display on/off tracking.

/// Platform id of the built-in display.
pub const DEFAULT_DISPLAY_ID: u32 = 0;

/// Query for the current power state of the screen.
pub trait DisplayQuery: Send + Sync {
    /// `false` only when the screen is truly off.
    fn is_screen_on(&self) -> bool;
}

/// Binary display state: on vs off.
///
/// Any state other than fully off (dozing, unknown) counts as on. Only
/// actual flips of the default display are reported.
#[derive(Debug, Clone)]
pub struct DisplayStateTracker {
    is_display_on: bool,
}

impl Default for DisplayStateTracker {
    fn default() -> Self {
        Self {
            is_display_on: true,
        }
    }
}

impl DisplayStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_display_on(&self) -> bool {
        self.is_display_on
    }

    /// Record a display-changed notification. Returns the new state when it flipped.
    pub fn on_display_changed(&mut self, display_id: u32, is_on: bool) -> Option<bool> {
        if display_id != DEFAULT_DISPLAY_ID || is_on == self.is_display_on {
            return None;
        }
        self.is_display_on = is_on;
        tracing::info!(is_display_on = is_on, "display state changed");
        Some(is_on)
    }
}
