//! Virtual lamp: holds the on/off, color and brightness of one group.

use std::sync::{Mutex, MutexGuard, PoisonError};

use lightcontrol_domain::light::{Brightness, Color};

/// What a simulated lamp is currently showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LampState {
    pub on: bool,
    pub color: Color,
    pub brightness: Brightness,
}

impl Default for LampState {
    fn default() -> Self {
        Self {
            on: false,
            color: Color::White,
            brightness: Brightness::FULL,
        }
    }
}

/// A simulated lamp group.
#[derive(Debug, Default)]
pub struct VirtualLamp {
    state: Mutex<LampState>,
}

impl VirtualLamp {
    #[must_use]
    pub fn snapshot(&self) -> LampState {
        self.lock_state().clone()
    }

    pub fn switch(&self, on: bool) {
        self.lock_state().on = on;
    }

    pub fn paint(&self, color: &Color) {
        self.lock_state().color = color.clone();
    }

    pub fn dim(&self, level: Brightness) {
        self.lock_state().brightness = level;
    }

    fn lock_state(&self) -> MutexGuard<'_, LampState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
