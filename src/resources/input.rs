//! Per-tick controller input resource.
//!
//! The embedding host reports which buttons are held each tick through
//! [`InputState::apply`]; edges (`just_pressed`/`just_released`) are derived
//! here by comparing with the previous tick. Player-controlled actors receive
//! the whole state through their `OnKeypress` handlers.

use bevy_ecs::prelude::*;

/// Boolean button state with edge detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoolState {
    /// Whether the button is held this tick.
    pub active: bool,
    /// Whether the button went down this tick.
    pub just_pressed: bool,
    /// Whether the button went up this tick.
    pub just_released: bool,
}

impl BoolState {
    fn update(&mut self, held: bool) {
        self.just_pressed = held && !self.active;
        self.just_released = !held && self.active;
        self.active = held;
    }
}

/// Buttons held during a tick, as reported by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Buttons {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub use_action: bool,
}

/// Input state relevant to player-controlled actors.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub up: BoolState,
    pub down: BoolState,
    pub left: BoolState,
    pub right: BoolState,
    pub use_action: BoolState,
}

impl InputState {
    /// Fold this tick's held buttons in, computing edges.
    pub fn apply(&mut self, held: Buttons) {
        self.up.update(held.up);
        self.down.update(held.down);
        self.left.update(held.left);
        self.right.update(held.right);
        self.use_action.update(held.use_action);
    }
}
