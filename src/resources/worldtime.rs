use bevy_ecs::prelude::Resource;

/// Simulation clock.
///
/// Time is kept in milliseconds because that is the unit scripts schedule
/// timers and frame durations in. `elapsed_ms` is an `f64` so repeating
/// timers do not drift over long sessions.
#[derive(Resource, Clone, Copy, Debug)]
pub struct WorldTime {
    /// Ticks completed since the level started.
    pub tick: u64,
    pub elapsed_ms: f64,
    /// Scaled length of the current tick.
    pub delta_ms: f32,
    pub time_scale: f32,
}

impl Default for WorldTime {
    fn default() -> Self {
        WorldTime {
            tick: 0,
            elapsed_ms: 0.0,
            delta_ms: 0.0,
            time_scale: 1.0,
        }
    }
}

impl WorldTime {
    /// Length of the current tick relative to a nominal tick of
    /// `tick_ms`. Velocities are per nominal tick, so this is the physics `dt`.
    pub fn delta_ticks(&self, tick_ms: f32) -> f32 {
        if tick_ms > 0.0 {
            self.delta_ms / tick_ms
        } else {
            0.0
        }
    }
}
