//! Time update system.
//!
//! Advances the shared [`WorldTime`](crate::resources::worldtime::WorldTime)
//! resource once per simulation tick, applying `time_scale` to the nominal
//! tick length.
use bevy_ecs::prelude::*;

use crate::resources::worldtime::WorldTime;

/// Start a new tick of `tick_ms` unscaled milliseconds.
///
/// Writes `tick`, `elapsed_ms` and the scaled `delta_ms`.
pub fn update_world_time(world: &mut World, tick_ms: f32) {
    let mut wt = world.resource_mut::<WorldTime>();
    let scaled = tick_ms * wt.time_scale;
    wt.tick += 1;
    wt.elapsed_ms += f64::from(scaled);
    wt.delta_ms = scaled;
}
