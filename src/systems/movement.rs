use bevy_ecs::prelude::*;

use crate::components::mapposition::MapPosition;
use crate::components::rigidbody::RigidBody;
use crate::resources::simconfig::SimConfig;
use crate::resources::worldtime::WorldTime;

/// Integrate gravity and velocity into position.
///
/// Every actor's previous position is recorded first so collision can tell
/// which way it came from. Only mobile, unfrozen bodies move. `grounded` is
/// the collision result of the previous tick and suppresses gravity.
pub fn movement_system(
    mut query: Query<(&mut MapPosition, &mut RigidBody)>,
    time: Res<WorldTime>,
    config: Res<SimConfig>,
) {
    let dt = time.delta_ticks(config.tick_ms());
    for (mut position, mut body) in query.iter_mut() {
        position.prev = position.pos;
        if !body.integrates() {
            continue;
        }
        if body.gravity && !body.grounded {
            body.velocity.y = (body.velocity.y + config.gravity * dt).min(config.max_fall_speed);
        }
        let delta = body.velocity * dt;
        position.pos += delta;
    }
}
