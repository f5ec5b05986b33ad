use bevy_ecs::prelude::Resource;

use crate::geometry::Point;

/// How a level run ended, if it has.
#[derive(Debug, Clone, PartialEq)]
pub enum LevelOutcome {
    Running,
    Completed,
    Failed(String),
}

/// Level-wide state scripts can read or signal.
#[derive(Resource, Debug, Clone)]
pub struct LevelState {
    /// Difficulty chosen by the player; negative is easier, positive harder.
    pub difficulty: i32,
    pub checkpoint: Option<Point>,
    pub outcome: LevelOutcome,
}

impl Default for LevelState {
    fn default() -> Self {
        Self {
            difficulty: 0,
            checkpoint: None,
            outcome: LevelOutcome::Running,
        }
    }
}

impl LevelState {
    pub fn is_over(&self) -> bool {
        self.outcome != LevelOutcome::Running
    }
}
