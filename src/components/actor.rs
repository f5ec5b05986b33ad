//! Identity and authoring-time data of an actor.
//!
//! [`ActorInfo`] is resolved once at spawn from an
//! [`ActorSpec`](crate::level::ActorSpec) and is read-only afterwards: tags
//! and links are set by the level author, scripts only query them.
//! [`ActorFlags`] carries the gameplay flags that scripts may toggle.

use std::fmt;

use bevy_ecs::prelude::{Component, Entity};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Stable numeric identity of an actor within a level.
///
/// Ids are handed out in spawn order, so sorting by `ActorId` gives the
/// registration order used for collision and timer dispatch.
#[derive(
    Component, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ActorId(pub u64);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Doodad template, display title, tags and links.
#[derive(Component, Debug, Clone, Default)]
pub struct ActorInfo {
    /// Name of the doodad template, e.g. `"button.lua"`.
    pub filename: String,
    pub title: String,
    pub tags: FxHashMap<String, String>,
    /// Outgoing links, in authoring order.
    pub links: Vec<Entity>,
}

impl ActorInfo {
    pub fn new(filename: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            title: title.into(),
            tags: FxHashMap::default(),
            links: Vec::new(),
        }
    }

    /// Tag value, or an empty string when the tag was never set.
    pub fn tag(&self, key: &str) -> &str {
        self.tags.get(key).map(String::as_str).unwrap_or("")
    }

    /// Label used in log lines.
    pub fn label(&self) -> &str {
        if self.title.is_empty() {
            &self.filename
        } else {
            &self.title
        }
    }
}

/// Gameplay flags outside of physics.
#[derive(Component, Debug, Clone, Copy)]
pub struct ActorFlags {
    pub is_player: bool,
    pub has_inventory: bool,
    pub invulnerable: bool,
    pub visible: bool,
}

impl Default for ActorFlags {
    fn default() -> Self {
        Self {
            is_player: false,
            has_inventory: false,
            invulnerable: false,
            visible: true,
        }
    }
}
