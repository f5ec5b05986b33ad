//! JSON scene manifests for running levels headlessly.
//!
//! A manifest lists actors by [`ActorSpec`]; links name other actors and
//! scripts are paths relative to the manifest.
//!
//! ```json
//! {
//!   "difficulty": 0,
//!   "actors": [
//!     { "name": "btn", "filename": "button.lua", "position": {"x": 0, "y": 64},
//!       "size": {"x": 32, "y": 32}, "links": ["door"], "script": "button.lua" },
//!     { "name": "door", "filename": "electric-door.lua", "position": {"x": 96, "y": 32},
//!       "size": {"x": 32, "y": 64}, "script": "electric-door.lua" }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use bevy_ecs::prelude::Entity;
use log::warn;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::level::{ActorSpec, Level};
use crate::scripting::ActorScript;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    pub difficulty: i32,
    pub actors: Vec<ActorSpec>,
    /// Directory scripts are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Raw manifest; actors are decoded one by one so a bad entry only costs
/// that actor.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SceneFile {
    difficulty: i32,
    actors: Vec<serde_json::Value>,
}

impl Scene {
    /// Load a manifest from a JSON file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SimError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let mut scene = Self::from_json(&content)?;
        scene.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(scene)
    }

    /// Parse a manifest. Malformed JSON is an error; an actor entry that
    /// does not decode (e.g. a negative hitbox) is skipped with a warning.
    pub fn from_json(content: &str) -> Result<Self, SimError> {
        let file: SceneFile = serde_json::from_str(content)
            .map_err(|e| SimError::Config(format!("invalid scene manifest: {}", e)))?;
        let mut actors = Vec::with_capacity(file.actors.len());
        for (index, value) in file.actors.into_iter().enumerate() {
            let name = value
                .get("name")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("actor #{}", index));
            match serde_json::from_value::<ActorSpec>(value) {
                Ok(spec) => actors.push(spec),
                Err(e) => warn!(target: "level", "{}: skipped: {}", name, e),
            }
        }
        Ok(Self {
            difficulty: file.difficulty,
            actors,
            base_dir: PathBuf::new(),
        })
    }

    /// Spawn every actor into `level` and resolve links. Returns the spawned
    /// actors by name.
    ///
    /// An actor that fails to spawn is skipped with a warning, as are links
    /// to names that do not exist.
    pub fn populate(&self, level: &mut Level) -> FxHashMap<String, Entity> {
        level.set_difficulty(self.difficulty);
        let mut by_name = FxHashMap::default();
        let mut spawned = Vec::new();
        for spec in &self.actors {
            let script = match self.load_script(spec) {
                Ok(script) => script,
                Err(e) => {
                    warn!(target: "level", "{}: script not loaded: {}", spec.name, e);
                    None
                }
            };
            match level.spawn(spec, script) {
                Ok(entity) => {
                    if !spec.name.is_empty() {
                        by_name.insert(spec.name.clone(), entity);
                    }
                    spawned.push((entity, spec));
                }
                Err(e) => warn!(target: "level", "{}: not spawned: {}", spec.name, e),
            }
        }
        for (entity, spec) in spawned {
            for name in &spec.links {
                match by_name.get(name) {
                    Some(&to) => {
                        level.link(entity, to);
                    }
                    None => warn!(target: "level", "{}: unknown link '{}'", spec.name, name),
                }
            }
        }
        by_name
    }

    #[cfg(feature = "lua")]
    fn load_script(&self, spec: &ActorSpec) -> Result<Option<Box<dyn ActorScript>>, SimError> {
        use crate::scripting::lua::LuaDoodad;

        let Some(script) = &spec.script else {
            return Ok(None);
        };
        let doodad = LuaDoodad::from_file(self.base_dir.join(script))?;
        Ok(Some(doodad.into_script()))
    }

    #[cfg(not(feature = "lua"))]
    fn load_script(&self, spec: &ActorSpec) -> Result<Option<Box<dyn ActorScript>>, SimError> {
        match &spec.script {
            Some(script) => Err(SimError::Config(format!(
                "{} needs the lua feature",
                script
            ))),
            None => Ok(None),
        }
    }
}
