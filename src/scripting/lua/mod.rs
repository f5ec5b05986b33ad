//! Lua doodads.
//!
//! A [`LuaDoodad`] is a [`Doodad`] whose behavior lives in a Lua chunk. Each
//! actor gets its own `Lua` state, so globals in a doodad script are private
//! to that actor even when several actors share the same file.
//!
//! The script sees the globals defined in `prelude.lua` (`Self`, `Events`,
//! `Message`, `Level`, `Actors`, `Sound`, `setTimeout` and friends). They all
//! funnel into a single `__host` function which is created as a scoped
//! function for the duration of each call into the state and dispatches to
//! the actor's [`Api`].
//!
//! The chunk body runs once at activation followed by its global `main`
//! function, if any. Handlers registered from Lua are plain Lua functions
//! called back through the same bridge.

mod bindings;

use std::cell::RefCell;
use std::path::Path;
use std::sync::Arc;

use log::{debug, error, info, warn};
use mlua::prelude::*;

use crate::error::{ScriptResult, SimError};
use crate::scripting::api::Api;
use crate::scripting::script::{ActorScript, Doodad, Script};

const PRELUDE: &str = include_str!("prelude.lua");

pub struct LuaDoodad {
    name: String,
    lua: Lua,
    /// Chunk body; consumed by the first `main` run.
    source: Option<String>,
}

impl LuaDoodad {
    /// Create an isolated state for one actor running `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if the prelude fails to load.
    pub fn from_source(name: impl Into<String>, source: impl Into<String>) -> LuaResult<Self> {
        let name = name.into();
        let lua = Lua::new();
        register_console(&lua, &name)?;
        let exports: LuaTable = lua.load(PRELUDE).set_name("prelude").eval()?;
        lua.set_named_registry_value(
            bindings::ACTOR_CTOR,
            exports.get::<LuaFunction>("actor")?,
        )?;
        Ok(Self {
            name,
            lua,
            source: Some(source.into()),
        })
    }

    /// Read a doodad script from disk. The file name becomes the doodad name
    /// used in console output.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the prelude fails.
    pub fn from_file(path: impl AsRef<Path>) -> LuaResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| LuaError::ExternalError(Arc::new(e)))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_source(name, source)
    }

    /// Boxed script ready for [`ScriptHost::install`](crate::scripting::ScriptHost::install).
    pub fn into_script(self) -> Box<dyn ActorScript> {
        Script::new(self).boxed()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    /// Run `f` against this state with `__host` bound to `api`.
    pub(crate) fn with_host<R>(
        &self,
        api: &mut Api<'_, Self>,
        f: impl FnOnce(&Lua) -> LuaResult<R>,
    ) -> ScriptResult<R> {
        let api = RefCell::new(api);
        self.lua
            .scope(|scope| {
                let bridge = scope.create_function_mut(
                    |lua, (op, id, args): (String, Option<u64>, LuaMultiValue)| {
                        let mut api = api.try_borrow_mut().map_err(|_| {
                            LuaError::RuntimeError(format!("re-entrant host call '{}'", op))
                        })?;
                        bindings::dispatch(lua, &mut api, &op, id, args)
                    },
                )?;
                self.lua.globals().set("__host", bridge)?;
                f(&self.lua)
            })
            .map_err(SimError::from)
    }
}

impl Doodad for LuaDoodad {
    fn main(&mut self, api: &mut Api<'_, Self>) -> ScriptResult<()> {
        let Some(source) = self.source.take() else {
            return Ok(());
        };
        let me = api.this().id().map(|id| id.0);
        let name = self.name.clone();
        debug!(target: "lua", "starting {} for {}", name, api.label());
        self.with_host(api, |lua| {
            let this: LuaTable = lua.globals().get("Self")?;
            this.set("__id", me)?;
            lua.load(source.as_str()).set_name(name).exec()?;
            if let Some(main) = lua.globals().get::<Option<LuaFunction>>("main")? {
                main.call::<()>(())?;
            }
            Ok(())
        })
    }
}

/// `console.*` output goes to the `lua` log target, prefixed by the doodad.
fn register_console(lua: &Lua, name: &str) -> LuaResult<()> {
    let name = name.to_string();
    lua.globals().set(
        "__log",
        lua.create_function(move |_, (level, msg): (String, String)| {
            match level.as_str() {
                "debug" => debug!(target: "lua", "[{}] {}", name, msg),
                "warn" => warn!(target: "lua", "[{}] {}", name, msg),
                "error" => error!(target: "lua", "[{}] {}", name, msg),
                _ => info!(target: "lua", "[{}] {}", name, msg),
            }
            Ok(())
        })?,
    )
}
