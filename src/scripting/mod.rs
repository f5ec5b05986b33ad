//! Per-actor scripting.
//!
//! Every actor may carry one script instance, owned by the [`ScriptHost`].
//! A script's `main` runs once when the actor is activated and registers
//! handlers (collision, leave, use, keypress), timers, message
//! subscriptions and animations through an [`Api`]. After that the host
//! only re-enters the script through those registrations.
//!
//! Scripts are written either in Rust, by implementing [`Doodad`], or in Lua
//! with the `lua` feature (see [`lua::LuaDoodad`]).

pub mod actor;
pub mod api;
pub mod context;
pub mod host;
pub mod payload;
pub mod script;

#[cfg(feature = "lua")]
pub mod lua;

pub use actor::ActorMut;
pub use api::Api;
pub use context::ScriptCtx;
pub use host::ScriptHost;
pub use payload::Payload;
pub use script::{ActorScript, Doodad, HandlerKind, Script};
