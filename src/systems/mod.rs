//! Tick stages.
//!
//! Submodules overview, in pipeline order
//! - [`time`] – advance [`WorldTime`](crate::resources::worldtime::WorldTime)
//! - [`timer`] – fire due script timers
//! - [`input`] – run keypress and use handlers
//! - [`movement`] – integrate gravity and velocity into positions
//! - [`collision`] – verdicts, push-out, grounding and leave events
//! - [`animation`] – advance animators and run completion handlers
//!
//! [`movement`] and [`animation::animation`] are plain bevy systems run by the
//! level's schedule. The stages that call into scripts take the world and the
//! [`ScriptHost`](crate::scripting::ScriptHost) directly.

pub mod animation;
pub mod collision;
pub mod input;
pub mod movement;
pub mod time;
pub mod timer;
