//! Doodad Engine library.
//!
//! The simulation and scripting core of a tick-based 2D platformer: physics,
//! hitbox collision with scripted solidity, per-actor scripts, animations,
//! timers and a level-wide message bus. Rendering, audio and level files are
//! left to the embedding host, which drives a [`level::Level`] tick by tick
//! and drains its [`events::host::HostCmd`]s.

pub mod components;
pub mod error;
pub mod events;
pub mod geometry;
pub mod level;
pub mod resources;
pub mod scene;
pub mod scripting;
pub mod systems;
