//! ECS components for actors.
//!
//! Every live actor is one entity carrying the components below. Behavior
//! (handlers, timer callbacks, subscriptions) is not stored here; it lives
//! in the actor's script inside the
//! [`ScriptHost`](crate::scripting::ScriptHost).
//!
//! Submodules overview:
//! - [`actor`] – identity, template name, tags, links and gameplay flags
//! - [`animation`] – named frame sequences and the playback advancing them
//! - [`boxcollider`] – sprite bounds and hitbox
//! - [`contacts`] – actors touched on the previous tick, for leave detection
//! - [`inventory`] – items held, with presence-only key items
//! - [`mapposition`] – world position and the position at tick start
//! - [`rigidbody`] – velocity and physics flags
//! - [`timer`] – due times of one-shot and repeating timers

pub mod actor;
pub mod animation;
pub mod boxcollider;
pub mod contacts;
pub mod inventory;
pub mod mapposition;
pub mod rigidbody;
pub mod timer;
