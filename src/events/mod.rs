//! Event types exchanged between the tick stages, scripts and the host.
//!
//! Submodules:
//! - [`animation`] – completion notices written by the animation system
//! - [`collision`] – collide/leave events and the solidity verdict
//! - [`host`] – outbound commands for renderer, audio and level flow
//! - [`input`] – keypress and use events for player interaction
pub mod animation;
pub mod collision;
pub mod host;
pub mod input;
