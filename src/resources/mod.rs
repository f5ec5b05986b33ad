//! ECS resources shared across the level.
//!
//! Resources are world-scoped data accessible by systems and by the script
//! host. This module groups the level-wide state the tick pipeline relies on.
//!
//! Submodules overview:
//! - [`actorindex`] – stable actor ids to entities
//! - [`hostlink`] – outbound command channel to renderer, audio and level flow
//! - [`input`] – per-tick controller state with edge detection
//! - [`levelstate`] – difficulty, checkpoint and level outcome
//! - [`messagebus`] – topic subscriptions for actor-to-actor messages
//! - [`simconfig`] – tuning values loaded from INI
//! - [`worldtime`] – simulation clock

pub mod actorindex;
pub mod hostlink;
pub mod input;
pub mod levelstate;
pub mod messagebus;
pub mod simconfig;
pub mod worldtime;
