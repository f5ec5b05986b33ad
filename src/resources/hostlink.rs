//! Outbound channel to the embedding host.
//!
//! Rendering, audio and level flow live outside the simulation. Everything
//! the core asks of them is sent as a [`HostCmd`] through a
//! `crossbeam_channel`; the host drains the receiving side whenever it likes
//! (typically once per rendered frame). Sends never block and a dropped
//! receiver is not an error.

use bevy_ecs::prelude::Resource;
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::debug;

use crate::events::host::HostCmd;

#[derive(Resource, Clone)]
pub struct HostLink {
    tx: Sender<HostCmd>,
}

impl HostLink {
    /// Create a link and the receiver the host reads from.
    pub fn new() -> (Self, Receiver<HostCmd>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    pub fn send(&self, cmd: HostCmd) {
        if let Err(e) = self.tx.send(cmd) {
            debug!("host receiver gone, dropping {:?}", e.into_inner());
        }
    }
}
