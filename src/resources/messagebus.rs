//! Level-wide topic table for actor-to-actor messaging.
//!
//! The [`MessageBus`] resource only records *who* listens to which topic.
//! Each subscription's handler is stored with the subscribing actor's script,
//! and delivery is driven by the
//! [`ScriptHost`](crate::scripting::ScriptHost).
//!
//! Topics are plain strings shared by the whole level; two unrelated
//! doodads that agree on a topic name (e.g. `"power"`) can talk without
//! holding references to each other.

use std::fmt;
use std::sync::Arc;

use bevy_ecs::prelude::{Entity, Resource};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub{}", self.0)
    }
}

/// A listener on a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscriber {
    pub actor: Entity,
    pub id: SubscriptionId,
}

#[derive(Debug, Clone, Default, Resource)]
pub struct MessageBus {
    /// Rebuilt on every (un)subscribe so publishing only bumps a refcount.
    topics: FxHashMap<String, Arc<[Subscriber]>>,
    next_id: u64,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `actor` to the subscribers of `topic`.
    pub fn subscribe(&mut self, topic: impl Into<String>, actor: Entity) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        let subs = self.topics.entry(topic.into()).or_insert_with(|| Arc::from([]));
        let mut list = subs.to_vec();
        list.push(Subscriber { actor, id });
        *subs = list.into();
        id
    }

    /// The current subscribers of `topic`, in subscription order.
    ///
    /// Delivery iterates this snapshot, so handlers may subscribe or be
    /// destroyed mid-publish without disturbing the iteration.
    pub fn snapshot(&self, topic: &str) -> Arc<[Subscriber]> {
        self.topics
            .get(topic)
            .cloned()
            .unwrap_or_else(|| Arc::from([]))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.remove_where(|s| s.id == id) > 0
    }

    /// Drop every subscription held by `actor`. Returns how many were removed.
    pub fn unsubscribe_actor(&mut self, actor: Entity) -> usize {
        self.remove_where(|s| s.actor == actor)
    }

    fn remove_where(&mut self, doomed: impl Fn(&Subscriber) -> bool) -> usize {
        let mut removed = 0;
        for subs in self.topics.values_mut() {
            let hits = subs.iter().filter(|s| doomed(*s)).count();
            if hits > 0 {
                *subs = subs.iter().filter(|s| !doomed(*s)).copied().collect();
                removed += hits;
            }
        }
        self.topics.retain(|_, subs| !subs.is_empty());
        removed
    }

    /// Number of subscriptions `actor` currently holds.
    pub fn subscriptions_of(&self, actor: Entity) -> usize {
        self.topics
            .values()
            .map(|subs| subs.iter().filter(|s| s.actor == actor).count())
            .sum()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, |subs| subs.len())
    }
}
