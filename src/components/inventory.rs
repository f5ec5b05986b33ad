//! Item inventory carried by an actor.
//!
//! Quantities are never negative. A quantity of zero marks a *key item*:
//! the item is held but not counted (keys, badges). Removing down to zero or
//! below drops the entry entirely, so a counted item never turns into a key
//! item by accident.

use bevy_ecs::prelude::Component;
use rustc_hash::FxHashMap;

#[derive(Component, Debug, Clone, Default)]
pub struct Inventory {
    items: FxHashMap<String, u32>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` of `item`. A quantity of zero adds it as a key item.
    pub fn add(&mut self, item: impl Into<String>, quantity: u32) {
        let entry = self.items.entry(item.into()).or_insert(0);
        *entry = entry.saturating_add(quantity);
    }

    /// Remove `quantity` of `item`; zero removes the entry whatever its
    /// count. Returns whether the item was held.
    pub fn remove(&mut self, item: &str, quantity: u32) -> bool {
        let Some(held) = self.items.get_mut(item) else {
            return false;
        };
        if quantity == 0 || *held <= quantity {
            self.items.remove(item);
        } else {
            *held -= quantity;
        }
        true
    }

    /// Held quantity, `Some(0)` for key items, `None` if absent.
    pub fn quantity(&self, item: &str) -> Option<u32> {
        self.items.get(item).copied()
    }

    pub fn has(&self, item: &str) -> bool {
        self.items.contains_key(item)
    }

    /// All items sorted by name.
    pub fn list(&self) -> Vec<(String, u32)> {
        let mut items: Vec<_> = self.items.iter().map(|(k, v)| (k.clone(), *v)).collect();
        items.sort_by(|a, b| a.0.cmp(&b.0));
        items
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
