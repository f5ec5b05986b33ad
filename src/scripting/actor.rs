//! Per-actor accessors and mutators exposed to scripts.
//!
//! [`ActorMut`] is a short-lived view of one actor's components. Every
//! operation tolerates a destroyed actor: getters return neutral values and
//! setters do nothing, which keeps scripts that hold on to a stale reference
//! (a linked door that was removed, a collider that was picked up) from
//! faulting.

use bevy_ecs::component::Mutable;
use bevy_ecs::prelude::*;
use log::warn;

use crate::components::actor::{ActorFlags, ActorId, ActorInfo};
use crate::components::animation::{Animator, FrameId};
use crate::components::boxcollider::BoxCollider;
use crate::components::inventory::Inventory;
use crate::components::mapposition::MapPosition;
use crate::components::rigidbody::RigidBody;
use crate::error::ScriptResult;
use crate::events::host::HostCmd;
use crate::geometry::{Point, Rect, Vec2};
use crate::resources::hostlink::HostLink;

pub struct ActorMut<'w> {
    world: &'w mut World,
    entity: Entity,
}

impl<'w> ActorMut<'w> {
    pub(crate) fn new(world: &'w mut World, entity: Entity) -> Self {
        Self { world, entity }
    }

    fn read<C: Component, R>(&self, f: impl FnOnce(&C) -> R) -> Option<R> {
        self.world.get::<C>(self.entity).map(f)
    }

    fn write<C: Component<Mutability = Mutable>, R>(
        &mut self,
        f: impl FnOnce(&mut C) -> R,
    ) -> Option<R> {
        self.world
            .get_mut::<C>(self.entity)
            .map(|mut c| f(&mut c))
    }

    fn send(&self, cmd: HostCmd) {
        self.world.resource::<HostLink>().send(cmd);
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn is_alive(&self) -> bool {
        self.world.get::<ActorId>(self.entity).is_some()
    }

    pub fn id(&self) -> Option<ActorId> {
        self.read(|id: &ActorId| *id)
    }

    // --- identity ---

    pub fn filename(&self) -> String {
        self.read(|i: &ActorInfo| i.filename.clone()).unwrap_or_default()
    }

    pub fn title(&self) -> String {
        self.read(|i: &ActorInfo| i.title.clone()).unwrap_or_default()
    }

    /// Authoring-time tag; empty when unset.
    pub fn tag(&self, key: &str) -> String {
        self.read(|i: &ActorInfo| i.tag(key).to_string())
            .unwrap_or_default()
    }

    /// Linked actors that are still alive, in authoring order.
    pub fn links(&self) -> Vec<Entity> {
        let links = self
            .read(|i: &ActorInfo| i.links.clone())
            .unwrap_or_default();
        links
            .into_iter()
            .filter(|e| self.world.get::<ActorId>(*e).is_some())
            .collect()
    }

    // --- kinematics ---

    pub fn position(&self) -> Point {
        self.read(|p: &MapPosition| p.pos).unwrap_or_default()
    }

    pub fn move_to(&mut self, to: Point) {
        self.write(|p: &mut MapPosition| p.pos = to);
    }

    pub fn velocity(&self) -> Vec2 {
        self.read(|b: &RigidBody| b.velocity).unwrap_or_default()
    }

    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.write(|b: &mut RigidBody| b.velocity = velocity);
    }

    /// Sprite bounds.
    pub fn size(&self) -> Vec2 {
        self.read(|c: &BoxCollider| c.size).unwrap_or_default()
    }

    /// Hitbox relative to the actor's position, zero sentinel resolved.
    pub fn hitbox(&self) -> Rect {
        self.read(|c: &BoxCollider| c.local_hitbox())
            .unwrap_or_default()
    }

    /// Replace the hitbox. Negative sizes are rejected and logged; the
    /// previous hitbox stays in effect.
    pub fn set_hitbox(&mut self, x: f32, y: f32, w: f32, h: f32) -> ScriptResult<()> {
        let label = self.title();
        match self.write(|c: &mut BoxCollider| c.set_hitbox(x, y, w, h)) {
            Some(Err(e)) => {
                warn!(target: "script", "{}: rejected hitbox: {}", label, e);
                Err(e)
            }
            _ => Ok(()),
        }
    }

    // --- flags ---

    pub fn is_mobile(&self) -> bool {
        self.read(|b: &RigidBody| b.mobile).unwrap_or(false)
    }

    pub fn set_mobile(&mut self, mobile: bool) {
        self.write(|b: &mut RigidBody| b.mobile = mobile);
    }

    pub fn has_gravity(&self) -> bool {
        self.read(|b: &RigidBody| b.gravity).unwrap_or(false)
    }

    pub fn set_gravity(&mut self, gravity: bool) {
        self.write(|b: &mut RigidBody| b.gravity = gravity);
    }

    pub fn is_frozen(&self) -> bool {
        self.read(|b: &RigidBody| b.frozen).unwrap_or(false)
    }

    pub fn freeze(&mut self) {
        self.write(|b: &mut RigidBody| b.frozen = true);
    }

    pub fn unfreeze(&mut self) {
        self.write(|b: &mut RigidBody| b.frozen = false);
    }

    pub fn grounded(&self) -> bool {
        self.read(|b: &RigidBody| b.grounded).unwrap_or(false)
    }

    pub fn is_wet(&self) -> bool {
        self.read(|b: &RigidBody| b.wet).unwrap_or(false)
    }

    pub fn set_wet(&mut self, wet: bool) {
        self.write(|b: &mut RigidBody| b.wet = wet);
    }

    /// Exclude the actor from collision entirely.
    pub fn set_noclip(&mut self, noclip: bool) {
        self.write(|b: &mut RigidBody| b.noclip = noclip);
    }

    pub fn is_player(&self) -> bool {
        self.read(|f: &ActorFlags| f.is_player).unwrap_or(false)
    }

    pub fn has_inventory(&self) -> bool {
        self.read(|f: &ActorFlags| f.has_inventory)
            .unwrap_or(false)
    }

    pub fn set_inventory(&mut self, enabled: bool) {
        self.write(|f: &mut ActorFlags| f.has_inventory = enabled);
    }

    pub fn invulnerable(&self) -> bool {
        self.read(|f: &ActorFlags| f.invulnerable).unwrap_or(false)
    }

    pub fn set_invulnerable(&mut self, invulnerable: bool) {
        self.write(|f: &mut ActorFlags| f.invulnerable = invulnerable);
    }

    // --- inventory ---

    pub fn add_item(&mut self, item: &str, quantity: u32) {
        self.write(|inv: &mut Inventory| inv.add(item, quantity));
    }

    /// Remove `quantity` of `item`; zero removes it outright.
    pub fn remove_item(&mut self, item: &str, quantity: u32) -> bool {
        self.write(|inv: &mut Inventory| inv.remove(item, quantity))
            .unwrap_or(false)
    }

    /// Held quantity, `Some(0)` for key items, `None` when absent.
    pub fn has_item(&self, item: &str) -> Option<u32> {
        self.read(|inv: &Inventory| inv.quantity(item)).flatten()
    }

    pub fn list_items(&self) -> Vec<(String, u32)> {
        self.read(|inv: &Inventory| inv.list()).unwrap_or_default()
    }

    pub fn clear_inventory(&mut self) {
        self.write(|inv: &mut Inventory| inv.clear());
    }

    // --- rendering requests ---

    pub fn is_visible(&self) -> bool {
        self.read(|f: &ActorFlags| f.visible).unwrap_or(false)
    }

    pub fn show(&mut self) {
        self.set_visible(true);
    }

    pub fn hide(&mut self) {
        self.set_visible(false);
    }

    fn set_visible(&mut self, visible: bool) {
        if self.write(|f: &mut ActorFlags| f.visible = visible).is_some() {
            self.send(HostCmd::SetVisible {
                actor: self.entity,
                visible,
            });
        }
    }

    /// Show a frame/layer directly, outside of any animation.
    pub fn show_frame(&mut self, frame: FrameId) {
        let shown = frame.clone();
        if self.write(|a: &mut Animator| a.set_frame(shown)).is_some() {
            self.send(HostCmd::ShowFrame {
                actor: self.entity,
                frame,
            });
        }
    }
}
