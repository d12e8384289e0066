// Copyright 2026 the Weakself Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays lifetime storage with allocation, edge, and ownership
//! management.

use alloc::vec::Vec;

use super::fields::Fields;
use super::id::{ActionId, ControllerId, INVALID, WeakRef};

/// What finally happened to a controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Fate {
    /// Still allocated.
    Alive,
    /// Destroyed because its strong count reached zero.
    Released,
    /// Destroyed by the reachability sweep: unreachable from every root, but
    /// kept at a non-zero strong count by a reference cycle. Reference
    /// counting alone would never have freed it.
    Swept,
}

impl Fate {
    /// Returns a short label for traces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alive => "alive",
            Self::Released => "released",
            Self::Swept => "swept",
        }
    }
}

/// The capture edge an action node holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Edge {
    /// No edge to any controller.
    None,
    /// Owning edge; counted in the target's strong count.
    Strong(ControllerId),
    /// Observing edge; recorded in the target's observer set.
    Weak(WeakRef),
}

/// Struct-of-arrays storage for controllers and action nodes.
///
/// Both kinds of object are addressed by generational handles. Destroyed
/// slots are recycled via free lists, and generation counters make stale
/// handles (and [`WeakRef`]s) resolve to "absent" instead of aliasing a new
/// object.
///
/// Mutating calls with a stale handle are no-ops. Controllers are only ever
/// destroyed by [`collect`](Self::collect); action nodes are freed as soon as
/// their last holder lets go.
#[derive(Debug)]
pub struct LifetimeRegistry {
    // -- Controllers --
    pub(crate) label: Vec<&'static str>,
    /// Strong references held by the navigation stack (the external owner).
    pub(crate) external: Vec<u32>,
    /// External references plus incoming strong edges.
    pub(crate) strong: Vec<u32>,
    /// Action slots retained by the controller's stored properties.
    pub(crate) fields: Vec<Vec<ActionId>>,
    /// Action nodes observing the controller weakly.
    pub(crate) observers: Vec<Vec<ActionId>>,
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,
    /// Fates of destroyed controllers, in destruction order.
    pub(crate) obituaries: Vec<(ControllerId, Fate)>,

    // -- Action nodes --
    pub(crate) action_label: Vec<&'static str>,
    pub(crate) action_edge: Vec<Edge>,
    /// Held by the scope that created it (released when `schedule` returns).
    pub(crate) action_scoped: Vec<bool>,
    /// Held by the scheduler (a root, like a run loop or dispatch queue).
    pub(crate) action_pinned: Vec<bool>,
    /// Controller slot whose field retains this action, or [`INVALID`].
    pub(crate) action_owner: Vec<u32>,
    pub(crate) action_generation: Vec<u32>,
    pub(crate) action_free: Vec<u32>,
    pub(crate) action_len: u32,
}

impl Default for LifetimeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LifetimeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            label: Vec::new(),
            external: Vec::new(),
            strong: Vec::new(),
            fields: Vec::new(),
            observers: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            obituaries: Vec::new(),
            action_label: Vec::new(),
            action_edge: Vec::new(),
            action_scoped: Vec::new(),
            action_pinned: Vec::new(),
            action_owner: Vec::new(),
            action_generation: Vec::new(),
            action_free: Vec::new(),
            action_len: 0,
        }
    }

    // -- Controller allocation --

    /// Registers a new controller and returns its handle.
    ///
    /// The controller starts with a strong count of one, owned by the
    /// simulated navigation stack.
    pub fn register(&mut self, label: &'static str) -> ControllerId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            let i = idx as usize;
            self.generation[i] += 1;
            self.label[i] = label;
            self.external[i] = 1;
            self.strong[i] = 1;
            self.fields[i].clear();
            self.observers[i].clear();
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.label.push(label);
            self.external.push(1);
            self.strong.push(1);
            self.fields.push(Vec::new());
            self.observers.push(Vec::new());
            self.generation.push(0);
            idx
        };

        ControllerId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Drops the navigation stack's reference to `id` (dismissal).
    ///
    /// Returns `false` without changing anything if the external owner was
    /// already released or the controller is gone. Destruction happens on the
    /// next [`collect`](Self::collect).
    pub fn release_external_owner(&mut self, id: ControllerId) -> bool {
        let Some(i) = self.controller_slot(id) else {
            return false;
        };
        if self.external[i] == 0 {
            return false;
        }
        self.external[i] -= 1;
        self.strong[i] -= 1;
        true
    }

    /// Returns whether the given handle refers to a live controller.
    #[must_use]
    pub fn is_alive(&self, id: ControllerId) -> bool {
        self.controller_slot(id).is_some()
    }

    /// Resolves a weak reference. Returns `None` once the controller has been
    /// destroyed, including after its slot has been reused.
    #[must_use]
    pub fn upgrade(&self, weak: WeakRef) -> Option<ControllerId> {
        self.is_alive(weak.target).then_some(weak.target)
    }

    /// Returns the strong count (external owner plus strong edges), or `None`
    /// for a dead handle.
    #[must_use]
    pub fn strong_count(&self, id: ControllerId) -> Option<u32> {
        self.controller_slot(id).map(|i| self.strong[i])
    }

    /// Returns how many references the external owner still holds.
    #[must_use]
    pub fn external_count(&self, id: ControllerId) -> Option<u32> {
        self.controller_slot(id).map(|i| self.external[i])
    }

    /// Returns how many action nodes observe the controller weakly.
    #[must_use]
    pub fn weak_observer_count(&self, id: ControllerId) -> Option<usize> {
        self.controller_slot(id).map(|i| self.observers[i].len())
    }

    /// Returns the label the controller was registered with.
    #[must_use]
    pub fn label(&self, id: ControllerId) -> Option<&'static str> {
        self.controller_slot(id).map(|i| self.label[i])
    }

    /// Returns what happened to a controller, or `None` if the handle was
    /// never issued by this registry.
    #[must_use]
    pub fn fate(&self, id: ControllerId) -> Option<Fate> {
        if self.is_alive(id) {
            return Some(Fate::Alive);
        }
        self.obituaries
            .iter()
            .rev()
            .find(|(dead, _)| *dead == id)
            .map(|(_, fate)| *fate)
    }

    /// Returns handles to every live controller, in slot order.
    #[must_use]
    pub fn live_controllers(&self) -> Vec<ControllerId> {
        (0..self.len)
            .filter(|&idx| !self.free_list.contains(&idx))
            .map(|idx| ControllerId {
                idx,
                generation: self.generation[idx as usize],
            })
            .collect()
    }

    /// Returns an iterator over the live actions retained by a controller's
    /// fields.
    #[must_use]
    pub fn fields(&self, id: ControllerId) -> Fields<'_> {
        match self.controller_slot(id) {
            Some(i) => Fields::new(self, &self.fields[i]),
            None => Fields::new(self, &[]),
        }
    }

    // -- Action allocation --

    /// Creates an action node held only by its creating scope.
    ///
    /// Release that hold with [`release_scope`](Self::release_scope) once the
    /// action has been stored or handed off.
    pub fn create_action(&mut self, label: &'static str) -> ActionId {
        let idx = if let Some(idx) = self.action_free.pop() {
            let i = idx as usize;
            self.action_generation[i] += 1;
            self.action_label[i] = label;
            self.action_edge[i] = Edge::None;
            self.action_scoped[i] = true;
            self.action_pinned[i] = false;
            self.action_owner[i] = INVALID;
            idx
        } else {
            let idx = self.action_len;
            self.action_len += 1;
            self.action_label.push(label);
            self.action_edge.push(Edge::None);
            self.action_scoped.push(true);
            self.action_pinned.push(false);
            self.action_owner.push(INVALID);
            self.action_generation.push(0);
            idx
        };

        ActionId {
            idx,
            generation: self.action_generation[idx as usize],
        }
    }

    /// Returns whether the given handle refers to a live action node.
    #[must_use]
    pub fn action_is_alive(&self, id: ActionId) -> bool {
        self.action_slot(id).is_some()
    }

    /// Returns the controller an action captures strongly, if any.
    #[must_use]
    pub fn strong_target(&self, id: ActionId) -> Option<ControllerId> {
        match self.action_slot(id).map(|i| self.action_edge[i]) {
            Some(Edge::Strong(target)) => Some(target),
            _ => None,
        }
    }

    /// Returns whether an action is currently held by the scheduler.
    #[must_use]
    pub fn is_pinned(&self, id: ActionId) -> bool {
        self.action_slot(id).is_some_and(|i| self.action_pinned[i])
    }

    // -- Edge API --

    /// Adds a strong edge from `action` to `controller`, incrementing the
    /// controller's strong count.
    ///
    /// Returns `false` (and does nothing) if either handle is stale or the
    /// action already holds an edge.
    pub fn add_strong_edge(&mut self, action: ActionId, controller: ControllerId) -> bool {
        let (Some(a), Some(c)) = (self.action_slot(action), self.controller_slot(controller))
        else {
            return false;
        };
        if self.action_edge[a] != Edge::None {
            return false;
        }
        self.action_edge[a] = Edge::Strong(controller);
        self.strong[c] += 1;
        true
    }

    /// Adds a weak edge from `action` to `controller`. The strong count is
    /// unchanged.
    ///
    /// Returns `None` if either handle is stale or the action already holds
    /// an edge.
    pub fn add_weak_edge(&mut self, action: ActionId, controller: ControllerId) -> Option<WeakRef> {
        let a = self.action_slot(action)?;
        let c = self.controller_slot(controller)?;
        if self.action_edge[a] != Edge::None {
            return None;
        }
        let weak = WeakRef { target: controller };
        self.action_edge[a] = Edge::Weak(weak);
        self.observers[c].push(action);
        Some(weak)
    }

    /// Removes the action's capture edge, if it has one. Idempotent.
    pub fn remove_edge(&mut self, action: ActionId) -> bool {
        let Some(a) = self.action_slot(action) else {
            return false;
        };
        self.detach_edge(a)
    }

    // -- Holder API --

    /// Stores `action` in one of `controller`'s fields: a strong
    /// controller-to-action reference.
    ///
    /// Returns `false` if either handle is stale or the action is already
    /// stored somewhere.
    pub fn retain_in_field(&mut self, controller: ControllerId, action: ActionId) -> bool {
        let (Some(c), Some(a)) = (self.controller_slot(controller), self.action_slot(action))
        else {
            return false;
        };
        if self.action_owner[a] != INVALID {
            return false;
        }
        self.action_owner[a] = controller.idx;
        self.fields[c].push(action);
        true
    }

    /// Marks `action` as held by the scheduler. Idempotent.
    pub fn pin(&mut self, action: ActionId) {
        if let Some(a) = self.action_slot(action) {
            self.action_pinned[a] = true;
        }
    }

    /// Drops the scheduler's hold on `action`.
    ///
    /// Returns `true` if that was the last hold and the action node was
    /// freed (and its capture edge removed).
    pub fn unpin(&mut self, action: ActionId) -> bool {
        let Some(a) = self.action_slot(action) else {
            return false;
        };
        if !self.action_pinned[a] {
            return false;
        }
        self.action_pinned[a] = false;
        self.free_action_if_unheld(a)
    }

    /// Drops the creating scope's hold on `action`.
    ///
    /// Returns `true` if that was the last hold and the action node was
    /// freed.
    pub fn release_scope(&mut self, action: ActionId) -> bool {
        let Some(a) = self.action_slot(action) else {
            return false;
        };
        if !self.action_scoped[a] {
            return false;
        }
        self.action_scoped[a] = false;
        self.free_action_if_unheld(a)
    }

    // -- Internal helpers --

    /// Returns the slot of a live controller.
    pub(crate) fn controller_slot(&self, id: ControllerId) -> Option<usize> {
        let i = id.idx as usize;
        (id.idx < self.len && self.generation[i] == id.generation && !self.free_list.contains(&id.idx))
            .then_some(i)
    }

    /// Returns the slot of a live action node.
    pub(crate) fn action_slot(&self, id: ActionId) -> Option<usize> {
        let i = id.idx as usize;
        (id.idx < self.action_len
            && self.action_generation[i] == id.generation
            && !self.action_free.contains(&id.idx))
        .then_some(i)
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "slots are allocated from a u32 counter"
    )]
    pub(crate) fn action_id_at(&self, a: usize) -> ActionId {
        ActionId {
            idx: a as u32,
            generation: self.action_generation[a],
        }
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "slots are allocated from a u32 counter"
    )]
    pub(crate) fn controller_id_at(&self, c: usize) -> ControllerId {
        ControllerId {
            idx: c as u32,
            generation: self.generation[c],
        }
    }

    pub(crate) fn action_is_held(&self, a: usize) -> bool {
        self.action_scoped[a] || self.action_pinned[a] || self.action_owner[a] != INVALID
    }

    /// Drops the edge held by action slot `a`, keeping counts consistent.
    fn detach_edge(&mut self, a: usize) -> bool {
        let action = self.action_id_at(a);
        match core::mem::replace(&mut self.action_edge[a], Edge::None) {
            Edge::None => false,
            Edge::Strong(target) => {
                if let Some(c) = self.controller_slot(target) {
                    self.strong[c] -= 1;
                }
                true
            }
            Edge::Weak(weak) => {
                if let Some(c) = self.controller_slot(weak.target) {
                    self.observers[c].retain(|&o| o != action);
                }
                true
            }
        }
    }

    fn free_action_if_unheld(&mut self, a: usize) -> bool {
        if self.action_is_held(a) {
            return false;
        }
        self.free_action(a);
        true
    }

    /// Frees action slot `a`, removing its edge and unlinking it from its
    /// owner's fields.
    pub(crate) fn free_action(&mut self, a: usize) {
        let action = self.action_id_at(a);
        self.detach_edge(a);
        let owner = self.action_owner[a];
        if owner != INVALID {
            self.fields[owner as usize].retain(|&f| f != action);
            self.action_owner[a] = INVALID;
        }
        self.action_scoped[a] = false;
        self.action_pinned[a] = false;
        // Bump generation so old handles immediately fail validation.
        self.action_generation[a] += 1;
        self.action_free.push(action.idx);
    }

    /// Destroys controller slot `c`, releasing the actions its fields hold.
    ///
    /// Returns the actions freed as a consequence. Controllers whose strong
    /// count drops to zero along the way are left for the caller's worklist.
    pub(crate) fn destroy_controller(&mut self, c: usize, fate: Fate) -> Vec<ActionId> {
        let id = self.controller_id_at(c);
        let retained = core::mem::take(&mut self.fields[c]);
        let mut freed = Vec::new();
        for action in retained {
            if let Some(a) = self.action_slot(action) {
                self.action_owner[a] = INVALID;
                if !self.action_is_held(a) {
                    self.free_action(a);
                    freed.push(action);
                }
            }
        }
        self.observers[c].clear();
        self.external[c] = 0;
        self.strong[c] = 0;
        // Bump generation so old handles and weak references resolve to absent.
        self.generation[c] += 1;
        self.free_list.push(id.idx);
        self.obituaries.push((id, fate));
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_starts_with_one_external_owner() {
        let mut reg = LifetimeRegistry::new();
        let vc = reg.register("PresentedController");
        assert!(reg.is_alive(vc));
        assert_eq!(reg.strong_count(vc), Some(1));
        assert_eq!(reg.external_count(vc), Some(1));
        assert_eq!(reg.label(vc), Some("PresentedController"));
        assert_eq!(reg.fate(vc), Some(Fate::Alive));
    }

    #[test]
    fn release_external_owner_is_idempotent() {
        let mut reg = LifetimeRegistry::new();
        let vc = reg.register("vc");
        assert!(reg.release_external_owner(vc));
        assert!(!reg.release_external_owner(vc));
        assert_eq!(reg.strong_count(vc), Some(0));
        assert_eq!(reg.external_count(vc), Some(0));
    }

    #[test]
    fn strong_edge_counts_and_weak_edge_does_not() {
        let mut reg = LifetimeRegistry::new();
        let vc = reg.register("vc");
        let strong = reg.create_action("strong");
        let weak = reg.create_action("weak");

        assert!(reg.add_strong_edge(strong, vc));
        assert_eq!(reg.strong_count(vc), Some(2));
        assert_eq!(reg.strong_target(strong), Some(vc));

        let w = reg.add_weak_edge(weak, vc).unwrap();
        assert_eq!(reg.strong_count(vc), Some(2));
        assert_eq!(reg.weak_observer_count(vc), Some(1));
        assert_eq!(reg.upgrade(w), Some(vc));
    }

    #[test]
    fn second_edge_on_same_action_is_rejected() {
        let mut reg = LifetimeRegistry::new();
        let vc = reg.register("vc");
        let a = reg.create_action("a");
        assert!(reg.add_strong_edge(a, vc));
        assert!(!reg.add_strong_edge(a, vc));
        assert!(reg.add_weak_edge(a, vc).is_none());
        assert_eq!(reg.strong_count(vc), Some(2));
    }

    #[test]
    fn remove_edge_restores_count_and_is_idempotent() {
        let mut reg = LifetimeRegistry::new();
        let vc = reg.register("vc");
        let a = reg.create_action("a");
        reg.add_strong_edge(a, vc);
        assert!(reg.remove_edge(a));
        assert!(!reg.remove_edge(a));
        assert_eq!(reg.strong_count(vc), Some(1));
    }

    #[test]
    fn releasing_last_hold_frees_action_and_its_edge() {
        let mut reg = LifetimeRegistry::new();
        let vc = reg.register("vc");
        let a = reg.create_action("a");
        reg.add_strong_edge(a, vc);
        reg.pin(a);

        assert!(!reg.release_scope(a), "still pinned by the scheduler");
        assert!(reg.action_is_alive(a));
        assert_eq!(reg.strong_count(vc), Some(2));

        assert!(reg.unpin(a));
        assert!(!reg.action_is_alive(a));
        assert_eq!(reg.strong_count(vc), Some(1));
    }

    #[test]
    fn field_retention_keeps_action_alive() {
        let mut reg = LifetimeRegistry::new();
        let vc = reg.register("vc");
        let a = reg.create_action("closure");
        assert!(reg.retain_in_field(vc, a));
        assert!(!reg.retain_in_field(vc, a), "already stored");
        assert!(!reg.release_scope(a));
        assert!(reg.action_is_alive(a));
        assert_eq!(reg.fields(vc).collect::<Vec<_>>(), [a]);
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut reg = LifetimeRegistry::new();
        let first = reg.register("first");
        reg.release_external_owner(first);
        let _ = reg.collect();
        let second = reg.register("second");

        // `second` reuses the same slot but has a different generation.
        assert_eq!(first.index(), second.index());
        assert_ne!(first.generation(), second.generation());
        assert!(!reg.is_alive(first));
        assert!(reg.is_alive(second));
        assert_eq!(reg.fate(first), Some(Fate::Released));
        assert_eq!(reg.fate(second), Some(Fate::Alive));
    }

    #[test]
    fn stale_handles_are_noops() {
        let mut reg = LifetimeRegistry::new();
        let vc = reg.register("vc");
        let a = reg.create_action("a");
        reg.release_scope(a);
        reg.release_external_owner(vc);
        let _ = reg.collect();

        assert!(!reg.release_external_owner(vc));
        assert!(!reg.add_strong_edge(a, vc));
        assert!(!reg.retain_in_field(vc, a));
        assert!(!reg.unpin(a));
        assert_eq!(reg.strong_count(vc), None);
        assert_eq!(reg.fields(vc).count(), 0);
    }

    #[test]
    fn live_controllers_skips_freed_slots() {
        let mut reg = LifetimeRegistry::new();
        let a = reg.register("a");
        let b = reg.register("b");
        reg.release_external_owner(a);
        let _ = reg.collect();
        assert_eq!(reg.live_controllers(), [b]);
    }

    #[test]
    fn unknown_handle_has_no_fate() {
        let reg = LifetimeRegistry::new();
        assert_eq!(reg.fate(ControllerId::from_parts(3, 0)), None);
    }
}
