// Copyright 2026 the Weakself Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collection: reference-count release followed by a reachability sweep.
//!
//! [`LifetimeRegistry::collect`] runs two passes:
//!
//! 1. **Release**: Every live controller whose strong count is zero is
//!    destroyed ([`Fate::Released`]). Its fields let go of their actions;
//!    actions with no remaining holder are freed and drop their capture
//!    edges, which can bring further controllers to zero. The pass repeats
//!    until nothing else reaches zero. This is what plain reference counting
//!    would do.
//! 2. **Trace**: Mark-and-sweep from the root set: controllers still held by
//!    the external owner, and actions held by a scheduler or a creating
//!    scope. Controllers reach the actions in their fields; actions reach the
//!    controller they capture strongly. Anything left unmarked is only kept
//!    alive by a reference cycle. It is destroyed, and its controllers are
//!    recorded as [`Fate::Swept`].
//!
//! A swept controller is one that reference counting alone would have leaked.

use alloc::vec;
use alloc::vec::Vec;

use super::id::{ActionId, ControllerId};
use super::store::{Edge, Fate, LifetimeRegistry};

/// What a single [`LifetimeRegistry::collect`] call destroyed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectReport {
    /// Controllers destroyed because their strong count reached zero.
    pub released: Vec<ControllerId>,
    /// Controllers destroyed by the sweep because only a cycle held them.
    pub swept: Vec<ControllerId>,
    /// Action nodes freed during collection.
    pub freed_actions: Vec<ActionId>,
}

impl CollectReport {
    /// Returns `true` if nothing was destroyed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.released.is_empty() && self.swept.is_empty() && self.freed_actions.is_empty()
    }

    /// Iterates over every destroyed controller with its fate.
    pub fn destroyed(&self) -> impl Iterator<Item = (ControllerId, Fate)> + '_ {
        self.released
            .iter()
            .map(|&id| (id, Fate::Released))
            .chain(self.swept.iter().map(|&id| (id, Fate::Swept)))
    }
}

#[derive(Clone, Copy, Debug)]
enum Node {
    Controller(usize),
    Action(usize),
}

impl LifetimeRegistry {
    /// Destroys every controller and action node that is no longer
    /// reachable, and reports how each one went.
    pub fn collect(&mut self) -> CollectReport {
        let mut report = CollectReport::default();
        self.release_pass(&mut report);
        self.trace_pass(&mut report);
        report
    }

    fn release_pass(&mut self, report: &mut CollectReport) {
        loop {
            let doomed: Vec<usize> = self
                .live_controller_slots()
                .into_iter()
                .filter(|&c| self.strong[c] == 0)
                .collect();
            if doomed.is_empty() {
                break;
            }
            for c in doomed {
                report.released.push(self.controller_id_at(c));
                let freed = self.destroy_controller(c, Fate::Released);
                report.freed_actions.extend(freed);
            }
        }
    }

    fn trace_pass(&mut self, report: &mut CollectReport) {
        let controllers = self.live_controller_slots();
        let actions = self.live_action_slots();
        let mut marked_controller = vec![false; self.len as usize];
        let mut marked_action = vec![false; self.action_len as usize];

        let mut stack: Vec<Node> = controllers
            .iter()
            .filter(|&&c| self.external[c] > 0)
            .map(|&c| Node::Controller(c))
            .collect();
        stack.extend(
            actions
                .iter()
                .filter(|&&a| self.action_scoped[a] || self.action_pinned[a])
                .map(|&a| Node::Action(a)),
        );

        while let Some(node) = stack.pop() {
            match node {
                Node::Controller(c) => {
                    if marked_controller[c] {
                        continue;
                    }
                    marked_controller[c] = true;
                    for &action in &self.fields[c] {
                        if let Some(a) = self.action_slot(action) {
                            stack.push(Node::Action(a));
                        }
                    }
                }
                Node::Action(a) => {
                    if marked_action[a] {
                        continue;
                    }
                    marked_action[a] = true;
                    if let Edge::Strong(target) = self.action_edge[a] {
                        if let Some(c) = self.controller_slot(target) {
                            stack.push(Node::Controller(c));
                        }
                    }
                }
            }
        }

        // Free unreachable actions first so that edges into reachable
        // controllers are uncounted before any controller goes away.
        for a in actions {
            if !marked_action[a] {
                report.freed_actions.push(self.action_id_at(a));
                self.free_action(a);
            }
        }
        for c in controllers {
            if !marked_controller[c] {
                report.swept.push(self.controller_id_at(c));
                let freed = self.destroy_controller(c, Fate::Swept);
                report.freed_actions.extend(freed);
            }
        }
    }

    fn live_controller_slots(&self) -> Vec<usize> {
        (0..self.len)
            .filter(|idx| !self.free_list.contains(idx))
            .map(|idx| idx as usize)
            .collect()
    }

    fn live_action_slots(&self) -> Vec<usize> {
        (0..self.action_len)
            .filter(|idx| !self.action_free.contains(idx))
            .map(|idx| idx as usize)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Controller -> field -> action -> strong edge -> controller.
    fn two_node_cycle(reg: &mut LifetimeRegistry) -> (ControllerId, ActionId) {
        let vc = reg.register("vc");
        let closure = reg.create_action("closure");
        reg.add_strong_edge(closure, vc);
        reg.retain_in_field(vc, closure);
        reg.release_scope(closure);
        (vc, closure)
    }

    #[test]
    fn owned_controller_survives_collect() {
        let mut reg = LifetimeRegistry::new();
        let vc = reg.register("vc");
        let report = reg.collect();
        assert!(report.is_empty());
        assert!(reg.is_alive(vc));
    }

    #[test]
    fn released_controller_is_destroyed() {
        let mut reg = LifetimeRegistry::new();
        let vc = reg.register("vc");
        reg.release_external_owner(vc);
        let report = reg.collect();
        assert_eq!(report.released, [vc]);
        assert!(report.swept.is_empty());
        assert_eq!(reg.fate(vc), Some(Fate::Released));
    }

    #[test]
    fn two_node_cycle_is_swept_not_released() {
        let mut reg = LifetimeRegistry::new();
        let (vc, closure) = two_node_cycle(&mut reg);
        reg.release_external_owner(vc);

        // Pure counting sees a strong reference still pointing at the controller.
        assert_eq!(reg.strong_count(vc), Some(1));

        let report = reg.collect();
        assert!(report.released.is_empty());
        assert_eq!(report.swept, [vc]);
        assert_eq!(report.freed_actions, [closure]);
        assert!(!reg.is_alive(vc));
        assert!(!reg.action_is_alive(closure));
        assert_eq!(reg.fate(vc), Some(Fate::Swept));
    }

    #[test]
    fn cycle_with_external_owner_is_kept() {
        let mut reg = LifetimeRegistry::new();
        let (vc, closure) = two_node_cycle(&mut reg);
        let report = reg.collect();
        assert!(report.is_empty());
        assert!(reg.is_alive(vc));
        assert!(reg.action_is_alive(closure));
    }

    #[test]
    fn weak_field_action_is_released_with_controller() {
        let mut reg = LifetimeRegistry::new();
        let vc = reg.register("vc");
        let closure = reg.create_action("closure");
        let weak = reg.add_weak_edge(closure, vc).unwrap();
        reg.retain_in_field(vc, closure);
        reg.release_scope(closure);

        reg.release_external_owner(vc);
        let report = reg.collect();
        assert_eq!(report.released, [vc]);
        assert_eq!(report.freed_actions, [closure]);
        assert_eq!(reg.upgrade(weak), None);
    }

    #[test]
    fn pinned_action_keeps_controller_reachable() {
        let mut reg = LifetimeRegistry::new();
        let vc = reg.register("vc");
        let timer = reg.create_action("timer");
        reg.add_strong_edge(timer, vc);
        reg.pin(timer);
        reg.release_scope(timer);
        reg.release_external_owner(vc);

        let report = reg.collect();
        assert!(report.is_empty());
        assert!(reg.is_alive(vc));

        // Once the scheduler lets go, plain counting frees everything.
        assert!(reg.unpin(timer));
        let report = reg.collect();
        assert_eq!(report.released, [vc]);
    }

    #[test]
    fn release_cascades_across_controllers() {
        let mut reg = LifetimeRegistry::new();
        let parent = reg.register("parent");
        let child = reg.register("child");
        // The parent stores a closure that owns the child.
        let closure = reg.create_action("closure");
        reg.add_strong_edge(closure, child);
        reg.retain_in_field(parent, closure);
        reg.release_scope(closure);
        reg.release_external_owner(child);

        assert!(reg.collect().is_empty(), "child is still owned by the closure");

        reg.release_external_owner(parent);
        let report = reg.collect();
        assert_eq!(report.released, [parent, child]);
        assert!(report.swept.is_empty());
    }

    #[test]
    fn sweep_uncounts_edges_into_reachable_controllers() {
        let mut reg = LifetimeRegistry::new();
        let (garbage, _) = two_node_cycle(&mut reg);
        let survivor = reg.register("survivor");
        // A closure stored in the garbage controller also owns the survivor.
        let closure = reg.create_action("closure");
        reg.add_strong_edge(closure, survivor);
        reg.retain_in_field(garbage, closure);
        reg.release_scope(closure);
        assert_eq!(reg.strong_count(survivor), Some(2));

        reg.release_external_owner(garbage);
        let report = reg.collect();
        assert_eq!(report.swept, [garbage]);
        assert_eq!(reg.strong_count(survivor), Some(1));

        reg.release_external_owner(survivor);
        assert_eq!(reg.collect().released, [survivor]);
    }

    #[test]
    fn weak_ref_stays_absent_after_slot_reuse() {
        let mut reg = LifetimeRegistry::new();
        let vc = reg.register("vc");
        let observer = reg.create_action("observer");
        let weak = reg.add_weak_edge(observer, vc).unwrap();
        reg.release_external_owner(vc);
        let _ = reg.collect();

        let reused = reg.register("reused");
        assert_eq!(reused.index(), vc.index());
        assert_eq!(reg.upgrade(weak), None);
    }

    #[test]
    fn double_release_does_not_change_the_outcome() {
        let mut once = LifetimeRegistry::new();
        let (a, _) = two_node_cycle(&mut once);
        once.release_external_owner(a);
        let first = once.collect();

        let mut twice = LifetimeRegistry::new();
        let (b, _) = two_node_cycle(&mut twice);
        twice.release_external_owner(b);
        twice.release_external_owner(b);
        let second = twice.collect();

        assert_eq!(first, second);
        assert_eq!(once.fate(a), twice.fate(b));
    }

    #[test]
    fn destroyed_lists_both_fates() {
        let mut reg = LifetimeRegistry::new();
        let plain = reg.register("plain");
        let (cyclic, _) = two_node_cycle(&mut reg);
        reg.release_external_owner(plain);
        reg.release_external_owner(cyclic);
        let report = reg.collect();
        let destroyed: Vec<_> = report.destroyed().collect();
        assert_eq!(
            destroyed,
            [(plain, Fate::Released), (cyclic, Fate::Swept)]
        );
    }
}
