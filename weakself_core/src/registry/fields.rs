// Copyright 2026 the Weakself Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Field traversal.

use super::id::ActionId;
use super::store::LifetimeRegistry;

/// An iterator over the live actions stored in a controller's fields.
///
/// Created by [`LifetimeRegistry::fields`].
#[derive(Debug)]
pub struct Fields<'a> {
    registry: &'a LifetimeRegistry,
    remaining: core::slice::Iter<'a, ActionId>,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(registry: &'a LifetimeRegistry, slots: &'a [ActionId]) -> Self {
        Self {
            registry,
            remaining: slots.iter(),
        }
    }
}

impl Iterator for Fields<'_> {
    type Item = ActionId;

    fn next(&mut self) -> Option<ActionId> {
        let registry = self.registry;
        self.remaining
            .by_ref()
            .copied()
            .find(|&action| registry.action_is_alive(action))
    }
}
