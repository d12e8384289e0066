// Copyright 2026 the Weakself Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Controller and action identity types.

use core::fmt;

/// Sentinel value indicating "no slot" in index fields.
pub const INVALID: u32 = u32::MAX;

/// A handle to a controller in a [`LifetimeRegistry`](super::LifetimeRegistry).
///
/// Contains both a slot index and a generation counter so that stale handles
/// can be detected after a controller is destroyed and the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ControllerId {
    /// Slot index into the registry's controller arrays.
    pub(crate) idx: u32,
    /// Generation counter; must match the registry's generation for this slot.
    pub(crate) generation: u32,
}

impl ControllerId {
    /// Rebuilds a handle from its raw parts (for decoding recorded traces).
    #[inline]
    #[must_use]
    pub const fn from_parts(index: u32, generation: u32) -> Self {
        Self {
            idx: index,
            generation,
        }
    }

    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ControllerId({}@gen{})", self.idx, self.generation)
    }
}

/// A handle to an action node in a [`LifetimeRegistry`](super::LifetimeRegistry).
///
/// Action nodes are the registry's view of a closure: they hold the capture
/// edge and are themselves kept alive by their holders.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActionId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl ActionId {
    /// Rebuilds a handle from its raw parts (for decoding recorded traces).
    #[inline]
    #[must_use]
    pub const fn from_parts(index: u32, generation: u32) -> Self {
        Self {
            idx: index,
            generation,
        }
    }

    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActionId({}@gen{})", self.idx, self.generation)
    }
}

/// A non-owning reference to a controller.
///
/// Resolve it with [`LifetimeRegistry::upgrade`](super::LifetimeRegistry::upgrade).
/// Once the controller is destroyed the generation no longer matches and the
/// reference resolves to `None`, even if the slot has been reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeakRef {
    pub(crate) target: ControllerId,
}

impl WeakRef {
    /// Returns the handle this reference was taken from, without checking
    /// whether it is still alive.
    #[inline]
    #[must_use]
    pub const fn target_unchecked(self) -> ControllerId {
        self.target
    }
}

impl fmt::Debug for WeakRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakRef({:?})", self.target)
    }
}
