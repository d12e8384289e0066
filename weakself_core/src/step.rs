// Copyright 2026 the Weakself Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated clock.
//!
//! [`Step`] is a point on the scheduler's logical clock. Nothing in the
//! simulation reads wall-clock time: the clock only moves when a driver calls
//! [`ActionScheduler::advance`](crate::action::ActionScheduler::advance).
//!
//! [`Steps`] is a span of the same logical units, used for one-shot delays
//! and repeat intervals.

use core::fmt;
use core::ops::{Add, AddAssign, Sub};

/// A point on the simulated clock.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Step(pub u64);

impl Step {
    /// The moment the simulation starts.
    pub const ZERO: Self = Self(0);

    /// Returns the raw step index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u64 {
        self.0
    }

    /// Returns the span between `self` and an earlier step, or zero if
    /// `earlier` is after `self`.
    #[inline]
    #[must_use]
    pub const fn saturating_steps_since(self, earlier: Self) -> Steps {
        Steps(self.0.saturating_sub(earlier.0))
    }

    /// Checked addition of a span.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, span: Steps) -> Option<Self> {
        match self.0.checked_add(span.0) {
            Some(s) => Some(Self(s)),
            None => None,
        }
    }

    /// Returns the following step, saturating at `u64::MAX`.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl Add<Steps> for Step {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Steps) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign<Steps> for Step {
    #[inline]
    fn add_assign(&mut self, rhs: Steps) {
        *self = *self + rhs;
    }
}

impl Sub for Step {
    type Output = Steps;

    #[inline]
    fn sub(self, rhs: Self) -> Steps {
        Steps(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step({})", self.0)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// A span on the simulated clock.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Steps(pub u64);

impl Steps {
    /// A zero-length span.
    pub const ZERO: Self = Self(0);

    /// One step.
    pub const ONE: Self = Self(1);

    /// Returns the raw number of steps.
    #[inline]
    #[must_use]
    pub const fn count(self) -> u64 {
        self.0
    }

    /// Returns `true` if this span is zero.
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Steps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Steps({})", self.0)
    }
}
