// Copyright 2026 the Weakself Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! How an action references its controller, and when it runs.
//!
//! A closure's capture list is implicit in most UI code; here it is an
//! explicit [`CaptureKind`] tag on every action. Together with the
//! [`Trigger`] (does the closure escape, and does it repeat?) and the
//! [`Drive`] mode (is it handed to a scheduler?), it determines which edges
//! the action adds to the lifetime graph:
//!
//! | capture        | edge to controller             |
//! |----------------|--------------------------------|
//! | `StrongDirect` | strong, counts toward lifetime |
//! | `Weak`         | weak observer, resolves to absent after destruction |
//! | `FieldOnly`    | none (a sub-object was captured instead) |
//! | `None`         | none                           |

use alloc::string::ToString;
use core::fmt;
use core::str::FromStr;

use crate::error::ConfigError;
use crate::step::Steps;

/// How a closure references its owning controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CaptureKind {
    /// `self` is captured strongly, directly or through a method reference.
    StrongDirect,
    /// `self` is captured weakly (`[weak self]`).
    Weak,
    /// Only a sub-object of the controller (such as its view) is captured.
    FieldOnly,
    /// Nothing of the controller is captured.
    None,
}

impl CaptureKind {
    /// All capture kinds, in declaration order.
    pub const ALL: [Self; 4] = [Self::StrongDirect, Self::Weak, Self::FieldOnly, Self::None];

    /// Returns the short name used on the command line and in traces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StrongDirect => "strong",
            Self::Weak => "weak",
            Self::FieldOnly => "field",
            Self::None => "none",
        }
    }

    /// Whether the capture keeps the controller alive.
    #[inline]
    #[must_use]
    pub const fn is_strong(self) -> bool {
        matches!(self, Self::StrongDirect)
    }

    /// Whether the capture observes the controller without owning it.
    #[inline]
    #[must_use]
    pub const fn is_weak(self) -> bool {
        matches!(self, Self::Weak)
    }
}

impl fmt::Display for CaptureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaptureKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownCapture(s.to_string()))
    }
}

/// When an action runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Runs synchronously inside `schedule` and is discarded right after.
    /// Models non-escaping closures (`forEach`, `UIView.animate`).
    Immediate,
    /// Runs once, `delay` steps after it is queued.
    DeferredOnce {
        /// Steps between scheduling and execution.
        delay: Steps,
    },
    /// Runs every `interval` steps until cancelled.
    DeferredRepeating {
        /// Steps between executions; must be non-zero.
        interval: Steps,
    },
}

impl Trigger {
    /// A one-shot trigger due on the next step.
    pub const ONCE: Self = Self::DeferredOnce { delay: Steps::ONE };

    /// A repeating trigger firing on every step.
    pub const EVERY_STEP: Self = Self::DeferredRepeating {
        interval: Steps::ONE,
    };

    /// Returns the short name of the trigger kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::DeferredOnce { .. } => "once",
            Self::DeferredRepeating { .. } => "repeating",
        }
    }

    /// Whether the closure outlives the call that registers it.
    #[inline]
    #[must_use]
    pub const fn is_escaping(self) -> bool {
        !matches!(self, Self::Immediate)
    }

    /// Whether the action keeps running after its first execution.
    #[inline]
    #[must_use]
    pub const fn repeats(self) -> bool {
        matches!(self, Self::DeferredRepeating { .. })
    }

    /// Steps from scheduling to the first execution.
    #[must_use]
    pub const fn first_delay(self) -> Steps {
        match self {
            Self::Immediate => Steps::ZERO,
            Self::DeferredOnce { delay } => delay,
            Self::DeferredRepeating { interval } => interval,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate => f.write_str("immediate"),
            Self::DeferredOnce { delay } => write!(f, "once(+{})", delay.count()),
            Self::DeferredRepeating { interval } => write!(f, "repeating(/{})", interval.count()),
        }
    }
}

/// Parses `immediate`, `once`, or `repeating`, with a one-step delay or
/// interval for the deferred kinds.
impl FromStr for Trigger {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "immediate" => Ok(Self::Immediate),
            "once" => Ok(Self::ONCE),
            "repeating" => Ok(Self::EVERY_STEP),
            _ => Err(ConfigError::UnknownTrigger(s.to_string())),
        }
    }
}

/// Who makes a deferred action run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Drive {
    /// Handed to the scheduler (dispatch queue, run loop, animator). The
    /// scheduler holds the action until it stops.
    Queued,
    /// Only an explicit `execute` runs it: a button tap, or an animator that
    /// is never started.
    Manual,
}

impl Drive {
    /// Whether the scheduler holds and fires the action.
    #[inline]
    #[must_use]
    pub const fn is_queued(self) -> bool {
        matches!(self, Self::Queued)
    }

    /// Returns `"queued"` or `"manual"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Manual => "manual",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_names_parse_back() {
        for kind in CaptureKind::ALL {
            assert_eq!(kind.as_str().parse::<CaptureKind>(), Ok(kind));
        }
    }

    #[test]
    fn unknown_capture_is_config_error() {
        assert_eq!(
            "unowned".parse::<CaptureKind>(),
            Err(ConfigError::UnknownCapture("unowned".into()))
        );
    }

    #[test]
    fn only_strong_direct_is_strong() {
        let strong: alloc::vec::Vec<_> = CaptureKind::ALL
            .into_iter()
            .filter(|k| k.is_strong())
            .collect();
        assert_eq!(strong, [CaptureKind::StrongDirect]);
        assert!(CaptureKind::Weak.is_weak());
        assert!(!CaptureKind::FieldOnly.is_weak());
    }

    #[test]
    fn trigger_parse_and_classify() {
        assert_eq!("immediate".parse::<Trigger>(), Ok(Trigger::Immediate));
        assert_eq!("once".parse::<Trigger>(), Ok(Trigger::ONCE));
        assert_eq!("repeating".parse::<Trigger>(), Ok(Trigger::EVERY_STEP));
        assert!(matches!(
            "sometimes".parse::<Trigger>(),
            Err(ConfigError::UnknownTrigger(_))
        ));

        assert!(!Trigger::Immediate.is_escaping());
        assert!(Trigger::ONCE.is_escaping());
        assert!(!Trigger::ONCE.repeats());
        assert!(Trigger::EVERY_STEP.repeats());
    }

    #[test]
    fn first_delay_follows_trigger() {
        assert_eq!(Trigger::Immediate.first_delay(), Steps::ZERO);
        assert_eq!(
            Trigger::DeferredOnce { delay: Steps(5) }.first_delay(),
            Steps(5)
        );
        assert_eq!(
            Trigger::DeferredRepeating { interval: Steps(2) }.first_delay(),
            Steps(2)
        );
    }
}
