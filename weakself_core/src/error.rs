// Copyright 2026 the Weakself Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Configuration errors.
//!
//! The simulation is a closed domain: releasing, cancelling, or executing
//! something twice is a defined no-op. The only failures are malformed
//! scenario configurations, reported when an action is declared or a name is
//! parsed.

use alloc::string::String;
use core::fmt;

/// An invalid scenario configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// No scenario has this name.
    UnknownScenario(String),
    /// No trigger kind has this name.
    UnknownTrigger(String),
    /// No capture kind has this name.
    UnknownCapture(String),
    /// An immediate (non-escaping) action was declared as retained by a
    /// field or handed to the scheduler.
    NonEscapingStored {
        /// Label of the offending action.
        label: &'static str,
    },
    /// A repeating action was declared with a zero interval.
    ZeroInterval {
        /// Label of the offending action.
        label: &'static str,
    },
    /// A recipe executes an action it never scheduled.
    UnknownAction {
        /// The label that matched nothing.
        label: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownScenario(name) => {
                write!(f, "invalid scenario configuration: unknown scenario `{name}`")
            }
            Self::UnknownTrigger(name) => {
                write!(f, "invalid scenario configuration: unknown trigger `{name}`")
            }
            Self::UnknownCapture(name) => {
                write!(f, "invalid scenario configuration: unknown capture kind `{name}`")
            }
            Self::NonEscapingStored { label } => write!(
                f,
                "invalid scenario configuration: immediate action `{label}` cannot be stored or queued"
            ),
            Self::ZeroInterval { label } => write!(
                f,
                "invalid scenario configuration: repeating action `{label}` has a zero interval"
            ),
            Self::UnknownAction { label } => write!(
                f,
                "invalid scenario configuration: no action labelled `{label}` was scheduled"
            ),
        }
    }
}

impl core::error::Error for ConfigError {}
