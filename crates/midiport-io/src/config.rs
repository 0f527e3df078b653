//! Port configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Input,
    Output,
    Both,
}

impl Direction {
    #[inline]
    pub fn is_input(self) -> bool {
        matches!(self, Self::Input | Self::Both)
    }

    #[inline]
    pub fn is_output(self) -> bool {
        matches!(self, Self::Output | Self::Both)
    }

    pub fn from_capabilities(is_input: bool, is_output: bool) -> Option<Self> {
        match (is_input, is_output) {
            (true, true) => Some(Self::Both),
            (true, false) => Some(Self::Input),
            (false, true) => Some(Self::Output),
            (false, false) => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Both => "input/output",
        })
    }
}

/// What the inbound queue does when messages arrive faster than they are polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverflowPolicy {
    /// Grow without limit. Nothing is ever dropped.
    #[default]
    Unbounded,
    /// Hold at most this many messages, evicting the oldest on overflow.
    /// Every eviction is reported to the port's diagnostics hook.
    DropOldest(NonZeroUsize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortConfig {
    pub direction: Direction,
    pub overflow: OverflowPolicy,
    /// Send "All Notes Off" and "Reset All Controllers" on every channel before closing.
    pub autoreset: bool,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            direction: Direction::Both,
            overflow: OverflowPolicy::Unbounded,
            autoreset: false,
        }
    }
}
