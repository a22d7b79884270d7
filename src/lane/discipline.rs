//! Lock disciplines: how a lane turns its quadrant pair into lock calls.
//!
//! [`LockDiscipline::Ordered`] is the protocol. The other two exist so the
//! protocol can be shown to be load-bearing: `AsRequested` lets the lane
//! closing the cycle lock `3` before `0`, which makes circular wait possible;
//! `Unlocked` skips locking altogether, which makes collisions visible on the
//! occupancy board.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::intersection::{LaneDescriptor, ResourceId};

/// The acquisition policy a lane follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockDiscipline {
    /// Lower-indexed quadrant first. Deadlock-free.
    #[default]
    Ordered,
    /// Whatever order the lane descriptor lists. Can deadlock.
    AsRequested,
    /// No locks at all. Can collide.
    Unlocked,
}

impl LockDiscipline {
    /// The order in which `lane` visits its quadrants under this discipline.
    ///
    /// For `Unlocked` the order only affects board checks; no lock is taken.
    pub fn acquisition_order(self, lane: &LaneDescriptor) -> [ResourceId; 2] {
        let (first, second) = match self {
            Self::Ordered => lane.ordered(),
            Self::AsRequested | Self::Unlocked => lane.resources,
        };
        [first, second]
    }

    /// Whether lanes take quadrant locks under this discipline.
    pub fn takes_locks(self) -> bool {
        !matches!(self, Self::Unlocked)
    }

    /// Whether this discipline is guaranteed deadlock- and collision-free.
    pub fn is_safe(self) -> bool {
        matches!(self, Self::Ordered)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Ordered => "ordered",
            Self::AsRequested => "as_requested",
            Self::Unlocked => "unlocked",
        }
    }
}

impl fmt::Display for LockDiscipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LockDiscipline {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "ordered" => Ok(Self::Ordered),
            "as_requested" => Ok(Self::AsRequested),
            "unlocked" => Ok(Self::Unlocked),
            other => Err(ConfigError::InvalidValue {
                field: "discipline",
                reason: format!("unknown lock discipline `{other}`"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
