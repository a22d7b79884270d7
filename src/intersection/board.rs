//! Occupancy board: the collision detector.
//!
//! The board records which lane is sitting in each quadrant. Under ordered
//! acquisition it is pure bookkeeping: a lane only touches `board[r]` while
//! holding the lock on `r`, so [`OccupancyBoard::check`] can never fire.
//! It exists to make protocol violations visible when a fault-injection
//! discipline bypasses the locks.
//!
//! Slots are atomics rather than plain cells so that a bypassing lane reads
//! a stale or foreign occupant instead of causing undefined behaviour.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use super::{LaneId, ResourceId};

const EMPTY: usize = 0;

/// Two lanes found in the same quadrant at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collision {
    /// The quadrant both lanes claimed.
    pub resource: ResourceId,
    /// The lane already recorded on the board.
    pub occupant: LaneId,
    /// The lane that found it there.
    pub intruder: LaneId,
}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} crashed into {} in quadrant {}",
            self.intruder, self.occupant, self.resource
        )
    }
}

/// Per-quadrant record of the current occupant.
///
/// # Panics
///
/// Every method panics if given a resource outside the board, the same way
/// slice indexing does. Topologies are validated against the resource count
/// before any lane runs.
pub struct OccupancyBoard {
    // `EMPTY`, or the occupant's lane index plus one.
    slots: Vec<AtomicUsize>,
}

impl OccupancyBoard {
    /// Create a board with every quadrant empty.
    pub fn new(resource_count: usize) -> Self {
        Self {
            slots: (0..resource_count).map(|_| AtomicUsize::new(EMPTY)).collect(),
        }
    }

    /// Number of quadrants tracked.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the board tracks no quadrants.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The lane currently recorded in `resource`, if any.
    pub fn occupant(&self, resource: ResourceId) -> Option<LaneId> {
        decode(self.slots[resource.index()].load(Ordering::Acquire))
    }

    /// Record `holder` as the occupant of `resource`.
    pub fn mark(&self, resource: ResourceId, holder: LaneId) {
        self.slots[resource.index()].store(holder.0 + 1, Ordering::Release);
    }

    /// Reset `resource` to empty.
    pub fn clear(&self, resource: ResourceId) {
        self.slots[resource.index()].store(EMPTY, Ordering::Release);
    }

    /// Report a collision if `resource` is occupied by someone other than
    /// `holder`. An empty slot, or one already holding `holder`, is fine.
    pub fn check(&self, resource: ResourceId, holder: LaneId) -> Option<Collision> {
        match self.occupant(resource) {
            Some(occupant) if occupant != holder => Some(Collision {
                resource,
                occupant,
                intruder: holder,
            }),
            _ => None,
        }
    }

    /// Snapshot of every slot, in resource order.
    pub fn snapshot(&self) -> Vec<Option<LaneId>> {
        self.slots
            .iter()
            .map(|slot| decode(slot.load(Ordering::Acquire)))
            .collect()
    }
}

fn decode(raw: usize) -> Option<LaneId> {
    match raw {
        EMPTY => None,
        n => Some(LaneId(n - 1)),
    }
}

impl fmt::Debug for OccupancyBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OccupancyBoard")
            .field("slots", &self.snapshot())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
