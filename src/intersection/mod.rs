//! Intersection: the shared state every lane actor drives through.
//!
//! The intersection bundles three things that used to be separate globals:
//!
//! - [`ResourceSet`]: one exclusive lock per quadrant.
//! - [`OccupancyBoard`]: who is currently sitting in each quadrant. Used only
//!   to detect collisions, never to decide anything.
//! - [`StopSignal`]: the single-writer flag that ends the run.
//!
//! The controller builds one [`Intersection`] and hands an `Arc` to every
//! lane at spawn time. Locks live as long as the last lane holding a handle,
//! so no lane can ever touch a torn-down resource.
//!
//! # Lock ordering
//!
//! Every lane acquires its two quadrants in ascending [`ResourceId`] order.
//! Since the lanes form a cycle (each shares one quadrant with each
//! neighbour), that global order is the only thing preventing circular wait.

pub mod board;
pub mod resources;
pub mod stop;
pub mod topology;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use board::{Collision, OccupancyBoard};
pub use resources::{ResourceGuard, ResourceSet};
pub use stop::StopSignal;
pub use topology::{LaneDescriptor, Topology};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identity of a lane (and of the car stream simulating it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaneId(pub usize);

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lane {}", self.0)
    }
}

/// Index of a quadrant. The numeric order is the global lock order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub usize);

impl ResourceId {
    /// The index into per-resource tables.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Intersection
// ---------------------------------------------------------------------------

/// Shared-state handle: resources, occupancy board and stop signal.
#[derive(Debug)]
pub struct Intersection {
    resources: ResourceSet,
    board: OccupancyBoard,
    stop: StopSignal,
}

impl Intersection {
    /// Create an intersection with `resource_count` quadrants, all free and
    /// unoccupied, and a stop signal in the running state.
    pub fn new(resource_count: usize) -> Self {
        Self {
            resources: ResourceSet::new(resource_count),
            board: OccupancyBoard::new(resource_count),
            stop: StopSignal::new(),
        }
    }

    /// The quadrant locks.
    pub fn resources(&self) -> &ResourceSet {
        &self.resources
    }

    /// The collision-detection overlay.
    pub fn board(&self) -> &OccupancyBoard {
        &self.board
    }

    /// The run-wide stop signal.
    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// Number of quadrants.
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
