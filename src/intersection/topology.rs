//! Lane topology: which quadrants each lane needs.
//!
//! ```text
//!      |   |   |
//!      |       |
//!      | 0 |   |
//! -----+       +-----
//!        0   3   3
//! - - -         - - -
//!    1   1   2
//! -----+       +-----
//!      |   | 2 |
//!      |       |
//!      |   |   |
//! ```
//!
//! Lanes 0-3 enter from the four sides; quadrants 0-3 are the four squares
//! of the box. Lane `i` needs quadrants `i` and `(i + 1) % 4`, so each
//! lane shares exactly one quadrant with each neighbour and the four lanes
//! form a cycle.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{LaneId, ResourceId};
use crate::errors::ConfigError;

/// One lane and the two quadrants it needs, in the order it asks for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneDescriptor {
    pub id: LaneId,
    /// The requested pair, e.g. `(3, 0)` for the lane closing the cycle.
    pub resources: (ResourceId, ResourceId),
}

impl LaneDescriptor {
    /// Create a descriptor.
    pub fn new(id: LaneId, first: ResourceId, second: ResourceId) -> Self {
        Self {
            id,
            resources: (first, second),
        }
    }

    /// The pair in global lock order: lower index first.
    pub fn ordered(&self) -> (ResourceId, ResourceId) {
        let (a, b) = self.resources;
        if a <= b { (a, b) } else { (b, a) }
    }
}

/// The adjacency table: lane → required quadrant pair.
///
/// Only constructible through validating constructors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topology {
    resource_count: usize,
    lanes: Vec<LaneDescriptor>,
}

impl Topology {
    /// The four-way intersection: four lanes, four quadrants.
    pub fn four_way() -> Self {
        Self::cyclic(4)
    }

    /// `n` lanes around `n` quadrants, lane `i` claiming `{i, (i + 1) % n}`.
    ///
    /// # Panics
    ///
    /// Panics if `n < 2`; a single quadrant cannot form a pair.
    pub fn cyclic(n: usize) -> Self {
        assert!(n >= 2, "a cyclic topology needs at least two quadrants");
        let lanes = (0..n)
            .map(|i| LaneDescriptor::new(LaneId(i), ResourceId(i), ResourceId((i + 1) % n)))
            .collect();
        Self {
            resource_count: n,
            lanes,
        }
    }

    /// Build a topology from explicit pairs. Lane `i` gets `pairs[i]`.
    pub fn from_pairs(resource_count: usize, pairs: &[[usize; 2]]) -> Result<Self, ConfigError> {
        let lanes = pairs
            .iter()
            .enumerate()
            .map(|(i, [a, b])| LaneDescriptor::new(LaneId(i), ResourceId(*a), ResourceId(*b)))
            .collect();
        Self::new(resource_count, lanes)
    }

    /// Build a topology from descriptors, validating it first.
    pub fn new(resource_count: usize, lanes: Vec<LaneDescriptor>) -> Result<Self, ConfigError> {
        let topology = Self {
            resource_count,
            lanes,
        };
        topology.validate()?;
        Ok(topology)
    }

    /// Check every lane names two distinct, in-range quadrants and every
    /// lane id is unique.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lanes.is_empty() {
            return Err(ConfigError::InvalidTopology("no lanes".into()));
        }

        let mut seen = HashSet::new();
        for lane in &self.lanes {
            if !seen.insert(lane.id) {
                return Err(ConfigError::InvalidTopology(format!(
                    "{} is listed twice",
                    lane.id
                )));
            }

            let (a, b) = lane.resources;
            if a == b {
                return Err(ConfigError::InvalidTopology(format!(
                    "{} needs two distinct quadrants, got {a} twice",
                    lane.id
                )));
            }
            for r in [a, b] {
                if r.index() >= self.resource_count {
                    return Err(ConfigError::InvalidTopology(format!(
                        "{} needs quadrant {r}, but there are only {}",
                        lane.id, self.resource_count
                    )));
                }
            }
        }
        Ok(())
    }

    /// Number of quadrants.
    pub fn resource_count(&self) -> usize {
        self.resource_count
    }

    /// All lane descriptors, in lane order.
    pub fn lanes(&self) -> &[LaneDescriptor] {
        &self.lanes
    }

    /// Number of lanes.
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    /// Whether there are no lanes.
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::four_way()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
