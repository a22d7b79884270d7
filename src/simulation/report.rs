//! Run report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Result, SimulationError};
use crate::lane::{LaneReport, LockDiscipline};

/// Outcome of a completed [`Simulation::run`](super::Simulation::run).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Wall-clock time from spawning the first lane to joining the last.
    pub elapsed_ms: u64,
    pub discipline: LockDiscipline,
    /// Whether the stop signal was raised before the configured duration ran out.
    pub stopped_early: bool,
    /// One entry per lane, in lane order.
    pub lanes: Vec<LaneReport>,
}

impl SimulationReport {
    /// Crossings completed across all lanes.
    pub fn total_crossings(&self) -> u64 {
        self.lanes.iter().map(|l| l.crossings).sum()
    }

    /// Collisions detected across all lanes.
    pub fn total_collisions(&self) -> u64 {
        self.lanes.iter().map(|l| l.collisions).sum()
    }

    /// No lane ever found a foreign occupant on the board.
    pub fn is_clean(&self) -> bool {
        self.total_collisions() == 0
    }

    /// Turn detected collisions into an error. Used by strict runs.
    pub fn ensure_clean(&self) -> Result<()> {
        match self.total_collisions() {
            0 => Ok(()),
            count => Err(SimulationError::CollisionsDetected { count }),
        }
    }
}
