//! Error types for the intersection simulation.
//!
//! Collisions are deliberately absent from the fatal paths: a lane that
//! detects one logs it and keeps driving. Only strict runs turn the final
//! collision count into [`SimulationError::CollisionsDetected`].

use std::path::PathBuf;

use thiserror::Error;

use crate::intersection::{LaneId, ResourceId};

/// Errors raised while loading or validating a [`SimulationConfig`](crate::config::SimulationConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be parsed.
    #[error("failed to parse config file {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    /// The file extension does not name a known format.
    #[error("unsupported config format: {} (expected .yaml, .yml or .json)", .0.display())]
    UnsupportedFormat(PathBuf),

    /// A field holds a value the simulation cannot run with.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// The lane adjacency table is malformed.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),
}

/// Errors raised by the simulation controller and the shared resources.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Configuration was rejected before anything was spawned.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A resource index outside the intersection was requested.
    #[error("unknown resource {resource} (intersection has {count} resources)")]
    UnknownResource { resource: ResourceId, count: usize },

    /// The OS refused to start a lane thread.
    #[error("failed to spawn {lane}: {source}")]
    Spawn {
        lane: LaneId,
        #[source]
        source: std::io::Error,
    },

    /// Lanes failed to terminate within the join timeout after stop.
    #[error("lanes did not terminate within {timeout_ms}ms of stop: {}", format_lanes(.stuck))]
    JoinTimeout { stuck: Vec<LaneId>, timeout_ms: u64 },

    /// A lane thread panicked.
    #[error("{lane} panicked: {message}")]
    LanePanicked { lane: LaneId, message: String },

    /// Strict mode: the occupancy board reported collisions.
    #[error("{count} collision(s) detected during the run")]
    CollisionsDetected { count: u64 },
}

fn format_lanes(lanes: &[LaneId]) -> String {
    lanes
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience result alias for simulation operations.
pub type Result<T, E = SimulationError> = std::result::Result<T, E>;
