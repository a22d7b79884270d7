//! # crossroads
//!
//! A four-way intersection shared by four lanes, each driven by its own
//! thread, used to demonstrate deadlock-free acquisition of shared resources
//! through a global lock order.
//!
//! Every lane needs two adjacent quadrants of the intersection, and the
//! lanes form a cycle: each shares one quadrant with each neighbour. Lanes
//! always lock the lower-numbered quadrant first, which rules out circular
//! wait. An occupancy board records who is in each quadrant so that any
//! violation of the protocol shows up as a collision.
//!
//! ```no_run
//! use crossroads::{Simulation, SimulationConfig};
//!
//! let simulation = Simulation::new(SimulationConfig::default())?;
//! let report = simulation.run()?;
//! assert!(report.is_clean());
//! # Ok::<(), crossroads::SimulationError>(())
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod events;
pub mod intersection;
pub mod lane;
pub mod simulation;
pub mod telemetry;

pub use config::SimulationConfig;
pub use errors::{ConfigError, SimulationError};
pub use events::{EventListener, EventRecorder, SimulationEvent};
pub use intersection::{Intersection, LaneId, ResourceId, Topology};
pub use lane::{LaneActor, LaneState, LockDiscipline};
pub use simulation::{Simulation, SimulationReport, StopHandle};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
