//! Simulation events.
//!
//! Lanes and the controller describe what they do as [`SimulationEvent`]s.
//! The [`EventBus`] writes each one to `tracing` and hands it to any
//! registered [`EventListener`]. [`EventRecorder`] is the listener the
//! verification tests use to check lock order and mutual exclusion after a
//! run.

pub mod event_bus;
pub mod event_recorder;
pub mod simulation_events;

pub use event_bus::{EventBus, EventListener};
pub use event_recorder::{EventRecorder, RecordedEvent};
pub use simulation_events::SimulationEvent;
