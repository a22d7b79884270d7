//! Event bus for simulation diagnostics.
//!
//! Unlike a process-wide singleton, each [`Simulation`](crate::simulation::Simulation)
//! owns one bus and hands it to its lanes. Every emitted event is written to
//! `tracing` and then passed, synchronously and in emission order, to each
//! registered listener.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::simulation_events::SimulationEvent;

/// Receives every event a simulation emits.
///
/// Listeners are called on the emitting lane's thread, often while that
/// lane holds quadrant locks, so they must be quick and must never try to
/// take a quadrant themselves.
pub trait EventListener: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: &SimulationEvent);
}

/// Fan-out of simulation events to `tracing` and registered listeners.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
}

impl EventBus {
    /// Create a bus with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It sees every event emitted from now on.
    pub fn subscribe(&self, listener: Arc<dyn EventListener>) {
        self.listeners.write().push(listener);
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Log `event` and deliver it to every listener.
    pub fn emit(&self, event: SimulationEvent) {
        event.log();
        for listener in self.listeners.read().iter() {
            listener.on_event(&event);
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl EventListener for Counter {
        fn on_event(&self, _event: &SimulationEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_emit_reaches_every_listener() {
        let bus = EventBus::new();
        let first = Arc::new(Counter::default());
        let second = Arc::new(Counter::default());
        bus.subscribe(first.clone());
        bus.subscribe(second.clone());
        assert_eq!(bus.listener_count(), 2);

        bus.emit(SimulationEvent::StopRaised);
        bus.emit(SimulationEvent::StopRaised);

        assert_eq!(first.0.load(Ordering::SeqCst), 2);
        assert_eq!(second.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_emit_without_listeners() {
        let bus = EventBus::new();
        bus.emit(SimulationEvent::StopRaised);
        assert_eq!(bus.listener_count(), 0);
    }
}
