//! In-memory event recorder.
//!
//! Records every event with a global sequence number and a wall-clock
//! timestamp. Because the recorder serializes appends behind one lock, the
//! recorded order is a valid linearization of what the lanes did, which is
//! what the verification helpers below rely on.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::event_bus::EventListener;
use super::simulation_events::SimulationEvent;
use crate::intersection::{LaneId, ResourceId};

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Position in the recording, starting at 0.
    pub sequence: u64,
    /// When the event was recorded.
    pub recorded_at: DateTime<Utc>,
    pub event: SimulationEvent,
}

/// Listener that keeps every event in memory.
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Mutex<Vec<RecordedEvent>>,
}

impl EventRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything recorded so far.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Number of recorded events of the given kind.
    pub fn count_kind(&self, kind: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|r| r.event.kind() == kind)
            .count()
    }

    /// Drop everything recorded so far.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Every collision in the recording.
    pub fn collisions(&self) -> Vec<SimulationEvent> {
        self.events
            .lock()
            .iter()
            .filter(|r| matches!(r.event, SimulationEvent::Collision(_)))
            .map(|r| r.event.clone())
            .collect()
    }

    /// Check the recording for lock-order violations.
    ///
    /// Within each cycle a lane must request its locks in ascending order
    /// and release them in descending order. Returns a description of every
    /// violation found.
    pub fn lock_order_violations(&self) -> Vec<String> {
        let mut requested: HashMap<LaneId, Vec<ResourceId>> = HashMap::new();
        let mut released: HashMap<LaneId, Vec<ResourceId>> = HashMap::new();
        let mut violations = Vec::new();

        for record in self.events.lock().iter() {
            match record.event {
                SimulationEvent::Requesting { lane, .. } => {
                    requested.remove(&lane);
                    released.remove(&lane);
                }
                SimulationEvent::LockRequested { lane, resource } => {
                    let held = requested.entry(lane).or_default();
                    if let Some(prev) = held.last() {
                        if *prev >= resource {
                            violations.push(format!(
                                "#{}: {lane} requested {resource} after {prev}",
                                record.sequence
                            ));
                        }
                    }
                    held.push(resource);
                }
                SimulationEvent::LockReleased { lane, resource } => {
                    let gone = released.entry(lane).or_default();
                    if let Some(prev) = gone.last() {
                        if *prev <= resource {
                            violations.push(format!(
                                "#{}: {lane} released {resource} after {prev}",
                                record.sequence
                            ));
                        }
                    }
                    gone.push(resource);
                }
                _ => {}
            }
        }
        violations
    }

    /// Check the recording for two lanes inside the same quadrant at once.
    ///
    /// A lane occupies its quadrants from its `Entered` event to its
    /// `Exited` event. Returns a description of every overlap found.
    pub fn exclusion_violations(&self) -> Vec<String> {
        let mut inside: HashMap<ResourceId, LaneId> = HashMap::new();
        let mut violations = Vec::new();

        for record in self.events.lock().iter() {
            match record.event {
                SimulationEvent::Entered {
                    lane,
                    resources: (a, b),
                } => {
                    for resource in [a, b] {
                        if let Some(other) = inside.insert(resource, lane) {
                            violations.push(format!(
                                "#{}: {lane} entered {resource} while {other} was inside",
                                record.sequence
                            ));
                        }
                    }
                }
                SimulationEvent::Exited {
                    lane,
                    resources: (a, b),
                } => {
                    for resource in [a, b] {
                        if inside.get(&resource) == Some(&lane) {
                            inside.remove(&resource);
                        }
                    }
                }
                _ => {}
            }
        }
        violations
    }
}

impl EventListener for EventRecorder {
    fn on_event(&self, event: &SimulationEvent) {
        let mut events = self.events.lock();
        let sequence = events.len() as u64;
        events.push(RecordedEvent {
            sequence,
            recorded_at: Utc::now(),
            event: event.clone(),
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
