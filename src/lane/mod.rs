//! Lane actors: one car stream per lane.
//!
//! Each actor loops through a fixed cycle until the stop signal is raised:
//!
//! 1. `Sleeping`: idle for a random interval to desynchronize the lanes.
//! 2. `Requesting`: lock both quadrants, lower index first.
//! 3. `Acquired`: check the board for both quadrants, then mark both, hold
//!    for the crossing time, then clear both.
//! 4. `Releasing`: unlock in reverse order, higher index first.
//! 5. Loop boundary: if the stop signal is raised, become `Terminated`.
//!
//! The stop signal is only read at the loop boundary. A lane that is
//! mid-cycle when the controller stops always finishes its crossing first.

pub mod discipline;

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

pub use discipline::LockDiscipline;

use crate::errors::Result;
use crate::events::{EventBus, SimulationEvent};
use crate::intersection::{Intersection, LaneDescriptor, LaneId, ResourceGuard};

// ---------------------------------------------------------------------------
// State and timing
// ---------------------------------------------------------------------------

/// Where a lane is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneState {
    Sleeping,
    Requesting,
    /// Both quadrants held; the car is in the intersection.
    Acquired,
    Releasing,
    Terminated,
}

impl fmt::Display for LaneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sleeping => "sleeping",
            Self::Requesting => "requesting",
            Self::Acquired => "acquired",
            Self::Releasing => "releasing",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Per-cycle timing for a lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneTiming {
    /// Exclusive upper bound of the random idle interval. Zero disables idling.
    pub max_idle: Duration,
    /// How long a car stays in the intersection.
    pub crossing: Duration,
}

impl Default for LaneTiming {
    fn default() -> Self {
        Self {
            max_idle: Duration::from_micros(1000),
            crossing: Duration::from_micros(1000),
        }
    }
}

/// What one lane did over a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneReport {
    pub lane: LaneId,
    /// Completed cycles.
    pub crossings: u64,
    /// Collisions this lane detected on entry.
    pub collisions: u64,
}

impl LaneReport {
    fn new(lane: LaneId) -> Self {
        Self {
            lane,
            crossings: 0,
            collisions: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// LaneActor
// ---------------------------------------------------------------------------

/// A single lane's car stream.
pub struct LaneActor {
    descriptor: LaneDescriptor,
    intersection: Arc<Intersection>,
    events: Arc<EventBus>,
    timing: LaneTiming,
    discipline: LockDiscipline,
    state: LaneState,
    report: LaneReport,
}

impl LaneActor {
    /// Create an actor for `descriptor`, starting in `Sleeping`.
    pub fn new(
        descriptor: LaneDescriptor,
        intersection: Arc<Intersection>,
        events: Arc<EventBus>,
        timing: LaneTiming,
    ) -> Self {
        Self {
            report: LaneReport::new(descriptor.id),
            descriptor,
            intersection,
            events,
            timing,
            discipline: LockDiscipline::Ordered,
            state: LaneState::Sleeping,
        }
    }

    /// Override the lock discipline. Anything but `Ordered` is fault injection.
    pub fn with_discipline(mut self, discipline: LockDiscipline) -> Self {
        self.discipline = discipline;
        self
    }

    pub fn id(&self) -> LaneId {
        self.descriptor.id
    }

    pub fn descriptor(&self) -> &LaneDescriptor {
        &self.descriptor
    }

    /// Current cycle state.
    pub fn state(&self) -> LaneState {
        self.state
    }

    /// Statistics so far.
    pub fn report(&self) -> LaneReport {
        self.report
    }

    /// Cycle until the stop signal is seen at a loop boundary.
    pub fn run(mut self) -> Result<LaneReport> {
        loop {
            self.cycle()?;
            if self.intersection.stop_signal().is_raised() {
                self.state = LaneState::Terminated;
                self.events.emit(SimulationEvent::Terminated {
                    lane: self.id(),
                    crossings: self.report.crossings,
                });
                return Ok(self.report);
            }
        }
    }

    /// Run one full cycle: idle, acquire, cross, release.
    ///
    /// Leaves the lane in `Sleeping`, ready for the next cycle.
    pub fn cycle(&mut self) -> Result<()> {
        self.state = LaneState::Sleeping;
        self.idle();

        self.state = LaneState::Requesting;
        let lane = self.id();
        self.events.emit(SimulationEvent::Requesting {
            lane,
            resources: self.descriptor.resources,
        });

        let order = self.discipline.acquisition_order(&self.descriptor);
        let intersection = Arc::clone(&self.intersection);
        let mut held: Vec<ResourceGuard<'_>> = Vec::with_capacity(order.len());
        if self.discipline.takes_locks() {
            for resource in order {
                self.events
                    .emit(SimulationEvent::LockRequested { lane, resource });
                held.push(intersection.resources().acquire(resource)?);
                self.events
                    .emit(SimulationEvent::LockAcquired { lane, resource });
            }
        }

        self.state = LaneState::Acquired;
        self.cross(&intersection);

        self.state = LaneState::Releasing;
        while let Some(guard) = held.pop() {
            self.events.emit(SimulationEvent::LockReleased {
                lane,
                resource: guard.resource(),
            });
            intersection.resources().release(guard);
        }

        self.report.crossings += 1;
        self.state = LaneState::Sleeping;
        Ok(())
    }

    fn idle(&self) {
        let max = self.timing.max_idle.as_micros() as u64;
        if max > 0 {
            let micros = rand::rng().random_range(0..max);
            thread::sleep(Duration::from_micros(micros));
        }
    }

    /// Check both quadrants, then mark both, then hold, then clear both.
    fn cross(&mut self, intersection: &Intersection) {
        let lane = self.id();
        let (a, b) = self.descriptor.resources;
        let board = intersection.board();

        let collisions: Vec<_> = [a, b]
            .into_iter()
            .filter_map(|resource| board.check(resource, lane))
            .collect();
        for collision in collisions {
            self.report.collisions += 1;
            self.events.emit(SimulationEvent::Collision(collision));
        }

        board.mark(a, lane);
        board.mark(b, lane);
        self.events.emit(SimulationEvent::Entered {
            lane,
            resources: (a, b),
        });

        thread::sleep(self.timing.crossing);

        self.events.emit(SimulationEvent::Exited {
            lane,
            resources: (a, b),
        });
        board.clear(a);
        board.clear(b);
    }
}

impl fmt::Debug for LaneActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaneActor")
            .field("descriptor", &self.descriptor)
            .field("discipline", &self.discipline)
            .field("state", &self.state)
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
