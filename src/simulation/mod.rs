//! Simulation controller.
//!
//! Builds the shared [`Intersection`], spawns one named OS thread per lane,
//! lets them run for the configured window, raises the stop signal and then
//! waits, with a bound, for every lane to come home.
//!
//! # Shutdown
//!
//! Each lane thread carries an exit notice that reports on a channel when
//! the thread finishes, whether by returning or by panicking. The controller
//! waits on that channel with `join_timeout`, so a wedged lane surfaces as
//! [`SimulationError::JoinTimeout`] instead of hanging the process. Wedged
//! threads keep their `Arc<Intersection>`, so the locks they wait on are
//! never torn down underneath them.

pub mod report;

use std::any::Any;
use std::collections::BTreeSet;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

pub use report::SimulationReport;

use crate::config::SimulationConfig;
use crate::errors::{Result, SimulationError};
use crate::events::{EventBus, EventListener, SimulationEvent};
use crate::intersection::{Intersection, LaneDescriptor, LaneId, Topology};
use crate::lane::{LaneActor, LaneReport};

// ---------------------------------------------------------------------------
// StopHandle
// ---------------------------------------------------------------------------

/// Clonable handle that raises a simulation's stop signal.
///
/// The controller uses it when the window closes; the binary hands a clone
/// to its Ctrl-C handler. Only the first `stop` call has any effect.
#[derive(Debug, Clone)]
pub struct StopHandle {
    intersection: Arc<Intersection>,
    events: Arc<EventBus>,
}

impl StopHandle {
    /// Raise the stop signal. Returns `true` if this call raised it.
    pub fn stop(&self) -> bool {
        let raised = self.intersection.stop_signal().raise();
        if raised {
            self.events.emit(SimulationEvent::StopRaised);
        }
        raised
    }
}

/// Reports a lane's exit when dropped, including during a panic unwind.
struct ExitNotice {
    lane: LaneId,
    exits: Sender<LaneId>,
}

impl Drop for ExitNotice {
    fn drop(&mut self) {
        let _ = self.exits.send(self.lane);
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// One run of the intersection.
///
/// The stop signal only ever goes one way, so a `Simulation` is meant to be
/// run once. Running it again lets each lane do a single cycle and return.
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    topology: Topology,
    intersection: Arc<Intersection>,
    events: Arc<EventBus>,
    run_id: Uuid,
}

impl Simulation {
    /// Validate `config` and build the shared state. Nothing is spawned yet.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let topology = config.topology()?;
        let intersection = Arc::new(Intersection::new(topology.resource_count()));

        Ok(Self {
            config,
            topology,
            intersection,
            events: Arc::new(EventBus::new()),
            run_id: Uuid::new_v4(),
        })
    }

    /// Register a listener for every event of the run.
    pub fn subscribe(&self, listener: Arc<dyn EventListener>) {
        self.events.subscribe(listener);
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// The shared state lanes will drive through.
    pub fn intersection(&self) -> &Arc<Intersection> {
        &self.intersection
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// A handle that can end the run early from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            intersection: Arc::clone(&self.intersection),
            events: Arc::clone(&self.events),
        }
    }

    /// Run every lane for the configured duration, then stop and join them.
    pub fn run(&self) -> Result<SimulationReport> {
        let span = tracing::info_span!("simulation", run_id = %self.run_id);
        let _enter = span.enter();

        let started_at = Utc::now();
        let clock = Instant::now();
        let stop = self.stop_handle();

        tracing::info!(
            lanes = self.topology.len(),
            duration_ms = self.config.duration_ms,
            discipline = %self.config.discipline,
            "starting simulation"
        );
        if !self.config.discipline.is_safe() {
            tracing::warn!(
                discipline = %self.config.discipline,
                "fault injection: lanes are not using ordered acquisition"
            );
        }

        let (exit_tx, exit_rx) = mpsc::channel();
        let mut lanes: Vec<(LaneId, JoinHandle<Result<LaneReport>>)> =
            Vec::with_capacity(self.topology.len());
        for descriptor in self.topology.lanes() {
            match self.spawn_lane(*descriptor, exit_tx.clone()) {
                Ok(handle) => lanes.push((descriptor.id, handle)),
                Err(err) => {
                    tracing::error!(lane = %descriptor.id, error = %err, "aborting run");
                    stop.stop();
                    let spawned = lanes.iter().map(|(id, _)| *id).collect();
                    let stuck = self.await_exits(&exit_rx, spawned);
                    if !stuck.is_empty() {
                        tracing::warn!(?stuck, "lanes still running after aborted start");
                    }
                    return Err(err);
                }
            }
        }
        drop(exit_tx);

        let stopped_early = self
            .intersection
            .stop_signal()
            .wait_timeout(self.config.duration());
        stop.stop();

        let stuck = self.await_exits(&exit_rx, lanes.iter().map(|(id, _)| *id).collect());
        if !stuck.is_empty() {
            tracing::error!(?stuck, "lanes failed to terminate; abandoning their threads");
            return Err(SimulationError::JoinTimeout {
                stuck,
                timeout_ms: self.config.join_timeout_ms,
            });
        }

        let mut reports = Vec::with_capacity(lanes.len());
        for (lane, handle) in lanes {
            match handle.join() {
                Ok(result) => reports.push(result?),
                Err(payload) => {
                    return Err(SimulationError::LanePanicked {
                        lane,
                        message: panic_message(payload.as_ref()),
                    });
                }
            }
        }

        let report = SimulationReport {
            run_id: self.run_id,
            started_at,
            elapsed_ms: clock.elapsed().as_millis() as u64,
            discipline: self.config.discipline,
            stopped_early,
            lanes: reports,
        };
        tracing::info!(
            crossings = report.total_crossings(),
            collisions = report.total_collisions(),
            elapsed_ms = report.elapsed_ms,
            "simulation finished"
        );
        Ok(report)
    }

    fn spawn_lane(
        &self,
        descriptor: LaneDescriptor,
        exits: Sender<LaneId>,
    ) -> Result<JoinHandle<Result<LaneReport>>> {
        let lane = descriptor.id;
        let actor = LaneActor::new(
            descriptor,
            Arc::clone(&self.intersection),
            Arc::clone(&self.events),
            self.config.lane_timing(),
        )
        .with_discipline(self.config.discipline);
        let span = tracing::Span::current();

        thread::Builder::new()
            .name(format!("lane-{}", lane.0))
            .spawn(move || {
                let _exit = ExitNotice { lane, exits };
                span.in_scope(|| actor.run())
            })
            .map_err(|source| SimulationError::Spawn { lane, source })
    }

    /// Wait up to `join_timeout` for every lane in `lanes` to report its
    /// exit. Returns the lanes that did not, in lane order.
    fn await_exits(&self, exits: &Receiver<LaneId>, lanes: Vec<LaneId>) -> Vec<LaneId> {
        let deadline = Instant::now() + self.config.join_timeout();
        let mut pending: BTreeSet<LaneId> = lanes.into_iter().collect();

        while !pending.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match exits.recv_timeout(remaining) {
                Ok(lane) => {
                    pending.remove(&lane);
                }
                Err(_) => break,
            }
        }
        pending.into_iter().collect()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::{HashMap, HashSet};
    use std::sync::Barrier;
    use std::time::Duration;

    use parking_lot::Mutex;

    use crate::errors::ConfigError;
    use crate::events::EventRecorder;
    use crate::intersection::ResourceId;
    use crate::lane::LockDiscipline;

    fn short_run() -> SimulationConfig {
        SimulationConfig {
            duration_ms: 200,
            max_idle_us: 200,
            crossing_us: 100,
            join_timeout_ms: 2000,
            ..Default::default()
        }
    }

    fn recorded(config: SimulationConfig) -> (Simulation, Arc<EventRecorder>) {
        let simulation = Simulation::new(config).unwrap();
        let recorder = Arc::new(EventRecorder::new());
        simulation.subscribe(recorder.clone());
        (simulation, recorder)
    }

    #[test]
    fn test_ordered_run_terminates_cleanly() {
        let (simulation, recorder) = recorded(short_run());
        let report = simulation.run().unwrap();

        assert_eq!(report.lanes.len(), 4);
        assert_eq!(report.run_id, simulation.run_id());
        assert!(!report.stopped_early);
        // The stop check sits after the cycle, so every lane crosses once.
        assert!(report.lanes.iter().all(|l| l.crossings >= 1));
        assert!(report.is_clean());
        assert!(report.elapsed_ms < 200 + 2000);

        assert!(recorder.collisions().is_empty());
        assert_eq!(recorder.lock_order_violations(), Vec::<String>::new());
        assert_eq!(recorder.exclusion_violations(), Vec::<String>::new());
        assert_eq!(recorder.count_kind("terminated"), 4);
    }

    #[test]
    fn test_stop_raised_once_and_lanes_finish_in_flight_cycle_only() {
        let (simulation, recorder) = recorded(short_run());
        simulation.run().unwrap();

        let events = recorder.events();
        let stops: Vec<_> = events
            .iter()
            .filter(|r| r.event == SimulationEvent::StopRaised)
            .collect();
        assert_eq!(stops.len(), 1);
        let stop_at = stops[0].sequence;

        let mut late_requests: HashMap<LaneId, usize> = HashMap::new();
        for record in events.iter().filter(|r| r.sequence > stop_at) {
            if let SimulationEvent::Requesting { lane, .. } = record.event {
                *late_requests.entry(lane).or_default() += 1;
            }
        }
        for (lane, count) in late_requests {
            assert!(count <= 1, "{lane} started {count} cycles after stop");
        }

        // Nothing follows a lane's own termination.
        for lane in simulation.topology().lanes() {
            let last = events
                .iter()
                .filter(|r| r.event.lane() == Some(lane.id))
                .last()
                .unwrap();
            assert_eq!(last.event.kind(), "terminated");
        }
    }

    #[test]
    fn test_stop_handle_ends_run_early() {
        let config = SimulationConfig {
            duration_ms: 60_000,
            ..short_run()
        };
        let simulation = Simulation::new(config).unwrap();
        let handle = simulation.stop_handle();

        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            handle.stop()
        });

        let report = simulation.run().unwrap();
        assert!(stopper.join().unwrap());
        assert!(report.stopped_early);
        assert!(report.elapsed_ms < 10_000);
        assert!(!simulation.stop_handle().stop());
    }

    #[test]
    fn test_unlocked_lanes_collide() {
        let config = SimulationConfig {
            duration_ms: 300,
            max_idle_us: 0,
            crossing_us: 2000,
            discipline: LockDiscipline::Unlocked,
            ..short_run()
        };
        let (simulation, recorder) = recorded(config);
        let report = simulation.run().unwrap();

        assert!(report.total_collisions() > 0);
        assert!(!recorder.exclusion_violations().is_empty());
        assert!(matches!(
            report.ensure_clean(),
            Err(SimulationError::CollisionsDetected { .. })
        ));
    }

    #[test]
    fn test_blocked_lanes_reported_as_join_timeout() {
        let config = SimulationConfig {
            duration_ms: 50,
            join_timeout_ms: 200,
            ..short_run()
        };
        let simulation = Simulation::new(config).unwrap();
        // Quadrant 0 is first in lock order for lanes 0 and 3.
        let blocker = simulation
            .intersection()
            .resources()
            .acquire(ResourceId(0))
            .unwrap();

        let err = simulation.run().unwrap_err();
        match err {
            SimulationError::JoinTimeout { stuck, timeout_ms } => {
                assert_eq!(stuck, vec![LaneId(0), LaneId(3)]);
                assert_eq!(timeout_ms, 200);
            }
            other => panic!("expected join timeout, got {other}"),
        }
        drop(blocker);
    }

    /// Holds every lane at its first acquired lock until all lanes have one.
    struct FirstLockGate {
        barrier: Barrier,
        passed: Mutex<HashSet<LaneId>>,
    }

    impl EventListener for FirstLockGate {
        fn on_event(&self, event: &SimulationEvent) {
            if let SimulationEvent::LockAcquired { lane, .. } = event {
                if self.passed.lock().insert(*lane) {
                    self.barrier.wait();
                }
            }
        }
    }

    #[test]
    fn test_as_requested_discipline_deadlocks_the_cycle() {
        let config = SimulationConfig {
            duration_ms: 50,
            join_timeout_ms: 200,
            discipline: LockDiscipline::AsRequested,
            ..short_run()
        };
        let (simulation, recorder) = recorded(config);
        // Lanes ask for 0, 1, 2 and 3 first; once each holds its first
        // quadrant, every second request is held by a neighbour.
        simulation.subscribe(Arc::new(FirstLockGate {
            barrier: Barrier::new(4),
            passed: Mutex::new(HashSet::new()),
        }));

        let err = simulation.run().unwrap_err();
        match err {
            SimulationError::JoinTimeout { stuck, .. } => {
                assert_eq!(stuck, vec![LaneId(0), LaneId(1), LaneId(2), LaneId(3)]);
            }
            other => panic!("expected join timeout, got {other}"),
        }
        assert_eq!(recorder.count_kind("lock_acquired"), 4);
        assert_eq!(recorder.count_kind("lock_requested"), 8);
        assert_eq!(recorder.count_kind("terminated"), 0);
    }

    #[test]
    fn test_shared_pair_topology_is_clean() {
        // Two lanes asking for the same pair in opposite orders.
        let config = SimulationConfig {
            resource_count: 2,
            lanes: Some(vec![[0, 1], [1, 0]]),
            ..short_run()
        };
        let (simulation, recorder) = recorded(config);
        let report = simulation.run().unwrap();

        assert_eq!(report.lanes.len(), 2);
        assert!(report.is_clean());
        assert!(recorder.lock_order_violations().is_empty());
        assert!(recorder.exclusion_violations().is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SimulationConfig {
            lanes: Some(vec![[0, 9]]),
            ..Default::default()
        };
        let err = Simulation::new(config).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::Config(ConfigError::InvalidTopology(_))
        ));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
