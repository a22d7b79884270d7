//! Typed events emitted by lanes and the controller.

use serde::{Deserialize, Serialize};

use crate::intersection::{Collision, LaneId, ResourceId};

/// Everything a run can report, in the order lanes experience it.
///
/// A full crossing produces, for one lane:
/// `Requesting → LockRequested → LockAcquired → LockRequested → LockAcquired
/// → Entered → Exited → LockReleased → LockReleased`, with `Collision`
/// events between the last grant and `Entered` if the board disagrees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimulationEvent {
    /// A lane woke up and is asking for its quadrants.
    Requesting {
        lane: LaneId,
        resources: (ResourceId, ResourceId),
    },
    /// A lane is about to block on one quadrant lock.
    LockRequested { lane: LaneId, resource: ResourceId },
    /// A lane now holds one quadrant lock.
    LockAcquired { lane: LaneId, resource: ResourceId },
    /// A lane marked both quadrants and is crossing.
    Entered {
        lane: LaneId,
        resources: (ResourceId, ResourceId),
    },
    /// The board showed another lane in a quadrant this lane just claimed.
    Collision(Collision),
    /// A lane finished crossing and is about to clear the board.
    Exited {
        lane: LaneId,
        resources: (ResourceId, ResourceId),
    },
    /// A lane is giving one quadrant lock back.
    LockReleased { lane: LaneId, resource: ResourceId },
    /// A lane saw the stop signal at a loop boundary and quit.
    Terminated { lane: LaneId, crossings: u64 },
    /// The controller raised the stop signal.
    StopRaised,
}

impl SimulationEvent {
    /// The lane this event concerns. For collisions, the intruding lane.
    pub fn lane(&self) -> Option<LaneId> {
        match self {
            Self::Requesting { lane, .. }
            | Self::LockRequested { lane, .. }
            | Self::LockAcquired { lane, .. }
            | Self::Entered { lane, .. }
            | Self::Exited { lane, .. }
            | Self::LockReleased { lane, .. }
            | Self::Terminated { lane, .. } => Some(*lane),
            Self::Collision(collision) => Some(collision.intruder),
            Self::StopRaised => None,
        }
    }

    /// Short machine-readable name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Requesting { .. } => "requesting",
            Self::LockRequested { .. } => "lock_requested",
            Self::LockAcquired { .. } => "lock_acquired",
            Self::Entered { .. } => "entered",
            Self::Collision(_) => "collision",
            Self::Exited { .. } => "exited",
            Self::LockReleased { .. } => "lock_released",
            Self::Terminated { .. } => "terminated",
            Self::StopRaised => "stop_raised",
        }
    }

    /// Write this event to the tracing subscriber at its level.
    pub fn log(&self) {
        match self {
            Self::Requesting { lane, resources: (a, b) } => {
                tracing::info!(%lane, first = %a, second = %b, "{lane} entering intersection");
            }
            Self::LockRequested { lane, resource } => {
                tracing::trace!(%lane, %resource, "lock requested");
            }
            Self::LockAcquired { lane, resource } => {
                tracing::trace!(%lane, %resource, "lock acquired");
            }
            Self::Entered { lane, resources: (a, b) } => {
                tracing::info!(%lane, "{lane} in intersection ({a} and {b})");
            }
            Self::Collision(collision) => {
                tracing::error!(
                    occupant = %collision.occupant,
                    intruder = %collision.intruder,
                    resource = %collision.resource,
                    "collision: {collision}"
                );
            }
            Self::Exited { lane, resources: (a, b) } => {
                tracing::info!(%lane, "{lane} out of intersection ({a} and {b})");
            }
            Self::LockReleased { lane, resource } => {
                tracing::trace!(%lane, %resource, "lock released");
            }
            Self::Terminated { lane, crossings } => {
                tracing::debug!(%lane, crossings, "{lane} terminated");
            }
            Self::StopRaised => {
                tracing::info!("stop signal raised");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_lane() {
        let event = SimulationEvent::LockAcquired {
            lane: LaneId(1),
            resource: ResourceId(2),
        };
        assert_eq!(event.lane(), Some(LaneId(1)));
        assert_eq!(event.kind(), "lock_acquired");
        assert_eq!(SimulationEvent::StopRaised.lane(), None);

        let crash = SimulationEvent::Collision(Collision {
            resource: ResourceId(0),
            occupant: LaneId(3),
            intruder: LaneId(0),
        });
        assert_eq!(crash.lane(), Some(LaneId(0)));
    }

    #[test]
    fn test_event_serializes_tagged() {
        let event = SimulationEvent::Terminated {
            lane: LaneId(2),
            crossings: 7,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "terminated");
        assert_eq!(json["lane"], 2);
        assert_eq!(json["crossings"], 7);
    }
}
