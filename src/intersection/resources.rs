//! Quadrant locks.
//!
//! Each quadrant is a `parking_lot::Mutex<()>`; holding its guard is holding
//! the quadrant. Release is dropping the guard, so only the holder that
//! acquired a quadrant can ever release it.

use std::fmt;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use super::ResourceId;
use crate::errors::{Result, SimulationError};

/// The fixed set of exclusive quadrant locks.
pub struct ResourceSet {
    locks: Vec<Mutex<()>>,
}

impl ResourceSet {
    /// Create `count` unlocked resources.
    pub fn new(count: usize) -> Self {
        Self {
            locks: (0..count).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Number of resources.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether the set holds no resources at all.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Block until `resource` is exclusively held by the caller.
    pub fn acquire(&self, resource: ResourceId) -> Result<ResourceGuard<'_>> {
        let lock = self.lock_for(resource)?;
        Ok(ResourceGuard {
            resource,
            _guard: lock.lock(),
        })
    }

    /// Try to acquire `resource`, giving up after `timeout`.
    ///
    /// Lanes never use this; it exists so diagnostics can observe a
    /// deadlock without becoming part of one.
    pub fn try_acquire_for(
        &self,
        resource: ResourceId,
        timeout: Duration,
    ) -> Result<Option<ResourceGuard<'_>>> {
        let lock = self.lock_for(resource)?;
        Ok(lock.try_lock_for(timeout).map(|guard| ResourceGuard {
            resource,
            _guard: guard,
        }))
    }

    /// Relinquish a held resource.
    pub fn release(&self, guard: ResourceGuard<'_>) {
        tracing::trace!(resource = %guard.resource, "releasing resource");
        drop(guard);
    }

    /// Whether `resource` is currently held by anyone.
    pub fn is_locked(&self, resource: ResourceId) -> Result<bool> {
        Ok(self.lock_for(resource)?.is_locked())
    }

    fn lock_for(&self, resource: ResourceId) -> Result<&Mutex<()>> {
        self.locks
            .get(resource.index())
            .ok_or(SimulationError::UnknownResource {
                resource,
                count: self.locks.len(),
            })
    }
}

impl fmt::Debug for ResourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSet")
            .field("len", &self.locks.len())
            .finish_non_exhaustive()
    }
}

/// Exclusive hold on one resource. Dropping it releases the resource.
#[must_use = "dropping the guard releases the resource immediately"]
pub struct ResourceGuard<'a> {
    resource: ResourceId,
    _guard: MutexGuard<'a, ()>,
}

impl ResourceGuard<'_> {
    /// The resource this guard holds.
    pub fn resource(&self) -> ResourceId {
        self.resource
    }
}

impl fmt::Debug for ResourceGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceGuard").field(&self.resource).finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_acquire_and_release() {
        let set = ResourceSet::new(4);
        let guard = set.acquire(ResourceId(2)).unwrap();
        assert_eq!(guard.resource(), ResourceId(2));
        assert!(set.is_locked(ResourceId(2)).unwrap());
        assert!(!set.is_locked(ResourceId(1)).unwrap());

        set.release(guard);
        assert!(!set.is_locked(ResourceId(2)).unwrap());
    }

    #[test]
    fn test_unknown_resource_rejected() {
        let set = ResourceSet::new(4);
        let err = set.acquire(ResourceId(4)).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::UnknownResource { resource: ResourceId(4), count: 4 }
        ));
    }

    #[test]
    fn test_held_resource_excludes_others() {
        let set = ResourceSet::new(1);
        let _held = set.acquire(ResourceId(0)).unwrap();
        let attempt = set
            .try_acquire_for(ResourceId(0), Duration::from_millis(20))
            .unwrap();
        assert!(attempt.is_none());
    }

    /// Two holders taking a shared pair in opposite orders wedge each other.
    /// Bounded acquisition lets the test see the wait cycle instead of hanging.
    #[test]
    fn test_opposite_order_acquisition_deadlocks() {
        let set = Arc::new(ResourceSet::new(2));
        let barrier = Arc::new(Barrier::new(2));

        let spawn = |first: usize, second: usize| {
            let set = Arc::clone(&set);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let _first = set.acquire(ResourceId(first)).unwrap();
                barrier.wait();
                let second = set
                    .try_acquire_for(ResourceId(second), Duration::from_millis(100))
                    .unwrap();
                let blocked = second.is_none();
                // Keep holding `first` until the other side has also given up.
                barrier.wait();
                blocked
            })
        };

        let ascending = spawn(0, 1);
        let descending = spawn(1, 0);

        assert!(ascending.join().unwrap());
        assert!(descending.join().unwrap());
    }

    #[test]
    fn test_same_order_acquisition_completes() {
        let set = Arc::new(ResourceSet::new(2));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let set = Arc::clone(&set);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let low = set.acquire(ResourceId(0)).unwrap();
                        let high = set.acquire(ResourceId(1)).unwrap();
                        set.release(high);
                        set.release(low);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(!set.is_locked(ResourceId(0)).unwrap());
        assert!(!set.is_locked(ResourceId(1)).unwrap());
    }
}
