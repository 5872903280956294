use std::sync::atomic::{AtomicUsize, Ordering};

/// Admission-control gate bounding concurrent in-flight backend requests.
///
/// A saturated gate sheds demand: callers that fail to acquire skip their
/// operation instead of queueing it. The live count never exceeds the
/// capacity and never goes negative.
pub struct RequestGate {
    capacity: usize,
    in_flight: AtomicUsize,
}

impl RequestGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Claim a slot. Returns false without blocking when saturated.
    pub fn try_acquire(&self) -> bool {
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                if current < self.capacity {
                    Some(current + 1)
                } else {
                    None
                }
            })
            .is_ok()
    }

    /// Return a slot. Clamped at zero.
    pub fn release(&self) {
        let _ = self
            .in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_sub(1)
            });
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
