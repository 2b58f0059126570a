use crate::measurement::Endpoint;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use tracing::{trace, warn};

/// One raw reading together with the tick it was taken at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub raw: u16,
    pub timestamp: u64,
}

/// Latest reading of one sensor's one measurement type.
///
/// Written by the producer, read by every session opened on the endpoint. The
/// mutex only ever guards a copy of `Sample`, so the producer is never held up
/// by formatting or by a reader's I/O.
pub struct SampleSlot {
    endpoint: Endpoint,
    latest: Mutex<Option<Sample>>,
    changed: Notify,
}

impl SampleSlot {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            latest: Mutex::new(None),
            changed: Notify::new(),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    fn lock(&self) -> MutexGuard<'_, Option<Sample>> {
        // A `Sample` is replaced by a single assignment, so a poisoned lock
        // still guards a consistent pair.
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a new code, stamping it with the next tick. Returns the tick
    /// used, or `None` when the tick counter is exhausted and the code was dropped.
    pub fn publish(&self, raw: u16) -> Option<u64> {
        let timestamp = {
            let mut latest = self.lock();
            let timestamp = match *latest {
                None => 1,
                Some(prev) => match prev.timestamp.checked_add(1) {
                    Some(next) => next,
                    None => {
                        drop(latest);
                        warn!("[{}] tick counter exhausted, dropping raw={}", self.endpoint, raw);
                        return None;
                    }
                },
            };
            *latest = Some(Sample { raw, timestamp });
            timestamp
        };
        trace!("[{}] published raw={} t={}", self.endpoint, raw, timestamp);
        self.changed.notify_waiters();
        Some(timestamp)
    }

    /// Store a code with a caller-provided tick. Ticks that do not move
    /// forward are dropped so readers never see an update twice.
    pub fn store(&self, raw: u16, timestamp: u64) -> bool {
        {
            let mut latest = self.lock();
            if let Some(prev) = *latest {
                if timestamp <= prev.timestamp {
                    drop(latest);
                    warn!(
                        "[{}] ignoring sample with stale tick {} (latest {})",
                        self.endpoint, timestamp, prev.timestamp
                    );
                    return false;
                }
            }
            *latest = Some(Sample { raw, timestamp });
        }
        self.changed.notify_waiters();
        true
    }

    /// Copy the current reading. Never blocks beyond the copy itself.
    pub fn snapshot(&self) -> Option<Sample> {
        *self.lock()
    }

    /// Tick of the current reading, `None` before the first write
    pub fn timestamp(&self) -> Option<u64> {
        self.lock().map(|s| s.timestamp)
    }

    /// Future that completes on the next write to this slot
    pub fn changed(&self) -> Notified<'_> {
        self.changed.notified()
    }

    /// Read-only view of the raw slot, bypassing any session buffer
    pub fn view(self: &Arc<Self>) -> SlotView {
        SlotView { slot: Arc::clone(self) }
    }
}

/// Zero-copy polling access to a slot's latest raw reading
#[derive(Clone)]
pub struct SlotView {
    slot: Arc<SampleSlot>,
}

impl SlotView {
    pub fn endpoint(&self) -> Endpoint {
        self.slot.endpoint()
    }

    pub fn raw(&self) -> Option<u16> {
        self.slot.snapshot().map(|s| s.raw)
    }

    pub fn sample(&self) -> Option<Sample> {
        self.slot.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::MeasurementType;
    use std::time::Duration;

    fn slot() -> Arc<SampleSlot> {
        Arc::new(SampleSlot::new(Endpoint::new(0, MeasurementType::Temperature)))
    }

    #[test]
    fn test_empty_until_first_publish() {
        let s = slot();
        assert_eq!(s.snapshot(), None);
        assert_eq!(s.publish(512), Some(1));
        assert_eq!(s.publish(513), Some(2));
        assert_eq!(s.snapshot(), Some(Sample { raw: 513, timestamp: 2 }));
    }

    #[test]
    fn test_store_rejects_ticks_that_do_not_advance() {
        let s = slot();
        assert!(s.store(10, 5));
        assert!(!s.store(11, 5));
        assert!(!s.store(12, 4));
        assert_eq!(s.snapshot(), Some(Sample { raw: 10, timestamp: 5 }));
        assert!(s.store(13, 9));
        assert_eq!(s.timestamp(), Some(9));
    }

    #[test]
    fn test_publish_after_last_tick_is_dropped() {
        let s = slot();
        assert!(s.store(1, u64::MAX));
        assert_eq!(s.publish(2), None);
        assert_eq!(s.snapshot(), Some(Sample { raw: 1, timestamp: u64::MAX }));
    }

    #[test]
    fn test_view_tracks_slot() {
        let s = slot();
        let view = s.view();
        assert_eq!(view.raw(), None);
        s.publish(300);
        assert_eq!(view.raw(), Some(300));
        assert_eq!(view.endpoint(), s.endpoint());
    }

    #[tokio::test]
    async fn test_publish_wakes_waiters() {
        let s = slot();
        let waiter = {
            let s = s.clone();
            tokio::spawn(async move {
                let notified = s.changed();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if s.timestamp().is_none() {
                    notified.await;
                }
                s.timestamp()
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        s.publish(1);
        let seen = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter was not woken")
            .unwrap();
        assert_eq!(seen, Some(1));
    }
}
