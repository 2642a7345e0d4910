//! Simulation event feed.
//!
//! Subscribers receive [`SimulationEvent`]s over bounded crossbeam channels.
//! Publishing never blocks the simulation: a subscriber whose queue is full
//! misses the event, and a subscriber whose stream was dropped is pruned on
//! the next publish.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::simulator::RunId;
use crate::train::TrainId;

/// Something that happened inside the simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimulationEvent {
    /// A delay was added to a train.
    DelayInjected {
        /// Delayed train.
        train_id: TrainId,
        /// Minutes added by this event.
        minutes: u32,
        /// Accumulated delay after the event.
        total_delay: u32,
        /// Reported cause.
        cause: String,
        /// Simulated time of the event.
        at: DateTime<Utc>,
    },
    /// A train departed its last stop.
    TrainFinished {
        /// Finished train.
        train_id: TrainId,
        /// Simulated time of the step that finished it.
        at: DateTime<Utc>,
    },
    /// The registry was rebuilt.
    Reset {
        /// New generation.
        run_id: RunId,
        /// Whether the reload succeeded.
        ready: bool,
    },
}

/// Receiving end of a subscription.
#[derive(Debug)]
pub struct EventStream {
    rx: Receiver<SimulationEvent>,
}

impl EventStream {
    /// Next event if one is queued.
    #[must_use]
    pub fn try_recv(&self) -> Option<SimulationEvent> {
        self.rx.try_recv().ok()
    }

    /// Waits up to `timeout` for the next event.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<SimulationEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Everything currently queued.
    #[must_use]
    pub fn drain(&self) -> Vec<SimulationEvent> {
        self.rx.try_iter().collect()
    }
}

/// Fan-out publisher for simulation events.
#[derive(Debug)]
pub struct EventBus {
    capacity: usize,
    subscribers: Mutex<Vec<Sender<SimulationEvent>>>,
    dropped: AtomicU64,
}

impl EventBus {
    /// Creates a bus whose subscriber queues hold `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            subscribers: Mutex::new(Vec::new()),
            dropped: AtomicU64::new(0),
        }
    }

    /// Registers a new subscriber. It sees only events published afterwards.
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        let (tx, rx) = bounded(self.capacity);
        match self.subscribers.lock() {
            Ok(mut subs) => subs.push(tx),
            Err(poisoned) => poisoned.into_inner().push(tx),
        }
        EventStream { rx }
    }

    /// Delivers `event` to every live subscriber without blocking.
    pub fn publish(&self, event: &SimulationEvent) {
        let mut subs = match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        subs.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("event subscriber queue full; dropping event");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        match self.subscribers.lock() {
            Ok(subs) => subs.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Events that could not be delivered because a queue was full.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finished(id: &str) -> SimulationEvent {
        SimulationEvent::TrainFinished {
            train_id: TrainId::new(id),
            at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    fn subscribers_receive_published_events() {
        let bus = EventBus::new(8);
        let a = bus.subscribe();
        let b = bus.subscribe();
        bus.publish(&finished("T-1"));
        assert_eq!(a.try_recv(), Some(finished("T-1")));
        assert_eq!(b.recv_timeout(Duration::from_millis(10)), Some(finished("T-1")));
        assert_eq!(a.try_recv(), None);
    }

    #[test]
    fn full_queue_drops_instead_of_blocking() {
        let bus = EventBus::new(1);
        let stream = bus.subscribe();
        bus.publish(&finished("T-1"));
        bus.publish(&finished("T-2"));
        assert_eq!(bus.dropped_events(), 1);
        assert_eq!(stream.drain(), vec![finished("T-1")]);
    }

    #[test]
    fn dropped_streams_are_pruned() {
        let bus = EventBus::new(4);
        let stream = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(stream);
        bus.publish(&finished("T-1"));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(finished("T-7")).unwrap();
        assert_eq!(json["type"], "train_finished");
        assert_eq!(json["train_id"], "T-7");
    }
}
