//! Bounded queues between the sampler and the relay
//!
//! The two threads share nothing but these queues. Each direction has its
//! own full-queue policy:
//!
//! - **Enqueue** never blocks. [`QueueSender::offer`] returns
//!   [`EnqueueOutcome::Dropped`] when the queue is full so the caller can
//!   log it and carry on. This keeps the sampler's cadence independent of
//!   the relay and keeps the receive callback O(1).
//! - **Dequeue** is either a bounded non-blocking drain (sampler side) or a
//!   blocking receive (relay side, which has no deadline of its own).

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};

/// Result of a non-blocking enqueue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum EnqueueOutcome {
    /// The item is in the queue
    Accepted,
    /// The queue was full (or the consumer is gone); the item was discarded
    Dropped,
}

impl EnqueueOutcome {
    /// Whether the item was accepted
    pub fn is_accepted(self) -> bool {
        self == EnqueueOutcome::Accepted
    }
}

/// Producer half of a bounded queue
#[derive(Debug)]
pub struct QueueSender<T> {
    inner: Sender<T>,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> QueueSender<T> {
    /// Offer an item without blocking; drop it if the queue is full
    pub fn offer(&self, item: T) -> EnqueueOutcome {
        match self.inner.try_send(item) {
            Ok(()) => EnqueueOutcome::Accepted,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                EnqueueOutcome::Dropped
            }
        }
    }

    /// Items currently waiting
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no item is waiting
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Consumer half of a bounded queue
#[derive(Debug)]
pub struct QueueReceiver<T> {
    inner: Receiver<T>,
}

impl<T> QueueReceiver<T> {
    /// Take at most `max` items without blocking
    pub fn drain_up_to(&self, max: usize) -> Vec<T> {
        let mut items = Vec::with_capacity(max);
        while items.len() < max {
            match self.inner.try_recv() {
                Ok(item) => items.push(item),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        items
    }

    /// Take one item without blocking
    pub fn try_take(&self) -> Option<T> {
        self.inner.try_recv().ok()
    }

    /// Block until an item arrives; `None` once every producer is gone
    pub fn take_blocking(&self) -> Option<T> {
        self.inner.recv().ok()
    }

    /// Items currently waiting
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no item is waiting
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Create a bounded queue holding at most `capacity` items
pub fn bounded_queue<T>(capacity: usize) -> (QueueSender<T>, QueueReceiver<T>) {
    let (tx, rx) = bounded(capacity.max(1));
    (QueueSender { inner: tx }, QueueReceiver { inner: rx })
}
