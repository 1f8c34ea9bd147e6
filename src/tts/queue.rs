//! Ordered speech queue shared by the coordinator and the player task.
//!
//! Tasks come out ordered by `(seq, priority, arrival)`:
//!
//! * lower causal sequence number first (one number per utterance);
//! * within one sequence, [`Priority::System`] before [`Priority::Reply`];
//! * ties keep arrival order.
//!
//! [`SpeechQueue::interrupt`] drops everything pending and bumps the queue
//! epoch; a player holding a task from an older epoch stops it.
//!
//! A popped task counts as playing until the player calls
//! [`SpeechQueue::finished`], so [`SpeechQueue::is_busy`] stays true while
//! the last task is still audible.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Mutex;

use tokio::sync::Notify;

// ---------------------------------------------------------------------------
// SpeechTask
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    /// Notices, greetings, error prompts.
    System,
    /// The answer to an utterance.
    Reply,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechTask {
    pub text: String,
    pub priority: Priority,
    pub seq: u64,
    /// Assigned by [`SpeechQueue::enqueue`].
    pub arrival: u64,
}

impl SpeechTask {
    pub fn new(text: impl Into<String>, priority: Priority, seq: u64) -> Self {
        Self {
            text: text.into(),
            priority,
            seq,
            arrival: 0,
        }
    }

    pub fn system(text: impl Into<String>, seq: u64) -> Self {
        Self::new(text, Priority::System, seq)
    }

    pub fn reply(text: impl Into<String>, seq: u64) -> Self {
        Self::new(text, Priority::Reply, seq)
    }

    fn key(&self) -> (u64, Priority, u64) {
        (self.seq, self.priority, self.arrival)
    }
}

/// Heap entry: `BinaryHeap` is a max-heap, so the ordering is inverted.
#[derive(Debug, PartialEq, Eq)]
struct Queued(SpeechTask);

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.key().cmp(&self.0.key())
    }
}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ---------------------------------------------------------------------------
// SpeechQueue
// ---------------------------------------------------------------------------

/// A task taken from the queue, with the epoch it was taken in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dequeued {
    pub task: SpeechTask,
    pub epoch: u64,
}

#[derive(Debug, Default)]
struct Inner {
    heap: BinaryHeap<Queued>,
    arrivals: u64,
    epoch: u64,
    playing: bool,
}

#[derive(Debug, Default)]
pub struct SpeechQueue {
    inner: Mutex<Inner>,
    available: Notify,
    interrupted: Notify,
}

impl SpeechQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task; returns its arrival stamp.  Empty text is ignored.
    pub fn enqueue(&self, mut task: SpeechTask) -> Option<u64> {
        if task.text.trim().is_empty() {
            return None;
        }
        let arrival = {
            let mut inner = self.lock();
            inner.arrivals += 1;
            task.arrival = inner.arrivals;
            inner.heap.push(Queued(task));
            inner.arrivals
        };
        self.available.notify_one();
        Some(arrival)
    }

    pub fn pop(&self) -> Option<Dequeued> {
        let mut inner = self.lock();
        let epoch = inner.epoch;
        let task = inner.heap.pop().map(|Queued(task)| Dequeued { task, epoch });
        if task.is_some() {
            inner.playing = true;
        }
        task
    }

    /// Called by the player once a popped task has stopped sounding.
    pub fn finished(&self) {
        self.lock().playing = false;
    }

    /// Wait for the next task.
    pub async fn next(&self) -> Dequeued {
        loop {
            let notified = self.available.notified();
            if let Some(task) = self.pop() {
                return task;
            }
            notified.await;
        }
    }

    /// Drop every pending task and stop the one playing.  Returns the number
    /// of pending tasks dropped.
    pub fn interrupt(&self) -> usize {
        let dropped = {
            let mut inner = self.lock();
            inner.epoch += 1;
            inner.playing = false;
            let n = inner.heap.len();
            inner.heap.clear();
            n
        };
        self.interrupted.notify_waiters();
        dropped
    }

    /// Resolves once [`interrupt`](Self::interrupt) has been called after
    /// `epoch`.
    pub async fn interrupted(&self, epoch: u64) {
        loop {
            let notified = self.interrupted.notified();
            if self.lock().epoch != epoch {
                return;
            }
            notified.await;
        }
    }

    pub fn len(&self) -> usize {
        self.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Something is queued or still playing.
    pub fn is_busy(&self) -> bool {
        let inner = self.lock();
        inner.playing || !inner.heap.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // The heap stays consistent even if a holder panicked.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
