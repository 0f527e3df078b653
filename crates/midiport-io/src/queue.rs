//! Inbound message queue shared between the receive path and polling callers.
//!
//! One producer (the backend notification thread) and any number of consumers.
//! A mutex guards the storage and a condition variable wakes blocked pollers on
//! push and on close. Every open starts a session; pushes tagged with another
//! session are rejected under the same lock.

use midiport_core::Message;
use parking_lot::{Condvar, Mutex};
use ringbuf::{
    traits::{Consumer, Observer, RingBuffer},
    HeapRb,
};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::OverflowPolicy;

/// Result of [`InboundQueue::push`].
#[derive(Debug)]
pub enum Pushed {
    Queued,
    /// Queued after evicting the oldest message (drop-oldest policy only).
    Evicted(Message),
    /// The queue is closed or belongs to another session; the message was discarded.
    Closed,
}

/// Result of [`InboundQueue::pop`].
#[derive(Debug, PartialEq)]
pub enum Popped {
    Message(Message),
    TimedOut,
    Closed,
}

enum Storage {
    Unbounded(VecDeque<Message>),
    Bounded(HeapRb<Message>),
}

impl Storage {
    fn new(policy: OverflowPolicy) -> Self {
        match policy {
            OverflowPolicy::Unbounded => Self::Unbounded(VecDeque::new()),
            OverflowPolicy::DropOldest(capacity) => Self::Bounded(HeapRb::new(capacity.get())),
        }
    }

    fn push(&mut self, message: Message) -> Option<Message> {
        match self {
            Self::Unbounded(queue) => {
                queue.push_back(message);
                None
            }
            Self::Bounded(rb) => rb.push_overwrite(message),
        }
    }

    fn pop(&mut self) -> Option<Message> {
        match self {
            Self::Unbounded(queue) => queue.pop_front(),
            Self::Bounded(rb) => rb.try_pop(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Unbounded(queue) => queue.len(),
            Self::Bounded(rb) => rb.occupied_len(),
        }
    }

    fn clear(&mut self) -> usize {
        let mut discarded = 0;
        while self.pop().is_some() {
            discarded += 1;
        }
        discarded
    }
}

struct QueueState {
    storage: Storage,
    accepting: bool,
    session: u64,
}

pub struct InboundQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
    policy: OverflowPolicy,
}

impl InboundQueue {
    /// Creates a closed queue. Call [`open`](Self::open) before pushing.
    pub fn new(policy: OverflowPolicy) -> Self {
        Self {
            state: Mutex::new(QueueState {
                storage: Storage::new(policy),
                accepting: false,
                session: 0,
            }),
            ready: Condvar::new(),
            policy,
        }
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Starts accepting pushes tagged with `session`.
    pub fn open(&self, session: u64) {
        let mut state = self.state.lock();
        state.accepting = true;
        state.session = session;
    }

    /// Stops accepting messages, discards pending ones and wakes every blocked poller.
    /// Returns the number of discarded messages.
    pub fn close(&self) -> usize {
        let discarded = {
            let mut state = self.state.lock();
            state.accepting = false;
            state.storage.clear()
        };
        self.ready.notify_all();
        discarded
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().accepting
    }

    pub fn push(&self, session: u64, message: Message) -> Pushed {
        let pushed = {
            let mut state = self.state.lock();
            if !state.accepting || state.session != session {
                return Pushed::Closed;
            }
            match state.storage.push(message) {
                Some(evicted) => Pushed::Evicted(evicted),
                None => Pushed::Queued,
            }
        };
        self.ready.notify_one();
        pushed
    }

    /// Takes the oldest message without blocking.
    pub fn try_pop(&self) -> Option<Message> {
        self.state.lock().storage.pop()
    }

    /// Takes the oldest message, waiting up to `timeout` (`None` waits indefinitely).
    ///
    /// Returns [`Popped::Closed`] as soon as the queue is closed, even if the
    /// timeout has not elapsed.
    pub fn pop(&self, timeout: Option<Duration>) -> Popped {
        // A deadline past the end of `Instant` waits indefinitely
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut state = self.state.lock();
        loop {
            if !state.accepting {
                return Popped::Closed;
            }
            if let Some(message) = state.storage.pop() {
                return Popped::Message(message);
            }
            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        return Popped::TimedOut;
                    }
                    self.ready.wait_until(&mut state, deadline);
                }
                None => self.ready.wait(&mut state),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for InboundQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundQueue")
            .field("policy", &self.policy)
            .field("len", &self.len())
            .finish()
    }
}
