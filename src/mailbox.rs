// src/mailbox.rs - Single-slot, latest-wins hand-off to the classification worker
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

struct Slot<T> {
    value: Option<T>,
    closed: bool,
}

/// Posting never blocks; an unconsumed value is replaced and handed back.
pub struct LatestMailbox<T> {
    slot: Mutex<Slot<T>>,
    notify: Notify,
    posted: AtomicU64,
    superseded: AtomicU64,
}

impl<T> LatestMailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                value: None,
                closed: false,
            }),
            notify: Notify::new(),
            posted: AtomicU64::new(0),
            superseded: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        // Slot state stays consistent even if a holder panicked.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `value`, returning the unconsumed value it displaced. After
    /// `close` the value is handed straight back.
    pub fn post(&self, value: T) -> Result<Option<T>, T> {
        let displaced = {
            let mut slot = self.lock();
            if slot.closed {
                return Err(value);
            }
            slot.value.replace(value)
        };

        self.posted.fetch_add(1, Ordering::Relaxed);
        if displaced.is_some() {
            self.superseded.fetch_add(1, Ordering::Relaxed);
        }
        self.notify.notify_one();
        Ok(displaced)
    }

    pub fn try_take(&self) -> Option<T> {
        self.lock().value.take()
    }

    /// Wait for the next value. Returns `None` once closed and drained.
    pub async fn recv(&self) -> Option<T> {
        loop {
            {
                let mut slot = self.lock();
                if let Some(value) = slot.value.take() {
                    return Some(value);
                }
                if slot.closed {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
        // Also leave a permit for a receiver that is between its check and its await.
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn posted(&self) -> u64 {
        self.posted.load(Ordering::Relaxed)
    }

    pub fn superseded(&self) -> u64 {
        self.superseded.load(Ordering::Relaxed)
    }
}

impl<T> Default for LatestMailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}
