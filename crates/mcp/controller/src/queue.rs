//! De-duplicating work queue
//!
//! A key sits in the queue at most once. While a worker processes a key, new
//! additions of that key are remembered and the key is queued again only
//! when processing finishes, so one key is never reconciled by two workers
//! at the same time.
//!
//! Shutdown drops every pending key. Only keys already handed to a worker
//! are still processed.

use mcp_types::ObjectKey;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct QueueState {
    queue: VecDeque<ObjectKey>,
    dirty: HashSet<ObjectKey>,
    processing: HashSet<ObjectKey>,
    shutting_down: bool,
}

#[derive(Debug, Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, key: ObjectKey) {
        let mut state = self.state();
        if state.shutting_down || state.dirty.contains(&key) {
            return;
        }
        state.dirty.insert(key.clone());
        if state.processing.contains(&key) {
            return;
        }
        state.queue.push_back(key);
        drop(state);
        self.notify.notify_one();
    }

    /// Add the key once `delay` has elapsed
    pub fn add_after(self: &Arc<Self>, key: ObjectKey, delay: Duration) {
        if delay.is_zero() {
            self.add(key);
            return;
        }
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(key);
        });
    }

    /// Wait for the next key; `None` once the queue is shut down
    pub async fn get(&self) -> Option<ObjectKey> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.state();
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
                if state.shutting_down {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Mark a key as processed, re-queueing it if it was added meanwhile
    pub fn done(&self, key: &ObjectKey) {
        let mut state = self.state();
        state.processing.remove(key);
        if !state.shutting_down && state.dirty.contains(key) {
            state.queue.push_back(key.clone());
            drop(state);
            self.notify.notify_one();
        }
    }

    pub fn len(&self) -> usize {
        self.state().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop handing out keys and discard the pending ones
    pub fn shutdown(&self) {
        {
            let mut state = self.state();
            state.shutting_down = true;
            state.queue.clear();
            state.dirty.clear();
        }
        self.notify.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state().shutting_down
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> ObjectKey {
        ObjectKey::new("default", name)
    }

    #[tokio::test]
    async fn test_duplicates_are_collapsed() {
        let queue = WorkQueue::new();
        queue.add(key("a"));
        queue.add(key("a"));
        queue.add(key("b"));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.get().await, Some(key("a")));
        assert_eq!(queue.get().await, Some(key("b")));
    }

    #[tokio::test]
    async fn test_key_in_flight_is_requeued_after_done() {
        let queue = WorkQueue::new();
        queue.add(key("a"));
        let in_flight = queue.get().await.unwrap();

        queue.add(key("a"));
        assert!(queue.is_empty(), "in-flight key must not be handed out twice");

        queue.done(&in_flight);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get().await, Some(key("a")));
    }

    #[tokio::test]
    async fn test_shutdown_wakes_waiters() {
        let queue = Arc::new(WorkQueue::new());
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.get().await })
        };
        tokio::task::yield_now().await;

        queue.shutdown();
        assert_eq!(waiter.await.unwrap(), None);

        queue.add(key("late"));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_discards_pending_keys() {
        let queue = WorkQueue::new();
        queue.add(key("a"));
        queue.add(key("b"));
        queue.add(key("c"));
        let in_flight = queue.get().await.unwrap();
        queue.add(key("a"));

        queue.shutdown();
        assert!(queue.is_empty());
        assert_eq!(queue.get().await, None);

        // The in-flight key is not handed out again either
        queue.done(&in_flight);
        assert!(queue.is_empty());
        assert_eq!(queue.get().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_after_delays() {
        let queue = Arc::new(WorkQueue::new());
        queue.add_after(key("a"), Duration::from_secs(5));
        tokio::task::yield_now().await;
        assert!(queue.is_empty());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(queue.len(), 1);
    }
}
