//! Resource-keyed read/write locks.
//!
//! Each key (usually an absolute file path) gets a [`LockState`] on first use,
//! torn down again once it has no holders and no waiters. Requests on one key
//! are served strictly in arrival order: a read request that arrives behind a
//! queued write waits for that write, so writers never starve. Consecutive
//! queued reads ahead of any write are granted together.
//!
//! Waiters are parked on a oneshot channel. Dropping a pending acquisition
//! before it is granted withdraws the waiter and lets the queue advance.

use crate::sync::errors::SyncError;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LockMode {
    Read,
    Write,
}

struct Waiter {
    mode: LockMode,
    grant: oneshot::Sender<()>,
}

/// Lock state for a single key.
#[derive(Default)]
struct LockState {
    readers: usize,
    writer: bool,
    /// Arrival order of tickets. Withdrawn tickets stay here until they
    /// reach the front; `waiters` is the source of truth.
    order: VecDeque<u64>,
    waiters: HashMap<u64, Waiter>,
}

impl LockState {
    fn is_idle(&self) -> bool {
        self.readers == 0 && !self.writer && self.waiters.is_empty()
    }

    fn compatible(&self, mode: LockMode) -> bool {
        match mode {
            LockMode::Read => !self.writer,
            LockMode::Write => !self.writer && self.readers == 0,
        }
    }

    fn enter(&mut self, mode: LockMode) {
        match mode {
            LockMode::Read => self.readers += 1,
            LockMode::Write => self.writer = true,
        }
    }

    fn leave(&mut self, mode: LockMode) {
        match mode {
            LockMode::Read => {
                debug_assert!(self.readers > 0, "read release without holder");
                self.readers = self.readers.saturating_sub(1);
            }
            LockMode::Write => {
                debug_assert!(self.writer, "write release without holder");
                self.writer = false;
            }
        }
    }

    /// Grant queued requests from the front while they are compatible.
    fn dispatch(&mut self, key: &str) {
        while let Some(&ticket) = self.order.front() {
            let mode = match self.waiters.get(&ticket) {
                None => {
                    self.order.pop_front();
                    continue;
                }
                Some(waiter) if !self.compatible(waiter.mode) => break,
                Some(waiter) => waiter.mode,
            };

            self.order.pop_front();
            let Some(waiter) = self.waiters.remove(&ticket) else {
                continue;
            };
            self.enter(mode);
            if waiter.grant.send(()).is_err() {
                self.leave(mode);
                continue;
            }
            trace!(key, ticket, ?mode, "granted queued lock");

            if mode == LockMode::Write {
                break;
            }
        }
    }
}

struct Shared {
    registry: Mutex<HashMap<String, LockState>>,
    next_ticket: AtomicU64,
}

impl Shared {
    fn release(&self, key: &str, mode: LockMode) {
        let mut registry = self.registry.lock();
        let Some(state) = registry.get_mut(key) else {
            return;
        };
        state.leave(mode);
        state.dispatch(key);
        if state.is_idle() {
            registry.remove(key);
            trace!(key, "lock state torn down");
        }
    }
}

/// Registry of per-key read/write locks.
///
/// Cloning is cheap and every clone shares the same registry; pass one
/// instance to every component that needs to coordinate.
#[derive(Clone)]
pub struct LockManager {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for LockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockManager")
            .field("stats", &self.stats())
            .finish()
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(HashMap::new()),
                next_ticket: AtomicU64::new(0),
            }),
        }
    }

    /// Acquire a shared lock on `key`, waiting behind queued writers.
    pub async fn acquire_read(&self, key: impl Into<String>) -> Result<LockHandle, SyncError> {
        self.acquire(key.into(), LockMode::Read).await
    }

    /// Acquire an exclusive lock on `key`.
    pub async fn acquire_write(&self, key: impl Into<String>) -> Result<LockHandle, SyncError> {
        self.acquire(key.into(), LockMode::Write).await
    }

    /// Like [`acquire_read`](Self::acquire_read), abandoned if `cancel`
    /// completes first.
    pub async fn acquire_read_until<C>(
        &self,
        key: impl Into<String>,
        cancel: C,
    ) -> Result<LockHandle, SyncError>
    where
        C: Future<Output = ()>,
    {
        self.acquire_until(key.into(), LockMode::Read, cancel).await
    }

    /// Like [`acquire_write`](Self::acquire_write), abandoned if `cancel`
    /// completes first.
    pub async fn acquire_write_until<C>(
        &self,
        key: impl Into<String>,
        cancel: C,
    ) -> Result<LockHandle, SyncError>
    where
        C: Future<Output = ()>,
    {
        self.acquire_until(key.into(), LockMode::Write, cancel).await
    }

    /// Run `f` while holding a read lock on `key`.
    pub async fn with_read<F, Fut, T>(&self, key: impl Into<String>, f: F) -> Result<T, SyncError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _handle = self.acquire_read(key).await?;
        Ok(f().await)
    }

    /// Run `f` while holding a write lock on `key`.
    pub async fn with_write<F, Fut, T>(&self, key: impl Into<String>, f: F) -> Result<T, SyncError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _handle = self.acquire_write(key).await?;
        Ok(f().await)
    }

    /// Snapshot of every live key.
    pub fn stats(&self) -> LockStats {
        let registry = self.shared.registry.lock();
        let mut stats = LockStats {
            keys: registry.len(),
            ..LockStats::default()
        };
        for state in registry.values() {
            stats.active_readers += state.readers;
            if state.writer {
                stats.active_writers += 1;
            }
            for waiter in state.waiters.values() {
                match waiter.mode {
                    LockMode::Read => stats.waiting_readers += 1,
                    LockMode::Write => stats.waiting_writers += 1,
                }
            }
        }
        stats
    }

    async fn acquire_until<C>(
        &self,
        key: String,
        mode: LockMode,
        cancel: C,
    ) -> Result<LockHandle, SyncError>
    where
        C: Future<Output = ()>,
    {
        let resource = key.clone();
        tokio::select! {
            biased;
            handle = self.acquire(key, mode) => handle,
            () = cancel => {
                debug!(key = %resource, ?mode, "lock acquisition cancelled");
                Err(SyncError::Abandoned { resource })
            }
        }
    }

    async fn acquire(&self, key: String, mode: LockMode) -> Result<LockHandle, SyncError> {
        let ticket = self.shared.next_ticket.fetch_add(1, Ordering::Relaxed);

        let pending = {
            let mut registry = self.shared.registry.lock();
            let state = registry.entry(key.clone()).or_default();
            if state.waiters.is_empty() && state.compatible(mode) {
                state.enter(mode);
                None
            } else {
                let (grant, granted) = oneshot::channel();
                state.order.push_back(ticket);
                state.waiters.insert(ticket, Waiter { mode, grant });
                debug!(
                    key = %key,
                    ticket,
                    ?mode,
                    readers = state.readers,
                    writer = state.writer,
                    queued = state.waiters.len(),
                    "lock busy, queued"
                );
                Some(granted)
            }
        };

        if let Some(granted) = pending {
            let mut withdraw = Withdraw {
                shared: &self.shared,
                key: &key,
                ticket,
                mode,
                granted,
                armed: true,
            };
            let outcome = (&mut withdraw.granted).await;
            withdraw.armed = false;
            drop(withdraw);
            if outcome.is_err() {
                return Err(SyncError::Abandoned { resource: key });
            }
        }

        trace!(key = %key, ticket, ?mode, "lock acquired");
        Ok(LockHandle {
            shared: Arc::clone(&self.shared),
            key,
            mode,
            ticket,
            released: false,
        })
    }
}

/// Withdraws a queued request when its acquisition future is dropped.
///
/// Holds the receiver open until the waiter is withdrawn, so a grant sent
/// before that point is always delivered and undone here.
struct Withdraw<'a> {
    shared: &'a Shared,
    key: &'a str,
    ticket: u64,
    mode: LockMode,
    granted: oneshot::Receiver<()>,
    armed: bool,
}

impl Drop for Withdraw<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut registry = self.shared.registry.lock();
        let Some(state) = registry.get_mut(self.key) else {
            return;
        };
        if state.waiters.remove(&self.ticket).is_some() {
            debug!(key = self.key, ticket = self.ticket, "withdrew pending lock request");
        } else {
            // granted after the future stopped being polled
            state.leave(self.mode);
        }
        while let Some(front) = state.order.front() {
            if state.waiters.contains_key(front) {
                break;
            }
            state.order.pop_front();
        }
        state.dispatch(self.key);
        if state.is_idle() {
            registry.remove(self.key);
        }
    }
}

/// A granted lock. Released exactly once, on [`release`](Self::release) or drop.
#[must_use = "the lock is released as soon as the handle is dropped"]
pub struct LockHandle {
    shared: Arc<Shared>,
    key: String,
    mode: LockMode,
    ticket: u64,
    released: bool,
}

impl LockHandle {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Identifier of the request that acquired this lock.
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Release the lock. Further calls do nothing.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.shared.release(&self.key, self.mode);
        trace!(key = %self.key, ticket = self.ticket, mode = ?self.mode, "lock released");
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for LockHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockHandle")
            .field("key", &self.key)
            .field("mode", &self.mode)
            .field("ticket", &self.ticket)
            .field("released", &self.released)
            .finish()
    }
}

/// Counters across all live keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LockStats {
    pub keys: usize,
    pub active_readers: usize,
    pub active_writers: usize,
    pub waiting_readers: usize,
    pub waiting_writers: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_single_reader_cleans_up() {
        let locks = LockManager::new();
        let handle = locks.acquire_read("a").await.unwrap();
        assert_eq!(locks.stats().active_readers, 1);
        drop(handle);
        assert_eq!(locks.stats(), LockStats::default());
    }

    #[tokio::test]
    async fn test_concurrent_readers() {
        let locks = LockManager::new();
        let r1 = locks.acquire_read("k").await.unwrap();
        let r2 = locks.acquire_read("k").await.unwrap();
        let r3 = locks.acquire_read("k").await.unwrap();
        let stats = locks.stats();
        assert_eq!(stats.active_readers, 3);
        assert_eq!(stats.active_writers, 0);
        drop((r1, r2, r3));
        assert_eq!(locks.stats().keys, 0);
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let locks = LockManager::new();
        let mut handle = locks.acquire_write("k").await.unwrap();
        handle.release();
        handle.release();
        assert!(handle.is_released());
        drop(handle);
        // a second release must not have decremented anyone else's hold
        let _reader = locks.acquire_read("k").await.unwrap();
        assert_eq!(locks.stats().active_readers, 1);
    }

    #[tokio::test]
    async fn test_writer_priority_over_later_readers() {
        let locks = LockManager::new();
        let reader = locks.acquire_read("k").await.unwrap();

        let writer_locks = locks.clone();
        let writer = tokio::spawn(async move { writer_locks.acquire_write("k").await });
        tokio::task::yield_now().await;
        while locks.stats().waiting_writers == 0 {
            tokio::task::yield_now().await;
        }

        // a read arriving behind the queued writer must wait for it
        let late = tokio::time::timeout(Duration::from_millis(20), locks.acquire_read("k")).await;
        assert!(late.is_err());
        assert_eq!(locks.stats().waiting_readers, 0);

        drop(reader);
        let mut write_handle = writer.await.unwrap().unwrap();
        assert_eq!(write_handle.mode(), LockMode::Write);
        write_handle.release();
        assert_eq!(locks.stats().keys, 0);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_does_not_block_queue() {
        let locks = LockManager::new();
        let writer = locks.acquire_write("k").await.unwrap();

        let cancelled = tokio::time::timeout(Duration::from_millis(10), locks.acquire_write("k")).await;
        assert!(cancelled.is_err());
        assert_eq!(locks.stats().waiting_writers, 0);

        drop(writer);
        let _reader = locks.acquire_read("k").await.unwrap();
        assert_eq!(locks.stats().active_readers, 1);
    }

    #[tokio::test]
    async fn test_acquire_until_reports_abandoned() {
        let locks = LockManager::new();
        let _writer = locks.acquire_write("k").await.unwrap();
        let result = locks
            .acquire_read_until("k", tokio::time::sleep(Duration::from_millis(5)))
            .await;
        assert_eq!(
            result.unwrap_err(),
            SyncError::Abandoned {
                resource: "k".to_string()
            }
        );
        assert_eq!(locks.stats().waiting_readers, 0);
    }

    #[tokio::test]
    async fn test_acquire_until_prefers_available_lock() {
        let locks = LockManager::new();
        let handle = locks
            .acquire_write_until("k", std::future::ready(()))
            .await
            .unwrap();
        assert_eq!(handle.mode(), LockMode::Write);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let locks = LockManager::new();
        let _a = locks.acquire_write("a").await.unwrap();
        let _b = locks.acquire_write("b").await.unwrap();
        assert_eq!(locks.stats().keys, 2);
        assert_eq!(locks.stats().active_writers, 2);
    }

    #[tokio::test]
    async fn test_with_write_releases_after_block() {
        let locks = LockManager::new();
        let value = locks.with_write("k", || async { 7 }).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(locks.stats().keys, 0);
    }
}
