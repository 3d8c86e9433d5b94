//! Bounded semaphore for capping in-flight expensive operations.
//!
//! Built on [`tokio::sync::Semaphore`], which queues waiters FIFO and drops a
//! cancelled waiter from its queue without granting it anything.

use crate::sync::errors::SyncError;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OwnedSemaphorePermit;
use tracing::trace;

const RESOURCE: &str = "semaphore";

#[derive(Clone, Debug)]
pub struct Semaphore {
    inner: Arc<tokio::sync::Semaphore>,
    capacity: usize,
    in_flight: Arc<AtomicUsize>,
}

impl Semaphore {
    pub fn new(permits: usize) -> Result<Self, SyncError> {
        if permits == 0 {
            return Err(SyncError::ZeroPermits);
        }
        if permits > tokio::sync::Semaphore::MAX_PERMITS {
            return Err(SyncError::TooManyPermits(permits));
        }
        Ok(Self {
            inner: Arc::new(tokio::sync::Semaphore::new(permits)),
            capacity: permits,
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Wait for a permit.
    pub async fn acquire(&self) -> Result<Permit, SyncError> {
        let permit = Arc::clone(&self.inner)
            .acquire_owned()
            .await
            .map_err(|_| SyncError::Abandoned {
                resource: RESOURCE.to_string(),
            })?;
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(in_flight, capacity = self.capacity, "permit acquired");
        Ok(Permit {
            permit: Some(permit),
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Wait for a permit unless `cancel` completes first.
    pub async fn acquire_until<C>(&self, cancel: C) -> Result<Permit, SyncError>
    where
        C: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            permit = self.acquire() => permit,
            () = cancel => Err(SyncError::Abandoned { resource: RESOURCE.to_string() }),
        }
    }

    /// Run `f` while holding a permit. The permit is returned however `f`
    /// exits, including by panic or by this future being dropped.
    pub async fn run<F, Fut, T>(&self, f: F) -> Result<T, SyncError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _permit = self.acquire().await?;
        Ok(f().await)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held.
    pub fn available(&self) -> usize {
        self.inner.available_permits()
    }

    /// Permits currently held.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// A held permit, returned on [`release`](Self::release) or drop.
#[derive(Debug)]
#[must_use = "the permit is returned as soon as it is dropped"]
pub struct Permit {
    permit: Option<OwnedSemaphorePermit>,
    in_flight: Arc<AtomicUsize>,
}

impl Permit {
    /// Return the permit to the next waiter. Further calls do nothing.
    pub fn release(&mut self) {
        if let Some(permit) = self.permit.take() {
            // count down before the permit can reach a waiter
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            drop(permit);
        }
    }

    pub fn is_released(&self) -> bool {
        self.permit.is_none()
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_zero_permits_rejected() {
        assert_eq!(Semaphore::new(0).unwrap_err(), SyncError::ZeroPermits);
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let semaphore = Semaphore::new(2).unwrap();
        let mut first = semaphore.acquire().await.unwrap();
        let _second = semaphore.acquire().await.unwrap();
        assert_eq!(semaphore.available(), 0);
        assert_eq!(semaphore.in_flight(), 2);

        first.release();
        first.release();
        assert!(first.is_released());
        assert_eq!(semaphore.available(), 1);
        assert_eq!(semaphore.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_acquire_until_abandons_without_permit() {
        let semaphore = Semaphore::new(1).unwrap();
        let _held = semaphore.acquire().await.unwrap();
        let result = semaphore
            .acquire_until(tokio::time::sleep(Duration::from_millis(5)))
            .await;
        assert!(matches!(result, Err(SyncError::Abandoned { .. })));
        assert_eq!(semaphore.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_run_releases_on_error() {
        let semaphore = Semaphore::new(1).unwrap();
        let result: Result<Result<(), &str>, SyncError> =
            semaphore.run(|| async { Err("failed") }).await;
        assert_eq!(result.unwrap(), Err("failed"));
        assert_eq!(semaphore.available(), 1);
        assert_eq!(semaphore.in_flight(), 0);
    }
}
