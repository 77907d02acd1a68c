//! Deadlines for I/O bound calls
//!
//! Every call into a cache backend or the permission store can be bounded by
//! a caller-supplied timeout. `None` means unbounded.

use std::future::Future;
use std::time::Duration;
use warden_core::{Error, Result};

/// A caller-supplied bound on one logical operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deadline(Option<Duration>);

impl Deadline {
    pub const fn none() -> Self {
        Self(None)
    }

    pub const fn after(limit: Duration) -> Self {
        Self(Some(limit))
    }

    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            Self::none()
        } else {
            Self::after(Duration::from_millis(ms))
        }
    }

    pub const fn limit(&self) -> Option<Duration> {
        self.0
    }

    /// Run `fut` under this deadline, returning `None` when it elapses
    pub async fn run<F: Future>(self, fut: F) -> Option<F::Output> {
        match self.0 {
            Some(limit) => tokio::time::timeout(limit, fut).await.ok(),
            None => Some(fut.await),
        }
    }
}

/// Run a fallible `fut` under `deadline`, mapping expiry to [`Error::Timeout`]
pub async fn within<T, F>(operation: &str, deadline: Deadline, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match deadline.run(fut).await {
        Some(result) => result,
        None => Err(Error::timeout(
            operation,
            deadline.limit().unwrap_or_default(),
        )),
    }
}
