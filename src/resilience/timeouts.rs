//! Timeout enforcement.
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - The wrapped future is dropped (cancelled) when the deadline passes

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// The deadline passed before the operation completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline of {}ms exceeded", .after.as_millis())]
pub struct DeadlineExceeded {
    pub after: Duration,
}

/// Run `fut` to completion or fail once `deadline` has elapsed.
pub async fn with_deadline<F>(deadline: Duration, fut: F) -> Result<F::Output, DeadlineExceeded>
where
    F: Future,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| DeadlineExceeded { after: deadline })
}
