//! Bounded exponential backoff for idempotent store reads.
//!
//! Writes never go through here: an insert that timed out may still have landed, and
//! the idempotency key (not a blind retry) is what makes those safe to repeat.

use crate::error::Error;
use log::*;
use std::future::Future;
use std::time::Duration;

const MAX_READ_RETRIES: u32 = 2;
const BASE_DELAY: Duration = Duration::from_millis(25);

/// Runs `operation` and retries it while it fails with a retryable error, up to
/// `MAX_READ_RETRIES` extra attempts.
pub async fn read_with_backoff<T, F, Fut>(label: &str, mut operation: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut retries = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && retries < MAX_READ_RETRIES => {
                let delay = BASE_DELAY * 2_u32.pow(retries);
                retries += 1;
                warn!("{label} failed ({err}); retry {retries}/{MAX_READ_RETRIES} in {delay:?}");
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, ExternalErrorKind};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn store_error() -> Error {
        Error {
            source: None,
            error_kind: DomainErrorKind::External(ExternalErrorKind::Store),
        }
    }

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = read_with_backoff("find client", move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(store_error())
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_bounded_retries() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), Error> = read_with_backoff("find client", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(store_error())
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_READ_RETRIES + 1);
    }

    #[tokio::test]
    async fn does_not_retry_business_errors() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), Error> = read_with_backoff("find client", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Error::not_found())
        })
        .await;

        assert!(result.unwrap_err().is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
