//! Bounded-concurrency fan-out, used wherever a component needs to run
//! many short-lived, independent tasks without spawning one thread per
//! item: ping probes to every public peer, per-room status polls,
//! per-tool integrity checks.
//!
//! Plain `FuturesUnordered`-based fan-out with an explicit concurrency
//! cap, with no framing specific to any one kind of job.

use std::future::Future;

use futures::stream::{FuturesUnordered, StreamExt};

/// Default concurrency cap for [`do_jobs`]. Lower on macOS, where the
/// default per-process file-descriptor limit is tighter.
#[cfg(target_os = "macos")]
const JOBS: usize = 32;
#[cfg(not(target_os = "macos"))]
const JOBS: usize = 64;

/// Runs every future in `jobs` with at most [`JOBS`] running
/// concurrently, failing fast on the first error.
///
/// # Errors
/// Returns the first error encountered; remaining in-flight jobs are
/// dropped (and, for async tasks, cancelled).
pub async fn do_jobs<T, E>(
    jobs: impl Iterator<Item = impl Future<Output = Result<T, E>>>,
) -> Result<Vec<T>, E> {
    do_jobs_with_limit(jobs, JOBS).await
}

/// As [`do_jobs`], with an explicit concurrency cap.
///
/// # Errors
/// Returns the first error encountered.
pub async fn do_jobs_with_limit<T, E>(
    jobs: impl Iterator<Item = impl Future<Output = Result<T, E>>>,
    limit: usize,
) -> Result<Vec<T>, E> {
    let mut in_flight = FuturesUnordered::new();
    let mut results = Vec::new();

    for job in jobs {
        in_flight.push(job);
        if in_flight.len() >= limit {
            if let Some(result) = in_flight.next().await {
                results.push(result?);
            }
        }
    }
    while let Some(result) = in_flight.next().await {
        results.push(result?);
    }

    Ok(results)
}

const RETRY_LIMIT: usize = 5;

/// Calls `f` and, if it returns `Err`, calls it again up to
/// [`RETRY_LIMIT`] more times, returning the last result either way.
///
/// Used by the network optimizer around NIC-metric adjustment
/// commands that can transiently fail while the adapter settles, and by
/// the overlay supervisor around daemon-handshake probes.
///
/// # Errors
/// Returns the last error, if every attempt failed.
pub async fn retry<T, E, Res, Func>(mut f: Func) -> Result<T, E>
where
    Res: Future<Output = Result<T, E>>,
    Func: FnMut() -> Res,
{
    let mut last_err = None;
    for _ in 0..=RETRY_LIMIT {
        match f().await {
            Ok(t) => return Ok(t),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.expect("loop runs at least once"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn do_jobs_collects_all_results() {
        let jobs = (0..10).map(|i| async move { Ok::<_, String>(i * 2) });
        let results = do_jobs_with_limit(jobs, 3).await.unwrap();
        let mut sorted = results;
        sorted.sort_unstable();
        assert_eq!(sorted, (0..10).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn do_jobs_fails_fast_on_error() {
        let jobs = (0..5).map(|i| async move {
            if i == 3 {
                Err("boom".to_string())
            } else {
                Ok(i)
            }
        });
        let result = do_jobs_with_limit(jobs, 2).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn retry_succeeds_after_transient_failures() {
        let attempts = AtomicUsize::new(0);
        let result: Result<u32, &str> = retry(|| {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("not yet")
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_gives_up_after_limit() {
        let attempts = AtomicUsize::new(0);
        let result: Result<u32, &str> = retry(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err("always fails") }
        })
        .await;
        assert_eq!(result, Err("always fails"));
        assert_eq!(attempts.load(Ordering::SeqCst), RETRY_LIMIT + 1);
    }
}
