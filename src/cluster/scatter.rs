//! Concurrent fan-out across nodes.
//!
//! # Responsibilities
//! - Run one operation per node index concurrently
//! - Wait for every operation, never cancelling siblings on failure
//! - Report the error of the lowest failing index
//!
//! # Design Decisions
//! - Each operation runs on its own spawned task, so it finishes even when
//!   the caller stops waiting (timeout or drop)
//! - Failures beyond the reported one are emitted as debug events
//! - A panic in any operation is re-raised after all siblings complete

use std::fmt::Display;
use std::future::Future;

use futures_util::future::join_all;

/// Run `op(i)` for every `i` in `0..n` and return each outcome in index order.
pub async fn scatter_each<F, Fut, T, E>(n: usize, op: F) -> Vec<Result<T, E>>
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let handles: Vec<_> = (0..n).map(|i| tokio::spawn(op(i))).collect();

    join_all(handles)
        .await
        .into_iter()
        .map(|joined| match joined {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => panic!("fan-out task did not complete: {}", e),
        })
        .collect()
}

/// Separate index-ordered outcomes into the successful values and the
/// lowest-index failure, if any.
///
/// Values stay index-aligned only when there is no failure.
pub fn split_outcomes<T, E: Display>(outcomes: Vec<Result<T, E>>) -> (Vec<T>, Option<(usize, E)>) {
    let mut values = Vec::with_capacity(outcomes.len());
    let mut reported = None;

    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(v) => values.push(v),
            Err(e) if reported.is_none() => reported = Some((index, e)),
            Err(e) => tracing::debug!(index, error = %e, "Suppressed fan-out failure"),
        }
    }

    (values, reported)
}

/// Collapse index-ordered outcomes into all values or the first error.
pub fn first_error<T, E: Display>(outcomes: Vec<Result<T, E>>) -> Result<Vec<T>, E> {
    match split_outcomes(outcomes) {
        (_, Some((_, e))) => Err(e),
        (values, None) => Ok(values),
    }
}

/// Like [`scatter_each`], returning all outputs or the lowest-index error.
pub async fn scatter_map<F, Fut, T, E>(n: usize, op: F) -> Result<Vec<T>, E>
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
{
    first_error(scatter_each(n, op).await)
}

/// Run `op(i)` for every `i` in `0..n`, wait for all, report the first error
/// in index order.
pub async fn scatter<F, Fut, E>(n: usize, op: F) -> Result<(), E>
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    scatter_map(n, op).await.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    struct NodeDown(usize);

    impl Display for NodeDown {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "node {} down", self.0)
        }
    }

    #[tokio::test]
    async fn test_invokes_every_index_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let result: Result<(), NodeDown> = scatter(6, move |i| {
            let s = s.clone();
            async move {
                s.lock().unwrap().push(i);
                Ok(())
            }
        })
        .await;

        assert!(result.is_ok());
        let mut seen = seen.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_zero_operations() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let result: Result<(), NodeDown> = scatter(0, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_single_failure_still_runs_all() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let result = scatter(5, move |i| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                if i == 2 {
                    Err(NodeDown(i))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert_eq!(result, Err(NodeDown(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_lowest_index_wins_regardless_of_timing() {
        for _ in 0..20 {
            // Index 1 fails last, index 3 fails first.
            let result = scatter(5, |i| async move {
                match i {
                    1 => {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Err(NodeDown(1))
                    }
                    3 => Err(NodeDown(3)),
                    4 => {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        Err(NodeDown(4))
                    }
                    _ => Ok(()),
                }
            })
            .await;
            assert_eq!(result, Err(NodeDown(1)));
        }
    }

    #[tokio::test]
    async fn test_slow_siblings_complete_before_return() {
        let done = Arc::new(AtomicUsize::new(0));
        let d = done.clone();
        let result = scatter(4, move |i| {
            let d = d.clone();
            async move {
                if i == 0 {
                    return Err(NodeDown(0));
                }
                tokio::time::sleep(Duration::from_millis(10 * i as u64)).await;
                d.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        assert_eq!(result, Err(NodeDown(0)));
        assert_eq!(done.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_abandoned_wait_does_not_cancel_operations() {
        let done = Arc::new(AtomicUsize::new(0));
        let d = done.clone();
        let waited = tokio::time::timeout(
            Duration::from_millis(10),
            scatter(3, move |_| {
                let d = d.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    d.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, NodeDown>(())
                }
            }),
        )
        .await;

        assert!(waited.is_err());
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_scatter_map_keeps_index_alignment() {
        let values = scatter_map(4, |i| async move {
            tokio::time::sleep(Duration::from_millis(((4 - i) * 5) as u64)).await;
            Ok::<_, NodeDown>(i * 10)
        })
        .await
        .unwrap();
        assert_eq!(values, vec![0, 10, 20, 30]);
    }

    #[tokio::test]
    async fn test_scatter_each_reports_every_node() {
        let outcomes = scatter_each(4, |i| async move {
            if i % 2 == 1 {
                Err(NodeDown(i))
            } else {
                Ok(i)
            }
        })
        .await;
        assert_eq!(
            outcomes,
            vec![Ok(0), Err(NodeDown(1)), Ok(2), Err(NodeDown(3))]
        );
    }

    #[test]
    fn test_split_outcomes_reports_lowest_index() {
        let (values, failure) =
            split_outcomes(vec![Ok(1), Err(NodeDown(1)), Ok(3), Err(NodeDown(3))]);
        assert_eq!(values, vec![1, 3]);
        assert_eq!(failure, Some((1, NodeDown(1))));
    }

    #[tokio::test]
    #[should_panic(expected = "boom")]
    async fn test_panic_propagates() {
        let _ = scatter(3, |i| async move {
            if i == 1 {
                panic!("boom");
            }
            Ok::<_, NodeDown>(())
        })
        .await;
    }
}
