use crate::error::{DevlicaError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Executes tasks in parallel, optionally under a concurrency limit
///
/// Every task runs on its own `tokio::spawn`. A failing task produces an
/// `Err` in its slot and siblings keep running. Under the unwinding panic
/// strategy a panicking task is reported the same way; release builds abort.
pub struct ParallelProcessor {
    semaphore: Option<Arc<Semaphore>>,
}

impl ParallelProcessor {
    /// Creates a new parallel processor with the specified concurrency limit
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Some(Arc::new(Semaphore::new(max_concurrent.max(1)))),
        }
    }

    /// Creates a processor that starts every task immediately
    pub fn unbounded() -> Self {
        Self { semaphore: None }
    }

    /// Processes a collection of futures concurrently and returns their results
    /// in submission order
    pub async fn process<F, T>(&self, tasks: Vec<F>) -> Vec<Result<T>>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let mut handles = Vec::with_capacity(tasks.len());

        for task in tasks {
            let semaphore = self.semaphore.clone();
            handles.push(tokio::spawn(async move {
                let _permit = match semaphore {
                    Some(semaphore) => Some(semaphore.acquire_owned().await.map_err(|e| {
                        DevlicaError::Network(format!("worker pool closed: {e}"))
                    })?),
                    None => None,
                };
                task.await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(match handle.await {
                Ok(result) => result,
                Err(e) => Err(DevlicaError::Network(format!("worker task failed: {e}"))),
            });
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    type BoxedTask<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

    fn boxed<T>(fut: impl Future<Output = Result<T>> + Send + 'static) -> BoxedTask<T> {
        Box::pin(fut)
    }

    #[tokio::test]
    async fn test_parallel_processing_keeps_order() {
        let processor = ParallelProcessor::new(3);

        let make_task = |duration: u64, value: i32| async move {
            sleep(Duration::from_millis(duration)).await;
            Ok::<_, DevlicaError>(value)
        };

        let tasks: Vec<_> = vec![
            boxed(make_task(100, 1)),
            boxed(make_task(50, 2)),
            boxed(make_task(200, 3)),
            boxed(make_task(75, 4)),
            boxed(make_task(150, 5)),
        ];

        let results = processor.process(tasks).await;

        let values: Vec<i32> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_error_handling() {
        let processor = ParallelProcessor::new(2);

        let tasks: Vec<_> = vec![
            boxed(async { Ok::<_, DevlicaError>(1) }),
            boxed(async { Err::<i32, _>(DevlicaError::Validation("Test error".into())) }),
            boxed(async { Ok::<_, DevlicaError>(3) }),
        ];

        let results = processor.process(tasks).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }

    #[tokio::test]
    async fn test_concurrency_limit_respected() {
        let processor = ParallelProcessor::new(2);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..6)
            .map(|_| {
                let active = active.clone();
                let peak = peak.clone();
                boxed(async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    sleep(Duration::from_millis(30)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, DevlicaError>(())
                })
            })
            .collect();

        processor.process(tasks).await;

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_panicking_task_does_not_abort_siblings() {
        let processor = ParallelProcessor::unbounded();

        let tasks: Vec<_> = vec![
            boxed(async { Ok::<_, DevlicaError>(1) }),
            boxed(async { panic!("boom") }),
            boxed(async { Ok::<_, DevlicaError>(3) }),
        ];

        let results = processor.process(tasks).await;

        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }
}
