use crewforge_core::{CrewforgeError, CrewforgeResult};
use futures_util::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Default pause between consecutive batches.
pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_secs(2);

/// Anything a workflow can be fanned out over.
pub trait EntityKey {
    fn entity_id(&self) -> String;
}

impl EntityKey for String {
    fn entity_id(&self) -> String {
        self.clone()
    }
}

/// The captured result of one entity's workflow. Failures and panics both
/// land here instead of aborting siblings.
#[derive(Debug)]
pub struct EntityOutcome<T> {
    pub entity_id: String,
    pub result: CrewforgeResult<T>,
}

/// Summary of a batched fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    pub groups: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Distributes one workflow across many entities under bounded concurrency.
#[derive(Debug, Clone)]
pub struct ConcurrencyScheduler {
    batch_pause: Duration,
}

impl Default for ConcurrencyScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_PAUSE)
    }
}

impl ConcurrencyScheduler {
    pub fn new(batch_pause: Duration) -> Self {
        Self { batch_pause }
    }

    pub fn batch_pause(&self) -> Duration {
        self.batch_pause
    }

    /// Run `workflow` over `entities` in consecutive groups of `batch_size`.
    ///
    /// Every invocation in a group runs concurrently; groups run one after
    /// another with the batch pause in between. Each group's outcomes are
    /// handed to `process` before the next group starts. Completion order
    /// within a group is not preserved.
    pub async fn fan_out<E, T, W, Fut, P, PFut>(
        &self,
        entities: Vec<E>,
        batch_size: usize,
        workflow: W,
        mut process: P,
    ) -> FanOutReport
    where
        E: EntityKey,
        T: Send + 'static,
        W: Fn(E) -> Fut,
        Fut: Future<Output = CrewforgeResult<T>> + Send + 'static,
        P: FnMut(Vec<EntityOutcome<T>>) -> PFut,
        PFut: Future<Output = ()>,
    {
        let batch_size = batch_size.max(1);
        let total = entities.len();
        let mut report = FanOutReport::default();
        let mut remaining = entities.into_iter().peekable();

        while remaining.peek().is_some() {
            if report.groups > 0 && !self.batch_pause.is_zero() {
                tokio::time::sleep(self.batch_pause).await;
            }
            report.groups += 1;

            let handles: Vec<(String, JoinHandle<CrewforgeResult<T>>)> = remaining
                .by_ref()
                .take(batch_size)
                .map(|entity| (entity.entity_id(), tokio::spawn(workflow(entity))))
                .collect();
            info!(group = report.groups, size = handles.len(), total, "Fan-out group started");

            let outcomes = gather(handles).await;
            for outcome in &outcomes {
                match &outcome.result {
                    Ok(_) => report.succeeded += 1,
                    Err(e) => {
                        report.failed += 1;
                        error!(entity_id = %outcome.entity_id, error = %e, "Entity workflow failed");
                    }
                }
            }
            process(outcomes).await;
        }

        info!(
            groups = report.groups,
            succeeded = report.succeeded,
            failed = report.failed,
            "Fan-out complete"
        );
        report
    }

    /// Schedule `workflow` for every item at once, letting at most
    /// `max_concurrent` bodies execute at any instant. No pauses, no timeout.
    pub async fn fan_out_bounded<E, T, W, Fut>(
        &self,
        items: Vec<E>,
        max_concurrent: usize,
        workflow: W,
    ) -> Vec<EntityOutcome<T>>
    where
        E: EntityKey + Send + 'static,
        T: Send + 'static,
        W: Fn(E) -> Fut,
        Fut: Future<Output = CrewforgeResult<T>> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));

        let handles = items
            .into_iter()
            .map(|item| {
                let entity_id = item.entity_id();
                let semaphore = semaphore.clone();
                let body = workflow(item);
                let handle = tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.map_err(|e| {
                        CrewforgeError::Orchestrator(format!("Semaphore error: {e}"))
                    })?;
                    body.await
                });
                (entity_id, handle)
            })
            .collect();

        gather(handles).await
    }
}

async fn gather<T>(handles: Vec<(String, JoinHandle<CrewforgeResult<T>>)>) -> Vec<EntityOutcome<T>> {
    let (ids, handles): (Vec<String>, Vec<_>) = handles.into_iter().unzip();
    join_all(handles)
        .await
        .into_iter()
        .zip(ids)
        .map(|(joined, entity_id)| {
            let result = joined.unwrap_or_else(|e| {
                Err(CrewforgeError::Orchestrator(format!(
                    "workflow task for {entity_id} panicked: {e}"
                )))
            });
            EntityOutcome { entity_id, result }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Barrier;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("user-{i}")).collect()
    }

    #[tokio::test]
    async fn test_groups_are_ceil_of_n_over_b() {
        let scheduler = ConcurrencyScheduler::new(Duration::ZERO);
        let report = scheduler
            .fan_out(ids(11), 5, |id| async move { Ok(id) }, |_| async {})
            .await;
        assert_eq!(report.groups, 3);
        assert_eq!(report.succeeded, 11);
    }

    #[tokio::test]
    async fn test_zero_batch_size_is_clamped() {
        let scheduler = ConcurrencyScheduler::new(Duration::ZERO);
        let report = scheduler
            .fan_out(ids(3), 0, |id| async move { Ok(id) }, |_| async {})
            .await;
        assert_eq!(report.groups, 3);
    }

    #[tokio::test]
    async fn test_empty_input_runs_no_groups() {
        let scheduler = ConcurrencyScheduler::default();
        let report = scheduler
            .fan_out(Vec::<String>::new(), 5, |id| async move { Ok(id) }, |_| async {})
            .await;
        assert_eq!(report, FanOutReport::default());
    }

    #[tokio::test]
    async fn test_group_members_run_concurrently() {
        // Every member waits on a barrier sized to the group; sequential
        // execution would never get past it.
        let barrier = Arc::new(Barrier::new(4));
        let scheduler = ConcurrencyScheduler::new(Duration::ZERO);
        let report = scheduler
            .fan_out(
                ids(8),
                4,
                |id| {
                    let barrier = barrier.clone();
                    async move {
                        barrier.wait().await;
                        Ok(id)
                    }
                },
                |_| async {},
            )
            .await;
        assert_eq!(report.succeeded, 8);
    }

    #[tokio::test]
    async fn test_failures_and_panics_are_isolated() {
        let scheduler = ConcurrencyScheduler::new(Duration::ZERO);
        let mut seen = Vec::new();
        let report = scheduler
            .fan_out(
                ids(6),
                3,
                |id| async move {
                    match id.as_str() {
                        "user-1" => Err(CrewforgeError::AgentExecution("boom".into())),
                        "user-4" => panic!("worker crashed"),
                        _ => Ok(id),
                    }
                },
                |outcomes| {
                    seen.extend(outcomes.into_iter().map(|o| (o.entity_id, o.result.is_ok())));
                    async {}
                },
            )
            .await;
        assert_eq!(report.succeeded, 4);
        assert_eq!(report.failed, 2);
        assert_eq!(seen.len(), 6);
        assert!(seen.contains(&("user-4".to_string(), false)));
        assert!(seen.contains(&("user-5".to_string(), true)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_only_between_groups() {
        let scheduler = ConcurrencyScheduler::new(Duration::from_secs(2));
        let start = tokio::time::Instant::now();
        scheduler
            .fan_out(ids(6), 2, |id| async move { Ok(id) }, |_| async {})
            .await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(4));
        assert!(elapsed < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_bounded_never_exceeds_limit() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let scheduler = ConcurrencyScheduler::default();
        let outcomes = scheduler
            .fan_out_bounded(ids(20), 3, |id| {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(id)
                }
            })
            .await;
        assert_eq!(outcomes.len(), 20);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }
}
