use crate::fallback::panic_message;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cron::Schedule;
use crewforge_core::{CrewforgeError, CrewforgeResult};
use futures_util::future::join_all;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// When a job should fire.
pub trait TriggerSchedule: Send + Sync {
    /// First fire time strictly after `after`, if any.
    fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>>;
    fn describe(&self) -> String;
}

/// A 7-field cron expression: sec min hour day-of-month month day-of-week year.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    schedule: Schedule,
}

impl CronSchedule {
    pub fn parse(expression: &str) -> CrewforgeResult<Self> {
        Ok(Self {
            expression: expression.to_string(),
            schedule: Scheduler::parse_cron(expression)?,
        })
    }
}

impl TriggerSchedule for CronSchedule {
    fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    fn describe(&self) -> String {
        self.expression.clone()
    }
}

/// Fires at a fixed interval after the previous firing completes.
#[derive(Debug, Clone, Copy)]
pub struct IntervalSchedule {
    every: Duration,
}

impl IntervalSchedule {
    pub fn new(every: Duration) -> Self {
        Self { every }
    }
}

impl TriggerSchedule for IntervalSchedule {
    fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        chrono::Duration::from_std(self.every)
            .ok()
            .and_then(|d| after.checked_add_signed(d))
    }

    fn describe(&self) -> String {
        format!("every {:?}", self.every)
    }
}

/// The callback a job runs on each firing. Must not fail: errors are the
/// action's own business.
#[async_trait]
pub trait JobAction: Send + Sync {
    async fn fire(&self);
}

/// A named trigger bound to an action.
#[derive(Clone)]
pub struct ScheduledJob {
    pub name: String,
    pub schedule: Arc<dyn TriggerSchedule>,
    pub action: Arc<dyn JobAction>,
    pub enabled: bool,
}

impl ScheduledJob {
    pub fn new(
        name: impl Into<String>,
        schedule: Arc<dyn TriggerSchedule>,
        action: Arc<dyn JobAction>,
    ) -> Self {
        Self {
            name: name.into(),
            schedule,
            action,
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

impl std::fmt::Debug for ScheduledJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledJob")
            .field("name", &self.name)
            .field("schedule", &self.schedule.describe())
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Drives a collection of [`ScheduledJob`]s.
///
/// Each enabled job gets its own driver loop that runs firings inline, so a
/// job never overlaps its previous firing. A firing that comes due while the
/// previous one is still running is skipped, not queued.
#[derive(Debug)]
pub struct Scheduler {
    jobs: Vec<ScheduledJob>,
}

impl Scheduler {
    pub fn new(jobs: Vec<ScheduledJob>) -> Self {
        Self { jobs }
    }

    /// Parse a 7-field cron expression.
    pub fn parse_cron(cron_expr: &str) -> CrewforgeResult<Schedule> {
        Schedule::from_str(cron_expr).map_err(|e| {
            CrewforgeError::Config(format!("Invalid cron expression '{cron_expr}': {e}"))
        })
    }

    /// The first upcoming fire time of `cron_expr` after now.
    pub fn next_fire_time(cron_expr: &str) -> CrewforgeResult<DateTime<Utc>> {
        let schedule = Self::parse_cron(cron_expr)?;
        schedule.upcoming(Utc).next().ok_or_else(|| {
            CrewforgeError::Config(format!(
                "Cron expression '{cron_expr}' has no upcoming fire times"
            ))
        })
    }

    pub fn jobs(&self) -> &[ScheduledJob] {
        &self.jobs
    }

    pub fn enabled_jobs(&self) -> Vec<&ScheduledJob> {
        self.jobs.iter().filter(|j| j.enabled).collect()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Spawn one driver loop per enabled job. The returned handle completes
    /// only when every loop has ended; abort it to stop the scheduler.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        let drivers: Vec<_> = self
            .jobs
            .into_iter()
            .filter(|j| j.enabled)
            .map(|job| tokio::spawn(drive(job)))
            .collect();
        info!(jobs = drivers.len(), "Scheduler started");

        tokio::spawn(async move {
            let _guard = AbortOnDrop(drivers.iter().map(|d| d.abort_handle()).collect());
            join_all(drivers).await;
        })
    }
}

/// Aborts the driver loops when the scheduler handle is aborted or dropped
/// mid-await.
struct AbortOnDrop(Vec<tokio::task::AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

async fn drive(job: ScheduledJob) {
    loop {
        let now = Utc::now();
        let Some(next) = job.schedule.next_after(now) else {
            warn!(job = %job.name, "Job has no upcoming fire times, stopping its driver");
            return;
        };
        let wait = (next - now).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        info!(job = %job.name, "Firing scheduled job");
        if let Err(panic) = AssertUnwindSafe(job.action.fire()).catch_unwind().await {
            error!(job = %job.name, error = %panic_message(panic.as_ref()), "Scheduled job panicked");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Slow {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        fires: AtomicUsize,
    }

    #[async_trait]
    impl JobAction for Slow {
        async fn fire(&self) {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.fires.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(250)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    struct Panicky(AtomicUsize);

    #[async_trait]
    impl JobAction for Panicky {
        async fn fire(&self) {
            if self.0.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first firing fails");
            }
        }
    }

    struct Noop;

    #[async_trait]
    impl JobAction for Noop {
        async fn fire(&self) {}
    }

    #[test]
    fn test_parse_valid_cron() {
        assert!(Scheduler::parse_cron("0 0 */4 * * * *").is_ok());
        assert!(Scheduler::parse_cron("0 */30 * * * * *").is_ok());
    }

    #[test]
    fn test_parse_invalid_cron() {
        let err = Scheduler::parse_cron("every four hours").unwrap_err();
        assert!(err.to_string().contains("Invalid cron expression"));
    }

    #[test]
    fn test_next_fire_time_is_future() {
        let next = Scheduler::next_fire_time("0 0 * * * * *").unwrap();
        assert!(next > Utc::now());
    }

    #[test]
    fn test_cron_schedule_next_after() {
        let schedule = CronSchedule::parse("0 0 8 * * * *").unwrap();
        let after = DateTime::parse_from_rfc3339("2026-01-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let next = schedule.next_after(after).unwrap();
        assert_eq!(next.to_rfc3339(), "2026-01-02T08:00:00+00:00");
        assert_eq!(schedule.describe(), "0 0 8 * * * *");
    }

    #[test]
    fn test_enabled_jobs_filter() {
        let every = Arc::new(IntervalSchedule::new(Duration::from_secs(60)));
        let scheduler = Scheduler::new(vec![
            ScheduledJob::new("a", every.clone(), Arc::new(Noop)),
            ScheduledJob::new("b", every, Arc::new(Noop)).disabled(),
        ]);
        assert_eq!(scheduler.job_count(), 2);
        assert_eq!(scheduler.enabled_jobs().len(), 1);
        assert_eq!(scheduler.enabled_jobs()[0].name, "a");
    }

    #[tokio::test(start_paused = true)]
    async fn test_firings_never_overlap() {
        let action = Arc::new(Slow {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            fires: AtomicUsize::new(0),
        });
        let scheduler = Scheduler::new(vec![ScheduledJob::new(
            "slow",
            Arc::new(IntervalSchedule::new(Duration::from_millis(100))),
            action.clone(),
        )]);
        let handle = scheduler.start();
        tokio::time::sleep(Duration::from_secs(2)).await;
        handle.abort();

        assert_eq!(action.peak.load(Ordering::SeqCst), 1);
        assert!(action.fires.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_job_keeps_its_driver_alive() {
        let action = Arc::new(Panicky(AtomicUsize::new(0)));
        let scheduler = Scheduler::new(vec![ScheduledJob::new(
            "panicky",
            Arc::new(IntervalSchedule::new(Duration::from_millis(100))),
            action.clone(),
        )]);
        let handle = scheduler.start();
        tokio::time::sleep(Duration::from_millis(550)).await;
        handle.abort();
        assert!(action.0.load(Ordering::SeqCst) >= 2);
    }
}
