use std::{collections::BTreeSet, sync::Arc, time::Duration};

use thiserror::Error;
use tokio::{
    sync::{Semaphore, watch},
    task::{JoinError, JoinHandle, JoinSet},
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use taskminder_models::{
    settings::SchedulerSettings,
    task::{Task, TaskId},
};
use taskminder_storage::TaskStorage;

use crate::{
    Clock, DispatchError, DueTaskScanner, MessageTemplate, NotificationDispatcher,
    NotificationTransport, ScanError, SystemClock, TaskOutcome,
};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum SchedulerConfigError {
    #[error("scheduler interval must be greater than zero")]
    ZeroInterval,

    #[error("dispatch concurrency must be at least one")]
    ZeroConcurrency,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub dispatch_concurrency: usize,
    pub skip_completed: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            dispatch_concurrency: 1,
            skip_completed: false,
        }
    }
}

impl SchedulerConfig {
    pub fn from_settings(settings: &SchedulerSettings) -> Result<Self, SchedulerConfigError> {
        if settings.interval_secs == 0 {
            return Err(SchedulerConfigError::ZeroInterval);
        }
        if settings.dispatch_concurrency == 0 {
            return Err(SchedulerConfigError::ZeroConcurrency);
        }

        Ok(Self {
            interval: Duration::from_secs(settings.interval_secs),
            dispatch_concurrency: settings.dispatch_concurrency,
            skip_completed: settings.skip_completed,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Scanning,
    Dispatching,
}

/// What happened during a single tick.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Per-task results, ordered by task id.
    pub results: Vec<(TaskId, TaskOutcome)>,
    /// Due tasks left untouched because cancellation was requested first.
    pub not_attempted: Vec<TaskId>,
}

impl TickReport {
    pub fn due(&self) -> usize {
        self.results.len() + self.not_attempted.len()
    }

    pub fn committed(&self) -> Vec<TaskId> {
        self.results
            .iter()
            .filter(|(_, result)| result.is_ok())
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = (TaskId, &DispatchError)> {
        self.results
            .iter()
            .filter_map(|(id, result)| result.as_ref().err().map(|error| (*id, error)))
    }
}

/// Periodically scans the store for due tasks and dispatches their reminders.
///
/// Ticks never overlap. When a tick outlives the interval the missed ticks are
/// skipped, not queued.
pub struct DueTaskScheduler {
    config: SchedulerConfig,
    scanner: DueTaskScanner,
    dispatcher: Arc<NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    state: watch::Sender<SchedulerState>,
}

impl DueTaskScheduler {
    pub fn new(
        config: SchedulerConfig,
        storage: Arc<dyn TaskStorage>,
        transport: Arc<dyn NotificationTransport>,
        recipient: impl Into<String>,
    ) -> Self {
        let scanner =
            DueTaskScanner::new(Arc::clone(&storage)).skip_completed(config.skip_completed);
        let dispatcher = NotificationDispatcher::new(storage, transport, recipient);
        let (state, _) = watch::channel(SchedulerState::Idle);

        Self {
            config,
            scanner,
            dispatcher: Arc::new(dispatcher),
            clock: Arc::new(SystemClock),
            state,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_template(mut self, template: MessageTemplate) -> Self {
        let dispatcher = NotificationDispatcher::clone(&self.dispatcher).with_template(template);
        self.dispatcher = Arc::new(dispatcher);
        self
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Spawns the scheduling loop on the current runtime.
    pub fn start(self) -> SchedulerHandle {
        let cancellation_token = CancellationToken::new();
        let task_cancellation_token = cancellation_token.child_token();
        let state = self.state.subscribe();

        let task_handle = tokio::spawn(async move {
            self.run(task_cancellation_token).await;
        });

        SchedulerHandle {
            task_handle,
            cancellation_token,
            state,
        }
    }

    /// Runs ticks until `cancellation_token` is cancelled. The first tick
    /// happens immediately.
    pub async fn run(self, cancellation_token: CancellationToken) {
        let interval = if self.config.interval.is_zero() {
            log::warn!("Zero scheduler interval, using {:?}", DEFAULT_INTERVAL);
            DEFAULT_INTERVAL
        } else {
            self.config.interval
        };

        log::info!(
            "Starting due-task scheduler [interval = {:?}, dispatch_concurrency = {}, skip_completed = {}]",
            interval,
            self.config.dispatch_concurrency,
            self.config.skip_completed
        );

        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancellation_token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let started = Instant::now();
            match self.tick(&cancellation_token).await {
                Ok(report) => log_report(&report),
                Err(error) => log::warn!("{}; skipping this tick", error),
            }

            let elapsed = started.elapsed();
            if elapsed > interval {
                log::warn!(
                    "Tick took {:?}, longer than the {:?} interval; missed ticks are skipped",
                    elapsed,
                    interval
                );
            }
        }

        self.state.send_replace(SchedulerState::Idle);
        log::info!("Due-task scheduler stopped");
    }

    /// One scan-and-dispatch cycle at the clock's current time.
    ///
    /// Cancellation is checked between tasks; a delivery that already started
    /// runs to completion and gets committed.
    pub async fn tick(
        &self,
        cancellation_token: &CancellationToken,
    ) -> Result<TickReport, ScanError> {
        self.state.send_replace(SchedulerState::Scanning);
        let now = self.clock.now();
        log::debug!("Checking for due tasks [now = {}]", now);

        let tasks = match self.scanner.fetch_due_tasks(now).await {
            Ok(tasks) => tasks,
            Err(error) => {
                self.state.send_replace(SchedulerState::Idle);
                return Err(error);
            }
        };

        if tasks.is_empty() {
            self.state.send_replace(SchedulerState::Idle);
            return Ok(TickReport::default());
        }

        log::info!("Found due tasks [count = {}]", tasks.len());
        self.state.send_replace(SchedulerState::Dispatching);
        let report = self.dispatch_batch(tasks, cancellation_token).await;
        self.state.send_replace(SchedulerState::Idle);

        Ok(report)
    }

    async fn dispatch_batch(
        &self,
        tasks: Vec<Task>,
        cancellation_token: &CancellationToken,
    ) -> TickReport {
        let semaphore = Arc::new(Semaphore::new(self.config.dispatch_concurrency.max(1)));
        let mut in_flight = JoinSet::new();
        let mut pending = BTreeSet::new();
        let mut report = TickReport::default();
        let mut tasks = tasks.into_iter();

        while let Some(task) = tasks.next() {
            let permit = tokio::select! {
                biased;
                _ = cancellation_token.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };

            let Some(permit) = permit else {
                report.not_attempted.push(task.id);
                report.not_attempted.extend(tasks.by_ref().map(|task| task.id));
                break;
            };

            pending.insert(task.id);
            let dispatcher = Arc::clone(&self.dispatcher);
            in_flight.spawn(async move {
                let _permit = permit;
                let result = dispatcher.process(&task).await;
                (task.id, result)
            });
        }

        while let Some(joined) = in_flight.join_next().await {
            match joined {
                Ok((task_id, result)) => {
                    pending.remove(&task_id);
                    report.results.push((task_id, result));
                }
                Err(error) => log::error!("Dispatch worker failed [error = {}]", error),
            }
        }

        // Whatever is still pending belongs to a worker that panicked.
        for task_id in pending {
            let error = DispatchError::Panicked { task_id };
            log::error!(
                "[DUPLICATE RISK] {}; the reminder may already be sent and will be sent again next tick",
                error
            );
            report.results.push((task_id, Err(error)));
        }

        report.results.sort_by_key(|(task_id, _)| *task_id);

        if !report.not_attempted.is_empty() {
            log::info!(
                "Cancellation requested, leaving due tasks for a later run [count = {}]",
                report.not_attempted.len()
            );
        }

        report
    }
}

fn log_report(report: &TickReport) {
    if report.due() == 0 {
        log::debug!("No due tasks");
        return;
    }

    let failed = report.failures().count();
    log::info!(
        "Tick finished [due = {}, committed = {}, failed = {}, not_attempted = {}]",
        report.due(),
        report.results.len() - failed,
        failed,
        report.not_attempted.len()
    );
}

#[derive(Debug, Error)]
pub enum StopError {
    #[error("scheduler did not stop within {0:?}")]
    TimedOut(Duration),

    #[error("scheduler task failed: {0}")]
    Failed(#[from] JoinError),
}

/// Handle to a running [`DueTaskScheduler`].
pub struct SchedulerHandle {
    task_handle: JoinHandle<()>,
    cancellation_token: CancellationToken,
    state: watch::Receiver<SchedulerState>,
}

impl SchedulerHandle {
    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task_handle.is_finished()
    }

    /// Requests a stop and waits up to `timeout` for the in-flight delivery to finish.
    /// On timeout the loop is aborted together with its in-flight deliveries.
    pub async fn stop(mut self, timeout: Duration) -> Result<(), StopError> {
        self.cancellation_token.cancel();
        match time::timeout(timeout, &mut self.task_handle).await {
            Ok(joined) => Ok(joined?),
            Err(_) => {
                self.task_handle.abort();
                log::warn!("Scheduler did not stop within {:?}, aborted", timeout);
                Err(StopError::TimedOut(timeout))
            }
        }
    }
}

/// Runs the reminder scheduler with default settings until `cancellation_token` fires.
pub async fn run_scheduler(
    interval: Duration,
    storage: Arc<dyn TaskStorage>,
    transport: Arc<dyn NotificationTransport>,
    recipient: impl Into<String>,
    cancellation_token: CancellationToken,
) {
    let config = SchedulerConfig {
        interval,
        ..SchedulerConfig::default()
    };

    DueTaskScheduler::new(config, storage, transport, recipient)
        .run(cancellation_token)
        .await
}
