use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::contract::{Task, WorkFinder, Worker};
use super::dispatch::{Dispatcher, TickReport};
use super::registry::WorkerRegistry;
use crate::config::SchedulerConfig;
use crate::{Error, Result};

/// Events emitted by the scheduler to notify the hosting process
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// A tick finished (also sent for ticks that found nothing)
    TickCompleted(TickReport),
    /// A task execution failed
    TaskFailed {
        worker: String,
        task: String,
        message: String,
        retryable: bool,
    },
}

/// Scheduler settings
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Readiness category; a worker must be registered under this name
    pub category: String,
    /// Time between ticks. The first tick fires one interval after `start`.
    pub interval: Duration,
    /// Upper bound on concurrent executions within one tick
    pub max_concurrency: usize,
}

impl SchedulerOptions {
    pub fn new(category: impl Into<String>, interval: Duration) -> Self {
        Self {
            category: category.into(),
            interval,
            ..Self::default()
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            category: config.category.clone(),
            interval: Duration::from_secs(config.interval_secs),
            max_concurrency: config.max_concurrency,
        }
    }
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            category: "ready".to_string(),
            interval: Duration::from_secs(10),
            max_concurrency: 10,
        }
    }
}

struct RunningLoop {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Recurring scheduler: every interval, discover work for each registered
/// worker and execute it.
///
/// Lifecycle is `Stopped -> start() -> Running -> stop() -> Stopped`, and a
/// stopped scheduler can be started again. Ticks never overlap. When a tick
/// outlasts the interval, the elapsed ticks collapse into one that runs as
/// soon as the slow tick finishes; the schedule then continues on the
/// original interval grid.
pub struct WorkScheduler<T: Task> {
    dispatcher: Dispatcher<T>,
    options: SchedulerOptions,
    running: Option<RunningLoop>,
}

impl<T: Task> WorkScheduler<T> {
    /// Validate the configuration and build a stopped scheduler.
    ///
    /// Fails with [`Error::Config`] when the interval or concurrency is zero,
    /// the worker list is empty, two workers share a name, or no worker is
    /// registered under `options.category`.
    pub fn new(
        finder: Arc<dyn WorkFinder<T>>,
        workers: Vec<Arc<dyn Worker<T>>>,
        options: SchedulerOptions,
    ) -> Result<Self> {
        if options.interval.is_zero() {
            return Err(Error::Config("scheduler interval must be greater than 0".to_string()));
        }
        if options.max_concurrency == 0 {
            return Err(Error::Config("max_concurrency must be greater than 0".to_string()));
        }
        if workers.is_empty() {
            return Err(Error::Config("scheduler needs at least one worker".to_string()));
        }

        let registry = WorkerRegistry::from_workers(workers)?;
        if !registry.contains(&options.category) {
            return Err(Error::Config(format!(
                "no worker registered for category '{}' (registered: {})",
                options.category,
                registry.names().join(", ")
            )));
        }

        Ok(Self {
            dispatcher: Dispatcher::new(finder, registry, options.max_concurrency),
            options,
            running: None,
        })
    }

    /// Set the event sender for tick and failure notifications
    pub fn with_event_sender(mut self, tx: mpsc::UnboundedSender<SchedulerEvent>) -> Self {
        self.dispatcher.set_event_sender(tx);
        self
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    pub fn worker_names(&self) -> Vec<&str> {
        self.dispatcher.registry().names()
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .map(|running| !running.handle.is_finished())
            .unwrap_or(false)
    }

    /// Begin ticking every interval. Must be called from within a tokio
    /// runtime. Starting a running scheduler is a no-op.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            warn!("Scheduler already running");
            return Ok(());
        }

        let period = self.options.interval;
        let first_tick = Instant::now().checked_add(period).ok_or_else(|| {
            Error::Config(format!("scheduler interval is out of range: {:?}", period))
        })?;
        let mut interval = tokio::time::interval_at(first_tick, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let dispatcher = self.dispatcher.clone();
        let handle = tokio::spawn(run_loop(dispatcher, interval, shutdown_rx));

        info!(
            "Scheduler started: category='{}', interval={}s, workers=[{}]",
            self.options.category,
            period.as_secs_f64(),
            self.worker_names().join(", ")
        );

        self.running = Some(RunningLoop {
            shutdown_tx,
            handle,
        });
        Ok(())
    }

    /// Stop ticking. A tick already in progress runs to completion before
    /// this returns; no tick begins afterwards.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            debug!("Scheduler is not running");
            return;
        };

        let _ = running.shutdown_tx.send(true);
        if let Err(e) = running.handle.await {
            warn!("Scheduler loop ended abnormally: {}", e);
        }

        info!("Scheduler stopped");
    }

    /// Run a single tick immediately (for manual runs). Waits for a tick
    /// already in progress instead of overlapping it.
    pub async fn run_once(&self) -> TickReport {
        self.dispatcher.run_tick().await
    }
}

async fn run_loop<T: Task>(
    dispatcher: Dispatcher<T>,
    mut interval: tokio::time::Interval,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;

            result = shutdown.changed() => {
                if result.is_err() || *shutdown.borrow() {
                    info!("Scheduler received shutdown signal");
                    break;
                }
            }

            _ = interval.tick() => {
                debug!("Running scheduled tick");
                dispatcher.run_tick().await;
            }
        }
    }
}
