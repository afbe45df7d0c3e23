use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::contract::{Task, WorkFinder, Worker};
use super::registry::WorkerRegistry;
use super::service::SchedulerEvent;
use crate::{Error, Result};

/// Outcome counts for one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tasks returned by the finder across all routes
    pub discovered: u32,
    /// Tasks whose execution returned `Ok`
    pub succeeded: u32,
    /// Retryable failures; the record stays eligible
    pub failed: u32,
    /// Non-retryable failures; the finder was told to park the record
    pub abandoned: u32,
    /// Tasks whose required worker did not match the route they came from
    pub skipped: u32,
    /// Successful tasks whose completion transition failed
    pub completion_errors: u32,
    /// Routes whose discovery call failed
    pub discovery_errors: u32,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
            && self.abandoned == 0
            && self.completion_errors == 0
            && self.discovery_errors == 0
    }
}

/// Runs ticks: discovery, bounded fan-out of executions, completion.
///
/// Cheap to clone; the loop task and manual `run_once` calls share the same
/// tick lock, so ticks never overlap.
pub(crate) struct Dispatcher<T: Task> {
    finder: Arc<dyn WorkFinder<T>>,
    registry: Arc<WorkerRegistry<T>>,
    max_concurrency: usize,
    tick_lock: Arc<Mutex<()>>,
    event_tx: Option<mpsc::UnboundedSender<SchedulerEvent>>,
}

impl<T: Task> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            finder: Arc::clone(&self.finder),
            registry: Arc::clone(&self.registry),
            max_concurrency: self.max_concurrency,
            tick_lock: Arc::clone(&self.tick_lock),
            event_tx: self.event_tx.clone(),
        }
    }
}

impl<T: Task> Dispatcher<T> {
    pub(crate) fn new(
        finder: Arc<dyn WorkFinder<T>>,
        registry: WorkerRegistry<T>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            finder,
            registry: Arc::new(registry),
            max_concurrency,
            tick_lock: Arc::new(Mutex::new(())),
            event_tx: None,
        }
    }

    pub(crate) fn set_event_sender(&mut self, tx: mpsc::UnboundedSender<SchedulerEvent>) {
        self.event_tx = Some(tx);
    }

    pub(crate) fn registry(&self) -> &WorkerRegistry<T> {
        &self.registry
    }

    fn send_event(&self, event: SchedulerEvent) {
        if let Some(ref tx) = self.event_tx {
            if tx.send(event).is_err() {
                warn!("Failed to send scheduler event: receiver dropped");
            }
        }
    }

    /// Run one tick, waiting for any tick already in progress
    pub(crate) async fn run_tick(&self) -> TickReport {
        let _guard = self.tick_lock.lock().await;

        let mut report = TickReport::default();

        for (name, worker) in self.registry.routes() {
            let found = match self.finder.find_requested(name).await {
                Ok(found) => found,
                Err(e) => {
                    error!("Work discovery for '{}' failed: {}", name, e);
                    report.discovery_errors += 1;
                    continue;
                }
            };

            if found.is_empty() {
                debug!("No work found for '{}'", name);
                continue;
            }

            report.discovered += found.len() as u32;

            let mut tasks = Vec::with_capacity(found.len());
            for task in found {
                if task.worker_name() == name {
                    tasks.push(task);
                } else {
                    warn!(
                        "Task {} requires worker '{}' but was found under '{}', leaving it for later",
                        task,
                        task.worker_name(),
                        name
                    );
                    report.skipped += 1;
                }
            }

            debug!("Dispatching {} task(s) to '{}'", tasks.len(), name);
            self.execute_batch(worker, tasks, &mut report).await;
        }

        if report.discovered > 0 {
            info!(
                "Tick finished: {} discovered, {} succeeded, {} failed, {} abandoned",
                report.discovered, report.succeeded, report.failed, report.abandoned
            );
        }

        self.send_event(SchedulerEvent::TickCompleted(report.clone()));
        report
    }

    async fn execute_batch(
        &self,
        worker: &Arc<dyn Worker<T>>,
        tasks: Vec<T>,
        report: &mut TickReport,
    ) {
        let mut join_set: JoinSet<(Arc<T>, Result<()>)> = JoinSet::new();
        let mut pending = tasks.into_iter().map(Arc::new);

        // The execution runs in its own task so a panic surfaces as a
        // `JoinError` while the task value stays with the outer future.
        fn spawn_task<T: Task>(
            join_set: &mut JoinSet<(Arc<T>, Result<()>)>,
            worker: Arc<dyn Worker<T>>,
            task: Arc<T>,
        ) {
            join_set.spawn(async move {
                let running = Arc::clone(&task);
                let outcome = match tokio::spawn(async move { worker.execute(&running).await }).await {
                    Ok(outcome) => outcome,
                    Err(e) => Err(Error::Aborted(e.to_string())),
                };
                (task, outcome)
            });
        }

        for _ in 0..self.max_concurrency {
            if let Some(task) = pending.next() {
                spawn_task(&mut join_set, Arc::clone(worker), task);
            }
        }

        // Completion transitions are applied here, one at a time, rather
        // than from inside the spawned executions.
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((task, Ok(()))) => self.complete(worker.name(), &task, report).await,
                Ok((task, Err(e))) => self.fail(worker.name(), &task, e, report).await,
                Err(e) => {
                    error!("Execution wrapper for '{}' aborted: {}", worker.name(), e);
                    report.failed += 1;
                }
            }

            if let Some(task) = pending.next() {
                spawn_task(&mut join_set, Arc::clone(worker), task);
            }
        }
    }

    async fn complete(&self, worker: &str, task: &T, report: &mut TickReport) {
        report.succeeded += 1;

        match self.finder.mark_completed(task).await {
            Ok(()) => debug!("Completed work for '{}': {}", worker, task),
            Err(e) => {
                // At-least-once: the record is still eligible and the task
                // will run again on the next tick.
                report.completion_errors += 1;
                warn!(
                    "Work for '{}' succeeded but {} could not be marked completed: {}. It may run again on the next tick",
                    worker, task, e
                );
            }
        }
    }

    async fn fail(&self, worker: &str, task: &T, error: Error, report: &mut TickReport) {
        let retryable = error.is_retryable();

        if retryable {
            report.failed += 1;
            warn!("Unable to complete work for '{}' on {}: {}", worker, task, error);
        } else {
            report.abandoned += 1;
            error!(
                "Giving up on {} for '{}' (non-retryable): {}",
                task, worker, error
            );
        }

        if let Err(e) = self.finder.mark_failed(task, &error, retryable).await {
            warn!("Failed to record failure of {}: {}", task, e);
        }

        self.send_event(SchedulerEvent::TaskFailed {
            worker: worker.to_string(),
            task: task.to_string(),
            message: error.to_string(),
            retryable,
        });
    }
}
