//! In-memory finder and worker doubles shared by the scheduler tests.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::contract::{Task, WorkFinder, Worker};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestTask {
    pub key: String,
    pub worker: String,
}

impl fmt::Display for TestTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

impl Task for TestTask {
    fn worker_name(&self) -> &str {
        &self.worker
    }
}

#[derive(Debug, Clone)]
struct TestRecord {
    key: String,
    status: String,
    worker: Option<String>,
}

/// Records with a status column; `find_requested(name)` returns the ones
/// whose status equals `name`.
#[derive(Default)]
pub struct MemoryFinder {
    records: Mutex<Vec<TestRecord>>,
    find_calls: AtomicUsize,
    sticky: bool,
    fail_completion: AtomicBool,
    failure_counts: Mutex<HashMap<String, u32>>,
}

impl MemoryFinder {
    pub fn with_ready(keys: &[&str]) -> Self {
        let finder = Self::default();
        for key in keys {
            finder.push(key, "ready", None);
        }
        finder
    }

    /// Completed records stay ready, so every tick rediscovers them
    pub fn sticky(keys: &[&str]) -> Self {
        Self {
            sticky: true,
            ..Self::with_ready(keys)
        }
    }

    pub fn push(&self, key: &str, status: &str, worker: Option<&str>) {
        self.records.lock().unwrap().push(TestRecord {
            key: key.to_string(),
            status: status.to_string(),
            worker: worker.map(str::to_string),
        });
    }

    pub fn status_of(&self, key: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.key == key)
            .map(|r| r.status.clone())
    }

    /// How many times `mark_failed` was called for `key`
    pub fn failures_of(&self, key: &str) -> u32 {
        self.failure_counts.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn fail_completion(&self, fail: bool) {
        self.fail_completion.store(fail, Ordering::SeqCst);
    }

    fn set_status(&self, key: &str, status: &str) {
        if let Some(record) = self.records.lock().unwrap().iter_mut().find(|r| r.key == key) {
            record.status = status.to_string();
        }
    }
}

#[async_trait]
impl WorkFinder<TestTask> for MemoryFinder {
    async fn find_requested(&self, name: &str) -> Result<Vec<TestTask>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .filter(|r| r.status == name)
            .map(|r| TestTask {
                key: r.key.clone(),
                worker: r.worker.clone().unwrap_or_else(|| name.to_string()),
            })
            .collect())
    }

    async fn mark_completed(&self, task: &TestTask) -> Result<()> {
        if self.fail_completion.load(Ordering::SeqCst) {
            return Err(Error::Storage("store unavailable".to_string()));
        }
        if !self.sticky {
            self.set_status(&task.key, "completed");
        }
        Ok(())
    }

    async fn mark_failed(&self, task: &TestTask, _error: &Error, retryable: bool) -> Result<()> {
        *self.failure_counts.lock().unwrap().entry(task.key.clone()).or_default() += 1;
        if !retryable {
            self.set_status(&task.key, "failed");
        }
        Ok(())
    }
}

/// Worker that records what it ran and can be told to fail or stall.
pub struct RecordingWorker {
    name: String,
    delay: Option<Duration>,
    /// key -> retryable
    failures: Mutex<HashMap<String, bool>>,
    panics: Mutex<HashSet<String>>,
    executed: Mutex<Vec<String>>,
    spans: Mutex<Vec<(Instant, Instant)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingWorker {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            delay: None,
            failures: Mutex::new(HashMap::new()),
            panics: Mutex::new(HashSet::new()),
            executed: Mutex::new(Vec::new()),
            spans: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_on(self, key: &str, retryable: bool) -> Self {
        self.failures.lock().unwrap().insert(key.to_string(), retryable);
        self
    }

    pub fn panic_on(self, key: &str) -> Self {
        self.panics.lock().unwrap().insert(key.to_string());
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn spans(&self) -> Vec<(Instant, Instant)> {
        self.spans.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Worker<TestTask> for RecordingWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, task: &TestTask) -> Result<()> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        let started = Instant::now();

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.spans.lock().unwrap().push((started, Instant::now()));
        self.executed.lock().unwrap().push(task.key.clone());

        if self.panics.lock().unwrap().contains(&task.key) {
            panic!("worker blew up on {}", task.key);
        }

        let failure = self.failures.lock().unwrap().get(&task.key).copied();
        match failure {
            Some(true) => Err(Error::Transport(format!("connection refused: {}", task.key))),
            Some(false) => Err(Error::InvalidEndpoint(task.key.clone())),
            None => Ok(()),
        }
    }
}
