use std::sync::Arc;

use super::contract::{Task, Worker};
use crate::{Error, Result};

/// Routing table from worker name to worker.
///
/// Names are unique: registering a second worker under an existing name is a
/// configuration error. Routes keep registration order, which is the order
/// the scheduler polls them in.
pub struct WorkerRegistry<T: Task> {
    routes: Vec<(String, Arc<dyn Worker<T>>)>,
}

impl<T: Task> WorkerRegistry<T> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Build a registry from a worker list, rejecting duplicate names
    pub fn from_workers(workers: Vec<Arc<dyn Worker<T>>>) -> Result<Self> {
        let mut registry = Self::new();
        for worker in workers {
            registry.register(worker)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, worker: Arc<dyn Worker<T>>) -> Result<()> {
        let name = worker.name().to_string();

        if name.trim().is_empty() {
            return Err(Error::Config("worker name must not be empty".to_string()));
        }
        if self.contains(&name) {
            return Err(Error::Config(format!(
                "a worker named '{}' is already registered",
                name
            )));
        }

        tracing::debug!("Registered worker: {}", name);
        self.routes.push((name, worker));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Worker<T>>> {
        self.routes
            .iter()
            .find(|(route, _)| route == name)
            .map(|(_, worker)| worker)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Routes in registration order
    pub fn routes(&self) -> impl Iterator<Item = (&str, &Arc<dyn Worker<T>>)> {
        self.routes
            .iter()
            .map(|(name, worker)| (name.as_str(), worker))
    }

    pub fn names(&self) -> Vec<&str> {
        self.routes.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<T: Task> Default for WorkerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
