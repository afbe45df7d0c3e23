mod contract;
mod dispatch;
mod registry;
mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use contract::{Task, WorkFinder, Worker};
pub use dispatch::TickReport;
pub use registry::WorkerRegistry;
pub use service::{SchedulerEvent, SchedulerOptions, WorkScheduler};
