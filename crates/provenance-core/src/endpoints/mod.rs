//! Feed endpoints as scheduler work: the task type, its finder over the
//! endpoint table and the worker that fetches and stores articles.

mod finder;
mod models;
mod task;
mod worker;

pub use finder::EndpointWorkFinder;
pub use models::{EndpointRecord, NewEndpoint, STATUS_COMPLETED, STATUS_FAILED};
pub use task::EndpointTask;
pub use worker::EndpointWorker;
