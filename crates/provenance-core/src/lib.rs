pub mod config;
pub mod endpoints;
pub mod error;
pub mod feed;
pub mod pipeline;
pub mod scheduler;
pub mod storage;

pub use config::AppConfig;
pub use error::{Error, Result};
