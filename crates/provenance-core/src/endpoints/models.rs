use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of an endpoint whose last task succeeded
pub const STATUS_COMPLETED: &str = "completed";

/// Status of an endpoint that will not be retried until it is reset
pub const STATUS_FAILED: &str = "failed";

/// A feed endpoint and its eligibility status.
///
/// `status` is a free-form category: the endpoint is discoverable when it
/// equals the category a finder is asked for (conventionally "ready").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub id: Uuid,
    pub url: String,
    pub accept: String,
    pub status: String,
    /// Consecutive failed executions since the last success
    pub failure_count: u32,
    pub last_error: Option<String>,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data required to register an endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEndpoint {
    pub url: String,
    pub accept: String,
}

impl NewEndpoint {
    pub fn new(url: impl Into<String>, accept: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            accept: accept.into(),
        }
    }
}

impl EndpointRecord {
    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }
}
