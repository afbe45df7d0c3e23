use std::fmt;

use crate::endpoints::EndpointRecord;
use crate::scheduler::Task;

/// Fetch one feed endpoint on behalf of a named worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTask {
    endpoint: String,
    accept: String,
    worker_name: String,
}

impl EndpointTask {
    pub fn new(endpoint: impl Into<String>, accept: impl Into<String>, worker_name: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            accept: accept.into(),
            worker_name: worker_name.into(),
        }
    }

    /// Task for a stored endpoint, routed to `worker_name`
    pub fn from_record(record: &EndpointRecord, worker_name: &str) -> Self {
        Self::new(record.url.clone(), record.accept.clone(), worker_name)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn accept(&self) -> &str {
        &self.accept
    }
}

impl fmt::Display for EndpointTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.endpoint, self.accept)
    }
}

impl Task for EndpointTask {
    fn worker_name(&self) -> &str {
        &self.worker_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_routing() {
        let task = EndpointTask::new("https://feed.infoq.com/", "application/xml", "ready");

        assert_eq!(task.to_string(), "https://feed.infoq.com/ (application/xml)");
        assert_eq!(task.worker_name(), "ready");
        assert_eq!(task.endpoint(), "https://feed.infoq.com/");
        assert_eq!(task.accept(), "application/xml");
    }
}
