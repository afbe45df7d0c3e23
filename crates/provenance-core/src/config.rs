use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Upper bound for second-valued scheduler settings (100 years)
pub const MAX_DURATION_SECS: u64 = 100 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub articles: ArticlesConfig,
    /// Feed endpoints seeded into the store as "ready" at startup
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<EndpointConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            scheduler: SchedulerConfig::default(),
            fetch: FetchConfig::default(),
            articles: ArticlesConfig::default(),
            endpoints: default_endpoints(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Status value that marks an endpoint as eligible; also the name the
    /// endpoint worker registers under
    #[serde(default = "default_category")]
    pub category: String,
    /// Seconds between ticks. The first tick fires one interval after start.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Upper bound on task executions running at once within a tick
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Consecutive failures after which an endpoint is parked as "failed".
    /// Unset means failures are retried forever.
    #[serde(default)]
    pub max_failures: Option<u32>,
    /// Completed endpoints become "ready" again after this many seconds.
    /// Unset means each endpoint is processed once per readiness signal.
    #[serde(default)]
    pub rearm_after_secs: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            category: default_category(),
            interval_secs: default_interval(),
            max_concurrency: default_max_concurrency(),
            max_failures: None,
            rearm_after_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Optional proxy for all feed requests
    #[serde(default)]
    pub proxy_url: Option<String>,
    /// Attempts per fetch when the server answers 429/503 or the request fails
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_timeout(),
            proxy_url: None,
            max_retries: default_max_retries(),
        }
    }
}

/// How a successful fetch is written to the article store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticlePolicy {
    /// Upsert each item keyed by (endpoint, guid); other articles are kept
    #[default]
    Merge,
    /// Clear the whole store, then save the fetched items (one transaction)
    Replace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticlesConfig {
    #[serde(default)]
    pub policy: ArticlePolicy,
    /// Articles present before the first tick
    #[serde(default = "default_seed")]
    pub seed: Vec<SeedArticle>,
}

impl Default for ArticlesConfig {
    fn default() -> Self {
        Self {
            policy: ArticlePolicy::default(),
            seed: default_seed(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedArticle {
    pub title: String,
    #[serde(default = "default_true")]
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub url: String,
    /// Accept header sent when fetching
    #[serde(default = "default_accept")]
    pub accept: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_category() -> String {
    "ready".to_string()
}

fn default_interval() -> u64 {
    10
}

fn default_max_concurrency() -> usize {
    10
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

/// Accept header used when an endpoint does not name one
pub fn default_accept() -> String {
    "application/xml".to_string()
}

fn default_seed() -> Vec<SeedArticle> {
    [
        "Programming Languages InfoQ Trends Report - October 2019",
        "Ryan Kitchens on Learning from Incidents at Netflix, the Role of SRE, and Sociotechnical Systems",
    ]
    .into_iter()
    .map(|title| SeedArticle {
        title: title.to_string(),
        available: true,
    })
    .collect()
}

fn default_endpoints() -> Vec<EndpointConfig> {
    vec![EndpointConfig {
        url: "https://feed.infoq.com/".to_string(),
        accept: default_accept(),
    }]
}

impl AppConfig {
    /// Load configuration from the default location or return defaults
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Get the configuration file path
    /// Always uses ~/.config/provenance/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("provenance")
            .join("config.toml")
    }

    /// Reject settings the scheduler cannot start with
    pub fn validate(&self) -> crate::Result<()> {
        let scheduler = &self.scheduler;

        if scheduler.category.trim().is_empty() {
            return Err(crate::Error::Config("scheduler.category must not be empty".into()));
        }
        if scheduler.interval_secs == 0 {
            return Err(crate::Error::Config("scheduler.interval_secs must be greater than 0".into()));
        }
        if scheduler.interval_secs > MAX_DURATION_SECS {
            return Err(crate::Error::Config(format!(
                "scheduler.interval_secs must be at most {}",
                MAX_DURATION_SECS
            )));
        }
        if scheduler.max_concurrency == 0 {
            return Err(crate::Error::Config("scheduler.max_concurrency must be greater than 0".into()));
        }
        if scheduler.max_failures == Some(0) {
            return Err(crate::Error::Config("scheduler.max_failures must be at least 1".into()));
        }
        match scheduler.rearm_after_secs {
            Some(0) => {
                return Err(crate::Error::Config("scheduler.rearm_after_secs must be greater than 0".into()));
            }
            Some(secs) if secs > MAX_DURATION_SECS => {
                return Err(crate::Error::Config(format!(
                    "scheduler.rearm_after_secs must be at most {}",
                    MAX_DURATION_SECS
                )));
            }
            _ => {}
        }
        if self.fetch.max_retries == 0 {
            return Err(crate::Error::Config("fetch.max_retries must be at least 1".into()));
        }
        if let Some(endpoint) = self.endpoints.iter().find(|e| e.url.trim().is_empty()) {
            return Err(crate::Error::Config(format!(
                "endpoint with accept '{}' has an empty url",
                endpoint.accept
            )));
        }

        Ok(())
    }
}
