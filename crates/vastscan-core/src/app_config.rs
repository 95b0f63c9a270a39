/// Client identity presented on every tag fetch unless overridden.
pub const DEFAULT_USER_AGENT: &str = "Roku/DVP-14.5 (14.5.4.5934-46)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub user_agent: String,
    /// Timeout for every tag document hop.
    pub fetch_timeout_secs: u64,
    /// Timeout for the click-through lookup used to recover an advertiser domain.
    /// Never longer than `fetch_timeout_secs`.
    pub fallback_timeout_secs: u64,
    pub max_depth: u32,
    pub parallel_branches: bool,
    /// Upper bound on `--calls` for a single CLI invocation.
    pub max_calls: u32,
}
