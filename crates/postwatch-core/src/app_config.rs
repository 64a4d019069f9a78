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

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub platform_api_base_url: String,
    pub platform_bearer_token: String,
    pub request_timeout_secs: u64,
    pub preview_user_agent: String,
    pub fetch_max_results: u32,
    pub fetch_max_retries: u32,
    pub fetch_retry_backoff_base_ms: u64,
    pub startup_delay_secs: u64,
    pub account_pause_secs: u64,
    pub cycle_period_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[redacted]")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("platform_api_base_url", &self.platform_api_base_url)
            .field("platform_bearer_token", &"[redacted]")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("preview_user_agent", &self.preview_user_agent)
            .field("fetch_max_results", &self.fetch_max_results)
            .field("fetch_max_retries", &self.fetch_max_retries)
            .field(
                "fetch_retry_backoff_base_ms",
                &self.fetch_retry_backoff_base_ms,
            )
            .field("startup_delay_secs", &self.startup_delay_secs)
            .field("account_pause_secs", &self.account_pause_secs)
            .field("cycle_period_secs", &self.cycle_period_secs)
            .finish()
    }
}
