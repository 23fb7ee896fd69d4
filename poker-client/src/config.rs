use std::env;

/// Runtime configuration, read once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the backend REST API.
    pub api_base_url: String,
    /// URL of the backend push channel.
    pub ws_url: String,
    /// Where the local profile (identity + rejoin hint) lives.
    pub profile_path: String,
    pub reconnect_delay_seconds: u64,
    pub request_timeout_seconds: u64,
}

impl Config {
    pub fn new() -> Self {
        Self {
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:3001".to_string()),
            ws_url: env::var("WS_URL").unwrap_or_else(|_| "ws://127.0.0.1:3001/ws".to_string()),
            profile_path: env::var("PROFILE_PATH")
                .unwrap_or_else(|_| ".poker/profile.json".to_string()),
            reconnect_delay_seconds: env::var("RECONNECT_DELAY_SECONDS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .expect("Invalid RECONNECT_DELAY_SECONDS"),
            request_timeout_seconds: env::var("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("Invalid REQUEST_TIMEOUT_SECONDS"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
