//! API configuration.

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Shared secret for bearer authentication
    pub auth_token: String,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size
    pub max_body_size: usize,
}

impl ApiConfig {
    /// Create config from environment variables.
    ///
    /// The shared secret is mandatory; the endpoint must never come up
    /// unauthenticated.
    pub fn from_env() -> anyhow::Result<Self> {
        let auth_token = std::env::var("PROCESS_AUTH_TOKEN")
            .map_err(|_| anyhow::anyhow!("PROCESS_AUTH_TOKEN not set"))?;
        if auth_token.is_empty() {
            anyhow::bail!("PROCESS_AUTH_TOKEN must not be empty");
        }

        Ok(Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            auth_token,
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
        })
    }
}
