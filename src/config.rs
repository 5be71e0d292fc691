use crate::providers::lens::{LENS_SUBGRAPHS, MIN_TOKEN_AGE_SECS};
use crate::storage::{ExpiryMode, DEFAULT_SESSION_TTL_SECS};
use std::env;
use std::net::SocketAddr;

/// Where sessions live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBackend {
    Memory,
    Redis,
}

impl std::str::FromStr for SessionBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(SessionBackend::Memory),
            "redis" => Ok(SessionBackend::Redis),
            _ => Err(format!("Invalid session backend: {}", s)),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    // Server
    pub bind_addr: SocketAddr,
    pub cors_allowed_origins: Vec<String>,

    // Idena
    pub idena_api_url: String,

    // Sessions
    pub session_backend: SessionBackend,
    pub redis_url: Option<String>,
    pub session_ttl_secs: u64,
    pub session_expiry_mode: ExpiryMode,
    pub sweep_interval_secs: u64,

    // Lens
    pub lens_subgraphs: Vec<String>,
    pub lens_min_token_age_secs: u64,

    // Outbound HTTP
    pub upstream_timeout_secs: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("idena_api_url", &self.idena_api_url)
            .field("session_backend", &self.session_backend)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("session_expiry_mode", &self.session_expiry_mode)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .field("lens_subgraphs", &self.lens_subgraphs)
            .field("lens_min_token_age_secs", &self.lens_min_token_age_secs)
            .field("upstream_timeout_secs", &self.upstream_timeout_secs)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env is fine; production sets vars directly.
        let _ = dotenvy::dotenv();

        // Server
        let bind_addr_str = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_addr = bind_addr_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::ParseError("BIND_ADDR".to_string(), e.to_string()))?;
        let cors_allowed_origins = parse_list(&env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default());

        // Idena
        let idena_api_url = env::var("IDENA_API_URL")
            .map_err(|_| ConfigError::MissingVar("IDENA_API_URL".to_string()))?;
        validate_http_url("IDENA_API_URL", &idena_api_url)?;

        // Sessions
        let session_backend = parse_env_or_default("SESSION_BACKEND", SessionBackend::Memory)?;
        let redis_url = env::var("REDIS_URL").ok().filter(|s| !s.is_empty());
        if session_backend == SessionBackend::Redis && redis_url.is_none() {
            return Err(ConfigError::MissingVar("REDIS_URL".to_string()));
        }

        let session_ttl_secs = parse_env_or_default("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?;
        if session_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let session_expiry_mode = parse_env_or_default("SESSION_EXPIRY_MODE", ExpiryMode::Timer)?;
        let sweep_interval_secs = parse_env_or_default("SWEEP_INTERVAL_SECS", 30)?;
        if sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "SWEEP_INTERVAL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        // Lens
        let lens_subgraphs = match env::var("LENS_SUBGRAPHS") {
            Ok(list) => parse_list(&list),
            Err(_) => LENS_SUBGRAPHS.iter().map(|s| s.to_string()).collect(),
        };
        for url in &lens_subgraphs {
            validate_http_url("LENS_SUBGRAPHS", url)?;
        }
        let lens_min_token_age_secs =
            parse_env_or_default("LENS_MIN_TOKEN_AGE_SECS", MIN_TOKEN_AGE_SECS)?;

        // Outbound HTTP
        let upstream_timeout_secs = parse_env_or_default("UPSTREAM_TIMEOUT_SECS", 30)?;

        Ok(Config {
            bind_addr,
            cors_allowed_origins,
            idena_api_url,
            session_backend,
            redis_url,
            session_ttl_secs,
            session_expiry_mode,
            sweep_interval_secs,
            lens_subgraphs,
            lens_min_token_age_secs,
            upstream_timeout_secs,
        })
    }
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("expected an http(s) URL, got '{}'", value),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests modify global env vars, so they run one at a time.
    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn lock_test() -> std::sync::MutexGuard<'static, ()> {
        TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn clear_test_env() {
        for key in [
            "BIND_ADDR",
            "CORS_ALLOWED_ORIGINS",
            "IDENA_API_URL",
            "SESSION_BACKEND",
            "REDIS_URL",
            "SESSION_TTL_SECS",
            "SESSION_EXPIRY_MODE",
            "SWEEP_INTERVAL_SECS",
            "LENS_SUBGRAPHS",
            "LENS_MIN_TOKEN_AGE_SECS",
            "UPSTREAM_TIMEOUT_SECS",
        ] {
            env::remove_var(key);
        }
    }

    const TEST_API_URL: &str = "https://api.idena.io";

    #[test]
    fn test_parse_env_or_default() {
        let _guard = lock_test();

        env::set_var("TEST_U64", "12345");
        let result: Result<u64, ConfigError> = parse_env_or_default("TEST_U64", 100);
        assert_eq!(result.unwrap(), 12345);

        env::remove_var("TEST_U64");
        let result: Result<u64, ConfigError> = parse_env_or_default("TEST_U64", 100);
        assert_eq!(result.unwrap(), 100);
    }

    #[test]
    fn test_config_defaults() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("IDENA_API_URL", TEST_API_URL);
        // Override anything a local .env might provide.
        env::set_var("BIND_ADDR", "0.0.0.0:3000");

        let config = Config::from_env().unwrap();

        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:3000");
        assert_eq!(config.idena_api_url, TEST_API_URL);
        assert_eq!(config.session_backend, SessionBackend::Memory);
        assert_eq!(config.session_ttl_secs, 300);
        assert_eq!(config.session_expiry_mode, ExpiryMode::Timer);
        assert_eq!(config.sweep_interval_secs, 30);
        assert_eq!(config.lens_subgraphs, LENS_SUBGRAPHS.to_vec());
        assert_eq!(config.lens_min_token_age_secs, 1_296_000);
        assert_eq!(config.upstream_timeout_secs, 30);

        clear_test_env();
    }

    #[test]
    fn test_missing_idena_api_url() {
        let _guard = lock_test();
        clear_test_env();

        // Empty rather than unset so a local .env cannot fill it in.
        env::set_var("IDENA_API_URL", "");

        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "IDENA_API_URL"
        ));

        clear_test_env();
    }

    #[test]
    fn test_invalid_socket_addr() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("IDENA_API_URL", TEST_API_URL);
        env::set_var("BIND_ADDR", "invalid_address");

        let result = Config::from_env();
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_, _)));

        clear_test_env();
    }

    #[test]
    fn test_redis_backend_requires_url() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("IDENA_API_URL", TEST_API_URL);
        env::set_var("SESSION_BACKEND", "redis");
        env::set_var("REDIS_URL", "");

        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::MissingVar(ref s) if s == "REDIS_URL"
        ));

        env::set_var("REDIS_URL", "redis://127.0.0.1:6379");
        let config = Config::from_env().unwrap();
        assert_eq!(config.session_backend, SessionBackend::Redis);
        assert!(!format!("{:?}", config).contains("127.0.0.1:6379"));

        clear_test_env();
    }

    #[test]
    fn test_invalid_backend_and_mode() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("IDENA_API_URL", TEST_API_URL);
        env::set_var("SESSION_BACKEND", "postgres");
        assert!(matches!(
            Config::from_env().unwrap_err(),
            ConfigError::ParseError(ref s, _) if s == "SESSION_BACKEND"
        ));

        env::remove_var("SESSION_BACKEND");
        env::set_var("SESSION_EXPIRY_MODE", "sweep");
        assert_eq!(
            Config::from_env().unwrap().session_expiry_mode,
            ExpiryMode::Sweep
        );

        env::set_var("SESSION_EXPIRY_MODE", "lazy");
        assert!(Config::from_env().is_err());

        clear_test_env();
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("IDENA_API_URL", TEST_API_URL);
        env::set_var("SESSION_TTL_SECS", "0");
        assert!(matches!(
            Config::from_env().unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "SESSION_TTL_SECS"
        ));

        clear_test_env();
    }

    #[test]
    fn test_lists_parsing() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("IDENA_API_URL", TEST_API_URL);
        env::set_var("LENS_SUBGRAPHS", " http://a.test/graph , ,http://b.test/graph");
        env::set_var("CORS_ALLOWED_ORIGINS", "https://passport.test, ");

        let config = Config::from_env().unwrap();
        assert_eq!(
            config.lens_subgraphs,
            vec!["http://a.test/graph", "http://b.test/graph"]
        );
        assert_eq!(config.cors_allowed_origins, vec!["https://passport.test"]);

        env::set_var("LENS_SUBGRAPHS", "ftp://nope");
        assert!(matches!(
            Config::from_env().unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "LENS_SUBGRAPHS"
        ));

        clear_test_env();
    }
}
