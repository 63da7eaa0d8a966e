use std::env;
use std::net::SocketAddr;
use zeroize::Zeroizing;

/// Minimum session secret length in bytes (HMAC-SHA256 block of entropy).
pub const MIN_SECRET_BYTES: usize = 32;

#[derive(Clone)]
pub struct Config {
    // Redis
    pub redis_url: String,

    // Session signing key
    pub jwt_secret: Zeroizing<String>,

    // Server
    pub bind_addr: SocketAddr,
    pub allowed_origin: String,

    // Limits
    pub max_body_bytes: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("redis_url", &"[REDACTED]")
            .field("jwt_secret", &"[REDACTED]")
            .field("bind_addr", &self.bind_addr)
            .field("allowed_origin", &self.allowed_origin)
            .field("max_body_bytes", &self.max_body_bytes)
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
        // Attempt to load .env file, but don't fail if it doesn't exist
        // (env vars may be set directly in production)
        let _ = dotenvy::dotenv();

        // Redis — required to prevent silent unauthenticated connections
        let redis_url =
            env::var("REDIS_URL").map_err(|_| ConfigError::MissingVar("REDIS_URL".to_string()))?;

        // Session signing key — required, no built-in fallback
        let jwt_secret = Zeroizing::new(
            env::var("JWT_SECRET")
                .map_err(|_| ConfigError::MissingVar("JWT_SECRET".to_string()))?,
        );
        if jwt_secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::InvalidValue(
                "JWT_SECRET".to_string(),
                format!("must be at least {} bytes", MIN_SECRET_BYTES),
            ));
        }

        // Server
        let bind_addr_str = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind_addr = bind_addr_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::ParseError("BIND_ADDR".to_string(), e.to_string()))?;

        let allowed_origin =
            env::var("ALLOWED_ORIGIN").unwrap_or_else(|_| "http://localhost:5173".to_string());
        if !(allowed_origin.starts_with("http://") || allowed_origin.starts_with("https://"))
            || allowed_origin.ends_with('/')
        {
            return Err(ConfigError::InvalidValue(
                "ALLOWED_ORIGIN".to_string(),
                "must be an http(s) origin without a trailing slash".to_string(),
            ));
        }

        // Limits
        let max_body_bytes = parse_env_or_default("MAX_BODY_BYTES", 65_536)?;

        Ok(Config {
            redis_url,
            jwt_secret,
            bind_addr,
            allowed_origin,
            max_body_bytes,
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Use a mutex to ensure tests run serially since they modify global env vars.
    // unwrap_or_else handles poison from prior panics.
    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn lock_test() -> std::sync::MutexGuard<'static, ()> {
        TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
    }

    const TEST_SECRET: &str = "test-secret-test-secret-test-secret";

    fn clear_test_env() {
        env::remove_var("REDIS_URL");
        env::remove_var("JWT_SECRET");
        env::remove_var("BIND_ADDR");
        env::remove_var("ALLOWED_ORIGIN");
        env::remove_var("MAX_BODY_BYTES");
    }

    fn set_required() {
        env::set_var("REDIS_URL", "redis://127.0.0.1:6379");
        env::set_var("JWT_SECRET", TEST_SECRET);
    }

    #[test]
    fn test_parse_env_or_default() {
        let _guard = lock_test();

        env::set_var("TEST_USIZE", "12345");
        let result: Result<usize, ConfigError> = parse_env_or_default("TEST_USIZE", 100);
        assert_eq!(result.unwrap(), 12345);

        env::set_var("TEST_USIZE", "lots");
        let result: Result<usize, ConfigError> = parse_env_or_default("TEST_USIZE", 100);
        assert!(matches!(result, Err(ConfigError::ParseError(_, _))));

        env::remove_var("TEST_USIZE");
        let result: Result<usize, ConfigError> = parse_env_or_default("TEST_USIZE", 100);
        assert_eq!(result.unwrap(), 100);
    }

    #[test]
    fn test_invalid_socket_addr() {
        let _guard = lock_test();
        clear_test_env();

        set_required();
        env::set_var("BIND_ADDR", "invalid_address");

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_, _)));

        clear_test_env();
    }

    #[test]
    fn test_short_jwt_secret() {
        let _guard = lock_test();
        clear_test_env();

        // Set (not remove) so dotenvy cannot fill it in from a local .env
        env::set_var("REDIS_URL", "redis://127.0.0.1:6379");
        env::set_var("JWT_SECRET", "too-short");

        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "JWT_SECRET"
        ));

        env::set_var("JWT_SECRET", "");
        let result = Config::from_env();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "JWT_SECRET"
        ));

        clear_test_env();
    }

    #[test]
    fn test_invalid_allowed_origin() {
        let _guard = lock_test();
        clear_test_env();

        set_required();
        for origin in ["localhost:5173", "http://localhost:5173/", "*"] {
            env::set_var("ALLOWED_ORIGIN", origin);
            let result = Config::from_env();
            assert!(
                matches!(
                    result,
                    Err(ConfigError::InvalidValue(ref s, _)) if s == "ALLOWED_ORIGIN"
                ),
                "origin {:?} should be rejected",
                origin
            );
        }

        clear_test_env();
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let _guard = lock_test();
        clear_test_env();

        set_required();
        let config = Config::from_env().unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains(TEST_SECRET));
        assert!(!debug.contains("redis://"));
        assert!(debug.contains("[REDACTED]"));

        clear_test_env();
    }

    #[test]
    fn test_config_defaults() {
        let _guard = lock_test();
        clear_test_env();

        // Set required vars + override any .env defaults to ensure predictable values
        set_required();
        env::set_var("BIND_ADDR", "0.0.0.0:8080");
        env::set_var("ALLOWED_ORIGIN", "http://localhost:5173");
        env::set_var("MAX_BODY_BYTES", "65536");

        let config = Config::from_env().unwrap();

        assert_eq!(config.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(config.jwt_secret.as_str(), TEST_SECRET);
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.allowed_origin, "http://localhost:5173");
        assert_eq!(config.max_body_bytes, 65_536);

        clear_test_env();
    }
}
