use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_bytes: usize,
    /// Simulated processing time before the file is counted.
    pub processing_delay_ms: u64,
    /// Hard cap on processing; exceeding it is a processing failure.
    pub processing_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub session_ttl_secs: u64,
    /// Lifetime of a session created with "remember me".
    pub remember_ttl_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub auth: AuthConfig,
    /// Optional directory overriding the embedded catalogs.
    pub assets_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            upload: UploadConfig {
                dir: PathBuf::from("./uploads"),
                max_bytes: 10 * 1024 * 1024,
                processing_delay_ms: 2000,
                processing_timeout_ms: 10_000,
            },
            auth: AuthConfig {
                session_ttl_secs: 8 * 3600,
                remember_ttl_secs: 30 * 24 * 3600,
            },
            assets_dir: None,
        }
    }
}

fn env_parse<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Defaults overridden by `SERVER_*`, `UPLOAD_*`, `SESSION_TTL_SECS` and `ASSETS_DIR`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let d = Self::default();
        Ok(Self {
            server: ServerConfig {
                host: std::env::var("SERVER_HOST").unwrap_or(d.server.host),
                port: env_parse("SERVER_PORT", d.server.port)?,
            },
            upload: UploadConfig {
                dir: std::env::var("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(d.upload.dir),
                max_bytes: env_parse("UPLOAD_MAX_BYTES", d.upload.max_bytes)?,
                processing_delay_ms: env_parse(
                    "UPLOAD_PROCESSING_DELAY_MS",
                    d.upload.processing_delay_ms,
                )?,
                processing_timeout_ms: env_parse(
                    "UPLOAD_PROCESSING_TIMEOUT_MS",
                    d.upload.processing_timeout_ms,
                )?,
            },
            auth: AuthConfig {
                session_ttl_secs: env_parse("SESSION_TTL_SECS", d.auth.session_ttl_secs)?,
                remember_ttl_secs: d.auth.remember_ttl_secs,
            },
            assets_dir: std::env::var("ASSETS_DIR").ok().map(PathBuf::from),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.upload.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.upload.processing_delay_ms, 2000);
        assert_eq!(config.auth.session_ttl_secs, 28_800);
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_env_parse_rejects_garbage() {
        std::env::set_var("FORECAST_TEST_PORT", "not-a-port");
        let err = env_parse::<u16>("FORECAST_TEST_PORT", 1).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "FORECAST_TEST_PORT",
                value: "not-a-port".into()
            }
        );
        std::env::remove_var("FORECAST_TEST_PORT");
        assert_eq!(env_parse::<u16>("FORECAST_TEST_PORT", 7).unwrap(), 7);
    }
}
