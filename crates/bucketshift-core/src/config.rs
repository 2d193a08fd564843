//! Configuration module
//!
//! Connection, credential and polling settings for talking to the control
//! plane. Built once from the environment and passed by value into the client
//! and services; nothing reads the environment after that.

use std::env;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use crate::models::ProtocolVersion;

// Common constants
const POLL_INTERVAL_SECS: u64 = 5;
const HTTP_TIMEOUT_SECS: u64 = 60;
const RETRY_MAX_ATTEMPTS: u32 = 0;
const RETRY_BASE_DELAY_MS: u64 = 500;

/// How the client authenticates against the control plane.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Pre-issued API key sent as a bearer token.
    ApiKey(String),
    /// Username and password exchanged for a token at startup.
    Login { username: String, password: String },
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Credentials::ApiKey(_) => f.debug_tuple("ApiKey").field(&"<redacted>").finish(),
            Credentials::Login { username, .. } => f
                .debug_struct("Login")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

impl Credentials {
    /// Username and password from `BUCKETSHIFT_USERNAME`/`BUCKETSHIFT_PASSWORD`,
    /// regardless of whether an API key is also configured.
    pub fn login_from_env() -> Result<Self, anyhow::Error> {
        login_pair(
            env::var("BUCKETSHIFT_USERNAME").ok(),
            env::var("BUCKETSHIFT_PASSWORD").ok(),
        )
    }
}

fn login_pair(
    username: Option<String>,
    password: Option<String>,
) -> Result<Credentials, anyhow::Error> {
    match (
        username.filter(|s| !s.is_empty()),
        password.filter(|s| !s.is_empty()),
    ) {
        (Some(username), Some(password)) => Ok(Credentials::Login { username, password }),
        _ => Err(anyhow::anyhow!(
            "BUCKETSHIFT_USERNAME and BUCKETSHIFT_PASSWORD must both be set"
        )),
    }
}

/// Unset or `0` means no deadline. Anything else must be whole seconds.
fn parse_poll_deadline(raw: Option<String>) -> Result<Option<Duration>, anyhow::Error> {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };
    let secs: u64 = raw.trim().parse().map_err(|_| {
        anyhow::anyhow!(
            "BUCKETSHIFT_POLL_DEADLINE_SECS must be a whole number of seconds, got '{}'",
            raw
        )
    })?;
    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub credentials: Credentials,
    pub protocol: ProtocolVersion,
    pub poll_interval: Duration,
    /// Give up watching a migration after this long. `None` waits indefinitely.
    pub poll_deadline: Option<Duration>,
    pub http_timeout: Duration,
    /// Extra attempts for idempotent calls that fail with a transient error.
    pub retry_max_attempts: u32,
    pub retry_base_delay: Duration,
}

impl Config {
    /// Configuration with defaults for everything except the endpoint and credentials.
    pub fn new(api_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            api_url: api_url.into(),
            credentials,
            protocol: ProtocolVersion::default(),
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
            poll_deadline: None,
            http_timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
            retry_max_attempts: RETRY_MAX_ATTEMPTS,
            retry_base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
        }
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let api_url = env::var("BUCKETSHIFT_API_URL")
            .map_err(|_| anyhow::anyhow!("BUCKETSHIFT_API_URL must be set"))?;

        let credentials = match env::var("BUCKETSHIFT_API_KEY").ok().filter(|s| !s.is_empty()) {
            Some(key) => Credentials::ApiKey(key),
            None => Credentials::login_from_env().map_err(|_| {
                anyhow::anyhow!(
                    "Set BUCKETSHIFT_API_KEY, or BUCKETSHIFT_USERNAME and BUCKETSHIFT_PASSWORD"
                )
            })?,
        };

        let protocol = match env::var("BUCKETSHIFT_API_VERSION") {
            Ok(v) => v.parse()?,
            Err(_) => ProtocolVersion::default(),
        };

        let config = Config {
            api_url,
            credentials,
            protocol,
            poll_interval: Duration::from_secs(
                env::var("BUCKETSHIFT_POLL_INTERVAL_SECS")
                    .unwrap_or_else(|_| POLL_INTERVAL_SECS.to_string())
                    .parse()
                    .map_err(|_| {
                        anyhow::anyhow!("BUCKETSHIFT_POLL_INTERVAL_SECS must be a valid number")
                    })?,
            ),
            poll_deadline: parse_poll_deadline(
                env::var("BUCKETSHIFT_POLL_DEADLINE_SECS").ok(),
            )?,
            http_timeout: Duration::from_secs(
                env::var("BUCKETSHIFT_HTTP_TIMEOUT_SECS")
                    .unwrap_or_else(|_| HTTP_TIMEOUT_SECS.to_string())
                    .parse()
                    .unwrap_or(HTTP_TIMEOUT_SECS),
            ),
            retry_max_attempts: env::var("BUCKETSHIFT_RETRY_MAX_ATTEMPTS")
                .unwrap_or_else(|_| RETRY_MAX_ATTEMPTS.to_string())
                .parse()
                .unwrap_or(RETRY_MAX_ATTEMPTS),
            retry_base_delay: Duration::from_millis(
                env::var("BUCKETSHIFT_RETRY_BASE_DELAY_MS")
                    .unwrap_or_else(|_| RETRY_BASE_DELAY_MS.to_string())
                    .parse()
                    .unwrap_or(RETRY_BASE_DELAY_MS),
            ),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let url = self.api_url.trim();
        if url.is_empty() {
            return Err(anyhow::anyhow!("BUCKETSHIFT_API_URL must not be empty"));
        }
        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Err(anyhow::anyhow!(
                "BUCKETSHIFT_API_URL must be an http:// or https:// URL"
            ));
        }

        match &self.credentials {
            Credentials::ApiKey(key) if key.trim().is_empty() => {
                return Err(anyhow::anyhow!("API key must not be empty"));
            }
            Credentials::Login { username, password }
                if username.trim().is_empty() || password.is_empty() =>
            {
                return Err(anyhow::anyhow!("Username and password must not be empty"));
            }
            _ => {}
        }

        if self.poll_interval.is_zero() {
            return Err(anyhow::anyhow!(
                "BUCKETSHIFT_POLL_INTERVAL_SECS must be greater than zero"
            ));
        }

        if self.http_timeout.is_zero() {
            return Err(anyhow::anyhow!(
                "BUCKETSHIFT_HTTP_TIMEOUT_SECS must be greater than zero"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config::new(
            "https://control.example.com/backend",
            Credentials::ApiKey("key-123".to_string()),
        )
    }

    #[test]
    fn poll_deadline_parsing() {
        assert_eq!(parse_poll_deadline(None).unwrap(), None);
        assert_eq!(parse_poll_deadline(Some("0".into())).unwrap(), None);
        assert_eq!(parse_poll_deadline(Some(" ".into())).unwrap(), None);
        assert_eq!(
            parse_poll_deadline(Some("90".into())).unwrap(),
            Some(Duration::from_secs(90))
        );
        let err = parse_poll_deadline(Some("10m".into())).unwrap_err();
        assert!(err.to_string().contains("BUCKETSHIFT_POLL_DEADLINE_SECS"));
        assert!(parse_poll_deadline(Some("-5".into())).is_err());
    }

    #[test]
    fn login_pair_requires_both_values() {
        assert_eq!(
            login_pair(Some("ops".into()), Some("pw".into())).unwrap(),
            Credentials::Login {
                username: "ops".into(),
                password: "pw".into()
            }
        );
        assert!(login_pair(Some("ops".into()), None).is_err());
        assert!(login_pair(Some("".into()), Some("pw".into())).is_err());
    }

    #[test]
    fn defaults() {
        let config = valid();
        assert_eq!(config.protocol, ProtocolVersion::Current);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.poll_deadline, None);
        assert_eq!(config.retry_max_attempts, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_http_url() {
        let mut config = valid();
        config.api_url = "ftp://control.example.com".to_string();
        assert!(config.validate().is_err());

        config.api_url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_credentials() {
        let mut config = valid();
        config.credentials = Credentials::ApiKey(" ".to_string());
        assert!(config.validate().is_err());

        config.credentials = Credentials::Login {
            username: "ops@example.com".to_string(),
            password: String::new(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let mut config = valid();
        config.poll_interval = Duration::ZERO;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("POLL_INTERVAL"), "got: {}", err);
    }

    #[test]
    fn debug_redacts_secrets() {
        let key = format!("{:?}", Credentials::ApiKey("super-secret".to_string()));
        assert!(!key.contains("super-secret"));

        let login = format!(
            "{:?}",
            Credentials::Login {
                username: "ops".to_string(),
                password: "hunter2".to_string(),
            }
        );
        assert!(login.contains("ops"));
        assert!(!login.contains("hunter2"));
    }
}
