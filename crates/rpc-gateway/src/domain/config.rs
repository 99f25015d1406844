//! Gateway configuration with validation.

use gateway_telemetry::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Everything a gateway needs besides its handlers and service definition.
///
/// Every section falls back to its defaults, so `{}` is a valid config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP listener and endpoint path
    pub http: HttpConfig,
    /// Request validation limits
    pub limits: LimitsConfig,
    /// Reply and cleanup timeouts
    pub timeouts: TimeoutConfig,
    /// Log level and sinks
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// Reject settings the gateway cannot serve with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = &self.http.endpoint;
        if !endpoint.starts_with('/') {
            return Err(ConfigError::InvalidEndpoint(endpoint.clone()));
        }
        if self.limits.max_request_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "a zero max_request_size rejects every body".into(),
            ));
        }

        let timeouts = [
            ("reply", self.timeouts.reply),
            ("cleanup_interval", self.timeouts.cleanup_interval),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, d)| d.is_zero()) {
            return Err(ConfigError::InvalidTimeout(format!("{name} must be non-zero")));
        }

        Ok(())
    }

    /// Socket address the server binds.
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// Listener address and the one path that accepts envelopes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Must start with `/`.
    pub endpoint: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            endpoint: "/messages".to_string(),
        }
    }
}

/// Inbound body limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted body in bytes; larger bodies get `400`.
    pub max_request_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_size: 1 << 20,
        }
    }
}

/// Reply deadline and sweep cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Longest a connection waits for its correlated reply
    #[serde(with = "humantime_serde")]
    pub reply: Duration,
    /// How often abandoned pending entries are swept
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            reply: Duration::from_secs(10),
            cleanup_interval: Duration::from_secs(10),
        }
    }
}

/// Raised at setup time; never by a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid endpoint '{0}': must start with '/'")]
    InvalidEndpoint(String),
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// Handler registered under an empty name
    #[error("handler name cannot be empty")]
    EmptyHandlerName,
}

/// `"250ms"`, `"10s"`, `"2m"` or a bare number of seconds.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let text = match value.subsec_nanos() {
            0 => format!("{}s", value.as_secs()),
            _ => format!("{}ms", value.as_millis()),
        };
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_duration(&text).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(text: &str) -> Result<Duration, String> {
        let text = text.trim();
        let split = text
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(text.len());
        let (digits, unit) = text.split_at(split);

        let amount: u64 = digits
            .parse()
            .map_err(|_| format!("duration '{text}' has no leading number"))?;

        match unit.trim() {
            "ms" => Ok(Duration::from_millis(amount)),
            "" | "s" => Ok(Duration::from_secs(amount)),
            "m" => Ok(Duration::from_secs(amount.saturating_mul(60))),
            other => Err(format!("unknown duration unit '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.http.port, 3000);
        assert_eq!(config.http.endpoint, "/messages");
        assert_eq!(config.http_addr().port(), 3000);
    }

    #[test]
    fn test_relative_endpoint_rejected() {
        let mut config = GatewayConfig::default();
        config.http.endpoint = "messages".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_zero_limits_rejected() {
        let mut config = GatewayConfig::default();
        config.limits.max_request_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLimit(_))));

        let mut config = GatewayConfig::default();
        config.timeouts.reply = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeout(_))
        ));

        let mut config = GatewayConfig::default();
        config.timeouts.cleanup_interval = Duration::ZERO;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidTimeout(
                "cleanup_interval must be non-zero".into()
            ))
        );
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: GatewayConfig = serde_json::from_str(
            r#"{"http": {"port": 8080}, "timeouts": {"reply": "250ms"}}"#,
        )
        .unwrap();
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.http.endpoint, "/messages");
        assert_eq!(config.timeouts.reply, Duration::from_millis(250));
        assert_eq!(config.timeouts.cleanup_interval, Duration::from_secs(10));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_duration_formats() {
        use humantime_serde::parse_duration;
        assert_eq!(parse_duration("5s"), Ok(Duration::from_secs(5)));
        assert_eq!(parse_duration("150ms"), Ok(Duration::from_millis(150)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("7"), Ok(Duration::from_secs(7)));
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("5h").is_err());
    }

    #[test]
    fn test_duration_round_trip_keeps_millis() {
        let mut config = GatewayConfig::default();
        config.timeouts.reply = Duration::from_millis(1500);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: GatewayConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.timeouts.reply, Duration::from_millis(1500));
    }
}
