// Configuration loading and validation
use crate::domain::alert::Receiver;
use crate::error::ConfigError;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/pool";
pub const DEFAULT_BASE_URL: &str = "https://graphql.acs.prod.aseko.cloud/graphql";
pub const DEFAULT_AUTH_URL: &str = "https://auth.aseko.acs.aseko.cloud/auth/login";
pub const DEFAULT_CLOUD_ID: &str = "01HXS50KTV7NRSVNHD617J4CKB";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerSettings,
    pub cloud: CloudSettings,
    pub pool: PoolSettings,
    pub hue: HueSettings,
    pub influx: InfluxSettings,
    pub alerting: AlertingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub port: u16,
}

#[derive(Deserialize, Clone)]
pub struct CloudSettings {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub base_url: String,
    pub auth_url: String,
    pub cloud_id: String,
    #[serde(default)]
    pub websocket_url: Option<String>,
}

impl std::fmt::Debug for CloudSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudSettings")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("auth_url", &self.auth_url)
            .field("cloud_id", &self.cloud_id)
            .field("websocket_url", &self.websocket_url)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PoolSettings {
    pub expected_temperature: f64,
    #[serde(with = "humantime_serde")]
    pub check_interval: Duration,
    pub temperature_threshold: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HueSettings {
    #[serde(default)]
    pub bridge_ip: String,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InfluxSettings {
    pub host: String,
    #[serde(default)]
    pub token: String,
    pub database: String,
    pub retention_policy: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlertingSettings {
    pub email: EmailSettings,
    #[serde(default)]
    pub default_receivers: Vec<Receiver>,
}

#[derive(Deserialize, Clone)]
pub struct EmailSettings {
    pub enabled: bool,
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default)]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_user: String,
    #[serde(default)]
    pub smtp_password: String,
    #[serde(default)]
    pub from_address: String,
    pub from_name: String,
    pub use_tls: bool,
}

impl std::fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailSettings")
            .field("enabled", &self.enabled)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_user", &self.smtp_user)
            .field("smtp_password", &"<redacted>")
            .field("from_address", &self.from_address)
            .field("from_name", &self.from_name)
            .field("use_tls", &self.use_tls)
            .finish()
    }
}

impl Config {
    /// Fail fast on anything the service cannot run without
    pub fn validate(&self) -> Result<(), ConfigError> {
        require("cloud.email", &self.cloud.email)?;
        require("cloud.password", &self.cloud.password)?;
        require("cloud.base_url", &self.cloud.base_url)?;
        require("cloud.auth_url", &self.cloud.auth_url)?;
        require("hue.bridge_ip", &self.hue.bridge_ip)?;
        require("hue.api_key", &self.hue.api_key)?;

        if self.pool.check_interval.is_zero() {
            return Err(ConfigError::Invalid {
                field: "pool.check_interval",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !self.pool.temperature_threshold.is_finite() || self.pool.temperature_threshold < 0.0 {
            return Err(ConfigError::Invalid {
                field: "pool.temperature_threshold",
                reason: format!("must be non-negative, got {}", self.pool.temperature_threshold),
            });
        }

        let email = &self.alerting.email;
        if email.enabled {
            require("alerting.email.smtp_host", &email.smtp_host)?;
            if email.smtp_port == 0 {
                return Err(ConfigError::Missing("alerting.email.smtp_port"));
            }
            require("alerting.email.from_address", &email.from_address)?;
        }

        if let Some(receiver) = self.alerting.default_receivers.iter().find(|r| !r.email.contains('@')) {
            return Err(ConfigError::Invalid {
                field: "alerting.default_receivers",
                reason: format!("'{}' is not an email address", receiver.email),
            });
        }

        Ok(())
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::Missing(field))
    } else {
        Ok(())
    }
}

/// Load `path` (any format the config crate understands, extension optional)
/// layered with `POOL__SECTION__KEY` environment variables.
pub fn load_config(path: &str) -> anyhow::Result<Config> {
    let settings = config::Config::builder()
        .set_default("server.port", 8080)?
        .set_default("cloud.base_url", DEFAULT_BASE_URL)?
        .set_default("cloud.auth_url", DEFAULT_AUTH_URL)?
        .set_default("cloud.cloud_id", DEFAULT_CLOUD_ID)?
        .set_default("pool.expected_temperature", 28.0)?
        .set_default("pool.check_interval", "1h")?
        .set_default("pool.temperature_threshold", 2.0)?
        .set_default("influx.host", "http://localhost:8086")?
        .set_default("influx.database", "pool")?
        .set_default("influx.retention_policy", "autogen")?
        .set_default("alerting.email.enabled", false)?
        .set_default("alerting.email.from_name", "Pool Monitor")?
        .set_default("alerting.email.use_tls", true)?
        .add_source(config::File::with_name(path))
        .add_source(config::Environment::with_prefix("POOL").separator("__"))
        .build()?;

    let config: Config = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
[cloud]
email = "owner@example.com"
password = "secret"

[hue]
bridge_ip = "192.168.1.20"
api_key = "hue-key"
"#;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn load(contents: &str) -> anyhow::Result<Config> {
        let file = write_config(contents);
        load_config(file.path().to_str().unwrap())
    }

    #[test]
    fn test_defaults_fill_optional_sections() {
        let config = load(MINIMAL).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.cloud.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.cloud.cloud_id, DEFAULT_CLOUD_ID);
        assert_eq!(config.pool.expected_temperature, 28.0);
        assert_eq!(config.pool.check_interval, Duration::from_secs(3600));
        assert_eq!(config.pool.temperature_threshold, 2.0);
        assert!(!config.alerting.email.enabled);
        assert!(config.alerting.default_receivers.is_empty());
    }

    #[test]
    fn test_full_config() {
        let contents = format!(
            r#"{}
[pool]
expected_temperature = 27.0
check_interval = "15m"
temperature_threshold = 1.5

[alerting.email]
enabled = true
smtp_host = "smtp.example.com"
smtp_port = 587
from_address = "pool@example.com"

[[alerting.default_receivers]]
email = "owner@example.com"
name = "Owner"

[[alerting.default_receivers]]
email = "tech@example.com"
"#,
            MINIMAL
        );
        let config = load(&contents).unwrap();

        assert_eq!(config.pool.check_interval, Duration::from_secs(15 * 60));
        assert_eq!(config.pool.temperature_threshold, 1.5);
        assert_eq!(config.alerting.email.smtp_port, 587);
        assert_eq!(config.alerting.email.from_name, "Pool Monitor");
        assert_eq!(config.alerting.default_receivers.len(), 2);
        assert_eq!(config.alerting.default_receivers[1].name, "");
    }

    #[test]
    fn test_missing_credentials_fail_fast() {
        let err = load("[hue]\nbridge_ip = \"h\"\napi_key = \"k\"\n").unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::Missing("cloud.email"))
        );
    }

    #[test]
    fn test_enabled_email_requires_smtp_settings() {
        let contents = format!("{}\n[alerting.email]\nenabled = true\nsmtp_host = \"smtp.example.com\"\n", MINIMAL);
        let err = load(&contents).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::Missing("alerting.email.smtp_port"))
        );
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let contents = format!("{}\n[pool]\ncheck_interval = \"0s\"\n", MINIMAL);
        let err = load(&contents).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::Invalid {
                field: "pool.check_interval",
                ..
            })
        ));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_config("/nonexistent/pool-config").is_err());
    }
}
