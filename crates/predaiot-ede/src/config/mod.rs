use crate::workflows::delivery::{DeliveryConfig, SmtpConfig};
use crate::workflows::portfolio::{BoostPolicyKind, BoostSettings, BoostTier, PortfolioConfig};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub portfolio: PortfolioConfig,
    pub delivery: DeliveryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            portfolio: load_portfolio()?,
            delivery: load_delivery()?,
        })
    }
}

fn load_portfolio() -> Result<PortfolioConfig, ConfigError> {
    let defaults = PortfolioConfig::default();
    let boost_defaults = BoostSettings::default();

    let kind = match env::var("EDE_BOOST_POLICY") {
        Ok(raw) => raw
            .parse::<BoostPolicyKind>()
            .map_err(|reason| ConfigError::InvalidBoostPolicy { reason })?,
        Err(_) => boost_defaults.kind,
    };

    let tiers = match env::var("EDE_BOOST_TIERS") {
        Ok(raw) => parse_tiers(&raw)?,
        Err(_) => boost_defaults.tiers,
    };

    Ok(PortfolioConfig {
        cost_fraction: env_number("EDE_COST_FRACTION", defaults.cost_fraction)?,
        loss_fraction: env_number("EDE_LOSS_FRACTION", defaults.loss_fraction)?,
        boost: BoostSettings {
            kind,
            weight: env_number("EDE_BOOST_WEIGHT", boost_defaults.weight)?,
            tiers,
            floor: env_number("EDE_BOOST_FLOOR", boost_defaults.floor)?,
        },
    })
}

fn load_delivery() -> Result<DeliveryConfig, ConfigError> {
    let defaults = DeliveryConfig::default();
    Ok(DeliveryConfig {
        sender: env::var("EDE_REPORT_SENDER").unwrap_or(defaults.sender),
        recipients: env::var("EDE_REPORT_RECIPIENTS")
            .map(|raw| parse_recipients(&raw))
            .unwrap_or(defaults.recipients),
        subject: env::var("EDE_REPORT_SUBJECT").unwrap_or(defaults.subject),
        outbox_dir: env::var("EDE_OUTBOX_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.outbox_dir),
        smtp: load_smtp()?,
    })
}

/// SMTP delivery is enabled by `EDE_SMTP_HOST`; the rest is optional.
fn load_smtp() -> Result<Option<SmtpConfig>, ConfigError> {
    let Some(host) = env::var("EDE_SMTP_HOST")
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|host| !host.is_empty())
    else {
        return Ok(None);
    };

    let port = match env::var("EDE_SMTP_PORT") {
        Ok(raw) => raw
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidSmtpPort { value: raw })?,
        Err(_) => SmtpConfig::DEFAULT_PORT,
    };

    Ok(Some(SmtpConfig {
        host,
        port,
        username: env::var("EDE_SMTP_USERNAME").ok(),
        password: env::var("EDE_SMTP_PASSWORD").ok(),
    }))
}

fn env_number(key: &'static str, default: f64) -> Result<f64, ConfigError> {
    match env::var(key) {
        Ok(raw) => parse_number(&raw).ok_or(ConfigError::InvalidNumber { key, value: raw }),
        Err(_) => Ok(default),
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Parses `threshold:boost` pairs separated by commas, e.g. `5000:1.25,200:1.2`.
fn parse_tiers(raw: &str) -> Result<Vec<BoostTier>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| -> Result<BoostTier, ConfigError> {
            let invalid = || ConfigError::InvalidTier {
                value: entry.to_string(),
            };
            let (threshold, boost) = entry.split_once(':').ok_or_else(invalid)?;
            Ok(BoostTier::new(
                parse_number(threshold).ok_or_else(invalid)?,
                parse_number(boost).ok_or_else(invalid)?,
            ))
        })
        .collect()
}

fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(str::to_string)
        .collect()
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidSmtpPort { value: String },
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
    InvalidBoostPolicy { reason: String },
    InvalidTier { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidSmtpPort { value } => {
                write!(f, "EDE_SMTP_PORT must be a valid u16 (got '{value}')")
            }
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a finite number (got '{value}')")
            }
            ConfigError::InvalidBoostPolicy { reason } => {
                write!(f, "EDE_BOOST_POLICY is invalid: {reason}")
            }
            ConfigError::InvalidTier { value } => write!(
                f,
                "EDE_BOOST_TIERS entry '{value}' must look like 'threshold:boost'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidSmtpPort { .. }
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidBoostPolicy { .. }
            | ConfigError::InvalidTier { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    const KEYS: &[&str] = &[
        "APP_ENV",
        "APP_HOST",
        "APP_PORT",
        "APP_LOG_LEVEL",
        "EDE_COST_FRACTION",
        "EDE_LOSS_FRACTION",
        "EDE_BOOST_POLICY",
        "EDE_BOOST_WEIGHT",
        "EDE_BOOST_TIERS",
        "EDE_BOOST_FLOOR",
        "EDE_REPORT_SENDER",
        "EDE_REPORT_RECIPIENTS",
        "EDE_REPORT_SUBJECT",
        "EDE_OUTBOX_DIR",
        "EDE_SMTP_HOST",
        "EDE_SMTP_PORT",
        "EDE_SMTP_USERNAME",
        "EDE_SMTP_PASSWORD",
    ];

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.portfolio, PortfolioConfig::default());
        assert!(config.delivery.recipients.is_empty());
        assert!(config.delivery.smtp.is_none());
    }

    #[test]
    fn reads_smtp_relay_without_leaking_password() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("EDE_SMTP_HOST", "smtp.example.com");
        env::set_var("EDE_SMTP_PORT", "2525");
        env::set_var("EDE_SMTP_USERNAME", "reports");
        env::set_var("EDE_SMTP_PASSWORD", "s3cret-token");

        let config = AppConfig::load().expect("config loads");
        let smtp = config.delivery.smtp.clone().expect("smtp configured");
        assert_eq!(smtp.host, "smtp.example.com");
        assert_eq!(smtp.port, 2525);
        assert_eq!(smtp.username.as_deref(), Some("reports"));
        assert!(!format!("{config:?}").contains("s3cret-token"));
        reset_env();
    }

    #[test]
    fn smtp_port_defaults_and_rejects_garbage() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("EDE_SMTP_HOST", "smtp.example.com");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.delivery.smtp.expect("smtp configured").port, 587);

        env::set_var("EDE_SMTP_PORT", "submission");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidSmtpPort { .. })
        ));
        reset_env();
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_portfolio_and_delivery_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("EDE_COST_FRACTION", "0.05");
        env::set_var("EDE_BOOST_POLICY", "tiered");
        env::set_var("EDE_BOOST_TIERS", "1000:1.3, 10:1.1");
        env::set_var("EDE_BOOST_FLOOR", "1.0");
        env::set_var("EDE_REPORT_RECIPIENTS", "ops@example.com, , cfo@example.com");

        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.portfolio.cost_fraction, 0.05);
        assert_eq!(config.portfolio.loss_fraction, 0.2);
        assert_eq!(config.portfolio.boost.kind, BoostPolicyKind::Tiered);
        assert_eq!(
            config.portfolio.boost.tiers,
            vec![BoostTier::new(1000.0, 1.3), BoostTier::new(10.0, 1.1)]
        );
        assert_eq!(config.portfolio.boost.floor, 1.0);
        assert_eq!(
            config.delivery.recipients,
            vec!["ops@example.com".to_string(), "cfo@example.com".to_string()]
        );
        reset_env();
    }

    #[test]
    fn rejects_non_numeric_fraction() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("EDE_LOSS_FRACTION", "twenty percent");
        let err = AppConfig::load().expect_err("invalid fraction");
        assert!(matches!(
            err,
            ConfigError::InvalidNumber {
                key: "EDE_LOSS_FRACTION",
                ..
            }
        ));
        reset_env();
    }

    #[test]
    fn rejects_malformed_policy_and_tiers() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("EDE_BOOST_POLICY", "linear");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidBoostPolicy { .. })
        ));

        reset_env();
        env::set_var("EDE_BOOST_TIERS", "5000=1.25");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidTier { .. })
        ));
        reset_env();
    }
}
