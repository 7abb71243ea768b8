//! Configuration management for the hand-in bridge
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files. Secrets (API key/secret, carrier credentials,
//! webhook URL) are never compiled in.

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::logging::LogMode;

pub const DEFAULT_CHANNELDOCK_URL: &str = "https://channeldock.com/portal/api/v2/center/";
pub const DEFAULT_CARRIER_URL: &str = "https://my.dhlecommerce.nl/";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Outbound HTTP settings shared by every client
    pub http: HttpConfig,

    /// Order-management API
    pub channeldock: ChannelDockConfig,

    /// Carrier portal
    pub carrier: CarrierConfig,

    /// Per-run workflow settings
    pub workflow: WorkflowConfig,

    /// Alerting and log forwarding
    pub alerts: AlertsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// HTTP trigger
    pub server: ServerConfig,

    /// Scheduled trigger
    pub schedule: ScheduleConfig,
}

/// Outbound HTTP settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Ceiling applied to every outbound request, in seconds
    pub request_timeout_secs: u64,

    /// User agent string
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            user_agent: format!("handin/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// ChannelDock API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelDockConfig {
    /// Base URL of the center API
    pub base_url: String,

    /// `api_key` header value
    pub api_key: String,

    /// `api_secret` header value
    pub api_secret: String,

    /// A page with fewer items than this is the last page
    pub page_size: usize,

    /// Hard cap on pages requested per query
    pub max_pages: u32,
}

impl Default for ChannelDockConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CHANNELDOCK_URL.to_string(),
            api_key: String::new(),
            api_secret: String::new(),
            page_size: 10,
            max_pages: 100,
        }
    }
}

/// DHL eCommerce portal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CarrierConfig {
    /// Base URL of the portal
    pub base_url: String,

    /// Login e-mail
    pub email: String,

    /// Login password
    pub password: String,

    /// Address receiving the hand-in receipt; the login e-mail when empty
    pub receipt_email: String,

    pub login_path: String,
    pub scan_path: String,
    pub handin_path: String,

    /// Parcel kind tag sent with every hand-in parcel
    pub parcel_kind: String,

    /// Pacing for consecutive carrier calls
    pub requests_per_second: u32,
}

impl Default for CarrierConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CARRIER_URL.to_string(),
            email: String::new(),
            password: String::new(),
            receipt_email: String::new(),
            login_path: "api/user/login".to_string(),
            scan_path: "servicepoint-api/customer/hand-in/validate".to_string(),
            handin_path: "servicepoint-api/customer/hand-in".to_string(),
            parcel_kind: "PARCEL".to_string(),
            requests_per_second: 5,
        }
    }
}

impl CarrierConfig {
    /// Receipt address for hand-ins
    pub fn contact_email(&self) -> &str {
        if self.receipt_email.is_empty() {
            &self.email
        } else {
            &self.receipt_email
        }
    }
}

/// Workflow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Sellers processed in order on every run
    pub seller_ids: Vec<u64>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            seller_ids: Vec::new(),
        }
    }
}

/// Alerting configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AlertsConfig {
    /// Incoming webhook receiving error alerts
    pub webhook_url: Option<String>,

    /// Endpoint receiving forwarded log lines
    pub log_forward_url: Option<String>,
}

/// Logging configuration
///
/// Level and output format belong to the CLI (`--verbose`, `--log-format`),
/// since the subscriber is installed before any config is read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Forwarding verbosity
    pub mode: LogMode,
}

/// HTTP trigger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8787,
        }
    }
}

/// Scheduled trigger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Local `HH:MM` times at which a run starts
    pub times: Vec<String>,

    /// Run once immediately when the scheduler starts
    pub run_on_startup: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            times: vec![String::from("17:00")],
            run_on_startup: false,
        }
    }
}

fn env_or(name: &str, default: String) -> String {
    std::env::var(name).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_list(name: &str) -> Option<Vec<String>> {
    std::env::var(name).ok().map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
}

/// Parse `3477,1673` into seller ids
pub fn parse_seller_ids(raw: &str) -> Result<Vec<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .with_context(|| format!("Invalid seller id '{s}'"))
        })
        .collect()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let seller_ids = match std::env::var("HANDIN_SELLER_IDS") {
            Ok(raw) => parse_seller_ids(&raw)?,
            Err(_) => defaults.workflow.seller_ids.clone(),
        };

        let mode = match std::env::var("HANDIN_LOG_MODE") {
            Ok(raw) => raw.parse::<LogMode>().map_err(anyhow::Error::msg)?,
            Err(_) => defaults.logging.mode,
        };

        Ok(Self {
            http: HttpConfig {
                request_timeout_secs: env_parse(
                    "HANDIN_REQUEST_TIMEOUT",
                    defaults.http.request_timeout_secs,
                ),
                user_agent: env_or("HANDIN_USER_AGENT", defaults.http.user_agent),
            },
            channeldock: ChannelDockConfig {
                base_url: env_or("CHANNELDOCK_BASE_URL", defaults.channeldock.base_url),
                api_key: env_or("CHANNELDOCK_API_KEY", String::new()),
                api_secret: env_or("CHANNELDOCK_API_SECRET", String::new()),
                page_size: env_parse("CHANNELDOCK_PAGE_SIZE", defaults.channeldock.page_size),
                max_pages: env_parse("CHANNELDOCK_MAX_PAGES", defaults.channeldock.max_pages),
            },
            carrier: CarrierConfig {
                base_url: env_or("DHL_BASE_URL", defaults.carrier.base_url),
                email: env_or("DHL_EMAIL", String::new()),
                password: env_or("DHL_PASSWORD", String::new()),
                receipt_email: env_or("DHL_RECEIPT_EMAIL", String::new()),
                requests_per_second: env_parse(
                    "DHL_REQUESTS_PER_SECOND",
                    defaults.carrier.requests_per_second,
                ),
                ..defaults.carrier
            },
            workflow: WorkflowConfig { seller_ids },
            alerts: AlertsConfig {
                webhook_url: std::env::var("HANDIN_ALERT_WEBHOOK_URL").ok(),
                log_forward_url: std::env::var("HANDIN_LOG_FORWARD_URL").ok(),
            },
            logging: LoggingConfig {
                mode,
            },
            server: ServerConfig {
                host: env_or("HANDIN_HOST", defaults.server.host),
                port: env_parse("HANDIN_PORT", defaults.server.port),
            },
            schedule: ScheduleConfig {
                times: env_list("HANDIN_SCHEDULE_TIMES").unwrap_or(defaults.schedule.times),
                run_on_startup: env_parse(
                    "HANDIN_RUN_ON_STARTUP",
                    defaults.schedule.run_on_startup,
                ),
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from `path` when given, otherwise from the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::from_env()?,
        };
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.workflow.seller_ids.is_empty() {
            anyhow::bail!("seller_ids must not be empty");
        }

        if self.channeldock.page_size == 0 {
            anyhow::bail!("page_size must be greater than 0");
        }

        if self.channeldock.max_pages == 0 {
            anyhow::bail!("max_pages must be greater than 0");
        }

        if self.http.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        if self.carrier.requests_per_second == 0 {
            anyhow::bail!("requests_per_second must be positive");
        }

        Url::parse(&self.channeldock.base_url)
            .with_context(|| format!("Invalid ChannelDock URL: {}", self.channeldock.base_url))?;
        Url::parse(&self.carrier.base_url)
            .with_context(|| format!("Invalid carrier URL: {}", self.carrier.base_url))?;

        for time in &self.schedule.times {
            NaiveTime::parse_from_str(time, "%H:%M")
                .with_context(|| format!("Invalid schedule time '{time}', expected HH:MM"))?;
        }

        Ok(())
    }

    /// Names of secrets that are still unset
    pub fn missing_secrets(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.channeldock.api_key.is_empty() {
            missing.push("CHANNELDOCK_API_KEY");
        }
        if self.channeldock.api_secret.is_empty() {
            missing.push("CHANNELDOCK_API_SECRET");
        }
        if self.carrier.email.is_empty() {
            missing.push("DHL_EMAIL");
        }
        if self.carrier.password.is_empty() {
            missing.push("DHL_PASSWORD");
        }
        missing
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }
}
