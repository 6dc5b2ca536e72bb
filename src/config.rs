//! Configuration types for submission-relay
//!
//! The configuration is read once at process start (see [`Config::from_env`])
//! and handed to the pipeline by reference. Components never consult the
//! environment themselves.
//!
//! Values for the external collaborators are not validated here:
//! an empty bucket or API key surfaces as a failure of the step that needs it,
//! and that failure is folded into the run outcome like any other.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Archive storage settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base64-encoded service-account JSON (`GOOGLE_CREDENTIALS`)
    #[serde(default)]
    pub credentials: String,

    /// Target bucket (`BUCKET_NAME`)
    #[serde(default)]
    pub bucket: String,

    /// Storage API base URL (default: "https://storage.googleapis.com")
    #[serde(default = "default_storage_api_base")]
    pub api_base: String,

    /// Write to this local directory instead of the storage API (`ARCHIVE_DIR`)
    ///
    /// Objects land at `<archive_dir>/<bucket>/<key>`.
    #[serde(default)]
    pub archive_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            credentials: String::new(),
            bucket: String::new(),
            api_base: default_storage_api_base(),
            archive_dir: None,
        }
    }
}

/// Outbound email settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MailConfig {
    /// Mail API key (`MAILGUN_API`)
    #[serde(default)]
    pub api_key: String,

    /// Sending domain (`EMAIL_DOMAIN`)
    #[serde(default)]
    pub domain: String,

    /// From address (`EMAIL_SENDER`, default: "mailgun@<domain>")
    #[serde(default)]
    pub sender: Option<String>,

    /// Mail API base URL (default: "https://api.mailgun.net")
    #[serde(default = "default_mail_api_base")]
    pub api_base: String,

    /// Upper bound for one dispatch (default: 30 seconds)
    #[serde(default = "default_mail_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl MailConfig {
    /// Address every notification is sent from
    pub fn sender_address(&self) -> String {
        match &self.sender {
            Some(sender) => sender.clone(),
            None => format!("mailgun@{}", self.domain),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            domain: String::new(),
            sender: None,
            api_base: default_mail_api_base(),
            timeout: default_mail_timeout(),
        }
    }
}

/// Audit log settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditConfig {
    /// SQLite file holding the audit table (default: "./audit.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Audit table name (`DYNAMO_TABLE`, default: "email_tracking")
    #[serde(default = "default_table_name")]
    pub table_name: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            table_name: default_table_name(),
        }
    }
}

/// Submission download settings
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout (None = transport default)
    #[serde(default, with = "optional_duration_serde")]
    pub timeout: Option<Duration>,
}

/// REST adapter settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8080)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

/// Main configuration
///
/// Sub-configs map one-to-one to pipeline collaborators:
/// - [`storage`](StorageConfig): archive writer
/// - [`mail`](MailConfig): notification dispatcher
/// - [`audit`](AuditConfig): audit recorder
/// - [`fetch`](FetchConfig): submission fetcher
/// - [`server`](ApiConfig): REST adapter
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Archive storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Outbound email
    #[serde(default)]
    pub mail: MailConfig,

    /// Audit log
    #[serde(default)]
    pub audit: AuditConfig,

    /// Submission download
    #[serde(default)]
    pub fetch: FetchConfig,

    /// REST adapter
    #[serde(default)]
    pub server: ApiConfig,
}

impl Config {
    /// Build the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    ///
    /// Unset keys fall back to defaults. Only values that must be parsed
    /// (durations, addresses) can fail.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(credentials) = lookup("GOOGLE_CREDENTIALS") {
            config.storage.credentials = credentials;
        }
        if let Some(bucket) = lookup("BUCKET_NAME") {
            config.storage.bucket = bucket;
        }
        if let Some(api_base) = lookup("GCS_API_BASE") {
            config.storage.api_base = api_base;
        }
        config.storage.archive_dir = lookup("ARCHIVE_DIR")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);

        if let Some(api_key) = lookup("MAILGUN_API") {
            config.mail.api_key = api_key;
        }
        if let Some(domain) = lookup("EMAIL_DOMAIN") {
            config.mail.domain = domain;
        }
        config.mail.sender = lookup("EMAIL_SENDER").filter(|sender| !sender.is_empty());
        if let Some(api_base) = lookup("MAILGUN_API_BASE") {
            config.mail.api_base = api_base;
        }
        if let Some(secs) = lookup("EMAIL_TIMEOUT_SECS") {
            config.mail.timeout = parse_secs("EMAIL_TIMEOUT_SECS", &secs)?;
        }

        if let Some(table) = lookup("DYNAMO_TABLE") {
            config.audit.table_name = table;
        }
        if let Some(path) = lookup("AUDIT_DATABASE_PATH") {
            config.audit.database_path = PathBuf::from(path);
        }

        if let Some(secs) = lookup("FETCH_TIMEOUT_SECS") {
            config.fetch.timeout = Some(parse_secs("FETCH_TIMEOUT_SECS", &secs)?);
        }

        if let Some(address) = lookup("BIND_ADDRESS") {
            config.server.bind_address = address.parse().map_err(|e| Error::Config {
                message: format!("invalid bind address {:?}: {}", address, e),
                key: Some("BIND_ADDRESS".to_string()),
            })?;
        }

        Ok(config)
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| Error::Config {
            message: format!("{} must be a whole number of seconds, got {:?}: {}", key, value, e),
            key: Some(key.to_string()),
        })
}

fn default_storage_api_base() -> String {
    "https://storage.googleapis.com".to_string()
}

fn default_mail_api_base() -> String {
    "https://api.mailgun.net".to_string()
}

fn default_mail_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./audit.db")
}

fn default_table_name() -> String {
    "email_tracking".to_string()
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
