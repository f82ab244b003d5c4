//! Configuration for the OptiControl server.
//!
//! The raw file is TOML and every section is optional:
//!
//! ```toml
//! [server]
//! listen = "127.0.0.1:3000"
//! production = false
//!
//! [auth]
//! jwt_secret = "${JWT_SECRET}"
//! token_ttl_days = 7
//!
//! [webhook]
//! url = "${N8N_WEBHOOK_URL}"
//! timeout_seconds = 60
//!
//! [storage]
//! backend = "file"            # or "memory"
//! data_dir = "/var/lib/opticontrol"
//!
//! [[users]]
//! id = "user-001"
//! email = "demo@opticontrol.ai"
//! password = "demo1234"
//! name = "Alex"
//! ```
//!
//! [`OptiConfig::resolve`] layers environment overrides and defaults on top
//! of the file and validates the result into [`Settings`].

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use opticontrol_utils::mask;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "OPTICONTROL_CONFIG";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const WEBHOOK_URL_ENV: &str = "N8N_WEBHOOK_URL";
pub const LISTEN_ENV: &str = "OPTICONTROL_LISTEN";
/// `production` enables the `Secure` cookie attribute.
pub const ENVIRONMENT_ENV: &str = "OPTICONTROL_ENV";

pub const DEFAULT_LISTEN: &str = "127.0.0.1:3000";
pub const DEFAULT_JWT_SECRET: &str = "opticontrol-dev-secret-32chars!!";
pub const DEFAULT_TOKEN_TTL_DAYS: u64 = 7;
pub const MAX_TOKEN_TTL_DAYS: u64 = 365;
const SECS_PER_DAY: u64 = 24 * 60 * 60;
pub const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 60;
pub const MIN_JWT_SECRET_BYTES: usize = 32;

#[derive(Debug, Default, Deserialize)]
pub struct OptiConfig {
    pub server: Option<ServerConfig>,
    pub auth: Option<AuthConfig>,
    pub webhook: Option<WebhookConfig>,
    pub storage: Option<StorageConfig>,
    /// Demo accounts. Empty means the built-in pair.
    #[serde(default)]
    pub users: Vec<DemoUserConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerConfig {
    pub listen: Option<String>,
    #[serde(default)]
    pub production: bool,
}

#[derive(Default, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub token_ttl_days: Option<u64>,
}

// Manual Debug impl to prevent leaking the signing secret in logs.
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &mask(self.jwt_secret.as_deref()))
            .field("token_ttl_days", &self.token_ttl_days)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookConfig {
    pub url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StorageConfig {
    pub backend: Option<String>,
    pub data_dir: Option<String>,
}

#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct DemoUserConfig {
    pub id: String,
    pub email: String,
    pub password: String,
    pub name: String,
}

impl fmt::Debug for DemoUserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DemoUserConfig")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password", &mask(Some(&self.password)))
            .field("name", &self.name)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("webhook url is not configured; set [webhook] url or N8N_WEBHOOK_URL")]
    MissingWebhookUrl,
    #[error("invalid webhook url '{url}': {reason}")]
    InvalidWebhookUrl { url: String, reason: String },
    #[error("jwt secret must be at least 32 bytes (got {len})")]
    WeakSecret { len: usize },
    #[error("invalid listen address '{0}'")]
    InvalidListen(String),
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },
    #[error("auth.token_ttl_days must be at most {max} (got {value})")]
    TokenTtlTooLong { value: u64, max: u64 },
    #[error("unknown storage backend '{0}'; expected \"file\" or \"memory\"")]
    UnknownStorageBackend(String),
    #[error("duplicate demo user {field} '{value}'")]
    DuplicateUser { field: &'static str, value: String },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Validated runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub webhook: WebhookSettings,
    pub storage: StorageSettings,
    pub users: Vec<DemoUserConfig>,
}

#[derive(Debug, Clone, Copy)]
pub struct ServerSettings {
    pub listen: SocketAddr,
    /// Mark the auth cookie `Secure`.
    pub production: bool,
}

#[derive(Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl: Duration,
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &mask(Some(&self.jwt_secret)))
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    File,
    Memory,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
}

/// Built-in demo accounts.
#[must_use]
pub fn default_users() -> Vec<DemoUserConfig> {
    vec![
        DemoUserConfig {
            id: "user-001".to_string(),
            email: "demo@opticontrol.ai".to_string(),
            password: "demo1234".to_string(),
            name: "Alex".to_string(),
        },
        DemoUserConfig {
            id: "user-002".to_string(),
            email: "admin@opticontrol.ai".to_string(),
            password: "admin1234".to_string(),
            name: "Admin".to_string(),
        },
    ]
}

/// Expand `${VAR}` references through `lookup`.
///
/// Missing variables expand to the empty string. Unclosed `${` is kept as-is.
pub fn expand_vars_with(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                if name.is_empty() {
                    out.push_str("${}");
                } else {
                    out.push_str(&lookup(name).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                return out;
            }
        }
    }

    out.push_str(rest);
    out
}

impl OptiConfig {
    /// Load the config file, if one exists.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            tracing::warn!("Failed to read config at {}: {source}", path.display());
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| {
            tracing::warn!("Failed to parse config at {}: {source}", path.display());
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    /// Resolve against the process environment.
    pub fn resolve_from_env(self) -> Result<Settings, ConfigError> {
        self.resolve(|name| std::env::var(name).ok())
    }

    /// Apply env overrides, `${VAR}` expansion and defaults, then validate.
    ///
    /// Override variables win over file values.
    pub fn resolve(self, env: impl Fn(&str) -> Option<String>) -> Result<Settings, ConfigError> {
        let expand = |raw: String| expand_vars_with(&raw, &env);
        let non_empty = |value: String| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };

        let server = self.server.unwrap_or_default();
        let listen_raw = env(LISTEN_ENV)
            .or_else(|| server.listen.map(&expand))
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen = listen_raw
            .parse::<SocketAddr>()
            .map_err(|_err| ConfigError::InvalidListen(listen_raw.clone()))?;
        let production = server.production
            || env(ENVIRONMENT_ENV).is_some_and(|v| v.trim().eq_ignore_ascii_case("production"));

        let auth = self.auth.unwrap_or_default();
        let jwt_secret = env(JWT_SECRET_ENV)
            .or_else(|| auth.jwt_secret.map(&expand))
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string());
        if jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::WeakSecret {
                len: jwt_secret.len(),
            });
        }
        if production && jwt_secret == DEFAULT_JWT_SECRET {
            tracing::warn!("Running in production with the built-in development JWT secret");
        }
        let ttl_days = auth.token_ttl_days.unwrap_or(DEFAULT_TOKEN_TTL_DAYS);
        if ttl_days == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "auth.token_ttl_days",
            });
        }
        let token_ttl = ttl_days
            .checked_mul(SECS_PER_DAY)
            .filter(|_| ttl_days <= MAX_TOKEN_TTL_DAYS)
            .map(Duration::from_secs)
            .ok_or(ConfigError::TokenTtlTooLong {
                value: ttl_days,
                max: MAX_TOKEN_TTL_DAYS,
            })?;

        let webhook = self.webhook.unwrap_or_default();
        let url_raw = env(WEBHOOK_URL_ENV)
            .or_else(|| webhook.url.map(&expand))
            .and_then(non_empty)
            .ok_or(ConfigError::MissingWebhookUrl)?;
        let url = parse_webhook_url(&url_raw)?;
        let timeout_secs = webhook
            .timeout_seconds
            .unwrap_or(DEFAULT_WEBHOOK_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "webhook.timeout_seconds",
            });
        }

        let storage = self.storage.unwrap_or_default();
        let backend = match storage
            .backend
            .map(|b| b.trim().to_ascii_lowercase())
            .as_deref()
        {
            None | Some("file") => StorageBackend::File,
            Some("memory") => StorageBackend::Memory,
            Some(other) => return Err(ConfigError::UnknownStorageBackend(other.to_string())),
        };
        let data_dir = storage
            .data_dir
            .map(&expand)
            .and_then(non_empty)
            .map_or_else(default_data_dir, PathBuf::from);

        let users = if self.users.is_empty() {
            default_users()
        } else {
            self.users
        };
        check_unique_users(&users)?;

        Ok(Settings {
            server: ServerSettings { listen, production },
            auth: AuthSettings {
                jwt_secret,
                token_ttl,
            },
            webhook: WebhookSettings {
                url,
                timeout: Duration::from_secs(timeout_secs),
            },
            storage: StorageSettings { backend, data_dir },
            users,
        })
    }
}

fn parse_webhook_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidWebhookUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidWebhookUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

fn check_unique_users(users: &[DemoUserConfig]) -> Result<(), ConfigError> {
    for (i, user) in users.iter().enumerate() {
        let earlier = &users[..i];
        if earlier.iter().any(|u| u.id == user.id) {
            return Err(ConfigError::DuplicateUser {
                field: "id",
                value: user.id.clone(),
            });
        }
        if earlier.iter().any(|u| u.email == user.email) {
            return Err(ConfigError::DuplicateUser {
                field: "email",
                value: user.email.clone(),
            });
        }
    }
    Ok(())
}

/// `$OPTICONTROL_CONFIG`, else `~/.opticontrol/config.toml`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV)
        && !explicit.trim().is_empty()
    {
        return Some(PathBuf::from(explicit));
    }
    dirs::home_dir().map(|home| home.join(".opticontrol").join("config.toml"))
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir().map_or_else(
        || PathBuf::from(".opticontrol"),
        |dir| dir.join("opticontrol"),
    )
}
