//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the TOML file.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::session::{CookieSettings, SameSite, SecureCookies};

/// Root configuration for the plan store server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub listener: ListenerConfig,

    /// Where the JSON documents live.
    pub storage: StorageConfig,

    pub sessions: SessionConfig,

    pub identity: IdentityConfig,

    /// Accounts allowed to log in.
    pub users: Vec<UserConfig>,

    pub timeouts: TimeoutConfig,

    pub security: SecurityConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding every document file.
    pub data_dir: PathBuf,

    pub plans_file: String,
    pub templates_file: String,
    pub highlights_file: String,
    pub snippets_file: String,

    /// Replace an unreadable document with its default (keeping a
    /// `.corrupt-*` copy) instead of refusing to start.
    pub recover_corrupt: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            plans_file: "plans.json".to_string(),
            templates_file: "templates.json".to_string(),
            highlights_file: "highlights.json".to_string(),
            snippets_file: "snippets.json".to_string(),
            recover_corrupt: false,
        }
    }
}

impl StorageConfig {
    pub fn file_names(&self) -> [&str; 4] {
        [
            &self.plans_file,
            &self.templates_file,
            &self.highlights_file,
            &self.snippets_file,
        ]
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    pub ttl_secs: u64,

    pub cookie_name: String,

    /// `strict`, `lax` or `none`.
    pub same_site: String,

    pub secure_cookies: SecureCookies,

    /// How often expired sessions are swept from the token store.
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60 * 60 * 12,
            cookie_name: "session".to_string(),
            same_site: "lax".to_string(),
            secure_cookies: SecureCookies::Auto,
            sweep_interval_secs: 300,
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Cookie settings; call after validation.
    pub fn cookie_settings(&self) -> CookieSettings {
        CookieSettings {
            name: self.cookie_name.clone(),
            path: "/".to_string(),
            same_site: self.same_site.parse().unwrap_or(SameSite::Lax),
            secure: self.secure_cookies,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct IdentityConfig {
    /// Accept `X-User-*` headers from callers without a session.
    /// Only for internal callers and tests.
    pub trust_headers: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserConfig {
    /// Stable identifier; defaults to the username.
    #[serde(default)]
    pub id: Option<String>,

    pub username: String,

    /// Argon2 PHC string (see `plan-store --hash-password`).
    pub password_hash: String,

    #[serde(default)]
    pub roles: Vec<String>,

    #[serde(default)]
    pub admin: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request body in bytes.
    pub max_body_size: usize,

    /// Value of `Access-Control-Allow-Origin` on preflight responses.
    pub cors_allow_origin: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024,
            cors_allow_origin: "*".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub log_level: String,

    pub log_format: LogFormat,

    pub metrics_enabled: bool,

    /// Prometheus scrape address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "plan_store=info,tower_http=info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
