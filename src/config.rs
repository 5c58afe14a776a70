use crate::models::session::SESSION_DURATION_SECS;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const CONFIG_FILE: &str = "Lms.toml";
pub const ENV_PREFIX: &str = "LMS_";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    pub session: SessionConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    /// Absolute session lifetime measured from login.
    pub duration_secs: u64,
    /// Artificial latency of the mock authentication backend.
    pub simulated_latency_ms: u64,
    pub login_route: String,
    pub home_route: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_secs: SESSION_DURATION_SECS as u64,
            simulated_latency_ms: 1000,
            login_route: "/login".to_string(),
            home_route: "/".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn duration(&self) -> chrono::Duration {
        i64::try_from(self.duration_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".lms/session.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources in priority order:
    /// 1. Built-in defaults
    /// 2. Lms.toml (if present)
    /// 3. Environment variables prefixed with LMS_, nested with `__` (e.g. LMS_SESSION__DURATION_SECS)
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_match_session_contract() {
        let config = Config::default();
        assert_eq!(config.session.duration(), chrono::Duration::hours(24));
        assert_eq!(config.session.simulated_latency(), Duration::from_secs(1));
        assert_eq!(config.session.login_route, "/login");
        assert_eq!(config.session.home_route, "/");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn load_without_sources_uses_defaults() {
        Jail::expect_with(|_jail| {
            let config = Config::load()?;
            assert_eq!(config.session.duration_secs, 86_400);
            assert_eq!(config.storage.path, PathBuf::from(".lms/session.json"));
            Ok(())
        });
    }

    #[test]
    fn file_then_env_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                [session]
                duration_secs = 3600
                login_route = "/auth/login"

                [logging]
                json_format = true
                "#,
            )?;
            jail.set_env("LMS_SESSION__DURATION_SECS", "60");
            jail.set_env("LMS_STORAGE__PATH", "/tmp/lms.json");

            let config = Config::load()?;
            assert_eq!(config.session.duration_secs, 60);
            assert_eq!(config.session.login_route, "/auth/login");
            assert_eq!(config.session.simulated_latency_ms, 1000);
            assert_eq!(config.storage.path, PathBuf::from("/tmp/lms.json"));
            assert!(config.logging.json_format);
            Ok(())
        });
    }

    #[test]
    fn renders_as_toml() {
        let rendered = Config::default().to_toml().unwrap();
        assert!(rendered.contains("[session]"));
        assert!(rendered.contains("duration_secs = 86400"));
    }
}
