use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// 旧版主机，目前只有加密钱包接口还在上面
    pub legacy_base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.dspice.co.uk/api".to_string(),
            legacy_base_url: "https://dspice.co.uk/api".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "dspice-store.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    pub tick_interval_ms: u64,
    pub poll_interval_secs: u64,
    pub reactivation_cooldown_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            poll_interval_secs: 30,
            reactivation_cooldown_secs: 180,
        }
    }
}

impl WatchConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn reactivation_cooldown(&self) -> Duration {
        Duration::from_secs(self.reactivation_cooldown_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub catalog_ttl_secs: u64,
    pub services_ttl_secs: u64,
    pub account_ttl_secs: u64,
    pub saved_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            catalog_ttl_secs: 24 * 3600,
            services_ttl_secs: 3600,
            account_ttl_secs: 600,
            saved_ttl_secs: 30 * 24 * 3600,
        }
    }
}

impl Config {
    pub fn from_toml() -> AppResult<Self> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 配置文件不存在时完全依赖默认值与环境变量
        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("No config file at {config_path}, using defaults and environment");
                Config::default()
            }
            Err(e) => {
                return Err(AppError::ConfigError(format!(
                    "Unable to read config file {config_path}: {e}"
                )));
            }
        };

        config.apply_env(|name| env::var(name).ok());
        Ok(config)
    }

    pub fn parse(config_str: &str) -> AppResult<Self> {
        toml::from_str(config_str)
            .map_err(|e| AppError::ConfigError(format!("Failed to parse config file: {e}")))
    }

    /// 环境变量覆盖（即便文件存在时也覆盖）
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse_into<T: std::str::FromStr>(value: Option<String>, target: &mut T) {
            if let Some(v) = value
                && let Ok(parsed) = v.parse()
            {
                *target = parsed;
            }
        }

        if let Some(v) = lookup("SERVER_HOST") {
            self.server.host = v;
        }
        parse_into(lookup("SERVER_PORT"), &mut self.server.port);

        if let Some(v) = lookup("DSPICE_API_URL") {
            self.api.base_url = v;
        }
        if let Some(v) = lookup("DSPICE_LEGACY_API_URL") {
            self.api.legacy_base_url = v;
        }
        parse_into(lookup("DSPICE_API_TIMEOUT"), &mut self.api.timeout_secs);

        if let Some(v) = lookup("DSPICE_STORE_PATH") {
            self.storage.path = v;
        }

        parse_into(lookup("WATCH_TICK_MS"), &mut self.watch.tick_interval_ms);
        parse_into(lookup("WATCH_POLL_SECS"), &mut self.watch.poll_interval_secs);
        parse_into(
            lookup("REACTIVATION_COOLDOWN_SECS"),
            &mut self.watch.reactivation_cooldown_secs,
        );

        parse_into(lookup("CACHE_CATALOG_TTL"), &mut self.cache.catalog_ttl_secs);
        parse_into(lookup("CACHE_SERVICES_TTL"), &mut self.cache.services_ttl_secs);
        parse_into(lookup("CACHE_ACCOUNT_TTL"), &mut self.cache.account_ttl_secs);
        parse_into(lookup("CACHE_SAVED_TTL"), &mut self.cache.saved_ttl_secs);
    }
}
