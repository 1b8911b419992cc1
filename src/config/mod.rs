//! # Configuration Management Module
//!
//! Type-safe TOML configuration with serde defaults and async load/save.
//! Sections:
//!
//! - [`BoardConfig`] - board identity (name, welcome line)
//! - [`BackendConfig`] - local backend data directory
//! - [`LoggingConfig`] - level and optional log file
//! - [`SecurityConfig`] - optional Argon2 tuning for credential hashing
//!
//! ```toml
//! [board]
//! name = "City Bus Board"
//! welcome_message = "Welcome to the bus information board."
//!
//! [backend]
//! data_dir = "./data"
//!
//! [logging]
//! level = "info"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub board: BoardConfig,
    pub backend: BackendConfig,
    pub logging: LoggingConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    pub name: String,
    pub welcome_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecurityConfig {
    #[serde(default)]
    pub argon2: Option<Argon2Config>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Argon2Config {
    #[serde(default)]
    pub memory_kib: Option<u32>,
    #[serde(default)]
    pub time_cost: Option<u32>,
    #[serde(default)]
    pub parallelism: Option<u32>,
}

impl SecurityConfig {
    /// Build Argon2 params from the tuning knobs, falling back to the
    /// library defaults for anything unset or out of range.
    pub fn argon2_params(&self) -> Option<argon2::Params> {
        let tuning = self.argon2.as_ref()?;
        let defaults = argon2::Params::default();
        argon2::Params::new(
            tuning.memory_kib.unwrap_or(defaults.m_cost()),
            tuning.time_cost.unwrap_or(defaults.t_cost()),
            tuning.parallelism.unwrap_or(defaults.p_cost()),
            None,
        )
        .ok()
    }
}

impl Config {
    /// Load configuration from a file.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;
        Ok(config)
    }

    /// Write a default configuration file.
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;
        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            board: BoardConfig {
                name: "Busboard".to_string(),
                welcome_message: "Welcome to the bus information board.".to_string(),
            },
            backend: BackendConfig {
                data_dir: "./data".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: None,
            },
            security: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.board.name, config.board.name);
        assert_eq!(parsed.backend.data_dir, config.backend.data_dir);
        assert!(parsed.security.is_none());
    }

    #[test]
    fn security_section_is_optional() {
        let toml_src = r#"
            [board]
            name = "Test Board"
            welcome_message = "hi"

            [backend]
            data_dir = "/tmp/busboard"

            [logging]
            level = "debug"
        "#;
        let config: Config = toml::from_str(toml_src).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.security.is_none());
    }

    #[test]
    fn argon2_params_from_tuning() {
        let security = SecurityConfig {
            argon2: Some(Argon2Config {
                memory_kib: Some(65536),
                time_cost: Some(3),
                parallelism: Some(2),
            }),
        };
        let params = security.argon2_params().expect("params");
        assert_eq!(params.m_cost(), 65536);
        assert_eq!(params.t_cost(), 3);
        assert_eq!(params.p_cost(), 2);
    }
}
