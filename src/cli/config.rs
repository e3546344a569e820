//! Configuration discovery and loading
//!
//! This module handles the configuration discovery hierarchy:
//! 1. Current directory: ./lrc.toml or ./.lrc/config.toml
//! 2. User config: ~/.lrc/config.toml
//! 3. System config: /etc/lrc/config.toml
//! 4. Built-in defaults
//!
//! Environment overrides are applied on top of whichever source wins.

use crate::{LrcConfig, env, session::ConfigError};
use std::env as std_env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Load `explicit` if given, otherwise discover; then apply env overrides
    pub fn load(explicit: Option<&Path>) -> Result<LrcConfig, ConfigError> {
        let mut config = match explicit {
            Some(path) => {
                info!("Loading configuration from: {:?}", path);
                LrcConfig::from_toml_file(path)?
            }
            None => Self::discover_config()?,
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Discover and load configuration using the hierarchy
    pub fn discover_config() -> Result<LrcConfig, ConfigError> {
        if let Some(config_path) = Self::find_config_file() {
            info!("Loading configuration from: {:?}", config_path);
            return LrcConfig::from_toml_file(config_path);
        }

        info!("No configuration file found, using defaults");
        Ok(LrcConfig::default())
    }

    /// Find configuration file using discovery hierarchy
    pub fn find_config_file() -> Option<PathBuf> {
        for candidate in Self::get_config_candidates() {
            debug!("Checking for config file: {:?}", candidate);
            if candidate.is_file() {
                debug!("Found config file: {:?}", candidate);
                return Some(candidate);
            }
        }

        debug!("No config file found in discovery hierarchy");
        None
    }

    /// Get list of configuration file candidates in priority order
    fn get_config_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = std_env::current_dir() {
            candidates.push(current_dir.join(env::LOCAL_CONFIG_FILE_NAME));
            candidates.push(env::local_config_file_path(&current_dir));
        }

        if let Some(home_dir) = Self::get_home_dir() {
            candidates.push(env::user_config_file_path(&home_dir));
        }

        #[cfg(unix)]
        candidates.push(PathBuf::from("/etc/lrc/config.toml"));

        #[cfg(windows)]
        if let Ok(program_data) = std_env::var("PROGRAMDATA") {
            candidates.push(PathBuf::from(program_data).join("lrc").join("config.toml"));
        }

        candidates
    }

    fn get_home_dir() -> Option<PathBuf> {
        std_env::var("HOME")
            .ok()
            .or_else(|| std_env::var("USERPROFILE").ok())
            .map(PathBuf::from)
    }

    /// Show configuration discovery information for debugging
    pub fn show_discovery_info() {
        println!("Configuration Discovery Hierarchy:");
        println!();

        for (i, candidate) in Self::get_config_candidates().iter().enumerate() {
            let status = if candidate.exists() {
                if candidate.is_file() {
                    "✓ EXISTS"
                } else {
                    "✗ NOT A FILE"
                }
            } else {
                "✗ NOT FOUND"
            };

            println!("  {}. {:?} - {}", i + 1, candidate, status);
        }

        println!();
        match Self::find_config_file() {
            Some(found) => println!("Active configuration: {:?}", found),
            None => println!("Active configuration: Built-in defaults"),
        }

        for var in [env::FABRIC_URL_VAR, env::AUTH_TOKEN_VAR] {
            let state = if std_env::var(var).is_ok() { "set" } else { "unset" };
            println!("  {}: {}", var, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_config_file_operations() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("lrc.toml");

        let mut original = LrcConfig::default();
        original.fabric.url = "https://fabric.example.com".to_string();
        original.to_toml_file(&config_path).unwrap();
        assert!(config_path.exists());

        let loaded = LrcConfig::from_toml_file(&config_path).unwrap();
        assert_eq!(loaded.fabric.url, original.fabric.url);
        assert_eq!(loaded.polling, original.polling);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = LrcConfig::from_toml_file(temp_dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_config_candidates() {
        let candidates = ConfigDiscovery::get_config_candidates();

        assert!(!candidates.is_empty());
        assert!(candidates[0].file_name().unwrap() == "lrc.toml");
    }

    #[test]
    #[serial]
    fn test_env_overrides_apply_on_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("lrc.toml");
        std::fs::write(
            &config_path,
            "[fabric]\nurl = \"https://from-file.example.com\"\n",
        )
        .unwrap();

        // SAFETY: serialized with other env-mutating tests
        unsafe {
            std_env::set_var(env::FABRIC_URL_VAR, "https://from-env.example.com");
            std_env::set_var(env::AUTH_TOKEN_VAR, "atxsj_env");
        }
        let config = ConfigDiscovery::load(Some(config_path.as_path()));
        unsafe {
            std_env::remove_var(env::FABRIC_URL_VAR);
            std_env::remove_var(env::AUTH_TOKEN_VAR);
        }

        let config = config.unwrap();
        assert_eq!(config.fabric.url, "https://from-env.example.com");
        assert_eq!(config.fabric.auth_token.as_deref(), Some("atxsj_env"));
    }
}
