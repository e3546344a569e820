//! Session name lookup.
//!
//! Maps a session (stream) name to the content object that carries its live
//! recording metadata. Loaded once from configuration, immutable afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Errors raised while loading or validating configuration
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(String),
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// One session as written in the configuration file, keyed by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub object_id: String,
    pub library_id: String,
    /// Ingress node used when the object metadata does not name one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_hint: Option<String>,
}

/// Static identifiers of one live recording session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionConfig {
    pub name: String,
    pub object_id: String,
    pub library_id: String,
    pub node_hint: Option<String>,
}

/// Immutable name → [`SessionConfig`] table
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<String, SessionConfig>,
}

impl SessionRegistry {
    pub fn from_entries(entries: &BTreeMap<String, SessionEntry>) -> Result<Self, ConfigError> {
        let mut sessions = BTreeMap::new();

        for (name, entry) in entries {
            if entry.object_id.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "session '{}' has an empty object_id",
                    name
                )));
            }
            if entry.library_id.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "session '{}' has an empty library_id",
                    name
                )));
            }

            sessions.insert(
                name.clone(),
                SessionConfig {
                    name: name.clone(),
                    object_id: entry.object_id.trim().to_string(),
                    library_id: entry.library_id.trim().to_string(),
                    node_hint: entry.node_hint.clone(),
                },
            );
        }

        Ok(Self { sessions })
    }

    pub fn from_configs(configs: impl IntoIterator<Item = SessionConfig>) -> Self {
        Self {
            sessions: configs
                .into_iter()
                .map(|config| (config.name.clone(), config))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SessionConfig> {
        self.sessions.get(name)
    }

    /// Library that holds `object_id`, as far as configuration knows
    pub fn library_id_for(&self, object_id: &str) -> Option<&str> {
        self.sessions
            .values()
            .find(|config| config.object_id == object_id)
            .map(|config| config.library_id.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sessions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> BTreeMap<String, SessionEntry> {
        let mut entries = BTreeMap::new();
        entries.insert(
            "s1".to_string(),
            SessionEntry {
                object_id: "iq__X".to_string(),
                library_id: "ilibY".to_string(),
                node_hint: None,
            },
        );
        entries
    }

    #[test]
    fn test_lookup_by_name_and_object() {
        let registry = SessionRegistry::from_entries(&entries()).unwrap();

        let config = registry.get("s1").unwrap();
        assert_eq!(config.name, "s1");
        assert_eq!(config.object_id, "iq__X");
        assert_eq!(registry.library_id_for("iq__X"), Some("ilibY"));
        assert!(registry.get("unknown").is_none());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["s1"]);
    }

    #[test]
    fn test_empty_ids_rejected() {
        let mut entries = entries();
        entries.get_mut("s1").unwrap().library_id = " ".to_string();

        assert!(matches!(
            SessionRegistry::from_entries(&entries),
            Err(ConfigError::Invalid(_))
        ));
    }
}
