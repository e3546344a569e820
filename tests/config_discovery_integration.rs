use lrc::cli::ConfigDiscovery;
use lrc::{ConfigError, LrcConfig};
use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// RAII guard that restores the original directory when dropped
struct DirectoryGuard {
    original_dir: PathBuf,
}

impl DirectoryGuard {
    fn new(workspace: &Path) -> Result<Self, std::io::Error> {
        let original_dir = std::env::current_dir()?;
        std::env::set_current_dir(workspace)?;
        Ok(Self { original_dir })
    }
}

impl Drop for DirectoryGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original_dir);
    }
}

#[test]
#[serial]
fn test_local_file_wins_over_hidden_dir() {
    let workspace = TempDir::new().unwrap();
    fs::create_dir_all(workspace.path().join(".lrc")).unwrap();
    fs::write(
        workspace.path().join(".lrc/config.toml"),
        "[fabric]\nurl = \"https://hidden.example.com\"\n",
    )
    .unwrap();
    fs::write(
        workspace.path().join("lrc.toml"),
        "[fabric]\nurl = \"https://local.example.com\"\n",
    )
    .unwrap();

    let _guard = DirectoryGuard::new(workspace.path()).unwrap();
    let config = ConfigDiscovery::discover_config().unwrap();

    assert_eq!(config.fabric.url, "https://local.example.com");
}

#[test]
#[serial]
fn test_hidden_dir_config_discovered() {
    let workspace = TempDir::new().unwrap();
    fs::create_dir_all(workspace.path().join(".lrc")).unwrap();
    fs::write(
        workspace.path().join(".lrc/config.toml"),
        r#"
[polling]
interval_ms = 250

[streams.lobby]
object_id = "iq__Lobby"
library_id = "ilibLive"
"#,
    )
    .unwrap();

    let _guard = DirectoryGuard::new(workspace.path()).unwrap();
    let found = ConfigDiscovery::find_config_file().unwrap();
    assert!(found.ends_with(".lrc/config.toml"));

    let config = ConfigDiscovery::discover_config().unwrap();
    assert_eq!(config.polling.interval_ms, 250);
    assert_eq!(config.polling.max_attempts, 10);
    assert_eq!(config.streams["lobby"].object_id, "iq__Lobby");
}

#[test]
fn test_explicit_path_is_used() {
    let workspace = TempDir::new().unwrap();
    let path = workspace.path().join("custom.toml");
    fs::write(
        &path,
        "[streams.s1]\nobject_id = \"iq__X\"\nlibrary_id = \"ilibY\"\n",
    )
    .unwrap();

    let config = ConfigDiscovery::load(Some(path.as_path())).unwrap();
    assert!(config.streams.contains_key("s1"));
}

#[test]
fn test_empty_object_id_rejected() {
    let config = LrcConfig::from_toml_str(
        "[streams.s1]\nobject_id = \"  \"\nlibrary_id = \"ilibY\"\n",
    )
    .unwrap();

    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}
