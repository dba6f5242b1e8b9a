use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{Error, Result, env_subst::substitute_env, schema::BeaconConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["beacon.toml", "beacon.yaml", "beacon.yml", "beacon.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<BeaconConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./beacon.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/beacon/beacon.{toml,yaml,yml,json}` (user-global)
///
/// Returns `BeaconConfig::default()` if no config file is found or the one
/// found cannot be parsed.
pub fn discover_and_load() -> BeaconConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    BeaconConfig::default()
}

fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/beacon/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "beacon").map(|d| d.config_dir().to_path_buf())
}

/// Returns the data directory holding receiver state, falling back to `./`.
pub fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "beacon")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Apply `BEACON_SENDER_ID` / `BEACON_STORE_PATH` overrides from the environment.
pub fn apply_env_overrides(config: &mut BeaconConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut BeaconConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(sender_id) = lookup("BEACON_SENDER_ID").filter(|s| !s.is_empty()) {
        config.sender_id = Some(sender_id);
    }
    if let Some(path) = lookup("BEACON_STORE_PATH").filter(|s| !s.is_empty()) {
        config.store.path = Some(PathBuf::from(path));
    }
}

fn parse_config(raw: &str, path: &Path) -> Result<BeaconConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => Err(Error::UnsupportedFormat {
            extension: ext.to_string(),
        }),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, tempfile::TempDir};

    #[rstest]
    #[case::toml("beacon.toml", "sender_id = \"123\"\n[store]\npath = \"/tmp/s.json\"\n")]
    #[case::yaml("beacon.yaml", "sender_id: \"123\"\nstore:\n  path: /tmp/s.json\n")]
    #[case::json("beacon.json", r#"{"sender_id":"123","store":{"path":"/tmp/s.json"}}"#)]
    fn loads_every_format(#[case] name: &str, #[case] body: &str) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(name);
        std::fs::write(&path, body).unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.sender_id.as_deref(), Some("123"));
        assert_eq!(cfg.store.path, Some(PathBuf::from("/tmp/s.json")));
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn empty_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("beacon.toml");
        std::fs::write(&path, "").unwrap();
        assert_eq!(load_config(&path).unwrap(), BeaconConfig::default());
    }

    #[test]
    fn unsupported_extension_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("beacon.ini");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            load_config(&path).unwrap_err(),
            Error::UnsupportedFormat { .. }
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_config(Path::new("/nonexistent/beacon.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/beacon.toml"));
    }

    #[test]
    fn env_overrides_replace_config_values() {
        let mut cfg = BeaconConfig::default();
        apply_env_overrides_with(&mut cfg, |name| match name {
            "BEACON_SENDER_ID" => Some("987".into()),
            "BEACON_STORE_PATH" => Some("/var/lib/beacon/state.json".into()),
            _ => None,
        });
        assert_eq!(cfg.sender_id.as_deref(), Some("987"));
        assert_eq!(
            cfg.store.resolved_path(),
            PathBuf::from("/var/lib/beacon/state.json")
        );
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut cfg = BeaconConfig {
            sender_id: Some("1".into()),
            ..Default::default()
        };
        apply_env_overrides_with(&mut cfg, |_| Some(String::new()));
        assert_eq!(cfg.sender_id.as_deref(), Some("1"));
        assert!(cfg.store.path.is_none());
    }

    #[test]
    fn default_store_path_lives_in_data_dir() {
        let path = BeaconConfig::default().store.resolved_path();
        assert!(path.ends_with(crate::STATE_FILE_NAME));
    }
}
