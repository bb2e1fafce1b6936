//! TOML loader for the movement pattern configuration.
//!
//! The schema itself lives in `hidrelay_core::pattern::config` next to the
//! engine that consumes it; this module only deals with the file system.
//!
//! Error policy (deliberate, and different from a typical config loader):
//! a missing file is the normal first-run case and yields the defaults
//! silently at info level; a malformed file is an operator mistake that is
//! logged once as a warning and *also* yields the defaults. Startup never
//! fails because of this file.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use hidrelay_core::pattern::MovementConfig;

/// Default location of the pattern configuration file.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("/etc/hidrelay/patterns.toml")
}

/// Loads the movement configuration, falling back to built-in defaults on
/// any failure.
pub fn load_movement_config(path: &Path) -> MovementConfig {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no pattern config; using built-in defaults");
            return MovementConfig::default();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read pattern config; using defaults");
            return MovementConfig::default();
        }
    };

    match toml::from_str(&content) {
        Ok(config) => {
            info!(path = %path.display(), "loaded movement pattern config");
            config
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed pattern config; using defaults");
            MovementConfig::default()
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use hidrelay_core::pattern::{Param, PatternName};

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hidrelay_cfg_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = load_movement_config(Path::new("/nonexistent/patterns.toml"));
        assert_eq!(config, MovementConfig::default());
    }

    #[test]
    fn test_valid_file_is_loaded() {
        let path = temp_dir().join("valid.toml");
        std::fs::write(
            &path,
            r#"
default_pattern = "circle"
random_pattern_change_interval = 45.0

[patterns.circle]
radius = 15.0
steps = [10, 40]
delay = 0.02
"#,
        )
        .unwrap();

        let config = load_movement_config(&path);

        assert_eq!(config.default_pattern, PatternName::Circle);
        assert_eq!(config.random_pattern_change_interval, 45.0);
        assert_eq!(config.patterns.circle.radius, Param::Fixed(15.0));
        assert_eq!(config.patterns.circle.steps, Param::Range(10.0, 40.0));
        assert_eq!(config.patterns.circle.delay, 0.02);
        // Sections absent from the file keep their defaults.
        assert_eq!(
            config.patterns.square,
            MovementConfig::default().patterns.square
        );
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let path = temp_dir().join("malformed.toml");
        std::fs::write(&path, "default_pattern = [[[ not toml").unwrap();

        let config = load_movement_config(&path);

        assert_eq!(config, MovementConfig::default());
    }

    #[test]
    fn test_unknown_pattern_name_falls_back_to_defaults() {
        let path = temp_dir().join("unknown_pattern.toml");
        std::fs::write(&path, "default_pattern = \"spiral\"").unwrap();

        let config = load_movement_config(&path);

        assert_eq!(config.default_pattern, MovementConfig::default().default_pattern);
    }
}
