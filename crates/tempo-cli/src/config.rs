//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tempo_core::FocusConfig;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Pomodoro durations.
    #[serde(default)]
    pub focus: FocusConfig,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("tempo.db"),
            focus: FocusConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources win: defaults, `~/.config/tempo/config.toml`, the given
    /// file, then `TEMPO_*` environment variables (`TEMPO_FOCUS__FOCUS_MINUTES=50`).
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("TEMPO_").split("__"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for tempo.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tempo"))
}

/// Returns the platform-specific data directory for tempo.
///
/// On Linux: `~/.local/share/tempo`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("tempo"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use figment::Jail;

    #[test]
    fn test_dirs_data_path_ends_with_tempo() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "tempo");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("tempo.db"));
        assert_eq!(config.focus, FocusConfig::default());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        Jail::expect_with(|jail| {
            let config_home = jail.directory().join("config");
            jail.set_env("XDG_CONFIG_HOME", config_home.display());

            let config = Config::load_from(None)?;
            assert!(config.database_path.ends_with("tempo/tempo.db"));
            assert_eq!(config.focus, FocusConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_config_file_and_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "tempo.toml",
                r#"
                database_path = "/tmp/custom.db"

                [focus]
                focus_minutes = 50
                break_minutes = 10
                "#,
            )?;
            jail.set_env("TEMPO_FOCUS__BREAK_MINUTES", "7");

            let config = Config::load_from(Some(Path::new("tempo.toml")))?;
            assert_eq!(config.database_path, PathBuf::from("/tmp/custom.db"));
            assert_eq!(config.focus.focus_minutes, 50);
            assert_eq!(config.focus.break_minutes, 7);
            assert_eq!(config.focus.long_break_minutes, 15);
            Ok(())
        });
    }
}
