use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Color;
use crate::history::HistoryLimits;
use crate::tools::ToolKind;

pub const APP_ID: &str = "com.github.maoschanz.drawing";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("neither XDG_CONFIG_HOME nor HOME is set")]
    MissingHomeDirectory,
    #[error("failed to access settings at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode settings")]
    Encode(#[from] serde_json::Error),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// What to put under transparent pixels when the target format has no alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplaceAlpha {
    /// The `default-rgba` color, made opaque.
    #[default]
    Initial,
    White,
    Black,
    Checkboard,
    /// Drop the alpha channel and keep the color channels as they are.
    Nothing,
}

/// User preferences. Keys missing from the file take their default value;
/// unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Settings {
    pub default_width: u32,
    pub default_height: u32,
    pub default_rgba: Color,
    pub replace_alpha: ReplaceAlpha,
    pub disabled_tools: Vec<ToolKind>,
    pub history_max_entries: usize,
    pub history_memory_mb: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_width: 800,
            default_height: 600,
            default_rgba: Color::WHITE,
            replace_alpha: ReplaceAlpha::Initial,
            disabled_tools: Vec::new(),
            history_max_entries: 100,
            history_memory_mb: 256,
        }
    }
}

impl Settings {
    pub fn is_tool_disabled(&self, kind: ToolKind) -> bool {
        self.disabled_tools.contains(&kind)
    }

    pub fn history_limits(&self) -> HistoryLimits {
        HistoryLimits::new(
            self.history_max_entries,
            self.history_memory_mb.saturating_mul(1024 * 1024),
        )
    }
}

/// Where settings are read from and written to.
pub trait SettingsStore {
    /// Never fails: unreadable or malformed settings fall back to defaults.
    fn load(&self) -> Settings;

    fn save(&self, settings: &Settings) -> ConfigResult<()>;
}

/// Flat JSON file, used when no system settings database is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env(app_id: &str) -> ConfigResult<Self> {
        let env = ConfigEnv::from_process();
        Ok(Self::new(settings_path(app_id, &env)?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Settings {
        let path = &self.path;
        if !path.exists() {
            tracing::debug!(?path, "no settings file; using defaults");
            return Settings::default();
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                tracing::warn!(?err, ?path, "failed to parse settings; using defaults");
                Settings::default()
            }),
            Err(err) => {
                tracing::warn!(?err, ?path, "failed to read settings; using defaults");
                Settings::default()
            }
        }
    }

    fn save(&self, settings: &Settings) -> ConfigResult<()> {
        let io_error = |source| ConfigError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let contents = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, contents).map_err(io_error)?;
        tracing::debug!(path = ?self.path, "saved settings");
        Ok(())
    }
}

/// Environment inputs for settings path resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigEnv {
    pub xdg_config_home: Option<PathBuf>,
    pub home: Option<PathBuf>,
    /// Set inside a Flatpak sandbox.
    pub flatpak_id: Option<String>,
}

impl ConfigEnv {
    pub fn from_process() -> Self {
        Self {
            xdg_config_home: std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
            home: std::env::var_os("HOME").map(PathBuf::from),
            flatpak_id: std::env::var("FLATPAK_ID").ok(),
        }
    }

    fn is_sandboxed(&self) -> bool {
        self.flatpak_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

pub fn settings_path(app_id: &str, env: &ConfigEnv) -> ConfigResult<PathBuf> {
    if env.is_sandboxed() {
        let home = env.home.as_deref().ok_or(ConfigError::MissingHomeDirectory)?;
        let mut path = home.join(".var").join("app").join(app_id).join("config");
        path.push(app_id);
        path.push(SETTINGS_FILE);
        return Ok(path);
    }
    app_config_path(
        app_id,
        SETTINGS_FILE,
        env.xdg_config_home.as_deref(),
        env.home.as_deref(),
    )
}

pub(crate) fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> ConfigResult<PathBuf> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(xdg_config_home: Option<&Path>, home: Option<&Path>) -> ConfigResult<PathBuf> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(xdg: Option<&str>, home: Option<&str>, flatpak: Option<&str>) -> ConfigEnv {
        ConfigEnv {
            xdg_config_home: xdg.map(PathBuf::from),
            home: home.map(PathBuf::from),
            flatpak_id: flatpak.map(str::to_string),
        }
    }

    #[test]
    fn app_config_path_prefers_xdg_config_home() {
        let path = app_config_path(
            "drawing",
            "settings.json",
            Some(Path::new("/tmp/config-root")),
            Some(Path::new("/tmp/home")),
        )
        .expect("path should resolve");

        assert_eq!(path, PathBuf::from("/tmp/config-root/drawing/settings.json"));
    }

    #[test]
    fn app_config_path_falls_back_to_home_dot_config() {
        let path = app_config_path("drawing", "settings.json", None, Some(Path::new("/tmp/home")))
            .expect("path should resolve");

        assert_eq!(path, PathBuf::from("/tmp/home/.config/drawing/settings.json"));
    }

    #[test]
    fn app_config_path_errors_when_home_missing_and_xdg_unset() {
        let error = app_config_path("drawing", "settings.json", None, None).unwrap_err();
        assert!(matches!(error, ConfigError::MissingHomeDirectory));
    }

    #[test]
    fn sandboxed_settings_live_under_var_app() {
        let path = settings_path(
            APP_ID,
            &env(Some("/tmp/xdg"), Some("/home/user"), Some(APP_ID)),
        )
        .expect("path should resolve");

        assert_eq!(
            path,
            PathBuf::from(format!(
                "/home/user/.var/app/{APP_ID}/config/{APP_ID}/settings.json"
            ))
        );
    }

    #[test]
    fn empty_flatpak_id_is_not_sandboxed() {
        let path = settings_path("drawing", &env(None, Some("/home/user"), Some("")))
            .expect("path should resolve");

        assert_eq!(path, PathBuf::from("/home/user/.config/drawing/settings.json"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileSettingsStore::new(dir.path().join("settings.json"));
        assert_eq!(store.load(), Settings::default());
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").expect("write");
        assert_eq!(FileSettingsStore::new(path).load(), Settings::default());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"default-width": 320, "replace-alpha": "checkboard",
                "disabled-tools": ["highlighter"], "unknown-key": true}"#,
        )
        .expect("write");

        let settings = FileSettingsStore::new(path).load();
        assert_eq!(settings.default_width, 320);
        assert_eq!(settings.default_height, 600);
        assert_eq!(settings.replace_alpha, ReplaceAlpha::Checkboard);
        assert!(settings.is_tool_disabled(ToolKind::Highlighter));
        assert!(!settings.is_tool_disabled(ToolKind::Pencil));
    }

    #[test]
    fn save_creates_directories_and_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileSettingsStore::new(dir.path().join("nested/app/settings.json"));
        let settings = Settings {
            default_rgba: Color::rgba(10, 20, 30, 40),
            history_max_entries: 7,
            ..Settings::default()
        };

        store.save(&settings).expect("save");
        assert_eq!(store.load(), settings);
    }

    #[test]
    fn history_limits_convert_megabytes() {
        let settings = Settings {
            history_memory_mb: 2,
            ..Settings::default()
        };
        assert_eq!(settings.history_limits().memory_budget_bytes, 2 * 1024 * 1024);
    }
}
