use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::content::Viewport;
use crate::content::flow::FlowLayout;
use crate::display::{DisplayMode, PageMovement};
use crate::error::Result;
use crate::normalize::NormalizeOptions;

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pagewright";

const SETTINGS_HEADER: &str = r#"# ============================================================================
# pagewright settings
# ============================================================================
# display_mode: single | double | scroll
# page_movement: left_to_right | right_to_left
# max_vertical_spacing: pixels; leave empty to keep authored spacing
# log_level: off | error | warn | info | debug | trace

"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub display_mode: DisplayMode,

    #[serde(default)]
    pub page_movement: PageMovement,

    #[serde(default = "default_column_gap")]
    pub column_gap: f64,

    #[serde(default = "default_true")]
    pub unwrap_wrappers: bool,

    #[serde(default = "default_true")]
    pub flatten_tables: bool,

    #[serde(default)]
    pub overflow_check: bool,

    #[serde(default = "default_true")]
    pub clamp_media: bool,

    #[serde(default)]
    pub max_vertical_spacing: Option<f64>,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: f64,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: f64,

    /// Estimated metrics used by the built-in flow layout.
    #[serde(default = "default_line_height")]
    pub line_height: f64,

    #[serde(default = "default_char_width")]
    pub char_width: f64,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_true() -> bool {
    true
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_column_gap() -> f64 {
    0.0
}

fn default_viewport_width() -> f64 {
    600.0
}

fn default_viewport_height() -> f64 {
    800.0
}

fn default_line_height() -> f64 {
    20.0
}

fn default_char_width() -> f64 {
    8.0
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            display_mode: DisplayMode::default(),
            page_movement: PageMovement::default(),
            column_gap: default_column_gap(),
            unwrap_wrappers: true,
            flatten_tables: true,
            overflow_check: false,
            clamp_media: true,
            max_vertical_spacing: None,
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            line_height: default_line_height(),
            char_width: default_char_width(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            unwrap_wrappers: self.unwrap_wrappers,
            flatten_tables: self.flatten_tables,
            overflow_check: self.overflow_check,
            clamp_media: self.clamp_media,
            max_vertical_spacing: self.max_vertical_spacing,
        }
    }

    pub fn viewport(&self) -> Result<Viewport> {
        Viewport::new(self.viewport_width, self.viewport_height)
    }

    pub fn flow_layout(&self, viewport: Viewport) -> FlowLayout {
        FlowLayout::for_viewport(viewport, self.column_gap)
            .with_metrics(self.line_height, self.char_width)
    }

    /// Unrecognised levels fall back to `Info`.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or_else(|_| {
            warn!("Unknown log level {:?}, using info", self.log_level);
            log::LevelFilter::Info
        })
    }
}

pub fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Loads settings from the default location, writing defaults there when the
/// file doesn't exist yet.
pub fn load_settings() -> Result<Settings> {
    match preferred_config_path() {
        Some(path) => load_or_create(&path),
        None => {
            warn!("Could not determine config directory, using default settings");
            Ok(Settings::default())
        }
    }
}

pub fn load_or_create(path: &Path) -> Result<Settings> {
    if path.exists() {
        return load_settings_from_path(path);
    }

    info!("Settings file not found, creating with defaults at {path:?}");
    let settings = Settings::default();
    save_settings_to_file(&settings, path)?;
    Ok(settings)
}

pub fn load_settings_from_path(path: &Path) -> Result<Settings> {
    let content = fs::read_to_string(path)?;
    let mut settings: Settings = serde_yaml::from_str(&content)?;
    debug!("Loaded settings from {path:?}");

    if settings.version < CURRENT_VERSION {
        migrate_settings(&mut settings);
        save_settings_to_file(&settings, path)?;
    }

    Ok(settings)
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );

    // Version 0 files predate the version field and need no field changes.

    settings.version = CURRENT_VERSION;
}

pub fn save_settings_to_file(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut content = String::from(SETTINGS_HEADER);
    content.push_str(&serde_yaml::to_string(settings)?);
    fs::write(path, content)?;
    debug!("Saved settings to {path:?}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILENAME);

        let settings = load_or_create(&path).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(path.exists());

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# ===="));
        assert!(written.contains("display_mode: double"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(
            &path,
            "version: 1\ndisplay_mode: scroll\nmax_vertical_spacing: 24\n",
        )
        .unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.display_mode, DisplayMode::Scroll);
        assert_eq!(settings.max_vertical_spacing, Some(24.0));
        assert!(settings.flatten_tables);
        assert_eq!(settings.column_gap, 0.0);

        let options = settings.normalize_options();
        assert_eq!(options.max_vertical_spacing, Some(24.0));
        assert!(!options.overflow_check);
    }

    #[test]
    fn test_old_version_is_migrated_and_rewritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(&path, "version: 0\npage_movement: right_to_left\n").unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.version, CURRENT_VERSION);
        assert_eq!(settings.page_movement, PageMovement::RightToLeft);

        let reloaded = load_settings_from_path(&path).unwrap();
        assert_eq!(reloaded, settings);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(&path, "display_mode: [not, a, mode]\n").unwrap();

        assert!(load_settings_from_path(&path).is_err());
    }

    #[test]
    fn test_level_filter_fallback() {
        let mut settings = Settings::default();
        settings.log_level = "trace".to_string();
        assert_eq!(settings.level_filter(), log::LevelFilter::Trace);
        settings.log_level = "chatty".to_string();
        assert_eq!(settings.level_filter(), log::LevelFilter::Info);
    }
}
