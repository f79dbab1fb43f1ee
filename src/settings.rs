use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pdfembed";

/// User preferences consumed by the block processor.
///
/// A value of this type is a snapshot: a render pass borrows it and never
/// sees later changes. Writing new settings only affects the next pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Stretch pages to the display width unless a block says otherwise
    #[serde(default = "default_true")]
    pub fit_by_default: bool,

    /// Wrap pages in a link to the document unless a block says otherwise
    #[serde(default = "default_true")]
    pub link_by_default: bool,
}

fn default_true() -> bool {
    true
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            fit_by_default: true,
            link_by_default: true,
        }
    }
}

/// Names accepted by [`SettingsStore::set`].
pub const SETTING_KEYS: [&str; 2] = ["fit_by_default", "link_by_default"];

/// Location of the persisted settings file.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: Option<PathBuf>,
}

impl SettingsStore {
    /// Store at the platform config directory, e.g. `~/.config/pdfembed/config.yaml`.
    #[must_use]
    pub fn discover() -> Self {
        Self {
            path: preferred_config_path(),
        }
    }

    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read the current snapshot.
    ///
    /// A missing file is created with defaults; an unreadable or unparsable
    /// one is reported and defaults are used.
    #[must_use]
    pub fn load(&self) -> Settings {
        let Some(path) = &self.path else {
            warn!("Could not determine config directory, using default settings");
            return Settings::default();
        };

        if !path.exists() {
            info!("Settings file not found, creating with defaults at {path:?}");
            let settings = Settings::default();
            if let Err(e) = save_settings_to_file(&settings, path) {
                error!("Failed to save settings to {path:?}: {e:#}");
            }
            return settings;
        }

        load_settings_from_path(path).unwrap_or_default()
    }

    /// Persist a new snapshot.
    pub fn save(&self, settings: &Settings) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            anyhow::bail!("Could not determine config directory, cannot save settings");
        };
        save_settings_to_file(settings, path)
    }

    /// Load, change one key, save, and return the new snapshot.
    pub fn set(&self, key: &str, value: bool) -> anyhow::Result<Settings> {
        let mut settings = self.load();
        match key {
            "fit_by_default" => settings.fit_by_default = value,
            "link_by_default" => settings.link_by_default = value,
            other => anyhow::bail!(
                "Unknown setting {other:?}, expected one of {}",
                SETTING_KEYS.join(", ")
            ),
        }
        self.save(&settings)?;
        Ok(settings)
    }
}

fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

fn load_settings_from_path(path: &Path) -> Option<Settings> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
            return None;
        }
    };

    match serde_yaml::from_str::<Settings>(&content) {
        Ok(mut settings) => {
            debug!("Loaded settings from {path:?}");
            if settings.version < CURRENT_VERSION {
                migrate_settings(&mut settings);
                if let Err(e) = save_settings_to_file(&settings, path) {
                    error!("Failed to save migrated settings to {path:?}: {e:#}");
                }
            }
            Some(settings)
        }
        Err(e) => {
            error!("Failed to parse settings file {path:?}: {e}");
            None
        }
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}

fn save_settings_to_file(settings: &Settings, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(path, generate_settings_yaml(settings))?;
    debug!("Saved settings to {path:?}");
    Ok(())
}

fn generate_settings_yaml(settings: &Settings) -> String {
    let mut content = String::new();

    content.push_str(SETTINGS_HEADER);
    content.push_str(&format!("version: {}\n", settings.version));
    content.push_str("# Stretch rendered pages to the available width (override per block with \"fit\")\n");
    content.push_str(&format!("fit_by_default: {}\n", settings.fit_by_default));
    content.push_str("# Link rendered pages to their document (override per block with \"link\")\n");
    content.push_str(&format!("link_by_default: {}\n", settings.link_by_default));

    content
}

const SETTINGS_HEADER: &str = r#"# ============================================================================
# pdfembed settings
# ============================================================================
"#;
