//! User settings stored as settings.json in the config directory

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::i18n::Language;

const FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Last language picked in the language selector.
    pub language: Option<Language>,
}

impl Settings {
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("simple_audit"))
    }

    pub fn load(dir: &Path) -> Self {
        let path = dir.join(FILE_NAME);
        match std::fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str(&s) {
                Ok(settings) => {
                    debug!(path = %path.display(), "Settings loaded");
                    settings
                }
                Err(e) => {
                    warn!(error = %e, "Failed to parse settings, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                debug!("No settings file found, using defaults");
                Self::default()
            }
        }
    }

    /// Records the language picked in the selector and saves it when a
    /// settings directory is available.
    pub fn remember_language(&mut self, language: Language, dir: Option<&Path>) {
        self.language = Some(language);
        if let Some(dir) = dir {
            self.save(dir);
        }
    }

    pub fn save(&self, dir: &Path) {
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!(error = %e, path = %dir.display(), "Failed to create settings directory");
            return;
        }
        let path = dir.join(FILE_NAME);
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    warn!(error = %e, "Failed to save settings");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize settings"),
        }
    }
}
