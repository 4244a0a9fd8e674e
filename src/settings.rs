use std::env;
use std::path::PathBuf;

use crate::plugin::resolve_dll_path;

pub const CONFIG_DIR_VAR: &str = "DM_CONFIG_DIR";
pub const PLUGIN_PATH_VAR: &str = "DM_PLUGIN_PATH";

pub const PLAIN_FILE: &str = "dm_conf.json";
pub const ENCRYPTED_FILE: &str = "dm_conf.enc";
pub const KEY_FILE: &str = "dm_conf.key";

/// Process-level locations: the per-user config directory holding the
/// credential artifacts and the plugin library location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub config_dir: PathBuf,
    pub plugin_path: PathBuf,
}

impl Settings {
    pub fn from_env() -> Self {
        let config_dir = env::var(CONFIG_DIR_VAR)
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_config_dir);
        let plugin_path = env::var(PLUGIN_PATH_VAR)
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| config_dir.join("plugin"));

        Self {
            config_dir,
            plugin_path,
        }
    }

    pub fn with_config_dir(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        Self {
            plugin_path: config_dir.join("plugin"),
            config_dir,
        }
    }

    pub fn plain_file(&self) -> PathBuf {
        self.config_dir.join(PLAIN_FILE)
    }

    pub fn encrypted_file(&self) -> PathBuf {
        self.config_dir.join(ENCRYPTED_FILE)
    }

    pub fn key_file(&self) -> PathBuf {
        self.config_dir.join(KEY_FILE)
    }

    pub fn dll_path(&self) -> PathBuf {
        resolve_dll_path(&self.plugin_path)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::with_config_dir(default_config_dir())
    }
}

fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".dm-facade"))
        .unwrap_or_else(|| PathBuf::from(".dm-facade"))
}
