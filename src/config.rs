#![allow(clippy::self_named_module_files)]

use crate::app_config::GlobalSettings;
use crate::format::Format;
use crate::server::{Server, ServerOverride};
use crate::{Result, SshyError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use tracing::{debug, info};

pub mod reader;
pub mod writer;

pub use reader::{find_config_file, ConfigFile};

/// Name of the per-user settings directory inside the home directory.
pub const SETTINGS_DIR_NAME: &str = ".sshy";
/// Environment variable that relocates the settings directory.
pub const SETTINGS_DIR_ENV: &str = "SSHY_CONFIG_DIR";

pub const GLOBAL_FILE_YAML: &str = "config.yaml";
pub const GLOBAL_FILE_JSON: &str = "config.json";
pub const LOCAL_FILE_YAML: &str = "local.yaml";
pub const LOCAL_FILE_JSON: &str = "local.json";

/// The personal layer: overrides for shared servers plus private servers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LocalSettings {
    #[serde(default, alias = "servers")]
    pub overrides: BTreeMap<String, ServerOverride>,
    #[serde(default)]
    pub private: Vec<Server>,
}

impl LocalSettings {
    pub fn private_names(&self) -> HashSet<&str> {
        self.private.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn find_private(&self, name: &str) -> Option<&Server> {
        self.private.iter().find(|s| s.name == name)
    }

    /// Remove a private server, returning whether one was removed.
    pub fn remove_private(&mut self, name: &str) -> bool {
        let before = self.private.len();
        self.private.retain(|s| s.name != name);
        self.private.len() != before
    }

    /// Replace the private server named `name`, appending when absent.
    pub fn upsert_private(&mut self, name: &str, server: Server) {
        if let Some(existing) = self.private.iter_mut().find(|s| s.name == name) {
            *existing = server;
        } else {
            self.private.push(server);
        }
    }
}

/// Where the tool's own files live. Passed into [`SettingsStore`] so callers
/// (and tests) decide the directories instead of a process-wide global.
pub trait SettingsProvider {
    /// The user's home directory, used to expand `~` in paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    fn home_dir(&self) -> Result<PathBuf>;

    /// Directory holding the global and local settings files.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be determined.
    fn settings_dir(&self) -> Result<PathBuf> {
        Ok(self.home_dir()?.join(SETTINGS_DIR_NAME))
    }
}

/// Resolves directories from the running user's environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProvider;

impl SettingsProvider for SystemProvider {
    fn home_dir(&self) -> Result<PathBuf> {
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().to_path_buf())
            .ok_or_else(|| SshyError::Config("Could not determine home directory".to_string()))
    }

    fn settings_dir(&self) -> Result<PathBuf> {
        match std::env::var(SETTINGS_DIR_ENV) {
            Ok(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
            _ => Ok(self.home_dir()?.join(SETTINGS_DIR_NAME)),
        }
    }
}

/// Pins both directories, independent of the environment.
#[derive(Debug, Clone)]
pub struct FixedProvider {
    home: PathBuf,
    settings: PathBuf,
}

impl FixedProvider {
    /// Use `home` as the home directory and `home/.sshy` for settings.
    pub fn new<P: Into<PathBuf>>(home: P) -> Self {
        let home = home.into();
        let settings = home.join(SETTINGS_DIR_NAME);
        Self { home, settings }
    }

    pub fn with_settings_dir<P: Into<PathBuf>>(mut self, settings: P) -> Self {
        self.settings = settings.into();
        self
    }
}

impl SettingsProvider for FixedProvider {
    fn home_dir(&self) -> Result<PathBuf> {
        Ok(self.home.clone())
    }

    fn settings_dir(&self) -> Result<PathBuf> {
        Ok(self.settings.clone())
    }
}

/// Reads and writes the global settings file and the local layer.
pub struct SettingsStore {
    provider: Box<dyn SettingsProvider>,
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore").field("settings_dir", &self.settings_dir().ok()).finish()
    }
}

impl SettingsStore {
    pub fn new(provider: impl SettingsProvider + 'static) -> Self {
        Self { provider: Box::new(provider) }
    }

    /// Store backed by the current user's environment.
    pub fn system() -> Self {
        Self::new(SystemProvider)
    }

    /// # Errors
    ///
    /// Returns an error if the provider cannot determine the directory.
    pub fn settings_dir(&self) -> Result<PathBuf> {
        self.provider.settings_dir()
    }

    /// # Errors
    ///
    /// Returns an error if the provider cannot determine the directory.
    pub fn home_dir(&self) -> Result<PathBuf> {
        self.provider.home_dir()
    }

    /// Expand a leading `~` to the home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the path needs expanding and the home directory
    /// is unknown.
    pub fn expand_home(&self, path: &str) -> Result<PathBuf> {
        if path == "~" {
            return self.home_dir();
        }
        match path.strip_prefix("~/") {
            Some(rest) => Ok(self.home_dir()?.join(rest)),
            None => Ok(PathBuf::from(path)),
        }
    }

    /// Locate the global settings file (`config.yaml`, else `config.json`).
    ///
    /// # Errors
    ///
    /// Returns an error if the settings directory cannot be determined or
    /// a candidate file cannot be checked.
    pub fn global_file(&self) -> Result<ConfigFile> {
        find_config_file(&self.settings_dir()?, GLOBAL_FILE_YAML)
    }

    /// Format new settings files should use: JSON when the global settings
    /// are stored as JSON, YAML otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings directory cannot be determined or
    /// a candidate file cannot be checked.
    pub fn preferred_format(&self) -> Result<Format> {
        let json_exists = reader::is_present(&self.settings_dir()?.join(GLOBAL_FILE_JSON))?;
        Ok(if json_exists { Format::Json } else { Format::Yaml })
    }

    /// Load the global settings, creating default global and local files on
    /// first run.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The settings directory cannot be determined
    /// - An existing settings file cannot be read or parsed
    /// - The default files cannot be written
    pub fn load_global(&self) -> Result<GlobalSettings> {
        let file = self.global_file()?;

        match reader::read_document::<GlobalSettings>(&file)? {
            Some(settings) => {
                debug!(path = %file.path.display(), "loaded global settings");
                Ok(settings.normalized())
            },
            None => self.provision_defaults(),
        }
    }

    fn provision_defaults(&self) -> Result<GlobalSettings> {
        let settings_dir = self.settings_dir()?;
        let defaults = GlobalSettings::with_defaults(&settings_dir);
        let path = self.save_global(&defaults, Format::Yaml)?;
        info!(path = %path.display(), "created default global settings");

        let local = self.local_file()?;
        if !local.exists {
            writer::write_document(&local.path, &LocalSettings::default(), local.format)?;
            info!(path = %local.path.display(), "created default local settings");
        }

        Ok(defaults)
    }

    /// Write the global settings as `config.yaml` or `config.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `format` is [`Format::Unknown`]
    /// - The settings directory cannot be created or written
    pub fn save_global(&self, settings: &GlobalSettings, format: Format) -> Result<PathBuf> {
        let file_name = match format {
            Format::Yaml => GLOBAL_FILE_YAML,
            Format::Json => GLOBAL_FILE_JSON,
            Format::Unknown => return Err(SshyError::UnsupportedFormat),
        };
        let path = self.settings_dir()?.join(file_name);
        writer::write_document(&path, settings, format)?;
        Ok(path)
    }

    /// Locate the local settings file, honoring the preferred format first.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings directory cannot be determined or
    /// a candidate file cannot be checked.
    pub fn local_file(&self) -> Result<ConfigFile> {
        let primary = match self.preferred_format()? {
            Format::Json => LOCAL_FILE_JSON,
            Format::Yaml | Format::Unknown => LOCAL_FILE_YAML,
        };
        find_config_file(&self.settings_dir()?, primary)
    }

    /// Load the local layer. A missing or empty file is an empty layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_local(&self) -> Result<LocalSettings> {
        let file = self.local_file()?;
        Ok(reader::read_document(&file)?.unwrap_or_default())
    }

    /// Save the local layer to the file it was found in, in that file's
    /// format.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_local(&self, local: &LocalSettings) -> Result<PathBuf> {
        let file = self.local_file()?;
        let format = if file.format.is_known() { file.format } else { self.preferred_format()? };
        writer::write_document(&file.path, local, format)?;
        Ok(file.path)
    }
}
