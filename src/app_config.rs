use crate::remote;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default shared server list file name.
pub const DEFAULT_SERVERS_FILE: &str = "servers.yaml";

/// Tool-wide settings: where the shared server list lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GlobalSettings {
    #[serde(default)]
    pub servers_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servers_url: Option<String>,
    #[serde(default)]
    pub config_path: String,
}

impl GlobalSettings {
    /// Defaults for a fresh install whose settings directory is `settings_dir`.
    pub fn with_defaults(settings_dir: &Path) -> Self {
        Self {
            servers_path: DEFAULT_SERVERS_FILE.to_string(),
            servers_url: None,
            config_path: settings_dir.to_string_lossy().into_owned(),
        }
    }

    /// Fill in empty fields the way a hand-edited file is expected to behave.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.servers_path.is_empty() {
            self.servers_path = DEFAULT_SERVERS_FILE.to_string();
        }
        if self.config_path.is_empty() {
            self.config_path = ".".to_string();
        }
        if self.servers_url.as_deref().is_some_and(str::is_empty) {
            self.servers_url = None;
        }
        self
    }

    /// The configured URL, when it is present and valid.
    pub fn remote_url(&self) -> Option<&str> {
        self.servers_url.as_deref().filter(|url| remote::validate_url(url).is_ok())
    }

    pub fn is_remote_source(&self) -> bool {
        self.remote_url().is_some()
    }

    /// Where the shared list comes from: the URL when one is configured,
    /// otherwise the servers path.
    pub fn servers_source(&self) -> &str {
        self.remote_url().unwrap_or(&self.servers_path)
    }

    pub fn config_dir(&self) -> PathBuf {
        PathBuf::from(&self.config_path)
    }
}
