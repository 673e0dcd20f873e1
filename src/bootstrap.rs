use crate::app_config::GlobalSettings;
use crate::config::{reader, writer, LocalSettings, SettingsStore};
use crate::config::{GLOBAL_FILE_JSON, GLOBAL_FILE_YAML, LOCAL_FILE_JSON, LOCAL_FILE_YAML};
use crate::format::{self, Format};
use crate::{remote, Result, SshyError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Commented starting point for a YAML local file.
pub const LOCAL_TEMPLATE: &str = r"# Local configuration for sshy
# Override fields of shared servers and keep servers only you use.

# Overrides for shared servers, keyed by server name:
# overrides:
#   server_name:
#     host: new_host
#     user: new_user
#     port: 22
#     key: ~/.ssh/id_ed25519
#     options:
#       ForwardAgent: yes

# Private servers (never written to the shared list):
# private:
#   - name: private_server
#     host: private_host
#     user: private_user
#     port: 22
#     key: ~/.ssh/id_rsa
#     tags: [tag1, tag2]
#     options:
#       RequestTTY: force
";

const SERVERS_TEMPLATE_YAML: &str = "# Shared SSH servers configuration\n# Add your servers here\n";
const SERVERS_TEMPLATE_JSON: &str = "[\n]\n";

/// Initial content of a new shared server file.
pub const fn servers_template(format: Format) -> &'static str {
    match format {
        Format::Json => SERVERS_TEMPLATE_JSON,
        Format::Yaml | Format::Unknown => SERVERS_TEMPLATE_YAML,
    }
}

/// Where the shared list should come from after `init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharedSource {
    /// A file; `~` is expanded against the home directory.
    File(String),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOptions {
    pub format: Format,
    pub source: SharedSource,
}

/// What `init` wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitReport {
    pub format: Format,
    pub global_path: PathBuf,
    pub local_path: PathBuf,
    pub local_created: bool,
    pub servers_path: Option<PathBuf>,
    pub servers_created: bool,
    pub servers_url: Option<String>,
}

/// Create a file with content if it doesn't exist. Returns whether it was
/// created.
fn create_file_if_needed(path: &Path, content: &[u8], description: &str) -> Result<bool> {
    if reader::is_present(path)? {
        info!("{} already exists, skipping", description);
        return Ok(false);
    }
    writer::write_atomic(path, content)?;
    info!("Created {}", description);
    Ok(true)
}

/// Default shared file path offered by `init` for `format`.
pub fn default_servers_path(format: Format) -> String {
    format!("~/.sshy/servers.{}", format.extension().unwrap_or("yaml"))
}

/// Settings files in the other format that `init` offers to remove.
///
/// # Errors
///
/// Returns an error if the settings directory cannot be determined or a
/// candidate file cannot be checked.
pub fn stale_files(store: &SettingsStore, format: Format) -> Result<Vec<PathBuf>> {
    let dir = store.settings_dir()?;
    let names: [&str; 2] = match format {
        Format::Json => [GLOBAL_FILE_YAML, LOCAL_FILE_YAML],
        Format::Yaml | Format::Unknown => [GLOBAL_FILE_JSON, LOCAL_FILE_JSON],
    };
    let mut stale = Vec::new();
    for path in names.iter().map(|name| dir.join(name)) {
        if reader::is_present(&path)? {
            stale.push(path);
        }
    }
    Ok(stale)
}

/// Remove a stale settings file.
///
/// # Errors
///
/// Returns an error if the file exists and cannot be removed.
pub fn remove_stale(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|e| SshyError::io(path, e))?;
    info!(path = %path.display(), "removed stale settings file");
    Ok(())
}

/// Write the global settings for `options` and create the shared and local
/// files when they are missing.
///
/// # Errors
///
/// Returns an error if:
/// - The format is unknown or the URL is invalid
/// - The home or settings directory cannot be determined
/// - Any of the files cannot be written
pub fn apply_init(store: &SettingsStore, options: &InitOptions) -> Result<InitReport> {
    if !options.format.is_known() {
        return Err(SshyError::UnsupportedFormat);
    }
    let settings_dir = store.settings_dir()?;

    let (settings, servers_file) = match &options.source {
        SharedSource::Url(url) => {
            remote::validate_url(url)?;
            let settings = GlobalSettings {
                servers_path: String::new(),
                servers_url: Some(url.clone()),
                config_path: settings_dir.to_string_lossy().into_owned(),
            };
            (settings, None)
        },
        SharedSource::File(raw) => {
            let path = store.expand_home(raw.trim())?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| SshyError::Validation(format!("invalid servers path: {raw}")))?;
            let dir = match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let settings = GlobalSettings {
                servers_path: name,
                servers_url: None,
                config_path: dir.to_string_lossy().into_owned(),
            };
            (settings, Some(path))
        },
    };

    let global_path = store.save_global(&settings, options.format)?;

    let servers_created = match &servers_file {
        Some(path) => {
            let template_format = format::resolve(&[format::detect_by_extension(path), options.format]);
            create_file_if_needed(path, servers_template(template_format).as_bytes(), "servers file")?
        },
        None => false,
    };

    let local = store.local_file()?;
    let local_created = if local.exists {
        false
    } else {
        let data = format::serialize(&LocalSettings::default(), options.format)?;
        create_file_if_needed(&local.path, &data, "local settings")?
    };

    Ok(InitReport {
        format: options.format,
        global_path,
        local_path: local.path,
        local_created,
        servers_path: servers_file,
        servers_created,
        servers_url: settings.servers_url,
    })
}

/// Make sure the local file exists and has content before it is opened in an
/// editor. Returns whether a template was written.
///
/// # Errors
///
/// Returns an error if the file cannot be inspected or written.
pub fn ensure_local_template(path: &Path, format: Format) -> Result<bool> {
    let empty = match fs::metadata(path) {
        Ok(meta) => meta.len() == 0,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => return Err(SshyError::io(path, e)),
    };
    if !empty {
        return Ok(false);
    }

    let content = match format {
        Format::Json => format::serialize(&LocalSettings::default(), Format::Json)?,
        Format::Yaml | Format::Unknown => LOCAL_TEMPLATE.as_bytes().to_vec(),
    };
    writer::write_atomic(path, &content)?;
    info!(path = %path.display(), "wrote local settings template");
    Ok(true)
}
