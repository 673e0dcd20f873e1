use crate::format::{self, Format};
use crate::{Result, SshyError};
use serde::de::DeserializeOwned;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::trace;

/// A settings or server file located on disk (or the path it would be
/// created at).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub path: PathBuf,
    /// Format implied by the file name; `Unknown` for unrecognized extensions.
    pub format: Format,
    pub exists: bool,
}

/// Locate `primary` inside `dir`, falling back to its alternate-extension
/// sibling. When neither exists the primary path is returned as the
/// canonical location for writes.
///
/// # Errors
///
/// Returns [`SshyError::Io`] when a candidate cannot be checked for any
/// reason other than not existing.
pub fn find_config_file(dir: &Path, primary: &str) -> Result<ConfigFile> {
    let primary_path = dir.join(primary);
    if is_present(&primary_path)? {
        return Ok(ConfigFile {
            format: format::detect_by_extension(&primary_path),
            path: primary_path,
            exists: true,
        });
    }

    let alternate = format::alternate_filename(primary);
    if !alternate.is_empty() {
        let alternate_path = dir.join(&alternate);
        if is_present(&alternate_path)? {
            trace!(path = %alternate_path.display(), "using alternate-format file");
            return Ok(ConfigFile {
                format: format::detect_by_extension(&alternate_path),
                path: alternate_path,
                exists: true,
            });
        }
    }

    Ok(ConfigFile {
        format: format::detect_by_extension(&primary_path),
        path: primary_path,
        exists: false,
    })
}

/// Whether `path` exists. Only "not found" counts as absent.
///
/// # Errors
///
/// Returns [`SshyError::Io`] for permission, not-a-directory and other
/// stat failures.
pub fn is_present(path: &Path) -> Result<bool> {
    path.try_exists().map_err(|e| SshyError::io(path, e))
}

/// Read a file's bytes, treating a missing file as `None`.
///
/// # Errors
///
/// Returns [`SshyError::Io`] for any failure other than the file not existing.
pub fn read_optional<P: AsRef<Path>>(path: P) -> Result<Option<Vec<u8>>> {
    let path_ref = path.as_ref();
    match fs::read(path_ref) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SshyError::io(path_ref, e)),
    }
}

/// Read and parse a located file. The format comes from the file name, or
/// from the content when the extension is not recognized.
///
/// # Errors
///
/// Returns an error if:
/// - Unable to read the file (when it exists)
/// - Unable to parse the content
pub fn read_document<T: DeserializeOwned + Default>(file: &ConfigFile) -> Result<Option<T>> {
    let Some(data) = read_optional(&file.path)? else {
        return Ok(None);
    };

    let format = format::resolve(&[file.format, format::detect_by_content(&data)]);
    let value = format::deserialize(&data, format).map_err(|e| match e {
        SshyError::Parse(msg) => {
            SshyError::Parse(format!("Failed to parse {}: {msg}", file.path.display()))
        },
        other => other,
    })?;

    Ok(Some(value))
}
