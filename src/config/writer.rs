use crate::format::{self, Format};
use crate::{Result, SshyError};
use serde::Serialize;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Mode of files created by [`write_atomic`].
#[cfg(unix)]
const NEW_FILE_MODE: u32 = 0o644;

/// Serialize `value` and replace the file at `path` with it.
///
/// # Errors
///
/// Returns an error if:
/// - Unable to create parent directories
/// - Unable to serialize the value in `format`
/// - Unable to write to the file
pub fn write_document<P, T>(path: P, value: &T, format: Format) -> Result<()>
where
    P: AsRef<Path>,
    T: Serialize + ?Sized,
{
    let data = format::serialize(value, format)?;
    write_atomic(path, &data)
}

/// Write `data` to a temporary file next to `path` and rename it into place,
/// so readers never observe a half-written file. Existing permissions are
/// carried over; new files are created `0644` on Unix.
///
/// # Errors
///
/// Returns [`SshyError::Io`] if any step fails.
pub fn write_atomic<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<()> {
    let path_ref = path.as_ref();
    let parent = match path_ref.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    fs::create_dir_all(parent).map_err(|e| SshyError::io(parent, e))?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| SshyError::io(parent, e))?;
    temp.write_all(data).map_err(|e| SshyError::io(temp.path(), e))?;

    match fs::metadata(path_ref) {
        Ok(metadata) => temp
            .as_file()
            .set_permissions(metadata.permissions())
            .map_err(|e| SshyError::io(path_ref, e))?,
        Err(e) if e.kind() == ErrorKind::NotFound => set_new_file_mode(&temp)?,
        Err(e) => return Err(SshyError::io(path_ref, e)),
    }

    temp.persist(path_ref).map_err(|e| SshyError::io(path_ref, e.error))?;
    debug!(path = %path_ref.display(), bytes = data.len(), "wrote file");
    Ok(())
}

#[cfg(unix)]
fn set_new_file_mode(temp: &NamedTempFile) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    temp.as_file()
        .set_permissions(fs::Permissions::from_mode(NEW_FILE_MODE))
        .map_err(|e| SshyError::io(temp.path(), e))
}

#[cfg(not(unix))]
fn set_new_file_mode(_temp: &NamedTempFile) -> Result<()> {
    Ok(())
}
