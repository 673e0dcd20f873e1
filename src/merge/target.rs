use crate::config::reader;
use crate::format::{self, Format};
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Where a shared list is written, and in which format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteTarget {
    pub path: PathBuf,
    pub format: Format,
}

/// Decide the file a shared list is written to.
///
/// An existing file (the configured one, or its alternate-format sibling) is
/// overwritten in its own format. Otherwise the configured path is created in
/// the format its extension names. Unrecognized extensions fall back to the
/// existing content, then YAML.
///
/// # Errors
///
/// Returns [`crate::SshyError::Io`] if a candidate file cannot be checked or
/// an existing file with an unrecognized extension cannot be read.
pub fn resolve_write_target<P: AsRef<Path>>(
    config_path: P,
    servers_path: &str,
) -> Result<WriteTarget> {
    let file = super::shared_file(config_path.as_ref(), servers_path)?;

    let format = if file.format.is_known() {
        file.format
    } else {
        let sniffed = reader::read_optional(&file.path)?
            .map_or(Format::Unknown, |data| format::detect_by_content(&data));
        format::resolve(&[sniffed])
    };

    trace!(path = %file.path.display(), %format, exists = file.exists, "resolved write target");
    Ok(WriteTarget { path: file.path, format })
}
