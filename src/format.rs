//! Serialization format detection and (de)serialization for the two file
//! formats sshy understands.
//!
//! Detection is split into small detectors (extension, content, HTTP content
//! type, URL path) that each return [`Format::Unknown`] when they cannot
//! decide. [`resolve`] combines their answers in a fixed priority order.

use crate::{Result, SshyError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
    Unknown,
}

impl Format {
    /// File extension (without the dot) used when writing this format.
    pub const fn extension(self) -> Option<&'static str> {
        match self {
            Self::Yaml => Some("yaml"),
            Self::Json => Some("json"),
            Self::Unknown => None,
        }
    }

    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Yaml => "YAML",
            Self::Json => "JSON",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Detect the format from a file name's extension (case-insensitive).
pub fn detect_by_extension<P: AsRef<Path>>(filename: P) -> Format {
    let ext = filename
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("yaml" | "yml") => Format::Yaml,
        Some("json") => Format::Json,
        _ => Format::Unknown,
    }
}

/// Sniff the format from raw content.
///
/// A leading `{` or `[` (after whitespace) means JSON, any other non-empty
/// content is treated as YAML, and empty content is undecidable.
pub fn detect_by_content(data: &[u8]) -> Format {
    match data.iter().find(|b| !b.is_ascii_whitespace()) {
        None => Format::Unknown,
        Some(b'{' | b'[') => Format::Json,
        Some(_) => Format::Yaml,
    }
}

/// Detect the format from an HTTP `Content-Type` header value.
pub fn detect_by_content_type(content_type: &str) -> Format {
    let lower = content_type.to_ascii_lowercase();
    if lower.contains("json") {
        Format::Json
    } else if lower.contains("yaml") || lower.contains("yml") {
        Format::Yaml
    } else {
        Format::Unknown
    }
}

/// Detect the format from the path component of a URL.
pub fn detect_by_url_path(raw_url: &str) -> Format {
    let Ok(parsed) = url::Url::parse(raw_url) else {
        return Format::Unknown;
    };

    let path = parsed.path().to_ascii_lowercase();
    if path.ends_with(".json") {
        Format::Json
    } else if path.ends_with(".yaml") || path.ends_with(".yml") {
        Format::Yaml
    } else {
        Format::Unknown
    }
}

/// First known format among `candidates`, in order, falling back to YAML.
pub fn resolve(candidates: &[Format]) -> Format {
    candidates.iter().copied().find(|f| f.is_known()).unwrap_or(Format::Yaml)
}

/// Serialize `value` in the given format. JSON output is pretty-printed.
///
/// # Errors
///
/// Returns [`SshyError::UnsupportedFormat`] for [`Format::Unknown`] and
/// [`SshyError::Parse`] if the value cannot be represented.
pub fn serialize<T: Serialize + ?Sized>(value: &T, format: Format) -> Result<Vec<u8>> {
    match format {
        Format::Json => {
            let mut out = serde_json::to_vec_pretty(value)
                .map_err(|e| SshyError::Parse(format!("Failed to serialize JSON: {e}")))?;
            out.push(b'\n');
            Ok(out)
        },
        Format::Yaml => serde_yaml::to_string(value)
            .map(String::into_bytes)
            .map_err(|e| SshyError::Parse(format!("Failed to serialize YAML: {e}"))),
        Format::Unknown => Err(SshyError::UnsupportedFormat),
    }
}

/// Deserialize `data` in the given format.
///
/// Empty input, and YAML holding nothing but comments or a null document,
/// yields `T::default()`, matching how an empty settings file is treated.
///
/// # Errors
///
/// Returns [`SshyError::UnsupportedFormat`] for [`Format::Unknown`] and
/// [`SshyError::Parse`] when the content is malformed.
pub fn deserialize<T: DeserializeOwned + Default>(data: &[u8], format: Format) -> Result<T> {
    if !format.is_known() {
        return Err(SshyError::UnsupportedFormat);
    }
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    match format {
        Format::Json => serde_json::from_slice(data)
            .map_err(|e| SshyError::Parse(format!("Invalid JSON: {e}"))),
        Format::Yaml if has_no_yaml_content(data) => Ok(T::default()),
        Format::Yaml => serde_yaml::from_slice::<Option<T>>(data)
            .map(Option::unwrap_or_default)
            .map_err(|e| SshyError::Parse(format!("Invalid YAML: {e}"))),
        Format::Unknown => Err(SshyError::UnsupportedFormat),
    }
}

fn has_no_yaml_content(data: &[u8]) -> bool {
    String::from_utf8_lossy(data)
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#') || line == "---")
}

/// Same base name with the other format's extension, or an empty string when
/// the extension is not recognized.
pub fn alternate_filename(filename: &str) -> String {
    let path = Path::new(filename);
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return String::new();
    };

    let base = &filename[..filename.len() - ext.len() - 1];
    match ext.to_ascii_lowercase().as_str() {
        "yaml" | "yml" => format!("{base}.json"),
        "json" => format!("{base}.yaml"),
        _ => String::new(),
    }
}
