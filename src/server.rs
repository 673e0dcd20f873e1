use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Port ssh uses when a server does not set one.
pub const DEFAULT_PORT: u16 = 22;

/// A single server profile as stored in the shared list or the private layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Server {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub host: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Path to a private key. Never persisted to the shared list.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, Value>,
}

/// Partial server record from the `overrides` section of the local file.
///
/// Empty strings, a zero port, an empty tag list and an empty options map all
/// mean "keep the shared value".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerOverride {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, Value>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(port: &u16) -> bool {
    *port == 0
}

impl Server {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self { name: name.into(), host: host.into(), ..Self::default() }
    }

    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Effective port, substituting 22 for an unset port.
    pub const fn effective_port(&self) -> u16 {
        if self.port == 0 {
            DEFAULT_PORT
        } else {
            self.port
        }
    }

    /// Whether a port flag has to be passed to the ssh family of commands.
    pub const fn has_custom_port(&self) -> bool {
        self.port != 0 && self.port != DEFAULT_PORT
    }

    /// `user@host`, or just `host` when `user` is empty.
    pub fn destination(&self, user: &str) -> String {
        if user.is_empty() {
            self.host.clone()
        } else {
            format!("{user}@{}", self.host)
        }
    }

    /// Recognized ssh options in key order. Unknown keys and values are dropped.
    pub fn ssh_options(&self) -> Vec<SshOption> {
        self.options.iter().filter_map(|(key, value)| SshOption::parse(key, value)).collect()
    }

    pub fn has_all_tags<S: AsRef<str>>(&self, wanted: &[S]) -> bool {
        wanted.iter().all(|tag| self.tags.iter().any(|t| t == tag.as_ref()))
    }
}

impl ServerOverride {
    pub fn is_empty(&self) -> bool {
        self.host.is_empty()
            && self.user.is_empty()
            && self.port == 0
            && self.tags.is_empty()
            && self.key.is_empty()
            && self.options.is_empty()
    }
}

impl From<&Server> for ServerOverride {
    fn from(server: &Server) -> Self {
        Self {
            host: server.host.clone(),
            user: server.user.clone(),
            port: server.port,
            tags: server.tags.clone(),
            key: server.key.clone(),
            options: server.options.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtyMode {
    /// `-t`
    Yes,
    /// `-t -t`
    Force,
}

/// The ssh options this tool knows how to translate into command-line flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SshOption {
    ForwardAgent,
    RequestTty(TtyMode),
    LocalForward(String),
}

impl SshOption {
    /// Interpret one entry of a server's `options` map.
    pub fn parse(key: &str, value: &Value) -> Option<Self> {
        match key {
            "ForwardAgent" => match value {
                Value::Bool(true) => Some(Self::ForwardAgent),
                Value::String(s) if s == "yes" => Some(Self::ForwardAgent),
                _ => None,
            },
            "RequestTTY" => match value.as_str() {
                Some("force") => Some(Self::RequestTty(TtyMode::Force)),
                Some("yes") => Some(Self::RequestTty(TtyMode::Yes)),
                _ => None,
            },
            "LocalForward" => scalar_text(value).map(Self::LocalForward),
            _ => None,
        }
    }

    pub fn args(&self) -> Vec<String> {
        match self {
            Self::ForwardAgent => vec!["-A".to_string()],
            Self::RequestTty(TtyMode::Yes) => vec!["-t".to_string()],
            Self::RequestTty(TtyMode::Force) => vec!["-t".to_string(), "-t".to_string()],
            Self::LocalForward(spec) => vec!["-L".to_string(), spec.clone()],
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Layer that produced a server's effective definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerSource {
    /// Taken unmodified from the shared list.
    Shared,
    /// Exists only in the private section of the local file.
    Local,
    /// Shared server patched by an override entry.
    Override,
}

impl ServerSource {
    pub const fn flag(self) -> &'static str {
        match self {
            Self::Shared => "[S]",
            Self::Local => "[L]",
            Self::Override => "[O]",
        }
    }
}

impl fmt::Display for ServerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Shared => "shared",
            Self::Local => "local",
            Self::Override => "override",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerWithSource {
    pub server: Server,
    pub source: ServerSource,
}

/// Find a server by exact name. Empty names never match.
pub fn find_server<'a>(servers: &'a [Server], name: &str) -> Option<&'a Server> {
    if name.is_empty() {
        return None;
    }
    servers.iter().find(|s| s.name == name)
}
