#![allow(clippy::self_named_module_files)]

use crate::app_config::GlobalSettings;
use crate::config::{find_config_file, reader, writer, ConfigFile, LocalSettings, SettingsStore};
use crate::remote;
use crate::server::{Server, ServerOverride, ServerSource, ServerWithSource};
use crate::{Result, SshyError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub mod target;

pub use target::{resolve_write_target, WriteTarget};

/// Apply one override entry to a shared server. Only fields the override
/// actually sets replace the shared value; the name is never touched.
pub fn apply_override(server: &mut Server, ov: &ServerOverride) {
    if !ov.host.is_empty() {
        server.host.clone_from(&ov.host);
    }
    if !ov.user.is_empty() {
        server.user.clone_from(&ov.user);
    }
    if ov.port != 0 {
        server.port = ov.port;
    }
    if !ov.tags.is_empty() {
        server.tags.clone_from(&ov.tags);
    }
    if !ov.key.is_empty() {
        server.key.clone_from(&ov.key);
    }
    if !ov.options.is_empty() {
        server.options.clone_from(&ov.options);
    }
}

/// Effective server list: shared servers in order with overrides applied,
/// followed by private servers in stored order.
pub fn merge_servers(shared: &[Server], local: &LocalSettings) -> Vec<Server> {
    merge_servers_with_source(shared, local).into_iter().map(|entry| entry.server).collect()
}

/// Same as [`merge_servers`], tagging each entry with the layer it came from.
///
/// Shared and private entries are not deduplicated: a private server named
/// like a shared one shows up twice.
pub fn merge_servers_with_source(shared: &[Server], local: &LocalSettings) -> Vec<ServerWithSource> {
    let mut merged = Vec::with_capacity(shared.len() + local.private.len());

    for server in shared {
        let mut server = server.clone();
        let source = match local.overrides.get(&server.name) {
            Some(ov) => {
                apply_override(&mut server, ov);
                ServerSource::Override
            },
            None => ServerSource::Shared,
        };
        merged.push(ServerWithSource { server, source });
    }

    merged.extend(
        local
            .private
            .iter()
            .map(|server| ServerWithSource { server: server.clone(), source: ServerSource::Local }),
    );

    merged
}

/// Loads the shared list, combines it with the local layer and writes
/// edited shared lists back.
#[derive(Debug)]
pub struct MergeEngine<'a> {
    store: &'a SettingsStore,
}

impl<'a> MergeEngine<'a> {
    pub const fn new(store: &'a SettingsStore) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &'a SettingsStore {
        self.store
    }

    /// Load the shared server list from a URL or from a file relative to
    /// `config_path`.
    ///
    /// A missing file is an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The URL fetch fails
    /// - The file cannot be read for any reason other than not existing
    /// - The content cannot be parsed
    pub fn load_shared<P: AsRef<Path>>(&self, config_path: P, source: &str) -> Result<Vec<Server>> {
        if remote::is_url(source) {
            return remote::fetch_servers(source);
        }

        let file = shared_file(config_path.as_ref(), source)?;
        let Some(servers) = reader::read_document::<Vec<Server>>(&file)? else {
            debug!(path = %file.path.display(), "shared server file not found, using empty list");
            return Ok(Vec::new());
        };
        debug!(path = %file.path.display(), count = servers.len(), "loaded shared servers");
        Ok(servers)
    }

    /// Effective server list for `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error if the shared list or the local layer cannot be loaded.
    pub fn load_effective(&self, settings: &GlobalSettings) -> Result<Vec<Server>> {
        let shared = self.load_shared(settings.config_dir(), settings.servers_source())?;
        let local = self.store.load_local()?;
        Ok(merge_servers(&shared, &local))
    }

    /// Effective server list for `settings`, with provenance.
    ///
    /// # Errors
    ///
    /// Returns an error if the shared list or the local layer cannot be loaded.
    pub fn load_effective_with_source(
        &self,
        settings: &GlobalSettings,
    ) -> Result<Vec<ServerWithSource>> {
        let shared = self.load_shared(settings.config_dir(), settings.servers_source())?;
        let local = self.store.load_local()?;
        Ok(merge_servers_with_source(&shared, &local))
    }

    /// Persist `effective` as the shared list, leaving out private servers
    /// and every key path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `servers_path` is a URL
    /// - The target file cannot be serialized or written
    pub fn write_back<P: AsRef<Path>>(
        &self,
        config_path: P,
        servers_path: &str,
        effective: &[Server],
        local: &LocalSettings,
    ) -> Result<PathBuf> {
        if remote::is_url(servers_path) {
            return Err(SshyError::Validation(
                "cannot write servers back to a remote URL".to_string(),
            ));
        }

        let shared = shared_only(effective, local);
        let target = resolve_write_target(config_path, servers_path)?;
        writer::write_document(&target.path, &shared, target.format)?;

        info!(path = %target.path.display(), count = shared.len(), "wrote shared servers");
        Ok(target.path)
    }
}

/// Servers that belong in the shared list: private names removed, keys cleared.
pub fn shared_only(effective: &[Server], local: &LocalSettings) -> Vec<Server> {
    let private = local.private_names();
    effective
        .iter()
        .filter(|server| !private.contains(server.name.as_str()))
        .map(|server| Server { key: String::new(), ..server.clone() })
        .collect()
}

/// Locate a shared file given relative to `config_path`. `servers_path` may
/// contain directories or be absolute.
pub(crate) fn shared_file(config_path: &Path, servers_path: &str) -> Result<ConfigFile> {
    let full = config_path.join(servers_path);
    let dir = full.parent().map_or_else(|| config_path.to_path_buf(), Path::to_path_buf);
    let name = full.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    find_config_file(&dir, &name)
}
