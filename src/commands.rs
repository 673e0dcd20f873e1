//! Handlers behind each subcommand.
//!
//! Every handler works through a [`Session`]: the settings store, the
//! process runner and the prompter are all injected, so the same code runs
//! against the real terminal and against scripted tests.

use crate::app_config::GlobalSettings;
use crate::bootstrap::{self, InitOptions, SharedSource};
use crate::cli::{parse_tags, Commands, ViewTarget};
use crate::config::{reader, LocalSettings, SettingsStore};
use crate::format::{self, Format};
use crate::launcher::CommandRunner;
use crate::merge::{self, MergeEngine};
use crate::picker;
use crate::prompt::{select, Prompter};
use crate::server::{find_server, Server, ServerOverride, ServerSource, ServerWithSource, DEFAULT_PORT};
use crate::ssh_args::{self, CopyEndpoint};
use crate::{remote, SshyError};
use anyhow::{Context, Result};
use std::io::Write;
use tracing::{debug, info};

/// User suggested for new servers.
pub const DEFAULT_USER: &str = "root";
/// Key suggested for new servers.
pub const DEFAULT_KEY: &str = "~/.ssh/id_rsa";
/// Editor used by `local` when `$EDITOR` is unset.
pub const DEFAULT_EDITOR: &str = "nano";

const ADD_USAGE: &str = "usage: sshy add [<name> <host> <user> [<port>] [<key>] [<tags>]]";

pub struct Session<'a> {
    store: &'a SettingsStore,
    runner: &'a mut dyn CommandRunner,
    prompter: Prompter<'a>,
    full_screen_picker: bool,
}

impl<'a> Session<'a> {
    pub fn new(
        store: &'a SettingsStore,
        runner: &'a mut dyn CommandRunner,
        prompter: Prompter<'a>,
    ) -> Self {
        Self { store, runner, prompter, full_screen_picker: false }
    }

    /// Pick servers with the full-screen picker instead of the numbered list.
    #[must_use]
    pub const fn with_full_screen_picker(mut self, enabled: bool) -> Self {
        self.full_screen_picker = enabled;
        self
    }

    fn say(&mut self, line: &str) -> Result<()> {
        self.prompter.say(line)?;
        Ok(())
    }

    fn load_settings(&self) -> Result<GlobalSettings> {
        self.store.load_global().context("Failed to load global settings")
    }

    fn load_entries(&self) -> Result<(GlobalSettings, Vec<ServerWithSource>)> {
        let settings = self.load_settings()?;
        let entries = MergeEngine::new(self.store)
            .load_effective_with_source(&settings)
            .context("Failed to load servers")?;
        Ok((settings, entries))
    }

    fn load_servers(&self) -> Result<Vec<Server>> {
        let settings = self.load_settings()?;
        MergeEngine::new(self.store).load_effective(&settings).context("Failed to load servers")
    }

    fn pick(&mut self, label: &str, names: &[String]) -> Result<Option<String>> {
        let choice = if self.full_screen_picker {
            picker::pick(label, names)?
        } else {
            select(&mut self.prompter, label, names)?
        };
        Ok(choice.map(|idx| names[idx].clone()))
    }
}

/// Run one parsed subcommand, returning the process exit code.
///
/// # Errors
///
/// Returns an error if the command fails before an external program could
/// report its own exit code.
pub fn dispatch(session: &mut Session<'_>, command: Commands) -> Result<i32> {
    match command {
        Commands::Add { name, host, user, port, key, tags } => {
            run_add(session, AddArgs { name, host, user, port, key, tags })
        },
        Commands::Rm { name, yes } => run_rm(session, name, yes),
        Commands::Edit { name } => run_edit(session, name),
        Commands::List { tags } => run_list(session, &tags),
        Commands::Connect { args } => run_connect(session, &args),
        Commands::Scp { args } => run_scp(session, &args),
        Commands::Sftp { args } => run_sftp(session, &args),
        Commands::View { which } => run_view(session, which),
        Commands::Init => run_init(session),
        Commands::Local => run_local(session),
    }
}

#[derive(Debug, Clone, Default)]
pub struct AddArgs {
    pub name: Option<String>,
    pub host: Option<String>,
    pub user: Option<String>,
    pub port: Option<u16>,
    pub key: Option<String>,
    pub tags: Option<String>,
}

fn parse_port(raw: &str) -> crate::Result<u16> {
    match raw.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(SshyError::Validation(format!("invalid port number: {raw}"))),
    }
}

fn server_from_args(args: AddArgs) -> crate::Result<Server> {
    let (Some(name), Some(host), Some(user)) = (args.name, args.host, args.user) else {
        return Err(SshyError::Validation(ADD_USAGE.to_string()));
    };
    let mut server = Server::new(name, host)
        .with_user(user)
        .with_port(args.port.unwrap_or(DEFAULT_PORT))
        .with_key(args.key.unwrap_or_else(|| DEFAULT_KEY.to_string()));
    server.tags = args.tags.as_deref().map(parse_tags).unwrap_or_default();
    Ok(server)
}

fn prompt_new_server(prompter: &mut Prompter<'_>) -> crate::Result<Server> {
    let name = prompter.ask("Server name", "")?;
    let host = prompter.ask("Host", "")?;
    let user = prompter.ask("User", DEFAULT_USER)?;
    let port = parse_port(&prompter.ask("Port", &DEFAULT_PORT.to_string())?)?;
    let key = prompter.ask("Key path", DEFAULT_KEY)?;
    let tags = parse_tags(&prompter.ask("Tags (comma separated, optional)", "")?);

    Ok(Server::new(name, host).with_user(user).with_port(port).with_key(key).with_tags(tags))
}

/// Add a private server.
///
/// # Errors
///
/// Returns an error if the input is incomplete or invalid, the name is
/// already used by a private server, or the local file cannot be saved.
pub fn run_add(session: &mut Session<'_>, args: AddArgs) -> Result<i32> {
    let server = if args.name.is_none() {
        prompt_new_server(&mut session.prompter)?
    } else {
        server_from_args(args)?
    };

    if server.name.is_empty() {
        return Err(SshyError::Validation("server name cannot be empty".to_string()).into());
    }
    if server.host.is_empty() {
        return Err(SshyError::Validation("host cannot be empty".to_string()).into());
    }

    let mut local = session.store.load_local().context("Failed to load local settings")?;
    if local.find_private(&server.name).is_some() {
        return Err(SshyError::Validation(format!(
            "a private server named '{}' already exists",
            server.name
        ))
        .into());
    }

    let name = server.name.clone();
    local.private.push(server);
    let path = session.store.save_local(&local).context("Failed to save local settings")?;
    info!(server = %name, path = %path.display(), "added private server");

    session.say("Server added successfully")?;
    Ok(0)
}

/// Remove a private server or the override of a shared one.
///
/// # Errors
///
/// Returns an error if the server does not exist, belongs only to the shared
/// list, or the local file cannot be saved.
pub fn run_rm(session: &mut Session<'_>, name: Option<String>, yes: bool) -> Result<i32> {
    let (_, entries) = session.load_entries()?;
    let removable: Vec<&ServerWithSource> = entries
        .iter()
        .filter(|e| matches!(e.source, ServerSource::Local | ServerSource::Override))
        .collect();

    let name = match name {
        Some(name) => name,
        None => {
            if removable.is_empty() {
                session.say("No removable servers configured")?;
                return Ok(0);
            }
            let names: Vec<String> = removable.iter().map(|e| e.server.name.clone()).collect();
            let Some(name) = session.pick("Select a server to remove:", &names)? else {
                session.say("Selection cancelled")?;
                return Ok(0);
            };
            name
        },
    };

    if name.is_empty() {
        return Err(SshyError::NotFound(name).into());
    }

    let Some(source) = removable.iter().find(|e| e.server.name == name).map(|e| e.source) else {
        if entries.iter().any(|e| e.server.name == name) {
            return Err(SshyError::Validation(format!(
                "'{name}' comes from the shared list and cannot be removed"
            ))
            .into());
        }
        return Err(SshyError::NotFound(name).into());
    };

    if !yes && !session.prompter.confirm(&format!("Are you sure you want to remove '{name}'?"))? {
        session.say("Removal cancelled")?;
        return Ok(0);
    }

    let mut local = session.store.load_local().context("Failed to load local settings")?;
    let removed = match source {
        ServerSource::Local => local.remove_private(&name),
        ServerSource::Override => local.overrides.remove(&name).is_some(),
        ServerSource::Shared => false,
    };
    if removed {
        session.store.save_local(&local).context("Failed to save local settings")?;
        info!(server = %name, %source, "removed server");
    }

    session.say("Server removed successfully")?;
    Ok(0)
}

/// Field changes collected by `edit`. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
struct ServerEdit {
    name: Option<String>,
    host: Option<String>,
    user: Option<String>,
    port: Option<u16>,
    key: Option<String>,
    tags: Option<Vec<String>>,
}

impl ServerEdit {
    fn renamed<'s>(&'s self, current: &str) -> Option<&'s str> {
        self.name.as_deref().filter(|name| *name != current)
    }

    fn apply_to_server(&self, server: &mut Server) {
        if let Some(name) = &self.name {
            server.name.clone_from(name);
        }
        if let Some(host) = &self.host {
            server.host.clone_from(host);
        }
        if let Some(user) = &self.user {
            server.user.clone_from(user);
        }
        if let Some(port) = self.port {
            server.port = port;
        }
        if let Some(key) = &self.key {
            server.key.clone_from(key);
        }
        if let Some(tags) = &self.tags {
            server.tags.clone_from(tags);
        }
    }

    fn apply_to_override(&self, ov: &mut ServerOverride) {
        if let Some(host) = &self.host {
            ov.host.clone_from(host);
        }
        if let Some(user) = &self.user {
            ov.user.clone_from(user);
        }
        if let Some(port) = self.port {
            ov.port = port;
        }
        if let Some(key) = &self.key {
            ov.key.clone_from(key);
        }
        if let Some(tags) = &self.tags {
            ov.tags.clone_from(tags);
        }
    }
}

fn or_default<'s>(value: &'s str, default: &'s str) -> &'s str {
    if value.is_empty() {
        default
    } else {
        value
    }
}

fn prompt_edit(prompter: &mut Prompter<'_>, current: &Server) -> crate::Result<ServerEdit> {
    let name = prompter.ask_change("Name", &current.name)?;
    let host = prompter.ask_change("Host", &current.host)?;
    let user = prompter.ask_change("User", or_default(&current.user, DEFAULT_USER))?;
    let port = prompter
        .ask_change("Port", &current.effective_port().to_string())?
        .map(|raw| parse_port(&raw))
        .transpose()?;
    let key = prompter.ask_change("Key", or_default(&current.key, DEFAULT_KEY))?;
    let tags = prompter.ask_change("Tags", &current.tags.join(", "))?.map(|raw| parse_tags(&raw));

    Ok(ServerEdit { name, host, user, port, key, tags })
}

fn rename_shared(
    store: &SettingsStore,
    settings: &GlobalSettings,
    old: &str,
    new: &str,
    local: &LocalSettings,
) -> Result<()> {
    if settings.is_remote_source() {
        return Err(SshyError::Validation(format!(
            "cannot rename '{old}': the shared list is read from a URL"
        ))
        .into());
    }

    let engine = MergeEngine::new(store);
    let mut shared = engine
        .load_shared(settings.config_dir(), &settings.servers_path)
        .context("Failed to load shared servers")?;
    let server = shared
        .iter_mut()
        .find(|s| s.name == old)
        .ok_or_else(|| SshyError::NotFound(old.to_string()))?;
    new.clone_into(&mut server.name);

    let path = engine
        .write_back(settings.config_dir(), &settings.servers_path, &shared, local)
        .context("Failed to write shared servers")?;
    info!(from = old, to = new, path = %path.display(), "renamed shared server");
    Ok(())
}

/// Edit a server interactively.
///
/// # Errors
///
/// Returns an error if the server does not exist, the new name is taken, a
/// value is invalid, or a file cannot be saved.
pub fn run_edit(session: &mut Session<'_>, name: Option<String>) -> Result<i32> {
    let (settings, entries) = session.load_entries()?;

    let name = match name {
        Some(name) => name,
        None => {
            if entries.is_empty() {
                session.say("No servers configured")?;
                return Ok(0);
            }
            let names: Vec<String> = entries.iter().map(|e| e.server.name.clone()).collect();
            let Some(name) = session.pick("Select a server to edit:", &names)? else {
                session.say("Selection cancelled")?;
                return Ok(0);
            };
            name
        },
    };

    if name.is_empty() {
        return Err(SshyError::NotFound(name).into());
    }

    let entry = entries
        .iter()
        .find(|e| e.server.name == name)
        .cloned()
        .ok_or_else(|| SshyError::NotFound(name.clone()))?;

    let edit = prompt_edit(&mut session.prompter, &entry.server)?;
    if let Some(new_name) = edit.renamed(&entry.server.name) {
        if entries.iter().any(|e| e.server.name == new_name) {
            return Err(SshyError::Validation(format!(
                "a server named '{new_name}' already exists"
            ))
            .into());
        }
    }

    let mut local = session.store.load_local().context("Failed to load local settings")?;
    match entry.source {
        ServerSource::Local => {
            let mut server = entry.server.clone();
            edit.apply_to_server(&mut server);
            local.upsert_private(&entry.server.name, server);
        },
        ServerSource::Shared | ServerSource::Override => {
            let mut ov = local.overrides.remove(&entry.server.name).unwrap_or_default();
            edit.apply_to_override(&mut ov);

            let target = match edit.renamed(&entry.server.name) {
                Some(new_name) => {
                    rename_shared(session.store, &settings, &entry.server.name, new_name, &local)?;
                    new_name.to_string()
                },
                None => entry.server.name.clone(),
            };
            if !ov.is_empty() {
                local.overrides.insert(target, ov);
            }
        },
    }

    session.store.save_local(&local).context("Failed to save local settings")?;
    session.say("Server updated successfully")?;
    Ok(0)
}

/// Print the effective server list, optionally filtered by tags.
///
/// # Errors
///
/// Returns an error if the servers cannot be loaded.
pub fn run_list(session: &mut Session<'_>, tags: &[String]) -> Result<i32> {
    let (_, entries) = session.load_entries()?;

    for entry in entries.iter().filter(|e| e.server.has_all_tags(tags)) {
        let server = &entry.server;
        let line = format!(
            "{} {}: {} [{}]",
            entry.source.flag(),
            server.name,
            server.destination(&server.user),
            server.tags.join(", ")
        );
        session.say(&line)?;
    }
    Ok(0)
}

/// Connect with ssh, picking a server when no name is given.
///
/// # Errors
///
/// Returns an error if the server is unknown or ssh cannot be started.
pub fn run_connect(session: &mut Session<'_>, args: &[String]) -> Result<i32> {
    let servers = session.load_servers()?;

    let (server, flags, remote_command) = match args.split_first() {
        Some((name, rest)) => {
            let server =
                find_server(&servers, name).ok_or_else(|| SshyError::NotFound(name.clone()))?;
            let (flags, command) = ssh_args::split_remote_command(rest);
            (server, flags, command)
        },
        None => {
            if servers.is_empty() {
                session.say("No servers configured")?;
                return Ok(0);
            }
            let names: Vec<String> = servers.iter().map(|s| s.name.clone()).collect();
            let Some(idx) = select(&mut session.prompter, "Select a server:", &names)? else {
                session.say("No server selected")?;
                return Ok(0);
            };
            (&servers[idx], Vec::new(), String::new())
        },
    };

    let ssh = ssh_args::build_connect_args(server, &flags, &remote_command);
    debug!(server = %server.name, args = ?ssh, "connecting");
    Ok(session.runner.run("ssh", &ssh)?)
}

fn resolve_endpoint(servers: &[Server], endpoint: &str) -> crate::Result<CopyEndpoint> {
    let (name, path) = ssh_args::split_name_and_path(endpoint);
    if name.is_empty() {
        return Ok(CopyEndpoint::Local(endpoint.to_string()));
    }
    let server = find_server(servers, name).ok_or_else(|| SshyError::NotFound(name.to_string()))?;
    Ok(CopyEndpoint::Remote { server: server.clone(), path: path.to_string() })
}

/// Copy files with scp using `server:path` endpoints.
///
/// # Errors
///
/// Returns an error if fewer than two endpoints are given, a server is
/// unknown, or scp cannot be started.
pub fn run_scp(session: &mut Session<'_>, args: &[String]) -> Result<i32> {
    let [flags @ .., source, destination] = args else {
        return Err(SshyError::Validation(
            "usage: sshy scp [ssh-flags...] <source> <destination>".to_string(),
        )
        .into());
    };

    let servers = session.load_servers()?;
    let source = resolve_endpoint(&servers, source)?;
    let destination = resolve_endpoint(&servers, destination)?;

    let scp = ssh_args::build_copy_args(&source, &destination, flags);
    debug!(args = ?scp, "copying");
    Ok(session.runner.run("scp", &scp)?)
}

/// Open an sftp session.
///
/// # Errors
///
/// Returns an error if no name is given, the server is unknown, or sftp
/// cannot be started.
pub fn run_sftp(session: &mut Session<'_>, args: &[String]) -> Result<i32> {
    let [flags @ .., name] = args else {
        return Err(SshyError::Validation("usage: sshy sftp [ssh-flags...] <name>".to_string()).into());
    };

    let servers = session.load_servers()?;
    let server = find_server(&servers, name).ok_or_else(|| SshyError::NotFound(name.clone()))?;

    let sftp = ssh_args::build_sftp_args(server, flags);
    debug!(server = %server.name, args = ?sftp, "starting sftp");
    Ok(session.runner.run("sftp", &sftp)?)
}

fn render_as_yaml(data: &[u8]) -> String {
    let rendered = match serde_yaml::from_slice::<serde_yaml::Value>(data) {
        Ok(value) if !value.is_null() => serde_yaml::to_string(&value).ok(),
        _ => None,
    };
    rendered.unwrap_or_else(|| String::from_utf8_lossy(data).into_owned())
}

/// Print the shared or the local file, re-emitted as YAML when it parses.
///
/// # Errors
///
/// Returns an error if the file or URL cannot be read.
pub fn run_view(session: &mut Session<'_>, which: Option<ViewTarget>) -> Result<i32> {
    let settings = session.load_settings()?;
    let local_file = session.store.local_file()?;

    let which = match which {
        Some(which) => which,
        None => {
            let shared_label = settings
                .remote_url()
                .map_or_else(|| settings.servers_path.clone(), |url| format!("URL: {url}"));
            let local_name =
                local_file.path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            let options = [
                format!("{shared_label} - Shared server configuration"),
                format!("{local_name} - Local overrides and private servers"),
            ];
            match select(&mut session.prompter, "Select a file to view:", &options)? {
                Some(0) => ViewTarget::Shared,
                Some(_) => ViewTarget::Local,
                None => {
                    session.say("Selection cancelled")?;
                    return Ok(0);
                },
            }
        },
    };

    let (title, data) = match which {
        ViewTarget::Shared => match settings.remote_url() {
            Some(url) => {
                let document = remote::fetch(url).context("Failed to fetch shared servers")?;
                (format!("Shared Configuration (URL: {url})"), Some(document.body))
            },
            None => {
                let file = merge::shared_file(&settings.config_dir(), &settings.servers_path)?;
                let data = reader::read_optional(&file.path)?;
                (format!("Shared Configuration ({})", file.path.display()), data)
            },
        },
        ViewTarget::Local => {
            let data = reader::read_optional(&local_file.path)?;
            (format!("Local Configuration ({})", local_file.path.display()), data)
        },
    };

    let Some(data) = data.filter(|d| !d.is_empty()) else {
        session.say(&format!("{title} does not exist or is empty"))?;
        return Ok(0);
    };

    session.say(&format!("=== {title} ===\n"))?;
    write!(session.prompter.out(), "{}", render_as_yaml(&data)).context("Failed to write output")?;
    Ok(0)
}

fn prompt_init_options(session: &mut Session<'_>) -> Result<InitOptions> {
    session.say("\nChoose your preferred configuration format:")?;
    session.say("  1) YAML (default)")?;
    session.say("  2) JSON")?;
    let format = match session.prompter.ask("Enter choice", "1")?.to_ascii_lowercase().as_str() {
        "2" | "json" => Format::Json,
        _ => Format::Yaml,
    };

    session.say("\nChoose how to configure shared servers:")?;
    session.say("  1) Local file path (default)")?;
    session.say("  2) Remote URL (HTTP/HTTPS)")?;
    let source = if session.prompter.ask("Enter choice", "1")? == "2" {
        let url = session.prompter.ask("URL of the shared servers list", "")?;
        if url.is_empty() {
            return Err(SshyError::Validation("URL cannot be empty".to_string()).into());
        }
        remote::validate_url(&url)?;
        SharedSource::Url(url)
    } else {
        let default = bootstrap::default_servers_path(format);
        SharedSource::File(session.prompter.ask("Path of the shared servers file", &default)?)
    };

    Ok(InitOptions { format, source })
}

/// Interactive first-time setup.
///
/// # Errors
///
/// Returns an error if an answer is invalid or a file cannot be written.
pub fn run_init(session: &mut Session<'_>) -> Result<i32> {
    let global = session.store.global_file()?;
    if global.exists {
        session.say(&format!("Existing configuration found ({} format).", global.format))?;
        if !session.prompter.confirm("Do you want to reconfigure?")? {
            session.say("Configuration unchanged.")?;
            return Ok(0);
        }
    }

    let options = prompt_init_options(session)?;

    for stale in bootstrap::stale_files(session.store, options.format)? {
        if session.prompter.confirm(&format!("Remove old file ({})?", stale.display()))? {
            bootstrap::remove_stale(&stale)?;
            session.say(&format!("Removed: {}", stale.display()))?;
        }
    }

    let report = bootstrap::apply_init(session.store, &options).context("Failed to initialize")?;
    let status = |created: bool| if created { "created" } else { "exists, unchanged" };

    session.say("\nConfiguration initialized successfully.")?;
    session.say(&format!("Format: {}", report.format))?;
    session.say(&format!("Global config: {}", report.global_path.display()))?;
    session.say(&format!(
        "Local config: {} ({})",
        report.local_path.display(),
        status(report.local_created)
    ))?;
    if let Some(url) = &report.servers_url {
        session.say(&format!("Servers URL: {url}"))?;
    }
    if let Some(path) = &report.servers_path {
        session.say(&format!("Servers file: {} ({})", path.display(), status(report.servers_created)))?;
    }
    Ok(0)
}

/// Open the local file in `$EDITOR`, writing a template first if it is
/// missing or empty.
///
/// # Errors
///
/// Returns an error if the template cannot be written or the editor cannot
/// be started.
pub fn run_local(session: &mut Session<'_>) -> Result<i32> {
    let file = session.store.local_file()?;
    bootstrap::ensure_local_template(&file.path, format::resolve(&[file.format]))
        .context("Failed to prepare local settings file")?;

    let editor =
        std::env::var("EDITOR").ok().filter(|e| !e.is_empty()).unwrap_or_else(|| DEFAULT_EDITOR.to_string());
    debug!(%editor, path = %file.path.display(), "opening local settings");
    Ok(session.runner.run(&editor, &[file.path.to_string_lossy().into_owned()])?)
}
