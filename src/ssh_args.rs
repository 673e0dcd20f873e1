//! Argument vectors for `ssh`, `scp` and `sftp`.
//!
//! Everything here is pure: servers and user-supplied flags in, argument
//! lists out. `ssh` takes the port as `-p`; `scp` and `sftp` take `-P`.

use crate::server::Server;

/// Value of the first `-l <user>` pair in `flags`, if any.
pub fn user_flag(flags: &[String]) -> Option<&str> {
    flags.windows(2).find(|pair| pair[0] == "-l").map(|pair| pair[1].as_str())
}

/// `flags` with every `-l <user>` pair removed. A trailing `-l` without a
/// value is passed through untouched.
pub fn strip_user_flag(flags: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(flags.len());
    let mut iter = flags.iter().peekable();
    while let Some(flag) = iter.next() {
        if flag == "-l" && iter.peek().is_some() {
            iter.next();
            continue;
        }
        out.push(flag.clone());
    }
    out
}

/// Split `name:path` at the first colon. Without a colon the whole endpoint
/// is a local path and the name is empty.
pub fn split_name_and_path(endpoint: &str) -> (&str, &str) {
    endpoint.split_once(':').unwrap_or(("", endpoint))
}

/// Separate ssh flags from a remote command given after `--`. The command
/// words are joined with single spaces.
pub fn split_remote_command(args: &[String]) -> (Vec<String>, String) {
    match args.iter().position(|a| a == "--") {
        Some(idx) => (args[..idx].to_vec(), args[idx + 1..].join(" ")),
        None => (args.to_vec(), String::new()),
    }
}

fn key_args(server: &Server, out: &mut Vec<String>) {
    if !server.key.is_empty() {
        out.push("-i".to_string());
        out.push(server.key.clone());
    }
}

fn port_args(server: &Server, flag: &str, out: &mut Vec<String>) {
    if server.has_custom_port() {
        out.push(flag.to_string());
        out.push(server.port.to_string());
    }
}

/// Arguments for `ssh` connecting to `server`.
///
/// When the caller passes `-l`, the destination is the bare host so the flag
/// decides the login name.
pub fn build_connect_args(server: &Server, flags: &[String], remote_command: &str) -> Vec<String> {
    let mut args = Vec::new();
    key_args(server, &mut args);
    port_args(server, "-p", &mut args);

    for option in server.ssh_options() {
        args.extend(option.args());
    }

    args.extend(flags.iter().cloned());

    if flags.iter().any(|f| f == "-l") {
        args.push(server.host.clone());
    } else {
        args.push(server.destination(&server.user));
    }

    if !remote_command.is_empty() {
        args.push(remote_command.to_string());
    }
    args
}

/// `user@host:path` for `scp`. A `-l` flag replaces the stored user.
pub fn build_copy_target(server: &Server, remote_path: &str, flags: &[String]) -> String {
    format!("{}:{remote_path}", build_sftp_target(server, flags))
}

/// `user@host` for `sftp`. A `-l` flag replaces the stored user.
pub fn build_sftp_target(server: &Server, flags: &[String]) -> String {
    let user = user_flag(flags).unwrap_or(&server.user);
    server.destination(user)
}

/// One side of a copy: either a local path or a path on a resolved server.
#[derive(Debug, Clone, PartialEq)]
pub enum CopyEndpoint {
    Local(String),
    Remote { server: Server, path: String },
}

impl CopyEndpoint {
    fn server(&self) -> Option<&Server> {
        match self {
            Self::Local(_) => None,
            Self::Remote { server, .. } => Some(server),
        }
    }

    fn render(&self, flags: &[String]) -> String {
        match self {
            Self::Local(path) => path.clone(),
            Self::Remote { server, path } => build_copy_target(server, path, flags),
        }
    }
}

/// Arguments for `scp`. Key and port come from the first remote endpoint.
pub fn build_copy_args(
    source: &CopyEndpoint,
    destination: &CopyEndpoint,
    flags: &[String],
) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(server) = source.server().or_else(|| destination.server()) {
        key_args(server, &mut args);
        port_args(server, "-P", &mut args);
    }
    args.extend(strip_user_flag(flags));
    args.push(source.render(flags));
    args.push(destination.render(flags));
    args
}

/// Arguments for `sftp` connecting to `server`.
pub fn build_sftp_args(server: &Server, flags: &[String]) -> Vec<String> {
    let mut args = Vec::new();
    key_args(server, &mut args);
    port_args(server, "-P", &mut args);
    args.extend(strip_user_flag(flags));
    args.push(build_sftp_target(server, flags));
    args
}
