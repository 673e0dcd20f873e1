use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::ffi::OsString;

#[derive(Parser, Debug)]
#[command(
    name = "sshy",
    about = "Manage SSH servers from a shared list plus your own local layer",
    long_about = "sshy keeps a team's SSH servers in one shared YAML or JSON list and lets
each user layer personal changes on top of it.

Files live in ~/.sshy/ (or $SSHY_CONFIG_DIR):
  • config.yaml / config.json: where the shared list comes from
  • local.yaml / local.json: overrides for shared servers and private servers
  • servers.yaml: the shared list itself (path or URL configurable)

Running `sshy <name>` is the same as `sshy connect <name>`; running `sshy`
alone opens the server picker.",
    version,
    author
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable debug output (shows INFO and DEBUG messages)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Enable trace output (shows all log messages including TRACE)
    #[arg(long, global = true)]
    pub trace: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a private server to the local file
    #[command(long_about = "Add a private server to the local file.

Without arguments every field is asked for interactively. Defaults:
user root, port 22, key ~/.ssh/id_rsa.

Examples:
  sshy add
  sshy add lab 192.168.1.20 pi
  sshy add lab 192.168.1.20 pi 2222 ~/.ssh/lab home,arm")]
    Add {
        /// Server name
        name: Option<String>,
        /// Host name or address
        host: Option<String>,
        /// Login user
        user: Option<String>,
        /// Port (default 22)
        port: Option<u16>,
        /// Private key path (default ~/.ssh/id_rsa)
        key: Option<String>,
        /// Comma-separated tags
        tags: Option<String>,
    },

    /// Remove a private server or a local override
    Rm {
        /// Server name (picker when omitted)
        name: Option<String>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Edit a server interactively
    #[command(long_about = "Edit a server interactively.

Private servers are updated in place. Changes to shared servers are stored as
overrides in the local file; renaming a shared server rewrites the shared file.")]
    Edit {
        /// Server name (picker when omitted)
        name: Option<String>,
    },

    /// List servers with their source: [S] shared, [L] local, [O] override
    List {
        /// Only show servers carrying all of these tags
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// Connect to a server with ssh
    #[command(long_about = "Connect to a server with ssh.

Flags after the name are passed to ssh unchanged. Everything after `--` is run
on the remote host.

Examples:
  sshy connect web
  sshy connect web -v -L 8080:localhost:80
  sshy connect web -- tail -f /var/log/syslog")]
    Connect {
        #[arg(
            num_args = 0..,
            value_name = "NAME [SSH_FLAGS]... [-- COMMAND]",
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        args: Vec<String>,
    },

    /// Copy files to or from servers with scp
    #[command(long_about = "Copy files to or from servers with scp.

Remote endpoints are written as server:path using server names.

Examples:
  sshy scp ./app.tar.gz web:/tmp/
  sshy scp -r web:/var/log ./logs")]
    Scp {
        #[arg(
            num_args = 0..,
            value_name = "[SSH_FLAGS]... SOURCE DESTINATION",
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        args: Vec<String>,
    },

    /// Open an sftp session with a server
    Sftp {
        #[arg(
            num_args = 0..,
            value_name = "[SSH_FLAGS]... NAME",
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        args: Vec<String>,
    },

    /// Print the shared or local file
    View {
        /// Which file to show (picker when omitted)
        #[arg(value_enum)]
        which: Option<ViewTarget>,
    },

    /// Set up sshy interactively
    Init,

    /// Open the local file in $EDITOR
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ViewTarget {
    Shared,
    Local,
}

fn is_flag(arg: &str) -> bool {
    arg.len() > 1 && arg.starts_with('-')
}

fn is_subcommand(arg: &str) -> bool {
    arg == "help" || Cli::command().get_subcommands().any(|sub| sub.get_name() == arg)
}

/// Turn a bare invocation into an explicit `connect`.
///
/// `sshy` becomes `sshy connect`, and `sshy web -v` becomes
/// `sshy connect web -v`. Leading `--debug`/`--trace` are kept in front.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    if args.is_empty() {
        return args;
    }

    let mut idx = 1;
    while idx < args.len() && matches!(args[idx].to_str(), Some("--debug" | "--trace")) {
        idx += 1;
    }

    match args.get(idx).map(|a| a.to_string_lossy().into_owned()) {
        None => args.push(OsString::from("connect")),
        Some(first) if !is_subcommand(&first) && !is_flag(&first) => {
            args.insert(idx, OsString::from("connect"));
        },
        Some(_) => {},
    }
    args
}

/// Split a comma-separated tag list, trimming blanks.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|t| !t.is_empty()).map(str::to_string).collect()
}
