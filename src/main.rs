#![allow(missing_docs)]

use anyhow::{Context, Result};
use clap::Parser;
use sshy::{
    cli::{self, Cli},
    commands::{self, Session},
    launcher::SystemRunner,
    prompt::Prompter,
    SettingsStore,
};
use std::io::{self, IsTerminal};
use tracing::{debug, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let cli = Cli::parse_from(cli::normalize_args(std::env::args_os()));

    initialize_tracing(cli.debug, cli.trace);

    match run(cli) {
        Ok(code) => {
            if code != 0 {
                debug!("Exiting with code: {}", code);
            }
            std::process::exit(code);
        },
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        },
    }
}

/// Initialize tracing with the specified debug/trace flags
fn initialize_tracing(debug: bool, trace: bool) {
    let log_level = if trace {
        Level::TRACE
    } else if debug {
        Level::DEBUG
    } else {
        Level::WARN
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::builder().with_default_directive(log_level.into()).from_env_lossy())
        .init();
}

fn run(cli: Cli) -> Result<i32> {
    let command = cli.command.context("no command given")?;

    let store = SettingsStore::system();
    debug!("Settings directory: {}", store.settings_dir()?.display());

    let mut runner = SystemRunner;
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    let prompter = Prompter::new(&mut input, &mut output);

    let interactive = io::stdin().is_terminal() && io::stdout().is_terminal();
    let mut session =
        Session::new(&store, &mut runner, prompter).with_full_screen_picker(interactive);
    commands::dispatch(&mut session, command)
}
