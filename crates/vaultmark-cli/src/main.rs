//! Vaultmark CLI - bookmarks grouped by site, with password-protected categories
//!
//! This is the command-line interface for Vaultmark. Each invocation opens
//! the store, so protected categories start locked every time and are
//! unlocked only for the command that needs them.

mod app;
mod cli;
mod commands;
mod config;
mod constants;
mod errors;
mod prompt;
mod ui;

use clap::{CommandFactory, Parser};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::cli::{CategoryCommands, Cli, Commands};
use crate::commands::{bookmarks, categories, init, maintenance, misc, password};
use crate::constants::env_vars;
use crate::errors::{exit_code_for, is_cancelled, message_and_hint};
use crate::ui::{print_error, UiContext};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli).await {
        if is_cancelled(&e) {
            if !cli.quiet {
                eprintln!("Cancelled. Nothing was changed.");
            }
            return;
        }

        let ui_ctx = UiContext::from_env(false, cli.quiet);
        let (message, hint) = message_and_hint(&e);
        print_error(&ui_ctx, &message, hint.as_deref());
        std::process::exit(exit_code_for(&e));
    }
}

/// Logs go to stderr so JSON on stdout stays parseable.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(env_vars::LOG).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let Some(command) = &cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Init(args) => init::handle_init(cli, args).await,
        Commands::Add(args) => bookmarks::handle_add(cli, args).await,
        Commands::List(args) => categories::handle_list(cli, args).await,
        Commands::Show(args) => bookmarks::handle_show(cli, args).await,
        Commands::Search(args) => bookmarks::handle_search(cli, args).await,
        Commands::Delete(args) => bookmarks::handle_delete(cli, args).await,
        Commands::Category(CategoryCommands::Rename(args)) => {
            categories::handle_rename(cli, args).await
        }
        Commands::Category(CategoryCommands::Delete(args)) => {
            categories::handle_delete(cli, args).await
        }
        Commands::Password(command) => password::handle_password(cli, command).await,
        Commands::Check(args) => maintenance::handle_check(cli, args).await,
        Commands::Completions(args) => misc::handle_completions(args),
    }
}
