use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use vaultmark_core::VERSION;

use crate::config::Backend;

/// Vaultmark - bookmarks grouped by site, with password-protected categories
#[derive(Parser)]
#[command(name = "vaultmark")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the store (directory for json, file for sqlite)
    #[arg(short, long, global = true, env = "VAULTMARK_STORE")]
    pub store: Option<String>,

    /// Config file override
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Answer yes to confirmation prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Arguments for the `init` command
#[derive(Args)]
pub struct InitArgs {
    /// Where the store will be created
    #[arg(value_name = "PATH")]
    pub path: Option<String>,

    /// Storage backend
    #[arg(long, value_enum, default_value_t = Backend::Json)]
    pub backend: Backend,

    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `add` command
#[derive(Args)]
pub struct AddArgs {
    /// Page URL
    #[arg(value_name = "URL")]
    pub url: String,

    /// Page title (defaults to the URL)
    #[arg(short, long)]
    pub title: Option<String>,
}

/// Arguments for the `list` command
#[derive(Args)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `show` command
#[derive(Args)]
pub struct ShowArgs {
    /// Category name, id, or id prefix
    #[arg(value_name = "CATEGORY")]
    pub category: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `search` command
#[derive(Args)]
pub struct SearchArgs {
    /// Text to match against titles and URLs
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Unlock a protected category first so it is searched too
    #[arg(short, long, value_name = "CATEGORY")]
    pub unlock: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `delete` command
#[derive(Args)]
pub struct DeleteArgs {
    /// Bookmark ids or unique id prefixes
    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<String>,
}

/// Arguments for the `check` command
#[derive(Args)]
pub struct CheckArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `completions` command
#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_name = "SHELL")]
    pub shell: Shell,
}

/// A single category selector
#[derive(Args)]
pub struct CategoryArg {
    /// Category name, id, or id prefix
    #[arg(value_name = "CATEGORY")]
    pub category: String,
}

/// Arguments for `category rename`
#[derive(Args)]
pub struct RenameArgs {
    /// Category name, id, or id prefix
    #[arg(value_name = "CATEGORY")]
    pub category: String,

    /// New display name
    #[arg(value_name = "NAME")]
    pub name: String,
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Rename a category
    Rename(RenameArgs),

    /// Delete a category and all of its bookmarks
    Delete(CategoryArg),
}

#[derive(Subcommand)]
pub enum PasswordCommands {
    /// Protect an unprotected category
    Set(CategoryArg),

    /// Change a protected category's password
    Change(CategoryArg),

    /// Remove protection and store bookmarks as plaintext again
    Remove(CategoryArg),

    /// Set, change, or remove interactively
    Manage(CategoryArg),
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a config file and an empty store
    Init(InitArgs),

    /// Bookmark a page into the category for its site
    Add(AddArgs),

    /// List categories
    List(ListArgs),

    /// Show the bookmarks in a category
    Show(ShowArgs),

    /// Search bookmarks in readable categories
    Search(SearchArgs),

    /// Delete bookmarks by id (asks for confirmation and any category password)
    Delete(DeleteArgs),

    /// Manage categories
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Manage category passwords
    #[command(subcommand)]
    Password(PasswordCommands),

    /// Check the store for inconsistencies
    Check(CheckArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}
