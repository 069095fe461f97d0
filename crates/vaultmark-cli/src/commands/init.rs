use std::path::PathBuf;

use vaultmark_core::{Library, LibrarySettings};

use crate::app::{config_path, open_store};
use crate::cli::{Cli, InitArgs};
use crate::config::{default_store_path, write_config, VaultmarkConfig};
use crate::errors::CliError;
use crate::ui::{badge, kv, print, Badge, UiContext};

/// Write a config file and create the empty collections.
pub async fn handle_init(cli: &Cli, args: &InitArgs) -> anyhow::Result<()> {
    let ctx = UiContext::from_env(false, cli.quiet);
    let config_path = config_path(cli)?;
    if config_path.exists() && !args.force {
        return Err(CliError::invalid_input(format!(
            "Config already exists at {}. Use --force to overwrite it.",
            config_path.display()
        ))
        .into());
    }

    let store_path = match args.path.as_ref().or(cli.store.as_ref()) {
        Some(path) => PathBuf::from(path),
        None => default_store_path(args.backend)?,
    };

    let library = Library::new(open_store(&store_path, args.backend)?, LibrarySettings::default());
    library.initialize().await?;

    let config = VaultmarkConfig::new(store_path.clone(), args.backend);
    write_config(&config_path, &config)?;

    print(&ctx, &badge(&ctx, Badge::Ok, "Vaultmark initialized"));
    print(&ctx, &kv(&ctx, "Store", &store_path.display().to_string()));
    print(&ctx, &kv(&ctx, "Config", &config_path.display().to_string()));
    Ok(())
}
