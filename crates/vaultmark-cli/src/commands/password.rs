use vaultmark_core::credentials::require_password;
use vaultmark_core::{PasswordAdvice, PasswordChange, PasswordPurpose};

use crate::app::open_app;
use crate::cli::{CategoryArg, Cli, PasswordCommands};
use crate::errors::CliError;
use crate::ui::{badge, print, Badge, UiContext};

pub async fn handle_password(cli: &Cli, command: &PasswordCommands) -> anyhow::Result<()> {
    let ctx = UiContext::from_env(false, cli.quiet);
    match command {
        PasswordCommands::Set(args) => set(cli, &ctx, args).await,
        PasswordCommands::Change(args) => change(cli, &ctx, args).await,
        PasswordCommands::Remove(args) => remove(cli, &ctx, args).await,
        PasswordCommands::Manage(args) => manage(cli, &ctx, args).await,
    }
}

async fn set(cli: &Cli, ctx: &UiContext, args: &CategoryArg) -> anyhow::Result<()> {
    let app = open_app(cli).await?;
    let category = app.find_category(&args.category).await?;
    let password = require_password(&app.prompts, PasswordPurpose::New, &category.name).await?;
    let advice = app.library.set_password(category.id, &password).await?;
    report_advice(ctx, advice);
    print(
        ctx,
        &badge(ctx, Badge::Ok, &format!("\"{}\" is now password-protected", category.name)),
    );
    Ok(())
}

async fn change(cli: &Cli, ctx: &UiContext, args: &CategoryArg) -> anyhow::Result<()> {
    let app = open_app(cli).await?;
    let category = app.find_category(&args.category).await?;
    let current =
        require_password(&app.prompts, PasswordPurpose::Current, &category.name).await?;
    let new_password = require_password(&app.prompts, PasswordPurpose::New, &category.name).await?;
    let advice = app
        .library
        .change_password(category.id, &current, &new_password)
        .await?;
    report_advice(ctx, advice);
    print(
        ctx,
        &badge(ctx, Badge::Ok, &format!("Password changed for \"{}\"", category.name)),
    );
    Ok(())
}

async fn remove(cli: &Cli, ctx: &UiContext, args: &CategoryArg) -> anyhow::Result<()> {
    let app = open_app(cli).await?;
    let category = app.find_category(&args.category).await?;
    let current =
        require_password(&app.prompts, PasswordPurpose::Current, &category.name).await?;
    app.library.remove_password(category.id, &current).await?;
    print(
        ctx,
        &badge(ctx, Badge::Ok, &format!("Password removed from \"{}\"", category.name)),
    );
    Ok(())
}

/// Interactive flow: a protected category asks whether to change or remove.
async fn manage(cli: &Cli, ctx: &UiContext, args: &CategoryArg) -> anyhow::Result<()> {
    let app = open_app(cli).await?;
    let category = app.find_category(&args.category).await?;

    // Without a terminal the change/remove question would silently answer "remove".
    if category.is_protected() && !cli.yes && !app.prompts.interactive() {
        return Err(CliError::invalid_input(
            "`password manage` needs a terminal for a protected category. \
             Use `password change` or `password remove` instead.",
        )
        .into());
    }

    let outcome = app
        .library
        .manage_password(category.id, &app.prompts, &app.prompts)
        .await?;
    let message = match outcome {
        PasswordChange::Set(advice) => {
            report_advice(ctx, advice);
            format!("\"{}\" is now password-protected", category.name)
        }
        PasswordChange::Changed(advice) => {
            report_advice(ctx, advice);
            format!("Password changed for \"{}\"", category.name)
        }
        PasswordChange::Removed => format!("Password removed from \"{}\"", category.name),
    };
    print(ctx, &badge(ctx, Badge::Ok, &message));
    Ok(())
}

fn report_advice(ctx: &UiContext, advice: PasswordAdvice) {
    if let Some(warning) = advice.warning() {
        eprintln!("{}", badge(ctx, Badge::Warn, &warning));
    }
}
