use vaultmark_core::LockState;

use crate::app::open_app;
use crate::cli::{CategoryArg, Cli, ListArgs, RenameArgs};
use crate::ui::{badge, local_time, print, print_json, short_id, table, Badge, Column, UiContext};

pub async fn handle_list(cli: &Cli, args: &ListArgs) -> anyhow::Result<()> {
    let ctx = UiContext::from_env(args.json, cli.quiet);
    let app = open_app(cli).await?;
    let categories = app.library.categories().await?;

    if ctx.mode.is_json() {
        return print_json(&categories);
    }
    if categories.is_empty() {
        print(&ctx, "No categories yet. Add a bookmark with `vaultmark add <URL>`.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = categories
        .iter()
        .map(|c| {
            vec![
                short_id(&c.id),
                c.name.clone(),
                c.original_domain.clone().unwrap_or_default(),
                c.bookmark_count.to_string(),
                lock_label(c.state).to_string(),
                local_time(&c.created_at),
            ]
        })
        .collect();
    let columns = [
        Column::new("ID"),
        Column::new("Category"),
        Column::new("Domain"),
        Column::new("Bookmarks"),
        Column::new("Lock"),
        Column::new("Created"),
    ];
    println!("{}", table(&ctx, &columns, &rows));
    Ok(())
}

fn lock_label(state: LockState) -> &'static str {
    match state {
        LockState::Unprotected => "-",
        _ => "protected",
    }
}

pub async fn handle_rename(cli: &Cli, args: &RenameArgs) -> anyhow::Result<()> {
    let ctx = UiContext::from_env(false, cli.quiet);
    let app = open_app(cli).await?;
    let category = app.find_category(&args.category).await?;
    app.library.rename_category(category.id, &args.name).await?;
    print(
        &ctx,
        &badge(
            &ctx,
            Badge::Ok,
            &format!("Renamed \"{}\" to \"{}\"", category.name, args.name.trim()),
        ),
    );
    Ok(())
}

pub async fn handle_delete(cli: &Cli, args: &CategoryArg) -> anyhow::Result<()> {
    let ctx = UiContext::from_env(false, cli.quiet);
    let app = open_app(cli).await?;
    let category = app.find_category(&args.category).await?;
    let removed = app
        .library
        .delete_category(category.id, &app.prompts, &app.prompts)
        .await?;
    print(
        &ctx,
        &badge(
            &ctx,
            Badge::Ok,
            &format!("Deleted \"{}\" and {} bookmark(s)", category.name, removed),
        ),
    );
    Ok(())
}
