use vaultmark_core::{AddOutcome, DecryptedBookmark};

use crate::app::open_app;
use crate::cli::{AddArgs, Cli, DeleteArgs, SearchArgs, ShowArgs};
use crate::ui::{
    badge, kv, local_time, print, print_json, short_id, table, Badge, Column, UiContext,
};

pub async fn handle_add(cli: &Cli, args: &AddArgs) -> anyhow::Result<()> {
    let ctx = UiContext::from_env(false, cli.quiet);
    let app = open_app(cli).await?;
    let title = args.title.as_deref().unwrap_or(&args.url);

    match app.library.add_bookmark(&args.url, title, &app.prompts).await? {
        AddOutcome::Added {
            bookmark_id,
            category_id,
        } => {
            let category = app.find_category(&category_id.to_string()).await?;
            print(
                &ctx,
                &badge(&ctx, Badge::Ok, &format!("Bookmarked in \"{}\"", category.name)),
            );
            print(&ctx, &kv(&ctx, "ID", &short_id(&bookmark_id)));
        }
        AddOutcome::AlreadyBookmarked => {
            print(&ctx, &badge(&ctx, Badge::Warn, "Already bookmarked"));
        }
    }
    Ok(())
}

pub async fn handle_show(cli: &Cli, args: &ShowArgs) -> anyhow::Result<()> {
    let ctx = UiContext::from_env(args.json, cli.quiet);
    let app = open_app(cli).await?;
    let category = app.find_category(&args.category).await?;
    let records = app.unlock(&category).await?;

    if ctx.mode.is_json() {
        return print_json(&records);
    }
    if records.is_empty() {
        print(&ctx, &format!("\"{}\" has no bookmarks.", category.name));
        return Ok(());
    }
    println!("{}", bookmark_table(&ctx, &records));
    Ok(())
}

pub async fn handle_search(cli: &Cli, args: &SearchArgs) -> anyhow::Result<()> {
    let ctx = UiContext::from_env(args.json, cli.quiet);
    let app = open_app(cli).await?;
    for selector in &args.unlock {
        let category = app.find_category(selector).await?;
        app.unlock(&category).await?;
    }

    let hits = app.library.search(&args.query).await?;
    if ctx.mode.is_json() {
        return print_json(&hits);
    }
    if hits.is_empty() {
        print(&ctx, "No matches.");
    } else {
        println!("{}", bookmark_table(&ctx, &hits));
    }
    Ok(())
}

pub async fn handle_delete(cli: &Cli, args: &DeleteArgs) -> anyhow::Result<()> {
    let ctx = UiContext::from_env(false, cli.quiet);
    let app = open_app(cli).await?;
    let ids = app.resolve_bookmark_ids(&args.ids).await?;

    // Bookmarks in a protected category can only go once it is unlocked.
    let collections = app.library.repository().load().await?;
    for category in collections.categories.iter().filter(|c| {
        c.is_protected() && collections.bookmarks_in(c.id).any(|b| ids.contains(&b.id))
    }) {
        app.unlock(category).await?;
    }

    let removed = app.library.delete_bookmarks(&ids, &app.prompts).await?;
    print(
        &ctx,
        &badge(&ctx, Badge::Ok, &format!("Deleted {} bookmark(s)", removed)),
    );
    Ok(())
}

fn bookmark_table(ctx: &UiContext, records: &[DecryptedBookmark]) -> String {
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                short_id(&r.id),
                r.title.clone(),
                r.url.clone(),
                local_time(&r.created_at),
            ]
        })
        .collect();
    let columns = [
        Column::new("ID"),
        Column::new("Title"),
        Column::new("URL"),
        Column::new("Added"),
    ];
    table(ctx, &columns, &rows)
}
