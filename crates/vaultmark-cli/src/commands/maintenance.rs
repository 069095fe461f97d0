use crate::app::open_app;
use crate::cli::{CheckArgs, Cli};
use crate::errors::CliError;
use crate::ui::{badge, kv, print, print_json, Badge, UiContext};

/// Report inconsistencies between categories, bookmarks, and the domain map.
pub async fn handle_check(cli: &Cli, args: &CheckArgs) -> anyhow::Result<()> {
    let ctx = UiContext::from_env(args.json, cli.quiet);
    let app = open_app(cli).await?;
    let report = app.library.check_integrity().await?;

    if ctx.mode.is_json() {
        print_json(&report)?;
    } else {
        print(&ctx, &kv(&ctx, "Store", &app.store_path.display().to_string()));
        print(&ctx, &kv(&ctx, "Categories", &report.categories.to_string()));
        print(&ctx, &kv(&ctx, "Bookmarks", &report.bookmarks.to_string()));
        for issue in &report.issues {
            println!("{}", badge(&ctx, Badge::Warn, &issue.to_string()));
        }
        if report.is_clean() {
            print(&ctx, &badge(&ctx, Badge::Ok, "No issues found"));
        }
    }

    if !report.is_clean() {
        return Err(CliError::integrity(
            format!("Integrity check found {} issue(s)", report.issues.len()),
            "Back up the store before editing it by hand.",
        )
        .into());
    }
    Ok(())
}
