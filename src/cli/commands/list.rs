//! `keydash list` — display the signed-in user's API keys in a table.

use crate::cli::output;
use crate::cli::{apply_sort, build_context, settle, Cli};
use crate::errors::Result;
use crate::keys::SortColumn;

/// Execute the `list` command.
pub async fn execute(cli: &Cli, sort: Option<SortColumn>, descending: bool) -> Result<()> {
    let ctx = build_context(cli)?;
    let controller = &ctx.controller;
    let mut notices = controller.notifications();

    let count = settle(controller.load().await, &mut notices)?.unwrap_or(0);

    if let Some(column) = sort {
        apply_sort(controller, column, descending);
    }

    let plan = controller.plan_usage(&ctx.settings.plan_name, ctx.settings.plan_request_limit);
    output::print_plan_card(&plan);

    output::info(&format!(
        "{} — {} API key(s)",
        controller.user_id().unwrap_or_default(),
        count
    ));
    output::print_key_table(&controller.snapshot(), |r| controller.display_secret(r));

    Ok(())
}
