//! `keydash delete` — remove an API key.

use crate::cli::output;
use crate::cli::prompt::confirm;
use crate::cli::{build_context, settle, Cli};
use crate::errors::Result;

/// Execute the `delete` command.
pub async fn execute(cli: &Cli, id: &str, force: bool) -> Result<()> {
    let ctx = build_context(cli)?;
    let controller = &ctx.controller;
    let mut notices = controller.notifications();

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        settle(controller.load().await, &mut notices)?;
        let label = controller
            .records()
            .into_iter()
            .find(|r| r.id == id)
            .map(|r| format!("'{}'", r.name))
            .unwrap_or_else(|| format!("'{id}'"));

        if !confirm(&format!("Delete API key {label}? This cannot be undone"), false)? {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    settle(controller.delete(id).await, &mut notices)?;
    Ok(())
}
