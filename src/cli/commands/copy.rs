//! `keydash copy` — put an API key on the clipboard.

use crate::cli::{build_context, settle, Cli};
use crate::controller::Outcome;
use crate::errors::Result;

/// Execute the `copy` command.
pub async fn execute(cli: &Cli, id: &str) -> Result<()> {
    let ctx = build_context(cli)?;
    let controller = &ctx.controller;
    let mut notices = controller.notifications();

    settle(controller.load().await, &mut notices)?;
    controller.copy(id).await?;
    settle(Outcome::Done(()), &mut notices)?;

    Ok(())
}
