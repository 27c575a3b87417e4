//! `keydash view` — show the full value of an API key.

use crate::cli::output;
use crate::cli::{build_context, settle, Cli};
use crate::controller::Outcome;
use crate::errors::Result;

/// Execute the `view` command.
pub async fn execute(cli: &Cli, id: &str, copy: bool) -> Result<()> {
    let ctx = build_context(cli)?;
    let controller = &ctx.controller;
    let mut notices = controller.notifications();

    settle(controller.load().await, &mut notices)?;

    let record = controller.open_view_dialog(id)?;
    output::print_secret(&record);

    if copy {
        controller.copy_and_close(id).await?;
        settle(Outcome::Done(()), &mut notices)?;
    } else {
        controller.close_dialog();
        output::tip(&format!("Run `keydash copy {id}` to copy it to the clipboard."));
    }

    Ok(())
}
