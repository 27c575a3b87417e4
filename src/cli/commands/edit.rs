//! `keydash edit` — change an API key's name, value or monthly limit.
//!
//! With no flags the edit form opens pre-filled with the current values
//! and the whole record is sent back. With flags only the given fields
//! are sent.

use crate::cli::output;
use crate::cli::prompt::prompt_candidate;
use crate::cli::{build_context, settle, Cli};
use crate::errors::{KeydashError, Result};
use crate::keys::record::positive_limit;
use crate::keys::ApiKeyPatch;

/// Field changes requested on the command line.
#[derive(Debug, Default)]
pub struct EditFlags<'a> {
    pub name: Option<&'a str>,
    pub secret: Option<&'a str>,
    pub limit: Option<u64>,
    pub unlimited: bool,
}

impl EditFlags<'_> {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.secret.is_none() && self.limit.is_none() && !self.unlimited
    }

    /// Build a partial patch from the flags.
    pub fn to_patch(&self) -> Result<ApiKeyPatch> {
        let monthly_limit = match (self.limit, self.unlimited) {
            (Some(_), true) => {
                return Err(KeydashError::Validation(
                    "--limit and --unlimited cannot be combined".into(),
                ))
            }
            (Some(n), false) => Some(Some(positive_limit(n)?)),
            (None, true) => Some(None),
            (None, false) => None,
        };

        Ok(ApiKeyPatch {
            name: self.name.map(|n| n.trim().to_string()),
            secret: self.secret.map(|s| s.trim().to_string()),
            monthly_limit,
        })
    }
}

/// Execute the `edit` command.
pub async fn execute(cli: &Cli, id: &str, flags: EditFlags<'_>) -> Result<()> {
    let ctx = build_context(cli)?;
    let controller = &ctx.controller;
    let mut notices = controller.notifications();

    settle(controller.load().await, &mut notices)?;
    let current = controller.open_edit_dialog(id)?;

    let patch = if flags.is_empty() {
        prompt_candidate(Some(&current))?.to_patch()?
    } else {
        if flags.secret.is_some() {
            output::warning("Key provided on command line — it may appear in shell history.");
        }
        flags.to_patch()?
    };

    settle(controller.update(id, patch).await?, &mut notices)?;
    Ok(())
}
