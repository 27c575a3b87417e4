//! `keydash create` — issue a new API key.

use std::io::{self, IsTerminal, Read};

use dialoguer::Input;

use crate::cli::output;
use crate::cli::prompt::{blocking, prompt_candidate, prompt_new_secret};
use crate::cli::{build_context, settle, Cli};
use crate::errors::Result;
use crate::keys::generate::generate_secret;
use crate::keys::KeyCandidate;

/// Execute the `create` command.
///
/// With no flags at all this runs the full interactive form.
pub async fn execute(
    cli: &Cli,
    name: Option<&str>,
    secret: Option<&str>,
    generate: bool,
    limit: Option<u64>,
) -> Result<()> {
    let ctx = build_context(cli)?;
    let controller = &ctx.controller;
    let mut notices = controller.notifications();

    let interactive = name.is_none() && secret.is_none() && !generate && limit.is_none();

    controller.open_create_dialog();
    let candidate = if interactive && io::stdin().is_terminal() {
        prompt_candidate(None)?
    } else {
        let secret = read_secret(secret, generate)?;
        let name = match name {
            Some(n) => n.to_string(),
            None => blocking(|| Input::<String>::new().with_prompt("Key name").interact_text())?,
        };
        KeyCandidate::new(name, secret, limit)
    };

    let Some(record) = settle(controller.create(&candidate).await?, &mut notices)? else {
        return Ok(());
    };

    output::print_secret(&record);
    output::tip(&format!("id: {}", record.id));
    Ok(())
}

/// The key value from one of four sources.
fn read_secret(inline: Option<&str>, generate: bool) -> Result<String> {
    if generate {
        return Ok(generate_secret("pk", "live"));
    }
    if let Some(v) = inline {
        output::warning("Key provided on command line — it may appear in shell history.");
        return Ok(v.to_string());
    }
    if !io::stdin().is_terminal() {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(buf.trim_end().to_string());
    }
    prompt_new_secret()
}
