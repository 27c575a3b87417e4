//! Interactive form prompts.
//!
//! dialoguer blocks the calling thread, so prompts step off the async
//! worker with `block_in_place` when running on a multi-threaded runtime.

use dialoguer::{Confirm, Input, Password, Select};
use tokio::runtime::{Handle, RuntimeFlavor};

use crate::controller::TableSnapshot;
use crate::errors::{KeydashError, Result};
use crate::keys::generate::generate_secret;
use crate::keys::record::DEFAULT_MONTHLY_LIMIT;
use crate::keys::{ApiKeyRecord, KeyCandidate};

/// Run a blocking dialoguer prompt.
pub fn blocking<T>(f: impl FnOnce() -> dialoguer::Result<T>) -> Result<T> {
    let result = match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    };
    result.map_err(|e| KeydashError::CommandFailed(format!("prompt: {e}")))
}

pub fn confirm(prompt: &str, default: bool) -> Result<bool> {
    blocking(|| {
        Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
    })
}

/// Pick one of `items`; `None` if the user pressed Esc.
pub fn select(prompt: &str, items: &[String], default: usize) -> Result<Option<usize>> {
    blocking(|| {
        Select::new()
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact_opt()
    })
}

/// Pick a key from the table in display order; returns its id.
pub fn pick_record(
    prompt: &str,
    snapshot: &TableSnapshot,
    mask: impl Fn(&ApiKeyRecord) -> String,
) -> Result<Option<String>> {
    let rows: Vec<&ApiKeyRecord> = snapshot.rows().collect();
    if rows.is_empty() {
        return Ok(None);
    }
    let items: Vec<String> = rows
        .iter()
        .map(|r| format!("{}  {}", r.name, mask(r)))
        .collect();
    Ok(select(prompt, &items, 0)?.map(|i| rows[i].id.clone()))
}

/// Prompt for the key value of a new key. Empty input generates one.
pub fn prompt_new_secret() -> Result<String> {
    let secret = blocking(|| {
        Password::new()
            .with_prompt("API key value (leave empty to generate)")
            .allow_empty_password(true)
            .interact()
    })?;
    if secret.trim().is_empty() {
        return Ok(generate_secret("pk", "live"));
    }
    Ok(secret)
}

/// The create/edit form. `current` pre-fills the fields when editing.
pub fn prompt_candidate(current: Option<&KeyCandidate>) -> Result<KeyCandidate> {
    let name: String = blocking(|| {
        let mut input = Input::<String>::new().with_prompt("Key name");
        if let Some(c) = current {
            input = input.with_initial_text(c.name.clone());
        }
        input.interact_text()
    })?;

    let secret = match current {
        Some(c) => blocking(|| {
            Input::<String>::new()
                .with_prompt("API key")
                .with_initial_text(c.secret.clone())
                .interact_text()
        })?,
        None => prompt_new_secret()?,
    };

    let had_limit = current.and_then(|c| c.monthly_limit);
    let monthly_limit = if confirm("Limit monthly usage?", had_limit.is_some())? {
        Some(prompt_limit(had_limit.unwrap_or(DEFAULT_MONTHLY_LIMIT))?)
    } else {
        None
    };

    Ok(KeyCandidate::new(name, secret, monthly_limit))
}

fn prompt_limit(default: u64) -> Result<u64> {
    blocking(|| {
        Input::<u64>::new()
            .with_prompt("Monthly request limit")
            .default(default)
            .validate_with(|n: &u64| -> std::result::Result<(), &str> {
                if *n >= 1 {
                    Ok(())
                } else {
                    Err("limit must be at least 1")
                }
            })
            .interact_text()
    })
}
