//! `keydash dashboard` — interactive key management.
//!
//! Renders the plan card and key table, then loops over an action menu
//! until the user quits. Store failures show up as error toasts and the
//! loop carries on.

use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::cli::output;
use crate::cli::prompt::{confirm, pick_record, prompt_candidate, select};
use crate::cli::{build_context, AppContext, Cli};
use crate::controller::{Dialog, KeyTableController, Notification, Outcome};
use crate::errors::{KeydashError, Result};
use crate::keys::{ApiKeyRecord, KeyCandidate, SortColumn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Create,
    Edit,
    View,
    Copy,
    Delete,
    Sort,
    Refresh,
    Quit,
}

impl Action {
    const ALL: [Action; 8] = [
        Action::Create,
        Action::Edit,
        Action::View,
        Action::Copy,
        Action::Delete,
        Action::Sort,
        Action::Refresh,
        Action::Quit,
    ];

    fn label(self) -> &'static str {
        match self {
            Action::Create => "Create new key",
            Action::Edit => "Edit a key",
            Action::View => "View a key",
            Action::Copy => "Copy a key",
            Action::Delete => "Delete a key",
            Action::Sort => "Sort by column",
            Action::Refresh => "Refresh",
            Action::Quit => "Quit",
        }
    }
}

/// Execute the `dashboard` command.
pub async fn execute(cli: &Cli) -> Result<()> {
    let ctx = build_context(cli)?;
    let mut notices = ctx.controller.notifications();
    let session = ctx.controller.watch_session();

    let _ = ctx.controller.load().await;

    let result = run(&ctx, &mut notices).await;
    session.abort();
    result
}

async fn run(ctx: &AppContext, notices: &mut broadcast::Receiver<Notification>) -> Result<()> {
    let controller = &ctx.controller;
    let labels: Vec<String> = Action::ALL.iter().map(|a| a.label().to_string()).collect();

    loop {
        render(ctx);
        drain(notices);

        let Some(choice) = select("What would you like to do?", &labels, 0)? else {
            return Ok(());
        };
        let action = Action::ALL[choice];
        if action == Action::Quit {
            return Ok(());
        }

        if let Err(e) = perform(controller, action).await {
            match e {
                KeydashError::UserCancelled => output::info("Cancelled."),
                other => output::error(&other.to_string()),
            }
        }
    }
}

async fn perform(controller: &KeyTableController, action: Action) -> Result<()> {
    let mask = |r: &ApiKeyRecord| controller.display_secret(r);

    match action {
        Action::Create => create(controller).await,
        Action::Edit => {
            let id = pick(controller, "Edit which key?", mask)?;
            let current = controller.open_edit_dialog(&id)?;
            let candidate = prompt_candidate(Some(&current))?;
            submit_edit(controller, &id, candidate, ask_retry).await
        }
        Action::View => {
            let id = pick(controller, "View which key?", mask)?;
            let record = controller.open_view_dialog(&id)?;
            output::print_secret(&record);
            if confirm("Copy to clipboard?", true)? {
                controller.copy_and_close(&id).await?;
            } else {
                controller.close_dialog();
            }
            Ok(())
        }
        Action::Copy => {
            let id = pick(controller, "Copy which key?", mask)?;
            controller.copy(&id).await
        }
        Action::Delete => {
            let id = pick(controller, "Delete which key?", mask)?;
            if confirm("Delete this key? This cannot be undone", false)? {
                let _ = controller.delete(&id).await;
            }
            Ok(())
        }
        Action::Sort => {
            let sort = controller.sort_state();
            let columns: Vec<String> = SortColumn::ALL
                .iter()
                .map(|&c| format!("{}{}", c.label(), sort.indicator(c)))
                .collect();
            if let Some(i) = select("Sort by", &columns, 0)? {
                controller.set_sort(SortColumn::ALL[i]);
            }
            Ok(())
        }
        Action::Refresh => {
            let _ = controller.load().await;
            Ok(())
        }
        Action::Quit => Ok(()),
    }
}

/// Run the create form until it succeeds or the user gives up.
/// A failed insert leaves the dialog open with the entered values.
async fn create(controller: &KeyTableController) -> Result<()> {
    controller.open_create_dialog();
    let mut candidate = prompt_candidate(None)?;

    while controller.dialog() == Dialog::Create {
        match controller.create(&candidate).await? {
            Outcome::Done(record) => output::print_secret(&record),
            Outcome::Failed(message) => match ask_retry(&candidate, &message)? {
                Some(next) => candidate = next,
                None => controller.close_dialog(),
            },
            Outcome::Skipped => controller.close_dialog(),
        }
    }
    Ok(())
}

/// Send the edit form for `id` until the store accepts it or `retry`
/// gives up. A failed update leaves the edit dialog open for the next
/// attempt; `retry` returns the corrected form or `None` to close it.
async fn submit_edit(
    controller: &KeyTableController,
    id: &str,
    mut candidate: KeyCandidate,
    mut retry: impl FnMut(&KeyCandidate, &str) -> Result<Option<KeyCandidate>>,
) -> Result<()> {
    let editing = Dialog::Edit { id: id.to_string() };

    while controller.dialog() == editing {
        let patch = match candidate.to_patch() {
            Ok(patch) => patch,
            Err(e) => {
                controller.close_dialog();
                return Err(e);
            }
        };
        match controller.update(id, patch).await? {
            Outcome::Done(_) => {}
            Outcome::Failed(message) => match retry(&candidate, &message)? {
                Some(next) => candidate = next,
                None => controller.close_dialog(),
            },
            Outcome::Skipped => controller.close_dialog(),
        }
    }
    Ok(())
}

/// Offer to reopen the form after a failed save.
fn ask_retry(candidate: &KeyCandidate, message: &str) -> Result<Option<KeyCandidate>> {
    if confirm(&format!("{message}. Try again?"), true)? {
        Ok(Some(prompt_candidate(Some(candidate))?))
    } else {
        Ok(None)
    }
}

fn pick(
    controller: &KeyTableController,
    prompt: &str,
    mask: impl Fn(&ApiKeyRecord) -> String,
) -> Result<String> {
    pick_record(prompt, &controller.snapshot(), mask)?.ok_or(KeydashError::UserCancelled)
}

fn render(ctx: &AppContext) {
    let controller = &ctx.controller;
    let snapshot = controller.snapshot();

    println!();
    output::print_plan_card(
        &controller.plan_usage(&ctx.settings.plan_name, ctx.settings.plan_request_limit),
    );
    if let Some(user_id) = &snapshot.user_id {
        output::info(&format!("API keys for {user_id}"));
    }
    output::print_key_table(&snapshot, |r| controller.display_secret(r));
    if let Some(error) = &snapshot.error {
        output::warning(&format!("Last operation failed: {error}"));
    }
}

/// Print every notification raised since the last redraw.
fn drain(notices: &mut broadcast::Receiver<Notification>) {
    loop {
        match notices.try_recv() {
            Ok(n) => output::notification(&n),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::controller::ControllerOptions;
    use crate::identity::SessionIdentity;
    use crate::store::MemoryStore;

    fn seeded() -> (MemoryStore, KeyTableController) {
        let store = MemoryStore::with_records(vec![ApiKeyRecord {
            id: "k1".into(),
            owner_id: "u1".into(),
            name: "Production".into(),
            secret: "pk_live_abc123".into(),
            monthly_limit: None,
            usage_count: 0,
            created_at: Utc::now(),
        }]);
        let controller = KeyTableController::new(
            Arc::new(store.clone()),
            Arc::new(SessionIdentity::signed_in("u1")),
            Arc::new(MemoryClipboard::new()),
            ControllerOptions::default(),
        );
        (store, controller)
    }

    #[tokio::test]
    async fn failed_edit_keeps_dialog_open_for_retry() {
        let (store, controller) = seeded();
        let _ = controller.load().await;
        let current = controller.open_edit_dialog("k1").unwrap();

        store.set_should_fail(true);
        let mut attempts = 0;
        let renamed = KeyCandidate::new("Renamed", current.secret.clone(), None);

        submit_edit(&controller, "k1", renamed.clone(), |_, message| {
            attempts += 1;
            assert!(message.contains("memory store configured to fail"));
            assert_eq!(controller.dialog(), Dialog::Edit { id: "k1".into() });
            store.set_should_fail(false);
            Ok(Some(renamed.clone()))
        })
        .await
        .unwrap();

        assert_eq!(attempts, 1);
        assert_eq!(controller.dialog(), Dialog::Closed);
        assert_eq!(controller.records()[0].name, "Renamed");
    }

    #[tokio::test]
    async fn giving_up_after_failed_edit_closes_dialog() {
        let (store, controller) = seeded();
        let _ = controller.load().await;
        let current = controller.open_edit_dialog("k1").unwrap();

        store.set_should_fail(true);
        let candidate = KeyCandidate::new("Renamed", current.secret, None);
        submit_edit(&controller, "k1", candidate, |_, _| Ok(None))
            .await
            .unwrap();

        assert_eq!(controller.dialog(), Dialog::Closed);
        assert_eq!(controller.records()[0].name, "Production");
        assert!(controller.error().is_some());
    }
}
