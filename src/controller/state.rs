//! Snapshot and result types handed out by the controller.

use std::collections::HashMap;

use crate::keys::{ApiKeyRecord, SortState, SortedView};

use super::markers::MarkerKind;

/// Which form (if any) the table currently has open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Dialog {
    #[default]
    Closed,
    Create,
    Edit {
        id: String,
    },
    View {
        id: String,
    },
}

impl Dialog {
    /// The record id this dialog is about, if any.
    pub fn record_id(&self) -> Option<&str> {
        match self {
            Dialog::Edit { id } | Dialog::View { id } => Some(id),
            Dialog::Closed | Dialog::Create => None,
        }
    }
}

/// Result of a controller operation that reached (or skipped) the store.
///
/// Store failures are not errors here: by the time a caller sees
/// `Failed`, the notification has already been sent and the error
/// message recorded on the table.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The store confirmed the operation.
    Done(T),
    /// The store reported a failure; carries the message shown to the user.
    Failed(String),
    /// Nothing was attempted (no signed-in user).
    Skipped,
}

impl<T> Outcome<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(value) => Some(value),
            Outcome::Failed(_) | Outcome::Skipped => None,
        }
    }
}

/// Everything a renderer needs, taken at one point in time.
#[derive(Debug, Clone)]
pub struct TableSnapshot {
    pub revision: u64,
    pub user_id: Option<String>,
    pub view: SortedView,
    pub loading: bool,
    pub error: Option<String>,
    pub dialog: Dialog,
    pub markers: HashMap<String, MarkerKind>,
}

impl TableSnapshot {
    pub fn sort(&self) -> SortState {
        self.view.sort_state()
    }

    pub fn marker(&self, id: &str) -> Option<MarkerKind> {
        self.markers.get(id).copied()
    }

    /// Records in display order.
    pub fn rows(&self) -> impl Iterator<Item = &ApiKeyRecord> + '_ {
        self.view.iter()
    }
}
