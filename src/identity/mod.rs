//! Identity provider — who is signed in.
//!
//! Authentication itself happens elsewhere; the controller only needs
//! the current user id and a way to hear about sign-in and sign-out.

use std::fmt::Debug;

use tokio::sync::watch;

/// Supplies the signed-in user and notifies on session changes.
pub trait IdentityProvider: Send + Sync + Debug {
    /// The current user id, if a session is established.
    fn current_user(&self) -> Option<String>;

    /// A receiver that observes every session change.
    fn subscribe(&self) -> watch::Receiver<Option<String>>;
}

/// In-process session holder.
///
/// The CLI signs in with the configured user id; tests use it to drive
/// sign-in/sign-out transitions.
#[derive(Debug)]
pub struct SessionIdentity {
    session: watch::Sender<Option<String>>,
}

impl SessionIdentity {
    pub fn signed_out() -> Self {
        let (session, _) = watch::channel(None);
        Self { session }
    }

    pub fn signed_in(user_id: impl Into<String>) -> Self {
        let (session, _) = watch::channel(Some(user_id.into()));
        Self { session }
    }

    /// Establish a session for `user_id`. Re-signing the same user
    /// does not notify subscribers.
    pub fn sign_in(&self, user_id: impl Into<String>) {
        let user_id = user_id.into();
        self.session.send_if_modified(|current| {
            if current.as_deref() == Some(user_id.as_str()) {
                return false;
            }
            *current = Some(user_id);
            true
        });
    }

    pub fn sign_out(&self) {
        self.session.send_if_modified(|current| current.take().is_some());
    }
}

impl Default for SessionIdentity {
    fn default() -> Self {
        Self::signed_out()
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_user(&self) -> Option<String> {
        self.session.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.session.subscribe()
    }
}
