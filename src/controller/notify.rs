//! Notifications raised by controller operations.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    LoadFailed,
    Created,
    CreateFailed,
    Updated,
    UpdateFailed,
    Deleted,
    DeleteFailed,
    Copied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

/// A toast-style message for the surrounding UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

impl Notification {
    fn info(kind: NotificationKind, title: &str, message: String) -> Self {
        Self {
            kind,
            severity: Severity::Info,
            title: title.to_string(),
            message,
        }
    }

    fn error(kind: NotificationKind, message: String) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            title: "Error".to_string(),
            message,
        }
    }

    pub fn load_failed(reason: &str) -> Self {
        Self::error(
            NotificationKind::LoadFailed,
            format!("Failed to load API keys: {reason}"),
        )
    }

    pub fn created(name: &str) -> Self {
        Self::info(
            NotificationKind::Created,
            "API Key Created",
            format!("API key \"{name}\" has been created successfully"),
        )
    }

    pub fn create_failed(reason: &str) -> Self {
        Self::error(
            NotificationKind::CreateFailed,
            format!("Failed to create API key: {reason}"),
        )
    }

    pub fn updated(name: &str) -> Self {
        Self::info(
            NotificationKind::Updated,
            "API Key Updated",
            format!("API key \"{name}\" has been updated successfully"),
        )
    }

    pub fn update_failed(reason: &str) -> Self {
        Self::error(
            NotificationKind::UpdateFailed,
            format!("Failed to update API key: {reason}"),
        )
    }

    pub fn deleted() -> Self {
        Self::info(
            NotificationKind::Deleted,
            "API Key Deleted",
            "API key has been deleted successfully".to_string(),
        )
    }

    pub fn delete_failed(reason: &str) -> Self {
        Self::error(
            NotificationKind::DeleteFailed,
            format!("Failed to delete API key: {reason}"),
        )
    }

    pub fn copied() -> Self {
        Self::info(
            NotificationKind::Copied,
            "Copied",
            "API key copied to clipboard".to_string(),
        )
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
