//! Record types exchanged with the record store.
//!
//! Field names on the wire follow the backend table columns
//! (`user_id`, `key`, `usage`, ...) while the Rust names say what the
//! field means.

use std::num::NonZeroU64;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{KeydashError, Result};

/// Limit pre-filled in the create form when the limit toggle is enabled.
pub const DEFAULT_MONTHLY_LIMIT: u64 = 1000;

/// One issued API key, as confirmed by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    /// Store-assigned identifier. Never generated locally.
    pub id: String,

    /// Owning user. Set at creation.
    #[serde(rename = "user_id")]
    pub owner_id: String,

    /// Display label.
    pub name: String,

    /// The key material itself.
    #[serde(rename = "key")]
    pub secret: String,

    /// Monthly request cap; `None` means unlimited.
    #[serde(default)]
    pub monthly_limit: Option<NonZeroU64>,

    /// Server-authoritative request counter.
    #[serde(rename = "usage", default)]
    pub usage_count: u64,

    pub created_at: DateTime<Utc>,
}

/// Insert payload sent to the record store.
///
/// There is no way to set `usage_count` from the outside: every new
/// record starts at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewApiKeyRecord {
    #[serde(rename = "user_id")]
    pub owner_id: String,
    pub name: String,
    #[serde(rename = "key")]
    pub secret: String,
    pub monthly_limit: Option<NonZeroU64>,
    #[serde(rename = "usage")]
    usage_count: u64,
}

impl NewApiKeyRecord {
    pub fn new(owner_id: &str, name: &str, secret: &str, monthly_limit: Option<NonZeroU64>) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            name: name.to_string(),
            secret: secret.to_string(),
            monthly_limit,
            usage_count: 0,
        }
    }

    pub fn usage_count(&self) -> u64 {
        self.usage_count
    }
}

/// Partial update for an existing record.
///
/// `monthly_limit` is doubly optional: `None` leaves the limit alone,
/// `Some(None)` clears it (unlimited), `Some(Some(n))` sets it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApiKeyPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "key", skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_limit: Option<Option<NonZeroU64>>,
}

impl ApiKeyPatch {
    /// Returns `true` if the patch would not change anything.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.secret.is_none() && self.monthly_limit.is_none()
    }

    /// Reject patches that would break a record invariant.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(KeydashError::Validation("nothing to update".into()));
        }
        if let Some(name) = &self.name {
            require_non_empty("name", name)?;
        }
        if let Some(secret) = &self.secret {
            require_non_empty("key", secret)?;
        }
        Ok(())
    }

    /// Apply the patch to a record, leaving identity and usage untouched.
    pub fn apply_to(&self, record: &ApiKeyRecord) -> ApiKeyRecord {
        let mut updated = record.clone();
        if let Some(name) = &self.name {
            updated.name = name.clone();
        }
        if let Some(secret) = &self.secret {
            updated.secret = secret.clone();
        }
        if let Some(limit) = self.monthly_limit {
            updated.monthly_limit = limit;
        }
        updated
    }
}

/// Raw values from the create/edit form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCandidate {
    pub name: String,
    pub secret: String,
    /// `None` when the "limit monthly usage" toggle is off.
    pub monthly_limit: Option<u64>,
}

impl KeyCandidate {
    pub fn new(name: impl Into<String>, secret: impl Into<String>, monthly_limit: Option<u64>) -> Self {
        Self {
            name: name.into(),
            secret: secret.into(),
            monthly_limit,
        }
    }

    /// Pre-fill the edit form from an existing record.
    pub fn from_record(record: &ApiKeyRecord) -> Self {
        Self {
            name: record.name.clone(),
            secret: record.secret.clone(),
            monthly_limit: record.monthly_limit.map(NonZeroU64::get),
        }
    }

    /// Validate the form and build the insert payload for `owner_id`.
    pub fn to_new_record(&self, owner_id: &str) -> Result<NewApiKeyRecord> {
        let limit = self.checked()?;
        Ok(NewApiKeyRecord::new(
            owner_id,
            self.name.trim(),
            self.secret.trim(),
            limit,
        ))
    }

    /// Validate the form and build a full-replacement patch.
    pub fn to_patch(&self) -> Result<ApiKeyPatch> {
        let limit = self.checked()?;
        Ok(ApiKeyPatch {
            name: Some(self.name.trim().to_string()),
            secret: Some(self.secret.trim().to_string()),
            monthly_limit: Some(limit),
        })
    }

    fn checked(&self) -> Result<Option<NonZeroU64>> {
        require_non_empty("name", &self.name)?;
        require_non_empty("key", &self.secret)?;
        self.monthly_limit.map(positive_limit).transpose()
    }
}

/// Convert a user-entered limit, rejecting zero.
pub fn positive_limit(value: u64) -> Result<NonZeroU64> {
    NonZeroU64::new(value)
        .ok_or_else(|| KeydashError::Validation("monthly limit must be at least 1".into()))
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(KeydashError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}
