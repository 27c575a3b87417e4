//! Keys module — the API-key records shown in the dashboard table.
//!
//! This module provides:
//! - Record, insert-payload, patch and form types (`record`)
//! - One-way display masking of key material (`mask`)
//! - Tri-state column sorting and the sorted view (`sort`)
//! - Table cell and plan-usage formatting (`format`)
//! - Random key material for the create form (`generate`)

pub mod format;
pub mod generate;
pub mod mask;
pub mod record;
pub mod sort;

// Re-export the most commonly used items.
pub use format::{format_count, limit_label, usage_label, PlanUsage};
pub use mask::{display_secret, mask_secret};
pub use record::{ApiKeyPatch, ApiKeyRecord, KeyCandidate, NewApiKeyRecord};
pub use sort::{SortColumn, SortDirection, SortState, SortedView};
