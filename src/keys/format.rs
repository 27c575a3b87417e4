//! Table cell and plan-usage formatting.

use std::num::NonZeroU64;

use super::record::ApiKeyRecord;

/// Format a count with thousands separators: `1234567` -> `"1,234,567"`.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Limit column text.
pub fn limit_label(limit: Option<NonZeroU64>) -> String {
    match limit {
        Some(n) => format!("{} requests", format_count(n.get())),
        None => "Unlimited".to_string(),
    }
}

/// Usage column text.
pub fn usage_label(usage: u64) -> String {
    format!("{} requests", format_count(usage))
}

/// Combined usage of all keys against the plan's request limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanUsage {
    pub plan_name: String,
    pub used: u64,
    pub limit: u64,
}

impl PlanUsage {
    pub fn from_records(plan_name: &str, limit: u64, records: &[ApiKeyRecord]) -> Self {
        let used = records
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.usage_count));
        Self {
            plan_name: plan_name.to_string(),
            used,
            limit,
        }
    }

    /// Percentage of the plan consumed, clamped to 0..=100.
    pub fn percent(&self) -> u8 {
        if self.limit == 0 {
            return 100;
        }
        let pct = self.used.saturating_mul(100) / self.limit;
        u8::try_from(pct.min(100)).unwrap_or(100)
    }

    /// `true` once combined usage reaches the plan limit.
    pub fn exhausted(&self) -> bool {
        self.used >= self.limit
    }

    /// e.g. `"300/1,000 Requests"`.
    pub fn label(&self) -> String {
        format!(
            "{}/{} Requests",
            format_count(self.used),
            format_count(self.limit)
        )
    }

    /// Text progress bar of `width` cells.
    pub fn bar(&self, width: usize) -> String {
        let filled = width * usize::from(self.percent()) / 100;
        format!(
            "{}{}",
            "\u{2588}".repeat(filled),
            "\u{2591}".repeat(width - filled)
        )
    }
}
