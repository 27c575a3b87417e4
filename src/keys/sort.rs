//! Tri-state column sorting for the key table.
//!
//! Clicking a column cycles it through ascending, descending and
//! unsorted; clicking another column starts that one at ascending.
//! Values are compared through their plain string form, so numbers sort
//! lexicographically ("1000" < "900") and a missing limit sorts as "".

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::errors::KeydashError;

use super::record::ApiKeyRecord;

/// Columns the table can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortColumn {
    Name,
    Secret,
    MonthlyLimit,
    UsageCount,
}

impl SortColumn {
    /// All sortable columns, in table order.
    pub const ALL: [SortColumn; 4] = [
        SortColumn::Name,
        SortColumn::Secret,
        SortColumn::MonthlyLimit,
        SortColumn::UsageCount,
    ];

    /// Column header text.
    pub fn label(self) -> &'static str {
        match self {
            SortColumn::Name => "Name",
            SortColumn::Secret => "API Key",
            SortColumn::MonthlyLimit => "Limit",
            SortColumn::UsageCount => "Usage",
        }
    }

    /// The value this column compares by.
    pub fn sort_key(self, record: &ApiKeyRecord) -> String {
        match self {
            SortColumn::Name => record.name.clone(),
            SortColumn::Secret => record.secret.clone(),
            SortColumn::MonthlyLimit => record
                .monthly_limit
                .map(|n| n.to_string())
                .unwrap_or_default(),
            SortColumn::UsageCount => record.usage_count.to_string(),
        }
    }
}

impl fmt::Display for SortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SortColumn {
    type Err = KeydashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(SortColumn::Name),
            "key" | "secret" => Ok(SortColumn::Secret),
            "limit" | "monthly-limit" | "monthly_limit" => Ok(SortColumn::MonthlyLimit),
            "usage" | "usage-count" | "usage_count" => Ok(SortColumn::UsageCount),
            other => Err(KeydashError::Validation(format!(
                "unknown sort column '{other}' — expected name, key, limit or usage"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
    Unsorted,
}

impl FromStr for SortDirection {
    type Err = KeydashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            "none" | "unsorted" => Ok(SortDirection::Unsorted),
            other => Err(KeydashError::Validation(format!(
                "unknown sort direction '{other}' — expected asc, desc or none"
            ))),
        }
    }
}

/// Current sort column and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub column: Option<SortColumn>,
    pub direction: SortDirection,
}

impl Default for SortState {
    /// The table opens sorted by name, ascending.
    fn default() -> Self {
        Self::new(SortColumn::Name, SortDirection::Ascending)
    }
}

impl SortState {
    pub fn new(column: SortColumn, direction: SortDirection) -> Self {
        Self {
            column: Some(column),
            direction,
        }
    }

    pub fn unsorted() -> Self {
        Self {
            column: None,
            direction: SortDirection::Unsorted,
        }
    }

    /// The state after the user clicks `clicked`.
    pub fn advance(self, clicked: SortColumn) -> Self {
        let direction = if self.column == Some(clicked) {
            match self.direction {
                SortDirection::Ascending => SortDirection::Descending,
                SortDirection::Descending => SortDirection::Unsorted,
                SortDirection::Unsorted => SortDirection::Ascending,
            }
        } else {
            SortDirection::Ascending
        };

        Self::new(clicked, direction)
    }

    /// Returns `true` if the view is actually ordered by a column.
    pub fn is_active(&self) -> bool {
        self.column.is_some() && self.direction != SortDirection::Unsorted
    }

    /// Arrow shown next to a column header.
    pub fn indicator(&self, column: SortColumn) -> &'static str {
        if self.column != Some(column) {
            return "";
        }
        match self.direction {
            SortDirection::Ascending => " \u{2191}",
            SortDirection::Descending => " \u{2193}",
            SortDirection::Unsorted => "",
        }
    }

    /// Compare two records. Descending flips the comparator, so equal
    /// keys keep their input order in both directions.
    pub fn compare(&self, a: &ApiKeyRecord, b: &ApiKeyRecord) -> Ordering {
        let Some(column) = self.column else {
            return Ordering::Equal;
        };
        match self.direction {
            SortDirection::Ascending => column.sort_key(a).cmp(&column.sort_key(b)),
            SortDirection::Descending => column.sort_key(b).cmp(&column.sort_key(a)),
            SortDirection::Unsorted => Ordering::Equal,
        }
    }
}

/// Ordered, restartable view over a snapshot of the collection.
///
/// The ordering is computed on first iteration and reused after that.
/// With no active sort, records come out in collection order (as last
/// fetched, with newly created keys appended).
#[derive(Debug, Clone)]
pub struct SortedView {
    records: Vec<ApiKeyRecord>,
    sort: SortState,
    order: OnceLock<Vec<usize>>,
}

impl SortedView {
    pub fn new(records: Vec<ApiKeyRecord>, sort: SortState) -> Self {
        Self {
            records,
            sort,
            order: OnceLock::new(),
        }
    }

    pub fn sort_state(&self) -> SortState {
        self.sort
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate the records in sorted order. Can be called repeatedly.
    pub fn iter(&self) -> impl Iterator<Item = &ApiKeyRecord> + '_ {
        self.order().iter().map(move |&i| &self.records[i])
    }

    /// Collect the sorted records.
    pub fn to_vec(&self) -> Vec<ApiKeyRecord> {
        self.iter().cloned().collect()
    }

    fn order(&self) -> &[usize] {
        self.order.get_or_init(|| {
            let mut indices: Vec<usize> = (0..self.records.len()).collect();
            if self.sort.is_active() {
                // `sort_by` is stable.
                indices.sort_by(|&a, &b| self.sort.compare(&self.records[a], &self.records[b]));
            }
            indices
        })
    }
}
