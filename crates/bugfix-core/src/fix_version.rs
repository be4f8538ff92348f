use crate::error::{BugfixError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// A tracker release window, e.g. `{"id": "10412", "name": "2024 Oct"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixVersion {
    pub id: String,
    pub name: String,
}

/// Year and English month abbreviation of the release window containing `today`.
pub fn release_window(today: NaiveDate) -> (i32, String) {
    (today.year(), today.format("%b").to_string())
}

/// Pick the version whose name mentions both the current year and month.
/// When several match, the last one listed wins.
pub fn resolve(versions: &[FixVersion], today: NaiveDate) -> Result<FixVersion> {
    let (year, month) = release_window(today);
    let year_text = year.to_string();
    versions
        .iter()
        .rev()
        .find(|v| v.name.contains(&year_text) && v.name.contains(&month))
        .cloned()
        .ok_or(BugfixError::UnresolvedFixVersion { year, month })
}
