// 🧳 Trip Entity - a named report that groups receipts over a date range
//
// The trip name doubles as the name of its directory on disk, where receipt
// images live.

use crate::format::{format_date, CurrencyCode, FormatContext, Price};
use anyhow::Result;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trip {
    pub id: i64,
    pub name: String,

    /// Backing directory, `<files_dir>/<name>`
    pub directory: PathBuf,

    /// Start/end as UTC milliseconds plus the timezone the user picked
    pub start_date: i64,
    pub start_timezone: String,
    pub end_date: i64,
    pub end_timezone: String,

    /// Sum of receipt prices, computed at read time
    pub price: Price,
    pub currency: CurrencyCode,

    pub comment: String,
    pub cost_center: String,
    pub uuid: Uuid,
}

impl Trip {
    pub fn directory_name(&self) -> &str {
        self.directory
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.name)
    }

    pub fn formatted_start_date(&self, ctx: &FormatContext) -> Result<String> {
        format_date(self.start_date, &self.start_timezone, ctx)
    }

    pub fn formatted_end_date(&self, ctx: &FormatContext) -> Result<String> {
        format_date(self.end_date, &self.end_timezone, ctx)
    }
}

/// Directory a trip named `name` lives in
pub fn trip_directory(files_dir: &Path, name: &str) -> PathBuf {
    files_dir.join(name)
}
