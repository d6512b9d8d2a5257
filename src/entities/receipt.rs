// 🧾 Receipt Entity - a single expense inside a trip

use crate::entities::{Category, PaymentMethod, Trip};
use crate::format::{format_date, FormatContext, Price};
use anyhow::{bail, Result};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub id: i64,

    /// Owning trip, fully loaded
    pub trip: Trip,

    pub name: String,

    /// Attached image or pdf, relative to the trip directory
    pub file_name: Option<String>,

    pub price: Price,
    pub tax: Price,
    pub date: i64,
    pub timezone: String,
    pub category: Option<Category>,
    pub comment: String,
    pub payment_method: Option<PaymentMethod>,
    pub reimbursable: bool,
    pub full_page: bool,

    /// 1-based position in the trip's receipt list (not stored)
    pub index: usize,

    /// Manual ordering key, strictly increasing in list order
    pub custom_order_id: i64,
    pub uuid: Uuid,
}

impl Receipt {
    pub fn formatted_date(&self, ctx: &FormatContext) -> Result<String> {
        format_date(self.date, &self.timezone, ctx)
    }

    pub fn category_name(&self) -> &str {
        self.category.as_ref().map(|c| c.name.as_str()).unwrap_or("")
    }

    pub fn category_code(&self) -> &str {
        self.category.as_ref().map(|c| c.code.as_str()).unwrap_or("")
    }

    pub fn has_image(&self) -> bool {
        self.file_name
            .as_deref()
            .and_then(|f| f.rsplit_once('.'))
            .map(|(_, ext)| matches!(ext.to_ascii_lowercase().as_str(), "jpg" | "jpeg" | "png"))
            .unwrap_or(false)
    }

    pub fn has_pdf(&self) -> bool {
        self.file_name
            .as_deref()
            .map(|f| f.to_ascii_lowercase().ends_with(".pdf"))
            .unwrap_or(false)
    }
}

/// Receipts one trip can hold on a single day
pub const MAX_RECEIPTS_PER_DAY: i64 = 1000;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// First ordering key of the day `date_millis` falls on
pub fn day_bucket(date_millis: i64) -> i64 {
    date_millis.div_euclid(MILLIS_PER_DAY) * MAX_RECEIPTS_PER_DAY
}

/// Ordering key for the `rank`-th receipt (0-based) on a given day.
///
/// Receipts added later on the same day sort after earlier ones, and any
/// receipt on a later day sorts after all receipts of earlier days. A rank
/// outside `0..MAX_RECEIPTS_PER_DAY` would collide with a neighbouring day.
pub fn custom_order_id_for(date_millis: i64, rank: i64) -> Result<i64> {
    if !(0..MAX_RECEIPTS_PER_DAY).contains(&rank) {
        bail!(
            "Receipt rank {} on day {} is outside 0..{}",
            rank,
            date_millis.div_euclid(MILLIS_PER_DAY),
            MAX_RECEIPTS_PER_DAY
        );
    }
    Ok(day_bucket(date_millis) + rank)
}
