// 💱 Display formatting - prices and dates as the user sees them
//
// Verification compares these rendered strings ("$45.00", "11/17/16"),
// so the exact output per locale matters.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

// ============================================================================
// LOCALE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    /// en-US: M/d/yy, "$1,234.50"
    #[default]
    EnUs,
    /// en-GB: dd/MM/yy
    EnGb,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::EnUs => "en-US",
            Locale::EnGb => "en-GB",
        }
    }
}

impl FromStr for Locale {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.replace('_', "-").to_ascii_lowercase().as_str() {
            "en-us" => Ok(Locale::EnUs),
            "en-gb" => Ok(Locale::EnGb),
            other => Err(anyhow!("Unsupported locale: {}", other)),
        }
    }
}

/// Everything a formatted date needs besides the timestamp itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatContext {
    pub locale: Locale,
    pub date_separator: String,
}

impl FormatContext {
    pub fn new(locale: Locale, date_separator: &str) -> Self {
        FormatContext {
            locale,
            date_separator: date_separator.to_string(),
        }
    }
}

impl Default for FormatContext {
    fn default() -> Self {
        FormatContext::new(Locale::EnUs, "/")
    }
}

// ============================================================================
// DATES
// ============================================================================

/// Zone a stored timezone name refers to. Blank or unknown names fall back to UTC.
pub fn resolve_timezone(name: &str) -> Tz {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Tz::UTC;
    }
    match trimmed.parse::<Tz>() {
        Ok(tz) => tz,
        Err(e) => {
            warn!(timezone = trimmed, error = %e, "Unknown timezone, rendering in UTC");
            Tz::UTC
        }
    }
}

/// Render a millisecond timestamp as a short locale date, on the calendar
/// of `timezone` (an IANA name such as "America/New_York").
pub fn format_date(millis: i64, timezone: &str, ctx: &FormatContext) -> Result<String> {
    let instant: DateTime<Utc> = DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| anyhow!("Timestamp out of range: {}", millis))?;
    let date = instant.with_timezone(&resolve_timezone(timezone));
    let sep = &ctx.date_separator;
    let year = date.year().rem_euclid(100);

    let formatted = match ctx.locale {
        Locale::EnUs => format!("{}{sep}{}{sep}{:02}", date.month(), date.day(), year),
        Locale::EnGb => format!("{:02}{sep}{:02}{sep}{:02}", date.day(), date.month(), year),
    };
    Ok(formatted)
}

// ============================================================================
// CURRENCY + PRICE
// ============================================================================

/// ISO 4217 code, always upper case
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: &str) -> Self {
        CurrencyCode(code.trim().to_ascii_uppercase())
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    pub fn symbol(&self) -> Option<&'static str> {
        match self.0.as_str() {
            "USD" => Some("$"),
            "EUR" => Some("€"),
            "GBP" => Some("£"),
            "INR" => Some("₹"),
            _ => None,
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Price {
    pub amount: Decimal,
    pub currency: CurrencyCode,
}

impl Price {
    pub fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Price { amount, currency }
    }

    pub fn zero(currency: CurrencyCode) -> Self {
        Price::new(Decimal::ZERO, currency)
    }

    /// Parse the text form stored in receipt rows ("5.00", "5", "")
    pub fn parse(text: &str, currency: CurrencyCode) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Price::zero(currency));
        }
        let amount = Decimal::from_str(trimmed)
            .map_err(|e| anyhow!("Invalid price '{}': {}", trimmed, e))?;
        Ok(Price::new(amount, currency))
    }

    pub fn currency_code(&self) -> &str {
        self.currency.code()
    }

    /// Sum prices that share `currency`. Prices in any other currency are an error.
    pub fn sum<'a, I>(prices: I, currency: CurrencyCode) -> Result<Price>
    where
        I: IntoIterator<Item = &'a Price>,
    {
        let mut total = Decimal::ZERO;
        for price in prices {
            if price.currency != currency {
                return Err(anyhow!(
                    "Cannot add {} to a {} total",
                    price.currency,
                    currency
                ));
            }
            total += price.amount;
        }
        Ok(Price::new(total, currency))
    }

    /// "$45.00", "-$5.00", "$1,234.50", "CHF 3.10"
    pub fn currency_formatted_price(&self) -> String {
        let rounded = self.amount.round_dp(2);
        let magnitude = format!("{:.2}", rounded.abs());
        let (whole, fraction) = magnitude.split_once('.').unwrap_or((magnitude.as_str(), "00"));
        let grouped = group_thousands(whole);
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };

        match self.currency.symbol() {
            Some(symbol) => format!("{sign}{symbol}{grouped}.{fraction}"),
            None => format!("{sign}{} {grouped}.{fraction}", self.currency),
        }
    }

    /// Plain decimal form used by exports ("5.00")
    pub fn decimal_formatted_price(&self) -> String {
        format!("{:.2}", self.amount.round_dp(2))
    }
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
