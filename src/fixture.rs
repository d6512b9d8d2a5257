// 🧪 Legacy Fixture - builds the canonical v15 database
//
// Three reports over 2016-11-17..2016-11-20, mostly copies of the same
// "Picture" receipt, with every list table in its stock state.

use crate::entities::category::DEFAULT_CATEGORIES;
use crate::entities::payment_method::DEFAULT_PAYMENT_METHODS;
use crate::schema::{DEFAULT_CSV_COLUMNS, DEFAULT_PDF_COLUMNS, LEGACY_V15_SCHEMA};
use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::info;

const FIXTURE_TIMEZONE: &str = "America/New_York";
const FIXTURE_CURRENCY: &str = "USD";
const FIXTURE_CATEGORY: &str = "Dinner";

/// (name, price, full page, extension)
type ReceiptTemplate = (&'static str, &'static str, bool, &'static str);

const PICTURE: ReceiptTemplate = ("Picture", "5.00", false, "jpg");
const FULL_PICTURE: ReceiptTemplate = ("Full picture", "5.00", true, "jpg");
const PDF_SAMPLE: ReceiptTemplate = ("Pdf sample", "2.00", false, "pdf");

/// Receipts per report as runs of (template, day of November, count)
const FIXTURE_REPORTS: &[(&str, &[(ReceiptTemplate, u32, usize)])] = &[
    ("Report 1", &[(PICTURE, 17, 9)]),
    (
        "Report 2",
        &[(PICTURE, 17, 5), (FULL_PICTURE, 18, 3), (PICTURE, 19, 2)],
    ),
    (
        "Report 3",
        &[
            (PICTURE, 17, 1),
            (FULL_PICTURE, 18, 1),
            (PDF_SAMPLE, 19, 1),
            (PICTURE, 20, 6),
        ],
    ),
];

fn november_2016(day: u32, minute: u32) -> Result<i64> {
    Utc.with_ymd_and_hms(2016, 11, day, 12, minute, 0)
        .single()
        .map(|dt| dt.timestamp_millis())
        .with_context(|| format!("Invalid fixture date 2016-11-{day}"))
}

/// Write the v15 fixture database to `path`. The file must not exist yet.
pub fn write_legacy_v15_fixture(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("Refusing to overwrite existing file {}", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("Failed to create fixture {}", path.display()))?;
    populate_legacy_v15(&conn)?;

    info!(path = %path.display(), "Wrote v15 fixture database");
    Ok(())
}

/// Fill an empty connection with the v15 schema and fixture rows
pub fn populate_legacy_v15(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(LEGACY_V15_SCHEMA)
        .context("Failed to create v15 schema")?;

    for (name, code) in DEFAULT_CATEGORIES {
        tx.execute(
            "INSERT INTO categories (name, code, breakdown) VALUES (?1, ?2, 1)",
            params![name, code],
        )?;
    }

    for method in DEFAULT_PAYMENT_METHODS {
        tx.execute("INSERT INTO paymentmethods (type) VALUES (?1)", [method])?;
    }

    for (table, columns) in [("csvcolumns", DEFAULT_CSV_COLUMNS), ("pdfcolumns", DEFAULT_PDF_COLUMNS)] {
        for column in columns {
            tx.execute(
                &format!("INSERT INTO {table} (type) VALUES (?1)"),
                [column.display_name()],
            )?;
        }
    }

    let start = november_2016(17, 0)?;
    let end = november_2016(20, 59)?;
    for (report, runs) in FIXTURE_REPORTS {
        tx.execute(
            "INSERT INTO trips (name, from_date, to_date, from_timezone, to_timezone,
                                trips_comment, trips_cost_center, trips_default_currency)
             VALUES (?1, ?2, ?3, ?4, ?4, '', '', ?5)",
            params![report, start, end, FIXTURE_TIMEZONE, FIXTURE_CURRENCY],
        )?;

        let mut sequence = 0;
        for ((name, price, full_page, extension), day, count) in runs.iter() {
            for _ in 0..*count {
                sequence += 1;
                tx.execute(
                    "INSERT INTO receipts (path, parent, name, category, price, tax, rcpt_date, timezone,
                                           comment, expenseable, isocode, paymentMethodKey, fullpageimage)
                     VALUES (?1, ?2, ?3, ?4, ?5, '0', ?6, ?7, '', 1, ?8, NULL, ?9)",
                    params![
                        format!("{sequence}_{name}.{extension}"),
                        report,
                        name,
                        FIXTURE_CATEGORY,
                        price,
                        november_2016(*day, sequence)?,
                        FIXTURE_TIMEZONE,
                        FIXTURE_CURRENCY,
                        full_page,
                    ],
                )?;
            }
        }
    }

    tx.commit()?;
    Ok(())
}
