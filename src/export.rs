// 📤 CSV Export - one row per receipt, one cell per configured column

use crate::entities::{Column, ColumnType, Receipt, Trip};
use crate::format::FormatContext;
use anyhow::{Context, Result};
use std::io::Write;

/// Values that come from outside the trip (user settings)
#[derive(Debug, Clone, Default)]
pub struct ExportSettings {
    pub user_id: String,
    pub format: FormatContext,
}

fn yes_no(flag: bool) -> String {
    let text = if flag { "Yes" } else { "No" };
    text.to_string()
}

/// Render a single cell
pub fn render_cell(
    column_type: ColumnType,
    trip: &Trip,
    receipt: &Receipt,
    settings: &ExportSettings,
) -> Result<String> {
    let ctx = &settings.format;
    let value = match column_type {
        ColumnType::Blank => String::new(),
        ColumnType::CategoryCode => receipt.category_code().to_string(),
        ColumnType::CategoryName => receipt.category_name().to_string(),
        ColumnType::UserId => settings.user_id.clone(),
        ColumnType::ReportName => trip.name.clone(),
        ColumnType::ReportStartDate => trip.formatted_start_date(ctx)?,
        ColumnType::ReportEndDate => trip.formatted_end_date(ctx)?,
        ColumnType::ReportComment => trip.comment.clone(),
        ColumnType::ReportCostCenter => trip.cost_center.clone(),
        ColumnType::ImageFileName => receipt.file_name.clone().unwrap_or_default(),
        ColumnType::ImagePath => receipt
            .file_name
            .as_ref()
            .map(|f| trip.directory.join(f).display().to_string())
            .unwrap_or_default(),
        ColumnType::Comment => receipt.comment.clone(),
        ColumnType::Currency => receipt.price.currency_code().to_string(),
        ColumnType::Date => receipt.formatted_date(ctx)?,
        ColumnType::Name => receipt.name.clone(),
        ColumnType::Price => receipt.price.decimal_formatted_price(),
        ColumnType::Tax => receipt.tax.decimal_formatted_price(),
        ColumnType::Pictured => yes_no(receipt.has_image() || receipt.has_pdf()),
        ColumnType::Reimbursable => yes_no(receipt.reimbursable),
        ColumnType::PaymentMethod => receipt
            .payment_method
            .as_ref()
            .map(|m| m.method.clone())
            .unwrap_or_default(),
        ColumnType::Index => receipt.index.to_string(),
        ColumnType::Id => receipt.id.to_string(),
    };
    Ok(value)
}

/// Write a header row of column names, then every receipt.
pub fn write_receipts_csv<W: Write>(
    writer: W,
    trip: &Trip,
    receipts: &[Receipt],
    columns: &[Column],
    settings: &ExportSettings,
) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(columns.iter().map(|c| c.header()))
        .context("Failed to write CSV header")?;

    for receipt in receipts {
        let row = columns
            .iter()
            .map(|c| render_cell(c.column_type, trip, receipt, settings))
            .collect::<Result<Vec<_>>>()?;
        wtr.write_record(&row)
            .with_context(|| format!("Failed to write receipt {}", receipt.id))?;
    }

    wtr.flush().context("Failed to flush CSV output")?;
    Ok(receipts.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::fixture::populate_legacy_v15;
    use crate::upgrade::upgrade;
    use rusqlite::Connection;
    use std::path::Path;

    fn upgraded_fixture() -> Database {
        let conn = Connection::open_in_memory().unwrap();
        populate_legacy_v15(&conn).unwrap();
        upgrade(&conn).unwrap();
        Database::from_connection(conn, Path::new("/sdcard/receipts"))
    }

    #[test]
    fn test_default_csv_columns_export() {
        let db = upgraded_fixture();
        let trip = db.trips().unwrap().remove(2);
        let receipts = db.receipts(&trip).unwrap();
        let columns = db.csv_columns().unwrap();

        let mut out = Vec::new();
        let written =
            write_receipts_csv(&mut out, &trip, &receipts, &columns, &ExportSettings::default()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(written, 9);
        assert_eq!(lines[0], "Category Code,Name,Price,Currency,Date");
        assert_eq!(lines[1], "DINN,Picture,5.00,USD,11/17/16");
        assert_eq!(lines[3], "DINN,Pdf sample,2.00,USD,11/19/16");
        assert_eq!(lines.len(), 10);
    }

    #[test]
    fn test_report_and_file_cells() {
        let db = upgraded_fixture();
        let trip = db.trips().unwrap().remove(0);
        let receipt = db.receipts(&trip).unwrap().remove(0);
        let settings = ExportSettings {
            user_id: "alex@example.com".to_string(),
            ..ExportSettings::default()
        };

        let cell = |ct| render_cell(ct, &trip, &receipt, &settings).unwrap();
        assert_eq!(cell(ColumnType::ReportName), "Report 1");
        assert_eq!(cell(ColumnType::UserId), "alex@example.com");
        assert_eq!(cell(ColumnType::ImageFileName), "1_Picture.jpg");
        assert_eq!(cell(ColumnType::ImagePath), "/sdcard/receipts/Report 1/1_Picture.jpg");
        assert_eq!(cell(ColumnType::Pictured), "Yes");
        assert_eq!(cell(ColumnType::Reimbursable), "Yes");
        assert_eq!(cell(ColumnType::PaymentMethod), "");
        assert_eq!(cell(ColumnType::Index), "1");
        assert_eq!(cell(ColumnType::Blank), "");
    }
}
