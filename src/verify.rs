// ✅ Upgrade Verification - did the migration keep every row intact?
//
// Reads every domain table through the persistence layer and compares it,
// position by position, to literal expectations. The first mismatch stops
// the pass; order differences count as mismatches.

use crate::db::Database;
use crate::entities::{Category, Column, ColumnType, Keyed, Receipt, Trip};
use crate::errors::{VerificationError, VerificationResult};
use crate::format::FormatContext;
use crate::schema::DATABASE_VERSION;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Display;
use tracing::{debug, info};
use uuid::Uuid;

// ============================================================================
// EXPECTATIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryExpectation {
    pub name: String,
    pub code: String,
    pub custom_order_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentMethodExpectation {
    pub id: i64,
    pub method: String,
    pub custom_order_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnExpectation {
    pub id: i64,
    pub column_type: ColumnType,
    pub custom_order_id: i64,
}

/// One receipt as the user would see it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptExpectation {
    pub name: String,
    pub price: String,
    pub tax: String,
    pub currency: String,
    pub date: String,
    /// Name of the category the receipt must point at
    pub category: String,
    pub comment: String,
    pub reimbursable: bool,
    pub full_page: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripExpectation {
    pub id: i64,
    pub name: String,
    pub directory_name: String,
    pub start_date: String,
    pub end_date: String,
    pub price: String,
    pub currency: String,
    pub comment: String,
    pub cost_center: String,
    /// Receipts in list order, as runs of identical receipts
    pub receipts: Vec<(usize, ReceiptExpectation)>,
    pub distances: usize,
}

impl TripExpectation {
    pub fn receipt_count(&self) -> usize {
        self.receipts.iter().map(|(count, _)| count).sum()
    }

    /// Expectation for the 1-based `index`-th receipt
    pub fn receipt_at(&self, index: usize) -> Option<&ReceiptExpectation> {
        let mut remaining = index;
        for (count, receipt) in &self.receipts {
            if remaining <= *count {
                return Some(receipt);
            }
            remaining -= count;
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectations {
    pub schema_version: i64,
    pub categories: Vec<CategoryExpectation>,
    pub payment_methods: Vec<PaymentMethodExpectation>,
    pub csv_columns: Vec<ColumnExpectation>,
    pub pdf_columns: Vec<ColumnExpectation>,
    pub trips: Vec<TripExpectation>,
}

fn category(name: &str, code: &str) -> CategoryExpectation {
    CategoryExpectation {
        name: name.to_string(),
        code: code.to_string(),
        custom_order_id: 0,
    }
}

fn payment_method(id: i64, method: &str) -> PaymentMethodExpectation {
    PaymentMethodExpectation {
        id,
        method: method.to_string(),
        custom_order_id: 0,
    }
}

fn column(id: i64, column_type: ColumnType) -> ColumnExpectation {
    ColumnExpectation {
        id,
        column_type,
        custom_order_id: 0,
    }
}

fn dinner_receipt(name: &str, price: &str, date: &str, full_page: bool) -> ReceiptExpectation {
    ReceiptExpectation {
        name: name.to_string(),
        price: price.to_string(),
        tax: "$0.00".to_string(),
        currency: "USD".to_string(),
        date: date.to_string(),
        category: "Dinner".to_string(),
        comment: String::new(),
        reimbursable: true,
        full_page,
    }
}

fn picture(date: &str) -> ReceiptExpectation {
    dinner_receipt("Picture", "$5.00", date, false)
}

fn full_picture(date: &str) -> ReceiptExpectation {
    dinner_receipt("Full picture", "$5.00", date, true)
}

fn pdf_sample(date: &str) -> ReceiptExpectation {
    dinner_receipt("Pdf sample", "$2.00", date, false)
}

fn report(id: i64, price: &str, receipts: Vec<(usize, ReceiptExpectation)>) -> TripExpectation {
    let name = format!("Report {id}");
    TripExpectation {
        id,
        directory_name: name.clone(),
        name,
        start_date: "11/17/16".to_string(),
        end_date: "11/20/16".to_string(),
        price: price.to_string(),
        currency: "USD".to_string(),
        comment: String::new(),
        cost_center: String::new(),
        receipts,
        distances: 0,
    }
}

impl Expectations {
    /// What the v15 fixture must look like after upgrading (en-US, "/" dates)
    pub fn legacy_v15() -> Self {
        Expectations {
            schema_version: DATABASE_VERSION,
            categories: vec![
                category("<Category>", "NUL"),
                category("Airfare", "AIRP"),
                category("Books/Periodicals", "ZBKP"),
                category("Breakfast", "BRFT"),
                category("Car Rental", "RCAR"),
                category("Cell Phone", "ZCEL"),
                category("Dinner", "DINN"),
                category("Dues/Subscriptions", "ZDUE"),
                category("Entertainment", "ENT"),
                category("Gasoline", "GAS"),
                category("Gift", "GIFT"),
                category("Hotel", "HTL"),
                category("Laundry", "LAUN"),
                category("Lunch", "LNCH"),
                category("Meals (Justified)", "ZMEO"),
                category("Other", "MISC"),
                category("Parking/Tolls", "PARK"),
                category("Postage/Shipping", "POST"),
                category("Stationery/Stations", "ZSTS"),
                category("Taxi/Bus", "TAXI"),
                category("Telephone/Fax", "TELE"),
                category("Tip", "TIP"),
                category("Train", "TRN"),
                category("Training Fees", "ZTRN"),
            ],
            payment_methods: vec![
                payment_method(1, "Unspecified"),
                payment_method(2, "Corporate Card"),
                payment_method(3, "Personal Card"),
                payment_method(4, "Check"),
                payment_method(5, "Cash"),
            ],
            csv_columns: vec![
                column(1, ColumnType::CategoryCode),
                column(2, ColumnType::Name),
                column(3, ColumnType::Price),
                column(4, ColumnType::Currency),
                column(5, ColumnType::Date),
            ],
            pdf_columns: vec![
                column(1, ColumnType::Name),
                column(2, ColumnType::Price),
                column(3, ColumnType::Date),
                column(4, ColumnType::CategoryName),
                column(5, ColumnType::Reimbursable),
                column(6, ColumnType::Pictured),
            ],
            trips: vec![
                report(1, "$45.00", vec![(9, picture("11/17/16"))]),
                report(
                    2,
                    "$50.00",
                    vec![
                        (5, picture("11/17/16")),
                        (3, full_picture("11/18/16")),
                        (2, picture("11/19/16")),
                    ],
                ),
                report(
                    3,
                    "$42.00",
                    vec![
                        (1, picture("11/17/16")),
                        (1, full_picture("11/18/16")),
                        (1, pdf_sample("11/19/16")),
                        (6, picture("11/20/16")),
                    ],
                ),
            ],
        }
    }
}

// ============================================================================
// SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationSummary {
    pub schema_version: i64,
    pub categories: usize,
    pub payment_methods: usize,
    pub csv_columns: usize,
    pub pdf_columns: usize,
    pub trips: usize,
    pub receipts: usize,
    pub distances: usize,
    pub unique_uuids: usize,
}

// ============================================================================
// CHECKS
// ============================================================================

fn expect_eq<T: PartialEq + Display>(
    collection: &str,
    index: usize,
    field: &str,
    expected: T,
    actual: T,
) -> VerificationResult<()> {
    if expected == actual {
        return Ok(());
    }
    Err(VerificationError::FieldMismatch {
        collection: collection.to_string(),
        index,
        field: field.to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}

fn expect_count(collection: &str, expected: usize, actual: usize) -> VerificationResult<()> {
    if expected == actual {
        return Ok(());
    }
    Err(VerificationError::CountMismatch {
        collection: collection.to_string(),
        expected,
        actual,
    })
}

fn read<T>(what: &str, result: anyhow::Result<T>) -> VerificationResult<T> {
    result.map_err(|e| VerificationError::Read {
        what: what.to_string(),
        message: format!("{:#}", e),
    })
}

/// No two items of one collection share a uuid
pub fn assert_unique_uuids<K: Keyed>(collection: &str, items: &[K]) -> VerificationResult<()> {
    let mut seen: HashMap<&Uuid, usize> = HashMap::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        if let Some(first) = seen.insert(item.uuid(), index) {
            return Err(VerificationError::DuplicateUuid {
                uuid: item.uuid().to_string(),
                first: format!("{collection}[{first}]"),
                second: format!("{collection}[{index}]"),
            });
        }
    }
    Ok(())
}

/// Tracks every uuid seen so far, across collections
#[derive(Default)]
struct UuidLedger {
    owners: HashMap<Uuid, String>,
}

impl UuidLedger {
    fn record<K: Keyed>(&mut self, collection: &str, items: &[K]) -> VerificationResult<()> {
        assert_unique_uuids(collection, items)?;
        for (index, item) in items.iter().enumerate() {
            let owner = format!("{collection}[{index}]");
            if let Some(first) = self.owners.get(item.uuid()) {
                return Err(VerificationError::DuplicateUuid {
                    uuid: item.uuid().to_string(),
                    first: first.clone(),
                    second: owner,
                });
            }
            self.owners.insert(*item.uuid(), owner);
        }
        Ok(())
    }
}

fn verify_categories(actual: &[Category], expected: &[CategoryExpectation]) -> VerificationResult<()> {
    expect_count("categories", expected.len(), actual.len())?;
    for (i, (category, want)) in actual.iter().zip(expected).enumerate() {
        expect_eq("categories", i, "name", want.name.as_str(), category.name.as_str())?;
        expect_eq("categories", i, "code", want.code.as_str(), category.code.as_str())?;
        expect_eq("categories", i, "custom_order_id", want.custom_order_id, category.custom_order_id)?;
    }
    Ok(())
}

fn verify_columns(collection: &str, actual: &[Column], expected: &[ColumnExpectation]) -> VerificationResult<()> {
    expect_count(collection, expected.len(), actual.len())?;
    for (i, (column, want)) in actual.iter().zip(expected).enumerate() {
        expect_eq(collection, i, "id", want.id, column.id)?;
        expect_eq(
            collection,
            i,
            "column_type",
            want.column_type.display_name(),
            column.column_type.display_name(),
        )?;
        expect_eq(collection, i, "custom_order_id", want.custom_order_id, column.custom_order_id)?;
    }
    Ok(())
}

fn verify_trip(index: usize, trip: &Trip, want: &TripExpectation, ctx: &FormatContext) -> VerificationResult<()> {
    let start = read("trip start date", trip.formatted_start_date(ctx))?;
    let end = read("trip end date", trip.formatted_end_date(ctx))?;
    let price = trip.price.currency_formatted_price();

    expect_eq("trips", index, "id", want.id, trip.id)?;
    expect_eq("trips", index, "name", want.name.as_str(), trip.name.as_str())?;
    expect_eq("trips", index, "directory", want.directory_name.as_str(), trip.directory_name())?;
    expect_eq("trips", index, "start_date", want.start_date.as_str(), start.as_str())?;
    expect_eq("trips", index, "end_date", want.end_date.as_str(), end.as_str())?;
    expect_eq("trips", index, "price", want.price.as_str(), price.as_str())?;
    expect_eq("trips", index, "currency", want.currency.as_str(), trip.currency.code())?;
    expect_eq("trips", index, "comment", want.comment.as_str(), trip.comment.as_str())?;
    expect_eq("trips", index, "cost_center", want.cost_center.as_str(), trip.cost_center.as_str())?;
    Ok(())
}

fn verify_receipts(
    trip: &Trip,
    receipts: &[Receipt],
    want: &TripExpectation,
    categories: &[Category],
    ctx: &FormatContext,
) -> VerificationResult<()> {
    let collection = format!("{} receipts", trip.name);
    expect_count(&collection, want.receipt_count(), receipts.len())?;

    let mut last_custom_order_id = 0i64;
    for (position, receipt) in receipts.iter().enumerate() {
        let index = position + 1;
        expect_eq(&collection, position, "index", index, receipt.index)?;

        if receipt.custom_order_id <= last_custom_order_id {
            return Err(VerificationError::OrderingViolation {
                trip: trip.name.clone(),
                index,
                previous: last_custom_order_id,
                current: receipt.custom_order_id,
            });
        }
        last_custom_order_id = receipt.custom_order_id;

        let Some(expected) = want.receipt_at(index) else {
            return Err(VerificationError::CountMismatch {
                collection,
                expected: want.receipt_count(),
                actual: receipts.len(),
            });
        };
        verify_receipt(&collection, position, trip, receipt, expected, categories, ctx)?;
        debug!(trip = %trip.name, index, "Receipt verified");
    }

    Ok(())
}

fn verify_receipt(
    collection: &str,
    i: usize,
    trip: &Trip,
    receipt: &Receipt,
    want: &ReceiptExpectation,
    categories: &[Category],
    ctx: &FormatContext,
) -> VerificationResult<()> {
    if &receipt.trip != trip {
        return Err(VerificationError::FieldMismatch {
            collection: collection.to_string(),
            index: i,
            field: "trip".to_string(),
            expected: trip.name.clone(),
            actual: receipt.trip.name.clone(),
        });
    }

    let date = read("receipt date", receipt.formatted_date(ctx))?;
    let price = receipt.price.currency_formatted_price();
    let tax = receipt.tax.currency_formatted_price();
    expect_eq(collection, i, "name", want.name.as_str(), receipt.name.as_str())?;
    expect_eq(collection, i, "price", want.price.as_str(), price.as_str())?;
    expect_eq(collection, i, "price.currency", want.currency.as_str(), receipt.price.currency_code())?;
    expect_eq(collection, i, "tax", want.tax.as_str(), tax.as_str())?;
    expect_eq(collection, i, "tax.currency", want.currency.as_str(), receipt.tax.currency_code())?;
    expect_eq(collection, i, "date", want.date.as_str(), date.as_str())?;

    // Must be the very row read from the categories table
    let expected_category = categories.iter().find(|c| c.name == want.category);
    if receipt.category.as_ref() != expected_category {
        return Err(VerificationError::FieldMismatch {
            collection: collection.to_string(),
            index: i,
            field: "category".to_string(),
            expected: want.category.clone(),
            actual: receipt.category_name().to_string(),
        });
    }

    expect_eq(collection, i, "comment", want.comment.as_str(), receipt.comment.as_str())?;
    expect_eq(
        collection,
        i,
        "payment_method",
        "none",
        receipt.payment_method.as_ref().map(|m| m.method.as_str()).unwrap_or("none"),
    )?;
    expect_eq(collection, i, "reimbursable", want.reimbursable, receipt.reimbursable)?;
    expect_eq(collection, i, "full_page", want.full_page, receipt.full_page)?;
    Ok(())
}

/// Full verification pass over an upgraded database.
pub fn verify_upgrade(
    db: &Database,
    expected: &Expectations,
    ctx: &FormatContext,
) -> VerificationResult<VerificationSummary> {
    let version = read("schema version", db.version())?;
    if version != expected.schema_version {
        return Err(VerificationError::VersionMismatch {
            expected: expected.schema_version,
            actual: version,
        });
    }

    let categories = read("categories", db.categories())?;
    verify_categories(&categories, &expected.categories)?;

    let payment_methods = read("payment methods", db.payment_methods())?;
    expect_count("payment_methods", expected.payment_methods.len(), payment_methods.len())?;
    for (i, (method, want)) in payment_methods.iter().zip(&expected.payment_methods).enumerate() {
        expect_eq("payment_methods", i, "id", want.id, method.id)?;
        expect_eq("payment_methods", i, "method", want.method.as_str(), method.method.as_str())?;
        expect_eq("payment_methods", i, "custom_order_id", want.custom_order_id, method.custom_order_id)?;
    }

    let csv_columns = read("csv columns", db.csv_columns())?;
    verify_columns("csv_columns", &csv_columns, &expected.csv_columns)?;

    let pdf_columns = read("pdf columns", db.pdf_columns())?;
    verify_columns("pdf_columns", &pdf_columns, &expected.pdf_columns)?;

    let trips = read("trips", db.trips())?;
    expect_count("trips", expected.trips.len(), trips.len())?;

    let mut all_receipts = Vec::new();
    let mut all_distances = Vec::new();
    for (i, (trip, want)) in trips.iter().zip(&expected.trips).enumerate() {
        verify_trip(i, trip, want, ctx)?;

        let receipts = read("receipts", db.receipts(trip))?;
        verify_receipts(trip, &receipts, want, &categories, ctx)?;
        all_receipts.extend(receipts);

        let distances = read("distances", db.distances(trip))?;
        expect_count(&format!("{} distances", trip.name), want.distances, distances.len())?;
        all_distances.extend(distances);
    }

    let mut ledger = UuidLedger::default();
    ledger.record("categories", &categories)?;
    ledger.record("payment_methods", &payment_methods)?;
    ledger.record("csv_columns", &csv_columns)?;
    ledger.record("pdf_columns", &pdf_columns)?;
    ledger.record("trips", &trips)?;
    ledger.record("receipts", &all_receipts)?;
    ledger.record("distances", &all_distances)?;

    let summary = VerificationSummary {
        schema_version: version,
        categories: categories.len(),
        payment_methods: payment_methods.len(),
        csv_columns: csv_columns.len(),
        pdf_columns: pdf_columns.len(),
        trips: trips.len(),
        receipts: all_receipts.len(),
        distances: all_distances.len(),
        unique_uuids: ledger.owners.len(),
    };
    info!(?summary, "Upgrade verification passed");
    Ok(summary)
}
