use crate::entities::receipt::{custom_order_id_for, day_bucket, MAX_RECEIPTS_PER_DAY};
use crate::entities::trip::trip_directory;
use crate::entities::{Category, Column, ColumnType, Distance, PaymentMethod, Receipt, Trip};
use crate::format::{CurrencyCode, Price};
use crate::schema::{new_uuid, read_version};
use crate::upgrade::{upgrade, UpgradeReport};
use anyhow::{anyhow, bail, Context, Result};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OpenFlags, Row};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};
use uuid::Uuid;

/// Currency used when a trip row has none
pub const DEFAULT_CURRENCY: &str = "USD";

/// Persistence layer over one receipts database file.
///
/// Every accessor returns a complete, eagerly collected table (or the
/// complete child list of one trip).
pub struct Database {
    conn: Connection,
    files_dir: PathBuf,
    last_upgrade: Option<UpgradeReport>,
}

// ============================================================================
// INPUT RECORDS
// ============================================================================

#[derive(Debug, Clone)]
pub struct NewTrip {
    pub name: String,
    pub start_date: i64,
    pub end_date: i64,
    pub timezone: String,
    pub currency: String,
    pub comment: String,
    pub cost_center: String,
}

#[derive(Debug, Clone)]
pub struct NewReceipt {
    pub name: String,
    pub file_name: Option<String>,
    pub price: String,
    pub tax: String,
    pub currency: String,
    pub date: i64,
    pub timezone: String,
    pub category_id: Option<i64>,
    pub payment_method_id: Option<i64>,
    pub comment: String,
    pub reimbursable: bool,
    pub full_page: bool,
}

#[derive(Debug, Clone)]
pub struct NewDistance {
    pub location: String,
    pub distance: String,
    pub rate: String,
    pub rate_currency: String,
    pub date: i64,
    pub timezone: String,
    pub comment: String,
}

// Raw receipt row before category/payment/trip resolution
struct ReceiptRow {
    id: i64,
    name: String,
    file_name: Option<String>,
    price: String,
    tax: String,
    currency: Option<String>,
    date: i64,
    timezone: Option<String>,
    category_id: Option<i64>,
    comment: Option<String>,
    payment_method_id: Option<i64>,
    reimbursable: bool,
    full_page: bool,
    custom_order_id: i64,
    uuid: Uuid,
}

fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

impl Database {
    /// Open (creating if needed) and upgrade to the current schema version
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        let report = upgrade(&conn)
            .with_context(|| format!("Failed to upgrade {}", path.display()))?;

        let mut db = Self::with_files_dir_of(conn, path);
        db.last_upgrade = Some(report);
        Ok(db)
    }

    /// Open an existing file as-is; used once an upgrade has already run elsewhere
    pub fn open_without_upgrade(path: &Path) -> Result<Self> {
        if !path.is_file() {
            bail!("Database {} does not exist", path.display());
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        Ok(Self::with_files_dir_of(conn, path))
    }

    fn with_files_dir_of(conn: Connection, path: &Path) -> Self {
        let files_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        info!(path = %path.display(), "Opened receipts database");

        Database {
            conn,
            files_dir,
            last_upgrade: None,
        }
    }

    /// Wrap an existing connection; trip directories resolve under `files_dir`
    pub fn from_connection(conn: Connection, files_dir: &Path) -> Self {
        Database {
            conn,
            files_dir: files_dir.to_path_buf(),
            last_upgrade: None,
        }
    }

    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    /// Report of the upgrade run by `open`, if any
    pub fn last_upgrade(&self) -> Option<&UpgradeReport> {
        self.last_upgrade.as_ref()
    }

    pub fn version(&self) -> Result<i64> {
        read_version(&self.conn)
    }

    // ========================================================================
    // READERS
    // ========================================================================

    pub fn categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, code, custom_order_id, entity_uuid
             FROM categories
             ORDER BY custom_order_id, name",
        )?;

        let categories = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    code: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    custom_order_id: row.get(3)?,
                    uuid: uuid_at(row, 4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    pub fn payment_methods(&self) -> Result<Vec<PaymentMethod>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, type, custom_order_id, entity_uuid
             FROM paymentmethods
             ORDER BY custom_order_id, id",
        )?;

        let methods = stmt
            .query_map([], |row| {
                Ok(PaymentMethod {
                    id: row.get(0)?,
                    method: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    custom_order_id: row.get(2)?,
                    uuid: uuid_at(row, 3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(methods)
    }

    pub fn csv_columns(&self) -> Result<Vec<Column>> {
        self.columns("csvcolumns")
    }

    pub fn pdf_columns(&self) -> Result<Vec<Column>> {
        self.columns("pdfcolumns")
    }

    fn columns(&self, table: &str) -> Result<Vec<Column>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, column_type, custom_order_id, entity_uuid
             FROM {table}
             ORDER BY custom_order_id, id"
        ))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    uuid_at(row, 3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, type_id, custom_order_id, uuid)| {
                let column_type = ColumnType::from_id(type_id)
                    .ok_or_else(|| anyhow!("{table} row {id} has unknown column type {type_id}"))?;
                Ok(Column {
                    id,
                    column_type,
                    custom_order_id,
                    uuid,
                })
            })
            .collect()
    }

    pub fn trips(&self) -> Result<Vec<Trip>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, from_date, to_date, from_timezone, to_timezone,
                    trips_comment, trips_cost_center, trips_default_currency, entity_uuid
             FROM trips
             ORDER BY id",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, Option<String>>(8)?,
                    uuid_at(row, 9)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut trips = Vec::with_capacity(rows.len());
        for (id, name, from, to, from_tz, to_tz, comment, cost_center, currency, uuid) in rows {
            let currency = CurrencyCode::new(currency.as_deref().unwrap_or(DEFAULT_CURRENCY));
            let price = self.trip_price(id, &name, &currency)?;

            trips.push(Trip {
                id,
                directory: trip_directory(&self.files_dir, &name),
                name,
                start_date: from,
                start_timezone: from_tz.unwrap_or_default(),
                end_date: to,
                end_timezone: to_tz.unwrap_or_default(),
                price,
                currency,
                comment: comment.unwrap_or_default(),
                cost_center: cost_center.unwrap_or_default(),
                uuid,
            });
        }

        Ok(trips)
    }

    /// Sum of receipt prices in the trip currency
    fn trip_price(&self, trip_id: i64, trip_name: &str, currency: &CurrencyCode) -> Result<Price> {
        let mut stmt = self
            .conn
            .prepare("SELECT price, isocode FROM receipts WHERE parentKey = ?1")?;
        let rows = stmt
            .query_map([trip_id], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut prices = Vec::with_capacity(rows.len());
        for (price, code) in rows {
            let code = code.map(|c| CurrencyCode::new(&c)).unwrap_or_else(|| currency.clone());
            if &code != currency {
                warn!(trip = trip_name, currency = %code, "Skipping receipt in foreign currency from trip total");
                continue;
            }
            prices.push(Price::parse(price.as_deref().unwrap_or(""), code)?);
        }

        Price::sum(&prices, currency.clone())
    }

    /// Receipts of `trip`, in list order, with `index` set 1..N
    pub fn receipts(&self, trip: &Trip) -> Result<Vec<Receipt>> {
        let categories: HashMap<i64, Category> =
            self.categories()?.into_iter().map(|c| (c.id, c)).collect();
        let methods: HashMap<i64, PaymentMethod> =
            self.payment_methods()?.into_iter().map(|m| (m.id, m)).collect();

        let mut stmt = self.conn.prepare(
            "SELECT id, name, price, tax, isocode, rcpt_date, timezone, category_id, comment,
                    paymentMethodKey, expenseable, fullpageimage, custom_order_id, entity_uuid, path
             FROM receipts
             WHERE parentKey = ?1
             ORDER BY custom_order_id, id",
        )?;

        let rows = stmt
            .query_map([trip.id], |row| {
                Ok(ReceiptRow {
                    id: row.get(0)?,
                    name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    price: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    tax: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    currency: row.get(4)?,
                    date: row.get(5)?,
                    timezone: row.get(6)?,
                    category_id: row.get(7)?,
                    comment: row.get(8)?,
                    payment_method_id: row.get(9)?,
                    reimbursable: row.get::<_, Option<bool>>(10)?.unwrap_or(true),
                    full_page: row.get::<_, Option<bool>>(11)?.unwrap_or(false),
                    custom_order_id: row.get(12)?,
                    uuid: uuid_at(row, 13)?,
                    file_name: row.get(14)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut receipts = Vec::with_capacity(rows.len());
        for (position, raw) in rows.into_iter().enumerate() {
            let currency = raw
                .currency
                .as_deref()
                .map(CurrencyCode::new)
                .unwrap_or_else(|| trip.currency.clone());

            let category = match raw.category_id {
                Some(id) => {
                    let found = categories.get(&id).cloned();
                    if found.is_none() {
                        warn!(receipt = raw.id, category = id, "Receipt references a missing category");
                    }
                    found
                }
                None => None,
            };

            receipts.push(Receipt {
                id: raw.id,
                trip: trip.clone(),
                name: raw.name,
                file_name: raw.file_name,
                price: Price::parse(&raw.price, currency.clone())
                    .with_context(|| format!("Bad price on receipt {}", raw.id))?,
                tax: Price::parse(&raw.tax, currency)
                    .with_context(|| format!("Bad tax on receipt {}", raw.id))?,
                date: raw.date,
                timezone: raw.timezone.unwrap_or_default(),
                category,
                comment: raw.comment.unwrap_or_default(),
                payment_method: raw.payment_method_id.and_then(|id| methods.get(&id).cloned()),
                reimbursable: raw.reimbursable,
                full_page: raw.full_page,
                index: position + 1,
                custom_order_id: raw.custom_order_id,
                uuid: raw.uuid,
            });
        }

        Ok(receipts)
    }

    pub fn distances(&self, trip: &Trip) -> Result<Vec<Distance>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, location, distance, rate, rate_currency, date, timezone, comment, entity_uuid
             FROM distance
             WHERE parentKey = ?1
             ORDER BY date, id",
        )?;

        let rows = stmt
            .query_map([trip.id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<i64>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    uuid_at(row, 8)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, location, distance, rate, rate_currency, date, timezone, comment, uuid)| {
                let distance_text = distance.unwrap_or_else(|| "0".to_string());
                let distance = Decimal::from_str(distance_text.trim())
                    .map_err(|e| anyhow!("Bad distance on row {}: {}", id, e))?;
                let currency = rate_currency
                    .as_deref()
                    .map(CurrencyCode::new)
                    .unwrap_or_else(|| trip.currency.clone());

                Ok(Distance {
                    id,
                    trip_id: trip.id,
                    location: location.unwrap_or_default(),
                    distance,
                    rate: Price::parse(rate.as_deref().unwrap_or(""), currency)?,
                    date: date.unwrap_or(trip.start_date),
                    timezone: timezone.unwrap_or_default(),
                    comment: comment.unwrap_or_default(),
                    uuid,
                })
            })
            .collect()
    }

    // ========================================================================
    // WRITERS
    // ========================================================================

    pub fn insert_trip(&self, trip: &NewTrip) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO trips (name, from_date, to_date, from_timezone, to_timezone,
                                    trips_comment, trips_cost_center, trips_default_currency, entity_uuid)
                 VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?6, ?7, ?8)",
                params![
                    trip.name,
                    trip.start_date,
                    trip.end_date,
                    trip.timezone,
                    trip.comment,
                    trip.cost_center,
                    CurrencyCode::new(&trip.currency).code(),
                    new_uuid(),
                ],
            )
            .with_context(|| format!("Failed to insert trip '{}'", trip.name))?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Insert at the end of its day within `trip`'s list
    pub fn insert_receipt(&self, trip: &Trip, receipt: &NewReceipt) -> Result<i64> {
        let day_start = day_bucket(receipt.date);
        let same_day: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM receipts
             WHERE parentKey = ?1 AND custom_order_id >= ?2 AND custom_order_id < ?3",
            params![trip.id, day_start, day_start + MAX_RECEIPTS_PER_DAY],
            |row| row.get(0),
        )?;
        let custom_order_id = custom_order_id_for(receipt.date, same_day)
            .with_context(|| format!("Trip '{}' has no room for '{}'", trip.name, receipt.name))?;

        self.conn.execute(
            "INSERT INTO receipts (name, price, tax, rcpt_date, timezone, comment, expenseable,
                                   isocode, paymentMethodKey, fullpageimage, parentKey, category_id,
                                   custom_order_id, entity_uuid, path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                receipt.name,
                receipt.price,
                receipt.tax,
                receipt.date,
                receipt.timezone,
                receipt.comment,
                receipt.reimbursable,
                CurrencyCode::new(&receipt.currency).code(),
                receipt.payment_method_id,
                receipt.full_page,
                trip.id,
                receipt.category_id,
                custom_order_id,
                new_uuid(),
                receipt.file_name,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_distance(&self, trip: &Trip, distance: &NewDistance) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO distance (distance, location, date, timezone, comment, rate, rate_currency,
                                   parentKey, entity_uuid)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                distance.distance,
                distance.location,
                distance.date,
                distance.timezone,
                distance.comment,
                distance.rate,
                CurrencyCode::new(&distance.rate_currency).code(),
                trip.id,
                new_uuid(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn fresh_db() -> Database {
        let conn = Connection::open_in_memory().unwrap();
        upgrade(&conn).unwrap();
        Database::from_connection(conn, Path::new("/files"))
    }

    fn millis(day: u32, hour: u32) -> i64 {
        Utc.with_ymd_and_hms(2016, 11, day, hour, 0, 0)
            .unwrap()
            .timestamp_millis()
    }

    fn new_trip(name: &str) -> NewTrip {
        NewTrip {
            name: name.to_string(),
            start_date: millis(17, 12),
            end_date: millis(20, 12),
            timezone: "UTC".to_string(),
            currency: "usd".to_string(),
            comment: String::new(),
            cost_center: String::new(),
        }
    }

    fn new_receipt(name: &str, price: &str, currency: &str, date: i64) -> NewReceipt {
        NewReceipt {
            name: name.to_string(),
            file_name: Some(format!("{name}.jpg")),
            price: price.to_string(),
            tax: "0".to_string(),
            currency: currency.to_string(),
            date,
            timezone: "UTC".to_string(),
            category_id: Some(7),
            payment_method_id: None,
            comment: String::new(),
            reimbursable: true,
            full_page: false,
        }
    }

    #[test]
    fn test_defaults_read_back_in_order() {
        let db = fresh_db();

        let categories = db.categories().unwrap();
        assert_eq!(categories.len(), 24);
        assert_eq!(categories[0].name, "<Category>");
        assert_eq!(categories[23].code, "ZTRN");

        let methods = db.payment_methods().unwrap();
        assert_eq!(methods.iter().map(|m| m.id).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        assert_eq!(methods[1].method, "Corporate Card");

        let csv = db.csv_columns().unwrap();
        assert_eq!(csv[0].column_type, ColumnType::CategoryCode);
        assert_eq!(db.pdf_columns().unwrap().len(), 6);
    }

    #[test]
    fn test_receipts_indexed_in_list_order() {
        let db = fresh_db();
        let trip_id = db.insert_trip(&new_trip("Boston")).unwrap();
        let trip = db.trips().unwrap().into_iter().find(|t| t.id == trip_id).unwrap();

        db.insert_receipt(&trip, &new_receipt("second day", "2", "USD", millis(18, 9))).unwrap();
        db.insert_receipt(&trip, &new_receipt("first", "5", "USD", millis(17, 9))).unwrap();
        db.insert_receipt(&trip, &new_receipt("first again", "5", "USD", millis(17, 8))).unwrap();

        let receipts = db.receipts(&trip).unwrap();
        let names: Vec<&str> = receipts.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["first", "first again", "second day"]);
        assert_eq!(receipts.iter().map(|r| r.index).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(receipts.windows(2).all(|w| w[0].custom_order_id < w[1].custom_order_id));
        assert_eq!(receipts[0].category_name(), "Dinner");
        assert_eq!(receipts[0].trip, trip);
    }

    #[test]
    fn test_day_holds_a_bounded_number_of_receipts() {
        let db = fresh_db();
        let trip_id = db.insert_trip(&new_trip("Conference")).unwrap();
        let trip = db.trips().unwrap().into_iter().find(|t| t.id == trip_id).unwrap();

        db.insert_receipt(&trip, &new_receipt("next day", "1", "USD", millis(18, 9))).unwrap();
        for _ in 0..MAX_RECEIPTS_PER_DAY {
            db.insert_receipt(&trip, &new_receipt("coffee", "1", "USD", millis(17, 9))).unwrap();
        }
        let overflow = db.insert_receipt(&trip, &new_receipt("one more", "1", "USD", millis(17, 9)));
        assert!(overflow.is_err());

        let receipts = db.receipts(&trip).unwrap();
        assert_eq!(receipts.len() as i64, MAX_RECEIPTS_PER_DAY + 1);
        assert_eq!(receipts.last().unwrap().name, "next day");
        assert!(receipts.windows(2).all(|w| w[0].custom_order_id < w[1].custom_order_id));
    }

    #[test]
    fn test_receipt_date_follows_its_timezone() {
        let db = fresh_db();
        let trip_id = db.insert_trip(&new_trip("Late flight")).unwrap();
        let trip = db.trips().unwrap().into_iter().find(|t| t.id == trip_id).unwrap();

        let mut late = new_receipt("late dinner", "30", "USD", millis(18, 3));
        late.timezone = "America/New_York".to_string();
        db.insert_receipt(&trip, &late).unwrap();

        let receipt = db.receipts(&trip).unwrap().remove(0);
        let ctx = crate::format::FormatContext::default();
        assert_eq!(receipt.timezone, "America/New_York");
        assert_eq!(receipt.formatted_date(&ctx).unwrap(), "11/17/16");
    }

    #[test]
    fn test_trip_price_sums_trip_currency_only() {
        let db = fresh_db();
        let trip_id = db.insert_trip(&new_trip("Paris")).unwrap();
        let trip = db.trips().unwrap().into_iter().find(|t| t.id == trip_id).unwrap();

        db.insert_receipt(&trip, &new_receipt("a", "5.00", "USD", millis(17, 9))).unwrap();
        db.insert_receipt(&trip, &new_receipt("b", "2.5", "usd", millis(18, 9))).unwrap();
        db.insert_receipt(&trip, &new_receipt("c", "100", "EUR", millis(19, 9))).unwrap();

        let trip = db.trips().unwrap().into_iter().find(|t| t.id == trip_id).unwrap();
        assert_eq!(trip.price.currency_formatted_price(), "$7.50");
        assert_eq!(trip.directory, PathBuf::from("/files/Paris"));
        assert_eq!(trip.directory_name(), "Paris");
    }

    #[test]
    fn test_distances_belong_to_their_trip() {
        let db = fresh_db();
        let a = db.insert_trip(&new_trip("A")).unwrap();
        let b = db.insert_trip(&new_trip("B")).unwrap();
        let trips = db.trips().unwrap();
        let (trip_a, trip_b) = (&trips[0], &trips[1]);
        assert_eq!((trip_a.id, trip_b.id), (a, b));

        db.insert_distance(
            trip_a,
            &NewDistance {
                location: "Airport".to_string(),
                distance: "12.5".to_string(),
                rate: "0.5".to_string(),
                rate_currency: "USD".to_string(),
                date: millis(18, 10),
                timezone: "UTC".to_string(),
                comment: String::new(),
            },
        )
        .unwrap();

        let distances = db.distances(trip_a).unwrap();
        assert_eq!(distances.len(), 1);
        assert_eq!(distances[0].total().currency_formatted_price(), "$6.25");
        assert!(db.distances(trip_b).unwrap().is_empty());
    }

    #[test]
    fn test_open_upgrades_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipts.db");

        let db = Database::open(&path).unwrap();
        assert_eq!(db.version().unwrap(), crate::schema::DATABASE_VERSION);
        assert!(db.last_upgrade().unwrap().created_fresh);
        assert_eq!(db.files_dir(), dir.path());
    }

    #[test]
    fn test_open_without_upgrade_needs_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");

        let err = Database::open_without_upgrade(&path).err().unwrap();
        assert!(err.to_string().contains("does not exist"), "{}", err);
        assert!(!path.exists());

        Database::open(&path).unwrap();
        let reopened = Database::open_without_upgrade(&path).unwrap();
        assert!(reopened.last_upgrade().is_none());
        assert_eq!(reopened.version().unwrap(), crate::schema::DATABASE_VERSION);
    }
}
