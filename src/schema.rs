// 📐 Shape Layer - table definitions per schema version
//
// Two shapes matter:
// - v15: the oldest layout we still upgrade from (trips keyed by name,
//   receipts pointing at trip and category by name, column kinds as text)
// - current: what a fresh install creates and what the upgrade ladder ends at

use crate::entities::category::DEFAULT_CATEGORIES;
use crate::entities::payment_method::DEFAULT_PAYMENT_METHODS;
use crate::entities::ColumnType;
use anyhow::{Context, Result};
use rusqlite::{params, Connection};

/// Version a fresh database is created at and every upgrade ends at
pub const DATABASE_VERSION: i64 = 19;

/// Oldest version the upgrade ladder accepts
pub const LEGACY_FIXTURE_VERSION: i64 = 15;

/// File name the persistence layer opens inside the files directory
pub const DATABASE_NAME: &str = "receipts.db";

/// Tables whose rows carry an `entity_uuid`
pub const KEYED_TABLES: &[&str] = &[
    "trips",
    "receipts",
    "categories",
    "paymentmethods",
    "csvcolumns",
    "pdfcolumns",
    "distance",
];

pub const DEFAULT_CSV_COLUMNS: &[ColumnType] = &[
    ColumnType::CategoryCode,
    ColumnType::Name,
    ColumnType::Price,
    ColumnType::Currency,
    ColumnType::Date,
];

pub const DEFAULT_PDF_COLUMNS: &[ColumnType] = &[
    ColumnType::Name,
    ColumnType::Price,
    ColumnType::Date,
    ColumnType::CategoryName,
    ColumnType::Reimbursable,
    ColumnType::Pictured,
];

// ============================================================================
// LEGACY v15
// ============================================================================

pub const LEGACY_V15_SCHEMA: &str = r#"
CREATE TABLE trips (
    name TEXT PRIMARY KEY,
    from_date INTEGER NOT NULL,
    to_date INTEGER NOT NULL,
    from_timezone TEXT,
    to_timezone TEXT,
    trips_comment TEXT DEFAULT '',
    trips_cost_center TEXT DEFAULT '',
    trips_default_currency TEXT
);

CREATE TABLE receipts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT,
    parent TEXT,
    name TEXT DEFAULT '',
    category TEXT,
    price TEXT DEFAULT '0',
    tax TEXT DEFAULT '0',
    rcpt_date INTEGER NOT NULL,
    timezone TEXT,
    comment TEXT DEFAULT '',
    expenseable BOOLEAN DEFAULT 1,
    isocode TEXT,
    paymentMethodKey INTEGER,
    fullpageimage BOOLEAN DEFAULT 0
);

CREATE TABLE categories (
    name TEXT PRIMARY KEY,
    code TEXT,
    breakdown BOOLEAN DEFAULT 1
);

CREATE TABLE paymentmethods (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    type TEXT
);

CREATE TABLE csvcolumns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    type TEXT
);

CREATE TABLE pdfcolumns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    type TEXT
);

CREATE TABLE distance (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    parent TEXT,
    distance TEXT,
    location TEXT,
    date INTEGER,
    timezone TEXT,
    comment TEXT DEFAULT '',
    rate TEXT,
    rate_currency TEXT
);

PRAGMA user_version = 15;
"#;

// ============================================================================
// CURRENT
// ============================================================================

const CURRENT_SCHEMA: &str = r#"
CREATE TABLE trips (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL,
    from_date INTEGER NOT NULL,
    to_date INTEGER NOT NULL,
    from_timezone TEXT,
    to_timezone TEXT,
    trips_comment TEXT DEFAULT '',
    trips_cost_center TEXT DEFAULT '',
    trips_default_currency TEXT,
    entity_uuid TEXT
);

CREATE TABLE receipts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT,
    name TEXT DEFAULT '',
    price TEXT DEFAULT '0',
    tax TEXT DEFAULT '0',
    rcpt_date INTEGER NOT NULL,
    timezone TEXT,
    comment TEXT DEFAULT '',
    expenseable BOOLEAN DEFAULT 1,
    isocode TEXT,
    paymentMethodKey INTEGER,
    fullpageimage BOOLEAN DEFAULT 0,
    parentKey INTEGER,
    category_id INTEGER,
    custom_order_id INTEGER DEFAULT 0,
    entity_uuid TEXT
);

CREATE TABLE categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL,
    code TEXT,
    breakdown BOOLEAN DEFAULT 1,
    custom_order_id INTEGER DEFAULT 0,
    entity_uuid TEXT
);

CREATE TABLE paymentmethods (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    type TEXT,
    custom_order_id INTEGER DEFAULT 0,
    entity_uuid TEXT
);

CREATE TABLE csvcolumns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    column_type INTEGER NOT NULL DEFAULT 0,
    custom_order_id INTEGER DEFAULT 0,
    entity_uuid TEXT
);

CREATE TABLE pdfcolumns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    column_type INTEGER NOT NULL DEFAULT 0,
    custom_order_id INTEGER DEFAULT 0,
    entity_uuid TEXT
);

CREATE TABLE distance (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    distance TEXT,
    location TEXT,
    date INTEGER,
    timezone TEXT,
    comment TEXT DEFAULT '',
    rate TEXT,
    rate_currency TEXT,
    parentKey INTEGER,
    entity_uuid TEXT
);
"#;

/// Create every table of the current version and seed the defaults.
///
/// Caller is expected to have checked the file is empty.
pub fn create_current_schema(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(CURRENT_SCHEMA)
        .context("Failed to create current schema")?;
    create_uuid_indexes(&tx)?;

    for (name, code) in DEFAULT_CATEGORIES {
        tx.execute(
            "INSERT INTO categories (name, code, entity_uuid) VALUES (?1, ?2, ?3)",
            params![name, code, new_uuid()],
        )?;
    }

    for method in DEFAULT_PAYMENT_METHODS {
        tx.execute(
            "INSERT INTO paymentmethods (type, entity_uuid) VALUES (?1, ?2)",
            params![method, new_uuid()],
        )?;
    }

    for (table, columns) in [("csvcolumns", DEFAULT_CSV_COLUMNS), ("pdfcolumns", DEFAULT_PDF_COLUMNS)] {
        for column_type in columns {
            tx.execute(
                &format!("INSERT INTO {table} (column_type, entity_uuid) VALUES (?1, ?2)"),
                params![column_type.id(), new_uuid()],
            )?;
        }
    }

    set_version(&tx, DATABASE_VERSION)?;
    tx.commit()?;

    Ok(())
}

/// One unique index per keyed table; NULLs (not yet back-filled) are allowed
pub fn create_uuid_indexes(conn: &Connection) -> Result<()> {
    for table in KEYED_TABLES {
        conn.execute(
            &format!("CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_uuid ON {table}(entity_uuid)"),
            [],
        )?;
    }
    Ok(())
}

pub fn new_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ============================================================================
// INTROSPECTION
// ============================================================================

pub fn read_version(conn: &Connection) -> Result<i64> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(version)
}

pub fn set_version(conn: &Connection, version: i64) -> Result<()> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|name| name == column))
}

/// Count of user tables; zero means a brand-new file
pub fn user_table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
