// 🪜 Upgrade Ladder - schema migrations from v15 to the current version
//
// Each rung moves the file exactly one version forward inside its own
// transaction, and bumps `user_version` in that same transaction. A crash
// between rungs leaves a consistent file at an intermediate version, and the
// next open resumes from there.

use crate::entities::receipt::{custom_order_id_for, day_bucket};
use crate::entities::ColumnType;
use crate::errors::UpgradeError;
use crate::schema::{
    create_current_schema, create_uuid_indexes, new_uuid, read_version, set_version,
    user_table_count, DATABASE_VERSION, KEYED_TABLES, LEGACY_FIXTURE_VERSION,
};
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeReport {
    pub from_version: i64,
    pub to_version: i64,
    /// (from, to) of every step applied, in order
    pub steps_applied: Vec<(i64, i64)>,
    /// True when an empty file got the current schema directly
    pub created_fresh: bool,
    pub elapsed: Duration,
}

impl UpgradeReport {
    pub fn was_noop(&self) -> bool {
        self.steps_applied.is_empty() && !self.created_fresh
    }
}

// ============================================================================
// LADDER
// ============================================================================

struct Migration {
    from: i64,
    description: &'static str,
    apply: fn(&Connection) -> Result<()>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        from: 15,
        description: "integer trip keys",
        apply: trips_get_integer_keys,
    },
    Migration {
        from: 16,
        description: "integer category keys",
        apply: categories_get_integer_keys,
    },
    Migration {
        from: 17,
        description: "custom ordering",
        apply: add_custom_ordering,
    },
    Migration {
        from: 18,
        description: "typed columns and entity uuids",
        apply: typed_columns_and_uuids,
    },
];

/// Bring the database behind `conn` to `DATABASE_VERSION`.
pub fn upgrade(conn: &Connection) -> Result<UpgradeReport, UpgradeError> {
    let started = Instant::now();
    let found = read_version(conn)?;

    if found == 0 {
        if user_table_count(conn)? > 0 {
            return Err(UpgradeError::Unversioned);
        }
        info!(version = DATABASE_VERSION, "Creating fresh database");
        create_current_schema(conn)?;
        return Ok(UpgradeReport {
            from_version: 0,
            to_version: DATABASE_VERSION,
            steps_applied: Vec::new(),
            created_fresh: true,
            elapsed: started.elapsed(),
        });
    }

    if !(LEGACY_FIXTURE_VERSION..=DATABASE_VERSION).contains(&found) {
        return Err(UpgradeError::UnsupportedVersion {
            found,
            oldest: LEGACY_FIXTURE_VERSION,
            current: DATABASE_VERSION,
        });
    }

    let mut steps_applied = Vec::new();
    for migration in MIGRATIONS.iter().filter(|m| m.from >= found) {
        let (from, to) = (migration.from, migration.from + 1);
        info!(from, to, step = migration.description, "Applying upgrade step");

        let tx = conn.unchecked_transaction()?;
        (migration.apply)(&tx)
            .and_then(|_| set_version(&tx, to))
            .map_err(|e| UpgradeError::Step {
                from,
                to,
                message: format!("{:#}", e),
            })?;
        tx.commit()?;

        steps_applied.push((from, to));
    }

    let to_version = read_version(conn)?;
    info!(
        from = found,
        to = to_version,
        steps = steps_applied.len(),
        "Database upgrade complete"
    );

    Ok(UpgradeReport {
        from_version: found,
        to_version,
        steps_applied,
        created_fresh: false,
        elapsed: started.elapsed(),
    })
}

// ============================================================================
// COMPLETION SIGNAL
// ============================================================================

/// Upgrade running on a worker thread. The worker reports exactly once.
pub struct UpgradeHandle {
    path: PathBuf,
    receiver: mpsc::Receiver<Result<UpgradeReport, UpgradeError>>,
    worker: Option<thread::JoinHandle<()>>,
}

/// Open `path` on a worker thread and upgrade it there.
pub fn spawn_upgrade(path: &Path) -> Result<UpgradeHandle> {
    let (sender, receiver) = mpsc::channel();
    let worker_path = path.to_path_buf();

    let worker = thread::Builder::new()
        .name("db-upgrade".to_string())
        .spawn(move || {
            let result = Connection::open(&worker_path)
                .map_err(UpgradeError::from)
                .and_then(|conn| upgrade(&conn));
            // Receiver may have given up waiting; nothing left to tell
            let _ = sender.send(result);
        })
        .context("Failed to start upgrade worker")?;

    Ok(UpgradeHandle {
        path: path.to_path_buf(),
        receiver,
        worker: Some(worker),
    })
}

impl UpgradeHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until the worker reports, or `timeout` elapses.
    pub fn wait(mut self, timeout: Duration) -> Result<UpgradeReport, UpgradeError> {
        let outcome = match self.receiver.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => return Err(UpgradeError::Timeout(timeout)),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(UpgradeError::WorkerLost),
        };

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                return Err(UpgradeError::WorkerLost);
            }
        }
        outcome
    }

    /// Non-blocking poll; `None` while the worker is still running
    pub fn try_result(&self) -> Option<Result<UpgradeReport, UpgradeError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(Err(UpgradeError::WorkerLost)),
        }
    }
}

// ============================================================================
// STEPS
// ============================================================================

/// v15 -> v16: trips keyed by integer id, children point at it
fn trips_get_integer_keys(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE trips_new (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL,
            from_date INTEGER NOT NULL,
            to_date INTEGER NOT NULL,
            from_timezone TEXT,
            to_timezone TEXT,
            trips_comment TEXT DEFAULT '',
            trips_cost_center TEXT DEFAULT '',
            trips_default_currency TEXT
        );
        INSERT INTO trips_new (name, from_date, to_date, from_timezone, to_timezone,
                               trips_comment, trips_cost_center, trips_default_currency)
            SELECT name, from_date, to_date, from_timezone, to_timezone,
                   COALESCE(trips_comment, ''), COALESCE(trips_cost_center, ''),
                   trips_default_currency
            FROM trips ORDER BY rowid;
        DROP TABLE trips;
        ALTER TABLE trips_new RENAME TO trips;",
    )
    .context("Failed to rebuild trips")?;

    for child in ["receipts", "distance"] {
        conn.execute_batch(&format!(
            "ALTER TABLE {child} ADD COLUMN parentKey INTEGER;
             UPDATE {child} SET parentKey = (SELECT id FROM trips WHERE trips.name = {child}.parent);
             ALTER TABLE {child} DROP COLUMN parent;"
        ))
        .with_context(|| format!("Failed to re-parent {child}"))?;

        let orphans: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {child} WHERE parentKey IS NULL"),
            [],
            |row| row.get(0),
        )?;
        if orphans > 0 {
            warn!(table = child, orphans, "Rows reference a trip that does not exist");
        }
    }

    Ok(())
}

/// v16 -> v17: categories keyed by integer id, receipts point at it
fn categories_get_integer_keys(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE categories_new (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL,
            code TEXT,
            breakdown BOOLEAN DEFAULT 1
        );
        INSERT INTO categories_new (name, code, breakdown)
            SELECT name, code, COALESCE(breakdown, 1) FROM categories ORDER BY rowid;
        DROP TABLE categories;
        ALTER TABLE categories_new RENAME TO categories;
        ALTER TABLE receipts ADD COLUMN category_id INTEGER;
        UPDATE receipts SET category_id =
            (SELECT id FROM categories WHERE categories.name = receipts.category);
        ALTER TABLE receipts DROP COLUMN category;",
    )
    .context("Failed to rebuild categories")?;

    Ok(())
}

/// v17 -> v18: user-orderable lists get `custom_order_id`
fn add_custom_ordering(conn: &Connection) -> Result<()> {
    for table in ["categories", "paymentmethods", "csvcolumns", "pdfcolumns", "receipts"] {
        conn.execute(
            &format!("ALTER TABLE {table} ADD COLUMN custom_order_id INTEGER DEFAULT 0"),
            [],
        )?;
    }

    // Receipts: day bucket * 1000 + rank within (trip, day), walked in date order
    let mut stmt = conn.prepare(
        "SELECT id, parentKey, rcpt_date FROM receipts ORDER BY parentKey, rcpt_date, id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<i64>>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut previous: Option<(Option<i64>, i64)> = None;
    let mut rank = 0;
    for (id, parent, date) in rows {
        let bucket = day_bucket(date);
        rank = match previous {
            Some((p, b)) if p == parent && b == bucket => rank + 1,
            _ => 0,
        };
        previous = Some((parent, bucket));

        conn.execute(
            "UPDATE receipts SET custom_order_id = ?1 WHERE id = ?2",
            params![
                custom_order_id_for(date, rank)
                    .with_context(|| format!("Receipt {id} cannot be ordered"))?,
                id
            ],
        )?;
        debug!(receipt = id, rank, "Assigned custom order id");
    }

    Ok(())
}

/// v18 -> v19: integer column types, uuid on every keyed row
fn typed_columns_and_uuids(conn: &Connection) -> Result<()> {
    for table in ["csvcolumns", "pdfcolumns"] {
        retype_columns(conn, table)?;
    }

    for table in KEYED_TABLES {
        conn.execute(&format!("ALTER TABLE {table} ADD COLUMN entity_uuid TEXT"), [])?;
        let filled = backfill_uuids(conn, table)?;
        debug!(table, filled, "Back-filled entity uuids");
    }
    create_uuid_indexes(conn)?;

    Ok(())
}

fn retype_columns(conn: &Connection, table: &str) -> Result<()> {
    let legacy: Vec<(i64, Option<String>, i64)> = {
        let mut stmt = conn.prepare(&format!(
            "SELECT id, type, COALESCE(custom_order_id, 0) FROM {table} ORDER BY id"
        ))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };

    conn.execute_batch(&format!(
        "DROP TABLE {table};
         CREATE TABLE {table} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            column_type INTEGER NOT NULL DEFAULT 0,
            custom_order_id INTEGER DEFAULT 0
         );"
    ))?;

    for (id, legacy_name, custom_order_id) in legacy {
        let name = legacy_name.unwrap_or_default();
        let column_type = ColumnType::from_legacy_name(&name).unwrap_or_else(|| {
            warn!(table, id, name = %name, "Unknown legacy column type, using blank");
            ColumnType::Blank
        });
        conn.execute(
            &format!("INSERT INTO {table} (id, column_type, custom_order_id) VALUES (?1, ?2, ?3)"),
            params![id, column_type.id(), custom_order_id],
        )?;
    }

    Ok(())
}

fn backfill_uuids(conn: &Connection, table: &str) -> Result<usize> {
    let ids: Vec<i64> = {
        let mut stmt = conn.prepare(&format!("SELECT id FROM {table} WHERE entity_uuid IS NULL"))?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };

    for id in &ids {
        conn.execute(
            &format!("UPDATE {table} SET entity_uuid = ?1 WHERE id = ?2"),
            params![new_uuid(), id],
        )?;
    }

    Ok(ids.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::write_legacy_v15_fixture;
    use crate::schema::{has_column, LEGACY_V15_SCHEMA};

    fn table_shape(conn: &Connection, table: &str) -> Vec<(String, String)> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})")).unwrap();
        stmt.query_map([], |row| Ok((row.get(1)?, row.get(2)?)))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_ladder_is_contiguous() {
        let froms: Vec<i64> = MIGRATIONS.iter().map(|m| m.from).collect();
        let expected: Vec<i64> = (LEGACY_FIXTURE_VERSION..DATABASE_VERSION).collect();
        assert_eq!(froms, expected);
    }

    #[test]
    fn test_fresh_file_gets_current_schema() {
        let conn = Connection::open_in_memory().unwrap();
        let report = upgrade(&conn).unwrap();

        assert!(report.created_fresh);
        assert_eq!(report.to_version, DATABASE_VERSION);
        assert_eq!(read_version(&conn).unwrap(), DATABASE_VERSION);
    }

    #[test]
    fn test_current_database_is_noop() {
        let conn = Connection::open_in_memory().unwrap();
        upgrade(&conn).unwrap();

        let again = upgrade(&conn).unwrap();
        assert!(again.was_noop());
        assert_eq!(again.from_version, DATABASE_VERSION);
    }

    #[test]
    fn test_upgraded_shape_matches_fresh_shape() {
        let dir = tempfile::tempdir().unwrap();
        let legacy_path = dir.path().join("legacy.db");
        write_legacy_v15_fixture(&legacy_path).unwrap();

        let upgraded = Connection::open(&legacy_path).unwrap();
        let report = upgrade(&upgraded).unwrap();
        assert_eq!(report.steps_applied, vec![(15, 16), (16, 17), (17, 18), (18, 19)]);

        let fresh = Connection::open_in_memory().unwrap();
        upgrade(&fresh).unwrap();

        for table in KEYED_TABLES {
            assert_eq!(
                table_shape(&upgraded, table),
                table_shape(&fresh, table),
                "shape of {} differs",
                table
            );
        }
    }

    #[test]
    fn test_receipts_are_reparented_and_ordered() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(LEGACY_V15_SCHEMA).unwrap();
        conn.execute_batch(
            "INSERT INTO trips (name, from_date, to_date) VALUES ('A', 0, 259200000);
             INSERT INTO categories (name, code) VALUES ('Dinner', 'DINN');
             INSERT INTO receipts (parent, name, category, rcpt_date) VALUES ('A', 'late', 'Dinner', 90000000);
             INSERT INTO receipts (parent, name, category, rcpt_date) VALUES ('A', 'early', 'Dinner', 1000);
             INSERT INTO receipts (parent, name, category, rcpt_date) VALUES ('A', 'early2', 'Dinner', 2000);
             INSERT INTO receipts (parent, name, category, rcpt_date) VALUES ('missing', 'orphan', 'Nope', 5);",
        )
        .unwrap();

        upgrade(&conn).unwrap();

        let mut stmt = conn
            .prepare("SELECT name, parentKey, category_id, custom_order_id FROM receipts ORDER BY id")
            .unwrap();
        let rows: Vec<(String, Option<i64>, Option<i64>, i64)> = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        // "late" lands on day 1, the others on day 0
        assert_eq!(rows[0], ("late".to_string(), Some(1), Some(1), 1000));
        assert_eq!(rows[1], ("early".to_string(), Some(1), Some(1), 0));
        assert_eq!(rows[2], ("early2".to_string(), Some(1), Some(1), 1));
        assert_eq!(rows[3], ("orphan".to_string(), None, None, 0));
        assert!(!has_column(&conn, "receipts", "parent").unwrap());
    }

    #[test]
    fn test_overfull_day_stops_the_ordering_step() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(LEGACY_V15_SCHEMA).unwrap();
        conn.execute_batch(
            "INSERT INTO trips (name, from_date, to_date) VALUES ('Busy', 0, 86400000);
             WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 1001)
             INSERT INTO receipts (parent, name, rcpt_date) SELECT 'Busy', 'r' || i, i FROM n;",
        )
        .unwrap();

        let err = upgrade(&conn).unwrap_err();
        match err {
            UpgradeError::Step { from, to, message } => {
                assert_eq!((from, to), (17, 18));
                assert!(message.contains("cannot be ordered"), "{}", message);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(read_version(&conn).unwrap(), 17);
        assert!(!has_column(&conn, "receipts", "custom_order_id").unwrap());
    }

    #[test]
    fn test_full_day_still_orders() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(LEGACY_V15_SCHEMA).unwrap();
        conn.execute_batch(
            "INSERT INTO trips (name, from_date, to_date) VALUES ('Busy', 0, 172800000);
             WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 1000)
             INSERT INTO receipts (parent, name, rcpt_date) SELECT 'Busy', 'r' || i, i FROM n;
             INSERT INTO receipts (parent, name, rcpt_date) VALUES ('Busy', 'tomorrow', 86400001);",
        )
        .unwrap();

        upgrade(&conn).unwrap();

        let keys: Vec<i64> = conn
            .prepare("SELECT custom_order_id FROM receipts ORDER BY rcpt_date")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(keys.len(), 1001);
        assert_eq!(keys[999], 999);
        assert_eq!(keys[1000], 1000);
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_legacy_column_names_become_types() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(LEGACY_V15_SCHEMA).unwrap();
        conn.execute_batch(
            "INSERT INTO csvcolumns (type) VALUES ('Category Code');
             INSERT INTO csvcolumns (type) VALUES ('Something Custom');
             INSERT INTO pdfcolumns (type) VALUES ('Pictured');",
        )
        .unwrap();

        upgrade(&conn).unwrap();

        let csv: Vec<i64> = conn
            .prepare("SELECT column_type FROM csvcolumns ORDER BY id")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        let pdf: i64 = conn
            .query_row("SELECT column_type FROM pdfcolumns", [], |r| r.get(0))
            .unwrap();

        assert_eq!(csv, vec![ColumnType::CategoryCode.id(), ColumnType::Blank.id()]);
        assert_eq!(pdf, ColumnType::Pictured.id());
    }

    #[test]
    fn test_every_row_gets_a_distinct_uuid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.db");
        write_legacy_v15_fixture(&path).unwrap();

        let conn = Connection::open(&path).unwrap();
        upgrade(&conn).unwrap();

        let mut total = 0i64;
        for table in KEYED_TABLES {
            let missing: i64 = conn
                .query_row(
                    &format!("SELECT COUNT(*) FROM {table} WHERE entity_uuid IS NULL"),
                    [],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(missing, 0, "{} has rows without uuid", table);
            total += conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get::<_, i64>(0))
                .unwrap();
        }

        let union = KEYED_TABLES
            .iter()
            .map(|t| format!("SELECT entity_uuid FROM {t}"))
            .collect::<Vec<_>>()
            .join(" UNION ");
        let distinct: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM ({union})"), [], |r| r.get(0))
            .unwrap();
        assert_eq!(distinct, total);
    }

    #[test]
    fn test_rejects_unsupported_versions() {
        let too_old = Connection::open_in_memory().unwrap();
        set_version(&too_old, 14).unwrap();
        assert!(matches!(
            upgrade(&too_old),
            Err(UpgradeError::UnsupportedVersion { found: 14, .. })
        ));

        let too_new = Connection::open_in_memory().unwrap();
        set_version(&too_new, DATABASE_VERSION + 1).unwrap();
        assert!(matches!(
            upgrade(&too_new),
            Err(UpgradeError::UnsupportedVersion { .. })
        ));

        let unversioned = Connection::open_in_memory().unwrap();
        unversioned.execute("CREATE TABLE stray (x INTEGER)", []).unwrap();
        assert!(matches!(upgrade(&unversioned), Err(UpgradeError::Unversioned)));
    }

    #[test]
    fn test_failed_step_rolls_back_to_previous_version() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(LEGACY_V15_SCHEMA).unwrap();
        // Two trips with the same name cannot get a UNIQUE name column in v16
        conn.execute_batch(
            "DROP TABLE trips;
             CREATE TABLE trips (name TEXT, from_date INTEGER, to_date INTEGER, from_timezone TEXT,
                                 to_timezone TEXT, trips_comment TEXT, trips_cost_center TEXT,
                                 trips_default_currency TEXT);
             INSERT INTO trips (name, from_date, to_date) VALUES ('Same', 0, 0);
             INSERT INTO trips (name, from_date, to_date) VALUES ('Same', 0, 0);",
        )
        .unwrap();

        let err = upgrade(&conn).unwrap_err();
        assert!(matches!(err, UpgradeError::Step { from: 15, to: 16, .. }));
        assert_eq!(read_version(&conn).unwrap(), 15);
        assert!(has_column(&conn, "receipts", "parent").unwrap());
    }

    #[test]
    fn test_spawned_upgrade_signals_completion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.db");
        write_legacy_v15_fixture(&path).unwrap();

        let handle = spawn_upgrade(&path).unwrap();
        assert_eq!(handle.path(), path.as_path());
        let report = handle.wait(Duration::from_secs(30)).unwrap();

        assert_eq!(report.from_version, LEGACY_FIXTURE_VERSION);
        assert_eq!(report.to_version, DATABASE_VERSION);
    }

    #[test]
    fn test_spawned_upgrade_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.db");
        {
            let conn = Connection::open(&path).unwrap();
            set_version(&conn, 3).unwrap();
        }

        let result = spawn_upgrade(&path).unwrap().wait(Duration::from_secs(30));
        assert!(matches!(result, Err(UpgradeError::UnsupportedVersion { found: 3, .. })));
    }

    #[test]
    fn test_wait_times_out_while_database_is_locked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.db");
        write_legacy_v15_fixture(&path).unwrap();

        let holder = Connection::open(&path).unwrap();
        holder.execute_batch("BEGIN EXCLUSIVE").unwrap();

        let handle = spawn_upgrade(&path).unwrap();
        assert!(handle.try_result().is_none());
        let result = handle.wait(Duration::from_millis(50));
        assert!(matches!(result, Err(UpgradeError::Timeout(t)) if t == Duration::from_millis(50)));

        holder.execute_batch("ROLLBACK").unwrap();
    }

    #[test]
    fn test_lock_released_lets_upgrade_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.db");
        write_legacy_v15_fixture(&path).unwrap();

        let holder = Connection::open(&path).unwrap();
        holder.execute_batch("BEGIN EXCLUSIVE").unwrap();
        let handle = spawn_upgrade(&path).unwrap();
        assert!(handle.try_result().is_none());
        holder.execute_batch("ROLLBACK").unwrap();

        let report = handle.wait(Duration::from_secs(30)).unwrap();
        assert_eq!(report.to_version, DATABASE_VERSION);
    }

    #[test]
    fn test_worker_that_dies_is_reported_lost() {
        let (sender, receiver) = mpsc::channel::<Result<UpgradeReport, UpgradeError>>();
        let worker = thread::spawn(move || {
            let _sender = sender;
            panic!("worker died before reporting");
        });
        let handle = UpgradeHandle {
            path: PathBuf::from("unused.db"),
            receiver,
            worker: Some(worker),
        };

        let result = handle.wait(Duration::from_secs(30));
        assert!(matches!(result, Err(UpgradeError::WorkerLost)));
    }
}
