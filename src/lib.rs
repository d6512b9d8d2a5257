// Receipts Database - Core Library
// Schema versions, upgrade ladder, persistence and post-upgrade verification

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod export;
pub mod fixture;
pub mod format;
pub mod provision;
pub mod schema;
pub mod upgrade;
pub mod verify;

// Re-export commonly used types
pub use config::{load_config, AppConfig};
pub use db::{Database, NewDistance, NewReceipt, NewTrip};
pub use entities::{Category, Column, ColumnType, Distance, Keyed, PaymentMethod, Receipt, Trip};
pub use errors::{UpgradeError, VerificationError};
pub use export::{write_receipts_csv, ExportSettings};
pub use fixture::write_legacy_v15_fixture;
pub use format::{format_date, resolve_timezone, CurrencyCode, FormatContext, Locale, Price};
pub use provision::{provision_fixture, ProvisionedFile};
pub use schema::{DATABASE_NAME, DATABASE_VERSION, LEGACY_FIXTURE_VERSION};
pub use upgrade::{spawn_upgrade, upgrade, UpgradeHandle, UpgradeReport};
pub use verify::{assert_unique_uuids, verify_upgrade, Expectations, VerificationSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
