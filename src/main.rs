use anyhow::{bail, Context, Result};
use std::env;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use receipts_db::{
    load_config, provision_fixture, spawn_upgrade, verify_upgrade, write_legacy_v15_fixture,
    write_receipts_csv, AppConfig, Database, Expectations, UpgradeReport, VerificationSummary,
};

const DEFAULT_CONFIG_FILE: &str = "receipts-db.toml";

const USAGE: &str = "usage: receipts-db <command> [config.toml]

commands:
  fixture <path>   write the v15 fixture database to <path>
  provision        copy the fixture over the live database
  upgrade          upgrade the live database and wait for completion
  verify           verify the live database against the v15 expectations
  check            provision, upgrade and verify (default)
  export           write each trip's receipts as CSV into its directory";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<()> {
    let command = args.get(1).map(String::as_str).unwrap_or("check");

    match command {
        "fixture" => match args.get(2) {
            Some(path) => run_fixture(Path::new(path)),
            None => bail!("{USAGE}"),
        },
        "provision" => run_provision(&load(args.get(2))?),
        "upgrade" => run_upgrade(&load(args.get(2))?).map(|_| ()),
        "verify" => run_verify(&load(args.get(2))?).map(|_| ()),
        "check" => run_check(&load(args.get(2))?),
        "export" => run_export(&load(args.get(2))?),
        "-h" | "--help" | "help" => {
            println!("{USAGE}");
            Ok(())
        }
        other => bail!("unknown command '{other}'\n\n{USAGE}"),
    }
}

fn load(path: Option<&String>) -> Result<AppConfig> {
    match path {
        Some(path) => load_config(path),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => load_config(DEFAULT_CONFIG_FILE),
        None => {
            info!("No config file given, using defaults");
            Ok(AppConfig::default())
        }
    }
}

fn run_fixture(path: &Path) -> Result<()> {
    write_legacy_v15_fixture(path)?;
    println!("✓ Wrote v15 fixture to {}", path.display());
    Ok(())
}

fn run_provision(config: &AppConfig) -> Result<()> {
    let fixture: PathBuf = config.fixture_path.clone();
    if !fixture.exists() {
        info!(path = %fixture.display(), "Fixture missing, generating it");
        write_legacy_v15_fixture(&fixture)?;
    }

    let provisioned = provision_fixture(&fixture, &config.database_path())?;
    println!(
        "✓ Provisioned {} ({} bytes, sha256 {})",
        provisioned.destination.display(),
        provisioned.bytes,
        provisioned.sha256
    );
    Ok(())
}

fn run_upgrade(config: &AppConfig) -> Result<UpgradeReport> {
    let handle = spawn_upgrade(&config.database_path())?;
    let report = handle.wait(config.upgrade_timeout())?;
    println!(
        "✓ Database at v{} (from v{}, {} steps, {:?})",
        report.to_version,
        report.from_version,
        report.steps_applied.len(),
        report.elapsed
    );
    Ok(report)
}

fn run_verify(config: &AppConfig) -> Result<VerificationSummary> {
    let db = Database::open_without_upgrade(&config.database_path())?;
    let ctx = config.format_context()?;
    let summary = verify_upgrade(&db, &Expectations::legacy_v15(), &ctx)?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    println!("✅ Upgrade verification PASSED");
    Ok(summary)
}

fn run_check(config: &AppConfig) -> Result<()> {
    run_provision(config)?;
    run_upgrade(config)?;
    run_verify(config)?;
    Ok(())
}

fn run_export(config: &AppConfig) -> Result<()> {
    let db = Database::open(&config.database_path())?;
    let settings = config.export_settings()?;
    let columns = db.csv_columns()?;

    for trip in db.trips()? {
        let receipts = db.receipts(&trip)?;
        fs::create_dir_all(&trip.directory)
            .with_context(|| format!("Failed to create {}", trip.directory.display()))?;

        let path = trip.directory.join(format!("{}.csv", trip.name));
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let written = write_receipts_csv(file, &trip, &receipts, &columns, &settings)?;
        println!("✓ {} ({} receipts) -> {}", trip.name, written, path.display());
    }
    Ok(())
}
