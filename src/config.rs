use crate::export::ExportSettings;
use crate::format::{FormatContext, Locale};
use crate::schema::DATABASE_NAME;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_database_name() -> String {
    DATABASE_NAME.to_string()
}

fn default_files_dir() -> PathBuf {
    PathBuf::from("files")
}

fn default_fixture_path() -> PathBuf {
    PathBuf::from("resources/receipts_v15.db")
}

fn default_upgrade_timeout() -> u64 {
    30
}

fn default_locale() -> String {
    Locale::EnUs.as_str().to_string()
}

fn default_date_separator() -> String {
    "/".to_string()
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default = "default_database_name")]
    pub database_name: String,

    /// Directory the live database (and trip folders) live in
    #[serde(default = "default_files_dir")]
    pub files_dir: PathBuf,

    /// Legacy database copied into place by `provision`
    #[serde(default = "default_fixture_path")]
    pub fixture_path: PathBuf,

    /// How long to wait for the upgrade worker to report
    #[serde(default = "default_upgrade_timeout")]
    pub upgrade_timeout_secs: u64,

    #[serde(default = "default_locale")]
    pub locale: String,

    #[serde(default = "default_date_separator")]
    pub date_separator: String,

    /// Written into the "User ID" export column
    #[serde(default)]
    pub user_id: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_name: default_database_name(),
            files_dir: default_files_dir(),
            fixture_path: default_fixture_path(),
            upgrade_timeout_secs: default_upgrade_timeout(),
            locale: default_locale(),
            date_separator: default_date_separator(),
            user_id: String::new(),
        }
    }
}

impl AppConfig {
    pub fn database_path(&self) -> PathBuf {
        self.files_dir.join(&self.database_name)
    }

    pub fn upgrade_timeout(&self) -> Duration {
        Duration::from_secs(self.upgrade_timeout_secs)
    }

    pub fn format_context(&self) -> Result<FormatContext> {
        let locale: Locale = self.locale.parse()?;
        Ok(FormatContext::new(locale, &self.date_separator))
    }

    pub fn export_settings(&self) -> Result<ExportSettings> {
        Ok(ExportSettings {
            user_id: self.user_id.clone(),
            format: self.format_context()?,
        })
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref)
        .with_context(|| format!("Failed to read config file {:?}", path_ref))?;
    parse_config(&contents).with_context(|| format!("Failed to parse config file {:?}", path_ref))
}

pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).context("Invalid TOML")?;
    // Locale must be one format_date knows
    config.format_context()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.database_path(), PathBuf::from("files/receipts.db"));
        assert_eq!(config.upgrade_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = parse_config(
            r#"
            files_dir = "/data/app/files"
            database_name = "legacy.db"
            upgrade_timeout_secs = 5
            locale = "en-GB"
            date_separator = "-"
            user_id = "alex@example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.database_path(), PathBuf::from("/data/app/files/legacy.db"));
        assert_eq!(config.format_context().unwrap(), FormatContext::new(Locale::EnGb, "-"));
        assert_eq!(config.export_settings().unwrap().user_id, "alex@example.com");
    }

    #[test]
    fn test_rejects_unknown_locale() {
        assert!(parse_config("locale = \"xx-YY\"").is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(dir.path().join("nope.toml")).is_err());
    }
}
