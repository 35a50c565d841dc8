use crate::sampling::Stride;
use crate::source::SourceSettings;
use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

fn setup_config_path(get: &dyn Fn(&str) -> Option<String>) -> Option<PathBuf> {
    get("KPI_SETUP_CONFIG_PATH")
        .map(|path| path.trim().to_string())
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SetupConfigOverrides {
    #[serde(default)]
    database_url: Option<String>,
    #[serde(default)]
    kpi_source_table: Option<String>,
    #[serde(default)]
    kpi_fetch_days: Option<u32>,
    #[serde(default)]
    kpi_days_back: Option<u32>,
    #[serde(default)]
    kpi_stride: Option<usize>,
    #[serde(default)]
    kpi_csv_fallback: Option<String>,
    #[serde(default)]
    kpi_output_dir: Option<String>,
    #[serde(default)]
    kpi_title_suffix: Option<String>,
}

fn load_setup_config_overrides(path: &Path) -> Option<SetupConfigOverrides> {
    if !path.exists() {
        return None;
    }
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "kpi-digest failed to read setup config; using env defaults"
            );
            return None;
        }
    };
    let mut bytes = contents.into_bytes();
    match simd_json::serde::from_slice(&mut bytes) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "kpi-digest failed to parse setup config; using env defaults"
            );
            None
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Setup-file values fill in only what the environment left unset.
fn apply_setup_overrides(
    config: &mut Config,
    overrides: &SetupConfigOverrides,
    get: &dyn Fn(&str) -> Option<String>,
) {
    let env_allows = |key: &str| non_empty(get(key).as_deref()).is_none();

    if env_allows("KPI_SOURCE_TABLE") {
        if let Some(table) = non_empty(overrides.kpi_source_table.as_deref()) {
            config.source.table = table;
        }
    }
    if env_allows("KPI_FETCH_DAYS") {
        if let Some(days) = overrides.kpi_fetch_days.filter(|v| *v != 0) {
            config.source.fetch_days = days;
        }
    }
    if env_allows("KPI_DAYS_BACK") {
        if let Some(days) = overrides.kpi_days_back.filter(|v| *v != 0) {
            config.days_back = days;
        }
    }
    if env_allows("KPI_STRIDE") {
        if let Some(stride) = overrides.kpi_stride.filter(|v| *v != 0) {
            config.stride = stride;
        }
    }
    if env_allows("KPI_CSV_FALLBACK") {
        if let Some(path) = non_empty(overrides.kpi_csv_fallback.as_deref()) {
            config.csv_fallback = Some(PathBuf::from(path));
        }
    }
    if env_allows("KPI_OUTPUT_DIR") {
        if let Some(dir) = non_empty(overrides.kpi_output_dir.as_deref()) {
            config.output_dir = PathBuf::from(dir);
        }
    }
    if env_allows("KPI_TITLE_SUFFIX") {
        if let Some(suffix) = non_empty(overrides.kpi_title_suffix.as_deref()) {
            config.title_suffix = Some(suffix);
        }
    }
}

fn parse_var<T: FromStr>(
    get: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match non_empty(get(key).as_deref()) {
        Some(raw) => raw
            .parse::<T>()
            .ok()
            .with_context(|| format!("{key} must be a non-negative integer, got {raw:?}")),
        None => Ok(default),
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    /// `None` means CSV only.
    pub database_url: Option<String>,
    pub db_pool_size: u32,
    pub source: SourceSettings,
    pub days_back: u32,
    pub stride: usize,
    pub csv_fallback: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub title_suffix: Option<String>,
    pub otlp_endpoint: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(&|key| env::var(key).ok())
    }

    /// Builds the config from `get` (the process environment in production) plus the setup
    /// file it names.
    pub fn from_lookup(get: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let setup_overrides = setup_config_path(get)
            .as_deref()
            .and_then(load_setup_config_overrides);

        let database_url = non_empty(get("KPI_DATABASE_URL").as_deref())
            .or_else(|| non_empty(get("DATABASE_URL").as_deref()))
            .or_else(|| {
                setup_overrides
                    .as_ref()
                    .and_then(|ov| non_empty(ov.database_url.as_deref()))
            })
            .map(normalize_database_url);

        let defaults = SourceSettings::default();
        let source = SourceSettings {
            table: non_empty(get("KPI_SOURCE_TABLE").as_deref()).unwrap_or(defaults.table),
            date_column: non_empty(get("KPI_DATE_COLUMN").as_deref())
                .unwrap_or(defaults.date_column),
            entity_column: non_empty(get("KPI_ENTITY_COLUMN").as_deref())
                .unwrap_or(defaults.entity_column),
            fetch_days: parse_var(get, "KPI_FETCH_DAYS", defaults.fetch_days)?,
        };

        let mut config = Self {
            database_url,
            db_pool_size: parse_var(get, "KPI_DB_POOL_SIZE", 4)?,
            source,
            days_back: parse_var(get, "KPI_DAYS_BACK", 35)?,
            stride: parse_var(get, "KPI_STRIDE", Stride::default().days())?,
            csv_fallback: non_empty(get("KPI_CSV_FALLBACK").as_deref()).map(PathBuf::from),
            output_dir: non_empty(get("KPI_OUTPUT_DIR").as_deref())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            title_suffix: non_empty(get("KPI_TITLE_SUFFIX").as_deref()),
            otlp_endpoint: non_empty(get("OTEL_EXPORTER_OTLP_ENDPOINT").as_deref()),
        };

        if let Some(overrides) = setup_overrides.as_ref() {
            apply_setup_overrides(&mut config, overrides, get);
        }

        Ok(config)
    }

    pub fn stride(&self) -> Stride {
        Stride::new(self.stride)
    }
}

fn normalize_database_url(url: String) -> String {
    if let Some(stripped) = url.strip_prefix("postgresql+psycopg://") {
        return format!("postgresql://{stripped}");
    }
    if let Some(stripped) = url.strip_prefix("postgresql+psycopg2://") {
        return format!("postgresql://{stripped}");
    }
    if let Some(stripped) = url.strip_prefix("postgresql+asyncpg://") {
        return format!("postgresql://{stripped}");
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = Config::from_lookup(&lookup(&[])).unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.db_pool_size, 4);
        assert_eq!(config.source, SourceSettings::default());
        assert_eq!(config.days_back, 35);
        assert_eq!(config.stride().days(), 2);
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.csv_fallback, None);
    }

    #[test]
    fn driver_prefixes_are_normalized() {
        let config = Config::from_lookup(&lookup(&[(
            "DATABASE_URL",
            "postgresql+psycopg2://kpi:secret@db:5432/kpi",
        )]))
        .unwrap();
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgresql://kpi:secret@db:5432/kpi")
        );
        assert_eq!(
            normalize_database_url("postgres://x".to_string()),
            "postgres://x"
        );
    }

    #[test]
    fn kpi_url_wins_over_generic_url() {
        let config = Config::from_lookup(&lookup(&[
            ("DATABASE_URL", "postgres://generic"),
            ("KPI_DATABASE_URL", "postgres://kpi"),
        ]))
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://kpi"));
    }

    #[test]
    fn bad_numbers_are_reported() {
        let err = Config::from_lookup(&lookup(&[("KPI_STRIDE", "two")])).unwrap_err();
        assert!(err.to_string().contains("KPI_STRIDE"));
    }

    #[test]
    fn setup_file_fills_only_unset_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("setup.json");
        std::fs::write(
            &path,
            r#"{
                "database_url": "postgresql+asyncpg://setup/db",
                "kpi_source_table": "cluster_weekly",
                "kpi_days_back": 7,
                "kpi_stride": 3,
                "kpi_output_dir": "/tmp/decks",
                "kpi_title_suffix": "WEEKLY",
                "unrelated": true
            }"#,
        )
        .unwrap();
        let path = path.to_string_lossy().to_string();

        let config = Config::from_lookup(&lookup(&[
            ("KPI_SETUP_CONFIG_PATH", path.as_str()),
            ("KPI_STRIDE", "1"),
        ]))
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgresql://setup/db"));
        assert_eq!(config.source.table, "cluster_weekly");
        assert_eq!(config.days_back, 7);
        assert_eq!(config.stride, 1);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/decks"));
        assert_eq!(config.title_suffix.as_deref(), Some("WEEKLY"));
    }

    #[test]
    fn unreadable_setup_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let path = path.to_string_lossy().to_string();
        let config =
            Config::from_lookup(&lookup(&[("KPI_SETUP_CONFIG_PATH", path.as_str())])).unwrap();
        assert_eq!(config.source.table, "cluster_5g");
    }
}
