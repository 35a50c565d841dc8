//! Raw KPI rows from Postgres or a CSV export.

mod csv_export;
mod postgres;

#[cfg(test)]
mod tests;

pub use csv_export::read_csv;
pub use postgres::{build_pool, fetch_query, PgSource};

use crate::error::{DigestError, Result};
use crate::telemetry::RawRecord;
use std::path::{Path, PathBuf};

/// Where the source rows live and how far back to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
    pub table: String,
    pub date_column: String,
    pub entity_column: String,
    /// Days before the table's latest date to fetch.
    pub fetch_days: u32,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            table: "cluster_5g".to_string(),
            date_column: "date_column".to_string(),
            entity_column: "nc_5g".to_string(),
            fetch_days: 35,
        }
    }
}

/// Accepts plain SQL identifiers only: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_identifier(name: &str) -> Result<&str> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(name)
    } else {
        Err(DigestError::InvalidIdentifier(name.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Postgres,
    Csv(PathBuf),
}

/// Fetches from Postgres when a database URL is configured, falling back to `csv_fallback`
/// (when it exists) if the database is unset or the fetch fails.
pub async fn load_records(
    settings: &SourceSettings,
    columns: &[String],
    database_url: Option<&str>,
    pool_size: u32,
    csv_fallback: Option<&Path>,
) -> Result<(Vec<RawRecord>, Origin)> {
    let fallback = csv_fallback.filter(|path| path.exists());

    let db_error = match database_url {
        Some(url) => match fetch_postgres(settings, columns, url, pool_size).await {
            Ok(records) => return Ok((records, Origin::Postgres)),
            Err(err) => err,
        },
        None => match fallback {
            Some(path) => {
                let records = read_csv(path, settings, columns)?;
                return Ok((records, Origin::Csv(path.to_path_buf())));
            }
            None => return Err(DigestError::NoSource),
        },
    };

    let Some(path) = fallback else {
        return Err(db_error);
    };
    tracing::warn!(
        error = %db_error,
        path = %path.display(),
        "database fetch failed; reading CSV fallback"
    );
    let records = read_csv(path, settings, columns)?;
    Ok((records, Origin::Csv(path.to_path_buf())))
}

async fn fetch_postgres(
    settings: &SourceSettings,
    columns: &[String],
    database_url: &str,
    pool_size: u32,
) -> Result<Vec<RawRecord>> {
    let pool = build_pool(database_url, pool_size).await?;
    let source = PgSource::new(pool, settings.clone());
    let records = source.fetch(columns).await;
    source.close().await;
    records
}
