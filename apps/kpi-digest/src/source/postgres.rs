use super::{validate_identifier, SourceSettings};
use crate::error::Result;
use crate::telemetry::RawRecord;
use chrono::NaiveDate;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

const DATE_ALIAS: &str = "kpi_date";
const ENTITY_ALIAS: &str = "kpi_entity";

pub async fn build_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Trailing-window query over `settings.table`. `$1` is the number of days before the table's
/// latest date. Every identifier is validated before it is interpolated.
pub fn fetch_query(settings: &SourceSettings, columns: &[String]) -> Result<String> {
    let table = validate_identifier(&settings.table)?;
    let date = validate_identifier(&settings.date_column)?;
    let entity = validate_identifier(&settings.entity_column)?;

    let mut select = vec![
        format!("{date}::date AS {DATE_ALIAS}"),
        format!("{entity}::text AS {ENTITY_ALIAS}"),
    ];
    for column in columns {
        let column = validate_identifier(column)?;
        select.push(format!("{column}::float8 AS {column}"));
    }

    Ok(format!(
        "SELECT {} FROM {table} \
         WHERE {date} >= (SELECT MAX({date})::date - make_interval(days => $1) FROM {table}) \
         ORDER BY {date}, {entity}",
        select.join(", ")
    ))
}

pub struct PgSource {
    pool: PgPool,
    settings: SourceSettings,
}

impl PgSource {
    pub fn new(pool: PgPool, settings: SourceSettings) -> Self {
        Self { pool, settings }
    }

    pub async fn fetch(&self, columns: &[String]) -> Result<Vec<RawRecord>> {
        let query = fetch_query(&self.settings, columns)?;
        let days = i32::try_from(self.settings.fetch_days).unwrap_or(i32::MAX);
        let started = std::time::Instant::now();
        let rows = sqlx::query(&query).bind(days).fetch_all(&self.pool).await?;

        let records = rows
            .iter()
            .map(|row| decode_row(row, columns))
            .collect::<Result<Vec<_>>>()?;
        tracing::info!(
            table = %self.settings.table,
            rows = records.len(),
            fetch_days = self.settings.fetch_days,
            millis = started.elapsed().as_millis() as u64,
            "fetched KPI rows"
        );
        Ok(records)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn decode_row(row: &PgRow, columns: &[String]) -> Result<RawRecord> {
    let date = row.try_get::<NaiveDate, _>(DATE_ALIAS)?;
    let mut record = RawRecord::new(date);
    record.entity = row.try_get::<Option<String>, _>(ENTITY_ALIAS)?;
    for column in columns {
        let value = row.try_get::<Option<f64>, _>(column.as_str())?;
        record = record.with_value(column.as_str(), value);
    }
    Ok(record)
}
