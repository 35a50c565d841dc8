use super::SourceSettings;
use crate::error::{DigestError, Result};
use crate::sampling::RangeWindow;
use crate::telemetry::RawRecord;
use chrono::NaiveDate;
use std::path::Path;

const NULL_TOKENS: [&str; 4] = ["", "NaN", "null", "NULL"];

fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if NULL_TOKENS.contains(&trimmed) {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `YYYY-MM-DD`, optionally followed by a time part.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let day = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Reads a CSV export of the source table and keeps the same trailing window a database fetch
/// would: `settings.fetch_days` before the file's own latest date. Metric columns missing from
/// the header read as null.
pub fn read_csv(path: &Path, settings: &SourceSettings, columns: &[String]) -> Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_path(path)?;
    let headers = reader.headers()?.clone();
    let index_of = |name: &str| headers.iter().position(|header| header == name);

    let date_idx = index_of(&settings.date_column)
        .ok_or_else(|| DigestError::MissingColumn(settings.date_column.clone()))?;
    let entity_idx = index_of(&settings.entity_column);
    let metric_idx: Vec<(&String, Option<usize>)> =
        columns.iter().map(|column| (column, index_of(column))).collect();

    let absent: Vec<&str> = metric_idx
        .iter()
        .filter(|(_, idx)| idx.is_none())
        .map(|(column, _)| column.as_str())
        .collect();
    if !absent.is_empty() {
        tracing::warn!(path = %path.display(), columns = ?absent, "CSV is missing metric columns");
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let raw_date = row.get(date_idx).unwrap_or_default();
        let date = parse_date(raw_date).ok_or_else(|| DigestError::InvalidDate {
            value: raw_date.to_string(),
            line: row.position().map(|pos| pos.line()).unwrap_or_default(),
        })?;

        let mut record = RawRecord::new(date);
        record.entity = entity_idx
            .and_then(|idx| row.get(idx))
            .map(str::trim)
            .filter(|entity| !entity.is_empty())
            .map(str::to_string);
        for (column, idx) in &metric_idx {
            let value = idx.and_then(|idx| row.get(idx)).and_then(parse_value);
            record = record.with_value(column.as_str(), value);
        }
        records.push(record);
    }

    let total = records.len();
    if let Some(window) = RangeWindow::from_records(&records, settings.fetch_days) {
        records = window.clip_records(&records);
    }
    records.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.entity.cmp(&b.entity)));
    tracing::info!(
        path = %path.display(),
        rows = records.len(),
        dropped = total - records.len(),
        "loaded KPI rows from CSV"
    );
    Ok(records)
}
