use super::*;
use crate::catalog::{dashboards, required_columns};
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::io::Write;

fn day(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

fn write_csv(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(body.as_bytes()).unwrap();
    path
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[test]
fn identifiers_must_be_plain() {
    assert!(validate_identifier("avail_auto_5g").is_ok());
    assert!(validate_identifier("_x1").is_ok());
    for bad in ["", "1col", "a-b", "a b", "x;drop table y", "\"quoted\"", "tbl.col"] {
        assert!(
            matches!(validate_identifier(bad), Err(DigestError::InvalidIdentifier(_))),
            "{bad}"
        );
    }
}

#[test]
fn fetch_query_selects_validated_columns() {
    let settings = SourceSettings::default();
    let query = fetch_query(&settings, &columns(&["da_5g", "g5_cdr"])).unwrap();
    assert!(query.starts_with("SELECT date_column::date AS kpi_date, nc_5g::text AS kpi_entity"));
    assert!(query.contains("da_5g::float8 AS da_5g, g5_cdr::float8 AS g5_cdr"));
    assert!(query.contains(
        "WHERE date_column >= (SELECT MAX(date_column)::date - make_interval(days => $1) FROM cluster_5g)"
    ));
    assert!(query.ends_with("ORDER BY date_column, nc_5g"));

    let bad = fetch_query(&settings, &columns(&["da_5g; --"]));
    assert!(matches!(bad, Err(DigestError::InvalidIdentifier(_))));

    let mut settings = SourceSettings::default();
    settings.table = "kpi data".to_string();
    assert!(fetch_query(&settings, &[]).is_err());
}

#[test]
fn csv_nulls_dates_and_window() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(
        &dir,
        "kpi.csv",
        "date_column,nc_5g,da_5g,g5_cdr\n\
         2024-01-20 00:00:00,B,0.99,NaN\n\
         2024-01-20,A,,0.001\n\
         2024-01-01,A,0.5,0.0\n\
         2024-01-14,A,null,NULL\n",
    );
    let settings = SourceSettings {
        fetch_days: 7,
        ..SourceSettings::default()
    };
    let records = read_csv(&path, &settings, &columns(&["da_5g", "g5_cdr", "traffic_5g"])).unwrap();

    // 2024-01-01 is outside [01-13, 01-20]
    assert_eq!(records.len(), 3);
    let order: Vec<_> = records
        .iter()
        .map(|r| (r.date, r.entity.clone()))
        .collect();
    assert_eq!(
        order,
        vec![
            (day(1, 14), Some("A".to_string())),
            (day(1, 20), Some("A".to_string())),
            (day(1, 20), Some("B".to_string())),
        ]
    );
    assert_eq!(records[0].value("da_5g"), None);
    assert_eq!(records[0].value("g5_cdr"), None);
    assert_eq!(records[1].value("da_5g"), None);
    assert_eq!(records[1].value("g5_cdr"), Some(0.001));
    assert_eq!(records[2].value("da_5g"), Some(0.99));
    assert_eq!(records[2].value("g5_cdr"), None);
    assert_eq!(records[2].value("traffic_5g"), None);
}

#[test]
fn csv_errors_name_the_problem() {
    let dir = tempfile::tempdir().unwrap();
    let settings = SourceSettings::default();

    let no_date = write_csv(&dir, "no_date.csv", "day,da_5g\n2024-01-01,1\n");
    assert!(matches!(
        read_csv(&no_date, &settings, &columns(&["da_5g"])),
        Err(DigestError::MissingColumn(column)) if column == "date_column"
    ));

    let bad_date = write_csv(&dir, "bad_date.csv", "date_column,da_5g\n2024-01-01,1\n01/02/2024,1\n");
    assert!(matches!(
        read_csv(&bad_date, &settings, &columns(&["da_5g"])),
        Err(DigestError::InvalidDate { line: 3, .. })
    ));

    assert!(matches!(
        read_csv(&dir.path().join("absent.csv"), &settings, &[]),
        Err(DigestError::Csv(_))
    ));
}

#[tokio::test]
async fn load_falls_back_to_csv_when_database_is_unusable() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, "fallback.csv", "date_column,nc_5g,da_5g\n2024-01-02,A,0.98\n");
    let settings = SourceSettings::default();
    let cols = columns(&["da_5g"]);

    let (records, origin) = load_records(&settings, &cols, Some("not a database url"), 1, Some(path.as_path()))
        .await
        .unwrap();
    assert_eq!(origin, Origin::Csv(path.clone()));
    assert_eq!(records.len(), 1);

    let (_, origin) = load_records(&settings, &cols, None, 1, Some(path.as_path())).await.unwrap();
    assert_eq!(origin, Origin::Csv(path.clone()));

    let missing = dir.path().join("missing.csv");
    assert!(load_records(&settings, &cols, Some("not a database url"), 1, Some(missing.as_path()))
        .await
        .is_err());
    assert!(matches!(
        load_records(&settings, &cols, None, 1, None).await,
        Err(DigestError::NoSource)
    ));
}

#[tokio::test]
async fn postgres_fetch_returns_trailing_window() -> anyhow::Result<()> {
    if env::var("KPI_INTEGRATION_TEST").ok().as_deref() != Some("1") {
        return Ok(());
    }
    let database_url = match env::var("KPI_TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => return Ok(()),
    };

    let schema = format!("kpi_digest_test_{}", std::process::id());
    let admin = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await?;
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {schema}"))
        .execute(&admin)
        .await?;

    let schema_name = schema.clone();
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .after_connect(move |conn, _meta| {
            let schema = schema_name.clone();
            Box::pin(async move {
                sqlx::query(&format!("SET search_path TO {schema}"))
                    .execute(conn)
                    .await?;
                Ok(())
            })
        })
        .connect(&database_url)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cluster_5g (
            date_column timestamp not null,
            nc_5g text not null,
            avail_auto_5g numeric null,
            da_5g real null
        )
        "#,
    )
    .execute(&pool)
    .await?;
    sqlx::query("TRUNCATE cluster_5g").execute(&pool).await?;
    sqlx::query(
        r#"
        INSERT INTO cluster_5g (date_column, nc_5g, avail_auto_5g, da_5g) VALUES
            ('2024-01-01 00:00', 'A', 0.99, 0.98),
            ('2024-01-10 00:00', 'B', 0.995, NULL),
            ('2024-01-10 00:00', 'A', 0.0, 0.97),
            ('2024-01-12 00:00', 'A', NULL, 0.96)
        "#,
    )
    .execute(&pool)
    .await?;

    let settings = SourceSettings {
        fetch_days: 5,
        ..SourceSettings::default()
    };
    let source = PgSource::new(pool, settings);
    let records = source.fetch(&columns(&["avail_auto_5g", "da_5g"])).await?;
    source.close().await;

    let keys: Vec<_> = records
        .iter()
        .map(|r| (r.date, r.entity.clone().unwrap_or_default()))
        .collect();
    assert_eq!(
        keys,
        vec![
            (day(1, 10), "A".to_string()),
            (day(1, 10), "B".to_string()),
            (day(1, 12), "A".to_string()),
        ]
    );
    assert_eq!(records[1].value("avail_auto_5g"), Some(0.995));
    assert_eq!(records[1].value("da_5g"), None);
    assert_eq!(records[2].value("avail_auto_5g"), None);

    // the whole catalog must be expressible as one query
    let all = required_columns(&dashboards());
    fetch_query(&SourceSettings::default(), &all)?;

    sqlx::query(&format!("DROP SCHEMA {schema} CASCADE"))
        .execute(&admin)
        .await?;
    Ok(())
}
