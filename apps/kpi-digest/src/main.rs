use anyhow::{Context, Result};
use clap::Parser;
use kpi_digest::catalog::{dashboards, required_columns};
use kpi_digest::cli::Args;
use kpi_digest::config::Config;
use kpi_digest::deck::DeckManifest;
use kpi_digest::digest::{build_digest, DigestOptions};
use kpi_digest::sampling::Stride;
use kpi_digest::source::{load_records, read_csv, Origin, SourceSettings};

fn init_tracing(config: &Config) -> Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime::Tokio, trace::Config as OTelTraceConfig, Resource};
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,kpi_digest=info".into());
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    if let Some(endpoint) = &config.otlp_endpoint {
        let endpoint = normalize_otlp_http_endpoint(endpoint);
        let exporter = opentelemetry_otlp::new_exporter()
            .http()
            .with_endpoint(endpoint);
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(exporter)
            .with_trace_config(OTelTraceConfig::default().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "kpi-digest"),
            ])))
            .install_batch(Tokio)?;

        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}

fn normalize_otlp_http_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.contains("/v1/traces") {
        return trimmed.to_string();
    }
    format!("{}/v1/traces", trimmed.trim_end_matches('/'))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_env()?;
    init_tracing(&config)?;

    let run = args.resolve(&config);
    let settings = SourceSettings {
        fetch_days: run.fetch_days,
        ..config.source.clone()
    };
    let catalog = dashboards();
    let columns = required_columns(&catalog);

    let (records, origin) = match &run.csv {
        Some(path) => {
            let records = read_csv(path, &settings, &columns)
                .with_context(|| format!("failed to load {}", path.display()))?;
            (records, Origin::Csv(path.clone()))
        }
        None => load_records(
            &settings,
            &columns,
            config.database_url.as_deref(),
            config.db_pool_size,
            config.csv_fallback.as_deref(),
        )
        .await
        .context("failed to load KPI rows")?,
    };
    tracing::info!(records = records.len(), origin = ?origin, "source loaded");

    let options = DigestOptions {
        days_back: run.days_back,
        stride: Stride::new(run.stride),
    };
    let digest = build_digest(&records, &catalog, &options);

    let deck = DeckManifest::from_digest(
        digest,
        run.title_suffix.as_deref(),
        chrono::Local::now().naive_local(),
    );
    let path = run.output.clone().unwrap_or_else(|| {
        deck.default_path(&run.output_dir, run.file_prefix.as_deref())
    });
    deck.write(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;

    println!("{}", path.display());
    opentelemetry::global::shutdown_tracer_provider();
    Ok(())
}
