use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "kpi-digest",
    version,
    about = "Build the 5G/4G KPI monitoring chart digest from daily network KPI rows"
)]
pub struct Args {
    /// Trailing days shown on every chart (default: KPI_DAYS_BACK or 35).
    #[arg(long)]
    pub days_back: Option<u32>,
    /// Days fetched before the source's latest date (default: KPI_FETCH_DAYS or 35).
    #[arg(long)]
    pub fetch_days: Option<u32>,
    /// Nominal spacing in days between displayed points on strided charts.
    #[arg(long)]
    pub stride: Option<usize>,
    /// Read rows from this CSV export instead of the database.
    #[arg(long)]
    pub csv: Option<PathBuf>,
    /// Exact output path for the deck manifest.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Appended to slide titles, e.g. `WEEKLY`.
    #[arg(long)]
    pub title_suffix: Option<String>,
    /// Prepended to the generated file name.
    #[arg(long)]
    pub file_prefix: Option<String>,
    /// Last 7 days, titled and named as the weekly deck.
    #[arg(long, default_value_t = false)]
    pub weekly: bool,
}

pub const WEEKLY_DAYS: u32 = 7;

/// Run settings after CLI flags are layered over the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub days_back: u32,
    pub fetch_days: u32,
    pub stride: usize,
    pub csv: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub title_suffix: Option<String>,
    pub file_prefix: Option<String>,
}

impl Args {
    pub fn resolve(&self, config: &crate::config::Config) -> RunOptions {
        let (weekly_days, weekly_suffix, weekly_prefix) = if self.weekly {
            (Some(WEEKLY_DAYS), Some("WEEKLY".to_string()), Some("Weekly".to_string()))
        } else {
            (None, None, None)
        };
        RunOptions {
            days_back: self.days_back.or(weekly_days).unwrap_or(config.days_back),
            fetch_days: self
                .fetch_days
                .or(weekly_days)
                .unwrap_or(config.source.fetch_days),
            stride: self.stride.unwrap_or(config.stride),
            csv: self.csv.clone(),
            output: self.output.clone(),
            output_dir: self
                .output_dir
                .clone()
                .unwrap_or_else(|| config.output_dir.clone()),
            title_suffix: self
                .title_suffix
                .clone()
                .or(weekly_suffix)
                .or_else(|| config.title_suffix.clone()),
            file_prefix: self.file_prefix.clone().or(weekly_prefix),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn config() -> Config {
        Config::from_lookup(&|_| None).unwrap()
    }

    #[test]
    fn flags_override_config() {
        let args = Args::parse_from([
            "kpi-digest",
            "--days-back",
            "20",
            "--stride",
            "3",
            "--csv",
            "export.csv",
            "-o",
            "deck.json",
        ]);
        let run = args.resolve(&config());
        assert_eq!(run.days_back, 20);
        assert_eq!(run.fetch_days, 35);
        assert_eq!(run.stride, 3);
        assert_eq!(run.csv, Some(PathBuf::from("export.csv")));
        assert_eq!(run.output, Some(PathBuf::from("deck.json")));
        assert_eq!(run.title_suffix, None);
    }

    #[test]
    fn weekly_preset() {
        let run = Args::parse_from(["kpi-digest", "--weekly"]).resolve(&config());
        assert_eq!(run.days_back, 7);
        assert_eq!(run.fetch_days, 7);
        assert_eq!(run.title_suffix.as_deref(), Some("WEEKLY"));
        assert_eq!(run.file_prefix.as_deref(), Some("Weekly"));

        let run = Args::parse_from(["kpi-digest", "--weekly", "--days-back", "10"]).resolve(&config());
        assert_eq!(run.days_back, 10);
    }

    #[test]
    fn defaults_come_from_config() {
        let run = Args::default().resolve(&config());
        assert_eq!(run.days_back, 35);
        assert_eq!(run.stride, 2);
        assert_eq!(run.output_dir, PathBuf::from("."));
    }
}
