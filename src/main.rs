//! NICS Census - command line entry point.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use nics_census::charts::{research_charts, ChartSink, TextSummary};
use nics_census::config::{DEFAULT_CENSUS_PATH, DEFAULT_GUN_PATH, DEFAULT_TOP_N};
use nics_census::{run_analysis, AnalysisConfig};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Firearm background checks against U.S. Census data",
    long_about = "Cleans the NICS background check and Census state files, then answers:\n  \
                  1. checks per ethnicity\n  \
                  2. checks per education level\n  \
                  3. checks against poverty rate\n  \
                  4. states with the highest growth\n  \
                  5. the yearly trend"
)]
struct Args {
    /// Background check CSV (month, state, ..., totals)
    #[arg(long, default_value = DEFAULT_GUN_PATH)]
    gun: PathBuf,

    /// Census CSV (Fact, Fact Note, one column per state)
    #[arg(long, default_value = DEFAULT_CENSUS_PATH)]
    census: PathBuf,

    /// Early growth reference year; computed from monthly coverage if omitted
    #[arg(long, requires = "late_year")]
    early_year: Option<i32>,

    /// Late growth reference year; computed from monthly coverage if omitted
    #[arg(long, requires = "early_year")]
    late_year: Option<i32>,

    /// Number of states in the growth ranking
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    top: usize,

    /// Print the JSON report to stdout instead of text tables
    ///
    /// Disables all logging so stdout carries only JSON.
    #[arg(long)]
    json: bool,

    /// Also write the JSON report to this file
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn config(&self) -> AnalysisConfig {
        let config = AnalysisConfig::new(&self.gun, &self.census).with_top_n(self.top);
        match (self.early_year, self.late_year) {
            (Some(early), Some(late)) => config.with_reference_years(early, late),
            _ => config,
        }
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides `level`.
fn init_logging(level: &str, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.json);

    for path in [&args.gun, &args.census] {
        if !path.exists() {
            return Err(anyhow!("Input file not found: {}", path.display()));
        }
    }

    let report = run_analysis(&args.config()).context("analysis failed")?;

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "wrote report");
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.json {
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
        return Ok(());
    }

    let mut sink = TextSummary::new(out);
    for chart in research_charts(&report) {
        sink.chart(&chart)?;
    }

    let mut out = sink.into_inner();
    writeln!(out)?;
    writeln!(out, "Highest mean monthly checks (poverty outliers)")?;
    writeln!(out, "{}", "-".repeat(72))?;
    for point in &report.poverty.outliers {
        writeln!(
            out,
            "{:<40} {:>14.0} {:>15.1}%",
            point.state, point.totals_mean, point.poverty_percent
        )?;
    }
    if let Some(r) = report.poverty.pearson_r {
        writeln!(out, "Pearson r (poverty % vs mean checks): {r:.3}")?;
    }

    Ok(())
}
