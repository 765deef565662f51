use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{Local, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;

mod analytics;
mod chart;
mod client;
mod dashboard;
mod error;
mod export;
mod models;
mod normalize;
mod report;
mod score;
mod series;

use chart::{resolve_hover, ChartLayout, ScreenPoint};
use client::{HistoryClient, DEFAULT_API_URL};
use dashboard::{ProgressSnapshot, ViewOptions};
use models::{Category, HistoryRecord, PerCategory, RangeWindow};

#[derive(Parser)]
#[command(name = "speech-progress")]
#[command(about = "Progress analytics for recorded speaking sessions", long_about = None)]
struct Cli {
    /// Base URL of the coaching API
    #[arg(long, env = "SPEECH_PROGRESS_API_URL", default_value = DEFAULT_API_URL, global = true)]
    api_url: String,
    /// Bearer token of the signed-in user
    #[arg(long, env = "SPEECH_PROGRESS_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,
    /// Read a saved history payload instead of calling the API
    #[arg(long, global = true)]
    history_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print averages, streak and highlights
    Summary {
        #[command(flatten)]
        view: ViewArgs,
        /// Print the full snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Render the progress chart as SVG
    Chart {
        #[command(flatten)]
        view: ViewArgs,
        #[arg(long, default_value = "progress-chart.svg")]
        out: PathBuf,
    },
    /// Show the chart point nearest to a canvas position
    Hover {
        #[command(flatten)]
        view: ViewArgs,
        #[arg(long)]
        x: f64,
        #[arg(long)]
        y: f64,
    },
    /// Export session scores as CSV
    Export {
        #[arg(long, value_enum, default_value_t = ExportScope::All)]
        scope: ExportScope,
        #[arg(long, value_enum, default_value_t = RangeWindow::Days30)]
        range: RangeWindow,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate a markdown progress report
    Report {
        #[command(flatten)]
        view: ViewArgs,
        #[arg(long, default_value = "progress-report.md")]
        out: PathBuf,
    },
}

#[derive(Args)]
struct ViewArgs {
    /// Time range in days
    #[arg(long, value_enum, default_value_t = RangeWindow::Days30)]
    range: RangeWindow,
    /// Smooth each series with a trailing 3-point average
    #[arg(long)]
    smooth: bool,
    /// Leave a category out of the chart (repeatable)
    #[arg(long, value_enum)]
    hide: Vec<Category>,
}

impl ViewArgs {
    fn options(&self) -> ViewOptions {
        let mut visibility = PerCategory::splat(true);
        for category in &self.hide {
            visibility[*category] = false;
        }
        ViewOptions {
            range: self.range,
            smoothing: self.smooth,
            visibility,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportScope {
    /// Every session, regardless of range
    All,
    /// Only sessions inside --range
    Filtered,
}

async fn load_history(cli: &Cli) -> anyhow::Result<Vec<HistoryRecord>> {
    if let Some(path) = &cli.history_file {
        return client::load_history_file(path)
            .with_context(|| format!("failed to read history from {}", path.display()));
    }

    let token = cli
        .token
        .as_deref()
        .context("SPEECH_PROGRESS_TOKEN must be set (or pass --history-file)")?;
    let client = HistoryClient::new(cli.api_url.as_str(), token);

    match client.fetch_history().await {
        Ok(history) => Ok(history),
        Err(err) if err.is_unauthenticated() => {
            bail!("session expired or token rejected; sign in again and refresh SPEECH_PROGRESS_TOKEN")
        }
        Err(err) => Err(err).context("failed to fetch history"),
    }
}

fn print_summary(snapshot: &ProgressSnapshot, options: &ViewOptions, zone: &Local) {
    if snapshot.is_empty() {
        println!("No sessions recorded yet.");
        return;
    }

    println!(
        "Sessions: {} total, {} in {}",
        snapshot.record_count,
        snapshot.filtered_count,
        options.range.label()
    );
    if snapshot.used_fallback {
        println!("(no sessions in range; averages cover all sessions)");
    }

    println!("Averages:");
    for (category, average) in snapshot.averages.iter() {
        println!("- {}: {}", category.label(), report::format_score(*average));
    }
    println!("Streak: {} day(s)", snapshot.streak_days);

    let insights = &snapshot.insights;
    if let Some(improvement) = insights.most_improved {
        println!(
            "Most improved: {} ({:+.1})",
            improvement.category.label(),
            improvement.delta
        );
    }
    if let Some(best) = &insights.best_session {
        println!(
            "Best session: #{} on {} ({:.1})",
            best.record_id,
            report::format_date(best.created_at, zone),
            best.score
        );
    }
    if let Some(hint) = insights.coaching_hint {
        println!("Hint ({}): {}", hint.keyword, hint.message);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let history = load_history(&cli).await?;
    info!("working with {} sessions", history.len());

    let now = Local::now();
    let layout = ChartLayout::default();

    match &cli.command {
        Commands::Summary { view, json } => {
            let options = view.options();
            let snapshot = ProgressSnapshot::compute(&history, &options, &now, layout);
            if *json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_summary(&snapshot, &options, &Local);
            }
        }
        Commands::Chart { view, out } => {
            let options = view.options();
            let snapshot = ProgressSnapshot::compute(&history, &options, &now, layout);
            std::fs::write(out, snapshot.chart.to_svg())
                .with_context(|| format!("failed to write {}", out.display()))?;
            if snapshot.chart.is_empty() {
                println!("No sessions in this range; wrote an empty chart to {}.", out.display());
            } else {
                println!("Chart written to {}.", out.display());
            }
        }
        Commands::Hover { view, x, y } => {
            let options = view.options();
            let snapshot = ProgressSnapshot::compute(&history, &options, &now, layout);
            let pointer = Some(ScreenPoint::new(*x, *y));
            match resolve_hover(&snapshot.series, layout, pointer, &Local) {
                Some(hit) => println!(
                    "{} (session #{}, {:.1}px away)",
                    hit.tooltip, hit.point.record_id, hit.distance
                ),
                None => println!("No data to hover."),
            }
        }
        Commands::Export { scope, range, out } => {
            let csv = match scope {
                ExportScope::All => export::export_csv(&history)?,
                ExportScope::Filtered => {
                    let filtered = analytics::filter_range(&history, *range, now.with_timezone(&Utc));
                    export::export_csv(filtered)?
                }
            };
            let out = out
                .clone()
                .unwrap_or_else(|| PathBuf::from(export::export_filename(&now)));
            std::fs::write(&out, csv)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("CSV written to {}.", out.display());
        }
        Commands::Report { view, out } => {
            let options = view.options();
            let snapshot = ProgressSnapshot::compute(&history, &options, &now, layout);
            let report = report::build_report(&snapshot, &options, &history, &Local);
            std::fs::write(out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
