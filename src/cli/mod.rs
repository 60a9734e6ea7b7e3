//! thyroid-bench CLI Module
//!
//! Command-line interface for preparing artifacts, tuning one model family,
//! running the full benchmark and rendering saved metrics.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::config::BenchConfig;
use crate::data::{load_csv, Artifacts};
use crate::evaluation::{Metric, MetricsReport};
use crate::pipeline::{clear_outputs, metrics_path, Benchmark, BenchmarkReport, ModelPipeline};
use crate::training::ModelFamily;
use crate::tuning::show_best;

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_fail(msg: &str) {
    println!("  {} {}", "✗".red(), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "thyroid-bench")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Tune, fit and compare six classifiers on thyroid cancer recurrence")]
#[command(long_about = None)]
pub struct Cli {
    /// Benchmark configuration (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Split the raw dataset, plan the folds and save the shared artifacts
    Prepare {
        /// Raw dataset (CSV with header)
        #[arg(short, long)]
        data: PathBuf,

        /// Outcome column; defaults to the configured target column
        #[arg(short, long)]
        target: Option<String>,

        /// Artifact directory
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Tune, fit and evaluate one model family
    Tune {
        /// Artifact directory written by `prepare`
        #[arg(short, long)]
        artifacts: PathBuf,

        /// Model family (neural_network, gradient_boosting, svm,
        /// logistic_regression, knn, random_forest)
        #[arg(short, long)]
        model: ModelFamily,

        /// Output directory for the metrics
        #[arg(short, long)]
        out: PathBuf,

        /// Grid points to list after tuning
        #[arg(long, default_value = "5")]
        top: usize,
    },

    /// Run every configured model family and write the comparison
    Benchmark {
        /// Artifact directory written by `prepare`
        #[arg(short, long)]
        artifacts: PathBuf,

        /// Output directory for the metrics
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Render metric files written by `tune` or `benchmark`
    Report {
        /// Directory holding `<model>_metrics.csv` files
        #[arg(short, long)]
        out: PathBuf,
    },
}

/// Load the configuration file if one was given
pub fn load_config(path: Option<&Path>) -> anyhow::Result<BenchConfig> {
    Ok(match path {
        Some(path) => BenchConfig::load_from_file(path)?,
        None => BenchConfig::default(),
    })
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_prepare(
    config: &BenchConfig,
    data_path: &Path,
    target: Option<&str>,
    out: &Path,
) -> anyhow::Result<()> {
    section("Prepare");

    let target = target.unwrap_or(&config.target_column);
    step_run("Loading data");
    let dataset = load_csv(data_path, target, &config.positive_class)?;
    step_done(&format!(
        "{} rows × {} predictors, {} positive",
        dataset.n_rows(),
        dataset.predictors.n_cols(),
        dataset.n_positive()
    ));

    step_run("Splitting");
    let artifacts = Artifacts::prepare(&dataset, config)?;
    step_done(&format!(
        "{} train / {} test, {} folds",
        artifacts.split.train.n_rows(),
        artifacts.split.test.n_rows(),
        artifacts.folds.len()
    ));

    artifacts.save(out)?;
    step_ok(&format!("artifacts saved to {}", out.display()));
    println!();
    Ok(())
}

pub fn cmd_tune(
    config: &BenchConfig,
    artifacts_dir: &Path,
    family: ModelFamily,
    out: &Path,
    top: usize,
) -> anyhow::Result<()> {
    section(&format!("Tune · {}", family.display_name()));

    let artifacts = Arc::new(Artifacts::load(artifacts_dir)?);
    let metric = config.metric;
    let spec = config.model_spec(family)?;
    clear_outputs(out, family.name())?;

    step_run("Tuning");
    let start = Instant::now();
    let tuned = ModelPipeline::new(spec, artifacts).tune(&config.runner())?;
    step_done(&format!(
        "{} points in {:.2?}",
        tuned.tuning().candidates.len(),
        start.elapsed()
    ));

    println!();
    println!("  {:<44} {:>10}", muted("Grid point"), muted(metric.label()));
    println!("  {}", dim(&"─".repeat(56)));
    for candidate in show_best(tuned.tuning(), metric, top)? {
        let score = candidate.mean(metric).unwrap_or(f64::NAN);
        println!("  {:<44} {:>10.4}", candidate.point.to_string(), score);
    }

    step_run("Fitting final model");
    let start = Instant::now();
    let evaluated = tuned.select(metric)?.fit()?.evaluate()?;
    step_done(&format!("{:.2?}", start.elapsed()));
    let outputs = evaluated.write(out, config.save_tuning)?;

    println!();
    line_box_top();
    line_box_center(&family.display_name().white().bold().to_string());
    line_box_sep();
    line_box(&kv("best", &evaluated.best().point.to_string()));
    line_box(&kv(
        &format!("cv {}", metric.name()),
        &format!("{:.4}", evaluated.best().mean(metric).unwrap_or(f64::NAN)),
    ));
    line_box_sep();
    for (m, value) in evaluated.report().values() {
        line_box(&kv(&format!("{:<12}", m.label()), &format!("{:>6.1}%", value)));
    }
    line_box_bottom();
    step_ok(&format!("metrics written to {}", outputs.metrics.display()));
    println!();
    Ok(())
}

pub fn cmd_benchmark(config: &BenchConfig, artifacts_dir: &Path, out: &Path) -> anyhow::Result<()> {
    section("Benchmark");

    let artifacts = Arc::new(Artifacts::load(artifacts_dir)?);
    let benchmark = Benchmark::new(config.clone(), artifacts);

    let start = Instant::now();
    let report = benchmark.run(out)?;
    print_outcomes(&report);

    let reports: Vec<MetricsReport> = report.succeeded().map(|s| s.report.clone()).collect();
    print_table(&reports);

    if let Some(path) = &report.comparison {
        step_ok(&format!("comparison written to {}", path.display()));
    }
    println!("  {}", dim(&format!("total {:.2?}", start.elapsed())));
    println!();

    if report.n_failed() > 0 {
        anyhow::bail!("{} of {} pipelines failed", report.n_failed(), report.outcomes.len());
    }
    Ok(())
}

pub fn cmd_report(out: &Path) -> anyhow::Result<()> {
    section("Report");

    let mut reports = Vec::new();
    for family in ModelFamily::ALL {
        let path = metrics_path(out, family.name());
        if path.exists() {
            reports.push(MetricsReport::read_csv(&path, family.name())?);
        }
    }
    if reports.is_empty() {
        anyhow::bail!("no metric files found in {}", out.display());
    }

    print_table(&reports);
    Ok(())
}

fn print_outcomes(report: &BenchmarkReport) {
    println!();
    for (family, outcome) in &report.outcomes {
        match outcome {
            Ok(summary) => step_ok(&format!(
                "{:<22} {}",
                family.display_name(),
                dim(&format!("{:.2?}", summary.elapsed))
            )),
            Err(e) => step_fail(&format!("{:<22} {}", family.display_name(), e.to_string().red())),
        }
    }
}

/// One row per model, one column per metric, best value per column marked
fn print_table(reports: &[MetricsReport]) {
    println!();
    let header: String = Metric::ALL
        .iter()
        .map(|m| format!("{:>11}", m.label()))
        .collect();
    println!("  {:<20}{}", muted("Model"), muted(&header));
    println!("  {}", dim(&"─".repeat(20 + 11 * Metric::ALL.len())));

    let best: Vec<f64> = Metric::ALL
        .iter()
        .map(|&m| {
            reports
                .iter()
                .filter_map(|r| r.get(m))
                .fold(f64::NEG_INFINITY, f64::max)
        })
        .collect();

    for report in reports {
        let name = report
            .model
            .parse::<ModelFamily>()
            .map(|f| f.display_name().to_string())
            .unwrap_or_else(|_| report.model.clone());
        let cells: String = Metric::ALL
            .iter()
            .zip(&best)
            .map(|(&m, &top)| match report.get(m) {
                Some(v) if v == top => format!("{:>11}", format!("{:.1}", v)).green().to_string(),
                Some(v) => format!("{:>11.1}", v),
                None => format!("{:>11}", "-"),
            })
            .collect();
        println!("  {:<20}{}", name, cells);
    }
    println!("  {}", dim(&"─".repeat(20 + 11 * Metric::ALL.len())));
    println!();
}
