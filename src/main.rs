//! Fraud Modeling Pipeline - Command Line Entry Point
//!
//! `prepare` splits and transforms a raw transaction CSV, `evaluate` scores a
//! predictions file, and `compare` ranks several evaluations side by side.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fraud_modeling_pipeline::{
    config::AppConfig,
    evaluation::{EvaluationEngine, EvaluationResult},
    features::FeaturePipeline,
    io,
    report::{ComparisonReporter, RankMetric},
    splitter::{split, verify_split},
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "config/config.toml";

#[derive(Parser)]
#[command(name = "fraud-pipeline", author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to config/config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a labeled CSV and write transformed partitions plus the fitted spec
    Prepare {
        /// Raw transaction CSV
        input: PathBuf,
        /// Directory receiving train/validation/test CSVs and JSON artefacts
        #[arg(long, default_value = "prepared")]
        out_dir: PathBuf,
        /// Override the configured split seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Evaluate a predictions CSV (truth, probability[, predicted])
    Evaluate {
        predictions: PathBuf,
        #[arg(long, default_value = "evaluation.json")]
        output: PathBuf,
        /// Override the configured decision threshold
        #[arg(long)]
        threshold: Option<f64>,
        /// Also evaluate every configured sweep threshold
        #[arg(long)]
        sweep: bool,
    },
    /// Rank several evaluation JSON files in one table
    Compare {
        /// Evaluation JSON files written by `evaluate`
        #[arg(required = true)]
        evaluations: Vec<PathBuf>,
        /// Model names, parallel to the files (defaults to file stems)
        #[arg(long, value_delimiter = ',')]
        names: Vec<String>,
        #[arg(long, default_value = "comparison.csv")]
        output: PathBuf,
        #[arg(long, default_value = "f1")]
        rank_by: RankMetric,
    },
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_from_path(path),
        None if Path::new(DEFAULT_CONFIG).exists() => AppConfig::load(),
        None => Ok(AppConfig::default()),
    }
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let level = &config.logging.level;
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("fraud_modeling_pipeline={level}").parse()?)
        .add_directive(format!("fraud_pipeline={level}").parse()?);

    if config.logging.format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_logging(&config)?;

    match cli.command {
        Commands::Prepare {
            input,
            out_dir,
            seed,
        } => prepare(&config, &input, &out_dir, seed),
        Commands::Evaluate {
            predictions,
            output,
            threshold,
            sweep,
        } => evaluate(&config, &predictions, &output, threshold, sweep),
        Commands::Compare {
            evaluations,
            names,
            output,
            rank_by,
        } => compare(&evaluations, names, &output, rank_by),
    }
}

fn prepare(config: &AppConfig, input: &Path, out_dir: &Path, seed: Option<u64>) -> Result<()> {
    let data = io::load_dataset_csv(input, &config.data.label_column)?;
    info!(
        rows = data.len(),
        columns = data.width(),
        fraud_pct = data.positive_pct(),
        "Loaded {}",
        input.display()
    );

    let seed = seed.unwrap_or(config.split.seed);
    let outcome = split(&data, config.split.proportions(), seed)?;
    let report = verify_split(&data, &outcome, config.split.tolerance_pp);
    if report.has_warnings() {
        warn!(
            warnings = report.warnings.len(),
            "Split class balance outside tolerance; see split_report.json"
        );
    }

    let pipeline = FeaturePipeline::new(config.data.clone(), config.features.clone());
    let fitted = pipeline.fit(&outcome.train)?;
    let spec = fitted
        .spec()
        .context("fitted pipeline carries no feature spec")?;

    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    for partition in outcome.partitions() {
        let transformed = fitted.transform(partition)?;
        let path = out_dir.join(format!("{}.csv", partition.role()));
        io::write_dataset_csv(&path, &transformed, &config.data.label_column)?;
        info!(
            role = %partition.role(),
            rows = transformed.len(),
            columns = transformed.width(),
            "Wrote {}",
            path.display()
        );
    }
    io::save_json(spec, out_dir.join("feature_spec.json"))?;
    io::save_json(&report, out_dir.join("split_report.json"))?;

    info!(
        features = spec.output_columns().len(),
        dropped = spec.dropped().len(),
        "Preparation complete"
    );
    Ok(())
}

fn evaluate(
    config: &AppConfig,
    predictions: &Path,
    output: &Path,
    threshold: Option<f64>,
    sweep: bool,
) -> Result<()> {
    let table = io::load_predictions_csv(predictions)?;
    let engine = EvaluationEngine::from_config(&config.evaluation)?;
    let cost = config.evaluation.cost_matrix()?;

    let result = engine.evaluate_output(
        &table.truth,
        table.predicted.as_ref(),
        &table.probabilities,
        threshold,
        cost.as_ref(),
    )?;
    log_result(&result);
    io::save_json(&result, output)?;

    if sweep {
        let results = engine.sweep(
            &table.truth,
            &table.probabilities,
            &config.evaluation.sweep_thresholds,
            cost.as_ref(),
        )?;
        for r in &results {
            info!(
                threshold = ?r.threshold,
                precision = r.metrics.precision,
                recall = r.metrics.recall,
                f1 = r.metrics.f1,
                cost = ?r.total_cost(),
                "Sweep point"
            );
        }
        if let Some(best) = EvaluationEngine::best_threshold(&results) {
            info!(threshold = ?best.threshold, "Best threshold");
        }
        let stem = output
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("evaluation");
        io::save_json(&results, output.with_file_name(format!("{stem}_sweep.json")))?;
    }
    Ok(())
}

fn log_result(result: &EvaluationResult) {
    let m = &result.metrics;
    info!(
        evaluation_id = %result.evaluation_id,
        rows = result.rows(),
        accuracy = m.accuracy,
        precision = m.precision,
        recall = m.recall,
        f1 = m.f1,
        mcc = m.mcc,
        pr_auc = ?m.pr_auc,
        roc_auc = ?m.roc_auc,
        "Evaluation"
    );
    for line in result.confusion.to_string().lines() {
        info!("{}", line);
    }
    if let Some(cost) = &result.cost {
        for line in cost.to_string().lines() {
            info!("{}", line);
        }
    }
}

fn compare(
    evaluations: &[PathBuf],
    names: Vec<String>,
    output: &Path,
    rank_by: RankMetric,
) -> Result<()> {
    let results = evaluations
        .iter()
        .map(|path| io::load_json::<EvaluationResult, _>(path))
        .collect::<Result<Vec<_>>>()?;
    let names = if names.is_empty() {
        evaluations
            .iter()
            .map(|p| {
                p.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| p.display().to_string())
            })
            .collect()
    } else {
        names
    };

    let table = ComparisonReporter::new()
        .compare(&results, &names)?
        .ranked_by(rank_by);
    table.log_summary(&format!("MODEL COMPARISON - ranked by {rank_by}"));
    io::write_comparison_csv(output, &table)?;
    info!("Comparison written to {}", output.display());
    Ok(())
}
