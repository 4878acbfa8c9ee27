//! Synthetic Transaction Dataset Generator
//!
//! Writes a credit-card-shaped CSV (`Time`, `V1..Vn`, `Amount`, `Class`) with a
//! configurable fraud rate, for exercising the pipeline without real data.

use anyhow::{ensure, Result};
use clap::Parser;
use csv::Writer;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tracing::info;

/// Seconds covered by the generated data (two days)
const SPAN_SECONDS: f64 = 172_800.0;

#[derive(Parser)]
#[command(name = "synth-dataset", about = "Generate an imbalanced synthetic fraud dataset")]
struct Args {
    /// Output CSV path
    #[arg(long, default_value = "synthetic_transactions.csv")]
    output: PathBuf,
    /// Number of transactions
    #[arg(long, default_value_t = 10_000)]
    rows: usize,
    /// Probability that a transaction is fraud
    #[arg(long, default_value_t = 0.002)]
    fraud_rate: f64,
    /// Number of anonymized components V1..Vn
    #[arg(long, default_value_t = 28)]
    components: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Row generator with a single seeded RNG
struct TransactionGenerator {
    rng: StdRng,
    components: usize,
}

impl TransactionGenerator {
    fn new(seed: u64, components: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            components,
        }
    }

    /// Standard normal draw (Box-Muller)
    fn normal(&mut self) -> f64 {
        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    fn legitimate(&mut self, time: f64) -> Vec<f64> {
        let mut row = vec![time];
        for _ in 0..self.components {
            let v = self.normal();
            row.push(v);
        }
        let amount = (self.normal() * 1.1 + 3.5).exp().min(25_000.0);
        row.push((amount * 100.0).round() / 100.0);
        row
    }

    fn suspicious(&mut self, time: f64) -> Vec<f64> {
        // pulled towards the early hours of the day
        let day = (time / 86_400.0).floor();
        let night = day * 86_400.0 + self.rng.gen_range(0.0..21_600.0);
        let time = if self.rng.gen_bool(0.6) { night } else { time };

        let mut row = vec![time];
        for i in 0..self.components {
            let shift = if i < 5 { -2.5 } else { 0.0 };
            let v = self.normal() * 1.5 + shift;
            row.push(v);
        }
        let amount = if self.rng.gen_bool(0.5) {
            self.rng.gen_range(0.0..10.0)
        } else {
            self.rng.gen_range(500.0..3_000.0)
        };
        row.push((amount * 100.0_f64).round() / 100.0);
        row
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("synth_dataset=info".parse()?),
        )
        .init();

    let args = Args::parse();
    ensure!(
        (0.0..=1.0).contains(&args.fraud_rate),
        "fraud rate {} is outside [0, 1]",
        args.fraud_rate
    );

    info!(
        rows = args.rows,
        fraud_rate = args.fraud_rate,
        components = args.components,
        seed = args.seed,
        "Generating synthetic dataset"
    );

    let mut generator = TransactionGenerator::new(args.seed, args.components);
    let mut writer = Writer::from_path(&args.output)?;

    let mut header = vec!["Time".to_string()];
    header.extend((1..=args.components).map(|i| format!("V{i}")));
    header.push("Amount".to_string());
    header.push("Class".to_string());
    writer.write_record(&header)?;

    let step = SPAN_SECONDS / args.rows.max(1) as f64;
    let mut fraud_count = 0usize;
    for i in 0..args.rows {
        let time = (i as f64 * step).floor();
        let fraud = generator.rng.gen_bool(args.fraud_rate);
        let mut row = if fraud {
            fraud_count += 1;
            generator.suspicious(time)
        } else {
            generator.legitimate(time)
        };
        row.push(if fraud { 1.0 } else { 0.0 });
        writer.write_record(row.iter().map(|v| v.to_string()))?;

        if (i + 1) % 50_000 == 0 {
            info!("Generated {}/{} rows ({} fraud)", i + 1, args.rows, fraud_count);
        }
    }
    writer.flush()?;

    info!(
        "Completed! Wrote {} rows ({} fraud) to {}",
        args.rows,
        fraud_count,
        args.output.display()
    );
    Ok(())
}
