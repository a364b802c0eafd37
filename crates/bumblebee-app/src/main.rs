use anyhow::{Context, Result};
use bumblebee_core::{DaySummary, MutationRule, SimulationConfig, WorldState};
use clap::{Parser, ValueEnum};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "bumblebee-app",
    version,
    about = "Run one seeded bumblebee colony simulation and print its day summaries"
)]
struct Cli {
    /// JSON file holding a (partial) simulation configuration.
    #[arg(long, env = "BUMBLEBEE_CONFIG")]
    config: Option<PathBuf>,

    /// Output format for the per-day summaries.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[arg(long, env = "BUMBLEBEE_SEED")]
    seed: Option<u64>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    #[arg(long)]
    hives: Option<u32>,

    /// Bees per hive at setup, split evenly across castes.
    #[arg(long)]
    bees_per_hive: Option<u32>,

    /// Ticks per simulated day.
    #[arg(long)]
    daily_steps: Option<u32>,

    #[arg(long)]
    days: Option<u32>,

    /// Weight of own-hive against other-hive encounters.
    #[arg(long)]
    alpha: Option<f64>,

    /// Emphasis on the worker term of the forager/royal mutation rule.
    #[arg(long)]
    forager_royal_ratio: Option<f64>,

    /// Fraction of hive stock spent on new bees each day.
    #[arg(long)]
    growth_factor: Option<f64>,

    /// Relative spread of the daily flower budget; random in [0, 0.5) when omitted.
    #[arg(long)]
    resource_variability: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    run(config, cli.format)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();
}

fn build_config(cli: &Cli) -> Result<SimulationConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str::<SimulationConfig>(&raw)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => SimulationConfig::default(),
    };

    if let Some(seed) = cli.seed {
        config.rng_seed = Some(seed);
    }
    if let Some(width) = cli.width {
        config.width = width;
    }
    if let Some(height) = cli.height {
        config.height = height;
    }
    if let Some(hives) = cli.hives {
        config.num_hives = hives;
    }
    if let Some(bees) = cli.bees_per_hive {
        config.initial_bees_per_hive = bees;
    }
    if let Some(steps) = cli.daily_steps {
        config.daily_steps = steps;
    }
    if let Some(days) = cli.days {
        config.num_days = days;
    }
    if let Some(growth) = cli.growth_factor {
        config.growth_factor = growth;
    }
    if cli.resource_variability.is_some() {
        config.resource_variability = cli.resource_variability;
    }
    apply_mutation_overrides(&mut config.mutation, cli.alpha, cli.forager_royal_ratio);
    Ok(config)
}

fn apply_mutation_overrides(rule: &mut MutationRule, alpha: Option<f64>, ratio: Option<f64>) {
    match rule {
        MutationRule::ForagerRoyal {
            alpha: current_alpha,
            forager_royal_ratio,
        } => {
            if let Some(value) = alpha {
                *current_alpha = value;
            }
            if let Some(value) = ratio {
                *forager_royal_ratio = value;
            }
        }
        MutationRule::CasteWeights {
            alpha: current_alpha,
            ..
        } => {
            if let Some(value) = alpha {
                *current_alpha = value;
            }
            if ratio.is_some() {
                warn!("--forager-royal-ratio ignored by the caste_weights mutation rule");
            }
        }
    }
}

fn run(config: SimulationConfig, format: OutputFormat) -> Result<()> {
    let mut world = WorldState::new(config).context("failed to build world")?;
    info!(
        seed = ?world.config().rng_seed,
        days = world.config().num_days,
        daily_steps = world.config().daily_steps,
        resource_variability = world.resource_variability(),
        "Starting bumblebee simulation"
    );

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if format == OutputFormat::Text {
        writeln!(
            out,
            "{:>5} {:>8} {:>8} {:>7} {:>7} {:>11} {:>7} {:>7}",
            "day", "tick", "workers", "drones", "queens", "fertilized", "births", "deaths"
        )?;
    }

    while !world.is_finished() {
        let events = world.step().context("simulation step failed")?;
        if events.day_completed.is_none() {
            continue;
        }
        if let Some(summary) = world.history().last() {
            write_summary(&mut out, summary, format)?;
        }
    }
    out.flush()?;

    let census = world.census();
    info!(
        tick = census.tick.0,
        workers = census.totals.workers,
        drones = census.totals.drones,
        queens = census.totals.queens,
        fertilized_queens = census.fertilized_queens,
        "Simulation finished"
    );
    Ok(())
}

fn write_summary(out: &mut impl Write, summary: &DaySummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, summary).context("failed to encode day summary")?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            writeln!(
                out,
                "{:>5} {:>8} {:>8} {:>7} {:>7} {:>11} {:>7} {:>7}",
                summary.day,
                summary.tick.0,
                summary.totals.workers,
                summary.totals.drones,
                summary.totals.queens,
                summary.fertilized_queens,
                summary.counters.births,
                summary.counters.deaths(),
            )?;
        }
    }
    Ok(())
}
