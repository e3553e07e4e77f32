use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use shielded_mixer::PoolConfig;

mod scenario;

#[derive(Parser, Debug)]
#[command(name = "mixer-sim")]
#[command(about = "deposit / transfer / withdraw through an in-memory shielded mixer", long_about = None)]
struct Args {
    /// pool config (toml)
    #[arg(long, env = "MIXER_SIM_CONFIG")]
    config: Option<PathBuf>,

    /// override the tree depth from the config
    #[arg(long)]
    depth: Option<usize>,

    /// rng seed, same seed gives the same run
    #[arg(long, env = "MIXER_SIM_SEED", default_value_t = 42)]
    seed: u64,

    /// value alice deposits
    #[arg(long, default_value_t = 100)]
    deposit: u64,

    /// value alice pays bob, who withdraws it
    #[arg(long, default_value_t = 60)]
    pay: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mixer_sim=info,shielded_mixer=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PoolConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PoolConfig::default(),
    };
    if let Some(depth) = args.depth {
        config.tree_depth = depth;
    }
    config.validate().context("invalid pool config")?;

    info!("starting mixer-sim");
    info!(
        "depth {} ({} notes), root history {}, verify timeout {:?}",
        config.tree_depth,
        1u64 << config.tree_depth,
        config.root_history,
        config.verify_timeout()
    );

    let summary = scenario::run(config, args.seed, args.deposit, args.pay).await?;

    info!("final pool root {}", summary.root);
    info!(
        "pool holds {}, alice {}, bob {}, {} notes, {} spent",
        summary.pool_balance, summary.alice, summary.bob, summary.leaves, summary.spent
    );
    Ok(())
}
