use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;

use netforge::mnist::{DigitClassificationInput, DigitClassifier, MnistNetworkFactory};
use netforge::net::InMemoryNetworkStore;
use netforge::{NetworkLoader, RuntimeConfig, SavedNetworkRunner};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a digit network from MNIST CSV files and save it
    Train {
        /// Network id, defaults to NETFORGE_NETWORK_ID or "mnist"
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        train_csv: PathBuf,
        #[arg(long)]
        test_csv: PathBuf,
        /// Training time budget
        #[arg(long, default_value_t = 60)]
        seconds: u64,
        /// Start from a fresh network even if one is already saved under the id
        #[arg(short, long)]
        fresh: bool,
    },
    /// Classify a JSON pixel map ({"pixels": [[...], ...]})
    Classify {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        input: PathBuf,
    },
    /// Liveness check
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    netforge::init_logger();
    let args = Args::parse();
    let config = RuntimeConfig::from_env()?;

    match args.command {
        Command::Ping => println!("pong"),
        Command::Train {
            id,
            train_csv,
            test_csv,
            seconds,
            fresh,
        } => {
            let id = id.unwrap_or_else(|| config.network_id.clone());
            info!("=== Training network '{}' for {}s ===", id, seconds);

            let result = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
                let loader: Arc<dyn NetworkLoader> = if fresh {
                    Arc::new(InMemoryNetworkStore::new())
                } else {
                    config.loader()?
                };
                let factory = MnistNetworkFactory::new(loader, config.saver()?);
                let result = factory.create_network(
                    &id,
                    Duration::from_secs(seconds),
                    &train_csv,
                    &test_csv,
                )?;
                Ok(result)
            })
            .await??;

            println!("Outcome: {:?}", result.outcome);
            println!("Epochs: {}", result.total_epochs);
            println!("Initial score: {:.6}", result.initial_score);
            println!("Best score: {:.6}", result.best_model_score);
        }
        Command::Classify { id, input } => {
            let id = id.unwrap_or_else(|| config.network_id.clone());
            let json = tokio::fs::read_to_string(&input)
                .await
                .with_context(|| format!("Failed to read {:?}", input))?;
            let input: DigitClassificationInput = serde_json::from_str(&json)?;

            let start_time = Instant::now();
            let output = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
                let runner = SavedNetworkRunner::with_capacity(config.loader()?, config.cache_capacity);
                let classifier = DigitClassifier::new(id, Arc::new(runner));
                Ok(classifier.classify_digit(Some(&input))?)
            })
            .await??;
            info!("Classified in {:.2?}", start_time.elapsed());

            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
