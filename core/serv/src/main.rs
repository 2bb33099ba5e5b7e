use anyhow::{Context, Result};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use structopt::{clap, StructOpt};

use agora_market::db::model::ListingItemContent;
use agora_market::{Config, ContentHash, MarketService, ReceivedMessage};

#[derive(StructOpt, Debug)]
#[structopt(global_setting = clap::AppSettings::ColoredHelp)]
#[structopt(about = clap::crate_description!())]
#[structopt(setting = clap::AppSettings::DeriveDisplayOrder)]
struct CliArgs {
    /// Market data dir, overrides AGORA_DATA_DIR
    #[structopt(short, long = "datadir")]
    #[structopt(set = clap::ArgSettings::Global)]
    data_dir: Option<PathBuf>,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt, Debug)]
enum Command {
    /// Processes received messages stored in a JSON file (one message or a list)
    Ingest { file: PathBuf },
    /// Stores a locally authored listing read from a JSON file
    Template { file: PathBuf },
    /// Shows a listing item with its actions and escrow state
    Item { hash: ContentHash },
    /// Recomputes the result of a proposal
    Tally {
        hash: ContentHash,
        /// Count votes up to this block, defaults to the end of the voting window
        #[structopt(long)]
        block: Option<i64>,
    },
}

impl CliArgs {
    fn market(&self) -> Result<MarketService> {
        let mut config = Config::from_env()?;
        if let Some(data_dir) = &self.data_dir {
            config.db.data_dir = data_dir.clone();
        }
        Ok(MarketService::from_config(Arc::new(config))?)
    }

    async fn run_command(self) -> Result<()> {
        let market = self.market()?;
        match self.command {
            Command::Ingest { file } => ingest(&market, &file).await,
            Command::Template { file } => {
                let content: ListingItemContent = read_json(&file)?;
                let template = market.create_template(content).await?;
                println!("{}", serde_json::to_string_pretty(&template)?);
                Ok(())
            }
            Command::Item { hash } => {
                let item = market.listing_item(&hash).await?;
                let actions = market.action_messages(&hash).await?;
                let escrow = market.escrow_state(&hash).await?;
                let output = json!({
                    "item": item,
                    "actions": actions,
                    "escrow": escrow,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
                Ok(())
            }
            Command::Tally { hash, block } => {
                let result = market.tally(&hash, block).await?;
                let output = json!({
                    "result": result,
                    "totalWeight": result.total_weight(),
                    "winner": result.winner().map(|winner| winner.proposal_option_id),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
                Ok(())
            }
        }
    }
}

async fn ingest(market: &MarketService, file: &Path) -> Result<()> {
    let value: serde_json::Value = read_json(file)?;
    let messages: Vec<ReceivedMessage> = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value)?,
        value => vec![serde_json::from_value(value)?],
    };
    log::info!("Queueing {} message(s) from {}.", messages.len(), file.display());

    let workers = market.start_workers();
    for message in messages {
        workers.submit(message).await?;
    }
    let stats = workers.finish().await?;
    println!(
        "processed: {}, duplicates: {}, failed: {}",
        stats.processed, stats.duplicates, stats.failed
    );
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(file: &Path) -> Result<T> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", file.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    CliArgs::from_args().run_command().await
}
