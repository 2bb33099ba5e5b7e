use std::sync::Arc;
use thiserror::Error;

use agora_persistence::executor::{readonly_transaction, DbExecutor};

use crate::config::Config;
use crate::db::dao::{action_message, listing_item, ListingItemDao, ListingItemTemplateDao};
use crate::db::model::{ActionMessage, ListingItem, ListingItemContent, ListingItemTemplate, ProposalResult};
use crate::error::{Error, Result};
use crate::hash::ContentHash;
use crate::processor::escrow::current_state;
use crate::processor::{EscrowState, MessageRouter, ProcessedMessage};
use crate::protocol::ReceivedMessage;
use crate::tally::ProposalTally;
use crate::worker::Workers;

#[derive(Error, Debug)]
pub enum MarketInitError {
    #[error("Failed to open market database. Error: {0}.")]
    Database(#[from] agora_persistence::executor::Error),
    #[error("Failed to migrate market database. Error: {0}.")]
    Migration(#[from] anyhow::Error),
    #[error("Failed to initialize config. Error: {0}.")]
    Config(#[from] clap::Error),
}

/// Structure connecting all market objects.
pub struct MarketService {
    pub db: DbExecutor,
    pub router: Arc<MessageRouter>,
    pub tally: ProposalTally,
    config: Arc<Config>,
}

impl MarketService {
    pub fn new(db: &DbExecutor, config: Arc<Config>) -> std::result::Result<Self, MarketInitError> {
        crate::db::init(db)?;

        let router = MessageRouter::new(db, config.protocol.supported_versions());
        Ok(MarketService {
            db: db.clone(),
            router: Arc::new(router),
            tally: ProposalTally::new(db.clone()),
            config,
        })
    }

    pub fn from_config(config: Arc<Config>) -> std::result::Result<Self, MarketInitError> {
        let db = DbExecutor::from_data_dir(&config.db.data_dir, &config.db.db_name)?;
        log::info!(
            "Market database [{}] opened in {}.",
            config.db.db_name,
            config.db.data_dir.display()
        );
        MarketService::new(&db, config)
    }

    pub async fn process(&self, message: ReceivedMessage) -> Result<ProcessedMessage> {
        self.router.route(message).await
    }

    pub fn start_workers(&self) -> Workers {
        Workers::spawn(self.router.clone(), &self.config.worker)
    }

    pub async fn create_template(&self, content: ListingItemContent) -> Result<ListingItemTemplate> {
        let template = self
            .db
            .as_dao::<ListingItemTemplateDao>()
            .create(content)
            .await?;
        log::info!("Stored ListingItemTemplate [{}].", template.hash);
        Ok(template)
    }

    pub async fn listing_item(&self, hash: &ContentHash) -> Result<ListingItem> {
        self.db.as_dao::<ListingItemDao>().get_by_hash(hash).await
    }

    /// Bid, escrow and proposal actions recorded on the item, oldest first.
    pub async fn action_messages(&self, hash: &ContentHash) -> Result<Vec<ActionMessage>> {
        let hash = hash.clone();
        readonly_transaction(&self.db.pool, "market_action_messages", move |conn| {
            let item_id = listing_item::find_id_by_hash(conn, &hash)?
                .ok_or_else(|| Error::not_found("ListingItem", &hash))?;
            action_message::list_by_listing_item(conn, item_id, &[])
        })
        .await
    }

    pub async fn escrow_state(&self, hash: &ContentHash) -> Result<EscrowState> {
        let hash = hash.clone();
        readonly_transaction(&self.db.pool, "market_escrow_state", move |conn| {
            let item_id = listing_item::find_id_by_hash(conn, &hash)?
                .ok_or_else(|| Error::not_found("ListingItem", &hash))?;
            current_state(conn, item_id)
        })
        .await
    }

    pub async fn tally(&self, proposal_hash: &ContentHash, block: Option<i64>) -> Result<ProposalResult> {
        self.tally.recalculate(proposal_hash, block).await
    }
}
