use async_trait::async_trait;

use agora_persistence::executor::{do_with_transaction, DbExecutor};

use crate::db::dao::{listing_item, listing_item_template};
use crate::db::model::{ListingItemContent, ListingItemCreateRequest};
use crate::error::{Error, Result};
use crate::processor::{MessageProcessor, Outcome, ProcessedMessage};
use crate::protocol::validation::Validate;
use crate::protocol::MessagingData;

/// Assembles `MP_ITEM_ADD` messages into listing items, keyed by the hash of
/// their content.
#[derive(Clone)]
pub struct ListingItemMessageProcessor {
    db: DbExecutor,
}

impl ListingItemMessageProcessor {
    pub fn new(db: DbExecutor) -> Self {
        ListingItemMessageProcessor { db }
    }

    async fn find_existing(&self, request: &ListingItemCreateRequest) -> Result<ProcessedMessage> {
        let hash = request.hash.clone();
        do_with_transaction(&self.db.pool, "listing_item_find_existing", move |conn| {
            let item = listing_item::find_by_hash(conn, &hash)?
                .ok_or_else(|| Error::not_found("ListingItem", hash))?;
            Ok(ProcessedMessage::ListingItem {
                item,
                outcome: Outcome::MatchedExisting,
            })
        })
        .await
    }
}

#[async_trait]
impl MessageProcessor for ListingItemMessageProcessor {
    type Message = (MessagingData, ListingItemContent);

    async fn process(&self, (data, content): Self::Message) -> Result<ProcessedMessage> {
        content.validate()?;
        let hash = content.hash()?;

        let request = ListingItemCreateRequest {
            hash,
            seller: data.from.clone(),
            market: data.to.clone(),
            listing_item_template_id: None,
            posted_at: data.sent,
            received_at: data.received_at(),
            content,
        };
        let fallback = request.clone();

        let result = do_with_transaction(&self.db.pool, "listing_item_assemble", move |conn| {
            if let Some(mut item) = listing_item::find_by_hash(conn, &request.hash)? {
                if item.listing_item_template_id.is_none() {
                    if let Some(template_id) =
                        listing_item_template::find_id_by_hash(conn, &request.hash)?
                    {
                        item = listing_item::set_template(conn, item.id, template_id)?;
                    }
                }
                return Ok(ProcessedMessage::ListingItem {
                    item,
                    outcome: Outcome::MatchedExisting,
                });
            }

            let mut request = request;
            request.listing_item_template_id =
                listing_item_template::find_id_by_hash(conn, &request.hash)?;

            let item = listing_item::create(conn, &request)?;
            log::info!(
                "Assembled ListingItem [{}] from message [{}] sent by [{}].",
                item.hash,
                data.msgid,
                item.seller
            );
            Ok(ProcessedMessage::ListingItem {
                item,
                outcome: Outcome::AssembledNew,
            })
        })
        .await;

        match result {
            // Another writer stored the same content between our read and insert.
            Err(Error::AlreadyExists { .. }) => self.find_existing(&fallback).await,
            result => result,
        }
    }
}
