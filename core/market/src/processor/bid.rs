use async_trait::async_trait;

use agora_persistence::executor::{do_with_transaction, ConnType, DbExecutor};

use crate::db::dao::{action_message, bid, listing_item};
use crate::db::model::{ActionType, Bid, BidCreateRequest, BidDataCreateRequest, BidStatus};
use crate::error::{Error, Result};
use crate::processor::{ensure_same_action, MessageProcessor, Outcome, ProcessedMessage};
use crate::protocol::validation::ValidationError;
use crate::protocol::ActionEnvelope;
use crate::translator::translate_action;

/// Handles `MPA_BID`, `MPA_ACCEPT`, `MPA_REJECT` and `MPA_CANCEL`.
///
/// A bid is created by its bidder. The seller accepts or rejects the latest
/// active bid of the receiving bidder, and a bidder can only cancel their own
/// active bid.
#[derive(Clone)]
pub struct BidMessageProcessor {
    db: DbExecutor,
}

impl BidMessageProcessor {
    pub fn new(db: DbExecutor) -> Self {
        BidMessageProcessor { db }
    }
}

#[async_trait]
impl MessageProcessor for BidMessageProcessor {
    type Message = ActionEnvelope;

    async fn process(&self, envelope: ActionEnvelope) -> Result<ProcessedMessage> {
        let msgid = envelope.data.msgid.clone();
        let action = envelope.action;

        let result = do_with_transaction(&self.db.pool, "bid_action_assemble", move |conn| {
            if let Some(action_message) = action_message::find_by_msgid(conn, &envelope.data.msgid)? {
                ensure_same_action(&action_message, envelope.action)?;
                return Ok(ProcessedMessage::Bid {
                    action_message,
                    bid: None,
                    outcome: Outcome::MatchedExisting,
                });
            }

            let listing_item_id = listing_item::find_id_by_hash(conn, &envelope.item)?
                .ok_or_else(|| Error::not_found("ListingItem", &envelope.item))?;

            let bid = apply_action(conn, listing_item_id, &envelope)?;
            let action_message =
                action_message::create(conn, &translate_action(&envelope, listing_item_id))?;

            log::info!(
                "{} [{}] on ListingItem [{}]: Bid [{}] of [{}] is {}.",
                envelope.action,
                envelope.data.msgid,
                envelope.item,
                bid.id,
                bid.bidder,
                bid.status
            );
            Ok(ProcessedMessage::Bid {
                action_message,
                bid: Some(bid),
                outcome: Outcome::AssembledNew,
            })
        })
        .await;

        match result {
            Err(Error::AlreadyExists { .. }) => {
                do_with_transaction(&self.db.pool, "bid_action_find_existing", move |conn| {
                    let action_message = action_message::find_by_msgid(conn, &msgid)?
                        .ok_or_else(|| Error::not_found("ActionMessage", msgid))?;
                    ensure_same_action(&action_message, action)?;
                    Ok(ProcessedMessage::Bid {
                        action_message,
                        bid: None,
                        outcome: Outcome::MatchedExisting,
                    })
                })
                .await
            }
            result => result,
        }
    }
}

fn apply_action(conn: &ConnType, listing_item_id: i32, envelope: &ActionEnvelope) -> Result<Bid> {
    let (bidder, status) = match envelope.action {
        ActionType::Bid => {
            return bid::create(
                conn,
                &BidCreateRequest {
                    bidder: envelope.data.from.clone(),
                    listing_item_id,
                    status: BidStatus::Active,
                    data: envelope
                        .objects
                        .iter()
                        .map(|object| BidDataCreateRequest {
                            data_id: object.data_id.clone(),
                            data_value: object.data_value.clone(),
                        })
                        .collect(),
                },
            );
        }
        ActionType::Accept => (&envelope.data.to, BidStatus::Accepted),
        ActionType::Reject => (&envelope.data.to, BidStatus::Rejected),
        ActionType::Cancel => (&envelope.data.from, BidStatus::Cancelled),
        action => {
            return Err(
                ValidationError::invalid("action", format!("{} is not a bid action", action)).into(),
            )
        }
    };

    let active = bid::find_latest(conn, listing_item_id, bidder, BidStatus::Active)?
        .ok_or_else(|| {
            Error::not_found(
                "Bid",
                format!("active bid of {} on ListingItem {}", bidder, envelope.item),
            )
        })?;
    bid::update_status(conn, active.id, status)
}
