//! Turns validated marketplace messages into persisted aggregates.
//!
//! Every message ends either matched against something already stored
//! (redelivery, or a concurrent worker that got there first) or assembled
//! from scratch in a single transaction.
use async_trait::async_trait;
use metrics::counter;

use agora_persistence::executor::DbExecutor;

use crate::db::model::{ActionMessage, ActionType, Bid, FlaggedItem, ListingItem, Proposal, Vote};
use crate::error::Result;
use crate::protocol::validation::ValidationError;
use crate::protocol::{validate, ReceivedMessage, ValidatedMessage};

pub mod bid;
pub mod escrow;
pub mod listing_item;
pub mod proposal;

pub use bid::BidMessageProcessor;
pub use escrow::{EscrowMessageProcessor, EscrowState};
pub use listing_item::ListingItemMessageProcessor;
pub use proposal::{ProposalAction, ProposalMessageProcessor};

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// The message was seen before and nothing was written.
    MatchedExisting,
    AssembledNew,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProcessedMessage {
    ListingItem {
        item: ListingItem,
        outcome: Outcome,
    },
    /// `bid` is the bid created or moved by the action. It is unknown for
    /// redelivered messages.
    Bid {
        action_message: ActionMessage,
        bid: Option<Bid>,
        outcome: Outcome,
    },
    Escrow {
        action_message: ActionMessage,
        state: EscrowState,
        outcome: Outcome,
    },
    Proposal {
        proposal: Proposal,
        flagged: Option<FlaggedItem>,
        outcome: Outcome,
    },
    Vote {
        vote: Vote,
        proposal: Proposal,
        outcome: Outcome,
    },
}

impl ProcessedMessage {
    pub fn outcome(&self) -> Outcome {
        match self {
            ProcessedMessage::ListingItem { outcome, .. }
            | ProcessedMessage::Bid { outcome, .. }
            | ProcessedMessage::Escrow { outcome, .. }
            | ProcessedMessage::Proposal { outcome, .. }
            | ProcessedMessage::Vote { outcome, .. } => *outcome,
        }
    }
}

/// An action message found by `msgid` only counts as a redelivery when it
/// records the same action.
pub(crate) fn ensure_same_action(stored: &ActionMessage, action: ActionType) -> Result<()> {
    if stored.action != action {
        return Err(ValidationError::invalid(
            "msgid",
            format!(
                "already recorded as {} on ActionMessage [{}], received as {}",
                stored.action, stored.id, action
            ),
        )
        .into());
    }
    Ok(())
}

#[async_trait]
pub trait MessageProcessor {
    type Message: Send + 'static;

    async fn process(&self, message: Self::Message) -> Result<ProcessedMessage>;
}

/// Validates received messages and hands them to the processor for their
/// action.
pub struct MessageRouter {
    supported_versions: Vec<String>,
    listing_item: ListingItemMessageProcessor,
    bid: BidMessageProcessor,
    escrow: EscrowMessageProcessor,
    proposal: ProposalMessageProcessor,
}

impl MessageRouter {
    pub fn new(db: &DbExecutor, supported_versions: Vec<String>) -> Self {
        counter!("agora.messages.processed", 0);
        counter!("agora.messages.duplicates", 0);
        counter!("agora.messages.rejected", 0);
        counter!("agora.messages.failed", 0);

        MessageRouter {
            supported_versions,
            listing_item: ListingItemMessageProcessor::new(db.clone()),
            bid: BidMessageProcessor::new(db.clone()),
            escrow: EscrowMessageProcessor::new(db.clone()),
            proposal: ProposalMessageProcessor::new(db.clone()),
        }
    }

    pub async fn route(&self, received: ReceivedMessage) -> Result<ProcessedMessage> {
        let msgid = received.data.msgid.clone();

        let validated = match validate(received, &self.supported_versions) {
            Ok(validated) => validated,
            Err(e) => {
                counter!("agora.messages.rejected", 1);
                log::warn!("Rejected message [{}]. {}", msgid, e);
                return Err(e.into());
            }
        };
        let action = validated.action();
        log::debug!("Message [{}] {} validated.", msgid, action);

        let result = match validated {
            ValidatedMessage::ListingItemAdd { data, listing } => {
                self.listing_item.process((data, listing)).await
            }
            ValidatedMessage::BidAction(envelope) => self.bid.process(envelope).await,
            ValidatedMessage::EscrowAction(envelope) => self.escrow.process(envelope).await,
            ValidatedMessage::ProposalAdd { data, proposal } => {
                self.proposal
                    .process(ProposalAction::Add { data, proposal })
                    .await
            }
            ValidatedMessage::Vote { data, vote } => {
                self.proposal.process(ProposalAction::Vote { data, vote }).await
            }
        };

        match &result {
            Ok(processed) => {
                counter!("agora.messages.processed", 1);
                if processed.outcome() == Outcome::MatchedExisting {
                    counter!("agora.messages.duplicates", 1);
                }
                log::debug!(
                    "Message [{}] {} processed: {}.",
                    msgid,
                    action,
                    processed.outcome()
                );
            }
            Err(e) => {
                counter!("agora.messages.failed", 1);
                log::warn!("Failed to process message [{}] {}. {}", msgid, action, e);
            }
        }
        result
    }
}
