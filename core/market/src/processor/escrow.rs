use async_trait::async_trait;
use serde::Serialize;

use agora_persistence::executor::{do_with_transaction, ConnType, DbExecutor};

use crate::db::dao::{action_message, bid, listing_item, payment_information};
use crate::db::model::{ActionType, BidStatus, EscrowType, ListingOwner};
use crate::error::{Error, Result};
use crate::processor::{ensure_same_action, MessageProcessor, Outcome, ProcessedMessage};
use crate::protocol::validation::ValidationError;
use crate::protocol::ActionEnvelope;
use crate::translator::translate_action;

const ESCROW_ACTIONS: [ActionType; 3] = [ActionType::Lock, ActionType::Refund, ActionType::Release];

/// Escrow of a listing item, as implied by the escrow actions recorded on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EscrowState {
    /// No escrow action was recorded yet.
    Open,
    Locked,
    Refunded,
    Released,
}

impl EscrowState {
    pub fn transition(self, action: ActionType) -> std::result::Result<EscrowState, ValidationError> {
        match (self, action) {
            (EscrowState::Open, ActionType::Lock) => Ok(EscrowState::Locked),
            (EscrowState::Locked, ActionType::Refund) => Ok(EscrowState::Refunded),
            (EscrowState::Locked, ActionType::Release) => Ok(EscrowState::Released),
            (state, action) => Err(ValidationError::InvalidEscrowTransition {
                state: state.to_string(),
                action,
            }),
        }
    }

    /// Replays escrow actions in the order they were recorded.
    pub fn replay(
        actions: impl IntoIterator<Item = ActionType>,
    ) -> std::result::Result<EscrowState, ValidationError> {
        actions
            .into_iter()
            .try_fold(EscrowState::Open, |state, action| state.transition(action))
    }

    pub fn is_final(self) -> bool {
        matches!(self, EscrowState::Refunded | EscrowState::Released)
    }
}

pub(crate) fn current_state(conn: &ConnType, listing_item_id: i32) -> Result<EscrowState> {
    let history = action_message::list_by_listing_item(conn, listing_item_id, &ESCROW_ACTIONS)?;
    Ok(EscrowState::replay(
        history.into_iter().map(|message| message.action),
    )?)
}

/// Handles `MPA_LOCK`, `MPA_REFUND` and `MPA_RELEASE`.
///
/// The item must carry an escrow and the action must be a valid step from
/// the current escrow state. Locking also needs a bid of the sender that the
/// seller accepted.
#[derive(Clone)]
pub struct EscrowMessageProcessor {
    db: DbExecutor,
}

impl EscrowMessageProcessor {
    pub fn new(db: DbExecutor) -> Self {
        EscrowMessageProcessor { db }
    }
}

#[async_trait]
impl MessageProcessor for EscrowMessageProcessor {
    type Message = ActionEnvelope;

    async fn process(&self, envelope: ActionEnvelope) -> Result<ProcessedMessage> {
        let msgid = envelope.data.msgid.clone();
        let action = envelope.action;

        let result = do_with_transaction(&self.db.pool, "escrow_action_assemble", move |conn| {
            if let Some(action_message) = action_message::find_by_msgid(conn, &envelope.data.msgid)? {
                ensure_same_action(&action_message, envelope.action)?;
                let state = current_state(conn, action_message.listing_item_id)?;
                return Ok(ProcessedMessage::Escrow {
                    action_message,
                    state,
                    outcome: Outcome::MatchedExisting,
                });
            }

            let listing_item_id = listing_item::find_id_by_hash(conn, &envelope.item)?
                .ok_or_else(|| Error::not_found("ListingItem", &envelope.item))?;

            let payment = payment_information::find_by_owner(conn, ListingOwner::Item(listing_item_id))?
                .ok_or_else(|| {
                    Error::not_found("PaymentInformation", format!("ListingItem {}", envelope.item))
                })?;
            if payment.escrow.escrow_type == EscrowType::Nop {
                return Err(ValidationError::invalid(
                    "item",
                    format!("ListingItem {} carries no escrow", envelope.item),
                )
                .into());
            }

            let from = current_state(conn, listing_item_id)?;
            let state = from.transition(envelope.action)?;

            if envelope.action == ActionType::Lock {
                bid::find_latest(conn, listing_item_id, &envelope.data.from, BidStatus::Accepted)?
                    .ok_or_else(|| {
                        Error::not_found(
                            "Bid",
                            format!(
                                "accepted bid of {} on ListingItem {}",
                                envelope.data.from, envelope.item
                            ),
                        )
                    })?;
            }

            let action_message =
                action_message::create(conn, &translate_action(&envelope, listing_item_id))?;
            log::info!(
                "{} [{}] on ListingItem [{}]: escrow {} -> {}.",
                envelope.action,
                envelope.data.msgid,
                envelope.item,
                from,
                state
            );
            Ok(ProcessedMessage::Escrow {
                action_message,
                state,
                outcome: Outcome::AssembledNew,
            })
        })
        .await;

        match result {
            Err(Error::AlreadyExists { .. }) => {
                do_with_transaction(&self.db.pool, "escrow_action_find_existing", move |conn| {
                    let action_message = action_message::find_by_msgid(conn, &msgid)?
                        .ok_or_else(|| Error::not_found("ActionMessage", msgid))?;
                    ensure_same_action(&action_message, action)?;
                    let state = current_state(conn, action_message.listing_item_id)?;
                    Ok(ProcessedMessage::Escrow {
                        action_message,
                        state,
                        outcome: Outcome::MatchedExisting,
                    })
                })
                .await
            }
            result => result,
        }
    }
}
