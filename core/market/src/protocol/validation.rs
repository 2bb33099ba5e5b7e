use std::str::FromStr;

use crate::db::model::{
    ActionType, ListingItemContent, MessageEscrowCreateRequest, MessageInfoCreateRequest,
    MessageObjectCreateRequest,
};
use crate::hash::ContentHash;
use crate::protocol::{MessagingData, ProposalMessage, ReceivedMessage, VoteMessage};

/// Checks a request before anything is written to the database.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unknown action [{0}].")]
    UnknownAction(String),
    #[error("Message version [{0}] is not supported.")]
    UnsupportedVersion(String),
    #[error("{action} message without [{field}].")]
    MissingField {
        action: ActionType,
        field: &'static str,
    },
    #[error("Invalid [{field}]: {reason}.")]
    InvalidField { field: &'static str, reason: String },
    #[error("{action} not allowed in escrow state {state}.")]
    InvalidEscrowTransition { state: String, action: ActionType },
    #[error("Vote at block {block} outside of proposal voting window [{start}, {end}].")]
    VoteOutsideWindow { block: i64, start: i64, end: i64 },
    #[error("Proposal [{0}] already has votes, its options can't be replaced.")]
    ProposalHasVotes(String),
    #[error("Vote at block {block} is older than the current vote at block {current}.")]
    StaleVote { block: i64, current: i64 },
    #[error("Vote weights on Proposal [{0}] exceed the supported total.")]
    WeightOverflow(String),
}

impl ValidationError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Fields shared by all messages addressed at an existing listing item.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionEnvelope {
    pub data: MessagingData,
    pub action: ActionType,
    pub item: ContentHash,
    pub nonce: Option<String>,
    pub accepted: bool,
    pub info: Option<MessageInfoCreateRequest>,
    pub escrow: Option<MessageEscrowCreateRequest>,
    pub objects: Vec<MessageObjectCreateRequest>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ValidatedMessage {
    ListingItemAdd {
        data: MessagingData,
        listing: ListingItemContent,
    },
    /// `MPA_BID`, `MPA_ACCEPT`, `MPA_REJECT` or `MPA_CANCEL`.
    BidAction(ActionEnvelope),
    /// `MPA_LOCK`, `MPA_REFUND` or `MPA_RELEASE`. The escrow payload is present.
    EscrowAction(ActionEnvelope),
    ProposalAdd {
        data: MessagingData,
        proposal: ProposalMessage,
    },
    Vote {
        data: MessagingData,
        vote: VoteMessage,
    },
}

impl ValidatedMessage {
    pub fn action(&self) -> ActionType {
        match self {
            ValidatedMessage::ListingItemAdd { .. } => ActionType::ItemAdd,
            ValidatedMessage::BidAction(envelope) | ValidatedMessage::EscrowAction(envelope) => {
                envelope.action
            }
            ValidatedMessage::ProposalAdd { .. } => ActionType::ProposalAdd,
            ValidatedMessage::Vote { .. } => ActionType::Vote,
        }
    }

    pub fn data(&self) -> &MessagingData {
        match self {
            ValidatedMessage::ListingItemAdd { data, .. }
            | ValidatedMessage::ProposalAdd { data, .. }
            | ValidatedMessage::Vote { data, .. } => data,
            ValidatedMessage::BidAction(envelope) | ValidatedMessage::EscrowAction(envelope) => {
                &envelope.data
            }
        }
    }
}

fn required<T>(value: Option<T>, action: ActionType, field: &'static str) -> Result<T, ValidationError> {
    value.ok_or(ValidationError::MissingField { action, field })
}

/// Turns a raw transport message into a typed one, or explains why it can't
/// be processed. Nothing is read from or written to the database here.
pub fn validate(
    received: ReceivedMessage,
    supported_versions: &[String],
) -> Result<ValidatedMessage, ValidationError> {
    let ReceivedMessage { data, message } = received;

    let action = ActionType::from_str(&message.action)
        .map_err(|_| ValidationError::UnknownAction(message.action.clone()))?;

    if !supported_versions.iter().any(|v| v == &message.version) {
        return Err(ValidationError::UnsupportedVersion(message.version));
    }
    if data.msgid.trim().is_empty() {
        return Err(ValidationError::invalid("data.msgid", "is empty"));
    }
    if data.from.trim().is_empty() {
        return Err(ValidationError::invalid("data.from", "is empty"));
    }

    if action == ActionType::ItemAdd {
        let listing = required(message.listing, action, "listing")?;
        listing.validate()?;
        return Ok(ValidatedMessage::ListingItemAdd { data, listing });
    }
    if action == ActionType::ProposalAdd {
        let proposal = required(message.proposal, action, "proposal")?;
        return Ok(ValidatedMessage::ProposalAdd { data, proposal });
    }
    if action == ActionType::Vote {
        let vote = required(message.vote, action, "vote")?;
        if vote.weight <= 0 {
            return Err(ValidationError::invalid(
                "vote.weight",
                format!("{} is not a positive weight", vote.weight),
            ));
        }
        return Ok(ValidatedMessage::Vote { data, vote });
    }

    let item = required(message.item, action, "item")?;
    let item = ContentHash::from_str(&item)
        .map_err(|e| ValidationError::invalid("item", e.to_string()))?;

    if action.is_escrow_action() {
        let escrow = required(message.escrow.as_ref(), action, "escrow")?;
        if escrow.rawtx.trim().is_empty() {
            return Err(ValidationError::MissingField {
                action,
                field: "escrow.rawtx",
            });
        }
    }

    let envelope = ActionEnvelope {
        data,
        action,
        item,
        nonce: message.nonce,
        accepted: message.accepted.unwrap_or(false),
        info: message.info,
        escrow: message.escrow,
        objects: message.objects,
    };

    Ok(match action.is_escrow_action() {
        true => ValidatedMessage::EscrowAction(envelope),
        false => ValidatedMessage::BidAction(envelope),
    })
}
