//! Messages exchanged between marketplace nodes over the messaging transport.
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::model::{
    ListingItemContent, MessageDataCreateRequest, MessageEscrowCreateRequest,
    MessageInfoCreateRequest, MessageObjectCreateRequest, ProposalCreateRequest,
    ProposalOptionCreateRequest, ProposalType,
};
use crate::hash::ContentHash;

pub mod validation;

pub use validation::{validate, ActionEnvelope, ValidatedMessage, ValidationError};

/// Message as delivered by the transport, before any validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReceivedMessage {
    pub data: MessagingData,
    pub message: MarketplaceMessage,
}

/// Transport envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagingData {
    pub msgid: String,
    pub version: String,
    #[serde(default)]
    pub sent: Option<NaiveDateTime>,
    #[serde(default)]
    pub received: Option<NaiveDateTime>,
    pub from: String,
    pub to: String,
}

impl MessagingData {
    pub fn received_at(&self) -> NaiveDateTime {
        self.received.unwrap_or_else(|| Utc::now().naive_utc())
    }

    pub fn to_create_request(&self) -> MessageDataCreateRequest {
        MessageDataCreateRequest {
            msgid: self.msgid.clone(),
            version: self.version.clone(),
            received: self.received_at(),
            sent: self.sent,
            from: self.from.clone(),
            to: self.to.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceMessage {
    pub version: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted: Option<bool>,
    /// Hash of the listing item the action refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing: Option<ListingItemContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<MessageInfoCreateRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escrow: Option<MessageEscrowCreateRequest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<MessageObjectCreateRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal: Option<ProposalMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote: Option<VoteMessage>,
}

impl MarketplaceMessage {
    pub fn new(version: impl Into<String>, action: impl Into<String>) -> Self {
        MarketplaceMessage {
            version: version.into(),
            action: action.into(),
            nonce: None,
            accepted: None,
            item: None,
            listing: None,
            info: None,
            escrow: None,
            objects: vec![],
            proposal: None,
            vote: None,
        }
    }
}

/// Proposal payload. The submitter is the sender of the message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalMessage {
    pub block_start: i64,
    pub block_end: i64,
    #[serde(rename = "type")]
    pub proposal_type: ProposalType,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<ContentHash>,
    pub options: Vec<ProposalOptionCreateRequest>,
}

impl ProposalMessage {
    pub fn into_create_request(self, submitter: &str) -> ProposalCreateRequest {
        ProposalCreateRequest {
            submitter: submitter.to_string(),
            block_start: self.block_start,
            block_end: self.block_end,
            proposal_type: self.proposal_type,
            title: self.title,
            description: self.description,
            item: self.item,
            options: self.options,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteMessage {
    pub proposal_hash: ContentHash,
    pub option_id: i32,
    pub block: i64,
    pub weight: i64,
}
