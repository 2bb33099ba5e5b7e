use chrono::NaiveDateTime;
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};

use agora_diesel_utils::DbTextField;

use crate::db::schema::{
    action_messages, message_datas, message_escrows, message_infos, message_objects,
};

#[derive(
    DbTextField,
    strum_macros::EnumString,
    strum_macros::Display,
    strum_macros::EnumIter,
    AsExpression,
    FromSqlRow,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    Debug,
    Clone,
    Copy,
)]
#[sql_type = "Text"]
pub enum ActionType {
    #[strum(serialize = "MP_ITEM_ADD")]
    #[serde(rename = "MP_ITEM_ADD")]
    ItemAdd,
    #[strum(serialize = "MPA_BID")]
    #[serde(rename = "MPA_BID")]
    Bid,
    #[strum(serialize = "MPA_ACCEPT")]
    #[serde(rename = "MPA_ACCEPT")]
    Accept,
    #[strum(serialize = "MPA_REJECT")]
    #[serde(rename = "MPA_REJECT")]
    Reject,
    #[strum(serialize = "MPA_CANCEL")]
    #[serde(rename = "MPA_CANCEL")]
    Cancel,
    #[strum(serialize = "MPA_LOCK")]
    #[serde(rename = "MPA_LOCK")]
    Lock,
    #[strum(serialize = "MPA_REFUND")]
    #[serde(rename = "MPA_REFUND")]
    Refund,
    #[strum(serialize = "MPA_RELEASE")]
    #[serde(rename = "MPA_RELEASE")]
    Release,
    #[strum(serialize = "MP_PROPOSAL_ADD")]
    #[serde(rename = "MP_PROPOSAL_ADD")]
    ProposalAdd,
    #[strum(serialize = "MP_VOTE")]
    #[serde(rename = "MP_VOTE")]
    Vote,
}

impl ActionType {
    pub fn is_bid_action(&self) -> bool {
        matches!(
            self,
            ActionType::Bid | ActionType::Accept | ActionType::Reject | ActionType::Cancel
        )
    }

    pub fn is_escrow_action(&self) -> bool {
        matches!(
            self,
            ActionType::Lock | ActionType::Refund | ActionType::Release
        )
    }

    /// Actions whose message must reference an existing listing item.
    pub fn requires_item(&self) -> bool {
        self.is_bid_action() || self.is_escrow_action()
    }
}

#[derive(Clone, Debug, Queryable)]
pub(crate) struct ActionMessageRow {
    pub id: i32,
    pub action: ActionType,
    pub nonce: Option<String>,
    pub accepted: bool,
    pub listing_item_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "action_messages"]
pub(crate) struct NewActionMessage {
    pub action: ActionType,
    pub nonce: Option<String>,
    pub accepted: bool,
    pub listing_item_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, PartialEq, Queryable, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageInfo {
    pub id: i32,
    pub address: Option<String>,
    pub memo: Option<String>,
    pub action_message_id: i32,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "message_infos"]
pub(crate) struct NewMessageInfo {
    pub address: Option<String>,
    pub memo: Option<String>,
    pub action_message_id: i32,
}

#[derive(Clone, Debug, PartialEq, Queryable, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEscrow {
    pub id: i32,
    #[serde(rename = "type")]
    pub escrow_type: String,
    pub rawtx: String,
    pub action_message_id: i32,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "message_escrows"]
pub(crate) struct NewMessageEscrow {
    pub escrow_type: String,
    pub rawtx: String,
    pub action_message_id: i32,
}

#[derive(Clone, Debug, PartialEq, Queryable, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageData {
    pub id: i32,
    pub msgid: String,
    pub version: String,
    pub received: NaiveDateTime,
    pub sent: Option<NaiveDateTime>,
    pub from: String,
    pub to: String,
    pub action_message_id: i32,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "message_datas"]
pub(crate) struct NewMessageData {
    pub msgid: String,
    pub version: String,
    pub received: NaiveDateTime,
    pub sent: Option<NaiveDateTime>,
    pub sender: String,
    pub receiver: String,
    pub action_message_id: i32,
}

#[derive(Clone, Debug, PartialEq, Queryable, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageObject {
    pub id: i32,
    pub data_id: String,
    pub data_value: String,
    pub action_message_id: i32,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "message_objects"]
pub(crate) struct NewMessageObject {
    pub data_id: String,
    pub data_value: String,
    pub action_message_id: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionMessage {
    pub id: i32,
    pub action: ActionType,
    pub nonce: Option<String>,
    pub accepted: bool,
    pub listing_item_id: i32,
    pub created_at: NaiveDateTime,
    pub info: Option<MessageInfo>,
    pub escrow: Option<MessageEscrow>,
    pub data: Option<MessageData>,
    pub objects: Vec<MessageObject>,
}

impl ActionMessage {
    pub(crate) fn from_row(
        row: ActionMessageRow,
        info: Option<MessageInfo>,
        escrow: Option<MessageEscrow>,
        data: Option<MessageData>,
        objects: Vec<MessageObject>,
    ) -> ActionMessage {
        ActionMessage {
            id: row.id,
            action: row.action,
            nonce: row.nonce,
            accepted: row.accepted,
            listing_item_id: row.listing_item_id,
            created_at: row.created_at,
            info,
            escrow,
            data,
            objects,
        }
    }

    pub fn object(&self, data_id: &str) -> Option<&str> {
        self.objects
            .iter()
            .find(|object| object.data_id == data_id)
            .map(|object| object.data_value.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageInfoCreateRequest {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEscrowCreateRequest {
    #[serde(rename = "type")]
    pub escrow_type: String,
    pub rawtx: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDataCreateRequest {
    pub msgid: String,
    pub version: String,
    pub received: NaiveDateTime,
    #[serde(default)]
    pub sent: Option<NaiveDateTime>,
    pub from: String,
    pub to: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageObjectCreateRequest {
    pub data_id: String,
    pub data_value: String,
}

impl MessageObjectCreateRequest {
    pub fn new(data_id: impl Into<String>, data_value: impl Into<String>) -> Self {
        MessageObjectCreateRequest {
            data_id: data_id.into(),
            data_value: data_value.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionMessageCreateRequest {
    pub action: ActionType,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub accepted: bool,
    pub listing_item_id: i32,
    #[serde(default)]
    pub info: Option<MessageInfoCreateRequest>,
    #[serde(default)]
    pub escrow: Option<MessageEscrowCreateRequest>,
    #[serde(default)]
    pub data: Option<MessageDataCreateRequest>,
    #[serde(default)]
    pub objects: Vec<MessageObjectCreateRequest>,
}

impl ActionMessageCreateRequest {
    pub(crate) fn to_new(&self, created_at: NaiveDateTime) -> NewActionMessage {
        NewActionMessage {
            action: self.action,
            nonce: self.nonce.clone(),
            accepted: self.accepted,
            listing_item_id: self.listing_item_id,
            created_at,
        }
    }
}

impl MessageInfoCreateRequest {
    pub(crate) fn to_new(&self, action_message_id: i32) -> NewMessageInfo {
        NewMessageInfo {
            address: self.address.clone(),
            memo: self.memo.clone(),
            action_message_id,
        }
    }
}

impl MessageEscrowCreateRequest {
    pub(crate) fn to_new(&self, action_message_id: i32) -> NewMessageEscrow {
        NewMessageEscrow {
            escrow_type: self.escrow_type.clone(),
            rawtx: self.rawtx.clone(),
            action_message_id,
        }
    }
}

impl MessageDataCreateRequest {
    pub(crate) fn to_new(&self, action_message_id: i32) -> NewMessageData {
        NewMessageData {
            msgid: self.msgid.clone(),
            version: self.version.clone(),
            received: self.received,
            sent: self.sent,
            sender: self.from.clone(),
            receiver: self.to.clone(),
            action_message_id,
        }
    }
}

impl MessageObjectCreateRequest {
    pub(crate) fn to_new(&self, action_message_id: i32) -> NewMessageObject {
        NewMessageObject {
            data_id: self.data_id.clone(),
            data_value: self.data_value.clone(),
            action_message_id,
        }
    }
}
