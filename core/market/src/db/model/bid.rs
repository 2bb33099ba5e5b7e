use chrono::NaiveDateTime;
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};

use agora_diesel_utils::DbTextField;

use crate::db::schema::{bid_datas, bids};

#[derive(
    DbTextField,
    strum_macros::EnumString,
    strum_macros::Display,
    AsExpression,
    FromSqlRow,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Debug,
    Clone,
    Copy,
)]
#[sql_type = "Text"]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BidStatus {
    Active,
    Accepted,
    Rejected,
    Cancelled,
}

#[derive(Clone, Debug, Queryable)]
pub(crate) struct BidRow {
    pub id: i32,
    pub status: BidStatus,
    pub bidder: String,
    pub listing_item_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "bids"]
pub(crate) struct NewBid {
    pub status: BidStatus,
    pub bidder: String,
    pub listing_item_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Clone, Debug, PartialEq, Queryable, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidData {
    pub id: i32,
    pub data_id: String,
    pub data_value: String,
    pub bid_id: i32,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "bid_datas"]
pub(crate) struct NewBidData {
    pub data_id: String,
    pub data_value: String,
    pub bid_id: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub id: i32,
    pub status: BidStatus,
    pub bidder: String,
    pub listing_item_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub data: Vec<BidData>,
}

impl Bid {
    pub(crate) fn from_row(row: BidRow, data: Vec<BidData>) -> Bid {
        Bid {
            id: row.id,
            status: row.status,
            bidder: row.bidder,
            listing_item_id: row.listing_item_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            data,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidDataCreateRequest {
    pub data_id: String,
    pub data_value: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidCreateRequest {
    pub bidder: String,
    pub listing_item_id: i32,
    #[serde(default = "default_status")]
    pub status: BidStatus,
    #[serde(default)]
    pub data: Vec<BidDataCreateRequest>,
}

fn default_status() -> BidStatus {
    BidStatus::Active
}

impl BidCreateRequest {
    pub(crate) fn to_new(&self, now: NaiveDateTime) -> NewBid {
        NewBid {
            status: self.status,
            bidder: self.bidder.clone(),
            listing_item_id: self.listing_item_id,
            created_at: now,
            updated_at: now,
        }
    }
}

impl BidDataCreateRequest {
    pub(crate) fn to_new(&self, bid_id: i32) -> NewBidData {
        NewBidData {
            data_id: self.data_id.clone(),
            data_value: self.data_value.clone(),
            bid_id,
        }
    }
}
