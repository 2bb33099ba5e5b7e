use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::db::schema::flagged_items;

#[derive(Clone, Debug, PartialEq, Queryable, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedItem {
    pub id: i32,
    pub listing_item_id: i32,
    pub proposal_id: Option<i32>,
    pub reason: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "flagged_items"]
pub(crate) struct NewFlaggedItem {
    pub listing_item_id: i32,
    pub proposal_id: Option<i32>,
    pub reason: Option<String>,
    pub created_at: NaiveDateTime,
}
