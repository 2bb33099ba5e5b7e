use chrono::Utc;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};

use agora_persistence::executor::{
    do_with_transaction, readonly_transaction, AsDao, ConnType, PoolType,
};

use crate::db::model::{FlaggedItem, NewFlaggedItem};
use crate::db::schema::flagged_items;
use crate::error::{DbContext, Result};

pub struct FlaggedItemDao<'c> {
    pool: &'c PoolType,
}

impl<'c> AsDao<'c> for FlaggedItemDao<'c> {
    fn as_dao(pool: &'c PoolType) -> Self {
        Self { pool }
    }
}

impl<'c> FlaggedItemDao<'c> {
    pub async fn flag(
        &self,
        listing_item_id: i32,
        proposal_id: Option<i32>,
        reason: Option<String>,
    ) -> Result<FlaggedItem> {
        do_with_transaction(self.pool, "flagged_item_flag", move |conn| {
            flag(conn, listing_item_id, proposal_id, reason)
        })
        .await
    }

    pub async fn find_by_listing_item(&self, listing_item_id: i32) -> Result<Option<FlaggedItem>> {
        readonly_transaction(self.pool, "flagged_item_find", move |conn| {
            find_by_listing_item(conn, listing_item_id)
        })
        .await
    }
}

/// An item is flagged at most once. Flagging it again returns the first flag.
pub(crate) fn flag(
    conn: &ConnType,
    listing_item_id: i32,
    proposal_id: Option<i32>,
    reason: Option<String>,
) -> Result<FlaggedItem> {
    if let Some(flagged) = find_by_listing_item(conn, listing_item_id)? {
        return Ok(flagged);
    }

    diesel::insert_into(flagged_items::table)
        .values(&NewFlaggedItem {
            listing_item_id,
            proposal_id,
            reason,
            created_at: Utc::now().naive_utc(),
        })
        .execute(conn)
        .context("Could not flag the ListingItem!")?;

    flagged_items::table
        .filter(flagged_items::listing_item_id.eq(listing_item_id))
        .first::<FlaggedItem>(conn)
        .context("Could not load the FlaggedItem!")
}

pub(crate) fn find_by_listing_item(
    conn: &ConnType,
    listing_item_id: i32,
) -> Result<Option<FlaggedItem>> {
    flagged_items::table
        .filter(flagged_items::listing_item_id.eq(listing_item_id))
        .first::<FlaggedItem>(conn)
        .optional()
        .context("Could not load the FlaggedItem!")
}
