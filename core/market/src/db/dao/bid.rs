use chrono::Utc;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};

use agora_persistence::executor::{
    do_with_transaction, last_insert_id, readonly_transaction, AsDao, ConnType, PoolType,
};

use crate::db::model::{Bid, BidCreateRequest, BidData, BidRow, BidStatus};
use crate::db::schema::{bid_datas, bids, listing_items};
use crate::error::{DbContext, Error, Result};

pub struct BidDao<'c> {
    pool: &'c PoolType,
}

impl<'c> AsDao<'c> for BidDao<'c> {
    fn as_dao(pool: &'c PoolType) -> Self {
        Self { pool }
    }
}

impl<'c> BidDao<'c> {
    pub async fn create(&self, request: BidCreateRequest) -> Result<Bid> {
        do_with_transaction(self.pool, "bid_create", move |conn| create(conn, &request)).await
    }

    pub async fn get(&self, id: i32) -> Result<Bid> {
        readonly_transaction(self.pool, "bid_get", move |conn| find(conn, id)).await
    }

    pub async fn list_by_listing_item(&self, listing_item_id: i32) -> Result<Vec<Bid>> {
        readonly_transaction(self.pool, "bid_list", move |conn| {
            list_by_listing_item(conn, listing_item_id)
        })
        .await
    }

    pub async fn update_status(&self, id: i32, status: BidStatus) -> Result<Bid> {
        do_with_transaction(self.pool, "bid_update_status", move |conn| {
            update_status(conn, id, status)
        })
        .await
    }

    pub async fn destroy(&self, id: i32) -> Result<()> {
        do_with_transaction(self.pool, "bid_destroy", move |conn| destroy(conn, id)).await
    }
}

pub(crate) fn create(conn: &ConnType, request: &BidCreateRequest) -> Result<Bid> {
    let item_exists = listing_items::table
        .find(request.listing_item_id)
        .select(listing_items::id)
        .first::<i32>(conn)
        .optional()
        .context("Could not load the ListingItem!")?;
    if item_exists.is_none() {
        return Err(Error::not_found("ListingItem", request.listing_item_id));
    }

    diesel::insert_into(bids::table)
        .values(&request.to_new(Utc::now().naive_utc()))
        .execute(conn)
        .context("Could not create the Bid!")?;
    let id = last_insert_id(conn).context("Could not create the Bid!")?;

    for data in &request.data {
        diesel::insert_into(bid_datas::table)
            .values(&data.to_new(id))
            .execute(conn)
            .context("Could not create the BidData!")?;
    }
    find(conn, id)
}

pub(crate) fn find(conn: &ConnType, id: i32) -> Result<Bid> {
    let row = bids::table
        .find(id)
        .first::<BidRow>(conn)
        .optional()
        .context("Could not load the Bid!")?
        .ok_or_else(|| Error::not_found("Bid", id))?;
    hydrate(conn, row)
}

/// Most recent bid of `bidder` on the item that is in `status`.
pub(crate) fn find_latest(
    conn: &ConnType,
    listing_item_id: i32,
    bidder: &str,
    status: BidStatus,
) -> Result<Option<Bid>> {
    bids::table
        .filter(bids::listing_item_id.eq(listing_item_id))
        .filter(bids::bidder.eq(bidder))
        .filter(bids::status.eq(status))
        .order_by(bids::id.desc())
        .first::<BidRow>(conn)
        .optional()
        .context("Could not load the Bid!")?
        .map(|row| hydrate(conn, row))
        .transpose()
}

pub(crate) fn list_by_listing_item(conn: &ConnType, listing_item_id: i32) -> Result<Vec<Bid>> {
    bids::table
        .filter(bids::listing_item_id.eq(listing_item_id))
        .order_by(bids::id.asc())
        .load::<BidRow>(conn)
        .context("Could not load the Bids!")?
        .into_iter()
        .map(|row| hydrate(conn, row))
        .collect()
}

fn hydrate(conn: &ConnType, row: BidRow) -> Result<Bid> {
    let data = bid_datas::table
        .filter(bid_datas::bid_id.eq(row.id))
        .order_by(bid_datas::id.asc())
        .load::<BidData>(conn)
        .context("Could not load the BidDatas!")?;
    Ok(Bid::from_row(row, data))
}

pub(crate) fn update_status(conn: &ConnType, id: i32, status: BidStatus) -> Result<Bid> {
    let updated = diesel::update(bids::table.find(id))
        .set((
            bids::status.eq(status),
            bids::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)
        .context("Could not update the Bid!")?;
    if updated == 0 {
        return Err(Error::not_found("Bid", id));
    }
    find(conn, id)
}

pub(crate) fn destroy(conn: &ConnType, id: i32) -> Result<()> {
    diesel::delete(bid_datas::table.filter(bid_datas::bid_id.eq(id)))
        .execute(conn)
        .context("Could not remove the BidDatas!")?;
    let deleted = diesel::delete(bids::table.find(id))
        .execute(conn)
        .context("Could not remove the Bid!")?;
    match deleted {
        0 => Err(Error::not_found("Bid", id)),
        _ => Ok(()),
    }
}
