use chrono::Utc;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};

use agora_persistence::executor::{
    do_with_transaction, last_insert_id, readonly_transaction, AsDao, ConnType, PoolType,
};

use crate::db::dao::listing_content;
use crate::db::model::{
    ListingItem, ListingItemCreateRequest, ListingItemRow, ListingOwner, NewListingItem,
};
use crate::db::schema::listing_items;
use crate::error::{DbContext, Error, Result};
use crate::hash::ContentHash;
use crate::protocol::validation::{Validate, ValidationError};

pub struct ListingItemDao<'c> {
    pool: &'c PoolType,
}

impl<'c> AsDao<'c> for ListingItemDao<'c> {
    fn as_dao(pool: &'c PoolType) -> Self {
        Self { pool }
    }
}

impl<'c> ListingItemDao<'c> {
    /// Fails with `AlreadyExists` if an item with the same hash is stored.
    pub async fn create(&self, request: ListingItemCreateRequest) -> Result<ListingItem> {
        validate_request(&request)?;
        do_with_transaction(self.pool, "listing_item_create", move |conn| {
            create(conn, &request)
        })
        .await
    }

    pub async fn get(&self, id: i32) -> Result<ListingItem> {
        readonly_transaction(self.pool, "listing_item_get", move |conn| find(conn, id)).await
    }

    pub async fn get_by_hash(&self, hash: &ContentHash) -> Result<ListingItem> {
        let hash = hash.clone();
        readonly_transaction(self.pool, "listing_item_get_by_hash", move |conn| {
            find_by_hash(conn, &hash)?.ok_or_else(|| Error::not_found("ListingItem", hash))
        })
        .await
    }

    pub async fn find_by_hash(&self, hash: &ContentHash) -> Result<Option<ListingItem>> {
        let hash = hash.clone();
        readonly_transaction(self.pool, "listing_item_find_by_hash", move |conn| {
            find_by_hash(conn, &hash)
        })
        .await
    }

    pub async fn destroy(&self, id: i32) -> Result<()> {
        do_with_transaction(self.pool, "listing_item_destroy", move |conn| {
            destroy(conn, id)
        })
        .await
    }
}

pub(crate) fn validate_request(request: &ListingItemCreateRequest) -> Result<()> {
    request.content.validate()?;
    if request.content.hash()? != request.hash {
        return Err(ValidationError::invalid(
            "hash",
            format!("{} doesn't match the listing content", request.hash),
        )
        .into());
    }
    Ok(())
}

pub(crate) fn create(conn: &ConnType, request: &ListingItemCreateRequest) -> Result<ListingItem> {
    let now = Utc::now().naive_utc();
    let new_item = NewListingItem {
        hash: request.hash.clone(),
        seller: request.seller.clone(),
        market: request.market.clone(),
        listing_item_template_id: request.listing_item_template_id,
        posted_at: request.posted_at,
        received_at: request.received_at,
        created_at: now,
        updated_at: now,
    };

    match diesel::insert_into(listing_items::table)
        .values(&new_item)
        .execute(conn)
    {
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(Error::AlreadyExists {
                entity: "ListingItem",
                id: request.hash.to_string(),
            })
        }
        result => result.context("Could not create the ListingItem!")?,
    };
    let id = last_insert_id(conn).context("Could not create the ListingItem!")?;

    listing_content::create(conn, ListingOwner::Item(id), &request.content)?;
    find(conn, id)
}

pub(crate) fn find(conn: &ConnType, id: i32) -> Result<ListingItem> {
    let row = listing_items::table
        .find(id)
        .first::<ListingItemRow>(conn)
        .optional()
        .context("Could not load the ListingItem!")?
        .ok_or_else(|| Error::not_found("ListingItem", id))?;
    hydrate(conn, row)
}

pub(crate) fn find_by_hash(conn: &ConnType, hash: &ContentHash) -> Result<Option<ListingItem>> {
    listing_items::table
        .filter(listing_items::hash.eq(hash))
        .first::<ListingItemRow>(conn)
        .optional()
        .context("Could not load the ListingItem!")?
        .map(|row| hydrate(conn, row))
        .transpose()
}

/// Id of the item with `hash`, without loading its children.
pub(crate) fn find_id_by_hash(conn: &ConnType, hash: &ContentHash) -> Result<Option<i32>> {
    listing_items::table
        .filter(listing_items::hash.eq(hash))
        .select(listing_items::id)
        .first::<i32>(conn)
        .optional()
        .context("Could not load the ListingItem!")
}

fn hydrate(conn: &ConnType, row: ListingItemRow) -> Result<ListingItem> {
    let content = listing_content::find(conn, ListingOwner::Item(row.id))?;
    Ok(ListingItem::from_row(row, content))
}

pub(crate) fn set_template(conn: &ConnType, id: i32, template_id: i32) -> Result<ListingItem> {
    diesel::update(listing_items::table.find(id))
        .set((
            listing_items::listing_item_template_id.eq(template_id),
            listing_items::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)
        .context("Could not link the ListingItem to its template!")?;
    find(conn, id)
}

pub(crate) fn destroy(conn: &ConnType, id: i32) -> Result<()> {
    find(conn, id)?;
    listing_content::destroy(conn, ListingOwner::Item(id))?;
    diesel::delete(listing_items::table.find(id))
        .execute(conn)
        .context("Could not remove the ListingItem!")?;
    Ok(())
}
