use chrono::Utc;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};

use agora_persistence::executor::{
    do_with_transaction, last_insert_id, readonly_transaction, AsDao, ConnType, PoolType,
};

use crate::db::dao::{listing_content, listing_item};
use crate::db::model::{
    ListingItemContent, ListingItemTemplate, ListingItemTemplateRow, ListingOwner,
    NewListingItemTemplate,
};
use crate::db::schema::{listing_item_templates, listing_items};
use crate::error::{DbContext, Error, Result};
use crate::hash::ContentHash;
use crate::protocol::validation::Validate;

pub struct ListingItemTemplateDao<'c> {
    pool: &'c PoolType,
}

impl<'c> AsDao<'c> for ListingItemTemplateDao<'c> {
    fn as_dao(pool: &'c PoolType) -> Self {
        Self { pool }
    }
}

impl<'c> ListingItemTemplateDao<'c> {
    /// Stores a locally authored listing. Authoring the same content twice
    /// returns the template stored first. A listing item with the same hash
    /// that is already stored gets linked to the template.
    pub async fn create(&self, content: ListingItemContent) -> Result<ListingItemTemplate> {
        content.validate()?;
        let hash = content.hash()?;

        do_with_transaction(self.pool, "listing_item_template_create", move |conn| {
            if let Some(template) = find_by_hash(conn, &hash)? {
                return Ok(template);
            }
            let template = create(conn, &hash, &content)?;

            if let Some(item_id) = listing_item::find_id_by_hash(conn, &hash)? {
                diesel::update(
                    listing_items::table
                        .find(item_id)
                        .filter(listing_items::listing_item_template_id.is_null()),
                )
                .set(listing_items::listing_item_template_id.eq(template.id))
                .execute(conn)
                .context("Could not link the ListingItem to its template!")?;
            }
            Ok(template)
        })
        .await
    }

    pub async fn get(&self, id: i32) -> Result<ListingItemTemplate> {
        readonly_transaction(self.pool, "listing_item_template_get", move |conn| {
            find(conn, id)
        })
        .await
    }

    pub async fn find_by_hash(&self, hash: &ContentHash) -> Result<Option<ListingItemTemplate>> {
        let hash = hash.clone();
        readonly_transaction(self.pool, "listing_item_template_find_by_hash", move |conn| {
            find_by_hash(conn, &hash)
        })
        .await
    }

    pub async fn destroy(&self, id: i32) -> Result<()> {
        do_with_transaction(self.pool, "listing_item_template_destroy", move |conn| {
            destroy(conn, id)
        })
        .await
    }
}

pub(crate) fn create(
    conn: &ConnType,
    hash: &ContentHash,
    content: &ListingItemContent,
) -> Result<ListingItemTemplate> {
    let now = Utc::now().naive_utc();
    let new_template = NewListingItemTemplate {
        hash: hash.clone(),
        created_at: now,
        updated_at: now,
    };

    match diesel::insert_into(listing_item_templates::table)
        .values(&new_template)
        .execute(conn)
    {
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(Error::AlreadyExists {
                entity: "ListingItemTemplate",
                id: hash.to_string(),
            })
        }
        result => result.context("Could not create the ListingItemTemplate!")?,
    };
    let id = last_insert_id(conn).context("Could not create the ListingItemTemplate!")?;

    listing_content::create(conn, ListingOwner::Template(id), content)?;
    find(conn, id)
}

pub(crate) fn find(conn: &ConnType, id: i32) -> Result<ListingItemTemplate> {
    let row = listing_item_templates::table
        .find(id)
        .first::<ListingItemTemplateRow>(conn)
        .optional()
        .context("Could not load the ListingItemTemplate!")?
        .ok_or_else(|| Error::not_found("ListingItemTemplate", id))?;
    hydrate(conn, row)
}

pub(crate) fn find_by_hash(
    conn: &ConnType,
    hash: &ContentHash,
) -> Result<Option<ListingItemTemplate>> {
    listing_item_templates::table
        .filter(listing_item_templates::hash.eq(hash))
        .first::<ListingItemTemplateRow>(conn)
        .optional()
        .context("Could not load the ListingItemTemplate!")?
        .map(|row| hydrate(conn, row))
        .transpose()
}

pub(crate) fn find_id_by_hash(conn: &ConnType, hash: &ContentHash) -> Result<Option<i32>> {
    listing_item_templates::table
        .filter(listing_item_templates::hash.eq(hash))
        .select(listing_item_templates::id)
        .first::<i32>(conn)
        .optional()
        .context("Could not load the ListingItemTemplate!")
}

fn hydrate(conn: &ConnType, row: ListingItemTemplateRow) -> Result<ListingItemTemplate> {
    let content = listing_content::find(conn, ListingOwner::Template(row.id))?;
    Ok(ListingItemTemplate::from_row(row, content))
}

pub(crate) fn destroy(conn: &ConnType, id: i32) -> Result<()> {
    find(conn, id)?;
    listing_content::destroy(conn, ListingOwner::Template(id))?;
    diesel::delete(listing_item_templates::table.find(id))
        .execute(conn)
        .context("Could not remove the ListingItemTemplate!")?;
    Ok(())
}
