use chrono::Utc;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};

use agora_persistence::executor::{
    do_with_transaction, last_insert_id, readonly_transaction, AsDao, ConnType, PoolType,
};

use crate::db::dao::message_children::{data, escrow, info, objects};
use crate::db::model::{ActionMessage, ActionMessageCreateRequest, ActionMessageRow, ActionType};
use crate::db::schema::{action_messages, listing_items};
use crate::error::{DbContext, Error, Result};

pub struct ActionMessageDao<'c> {
    pool: &'c PoolType,
}

impl<'c> AsDao<'c> for ActionMessageDao<'c> {
    fn as_dao(pool: &'c PoolType) -> Self {
        Self { pool }
    }
}

impl<'c> ActionMessageDao<'c> {
    /// Stores the message header with its info, escrow, data and objects.
    /// The listing item must exist.
    pub async fn create(&self, request: ActionMessageCreateRequest) -> Result<ActionMessage> {
        do_with_transaction(self.pool, "action_message_create", move |conn| {
            create(conn, &request)
        })
        .await
    }

    pub async fn get(&self, id: i32) -> Result<ActionMessage> {
        readonly_transaction(self.pool, "action_message_get", move |conn| find(conn, id)).await
    }

    pub async fn find_by_msgid(&self, msgid: &str) -> Result<Option<ActionMessage>> {
        let msgid = msgid.to_string();
        readonly_transaction(self.pool, "action_message_find_by_msgid", move |conn| {
            find_by_msgid(conn, &msgid)
        })
        .await
    }

    /// Messages addressed at the listing item, oldest first. An empty
    /// `actions` slice doesn't filter.
    pub async fn list_by_listing_item(
        &self,
        listing_item_id: i32,
        actions: &[ActionType],
    ) -> Result<Vec<ActionMessage>> {
        let actions = actions.to_vec();
        readonly_transaction(self.pool, "action_message_list", move |conn| {
            list_by_listing_item(conn, listing_item_id, &actions)
        })
        .await
    }

    pub async fn destroy(&self, id: i32) -> Result<()> {
        do_with_transaction(self.pool, "action_message_destroy", move |conn| {
            destroy(conn, id)
        })
        .await
    }
}

pub(crate) fn create(conn: &ConnType, request: &ActionMessageCreateRequest) -> Result<ActionMessage> {
    let item_exists = listing_items::table
        .find(request.listing_item_id)
        .select(listing_items::id)
        .first::<i32>(conn)
        .optional()
        .context("Could not load the ListingItem!")?;
    if item_exists.is_none() {
        return Err(Error::not_found("ListingItem", request.listing_item_id));
    }

    diesel::insert_into(action_messages::table)
        .values(&request.to_new(Utc::now().naive_utc()))
        .execute(conn)
        .context("Could not create the ActionMessage!")?;
    let id = last_insert_id(conn).context("Could not create the ActionMessage!")?;

    if let Some(message_info) = &request.info {
        info::create(conn, id, message_info)?;
    }
    if let Some(message_escrow) = &request.escrow {
        escrow::create(conn, id, message_escrow)?;
    }
    if let Some(message_data) = &request.data {
        data::create(conn, id, message_data)?;
    }
    objects::create(conn, id, &request.objects)?;

    log::trace!(
        "Created ActionMessage [{}] {} for ListingItem [{}].",
        id,
        request.action,
        request.listing_item_id
    );
    find(conn, id)
}

pub(crate) fn find(conn: &ConnType, id: i32) -> Result<ActionMessage> {
    let row = action_messages::table
        .find(id)
        .first::<ActionMessageRow>(conn)
        .optional()
        .context("Could not load the ActionMessage!")?
        .ok_or_else(|| Error::not_found("ActionMessage", id))?;
    hydrate(conn, row)
}

pub(crate) fn find_by_msgid(conn: &ConnType, msgid: &str) -> Result<Option<ActionMessage>> {
    data::find_action_message_id(conn, msgid)?
        .map(|id| find(conn, id))
        .transpose()
}

pub(crate) fn list_by_listing_item(
    conn: &ConnType,
    listing_item_id: i32,
    actions: &[ActionType],
) -> Result<Vec<ActionMessage>> {
    let mut query = action_messages::table
        .filter(action_messages::listing_item_id.eq(listing_item_id))
        .order_by(action_messages::id.asc())
        .into_boxed();
    if !actions.is_empty() {
        query = query.filter(action_messages::action.eq_any(actions.to_vec()));
    }

    query
        .load::<ActionMessageRow>(conn)
        .context("Could not load the ActionMessages!")?
        .into_iter()
        .map(|row| hydrate(conn, row))
        .collect()
}

fn hydrate(conn: &ConnType, row: ActionMessageRow) -> Result<ActionMessage> {
    let id = row.id;
    Ok(ActionMessage::from_row(
        row,
        info::find(conn, id)?,
        escrow::find(conn, id)?,
        data::find(conn, id)?,
        objects::find(conn, id)?,
    ))
}

pub(crate) fn destroy(conn: &ConnType, id: i32) -> Result<()> {
    objects::destroy(conn, id)?;
    data::destroy(conn, id)?;
    escrow::destroy(conn, id)?;
    info::destroy(conn, id)?;
    let deleted = diesel::delete(action_messages::table.find(id))
        .execute(conn)
        .context("Could not remove the ActionMessage!")?;
    match deleted {
        0 => Err(Error::not_found("ActionMessage", id)),
        _ => Ok(()),
    }
}
