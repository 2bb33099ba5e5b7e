//! Children shared by listing items and listing item templates.
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};

use agora_persistence::executor::ConnType;

use crate::db::dao::payment_information;
use crate::db::model::{
    ItemInformation, ListingContent, ListingItemContent, ListingItemObject, ListingOwner,
    MessagingInformation,
};
use crate::db::schema::{item_informations, listing_item_objects, messaging_informations};
use crate::error::{DbContext, Error, Result};

/// Creates item information, payment information, messaging information and
/// objects, in that order, all pointing at `owner`.
pub(crate) fn create(
    conn: &ConnType,
    owner: ListingOwner,
    content: &ListingItemContent,
) -> Result<ListingContent> {
    diesel::insert_into(item_informations::table)
        .values(&content.information.to_new(owner))
        .execute(conn)
        .context("Could not create the ItemInformation!")?;

    payment_information::create_for(conn, owner, &content.payment)?;

    for messaging in &content.messaging {
        diesel::insert_into(messaging_informations::table)
            .values(&messaging.to_new(owner))
            .execute(conn)
            .context("Could not create the MessagingInformation!")?;
    }

    for object in &content.objects {
        diesel::insert_into(listing_item_objects::table)
            .values(&object.to_new(owner))
            .execute(conn)
            .context("Could not create the ListingItemObject!")?;
    }

    find(conn, owner)
}

pub(crate) fn find(conn: &ConnType, owner: ListingOwner) -> Result<ListingContent> {
    let information = match owner {
        ListingOwner::Item(id) => item_informations::table
            .filter(item_informations::listing_item_id.eq(id))
            .first::<ItemInformation>(conn),
        ListingOwner::Template(id) => item_informations::table
            .filter(item_informations::listing_item_template_id.eq(id))
            .first::<ItemInformation>(conn),
    }
    .optional()
    .context("Could not load the ItemInformation!")?
    .ok_or_else(|| Error::not_found("ItemInformation", owner))?;

    let payment = payment_information::find_by_owner(conn, owner)?
        .ok_or_else(|| Error::not_found("PaymentInformation", owner))?;

    let messaging = match owner {
        ListingOwner::Item(id) => messaging_informations::table
            .filter(messaging_informations::listing_item_id.eq(id))
            .order_by(messaging_informations::id.asc())
            .load::<MessagingInformation>(conn),
        ListingOwner::Template(id) => messaging_informations::table
            .filter(messaging_informations::listing_item_template_id.eq(id))
            .order_by(messaging_informations::id.asc())
            .load::<MessagingInformation>(conn),
    }
    .context("Could not load the MessagingInformation!")?;

    let objects = match owner {
        ListingOwner::Item(id) => listing_item_objects::table
            .filter(listing_item_objects::listing_item_id.eq(id))
            .order_by(listing_item_objects::order_number.asc())
            .then_order_by(listing_item_objects::id.asc())
            .load::<ListingItemObject>(conn),
        ListingOwner::Template(id) => listing_item_objects::table
            .filter(listing_item_objects::listing_item_template_id.eq(id))
            .order_by(listing_item_objects::order_number.asc())
            .then_order_by(listing_item_objects::id.asc())
            .load::<ListingItemObject>(conn),
    }
    .context("Could not load the ListingItemObject!")?;

    Ok(ListingContent {
        information,
        payment,
        messaging,
        objects,
    })
}

/// Removes all children of `owner`, deepest first.
pub(crate) fn destroy(conn: &ConnType, owner: ListingOwner) -> Result<()> {
    if let Some(payment) = payment_information::find_by_owner(conn, owner)? {
        payment_information::destroy(conn, payment.id)?;
    }

    match owner {
        ListingOwner::Item(id) => {
            diesel::delete(
                listing_item_objects::table.filter(listing_item_objects::listing_item_id.eq(id)),
            )
            .execute(conn)
            .context("Could not remove the ListingItemObjects!")?;
            diesel::delete(
                messaging_informations::table
                    .filter(messaging_informations::listing_item_id.eq(id)),
            )
            .execute(conn)
            .context("Could not remove the MessagingInformation!")?;
            diesel::delete(
                item_informations::table.filter(item_informations::listing_item_id.eq(id)),
            )
            .execute(conn)
            .context("Could not remove the ItemInformation!")?;
        }
        ListingOwner::Template(id) => {
            diesel::delete(
                listing_item_objects::table
                    .filter(listing_item_objects::listing_item_template_id.eq(id)),
            )
            .execute(conn)
            .context("Could not remove the ListingItemObjects!")?;
            diesel::delete(
                messaging_informations::table
                    .filter(messaging_informations::listing_item_template_id.eq(id)),
            )
            .execute(conn)
            .context("Could not remove the MessagingInformation!")?;
            diesel::delete(
                item_informations::table
                    .filter(item_informations::listing_item_template_id.eq(id)),
            )
            .execute(conn)
            .context("Could not remove the ItemInformation!")?;
        }
    }
    Ok(())
}
