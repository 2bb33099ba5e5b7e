use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};

use agora_persistence::executor::{
    do_with_transaction, last_insert_id, readonly_transaction, AsDao, ConnType, PoolType,
};

use crate::db::dao::{escrow, item_price};
use crate::db::model::{
    ListingOwner, PaymentInformation, PaymentInformationCreateRequest, PaymentInformationRow,
    PaymentInformationUpdateRequest,
};
use crate::db::schema::payment_informations;
use crate::error::{DbContext, Error, Result};
use crate::protocol::validation::{Validate, ValidationError};

pub struct PaymentInformationDao<'c> {
    pool: &'c PoolType,
}

impl<'c> AsDao<'c> for PaymentInformationDao<'c> {
    fn as_dao(pool: &'c PoolType) -> Self {
        Self { pool }
    }
}

impl<'c> PaymentInformationDao<'c> {
    pub async fn create(
        &self,
        request: PaymentInformationCreateRequest,
    ) -> Result<PaymentInformation> {
        request.validate()?;
        if request.listing_item_id.is_none() && request.listing_item_template_id.is_none() {
            return Err(ValidationError::invalid(
                "paymentInformation",
                "needs a listing item or a listing item template",
            )
            .into());
        }
        do_with_transaction(self.pool, "payment_information_create", move |conn| {
            create(conn, &request)
        })
        .await
    }

    pub async fn get(&self, id: i32) -> Result<PaymentInformation> {
        readonly_transaction(self.pool, "payment_information_get", move |conn| {
            find(conn, id)
        })
        .await
    }

    pub async fn update(
        &self,
        id: i32,
        request: PaymentInformationUpdateRequest,
    ) -> Result<PaymentInformation> {
        request.validate()?;
        do_with_transaction(self.pool, "payment_information_update", move |conn| {
            update(conn, id, &request)
        })
        .await
    }

    pub async fn destroy(&self, id: i32) -> Result<()> {
        do_with_transaction(self.pool, "payment_information_destroy", move |conn| {
            destroy(conn, id)
        })
        .await
    }
}

/// Root first, then escrow (with its ratio) and item price (with shipping
/// price and address).
pub(crate) fn create(
    conn: &ConnType,
    request: &PaymentInformationCreateRequest,
) -> Result<PaymentInformation> {
    diesel::insert_into(payment_informations::table)
        .values(&request.to_new())
        .execute(conn)
        .context("Could not create the PaymentInformation!")?;
    let id = last_insert_id(conn).context("Could not create the PaymentInformation!")?;

    escrow::create(conn, id, &request.escrow)?;
    item_price::create(conn, id, &request.item_price)?;
    find(conn, id)
}

pub(crate) fn create_for(
    conn: &ConnType,
    owner: ListingOwner,
    request: &PaymentInformationCreateRequest,
) -> Result<PaymentInformation> {
    let mut request = request.clone();
    request.listing_item_id = owner.listing_item_id();
    request.listing_item_template_id = owner.listing_item_template_id();
    create(conn, &request)
}

pub(crate) fn find(conn: &ConnType, id: i32) -> Result<PaymentInformation> {
    let row = payment_informations::table
        .find(id)
        .first::<PaymentInformationRow>(conn)
        .optional()
        .context("Could not load the PaymentInformation!")?
        .ok_or_else(|| Error::not_found("PaymentInformation", id))?;
    hydrate(conn, row)
}

pub(crate) fn find_by_owner(
    conn: &ConnType,
    owner: ListingOwner,
) -> Result<Option<PaymentInformation>> {
    let query = payment_informations::table.into_boxed();
    let query = match owner {
        ListingOwner::Item(id) => query.filter(payment_informations::listing_item_id.eq(id)),
        ListingOwner::Template(id) => {
            query.filter(payment_informations::listing_item_template_id.eq(id))
        }
    };
    query
        .first::<PaymentInformationRow>(conn)
        .optional()
        .context("Could not load the PaymentInformation!")?
        .map(|row| hydrate(conn, row))
        .transpose()
}

fn hydrate(conn: &ConnType, row: PaymentInformationRow) -> Result<PaymentInformation> {
    let escrow = escrow::find_by_payment_information(conn, row.id)?
        .ok_or_else(|| Error::not_found("Escrow", format!("paymentInformation {}", row.id)))?;
    let item_price = item_price::find_by_payment_information(conn, row.id)?
        .ok_or_else(|| Error::not_found("ItemPrice", format!("paymentInformation {}", row.id)))?;
    Ok(PaymentInformation::from_row(row, escrow, item_price))
}

/// Updates the payment type in place and replaces the escrow and item price
/// sub-aggregates present in the request. Replaced children get new ids.
pub(crate) fn update(
    conn: &ConnType,
    id: i32,
    request: &PaymentInformationUpdateRequest,
) -> Result<PaymentInformation> {
    let current = find(conn, id)?;

    diesel::update(payment_informations::table.find(id))
        .set(payment_informations::payment_type.eq(request.payment_type))
        .execute(conn)
        .context("Could not update the PaymentInformation!")?;

    if let Some(new_escrow) = &request.escrow {
        escrow::destroy(conn, current.escrow.id)?;
        escrow::create(conn, id, new_escrow)?;
    }
    if let Some(new_price) = &request.item_price {
        item_price::destroy(conn, current.item_price.id)?;
        item_price::create(conn, id, new_price)?;
    }
    find(conn, id)
}

pub(crate) fn destroy(conn: &ConnType, id: i32) -> Result<()> {
    let current = find(conn, id)?;
    escrow::destroy(conn, current.escrow.id)?;
    item_price::destroy(conn, current.item_price.id)?;
    diesel::delete(payment_informations::table.find(id))
        .execute(conn)
        .context("Could not remove the PaymentInformation!")?;
    Ok(())
}
