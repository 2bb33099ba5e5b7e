use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};

use agora_persistence::executor::{
    do_with_transaction, last_insert_id, readonly_transaction, AsDao, ConnType, PoolType,
};

use crate::db::model::{
    CryptocurrencyAddress, CryptocurrencyAddressCreateRequest, ItemPrice, ItemPriceCreateRequest,
    ItemPriceRow, ItemPriceUpdateRequest, ShippingPrice, ShippingPriceCreateRequest,
};
use crate::db::schema::{cryptocurrency_addresses, item_prices, shipping_prices};
use crate::error::{DbContext, Error, Result};
use crate::protocol::validation::Validate;

pub struct ItemPriceDao<'c> {
    pool: &'c PoolType,
}

impl<'c> AsDao<'c> for ItemPriceDao<'c> {
    fn as_dao(pool: &'c PoolType) -> Self {
        Self { pool }
    }
}

impl<'c> ItemPriceDao<'c> {
    pub async fn create(
        &self,
        payment_information_id: i32,
        request: ItemPriceCreateRequest,
    ) -> Result<ItemPrice> {
        request.validate()?;
        do_with_transaction(self.pool, "item_price_create", move |conn| {
            create(conn, payment_information_id, &request)
        })
        .await
    }

    pub async fn get(&self, id: i32) -> Result<ItemPrice> {
        readonly_transaction(self.pool, "item_price_get", move |conn| find(conn, id)).await
    }

    pub async fn update(&self, id: i32, request: ItemPriceUpdateRequest) -> Result<ItemPrice> {
        request.validate()?;
        do_with_transaction(self.pool, "item_price_update", move |conn| {
            update(conn, id, &request)
        })
        .await
    }

    pub async fn destroy(&self, id: i32) -> Result<()> {
        do_with_transaction(self.pool, "item_price_destroy", move |conn| {
            destroy(conn, id)
        })
        .await
    }
}

pub(crate) fn create(
    conn: &ConnType,
    payment_information_id: i32,
    request: &ItemPriceCreateRequest,
) -> Result<ItemPrice> {
    diesel::insert_into(item_prices::table)
        .values(&request.to_new(payment_information_id))
        .execute(conn)
        .context("Could not create the ItemPrice!")?;
    let item_price_id = last_insert_id(conn).context("Could not create the ItemPrice!")?;

    if let Some(shipping_price) = &request.shipping_price {
        create_shipping_price(conn, item_price_id, shipping_price)?;
    }
    if let Some(address) = &request.cryptocurrency_address {
        create_cryptocurrency_address(conn, item_price_id, address)?;
    }
    find(conn, item_price_id)
}

pub(crate) fn find(conn: &ConnType, id: i32) -> Result<ItemPrice> {
    let row = item_prices::table
        .find(id)
        .first::<ItemPriceRow>(conn)
        .optional()
        .context("Could not load the ItemPrice!")?
        .ok_or_else(|| Error::not_found("ItemPrice", id))?;
    hydrate(conn, row)
}

pub(crate) fn find_by_payment_information(
    conn: &ConnType,
    payment_information_id: i32,
) -> Result<Option<ItemPrice>> {
    item_prices::table
        .filter(item_prices::payment_information_id.eq(payment_information_id))
        .first::<ItemPriceRow>(conn)
        .optional()
        .context("Could not load the ItemPrice!")?
        .map(|row| hydrate(conn, row))
        .transpose()
}

fn hydrate(conn: &ConnType, row: ItemPriceRow) -> Result<ItemPrice> {
    let shipping_price = shipping_prices::table
        .filter(shipping_prices::item_price_id.eq(row.id))
        .first::<ShippingPrice>(conn)
        .optional()
        .context("Could not load the ShippingPrice!")?;
    let address = cryptocurrency_addresses::table
        .filter(cryptocurrency_addresses::item_price_id.eq(row.id))
        .first::<CryptocurrencyAddress>(conn)
        .optional()
        .context("Could not load the CryptocurrencyAddress!")?;
    Ok(ItemPrice::from_row(row, shipping_price, address))
}

pub(crate) fn update(
    conn: &ConnType,
    id: i32,
    request: &ItemPriceUpdateRequest,
) -> Result<ItemPrice> {
    find(conn, id)?;

    diesel::update(item_prices::table.find(id))
        .set((
            item_prices::currency.eq(&request.currency),
            item_prices::base_price.eq(request.base_price),
        ))
        .execute(conn)
        .context("Could not update the ItemPrice!")?;

    if let Some(shipping_price) = &request.shipping_price {
        destroy_shipping_price(conn, id)?;
        create_shipping_price(conn, id, shipping_price)?;
    }
    if let Some(address) = &request.cryptocurrency_address {
        destroy_cryptocurrency_address(conn, id)?;
        create_cryptocurrency_address(conn, id, address)?;
    }
    find(conn, id)
}

pub(crate) fn destroy(conn: &ConnType, id: i32) -> Result<()> {
    destroy_shipping_price(conn, id)?;
    destroy_cryptocurrency_address(conn, id)?;
    let deleted = diesel::delete(item_prices::table.find(id))
        .execute(conn)
        .context("Could not remove the ItemPrice!")?;
    match deleted {
        0 => Err(Error::not_found("ItemPrice", id)),
        _ => Ok(()),
    }
}

fn create_shipping_price(
    conn: &ConnType,
    item_price_id: i32,
    request: &ShippingPriceCreateRequest,
) -> Result<()> {
    diesel::insert_into(shipping_prices::table)
        .values(&request.to_new(item_price_id))
        .execute(conn)
        .context("Could not create the ShippingPrice!")?;
    Ok(())
}

fn destroy_shipping_price(conn: &ConnType, item_price_id: i32) -> Result<()> {
    diesel::delete(shipping_prices::table.filter(shipping_prices::item_price_id.eq(item_price_id)))
        .execute(conn)
        .context("Could not remove the ShippingPrice!")?;
    Ok(())
}

fn create_cryptocurrency_address(
    conn: &ConnType,
    item_price_id: i32,
    request: &CryptocurrencyAddressCreateRequest,
) -> Result<()> {
    diesel::insert_into(cryptocurrency_addresses::table)
        .values(&request.to_new(item_price_id))
        .execute(conn)
        .context("Could not create the CryptocurrencyAddress!")?;
    Ok(())
}

fn destroy_cryptocurrency_address(conn: &ConnType, item_price_id: i32) -> Result<()> {
    diesel::delete(
        cryptocurrency_addresses::table
            .filter(cryptocurrency_addresses::item_price_id.eq(item_price_id)),
    )
    .execute(conn)
    .context("Could not remove the CryptocurrencyAddress!")?;
    Ok(())
}
