use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};

use agora_diesel_utils::DbTextField;

use crate::db::schema::{cryptocurrency_addresses, item_prices, shipping_prices};
use crate::protocol::validation::{Validate, ValidationError};

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
pub enum CryptocurrencyAddressType {
    Normal,
    Stealth,
}

#[derive(Clone, Debug, Queryable)]
pub(crate) struct ItemPriceRow {
    pub id: i32,
    pub currency: String,
    pub base_price: f64,
    pub payment_information_id: i32,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "item_prices"]
pub(crate) struct NewItemPrice {
    pub currency: String,
    pub base_price: f64,
    pub payment_information_id: i32,
}

#[derive(Clone, Debug, PartialEq, Queryable, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingPrice {
    pub id: i32,
    pub domestic: f64,
    pub international: f64,
    pub item_price_id: i32,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "shipping_prices"]
pub(crate) struct NewShippingPrice {
    pub domestic: f64,
    pub international: f64,
    pub item_price_id: i32,
}

#[derive(Clone, Debug, PartialEq, Queryable, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptocurrencyAddress {
    pub id: i32,
    #[serde(rename = "type")]
    pub address_type: CryptocurrencyAddressType,
    pub address: String,
    pub item_price_id: i32,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "cryptocurrency_addresses"]
pub(crate) struct NewCryptocurrencyAddress {
    pub address_type: CryptocurrencyAddressType,
    pub address: String,
    pub item_price_id: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPrice {
    pub id: i32,
    pub currency: String,
    pub base_price: f64,
    pub payment_information_id: i32,
    pub shipping_price: Option<ShippingPrice>,
    pub cryptocurrency_address: Option<CryptocurrencyAddress>,
}

impl ItemPrice {
    pub(crate) fn from_row(
        row: ItemPriceRow,
        shipping_price: Option<ShippingPrice>,
        cryptocurrency_address: Option<CryptocurrencyAddress>,
    ) -> ItemPrice {
        ItemPrice {
            id: row.id,
            currency: row.currency,
            base_price: row.base_price,
            payment_information_id: row.payment_information_id,
            shipping_price,
            cryptocurrency_address,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingPriceCreateRequest {
    pub domestic: f64,
    pub international: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptocurrencyAddressCreateRequest {
    #[serde(rename = "type")]
    pub address_type: CryptocurrencyAddressType,
    pub address: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPriceCreateRequest {
    pub currency: String,
    pub base_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_price: Option<ShippingPriceCreateRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cryptocurrency_address: Option<CryptocurrencyAddressCreateRequest>,
}

/// Each child present in the request replaces the stored one. Absent children
/// are kept.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPriceUpdateRequest {
    pub currency: String,
    pub base_price: f64,
    #[serde(default)]
    pub shipping_price: Option<ShippingPriceCreateRequest>,
    #[serde(default)]
    pub cryptocurrency_address: Option<CryptocurrencyAddressCreateRequest>,
}

impl ShippingPriceCreateRequest {
    pub(crate) fn to_new(&self, item_price_id: i32) -> NewShippingPrice {
        NewShippingPrice {
            domestic: self.domestic,
            international: self.international,
            item_price_id,
        }
    }
}

impl CryptocurrencyAddressCreateRequest {
    pub(crate) fn to_new(&self, item_price_id: i32) -> NewCryptocurrencyAddress {
        NewCryptocurrencyAddress {
            address_type: self.address_type,
            address: self.address.clone(),
            item_price_id,
        }
    }
}

impl ItemPriceCreateRequest {
    pub(crate) fn to_new(&self, payment_information_id: i32) -> NewItemPrice {
        NewItemPrice {
            currency: self.currency.clone(),
            base_price: self.base_price,
            payment_information_id,
        }
    }
}

impl From<ItemPriceCreateRequest> for ItemPriceUpdateRequest {
    fn from(request: ItemPriceCreateRequest) -> Self {
        ItemPriceUpdateRequest {
            currency: request.currency,
            base_price: request.base_price,
            shipping_price: request.shipping_price,
            cryptocurrency_address: request.cryptocurrency_address,
        }
    }
}

fn validate_amount(field: &'static str, amount: f64) -> Result<(), ValidationError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(ValidationError::invalid(
            field,
            format!("{} is not a valid amount", amount),
        ));
    }
    Ok(())
}

fn validate_price(
    currency: &str,
    base_price: f64,
    shipping_price: &Option<ShippingPriceCreateRequest>,
    cryptocurrency_address: &Option<CryptocurrencyAddressCreateRequest>,
) -> Result<(), ValidationError> {
    if currency.trim().is_empty() {
        return Err(ValidationError::invalid("itemPrice.currency", "is empty"));
    }
    validate_amount("itemPrice.basePrice", base_price)?;

    if let Some(shipping) = shipping_price {
        validate_amount("shippingPrice.domestic", shipping.domestic)?;
        validate_amount("shippingPrice.international", shipping.international)?;
    }
    if let Some(address) = cryptocurrency_address {
        if address.address.trim().is_empty() {
            return Err(ValidationError::invalid(
                "cryptocurrencyAddress.address",
                "is empty",
            ));
        }
    }
    Ok(())
}

impl Validate for ItemPriceCreateRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_price(
            &self.currency,
            self.base_price,
            &self.shipping_price,
            &self.cryptocurrency_address,
        )
    }
}

impl Validate for ItemPriceUpdateRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_price(
            &self.currency,
            self.base_price,
            &self.shipping_price,
            &self.cryptocurrency_address,
        )
    }
}
