use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};

use agora_diesel_utils::DbTextField;

use crate::db::model::{Escrow, EscrowCreateRequest, ItemPrice, ItemPriceCreateRequest};
use crate::db::schema::payment_informations;
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
pub enum PaymentType {
    Sale,
    Free,
    Rent,
}

#[derive(Clone, Debug, Queryable)]
pub(crate) struct PaymentInformationRow {
    pub id: i32,
    pub payment_type: PaymentType,
    pub listing_item_id: Option<i32>,
    pub listing_item_template_id: Option<i32>,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "payment_informations"]
pub(crate) struct NewPaymentInformation {
    pub payment_type: PaymentType,
    pub listing_item_id: Option<i32>,
    pub listing_item_template_id: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInformation {
    pub id: i32,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub listing_item_id: Option<i32>,
    pub listing_item_template_id: Option<i32>,
    pub escrow: Escrow,
    pub item_price: ItemPrice,
}

impl PaymentInformation {
    pub(crate) fn from_row(
        row: PaymentInformationRow,
        escrow: Escrow,
        item_price: ItemPrice,
    ) -> PaymentInformation {
        PaymentInformation {
            id: row.id,
            payment_type: row.payment_type,
            listing_item_id: row.listing_item_id,
            listing_item_template_id: row.listing_item_template_id,
            escrow,
            item_price,
        }
    }
}

/// At least one of the back-references must be set before the request
/// reaches the database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInformationCreateRequest {
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_item_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_item_template_id: Option<i32>,
    pub escrow: EscrowCreateRequest,
    pub item_price: ItemPriceCreateRequest,
}

/// Each child present in the request replaces the stored one, together with
/// its own children.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInformationUpdateRequest {
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    #[serde(default)]
    pub escrow: Option<EscrowCreateRequest>,
    #[serde(default)]
    pub item_price: Option<ItemPriceCreateRequest>,
}

impl PaymentInformationCreateRequest {
    pub(crate) fn to_new(&self) -> NewPaymentInformation {
        NewPaymentInformation {
            payment_type: self.payment_type,
            listing_item_id: self.listing_item_id,
            listing_item_template_id: self.listing_item_template_id,
        }
    }
}

impl From<PaymentInformationCreateRequest> for PaymentInformationUpdateRequest {
    fn from(request: PaymentInformationCreateRequest) -> Self {
        PaymentInformationUpdateRequest {
            payment_type: request.payment_type,
            escrow: Some(request.escrow),
            item_price: Some(request.item_price),
        }
    }
}

impl Validate for PaymentInformationCreateRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        self.escrow.validate()?;
        self.item_price.validate()
    }
}

impl Validate for PaymentInformationUpdateRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(escrow) = &self.escrow {
            escrow.validate()?;
        }
        if let Some(item_price) = &self.item_price {
            item_price.validate()?;
        }
        Ok(())
    }
}
