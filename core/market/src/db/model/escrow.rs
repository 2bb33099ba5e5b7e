use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};

use agora_diesel_utils::DbTextField;

use crate::db::schema::{escrow_ratios, escrows};
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
pub enum EscrowType {
    /// Mutually assured destruction: both sides deposit.
    Mad,
    /// Finalize early.
    Fe,
    /// No escrow.
    Nop,
}

#[derive(Clone, Debug, Queryable)]
pub(crate) struct EscrowRow {
    pub id: i32,
    pub escrow_type: EscrowType,
    pub seconds_to_lock: i32,
    pub payment_information_id: i32,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "escrows"]
pub(crate) struct NewEscrow {
    pub escrow_type: EscrowType,
    pub seconds_to_lock: i32,
    pub payment_information_id: i32,
}

#[derive(Clone, Debug, PartialEq, Queryable, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowRatio {
    pub id: i32,
    pub buyer: i32,
    pub seller: i32,
    pub escrow_id: i32,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "escrow_ratios"]
pub(crate) struct NewEscrowRatio {
    pub buyer: i32,
    pub seller: i32,
    pub escrow_id: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Escrow {
    pub id: i32,
    #[serde(rename = "type")]
    pub escrow_type: EscrowType,
    pub seconds_to_lock: i32,
    pub payment_information_id: i32,
    pub ratio: EscrowRatio,
}

impl Escrow {
    pub(crate) fn from_row(row: EscrowRow, ratio: EscrowRatio) -> Escrow {
        Escrow {
            id: row.id,
            escrow_type: row.escrow_type,
            seconds_to_lock: row.seconds_to_lock,
            payment_information_id: row.payment_information_id,
            ratio,
        }
    }
}

/// Percentages of the price each side deposits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowRatioCreateRequest {
    pub buyer: i32,
    pub seller: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowCreateRequest {
    #[serde(rename = "type")]
    pub escrow_type: EscrowType,
    #[serde(default)]
    pub seconds_to_lock: i32,
    pub ratio: EscrowRatioCreateRequest,
}

/// Scalars are always overwritten; `ratio` replaces the current one if present.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowUpdateRequest {
    #[serde(rename = "type")]
    pub escrow_type: EscrowType,
    #[serde(default)]
    pub seconds_to_lock: i32,
    #[serde(default)]
    pub ratio: Option<EscrowRatioCreateRequest>,
}

impl EscrowRatioCreateRequest {
    pub(crate) fn into_new(self, escrow_id: i32) -> NewEscrowRatio {
        NewEscrowRatio {
            buyer: self.buyer,
            seller: self.seller,
            escrow_id,
        }
    }
}

impl EscrowCreateRequest {
    pub(crate) fn to_new(&self, payment_information_id: i32) -> NewEscrow {
        NewEscrow {
            escrow_type: self.escrow_type,
            seconds_to_lock: self.seconds_to_lock,
            payment_information_id,
        }
    }
}

impl From<EscrowCreateRequest> for EscrowUpdateRequest {
    fn from(request: EscrowCreateRequest) -> Self {
        EscrowUpdateRequest {
            escrow_type: request.escrow_type,
            seconds_to_lock: request.seconds_to_lock,
            ratio: Some(request.ratio),
        }
    }
}

impl Validate for EscrowRatioCreateRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [("ratio.buyer", self.buyer), ("ratio.seller", self.seller)] {
            if value < 0 {
                return Err(ValidationError::invalid(field, "can't be negative"));
            }
        }
        Ok(())
    }
}

impl Validate for EscrowCreateRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.seconds_to_lock < 0 {
            return Err(ValidationError::invalid(
                "escrow.secondsToLock",
                "can't be negative",
            ));
        }
        self.ratio.validate()
    }
}

impl Validate for EscrowUpdateRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.seconds_to_lock < 0 {
            return Err(ValidationError::invalid(
                "escrow.secondsToLock",
                "can't be negative",
            ));
        }
        match &self.ratio {
            Some(ratio) => ratio.validate(),
            None => Ok(()),
        }
    }
}
