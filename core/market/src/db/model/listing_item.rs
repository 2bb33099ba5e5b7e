use chrono::NaiveDateTime;
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};

use agora_diesel_utils::DbTextField;

use crate::db::model::{PaymentInformation, PaymentInformationCreateRequest};
use crate::db::schema::{
    item_informations, listing_item_objects, listing_item_templates, listing_items,
    messaging_informations,
};
use crate::hash::{ContentHash, HashableObjectType, HashingError};
use crate::protocol::validation::{Validate, ValidationError};

/// Listing content rows belong either to a received listing item or to a
/// locally authored template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, derive_more::Display)]
pub enum ListingOwner {
    #[display(fmt = "ListingItem [{}]", _0)]
    Item(i32),
    #[display(fmt = "ListingItemTemplate [{}]", _0)]
    Template(i32),
}

impl ListingOwner {
    pub fn listing_item_id(&self) -> Option<i32> {
        match self {
            ListingOwner::Item(id) => Some(*id),
            ListingOwner::Template(_) => None,
        }
    }

    pub fn listing_item_template_id(&self) -> Option<i32> {
        match self {
            ListingOwner::Item(_) => None,
            ListingOwner::Template(id) => Some(*id),
        }
    }
}

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
pub enum MessagingProtocol {
    Smsg,
}

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
pub enum ListingItemObjectType {
    Table,
    Dropdown,
    Checkbox,
}

#[derive(Clone, Debug, PartialEq, Queryable, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInformation {
    pub id: i32,
    pub title: String,
    pub short_description: String,
    pub long_description: String,
    pub category: String,
    pub listing_item_id: Option<i32>,
    pub listing_item_template_id: Option<i32>,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "item_informations"]
pub(crate) struct NewItemInformation {
    pub title: String,
    pub short_description: String,
    pub long_description: String,
    pub category: String,
    pub listing_item_id: Option<i32>,
    pub listing_item_template_id: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Queryable, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagingInformation {
    pub id: i32,
    pub protocol: MessagingProtocol,
    pub public_key: String,
    pub listing_item_id: Option<i32>,
    pub listing_item_template_id: Option<i32>,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "messaging_informations"]
pub(crate) struct NewMessagingInformation {
    pub protocol: MessagingProtocol,
    pub public_key: String,
    pub listing_item_id: Option<i32>,
    pub listing_item_template_id: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Queryable, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingItemObject {
    pub id: i32,
    #[serde(rename = "type")]
    pub object_type: ListingItemObjectType,
    pub description: String,
    pub order_number: i32,
    pub listing_item_id: Option<i32>,
    pub listing_item_template_id: Option<i32>,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "listing_item_objects"]
pub(crate) struct NewListingItemObject {
    pub object_type: ListingItemObjectType,
    pub description: String,
    pub order_number: i32,
    pub listing_item_id: Option<i32>,
    pub listing_item_template_id: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInformationCreateRequest {
    pub title: String,
    pub short_description: String,
    pub long_description: String,
    pub category: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagingInformationCreateRequest {
    pub protocol: MessagingProtocol,
    pub public_key: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingItemObjectCreateRequest {
    #[serde(rename = "type")]
    pub object_type: ListingItemObjectType,
    pub description: String,
    #[serde(default)]
    pub order_number: i32,
}

/// Hashable part of a listing, shared by listing items and templates. This is
/// also the `listing` payload of an item-add message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingItemContent {
    pub information: ItemInformationCreateRequest,
    pub payment: PaymentInformationCreateRequest,
    #[serde(default)]
    pub messaging: Vec<MessagingInformationCreateRequest>,
    #[serde(default)]
    pub objects: Vec<ListingItemObjectCreateRequest>,
}

impl ListingItemContent {
    pub fn hash(&self) -> Result<ContentHash, HashingError> {
        ContentHash::generate(self, HashableObjectType::ListingItem)
    }
}

impl ItemInformationCreateRequest {
    pub(crate) fn to_new(&self, owner: ListingOwner) -> NewItemInformation {
        NewItemInformation {
            title: self.title.clone(),
            short_description: self.short_description.clone(),
            long_description: self.long_description.clone(),
            category: self.category.clone(),
            listing_item_id: owner.listing_item_id(),
            listing_item_template_id: owner.listing_item_template_id(),
        }
    }
}

impl MessagingInformationCreateRequest {
    pub(crate) fn to_new(&self, owner: ListingOwner) -> NewMessagingInformation {
        NewMessagingInformation {
            protocol: self.protocol,
            public_key: self.public_key.clone(),
            listing_item_id: owner.listing_item_id(),
            listing_item_template_id: owner.listing_item_template_id(),
        }
    }
}

impl ListingItemObjectCreateRequest {
    pub(crate) fn to_new(&self, owner: ListingOwner) -> NewListingItemObject {
        NewListingItemObject {
            object_type: self.object_type,
            description: self.description.clone(),
            order_number: self.order_number,
            listing_item_id: owner.listing_item_id(),
            listing_item_template_id: owner.listing_item_template_id(),
        }
    }
}

impl Validate for ListingItemContent {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.information.title.trim().is_empty() {
            return Err(ValidationError::invalid("information.title", "is empty"));
        }
        if self.messaging.iter().any(|m| m.public_key.trim().is_empty()) {
            return Err(ValidationError::invalid("messaging.publicKey", "is empty"));
        }
        self.payment.validate()
    }
}

/// Loaded content children of a listing item or a template.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ListingContent {
    pub information: ItemInformation,
    pub payment: PaymentInformation,
    pub messaging: Vec<MessagingInformation>,
    pub objects: Vec<ListingItemObject>,
}

#[derive(Clone, Debug, Queryable)]
pub(crate) struct ListingItemRow {
    pub id: i32,
    pub hash: ContentHash,
    pub seller: String,
    pub market: String,
    pub listing_item_template_id: Option<i32>,
    pub posted_at: Option<NaiveDateTime>,
    pub received_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "listing_items"]
pub(crate) struct NewListingItem {
    pub hash: ContentHash,
    pub seller: String,
    pub market: String,
    pub listing_item_template_id: Option<i32>,
    pub posted_at: Option<NaiveDateTime>,
    pub received_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingItem {
    pub id: i32,
    pub hash: ContentHash,
    pub seller: String,
    pub market: String,
    pub listing_item_template_id: Option<i32>,
    pub posted_at: Option<NaiveDateTime>,
    pub received_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub information: ItemInformation,
    pub payment: PaymentInformation,
    pub messaging: Vec<MessagingInformation>,
    pub objects: Vec<ListingItemObject>,
}

impl ListingItem {
    pub(crate) fn from_row(row: ListingItemRow, content: ListingContent) -> ListingItem {
        ListingItem {
            id: row.id,
            hash: row.hash,
            seller: row.seller,
            market: row.market,
            listing_item_template_id: row.listing_item_template_id,
            posted_at: row.posted_at,
            received_at: row.received_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            information: content.information,
            payment: content.payment,
            messaging: content.messaging,
            objects: content.objects,
        }
    }
}

/// Listing item as received from the network. The hash must be the hash of
/// `content`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingItemCreateRequest {
    pub hash: ContentHash,
    pub seller: String,
    pub market: String,
    #[serde(default)]
    pub listing_item_template_id: Option<i32>,
    #[serde(default)]
    pub posted_at: Option<NaiveDateTime>,
    pub received_at: NaiveDateTime,
    pub content: ListingItemContent,
}

#[derive(Clone, Debug, Queryable)]
pub(crate) struct ListingItemTemplateRow {
    pub id: i32,
    pub hash: ContentHash,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "listing_item_templates"]
pub(crate) struct NewListingItemTemplate {
    pub hash: ContentHash,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingItemTemplate {
    pub id: i32,
    pub hash: ContentHash,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub information: ItemInformation,
    pub payment: PaymentInformation,
    pub messaging: Vec<MessagingInformation>,
    pub objects: Vec<ListingItemObject>,
}

impl ListingItemTemplate {
    pub(crate) fn from_row(
        row: ListingItemTemplateRow,
        content: ListingContent,
    ) -> ListingItemTemplate {
        ListingItemTemplate {
            id: row.id,
            hash: row.hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
            information: content.information,
            payment: content.payment,
            messaging: content.messaging,
            objects: content.objects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_listing_content;

    #[test]
    fn test_stored_listing_hashes_like_its_content() {
        let content = sample_listing_content("Bike");

        let mut with_back_references = content.clone();
        with_back_references.payment.listing_item_id = Some(17);
        with_back_references.payment.listing_item_template_id = Some(3);

        assert_eq!(
            content.hash().unwrap(),
            with_back_references.hash().unwrap()
        );
    }

    #[test]
    fn test_listing_content_validation() {
        let mut content = sample_listing_content("Bike");
        assert!(content.validate().is_ok());

        content.information.title = "  ".to_string();
        assert_eq!(
            content.validate(),
            Err(ValidationError::invalid("information.title", "is empty"))
        );
    }
}
