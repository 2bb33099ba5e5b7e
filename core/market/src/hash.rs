//! Content addressing of marketplace objects.
//!
//! Objects are serialized to JSON, stripped of everything that differs between
//! two copies of the same content (database ids, back-references, timestamps,
//! nulls), canonicalized and digested together with a type discriminator.
use diesel::sql_types::Text;
use digest::Digest;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use sha3::Sha3_256;
use std::fmt::Display;
use std::str::FromStr;

use agora_diesel_utils::DbTextField;

pub const HASH_LEN: usize = 64;
pub const HASH_BYTES_LEN: usize = 32;

/// Field names compared after dropping underscores and lowercasing, so both
/// `listingItemId` and `listing_item_id` are covered.
const VOLATILE_FIELDS: &[&str] = &[
    "id",
    "hash",
    "createdat",
    "updatedat",
    "postedat",
    "receivedat",
    "expiredat",
    "listingitemid",
    "listingitemtemplateid",
    "paymentinformationid",
    "escrowid",
    "itempriceid",
    "actionmessageid",
    "bidid",
    "proposalid",
    "proposalresultid",
];

#[derive(
    strum_macros::EnumString,
    strum_macros::Display,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    Debug,
    Clone,
    Copy,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum HashableObjectType {
    ListingItem,
    ItemImage,
    CommentCreateRequest,
    Proposal,
    ProposalOption,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum HashingError {
    #[error("Can't serialize {0} for hashing: {1}")]
    Serialization(HashableObjectType, String),
    #[error("{0} has no content left to hash after normalization.")]
    EmptyContent(HashableObjectType),
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ContentHashParseError {
    #[error("Content hash [{0}] contains non hexadecimal characters.")]
    NotHexadecimal(String),
    #[error("Content hash [{0}] has invalid length. Should be |{}|", HASH_LEN)]
    InvalidLength(String),
}

#[derive(DbTextField, Debug, Clone, AsExpression, FromSqlRow, Hash, PartialEq, Eq)]
#[sql_type = "Text"]
pub struct ContentHash {
    hash: [u8; HASH_BYTES_LEN],
}

impl ContentHash {
    /// Hashes `object` as an instance of `object_type`.
    pub fn generate<T: Serialize + ?Sized>(
        object: &T,
        object_type: HashableObjectType,
    ) -> Result<ContentHash, HashingError> {
        let value = serde_json::to_value(object)
            .map_err(|e| HashingError::Serialization(object_type, e.to_string()))?;

        let normalized = normalize(value);
        if is_empty(&normalized) {
            return Err(HashingError::EmptyContent(object_type));
        }

        let canonical = serde_json_canonicalizer::to_vec(&normalized)
            .map_err(|e| HashingError::Serialization(object_type, e.to_string()))?;

        let mut hasher = Sha3_256::new();
        hasher.input(object_type.to_string());
        hasher.input(canonical);

        let mut hash = [0u8; HASH_BYTES_LEN];
        hash.copy_from_slice(&hasher.result());
        Ok(ContentHash { hash })
    }

    pub fn to_bytes(&self) -> [u8; HASH_BYTES_LEN] {
        self.hash
    }
}

/// Shorthand for [`ContentHash::generate`].
pub fn hash<T: Serialize + ?Sized>(
    object: &T,
    object_type: HashableObjectType,
) -> Result<ContentHash, HashingError> {
    ContentHash::generate(object, object_type)
}

fn is_volatile(field: &str) -> bool {
    let field = field.replace('_', "").to_lowercase();
    VOLATILE_FIELDS.contains(&field.as_str())
}

fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(field, value)| !value.is_null() && !is_volatile(field))
                .map(|(field, value)| (field, normalize(value)))
                .collect(),
        ),
        Value::Array(values) => Value::Array(values.into_iter().map(normalize).collect()),
        value => value,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(values) => values.is_empty(),
        _ => false,
    }
}

impl FromStr for ContentHash {
    type Err = ContentHashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.chars().all(|character| character.is_ascii_hexdigit()) {
            Err(ContentHashParseError::NotHexadecimal(s.to_string()))?;
        }

        if s.len() != HASH_LEN {
            Err(ContentHashParseError::InvalidLength(s.to_string()))?;
        }

        let mut hash = [0u8; HASH_BYTES_LEN];
        hex::decode_to_slice(s, &mut hash)
            .map_err(|_| ContentHashParseError::NotHexadecimal(s.to_string()))?;

        Ok(ContentHash { hash })
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.hash))
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<<S as Serializer>::Ok, <S as Serializer>::Error> {
        serializer.serialize_str(&hex::encode(self.hash))
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, <D as Deserializer<'de>>::Error> {
        let s = String::deserialize(deserializer)?;
        FromStr::from_str(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::ContentHashParseError::{InvalidLength, NotHexadecimal};
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[derive(Serialize)]
    struct Ratio {
        buyer: i32,
        seller: i32,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct ReversedRatio {
        seller: i32,
        buyer: i32,
        escrow_id: Option<i32>,
    }

    #[test]
    fn test_hash_is_deterministic() {
        let content = json!({"title": "Bike", "price": {"base": 1.5, "currency": "PART"}});
        let first = hash(&content, HashableObjectType::ListingItem).unwrap();
        let second = hash(&content, HashableObjectType::ListingItem).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.to_string().len(), HASH_LEN);
        assert!(first
            .to_string()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_hash_ignores_field_order() {
        let ratio = Ratio {
            buyer: 100,
            seller: 50,
        };
        let reversed = ReversedRatio {
            seller: 50,
            buyer: 100,
            escrow_id: Some(7),
        };

        assert_eq!(
            hash(&ratio, HashableObjectType::ListingItem).unwrap(),
            hash(&reversed, HashableObjectType::ListingItem).unwrap()
        );
    }

    #[test]
    fn test_hash_ignores_volatile_fields() {
        let stored = json!({
            "id": 12,
            "hash": "abc",
            "createdAt": "2020-06-19T18:53:01",
            "information": {"id": 3, "listingItemId": 12, "title": "Bike"},
            "objects": [{"id": 5, "listing_item_id": 12, "description": "colour"}],
            "memo": null
        });
        let received = json!({
            "information": {"title": "Bike"},
            "objects": [{"description": "colour"}]
        });

        assert_eq!(
            hash(&stored, HashableObjectType::ListingItem).unwrap(),
            hash(&received, HashableObjectType::ListingItem).unwrap()
        );
    }

    #[test]
    fn test_hash_detects_content_change() {
        let bike = json!({"title": "Bike"});
        let car = json!({"title": "Car"});

        assert_ne!(
            hash(&bike, HashableObjectType::ListingItem).unwrap(),
            hash(&car, HashableObjectType::ListingItem).unwrap()
        );
    }

    #[test_case(HashableObjectType::ListingItem, HashableObjectType::Proposal)]
    #[test_case(HashableObjectType::Proposal, HashableObjectType::ProposalOption)]
    #[test_case(HashableObjectType::ItemImage, HashableObjectType::CommentCreateRequest)]
    fn test_hash_depends_on_object_type(first: HashableObjectType, second: HashableObjectType) {
        let content = json!({"title": "Bike", "description": "Red"});

        assert_ne!(hash(&content, first).unwrap(), hash(&content, second).unwrap());
    }

    #[test_case(json!(null) ; "null")]
    #[test_case(json!({}) ; "empty object")]
    #[test_case(json!({"id": 1, "createdAt": "2020-06-19", "memo": null}) ; "only volatile fields")]
    fn test_hash_rejects_empty_content(content: Value) {
        assert_eq!(
            hash(&content, HashableObjectType::Proposal),
            Err(HashingError::EmptyContent(HashableObjectType::Proposal))
        );
    }

    #[test]
    fn test_hash_rejects_unserializable_content() {
        let mut map = std::collections::HashMap::new();
        map.insert((1, 2), "value");

        assert!(matches!(
            hash(&map, HashableObjectType::ListingItem),
            Err(HashingError::Serialization(HashableObjectType::ListingItem, _))
        ));
    }

    #[test]
    fn test_discriminators() {
        assert_eq!(HashableObjectType::ListingItem.to_string(), "listing-item");
        assert_eq!(
            HashableObjectType::CommentCreateRequest.to_string(),
            "comment-create-request"
        );
        assert_eq!(
            HashableObjectType::from_str("proposal-option").unwrap(),
            HashableObjectType::ProposalOption
        );
    }

    #[test]
    fn should_parse_content_hash() {
        let text = "edb0016d9f8bafb54540da34f05a8d510de8114488f23916276bdead05509a53";
        let content_hash = ContentHash::from_str(text).unwrap();
        assert_eq!(content_hash.to_string(), text);
        assert_eq!(
            serde_json::to_value(&content_hash).unwrap(),
            Value::String(text.to_string())
        );
    }

    #[test]
    fn should_fail_to_parse_content_hash() {
        assert_eq!(ContentHash::from_str(""), Err(InvalidLength("".into())));
        assert_eq!(ContentHash::from_str("gfht"), Err(NotHexadecimal("gfht".into())));
        assert_eq!(
            ContentHash::from_str("34324").unwrap_err().to_string(),
            "Content hash [34324] has invalid length. Should be |64|"
        );
    }
}
