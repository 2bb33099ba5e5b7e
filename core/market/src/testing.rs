//! Fixtures shared by unit and integration tests.
use chrono::{NaiveDate, NaiveDateTime};
use std::path::Path;
use std::sync::Arc;

use agora_persistence::executor::DbExecutor;

use crate::config::{Config, DbConfig, ProtocolConfig, WorkerConfig};
use crate::db::model::{
    ActionType, CryptocurrencyAddressCreateRequest, CryptocurrencyAddressType,
    EscrowCreateRequest, EscrowRatioCreateRequest, EscrowType, ItemInformationCreateRequest,
    ItemPriceCreateRequest, ListingItem, ListingItemContent, ListingItemObjectCreateRequest,
    ListingItemObjectType, MessageEscrowCreateRequest, MessageObjectCreateRequest,
    MessagingInformationCreateRequest, MessagingProtocol, PaymentInformationCreateRequest,
    PaymentType, ProposalOptionCreateRequest, ProposalType, ShippingPriceCreateRequest,
};
use crate::hash::ContentHash;
use crate::market::MarketService;
use crate::processor::ProcessedMessage;
use crate::protocol::{
    MarketplaceMessage, MessagingData, ProposalMessage, ReceivedMessage, VoteMessage,
};

pub const PROTOCOL_VERSION: &str = "0300";
pub const SAMPLE_ITEM_HASH: &str =
    "edb0016d9f8bafb54540da34f05a8d510de8114488f23916276bdead05509a53";
pub const SELLER: &str = "pmZpGbH2j2dDYU6LvTryHbEsM3iQzxpnj1";
pub const BUYER: &str = "pqZDE7fNJ2KUvU4ynYt4G8aTcgHdPTRzJF";
pub const MARKET: &str = "pmktyVZshdMAQ6DPbbRXEFNGuzMbTMkqAA";

/// Compares errors by their messages, for error types without `PartialEq`.
#[macro_export]
macro_rules! assert_err_eq {
    ($expected:expr, $actual:expr $(,)*) => {
        assert_eq!($expected.to_string(), $actual.unwrap_err().to_string())
    };
}

/// Opens a database file in `dir` and applies the market migrations.
pub fn migrated_db(dir: &Path, name: &str) -> anyhow::Result<DbExecutor> {
    let db = DbExecutor::from_data_dir(dir, name)?;
    crate::db::init(&db)?;
    Ok(db)
}

pub fn test_config(data_dir: &Path, workers: usize) -> Config {
    Config {
        db: DbConfig {
            data_dir: data_dir.to_path_buf(),
            db_name: "marketplace".to_string(),
        },
        worker: WorkerConfig {
            queue_size: 16,
            count: workers,
        },
        protocol: ProtocolConfig {
            supported_versions: PROTOCOL_VERSION.to_string(),
        },
    }
}

/// Market service on a fresh database in `data_dir`.
pub fn test_market(data_dir: &Path, workers: usize) -> anyhow::Result<MarketService> {
    Ok(MarketService::from_config(Arc::new(test_config(data_dir, workers)))?)
}

/// Ingests a sample listing sent by `SELLER` and returns the stored item.
pub async fn ingest_listing(
    market: &MarketService,
    msgid: &str,
    title: &str,
) -> anyhow::Result<ListingItem> {
    match market
        .process(listing_item_message(msgid, sample_listing_content(title)))
        .await?
    {
        ProcessedMessage::ListingItem { item, .. } => Ok(item),
        other => anyhow::bail!("Expected a listing item, got {:?}", other),
    }
}

pub fn sample_timestamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2020, 6, 19)
        .and_then(|date| date.and_hms_opt(18, 53, 1))
        .unwrap_or_default()
}

pub fn sample_escrow() -> EscrowCreateRequest {
    EscrowCreateRequest {
        escrow_type: EscrowType::Mad,
        seconds_to_lock: 4 * 24 * 3600,
        ratio: EscrowRatioCreateRequest {
            buyer: 100,
            seller: 100,
        },
    }
}

pub fn sample_item_price() -> ItemPriceCreateRequest {
    ItemPriceCreateRequest {
        currency: "PART".to_string(),
        base_price: 12.5,
        shipping_price: Some(ShippingPriceCreateRequest {
            domestic: 1.0,
            international: 3.25,
        }),
        cryptocurrency_address: Some(CryptocurrencyAddressCreateRequest {
            address_type: CryptocurrencyAddressType::Stealth,
            address: "ps1qqpvvvphd2xkyxh4mnpdy5lzwvwu8a8t0bh5tkk4s4cpjj7g5".to_string(),
        }),
    }
}

pub fn sample_payment() -> PaymentInformationCreateRequest {
    PaymentInformationCreateRequest {
        payment_type: PaymentType::Sale,
        listing_item_id: None,
        listing_item_template_id: None,
        escrow: sample_escrow(),
        item_price: sample_item_price(),
    }
}

pub fn sample_listing_content(title: &str) -> ListingItemContent {
    ListingItemContent {
        information: ItemInformationCreateRequest {
            title: title.to_string(),
            short_description: format!("{} in good condition", title),
            long_description: format!("{} used for two summers, no damage.", title),
            category: "cat_high_sports".to_string(),
        },
        payment: sample_payment(),
        messaging: vec![MessagingInformationCreateRequest {
            protocol: MessagingProtocol::Smsg,
            public_key: "pubkey-seller".to_string(),
        }],
        objects: vec![ListingItemObjectCreateRequest {
            object_type: ListingItemObjectType::Checkbox,
            description: "Includes helmet".to_string(),
            order_number: 0,
        }],
    }
}

pub fn sample_messaging_data(msgid: &str, from: &str, to: &str) -> MessagingData {
    MessagingData {
        msgid: msgid.to_string(),
        version: PROTOCOL_VERSION.to_string(),
        sent: Some(sample_timestamp()),
        received: Some(sample_timestamp()),
        from: from.to_string(),
        to: to.to_string(),
    }
}

pub fn listing_item_message(msgid: &str, content: ListingItemContent) -> ReceivedMessage {
    let mut message = MarketplaceMessage::new(PROTOCOL_VERSION, ActionType::ItemAdd.to_string());
    message.listing = Some(content);
    ReceivedMessage {
        data: sample_messaging_data(msgid, SELLER, MARKET),
        message,
    }
}

/// Bid or escrow action on `item` sent from `from` to `to`.
pub fn action_message(
    msgid: &str,
    action: ActionType,
    item: &ContentHash,
    from: &str,
    to: &str,
) -> ReceivedMessage {
    let mut message = MarketplaceMessage::new(PROTOCOL_VERSION, action.to_string());
    message.item = Some(item.to_string());
    message.nonce = Some("randomness".to_string());
    message.objects = vec![MessageObjectCreateRequest::new("colour", "black")];
    if action.is_escrow_action() {
        message.escrow = Some(MessageEscrowCreateRequest {
            escrow_type: action.to_string().to_lowercase(),
            rawtx: format!("rawtx-{}", msgid),
        });
    }
    ReceivedMessage {
        data: sample_messaging_data(msgid, from, to),
        message,
    }
}

pub fn sample_proposal(block_start: i64, block_end: i64) -> ProposalMessage {
    ProposalMessage {
        block_start,
        block_end,
        proposal_type: ProposalType::PublicVote,
        title: "Lower the market fee".to_string(),
        description: "Should the market fee go down to 1%?".to_string(),
        item: None,
        options: vec![
            ProposalOptionCreateRequest {
                option_id: 0,
                description: "Yes".to_string(),
            },
            ProposalOptionCreateRequest {
                option_id: 1,
                description: "No".to_string(),
            },
        ],
    }
}

pub fn proposal_message(msgid: &str, from: &str, proposal: ProposalMessage) -> ReceivedMessage {
    let mut message =
        MarketplaceMessage::new(PROTOCOL_VERSION, ActionType::ProposalAdd.to_string());
    message.proposal = Some(proposal);
    ReceivedMessage {
        data: sample_messaging_data(msgid, from, MARKET),
        message,
    }
}

pub fn vote_message(
    msgid: &str,
    from: &str,
    proposal_hash: &ContentHash,
    option_id: i32,
    block: i64,
    weight: i64,
) -> ReceivedMessage {
    let mut message = MarketplaceMessage::new(PROTOCOL_VERSION, ActionType::Vote.to_string());
    message.vote = Some(VoteMessage {
        proposal_hash: proposal_hash.clone(),
        option_id,
        block,
        weight,
    });
    ReceivedMessage {
        data: sample_messaging_data(msgid, from, MARKET),
        message,
    }
}
