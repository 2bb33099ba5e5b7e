use tempdir::TempDir;

use agora_market::db::dao::EscrowDao;
use agora_market::db::model::{ActionType, EscrowRatioCreateRequest, EscrowType, EscrowUpdateRequest};
use agora_market::processor::{EscrowState, Outcome, ProcessedMessage};
use agora_market::protocol::ValidationError;
use agora_market::testing::{
    action_message, ingest_listing, listing_item_message, sample_listing_content, test_market,
    BUYER, SELLER,
};
use agora_market::{ContentHash, Error, MarketService};

async fn accepted_bid(market: &MarketService, item: &ContentHash) {
    market
        .process(action_message("msg-bid", ActionType::Bid, item, BUYER, SELLER))
        .await
        .unwrap();
    market
        .process(action_message("msg-accept", ActionType::Accept, item, SELLER, BUYER))
        .await
        .unwrap();
}

async fn escrow_action(
    market: &MarketService,
    msgid: &str,
    action: ActionType,
    item: &ContentHash,
) -> Result<EscrowState, Error> {
    match market
        .process(action_message(msgid, action, item, BUYER, SELLER))
        .await?
    {
        ProcessedMessage::Escrow { state, .. } => Ok(state),
        other => panic!("Expected an escrow action, got {:?}", other),
    }
}

#[tokio::test]
async fn test_lock_then_release() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = TempDir::new("escrow").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let item = ingest_listing(&market, "msg-item", "Mountain bike").await.unwrap();
    accepted_bid(&market, &item.hash).await;

    assert_eq!(market.escrow_state(&item.hash).await.unwrap(), EscrowState::Open);
    assert_eq!(
        escrow_action(&market, "msg-lock", ActionType::Lock, &item.hash)
            .await
            .unwrap(),
        EscrowState::Locked
    );
    assert_eq!(
        escrow_action(&market, "msg-release", ActionType::Release, &item.hash)
            .await
            .unwrap(),
        EscrowState::Released
    );
    assert_eq!(
        market.escrow_state(&item.hash).await.unwrap(),
        EscrowState::Released
    );

    let refund = escrow_action(&market, "msg-refund", ActionType::Refund, &item.hash).await;
    match refund {
        Err(Error::Validation(ValidationError::InvalidEscrowTransition { state, action })) => {
            assert_eq!(state, "RELEASED");
            assert_eq!(action, ActionType::Refund);
        }
        other => panic!("Expected an invalid transition, got {:?}", other),
    }
}

#[tokio::test]
async fn test_refund_before_lock_is_rejected() {
    let dir = TempDir::new("escrow").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let item = ingest_listing(&market, "msg-item", "Mountain bike").await.unwrap();
    accepted_bid(&market, &item.hash).await;

    let result = escrow_action(&market, "msg-refund", ActionType::Refund, &item.hash).await;

    assert!(matches!(
        result,
        Err(Error::Validation(
            ValidationError::InvalidEscrowTransition { .. }
        ))
    ));
    assert_eq!(market.escrow_state(&item.hash).await.unwrap(), EscrowState::Open);
}

#[tokio::test]
async fn test_lock_needs_accepted_bid() {
    let dir = TempDir::new("escrow").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let item = ingest_listing(&market, "msg-item", "Mountain bike").await.unwrap();
    market
        .process(action_message("msg-bid", ActionType::Bid, &item.hash, BUYER, SELLER))
        .await
        .unwrap();

    let result = escrow_action(&market, "msg-lock", ActionType::Lock, &item.hash).await;

    assert!(matches!(result, Err(Error::NotFound { entity: "Bid", .. })));
    assert_eq!(market.escrow_state(&item.hash).await.unwrap(), EscrowState::Open);
}

#[tokio::test]
async fn test_item_without_escrow_rejects_escrow_actions() {
    let dir = TempDir::new("escrow").unwrap();
    let market = test_market(dir.path(), 1).unwrap();

    let mut content = sample_listing_content("Free bike");
    content.payment.escrow.escrow_type = EscrowType::Nop;
    let hash = content.hash().unwrap();
    market
        .process(listing_item_message("msg-item", content))
        .await
        .unwrap();
    accepted_bid(&market, &hash).await;

    let result = escrow_action(&market, "msg-lock", ActionType::Lock, &hash).await;
    assert!(matches!(
        result,
        Err(Error::Validation(ValidationError::InvalidField { field: "item", .. }))
    ));
}

#[tokio::test]
async fn test_redelivered_lock_reports_current_state() {
    let dir = TempDir::new("escrow").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let item = ingest_listing(&market, "msg-item", "Mountain bike").await.unwrap();
    accepted_bid(&market, &item.hash).await;

    let lock = action_message("msg-lock", ActionType::Lock, &item.hash, BUYER, SELLER);
    market.process(lock.clone()).await.unwrap();
    escrow_action(&market, "msg-refund", ActionType::Refund, &item.hash)
        .await
        .unwrap();

    match market.process(lock).await.unwrap() {
        ProcessedMessage::Escrow { state, outcome, .. } => {
            assert_eq!(outcome, Outcome::MatchedExisting);
            assert_eq!(state, EscrowState::Refunded);
        }
        other => panic!("Expected an escrow action, got {:?}", other),
    }
}

#[tokio::test]
async fn test_update_replaces_escrow_ratio() {
    let dir = TempDir::new("escrow").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let item = ingest_listing(&market, "msg-item", "Mountain bike").await.unwrap();
    let escrow = item.payment.escrow.clone();
    let dao = market.db.as_dao::<EscrowDao>();

    let updated = dao
        .update(
            escrow.id,
            EscrowUpdateRequest {
                escrow_type: EscrowType::Mad,
                seconds_to_lock: 3600,
                ratio: Some(EscrowRatioCreateRequest {
                    buyer: 50,
                    seller: 150,
                }),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.id, escrow.id);
    assert_eq!(updated.seconds_to_lock, 3600);
    assert_ne!(updated.ratio.id, escrow.ratio.id);
    assert_eq!(updated.ratio.escrow_id, escrow.id);
    assert_eq!((updated.ratio.buyer, updated.ratio.seller), (50, 150));
    assert_eq!(dao.get(escrow.id).await.unwrap(), updated);
}

#[tokio::test]
async fn test_escrow_action_reusing_bid_msgid_is_rejected() {
    let dir = TempDir::new("escrow").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let item = ingest_listing(&market, "msg-item", "Mountain bike").await.unwrap();
    accepted_bid(&market, &item.hash).await;

    let result = escrow_action(&market, "msg-bid", ActionType::Lock, &item.hash).await;

    assert!(matches!(
        result,
        Err(Error::Validation(ValidationError::InvalidField { field: "msgid", .. }))
    ));
    assert_eq!(market.escrow_state(&item.hash).await.unwrap(), EscrowState::Open);
}
