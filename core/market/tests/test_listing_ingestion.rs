use std::sync::Arc;
use tempdir::TempDir;

use agora_market::db::dao::ListingItemDao;
use agora_market::db::model::ListingItemCreateRequest;
use agora_market::processor::{Outcome, ProcessedMessage};
use agora_market::testing::{
    listing_item_message, sample_listing_content, sample_timestamp, test_market, MARKET, SELLER,
};
use agora_market::{assert_err_eq, ContentHash, Error, HashableObjectType};

fn expect_item(processed: ProcessedMessage) -> (agora_market::db::model::ListingItem, Outcome) {
    match processed {
        ProcessedMessage::ListingItem { item, outcome } => (item, outcome),
        other => panic!("Expected a listing item, got {:?}", other),
    }
}

#[tokio::test]
async fn test_ingest_listing_item_assembles_aggregate() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = TempDir::new("listing").unwrap();
    let market = test_market(dir.path(), 1).unwrap();

    let content = sample_listing_content("Mountain bike");
    let processed = market
        .process(listing_item_message("msg-1", content.clone()))
        .await
        .unwrap();
    let (item, outcome) = expect_item(processed);

    assert_eq!(outcome, Outcome::AssembledNew);
    assert_eq!(item.hash, content.hash().unwrap());
    assert_eq!(item.seller, SELLER);
    assert_eq!(item.market, MARKET);
    assert_eq!(item.posted_at, Some(sample_timestamp()));
    assert_eq!(item.received_at, sample_timestamp());
    assert_eq!(item.listing_item_template_id, None);

    assert_eq!(item.information.title, "Mountain bike");
    assert_eq!(item.payment.listing_item_id, Some(item.id));
    assert_eq!(item.payment.escrow.ratio.buyer, 100);
    assert_eq!(item.payment.item_price.base_price, 12.5);
    assert_eq!(
        item.payment
            .item_price
            .shipping_price
            .as_ref()
            .map(|shipping| shipping.international),
        Some(3.25)
    );
    assert_eq!(item.messaging.len(), 1);
    assert_eq!(item.objects.len(), 1);

    let stored = market.listing_item(&item.hash).await.unwrap();
    assert_eq!(stored, item);
}

#[tokio::test]
async fn test_ingest_same_listing_twice_returns_first() {
    let dir = TempDir::new("listing").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let content = sample_listing_content("Mountain bike");

    let (first, _) = expect_item(
        market
            .process(listing_item_message("msg-1", content.clone()))
            .await
            .unwrap(),
    );
    // Redelivered under another transport id. Content decides identity.
    let (second, outcome) = expect_item(
        market
            .process(listing_item_message("msg-2", content))
            .await
            .unwrap(),
    );

    assert_eq!(outcome, Outcome::MatchedExisting);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_concurrent_ingestion_stores_one_item() {
    let dir = TempDir::new("listing").unwrap();
    let market = Arc::new(test_market(dir.path(), 1).unwrap());
    let content = sample_listing_content("Mountain bike");

    let tasks = (0..4)
        .map(|i| {
            let market = market.clone();
            let message = listing_item_message(&format!("msg-{}", i), content.clone());
            tokio::spawn(async move { market.process(message).await })
        })
        .collect::<Vec<_>>();

    let mut items = vec![];
    let mut assembled = 0;
    for task in tasks {
        let (item, outcome) = expect_item(task.await.unwrap().unwrap());
        if outcome == Outcome::AssembledNew {
            assembled += 1;
        }
        items.push(item);
    }

    assert_eq!(assembled, 1);
    assert!(items.iter().all(|item| item.id == items[0].id));
}

#[tokio::test]
async fn test_template_links_listing_items() {
    let dir = TempDir::new("listing").unwrap();
    let market = test_market(dir.path(), 1).unwrap();

    // Item received before the template was authored.
    let early = sample_listing_content("Mountain bike");
    let (early_item, _) = expect_item(
        market
            .process(listing_item_message("msg-1", early.clone()))
            .await
            .unwrap(),
    );
    let template = market.create_template(early).await.unwrap();
    assert_eq!(template.hash, early_item.hash);
    assert_eq!(
        market
            .listing_item(&early_item.hash)
            .await
            .unwrap()
            .listing_item_template_id,
        Some(template.id)
    );

    // Item received after its template.
    let late = sample_listing_content("Road bike");
    let late_template = market.create_template(late.clone()).await.unwrap();
    let (late_item, outcome) = expect_item(
        market
            .process(listing_item_message("msg-2", late))
            .await
            .unwrap(),
    );
    assert_eq!(outcome, Outcome::AssembledNew);
    assert_eq!(late_item.listing_item_template_id, Some(late_template.id));
    assert_eq!(late_template.payment.listing_item_template_id, Some(late_template.id));
}

#[tokio::test]
async fn test_authoring_template_twice_returns_first() {
    let dir = TempDir::new("listing").unwrap();
    let market = test_market(dir.path(), 1).unwrap();

    let first = market
        .create_template(sample_listing_content("Mountain bike"))
        .await
        .unwrap();
    let second = market
        .create_template(sample_listing_content("Mountain bike"))
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_create_with_wrong_hash_is_rejected() {
    let dir = TempDir::new("listing").unwrap();
    let market = test_market(dir.path(), 1).unwrap();

    let content = sample_listing_content("Mountain bike");
    let wrong = ContentHash::generate(&content, HashableObjectType::ItemImage).unwrap();
    let result = market
        .db
        .as_dao::<ListingItemDao>()
        .create(ListingItemCreateRequest {
            hash: wrong.clone(),
            seller: SELLER.to_string(),
            market: MARKET.to_string(),
            listing_item_template_id: None,
            posted_at: None,
            received_at: sample_timestamp(),
            content,
        })
        .await;

    assert!(matches!(result, Err(Error::Validation(_))));
    assert!(market
        .db
        .as_dao::<ListingItemDao>()
        .find_by_hash(&wrong)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_unknown_listing_item_is_not_found() {
    let dir = TempDir::new("listing").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let hash = sample_listing_content("Mountain bike").hash().unwrap();

    assert_err_eq!(
        Error::not_found("ListingItem", &hash),
        market.listing_item(&hash).await
    );
}
