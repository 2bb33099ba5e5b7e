use tempdir::TempDir;

use agora_market::db::model::ActionType;
use agora_market::protocol::MarketplaceMessage;
use agora_market::testing::{
    action_message, listing_item_message, sample_listing_content, sample_messaging_data,
    test_market, BUYER, PROTOCOL_VERSION, SELLER,
};
use agora_market::{ReceivedMessage, WorkerStats};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_workers_drain_queue() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = TempDir::new("worker").unwrap();
    let market = test_market(dir.path(), 3).unwrap();
    let workers = market.start_workers();

    let bike = sample_listing_content("Mountain bike");
    let hash = bike.hash().unwrap();
    for i in 0..3 {
        workers
            .submit(listing_item_message(&format!("msg-item-{}", i), bike.clone()))
            .await
            .unwrap();
    }
    for title in &["Road bike", "Tandem"] {
        workers
            .submit(listing_item_message(
                &format!("msg-{}", title),
                sample_listing_content(title),
            ))
            .await
            .unwrap();
    }
    workers
        .submit(ReceivedMessage {
            data: sample_messaging_data("msg-bad", SELLER, BUYER),
            message: MarketplaceMessage::new(PROTOCOL_VERSION, "MPA_STEAL"),
        })
        .await
        .unwrap();

    let stats = workers.finish().await.unwrap();
    assert_eq!(
        stats,
        WorkerStats {
            processed: 5,
            duplicates: 2,
            failed: 1,
        }
    );
    assert_eq!(market.listing_item(&hash).await.unwrap().hash, hash);
}

#[tokio::test]
async fn test_failed_message_does_not_stop_worker() {
    let dir = TempDir::new("worker").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let workers = market.start_workers();
    let unknown = sample_listing_content("Never sent").hash().unwrap();

    workers
        .submit(action_message("msg-bid", ActionType::Bid, &unknown, BUYER, SELLER))
        .await
        .unwrap();
    workers
        .submit(listing_item_message("msg-item", sample_listing_content("Tandem")))
        .await
        .unwrap();

    let stats = workers.finish().await.unwrap();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.processed, 1);
    assert_eq!(stats.duplicates, 0);
}
