#[macro_use]
extern crate diesel;

use diesel::sql_types::BigInt;
use diesel::RunQueryDsl;
use tempdir::TempDir;

use agora_market::db::dao::{ItemPriceDao, PaymentInformationDao};
use agora_market::db::model::{
    CryptocurrencyAddressCreateRequest, CryptocurrencyAddressType, EscrowRatioCreateRequest,
    EscrowType, ItemPriceCreateRequest, ItemPriceUpdateRequest, PaymentInformationUpdateRequest,
    PaymentType, ShippingPriceCreateRequest,
};
use agora_market::MarketService;
use agora_market::testing::{
    ingest_listing, sample_escrow, sample_item_price, sample_payment, test_market,
};
use agora_market::Error;

#[tokio::test]
async fn test_payment_information_round_trip() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = TempDir::new("payment").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let item = ingest_listing(&market, "msg-item", "Mountain bike").await.unwrap();
    let dao = market.db.as_dao::<PaymentInformationDao>();

    assert_eq!(dao.get(item.payment.id).await.unwrap(), item.payment);

    dao.destroy(item.payment.id).await.unwrap();
    assert!(dao.get(item.payment.id).await.unwrap_err().is_not_found());

    let mut request = sample_payment();
    request.listing_item_id = Some(item.id);
    let payment = dao.create(request).await.unwrap();

    assert_eq!(payment.payment_type, PaymentType::Sale);
    assert_eq!(payment.listing_item_id, Some(item.id));
    assert_eq!(payment.escrow.payment_information_id, payment.id);
    assert_eq!(payment.escrow.escrow_type, EscrowType::Mad);
    assert_eq!(payment.escrow.ratio.escrow_id, payment.escrow.id);
    assert_eq!((payment.escrow.ratio.buyer, payment.escrow.ratio.seller), (100, 100));

    let price = &payment.item_price;
    assert_eq!(price.payment_information_id, payment.id);
    assert_eq!(price.currency, "PART");
    let shipping = price.shipping_price.as_ref().unwrap();
    assert_eq!(shipping.item_price_id, price.id);
    assert_eq!((shipping.domestic, shipping.international), (1.0, 3.25));
    let address = price.cryptocurrency_address.as_ref().unwrap();
    assert_eq!(address.item_price_id, price.id);

    assert_eq!(dao.get(payment.id).await.unwrap(), payment);
}

#[tokio::test]
async fn test_update_replaces_children() {
    let dir = TempDir::new("payment").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let item = ingest_listing(&market, "msg-item", "Mountain bike").await.unwrap();
    let dao = market.db.as_dao::<PaymentInformationDao>();
    let before = item.payment;

    let mut escrow = sample_escrow();
    escrow.ratio = EscrowRatioCreateRequest {
        buyer: 50,
        seller: 200,
    };
    let updated = dao
        .update(
            before.id,
            PaymentInformationUpdateRequest {
                payment_type: PaymentType::Rent,
                escrow: Some(escrow),
                item_price: Some(ItemPriceCreateRequest {
                    shipping_price: None,
                    ..sample_item_price()
                }),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.id, before.id);
    assert_eq!(updated.payment_type, PaymentType::Rent);
    assert_ne!(updated.escrow.id, before.escrow.id);
    assert_ne!(updated.escrow.ratio.id, before.escrow.ratio.id);
    assert_eq!(updated.escrow.ratio.seller, 200);
    assert_ne!(updated.item_price.id, before.item_price.id);
    assert_eq!(updated.item_price.shipping_price, None);
    assert!(updated.item_price.cryptocurrency_address.is_some());

    assert_eq!(dao.get(before.id).await.unwrap(), updated);
}

#[tokio::test]
async fn test_update_without_children_keeps_them() {
    let dir = TempDir::new("payment").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let item = ingest_listing(&market, "msg-item", "Mountain bike").await.unwrap();
    let dao = market.db.as_dao::<PaymentInformationDao>();

    let updated = dao
        .update(
            item.payment.id,
            PaymentInformationUpdateRequest {
                payment_type: PaymentType::Free,
                escrow: None,
                item_price: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.payment_type, PaymentType::Free);
    assert_eq!(updated.escrow, item.payment.escrow);
    assert_eq!(updated.item_price, item.payment.item_price);
}

#[derive(QueryableByName)]
struct Count {
    #[sql_type = "BigInt"]
    count: i64,
}

fn count_rows(market: &MarketService, table: &str, id: i32) -> i64 {
    let conn = market.db.conn().unwrap();
    diesel::sql_query(format!("SELECT COUNT(*) AS count FROM {} WHERE id = {}", table, id))
        .get_result::<Count>(&conn)
        .unwrap()
        .count
}

#[tokio::test]
async fn test_item_price_update_replaces_shipping_and_address() {
    let dir = TempDir::new("payment").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let item = ingest_listing(&market, "msg-item", "Mountain bike").await.unwrap();
    let dao = market.db.as_dao::<ItemPriceDao>();
    let before = item.payment.item_price;
    let old_shipping = before.shipping_price.clone().unwrap();
    let old_address = before.cryptocurrency_address.clone().unwrap();

    let updated = dao
        .update(
            before.id,
            ItemPriceUpdateRequest {
                currency: "BTC".to_string(),
                base_price: 0.002,
                shipping_price: Some(ShippingPriceCreateRequest {
                    domestic: 0.0001,
                    international: 0.0005,
                }),
                cryptocurrency_address: Some(CryptocurrencyAddressCreateRequest {
                    address_type: CryptocurrencyAddressType::Normal,
                    address: "pZ6hXgRZ8QxhFYqwNJC4VBmwBdRRNpPKbR".to_string(),
                }),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.id, before.id);
    assert_eq!(updated.payment_information_id, before.payment_information_id);
    assert_eq!(updated.currency, "BTC");

    let shipping = updated.shipping_price.clone().unwrap();
    assert_ne!(shipping.id, old_shipping.id);
    assert_eq!(shipping.item_price_id, before.id);
    assert_eq!((shipping.domestic, shipping.international), (0.0001, 0.0005));

    let address = updated.cryptocurrency_address.clone().unwrap();
    assert_ne!(address.id, old_address.id);
    assert_eq!(address.item_price_id, before.id);
    assert_eq!(address.address_type, CryptocurrencyAddressType::Normal);

    assert_eq!(count_rows(&market, "shipping_prices", old_shipping.id), 0);
    assert_eq!(count_rows(&market, "cryptocurrency_addresses", old_address.id), 0);
    assert_eq!(count_rows(&market, "shipping_prices", shipping.id), 1);
    assert_eq!(dao.get(before.id).await.unwrap(), updated);
}

#[tokio::test]
async fn test_payment_for_missing_template_fails() {
    let dir = TempDir::new("payment").unwrap();
    let market = test_market(dir.path(), 1).unwrap();
    let dao = market.db.as_dao::<PaymentInformationDao>();

    let mut request = sample_payment();
    request.listing_item_template_id = Some(9999);
    let result = dao.create(request).await;

    match result {
        Err(Error::Database { message, .. }) => {
            assert_eq!(message, "Could not create the PaymentInformation!")
        }
        other => panic!("Expected a database error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_payment_without_owner_is_rejected() {
    let dir = TempDir::new("payment").unwrap();
    let market = test_market(dir.path(), 1).unwrap();

    let result = market
        .db
        .as_dao::<PaymentInformationDao>()
        .create(sample_payment())
        .await;

    assert!(matches!(result, Err(Error::Validation(_))));
}
