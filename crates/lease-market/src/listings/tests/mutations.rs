use std::sync::Arc;

use serde_json::json;

use super::common::*;
use crate::listings::{BrokerId, ListingError, ListingId, ListingService};
use crate::store::{MemoryDocumentStore, StoreError};

#[tokio::test]
async fn update_images_replaces_the_whole_list() {
    let (service, store, _) = build_service();
    store.insert(
        "listings",
        "L5",
        fields(json!({ "owner_id": "A", "images": ["a", "b", "c"] })),
    );

    service
        .update_images(&ListingId::from("L5"), vec!["c".to_string(), "a".to_string()])
        .await
        .expect("update succeeds");

    assert_eq!(
        store.document("listings", "L5").expect("present").fields["images"],
        json!(["c", "a"])
    );
}

#[tokio::test]
async fn add_images_unions_resolved_urls() {
    let storage = Arc::new(RepeatingUrlStorage::new("x"));
    let store = Arc::new(MemoryDocumentStore::new());
    store.insert(
        "listings",
        "L5",
        fields(json!({ "owner_id": "A", "images": ["x"] })),
    );
    let service = ListingService::new(store.clone(), storage.clone());

    let urls = service
        .add_images(&ListingId::from("L5"), vec![vec![1, 2, 3], vec![4, 5, 6]])
        .await
        .expect("images added");

    assert_eq!(urls.len(), 2);
    assert_eq!(urls[0], "x");
    let images = store.document("listings", "L5").expect("present").fields["images"].clone();
    assert_eq!(images, json!(["x", urls[1]]));
    assert_eq!(storage.inner.paths().len(), 2);
}

#[tokio::test]
async fn add_images_requires_existing_listing() {
    let (service, _, _) = build_service();
    let result = service
        .add_images(&ListingId::from("ghost"), vec![vec![0xff]])
        .await;
    assert!(matches!(
        result,
        Err(ListingError::Store(StoreError::NotFound { .. }))
    ));
}

#[tokio::test]
async fn update_listing_clears_missing_unit_number() {
    let (service, store, _) = build_service();
    store.insert(
        "listings",
        "L6",
        fields(json!({
            "owner_id": "A",
            "unit_number": "12",
            "title": "Before",
            "asking_offer": { "rent": 1900, "start_date": { "seconds": 1, "nanoseconds": 0 } },
        })),
    );

    service
        .update_listing(
            &ListingId::from("L6"),
            fields(json!({
                "id": "L6",
                "day_data": { "mon": 3 },
                "title": "After",
                "asking_offer": {
                    "rent": 2000,
                    "start_date": { "_seconds": 1_717_200_000, "_nanoseconds": 0 },
                },
            })),
        )
        .await
        .expect("update succeeds");

    let stored = store.document("listings", "L6").expect("present").fields;
    assert!(!stored.contains_key("unit_number"));
    assert!(!stored.contains_key("day_data"));
    assert!(!stored.contains_key("id"));
    assert_eq!(stored["title"], "After");
    assert_eq!(
        stored["asking_offer"],
        json!({ "rent": 2000, "start_date": { "seconds": 1_717_200_000, "nanoseconds": 0 } })
    );
}

#[tokio::test]
async fn update_listing_keeps_supplied_unit_number() {
    let (service, store, _) = build_service();

    service
        .update_listing(
            &ListingId::from("L2"),
            fields(json!({ "unit_number": "7A", "title": "Garden flat" })),
        )
        .await
        .expect("update succeeds");

    assert_eq!(
        store.document("listings", "L2").expect("present").fields["unit_number"],
        "7A"
    );
}

#[tokio::test]
async fn update_listing_rejects_bad_timestamps_before_writing() {
    let (service, store, _) = build_service();
    let before = store.document("listings", "L2");

    let result = service
        .update_listing(
            &ListingId::from("L2"),
            fields(json!({ "asking_offer": { "start_date": "next tuesday" } })),
        )
        .await;

    assert!(matches!(result, Err(ListingError::InvalidTimestamp(_))));
    assert_eq!(store.document("listings", "L2"), before);
}

#[tokio::test]
async fn add_broker_is_idempotent() {
    let (service, store, _) = build_service();
    let listing = ListingId::from("L2");

    service
        .add_broker(&listing, &BrokerId::from("C"))
        .await
        .expect("first add");
    service
        .add_broker(&listing, &BrokerId::from("C"))
        .await
        .expect("second add");

    assert_eq!(
        store.document("listings", "L2").expect("present").fields["broker_ids"],
        json!(["C"])
    );
}

#[tokio::test]
async fn add_broker_reports_store_failure() {
    let store = Arc::new(ReadOnlyStore::default());
    seed_marketplace(&store.inner);
    let service = ListingService::new(store, Arc::new(crate::storage::MemoryStorage::default()));

    let result = service
        .add_broker(&ListingId::from("L1"), &BrokerId::from("C"))
        .await;

    assert!(matches!(
        result,
        Err(ListingError::Store(StoreError::PermissionDenied(_)))
    ));
}
