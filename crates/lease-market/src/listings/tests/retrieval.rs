use std::collections::HashSet;
use std::sync::Arc;

use super::common::*;
use crate::listings::{BrokerId, ListingError, ListingId, ListingService};
use crate::storage::MemoryStorage;
use crate::store::StoreError;

#[tokio::test]
async fn retrieve_listings_unions_owned_and_co_brokered() {
    let (service, _, _) = build_service();

    let listings = service
        .retrieve_listings(&BrokerId::from("B"))
        .await
        .expect("retrieval succeeds");

    let ids: Vec<&str> = listings
        .iter()
        .map(|listing| listing.listing.id.0.as_str())
        .collect();
    let unique: HashSet<&str> = ids.iter().copied().collect();
    assert_eq!(ids.len(), unique.len(), "no listing may appear twice");
    assert_eq!(unique, HashSet::from(["L1", "L2", "L3"]));
}

#[tokio::test]
async fn owner_listed_as_co_broker_is_enriched_once() {
    let (service, _, _) = build_service();

    let listings = service
        .retrieve_listings(&BrokerId::from("B"))
        .await
        .expect("retrieval succeeds");
    let harbor = listings
        .iter()
        .find(|listing| listing.listing.id == ListingId::from("L1"))
        .expect("L1 returned");

    assert_eq!(broker_names(&harbor.brokers), vec!["Avery", "Blake"]);
}

#[tokio::test]
async fn brokers_without_profiles_are_skipped() {
    let (service, _, _) = build_service();

    let listings = service
        .retrieve_listings(&BrokerId::from("C"))
        .await
        .expect("retrieval succeeds");
    let mill = listings
        .iter()
        .find(|listing| listing.listing.id == ListingId::from("L3"))
        .expect("L3 returned");

    assert_eq!(broker_names(&mill.brokers), vec!["Blake", "Casey"]);
    assert_eq!(listings.len(), 2);
}

#[tokio::test]
async fn unknown_broker_yields_no_listings() {
    let (service, _, _) = build_service();
    let listings = service
        .retrieve_listings(&BrokerId::from("Z"))
        .await
        .expect("retrieval succeeds");
    assert!(listings.is_empty());
}

#[tokio::test]
async fn fetch_listing_attaches_deduplicated_brokers() {
    let (service, _, _) = build_service();

    let listing = service
        .fetch_listing(&ListingId::from("L1"))
        .await
        .expect("fetch succeeds")
        .expect("listing exists");

    assert_eq!(listing.listing.attributes["title"], "Harbor loft");
    assert_eq!(broker_names(&listing.brokers), vec!["Avery", "Blake"]);
}

#[tokio::test]
async fn fetch_listing_reports_absence() {
    let (service, _, _) = build_service();
    let listing = service
        .fetch_listing(&ListingId::from("missing"))
        .await
        .expect("fetch succeeds");
    assert!(listing.is_none());
}

#[tokio::test]
async fn fetch_listing_data_skips_enrichment() {
    let (service, _, _) = build_service();

    let listing = service
        .fetch_listing_data(&ListingId::from("L2"))
        .await
        .expect("fetch succeeds")
        .expect("listing exists");

    assert_eq!(listing.owner_id, BrokerId::from("B"));
    assert!(!listing.attributes.contains_key("brokers"));
}

#[tokio::test]
async fn fetch_failures_surface_as_errors() {
    let service = ListingService::new(Arc::new(OfflineStore), Arc::new(MemoryStorage::default()));

    let raw = service.fetch_listing_data(&ListingId::from("L1")).await;
    assert!(matches!(
        raw,
        Err(ListingError::Store(StoreError::Unavailable(_)))
    ));

    let bulk = service.retrieve_listings(&BrokerId::from("A")).await;
    assert!(matches!(
        bulk,
        Err(ListingError::Store(StoreError::Unavailable(_)))
    ));
}
