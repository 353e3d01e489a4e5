use std::collections::HashSet;

use super::domain::{BrokerId, BrokerProfile, EnrichedListing, Listing, ListingId};

/// Collapse listings sharing an ID, keeping the first occurrence in place.
pub(crate) fn dedupe_listings(listings: Vec<Listing>) -> Vec<Listing> {
    let mut seen: HashSet<ListingId> = HashSet::with_capacity(listings.len());
    listings
        .into_iter()
        .filter(|listing| seen.insert(listing.id.clone()))
        .collect()
}

/// Every broker referenced by any listing, each ID once.
pub(crate) fn broker_union<'a>(listings: impl IntoIterator<Item = &'a Listing>) -> Vec<BrokerId> {
    let mut seen = HashSet::new();
    listings
        .into_iter()
        .flat_map(Listing::broker_refs)
        .filter(|broker| seen.insert(broker.clone()))
        .collect()
}

/// Join resolved profiles onto each listing that references them.
///
/// `profiles` must already be unique by ID so a listing never carries the
/// same broker twice.
pub(crate) fn attach_profiles(
    listings: Vec<Listing>,
    profiles: &[BrokerProfile],
) -> Vec<EnrichedListing> {
    listings
        .into_iter()
        .map(|listing| {
            let brokers = profiles
                .iter()
                .filter(|profile| listing.involves(&profile.id))
                .cloned()
                .collect();
            EnrichedListing { listing, brokers }
        })
        .collect()
}
