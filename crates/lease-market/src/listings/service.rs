use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::storage::{media_object_path, StorageGateway};
use crate::store::collections::{BROKER_PROFILES, LISTINGS};
use crate::store::{DocumentStore, FieldWrite, Fields, Query};

use super::domain::{
    BrokerId, BrokerProfile, EnrichedListing, Listing, ListingId, ListingPatch,
    MarketListingUpdate, PublishedListing,
};
use super::enrichment::{attach_profiles, broker_union, dedupe_listings};
use super::media::UploadPlan;
use super::ListingError;

pub const DEFAULT_MEDIA_ROOT: &str = "listing_images";

/// Service composing the document store and storage gateway for listings.
pub struct ListingService<S, G> {
    store: Arc<S>,
    storage: Arc<G>,
    media_root: String,
}

impl<S, G> ListingService<S, G>
where
    S: DocumentStore + 'static,
    G: StorageGateway + 'static,
{
    pub fn new(store: Arc<S>, storage: Arc<G>) -> Self {
        Self::with_media_root(store, storage, DEFAULT_MEDIA_ROOT)
    }

    pub fn with_media_root(store: Arc<S>, storage: Arc<G>, media_root: impl Into<String>) -> Self {
        Self {
            store,
            storage,
            media_root: media_root.into(),
        }
    }

    /// All listings a broker owns or co-brokers, each joined with its brokers.
    pub async fn retrieve_listings(
        &self,
        broker_id: &BrokerId,
    ) -> Result<Vec<EnrichedListing>, ListingError> {
        let co_brokered =
            Query::collection(LISTINGS).where_array_contains("broker_ids", broker_id.0.as_str());
        let owned = Query::collection(LISTINGS).where_eq("owner_id", broker_id.0.as_str());

        let (co_brokered, owned) =
            futures::try_join!(self.store.query(&co_brokered), self.store.query(&owned))?;

        let listings = co_brokered
            .iter()
            .chain(owned.iter())
            .map(|document| document.decode::<Listing>())
            .collect::<Result<Vec<_>, _>>()?;
        let listings = dedupe_listings(listings);

        let brokers = broker_union(&listings);
        let profiles = self.fetch_broker_profiles(&brokers).await?;
        debug!(
            broker_id = %broker_id.0,
            listings = listings.len(),
            profiles = profiles.len(),
            "retrieved broker listings"
        );

        Ok(attach_profiles(listings, &profiles))
    }

    /// One listing with its broker profiles; `None` when the listing is absent.
    pub async fn fetch_listing(
        &self,
        listing_id: &ListingId,
    ) -> Result<Option<EnrichedListing>, ListingError> {
        let Some(listing) = self.fetch_listing_data(listing_id).await? else {
            debug!(listing_id = %listing_id.0, "listing not found");
            return Ok(None);
        };

        let brokers = self.fetch_broker_profiles(&listing.broker_refs()).await?;
        Ok(Some(EnrichedListing { listing, brokers }))
    }

    /// The stored listing without broker enrichment.
    pub async fn fetch_listing_data(
        &self,
        listing_id: &ListingId,
    ) -> Result<Option<Listing>, ListingError> {
        let snapshot = self.store.get(LISTINGS, &listing_id.0).await?;
        snapshot
            .map(|document| document.decode::<Listing>().map_err(ListingError::from))
            .transpose()
    }

    /// Create or update a listing, uploading new media before the write.
    ///
    /// Uploads are awaited jointly; if any of them fails nothing is written.
    /// Removal deletes never fail the publish and are reported back instead.
    pub async fn update_market_listing(
        &self,
        update: MarketListingUpdate,
    ) -> Result<PublishedListing, ListingError> {
        let MarketListingUpdate {
            listing_id,
            mut draft,
            images_to_upload,
            videos_to_upload,
            floorplans_to_upload,
            removed_paths,
        } = update;

        let id = listing_id
            .filter(|id| !id.0.trim().is_empty())
            .unwrap_or_else(|| ListingId(self.store.allocate_id(LISTINGS)));
        let plan = UploadPlan::new(
            images_to_upload.len(),
            videos_to_upload.len(),
            floorplans_to_upload.len(),
        );

        let uploads = images_to_upload
            .iter()
            .chain(videos_to_upload.iter())
            .chain(floorplans_to_upload.iter())
            .map(|data_url| {
                let path = media_object_path(&self.media_root, &id.0);
                async move { self.storage.put_data_url(&path, data_url).await }
            });
        let stored = try_join_all(uploads).await?;
        plan.assign(&mut draft, stored.into_iter().map(|object| object.full_path));

        draft.strip_transient();
        let published = draft.clone();
        let fields = draft.into_fields()?;

        let removals = join_all(removed_paths.iter().map(|path| async move {
            (path, self.storage.delete(path).await)
        }));
        let (written, removals) =
            futures::join!(self.store.set_merge(LISTINGS, &id.0, fields), removals);

        let failed_removals: Vec<String> = removals
            .into_iter()
            .filter_map(|(path, outcome)| match outcome {
                Ok(()) => None,
                Err(err) => {
                    warn!(listing_id = %id.0, %path, error = %err, "failed to remove listing media");
                    Some(path.clone())
                }
            })
            .collect();

        written?;
        info!(
            listing_id = %id.0,
            uploaded = plan.len(),
            removed = removed_paths.len() - failed_removals.len(),
            "listing published"
        );

        Ok(PublishedListing {
            id,
            image_urls: published.images.clone(),
            floorplan_urls: published.floorplans.clone(),
            video_urls: published.videos.clone(),
            listing: published,
            failed_removals,
        })
    }

    /// Replace the listing's image list wholesale.
    pub async fn update_images(
        &self,
        listing_id: &ListingId,
        images: Vec<String>,
    ) -> Result<(), ListingError> {
        let images = Value::Array(images.into_iter().map(Value::String).collect());
        self.store
            .update(
                LISTINGS,
                &listing_id.0,
                vec![("images".to_string(), FieldWrite::Set(images))],
            )
            .await?;
        Ok(())
    }

    /// Upload raw images and union their download URLs into `images`.
    ///
    /// Returns the resolved URLs in upload order.
    pub async fn add_images(
        &self,
        listing_id: &ListingId,
        images: Vec<Vec<u8>>,
    ) -> Result<Vec<String>, ListingError> {
        let uploads = images.into_iter().map(|bytes| {
            let path = media_object_path(&self.media_root, &listing_id.0);
            async move { self.storage.put_bytes(&path, bytes).await }
        });
        let stored = try_join_all(uploads).await?;

        let urls = try_join_all(
            stored
                .iter()
                .map(|object| self.storage.download_url(&object.full_path)),
        )
        .await?;

        let additions = urls.iter().cloned().map(Value::String).collect();
        self.store
            .update(
                LISTINGS,
                &listing_id.0,
                vec![("images".to_string(), FieldWrite::ArrayUnion(additions))],
            )
            .await?;
        info!(listing_id = %listing_id.0, added = urls.len(), "listing images added");

        Ok(urls)
    }

    /// Apply a client-side listing object as a field update.
    ///
    /// See [`ListingPatch::from_fields`] for how transient fields,
    /// `unit_number` and `asking_offer.start_date` are treated.
    pub async fn update_listing(
        &self,
        listing_id: &ListingId,
        data: Fields,
    ) -> Result<(), ListingError> {
        let writes = ListingPatch::from_fields(data)?.into_writes()?;
        self.store.update(LISTINGS, &listing_id.0, writes).await?;
        info!(listing_id = %listing_id.0, "listing updated");
        Ok(())
    }

    pub async fn add_broker(
        &self,
        listing_id: &ListingId,
        broker_id: &BrokerId,
    ) -> Result<(), ListingError> {
        self.store
            .update(
                LISTINGS,
                &listing_id.0,
                vec![(
                    "broker_ids".to_string(),
                    FieldWrite::ArrayUnion(vec![Value::String(broker_id.0.clone())]),
                )],
            )
            .await?;
        info!(listing_id = %listing_id.0, broker_id = %broker_id.0, "broker added to listing");
        Ok(())
    }

    async fn fetch_broker_profiles(
        &self,
        broker_ids: &[BrokerId],
    ) -> Result<Vec<BrokerProfile>, ListingError> {
        let snapshots =
            try_join_all(broker_ids.iter().map(|id| self.store.get(BROKER_PROFILES, &id.0)))
                .await?;

        snapshots
            .into_iter()
            .flatten()
            .map(|document| document.decode::<BrokerProfile>().map_err(ListingError::from))
            .collect()
    }
}
