use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::listings::ListingId;
use crate::store::collections::{APPLICATIONS, APPOINTMENTS, LISTING_VIEWS, OFFERS, USER_PROFILES};
use crate::store::{Direction, Document, DocumentStore, Query, StoreError, Timestamp};

use super::ActivityError;
use super::domain::{
    ActivityMerge, ActivityPatch, Application, Appointment, Offer, UserId, UserProfile,
    ViewCounters, ACCEPTED_STATE,
};

pub const DEFAULT_RECENT_WINDOW_DAYS: i64 = 14;

/// Fetchers for the records hanging off a listing.
pub struct ActivityService<S> {
    store: Arc<S>,
    recent_window: Duration,
}

impl<S> ActivityService<S>
where
    S: DocumentStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self::with_recent_window(store, Duration::days(DEFAULT_RECENT_WINDOW_DAYS))
    }

    pub fn with_recent_window(store: Arc<S>, recent_window: Duration) -> Self {
        Self {
            store,
            recent_window,
        }
    }

    /// Offers on the listing, oldest first.
    pub async fn fetch_offers(
        &self,
        listing_id: &ListingId,
    ) -> Result<ActivityMerge, ActivityError> {
        let query = Query::collection(OFFERS)
            .where_eq("listing_id", listing_id.0.as_str())
            .order_by("created", Direction::Ascending);
        let offers = decode_all::<Offer>(self.store.query(&query).await?)?;
        debug!(listing_id = %listing_id.0, offers = offers.len(), "fetched offers");

        Ok(ActivityMerge::additive(listing_id, ActivityPatch::Offers(offers)))
    }

    /// Applications on the listing, each joined with its applicant's profile.
    pub async fn fetch_applications(
        &self,
        listing_id: &ListingId,
    ) -> Result<ActivityMerge, ActivityError> {
        let query = Query::collection(APPLICATIONS).where_eq("listing_id", listing_id.0.as_str());
        let mut applications = decode_all::<Application>(self.store.query(&query).await?)?;

        let profiles = self
            .fetch_user_profiles(applications.iter().map(|application| &application.user_id))
            .await?;
        for application in &mut applications {
            application.user_profile = profiles.get(&application.user_id).cloned();
        }
        debug!(
            listing_id = %listing_id.0,
            applications = applications.len(),
            "fetched applications"
        );

        Ok(ActivityMerge::additive(
            listing_id,
            ActivityPatch::Applications(applications),
        ))
    }

    /// All appointments on the listing by date, joined with user profiles.
    pub async fn fetch_appointments(
        &self,
        listing_id: &ListingId,
    ) -> Result<ActivityMerge, ActivityError> {
        let query = Query::collection(APPOINTMENTS)
            .where_eq("listing_id", listing_id.0.as_str())
            .order_by("date", Direction::Ascending);
        let mut appointments = decode_all::<Appointment>(self.store.query(&query).await?)?;

        let profiles = self
            .fetch_user_profiles(appointments.iter().map(|appointment| &appointment.user_id))
            .await?;
        for appointment in &mut appointments {
            appointment.user_profile = profiles.get(&appointment.user_id).cloned();
        }

        Ok(ActivityMerge::additive(
            listing_id,
            ActivityPatch::Appointments(appointments),
        ))
    }

    /// Accepted appointments dated inside the recent window ending at `now`.
    pub async fn fetch_recent_appointments(
        &self,
        listing_id: &ListingId,
        now: DateTime<Utc>,
    ) -> Result<ActivityMerge, ActivityError> {
        let start = now
            .checked_sub_signed(self.recent_window)
            .ok_or(ActivityError::WindowOutOfRange {
                days: self.recent_window.num_days(),
            })?;
        let cutoff = Timestamp::from_datetime(start);
        let query = Query::collection(APPOINTMENTS)
            .where_eq("listing_id", listing_id.0.as_str())
            .where_eq("state", ACCEPTED_STATE)
            .order_by("date", Direction::Ascending)
            .start_at(cutoff.to_value());
        let appointments = decode_all::<Appointment>(self.store.query(&query).await?)?;

        // Guard against stores that ignore the range bound.
        let appointments = appointments
            .into_iter()
            .filter(|appointment| appointment.state == ACCEPTED_STATE && appointment.date >= cutoff)
            .collect();

        Ok(ActivityMerge::additive(
            listing_id,
            ActivityPatch::RecentAppointments(appointments),
        ))
    }

    /// View counters for the listing; `None` when nothing was recorded yet.
    pub async fn fetch_views(
        &self,
        listing_id: &ListingId,
    ) -> Result<Option<ActivityMerge>, ActivityError> {
        let snapshot = self.store.get(LISTING_VIEWS, &listing_id.0).await?;
        Ok(snapshot.map(|document| {
            ActivityMerge::replace(listing_id, ActivityPatch::Views(ViewCounters(document.fields)))
        }))
    }

    async fn fetch_user_profiles<'a>(
        &self,
        user_ids: impl Iterator<Item = &'a UserId>,
    ) -> Result<HashMap<UserId, UserProfile>, StoreError> {
        let mut seen = HashSet::new();
        let unique: Vec<&UserId> = user_ids.filter(|id| seen.insert(*id)).collect();

        let snapshots =
            try_join_all(unique.iter().map(|id| self.store.get(USER_PROFILES, &id.0))).await?;

        snapshots
            .into_iter()
            .flatten()
            .map(|document| {
                let profile = document.decode::<UserProfile>()?;
                Ok((profile.id.clone(), profile))
            })
            .collect()
    }
}

fn decode_all<T: DeserializeOwned>(documents: Vec<Document>) -> Result<Vec<T>, StoreError> {
    documents.iter().map(|document| document.decode::<T>()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{ListingActivityBoard, MergeMode};
    use crate::store::{Fields, MemoryDocumentStore};
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().expect("object fixture")
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0)
            .single()
            .expect("valid instant")
    }

    fn at_days_ago(days: i64) -> Value {
        Timestamp::from_datetime(now() - Duration::days(days)).to_value()
    }

    fn seeded_store() -> Arc<MemoryDocumentStore> {
        let store = Arc::new(MemoryDocumentStore::new());
        store.insert("user_profiles", "u-1", fields(json!({ "name": "Riley" })));
        store.insert("user_profiles", "u-2", fields(json!({ "name": "Jordan" })));

        store.insert("offers", "o-2", fields(json!({ "listing_id": "L1", "rent": 2100, "created": { "seconds": 200, "nanoseconds": 0 } })));
        store.insert("offers", "o-1", fields(json!({ "listing_id": "L1", "rent": 2000, "created": { "seconds": 100, "nanoseconds": 0 } })));
        store.insert("offers", "o-3", fields(json!({ "listing_id": "L2", "rent": 900, "created": { "seconds": 50, "nanoseconds": 0 } })));

        store.insert("applications", "a-1", fields(json!({ "listing_id": "L1", "user_id": "u-1" })));
        store.insert("applications", "a-2", fields(json!({ "listing_id": "L1", "user_id": "u-1", "status": "resubmitted" })));
        store.insert("applications", "a-3", fields(json!({ "listing_id": "L1", "user_id": "u-9" })));

        store.insert("appointments", "p-old", fields(json!({ "listing_id": "L1", "user_id": "u-1", "state": "accepted", "date": at_days_ago(15) })));
        store.insert("appointments", "p-pending", fields(json!({ "listing_id": "L1", "user_id": "u-2", "state": "pending", "date": at_days_ago(2) })));
        store.insert("appointments", "p-new", fields(json!({ "listing_id": "L1", "user_id": "u-2", "state": "accepted", "date": at_days_ago(1) })));
        store.insert("appointments", "p-mid", fields(json!({ "listing_id": "L1", "user_id": "u-1", "state": "accepted", "date": at_days_ago(13) })));

        store.insert("listing_views", "L1", fields(json!({ "total": 42, "this_week": 7 })));
        store
    }

    #[tokio::test]
    async fn offers_are_filtered_and_ordered_by_creation() {
        let service = ActivityService::new(seeded_store());
        let merge = service
            .fetch_offers(&ListingId::from("L1"))
            .await
            .expect("offers fetched");

        assert_eq!(merge.mode, MergeMode::Additive);
        let ActivityPatch::Offers(offers) = merge.patch else {
            panic!("expected offers patch");
        };
        let ids: Vec<&str> = offers.iter().map(|offer| offer.id.as_str()).collect();
        assert_eq!(ids, vec!["o-1", "o-2"]);
    }

    #[tokio::test]
    async fn applications_carry_every_matching_profile() {
        let service = ActivityService::new(seeded_store());
        let merge = service
            .fetch_applications(&ListingId::from("L1"))
            .await
            .expect("applications fetched");

        let ActivityPatch::Applications(applications) = merge.patch else {
            panic!("expected applications patch");
        };
        let names: Vec<Option<Value>> = applications
            .iter()
            .map(|application| {
                application
                    .user_profile
                    .as_ref()
                    .map(|profile| profile.attributes["name"].clone())
            })
            .collect();
        assert_eq!(names, vec![Some(json!("Riley")), Some(json!("Riley")), None]);
    }

    #[tokio::test]
    async fn appointments_are_dated_and_enriched() {
        let service = ActivityService::new(seeded_store());
        let merge = service
            .fetch_appointments(&ListingId::from("L1"))
            .await
            .expect("appointments fetched");

        let ActivityPatch::Appointments(appointments) = merge.patch else {
            panic!("expected appointments patch");
        };
        let ids: Vec<&str> = appointments.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["p-old", "p-mid", "p-pending", "p-new"]);
        assert!(appointments.iter().all(|item| item.user_profile.is_some()));
    }

    #[tokio::test]
    async fn recent_appointments_exclude_stale_and_unaccepted() {
        let service = ActivityService::new(seeded_store());
        let merge = service
            .fetch_recent_appointments(&ListingId::from("L1"), now())
            .await
            .expect("recent appointments fetched");

        let ActivityPatch::RecentAppointments(appointments) = merge.patch else {
            panic!("expected recent appointments patch");
        };
        let ids: Vec<&str> = appointments.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["p-mid", "p-new"]);
    }

    #[tokio::test]
    async fn oversized_window_is_an_error() {
        let service = ActivityService::with_recent_window(
            seeded_store(),
            Duration::days(100_000_000),
        );

        let result = service
            .fetch_recent_appointments(&ListingId::from("L1"), now())
            .await;

        assert!(matches!(
            result,
            Err(ActivityError::WindowOutOfRange { days: 100_000_000 })
        ));
    }

    #[tokio::test]
    async fn views_replace_board_state() {
        let service = ActivityService::new(seeded_store());
        let listing = ListingId::from("L1");

        let merge = service
            .fetch_views(&listing)
            .await
            .expect("views fetched")
            .expect("counters recorded");
        assert_eq!(merge.mode, MergeMode::Replace);

        let mut board = ListingActivityBoard::new();
        board.apply(merge);
        let views = board
            .get(&listing)
            .and_then(|activity| activity.views.clone())
            .expect("views applied");
        assert_eq!(views.0["total"], 42);

        assert!(service
            .fetch_views(&ListingId::from("L2"))
            .await
            .expect("lookup succeeds")
            .is_none());
    }
}
