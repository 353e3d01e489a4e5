use std::collections::HashMap;

use serde::Serialize;

use crate::listings::ListingId;
use crate::store::update::deep_merge;

use super::domain::{
    ActivityMerge, ActivityPatch, Application, Appointment, MergeMode, Offer, ViewCounters,
};

/// Everything the dashboard knows about one listing's activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListingActivity {
    pub offers: Vec<Offer>,
    pub applications: Vec<Application>,
    pub appointments: Vec<Appointment>,
    pub recent_appointments: Vec<Appointment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<ViewCounters>,
}

/// Reducer folding fetcher output into per-listing state.
#[derive(Debug, Clone, Default)]
pub struct ListingActivityBoard {
    listings: HashMap<ListingId, ListingActivity>,
}

impl ListingActivityBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, listing_id: &ListingId) -> Option<&ListingActivity> {
        self.listings.get(listing_id)
    }

    pub fn apply(&mut self, merge: ActivityMerge) {
        let ActivityMerge {
            listing_id,
            mode,
            patch,
        } = merge;
        let activity = self.listings.entry(listing_id).or_default();

        match patch {
            ActivityPatch::Offers(offers) => activity.offers = offers,
            ActivityPatch::Applications(applications) => activity.applications = applications,
            ActivityPatch::Appointments(appointments) => activity.appointments = appointments,
            ActivityPatch::RecentAppointments(appointments) => {
                activity.recent_appointments = appointments
            }
            ActivityPatch::Views(counters) => match (mode, activity.views.as_mut()) {
                (MergeMode::Additive, Some(current)) => deep_merge(&mut current.0, counters.0),
                _ => activity.views = Some(counters),
            },
        }
    }
}
