use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::listings::ListingId;
use crate::store::{Fields, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    #[serde(flatten)]
    pub attributes: Fields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: String,
    pub listing_id: ListingId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<Timestamp>,
    #[serde(flatten)]
    pub terms: Fields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub listing_id: ListingId,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_request: Option<Value>,
    #[serde(
        rename = "userProfile",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub user_profile: Option<UserProfile>,
    #[serde(flatten)]
    pub attributes: Fields,
}

pub const ACCEPTED_STATE: &str = "accepted";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub listing_id: ListingId,
    pub user_id: UserId,
    pub state: String,
    pub date: Timestamp,
    #[serde(
        rename = "userProfile",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub user_profile: Option<UserProfile>,
    #[serde(flatten)]
    pub attributes: Fields,
}

/// Aggregate view counters, passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewCounters(pub Fields);

/// Slice of listing activity produced by one fetcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityPatch {
    Offers(Vec<Offer>),
    Applications(Vec<Application>),
    Appointments(Vec<Appointment>),
    RecentAppointments(Vec<Appointment>),
    Views(ViewCounters),
}

/// How a patch folds into caller state.
///
/// `Additive` merges into whatever the listing already holds; `Replace`
/// swaps the named slice wholesale. Only view counters are replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    Additive,
    Replace,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityMerge {
    pub listing_id: ListingId,
    pub mode: MergeMode,
    pub patch: ActivityPatch,
}

impl ActivityMerge {
    pub(crate) fn additive(listing_id: &ListingId, patch: ActivityPatch) -> Self {
        Self {
            listing_id: listing_id.clone(),
            mode: MergeMode::Additive,
            patch,
        }
    }

    pub(crate) fn replace(listing_id: &ListingId, patch: ActivityPatch) -> Self {
        Self {
            listing_id: listing_id.clone(),
            mode: MergeMode::Replace,
            patch,
        }
    }
}
