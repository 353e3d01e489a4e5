use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{FieldInstruction, FieldWrite, FieldWrites, Fields, Timestamp};

use super::ListingError;

/// Fields that only exist on in-memory listing objects and are never persisted.
pub const TRANSIENT_FIELDS: [&str; 3] = ["id", "day_data", "brokers"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrokerId(pub String);

impl From<&str> for ListingId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for BrokerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A marketplace listing as stored in the `listings` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub owner_id: BrokerId,
    #[serde(default)]
    pub broker_ids: Vec<BrokerId>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub videos: Vec<String>,
    #[serde(default)]
    pub floorplans: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asking_offer: Option<AskingOffer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_number: Option<Value>,
    #[serde(flatten)]
    pub attributes: Fields,
}

impl Listing {
    /// Owner plus co-brokers, deduplicated, owner first.
    pub fn broker_refs(&self) -> Vec<BrokerId> {
        let mut refs = vec![self.owner_id.clone()];
        for broker in &self.broker_ids {
            if !refs.contains(broker) {
                refs.push(broker.clone());
            }
        }
        refs
    }

    pub fn involves(&self, broker: &BrokerId) -> bool {
        &self.owner_id == broker || self.broker_ids.contains(broker)
    }
}

/// Published lease terms; only `start_date` is interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskingOffer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Timestamp>,
    #[serde(flatten)]
    pub terms: Fields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerProfile {
    pub id: BrokerId,
    #[serde(flatten)]
    pub attributes: Fields,
}

/// Listing joined with the profiles of every broker attached to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedListing {
    #[serde(flatten)]
    pub listing: Listing,
    pub brokers: Vec<BrokerProfile>,
}

/// Partial listing body written by a publish.
///
/// Media lists already present here are kept and freshly uploaded paths are
/// appended after them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub videos: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floorplans: Option<Vec<String>>,
    #[serde(flatten)]
    pub fields: Fields,
}

impl ListingDraft {
    /// Drop client-side keys that are never persisted.
    pub(crate) fn strip_transient(&mut self) {
        for field in TRANSIENT_FIELDS {
            self.fields.remove(field);
        }
    }

    pub(crate) fn into_fields(mut self) -> Result<Fields, ListingError> {
        self.strip_transient();
        match serde_json::to_value(self)? {
            Value::Object(fields) => Ok(fields),
            other => Err(ListingError::InvalidUpdate(format!(
                "draft serialized to {other}"
            ))),
        }
    }
}

/// Input to [`ListingService::update_market_listing`](super::ListingService::update_market_listing).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketListingUpdate {
    /// `None` publishes a new listing under a store-allocated ID.
    #[serde(default)]
    pub listing_id: Option<ListingId>,
    #[serde(default)]
    pub draft: ListingDraft,
    /// Inline `data:` URLs.
    #[serde(default)]
    pub images_to_upload: Vec<String>,
    #[serde(default)]
    pub videos_to_upload: Vec<String>,
    #[serde(default)]
    pub floorplans_to_upload: Vec<String>,
    /// Storage paths to delete alongside the write.
    #[serde(default)]
    pub removed_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedListing {
    pub id: ListingId,
    pub image_urls: Option<Vec<String>>,
    pub floorplan_urls: Option<Vec<String>>,
    pub video_urls: Option<Vec<String>>,
    pub listing: ListingDraft,
    /// Removal paths the gateway failed to delete; the write still happened.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_removals: Vec<String>,
}

/// Field-level listing edit with explicit clear semantics for `unit_number`.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingPatch {
    pub unit_number: FieldInstruction<Value>,
    /// Replacement `asking_offer` with a canonical `start_date`.
    pub asking_offer: Option<Fields>,
    pub fields: Fields,
}

impl ListingPatch {
    /// Build a patch from a full client-side listing object.
    ///
    /// Transient keys are dropped. A missing or null `unit_number` means the
    /// unit number was removed and becomes [`FieldInstruction::Clear`].
    pub fn from_fields(mut raw: Fields) -> Result<Self, ListingError> {
        for field in TRANSIENT_FIELDS {
            raw.remove(field);
        }

        let unit_number = match raw.remove("unit_number") {
            None | Some(Value::Null) => FieldInstruction::Clear,
            Some(value) => FieldInstruction::Set(value),
        };

        let asking_offer = match raw.remove("asking_offer") {
            None => None,
            Some(Value::Object(mut offer)) => {
                if let Some(start_date) = offer.get("start_date") {
                    let canonical = Timestamp::from_value(start_date)?;
                    offer.insert("start_date".to_string(), canonical.to_value());
                }
                Some(offer)
            }
            Some(other) => {
                return Err(ListingError::InvalidUpdate(format!(
                    "asking_offer must be an object, got {other}"
                )))
            }
        };

        Ok(Self {
            unit_number,
            asking_offer,
            fields: raw,
        })
    }

    pub fn into_writes(self) -> Result<FieldWrites, ListingError> {
        let mut writes: FieldWrites = self
            .fields
            .into_iter()
            .map(|(field, value)| (field, FieldWrite::Set(value)))
            .collect();

        if let Some(offer) = self.asking_offer {
            writes.push(("asking_offer".to_string(), FieldWrite::Set(Value::Object(offer))));
        }
        if let Some(write) = self.unit_number.into_write()? {
            writes.push(("unit_number".to_string(), write));
        }

        Ok(writes)
    }
}
