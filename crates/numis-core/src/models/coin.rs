//! Coin domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Originality {
    Original,
    Replica,
    #[default]
    Unknown,
}

impl Originality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Originality::Original => "original",
            Originality::Replica => "replica",
            Originality::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "original" => Some(Originality::Original),
            "replica" => Some(Originality::Replica),
            "unknown" => Some(Originality::Unknown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coin {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub quantity: i64,
    pub year: i32,
    pub country: String,
    pub face_value: String,
    pub purchase_price: Option<f64>,
    pub estimated_value: Option<f64>,
    pub originality: Originality,
    pub condition: Option<String>,
    pub storage_location: Option<String>,
    pub category: Option<String>,
    pub acquisition_date: Option<DateTime<Utc>>,
    pub acquisition_source: Option<String>,
    pub notes: Option<String>,
    pub image_url_front: Option<String>,
    pub image_url_back: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency guard, bumped on every write.
    #[serde(skip)]
    pub version: u64,
}

impl Coin {
    /// Build a fresh coin from creation input.
    pub fn new(owner_id: Uuid, input: CreateCoin, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title: input.title,
            quantity: input.quantity,
            year: input.year,
            country: input.country,
            face_value: input.face_value,
            purchase_price: input.purchase_price,
            estimated_value: input.estimated_value,
            originality: input.originality,
            condition: input.condition,
            storage_location: input.storage_location,
            category: input.category,
            acquisition_date: input.acquisition_date,
            acquisition_source: input.acquisition_source,
            notes: input.notes,
            image_url_front: input.image_url_front,
            image_url_back: input.image_url_back,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    /// Merge a partial update into a copy of this coin.
    ///
    /// Only fields present in `patch` change. `updated_at` and `version`
    /// advance even when the patch is empty.
    pub fn apply_patch(&self, patch: CoinPatch, now: DateTime<Utc>) -> Coin {
        let mut next = self.clone();
        if let Some(title) = patch.title {
            next.title = title;
        }
        if let Some(quantity) = patch.quantity {
            next.quantity = quantity;
        }
        if let Some(year) = patch.year {
            next.year = year;
        }
        if let Some(country) = patch.country {
            next.country = country;
        }
        if let Some(face_value) = patch.face_value {
            next.face_value = face_value;
        }
        if let Some(purchase_price) = patch.purchase_price {
            next.purchase_price = purchase_price;
        }
        if let Some(estimated_value) = patch.estimated_value {
            next.estimated_value = estimated_value;
        }
        if let Some(originality) = patch.originality {
            next.originality = originality;
        }
        if let Some(condition) = patch.condition {
            next.condition = condition;
        }
        if let Some(storage_location) = patch.storage_location {
            next.storage_location = storage_location;
        }
        if let Some(category) = patch.category {
            next.category = category;
        }
        if let Some(acquisition_date) = patch.acquisition_date {
            next.acquisition_date = acquisition_date;
        }
        if let Some(acquisition_source) = patch.acquisition_source {
            next.acquisition_source = acquisition_source;
        }
        if let Some(notes) = patch.notes {
            next.notes = notes;
        }
        if let Some(image_url_front) = patch.image_url_front {
            next.image_url_front = image_url_front;
        }
        if let Some(image_url_back) = patch.image_url_back {
            next.image_url_back = image_url_back;
        }
        next.updated_at = now;
        next.version = self.version + 1;
        next
    }

    /// Copy of this coin holding `quantity`.
    pub fn with_quantity(&self, quantity: i64, now: DateTime<Utc>) -> Coin {
        let mut next = self.clone();
        next.quantity = quantity;
        next.updated_at = now;
        next.version = self.version + 1;
        next
    }

    /// Point-in-time snapshot of the visible fields, as stored in audit
    /// entries.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCoin {
    pub title: String,
    pub quantity: i64,
    pub year: i32,
    pub country: String,
    pub face_value: String,
    pub purchase_price: Option<f64>,
    pub estimated_value: Option<f64>,
    #[serde(default)]
    pub originality: Originality,
    pub condition: Option<String>,
    pub storage_location: Option<String>,
    pub category: Option<String>,
    pub acquisition_date: Option<DateTime<Utc>>,
    pub acquisition_source: Option<String>,
    pub notes: Option<String>,
    pub image_url_front: Option<String>,
    pub image_url_back: Option<String>,
}

/// Typed partial update. Nullable fields use `Some(None)` to clear.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoinPatch {
    pub title: Option<String>,
    pub quantity: Option<i64>,
    pub year: Option<i32>,
    pub country: Option<String>,
    pub face_value: Option<String>,
    pub purchase_price: Option<Option<f64>>,
    pub estimated_value: Option<Option<f64>>,
    pub originality: Option<Originality>,
    pub condition: Option<Option<String>>,
    pub storage_location: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub acquisition_date: Option<Option<DateTime<Utc>>>,
    pub acquisition_source: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub image_url_front: Option<Option<String>>,
    pub image_url_back: Option<Option<String>>,
}
