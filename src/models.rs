use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Free-text product record as the operator typed it (or as one CSV row).
///
/// `keywords` is comma-delimited; `imageUrls` and `features` are
/// newline-delimited. They stay raw until [`crate::normalize::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductDraft {
    pub title: String,
    pub category: String,
    pub price: String,
    pub currency: String,
    pub unit: String,
    pub stock: String,
    pub min_order_qty: String,
    pub keywords: String,
    pub image_urls: String,
    pub short_description: String,
    pub description: String,
    pub features: String,
    pub packaging: String,
    pub lead_time: String,
}

impl ProductDraft {
    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedItem {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub payload: ProductDraft,
}

impl QueuedItem {
    pub fn new(payload: ProductDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            payload,
        }
    }
}

/// A draft with its list-like fields exploded into trimmed, non-empty items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedProduct {
    pub title: String,
    pub category: String,
    pub price: String,
    pub currency: String,
    pub unit: String,
    pub stock: String,
    pub min_order_qty: String,
    pub keywords: Vec<String>,
    pub image_urls: Vec<String>,
    pub short_description: String,
    pub description: String,
    pub features: Vec<String>,
    pub packaging: String,
    pub lead_time: String,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
