//! Item model for storefront listings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An item for sale
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub large_image: Option<String>,
    /// Price in minor currency units (cents)
    pub price: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn new(input: CreateItemInput) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title: input.title,
            description: input.description,
            image: input.image,
            large_image: input.large_image,
            price: input.price,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite every field present in `input`
    pub fn apply(&mut self, input: UpdateItemInput) {
        if let Some(title) = input.title {
            self.title = title;
        }
        if let Some(description) = input.description {
            self.description = description;
        }
        if let Some(image) = input.image {
            self.image = image;
        }
        if let Some(large_image) = input.large_image {
            self.large_image = large_image;
        }
        if let Some(price) = input.price {
            self.price = price;
        }
    }
}

/// Input for creating an item
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemInput {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub large_image: Option<String>,
    pub price: i64,
}

/// Input for updating an item; absent fields are left untouched.
///
/// The optional image fields distinguish an absent key (`None`) from an
/// explicit `null` (`Some(None)`), which clears the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemInput {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub image: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub large_image: Option<Option<String>>,
    pub price: Option<i64>,
}

// Only called when the key is present, so `null` becomes `Some(None)`
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
