//! Client token record aggregate
//!
//! One record per wholesale inquiry: an opaque shareable token bound to a
//! variant SKU, a quantity, and the buyer's contact details, plus enough
//! denormalized product data to stay displayable if the product is later
//! edited or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::product::{Product, Variant};
use crate::domain::value_objects::{normalize_color, normalize_size};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContact {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub company: Option<String>,
    pub notes: Option<String>,
}

/// Display snapshot captured at issuance time.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub product_title: String,
    pub hero_image: Option<String>,
    pub product_slug: String,
    pub product_code: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientTokenRecord {
    /// The opaque string handed to the buyer. Globally unique, immutable.
    pub token: String,
    /// Variant join key, resolved lazily at lookup time.
    pub sku: String,
    pub product_id: Option<Uuid>,
    pub product_code: Option<String>,
    pub variant_id: Option<Uuid>,
    pub quantity: u32,
    pub color: String,
    pub size: String,
    pub client: ClientContact,
    pub product_snapshot: Option<ProductSnapshot>,
    pub created_at: DateTime<Utc>,
    /// Doubles as a last-accessed marker: touched on every successful lookup.
    pub updated_at: DateTime<Utc>,
}

impl ClientTokenRecord {
    /// Builds a fresh record for an issuance against a resolved product and
    /// variant. Blank color/size fall back to their display defaults.
    pub fn issue(
        token: String,
        product: &Product,
        variant: &Variant,
        quantity: u32,
        color: &str,
        size: &str,
        client: ClientContact,
    ) -> Self {
        let now = Utc::now();
        Self {
            token,
            sku: variant.sku.clone(),
            product_id: Some(product.id),
            product_code: Some(product.product_code.clone()),
            variant_id: Some(variant.id),
            quantity,
            color: normalize_color(color),
            size: normalize_size(size),
            client,
            product_snapshot: Some(ProductSnapshot {
                product_title: product.title.clone(),
                hero_image: product.hero_image.clone(),
                product_slug: product.slug.clone(),
                product_code: product.product_code.clone(),
            }),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the token string, keeping everything else. Used when a store
    /// conflict forces a new uniqueness suffix.
    pub fn with_token(mut self, token: String) -> Self {
        self.token = token;
        self
    }
}
