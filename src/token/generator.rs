//! Token issuance.
//!
//! Tokens are shareable over plain-text channels (WhatsApp) and carry no
//! pricing. Shape: `SKU:color:size:qty#SUFFIX`, self-descriptive enough for
//! staff to sanity-check visually; the random suffix keeps repeat issuance
//! of the same tuple collision-free.

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

use crate::catalog::{Catalog, CatalogError};
use crate::domain::aggregates::product::{Product, Variant};
use crate::domain::aggregates::token_record::{ClientContact, ClientTokenRecord};
use crate::token::store::{StoreError, TokenStore};

pub const SUFFIX_LEN: usize = 6;
pub const MAX_ALLOCATION_ATTEMPTS: u32 = 6;

#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("Quantity must be a positive whole number")]
    InvalidQuantity,
    #[error("No product found for SKU {0}")]
    ProductNotFound(String),
    #[error("Product has no variants")]
    VariantNotFound,
    #[error("Unable to allocate a token, try again")]
    AllocationExhausted,
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Token slug for a color: lowercase, whitespace runs collapsed to hyphens.
pub fn color_slug(raw: &str) -> String {
    crate::domain::value_objects::normalize_color(raw)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Token slug for a size: uppercase, whitespace runs collapsed to hyphens.
pub fn size_slug(raw: &str) -> String {
    crate::domain::value_objects::normalize_size(raw)
        .to_uppercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Deterministic part of the token.
pub fn compose_base(sku: &str, color: &str, size: &str, quantity: u32) -> String {
    format!("{}:{}:{}:{}", sku, color_slug(color), size_slug(size), quantity)
}

/// Six uppercase alphanumerics. Collision avoidance, not a secret.
pub fn random_suffix() -> String {
    thread_rng()
        .sample_iter(Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect()
}

#[derive(Clone, Debug)]
pub struct Issuance {
    pub record: ClientTokenRecord,
    pub product: Product,
    pub variant: Variant,
}

/// Issues a new token for a (sku, color, size, quantity) order intent and
/// persists its record. On a token collision only the suffix is regenerated,
/// up to [`MAX_ALLOCATION_ATTEMPTS`] attempts.
pub async fn issue<S: TokenStore, C: Catalog>(
    store: &S,
    catalog: &C,
    sku: &str,
    quantity: i64,
    color: &str,
    size: &str,
    client: ClientContact,
) -> Result<Issuance, IssueError> {
    if quantity <= 0 {
        return Err(IssueError::InvalidQuantity);
    }
    // Bounded by the store's integer column; oversized values are rejected,
    // never wrapped.
    let quantity = i32::try_from(quantity).map_err(|_| IssueError::InvalidQuantity)? as u32;
    let sku = sku.trim();

    let product = catalog
        .find_by_sku(sku)
        .await?
        .ok_or_else(|| IssueError::ProductNotFound(sku.to_string()))?;
    let variant = product.matched_or_first(sku).ok_or(IssueError::VariantNotFound)?.clone();

    let base = compose_base(sku, color, size, quantity);
    let mut record = ClientTokenRecord::issue(String::new(), &product, &variant, quantity, color, size, client);

    for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
        record = record.with_token(format!("{}#{}", base, random_suffix()));
        match store.create(record.clone()).await {
            Ok(stored) => {
                tracing::debug!(token = %stored.token, sku, "issued client token");
                return Ok(Issuance { record: stored, product, variant });
            }
            Err(StoreError::Conflict) => {
                tracing::warn!(attempt, base = %base, "token collision, regenerating suffix");
            }
            Err(e) => return Err(IssueError::Store(e)),
        }
    }
    Err(IssueError::AllocationExhausted)
}
