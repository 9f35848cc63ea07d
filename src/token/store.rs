//! Token store: durable ClientTokenRecord persistence keyed by token.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::aggregates::token_record::{ClientContact, ClientTokenRecord, ProductSnapshot};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The token string already exists. Callers regenerate the suffix and retry.
    #[error("token already exists")]
    Conflict,
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Key-value persistence of token records. `token` is the only uniqueness
/// constraint; duplicate SKUs, contacts, and quantities are all permitted.
pub trait TokenStore: Send + Sync {
    /// Inserts a record, failing with [`StoreError::Conflict`] if the token
    /// is taken. Returns the record as stored.
    fn create(&self, record: ClientTokenRecord) -> impl std::future::Future<Output = Result<ClientTokenRecord, StoreError>> + Send;

    /// Exact-match lookup. A hit touches `updated_at` (last-accessed marker)
    /// and returns the record carrying the new timestamp; a miss is `None`,
    /// not an error.
    fn get(&self, token: &str) -> impl std::future::Future<Output = Result<Option<ClientTokenRecord>, StoreError>> + Send;
}

// ---------------------------------------------------------------------------
// Postgres implementation
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgTokenStore {
    pool: sqlx::PgPool,
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    token: String,
    sku: String,
    product_id: Option<Uuid>,
    product_code: Option<String>,
    variant_id: Option<Uuid>,
    quantity: i32,
    color: String,
    size: String,
    client_name: String,
    client_email: String,
    client_phone: String,
    client_address: String,
    client_company: Option<String>,
    client_notes: Option<String>,
    snapshot_title: Option<String>,
    snapshot_hero_image: Option<String>,
    snapshot_slug: Option<String>,
    snapshot_code: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TokenRow> for ClientTokenRecord {
    fn from(r: TokenRow) -> Self {
        let product_snapshot = match (r.snapshot_title, r.snapshot_slug, r.snapshot_code) {
            (Some(product_title), Some(product_slug), Some(product_code)) => Some(ProductSnapshot {
                product_title,
                hero_image: r.snapshot_hero_image,
                product_slug,
                product_code,
            }),
            _ => None,
        };
        ClientTokenRecord {
            token: r.token,
            sku: r.sku,
            product_id: r.product_id,
            product_code: r.product_code,
            variant_id: r.variant_id,
            quantity: r.quantity.max(0) as u32,
            color: r.color,
            size: r.size,
            client: ClientContact {
                name: r.client_name,
                email: r.client_email,
                phone: r.client_phone,
                address: r.client_address,
                company: r.client_company,
                notes: r.client_notes,
            },
            product_snapshot,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

impl PgTokenStore {
    pub fn new(pool: sqlx::PgPool) -> Self { Self { pool } }
}

impl TokenStore for PgTokenStore {
    async fn create(&self, record: ClientTokenRecord) -> Result<ClientTokenRecord, StoreError> {
        let snap = record.product_snapshot.as_ref();
        let result = sqlx::query("INSERT INTO client_tokens (token, sku, product_id, product_code, variant_id, quantity, color, size, client_name, client_email, client_phone, client_address, client_company, client_notes, snapshot_title, snapshot_hero_image, snapshot_slug, snapshot_code, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)")
            .bind(&record.token).bind(&record.sku).bind(record.product_id).bind(&record.product_code)
            .bind(record.variant_id).bind(record.quantity as i32).bind(&record.color).bind(&record.size)
            .bind(&record.client.name).bind(&record.client.email).bind(&record.client.phone)
            .bind(&record.client.address).bind(&record.client.company).bind(&record.client.notes)
            .bind(snap.map(|s| s.product_title.clone())).bind(snap.and_then(|s| s.hero_image.clone()))
            .bind(snap.map(|s| s.product_slug.clone())).bind(snap.map(|s| s.product_code.clone()))
            .bind(record.created_at).bind(record.updated_at)
            .execute(&self.pool).await;
        match result {
            Ok(_) => Ok(record),
            Err(e) if e.as_database_error().is_some_and(|db| db.is_unique_violation()) => Err(StoreError::Conflict),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, token: &str) -> Result<Option<ClientTokenRecord>, StoreError> {
        // Touch and read in one round trip; only updated_at changes, so the
        // returned row is the pre-touch record with the fresh timestamp.
        let row = sqlx::query_as::<_, TokenRow>("UPDATE client_tokens SET updated_at = NOW() WHERE token = $1 RETURNING *")
            .bind(token).fetch_optional(&self.pool).await?;
        Ok(row.map(Into::into))
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation (tests, database-free local runs)
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    records: Arc<RwLock<HashMap<String, ClientTokenRecord>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self { Self::default() }
}

impl TokenStore for MemoryTokenStore {
    async fn create(&self, record: ClientTokenRecord) -> Result<ClientTokenRecord, StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.token) {
            return Err(StoreError::Conflict);
        }
        records.insert(record.token.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, token: &str) -> Result<Option<ClientTokenRecord>, StoreError> {
        let mut records = self.records.write().await;
        Ok(records.get_mut(token).map(|r| {
            r.updated_at = Utc::now();
            r.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::{fixture, Base};

    fn record(token: &str) -> ClientTokenRecord {
        let p = fixture("WEFT01", Base::Client, vec![("WEFT01-RED-M", "Red", "M", 900)]);
        let contact = ClientContact {
            name: "Rahim Traders".into(),
            email: "rahim@example.com".into(),
            phone: "+8801700000000".into(),
            address: "Dhaka".into(),
            company: None,
            notes: None,
        };
        ClientTokenRecord::issue(token.into(), &p, &p.variants[0], 2, "Red", "M", contact)
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_token() {
        let store = MemoryTokenStore::new();
        store.create(record("T#AAAAAA")).await.unwrap();
        assert!(matches!(store.create(record("T#AAAAAA")).await, Err(StoreError::Conflict)));
        // A different token with identical content is fine.
        store.create(record("T#BBBBBB")).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_touches_updated_at() {
        let store = MemoryTokenStore::new();
        store.create(record("T#CCCCCC")).await.unwrap();
        let first = store.get("T#CCCCCC").await.unwrap().unwrap();
        let second = store.get("T#CCCCCC").await.unwrap().unwrap();
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(second.created_at, first.created_at);
    }

    #[tokio::test]
    async fn test_get_miss_is_none() {
        let store = MemoryTokenStore::new();
        assert!(store.get("NOPE").await.unwrap().is_none());
    }
}
