//! Catalog read/persistence collaborator.
//!
//! The token subsystem only ever reads the catalog (by SKU, by code, by
//! base); product writes live on the Postgres implementation and are used
//! by the admin CRUD endpoints.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::aggregates::product::{Base, Product, Variant};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Read access to the product catalog, exactly what token issuance and
/// resolution need.
pub trait Catalog: Send + Sync {
    fn find_by_sku(&self, sku: &str) -> impl std::future::Future<Output = Result<Option<Product>, CatalogError>> + Send;
    fn find_by_code(&self, code: &str) -> impl std::future::Future<Output = Result<Option<Product>, CatalogError>> + Send;
    fn list_by_base(&self, base: Base) -> impl std::future::Future<Output = Result<Vec<Product>, CatalogError>> + Send;
}

// ---------------------------------------------------------------------------
// Postgres implementation
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgCatalog {
    pool: sqlx::PgPool,
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    slug: String,
    product_code: String,
    title: String,
    description: String,
    category: String,
    sub_category: Option<String>,
    fabric_details: Option<String>,
    care_instructions: Option<String>,
    hero_image: Option<String>,
    images: Vec<String>,
    base: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct VariantRow {
    id: Uuid,
    product_id: Uuid,
    sku: String,
    color: String,
    size: String,
    retail_price_bdt: i64,
}

impl ProductRow {
    fn assemble(self, variants: Vec<VariantRow>) -> Product {
        Product {
            id: self.id,
            slug: self.slug,
            product_code: self.product_code,
            title: self.title,
            description: self.description,
            category: self.category,
            sub_category: self.sub_category,
            fabric_details: self.fabric_details,
            care_instructions: self.care_instructions,
            hero_image: self.hero_image,
            images: self.images,
            base: Base::parse(&self.base).unwrap_or_default(),
            variants: variants
                .into_iter()
                .map(|v| Variant { id: v.id, sku: v.sku, color: v.color, size: v.size, retail_price_bdt: v.retail_price_bdt })
                .collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl PgCatalog {
    pub fn new(pool: sqlx::PgPool) -> Self { Self { pool } }

    async fn variants_of(&self, product_id: Uuid) -> Result<Vec<VariantRow>, CatalogError> {
        Ok(sqlx::query_as::<_, VariantRow>("SELECT * FROM variants WHERE product_id = $1 ORDER BY position")
            .bind(product_id).fetch_all(&self.pool).await?)
    }

    async fn load(&self, row: Option<ProductRow>) -> Result<Option<Product>, CatalogError> {
        match row {
            Some(row) => {
                let variants = self.variants_of(row.id).await?;
                Ok(Some(row.assemble(variants)))
            }
            None => Ok(None),
        }
    }

    pub async fn insert(&self, p: &Product) -> Result<(), CatalogError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO products (id, slug, product_code, title, description, category, sub_category, fabric_details, care_instructions, hero_image, images, base, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)")
            .bind(p.id).bind(&p.slug).bind(&p.product_code).bind(&p.title).bind(&p.description)
            .bind(&p.category).bind(&p.sub_category).bind(&p.fabric_details).bind(&p.care_instructions)
            .bind(&p.hero_image).bind(&p.images).bind(p.base.as_str()).bind(p.created_at).bind(p.updated_at)
            .execute(&mut *tx).await?;
        for (position, v) in p.variants.iter().enumerate() {
            sqlx::query("INSERT INTO variants (id, product_id, sku, color, size, retail_price_bdt, position) VALUES ($1, $2, $3, $4, $5, $6, $7)")
                .bind(v.id).bind(p.id).bind(&v.sku).bind(&v.color).bind(&v.size).bind(v.retail_price_bdt).bind(position as i32)
                .execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Full replace of the product row and its variant list, keyed by code.
    pub async fn update(&self, p: &Product) -> Result<bool, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query("UPDATE products SET slug = $2, title = $3, description = $4, category = $5, sub_category = $6, fabric_details = $7, care_instructions = $8, hero_image = $9, images = $10, base = $11, updated_at = $12 WHERE product_code = $1")
            .bind(&p.product_code).bind(&p.slug).bind(&p.title).bind(&p.description)
            .bind(&p.category).bind(&p.sub_category).bind(&p.fabric_details).bind(&p.care_instructions)
            .bind(&p.hero_image).bind(&p.images).bind(p.base.as_str()).bind(p.updated_at)
            .execute(&mut *tx).await?.rows_affected() > 0;
        if updated {
            sqlx::query("DELETE FROM variants WHERE product_id = $1").bind(p.id).execute(&mut *tx).await?;
            for (position, v) in p.variants.iter().enumerate() {
                sqlx::query("INSERT INTO variants (id, product_id, sku, color, size, retail_price_bdt, position) VALUES ($1, $2, $3, $4, $5, $6, $7)")
                    .bind(v.id).bind(p.id).bind(&v.sku).bind(&v.color).bind(&v.size).bind(v.retail_price_bdt).bind(position as i32)
                    .execute(&mut *tx).await?;
            }
        }
        tx.commit().await?;
        Ok(updated)
    }

    pub async fn delete(&self, code: &str) -> Result<bool, CatalogError> {
        Ok(sqlx::query("DELETE FROM products WHERE product_code = $1")
            .bind(code).execute(&self.pool).await?.rows_affected() > 0)
    }

    pub async fn count_by_base(&self, base: Base) -> Result<i64, CatalogError> {
        let n: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products WHERE base = $1")
            .bind(base.as_str()).fetch_one(&self.pool).await?;
        Ok(n.0)
    }
}

impl Catalog for PgCatalog {
    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, CatalogError> {
        let row = sqlx::query_as::<_, ProductRow>("SELECT p.* FROM products p JOIN variants v ON v.product_id = p.id WHERE v.sku = $1")
            .bind(sku).fetch_optional(&self.pool).await?;
        self.load(row).await
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Product>, CatalogError> {
        let row = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE product_code = $1")
            .bind(code).fetch_optional(&self.pool).await?;
        self.load(row).await
    }

    async fn list_by_base(&self, base: Base) -> Result<Vec<Product>, CatalogError> {
        let rows = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE base = $1 ORDER BY created_at DESC")
            .bind(base.as_str()).fetch_all(&self.pool).await?;
        let mut products = Vec::with_capacity(rows.len());
        for row in rows {
            let variants = self.variants_of(row.id).await?;
            products.push(row.assemble(variants));
        }
        Ok(products)
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation (tests, database-free local runs)
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MemoryCatalog {
    products: Vec<Product>,
}

impl MemoryCatalog {
    pub fn new(products: Vec<Product>) -> Self { Self { products } }
}

impl Catalog for MemoryCatalog {
    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, CatalogError> {
        Ok(self.products.iter().find(|p| p.variant_by_sku(sku).is_some()).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Product>, CatalogError> {
        Ok(self.products.iter().find(|p| p.product_code == code).cloned())
    }

    async fn list_by_base(&self, base: Base) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products.iter().filter(|p| p.base == base).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::fixture;

    #[tokio::test]
    async fn test_memory_catalog_lookups() {
        let catalog = MemoryCatalog::new(vec![
            fixture("WEFT01", Base::Client, vec![("WEFT01-RED-M", "Red", "M", 900)]),
            fixture("WEFT02", Base::Retail, vec![("WEFT02-BLU-L", "Blue", "L", 1100)]),
        ]);
        assert_eq!(catalog.find_by_sku("WEFT02-BLU-L").await.unwrap().unwrap().product_code, "WEFT02");
        assert!(catalog.find_by_sku("MISSING").await.unwrap().is_none());
        assert_eq!(catalog.find_by_code("WEFT01").await.unwrap().unwrap().slug, "weft01");
        assert_eq!(catalog.list_by_base(Base::Client).await.unwrap().len(), 1);
    }
}
