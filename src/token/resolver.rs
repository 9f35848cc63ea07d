//! Token resolution.
//!
//! Two generations of token circulate: persisted records (`BASE#SUFFIX`,
//! backed by the token store) and the older stateless shapes (a bare SKU,
//! or `sku:color:size:qty` with no suffix). Resolution consults the store
//! first and only falls back to structural parsing on a miss; the legacy
//! parser is never store-backed.

use crate::catalog::{Catalog, CatalogError};
use crate::domain::aggregates::product::{Product, Variant};
use crate::domain::aggregates::token_record::ClientTokenRecord;
use crate::token::store::{StoreError, TokenStore};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Please enter a token")]
    EmptyToken,
    #[error("Token format not recognized")]
    MalformedToken,
    #[error("Token quantity is not a positive whole number")]
    InvalidQuantity,
    #[error("No product matches this token")]
    ProductNotFound,
    #[error("Product has no variants")]
    VariantNotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Structural reading of a token that has no backing store record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedToken {
    /// `sku:color-with-hyphens:size:qty`. Color is already de-hyphenated
    /// for display.
    Legacy { sku: String, color: String, size: String, quantity: u32 },
    /// The whole token is a SKU; quantity and attributes come from the
    /// resolved variant.
    BareSku(String),
}

/// Parses the legacy shapes. The caller has already trimmed the input and
/// ruled out the persisted-record path.
pub fn parse(token: &str) -> Result<ParsedToken, ResolveError> {
    if !token.contains(':') {
        return Ok(ParsedToken::BareSku(token.to_string()));
    }
    let parts: Vec<&str> = token.split(':').collect();
    if parts.len() != 4 {
        return Err(ResolveError::MalformedToken);
    }
    let quantity: u32 = match parts[3].parse::<u32>() {
        Ok(q) if q > 0 => q,
        _ => return Err(ResolveError::InvalidQuantity),
    };
    Ok(ParsedToken::Legacy {
        sku: parts[0].to_string(),
        color: parts[1].replace('-', " "),
        size: parts[2].to_string(),
        quantity,
    })
}

/// Display-ready bundle recovered from a token.
#[derive(Clone, Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedToken {
    pub product: Product,
    pub variant: Variant,
    pub quantity: u32,
    pub color: String,
    pub size: String,
    /// Present only when the token was backed by a store record.
    pub record: Option<ClientTokenRecord>,
}

pub async fn resolve<S: TokenStore, C: Catalog>(
    store: &S,
    catalog: &C,
    raw: &str,
) -> Result<ResolvedToken, ResolveError> {
    let token = raw.trim();
    if token.is_empty() {
        return Err(ResolveError::EmptyToken);
    }

    if let Some(record) = store.get(token).await? {
        let (product, variant) = lookup(catalog, &record.sku).await?;
        tracing::debug!(token, sku = %record.sku, "resolved persisted token");
        return Ok(ResolvedToken {
            quantity: record.quantity,
            color: record.color.clone(),
            size: record.size.clone(),
            product,
            variant,
            record: Some(record),
        });
    }

    match parse(token)? {
        ParsedToken::Legacy { sku, color, size, quantity } => {
            let (product, variant) = lookup(catalog, &sku).await?;
            Ok(ResolvedToken { product, variant, quantity, color, size, record: None })
        }
        ParsedToken::BareSku(sku) => {
            let (product, variant) = lookup(catalog, &sku).await?;
            let (color, size) = (variant.color.clone(), variant.size.clone());
            Ok(ResolvedToken { product, variant, quantity: 1, color, size, record: None })
        }
    }
}

async fn lookup<C: Catalog>(catalog: &C, sku: &str) -> Result<(Product, Variant), ResolveError> {
    let product = catalog.find_by_sku(sku).await?.ok_or(ResolveError::ProductNotFound)?;
    let variant = product.matched_or_first(sku).ok_or(ResolveError::VariantNotFound)?.clone();
    Ok((product, variant))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::domain::aggregates::product::{fixture, Base};
    use crate::domain::aggregates::token_record::ClientContact;
    use crate::token::generator;
    use crate::token::store::MemoryTokenStore;

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new(vec![fixture(
            "WEFT01",
            Base::Client,
            vec![("WEFT01-RED-M", "Red", "M", 900), ("WEFT01-BLU-L", "Blue", "L", 950)],
        )])
    }

    fn contact() -> ClientContact {
        ClientContact {
            name: "Rahim Traders".into(),
            email: "rahim@example.com".into(),
            phone: "+8801700000000".into(),
            address: "Dhaka".into(),
            company: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_legacy_round_trip_restores_color_spaces() {
        let store = MemoryTokenStore::new();
        let token = format!("WEFT01-RED-M:{}:{}:7", generator::color_slug("Deep Maroon"), generator::size_slug("M"));
        let r = resolve(&store, &catalog(), &token).await.unwrap();
        assert_eq!(r.quantity, 7);
        assert_eq!(r.color, "deep maroon");
        assert_eq!(r.size, "M");
        assert!(r.record.is_none());
        assert_eq!(r.variant.sku, "WEFT01-RED-M");
    }

    #[tokio::test]
    async fn test_bare_sku_uses_variant_attributes() {
        let store = MemoryTokenStore::new();
        let r = resolve(&store, &catalog(), "  WEFT01-BLU-L ").await.unwrap();
        assert_eq!(r.quantity, 1);
        assert_eq!(r.color, "Blue");
        assert_eq!(r.size, "L");
        assert!(r.record.is_none());
    }

    #[tokio::test]
    async fn test_persisted_token_resolves_from_record() {
        let store = MemoryTokenStore::new();
        let catalog = catalog();
        let issued = generator::issue(&store, &catalog, "WEFT01-RED-M", 12, "Red", "M", contact()).await.unwrap();
        let r = resolve(&store, &catalog, &issued.record.token).await.unwrap();
        assert_eq!(r.quantity, 12);
        assert_eq!(r.color, "Red");
        let record = r.record.unwrap();
        assert_eq!(record.client.name, "Rahim Traders");
        assert_eq!(record.sku, "WEFT01-RED-M");
    }

    #[tokio::test]
    async fn test_persisted_shape_missing_from_store_is_invalid_quantity() {
        // A suffixed token we no longer hold falls through to the 4-part
        // parser and dies on the `qty#SUFFIX` quantity field.
        let store = MemoryTokenStore::new();
        let err = resolve(&store, &catalog(), "WEFT01-RED-M:red:M:4#ZZZZZZ").await.unwrap_err();
        assert!(matches!(err, ResolveError::InvalidQuantity));
    }

    #[tokio::test]
    async fn test_error_cases() {
        let store = MemoryTokenStore::new();
        let catalog = catalog();
        assert!(matches!(resolve(&store, &catalog, "   ").await, Err(ResolveError::EmptyToken)));
        assert!(matches!(resolve(&store, &catalog, "a:b:c").await, Err(ResolveError::MalformedToken)));
        assert!(matches!(resolve(&store, &catalog, "a:b:c:d:e").await, Err(ResolveError::MalformedToken)));
        assert!(matches!(resolve(&store, &catalog, "WEFT01-RED-M:red:M:0").await, Err(ResolveError::InvalidQuantity)));
        assert!(matches!(resolve(&store, &catalog, "WEFT01-RED-M:red:M:many").await, Err(ResolveError::InvalidQuantity)));
        // Beyond u32 must not wrap to a small quantity.
        assert!(matches!(resolve(&store, &catalog, "WEFT01-RED-M:red:M:4294967297").await, Err(ResolveError::InvalidQuantity)));
        assert!(matches!(resolve(&store, &catalog, "GHOST-SKU").await, Err(ResolveError::ProductNotFound)));
    }

    #[test]
    fn test_parse_shapes() {
        assert_eq!(parse("WEFT01-RED-M").unwrap(), ParsedToken::BareSku("WEFT01-RED-M".into()));
        assert_eq!(
            parse("S1:deep-maroon:FREE-SIZE:3").unwrap(),
            ParsedToken::Legacy { sku: "S1".into(), color: "deep maroon".into(), size: "FREE-SIZE".into(), quantity: 3 }
        );
    }
}
