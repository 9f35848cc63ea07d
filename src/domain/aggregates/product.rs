//! Product aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which storefront a product surfaces on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Base {
    #[default]
    Retail,
    Client,
}

impl Base {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Retail => "retail", Self::Client => "client" }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "retail" => Some(Self::Retail),
            "client" => Some(Self::Client),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub slug: String,
    pub product_code: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub sub_category: Option<String>,
    pub fabric_details: Option<String>,
    pub care_instructions: Option<String>,
    pub hero_image: Option<String>,
    pub images: Vec<String>,
    pub base: Base,
    pub variants: Vec<Variant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: Uuid,
    pub sku: String,
    pub color: String,
    pub size: String,
    #[serde(rename = "retailPriceBDT")]
    pub retail_price_bdt: i64,
}

impl Product {
    pub fn variant_by_sku(&self, sku: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.sku == sku)
    }

    /// The variant the SKU names, or the first variant when the catalog row
    /// and the variant list have drifted apart. `None` only for a product
    /// with no variants at all.
    pub fn matched_or_first(&self, sku: &str) -> Option<&Variant> {
        self.variant_by_sku(sku).or_else(|| self.variants.first())
    }

    /// Wholesale-facing projection: everything a client buyer may see,
    /// retail prices withheld.
    pub fn client_view(&self) -> ClientProductView {
        ClientProductView {
            product_code: self.product_code.clone(),
            slug: self.slug.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            sub_category: self.sub_category.clone(),
            fabric_details: self.fabric_details.clone(),
            care_instructions: self.care_instructions.clone(),
            hero_image: self.hero_image.clone(),
            images: self.images.clone(),
            variants: self
                .variants
                .iter()
                .map(|v| ClientVariantView { sku: v.sku.clone(), color: v.color.clone(), size: v.size.clone() })
                .collect(),
        }
    }

    pub fn touch(&mut self) { self.updated_at = Utc::now(); }
}

/// Price-free product view served to gated wholesale buyers.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientProductView {
    pub product_code: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub sub_category: Option<String>,
    pub fabric_details: Option<String>,
    pub care_instructions: Option<String>,
    pub hero_image: Option<String>,
    pub images: Vec<String>,
    pub variants: Vec<ClientVariantView>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientVariantView {
    pub sku: String,
    pub color: String,
    pub size: String,
}

#[cfg(test)]
pub(crate) fn fixture(code: &str, base: Base, variants: Vec<(&str, &str, &str, i64)>) -> Product {
    let now = Utc::now();
    Product {
        id: Uuid::new_v4(),
        slug: code.to_lowercase(),
        product_code: code.to_string(),
        title: format!("{code} title"),
        description: String::new(),
        category: "sarees".into(),
        sub_category: None,
        fabric_details: None,
        care_instructions: None,
        hero_image: None,
        images: vec![],
        base,
        variants: variants
            .into_iter()
            .map(|(sku, color, size, price)| Variant {
                id: Uuid::new_v4(),
                sku: sku.to_string(),
                color: color.to_string(),
                size: size.to_string(),
                retail_price_bdt: price,
            })
            .collect(),
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_match_falls_back_to_first() {
        let p = fixture("WEFT01", Base::Client, vec![("WEFT01-RED-M", "Red", "M", 1200), ("WEFT01-BLU-L", "Blue", "L", 1200)]);
        assert_eq!(p.matched_or_first("WEFT01-BLU-L").unwrap().color, "Blue");
        assert_eq!(p.matched_or_first("NOPE").unwrap().color, "Red");
    }

    #[test]
    fn test_client_view_has_no_prices() {
        let p = fixture("WEFT01", Base::Client, vec![("WEFT01-RED-M", "Red", "M", 1200)]);
        let json = serde_json::to_value(p.client_view()).unwrap();
        assert!(json.get("variants").unwrap()[0].get("retailPriceBDT").is_none());
        assert_eq!(json["variants"][0]["sku"], "WEFT01-RED-M");
    }
}
