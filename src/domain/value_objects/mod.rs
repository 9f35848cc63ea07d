//! Value objects for the storefront

/// Derives a short human-facing product code from a URL slug: uppercase,
/// alphanumerics only, at most 12 characters. Used whenever a product is
/// created without an explicit code.
pub fn derive_product_code(slug: &str) -> String {
    slug.to_uppercase().chars().filter(|c| c.is_ascii_alphanumeric()).take(12).collect()
}

pub const UNSPECIFIED_COLOR: &str = "unspecified";
pub const UNSIZED: &str = "unsized";

/// Trims a buyer-supplied color; blank means the buyer did not pick one.
pub fn normalize_color(raw: &str) -> String {
    let t = raw.trim();
    if t.is_empty() { UNSPECIFIED_COLOR.to_string() } else { t.to_string() }
}

/// Trims a buyer-supplied size; blank means the buyer did not pick one.
pub fn normalize_size(raw: &str) -> String {
    let t = raw.trim();
    if t.is_empty() { UNSIZED.to_string() } else { t.to_string() }
}
