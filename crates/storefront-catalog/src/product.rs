//! Product listing shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Keys checked, in order, for the product array of a wrapped listing.
const LISTING_KEYS: [&str; 3] = ["items", "data", "products"];

/// One product card. Scraped fields are free-form text and may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductItem {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub reviews: Option<String>,
    #[serde(default)]
    pub img_url: Option<String>,
    #[serde(default)]
    pub marketplace: String,
}

impl ProductItem {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(unnamed)")
    }
}

/// Extract products from a listing body.
///
/// Accepts a bare array or an object wrapping one under `items`, `data` or
/// `products`. Entries that are not product objects are skipped.
pub fn normalize_listing(value: &Value) -> Vec<ProductItem> {
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(map) => match LISTING_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
        {
            Some(entries) => entries,
            None => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    let items: Vec<ProductItem> = entries
        .iter()
        .filter(|entry| entry.is_object())
        .filter_map(|entry| ProductItem::deserialize(entry).ok())
        .collect();

    if items.len() != entries.len() {
        debug!(
            total = entries.len(),
            kept = items.len(),
            "Skipped listing entries that are not products"
        );
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unified_response_shape() {
        let body = json!({
            "query": "phone",
            "count": 1,
            "items": [{
                "name": "Phone X",
                "url": "https://example.com/p/1",
                "price": "19 990 ₽",
                "rating": "4.8",
                "reviews": "1 204",
                "img_url": null,
                "marketplace": "wb"
            }]
        });

        let items = normalize_listing(&body);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name.as_deref(), Some("Phone X"));
        assert_eq!(items[0].marketplace, "wb");
        assert!(items[0].img_url.is_none());
    }

    #[test]
    fn test_bare_array() {
        let items = normalize_listing(&json!([{ "name": "A", "marketplace": "ozon" }]));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].marketplace, "ozon");
    }

    #[test]
    fn test_alternate_keys_in_order() {
        let items = normalize_listing(&json!({ "data": [{ "name": "D" }], "products": [{ "name": "P" }] }));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name.as_deref(), Some("D"));

        let items = normalize_listing(&json!({ "items": "none", "products": [{ "name": "P" }] }));
        assert_eq!(items[0].name.as_deref(), Some("P"));
    }

    #[test]
    fn test_unknown_shapes_are_empty() {
        assert!(normalize_listing(&json!({ "results": [{ "name": "A" }] })).is_empty());
        assert!(normalize_listing(&json!("text")).is_empty());
        assert!(normalize_listing(&Value::Null).is_empty());
    }

    #[test]
    fn test_skips_entries_that_are_not_products() {
        let items = normalize_listing(&json!([
            { "name": "ok" },
            42,
            { "name": 7 },
            { "name": "also ok", "marketplace": "wb" }
        ]));
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].display_name(), "also ok");
    }

    #[test]
    fn test_missing_marketplace_defaults_to_empty() {
        let items = normalize_listing(&json!([{}]));
        assert_eq!(items[0].marketplace, "");
        assert_eq!(items[0].display_name(), "(unnamed)");
    }
}
