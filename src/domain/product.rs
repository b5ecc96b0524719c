//! Canonical product records and resolution of catalog feed alternates.

use serde::{Deserialize, Serialize};
use vetrina_api_types::ProductPayload;

/// Volatility attributes that shorten cache lifetimes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolatilityFlags {
    pub is_new: bool,
    pub is_on_sale: bool,
    pub limited_stock: bool,
}

/// A catalog product with all alternate field names already resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub vendor: String,
    pub price: f64,
    pub flags: VolatilityFlags,
}

impl ProductRecord {
    /// Resolve a raw feed payload into a canonical record.
    ///
    /// Alternate source fields are resolved by preferring the first
    /// non-empty value in a fixed order: `description` before
    /// `short_description`, `category` before `category_name`, `vendor`
    /// before `brand`. A missing slug falls back to the id.
    pub fn from_payload(payload: ProductPayload) -> Self {
        let description = first_non_empty(payload.description, payload.short_description);
        let category = first_non_empty(payload.category, payload.category_name);
        let vendor = first_non_empty(payload.vendor, payload.brand);
        let slug = payload
            .slug
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| payload.id.clone());

        Self {
            id: payload.id,
            slug,
            name: payload.name.unwrap_or_default(),
            description,
            category,
            vendor,
            price: payload.price.unwrap_or(0.0),
            flags: VolatilityFlags {
                is_new: payload.is_new,
                is_on_sale: payload.is_on_sale,
                limited_stock: payload.limited_stock,
            },
        }
    }

    pub fn to_payload(&self) -> ProductPayload {
        ProductPayload {
            id: self.id.clone(),
            slug: Some(self.slug.clone()),
            name: Some(self.name.clone()),
            description: Some(self.description.clone()),
            short_description: None,
            category: Some(self.category.clone()),
            category_name: None,
            vendor: Some(self.vendor.clone()),
            brand: None,
            price: Some(self.price),
            is_new: self.flags.is_new,
            is_on_sale: self.flags.is_on_sale,
            limited_stock: self.flags.limited_stock,
        }
    }
}

fn first_non_empty(primary: Option<String>, alternate: Option<String>) -> String {
    primary
        .filter(|s| !s.trim().is_empty())
        .or(alternate)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_default()
}
