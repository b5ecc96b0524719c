//! Search document model.
//!
//! A [`SearchDocument`] is the normalized, index-ready projection of a
//! catalog product. Display fields keep their original casing for the
//! response path; matching happens over lower-cased tokens and the
//! pre-lowered `blob`.

use serde::{Deserialize, Serialize};

use super::product::ProductRecord;

/// Document fields that participate in matching, in weight order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Name,
    Description,
    Category,
    Vendor,
    Blob,
}

impl FieldKind {
    /// Relative weight of a match in this field.
    pub fn weight(self) -> u32 {
        match self {
            FieldKind::Name => 5,
            FieldKind::Description | FieldKind::Category => 3,
            FieldKind::Vendor => 2,
            FieldKind::Blob => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Name => "name",
            FieldKind::Description => "description",
            FieldKind::Category => "category",
            FieldKind::Vendor => "vendor",
            FieldKind::Blob => "blob",
        }
    }

    pub const ALL: [FieldKind; 5] = [
        FieldKind::Name,
        FieldKind::Description,
        FieldKind::Category,
        FieldKind::Vendor,
        FieldKind::Blob,
    ];
}

/// Index-ready projection of one product. Display fields keep their
/// original casing; matching normalizes on the way into the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: String,
    /// Pointer back to the source record.
    pub slug: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub vendor: String,
    /// Concatenation of all text fields, used for broad recall.
    pub blob: String,
    pub price: f64,
}

impl SearchDocument {
    pub fn from_record(record: &ProductRecord) -> Self {
        let blob = [
            record.name.as_str(),
            record.description.as_str(),
            record.category.as_str(),
            record.vendor.as_str(),
        ]
        .join(" ")
        .to_lowercase();

        Self {
            id: record.id.clone(),
            slug: record.slug.clone(),
            name: record.name.clone(),
            description: record.description.clone(),
            category: record.category.clone(),
            vendor: record.vendor.clone(),
            blob,
            price: record.price,
        }
    }

    pub fn field(&self, kind: FieldKind) -> &str {
        match kind {
            FieldKind::Name => &self.name,
            FieldKind::Description => &self.description,
            FieldKind::Category => &self.category,
            FieldKind::Vendor => &self.vendor,
            FieldKind::Blob => &self.blob,
        }
    }
}
