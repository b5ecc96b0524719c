//! Cached fragment identities and registry records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::error::DomainError;

/// Kind of rendered fragment a registry record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FragmentKind {
    ProductCard,
    CategoryMenu,
    FeaturedProducts,
    Review,
    Footer,
    Header,
    Banner,
    Generic,
}

impl FragmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FragmentKind::ProductCard => "product-card",
            FragmentKind::CategoryMenu => "category-menu",
            FragmentKind::FeaturedProducts => "featured-products",
            FragmentKind::Review => "review",
            FragmentKind::Footer => "footer",
            FragmentKind::Header => "header",
            FragmentKind::Banner => "banner",
            FragmentKind::Generic => "generic",
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FragmentKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product-card" => Ok(FragmentKind::ProductCard),
            "category-menu" => Ok(FragmentKind::CategoryMenu),
            "featured-products" => Ok(FragmentKind::FeaturedProducts),
            "review" => Ok(FragmentKind::Review),
            "footer" => Ok(FragmentKind::Footer),
            "header" => Ok(FragmentKind::Header),
            "banner" => Ok(FragmentKind::Banner),
            "generic" => Ok(FragmentKind::Generic),
            other => Err(DomainError::validation(format!(
                "unknown fragment kind `{other}`"
            ))),
        }
    }
}

/// Composite identity of a cached fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FragmentKey {
    pub id: String,
    pub version: String,
    pub locale: String,
}

impl FragmentKey {
    pub fn new(
        id: impl Into<String>,
        version: impl Into<String>,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            locale: locale.into(),
        }
    }
}

impl fmt::Display for FragmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.id, self.version, self.locale)
    }
}

/// Durable registry record for one cached fragment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragmentRecord {
    pub key: FragmentKey,
    pub kind: FragmentKind,
    /// Cache store key holding the rendered fragment this record guards.
    pub cache_key: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}
