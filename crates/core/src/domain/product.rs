use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::inventory::DistributionCenterId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub u64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Catalog entry. Immutable once loaded into a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sku: Option<String>,
    pub category: String,
    pub brand: Option<String>,
    pub department: Option<String>,
    pub cost: Decimal,
    pub retail_price: Decimal,
    pub distribution_center_id: Option<DistributionCenterId>,
}

/// The three attribute dimensions used for content matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductAttribute {
    Category,
    Brand,
    Department,
}

impl ProductAttribute {
    pub const ALL: [ProductAttribute; 3] =
        [ProductAttribute::Category, ProductAttribute::Brand, ProductAttribute::Department];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Brand => "brand",
            Self::Department => "department",
        }
    }
}

impl Product {
    /// Value of the given attribute, `None` when the product does not carry one.
    pub fn attribute(&self, attribute: ProductAttribute) -> Option<&str> {
        match attribute {
            ProductAttribute::Category => Some(self.category.as_str()),
            ProductAttribute::Brand => self.brand.as_deref(),
            ProductAttribute::Department => self.department.as_deref(),
        }
    }
}
