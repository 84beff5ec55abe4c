//! Types for the recommendation engine

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::{Product, ProductId};
use crate::domain::user::UserId;
use crate::errors::{EngineError, EngineResult};

/// Weights for the two-signal blend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    /// Weight for the collaborative co-occurrence score (default: 0.6)
    pub collaborative: f64,
    /// Weight for the content similarity score (default: 0.4)
    pub content: f64,
}

impl Default for BlendWeights {
    fn default() -> Self {
        super::DEFAULT_WEIGHTS
    }
}

impl BlendWeights {
    pub fn new(collaborative: f64, content: f64) -> EngineResult<Self> {
        let weights = Self { collaborative, content };
        weights.validate()?;
        Ok(weights)
    }

    /// Each weight must lie in [0, 1] and the pair must sum to 1.
    pub fn validate(&self) -> EngineResult<()> {
        for (name, value) in [("collaborative", self.collaborative), ("content", self.content)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::invalid(format!(
                    "{name} weight must be in range 0..=1, got {value}"
                )));
            }
        }

        let sum = self.collaborative + self.content;
        if (sum - 1.0).abs() > super::WEIGHT_SUM_TOLERANCE {
            return Err(EngineError::invalid(format!("weights must sum to 1, got {sum}")));
        }

        Ok(())
    }
}

/// What to do for a user with no qualifying purchases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColdStartPolicy {
    /// Every signal is zero, so candidates come back in identifier order.
    #[default]
    IdentifierOrder,
    /// Rank by number of distinct purchasers instead.
    Popularity,
}

impl FromStr for ColdStartPolicy {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "identifier_order" => Ok(Self::IdentifierOrder),
            "popularity" => Ok(Self::Popularity),
            other => Err(EngineError::invalid(format!(
                "unsupported cold start policy `{other}` (expected identifier_order|popularity)"
            ))),
        }
    }
}

/// Optional narrowing of the candidate set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateFilter {
    /// Only products whose category contains this text
    pub category: Option<String>,
    /// Only products whose retail price does not exceed this
    pub max_price: Option<Decimal>,
}

impl CandidateFilter {
    pub fn validate(&self) -> EngineResult<()> {
        if let Some(max_price) = self.max_price {
            if max_price.is_sign_negative() {
                return Err(EngineError::invalid(format!(
                    "max_price must not be negative, got {max_price}"
                )));
            }
        }
        Ok(())
    }

    pub fn accepts(&self, product: &Product) -> bool {
        let category_ok = self
            .category
            .as_deref()
            .map_or(true, |category| product.category.contains(category));
        let price_ok = self.max_price.map_or(true, |max_price| product.retail_price <= max_price);
        category_ok && price_ok
    }
}

/// Request for recommendations
#[derive(Debug, Clone)]
pub struct RecommendRequest {
    /// User to recommend for
    pub user_id: UserId,
    /// Maximum number of recommendations to return
    pub count: usize,
    /// Blend weights; the engine default applies when absent
    pub weights: Option<BlendWeights>,
    /// Candidate narrowing
    pub filter: CandidateFilter,
}

impl RecommendRequest {
    /// Create a new request with the default count
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            count: super::DEFAULT_RECOMMENDATION_COUNT,
            weights: None,
            filter: CandidateFilter::default(),
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_weights(mut self, weights: BlendWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.filter.category = Some(category.into());
        self
    }

    pub fn with_max_price(mut self, max_price: Decimal) -> Self {
        self.filter.max_price = Some(max_price);
        self
    }
}

/// Individual signal values behind a combined score
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    /// Collaborative co-occurrence score (0.0 - 1.0)
    pub collaborative: f64,
    /// Content similarity score (0.0 - 1.0)
    pub content: f64,
    /// Normalized purchaser count (0.0 - 1.0), only set by the popularity fallback
    pub popularity: f64,
}

/// Which ranking produced a result list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMode {
    Hybrid,
    PopularityFallback,
}

/// A ranked candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub product_id: ProductId,
    /// Weighted blend of the component scores (0.0 - 1.0)
    pub score: f64,
    pub components: ComponentScores,
}

/// Most common value of one attribute dimension and its share of purchases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferredValue {
    pub value: String,
    pub weight: f64,
}

/// Summary of the purchase profile the content signal was computed from.
/// Every field is empty for a user without purchases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Qualifying order items behind the profile
    pub purchases: u64,
    pub category: Option<PreferredValue>,
    pub brand: Option<PreferredValue>,
    pub department: Option<PreferredValue>,
    /// Mean sale price over the same items
    pub avg_sale_price: Option<Decimal>,
}

/// Full answer to a recommendation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationList {
    pub user_id: UserId,
    pub mode: RankingMode,
    pub weights: BlendWeights,
    pub preferences: UserPreferences,
    pub items: Vec<Recommendation>,
}

impl RecommendationList {
    /// `(product_id, score)` pairs in rank order.
    pub fn pairs(&self) -> Vec<(ProductId, f64)> {
        self.items.iter().map(|item| (item.product_id, item.score)).collect()
    }

    pub fn product_ids(&self) -> Vec<ProductId> {
        self.items.iter().map(|item| item.product_id).collect()
    }
}

/// A product frequently bought by buyers of a seed product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedProduct {
    pub product_id: ProductId,
    /// Buyers of the seed who also bought this product
    pub shared_buyers: u64,
    /// `shared_buyers` divided by the best count in the list (0.0 - 1.0)
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn default_weights_favour_collaborative_signal() {
        let weights = BlendWeights::default();
        assert_eq!(weights.collaborative, 0.6);
        assert_eq!(weights.content, 0.4);
        assert!(weights.validate().is_ok());
    }

    #[test]
    fn weights_must_sum_to_one() {
        assert!(BlendWeights::new(0.5, 0.4).is_err());
        assert!(BlendWeights::new(0.7, 0.3).is_ok());
        assert!(BlendWeights::new(1.0, 0.0).is_ok());
    }

    #[test]
    fn weights_must_be_in_unit_range() {
        let error = BlendWeights::new(1.5, -0.5).expect_err("out of range");
        assert_eq!(
            error.to_string(),
            "invalid argument: collaborative weight must be in range 0..=1, got 1.5"
        );
        assert!(BlendWeights::new(f64::NAN, 0.5).is_err());
    }

    #[test]
    fn filter_rejects_negative_price_ceiling() {
        let filter =
            CandidateFilter { category: None, max_price: Some(Decimal::new(-1, 0)) };
        assert!(filter.validate().is_err());
    }

    #[test]
    fn category_filter_matches_part_of_the_category() {
        let product = Product {
            id: ProductId(1),
            name: "Trail Shoe".to_owned(),
            sku: None,
            category: "Outdoor Footwear".to_owned(),
            brand: None,
            department: None,
            cost: Decimal::new(3000, 2),
            retail_price: Decimal::new(8900, 2),
            distribution_center_id: None,
        };
        let filter = |category: &str| CandidateFilter {
            category: Some(category.to_owned()),
            max_price: Some(Decimal::new(9000, 2)),
        };

        assert!(filter("Footwear").accepts(&product));
        assert!(filter("Outdoor Footwear").accepts(&product));
        assert!(!filter("footwear").accepts(&product));
        assert!(!filter("Books").accepts(&product));
    }

    #[test]
    fn cold_start_policy_parses_config_spellings() {
        assert_eq!("popularity".parse::<ColdStartPolicy>().ok(), Some(ColdStartPolicy::Popularity));
        assert_eq!(
            "Identifier_Order".parse::<ColdStartPolicy>().ok(),
            Some(ColdStartPolicy::IdentifierOrder)
        );
        assert!("random".parse::<ColdStartPolicy>().is_err());
    }

    #[test]
    fn request_builder_sets_filters() {
        let request = RecommendRequest::new(UserId(4))
            .with_count(3)
            .with_category("Books")
            .with_max_price(Decimal::new(2000, 2));

        assert_eq!(request.count, 3);
        assert_eq!(request.filter.category.as_deref(), Some("Books"));
        assert_eq!(request.filter.max_price, Some(Decimal::new(2000, 2)));
        assert!(request.weights.is_none());
    }
}
