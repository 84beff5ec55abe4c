//! Content similarity: how closely a candidate matches the attributes a user
//! buys most often.

use std::collections::{BTreeMap, HashMap};

use crate::catalog::CatalogIndex;
use crate::domain::product::{Product, ProductAttribute, ProductId};

/// Frequency weights of attribute values across a purchase history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProfile {
    purchases: u64,
    weights: HashMap<ProductAttribute, BTreeMap<String, f64>>,
    modes: HashMap<ProductAttribute, String>,
}

impl UserProfile {
    /// Aggregates category, brand and department over `(product, item
    /// count)` purchases, so a product bought three times weighs three times.
    ///
    /// A value's weight is its share of all purchased items, so a product
    /// without a brand still counts towards the brand denominator. The mode of
    /// a dimension is its heaviest value, ties going to the smallest string.
    pub fn from_purchases(catalog: &CatalogIndex, purchases: &[(ProductId, u64)]) -> Self {
        let purchased: Vec<(&Product, u64)> = purchases
            .iter()
            .filter(|(_, quantity)| *quantity > 0)
            .filter_map(|(id, quantity)| catalog.find(*id).map(|product| (product, *quantity)))
            .collect();
        let items: u64 = purchased.iter().map(|(_, quantity)| quantity).sum();
        if items == 0 {
            return Self::default();
        }

        let total = items as f64;
        let mut weights = HashMap::new();
        let mut modes = HashMap::new();

        for attribute in ProductAttribute::ALL {
            let mut counts: BTreeMap<String, u64> = BTreeMap::new();
            for (product, quantity) in &purchased {
                if let Some(value) = product.attribute(attribute) {
                    *counts.entry(value.to_owned()).or_insert(0) += quantity;
                }
            }

            // BTreeMap iterates ascending, so keeping the first maximum picks
            // the lexicographically smallest value on ties.
            let mut mode: Option<(&String, u64)> = None;
            for (value, count) in &counts {
                if mode.map_or(true, |(_, best)| *count > best) {
                    mode = Some((value, *count));
                }
            }
            if let Some((value, _)) = mode {
                modes.insert(attribute, value.clone());
            }

            weights.insert(
                attribute,
                counts.into_iter().map(|(value, count)| (value, count as f64 / total)).collect(),
            );
        }

        Self { purchases: items, weights, modes }
    }

    pub fn is_empty(&self) -> bool {
        self.purchases == 0
    }

    /// Purchased items behind the weights.
    pub fn purchases(&self) -> u64 {
        self.purchases
    }

    pub fn weight(&self, attribute: ProductAttribute, value: &str) -> f64 {
        self.weights.get(&attribute).and_then(|values| values.get(value)).copied().unwrap_or(0.0)
    }

    pub fn mode(&self, attribute: ProductAttribute) -> Option<&str> {
        self.modes.get(&attribute).map(String::as_str)
    }

    /// The mode of a dimension together with its weight.
    pub fn preferred(&self, attribute: ProductAttribute) -> Option<(&str, f64)> {
        self.mode(attribute).map(|value| (value, self.weight(attribute, value)))
    }
}

/// Scores candidates against a [`UserProfile`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentScorer;

impl ContentScorer {
    pub fn new() -> Self {
        Self
    }

    /// Sum of the profile weight for every dimension where the candidate
    /// carries the user's most common value, divided by the number of
    /// dimensions. Always in [0, 1]; zero for an empty profile.
    pub fn score(&self, candidate: &Product, profile: &UserProfile) -> f64 {
        if profile.is_empty() {
            return 0.0;
        }

        let matched: f64 = ProductAttribute::ALL
            .iter()
            .filter_map(|attribute| {
                let mode = profile.mode(*attribute)?;
                let value = candidate.attribute(*attribute)?;
                (value == mode).then(|| profile.weight(*attribute, value))
            })
            .sum();

        (matched / ProductAttribute::ALL.len() as f64).clamp(0.0, 1.0)
    }
}
