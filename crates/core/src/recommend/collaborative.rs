//! Item-based collaborative filtering by counting overlapping buyers.

use std::collections::HashMap;

use crate::domain::product::ProductId;
use crate::domain::user::UserId;
use crate::history::PurchaseHistoryStore;

/// Raw co-occurrence counts for one query, plus the normalizer chosen for the
/// candidate set under consideration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoOccurrenceCounts {
    counts: HashMap<ProductId, u64>,
    max: u64,
}

impl CoOccurrenceCounts {
    pub fn raw(&self, product_id: ProductId) -> u64 {
        self.counts.get(&product_id).copied().unwrap_or(0)
    }

    /// Largest raw count among the candidates passed to [`Self::normalize_over`].
    pub fn max(&self) -> u64 {
        self.max
    }

    /// Fixes the min-max normalizer to the best raw count among `candidates`.
    pub fn normalize_over(mut self, candidates: &[ProductId]) -> Self {
        self.max = candidates.iter().map(|id| self.raw(*id)).max().unwrap_or(0);
        self
    }

    /// Normalized score in [0, 1]; zero everywhere when nothing co-occurs.
    pub fn score(&self, product_id: ProductId) -> f64 {
        if self.max == 0 {
            return 0.0;
        }
        (self.raw(product_id) as f64 / self.max as f64).min(1.0)
    }

    /// Products with a positive count, in ascending identifier order.
    pub fn nonzero(&self) -> Vec<(ProductId, u64)> {
        let mut entries: Vec<(ProductId, u64)> = self
            .counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(id, count)| (*id, *count))
            .collect();
        entries.sort_unstable_by_key(|(id, _)| *id);
        entries
    }
}

/// Counts, for every product, how often it appears in the histories of users
/// who share a purchase with the query.
#[derive(Debug, Clone, Copy)]
pub struct CollaborativeScorer<'a> {
    history: &'a PurchaseHistoryStore,
}

impl<'a> CollaborativeScorer<'a> {
    pub fn new(history: &'a PurchaseHistoryStore) -> Self {
        Self { history }
    }

    /// For each product P the user bought and each other buyer of P, every
    /// product in that buyer's history except P itself gains the number of
    /// items of it the buyer purchased. Owned products are not removed here;
    /// candidate selection is the ranker's job.
    pub fn counts_for_user(&self, user_id: UserId) -> CoOccurrenceCounts {
        let mut counts: HashMap<ProductId, u64> = HashMap::new();
        let Some(purchases) = self.history.history(user_id) else {
            return CoOccurrenceCounts::default();
        };

        for seed in purchases {
            self.accumulate(*seed, Some(user_id), Tally::Items, &mut counts);
        }

        CoOccurrenceCounts { counts, max: 0 }
    }

    /// Same counting seeded by a single product, except each buyer of `seed`
    /// contributes one to every other product they bought, so the counts are
    /// shared buyers.
    pub fn counts_for_product(&self, seed: ProductId) -> CoOccurrenceCounts {
        let mut counts: HashMap<ProductId, u64> = HashMap::new();
        self.accumulate(seed, None, Tally::Buyers, &mut counts);
        CoOccurrenceCounts { counts, max: 0 }
    }

    /// Normalized score of one candidate against a user's purchases, with the
    /// normalizer taken over `candidates`.
    pub fn score(&self, candidate: ProductId, user_id: UserId, candidates: &[ProductId]) -> f64 {
        self.counts_for_user(user_id).normalize_over(candidates).score(candidate)
    }

    fn accumulate(
        &self,
        seed: ProductId,
        exclude_user: Option<UserId>,
        tally: Tally,
        counts: &mut HashMap<ProductId, u64>,
    ) {
        let Some(buyers) = self.history.purchasers(seed) else {
            return;
        };

        for buyer in buyers {
            if Some(*buyer) == exclude_user {
                continue;
            }
            for product in self.history.history(*buyer).unwrap_or_default() {
                if *product != seed {
                    let weight = match tally {
                        Tally::Items => self.history.purchase_count(*buyer, *product),
                        Tally::Buyers => 1,
                    };
                    *counts.entry(*product).or_insert(0) += weight;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Tally {
    Items,
    Buyers,
}
