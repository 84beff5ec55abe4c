//! The closed set of scoring signals the ranker can blend.

use serde::{Deserialize, Serialize};

use super::collaborative::{CoOccurrenceCounts, CollaborativeScorer};
use super::content::{ContentScorer, UserProfile};
use super::types::{PreferredValue, UserPreferences};
use crate::domain::product::{Product, ProductAttribute, ProductId};
use crate::domain::user::UserId;
use crate::history::PurchaseHistoryStore;
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStrategy {
    /// Co-purchase overlap with other users, min-max normalized
    Collaborative,
    /// Match against the user's dominant category, brand and department
    Content,
    /// Distinct purchaser count, min-max normalized; ignores the user
    Popularity,
}

impl ScoringStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collaborative => "collaborative",
            Self::Content => "content",
            Self::Popularity => "popularity",
        }
    }

    /// Score in [0, 1] for `candidate` under this strategy.
    pub fn score(&self, candidate: &Product, context: &ScoringContext<'_>) -> f64 {
        match self {
            Self::Collaborative => context.co_occurrence.score(candidate.id),
            Self::Content => ContentScorer::new().score(candidate, &context.profile),
            Self::Popularity => {
                if context.popularity_max == 0 {
                    0.0
                } else {
                    let buyers = context.history.purchaser_count(candidate.id);
                    (buyers as f64 / context.popularity_max as f64).min(1.0)
                }
            }
        }
    }
}

/// Per-request state shared by all strategies: the user's attribute profile
/// and the normalizers fixed over the candidate set.
#[derive(Debug, Clone)]
pub struct ScoringContext<'a> {
    history: &'a PurchaseHistoryStore,
    user_id: UserId,
    profile: UserProfile,
    co_occurrence: CoOccurrenceCounts,
    popularity_max: usize,
}

impl<'a> ScoringContext<'a> {
    pub fn for_user(snapshot: &'a Snapshot, user_id: UserId, candidates: &[ProductId]) -> Self {
        let history = snapshot.history();

        Self {
            history,
            user_id,
            profile: UserProfile::from_purchases(snapshot.catalog(), &history.purchases(user_id)),
            co_occurrence: CollaborativeScorer::new(history)
                .counts_for_user(user_id)
                .normalize_over(candidates),
            popularity_max: candidates
                .iter()
                .map(|id| history.purchaser_count(*id))
                .max()
                .unwrap_or(0),
        }
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn co_occurrence(&self) -> &CoOccurrenceCounts {
        &self.co_occurrence
    }

    /// What the user buys most, as reported alongside recommendations.
    pub fn preferences(&self) -> UserPreferences {
        let preferred = |attribute: ProductAttribute| {
            self.profile
                .preferred(attribute)
                .map(|(value, weight)| PreferredValue { value: value.to_owned(), weight })
        };

        UserPreferences {
            purchases: self.profile.purchases(),
            category: preferred(ProductAttribute::Category),
            brand: preferred(ProductAttribute::Brand),
            department: preferred(ProductAttribute::Department),
            avg_sale_price: self.history.average_spend(self.user_id),
        }
    }
}
