//! Candidate selection, weighted blending and deterministic ordering.

use std::cmp::Ordering;

use tracing::debug;

use super::collaborative::CollaborativeScorer;
use super::strategy::{ScoringContext, ScoringStrategy};
use super::types::*;
use crate::domain::product::ProductId;
use crate::domain::user::UserId;
use crate::errors::{EngineError, EngineResult};
use crate::snapshot::Snapshot;

/// Ranks catalog products for a user against one snapshot.
#[derive(Debug, Clone, Copy)]
pub struct HybridRanker<'a> {
    snapshot: &'a Snapshot,
    default_weights: BlendWeights,
    cold_start: ColdStartPolicy,
}

impl<'a> HybridRanker<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self {
            snapshot,
            default_weights: BlendWeights::default(),
            cold_start: ColdStartPolicy::default(),
        }
    }

    /// Weights used when a request does not carry its own
    pub fn with_default_weights(mut self, weights: BlendWeights) -> Self {
        self.default_weights = weights;
        self
    }

    pub fn with_cold_start(mut self, policy: ColdStartPolicy) -> Self {
        self.cold_start = policy;
        self
    }

    /// Catalog products the user has not bought and the filter accepts, in
    /// ascending identifier order.
    pub fn candidates(&self, user_id: UserId, filter: &CandidateFilter) -> Vec<ProductId> {
        let history = self.snapshot.history();
        self.snapshot
            .catalog()
            .products()
            .filter(|product| !history.has_purchased(user_id, product.id))
            .filter(|product| filter.accepts(product))
            .map(|product| product.id)
            .collect()
    }

    pub fn recommend(&self, request: &RecommendRequest) -> EngineResult<RecommendationList> {
        if request.count == 0 {
            return Err(EngineError::invalid("count must be greater than zero"));
        }
        let weights = request.weights.unwrap_or(self.default_weights);
        weights.validate()?;
        request.filter.validate()?;
        self.snapshot.user(request.user_id)?;

        let candidates = self.candidates(request.user_id, &request.filter);
        let cold_start = self
            .snapshot
            .history()
            .history(request.user_id)
            .map_or(true, <[ProductId]>::is_empty);

        let (mode, blend) = if cold_start && self.cold_start == ColdStartPolicy::Popularity {
            (RankingMode::PopularityFallback, vec![(ScoringStrategy::Popularity, 1.0)])
        } else {
            (
                RankingMode::Hybrid,
                vec![
                    (ScoringStrategy::Collaborative, weights.collaborative),
                    (ScoringStrategy::Content, weights.content),
                ],
            )
        };

        let context = ScoringContext::for_user(self.snapshot, request.user_id, &candidates);
        let items = self.rank(&candidates, &blend, &context, request.count);

        debug!(
            event_name = "recommend.ranked",
            user_id = %request.user_id,
            mode = ?mode,
            cold_start,
            candidates = candidates.len(),
            returned = items.len(),
            "recommendations ranked"
        );

        Ok(RecommendationList {
            user_id: request.user_id,
            mode,
            weights,
            preferences: context.preferences(),
            items,
        })
    }

    /// Scores every candidate with each `(strategy, weight)` pair, sums the
    /// weighted scores and returns the best `count`, highest score first and
    /// ascending product id among equal scores.
    pub fn rank(
        &self,
        candidates: &[ProductId],
        blend: &[(ScoringStrategy, f64)],
        context: &ScoringContext<'_>,
        count: usize,
    ) -> Vec<Recommendation> {
        let catalog = self.snapshot.catalog();
        let mut ranked: Vec<Recommendation> = candidates
            .iter()
            .filter_map(|id| catalog.find(*id))
            .map(|product| {
                let mut components = ComponentScores::default();
                let mut score = 0.0;
                for (strategy, weight) in blend {
                    let value = strategy.score(product, context);
                    match strategy {
                        ScoringStrategy::Collaborative => components.collaborative = value,
                        ScoringStrategy::Content => components.content = value,
                        ScoringStrategy::Popularity => components.popularity = value,
                    }
                    score += weight * value;
                }
                Recommendation { product_id: product.id, score, components }
            })
            .collect();

        ranked.sort_by(compare_ranked);
        ranked.truncate(count);
        ranked
    }

    /// Products most often bought by buyers of `product_id`, excluding the
    /// product itself. Only products with at least one shared buyer appear.
    pub fn frequently_bought_together(
        &self,
        product_id: ProductId,
        limit: usize,
    ) -> EngineResult<Vec<RelatedProduct>> {
        if limit == 0 {
            return Err(EngineError::invalid("limit must be greater than zero"));
        }
        self.snapshot.catalog().get(product_id)?;

        let counts =
            CollaborativeScorer::new(self.snapshot.history()).counts_for_product(product_id);
        let entries = counts.nonzero();
        let best = entries.iter().map(|(_, shared)| *shared).max().unwrap_or(0);

        let mut related: Vec<RelatedProduct> = entries
            .into_iter()
            .map(|(id, shared_buyers)| RelatedProduct {
                product_id: id,
                shared_buyers,
                score: shared_buyers as f64 / best as f64,
            })
            .collect();
        related.sort_by(|a, b| {
            b.shared_buyers.cmp(&a.shared_buyers).then_with(|| a.product_id.cmp(&b.product_id))
        });
        related.truncate(limit);

        debug!(
            event_name = "recommend.bought_together",
            product_id = %product_id,
            returned = related.len(),
            "co-purchase neighbours ranked"
        );

        Ok(related)
    }
}

fn compare_ranked(a: &Recommendation, b: &Recommendation) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.product_id.cmp(&b.product_id))
}
