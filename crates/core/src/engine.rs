//! Entry points for the API layer. Each call receives the snapshot it reads
//! from; the engine itself only holds configuration.

use tracing::warn;

use crate::analytics::{AnalyticsAggregator, SalesSummary, SessionStats, TimeWindow, TopProduct};
use crate::config::EngineConfig;
use crate::domain::product::ProductId;
use crate::domain::user::UserId;
use crate::errors::{EngineError, EngineResult};
use crate::recommend::{
    BlendWeights, HybridRanker, RecommendRequest, RecommendationList, RelatedProduct,
};
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Default)]
pub struct StorefrontEngine {
    config: EngineConfig,
}

impl StorefrontEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ranked `(product_id, score)` pairs for a user. `count` and `weights`
    /// fall back to the configured defaults.
    pub fn recommend(
        &self,
        snapshot: &Snapshot,
        user_id: UserId,
        count: Option<usize>,
        weights: Option<BlendWeights>,
    ) -> EngineResult<Vec<(ProductId, f64)>> {
        let mut request = RecommendRequest::new(user_id)
            .with_count(count.unwrap_or(self.config.recommendation.default_count));
        request.weights = weights;
        Ok(self.recommend_request(snapshot, &request)?.pairs())
    }

    /// Full recommendation answer including component scores and filters.
    pub fn recommend_request(
        &self,
        snapshot: &Snapshot,
        request: &RecommendRequest,
    ) -> EngineResult<RecommendationList> {
        let result = check_limit("count", request.count, self.config.recommendation.max_count)
            .and_then(|()| self.ranker(snapshot).recommend(request));
        observe("recommend", result)
    }

    pub fn frequently_bought_together(
        &self,
        snapshot: &Snapshot,
        product_id: ProductId,
        limit: Option<usize>,
    ) -> EngineResult<Vec<RelatedProduct>> {
        let limit = limit.unwrap_or(self.config.recommendation.default_count);
        let result = check_limit("limit", limit, self.config.recommendation.max_count)
            .and_then(|()| self.ranker(snapshot).frequently_bought_together(product_id, limit));
        observe("frequently_bought_together", result)
    }

    pub fn sales_summary(
        &self,
        snapshot: &Snapshot,
        window: &TimeWindow,
    ) -> EngineResult<SalesSummary> {
        observe("sales_summary", AnalyticsAggregator::new(snapshot).sales_summary(window))
    }

    pub fn top_products(
        &self,
        snapshot: &Snapshot,
        window: &TimeWindow,
        limit: Option<usize>,
    ) -> EngineResult<Vec<TopProduct>> {
        let analytics = &self.config.analytics;
        let limit = limit.unwrap_or(analytics.default_top_products_limit);
        let result = check_limit("limit", limit, analytics.max_top_products_limit)
            .and_then(|()| AnalyticsAggregator::new(snapshot).top_products(window, limit));
        observe("top_products", result)
    }

    pub fn session_stats(
        &self,
        snapshot: &Snapshot,
        user_id: Option<UserId>,
        window: &TimeWindow,
    ) -> EngineResult<SessionStats> {
        observe("session_stats", AnalyticsAggregator::new(snapshot).session_stats(user_id, window))
    }

    fn ranker<'a>(&self, snapshot: &'a Snapshot) -> HybridRanker<'a> {
        HybridRanker::new(snapshot)
            .with_default_weights(self.config.recommendation.weights())
            .with_cold_start(self.config.recommendation.cold_start)
    }
}

fn check_limit(name: &str, value: usize, max: usize) -> EngineResult<()> {
    if value > max {
        return Err(EngineError::invalid(format!("{name} must not exceed {max}, got {value}")));
    }
    Ok(())
}

fn observe<T>(operation: &'static str, result: EngineResult<T>) -> EngineResult<T> {
    if let Err(error) = &result {
        warn!(
            event_name = "engine.request.rejected",
            operation,
            error = %error,
            "engine request rejected"
        );
    }
    result
}
