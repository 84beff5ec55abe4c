//! Hybrid product recommendations.
//!
//! Blends a collaborative co-occurrence signal (what other buyers of the
//! user's products also bought) with a content signal (how well a candidate
//! matches the user's dominant category, brand and department).

mod collaborative;
mod content;
mod ranker;
mod strategy;
mod types;

pub use collaborative::{CoOccurrenceCounts, CollaborativeScorer};
pub use content::{ContentScorer, UserProfile};
pub use ranker::HybridRanker;
pub use strategy::{ScoringContext, ScoringStrategy};
pub use types::*;

/// Default blend: collaborative signal weighted above content.
pub const DEFAULT_WEIGHTS: BlendWeights = BlendWeights { collaborative: 0.6, content: 0.4 };

/// Tolerance for the weights-sum-to-one check.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Number of recommendations returned when the caller does not ask for a count.
pub const DEFAULT_RECOMMENDATION_COUNT: usize = 5;
