pub mod analytics;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod history;
pub mod recommend;
pub mod snapshot;
pub mod telemetry;

pub use analytics::{AnalyticsAggregator, SalesSummary, SessionStats, TimeWindow, TopProduct};
pub use catalog::CatalogIndex;
pub use config::{ConfigError, ConfigOverrides, EngineConfig, LoadOptions, LogFormat};
pub use domain::conversation::{
    AiMetadata, ConversationSession, Message, MessageId, MessageRole, SessionId, SessionStatus,
};
pub use domain::inventory::{
    DistributionCenter, DistributionCenterId, InventoryItem, InventoryItemId,
};
pub use domain::order::{Order, OrderId, OrderItem, OrderItemId, OrderStatus};
pub use domain::product::{Product, ProductAttribute, ProductId};
pub use domain::user::{Geography, User, UserId};
pub use engine::StorefrontEngine;
pub use errors::{EngineError, EngineResult, InterfaceError, SnapshotIntegrityError};
pub use history::PurchaseHistoryStore;
pub use recommend::{
    BlendWeights, CandidateFilter, ColdStartPolicy, ComponentScores, HybridRanker, PreferredValue,
    RankingMode, RecommendRequest, Recommendation, RecommendationList, RelatedProduct,
    ScoringStrategy, UserPreferences,
};
pub use snapshot::{Snapshot, SnapshotHandle, SnapshotRows};
