//! Windowed sales and conversation analytics over a snapshot.
//!
//! Every query is a pure function of the snapshot and its arguments; nothing
//! is cached between calls.

mod sales;
mod sessions;
mod window;

pub use sales::{SalesSummary, TopProduct};
pub use sessions::SessionStats;
pub use window::TimeWindow;

use crate::snapshot::Snapshot;

/// Default number of rows returned by top-products queries.
pub const DEFAULT_TOP_PRODUCTS_LIMIT: usize = 10;

/// Read-only aggregation over one snapshot.
#[derive(Debug, Clone, Copy)]
pub struct AnalyticsAggregator<'a> {
    snapshot: &'a Snapshot,
}

impl<'a> AnalyticsAggregator<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self { snapshot }
    }
}
