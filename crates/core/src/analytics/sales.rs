use std::collections::{BTreeSet, HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AnalyticsAggregator, TimeWindow};
use crate::domain::order::{Order, OrderItem};
use crate::domain::product::ProductId;
use crate::errors::{EngineError, EngineResult};

/// Revenue totals over a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub window: TimeWindow,
    /// Sum of sale prices of qualifying items
    pub revenue: Decimal,
    /// Distinct qualifying orders with at least one item
    pub order_count: u64,
    /// `revenue / order_count`, zero without orders
    pub avg_order_value: Decimal,
    pub unique_customers: u64,
    pub item_count: u64,
    /// Distinct categories among the products sold
    pub product_categories: u64,
}

/// One row of a top-products ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopProduct {
    pub product_id: ProductId,
    pub revenue: Decimal,
    pub units_sold: u64,
    pub avg_sale_price: Decimal,
}

impl<'a> AnalyticsAggregator<'a> {
    pub fn sales_summary(&self, window: &TimeWindow) -> EngineResult<SalesSummary> {
        window.validate()?;

        let mut revenue = Decimal::ZERO;
        let mut item_count = 0u64;
        let mut orders = HashSet::new();
        let mut customers = HashSet::new();
        let mut categories = BTreeSet::new();

        for (order, item) in self.qualifying_items(window) {
            revenue += item.sale_price;
            item_count += 1;
            orders.insert(order.id);
            customers.insert(order.user_id);
            if let Some(product) = self.snapshot.catalog().find(item.product_id) {
                categories.insert(product.category.as_str());
            }
        }

        let order_count = orders.len() as u64;
        let avg_order_value =
            if order_count == 0 { Decimal::ZERO } else { revenue / Decimal::from(order_count) };

        debug!(
            event_name = "analytics.sales_summary",
            revenue = %revenue,
            order_count,
            item_count,
            "sales summary computed"
        );

        Ok(SalesSummary {
            window: *window,
            revenue,
            order_count,
            avg_order_value,
            unique_customers: customers.len() as u64,
            item_count,
            product_categories: categories.len() as u64,
        })
    }

    /// Products ranked by revenue in the window, highest first, ascending id
    /// among equal revenue.
    pub fn top_products(&self, window: &TimeWindow, limit: usize) -> EngineResult<Vec<TopProduct>> {
        if limit == 0 {
            return Err(EngineError::invalid("limit must be greater than zero"));
        }
        window.validate()?;

        let mut totals: HashMap<ProductId, (Decimal, u64)> = HashMap::new();
        for (_, item) in self.qualifying_items(window) {
            let entry = totals.entry(item.product_id).or_insert((Decimal::ZERO, 0));
            entry.0 += item.sale_price;
            entry.1 += 1;
        }

        let mut rows: Vec<TopProduct> = totals
            .into_iter()
            .map(|(product_id, (revenue, units_sold))| TopProduct {
                product_id,
                revenue,
                units_sold,
                avg_sale_price: revenue / Decimal::from(units_sold),
            })
            .collect();
        rows.sort_by(|a, b| {
            b.revenue.cmp(&a.revenue).then_with(|| a.product_id.cmp(&b.product_id))
        });
        rows.truncate(limit);

        debug!(
            event_name = "analytics.top_products",
            limit,
            returned = rows.len(),
            "top products computed"
        );

        Ok(rows)
    }

    /// Items of orders created inside the window whose status still bears
    /// revenue.
    fn qualifying_items<'w>(
        &'w self,
        window: &'w TimeWindow,
    ) -> impl Iterator<Item = (&'a Order, &'a OrderItem)> + 'w {
        let snapshot = self.snapshot;
        snapshot.order_items().iter().filter_map(move |item| {
            let order = snapshot.order(item.order_id)?;
            (order.status.is_revenue_bearing() && window.contains(order.created_at))
                .then_some((order, item))
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal::Decimal;

    use crate::analytics::{AnalyticsAggregator, TimeWindow};
    use crate::domain::order::{Order, OrderId, OrderItem, OrderItemId, OrderStatus};
    use crate::domain::product::{Product, ProductId};
    use crate::domain::user::{User, UserId};
    use crate::errors::EngineError;
    use crate::snapshot::{Snapshot, SnapshotRows};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, d, 9, 0, 0).unwrap()
    }

    fn product(id: u64, category: &str) -> Product {
        Product {
            id: ProductId(id),
            name: format!("product-{id}"),
            sku: None,
            category: category.to_owned(),
            brand: None,
            department: None,
            cost: Decimal::new(500, 2),
            retail_price: Decimal::new(2000, 2),
            distribution_center_id: None,
        }
    }

    fn order(id: u64, user: u64, status: OrderStatus, created: u32) -> Order {
        Order {
            id: OrderId(id),
            user_id: UserId(user),
            status,
            created_at: Some(day(created)),
            shipped_at: None,
            delivered_at: None,
            returned_at: None,
        }
    }

    fn item(id: u64, order: u64, product: u64, cents: i64) -> OrderItem {
        OrderItem {
            id: OrderItemId(id),
            order_id: OrderId(order),
            product_id: ProductId(product),
            inventory_item_id: None,
            sale_price: Decimal::new(cents, 2),
            status: OrderStatus::Complete,
        }
    }

    fn snapshot() -> Snapshot {
        let rows = SnapshotRows {
            users: vec![User::new(UserId(1)), User::new(UserId(2))],
            products: vec![product(10, "Electronics"), product(20, "Books"), product(30, "Books")],
            orders: vec![
                order(1, 1, OrderStatus::Complete, 2),
                order(2, 2, OrderStatus::Shipped, 3),
                order(3, 1, OrderStatus::Cancelled, 4),
                order(4, 2, OrderStatus::Returned, 5),
                order(5, 2, OrderStatus::Complete, 20),
            ],
            order_items: vec![
                item(1, 1, 10, 5000),
                item(2, 1, 20, 1500),
                item(3, 2, 20, 1500),
                item(4, 2, 30, 6500),
                item(5, 3, 10, 9900),
                item(6, 4, 30, 4000),
                item(7, 5, 30, 1000),
            ],
            ..SnapshotRows::default()
        };
        Snapshot::build(rows).expect("snapshot builds")
    }

    #[test]
    fn summary_skips_cancelled_and_returned_orders() {
        let snapshot = snapshot();
        let summary = AnalyticsAggregator::new(&snapshot)
            .sales_summary(&TimeWindow::between(day(1), day(10)))
            .expect("summary");

        assert_eq!(summary.revenue, Decimal::new(14500, 2));
        assert_eq!(summary.order_count, 2);
        assert_eq!(summary.avg_order_value, Decimal::new(7250, 2));
        assert_eq!(summary.unique_customers, 2);
        assert_eq!(summary.item_count, 4);
        assert_eq!(summary.product_categories, 2);
    }

    #[test]
    fn empty_window_yields_zeroes() {
        let snapshot = snapshot();
        let summary = AnalyticsAggregator::new(&snapshot)
            .sales_summary(&TimeWindow::between(day(3), day(3)))
            .expect("summary");

        assert_eq!(summary.revenue, Decimal::ZERO);
        assert_eq!(summary.order_count, 0);
        assert_eq!(summary.avg_order_value, Decimal::ZERO);
    }

    #[test]
    fn reversed_window_is_invalid() {
        let snapshot = snapshot();
        let result =
            AnalyticsAggregator::new(&snapshot).sales_summary(&TimeWindow::between(day(9), day(2)));

        assert!(matches!(result, Err(EngineError::InvalidArgument(_))));
    }

    #[test]
    fn top_products_rank_by_revenue_then_id() {
        let snapshot = snapshot();
        let rows = AnalyticsAggregator::new(&snapshot)
            .top_products(&TimeWindow::all(), 10)
            .expect("top products");

        let ids: Vec<_> = rows.iter().map(|row| row.product_id).collect();
        assert_eq!(ids, vec![ProductId(30), ProductId(10), ProductId(20)]);
        assert_eq!(rows[0].revenue, Decimal::new(7500, 2));
        assert_eq!(rows[0].units_sold, 2);
        assert_eq!(rows[0].avg_sale_price, Decimal::new(3750, 2));
        assert_eq!(rows[2].revenue, Decimal::new(3000, 2));
    }

    #[test]
    fn window_and_limit_narrow_the_ranking() {
        let snapshot = snapshot();
        let rows = AnalyticsAggregator::new(&snapshot)
            .top_products(&TimeWindow::between(day(1), day(3)), 5)
            .expect("top products");

        // Only order 1 is inside: 10 → 50.00, 20 → 15.00.
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].product_id, ProductId(10));

        let rows = AnalyticsAggregator::new(&snapshot)
            .top_products(&TimeWindow::between(day(2), day(4)), 1)
            .expect("top products");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].product_id, ProductId(30));
    }

    #[test]
    fn zero_limit_is_invalid() {
        let snapshot = snapshot();
        let result = AnalyticsAggregator::new(&snapshot).top_products(&TimeWindow::all(), 0);

        assert!(matches!(result, Err(EngineError::InvalidArgument(_))));
    }
}
