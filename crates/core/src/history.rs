//! Per-user purchase histories and the reverse product → purchasers index.

use std::collections::{BTreeSet, HashMap, HashSet};

use rust_decimal::Decimal;

use crate::domain::order::{Order, OrderId, OrderItem};
use crate::domain::product::ProductId;
use crate::domain::user::{User, UserId};

/// Derived purchase indices. Every known user has an entry, possibly empty.
#[derive(Clone, Debug, Default)]
pub struct PurchaseHistoryStore {
    histories: HashMap<UserId, Vec<ProductId>>,
    owned: HashMap<UserId, HashSet<ProductId>>,
    /// Qualifying order items per (user, product), repeats included.
    quantities: HashMap<UserId, HashMap<ProductId, u64>>,
    spend: HashMap<UserId, Decimal>,
    purchasers: HashMap<ProductId, BTreeSet<UserId>>,
}

impl PurchaseHistoryStore {
    /// Builds the indices from rows whose references were already validated.
    ///
    /// Items of cancelled orders are ignored. The rest are ordered by order
    /// creation time (orders without a timestamp first), then by order item
    /// id, and each product keeps the position of its first purchase. Repeat
    /// purchases are still counted in [`Self::purchase_count`].
    pub fn build(users: &[User], orders: &[Order], items: &[OrderItem]) -> Self {
        let orders_by_id: HashMap<OrderId, &Order> =
            orders.iter().map(|order| (order.id, order)).collect();

        let mut qualifying: Vec<(&Order, &OrderItem)> = items
            .iter()
            .filter_map(|item| orders_by_id.get(&item.order_id).map(|order| (*order, item)))
            .filter(|(order, _)| order.status.counts_as_purchase())
            .collect();
        qualifying.sort_by(|(left_order, left_item), (right_order, right_item)| {
            left_order
                .created_at
                .cmp(&right_order.created_at)
                .then_with(|| left_item.id.cmp(&right_item.id))
        });

        let mut store = Self {
            histories: users.iter().map(|user| (user.id, Vec::new())).collect(),
            owned: users.iter().map(|user| (user.id, HashSet::new())).collect(),
            quantities: users.iter().map(|user| (user.id, HashMap::new())).collect(),
            spend: HashMap::new(),
            purchasers: HashMap::new(),
        };

        for (order, item) in qualifying {
            *store
                .quantities
                .entry(order.user_id)
                .or_default()
                .entry(item.product_id)
                .or_insert(0) += 1;
            *store.spend.entry(order.user_id).or_insert(Decimal::ZERO) += item.sale_price;

            let owned = store.owned.entry(order.user_id).or_default();
            if owned.insert(item.product_id) {
                store.histories.entry(order.user_id).or_default().push(item.product_id);
                store.purchasers.entry(item.product_id).or_default().insert(order.user_id);
            }
        }

        store
    }

    /// Ordered, deduplicated purchases. `None` only for users the snapshot
    /// does not know; a user without purchases gets an empty slice.
    pub fn history(&self, user_id: UserId) -> Option<&[ProductId]> {
        self.histories.get(&user_id).map(Vec::as_slice)
    }

    pub fn has_purchased(&self, user_id: UserId, product_id: ProductId) -> bool {
        self.owned.get(&user_id).is_some_and(|owned| owned.contains(&product_id))
    }

    /// Number of qualifying order items of `product_id` the user bought.
    pub fn purchase_count(&self, user_id: UserId, product_id: ProductId) -> u64 {
        self.quantities
            .get(&user_id)
            .and_then(|quantities| quantities.get(&product_id))
            .copied()
            .unwrap_or(0)
    }

    /// `(product, item count)` in history order; empty for unknown users.
    pub fn purchases(&self, user_id: UserId) -> Vec<(ProductId, u64)> {
        self.history(user_id)
            .unwrap_or_default()
            .iter()
            .map(|product_id| (*product_id, self.purchase_count(user_id, *product_id)))
            .collect()
    }

    /// Mean sale price over the user's qualifying items, `None` without any.
    pub fn average_spend(&self, user_id: UserId) -> Option<Decimal> {
        let items: u64 = self.quantities.get(&user_id)?.values().sum();
        let spend = self.spend.get(&user_id)?;
        (items > 0).then(|| *spend / Decimal::from(items))
    }

    pub fn owned(&self, user_id: UserId) -> Option<&HashSet<ProductId>> {
        self.owned.get(&user_id)
    }

    pub fn purchasers(&self, product_id: ProductId) -> Option<&BTreeSet<UserId>> {
        self.purchasers.get(&product_id)
    }

    /// Number of distinct users who bought the product.
    pub fn purchaser_count(&self, product_id: ProductId) -> usize {
        self.purchasers.get(&product_id).map_or(0, BTreeSet::len)
    }

    pub fn user_count(&self) -> usize {
        self.histories.len()
    }
}
