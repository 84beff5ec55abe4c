//! Immutable, validated view of the relational rows the engine reads, and the
//! handle that publishes it to concurrent readers.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::CatalogIndex;
use crate::domain::conversation::ConversationSession;
use crate::domain::inventory::{DistributionCenter, InventoryItem, InventoryItemId};
use crate::domain::order::{Order, OrderId, OrderItem};
use crate::domain::product::Product;
use crate::domain::user::{User, UserId};
use crate::errors::{EngineError, EngineResult, SnapshotIntegrityError};
use crate::history::PurchaseHistoryStore;

/// Raw rows as supplied by the data-access layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRows {
    pub users: Vec<User>,
    pub products: Vec<Product>,
    pub distribution_centers: Vec<DistributionCenter>,
    pub inventory_items: Vec<InventoryItem>,
    pub orders: Vec<Order>,
    pub order_items: Vec<OrderItem>,
    pub sessions: Vec<ConversationSession>,
}

/// Validated rows plus the derived catalog and purchase indices.
///
/// Everything is computed in [`Snapshot::build`]; nothing is mutated after
/// that, so a `Snapshot` can be shared freely across threads.
#[derive(Debug)]
pub struct Snapshot {
    catalog: CatalogIndex,
    history: PurchaseHistoryStore,
    users: BTreeMap<UserId, User>,
    orders: Vec<Order>,
    order_positions: HashMap<OrderId, usize>,
    order_items: Vec<OrderItem>,
    inventory_items: Vec<InventoryItem>,
    distribution_centers: Vec<DistributionCenter>,
    sessions: Vec<ConversationSession>,
}

impl Snapshot {
    pub fn build(rows: SnapshotRows) -> EngineResult<Self> {
        match Self::try_build(rows) {
            Ok(snapshot) => {
                info!(
                    event_name = "snapshot.build.completed",
                    users = snapshot.users.len(),
                    products = snapshot.catalog.len(),
                    orders = snapshot.orders.len(),
                    order_items = snapshot.order_items.len(),
                    sessions = snapshot.sessions.len(),
                    "snapshot built"
                );
                Ok(snapshot)
            }
            Err(error) => {
                warn!(
                    event_name = "snapshot.build.rejected",
                    reason = %error,
                    "snapshot rows failed integrity checks"
                );
                Err(error.into())
            }
        }
    }

    fn try_build(rows: SnapshotRows) -> Result<Self, SnapshotIntegrityError> {
        let SnapshotRows {
            users,
            products,
            distribution_centers,
            inventory_items,
            orders,
            order_items,
            mut sessions,
        } = rows;

        ensure_unique("user", users.iter().map(|user| user.id.0))?;
        ensure_unique("distribution center", distribution_centers.iter().map(|center| center.id.0))?;
        ensure_unique("inventory item", inventory_items.iter().map(|item| item.id.0))?;
        ensure_unique("order", orders.iter().map(|order| order.id.0))?;
        ensure_unique("order item", order_items.iter().map(|item| item.id.0))?;
        ensure_unique("session", sessions.iter().map(|session| session.id.0))?;
        ensure_unique(
            "message",
            sessions.iter().flat_map(|session| session.messages.iter().map(|message| message.id.0)),
        )?;

        let catalog = CatalogIndex::build(products)?;

        if !distribution_centers.is_empty() {
            let centers: HashSet<_> = distribution_centers.iter().map(|center| center.id).collect();
            for product in catalog.products() {
                if let Some(center) = product.distribution_center_id {
                    if !centers.contains(&center) {
                        return Err(SnapshotIntegrityError::DanglingReference {
                            entity: "product",
                            id: product.id.0,
                            target: "distribution center",
                            target_id: center.0,
                        });
                    }
                }
            }
        }

        for item in &inventory_items {
            if !catalog.contains(item.product_id) {
                return Err(SnapshotIntegrityError::DanglingReference {
                    entity: "inventory item",
                    id: item.id.0,
                    target: "product",
                    target_id: item.product_id.0,
                });
            }
        }

        let known_users: HashSet<UserId> = users.iter().map(|user| user.id).collect();
        for order in &orders {
            if !known_users.contains(&order.user_id) {
                return Err(SnapshotIntegrityError::DanglingReference {
                    entity: "order",
                    id: order.id.0,
                    target: "user",
                    target_id: order.user_id.0,
                });
            }
            if let Some(rule) = order.timeline_violation() {
                return Err(SnapshotIntegrityError::OrderTimeline { order_id: order.id.0, rule });
            }
        }

        let order_positions: HashMap<OrderId, usize> =
            orders.iter().enumerate().map(|(position, order)| (order.id, position)).collect();
        let inventory_by_id: HashMap<InventoryItemId, &InventoryItem> =
            inventory_items.iter().map(|item| (item.id, item)).collect();
        for item in &order_items {
            if !order_positions.contains_key(&item.order_id) {
                return Err(SnapshotIntegrityError::DanglingReference {
                    entity: "order item",
                    id: item.id.0,
                    target: "order",
                    target_id: item.order_id.0,
                });
            }
            if !catalog.contains(item.product_id) {
                return Err(SnapshotIntegrityError::DanglingReference {
                    entity: "order item",
                    id: item.id.0,
                    target: "product",
                    target_id: item.product_id.0,
                });
            }
            if let Some(inventory_id) = item.inventory_item_id {
                let Some(inventory) = inventory_by_id.get(&inventory_id) else {
                    return Err(SnapshotIntegrityError::DanglingReference {
                        entity: "order item",
                        id: item.id.0,
                        target: "inventory item",
                        target_id: inventory_id.0,
                    });
                };
                if inventory.product_id != item.product_id {
                    return Err(SnapshotIntegrityError::InventoryProductMismatch {
                        order_item_id: item.id.0,
                        inventory_item_id: inventory_id.0,
                        inventory_product_id: inventory.product_id.0,
                        product_id: item.product_id.0,
                    });
                }
            }
        }

        for session in &mut sessions {
            if !known_users.contains(&session.user_id) {
                return Err(SnapshotIntegrityError::DanglingReference {
                    entity: "session",
                    id: session.id.0,
                    target: "user",
                    target_id: session.user_id.0,
                });
            }
            if let Some(message) =
                session.messages.iter().find(|message| message.session_id != session.id)
            {
                return Err(SnapshotIntegrityError::MessageSessionMismatch {
                    message_id: message.id.0,
                    session_id: session.id.0,
                    claimed: message.session_id.0,
                });
            }
            session.messages.sort_by_key(|message| message.sequence_number);
            if let Some(sequence_number) = session.sequence_gap() {
                return Err(SnapshotIntegrityError::MessageSequence {
                    session_id: session.id.0,
                    sequence_number,
                });
            }
        }

        let history = PurchaseHistoryStore::build(&users, &orders, &order_items);

        Ok(Self {
            catalog,
            history,
            users: users.into_iter().map(|user| (user.id, user)).collect(),
            orders,
            order_positions,
            order_items,
            inventory_items,
            distribution_centers,
            sessions,
        })
    }

    pub fn catalog(&self) -> &CatalogIndex {
        &self.catalog
    }

    pub fn history(&self) -> &PurchaseHistoryStore {
        &self.history
    }

    pub fn user(&self, user_id: UserId) -> EngineResult<&User> {
        self.users.get(&user_id).ok_or_else(|| EngineError::not_found("user", user_id.0))
    }

    pub fn contains_user(&self, user_id: UserId) -> bool {
        self.users.contains_key(&user_id)
    }

    /// Users in ascending identifier order.
    pub fn users(&self) -> impl Iterator<Item = &User> + '_ {
        self.users.values()
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn order(&self, order_id: OrderId) -> Option<&Order> {
        self.order_positions.get(&order_id).map(|position| &self.orders[*position])
    }

    pub fn order_items(&self) -> &[OrderItem] {
        &self.order_items
    }

    pub fn inventory_items(&self) -> &[InventoryItem] {
        &self.inventory_items
    }

    pub fn distribution_centers(&self) -> &[DistributionCenter] {
        &self.distribution_centers
    }

    /// Sessions with their messages sorted by sequence number.
    pub fn sessions(&self) -> &[ConversationSession] {
        &self.sessions
    }
}

fn ensure_unique(
    entity: &'static str,
    ids: impl Iterator<Item = u64>,
) -> Result<(), SnapshotIntegrityError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(SnapshotIntegrityError::DuplicateId { entity, id });
        }
    }
    Ok(())
}

#[derive(Debug)]
struct Published {
    generation: u64,
    snapshot: Arc<Snapshot>,
}

/// Single publication point for the current snapshot.
///
/// Readers take an `Arc` and keep a consistent view for as long as they hold
/// it. A refresh builds the replacement without holding the lock and swaps it
/// in; the old snapshot is dropped once its last reader lets go.
#[derive(Debug)]
pub struct SnapshotHandle {
    current: RwLock<Published>,
}

impl SnapshotHandle {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { current: RwLock::new(Published { generation: 1, snapshot: Arc::new(snapshot) }) }
    }

    pub fn load(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read().snapshot)
    }

    pub fn generation(&self) -> u64 {
        self.current.read().generation
    }

    /// Swaps in an already built snapshot and returns its generation.
    pub fn publish(&self, snapshot: Snapshot) -> u64 {
        let snapshot = Arc::new(snapshot);
        let generation = {
            let mut current = self.current.write();
            current.generation += 1;
            current.snapshot = snapshot;
            current.generation
        };
        info!(event_name = "snapshot.published", generation, "snapshot published");
        generation
    }

    /// Builds a snapshot from fresh rows and publishes it. On failure the
    /// current snapshot stays in place.
    pub fn refresh(&self, rows: SnapshotRows) -> EngineResult<u64> {
        let snapshot = Snapshot::build(rows)?;
        Ok(self.publish(snapshot))
    }
}
