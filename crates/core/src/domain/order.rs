use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::inventory::InventoryItemId;
use crate::domain::product::ProductId;
use crate::domain::user::UserId;
use crate::errors::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderItemId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for OrderItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Complete,
    Cancelled,
    Returned,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Complete => "complete",
            Self::Cancelled => "cancelled",
            Self::Returned => "returned",
        }
    }

    /// Whether items of an order in this status belong to a purchase history.
    pub fn counts_as_purchase(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }

    /// Whether an order in this status contributes to sales figures.
    pub fn is_revenue_bearing(&self) -> bool {
        !matches!(self, Self::Cancelled | Self::Returned)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "complete" | "completed" => Ok(Self::Complete),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            "returned" => Ok(Self::Returned),
            other => Err(EngineError::InvalidArgument(format!(
                "unsupported order status `{other}` \
                 (expected pending|processing|shipped|complete|cancelled|returned)"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Checks created <= shipped <= delivered and returned >= created for the
    /// timestamps that are present. Returns the first violated rule.
    pub fn timeline_violation(&self) -> Option<&'static str> {
        let ordered = [
            ("created_at", self.created_at),
            ("shipped_at", self.shipped_at),
            ("delivered_at", self.delivered_at),
        ];
        let mut previous: Option<DateTime<Utc>> = None;
        for (_, stamp) in ordered {
            if let Some(stamp) = stamp {
                if previous.is_some_and(|earlier| stamp < earlier) {
                    return Some("created_at <= shipped_at <= delivered_at");
                }
                previous = Some(stamp);
            }
        }

        match (self.created_at, self.returned_at) {
            (Some(created), Some(returned)) if returned < created => {
                Some("returned_at >= created_at")
            }
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub inventory_item_id: Option<InventoryItemId>,
    pub sale_price: Decimal,
    pub status: OrderStatus,
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{Order, OrderId, OrderStatus};
    use crate::domain::user::UserId;

    fn order() -> Order {
        Order {
            id: OrderId(1),
            user_id: UserId(1),
            status: OrderStatus::Complete,
            created_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()),
            shipped_at: Some(Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap()),
            delivered_at: Some(Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()),
            returned_at: None,
        }
    }

    #[test]
    fn monotonic_timeline_has_no_violation() {
        assert_eq!(order().timeline_violation(), None);
    }

    #[test]
    fn delivery_before_shipment_is_reported() {
        let mut order = order();
        order.delivered_at = Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());

        assert_eq!(order.timeline_violation(), Some("created_at <= shipped_at <= delivered_at"));
    }

    #[test]
    fn gaps_in_the_timeline_are_skipped() {
        let mut order = order();
        order.shipped_at = None;

        assert_eq!(order.timeline_violation(), None);
    }

    #[test]
    fn return_before_creation_is_reported() {
        let mut order = order();
        order.returned_at = Some(Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap());

        assert_eq!(order.timeline_violation(), Some("returned_at >= created_at"));
    }

    #[test]
    fn status_parsing_accepts_source_spellings() {
        assert_eq!("Complete".parse::<OrderStatus>().ok(), Some(OrderStatus::Complete));
        assert_eq!("canceled".parse::<OrderStatus>().ok(), Some(OrderStatus::Cancelled));
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn cancelled_and_returned_orders_do_not_bear_revenue() {
        assert!(!OrderStatus::Cancelled.counts_as_purchase());
        assert!(OrderStatus::Returned.counts_as_purchase());
        assert!(!OrderStatus::Returned.is_revenue_bearing());
        assert!(OrderStatus::Shipped.is_revenue_bearing());
    }
}
