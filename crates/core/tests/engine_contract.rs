use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use storefront_core::{
    AiMetadata, BlendWeights, ColdStartPolicy, ConversationSession, EngineConfig, EngineError,
    InterfaceError, Message, MessageId, MessageRole, Order, OrderId, OrderItem, OrderItemId,
    OrderStatus, Product, ProductId, RecommendRequest, SessionId, SessionStatus, Snapshot,
    SnapshotHandle, SnapshotRows, StorefrontEngine, TimeWindow, User, UserId,
};

fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, day, 12, 0, 0).unwrap()
}

fn product(id: u64, name: &str, category: &str, brand: &str, price_cents: i64) -> Product {
    Product {
        id: ProductId(id),
        name: name.to_owned(),
        sku: Some(format!("SKU-{id}")),
        category: category.to_owned(),
        brand: Some(brand.to_owned()),
        department: Some("Retail".to_owned()),
        cost: Decimal::new(price_cents / 2, 2),
        retail_price: Decimal::new(price_cents, 2),
        distribution_center_id: None,
    }
}

fn order(id: u64, user: u64, status: OrderStatus, day: u32) -> Order {
    Order {
        id: OrderId(id),
        user_id: UserId(user),
        status,
        created_at: Some(at(day)),
        shipped_at: None,
        delivered_at: None,
        returned_at: None,
    }
}

fn item(id: u64, order: u64, product: u64, price_cents: i64) -> OrderItem {
    OrderItem {
        id: OrderItemId(id),
        order_id: OrderId(order),
        product_id: ProductId(product),
        inventory_item_id: None,
        sale_price: Decimal::new(price_cents, 2),
        status: OrderStatus::Complete,
    }
}

fn session(id: u64, user: u64, latencies: &[Option<u64>]) -> ConversationSession {
    let created_at = at(3);
    ConversationSession {
        id: SessionId(id),
        user_id: UserId(user),
        status: SessionStatus::Completed,
        created_at,
        messages: latencies
            .iter()
            .zip(1u32..)
            .map(|(latency, sequence_number)| Message {
                id: MessageId(id * 10 + u64::from(sequence_number)),
                session_id: SessionId(id),
                sequence_number,
                role: if latency.is_some() { MessageRole::Assistant } else { MessageRole::User },
                timestamp: created_at + Duration::seconds(i64::from(sequence_number)),
                ai_metadata: latency.map(|ms| AiMetadata {
                    model_version: "gpt-4".to_owned(),
                    response_latency_ms: ms,
                    confidence_score: None,
                    tokens_used: None,
                }),
            })
            .collect(),
    }
}

/// U1 bought P100 and P200, U2 bought P100 and P300, U3 has a cancelled
/// order only, U4 has never ordered.
fn rows() -> SnapshotRows {
    SnapshotRows {
        users: (1..=4).map(|id| User::new(UserId(id))).collect(),
        products: vec![
            product(100, "Wireless Headphones", "Electronics", "TechBrand", 9999),
            product(200, "Phone Case", "Electronics", "TechBrand", 1999),
            product(300, "Running Shoes", "Sports", "FitLife", 7999),
            product(400, "Yoga Mat", "Sports", "FitLife", 2999),
            product(500, "Smart Watch", "Electronics", "TechBrand", 19999),
            product(600, "Cookbook", "Books", "Inkwell", 2499),
        ],
        orders: vec![
            order(1, 1, OrderStatus::Complete, 1),
            order(2, 2, OrderStatus::Shipped, 2),
            order(3, 3, OrderStatus::Cancelled, 2),
        ],
        order_items: vec![
            item(1, 1, 100, 9999),
            item(2, 1, 200, 1999),
            item(3, 2, 100, 9999),
            item(4, 2, 300, 7999),
            item(5, 3, 500, 19999),
        ],
        sessions: vec![
            session(1, 1, &[None, Some(120), Some(180)]),
            session(2, 1, &[Some(100), Some(200), Some(300), Some(400), Some(500)]),
        ],
        ..SnapshotRows::default()
    }
}

fn snapshot() -> Snapshot {
    Snapshot::build(rows()).expect("fixture snapshot builds")
}

#[test]
fn pure_collaborative_recommends_the_co_purchase_first() {
    let snapshot = snapshot();
    let engine = StorefrontEngine::default();
    let weights = BlendWeights::new(1.0, 0.0).expect("valid weights");

    let pairs =
        engine.recommend(&snapshot, UserId(1), Some(3), Some(weights)).expect("recommendations");

    assert_eq!(pairs[0], (ProductId(300), 1.0));
    assert!(pairs.iter().all(|(id, _)| *id != ProductId(100) && *id != ProductId(200)));
}

#[test]
fn user_without_orders_gets_identifier_order() {
    let snapshot = snapshot();
    let engine = StorefrontEngine::default();

    let pairs = engine.recommend(&snapshot, UserId(4), Some(5), None).expect("recommendations");

    let ids: Vec<_> = pairs.iter().map(|(id, _)| *id).collect();
    assert_eq!(
        ids,
        vec![ProductId(100), ProductId(200), ProductId(300), ProductId(400), ProductId(500)]
    );
}

#[test]
fn cancelled_orders_do_not_count_as_purchases() {
    let snapshot = snapshot();
    let engine = StorefrontEngine::default();

    let pairs = engine.recommend(&snapshot, UserId(3), Some(10), None).expect("recommendations");

    assert!(pairs.iter().any(|(id, _)| *id == ProductId(500)));
    assert_eq!(pairs.len(), 6);
}

#[test]
fn popularity_cold_start_is_configurable() {
    let snapshot = snapshot();
    let mut config = EngineConfig::default();
    config.recommendation.cold_start = ColdStartPolicy::Popularity;
    let engine = StorefrontEngine::new(config);

    let list = engine
        .recommend_request(&snapshot, &RecommendRequest::new(UserId(4)).with_count(2))
        .expect("recommendations");

    assert_eq!(list.product_ids(), vec![ProductId(100), ProductId(200)]);
}

#[test]
fn unknown_user_maps_to_not_found_interface_error() {
    let snapshot = snapshot();
    let engine = StorefrontEngine::default();

    let error = engine
        .recommend(&snapshot, UserId(42), None, None)
        .expect_err("unknown user")
        .into_interface("req-7");

    assert!(matches!(error, InterfaceError::NotFound { .. }));
    assert_eq!(error.correlation_id(), "req-7");
}

#[test]
fn sales_summary_ignores_cancelled_orders() {
    let snapshot = snapshot();
    let engine = StorefrontEngine::default();

    let summary = engine.sales_summary(&snapshot, &TimeWindow::all()).expect("summary");

    assert_eq!(summary.revenue, Decimal::new(29996, 2));
    assert_eq!(summary.order_count, 2);
    assert_eq!(summary.avg_order_value, Decimal::new(14998, 2));
    assert_eq!(summary.unique_customers, 2);
    assert_eq!(summary.product_categories, 2);

    let empty_window = TimeWindow::between(at(1), at(1));
    let empty = engine.sales_summary(&snapshot, &empty_window).expect("empty window");
    assert_eq!((empty.revenue, empty.order_count), (Decimal::ZERO, 0));
}

#[test]
fn top_products_are_deterministic() {
    let snapshot = snapshot();
    let engine = StorefrontEngine::default();

    let first = engine.top_products(&snapshot, &TimeWindow::all(), Some(3)).expect("rows");
    let second = engine.top_products(&snapshot, &TimeWindow::all(), Some(3)).expect("rows");

    let ids: Vec<_> = first.iter().map(|row| row.product_id).collect();
    assert_eq!(ids, vec![ProductId(100), ProductId(300), ProductId(200)]);
    assert_eq!(first[0].units_sold, 2);
    assert_eq!(first, second);
}

#[test]
fn session_stats_average_over_metadata_bearing_messages() {
    let snapshot = snapshot();
    let engine = StorefrontEngine::default();

    let stats =
        engine.session_stats(&snapshot, Some(UserId(1)), &TimeWindow::all()).expect("stats");

    assert_eq!(stats.counts_by_status[&SessionStatus::Completed], 2);
    assert_eq!(stats.avg_messages_per_session, 4.0);
    assert_eq!(stats.avg_response_latency_ms, Some(1800.0 / 7.0));
    assert_eq!(stats.avg_confidence, None);
    assert_eq!(stats.total_tokens_used, 0);
    assert_eq!(stats.avg_session_duration_secs, Some(3.0));
}

#[test]
fn reversed_window_is_rejected_before_computation() {
    let snapshot = snapshot();
    let engine = StorefrontEngine::default();

    let result = engine.sales_summary(&snapshot, &TimeWindow::between(at(5), at(1)));

    assert!(matches!(result, Err(EngineError::InvalidArgument(_))));
}

#[test]
fn results_serialize_for_the_api_layer() {
    let snapshot = snapshot();
    let engine = StorefrontEngine::default();
    let list = engine
        .recommend_request(&snapshot, &RecommendRequest::new(UserId(1)).with_count(1))
        .expect("recommendations");
    let stats = engine.session_stats(&snapshot, None, &TimeWindow::all()).expect("stats");

    let list_json = serde_json::to_value(&list).expect("list serializes");
    let stats_json = serde_json::to_value(&stats).expect("stats serialize");

    assert_eq!(list_json["mode"], "hybrid");
    assert_eq!(list_json["items"][0]["product_id"], 300);
    assert_eq!(list_json["preferences"]["category"]["value"], "Electronics");
    assert_eq!(list_json["preferences"]["brand"]["weight"], 1.0);
    assert_eq!(list_json["preferences"]["avg_sale_price"], "59.99");
    assert_eq!(stats_json["counts_by_status"]["completed"], 2);
}

#[test]
fn readers_keep_their_snapshot_across_refresh() {
    let handle = Arc::new(SnapshotHandle::new(snapshot()));
    let before = handle.load();

    let mut next = rows();
    next.orders.push(order(4, 4, OrderStatus::Complete, 4));
    next.order_items.push(item(6, 4, 600, 2499));
    let generation = handle.refresh(next).expect("refresh succeeds");

    let engine = StorefrontEngine::default();
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let handle = Arc::clone(&handle);
            let engine = engine.clone();
            thread::spawn(move || {
                let snapshot = handle.load();
                let summary = engine.sales_summary(&snapshot, &TimeWindow::all());
                summary.map(|summary| summary.order_count)
            })
        })
        .collect();

    for reader in readers {
        assert_eq!(reader.join().expect("reader thread").expect("summary"), 3);
    }
    assert_eq!(generation, 2);
    let stale = engine.sales_summary(&before, &TimeWindow::all()).expect("summary");
    assert_eq!(stale.order_count, 2);
}
