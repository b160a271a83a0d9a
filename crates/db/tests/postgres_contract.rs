//! Runs against a disposable PostgreSQL database named by `ORDERBOT_TEST_DATABASE_URL`.
//! Every test returns early when the variable is unset.

use std::sync::OnceLock;

use orderbot_core::domain::order::{OrderId, OrderStatus, SessionOrder};
use orderbot_db::{
    connect_with_settings, migrations, DbPool, OrderRepository, PgOrderRepository, RepositoryError,
};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, MutexGuard};

static DATABASE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

struct Harness {
    repo: PgOrderRepository,
    _guard: MutexGuard<'static, ()>,
}

impl Harness {
    fn pool(&self) -> &DbPool {
        self.repo.pool()
    }

    async fn tracking_row_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM order_tracking")
            .fetch_one(self.pool())
            .await
            .expect("count tracking rows")
    }

    async fn item_row_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(self.pool())
            .await
            .expect("count item rows")
    }
}

async fn harness() -> Option<Harness> {
    let url = std::env::var("ORDERBOT_TEST_DATABASE_URL").ok().filter(|url| !url.is_empty())?;
    let guard = DATABASE_LOCK.get_or_init(|| Mutex::new(())).lock().await;

    let pool = connect_with_settings(&url, 2, 10).await.expect("connect to test database");
    migrations::run_pending(&pool).await.expect("run migrations");
    sqlx::query("TRUNCATE order_tracking, orders").execute(&pool).await.expect("reset tables");

    Some(Harness { repo: PgOrderRepository::new(pool), _guard: guard })
}

#[tokio::test]
async fn next_order_id_is_one_on_empty_table_then_max_plus_one() {
    let Some(harness) = harness().await else {
        return;
    };

    assert_eq!(harness.repo.next_order_id().await.expect("next id"), OrderId(1));

    harness.repo.insert_order_item("Pizza", 2, OrderId(40)).await.expect("insert item");
    assert_eq!(harness.repo.next_order_id().await.expect("next id"), OrderId(41));
}

#[tokio::test]
async fn stored_routines_price_items_and_report_status() {
    let Some(harness) = harness().await else {
        return;
    };
    let order_id = OrderId(7);

    harness.repo.insert_order_item("Pizza", 2, order_id).await.expect("insert pizza");
    harness.repo.insert_order_item("Samosa", 1, order_id).await.expect("insert samosa");
    harness
        .repo
        .insert_order_tracking(order_id, &OrderStatus::in_progress())
        .await
        .expect("insert tracking");

    assert_eq!(
        harness.repo.total_order_price(order_id).await.expect("total"),
        Some(Decimal::new(2100, 2))
    );
    assert_eq!(
        harness.repo.order_status(order_id).await.expect("status"),
        Some(OrderStatus::in_progress())
    );
    assert_eq!(harness.repo.order_status(OrderId(8)).await.expect("status"), None);
    assert_eq!(harness.repo.total_order_price(OrderId(8)).await.expect("total"), None);
}

#[tokio::test]
async fn unknown_menu_item_is_reported_by_name() {
    let Some(harness) = harness().await else {
        return;
    };

    let error = harness
        .repo
        .insert_order_item("Sushi", 1, OrderId(1))
        .await
        .expect_err("sushi is not on the menu");

    assert!(matches!(error, RepositoryError::UnknownFoodItem(ref item) if item == "Sushi"));
    assert_eq!(harness.item_row_count().await, 0);
}

#[tokio::test]
async fn place_order_is_all_or_nothing() {
    let Some(harness) = harness().await else {
        return;
    };

    let failing =
        SessionOrder::from_pairs([("Pizza", 1), ("Sushi", 2), ("Samosa", 3)]).expect("order");
    let error = harness.repo.place_order(&failing).await.expect_err("second item fails");
    assert!(matches!(error, RepositoryError::UnknownFoodItem(_)));
    assert_eq!(harness.item_row_count().await, 0, "no orphan item rows");
    assert_eq!(harness.tracking_row_count().await, 0, "no tracking row");

    let order = SessionOrder::from_pairs([("Pav Bhaji", 2), ("Mango Lassi", 1)]).expect("order");
    let order_id = harness.repo.place_order(&order).await.expect("place order");

    assert_eq!(order_id, OrderId(1));
    assert_eq!(harness.item_row_count().await, 2);
    assert_eq!(
        harness.repo.order_status(order_id).await.expect("status"),
        Some(OrderStatus::in_progress())
    );
    assert_eq!(
        harness.repo.total_order_price(order_id).await.expect("total"),
        Some(Decimal::new(1700, 2))
    );
}

#[tokio::test]
async fn closed_pool_surfaces_connectivity_error() {
    let Some(harness) = harness().await else {
        return;
    };
    harness.pool().close().await;

    let error = harness.repo.order_status(OrderId(1)).await.expect_err("pool is closed");
    assert!(error.is_connectivity());
}
