use rust_decimal::Decimal;
use sqlx::PgExecutor;
use tracing::{error, info};

use orderbot_core::domain::order::{OrderId, OrderStatus, SessionOrder};

use super::{OrderRepository, RepositoryError};
use crate::DbPool;

/// SQLSTATE raised by `insert_order_item` for names that are not on the menu.
const UNKNOWN_FOOD_ITEM_SQLSTATE: &str = "P0002";

pub struct PgOrderRepository {
    pool: DbPool,
}

impl PgOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

async fn call_insert_order_item<'e>(
    executor: impl PgExecutor<'e>,
    food_item: &str,
    quantity: i32,
    order_id: OrderId,
) -> Result<(), RepositoryError> {
    sqlx::query("CALL insert_order_item($1, $2, $3)")
        .bind(food_item)
        .bind(quantity)
        .bind(order_id.0)
        .execute(executor)
        .await
        .map_err(|error| {
            let unknown_item = matches!(
                &error,
                sqlx::Error::Database(database_error)
                    if database_error.code().as_deref() == Some(UNKNOWN_FOOD_ITEM_SQLSTATE)
            );
            if unknown_item {
                RepositoryError::UnknownFoodItem(food_item.to_string())
            } else {
                RepositoryError::Database(error)
            }
        })?;
    Ok(())
}

async fn insert_tracking_row<'e>(
    executor: impl PgExecutor<'e>,
    order_id: OrderId,
    status: &OrderStatus,
) -> Result<(), RepositoryError> {
    sqlx::query("INSERT INTO order_tracking (order_id, status) VALUES ($1, $2)")
        .bind(order_id.0)
        .bind(status.as_str())
        .execute(executor)
        .await?;
    Ok(())
}

async fn select_next_order_id<'e>(
    executor: impl PgExecutor<'e>,
) -> Result<OrderId, RepositoryError> {
    let current_max: Option<i32> =
        sqlx::query_scalar("SELECT MAX(order_id) FROM orders").fetch_one(executor).await?;
    OrderId::after(current_max.map(OrderId)).ok_or(RepositoryError::OrderIdsExhausted)
}

fn logged<T>(
    operation: &'static str,
    order_id: Option<OrderId>,
    result: Result<T, RepositoryError>,
) -> Result<T, RepositoryError> {
    if let Err(error) = &result {
        error!(
            event_name = "db.order.operation_failed",
            operation,
            order_id = order_id.map(|id| id.0),
            connectivity = error.is_connectivity(),
            error = %error,
            "order repository operation failed"
        );
    }
    result
}

#[async_trait::async_trait]
impl OrderRepository for PgOrderRepository {
    async fn insert_order_item(
        &self,
        food_item: &str,
        quantity: i32,
        order_id: OrderId,
    ) -> Result<(), RepositoryError> {
        let result: Result<(), RepositoryError> = async {
            let mut tx = self.pool.begin().await?;
            call_insert_order_item(&mut *tx, food_item, quantity, order_id).await?;
            tx.commit().await?;
            Ok(())
        }
        .await;
        logged("insert_order_item", Some(order_id), result)
    }

    async fn insert_order_tracking(
        &self,
        order_id: OrderId,
        status: &OrderStatus,
    ) -> Result<(), RepositoryError> {
        let result: Result<(), RepositoryError> = async {
            let mut tx = self.pool.begin().await?;
            insert_tracking_row(&mut *tx, order_id, status).await?;
            tx.commit().await?;
            Ok(())
        }
        .await;
        logged("insert_order_tracking", Some(order_id), result)
    }

    async fn total_order_price(
        &self,
        order_id: OrderId,
    ) -> Result<Option<Decimal>, RepositoryError> {
        let result = sqlx::query_scalar::<_, Option<Decimal>>("SELECT get_total_order_price($1)")
            .bind(order_id.0)
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from);
        logged("total_order_price", Some(order_id), result)
    }

    async fn next_order_id(&self) -> Result<OrderId, RepositoryError> {
        logged("next_order_id", None, select_next_order_id(&self.pool).await)
    }

    async fn order_status(
        &self,
        order_id: OrderId,
    ) -> Result<Option<OrderStatus>, RepositoryError> {
        let result = sqlx::query_scalar::<_, String>(
            "SELECT status FROM order_tracking WHERE order_id = $1",
        )
        .bind(order_id.0)
        .fetch_optional(&self.pool)
        .await
        .map(|status| status.map(OrderStatus))
        .map_err(RepositoryError::from);
        logged("order_status", Some(order_id), result)
    }

    async fn place_order(&self, order: &SessionOrder) -> Result<OrderId, RepositoryError> {
        if order.is_empty() {
            return logged("place_order", None, Err(RepositoryError::EmptyOrder));
        }

        let result: Result<OrderId, RepositoryError> = async {
            let mut tx = self.pool.begin().await?;
            // Serializes id allocation between concurrent checkouts; readers are not blocked.
            sqlx::query("LOCK TABLE orders IN EXCLUSIVE MODE").execute(&mut *tx).await?;
            let order_id = select_next_order_id(&mut *tx).await?;
            for line in order.lines() {
                call_insert_order_item(&mut *tx, &line.food_item, line.quantity, order_id).await?;
            }
            insert_tracking_row(&mut *tx, order_id, &OrderStatus::in_progress()).await?;
            tx.commit().await?;
            Ok(order_id)
        }
        .await;

        if let Ok(order_id) = &result {
            info!(
                event_name = "db.order.placed",
                order_id = order_id.0,
                item_count = order.len(),
                "order persisted with tracking row"
            );
        }
        logged("place_order", None, result)
    }
}
