use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use orderbot_core::domain::order::{OrderId, OrderStatus, SessionOrder};

pub mod memory;
pub mod order;

pub use memory::InMemoryOrderRepository;
pub use order::PgOrderRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("food item `{0}` is not on the menu")]
    UnknownFoodItem(String),
    #[error("order has no items")]
    EmptyOrder,
    #[error("order ids are exhausted")]
    OrderIdsExhausted,
}

impl RepositoryError {
    /// The pool could not hand out a working connection, as opposed to a statement failing.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::Database(
                sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::WorkerCrashed
            )
        )
    }
}

/// One persisted line of a placed order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderItemRow {
    pub order_id: OrderId,
    pub food_item: String,
    pub quantity: i32,
    pub total_price: Decimal,
}

/// Access to placed orders. Each call runs on its own pooled connection and either commits
/// or rolls back before returning.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert_order_item(
        &self,
        food_item: &str,
        quantity: i32,
        order_id: OrderId,
    ) -> Result<(), RepositoryError>;

    async fn insert_order_tracking(
        &self,
        order_id: OrderId,
        status: &OrderStatus,
    ) -> Result<(), RepositoryError>;

    /// `None` when the order has no item rows.
    async fn total_order_price(&self, order_id: OrderId)
        -> Result<Option<Decimal>, RepositoryError>;

    async fn next_order_id(&self) -> Result<OrderId, RepositoryError>;

    /// `Ok(None)` means no tracking row exists for the id.
    async fn order_status(&self, order_id: OrderId)
        -> Result<Option<OrderStatus>, RepositoryError>;

    /// Allocates the next id and writes every item plus an `in progress` tracking row as one
    /// unit: on any failure nothing of the order is kept.
    async fn place_order(&self, order: &SessionOrder) -> Result<OrderId, RepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::RepositoryError;

    #[test]
    fn pool_failures_count_as_connectivity() {
        assert!(RepositoryError::Database(sqlx::Error::PoolTimedOut).is_connectivity());
        assert!(RepositoryError::Database(sqlx::Error::PoolClosed).is_connectivity());
        assert!(!RepositoryError::Database(sqlx::Error::RowNotFound).is_connectivity());
        assert!(!RepositoryError::UnknownFoodItem("Sushi".to_string()).is_connectivity());
    }
}
