pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_lazy, connect_with_settings, DbPool};
pub use repositories::{
    InMemoryOrderRepository, OrderItemRow, OrderRepository, PgOrderRepository, RepositoryError,
};
