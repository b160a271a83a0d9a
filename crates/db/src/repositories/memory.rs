use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use rust_decimal::Decimal;
use tokio::sync::RwLock;

use orderbot_core::domain::order::{OrderId, OrderStatus, SessionOrder};

use super::{OrderItemRow, OrderRepository, RepositoryError};

/// Menu seeded by the schema migration, with prices in cents.
pub const DEFAULT_MENU: &[(&str, i64)] = &[
    ("Pav Bhaji", 600),
    ("Chole Bhature", 700),
    ("Pizza", 800),
    ("Mango Lassi", 500),
    ("Masala Dosa", 600),
    ("Vegetable Biryani", 900),
    ("Vada Pav", 400),
    ("Rava Dosa", 700),
    ("Samosa", 500),
];

#[derive(Default)]
struct Tables {
    items: Vec<OrderItemRow>,
    tracking: BTreeMap<OrderId, OrderStatus>,
}

/// Process-local stand-in for the order tables, priced from a fixed menu.
pub struct InMemoryOrderRepository {
    menu: HashMap<String, Decimal>,
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl Default for InMemoryOrderRepository {
    fn default() -> Self {
        Self::with_menu(
            DEFAULT_MENU.iter().map(|(name, cents)| (name.to_string(), Decimal::new(*cents, 2))),
        )
    }
}

impl InMemoryOrderRepository {
    pub fn with_menu(menu: impl IntoIterator<Item = (String, Decimal)>) -> Self {
        Self {
            menu: menu.into_iter().collect(),
            tables: RwLock::new(Tables::default()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// While set, every operation fails the way a closed pool does.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn item_rows(&self) -> Vec<OrderItemRow> {
        self.tables.read().await.items.clone()
    }

    pub async fn tracking_rows(&self) -> Vec<(OrderId, OrderStatus)> {
        let tables = self.tables.read().await;
        tables.tracking.iter().map(|(id, status)| (*id, status.clone())).collect()
    }

    fn ensure_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }

    fn price_row(
        &self,
        food_item: &str,
        quantity: i32,
        order_id: OrderId,
    ) -> Result<OrderItemRow, RepositoryError> {
        let unit_price = self
            .menu
            .get(food_item)
            .ok_or_else(|| RepositoryError::UnknownFoodItem(food_item.to_string()))?;
        Ok(OrderItemRow {
            order_id,
            food_item: food_item.to_string(),
            quantity,
            total_price: *unit_price * Decimal::from(quantity),
        })
    }
}

fn next_id(tables: &Tables) -> Result<OrderId, RepositoryError> {
    OrderId::after(tables.items.iter().map(|row| row.order_id).max())
        .ok_or(RepositoryError::OrderIdsExhausted)
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert_order_item(
        &self,
        food_item: &str,
        quantity: i32,
        order_id: OrderId,
    ) -> Result<(), RepositoryError> {
        self.ensure_available()?;
        let row = self.price_row(food_item, quantity, order_id)?;
        self.tables.write().await.items.push(row);
        Ok(())
    }

    async fn insert_order_tracking(
        &self,
        order_id: OrderId,
        status: &OrderStatus,
    ) -> Result<(), RepositoryError> {
        self.ensure_available()?;
        self.tables.write().await.tracking.insert(order_id, status.clone());
        Ok(())
    }

    async fn total_order_price(
        &self,
        order_id: OrderId,
    ) -> Result<Option<Decimal>, RepositoryError> {
        self.ensure_available()?;
        let tables = self.tables.read().await;
        let mut rows = tables.items.iter().filter(|row| row.order_id == order_id).peekable();
        if rows.peek().is_none() {
            return Ok(None);
        }
        Ok(Some(rows.map(|row| row.total_price).sum()))
    }

    async fn next_order_id(&self) -> Result<OrderId, RepositoryError> {
        self.ensure_available()?;
        next_id(&*self.tables.read().await)
    }

    async fn order_status(
        &self,
        order_id: OrderId,
    ) -> Result<Option<OrderStatus>, RepositoryError> {
        self.ensure_available()?;
        Ok(self.tables.read().await.tracking.get(&order_id).cloned())
    }

    async fn place_order(&self, order: &SessionOrder) -> Result<OrderId, RepositoryError> {
        self.ensure_available()?;
        if order.is_empty() {
            return Err(RepositoryError::EmptyOrder);
        }

        let mut tables = self.tables.write().await;
        let order_id = next_id(&tables)?;
        let rows = order
            .lines()
            .iter()
            .map(|line| self.price_row(&line.food_item, line.quantity, order_id))
            .collect::<Result<Vec<_>, _>>()?;

        tables.items.extend(rows);
        tables.tracking.insert(order_id, OrderStatus::in_progress());
        Ok(order_id)
    }
}
