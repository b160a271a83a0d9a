use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub i32);

impl OrderId {
    pub const FIRST: OrderId = OrderId(1);

    /// Id allocated after the current maximum, or the first id when no order exists yet.
    /// `None` once the maximum is the largest representable id.
    pub fn after(current_max: Option<OrderId>) -> Option<OrderId> {
        match current_max {
            Some(OrderId(id)) => id.checked_add(1).map(OrderId),
            None => Some(Self::FIRST),
        }
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tracking status of a placed order. Stored as free text, so unknown values round-trip.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderStatus(pub String);

impl OrderStatus {
    pub const IN_PROGRESS: &'static str = "in progress";
    pub const IN_TRANSIT: &'static str = "in transit";
    pub const DELIVERED: &'static str = "delivered";

    pub fn in_progress() -> Self {
        Self(Self::IN_PROGRESS.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub food_item: String,
    pub quantity: i32,
}

/// Food items and quantities collected for one conversation before checkout.
///
/// Lines keep the position of the first time an item was added; adding an item
/// again replaces its quantity in place.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOrder {
    lines: Vec<OrderLine>,
}

impl SessionOrder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = (S, i32)>,
        S: Into<String>,
    {
        let mut order = Self::new();
        order.merge(pairs)?;
        Ok(order)
    }

    /// Last write wins per item; quantities are never summed.
    pub fn merge<I, S>(&mut self, pairs: I) -> Result<(), DomainError>
    where
        I: IntoIterator<Item = (S, i32)>,
        S: Into<String>,
    {
        let pairs: Vec<(String, i32)> =
            pairs.into_iter().map(|(item, quantity)| (item.into(), quantity)).collect();
        if let Some((item, quantity)) = pairs.iter().find(|(_, quantity)| *quantity < 0) {
            return Err(DomainError::InvariantViolation(format!(
                "quantity for `{item}` must not be negative (got {quantity})"
            )));
        }

        for (food_item, quantity) in pairs {
            match self.lines.iter_mut().find(|line| line.food_item == food_item) {
                Some(line) => line.quantity = quantity,
                None => self.lines.push(OrderLine { food_item, quantity }),
            }
        }
        Ok(())
    }

    /// Returns `true` when the item was present.
    pub fn remove(&mut self, food_item: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.food_item != food_item);
        self.lines.len() != before
    }

    pub fn contains(&self, food_item: &str) -> bool {
        self.lines.iter().any(|line| line.food_item == food_item)
    }

    pub fn quantity_of(&self, food_item: &str) -> Option<i32> {
        self.lines.iter().find(|line| line.food_item == food_item).map(|line| line.quantity)
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// `"2 Pizza, 1 Coke"`
    pub fn summary(&self) -> String {
        self.lines
            .iter()
            .map(|line| format!("{} {}", line.quantity, line.food_item))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::{OrderId, OrderStatus, SessionOrder};

    #[test]
    fn repeated_items_overwrite_instead_of_summing() {
        let mut order = SessionOrder::from_pairs([("Pizza", 2)]).expect("first add");
        order.merge([("Pizza", 3), ("Coke", 1)]).expect("second add");

        assert_eq!(order.quantity_of("Pizza"), Some(3));
        assert_eq!(order.quantity_of("Coke"), Some(1));
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn overwrite_keeps_original_position() {
        let mut order =
            SessionOrder::from_pairs([("Samosa", 1), ("Pav Bhaji", 2)]).expect("seed order");
        order.merge([("Samosa", 4)]).expect("overwrite");

        assert_eq!(order.summary(), "4 Samosa, 2 Pav Bhaji");
    }

    #[test]
    fn negative_quantity_is_rejected_without_mutation() {
        let mut order = SessionOrder::from_pairs([("Pizza", 2)]).expect("seed order");
        let error = order.merge([("Coke", 1), ("Pizza", -1)]).expect_err("negative quantity");

        assert!(error.to_string().contains("Pizza"));
        assert_eq!(order.summary(), "2 Pizza");
    }

    #[test]
    fn remove_reports_presence() {
        let mut order = SessionOrder::from_pairs([("Pizza", 2), ("Coke", 1)]).expect("seed");

        assert!(order.remove("Pizza"));
        assert!(!order.remove("Lassi"));
        assert_eq!(order.summary(), "1 Coke");
        assert!(!order.is_empty());
    }

    #[test]
    fn next_order_id_starts_at_one() {
        assert_eq!(OrderId::after(None), Some(OrderId(1)));
        assert_eq!(OrderId::after(Some(OrderId(41))), Some(OrderId(42)));
    }

    #[test]
    fn next_order_id_stops_at_the_largest_id() {
        assert_eq!(OrderId::after(Some(OrderId(i32::MAX - 1))), Some(OrderId(i32::MAX)));
        assert_eq!(OrderId::after(Some(OrderId(i32::MAX))), None);
    }

    #[test]
    fn status_displays_raw_text() {
        assert_eq!(OrderStatus::in_progress().to_string(), "in progress");
        assert_eq!(OrderStatus("delivered".to_string()).as_str(), OrderStatus::DELIVERED);
    }
}
