//! Fulfillment texts sent back to the conversational front end.

use std::fmt;

use rust_decimal::Decimal;

use crate::domain::order::{OrderId, OrderStatus, SessionOrder};

pub const INTENT_NOT_RECOGNIZED: &str = "Intent not recognized";

pub const CLARIFY_ITEMS_AND_QUANTITIES: &str =
    "Sorry I didn't understand. Can you please specify food items and quantities clearly?";

pub const ORDER_NOT_FOUND_IN_SESSION: &str =
    "I'm having trouble finding your order. Sorry! Can you place a new order please?";

pub const ORDER_BACKEND_ERROR: &str =
    "Sorry, I couldn't process your order due to a backend error. Please place a new order again";

pub fn order_so_far(order: &SessionOrder) -> String {
    format!("So far you have: {}. Do you need anything else?", order.summary())
}

pub fn removal_summary(removed: &[String], missing: &[String], remaining: &SessionOrder) -> String {
    let mut text = String::new();
    if !removed.is_empty() {
        text.push_str(&format!("Removed {} from your order!", removed.join(",")));
    }
    if !missing.is_empty() {
        text.push_str(&format!(" Your current order does not have {}", missing.join(",")));
    }
    if remaining.is_empty() {
        text.push_str(" Your order is empty!");
    } else {
        text.push_str(&format!(" Here is what is left in your order: {}", remaining.summary()));
    }
    text
}

pub fn order_placed(order_id: OrderId, total: Option<Decimal>) -> String {
    match total {
        Some(total) => format!(
            "Awesome. We have placed your order. Here is your order id # {order_id}. \
             Your order total is {total} which you can pay at the time of delivery!"
        ),
        None => format!(
            "Awesome. We have placed your order. Here is your order id # {order_id}. \
             Your order total will be shared at the time of delivery!"
        ),
    }
}

pub fn order_status(order_id: OrderId, status: &OrderStatus) -> String {
    format!("The order status for order id: {order_id} is: {status}")
}

pub fn no_order_found(order_id: impl fmt::Display) -> String {
    format!("No order found with order id: {order_id}")
}

pub fn status_lookup_failed(order_id: OrderId) -> String {
    format!(
        "Sorry, I couldn't look up order id: {order_id} due to a backend error. \
         Please try again later"
    )
}
