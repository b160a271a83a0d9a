//! Order lifecycle handlers behind the fulfillment webhook.

use std::sync::Arc;

use orderbot_core::domain::session::SessionId;
use orderbot_core::intent::{Intent, IntentCall, IntentParameters, WebhookResponse};
use orderbot_core::replies;
use orderbot_core::sessions::SessionStore;
use orderbot_db::OrderRepository;
use tracing::{error, info, warn};

pub struct OrderAssistant {
    sessions: SessionStore,
    orders: Arc<dyn OrderRepository>,
}

impl OrderAssistant {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { sessions: SessionStore::new(), orders }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn fulfill(&self, call: IntentCall) -> WebhookResponse {
        let Some(intent) = call.intent else {
            info!(
                event_name = "assistant.intent.unrecognized",
                session_id = %call.session_id,
                intent = %call.intent_name,
                "intent not recognized"
            );
            return WebhookResponse::text(replies::INTENT_NOT_RECOGNIZED);
        };

        info!(
            event_name = "assistant.intent.dispatched",
            session_id = %call.session_id,
            intent = %intent,
            "dispatching intent"
        );

        let text = match intent {
            Intent::AddToOrder => self.add_to_order(&call.parameters, &call.session_id).await,
            Intent::RemoveFromOrder => {
                self.remove_from_order(&call.parameters, &call.session_id).await
            }
            Intent::CompleteOrder => self.complete_order(&call.session_id).await,
            Intent::TrackOrder => self.track_order(&call.parameters).await,
        };
        WebhookResponse::text(text)
    }

    pub async fn add_to_order(
        &self,
        parameters: &IntentParameters,
        session_id: &SessionId,
    ) -> String {
        let food_items = parameters.food_items();
        let quantities = parameters.quantities();
        if food_items.len() != quantities.len() {
            return replies::CLARIFY_ITEMS_AND_QUANTITIES.to_string();
        }
        let (Some(food_items), Some(quantities)) = (
            food_items.into_iter().collect::<Option<Vec<String>>>(),
            quantities.into_iter().collect::<Option<Vec<i32>>>(),
        ) else {
            return replies::CLARIFY_ITEMS_AND_QUANTITIES.to_string();
        };

        let _lock = self.sessions.lock(session_id).await;
        let mut order = self.sessions.get(session_id).unwrap_or_default();
        if let Err(error) = order.merge(food_items.into_iter().zip(quantities)) {
            warn!(
                event_name = "assistant.order.add_rejected",
                session_id = %session_id,
                error = %error,
                "rejected items for in-progress order"
            );
            return replies::CLARIFY_ITEMS_AND_QUANTITIES.to_string();
        }

        let text = replies::order_so_far(&order);
        self.sessions.set(session_id, order);
        text
    }

    pub async fn remove_from_order(
        &self,
        parameters: &IntentParameters,
        session_id: &SessionId,
    ) -> String {
        let _lock = self.sessions.lock(session_id).await;
        let Some(mut order) = self.sessions.get(session_id) else {
            return replies::ORDER_NOT_FOUND_IN_SESSION.to_string();
        };

        let mut removed = Vec::new();
        let mut missing = Vec::new();
        for food_item in parameters.food_items().into_iter().flatten() {
            if order.remove(&food_item) {
                removed.push(food_item);
            } else {
                missing.push(food_item);
            }
        }

        let text = replies::removal_summary(&removed, &missing, &order);
        self.sessions.set(session_id, order);
        text
    }

    /// The session's in-progress order is dropped whatever the outcome.
    pub async fn complete_order(&self, session_id: &SessionId) -> String {
        let _lock = self.sessions.lock(session_id).await;
        let order = match self.sessions.delete(session_id) {
            Some(order) if !order.is_empty() => order,
            _ => return replies::ORDER_NOT_FOUND_IN_SESSION.to_string(),
        };

        let order_id = match self.orders.place_order(&order).await {
            Ok(order_id) => order_id,
            Err(error) => {
                error!(
                    event_name = "assistant.order.placement_failed",
                    session_id = %session_id,
                    item_count = order.len(),
                    error = %error,
                    "could not persist completed order"
                );
                return replies::ORDER_BACKEND_ERROR.to_string();
            }
        };

        let total = self.orders.total_order_price(order_id).await.unwrap_or_else(|error| {
            warn!(
                event_name = "assistant.order.total_unavailable",
                order_id = order_id.0,
                error = %error,
                "order placed but total could not be fetched"
            );
            None
        });

        info!(
            event_name = "assistant.order.completed",
            session_id = %session_id,
            order_id = order_id.0,
            summary = %order.summary(),
            "order placed"
        );
        replies::order_placed(order_id, total)
    }

    pub async fn track_order(&self, parameters: &IntentParameters) -> String {
        let order_id = match parameters.order_id() {
            Ok(order_id) => order_id,
            Err(requested) => return replies::no_order_found(requested),
        };
        match self.orders.order_status(order_id).await {
            Ok(Some(status)) => replies::order_status(order_id, &status),
            Ok(None) => replies::no_order_found(order_id),
            Err(error) => {
                error!(
                    event_name = "assistant.order.status_lookup_failed",
                    order_id = order_id.0,
                    error = %error,
                    "could not look up order status"
                );
                replies::status_lookup_failed(order_id)
            }
        }
    }
}
