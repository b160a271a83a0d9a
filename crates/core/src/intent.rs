//! Webhook contract of the conversational front end and the closed set of intents it can
//! route to.
//!
//! Inbound payload (only the fields read here):
//!
//! ```json
//! {
//!   "queryResult": {
//!     "intent": { "displayName": "order.add - context: ongoing-order" },
//!     "parameters": { "food-item": ["Pizza"], "number": [2] },
//!     "outputContexts": [{ "name": "projects/p/agent/sessions/<id>/contexts/ongoing-order" }]
//!   }
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::order::OrderId;
use crate::domain::session::SessionId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Intent {
    AddToOrder,
    RemoveFromOrder,
    CompleteOrder,
    TrackOrder,
}

impl Intent {
    pub const ALL: [Intent; 4] =
        [Intent::AddToOrder, Intent::RemoveFromOrder, Intent::CompleteOrder, Intent::TrackOrder];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::AddToOrder => "order.add - context: ongoing-order",
            Self::RemoveFromOrder => "order.remove - context: ongoing-order",
            Self::CompleteOrder => "order.complete - context: ongoing-order",
            Self::TrackOrder => "track.order - context: ongoing-tracking",
        }
    }

    pub fn from_display_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|intent| intent.display_name() == name)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    pub query_result: QueryResult,
    #[serde(default)]
    pub output_contexts: Vec<OutputContext>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default)]
    pub intent: IntentRef,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub output_contexts: Vec<OutputContext>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRef {
    #[serde(default)]
    pub display_name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct OutputContext {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookResponse {
    #[serde(rename = "fulfillmentText")]
    pub fulfillment_text: String,
}

impl WebhookResponse {
    pub fn text(fulfillment_text: impl Into<String>) -> Self {
        Self { fulfillment_text: fulfillment_text.into() }
    }
}

/// A parsed webhook call: which intent fired, for which session, with what parameters.
#[derive(Clone, Debug)]
pub struct IntentCall {
    pub intent_name: String,
    pub intent: Option<Intent>,
    pub session_id: SessionId,
    pub parameters: IntentParameters,
}

impl WebhookRequest {
    /// Session id comes from the first output context; contexts nested under `queryResult`
    /// take precedence over top-level ones.
    pub fn into_call(self) -> Result<IntentCall, DomainError> {
        let QueryResult { intent, parameters, output_contexts } = self.query_result;
        let first_context = output_contexts
            .into_iter()
            .next()
            .or_else(|| self.output_contexts.into_iter().next())
            .ok_or_else(|| {
                DomainError::MalformedPayload("payload carries no output context".to_string())
            })?;

        Ok(IntentCall {
            intent: Intent::from_display_name(&intent.display_name),
            intent_name: intent.display_name,
            session_id: SessionId::from_context_name(&first_context.name),
            parameters: IntentParameters(parameters),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct IntentParameters(pub Map<String, Value>);

impl IntentParameters {
    pub const FOOD_ITEM: &'static str = "food-item";
    pub const NUMBER: &'static str = "number";
    pub const ORDER_ID: &'static str = "order_id";

    /// Food item names, one slot per entry sent; a lone value counts as a one-element list.
    /// Entries that are not text are `None` so they still count against the quantities.
    pub fn food_items(&self) -> Vec<Option<String>> {
        match self.0.get(Self::FOOD_ITEM) {
            Some(Value::Array(values)) => values.iter().map(value_as_text).collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(value) => vec![value_as_text(value)],
        }
    }

    /// Quantities in request order. Fractional values truncate; entries that are not finite
    /// numbers are reported as `None` so the caller can ask the user to clarify.
    pub fn quantities(&self) -> Vec<Option<i32>> {
        match self.0.get(Self::NUMBER) {
            Some(Value::Array(values)) => values.iter().map(value_as_quantity).collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(value) => vec![value_as_quantity(value)],
        }
    }

    /// Order id to track, defaulting to 0 when absent or unparseable. A number too large
    /// for any stored id comes back as `Err` with the id as the user gave it.
    pub fn order_id(&self) -> Result<OrderId, String> {
        match self.0.get(Self::ORDER_ID).and_then(value_as_number) {
            Some(number) => truncate_to_i32(number).map(OrderId).ok_or_else(|| number.to_string()),
            None => Ok(OrderId(0)),
        }
    }
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn value_as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number.trunc())
}

fn truncate_to_i32(number: f64) -> Option<i32> {
    (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(&number).then(|| number as i32)
}

fn value_as_quantity(value: &Value) -> Option<i32> {
    value_as_number(value).and_then(truncate_to_i32)
}
