pub mod config;
pub mod domain;
pub mod errors;
pub mod intent;
pub mod replies;
pub mod sessions;

pub use domain::order::{OrderId, OrderLine, OrderStatus, SessionOrder};
pub use domain::session::SessionId;
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use intent::{Intent, IntentCall, IntentParameters, WebhookRequest, WebhookResponse};
pub use sessions::{SessionLock, SessionStore};
