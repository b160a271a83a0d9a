//! Landing page served alongside the webhook.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use orderbot_core::errors::{ApplicationError, InterfaceError};
use tera::{Context, Tera};
use tracing::{error, warn};
use uuid::Uuid;

pub const HOME_TEMPLATE: &str = "home.html";

/// Loads `*.html` from `templates_dir`; the bundled home page covers a missing or broken
/// directory.
pub fn init_templates(templates_dir: &str) -> Arc<Tera> {
    let glob = format!("{}/**/*.html", templates_dir.trim_end_matches('/'));
    let mut tera = match Tera::new(&glob) {
        Ok(tera) => tera,
        Err(error) => {
            warn!(
                event_name = "server.templates.load_failed",
                templates_dir,
                error = %error,
                "falling back to bundled templates"
            );
            Tera::default()
        }
    };

    if !tera.get_template_names().any(|name| name == HOME_TEMPLATE) {
        if let Err(error) = tera.add_raw_template(
            HOME_TEMPLATE,
            include_str!("../../../frontend/templates/home.html"),
        ) {
            warn!(
                event_name = "server.templates.bundled_invalid",
                error = %error,
                "bundled home template did not parse"
            );
        }
    }

    Arc::new(tera)
}

pub async fn home_page(State(templates): State<Arc<Tera>>) -> Response {
    let mut context = Context::new();
    context.insert("title", "Pandeyji's Eatery");

    match templates.render(HOME_TEMPLATE, &context) {
        Ok(body) => Html(body).into_response(),
        Err(render_error) => {
            let correlation_id = Uuid::new_v4().to_string();
            error!(
                event_name = "server.home.render_failed",
                correlation_id = %correlation_id,
                error = %render_error,
                "home page render failed"
            );
            let interface = ApplicationError::Configuration(format!(
                "template `{HOME_TEMPLATE}` failed to render"
            ))
            .into_interface(correlation_id);
            (StatusCode::INTERNAL_SERVER_ERROR, interface_body(&interface)).into_response()
        }
    }
}

fn interface_body(error: &InterfaceError) -> String {
    format!("{} (ref {})", error.user_message(), error.correlation_id())
}
