use std::sync::Arc;

use axum::{
    body::Body,
    http::HeaderName,
    middleware::{self, Next},
    routing::{get, post},
    Router,
};
use interaction_hub_registry::RegistryError;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::platform::{CommandPublisher, ResponderFactory};
use crate::router::{DispatchRegistryBuilder, InteractionRouter};

mod handlers;
mod types;

pub use handlers::{
    accept_interaction, get_tenant_config, health_check, publish_commands, refresh_tenants,
    reload_commands,
};
pub use types::{AcceptedResponse, ErrorResponse, PublishResponse, ReloadResponse};

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
pub const ADMIN_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-admin-token");

/// Registration pass run on every administrative reload.
pub type Registrar = fn(&mut DispatchRegistryBuilder) -> Result<(), RegistryError>;

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<InteractionRouter>,
    pub responders: Arc<dyn ResponderFactory>,
    pub publisher: Option<Arc<dyn CommandPublisher>>,
    pub registrar: Registrar,
    /// Administrative routes answer 404 while this is unset.
    pub admin_token: Option<String>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/interactions", post(accept_interaction))
        .route("/health", get(health_check))
        .route("/v1/tenants/:tenant_id/config", get(get_tenant_config))
        .route("/v1/admin/commands/publish", post(publish_commands))
        .route("/v1/admin/commands/reload", post(reload_commands))
        .route("/v1/admin/tenants/refresh", post(refresh_tenants))
        .with_state(state)
        .layer(middleware::from_fn(set_request_id))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn set_request_id(
    mut request: axum::http::Request<Body>,
    next: Next,
) -> axum::response::Response {
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    request.extensions_mut().insert(request_id.clone());

    if let Ok(header_value) = axum::http::HeaderValue::from_str(&request_id) {
        request
            .headers_mut()
            .insert(REQUEST_ID_HEADER.clone(), header_value);
    }

    let mut response = next.run(request).await;

    if !response.headers().contains_key(&REQUEST_ID_HEADER) {
        if let Ok(header_value) = axum::http::HeaderValue::from_str(&request_id) {
            response
                .headers_mut()
                .insert(REQUEST_ID_HEADER.clone(), header_value);
        }
    }

    response
}
