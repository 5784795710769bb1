use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use interaction_hub_registry::RegistryError;
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

use crate::interaction::InteractionEnvelope;
use crate::platform::PublishError;
use crate::tenant::{ConfigError, RefreshReport, TenantConfig};

use super::types::{AcceptedResponse, ErrorResponse, PublishResponse, ReloadResponse};
use super::{AppState, ADMIN_TOKEN_HEADER};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>, details: Option<Value>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.to_string(),
            details,
        }),
    )
}

/// Schedules the interaction and answers before it runs.
#[instrument(skip(state, envelope), fields(interaction_id = %envelope.interaction_id))]
pub async fn accept_interaction(
    State(state): State<AppState>,
    Json(envelope): Json<InteractionEnvelope>,
) -> (StatusCode, Json<AcceptedResponse>) {
    let interaction_id = envelope.interaction_id.clone();
    let responder = state.responders.responder(&envelope);
    // Detached: the router reports its own outcome.
    drop(state.router.dispatch(envelope, responder));

    (
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            status: "accepted".to_string(),
            interaction_id,
        }),
    )
}

#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let registry = state.router.registry();
    let table = registry.snapshot();
    let tenants = state.router.tenants();
    Json(json!({
        "status": "healthy",
        "service": "interaction-hub-dispatcher",
        "routes": table.len(),
        "routing_generation": registry.generation(),
        "cached_tenants": tenants.len(),
        "store_backend": tenants.backend()
    }))
}

#[instrument(skip(state), fields(tenant_id = %tenant_id))]
pub async fn get_tenant_config(
    Path(tenant_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TenantConfig>, ApiError> {
    let config = state
        .router
        .tenants()
        .fetch(&tenant_id)
        .await
        .map_err(map_config_error)?;
    Ok(Json(TenantConfig::clone(&config)))
}

#[instrument(skip(state, headers))]
pub async fn publish_commands(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PublishResponse>, ApiError> {
    authorize_admin(&state, &headers)?;
    let publisher = state.publisher.as_ref().ok_or_else(|| {
        api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "PUBLISHER_NOT_CONFIGURED",
            "command publication is not configured",
            None,
        )
    })?;

    let specs = state.router.registry().snapshot().publishable_specs();
    let published = publisher
        .bulk_set(&specs)
        .await
        .map_err(map_publish_error)?;

    info!(published, "application commands published");
    Ok(Json(PublishResponse {
        status: "ok".to_string(),
        published,
    }))
}

#[instrument(skip(state, headers))]
pub async fn reload_commands(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ReloadResponse>, ApiError> {
    authorize_admin(&state, &headers)?;
    let registry = state.router.registry();
    let generation = registry
        .reload(state.registrar)
        .map_err(map_registry_error)?;

    Ok(Json(ReloadResponse {
        status: "ok".to_string(),
        generation,
        routes: registry.snapshot().len(),
    }))
}

#[instrument(skip(state, headers))]
pub async fn refresh_tenants(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RefreshReport>, ApiError> {
    authorize_admin(&state, &headers)?;
    Ok(Json(state.router.tenants().refresh_all().await))
}

fn authorize_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            "ADMIN_DISABLED",
            "administrative routes are disabled",
            None,
        ));
    };

    let provided = headers
        .get(&ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    if provided != Some(expected) {
        warn!("rejected administrative request with missing or wrong token");
        return Err(api_error(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "missing or invalid admin token",
            None,
        ));
    }
    Ok(())
}

fn map_config_error(err: ConfigError) -> ApiError {
    let tenant_id = err.tenant_id().to_string();
    match err {
        ConfigError::InvalidTenantId(_) => api_error(
            StatusCode::BAD_REQUEST,
            "INVALID_TENANT",
            err.to_string(),
            None,
        ),
        ConfigError::StoreUnavailable { .. } => {
            warn!(tenant = %tenant_id, error = %err, "config store unavailable");
            api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_UNAVAILABLE",
                "configuration store unavailable, try again later",
                Some(json!({ "tenant_id": tenant_id })),
            )
        }
        ConfigError::StoreRejected { .. } => {
            error!(tenant = %tenant_id, error = ?err, "config store rejected request");
            api_error(
                StatusCode::BAD_GATEWAY,
                "STORE_REJECTED",
                "configuration store rejected the request",
                Some(json!({ "tenant_id": tenant_id })),
            )
        }
    }
}

fn map_publish_error(err: PublishError) -> ApiError {
    error!(error = %err, "command publication failed");
    match &err {
        PublishError::NotConfigured(_) => api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "PUBLISHER_NOT_CONFIGURED",
            err.to_string(),
            None,
        ),
        PublishError::Rejected { status, .. } => api_error(
            StatusCode::BAD_GATEWAY,
            "PUBLISH_REJECTED",
            err.to_string(),
            Some(json!({ "platform_status": status })),
        ),
        PublishError::Timeout => api_error(
            StatusCode::GATEWAY_TIMEOUT,
            "PUBLISH_TIMEOUT",
            err.to_string(),
            None,
        ),
        PublishError::Transport(_) => api_error(
            StatusCode::BAD_GATEWAY,
            "PUBLISH_FAILED",
            err.to_string(),
            None,
        ),
    }
}

fn map_registry_error(err: RegistryError) -> ApiError {
    if err.is_conflict() {
        return api_error(
            StatusCode::CONFLICT,
            "REGISTRATION_CONFLICT",
            err.to_string(),
            None,
        );
    }
    match err {
        RegistryError::InvalidDescriptor { .. } => api_error(
            StatusCode::BAD_REQUEST,
            "INVALID_DESCRIPTOR",
            err.to_string(),
            None,
        ),
        _ => api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "REGISTRY_ERROR",
            err.to_string(),
            None,
        ),
    }
}
