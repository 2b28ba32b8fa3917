// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! HTTP routes over the dispatch API.

use crate::live::{LiveEventBroadcaster, live_events_handler};
use axum::{
    Json, Router,
    extract::{Path, Query, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use despacho_api::{
    AddNovedadRequest, ApiError, ArchiveResponse, AssignOrderRequest, AuditTrailResponse,
    AuthenticatedActor, CounterResponse, CountersResponse, CreateOrderRequest, DispatchApi,
    ListArchivedDatesResponse, ListOrdersResponse, ListUnitsResponse, NovedadChangeResponse,
    NovedadConfigRequest, NovedadConfigResponse, NovedadesResponse, OrderResponse,
    PurgeOrdersResponse, RecoverOrphansResponse, Role, RolloverResponse, StatusResponse,
    UpsertUnitRequest, default_cause,
};
use despacho_audit::Cause;
use despacho_domain::{NovedadConfigEntry, Unit};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<DispatchApi>,
    pub live: Arc<LiveEventBroadcaster>,
}

/// Who is calling, sent with every request that changes shared state
/// beyond a single order.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActorFields {
    pub actor_id: String,
    pub actor_role: String,
    #[serde(default)]
    pub cause_id: Option<String>,
    #[serde(default)]
    pub cause_description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UnitApiRequest {
    #[serde(flatten)]
    pub actor: ActorFields,
    #[serde(flatten)]
    pub unit: UpsertUnitRequest,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NovedadConfigApiRequest {
    #[serde(flatten)]
    pub actor: ActorFields,
    pub entries: Vec<NovedadConfigEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusQuery {
    /// Bypass the status cache.
    #[serde(default)]
    pub force: bool,
}

/// Error response type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: bool,
    pub message: String,
}

/// HTTP error wrapper that implements `IntoResponse`.
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body: Json<ErrorResponse> = Json(ErrorResponse {
            error: true,
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        let status: StatusCode = match &err {
            ApiError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            ApiError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            ApiError::DomainRuleViolation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::RolloverNotNeeded { .. }
            | ApiError::RolloverInProgress
            | ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::PartialFailure { .. } | ApiError::Internal { .. } => {
                error!(error = %err, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

/// Resolves the caller and the cause recorded in audit events.
fn authenticate(fields: &ActorFields, action: &str) -> Result<(AuthenticatedActor, Cause), HttpError> {
    if fields.actor_id.trim().is_empty() {
        return Err(HttpError {
            status: StatusCode::UNAUTHORIZED,
            message: String::from("actor_id is required"),
        });
    }
    let role: Role = fields.actor_role.parse()?;
    let actor: AuthenticatedActor = AuthenticatedActor::new(fields.actor_id.clone(), role);
    let cause: Cause = match (&fields.cause_id, &fields.cause_description) {
        (Some(id), description) => Cause::new(
            id.clone(),
            description.clone().unwrap_or_else(|| action.to_string()),
        ),
        (None, _) => default_cause(action, &actor),
    };
    Ok((actor, cause))
}

async fn handle_get_status(
    AxumState(state): AxumState<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<StatusResponse>, HttpError> {
    Ok(Json(state.api.get_status(query.force)?))
}

async fn handle_clear_status_cache(AxumState(state): AxumState<AppState>) -> StatusCode {
    state.api.clear_status_cache();
    StatusCode::NO_CONTENT
}

async fn handle_manual_rollover(
    AxumState(state): AxumState<AppState>,
    Json(req): Json<ActorFields>,
) -> Result<Json<RolloverResponse>, HttpError> {
    let (actor, cause) = authenticate(&req, "manual_rollover")?;
    info!(actor_id = %actor.id, "Handling manual rollover request");
    Ok(Json(state.api.trigger_manual_rollover(&actor, cause)?))
}

async fn handle_forced_rollover(
    AxumState(state): AxumState<AppState>,
    Json(req): Json<ActorFields>,
) -> Result<Json<RolloverResponse>, HttpError> {
    let (actor, cause) = authenticate(&req, "forced_rollover")?;
    warn!(actor_id = %actor.id, "Handling forced rollover request");
    Ok(Json(state.api.trigger_forced_rollover(&actor, cause)?))
}

async fn handle_recover_orphans(
    AxumState(state): AxumState<AppState>,
    Json(req): Json<ActorFields>,
) -> Result<Json<RecoverOrphansResponse>, HttpError> {
    let (actor, cause) = authenticate(&req, "recover_orphans")?;
    info!(actor_id = %actor.id, "Handling orphan recovery request");
    Ok(Json(state.api.recover_orphans(&actor, cause)?))
}

async fn handle_purge_all_orders(
    AxumState(state): AxumState<AppState>,
    Json(req): Json<ActorFields>,
) -> Result<Json<PurgeOrdersResponse>, HttpError> {
    let (actor, cause) = authenticate(&req, "purge_all_orders")?;
    warn!(actor_id = %actor.id, "Handling purge request");
    Ok(Json(state.api.purge_all_orders(&actor, cause)?))
}

async fn handle_list_archived_dates(
    AxumState(state): AxumState<AppState>,
) -> Result<Json<ListArchivedDatesResponse>, HttpError> {
    Ok(Json(state.api.list_archived_dates()?))
}

async fn handle_get_archive(
    AxumState(state): AxumState<AppState>,
    Path(date): Path<String>,
) -> Result<Json<ArchiveResponse>, HttpError> {
    Ok(Json(state.api.get_archive(&date)?))
}

async fn handle_list_orders(
    AxumState(state): AxumState<AppState>,
) -> Result<Json<ListOrdersResponse>, HttpError> {
    Ok(Json(state.api.list_open_orders()?))
}

async fn handle_create_order(
    AxumState(state): AxumState<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), HttpError> {
    Ok((StatusCode::CREATED, Json(state.api.create_order(req)?)))
}

async fn handle_assign_order(
    AxumState(state): AxumState<AppState>,
    Path(order_id): Path<String>,
    Json(req): Json<AssignOrderRequest>,
) -> Result<Json<OrderResponse>, HttpError> {
    Ok(Json(state.api.assign_order(&order_id, &req)?))
}

async fn handle_confirm_order(
    AxumState(state): AxumState<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderResponse>, HttpError> {
    Ok(Json(state.api.confirm_order(&order_id)?))
}

async fn handle_get_counters(
    AxumState(state): AxumState<AppState>,
) -> Result<Json<CountersResponse>, HttpError> {
    Ok(Json(state.api.get_counters()?))
}

async fn handle_increment_counter(
    AxumState(state): AxumState<AppState>,
    Path(unit): Path<String>,
) -> Result<Json<CounterResponse>, HttpError> {
    Ok(Json(state.api.increment_counter(&unit)?))
}

async fn handle_decrement_counter(
    AxumState(state): AxumState<AppState>,
    Path(unit): Path<String>,
) -> Result<Json<CounterResponse>, HttpError> {
    Ok(Json(state.api.decrement_counter(&unit)?))
}

async fn handle_list_units(
    AxumState(state): AxumState<AppState>,
) -> Result<Json<ListUnitsResponse>, HttpError> {
    Ok(Json(state.api.list_units()?))
}

async fn handle_upsert_unit(
    AxumState(state): AxumState<AppState>,
    Json(req): Json<UnitApiRequest>,
) -> Result<Json<Unit>, HttpError> {
    let (actor, _) = authenticate(&req.actor, "upsert_unit")?;
    Ok(Json(state.api.upsert_unit(&actor, &req.unit)?))
}

async fn handle_list_novedades(
    AxumState(state): AxumState<AppState>,
    Path(unit): Path<String>,
) -> Result<Json<NovedadesResponse>, HttpError> {
    Ok(Json(state.api.list_novedades(&unit)?))
}

async fn handle_add_novedad(
    AxumState(state): AxumState<AppState>,
    Path(unit): Path<String>,
    Json(req): Json<AddNovedadRequest>,
) -> Result<Json<NovedadChangeResponse>, HttpError> {
    Ok(Json(state.api.add_novedad(&unit, &req)?))
}

async fn handle_remove_novedad(
    AxumState(state): AxumState<AppState>,
    Path((unit, code)): Path<(String, String)>,
) -> Result<Json<NovedadChangeResponse>, HttpError> {
    Ok(Json(state.api.remove_novedad(&unit, &code)?))
}

async fn handle_get_novedad_config(
    AxumState(state): AxumState<AppState>,
) -> Result<Json<NovedadConfigResponse>, HttpError> {
    Ok(Json(state.api.get_novedad_config()?))
}

async fn handle_save_novedad_config(
    AxumState(state): AxumState<AppState>,
    Json(req): Json<NovedadConfigApiRequest>,
) -> Result<Json<NovedadConfigResponse>, HttpError> {
    let (actor, _) = authenticate(&req.actor, "save_novedad_config")?;
    let request: NovedadConfigRequest = NovedadConfigRequest {
        entries: req.entries,
    };
    Ok(Json(state.api.save_novedad_config(&actor, request)?))
}

async fn handle_list_audit_events(
    AxumState(state): AxumState<AppState>,
) -> Result<Json<AuditTrailResponse>, HttpError> {
    Ok(Json(state.api.list_audit_events()?))
}

pub fn build_router(app_state: AppState) -> Router {
    let live: Router = Router::new()
        .route("/live", get(live_events_handler))
        .with_state(app_state.live.clone());

    Router::new()
        .route("/status", get(handle_get_status))
        .route("/status/cache/clear", post(handle_clear_status_cache))
        .route("/rollover/manual", post(handle_manual_rollover))
        .route("/rollover/forced", post(handle_forced_rollover))
        .route("/rollover/recover", post(handle_recover_orphans))
        .route("/rollover/purge", post(handle_purge_all_orders))
        .route("/archive", get(handle_list_archived_dates))
        .route("/archive/{date}", get(handle_get_archive))
        .route("/orders", get(handle_list_orders).post(handle_create_order))
        .route("/orders/{order_id}/assign", post(handle_assign_order))
        .route("/orders/{order_id}/confirm", post(handle_confirm_order))
        .route("/counters", get(handle_get_counters))
        .route("/counters/{unit}/increment", post(handle_increment_counter))
        .route("/counters/{unit}/decrement", post(handle_decrement_counter))
        .route("/units", get(handle_list_units).post(handle_upsert_unit))
        .route(
            "/units/{unit}/novedades",
            get(handle_list_novedades).post(handle_add_novedad),
        )
        .route(
            "/units/{unit}/novedades/{code}",
            delete(handle_remove_novedad),
        )
        .route(
            "/config/novedades",
            get(handle_get_novedad_config).put(handle_save_novedad_config),
        )
        .route("/audit", get(handle_list_audit_events))
        .with_state(app_state)
        .merge(live)
}
