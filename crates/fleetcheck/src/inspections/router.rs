use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::catalog::item_type_catalog;
use super::domain::{
    ChecklistId, ChecklistSpec, ExecutionId, ItemId, ItemPatch, NewTuvRecord, ResultPayload,
    UserId, VehicleId,
};
use super::repository::{InspectionStore, StoreError, UnitOfWork};
use super::roles::{ActingUser, Role};
use super::service::{InspectionError, InspectionService};
use super::sync::{SyncAction, SyncProcessor};
use super::tuv::WARNING_WINDOW_DAYS;

/// Shared handler state: the service facade plus the sync processor.
pub struct InspectionApi<S> {
    pub service: Arc<InspectionService<S>>,
    pub sync: Arc<SyncProcessor<S>>,
}

impl<S> Clone for InspectionApi<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            sync: self.sync.clone(),
        }
    }
}

/// Router builder exposing the engine operations under `/api/v1`.
pub fn inspection_router<S>(api: InspectionApi<S>) -> Router
where
    S: InspectionStore + UnitOfWork + Send + Sync + 'static,
{
    Router::new()
        .route("/api/v1/executions", post(start_execution_handler::<S>))
        .route(
            "/api/v1/executions/:execution_id/results",
            post(record_result_handler::<S>),
        )
        .route(
            "/api/v1/executions/:execution_id/complete",
            post(complete_execution_handler::<S>),
        )
        .route(
            "/api/v1/executions/:execution_id/cancel",
            post(cancel_execution_handler::<S>),
        )
        .route("/api/v1/checklists", post(create_checklist_handler::<S>))
        .route("/api/v1/items/:item_id", put(update_item_handler::<S>))
        .route(
            "/api/v1/items/:item_id/validation",
            get(item_validation_handler::<S>),
        )
        .route("/api/v1/item-types", get(item_types_handler))
        .route("/api/v1/sync/actions", post(sync_actions_handler::<S>))
        .route(
            "/api/v1/tuv/deadlines",
            get(list_tuv_deadlines_handler::<S>).post(upsert_tuv_record_handler::<S>),
        )
        .route("/api/v1/tuv/alerts", get(tuv_alerts_handler::<S>))
        .with_state(api)
}

impl IntoResponse for InspectionError {
    fn into_response(self) -> Response {
        let status = match &self {
            InspectionError::NotFound(_) => StatusCode::NOT_FOUND,
            InspectionError::Conflict(_) => StatusCode::CONFLICT,
            InspectionError::Forbidden(_) => StatusCode::FORBIDDEN,
            InspectionError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            InspectionError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            InspectionError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// The acting user arrives in headers from the (out-of-scope) auth layer;
/// both parts are required, there is no anonymous fallback.
fn acting_user(headers: &HeaderMap) -> Result<ActingUser, Response> {
    let id = headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<i64>().ok());
    let role = headers
        .get("x-user-role")
        .and_then(|value| value.to_str().ok())
        .and_then(Role::parse);
    match (id, role) {
        (Some(id), Some(role)) => Ok(ActingUser {
            id: UserId(id),
            role,
        }),
        _ => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "x-user-id and x-user-role headers are required"
            })),
        )
            .into_response()),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StartExecutionRequest {
    pub(crate) checklist_id: ChecklistId,
    pub(crate) vehicle_id: VehicleId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordResultRequest {
    pub(crate) item_id: ItemId,
    #[serde(flatten)]
    pub(crate) payload: ResultPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SyncBatchRequest {
    pub(crate) actions: Vec<SyncAction>,
    pub(crate) client_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TuvAlertsQuery {
    #[serde(default = "default_horizon")]
    pub(crate) horizon_days: i64,
}

fn default_horizon() -> i64 {
    WARNING_WINDOW_DAYS
}

pub(crate) async fn start_execution_handler<S>(
    State(api): State<InspectionApi<S>>,
    headers: HeaderMap,
    Json(request): Json<StartExecutionRequest>,
) -> Response
where
    S: InspectionStore + UnitOfWork + Send + Sync + 'static,
{
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api
        .service
        .start_execution(request.checklist_id, request.vehicle_id, &user)
    {
        Ok(execution) => (StatusCode::CREATED, Json(execution)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn record_result_handler<S>(
    State(api): State<InspectionApi<S>>,
    Path(execution_id): Path<i64>,
    headers: HeaderMap,
    Json(request): Json<RecordResultRequest>,
) -> Response
where
    S: InspectionStore + UnitOfWork + Send + Sync + 'static,
{
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api.service.record_result(
        ExecutionId(execution_id),
        request.item_id,
        request.payload,
        &user,
    ) {
        Ok(result) => (StatusCode::CREATED, Json(result)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn complete_execution_handler<S>(
    State(api): State<InspectionApi<S>>,
    Path(execution_id): Path<i64>,
    headers: HeaderMap,
) -> Response
where
    S: InspectionStore + UnitOfWork + Send + Sync + 'static,
{
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api
        .service
        .complete_execution(ExecutionId(execution_id), &user)
    {
        Ok(execution) => (StatusCode::OK, Json(execution)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn cancel_execution_handler<S>(
    State(api): State<InspectionApi<S>>,
    Path(execution_id): Path<i64>,
    headers: HeaderMap,
) -> Response
where
    S: InspectionStore + UnitOfWork + Send + Sync + 'static,
{
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api
        .service
        .cancel_execution(ExecutionId(execution_id), &user)
    {
        Ok(execution) => (StatusCode::OK, Json(execution)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn create_checklist_handler<S>(
    State(api): State<InspectionApi<S>>,
    headers: HeaderMap,
    Json(spec): Json<ChecklistSpec>,
) -> Response
where
    S: InspectionStore + UnitOfWork + Send + Sync + 'static,
{
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api.service.create_checklist(spec, &user) {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn update_item_handler<S>(
    State(api): State<InspectionApi<S>>,
    Path(item_id): Path<i64>,
    headers: HeaderMap,
    Json(patch): Json<ItemPatch>,
) -> Response
where
    S: InspectionStore + UnitOfWork + Send + Sync + 'static,
{
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api.service.update_item(ItemId(item_id), patch, &user) {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn item_validation_handler<S>(
    State(api): State<InspectionApi<S>>,
    Path(item_id): Path<i64>,
    headers: HeaderMap,
) -> Response
where
    S: InspectionStore + UnitOfWork + Send + Sync + 'static,
{
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api.service.item_validation_info(ItemId(item_id), &user) {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn item_types_handler() -> Response {
    let catalog: serde_json::Map<String, serde_json::Value> = item_type_catalog()
        .into_iter()
        .map(|descriptor| {
            (
                descriptor.kind.as_str().to_string(),
                serde_json::to_value(&descriptor).unwrap_or_default(),
            )
        })
        .collect();
    (StatusCode::OK, Json(json!({ "item_types": catalog }))).into_response()
}

pub(crate) async fn sync_actions_handler<S>(
    State(api): State<InspectionApi<S>>,
    headers: HeaderMap,
    Json(request): Json<SyncBatchRequest>,
) -> Response
where
    S: InspectionStore + UnitOfWork + Send + Sync + 'static,
{
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let report = api
        .sync
        .process_batch(&request.actions, &request.client_id, &user);
    (StatusCode::OK, Json(report)).into_response()
}

pub(crate) async fn list_tuv_deadlines_handler<S>(
    State(api): State<InspectionApi<S>>,
) -> Response
where
    S: InspectionStore + UnitOfWork + Send + Sync + 'static,
{
    match api.service.list_tuv_deadlines() {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn upsert_tuv_record_handler<S>(
    State(api): State<InspectionApi<S>>,
    headers: HeaderMap,
    Json(draft): Json<NewTuvRecord>,
) -> Response
where
    S: InspectionStore + UnitOfWork + Send + Sync + 'static,
{
    let user = match acting_user(&headers) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match api.service.upsert_tuv_record(draft, &user) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn tuv_alerts_handler<S>(
    State(api): State<InspectionApi<S>>,
    Query(query): Query<TuvAlertsQuery>,
) -> Response
where
    S: InspectionStore + UnitOfWork + Send + Sync + 'static,
{
    match api.service.compute_tuv_alerts(query.horizon_days) {
        Ok(alerts) => (StatusCode::OK, Json(alerts)).into_response(),
        Err(err) => err.into_response(),
    }
}
