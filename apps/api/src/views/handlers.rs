//! Axum route handlers for list views, exports and record mutations.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::{Application, Collection, Contact, ReferralMessage};
use crate::pipeline::export::{export, ExportError};
use crate::pipeline::filter::filter;
use crate::pipeline::schema::{describe_fields, FieldInfo, Record};
use crate::pipeline::sort::sort;
use crate::pipeline::view::{ViewOutput, ViewState};
use crate::source::snapshot::Loaded;
use crate::source::SourceError;
use crate::state::AppState;
use crate::views::query::{view_state_from_query, ActionBody, ExportBody};
use crate::views::summary::summarize;

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ViewResponse<'a, R> {
    #[serde(flatten)]
    pub view: ViewOutput<'a, R>,
    /// True when the backend failed and an older snapshot was served.
    pub stale: bool,
    pub fetched_at: DateTime<Utc>,
}

/// Result of one reducer step: the next state plus its rendering.
#[derive(Debug, Serialize)]
pub struct ActionResponse<'a, R> {
    pub state: ViewState,
    #[serde(flatten)]
    pub view: ViewResponse<'a, R>,
}

#[derive(Debug, Serialize)]
pub struct FieldsResponse {
    pub collection: &'static str,
    pub fields: Vec<FieldInfo>,
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn parse_collection(slug: &str) -> Result<Collection, AppError> {
    Collection::from_slug(slug)
        .ok_or_else(|| AppError::NotFound(format!("Unknown collection '{slug}'")))
}

async fn load(state: &AppState, collection: Collection) -> Result<Loaded, AppError> {
    Ok(state
        .snapshots
        .refresh(state.source.as_ref(), collection)
        .await?)
}

fn decode<R: Record>(values: &[Value]) -> Result<Vec<R>, AppError> {
    values
        .iter()
        .map(|v| serde_json::from_value::<R>(v.clone()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            AppError::Backend(SourceError::Decode(format!(
                "{} record did not match the expected shape: {e}",
                R::COLLECTION
            )))
        })
}

fn view_response<'a, R: Record>(
    loaded: &Loaded,
    records: &'a [R],
    view: &ViewState,
    now: DateTime<Utc>,
) -> Result<ViewResponse<'a, R>, AppError> {
    Ok(ViewResponse {
        view: view.render(records, now)?,
        stale: loaded.stale,
        fetched_at: loaded.snapshot.fetched_at,
    })
}

fn render_view<R: Record>(
    loaded: &Loaded,
    view: &ViewState,
    now: DateTime<Utc>,
) -> Result<Response, AppError> {
    let records = decode::<R>(&loaded.snapshot.records)?;
    Ok(Json(view_response(loaded, &records, view, now)?).into_response())
}

fn render_action<R: Record>(
    loaded: &Loaded,
    next: ViewState,
    now: DateTime<Utc>,
) -> Result<Response, AppError> {
    let records = decode::<R>(&loaded.snapshot.records)?;
    let view = view_response(loaded, &records, &next, now)?;
    Ok(Json(ActionResponse { state: next, view }).into_response())
}

fn render_export<R: Record>(
    loaded: &Loaded,
    body: &ExportBody,
    now: DateTime<Utc>,
) -> Result<Response, AppError> {
    let records = decode::<R>(&loaded.snapshot.records)?;
    let spec = body.sort.clone().unwrap_or_default();
    let filtered = sort(filter(&records, &body.criteria, now)?, &spec, now)?;

    let file = export(&records, &filtered, &body.selection(), &body.request(), now.date_naive())?;
    info!(
        "Exported {} {} as {}",
        file.record_count,
        R::COLLECTION,
        file.filename
    );

    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.filename),
            ),
        ],
        file.body,
    )
        .into_response())
}

fn render_summary<R: Record>(loaded: &Loaded, now: DateTime<Utc>) -> Result<Response, AppError> {
    let records = decode::<R>(&loaded.snapshot.records)?;
    Ok(Json(summarize(&records, now)?).into_response())
}

fn fields_of<R: Record>() -> FieldsResponse {
    FieldsResponse {
        collection: R::COLLECTION.slug(),
        fields: describe_fields::<R>(),
    }
}

/// Refetches after a confirmed mutation. The mutation already succeeded, so a
/// failed refresh is logged rather than reported.
async fn refresh_after_mutation(state: &AppState, collection: Collection) {
    if let Err(e) = state
        .snapshots
        .refresh(state.source.as_ref(), collection)
        .await
    {
        warn!("Refreshing {collection} after mutation failed: {e}");
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/views/:collection
pub async fn handle_view(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let collection = parse_collection(&slug)?;
    let view = view_state_from_query(&pairs, state.config.default_page_size)?;
    let loaded = load(&state, collection).await?;
    let now = Utc::now();

    match collection {
        Collection::Contacts => render_view::<Contact>(&loaded, &view, now),
        Collection::Applications => render_view::<Application>(&loaded, &view, now),
        Collection::ReferralMessages => render_view::<ReferralMessage>(&loaded, &view, now),
    }
}

/// POST /api/v1/views/:collection/actions
/// Applies one `ViewAction` to the posted state and renders the result.
pub async fn handle_action(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<ActionBody>,
) -> Result<Response, AppError> {
    let collection = parse_collection(&slug)?;
    let next = body.state.apply(body.action);
    let loaded = load(&state, collection).await?;
    let now = Utc::now();

    match collection {
        Collection::Contacts => render_action::<Contact>(&loaded, next, now),
        Collection::Applications => render_action::<Application>(&loaded, next, now),
        Collection::ReferralMessages => render_action::<ReferralMessage>(&loaded, next, now),
    }
}

/// POST /api/v1/views/:collection/export
pub async fn handle_export(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<ExportBody>,
) -> Result<Response, AppError> {
    let collection = parse_collection(&slug)?;
    if body.fields.is_empty() {
        return Err(ExportError::NoFieldsSelected.into());
    }
    let loaded = load(&state, collection).await?;
    let now = Utc::now();

    match collection {
        Collection::Contacts => render_export::<Contact>(&loaded, &body, now),
        Collection::Applications => render_export::<Application>(&loaded, &body, now),
        Collection::ReferralMessages => render_export::<ReferralMessage>(&loaded, &body, now),
    }
}

/// GET /api/v1/views/:collection/summary
pub async fn handle_summary(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let collection = parse_collection(&slug)?;
    let loaded = load(&state, collection).await?;
    let now = Utc::now();

    match collection {
        Collection::Contacts => render_summary::<Contact>(&loaded, now),
        Collection::Applications => render_summary::<Application>(&loaded, now),
        Collection::ReferralMessages => render_summary::<ReferralMessage>(&loaded, now),
    }
}

/// GET /api/v1/views/:collection/fields
pub async fn handle_fields(Path(slug): Path<String>) -> Result<Json<FieldsResponse>, AppError> {
    let response = match parse_collection(&slug)? {
        Collection::Contacts => fields_of::<Contact>(),
        Collection::Applications => fields_of::<Application>(),
        Collection::ReferralMessages => fields_of::<ReferralMessage>(),
    };
    Ok(Json(response))
}

/// POST /api/v1/collections/:collection
pub async fn handle_create(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let collection = parse_collection(&slug)?;
    let created = state.source.create(collection, payload).await?;
    refresh_after_mutation(&state, collection).await;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/v1/collections/:collection/:id
pub async fn handle_update(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, String)>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let collection = parse_collection(&slug)?;
    let updated = state.source.update(collection, &id, payload).await?;
    refresh_after_mutation(&state, collection).await;
    Ok(Json(updated))
}

/// DELETE /api/v1/collections/:collection/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let collection = parse_collection(&slug)?;
    state.source.delete(collection, &id).await?;
    refresh_after_mutation(&state, collection).await;
    Ok(StatusCode::NO_CONTENT)
}
