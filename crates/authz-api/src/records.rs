use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use authz_core::{Error, NewRecord, Record};

use crate::error::ApiError;
use crate::extract::SpaceId;
use crate::pagination::{clamp, decode_cursor, Page, PageQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    pub principal_id: String,
    pub resource_type: String,
    pub resource_id: String,
    pub attrs: Option<serde_json::Value>,
}

pub async fn grant(
    State(state): State<AppState>,
    SpaceId(space_id): SpaceId,
    Json(req): Json<GrantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = Record::new(NewRecord {
        space_id,
        principal_id: req.principal_id,
        resource_type: req.resource_type,
        resource_id: req.resource_id,
        attrs: req.attrs,
    });
    let stored = state.records.store(&record).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

#[derive(Debug, Deserialize)]
pub struct RecordKey {
    pub principal_id: String,
    pub resource_type: String,
    pub resource_id: String,
}

pub async fn revoke(
    State(state): State<AppState>,
    SpaceId(space_id): SpaceId,
    Query(key): Query<RecordKey>,
) -> Result<StatusCode, ApiError> {
    state
        .records
        .discard(
            &space_id,
            &key.principal_id,
            &key.resource_type,
            &key.resource_id,
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub found: bool,
    pub record: Option<Record>,
}

/// The `Records.Check` surface: "does a direct grant exist" — a boolean
/// lookup, not the relation graph's `Relations.Check`. A `NotFound` from the
/// store is a normal negative answer here, not an error response.
pub async fn check(
    State(state): State<AppState>,
    SpaceId(space_id): SpaceId,
    Query(key): Query<RecordKey>,
) -> Result<Json<CheckResponse>, ApiError> {
    match state
        .records
        .lookup(
            &space_id,
            &key.principal_id,
            &key.resource_type,
            &key.resource_id,
        )
        .await
    {
        Ok(record) => Ok(Json(CheckResponse {
            found: true,
            record: Some(record),
        })),
        Err(Error::NotFound) => Ok(Json(CheckResponse {
            found: false,
            record: None,
        })),
        Err(err) => Err(err.into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct ByPrincipalQuery {
    pub principal_id: String,
    pub resource_type: Option<String>,
    #[serde(flatten)]
    pub page: PageQuery,
}

/// Lists a principal's records, newest resource id first.
pub async fn list_by_principal(
    State(state): State<AppState>,
    SpaceId(space_id): SpaceId,
    Query(q): Query<ByPrincipalQuery>,
) -> Result<Json<Page<Record>>, ApiError> {
    let limit = clamp(q.page.page_size, state.pagination_limit_max);
    let last_id = decode_cursor(q.page.page_token.as_deref());

    let items = state
        .records
        .list_by_principal(
            &space_id,
            &q.principal_id,
            q.resource_type.as_deref(),
            last_id.as_deref(),
            limit,
        )
        .await?;

    let next_page_token = authz_core::pagination_token_for_page(
        items.last().map(|r| r.resource_id.as_str()),
        items.len(),
        limit,
    );

    Ok(Json(Page {
        items,
        next_page_token,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ByResourceQuery {
    pub resource_type: String,
    pub resource_id: String,
    #[serde(flatten)]
    pub page: PageQuery,
}

/// Lists the principals holding a record on a resource, newest principal
/// id first.
pub async fn list_by_resource(
    State(state): State<AppState>,
    SpaceId(space_id): SpaceId,
    Query(q): Query<ByResourceQuery>,
) -> Result<Json<Page<Record>>, ApiError> {
    let limit = clamp(q.page.page_size, state.pagination_limit_max);
    let last_id = decode_cursor(q.page.page_token.as_deref());

    let items = state
        .records
        .list_by_resource(
            &space_id,
            &q.resource_type,
            &q.resource_id,
            last_id.as_deref(),
            limit,
        )
        .await?;

    let next_page_token = authz_core::pagination_token_for_page(
        items.last().map(|r| r.principal_id.as_str()),
        items.len(),
        limit,
    );

    Ok(Json(Page {
        items,
        next_page_token,
    }))
}
