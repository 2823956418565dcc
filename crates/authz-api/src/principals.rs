use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use authz_core::{NewPrincipal, Principal};

use crate::error::ApiError;
use crate::extract::SpaceId;
use crate::pagination::{clamp, decode_cursor, Page, PageQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub id: Option<String>,
    pub parent_id: Option<String>,
    pub attrs: Option<serde_json::Value>,
    pub segment: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    SpaceId(space_id): SpaceId,
    Json(req): Json<CreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = Principal::new(NewPrincipal {
        id: req.id,
        space_id,
        parent_id: req.parent_id,
        attrs: req.attrs,
        segment: req.segment,
    });
    let stored = state.principals.store(&principal).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn retrieve(
    State(state): State<AppState>,
    SpaceId(space_id): SpaceId,
    Path(id): Path<String>,
) -> Result<Json<Principal>, ApiError> {
    let principal = state.principals.retrieve(&space_id, &id).await?;
    Ok(Json(principal))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub rev: i32,
    pub parent_id: Option<String>,
    pub attrs: Option<serde_json::Value>,
    pub segment: Option<String>,
}

pub async fn update(
    State(state): State<AppState>,
    SpaceId(space_id): SpaceId,
    Path(id): Path<String>,
    Json(req): Json<UpdateRequest>,
) -> Result<Json<Principal>, ApiError> {
    let principal = Principal {
        id,
        space_id,
        rev: req.rev,
        parent_id: req.parent_id,
        attrs: req.attrs,
        segment: req.segment,
    };
    let stored = state.principals.store(&principal).await?;
    Ok(Json(stored))
}

#[derive(Debug, serde::Serialize)]
pub struct DeleteResponse {
    pub existed: bool,
}

pub async fn delete(
    State(state): State<AppState>,
    SpaceId(space_id): SpaceId,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let existed = state.principals.discard(&space_id, &id).await?;
    Ok(Json(DeleteResponse { existed }))
}

pub async fn list_children(
    State(state): State<AppState>,
    SpaceId(space_id): SpaceId,
    Path(parent_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<Principal>>, ApiError> {
    let limit = clamp(page.page_size, state.pagination_limit_max);
    let last_id = decode_cursor(page.page_token.as_deref());

    let items = state
        .principals
        .list_children(&space_id, &parent_id, last_id.as_deref(), limit)
        .await?;

    let next_page_token = authz_core::pagination_token_for_page(
        items.last().map(|p| p.id.as_str()),
        items.len(),
        limit,
    );

    Ok(Json(Page {
        items,
        next_page_token,
    }))
}
