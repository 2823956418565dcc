use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use authz_core::{Entity, PRINCIPAL_ENTITY_TYPE};

use crate::entities::{project, Side};
use crate::error::ApiError;
use crate::extract::SpaceId;
use crate::pagination::{clamp, decode_cursor, Page, PageQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ByPrincipalQuery {
    pub principal_id: String,
    pub relation: Option<String>,
    #[serde(flatten)]
    pub page: PageQuery,
}

/// `Resources.List`: the resources `principal_id` is related to.
pub async fn list(
    State(state): State<AppState>,
    SpaceId(space_id): SpaceId,
    Query(q): Query<ByPrincipalQuery>,
) -> Result<Json<Page<Entity>>, ApiError> {
    let left = Entity::principal(q.principal_id);
    let limit = clamp(q.page.page_size, state.pagination_limit_max);
    let last_id = decode_cursor(q.page.page_token.as_deref());

    let rows = state
        .tuples
        .list_right(
            &space_id,
            &left,
            q.relation.as_deref(),
            last_id.as_deref(),
            limit,
        )
        .await?;

    Ok(Json(project(rows, limit, None, Side::Right)))
}

#[derive(Debug, Deserialize)]
pub struct ByResourceQuery {
    pub resource_type: String,
    pub resource_id: String,
    pub relation: Option<String>,
    #[serde(flatten)]
    pub page: PageQuery,
}

/// `Resources.ListPrincipals`: the principals related to a given resource.
pub async fn list_principals(
    State(state): State<AppState>,
    SpaceId(space_id): SpaceId,
    Query(q): Query<ByResourceQuery>,
) -> Result<Json<Page<Entity>>, ApiError> {
    let right = Entity::new(q.resource_type, q.resource_id);
    let limit = clamp(q.page.page_size, state.pagination_limit_max);
    let last_id = decode_cursor(q.page.page_token.as_deref());

    let rows = state
        .tuples
        .list_left(
            &space_id,
            &right,
            q.relation.as_deref(),
            last_id.as_deref(),
            limit,
        )
        .await?;

    Ok(Json(project(
        rows,
        limit,
        Some(PRINCIPAL_ENTITY_TYPE),
        Side::Left,
    )))
}
