use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use authz_core::{Entity, Tuple, PRINCIPAL_ENTITY_TYPE};

use crate::error::ApiError;
use crate::extract::SpaceId;
use crate::pagination::{clamp, decode_cursor, Page, PageQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EntityQuery {
    pub entity_type: String,
    pub entity_id: String,
    pub relation: Option<String>,
    #[serde(flatten)]
    pub page: PageQuery,
}

/// Which side of a listed tuple a projection reads as "the other entity",
/// and which of its endpoint ids is the listing's pagination cursor.
pub(crate) enum Side {
    /// `listRight(left, ...)`: the other entity is `t.right()`, cursor is
    /// `r_entity_id`.
    Right,
    /// `listLeft(right, ...)`: the other entity is `t.left()`, cursor is
    /// `l_entity_id`.
    Left,
}

/// `Entities.List`: the entities reachable from `(entity_type, entity_id)`
/// via `relation`, regardless of their own type.
pub async fn list(
    State(state): State<AppState>,
    SpaceId(space_id): SpaceId,
    Query(q): Query<EntityQuery>,
) -> Result<Json<Page<Entity>>, ApiError> {
    let left = Entity::new(q.entity_type, q.entity_id);
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

/// `Entities.ListPrincipals`: the same traversal restricted to principal
/// endpoints only — §4.4's "principal endpoints list exclusively when the
/// requester targets principal-only results".
pub async fn list_principals(
    State(state): State<AppState>,
    SpaceId(space_id): SpaceId,
    Query(q): Query<EntityQuery>,
) -> Result<Json<Page<Entity>>, ApiError> {
    let right = Entity::new(q.entity_type, q.entity_id);
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

/// Projects the "other" entity of each listed tuple, optionally filtering
/// to a single entity type. The page token is derived from the *raw* fetch
/// (last row, full-page check) before filtering: the underlying cursor
/// walks the unfiltered `listLeft`/`listRight` order, so resuming from it
/// stays correct even when a page's filtered item count is smaller than
/// `limit`.
pub(crate) fn project(
    rows: Vec<Tuple>,
    limit: u16,
    only_type: Option<&str>,
    side: Side,
) -> Page<Entity> {
    let cursor_id = |t: &Tuple| match side {
        Side::Right => t.r_entity_id.as_str(),
        Side::Left => t.l_entity_id.as_str(),
    };
    let next_page_token =
        authz_core::pagination_token_for_page(rows.last().map(cursor_id), rows.len(), limit);

    let items = rows
        .into_iter()
        .map(|t| match side {
            Side::Right => t.right(),
            Side::Left => t.left(),
        })
        .filter(|e| only_type.map_or(true, |ty| e.entity_type == ty))
        .collect();

    Page {
        items,
        next_page_token,
    }
}
