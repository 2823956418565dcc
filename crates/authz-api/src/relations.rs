use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use authz_core::{CheckOutcome, Error, NewTuple, OptimizeStrategy, Strategy, Tuple};

use crate::endpoint::EndpointJson;
use crate::error::ApiError;
use crate::extract::SpaceId;
use crate::pagination::{clamp, decode_cursor, Page, PageQuery};
use crate::state::AppState;

fn parse_optimize_strategy(s: Option<&str>) -> Result<OptimizeStrategy, ApiError> {
    match s.unwrap_or("graph") {
        "graph" => Ok(OptimizeStrategy::Graph),
        "direct" => Ok(OptimizeStrategy::Direct),
        "set" => Ok(OptimizeStrategy::Set),
        _ => Err(Error::InvalidStrategy.into()),
    }
}

fn parse_check_strategy(s: Option<&str>) -> Result<Strategy, ApiError> {
    match s.unwrap_or("direct") {
        "direct" => Ok(Strategy::Direct),
        "graph" => Ok(Strategy::Graph),
        "set" => Ok(Strategy::Set),
        _ => Err(Error::InvalidStrategy.into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub strand: String,
    pub left: EndpointJson,
    pub relation: String,
    pub right: EndpointJson,
    pub attrs: Option<serde_json::Value>,
    pub optimize_strategy: Option<String>,
    pub cost_limit: Option<u16>,
}

#[derive(Debug, Serialize)]
pub struct CreateResponse {
    pub tuple: Tuple,
    pub computed: Vec<Tuple>,
    pub cost: i32,
}

pub async fn create(
    State(state): State<AppState>,
    SpaceId(space_id): SpaceId,
    Json(req): Json<CreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let strategy = parse_optimize_strategy(req.optimize_strategy.as_deref())?;
    let cost_limit = req.cost_limit.unwrap_or(state.default_cost_limit);

    let tuple = Tuple::new(NewTuple {
        space_id,
        strand: req.strand,
        left: req.left.into(),
        relation: req.relation,
        right: req.right.into(),
        attrs: req.attrs,
    });

    let result = authz_core::create(&state.tuples, tuple, strategy, cost_limit).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateResponse {
            tuple: result.tuple,
            computed: result.computed,
            cost: result.cost,
        }),
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = id
        .parse::<authz_id::Id>()
        .map_err(|_| Error::InvalidKey)?;
    state.tuples.discard(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub left: EndpointJson,
    pub relation: String,
    pub right: EndpointJson,
    pub strategy: Option<String>,
    pub cost_limit: Option<u16>,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub found: bool,
    pub cost: i32,
    pub tuple: Option<Tuple>,
    pub path: Option<Vec<Tuple>>,
}

pub async fn check(
    State(state): State<AppState>,
    SpaceId(space_id): SpaceId,
    Json(req): Json<CheckRequest>,
) -> Result<Json<CheckResponse>, ApiError> {
    let strategy = parse_check_strategy(req.strategy.as_deref())?;
    let cost_limit = req.cost_limit.unwrap_or(state.default_cost_limit);

    let left = req.left.entity();
    let right = req.right.entity();

    let result = authz_core::check(
        &state.tuples,
        &space_id,
        &left,
        &req.relation,
        &right,
        strategy,
        cost_limit,
    )
    .await?;

    let (tuple, path) = match result.outcome {
        CheckOutcome::Tuple(t) => (Some(t), None),
        CheckOutcome::Path(p) => (None, Some(p)),
        CheckOutcome::Nothing => (None, None),
    };

    Ok(Json(CheckResponse {
        found: result.found,
        cost: result.cost,
        tuple,
        path,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListLeftQuery {
    pub principal_id: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub relation: Option<String>,
    #[serde(flatten)]
    pub page: PageQuery,
}

fn query_entity(
    principal_id: &Option<String>,
    entity_type: &Option<String>,
    entity_id: &Option<String>,
) -> Result<authz_core::Entity, ApiError> {
    match (principal_id, entity_type, entity_id) {
        (Some(pid), _, _) => Ok(authz_core::Entity::principal(pid.clone())),
        (None, Some(t), Some(i)) => Ok(authz_core::Entity::new(t.clone(), i.clone())),
        _ => Err(Error::InvalidListArgs.into()),
    }
}

/// `Relations.ListLeft`: tuples whose right endpoint matches the query.
pub async fn list_left(
    State(state): State<AppState>,
    SpaceId(space_id): SpaceId,
    Query(q): Query<ListLeftQuery>,
) -> Result<Json<Page<Tuple>>, ApiError> {
    let right = query_entity(&q.principal_id, &q.entity_type, &q.entity_id)?;
    let limit = clamp(q.page.page_size, state.pagination_limit_max);
    let last_id = decode_cursor(q.page.page_token.as_deref());

    let items = state
        .tuples
        .list_left(
            &space_id,
            &right,
            q.relation.as_deref(),
            last_id.as_deref(),
            limit,
        )
        .await?;

    let next_page_token = authz_core::pagination_token_for_page(
        items.last().map(|t| t.l_entity_id.as_str()),
        items.len(),
        limit,
    );

    Ok(Json(Page {
        items,
        next_page_token,
    }))
}

/// `Relations.ListRight`: tuples whose left endpoint matches the query.
pub async fn list_right(
    State(state): State<AppState>,
    SpaceId(space_id): SpaceId,
    Query(q): Query<ListLeftQuery>,
) -> Result<Json<Page<Tuple>>, ApiError> {
    let left = query_entity(&q.principal_id, &q.entity_type, &q.entity_id)?;
    let limit = clamp(q.page.page_size, state.pagination_limit_max);
    let last_id = decode_cursor(q.page.page_token.as_deref());

    let items = state
        .tuples
        .list_right(
            &space_id,
            &left,
            q.relation.as_deref(),
            last_id.as_deref(),
            limit,
        )
        .await?;

    let next_page_token = authz_core::pagination_token_for_page(
        items.last().map(|t| t.r_entity_id.as_str()),
        items.len(),
        limit,
    );

    Ok(Json(Page {
        items,
        next_page_token,
    }))
}
