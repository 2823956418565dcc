use crate::error::Error;

use super::{graph, set, Entity, Tuple, TupleStore};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Direct,
    Graph,
    Set,
}

pub enum CheckOutcome {
    /// A direct or composed tuple satisfying the query.
    Tuple(Tuple),
    /// The full path found by the graph strategy.
    Path(Vec<Tuple>),
    Nothing,
}

pub struct CheckResult {
    pub found: bool,
    pub cost: i32,
    pub outcome: CheckOutcome,
}

pub const DEFAULT_COST_LIMIT: u16 = 1000;

/// `check(space, left, relation, right, strategy?, cost_limit?)`: always
/// tries a direct composite lookup first at cost 1; only on a miss, and
/// only if budget remains, does it fall through to the requested
/// strategy. Cost is returned negated when the budget was exhausted
/// without a decision.
pub async fn check(
    store: &TupleStore,
    space_id: &str,
    left: &Entity,
    relation: &str,
    right: &Entity,
    strategy: Strategy,
    cost_limit: u16,
) -> Result<CheckResult, Error> {
    let mut cost: i32 = 1;

    if let Some(tuple) = store
        .lookup(space_id, left, Some(relation), right, None)
        .await?
    {
        return Ok(CheckResult {
            found: true,
            cost,
            outcome: CheckOutcome::Tuple(tuple),
        });
    }

    let mut found = false;
    let mut outcome = CheckOutcome::Nothing;

    if cost < cost_limit as i32 {
        match strategy {
            Strategy::Direct => {}
            Strategy::Graph => {
                let r = graph::graph(store, space_id, left, relation, right, cost_limit).await?;
                cost += r.cost as i32;
                if !r.path.is_empty() {
                    found = true;
                    outcome = CheckOutcome::Path(r.path);
                }
            }
            Strategy::Set => {
                let r = set::spot(store, space_id, left, relation, right, cost_limit).await?;
                cost += r.cost as i32;
                if let Some(tuple) = r.tuple {
                    found = true;
                    outcome = CheckOutcome::Tuple(tuple);
                }
            }
        }
    }

    if !found && cost >= cost_limit as i32 {
        cost = -cost;
    }

    Ok(CheckResult {
        found,
        cost,
        outcome,
    })
}
