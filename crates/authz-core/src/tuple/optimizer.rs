use crate::error::Error;

use super::{Tuple, TupleStore};

/// Optimizer strategy chosen when creating a tuple: `graph` stores only
/// the primary tuple; `direct`/`set` additionally materialize transitively
/// reachable tuples so future `check` calls hit the direct path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptimizeStrategy {
    Graph,
    Direct,
    Set,
}

pub struct CreateResult {
    pub tuple: Tuple,
    pub computed: Vec<Tuple>,
    pub cost: i32,
}

/// Stores `tuple`, then — unless `strategy` is `Graph` — expands it in
/// both directions and materializes the resulting composed tuples, up to
/// `cost_limit`.
///
/// Mirrors `rpcCreate`'s left-expand/right-expand/store-candidates
/// sequence exactly, including its cost accounting and its policy of
/// silently dropping candidates that already exist.
pub async fn create(
    store: &TupleStore,
    tuple: Tuple,
    strategy: OptimizeStrategy,
    cost_limit: u16,
) -> Result<CreateResult, Error> {
    store.store(&tuple).await?;

    if strategy == OptimizeStrategy::Graph {
        return Ok(CreateResult {
            tuple,
            computed: Vec::new(),
            cost: 1,
        });
    }

    let mut cost: u32 = 0;
    let mut computed: Vec<Tuple> = Vec::new();

    if !tuple.strand.is_empty()
        && (strategy == OptimizeStrategy::Direct || tuple.r_principal_id.is_some())
    {
        let results = store
            .list_left(
                &tuple.space_id,
                &tuple.left(),
                Some(&tuple.strand),
                None,
                cost_limit,
            )
            .await?;

        cost += results.len() as u32;
        for r in &results {
            if strategy == OptimizeStrategy::Set && r.l_principal_id.is_none() {
                continue;
            }
            computed.push(Tuple::compose(r, &tuple));
        }
    }

    if (cost as u16) < cost_limit
        && !tuple.relation.is_empty()
        && (strategy == OptimizeStrategy::Direct || tuple.l_principal_id.is_some())
    {
        let results = store
            .list_right(
                &tuple.space_id,
                &tuple.right(),
                None,
                None,
                cost_limit - cost as u16,
            )
            .await?;

        cost += results.len() as u32;
        for r in &results {
            if tuple.relation != r.strand {
                continue;
            }
            if strategy == OptimizeStrategy::Set && r.r_principal_id.is_none() {
                continue;
            }
            computed.push(Tuple::compose(&tuple, r));
        }
    }

    cost += 1; // primary tuple insert

    let signed_cost = if cost <= cost_limit as u32 {
        let mut kept = Vec::with_capacity(computed.len());
        for candidate in computed {
            match store.store(&candidate).await {
                Ok(()) => kept.push(candidate),
                Err(Error::AlreadyExists) => {}
                Err(err) => return Err(err),
            }
        }
        computed = kept;
        cost as i32
    } else {
        computed.clear();
        -(cost as i32)
    };

    Ok(CreateResult {
        tuple,
        computed,
        cost: signed_cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_strategy_is_the_default_meaning() {
        assert_eq!(OptimizeStrategy::Graph, OptimizeStrategy::Graph);
    }
}
