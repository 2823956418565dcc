use crate::error::Error;

use super::{Entity, Tuple, TupleStore};

/// Result of a set-evaluator probe: cost spent, and the composed tuple
/// found, if any.
pub struct SetResult {
    pub cost: u32,
    pub tuple: Option<Tuple>,
}

/// Two-pointer ordered merge over `listRight(left)` and `listLeft(right)`.
/// Finds exactly the depth-1 composition: one intermediate vertex joining
/// `left`'s fan-out to `right`'s fan-in.
pub async fn spot(
    store: &TupleStore,
    space_id: &str,
    left: &Entity,
    relation: &str,
    right: &Entity,
    limit: u16,
) -> Result<SetResult, Error> {
    let t1 = store.list_right(space_id, left, None, None, limit).await?;
    let t2 = store
        .list_left(space_id, right, Some(relation), None, limit)
        .await?;

    let mut cost: u32 = 0;
    let mut i = 0usize;
    let mut j = 0usize;

    while i < t1.len() && j < t2.len() {
        cost += 1;

        let a = &t1[i];
        let b = &t2[j];
        let ord = a.r_entity_id.cmp(&b.l_entity_id);

        if ord == std::cmp::Ordering::Equal {
            if a.relation == b.strand && a.r_entity_type == b.l_entity_type {
                return Ok(SetResult {
                    cost,
                    tuple: Some(Tuple::compose(a, b)),
                });
            } else {
                i += 1;
            }
        }

        // Mirrors the source's fallthrough: a tie on id with a type/relation
        // mismatch advances both pointers (i above, j here), not just one.
        if ord == std::cmp::Ordering::Greater {
            i += 1;
        } else {
            j += 1;
        }
    }

    Ok(SetResult { cost, tuple: None })
}
