use std::collections::{HashSet, VecDeque};

use crate::error::Error;

use super::{Entity, Tuple, TupleStore};

/// Result of a graph traversal: cost spent and the path found, if any,
/// ordered from the query's left endpoint to its right endpoint.
pub struct GraphResult {
    pub cost: u32,
    pub path: Vec<Tuple>,
}

/// Vertex identity for the visited set: the vertex is marked visited on
/// pop, before fan-out, so re-enqueuing the same vertex from multiple
/// neighbors is harmless — it's simply skipped the second time it's
/// popped.
#[derive(Clone, PartialEq, Eq, Hash)]
struct VertexKey {
    strand: String,
    entity_type: String,
    entity_id: String,
}

struct Vertex {
    key: VertexKey,
    path: Vec<Tuple>,
}

/// BFS on the reversed relation graph, starting from the query's right
/// endpoint and walking backwards via `listLeft` until the query's left
/// endpoint is reached or `limit` vertices have been popped.
pub async fn graph(
    store: &TupleStore,
    space_id: &str,
    left: &Entity,
    relation: &str,
    right: &Entity,
    limit: u16,
) -> Result<GraphResult, Error> {
    let mut cost: u32 = 0;
    let mut queue: VecDeque<Vertex> = VecDeque::new();

    for t in store
        .list_left(space_id, right, Some(relation), None, limit)
        .await?
    {
        let key = VertexKey {
            strand: t.strand.clone(),
            entity_type: t.l_entity_type.clone(),
            entity_id: t.l_entity_id.clone(),
        };
        queue.push_back(Vertex {
            key,
            path: vec![t],
        });
    }

    let mut visited: HashSet<VertexKey> = HashSet::new();

    while let Some(v) = queue.pop_front() {
        if cost >= limit as u32 {
            break;
        }
        cost += 1;

        if visited.contains(&v.key) {
            continue;
        }
        visited.insert(v.key.clone());

        let vertex_entity = Entity::new(v.key.entity_type.clone(), v.key.entity_id.clone());
        for t in store
            .list_left(space_id, &vertex_entity, None, None, limit)
            .await?
        {
            if v.key.strand != t.relation {
                continue;
            }

            if t.l_entity_id == left.entity_id && t.l_entity_type == left.entity_type {
                let mut path = v.path.clone();
                path.insert(0, t);
                return Ok(GraphResult { cost, path });
            }

            let key = VertexKey {
                strand: t.strand.clone(),
                entity_type: t.l_entity_type.clone(),
                entity_id: t.l_entity_id.clone(),
            };
            let mut path = v.path.clone();
            path.insert(0, t);
            queue.push_back(Vertex { key, path });
        }
    }

    Ok(GraphResult {
        cost,
        path: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_identity_includes_strand_and_entity() {
        let a = VertexKey {
            strand: "member".into(),
            entity_type: "group".into(),
            entity_id: "editors".into(),
        };
        let b = VertexKey {
            strand: "owner".into(),
            entity_type: "group".into(),
            entity_id: "editors".into(),
        };
        assert_ne!(a, b);
    }
}
