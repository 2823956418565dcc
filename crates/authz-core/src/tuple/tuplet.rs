use authz_id::Id;
use authz_storage::Storage;
use sqlx::Row;

use crate::error::Error;

use super::Entity;

/// A one-sided projection of a tuple: `{id, hash, relation, strand}`,
/// where `hash` is the far-side endpoint hash. Used by the evaluators to
/// walk the graph without carrying full tuple rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tuplet {
    pub id: Id,
    pub hash: i64,
    pub relation: String,
    pub strand: Option<String>,
}

/// Lists the tuplet projection from the side opposite `left`/`right`.
/// Exactly one of `left`/`right` must be given; both or neither is
/// `InvalidListArgs`.
pub async fn tuplets_list(
    storage: &Storage,
    space_id: &str,
    left: Option<&Entity>,
    right: Option<&Entity>,
    relation: Option<&str>,
    limit: u16,
) -> Result<Vec<Tuplet>, Error> {
    let (hash_col, strand_col, filter_col, filter_hash) = match (left, right) {
        (Some(_), Some(_)) | (None, None) => return Err(Error::InvalidListArgs),
        (Some(left), None) => ("_r_hash", "null", "_l_hash", left.hash()),
        (None, Some(right)) => ("_l_hash", "strand", "_r_hash", right.hash()),
    };

    let query = format!(
        "select _id, {hash_col} as hash, relation, {strand_col} as strand \
         from tuples where space_id = $1 and {filter_col} = $2 {relation_clause} \
         order by {hash_col} desc limit $3",
        relation_clause = if relation.is_some() {
            "and relation = $4"
        } else {
            ""
        },
    );

    let space_id = space_id.to_string();
    let relation = relation.map(str::to_string);
    let limit = crate::pagination::clamp_limit(limit);

    let rows = storage
        .with_retry(|pool| {
            let (query, space_id, relation) = (query.clone(), space_id.clone(), relation.clone());
            async move {
                let mut q = sqlx::query(&query)
                    .bind(space_id)
                    .bind(filter_hash)
                    .bind(limit as i64);
                if let Some(relation) = &relation {
                    q = q.bind(relation);
                }
                q.fetch_all(&pool).await
            }
        })
        .await
        .map_err(|err| Error::from(authz_storage::Error::from(&err)))?;

    rows.into_iter()
        .map(|row| {
            Ok(Tuplet {
                id: row.try_get("_id").map_err(to_core_error)?,
                hash: row.try_get("hash").map_err(to_core_error)?,
                relation: row.try_get("relation").map_err(to_core_error)?,
                strand: row.try_get("strand").map_err(to_core_error)?,
            })
        })
        .collect()
}

fn to_core_error(err: sqlx::Error) -> Error {
    Error::from(authz_storage::Error::from(&err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_matches_projection() {
        let t = Tuplet {
            id: Id::generate(),
            hash: 42,
            relation: "member".into(),
            strand: Some("owner".into()),
        };
        assert_eq!(t.hash, 42);
        assert_eq!(t.strand.as_deref(), Some("owner"));
    }
}
