use authz_storage::Storage;
use serde::{Deserialize, Serialize};
use sqlx::Row;

use crate::error::{map_constraint_violation, Error};
use crate::pagination;

/// A principal: an identity that can be the subject of a record or an
/// endpoint of a tuple.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub space_id: String,
    pub rev: i32,
    pub parent_id: Option<String>,
    pub attrs: Option<serde_json::Value>,
    pub segment: Option<String>,
}

/// Fields a caller supplies to create or update a principal. `id` is
/// assigned (a sortable id) if absent.
#[derive(Clone, Debug, Default)]
pub struct NewPrincipal {
    pub id: Option<String>,
    pub space_id: String,
    pub parent_id: Option<String>,
    pub attrs: Option<serde_json::Value>,
    pub segment: Option<String>,
}

impl Principal {
    /// Builds a new, unstored principal: assigns a sortable id when the
    /// caller didn't supply one, starts at `_rev=0`.
    pub fn new(new: NewPrincipal) -> Self {
        Principal {
            id: new.id.unwrap_or_else(|| authz_id::Id::generate().to_string()),
            space_id: new.space_id,
            rev: 0,
            parent_id: new.parent_id,
            attrs: new.attrs,
            segment: new.segment,
        }
    }
}

fn validate_attrs(attrs: &Option<serde_json::Value>) -> Result<(), Error> {
    match attrs {
        Some(serde_json::Value::Object(_)) | None => Ok(()),
        Some(_) => Err(Error::InvalidData("attrs must be a JSON object".into())),
    }
}

fn validate_segment(segment: &Option<String>) -> Result<(), Error> {
    match segment {
        Some(s) if s.is_empty() => Err(Error::InvalidData(
            "segment must be non-empty when present".into(),
        )),
        _ => Ok(()),
    }
}

#[derive(Clone)]
pub struct PrincipalStore {
    storage: Storage,
}

impl PrincipalStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub async fn retrieve(&self, space_id: &str, id: &str) -> Result<Principal, Error> {
        let space_id = space_id.to_string();
        let id = id.to_string();

        let row = self
            .storage
            .with_retry(|pool| {
                let (space_id, id) = (space_id.clone(), id.clone());
                async move {
                    sqlx::query(
                        "select id, space_id, _rev, parent_id, attrs, segment \
                         from principals where space_id = $1 and id = $2",
                    )
                    .bind(space_id)
                    .bind(id)
                    .fetch_optional(&pool)
                    .await
                }
            })
            .await
            .map_err(sql_to_core_error)?;

        row.map(row_to_principal)
            .transpose()?
            .ok_or(Error::NotFound)
    }

    /// Revision-guarded upsert. `new.id` absent means "create": a fresh id
    /// is assigned and `_rev` starts at 0. `new.id` present means "update
    /// at this revision": a stale caller revision (checked by the caller
    /// before calling this, since the revision lives on `Principal`, not
    /// `NewPrincipal`) causes the `WHERE _rev = $caller_rev` clause to
    /// match nothing, which this maps to `RevisionMismatch`.
    pub async fn store(&self, principal: &Principal) -> Result<Principal, Error> {
        validate_attrs(&principal.attrs)?;
        validate_segment(&principal.segment)?;

        let row = self
            .storage
            .with_retry(|pool| {
                let p = principal.clone();
                async move {
                    sqlx::query(
                        r#"
                        insert into principals as t (id, space_id, _rev, parent_id, attrs, segment)
                        values ($1, $2, $3, $4, $5, $6)
                        on conflict (space_id, id)
                        do update
                            set (_rev, parent_id, attrs, segment) =
                                (excluded._rev + 1, $4, $5, $6)
                            where t._rev = $3
                        returning id, space_id, _rev, parent_id, attrs, segment
                        "#,
                    )
                    .bind(&p.id)
                    .bind(&p.space_id)
                    .bind(p.rev)
                    .bind(&p.parent_id)
                    .bind(p.attrs.clone().map(sqlx::types::Json))
                    .bind(&p.segment)
                    .fetch_optional(&pool)
                    .await
                }
            })
            .await;

        let row = match row {
            Ok(row) => row,
            Err(err) => {
                return Err(map_constraint_violation(
                    err,
                    Error::InvalidParentId,
                    Error::InvalidData("attrs must be a JSON object".into()),
                ))
            }
        };

        row.map(row_to_principal)
            .transpose()?
            .ok_or(Error::RevisionMismatch)
    }

    /// Deletes a principal, returning whether it existed. Foreign-key
    /// refusals (referenced by a record or a tuple principal endpoint)
    /// surface as `InvalidKey`.
    pub async fn discard(&self, space_id: &str, id: &str) -> Result<bool, Error> {
        let space_id = space_id.to_string();
        let id = id.to_string();

        let result = self
            .storage
            .with_retry(|pool| {
                let (space_id, id) = (space_id.clone(), id.clone());
                async move {
                    sqlx::query("delete from principals where space_id = $1 and id = $2")
                        .bind(space_id)
                        .bind(id)
                        .execute(&pool)
                        .await
                }
            })
            .await;

        match result {
            Ok(result) => Ok(result.rows_affected() > 0),
            Err(err) => Err(map_constraint_violation(
                err,
                Error::InvalidKey,
                Error::InvalidKey,
            )),
        }
    }

    /// Children of `parent_id` within a space, ordered by id, paginated
    /// by an exclusive cursor on id.
    pub async fn list_children(
        &self,
        space_id: &str,
        parent_id: &str,
        last_id: Option<&str>,
        limit: u16,
    ) -> Result<Vec<Principal>, Error> {
        let limit = pagination::clamp_limit(limit);
        let space_id = space_id.to_string();
        let parent_id = parent_id.to_string();
        let last_id = last_id.map(str::to_string);

        let rows = self
            .storage
            .with_retry(|pool| {
                let (space_id, parent_id, last_id) =
                    (space_id.clone(), parent_id.clone(), last_id.clone());
                async move {
                    let mut qb = sqlx::QueryBuilder::new(
                        "select id, space_id, _rev, parent_id, attrs, segment from principals \
                         where space_id = ",
                    );
                    qb.push_bind(space_id)
                        .push(" and parent_id = ")
                        .push_bind(parent_id);
                    if let Some(last_id) = last_id {
                        qb.push(" and id > ").push_bind(last_id);
                    }
                    qb.push(" order by id asc limit ").push_bind(limit as i64);
                    qb.build().fetch_all(&pool).await
                }
            })
            .await
            .map_err(sql_to_core_error)?;

        rows.into_iter().map(row_to_principal).collect()
    }
}

fn row_to_principal(row: sqlx::postgres::PgRow) -> Result<Principal, Error> {
    Ok(Principal {
        id: row.try_get("id").map_err(sql_to_core_error)?,
        space_id: row.try_get("space_id").map_err(sql_to_core_error)?,
        rev: row.try_get("_rev").map_err(sql_to_core_error)?,
        parent_id: row.try_get("parent_id").map_err(sql_to_core_error)?,
        attrs: row
            .try_get::<Option<sqlx::types::Json<serde_json::Value>>, _>("attrs")
            .map_err(sql_to_core_error)?
            .map(|json| json.0),
        segment: row.try_get("segment").map_err(sql_to_core_error)?,
    })
}

fn sql_to_core_error(err: sqlx::Error) -> Error {
    Error::from(authz_storage::Error::from(&err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_object_attrs() {
        assert!(validate_attrs(&Some(serde_json::json!("not-an-object"))).is_err());
        assert!(validate_attrs(&Some(serde_json::json!({"a": 1}))).is_ok());
        assert!(validate_attrs(&None).is_ok());
    }

    #[test]
    fn rejects_empty_segment() {
        assert!(validate_segment(&Some("".into())).is_err());
        assert!(validate_segment(&Some("team-a".into())).is_ok());
        assert!(validate_segment(&None).is_ok());
    }
}
