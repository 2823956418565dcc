use authz_id::Id;
use authz_storage::Storage;
use sqlx::Row;

use crate::error::{is_unique_violation, map_constraint_violation, Error};
use super::{Entity, Tuple};

/// Persistent tuple storage: direct CRUD plus the ordered range scans the
/// evaluators walk.
#[derive(Clone)]
pub struct TupleStore {
    storage: Storage,
}

impl TupleStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Upsert on `_id`: a fresh id inserts at `_rev=0`; a re-stored existing
    /// id updates `attrs` and bumps `_rev`, guarded by `where t._rev =
    /// $caller_rev` the same way `principal.rs`'s `store` is guarded — a
    /// stale caller revision matches no row, mapped to `RevisionMismatch`.
    /// The separate composite key `(space_id, strand, l_endpoint, relation,
    /// r_endpoint)` unique index is untouched by the `on conflict` clause,
    /// so a collision there still raises a unique violation, mapped to
    /// `AlreadyExists`.
    pub async fn store(&self, tuple: &Tuple) -> Result<(), Error> {
        let result = self
            .storage
            .with_retry(|pool| {
                let tuple = tuple.clone();
                async move {
                    sqlx::query(
                        r#"
                        insert into tuples as t (
                            _id, _rev, space_id, strand,
                            l_entity_type, l_entity_id, l_principal_id,
                            relation,
                            r_entity_type, r_entity_id, r_principal_id,
                            attrs, _l_hash, _r_hash, rid_l, rid_r
                        ) values (
                            $1, $2, $3, $4,
                            $5, $6, $7,
                            $8,
                            $9, $10, $11,
                            $12, $13, $14, $15, $16
                        )
                        on conflict (_id)
                        do update
                            set (_rev, attrs) = (excluded._rev + 1, $12)
                            where t._rev = $2
                        returning _rev
                        "#,
                    )
                    .bind(tuple.id)
                    .bind(tuple.rev)
                    .bind(&tuple.space_id)
                    .bind(&tuple.strand)
                    .bind(&tuple.l_entity_type)
                    .bind(&tuple.l_entity_id)
                    .bind(&tuple.l_principal_id)
                    .bind(&tuple.relation)
                    .bind(&tuple.r_entity_type)
                    .bind(&tuple.r_entity_id)
                    .bind(&tuple.r_principal_id)
                    .bind(tuple.attrs.clone().map(sqlx::types::Json))
                    .bind(tuple.l_hash())
                    .bind(tuple.r_hash())
                    .bind(tuple.rid_l)
                    .bind(tuple.rid_r)
                    .fetch_optional(&pool)
                    .await
                }
            })
            .await;

        match result {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(Error::RevisionMismatch),
            Err(err) if is_unique_violation(&err) => Err(Error::AlreadyExists),
            Err(err) => Err(map_constraint_violation(
                err,
                Error::InvalidKey,
                Error::InvalidData("attrs must be a JSON object".into()),
            )),
        }
    }

    pub async fn discard(&self, id: Id) -> Result<(), Error> {
        self.storage
            .with_retry(|pool| async move {
                sqlx::query("delete from tuples where _id = $1")
                    .bind(id)
                    .execute(&pool)
                    .await
            })
            .await
            .map_err(sql_to_core_error)?;
        Ok(())
    }

    pub async fn retrieve(&self, id: Id) -> Result<Tuple, Error> {
        let row = self
            .storage
            .with_retry(|pool| async move {
                sqlx::query(&format!("{SELECT_COLUMNS} where _id = $1"))
                    .bind(id)
                    .fetch_optional(&pool)
                    .await
            })
            .await
            .map_err(sql_to_core_error)?;

        row.map(row_to_tuple).transpose()?.ok_or(Error::NotFound)
    }

    /// Exact match of the composite key, with `relation`/`strand` as
    /// optional extra filters. Returns at most one tuple.
    pub async fn lookup(
        &self,
        space_id: &str,
        left: &Entity,
        relation: Option<&str>,
        right: &Entity,
        strand: Option<&str>,
    ) -> Result<Option<Tuple>, Error> {
        let space_id = space_id.to_string();
        let left = left.clone();
        let right = right.clone();
        let relation = relation.map(str::to_string);
        let strand = strand.map(str::to_string);

        let row = self
            .storage
            .with_retry(|pool| {
                let (space_id, left, relation, right, strand) = (
                    space_id.clone(),
                    left.clone(),
                    relation.clone(),
                    right.clone(),
                    strand.clone(),
                );
                async move {
                    let mut qb = sqlx::QueryBuilder::new(SELECT_COLUMNS);
                    qb.push(" where space_id = ")
                        .push_bind(space_id)
                        .push(" and l_entity_type = ")
                        .push_bind(left.entity_type)
                        .push(" and l_entity_id = ")
                        .push_bind(left.entity_id)
                        .push(" and r_entity_type = ")
                        .push_bind(right.entity_type)
                        .push(" and r_entity_id = ")
                        .push_bind(right.entity_id);
                    if let Some(relation) = relation {
                        qb.push(" and relation = ").push_bind(relation);
                    }
                    if let Some(strand) = strand {
                        qb.push(" and strand = ").push_bind(strand);
                    }
                    qb.push(" limit 1");
                    qb.build().fetch_optional(&pool).await
                }
            })
            .await
            .map_err(sql_to_core_error)?;

        row.map(row_to_tuple).transpose()
    }

    /// Tuples whose right endpoint equals `right`, ordered by `_l_hash`
    /// descending, `lastId` as an exclusive cursor on the left entity id.
    /// `limit` is used as-is: evaluators pass `cost_limit` here, callers
    /// doing public pagination clamp it to the page-size bounds first.
    pub async fn list_left(
        &self,
        space_id: &str,
        right: &Entity,
        relation: Option<&str>,
        last_id: Option<&str>,
        limit: u16,
    ) -> Result<Vec<Tuple>, Error> {
        let rows = self
            .storage
            .with_retry(|pool| {
                let (space_id, right, relation, last_id) = (
                    space_id.to_string(),
                    right.clone(),
                    relation.map(str::to_string),
                    last_id.map(str::to_string),
                );
                async move {
                    let mut qb = sqlx::QueryBuilder::new(SELECT_COLUMNS);
                    qb.push(" where space_id = ")
                        .push_bind(space_id)
                        .push(" and r_entity_type = ")
                        .push_bind(right.entity_type)
                        .push(" and r_entity_id = ")
                        .push_bind(right.entity_id);
                    if let Some(relation) = &relation {
                        qb.push(" and relation = ").push_bind(relation.clone());
                    }
                    if let Some(last_id) = &last_id {
                        qb.push(" and l_entity_id < ").push_bind(last_id.clone());
                    }
                    qb.push(" order by _l_hash desc, l_entity_id desc limit ")
                        .push_bind(limit as i64);
                    qb.build().fetch_all(&pool).await
                }
            })
            .await
            .map_err(sql_to_core_error)?;

        rows.into_iter().map(row_to_tuple).collect()
    }

    /// Mirror of [`Self::list_left`]: tuples whose left endpoint equals
    /// `left`, ordered by `_r_hash` descending.
    pub async fn list_right(
        &self,
        space_id: &str,
        left: &Entity,
        relation: Option<&str>,
        last_id: Option<&str>,
        limit: u16,
    ) -> Result<Vec<Tuple>, Error> {
        let rows = self
            .storage
            .with_retry(|pool| {
                let (space_id, left, relation, last_id) = (
                    space_id.to_string(),
                    left.clone(),
                    relation.map(str::to_string),
                    last_id.map(str::to_string),
                );
                async move {
                    let mut qb = sqlx::QueryBuilder::new(SELECT_COLUMNS);
                    qb.push(" where space_id = ")
                        .push_bind(space_id)
                        .push(" and l_entity_type = ")
                        .push_bind(left.entity_type)
                        .push(" and l_entity_id = ")
                        .push_bind(left.entity_id);
                    if let Some(relation) = &relation {
                        qb.push(" and relation = ").push_bind(relation.clone());
                    }
                    if let Some(last_id) = &last_id {
                        qb.push(" and r_entity_id < ").push_bind(last_id.clone());
                    }
                    qb.push(" order by _r_hash desc, r_entity_id desc limit ")
                        .push_bind(limit as i64);
                    qb.build().fetch_all(&pool).await
                }
            })
            .await
            .map_err(sql_to_core_error)?;

        rows.into_iter().map(row_to_tuple).collect()
    }
}

const SELECT_COLUMNS: &str = r#"
    select
        _id, _rev, space_id, strand,
        l_entity_type, l_entity_id, l_principal_id,
        relation,
        r_entity_type, r_entity_id, r_principal_id,
        attrs, rid_l, rid_r
    from tuples
"#;

fn row_to_tuple(row: sqlx::postgres::PgRow) -> Result<Tuple, Error> {
    Ok(Tuple {
        id: row.try_get("_id").map_err(sql_to_core_error)?,
        rev: row.try_get("_rev").map_err(sql_to_core_error)?,
        space_id: row.try_get("space_id").map_err(sql_to_core_error)?,
        strand: row.try_get("strand").map_err(sql_to_core_error)?,
        l_entity_type: row.try_get("l_entity_type").map_err(sql_to_core_error)?,
        l_entity_id: row.try_get("l_entity_id").map_err(sql_to_core_error)?,
        l_principal_id: row.try_get("l_principal_id").map_err(sql_to_core_error)?,
        relation: row.try_get("relation").map_err(sql_to_core_error)?,
        r_entity_type: row.try_get("r_entity_type").map_err(sql_to_core_error)?,
        r_entity_id: row.try_get("r_entity_id").map_err(sql_to_core_error)?,
        r_principal_id: row.try_get("r_principal_id").map_err(sql_to_core_error)?,
        attrs: row
            .try_get::<Option<sqlx::types::Json<serde_json::Value>>, _>("attrs")
            .map_err(sql_to_core_error)?
            .map(|json| json.0),
        rid_l: row.try_get("rid_l").map_err(sql_to_core_error)?,
        rid_r: row.try_get("rid_r").map_err(sql_to_core_error)?,
    })
}

fn sql_to_core_error(err: sqlx::Error) -> Error {
    Error::from(authz_storage::Error::from(&err))
}
