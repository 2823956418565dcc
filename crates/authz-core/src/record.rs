use authz_storage::Storage;
use serde::{Deserialize, Serialize};
use sqlx::Row;

use crate::error::{map_constraint_violation, Error};
use crate::pagination;

/// A grant linking a principal to a `(resource_type, resource_id)` with
/// optional attributes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub space_id: String,
    pub rev: i32,
    pub principal_id: String,
    pub resource_type: String,
    pub resource_id: String,
    pub attrs: Option<serde_json::Value>,
}

#[derive(Clone, Debug)]
pub struct NewRecord {
    pub space_id: String,
    pub principal_id: String,
    pub resource_type: String,
    pub resource_id: String,
    pub attrs: Option<serde_json::Value>,
}

impl Record {
    pub fn new(new: NewRecord) -> Self {
        Record {
            space_id: new.space_id,
            rev: 0,
            principal_id: new.principal_id,
            resource_type: new.resource_type,
            resource_id: new.resource_id,
            attrs: new.attrs,
        }
    }
}

fn validate_attrs(attrs: &Option<serde_json::Value>) -> Result<(), Error> {
    match attrs {
        Some(serde_json::Value::Object(_)) | None => Ok(()),
        Some(_) => Err(Error::InvalidData("attrs must be a JSON object".into())),
    }
}

#[derive(Clone)]
pub struct RecordStore {
    storage: Storage,
}

impl RecordStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Upsert keyed by `(space_id, principal_id, resource_type,
    /// resource_id)`. `attrs` is overwritten and `_rev` increments on
    /// every call, matching the grant semantics: granting again just
    /// updates attributes.
    pub async fn store(&self, record: &Record) -> Result<Record, Error> {
        validate_attrs(&record.attrs)?;

        let row = self
            .storage
            .with_retry(|pool| {
                let r = record.clone();
                async move {
                    sqlx::query(
                        r#"
                        insert into records as t (
                            space_id, principal_id, resource_type, resource_id, attrs, _rev
                        ) values ($1, $2, $3, $4, $5, 0)
                        on conflict (space_id, principal_id, resource_type, resource_id)
                        do update set (attrs, _rev) = ($5, t._rev + 1)
                        returning space_id, principal_id, resource_type, resource_id, attrs, _rev
                        "#,
                    )
                    .bind(&r.space_id)
                    .bind(&r.principal_id)
                    .bind(&r.resource_type)
                    .bind(&r.resource_id)
                    .bind(r.attrs.clone().map(sqlx::types::Json))
                    .fetch_one(&pool)
                    .await
                }
            })
            .await
            .map_err(|err| {
                map_constraint_violation(
                    err,
                    Error::InvalidKey,
                    Error::InvalidData("attrs must be a JSON object".into()),
                )
            })?;

        row_to_record(row)
    }

    pub async fn discard(
        &self,
        space_id: &str,
        principal_id: &str,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<(), Error> {
        let (space_id, principal_id, resource_type, resource_id) = (
            space_id.to_string(),
            principal_id.to_string(),
            resource_type.to_string(),
            resource_id.to_string(),
        );
        self.storage
            .with_retry(|pool| {
                let (space_id, principal_id, resource_type, resource_id) = (
                    space_id.clone(),
                    principal_id.clone(),
                    resource_type.clone(),
                    resource_id.clone(),
                );
                async move {
                    sqlx::query(
                        "delete from records where space_id = $1 and principal_id = $2 \
                         and resource_type = $3 and resource_id = $4",
                    )
                    .bind(space_id)
                    .bind(principal_id)
                    .bind(resource_type)
                    .bind(resource_id)
                    .execute(&pool)
                    .await
                }
            })
            .await
            .map_err(sql_to_core_error)?;
        Ok(())
    }

    pub async fn lookup(
        &self,
        space_id: &str,
        principal_id: &str,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Record, Error> {
        let (space_id, principal_id, resource_type, resource_id) = (
            space_id.to_string(),
            principal_id.to_string(),
            resource_type.to_string(),
            resource_id.to_string(),
        );
        let row = self
            .storage
            .with_retry(|pool| {
                let (space_id, principal_id, resource_type, resource_id) = (
                    space_id.clone(),
                    principal_id.clone(),
                    resource_type.clone(),
                    resource_id.clone(),
                );
                async move {
                    sqlx::query(
                        "select space_id, principal_id, resource_type, resource_id, attrs, _rev \
                         from records where space_id = $1 and principal_id = $2 \
                         and resource_type = $3 and resource_id = $4",
                    )
                    .bind(space_id)
                    .bind(principal_id)
                    .bind(resource_type)
                    .bind(resource_id)
                    .fetch_optional(&pool)
                    .await
                }
            })
            .await
            .map_err(sql_to_core_error)?;

        row.map(row_to_record).transpose()?.ok_or(Error::NotFound)
    }

    /// Lists records for one principal, ordered by `(resource_type,
    /// resource_id)` descending (most recently ordered ids first), so a
    /// page of size 1 walks newest-to-oldest like the tuple hash listings;
    /// paginated by an exclusive cursor on resource id.
    pub async fn list_by_principal(
        &self,
        space_id: &str,
        principal_id: &str,
        resource_type: Option<&str>,
        last_id: Option<&str>,
        limit: u16,
    ) -> Result<Vec<Record>, Error> {
        let limit = pagination::clamp_limit(limit);
        let (space_id, principal_id, resource_type, last_id) = (
            space_id.to_string(),
            principal_id.to_string(),
            resource_type.map(str::to_string),
            last_id.map(str::to_string),
        );

        let rows = self
            .storage
            .with_retry(|pool| {
                let (space_id, principal_id, resource_type, last_id) = (
                    space_id.clone(),
                    principal_id.clone(),
                    resource_type.clone(),
                    last_id.clone(),
                );
                async move {
                    let mut qb = sqlx::QueryBuilder::new(
                        "select space_id, principal_id, resource_type, resource_id, attrs, _rev \
                         from records where space_id = ",
                    );
                    qb.push_bind(space_id)
                        .push(" and principal_id = ")
                        .push_bind(principal_id);
                    if let Some(resource_type) = resource_type {
                        qb.push(" and resource_type = ").push_bind(resource_type);
                    }
                    if let Some(last_id) = last_id {
                        qb.push(" and resource_id < ").push_bind(last_id);
                    }
                    qb.push(" order by resource_type asc, resource_id desc limit ")
                        .push_bind(limit as i64);
                    qb.build().fetch_all(&pool).await
                }
            })
            .await
            .map_err(sql_to_core_error)?;

        rows.into_iter().map(row_to_record).collect()
    }

    /// Lists the principals holding a record on `(resource_type,
    /// resource_id)`, paginated by an exclusive cursor on principal id.
    pub async fn list_by_resource(
        &self,
        space_id: &str,
        resource_type: &str,
        resource_id: &str,
        last_id: Option<&str>,
        limit: u16,
    ) -> Result<Vec<Record>, Error> {
        let limit = pagination::clamp_limit(limit);
        let (space_id, resource_type, resource_id, last_id) = (
            space_id.to_string(),
            resource_type.to_string(),
            resource_id.to_string(),
            last_id.map(str::to_string),
        );

        let rows = self
            .storage
            .with_retry(|pool| {
                let (space_id, resource_type, resource_id, last_id) = (
                    space_id.clone(),
                    resource_type.clone(),
                    resource_id.clone(),
                    last_id.clone(),
                );
                async move {
                    let mut qb = sqlx::QueryBuilder::new(
                        "select space_id, principal_id, resource_type, resource_id, attrs, _rev \
                         from records where space_id = ",
                    );
                    qb.push_bind(space_id)
                        .push(" and resource_type = ")
                        .push_bind(resource_type)
                        .push(" and resource_id = ")
                        .push_bind(resource_id);
                    if let Some(last_id) = last_id {
                        qb.push(" and principal_id < ").push_bind(last_id);
                    }
                    qb.push(" order by principal_id desc limit ")
                        .push_bind(limit as i64);
                    qb.build().fetch_all(&pool).await
                }
            })
            .await
            .map_err(sql_to_core_error)?;

        rows.into_iter().map(row_to_record).collect()
    }
}

fn row_to_record(row: sqlx::postgres::PgRow) -> Result<Record, Error> {
    Ok(Record {
        space_id: row.try_get("space_id").map_err(sql_to_core_error)?,
        principal_id: row.try_get("principal_id").map_err(sql_to_core_error)?,
        resource_type: row.try_get("resource_type").map_err(sql_to_core_error)?,
        resource_id: row.try_get("resource_id").map_err(sql_to_core_error)?,
        attrs: row
            .try_get::<Option<sqlx::types::Json<serde_json::Value>>, _>("attrs")
            .map_err(sql_to_core_error)?
            .map(|json| json.0),
        rev: row.try_get("_rev").map_err(sql_to_core_error)?,
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
        assert!(validate_attrs(&Some(serde_json::json!([1, 2]))).is_err());
        assert!(validate_attrs(&Some(serde_json::json!({"role": "viewer"}))).is_ok());
    }
}
