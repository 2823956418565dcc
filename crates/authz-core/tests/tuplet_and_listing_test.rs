//! DB-backed coverage for the tuplet projection's argument validation and
//! the ordered range-scan pagination contract (spec.md §4.4/§4.10).

use authz_core::{tuplets_list, Endpoint, Entity, Error, NewTuple, Tuple};
use authz_storage::Storage;

#[sqlx::test(migrations = "../../migrations")]
async fn tuplets_list_rejects_zero_or_two_endpoints(pool: sqlx::PgPool) {
    let storage = Storage::from_pool(pool);

    let err = tuplets_list(&storage, "", None, None, None, 30)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidListArgs));

    let left = Entity::new("group", "editors");
    let right = Entity::new("group", "viewers");
    let err = tuplets_list(&storage, "", Some(&left), Some(&right), None, 30)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidListArgs));
}

#[sqlx::test(migrations = "../../migrations")]
async fn list_left_pagination_walks_in_the_same_order_regardless_of_page_size(
    pool: sqlx::PgPool,
) {
    let store = authz_core::TupleStore::new(Storage::from_pool(pool));
    let right = Entity::new("group", "viewers");

    for k in 0..12 {
        let tuple = Tuple::new(NewTuple {
            space_id: "".into(),
            strand: "".into(),
            left: Endpoint::Entity(Entity::new("user", format!("u{k}"))),
            relation: "member".into(),
            right: Endpoint::Entity(right.clone()),
            attrs: None,
        });
        store.store(&tuple).await.unwrap();
    }

    let all_at_once = store
        .list_left("", &right, Some("member"), None, 30)
        .await
        .unwrap();
    assert_eq!(all_at_once.len(), 12);

    let mut walked = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = store
            .list_left("", &right, Some("member"), cursor.as_deref(), 1)
            .await
            .unwrap();
        if page.is_empty() {
            break;
        }
        cursor = Some(page[0].l_entity_id.clone());
        walked.push(page[0].l_entity_id.clone());
    }

    let all_ids: Vec<String> = all_at_once.iter().map(|t| t.l_entity_id.clone()).collect();
    assert_eq!(walked, all_ids);
}
