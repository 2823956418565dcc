//! DB-backed coverage for the principal revision guard (§4.2/§4.3) and the
//! record store's descending, cursor-paginated listings (§4.10 scenario 5).

use authz_core::{Error, NewPrincipal, NewRecord, Principal, PrincipalStore, Record, RecordStore};
use authz_storage::Storage;

#[sqlx::test(migrations = "../../migrations")]
async fn stale_revision_on_store_is_a_revision_mismatch(pool: sqlx::PgPool) {
    let store = PrincipalStore::new(Storage::from_pool(pool));

    let created = store
        .store(&Principal::new(NewPrincipal {
            id: Some("user:jane".into()),
            space_id: "".into(),
            parent_id: None,
            attrs: None,
            segment: None,
        }))
        .await
        .unwrap();
    assert_eq!(created.rev, 0);

    // Out-of-band mutation: bump the row to rev 1 first.
    let mut bumped = created.clone();
    bumped.segment = Some("team-a".into());
    let bumped = store.store(&bumped).await.unwrap();
    assert_eq!(bumped.rev, 1);

    // The caller's in-memory copy is still at rev 0: its next store() must
    // fail, and its local rev must stay unchanged.
    let mut stale = created;
    stale.segment = Some("team-b".into());
    let err = store.store(&stale).await.unwrap_err();
    assert!(matches!(err, Error::RevisionMismatch));
    assert_eq!(stale.rev, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn record_listing_by_principal_paginates_newest_resource_id_first(pool: sqlx::PgPool) {
    let storage = Storage::from_pool(pool);
    let principals = PrincipalStore::new(storage.clone());
    let records = RecordStore::new(storage);

    principals
        .store(&Principal::new(NewPrincipal {
            id: Some("p".into()),
            space_id: "".into(),
            parent_id: None,
            attrs: None,
            segment: None,
        }))
        .await
        .unwrap();

    for resource_id in ["R0", "R1"] {
        records
            .store(&Record::new(NewRecord {
                space_id: "".into(),
                principal_id: "p".into(),
                resource_type: "T".into(),
                resource_id: resource_id.into(),
                attrs: None,
            }))
            .await
            .unwrap();
    }

    let page1 = records
        .list_by_principal("", "p", Some("T"), None, 1)
        .await
        .unwrap();
    assert_eq!(page1.len(), 1);
    assert_eq!(page1[0].resource_id, "R1");
    let token1 = authz_core::pagination_token_for_page(
        page1.last().map(|r| r.resource_id.as_str()),
        page1.len(),
        1,
    );
    assert!(token1.is_some());
    let cursor1 = authz_core::pagination_decode(token1.as_deref().unwrap()).unwrap();
    assert_eq!(cursor1, "R1");

    let page2 = records
        .list_by_principal("", "p", Some("T"), Some(&cursor1), 1)
        .await
        .unwrap();
    assert_eq!(page2.len(), 1);
    assert_eq!(page2[0].resource_id, "R0");
    let token2 = authz_core::pagination_token_for_page(
        page2.last().map(|r| r.resource_id.as_str()),
        page2.len(),
        1,
    );
    let cursor2 = authz_core::pagination_decode(token2.as_deref().unwrap()).unwrap();

    let page3 = records
        .list_by_principal("", "p", Some("T"), Some(&cursor2), 1)
        .await
        .unwrap();
    assert!(page3.is_empty());
}
