//! DB-backed integration tests for the check evaluators (C6-C8) and the
//! optimizer writer (C9), exercising the scenarios in spec.md's testable
//! properties section against a real Postgres instance.

use authz_core::{
    check, create, Endpoint, Entity, NewTuple, OptimizeStrategy, Strategy, Tuple, TupleStore,
};
use authz_storage::Storage;

fn entity(ty: &str, id: &str) -> Entity {
    Entity::new(ty, id)
}

async fn seed(store: &TupleStore, space_id: &str, strand: &str, left: Entity, relation: &str, right: Entity) -> Tuple {
    let tuple = Tuple::new(NewTuple {
        space_id: space_id.to_string(),
        strand: strand.to_string(),
        left: Endpoint::Entity(left),
        relation: relation.to_string(),
        right: Endpoint::Entity(right),
        attrs: None,
    });
    store.store(&tuple).await.unwrap();
    tuple
}

#[sqlx::test(migrations = "../../migrations")]
async fn direct_check_finds_a_stored_tuple(pool: sqlx::PgPool) {
    let store = TupleStore::new(Storage::from_pool(pool));

    seed(
        &store,
        "",
        "",
        entity("user", "jane"),
        "member",
        entity("group", "viewers"),
    )
    .await;

    let result = check(
        &store,
        "",
        &entity("user", "jane"),
        "member",
        &entity("group", "viewers"),
        Strategy::Direct,
        1000,
    )
    .await
    .unwrap();

    assert!(result.found);
    assert_eq!(result.cost, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn graph_strategy_finds_a_two_hop_path(pool: sqlx::PgPool) {
    let store = TupleStore::new(Storage::from_pool(pool));

    // user:jane --member--> group:editors, strand "member"
    seed(
        &store,
        "",
        "member",
        entity("user", "jane"),
        "member",
        entity("group", "editors"),
    )
    .await;
    // group:editors --parent--> group:viewers, strand "member" so the
    // incoming edge's relation ("member") matches this vertex's strand.
    seed(
        &store,
        "",
        "member",
        entity("group", "editors"),
        "parent",
        entity("group", "viewers"),
    )
    .await;

    let result = check(
        &store,
        "",
        &entity("user", "jane"),
        "parent",
        &entity("group", "viewers"),
        Strategy::Graph,
        100,
    )
    .await
    .unwrap();

    assert!(result.found);
    assert!(result.cost > 0 && result.cost <= 100);
    match result.outcome {
        authz_core::CheckOutcome::Path(path) => {
            assert_eq!(path.len(), 2);
            assert_eq!(path[0].l_entity_id, "jane");
            assert_eq!(path.last().unwrap().r_entity_id, "viewers");
            assert_eq!(path.last().unwrap().relation, "parent");
        }
        _ => panic!("expected a path outcome"),
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn set_strategy_finds_exactly_the_depth_one_composition(pool: sqlx::PgPool) {
    let store = TupleStore::new(Storage::from_pool(pool));

    seed(
        &store,
        "",
        "member",
        entity("user", "jane"),
        "member",
        entity("group", "editors"),
    )
    .await;
    seed(
        &store,
        "",
        "",
        entity("group", "editors"),
        "parent",
        entity("group", "viewers"),
    )
    .await;

    let result = check(
        &store,
        "",
        &entity("user", "jane"),
        "parent",
        &entity("group", "viewers"),
        Strategy::Set,
        1000,
    )
    .await
    .unwrap();

    assert!(result.found);
}

#[sqlx::test(migrations = "../../migrations")]
async fn optimizer_materializes_left_expansion_from_a_single_matching_seed(pool: sqlx::PgPool) {
    let store = TupleStore::new(Storage::from_pool(pool));

    // Eight distinct groups, each with its own (user:jane, member, group:editors_k)
    // seed tuple, so only one of them shares a right endpoint with the
    // tuple we're about to create.
    for k in 1..=8 {
        seed(
            &store,
            "",
            "",
            entity("user", "jane"),
            "member",
            entity("group", &format!("editors_{k}")),
        )
        .await;
    }

    let tuple = Tuple::new(NewTuple {
        space_id: "".into(),
        strand: "member".into(),
        left: Endpoint::Entity(entity("group", "editors_5")),
        relation: "parent".into(),
        right: Endpoint::Entity(entity("group", "viewers")),
        attrs: None,
    });

    let result = create(&store, tuple, OptimizeStrategy::Direct, 1000)
        .await
        .unwrap();

    assert!(result.cost > 0);
    assert_eq!(result.computed.len(), 1);
    assert_eq!(result.computed[0].l_entity_id, "jane");
    assert_eq!(result.computed[0].r_entity_id, "viewers");
    assert_eq!(result.computed[0].relation, "parent");

    let check_result = check(
        &store,
        "",
        &entity("user", "jane"),
        "parent",
        &entity("group", "viewers"),
        Strategy::Direct,
        1000,
    )
    .await
    .unwrap();

    assert!(check_result.found);
    assert_eq!(check_result.cost, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn restoring_the_same_composite_key_is_already_exists_not_a_duplicate(pool: sqlx::PgPool) {
    let store = TupleStore::new(Storage::from_pool(pool));

    seed(
        &store,
        "",
        "",
        entity("user", "jane"),
        "member",
        entity("group", "viewers"),
    )
    .await;

    let dup = Tuple::new(NewTuple {
        space_id: "".into(),
        strand: "".into(),
        left: Endpoint::Entity(entity("user", "jane")),
        relation: "member".into(),
        right: Endpoint::Entity(entity("group", "viewers")),
        attrs: None,
    });

    let err = store.store(&dup).await.unwrap_err();
    assert!(matches!(err, authz_core::Error::AlreadyExists));
}

#[sqlx::test(migrations = "../../migrations")]
async fn restoring_the_same_id_upserts_under_a_revision_guard(pool: sqlx::PgPool) {
    let store = TupleStore::new(Storage::from_pool(pool));

    let mut tuple = Tuple::new(NewTuple {
        space_id: "".into(),
        strand: "".into(),
        left: Endpoint::Entity(entity("user", "jane")),
        relation: "member".into(),
        right: Endpoint::Entity(entity("group", "viewers")),
        attrs: None,
    });
    store.store(&tuple).await.unwrap();
    assert_eq!(tuple.rev, 0);

    // Re-storing the same `_id` at the caller's known revision upserts and
    // bumps `_rev`, rather than colliding with the composite key's own
    // unique index and returning `AlreadyExists`.
    tuple.attrs = Some(serde_json::json!({"note": "updated"}));
    store.store(&tuple).await.unwrap();

    let reloaded = store.retrieve(tuple.id).await.unwrap();
    assert_eq!(reloaded.rev, 1);
    assert_eq!(reloaded.attrs, tuple.attrs);

    // The caller's stale in-memory copy (still at rev 0) now fails.
    let mut stale = tuple.clone();
    stale.rev = 0;
    let err = store.store(&stale).await.unwrap_err();
    assert!(matches!(err, authz_core::Error::RevisionMismatch));
}
