use authz_core::{PrincipalStore, RecordStore, TupleStore};

/// Shared handler state: the three stores plus the per-process defaults a
/// caller may leave unspecified (`cost_limit` on checks/creates, the page
/// size ceiling on listings).
#[derive(Clone)]
pub struct AppState {
    pub principals: PrincipalStore,
    pub records: RecordStore,
    pub tuples: TupleStore,
    pub default_cost_limit: u16,
    pub pagination_limit_max: u16,
}

impl AppState {
    pub fn new(
        storage: authz_storage::Storage,
        default_cost_limit: u16,
        pagination_limit_max: u16,
    ) -> Self {
        Self {
            principals: PrincipalStore::new(storage.clone()),
            records: RecordStore::new(storage.clone()),
            tuples: TupleStore::new(storage),
            default_cost_limit,
            pagination_limit_max,
        }
    }
}
