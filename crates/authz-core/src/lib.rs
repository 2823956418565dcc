pub mod error;
mod pagination;
mod principal;
mod record;
mod tuple;

pub use error::Error;
pub use pagination::{
    clamp_limit, decode as pagination_decode, encode as pagination_encode,
    token_for_page as pagination_token_for_page, DEFAULT_LIMIT, MAX_LIMIT,
};
pub use principal::{NewPrincipal, Principal, PrincipalStore};
pub use record::{NewRecord, Record, RecordStore};
pub use tuple::{
    check, create, entity_hash, tuplets_list, CheckOutcome, CheckResult, CreateResult, Endpoint,
    Entity, NewTuple, OptimizeStrategy, Strategy, Tuple, TupleStore, Tuplet,
    DEFAULT_COST_LIMIT, PRINCIPAL_ENTITY_TYPE,
};
