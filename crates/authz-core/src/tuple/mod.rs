mod check;
mod graph;
mod optimizer;
mod set;
mod store;
mod tuplet;

pub use check::{check, CheckOutcome, CheckResult, Strategy, DEFAULT_COST_LIMIT};
pub use optimizer::{create, CreateResult, OptimizeStrategy};
pub use store::TupleStore;
pub use tuplet::{tuplets_list, Tuplet};

use serde::{Deserialize, Serialize};

use authz_id::Id;

/// The entity type assigned to a tuple endpoint when that endpoint is a
/// principal rather than an arbitrary `(type, id)` pair.
pub const PRINCIPAL_ENTITY_TYPE: &str = "principal";

/// One side of a tuple: a typed, addressable object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_type: String,
    pub entity_id: String,
}

impl Entity {
    pub fn new(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
        }
    }

    pub fn principal(principal_id: impl Into<String>) -> Self {
        Self {
            entity_type: PRINCIPAL_ENTITY_TYPE.to_string(),
            entity_id: principal_id.into(),
        }
    }

    pub fn hash(&self) -> i64 {
        entity_hash(&self.entity_type, &self.entity_id)
    }
}

/// FNV-1a over `type:id`. Stored alongside each tuple as `_l_hash`/`_r_hash`
/// so the tuplet projection and both evaluators can walk the graph keyed on
/// a fixed-width integer instead of comparing strings.
pub fn entity_hash(entity_type: &str, entity_id: &str) -> i64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    let mut hash = OFFSET;
    for byte in entity_type
        .as_bytes()
        .iter()
        .chain(b":")
        .chain(entity_id.as_bytes())
    {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash as i64
}

/// A directed relationship tuple.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tuple {
    pub id: Id,
    pub rev: i32,
    pub space_id: String,

    pub strand: String,

    pub l_entity_type: String,
    pub l_entity_id: String,
    pub l_principal_id: Option<String>,

    pub relation: String,

    pub r_entity_type: String,
    pub r_entity_id: String,
    pub r_principal_id: Option<String>,

    pub attrs: Option<serde_json::Value>,

    /// Back-references to the two tuples a computed tuple was composed
    /// from. `None` for tuples created directly.
    pub rid_l: Option<Id>,
    pub rid_r: Option<Id>,
}

/// Fields a caller supplies to construct a new tuple; `id`/`rev`/`rid_l`/
/// `rid_r` are assigned by the store.
#[derive(Clone, Debug)]
pub struct NewTuple {
    pub space_id: String,
    pub strand: String,
    pub left: Endpoint,
    pub relation: String,
    pub right: Endpoint,
    pub attrs: Option<serde_json::Value>,
}

/// Either side of a tuple as supplied by a caller: a principal id, or an
/// explicit `(entity_type, entity_id)` pair.
#[derive(Clone, Debug)]
pub enum Endpoint {
    Principal(String),
    Entity(Entity),
}

impl Endpoint {
    /// The entity this endpoint sanitizes to: principal endpoints are
    /// always addressed as `(PRINCIPAL_ENTITY_TYPE, principal_id)`.
    pub fn entity(&self) -> Entity {
        match self {
            Endpoint::Principal(id) => Entity::principal(id.clone()),
            Endpoint::Entity(e) => e.clone(),
        }
    }

    pub fn principal_id(&self) -> Option<&str> {
        match self {
            Endpoint::Principal(id) => Some(id),
            Endpoint::Entity(_) => None,
        }
    }
}

impl Tuple {
    pub fn new(new: NewTuple) -> Self {
        let left = new.left.entity();
        let right = new.right.entity();

        Tuple {
            id: Id::generate(),
            rev: 0,
            space_id: new.space_id,
            strand: new.strand,
            l_entity_type: left.entity_type,
            l_entity_id: left.entity_id,
            l_principal_id: new.left.principal_id().map(str::to_string),
            relation: new.relation,
            r_entity_type: right.entity_type,
            r_entity_id: right.entity_id,
            r_principal_id: new.right.principal_id().map(str::to_string),
            attrs: new.attrs,
            rid_l: None,
            rid_r: None,
        }
    }

    pub fn left(&self) -> Entity {
        Entity::new(self.l_entity_type.clone(), self.l_entity_id.clone())
    }

    pub fn right(&self) -> Entity {
        Entity::new(self.r_entity_type.clone(), self.r_entity_id.clone())
    }

    pub fn l_hash(&self) -> i64 {
        entity_hash(&self.l_entity_type, &self.l_entity_id)
    }

    pub fn r_hash(&self) -> i64 {
        entity_hash(&self.r_entity_type, &self.r_entity_id)
    }

    /// Enforces the endpoint invariant after a principal id is assigned:
    /// the entity type/id on that side are overwritten to the canonical
    /// principal form. Called by every setter that touches a principal id.
    fn sanitise(&mut self) {
        if let Some(pid) = &self.l_principal_id {
            self.l_entity_type = PRINCIPAL_ENTITY_TYPE.to_string();
            self.l_entity_id = pid.clone();
        }
        if let Some(pid) = &self.r_principal_id {
            self.r_entity_type = PRINCIPAL_ENTITY_TYPE.to_string();
            self.r_entity_id = pid.clone();
        }
    }

    pub fn set_l_principal_id(&mut self, pid: impl Into<String>) {
        self.l_principal_id = Some(pid.into());
        self.sanitise();
    }

    pub fn set_r_principal_id(&mut self, pid: impl Into<String>) {
        self.r_principal_id = Some(pid.into());
        self.sanitise();
    }

    /// Composes a new tuple out of `left`'s left endpoint and `right`'s
    /// relation/right endpoint: `left.left --right.relation--> right.right`.
    /// Used by both the optimizer writer and the set evaluator to build the
    /// transitive edge a matched pair of tuples implies. The composed tuple
    /// is a leaf: it carries no strand, so it doesn't itself chain further.
    pub fn compose(left: &Tuple, right: &Tuple) -> Tuple {
        let mut t = Tuple {
            id: Id::generate(),
            rev: 0,
            space_id: left.space_id.clone(),
            strand: String::new(),
            l_entity_type: left.l_entity_type.clone(),
            l_entity_id: left.l_entity_id.clone(),
            l_principal_id: left.l_principal_id.clone(),
            relation: right.relation.clone(),
            r_entity_type: right.r_entity_type.clone(),
            r_entity_id: right.r_entity_id.clone(),
            r_principal_id: right.r_principal_id.clone(),
            attrs: None,
            rid_l: Some(left.id.clone()),
            rid_r: Some(right.id.clone()),
        };
        t.sanitise();
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_endpoint_sanitises_entity_fields() {
        let mut t = Tuple::new(NewTuple {
            space_id: "".into(),
            strand: "member".into(),
            left: Endpoint::Principal("user:jane".into()),
            relation: "viewer".into(),
            right: Endpoint::Entity(Entity::new("doc", "d1")),
            attrs: None,
        });

        assert_eq!(t.l_entity_type, PRINCIPAL_ENTITY_TYPE);
        assert_eq!(t.l_entity_id, "user:jane");

        t.set_r_principal_id("user:bob");
        assert_eq!(t.r_entity_type, PRINCIPAL_ENTITY_TYPE);
        assert_eq!(t.r_entity_id, "user:bob");
    }

    #[test]
    fn entity_hash_is_stable_and_order_sensitive() {
        let a = Entity::new("doc", "d1");
        let b = Entity::new("d", "ocd1");

        assert_eq!(a.hash(), Entity::new("doc", "d1").hash());
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn compose_takes_left_from_first_and_relation_right_from_second() {
        let a = Tuple::new(NewTuple {
            space_id: "s".into(),
            strand: "member".into(),
            left: Endpoint::Principal("user:jane".into()),
            relation: "member".into(),
            right: Endpoint::Entity(Entity::new("group", "editors")),
            attrs: None,
        });
        let b = Tuple::new(NewTuple {
            space_id: "s".into(),
            strand: "".into(),
            left: Endpoint::Entity(Entity::new("group", "editors")),
            relation: "viewer".into(),
            right: Endpoint::Entity(Entity::new("doc", "d1")),
            attrs: None,
        });

        let composed = Tuple::compose(&a, &b);
        assert_eq!(composed.l_principal_id.as_deref(), Some("user:jane"));
        assert_eq!(composed.relation, "viewer");
        assert_eq!(composed.r_entity_id, "d1");
        assert_eq!(composed.rid_l, Some(a.id));
        assert_eq!(composed.rid_r, Some(b.id));
    }
}
