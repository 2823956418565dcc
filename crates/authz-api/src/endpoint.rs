use serde::Deserialize;

use authz_core::{Endpoint, Entity};

/// The JSON shape of a tuple endpoint: either a bare principal id, or an
/// explicit `(entity_type, entity_id)` pair. Mirrors `authz_core::Endpoint`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EndpointJson {
    Principal { principal_id: String },
    Entity { entity_type: String, entity_id: String },
}

impl From<EndpointJson> for Endpoint {
    fn from(value: EndpointJson) -> Self {
        match value {
            EndpointJson::Principal { principal_id } => Endpoint::Principal(principal_id),
            EndpointJson::Entity {
                entity_type,
                entity_id,
            } => Endpoint::Entity(Entity::new(entity_type, entity_id)),
        }
    }
}

impl EndpointJson {
    pub fn entity(&self) -> Entity {
        match self {
            EndpointJson::Principal { principal_id } => Entity::principal(principal_id.clone()),
            EndpointJson::Entity {
                entity_type,
                entity_id,
            } => Entity::new(entity_type.clone(), entity_id.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_principal_shape() {
        let json = serde_json::json!({"principal_id": "user:jane"});
        let endpoint: EndpointJson = serde_json::from_value(json).unwrap();
        assert_eq!(endpoint.entity(), Entity::principal("user:jane"));
    }

    #[test]
    fn deserializes_entity_shape() {
        let json = serde_json::json!({"entity_type": "doc", "entity_id": "d1"});
        let endpoint: EndpointJson = serde_json::from_value(json).unwrap();
        assert_eq!(endpoint.entity(), Entity::new("doc", "d1"));
    }
}
