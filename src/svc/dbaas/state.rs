//! # State module
//!
//! This module provide the persisted state document and the upgrade of its
//! older schema versions. The upgrade runs before any read of the resource.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::svc::dbaas::kind::Kind;

// -----------------------------------------------------------------------------
// Constants

pub const SCHEMA_VERSION: u64 = 1;

/// nested blocks of the opensearch variant stored as a single object since
/// the first version
const OPENSEARCH_SINGLETONS: [&str; 2] = ["index_template", "dashboards"];

// -----------------------------------------------------------------------------
// Error enum

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to upgrade state, schema version {0} is newer than the supported one {1}")]
    UnsupportedVersion(u64, u64),
    #[error("failed to upgrade state, expect an object")]
    NotAnObject,
    #[error("failed to serialize state, {0}")]
    Serialize(serde_json::Error),
    #[error("failed to deserialize state, {0}")]
    Deserialize(serde_json::Error),
}

// -----------------------------------------------------------------------------
// Document structure

/// persisted state of a resource along with the version of its schema
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct Document {
    #[serde(rename = "schema_version", default)]
    pub schema_version: u64,
    #[serde(rename = "resource")]
    pub resource: Value,
}

impl Document {
    pub fn new<T>(resource: &T) -> Result<Self, Error>
    where
        T: Serialize,
    {
        Ok(Self {
            schema_version: SCHEMA_VERSION,
            resource: serde_json::to_value(resource).map_err(Error::Serialize)?,
        })
    }

    /// returns the resource, upgraded to the current schema version
    pub fn into_resource<T>(self) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        let resource = upgrade(self.schema_version, self.resource)?;

        serde_json::from_value(resource).map_err(Error::Deserialize)
    }
}

// -----------------------------------------------------------------------------
// Helpers functions

/// moves the first element of a list attribute into the attribute, an empty
/// list removes it
fn singleton(object: &mut Map<String, Value>, key: &str) {
    let list = match object.get_mut(key) {
        Some(Value::Array(list)) => std::mem::take(list),
        _ => return,
    };

    if list.len() > 1 {
        warn!(attribute = key, count = list.len(), "Keep the first element of the list while upgrading state");
    }

    match list.into_iter().next() {
        Some(first) => {
            object.insert(key.to_string(), first);
        }
        None => {
            object.remove(key);
        }
    }
}

/// returns the state upgraded from the given schema version to the current
/// one, version 0 stored every kind block as a list of one element
pub fn upgrade(version: u64, state: Value) -> Result<Value, Error> {
    if version > SCHEMA_VERSION {
        return Err(Error::UnsupportedVersion(version, SCHEMA_VERSION));
    }

    if version == SCHEMA_VERSION {
        return Ok(state);
    }

    let mut state = match state {
        Value::Object(object) => object,
        _ => return Err(Error::NotAnObject),
    };

    debug!(from = version, to = SCHEMA_VERSION, "Upgrade state schema");
    for kind in Kind::ALL {
        singleton(&mut state, &kind.to_string());
    }

    if let Some(Value::Object(opensearch)) = state.get_mut("opensearch") {
        for key in OPENSEARCH_SINGLETONS {
            singleton(opensearch, key);
        }
    }

    Ok(Value::Object(state))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::svc::dbaas::{attr::Attr, model::Service};

    use super::*;

    #[test]
    fn list_of_one_becomes_an_object() {
        let state = json!({
            "name": "t1", "zone": "z1", "type": "pg", "plan": "hobbyist-2",
            "pg": [{"version": "15", "backup_schedule": "01:23"}],
            "mysql": []
        });

        let upgraded = upgrade(0, state).expect("state to be upgraded");
        assert_eq!(json!({"version": "15", "backup_schedule": "01:23"}), upgraded["pg"]);
        assert!(upgraded.get("mysql").is_none());

        let service: Service = serde_json::from_value(upgraded).expect("state to deserialize");
        assert_eq!(
            Attr::Value("01:23".to_string()),
            service.pg.value().expect("pg block to be set").backup_schedule
        );
        assert!(service.mysql.is_unknown());
    }

    #[test]
    fn opensearch_nested_blocks_are_upgraded() {
        let state = json!({
            "name": "o1", "zone": "z1", "type": "opensearch", "plan": "hobbyist-2",
            "opensearch": [{
                "index_pattern": [{"pattern": "log.?", "max_index_count": 2, "sorting_algorithm": "alphabetical"}],
                "index_template": [{"number_of_shards": 3}],
                "dashboards": []
            }]
        });

        let upgraded = upgrade(0, state).expect("state to be upgraded");
        assert_eq!(json!({"number_of_shards": 3}), upgraded["opensearch"]["index_template"]);
        assert!(upgraded["opensearch"].get("dashboards").is_none());
        assert!(upgraded["opensearch"]["index_pattern"].is_array());
    }

    #[test]
    fn current_version_is_kept_as_is() {
        let state = json!({"pg": {"version": "15"}});
        assert_eq!(state, upgrade(SCHEMA_VERSION, state.to_owned()).expect("state to be kept"));
    }

    #[test]
    fn invalid_states_are_rejected() {
        assert!(matches!(upgrade(2, json!({})), Err(Error::UnsupportedVersion(2, 1))));
        assert!(matches!(upgrade(0, json!([])), Err(Error::NotAnObject)));
    }

    #[test]
    fn longer_lists_keep_their_first_element() {
        let state = upgrade(0, json!({"pg": [{"version": "15"}, {"version": "16"}]})).expect("state to be upgraded");

        assert_eq!(json!({"version": "15"}), state["pg"]);
    }

    #[test]
    fn document_upgrades_before_deserializing() {
        let document: Document = serde_json::from_value(json!({
            "resource": {"name": "v1", "zone": "z1", "type": "valkey", "plan": "hobbyist-2", "valkey": [{}]}
        }))
        .expect("document to deserialize");

        assert_eq!(0, document.schema_version);
        let service: Service = document.into_resource().expect("state to be upgraded");
        assert!(service.valkey.value().is_some());

        let document = Document::new(&service).expect("document to serialize");
        assert_eq!(SCHEMA_VERSION, document.schema_version);
    }
}
