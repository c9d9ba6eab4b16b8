//! # Connection uri module
//!
//! This module provide the read-only view of the connection parameters of a
//! managed database service

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::svc::{
    apis::{self, dbaas::Head, RestClient},
    dbaas::{
        kind::{self, Kind},
        Controller, Diagnostic, Error,
    },
};

// -----------------------------------------------------------------------------
// ConnectionUri structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct ConnectionUri {
    #[serde(rename = "uri", default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(rename = "schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(rename = "host", default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(rename = "port", default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(rename = "username", default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(rename = "password", default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(rename = "db_name", default, skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,
}

// -----------------------------------------------------------------------------
// Helpers functions

fn param(params: &BTreeMap<String, Value>, key: &str) -> Option<String> {
    match params.get(key)? {
        Value::String(value) => Some(value.to_owned()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

impl ConnectionUri {
    pub fn from_head(kind: Kind, head: Head) -> Self {
        let params = &head.common.uri_params;

        Self {
            uri: head.common.uri.to_owned(),
            schema: kind::spec(kind).scheme.map(ToString::to_string),
            host: param(params, "host"),
            port: param(params, "port").and_then(|port| port.parse().ok()),
            username: param(params, "user"),
            password: param(params, "password"),
            db_name: param(params, "dbname"),
        }
    }
}

/// returns the connection parameters of the service of the given type, the
/// historical `redis` type is accepted
pub async fn read<C>(ctrl: &Controller<C>, kind: &str, name: &str, zone: &str) -> Result<ConnectionUri, Error>
where
    C: RestClient,
{
    let kind = Kind::from_import(kind).map_err(|err| Diagnostic {
        path: "type".to_string(),
        summary: err.to_string(),
    })?;

    let client = ctrl.zoned(zone);

    info!(name = name, zone = zone, kind = kind.to_string(), "Read connection uri");
    let head = apis::dbaas::head(&client, kind, name).await?;

    Ok(ConnectionUri::from_head(kind, head))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::svc::{apis::testing::Fake, cfg::Configuration, dbaas::service};

    use super::*;

    async fn create(ctrl: &Controller<Fake>, kind: &str, name: &str) {
        let mut planned = json!({"name": name, "zone": "z1", "type": kind, "plan": "hobbyist-2"});
        planned[kind] = json!({});

        let planned = serde_json::from_value(planned).expect("model to deserialize");

        service::create(ctrl, planned).await.expect("service to be created");
    }

    #[tokio::test(start_paused = true)]
    async fn schema_depends_on_the_kind() {
        let client = Fake::new("z1");
        let ctrl = Controller::new(client.to_owned(), Arc::new(Configuration::default()));

        create(&ctrl, "pg", "t1").await;
        create(&ctrl, "opensearch", "o1").await;
        create(&ctrl, "kafka", "k1").await;

        let pg = read(&ctrl, "pg", "t1", "z1").await.expect("uri to be read");
        assert_eq!(Some("postgres".to_string()), pg.schema);
        assert_eq!(Some(21699), pg.port);
        assert_eq!(Some("avnadmin".to_string()), pg.username);
        assert_eq!(Some("defaultdb".to_string()), pg.db_name);
        assert!(pg.password.is_some());

        let os = read(&ctrl, "opensearch", "o1", "z1").await.expect("uri to be read");
        assert_eq!(Some("https".to_string()), os.schema);

        let kafka = read(&ctrl, "kafka", "k1", "z1").await.expect("uri to be read");
        assert_eq!(None, kafka.schema);
        assert_eq!(None, kafka.username);
        assert_eq!(None, kafka.password);
        assert_eq!(None, kafka.db_name);
        assert!(kafka.host.is_some());
        assert_eq!(Some(21701), kafka.port);
    }

    #[tokio::test(start_paused = true)]
    async fn redis_alias_reads_valkey_services() {
        let client = Fake::new("z1");
        let ctrl = Controller::new(client.to_owned(), Arc::new(Configuration::default()));
        create(&ctrl, "valkey", "v1").await;

        let valkey = read(&ctrl, "redis", "v1", "z1").await.expect("uri to be read");
        assert_eq!(Some("rediss".to_string()), valkey.schema);

        let err = read(&ctrl, "mongodb", "v1", "z1").await.expect_err("type to be unknown");
        assert!(matches!(err, Error::Validation(_)));

        let err = read(&ctrl, "pg", "missing", "z1").await.expect_err("service to be missing");
        assert!(err.is_not_found());
    }
}
