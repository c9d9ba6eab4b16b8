//! # Database-as-a-service module
//!
//! This module provide structures and helpers to interact with the
//! database-as-a-service endpoints shared by every kind of service

use std::{
    collections::BTreeMap,
    error::Error as StdError,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::svc::apis::{operation::Operation, Error, RestClient};

pub mod grafana;
pub mod kafka;
pub mod mysql;
pub mod opensearch;
pub mod pg;
pub mod thanos;
pub mod valkey;

// -----------------------------------------------------------------------------
// Kind enum

#[derive(
    JsonSchema, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug,
)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Pg,
    Mysql,
    Kafka,
    Opensearch,
    Valkey,
    Grafana,
    Thanos,
}

impl Kind {
    pub const ALL: [Kind; 7] = [
        Self::Pg,
        Self::Mysql,
        Self::Kafka,
        Self::Opensearch,
        Self::Valkey,
        Self::Grafana,
        Self::Thanos,
    ];

    /// returns the kind from a type reported by the api, the historical
    /// `redis` alias is only accepted there
    pub fn from_import(s: &str) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        match s {
            "redis" => Ok(Self::Valkey),
            _ => Self::from_str(s),
        }
    }

    /// returns the path segment of the service endpoints
    pub fn segment(&self) -> &'static str {
        match self {
            Self::Pg => "dbaas-postgres",
            Self::Mysql => "dbaas-mysql",
            Self::Kafka => "dbaas-kafka",
            Self::Opensearch => "dbaas-opensearch",
            Self::Valkey => "dbaas-valkey",
            Self::Grafana => "dbaas-grafana",
            Self::Thanos => "dbaas-thanos",
        }
    }
}

impl FromStr for Kind {
    type Err = Box<dyn StdError + Send + Sync>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "pg" => Self::Pg,
            "mysql" => Self::Mysql,
            "kafka" => Self::Kafka,
            "opensearch" => Self::Opensearch,
            "valkey" => Self::Valkey,
            "grafana" => Self::Grafana,
            "thanos" => Self::Thanos,
            _ => {
                return Err(format!("failed to parse service type '{}', available options are 'pg', 'mysql', 'kafka', 'opensearch', 'valkey', 'grafana' and 'thanos'", s).into());
            }
        })
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pg => write!(f, "pg"),
            Self::Mysql => write!(f, "mysql"),
            Self::Kafka => write!(f, "kafka"),
            Self::Opensearch => write!(f, "opensearch"),
            Self::Valkey => write!(f, "valkey"),
            Self::Grafana => write!(f, "grafana"),
            Self::Thanos => write!(f, "thanos"),
        }
    }
}

// -----------------------------------------------------------------------------
// Maintenance structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Maintenance {
    #[serde(rename = "dow")]
    pub dow: String,
    #[serde(rename = "time")]
    pub time: String,
}

// -----------------------------------------------------------------------------
// BackupSchedule structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct BackupSchedule {
    #[serde(rename = "backup-hour")]
    pub hour: i64,
    #[serde(rename = "backup-minute")]
    pub minute: i64,
}

// -----------------------------------------------------------------------------
// User structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct User {
    #[serde(rename = "username")]
    pub username: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(rename = "authentication", default)]
    pub authentication: Option<String>,
    #[serde(rename = "allow-replication", default)]
    pub allow_replication: Option<bool>,
    #[serde(rename = "access-cert-expiry", default)]
    pub access_cert_expiry: Option<String>,
}

// -----------------------------------------------------------------------------
// Common structure

/// fields shared by the view of every kind of service
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct Common {
    #[serde(rename = "name")]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "plan")]
    pub plan: String,
    #[serde(rename = "state", default)]
    pub state: Option<String>,
    #[serde(rename = "created-at", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updated-at", default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "disk-size", default)]
    pub disk_size: Option<i64>,
    #[serde(rename = "node-count", default)]
    pub node_count: Option<i64>,
    #[serde(rename = "node-cpu-count", default)]
    pub node_cpu_count: Option<i64>,
    #[serde(rename = "node-memory", default)]
    pub node_memory: Option<i64>,
    #[serde(rename = "termination-protection", default)]
    pub termination_protection: Option<bool>,
    #[serde(rename = "maintenance", default)]
    pub maintenance: Option<Maintenance>,
    #[serde(rename = "users", default)]
    pub users: Vec<User>,
    #[serde(rename = "uri", default)]
    pub uri: Option<String>,
    #[serde(rename = "uri-params", default)]
    pub uri_params: BTreeMap<String, Value>,
}

// -----------------------------------------------------------------------------
// Head structure

/// minimal view of a service of any kind, used by readiness checks and
/// sub-resources
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct Head {
    #[serde(flatten)]
    pub common: Common,
    #[serde(rename = "databases", default)]
    pub databases: Vec<String>,
}

// -----------------------------------------------------------------------------
// Summary structure

/// element of the list of services of a zone
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct Summary {
    #[serde(rename = "name")]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "plan")]
    pub plan: String,
    #[serde(rename = "state", default)]
    pub state: Option<String>,
    #[serde(rename = "created-at", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updated-at", default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "disk-size", default)]
    pub disk_size: Option<i64>,
    #[serde(rename = "node-count", default)]
    pub node_count: Option<i64>,
    #[serde(rename = "termination-protection", default)]
    pub termination_protection: Option<bool>,
}

#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct Summaries {
    #[serde(rename = "dbaas-services", default)]
    pub services: Vec<Summary>,
}

// -----------------------------------------------------------------------------
// CaCertificate structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct CaCertificate {
    #[serde(rename = "certificate")]
    pub certificate: String,
}

// -----------------------------------------------------------------------------
// Settings structure

/// json schemas of the free-form settings of a kind, indexed by family
/// (e.g. `pg`, `pgbouncer`, `pglookout`)
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
pub struct Settings {
    #[serde(rename = "settings", default)]
    pub settings: BTreeMap<String, Value>,
}

// -----------------------------------------------------------------------------
// RevealedUser structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct RevealedUser {
    #[serde(rename = "username", default)]
    pub username: Option<String>,
    #[serde(rename = "password", default)]
    pub password: Option<String>,
    #[serde(rename = "access-key", default)]
    pub access_key: Option<String>,
    #[serde(rename = "access-cert", default)]
    pub access_cert: Option<String>,
    #[serde(rename = "access-cert-expiry", default)]
    pub access_cert_expiry: Option<String>,
}

// -----------------------------------------------------------------------------
// CreateUserOpts structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct CreateUserOpts {
    #[serde(rename = "username")]
    pub username: String,
    #[serde(rename = "authentication", skip_serializing_if = "Option::is_none")]
    pub authentication: Option<String>,
    #[serde(rename = "allow-replication", skip_serializing_if = "Option::is_none")]
    pub allow_replication: Option<bool>,
}

// -----------------------------------------------------------------------------
// CreateDatabaseOpts structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct CreateDatabaseOpts {
    #[serde(rename = "database-name")]
    pub database_name: String,
    #[serde(rename = "lc-collate", skip_serializing_if = "Option::is_none")]
    pub lc_collate: Option<String>,
    #[serde(rename = "lc-ctype", skip_serializing_if = "Option::is_none")]
    pub lc_ctype: Option<String>,
}

/// settings document as sent to and received from the api
pub type Document = Map<String, Value>;

// -----------------------------------------------------------------------------
// Helpers functions

/// returns the list of services of the zone the client is bound to
pub async fn list<C>(client: &C) -> Result<Vec<Summary>, Error>
where
    C: RestClient,
{
    let path = "/dbaas-service";

    debug!(path = path, zone = client.zone(), "Execute a request to list services");
    Ok(client.get::<Summaries>(path).await?.ok()?.services)
}

/// returns the certificate authority shared by the services of the zone
pub async fn ca_certificate<C>(client: &C) -> Result<String, Error>
where
    C: RestClient,
{
    let path = "/dbaas-ca-certificate";

    debug!(path = path, zone = client.zone(), "Execute a request to get the ca certificate");
    Ok(client.get::<CaCertificate>(path).await?.ok()?.certificate)
}

/// delete the service, whatever its kind
pub async fn delete<C>(client: &C, name: &str) -> Result<Operation, Error>
where
    C: RestClient,
{
    let path = format!("/dbaas-service/{}", name);

    debug!(path = &path, zone = client.zone(), name = name, "Execute a request to delete a service");
    client.delete(&path).await?.ok()
}

/// returns the json schemas of the settings of the given kind
pub async fn settings<C>(client: &C, kind: Kind) -> Result<Settings, Error>
where
    C: RestClient,
{
    let path = format!("/dbaas-settings-{}", kind);

    debug!(path = &path, zone = client.zone(), kind = kind.to_string(), "Execute a request to get settings schemas");
    client.get(&path).await?.ok()
}

/// returns the minimal view of the service
pub async fn head<C>(client: &C, kind: Kind, name: &str) -> Result<Head, Error>
where
    C: RestClient,
{
    get(client, kind, name).await
}

/// returns the view of the service deserialized as the given type
pub async fn get<C, T>(client: &C, kind: Kind, name: &str) -> Result<T, Error>
where
    C: RestClient,
    T: DeserializeOwned + Send,
{
    let path = format!("/{}/{}", kind.segment(), name);

    debug!(path = &path, zone = client.zone(), name = name, "Execute a request to get a service");
    client.get(&path).await?.ok()
}

/// create the service from the given options
pub async fn create<C, T>(client: &C, kind: Kind, name: &str, opts: &T) -> Result<Operation, Error>
where
    C: RestClient,
    T: Serialize + Send + Sync,
{
    let path = format!("/{}/{}", kind.segment(), name);

    debug!(path = &path, zone = client.zone(), name = name, "Execute a request to create a service");
    client.post(&path, opts).await?.ok()
}

/// update the service from the given options
pub async fn update<C, T>(client: &C, kind: Kind, name: &str, opts: &T) -> Result<Operation, Error>
where
    C: RestClient,
    T: Serialize + Send + Sync,
{
    let path = format!("/{}/{}", kind.segment(), name);

    debug!(path = &path, zone = client.zone(), name = name, "Execute a request to update a service");
    client.put(&path, opts).await?.ok()
}

/// create a user on the service
pub async fn create_user<C>(
    client: &C,
    kind: Kind,
    service: &str,
    opts: &CreateUserOpts,
) -> Result<Operation, Error>
where
    C: RestClient,
{
    let path = format!("/{}/{}/user", kind.segment(), service);

    debug!(path = &path, zone = client.zone(), service = service, username = &opts.username, "Execute a request to create a user");
    client.post(&path, opts).await?.ok()
}

/// delete the user of the service
pub async fn delete_user<C>(
    client: &C,
    kind: Kind,
    service: &str,
    username: &str,
) -> Result<Operation, Error>
where
    C: RestClient,
{
    let path = format!("/{}/{}/user/{}", kind.segment(), service, username);

    debug!(path = &path, zone = client.zone(), service = service, username = username, "Execute a request to delete a user");
    client.delete(&path).await?.ok()
}

/// returns the secrets of the user
pub async fn reveal_user_password<C>(
    client: &C,
    kind: Kind,
    service: &str,
    username: &str,
) -> Result<RevealedUser, Error>
where
    C: RestClient,
{
    let path = format!(
        "/{}/{}/user/{}/password/reveal",
        kind.segment(),
        service,
        username
    );

    debug!(path = &path, zone = client.zone(), service = service, username = username, "Execute a request to reveal a user password");
    client.get(&path).await?.ok()
}

/// create a logical database on the service
pub async fn create_database<C>(
    client: &C,
    kind: Kind,
    service: &str,
    opts: &CreateDatabaseOpts,
) -> Result<Operation, Error>
where
    C: RestClient,
{
    let path = format!("/{}/{}/database", kind.segment(), service);

    debug!(path = &path, zone = client.zone(), service = service, database = &opts.database_name, "Execute a request to create a database");
    client.post(&path, opts).await?.ok()
}

/// delete the logical database of the service
pub async fn delete_database<C>(
    client: &C,
    kind: Kind,
    service: &str,
    database: &str,
) -> Result<Operation, Error>
where
    C: RestClient,
{
    let path = format!("/{}/{}/database/{}", kind.segment(), service, database);

    debug!(path = &path, zone = client.zone(), service = service, database = database, "Execute a request to delete a database");
    client.delete(&path).await?.ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parsing_is_strict() {
        for kind in Kind::ALL {
            assert_eq!(kind, Kind::from_str(&kind.to_string()).expect("kind to parse"));
        }

        assert!(Kind::from_str("redis").is_err());
        assert!(Kind::from_str("postgres").is_err());
        assert_eq!(Kind::Valkey, Kind::from_import("redis").expect("alias to parse"));
    }

    #[test]
    fn kind_is_serialized_as_its_identifier() {
        assert_eq!(
            "\"opensearch\"",
            serde_json::to_string(&Kind::Opensearch).expect("kind to serialize")
        );
        assert!(serde_json::from_str::<Kind>("\"redis\"").is_err());
    }

    #[test]
    fn head_ignores_kind_specific_fields() {
        let head: Head = serde_json::from_value(serde_json::json!({
            "name": "t1",
            "type": "pg",
            "plan": "hobbyist-2",
            "state": "running",
            "pg-settings": {"timezone": "UTC"},
            "users": [{"username": "avnadmin", "type": "primary"}],
            "databases": ["defaultdb"]
        }))
        .expect("head to deserialize");

        assert_eq!(Some("running".to_string()), head.common.state);
        assert_eq!(1, head.common.users.len());
        assert_eq!(vec!["defaultdb".to_string()], head.databases);
    }
}
