//! # Model module
//!
//! This module provide the declarative model of a service as exchanged with
//! the host, its kind-specific blocks and its configuration validation.

use std::{
    collections::BTreeSet,
    fmt::{self, Display, Formatter},
    net::IpAddr,
    str::FromStr,
    time::Duration,
};

use chrono::{DateTime, NaiveTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::svc::{
    apis::dbaas::{BackupSchedule, Maintenance},
    cfg::Configuration,
    dbaas::{
        attr::Attr,
        kind::{self, Kind},
        settings, Diagnostic, Diagnostics, Operation,
    },
};

// -----------------------------------------------------------------------------
// MaintenanceDow enum

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceDow {
    Never,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl FromStr for MaintenanceDow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "never" => Self::Never,
            "monday" => Self::Monday,
            "tuesday" => Self::Tuesday,
            "wednesday" => Self::Wednesday,
            "thursday" => Self::Thursday,
            "friday" => Self::Friday,
            "saturday" => Self::Saturday,
            "sunday" => Self::Sunday,
            _ => return Err(format!("failed to parse maintenance day of week '{}'", s)),
        })
    }
}

impl Display for MaintenanceDow {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => write!(f, "never"),
            Self::Monday => write!(f, "monday"),
            Self::Tuesday => write!(f, "tuesday"),
            Self::Wednesday => write!(f, "wednesday"),
            Self::Thursday => write!(f, "thursday"),
            Self::Friday => write!(f, "friday"),
            Self::Saturday => write!(f, "saturday"),
            Self::Sunday => write!(f, "sunday"),
        }
    }
}

// -----------------------------------------------------------------------------
// Timeouts structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct Timeouts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,
}

impl Timeouts {
    /// returns the timeout of the operation, falling back to the default
    pub fn get(&self, op: Operation, default: Duration) -> Result<Duration, Diagnostic> {
        let (attribute, value) = match op {
            Operation::Create => ("create", &self.create),
            Operation::Read => ("read", &self.read),
            Operation::Update => ("update", &self.update),
            Operation::Delete => ("delete", &self.delete),
        };

        match value {
            None => Ok(default),
            Some(value) => humantime::parse_duration(value).map_err(|err| Diagnostic {
                path: format!("timeouts.{}", attribute),
                summary: format!("failed to parse duration '{}', {}", value, err),
            }),
        }
    }
}

/// returns the timeout of the operation from an optional timeouts block
pub fn timeout(
    timeouts: &Option<Timeouts>,
    op: Operation,
    config: &Configuration,
) -> Result<Duration, Diagnostic> {
    match timeouts {
        Some(timeouts) => timeouts.get(op, config.dbaas.default_timeout),
        None => Ok(config.dbaas.default_timeout),
    }
}

// -----------------------------------------------------------------------------
// Constants

pub const REPLACEMENT: &str = "requires replacement, the attribute can not be updated in place";

// -----------------------------------------------------------------------------
// Variant trait

/// a kind-specific block of the service
pub trait Variant {
    const KIND: Kind;

    fn ip_filter(&self) -> &Attr<BTreeSet<String>>;

    /// returns the free-form settings documents indexed by attribute name
    fn settings(&self) -> Vec<(&'static str, &Attr<String>)>;

    /// kind-specific checks, paths are relative to the block
    fn validate(&self, _block: &str, _diagnostics: &mut Diagnostics) {}

    /// returns the attributes only sent on creation, versions are normalized
    fn create_only(&self) -> Vec<(&'static str, Attr<String>)> {
        vec![]
    }
}

// -----------------------------------------------------------------------------
// PgVariant structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct PgVariant {
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub admin_username: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub admin_password: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub backup_schedule: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub ip_filter: Attr<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub version: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub pg_settings: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub pgbouncer_settings: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub pglookout_settings: Attr<String>,
}

impl Variant for PgVariant {
    const KIND: Kind = Kind::Pg;

    fn ip_filter(&self) -> &Attr<BTreeSet<String>> {
        &self.ip_filter
    }

    fn settings(&self) -> Vec<(&'static str, &Attr<String>)> {
        vec![
            ("pg_settings", &self.pg_settings),
            ("pgbouncer_settings", &self.pgbouncer_settings),
            ("pglookout_settings", &self.pglookout_settings),
        ]
    }

    fn validate(&self, block: &str, diagnostics: &mut Diagnostics) {
        validate_backup_schedule(block, &self.backup_schedule, diagnostics);
    }

    fn create_only(&self) -> Vec<(&'static str, Attr<String>)> {
        vec![
            ("admin_username", self.admin_username.to_owned()),
            ("admin_password", self.admin_password.to_owned()),
            ("version", normalized(&self.version, Self::KIND)),
        ]
    }
}

// -----------------------------------------------------------------------------
// MysqlVariant structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct MysqlVariant {
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub admin_username: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub admin_password: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub backup_schedule: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub ip_filter: Attr<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub version: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub mysql_settings: Attr<String>,
}

impl Variant for MysqlVariant {
    const KIND: Kind = Kind::Mysql;

    fn ip_filter(&self) -> &Attr<BTreeSet<String>> {
        &self.ip_filter
    }

    fn settings(&self) -> Vec<(&'static str, &Attr<String>)> {
        vec![("mysql_settings", &self.mysql_settings)]
    }

    fn validate(&self, block: &str, diagnostics: &mut Diagnostics) {
        validate_backup_schedule(block, &self.backup_schedule, diagnostics);
    }

    fn create_only(&self) -> Vec<(&'static str, Attr<String>)> {
        vec![
            ("admin_username", self.admin_username.to_owned()),
            ("admin_password", self.admin_password.to_owned()),
            ("version", normalized(&self.version, Self::KIND)),
        ]
    }
}

// -----------------------------------------------------------------------------
// KafkaVariant structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct KafkaVariant {
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub enable_cert_auth: Attr<bool>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub enable_kafka_connect: Attr<bool>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub enable_kafka_rest: Attr<bool>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub enable_sasl_auth: Attr<bool>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub enable_schema_registry: Attr<bool>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub ip_filter: Attr<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub version: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub kafka_settings: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub kafka_connect_settings: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub kafka_rest_settings: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub schema_registry_settings: Attr<String>,
}

impl Variant for KafkaVariant {
    const KIND: Kind = Kind::Kafka;

    fn ip_filter(&self) -> &Attr<BTreeSet<String>> {
        &self.ip_filter
    }

    fn settings(&self) -> Vec<(&'static str, &Attr<String>)> {
        vec![
            ("kafka_settings", &self.kafka_settings),
            ("kafka_connect_settings", &self.kafka_connect_settings),
            ("kafka_rest_settings", &self.kafka_rest_settings),
            ("schema_registry_settings", &self.schema_registry_settings),
        ]
    }
    fn create_only(&self) -> Vec<(&'static str, Attr<String>)> {
        vec![("version", normalized(&self.version, Self::KIND))]
    }
}

// -----------------------------------------------------------------------------
// OpenSearch nested blocks

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug)]
#[serde(rename_all = "snake_case")]
pub enum SortingAlgorithm {
    Alphabetical,
    CreationDate,
}

impl FromStr for SortingAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alphabetical" => Ok(Self::Alphabetical),
            "creation_date" => Ok(Self::CreationDate),
            _ => Err(format!("failed to parse sorting algorithm '{}'", s)),
        }
    }
}

impl Display for SortingAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alphabetical => write!(f, "alphabetical"),
            Self::CreationDate => write!(f, "creation_date"),
        }
    }
}

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct IndexPattern {
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub max_index_count: Attr<i64>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub pattern: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub sorting_algorithm: Attr<SortingAlgorithm>,
}

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct IndexTemplate {
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub mapping_nested_objects_limit: Attr<i64>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub number_of_replicas: Attr<i64>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub number_of_shards: Attr<i64>,
}

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct Dashboards {
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub enabled: Attr<bool>,
    /// memory limit of the dashboards process, in MiB
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub max_old_space_size: Attr<i64>,
    /// timeout of requests sent to opensearch, in milliseconds
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub request_timeout: Attr<i64>,
}

impl IndexPattern {
    pub fn differs(&self, state: &Self) -> bool {
        differs(&self.max_index_count, &state.max_index_count)
            || differs(&self.pattern, &state.pattern)
            || differs(&self.sorting_algorithm, &state.sorting_algorithm)
    }
}

impl IndexTemplate {
    pub fn differs(&self, state: &Self) -> bool {
        differs(&self.mapping_nested_objects_limit, &state.mapping_nested_objects_limit)
            || differs(&self.number_of_replicas, &state.number_of_replicas)
            || differs(&self.number_of_shards, &state.number_of_shards)
    }
}

impl Dashboards {
    pub fn differs(&self, state: &Self) -> bool {
        differs(&self.enabled, &state.enabled)
            || differs(&self.max_old_space_size, &state.max_old_space_size)
            || differs(&self.request_timeout, &state.request_timeout)
    }
}

/// returns if a nested attribute is set and differs from the state, nested
/// attributes left out keep the value chosen by the api
fn differs<T>(planned: &Attr<T>, state: &Attr<T>) -> bool
where
    T: PartialEq,
{
    planned.value().is_some() && planned.value() != state.value()
}

// -----------------------------------------------------------------------------
// OpensearchVariant structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct OpensearchVariant {
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub fork_from_service: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub recovery_backup_name: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub ip_filter: Attr<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub keep_index_refresh_interval: Attr<bool>,
    /// deprecated, accepted but no longer sent to the api
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub max_index_count: Attr<i64>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub version: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub settings: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub index_pattern: Attr<Vec<IndexPattern>>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub index_template: Attr<IndexTemplate>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub dashboards: Attr<Dashboards>,
}

impl Variant for OpensearchVariant {
    const KIND: Kind = Kind::Opensearch;

    fn ip_filter(&self) -> &Attr<BTreeSet<String>> {
        &self.ip_filter
    }

    fn settings(&self) -> Vec<(&'static str, &Attr<String>)> {
        vec![("settings", &self.settings)]
    }

    fn validate(&self, block: &str, diagnostics: &mut Diagnostics) {
        range(diagnostics, &format!("{}.max_index_count", block), &self.max_index_count, 0, i64::MAX);

        if let Some(patterns) = self.index_pattern.value() {
            for (idx, pattern) in patterns.iter().enumerate() {
                let path = format!("{}.index_pattern[{}].max_index_count", block, idx);
                range(diagnostics, &path, &pattern.max_index_count, 0, i64::MAX);
            }
        }

        if let Some(template) = self.index_template.value() {
            let path = format!("{}.index_template", block);
            range(diagnostics, &format!("{}.mapping_nested_objects_limit", path), &template.mapping_nested_objects_limit, 0, 100_000);
            range(diagnostics, &format!("{}.number_of_replicas", path), &template.number_of_replicas, 0, 29);
            range(diagnostics, &format!("{}.number_of_shards", path), &template.number_of_shards, 1, 1024);
        }

        if let Some(dashboards) = self.dashboards.value() {
            let path = format!("{}.dashboards", block);
            range(diagnostics, &format!("{}.max_old_space_size", path), &dashboards.max_old_space_size, 64, i64::MAX);
            range(diagnostics, &format!("{}.request_timeout", path), &dashboards.request_timeout, 5_000, 120_000);
        }
    }
    fn create_only(&self) -> Vec<(&'static str, Attr<String>)> {
        vec![
            ("fork_from_service", self.fork_from_service.to_owned()),
            ("recovery_backup_name", self.recovery_backup_name.to_owned()),
            ("version", normalized(&self.version, Self::KIND)),
        ]
    }
}

// -----------------------------------------------------------------------------
// ValkeyVariant structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct ValkeyVariant {
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub ip_filter: Attr<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub valkey_settings: Attr<String>,
    /// computed
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub version: Attr<String>,
}

impl Variant for ValkeyVariant {
    const KIND: Kind = Kind::Valkey;

    fn ip_filter(&self) -> &Attr<BTreeSet<String>> {
        &self.ip_filter
    }

    fn settings(&self) -> Vec<(&'static str, &Attr<String>)> {
        vec![("valkey_settings", &self.valkey_settings)]
    }
}

// -----------------------------------------------------------------------------
// GrafanaVariant structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct GrafanaVariant {
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub ip_filter: Attr<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub grafana_settings: Attr<String>,
}

impl Variant for GrafanaVariant {
    const KIND: Kind = Kind::Grafana;

    fn ip_filter(&self) -> &Attr<BTreeSet<String>> {
        &self.ip_filter
    }

    fn settings(&self) -> Vec<(&'static str, &Attr<String>)> {
        vec![("grafana_settings", &self.grafana_settings)]
    }
}

// -----------------------------------------------------------------------------
// ThanosVariant structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct ThanosVariant {
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub ip_filter: Attr<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub thanos_settings: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub uri: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub query_frontend_uri: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub query_uri: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub receiver_remote_write_uri: Attr<String>,
}

impl Variant for ThanosVariant {
    const KIND: Kind = Kind::Thanos;

    fn ip_filter(&self) -> &Attr<BTreeSet<String>> {
        &self.ip_filter
    }

    fn settings(&self) -> Vec<(&'static str, &Attr<String>)> {
        vec![("thanos_settings", &self.thanos_settings)]
    }
}

// -----------------------------------------------------------------------------
// Service structure

/// declarative model of a managed database service
#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct Service {
    /// computed, equal to the name
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub id: Attr<String>,
    pub name: String,
    pub zone: String,
    #[serde(rename = "type")]
    pub kind: Kind,
    pub plan: String,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub maintenance_dow: Attr<MaintenanceDow>,
    /// `HH:MM:SS`
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub maintenance_time: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub termination_protection: Attr<bool>,

    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub created_at: Attr<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub updated_at: Attr<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub state: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub disk_size: Attr<i64>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub node_cpus: Attr<i64>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub node_memory: Attr<i64>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub node_count: Attr<i64>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub ca_certificate: Attr<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeouts: Option<Timeouts>,

    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub pg: Attr<PgVariant>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub mysql: Attr<MysqlVariant>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub kafka: Attr<KafkaVariant>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub opensearch: Attr<OpensearchVariant>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub valkey: Attr<ValkeyVariant>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub grafana: Attr<GrafanaVariant>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub thanos: Attr<ThanosVariant>,
}

impl Service {
    /// returns a model holding only the identifying attributes
    pub fn new(name: &str, zone: &str, kind: Kind, plan: &str) -> Self {
        Self {
            id: Attr::Value(name.to_string()),
            name: name.to_string(),
            zone: zone.to_string(),
            kind,
            plan: plan.to_string(),
            maintenance_dow: Attr::Unknown,
            maintenance_time: Attr::Unknown,
            termination_protection: Attr::Unknown,
            created_at: Attr::Unknown,
            updated_at: Attr::Unknown,
            state: Attr::Unknown,
            disk_size: Attr::Unknown,
            node_cpus: Attr::Unknown,
            node_memory: Attr::Unknown,
            node_count: Attr::Unknown,
            ca_certificate: Attr::Unknown,
            timeouts: None,
            pg: Attr::Unknown,
            mysql: Attr::Unknown,
            kafka: Attr::Unknown,
            opensearch: Attr::Unknown,
            valkey: Attr::Unknown,
            grafana: Attr::Unknown,
            thanos: Attr::Unknown,
        }
    }

    /// returns the kinds whose block is set
    pub fn blocks(&self) -> Vec<Kind> {
        [
            (Kind::Pg, self.pg.value().is_some()),
            (Kind::Mysql, self.mysql.value().is_some()),
            (Kind::Kafka, self.kafka.value().is_some()),
            (Kind::Opensearch, self.opensearch.value().is_some()),
            (Kind::Valkey, self.valkey.value().is_some()),
            (Kind::Grafana, self.grafana.value().is_some()),
            (Kind::Thanos, self.thanos.value().is_some()),
        ]
        .into_iter()
        .filter_map(|(kind, set)| set.then_some(kind))
        .collect()
    }

    /// returns the maintenance window when both of its components are set
    pub fn maintenance(&self) -> Option<Maintenance> {
        match (self.maintenance_dow.value(), self.maintenance_time.value()) {
            (Some(dow), Some(time)) => Some(Maintenance {
                dow: dow.to_string(),
                time: time.to_owned(),
            }),
            _ => None,
        }
    }

    /// returns the configuration diagnostics of the model, checked before any
    /// remote mutation
    pub fn validate(&self, config: &Configuration) -> Diagnostics {
        let mut diagnostics = Diagnostics::default();

        if self.name.is_empty() {
            diagnostics.push("name", "must not be empty");
        }

        if self.plan.is_empty() {
            diagnostics.push("plan", "must not be empty");
        }

        if !config.dbaas.accepts(&self.zone) {
            diagnostics.push(
                "zone",
                &format!(
                    "zone '{}' is not supported, available zones are '{}'",
                    self.zone,
                    config.dbaas.zones.join("', '")
                ),
            );
        }

        match (&self.maintenance_dow, &self.maintenance_time) {
            (Attr::Value(_), Attr::Value(_)) => {}
            (Attr::Value(_), _) => diagnostics.push(
                "maintenance_time",
                "must be set when maintenance_dow is set",
            ),
            (_, Attr::Value(_)) => diagnostics.push(
                "maintenance_dow",
                "must be set when maintenance_time is set",
            ),
            _ => {}
        }

        if let Some(time) = self.maintenance_time.value() {
            if NaiveTime::parse_from_str(time, "%H:%M:%S").is_err() {
                diagnostics.push(
                    "maintenance_time",
                    &format!("failed to parse time '{}', expected format is 'HH:MM:SS'", time),
                );
            }
        }

        let block = self.kind.to_string();
        let blocks = self.blocks();
        if !blocks.contains(&self.kind) {
            diagnostics.push(&block, &format!("block is required when type is '{}'", self.kind));
        }

        for kind in blocks.iter().filter(|kind| **kind != self.kind) {
            diagnostics.push(
                &kind.to_string(),
                &format!("block is not allowed when type is '{}'", self.kind),
            );
        }

        match self.kind {
            Kind::Pg => validate_variant(&self.pg, &mut diagnostics),
            Kind::Mysql => validate_variant(&self.mysql, &mut diagnostics),
            Kind::Kafka => validate_variant(&self.kafka, &mut diagnostics),
            Kind::Opensearch => validate_variant(&self.opensearch, &mut diagnostics),
            Kind::Valkey => validate_variant(&self.valkey, &mut diagnostics),
            Kind::Grafana => validate_variant(&self.grafana, &mut diagnostics),
            Kind::Thanos => validate_variant(&self.thanos, &mut diagnostics),
        }

        if let Some(timeouts) = &self.timeouts {
            for op in [Operation::Create, Operation::Read, Operation::Update, Operation::Delete] {
                if let Err(diagnostic) = timeouts.get(op, config.dbaas.default_timeout) {
                    diagnostics.extend(diagnostic.into());
                }
            }
        }

        diagnostics
    }

    /// returns a diagnostic on each attribute whose change can not be
    /// applied in place, the host has to replace the service instead
    pub fn replacements(&self, state: &Service) -> Diagnostics {
        let mut diagnostics = Diagnostics::default();

        if self.name != state.name {
            diagnostics.push("name", REPLACEMENT);
        }

        if self.zone != state.zone {
            diagnostics.push("zone", REPLACEMENT);
        }

        if self.kind != state.kind {
            diagnostics.push("type", REPLACEMENT);
            return diagnostics;
        }

        match self.kind {
            Kind::Pg => replacements(&self.pg, &state.pg, &mut diagnostics),
            Kind::Mysql => replacements(&self.mysql, &state.mysql, &mut diagnostics),
            Kind::Kafka => replacements(&self.kafka, &state.kafka, &mut diagnostics),
            Kind::Opensearch => replacements(&self.opensearch, &state.opensearch, &mut diagnostics),
            Kind::Valkey => replacements(&self.valkey, &state.valkey, &mut diagnostics),
            Kind::Grafana => replacements(&self.grafana, &state.grafana, &mut diagnostics),
            Kind::Thanos => replacements(&self.thanos, &state.thanos, &mut diagnostics),
        }

        diagnostics
    }
}

// -----------------------------------------------------------------------------
// Helpers functions

fn normalized(version: &Attr<String>, kind: Kind) -> Attr<String> {
    match version {
        Attr::Value(version) => Attr::Value(kind::spec(kind).normalize_version(version)),
        version => version.to_owned(),
    }
}

fn replacements<T>(planned: &Attr<T>, state: &Attr<T>, diagnostics: &mut Diagnostics)
where
    T: Variant,
{
    let (planned, state) = match (planned.value(), state.value()) {
        (Some(planned), Some(state)) => (planned, state),
        _ => return,
    };

    let block = T::KIND.to_string();
    for ((attribute, planned), (_, state)) in planned.create_only().into_iter().zip(state.create_only()) {
        if planned.differs(&state) {
            diagnostics.push(format!("{}.{}", block, attribute), REPLACEMENT);
        }
    }
}

fn validate_variant<T>(variant: &Attr<T>, diagnostics: &mut Diagnostics)
where
    T: Variant,
{
    let variant = match variant.value() {
        Some(variant) => variant,
        None => return,
    };

    let block = T::KIND.to_string();
    if let Some(cidrs) = variant.ip_filter().value() {
        validate_ip_filter(&format!("{}.ip_filter", block), cidrs, diagnostics);
    }

    for (attribute, doc) in variant.settings() {
        if let Some(doc) = doc.value() {
            if let Err(diagnostic) = settings::parse(&format!("{}.{}", block, attribute), doc) {
                diagnostics.extend(diagnostic.into());
            }
        }
    }

    variant.validate(&block, diagnostics);
}

/// reports every element that is not a cidr with a prefix length in [0, 128]
pub fn validate_ip_filter(path: &str, cidrs: &BTreeSet<String>, diagnostics: &mut Diagnostics) {
    for cidr in cidrs {
        let (addr, prefix) = match cidr.split_once('/') {
            Some(parts) => parts,
            None => {
                diagnostics.push(path, &format!("failed to parse cidr '{}', missing prefix length", cidr));
                continue;
            }
        };

        if addr.parse::<IpAddr>().is_err() {
            diagnostics.push(path, &format!("failed to parse cidr '{}', invalid address '{}'", cidr, addr));
            continue;
        }

        match prefix.parse::<u32>() {
            Ok(prefix) if prefix <= 128 => {}
            Ok(prefix) => diagnostics.push(
                path,
                &format!("invalid cidr '{}', prefix length {} is out of range [0, 128]", cidr, prefix),
            ),
            Err(_) => diagnostics.push(
                path,
                &format!("failed to parse cidr '{}', invalid prefix length '{}'", cidr, prefix),
            ),
        }
    }
}

fn validate_backup_schedule(block: &str, schedule: &Attr<String>, diagnostics: &mut Diagnostics) {
    if let Some(schedule) = schedule.value() {
        if let Err(diagnostic) = parse_backup_schedule(&format!("{}.backup_schedule", block), schedule) {
            diagnostics.extend(diagnostic.into());
        }
    }
}

fn range(diagnostics: &mut Diagnostics, path: &str, value: &Attr<i64>, min: i64, max: i64) {
    if let Some(value) = value.value() {
        if *value < min || *value > max {
            let summary = if max == i64::MAX {
                format!("value {} must be greater than or equal to {}", value, min)
            } else {
                format!("value {} is out of range [{}, {}]", value, min, max)
            };

            diagnostics.push(path, &summary);
        }
    }
}

/// parses a `HH:MM` backup schedule, values out of the usual ranges are left
/// for the api to judge
pub fn parse_backup_schedule(path: &str, schedule: &str) -> Result<BackupSchedule, Diagnostic> {
    let err = || Diagnostic {
        path: path.to_string(),
        summary: format!("failed to parse backup schedule '{}', expected format is 'HH:MM'", schedule),
    };

    let (hour, minute) = schedule.split_once(':').ok_or_else(err)?;
    let decimal = |s: &str| -> Result<i64, Diagnostic> {
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(err());
        }

        s.parse::<i64>().map_err(|_| err())
    };

    Ok(BackupSchedule {
        hour: decimal(hour)?,
        minute: decimal(minute)?,
    })
}

pub fn format_backup_schedule(schedule: &BackupSchedule) -> String {
    format!("{:02}:{:02}", schedule.hour, schedule.minute)
}
