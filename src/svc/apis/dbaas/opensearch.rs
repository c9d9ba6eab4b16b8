//! # OpenSearch module
//!
//! This module provide structures and helpers to interact with the
//! opensearch service endpoints

use serde::{Deserialize, Serialize};

use crate::svc::apis::{
    dbaas::{self, Common, Document, Kind, Maintenance},
    operation::Operation,
    Error, RestClient,
};

// -----------------------------------------------------------------------------
// IndexPattern structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct IndexPattern {
    #[serde(rename = "max-index-count", skip_serializing_if = "Option::is_none", default)]
    pub max_index_count: Option<i64>,
    #[serde(rename = "pattern", skip_serializing_if = "Option::is_none", default)]
    pub pattern: Option<String>,
    #[serde(rename = "sorting-algorithm", skip_serializing_if = "Option::is_none", default)]
    pub sorting_algorithm: Option<String>,
}

// -----------------------------------------------------------------------------
// IndexTemplate structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct IndexTemplate {
    #[serde(rename = "mapping-nested-objects-limit", skip_serializing_if = "Option::is_none", default)]
    pub mapping_nested_objects_limit: Option<i64>,
    #[serde(rename = "number-of-replicas", skip_serializing_if = "Option::is_none", default)]
    pub number_of_replicas: Option<i64>,
    #[serde(rename = "number-of-shards", skip_serializing_if = "Option::is_none", default)]
    pub number_of_shards: Option<i64>,
}

// -----------------------------------------------------------------------------
// Dashboards structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct Dashboards {
    #[serde(rename = "enabled", skip_serializing_if = "Option::is_none", default)]
    pub enabled: Option<bool>,
    #[serde(rename = "max-old-space-size", skip_serializing_if = "Option::is_none", default)]
    pub max_old_space_size: Option<i64>,
    #[serde(rename = "opensearch-request-timeout", skip_serializing_if = "Option::is_none", default)]
    pub request_timeout: Option<i64>,
}

// -----------------------------------------------------------------------------
// Service structure

#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct Service {
    #[serde(flatten)]
    pub common: Common,
    #[serde(rename = "version", default)]
    pub version: Option<String>,
    #[serde(rename = "ip-filter", default)]
    pub ip_filter: Option<Vec<String>>,
    #[serde(rename = "keep-index-refresh-interval", default)]
    pub keep_index_refresh_interval: Option<bool>,
    #[serde(rename = "index-patterns", default)]
    pub index_patterns: Option<Vec<IndexPattern>>,
    #[serde(rename = "index-template", default)]
    pub index_template: Option<IndexTemplate>,
    #[serde(rename = "opensearch-dashboards", default)]
    pub dashboards: Option<Dashboards>,
    #[serde(rename = "opensearch-settings", default)]
    pub opensearch_settings: Option<Document>,
}

// -----------------------------------------------------------------------------
// CreateOpts structure

#[derive(Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
pub struct CreateOpts {
    #[serde(rename = "plan")]
    pub plan: String,
    #[serde(rename = "termination-protection", skip_serializing_if = "Option::is_none")]
    pub termination_protection: Option<bool>,
    #[serde(rename = "maintenance", skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<Maintenance>,
    #[serde(rename = "ip-filter", skip_serializing_if = "Option::is_none")]
    pub ip_filter: Option<Vec<String>>,
    #[serde(rename = "version", skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "fork-from-service", skip_serializing_if = "Option::is_none")]
    pub fork_from_service: Option<String>,
    #[serde(rename = "recovery-backup-name", skip_serializing_if = "Option::is_none")]
    pub recovery_backup_name: Option<String>,
    #[serde(rename = "keep-index-refresh-interval", skip_serializing_if = "Option::is_none")]
    pub keep_index_refresh_interval: Option<bool>,
    #[serde(rename = "index-patterns", skip_serializing_if = "Option::is_none")]
    pub index_patterns: Option<Vec<IndexPattern>>,
    #[serde(rename = "index-template", skip_serializing_if = "Option::is_none")]
    pub index_template: Option<IndexTemplate>,
    #[serde(rename = "opensearch-dashboards", skip_serializing_if = "Option::is_none")]
    pub dashboards: Option<Dashboards>,
    #[serde(rename = "opensearch-settings", skip_serializing_if = "Option::is_none")]
    pub opensearch_settings: Option<Document>,
}

// -----------------------------------------------------------------------------
// UpdateOpts structure

#[derive(Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
pub struct UpdateOpts {
    #[serde(rename = "plan", skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(rename = "termination-protection", skip_serializing_if = "Option::is_none")]
    pub termination_protection: Option<bool>,
    #[serde(rename = "maintenance", skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<Maintenance>,
    #[serde(rename = "ip-filter", skip_serializing_if = "Option::is_none")]
    pub ip_filter: Option<Vec<String>>,
    #[serde(rename = "keep-index-refresh-interval", skip_serializing_if = "Option::is_none")]
    pub keep_index_refresh_interval: Option<bool>,
    #[serde(rename = "index-patterns", skip_serializing_if = "Option::is_none")]
    pub index_patterns: Option<Vec<IndexPattern>>,
    #[serde(rename = "index-template", skip_serializing_if = "Option::is_none")]
    pub index_template: Option<IndexTemplate>,
    #[serde(rename = "opensearch-dashboards", skip_serializing_if = "Option::is_none")]
    pub dashboards: Option<Dashboards>,
    #[serde(rename = "opensearch-settings", skip_serializing_if = "Option::is_none")]
    pub opensearch_settings: Option<Document>,
}

impl UpdateOpts {
    pub fn is_empty(&self) -> bool {
        Self::default() == *self
    }
}

// -----------------------------------------------------------------------------
// Helpers functions

pub async fn get<C>(client: &C, name: &str) -> Result<Service, Error>
where
    C: RestClient,
{
    dbaas::get(client, Kind::Opensearch, name).await
}

pub async fn create<C>(client: &C, name: &str, opts: &CreateOpts) -> Result<Operation, Error>
where
    C: RestClient,
{
    dbaas::create(client, Kind::Opensearch, name, opts).await
}

pub async fn update<C>(client: &C, name: &str, opts: &UpdateOpts) -> Result<Operation, Error>
where
    C: RestClient,
{
    dbaas::update(client, Kind::Opensearch, name, opts).await
}
