//! # PostgreSQL module
//!
//! This module provide structures and helpers to interact with the
//! postgresql service endpoints

use serde::{Deserialize, Serialize};

use crate::svc::apis::{
    dbaas::{self, BackupSchedule, Common, Document, Kind, Maintenance},
    operation::Operation,
    Error, RestClient,
};

// -----------------------------------------------------------------------------
// Service structure

#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct Service {
    #[serde(flatten)]
    pub common: Common,
    #[serde(rename = "version", default)]
    pub version: Option<String>,
    #[serde(rename = "backup-schedule", default)]
    pub backup_schedule: Option<BackupSchedule>,
    #[serde(rename = "ip-filter", default)]
    pub ip_filter: Option<Vec<String>>,
    #[serde(rename = "pg-settings", default)]
    pub pg_settings: Option<Document>,
    #[serde(rename = "pgbouncer-settings", default)]
    pub pgbouncer_settings: Option<Document>,
    #[serde(rename = "pglookout-settings", default)]
    pub pglookout_settings: Option<Document>,
    #[serde(rename = "databases", default)]
    pub databases: Vec<String>,
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
    #[serde(rename = "backup-schedule", skip_serializing_if = "Option::is_none")]
    pub backup_schedule: Option<BackupSchedule>,
    #[serde(rename = "ip-filter", skip_serializing_if = "Option::is_none")]
    pub ip_filter: Option<Vec<String>>,
    #[serde(rename = "version", skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "admin-username", skip_serializing_if = "Option::is_none")]
    pub admin_username: Option<String>,
    #[serde(rename = "admin-password", skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
    #[serde(rename = "pg-settings", skip_serializing_if = "Option::is_none")]
    pub pg_settings: Option<Document>,
    #[serde(rename = "pgbouncer-settings", skip_serializing_if = "Option::is_none")]
    pub pgbouncer_settings: Option<Document>,
    #[serde(rename = "pglookout-settings", skip_serializing_if = "Option::is_none")]
    pub pglookout_settings: Option<Document>,
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
    #[serde(rename = "backup-schedule", skip_serializing_if = "Option::is_none")]
    pub backup_schedule: Option<BackupSchedule>,
    #[serde(rename = "ip-filter", skip_serializing_if = "Option::is_none")]
    pub ip_filter: Option<Vec<String>>,
    #[serde(rename = "pg-settings", skip_serializing_if = "Option::is_none")]
    pub pg_settings: Option<Document>,
    #[serde(rename = "pgbouncer-settings", skip_serializing_if = "Option::is_none")]
    pub pgbouncer_settings: Option<Document>,
    #[serde(rename = "pglookout-settings", skip_serializing_if = "Option::is_none")]
    pub pglookout_settings: Option<Document>,
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
    dbaas::get(client, Kind::Pg, name).await
}

pub async fn create<C>(client: &C, name: &str, opts: &CreateOpts) -> Result<Operation, Error>
where
    C: RestClient,
{
    dbaas::create(client, Kind::Pg, name, opts).await
}

pub async fn update<C>(client: &C, name: &str, opts: &UpdateOpts) -> Result<Operation, Error>
where
    C: RestClient,
{
    dbaas::update(client, Kind::Pg, name, opts).await
}
