//! # Grafana module
//!
//! This module provide structures and helpers to interact with the grafana
//! service endpoints

use serde::{Deserialize, Serialize};

use crate::svc::apis::{
    dbaas::{self, Common, Document, Kind, Maintenance},
    operation::Operation,
    Error, RestClient,
};

// -----------------------------------------------------------------------------
// Service structure

#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct Service {
    #[serde(flatten)]
    pub common: Common,
    #[serde(rename = "ip-filter", default)]
    pub ip_filter: Option<Vec<String>>,
    #[serde(rename = "grafana-settings", default)]
    pub grafana_settings: Option<Document>,
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
    #[serde(rename = "grafana-settings", skip_serializing_if = "Option::is_none")]
    pub grafana_settings: Option<Document>,
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
    #[serde(rename = "grafana-settings", skip_serializing_if = "Option::is_none")]
    pub grafana_settings: Option<Document>,
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
    dbaas::get(client, Kind::Grafana, name).await
}

pub async fn create<C>(client: &C, name: &str, opts: &CreateOpts) -> Result<Operation, Error>
where
    C: RestClient,
{
    dbaas::create(client, Kind::Grafana, name, opts).await
}

pub async fn update<C>(client: &C, name: &str, opts: &UpdateOpts) -> Result<Operation, Error>
where
    C: RestClient,
{
    dbaas::update(client, Kind::Grafana, name, opts).await
}
