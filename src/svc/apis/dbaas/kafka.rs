//! # Kafka module
//!
//! This module provide structures and helpers to interact with the kafka
//! service endpoints

use serde::{Deserialize, Serialize};

use crate::svc::apis::{
    dbaas::{self, Common, Document, Kind, Maintenance},
    operation::Operation,
    Error, RestClient,
};

// -----------------------------------------------------------------------------
// AuthenticationMethods structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct AuthenticationMethods {
    #[serde(rename = "certificate", skip_serializing_if = "Option::is_none", default)]
    pub certificate: Option<bool>,
    #[serde(rename = "sasl", skip_serializing_if = "Option::is_none", default)]
    pub sasl: Option<bool>,
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
    #[serde(rename = "authentication-methods", default)]
    pub authentication_methods: Option<AuthenticationMethods>,
    #[serde(rename = "kafka-connect-enabled", default)]
    pub kafka_connect_enabled: Option<bool>,
    #[serde(rename = "kafka-rest-enabled", default)]
    pub kafka_rest_enabled: Option<bool>,
    #[serde(rename = "schema-registry-enabled", default)]
    pub schema_registry_enabled: Option<bool>,
    #[serde(rename = "kafka-settings", default)]
    pub kafka_settings: Option<Document>,
    #[serde(rename = "kafka-connect-settings", default)]
    pub kafka_connect_settings: Option<Document>,
    #[serde(rename = "kafka-rest-settings", default)]
    pub kafka_rest_settings: Option<Document>,
    #[serde(rename = "schema-registry-settings", default)]
    pub schema_registry_settings: Option<Document>,
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
    #[serde(rename = "authentication-methods", skip_serializing_if = "Option::is_none")]
    pub authentication_methods: Option<AuthenticationMethods>,
    #[serde(rename = "kafka-connect-enabled", skip_serializing_if = "Option::is_none")]
    pub kafka_connect_enabled: Option<bool>,
    #[serde(rename = "kafka-rest-enabled", skip_serializing_if = "Option::is_none")]
    pub kafka_rest_enabled: Option<bool>,
    #[serde(rename = "schema-registry-enabled", skip_serializing_if = "Option::is_none")]
    pub schema_registry_enabled: Option<bool>,
    #[serde(rename = "kafka-settings", skip_serializing_if = "Option::is_none")]
    pub kafka_settings: Option<Document>,
    #[serde(rename = "kafka-connect-settings", skip_serializing_if = "Option::is_none")]
    pub kafka_connect_settings: Option<Document>,
    #[serde(rename = "kafka-rest-settings", skip_serializing_if = "Option::is_none")]
    pub kafka_rest_settings: Option<Document>,
    #[serde(rename = "schema-registry-settings", skip_serializing_if = "Option::is_none")]
    pub schema_registry_settings: Option<Document>,
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
    #[serde(rename = "authentication-methods", skip_serializing_if = "Option::is_none")]
    pub authentication_methods: Option<AuthenticationMethods>,
    #[serde(rename = "kafka-connect-enabled", skip_serializing_if = "Option::is_none")]
    pub kafka_connect_enabled: Option<bool>,
    #[serde(rename = "kafka-rest-enabled", skip_serializing_if = "Option::is_none")]
    pub kafka_rest_enabled: Option<bool>,
    #[serde(rename = "schema-registry-enabled", skip_serializing_if = "Option::is_none")]
    pub schema_registry_enabled: Option<bool>,
    #[serde(rename = "kafka-settings", skip_serializing_if = "Option::is_none")]
    pub kafka_settings: Option<Document>,
    #[serde(rename = "kafka-connect-settings", skip_serializing_if = "Option::is_none")]
    pub kafka_connect_settings: Option<Document>,
    #[serde(rename = "kafka-rest-settings", skip_serializing_if = "Option::is_none")]
    pub kafka_rest_settings: Option<Document>,
    #[serde(rename = "schema-registry-settings", skip_serializing_if = "Option::is_none")]
    pub schema_registry_settings: Option<Document>,
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
    dbaas::get(client, Kind::Kafka, name).await
}

pub async fn create<C>(client: &C, name: &str, opts: &CreateOpts) -> Result<Operation, Error>
where
    C: RestClient,
{
    dbaas::create(client, Kind::Kafka, name, opts).await
}

pub async fn update<C>(client: &C, name: &str, opts: &UpdateOpts) -> Result<Operation, Error>
where
    C: RestClient,
{
    dbaas::update(client, Kind::Kafka, name, opts).await
}
