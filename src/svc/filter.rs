//! # Filter module
//!
//! This module provide the filter engine of list views, a filter is a json
//! object whose keys are attributes of the listed elements. Strings written
//! as `/.../` are regular expressions, maps match key by key and every
//! configured attribute has to match.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::svc::{
    apis::{self, dbaas::Summary, RestClient},
    dbaas::Controller,
};

// -----------------------------------------------------------------------------
// Constants

/// attributes of the elements of the service list view
pub const SERVICE_SCHEMA: [(&str, AttrType); 9] = [
    ("name", AttrType::String),
    ("type", AttrType::String),
    ("plan", AttrType::String),
    ("state", AttrType::String),
    ("zone", AttrType::String),
    ("node_count", AttrType::Int),
    ("disk_size", AttrType::Int),
    ("termination_protection", AttrType::Bool),
    ("created_at", AttrType::String),
];

// -----------------------------------------------------------------------------
// Error enum

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to build filter, attribute '{0}' is not filterable")]
    UnknownAttribute(String),
    #[error("failed to build filter, attribute '{0}' expect a value of type {1}")]
    Type(String, AttrType),
    #[error("failed to compile regular expression of attribute '{0}', {1}")]
    Regex(String, regex::Error),
    #[error("failed to list elements, {0}")]
    Api(apis::Error),
}

impl From<apis::Error> for Error {
    fn from(err: apis::Error) -> Self {
        Self::Api(err)
    }
}

// -----------------------------------------------------------------------------
// AttrType enum

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum AttrType {
    Bool,
    Int,
    String,
    Map,
}

impl std::fmt::Display for AttrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::String => write!(f, "string"),
            Self::Map => write!(f, "map of string"),
        }
    }
}

// -----------------------------------------------------------------------------
// Matcher enum

#[derive(Clone, Debug)]
pub enum Matcher {
    Exact(String),
    Regex(Regex),
}

impl Matcher {
    /// returns a regular expression matcher if the value is surrounded by
    /// slashes, an exact one otherwise
    pub fn parse(attribute: &str, value: &str) -> Result<Self, Error> {
        match value.strip_prefix('/').and_then(|v| v.strip_suffix('/')) {
            Some(expr) if value.len() >= 2 => Regex::new(expr)
                .map(Self::Regex)
                .map_err(|err| Error::Regex(attribute.to_string(), err)),
            _ => Ok(Self::Exact(value.to_string())),
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == value,
            Self::Regex(expr) => expr.is_match(value),
        }
    }
}

// -----------------------------------------------------------------------------
// Predicate enum

#[derive(Clone, Debug)]
pub enum Predicate {
    Bool(bool),
    Int(i64),
    String(Matcher),
    Map(BTreeMap<String, Matcher>),
}

impl Predicate {
    pub fn new(attribute: &str, kind: AttrType, value: &Value) -> Result<Self, Error> {
        let err = || Error::Type(attribute.to_string(), kind);

        match kind {
            AttrType::Bool => value.as_bool().map(Self::Bool).ok_or_else(err),
            AttrType::Int => value.as_i64().map(Self::Int).ok_or_else(err),
            AttrType::String => Ok(Self::String(Matcher::parse(attribute, value.as_str().ok_or_else(err)?)?)),
            AttrType::Map => {
                let mut matchers = BTreeMap::new();
                for (key, value) in value.as_object().ok_or_else(err)? {
                    let path = format!("{}.{}", attribute, key);
                    let value = value.as_str().ok_or_else(|| Error::Type(path.to_owned(), AttrType::String))?;

                    matchers.insert(key.to_owned(), Matcher::parse(&path, value)?);
                }

                Ok(Self::Map(matchers))
            }
        }
    }

    /// returns if the value of the datum matches, a missing or null value
    /// never matches
    pub fn matches(&self, value: Option<&Value>) -> bool {
        let value = match value {
            None | Some(Value::Null) => return false,
            Some(value) => value,
        };

        match self {
            Self::Bool(expected) => value.as_bool() == Some(*expected),
            Self::Int(expected) => value.as_i64() == Some(*expected),
            Self::String(matcher) => value.as_str().is_some_and(|v| matcher.matches(v)),
            Self::Map(matchers) => match value.as_object() {
                Some(object) => matchers.iter().all(|(key, matcher)| {
                    object
                        .get(key)
                        .and_then(Value::as_str)
                        .is_some_and(|v| matcher.matches(v))
                }),
                None => false,
            },
        }
    }
}

// -----------------------------------------------------------------------------
// Filter structure

/// predicates indexed by attribute
#[derive(Clone, Debug, Default)]
pub struct Filter {
    pub predicates: BTreeMap<String, Predicate>,
}

impl Filter {
    /// returns the filter built from its json configuration, attributes are
    /// checked against the schema of the listed elements
    pub fn new(schema: &[(&str, AttrType)], config: &Map<String, Value>) -> Result<Self, Error> {
        let mut predicates = BTreeMap::new();
        for (attribute, value) in config {
            let kind = schema
                .iter()
                .find(|(name, _)| *name == attribute.as_str())
                .map(|(_, kind)| *kind)
                .ok_or_else(|| Error::UnknownAttribute(attribute.to_owned()))?;

            predicates.insert(attribute.to_owned(), Predicate::new(attribute, kind, value)?);
        }

        Ok(Self { predicates })
    }
}

/// returns if the datum matches every predicate of the filter
pub fn check_for_match(datum: &Map<String, Value>, filter: &Filter) -> bool {
    filter
        .predicates
        .iter()
        .all(|(attribute, predicate)| predicate.matches(datum.get(attribute)))
}

// -----------------------------------------------------------------------------
// ServiceList structure

#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct ServiceList {
    #[serde(rename = "id")]
    pub id: String,
    #[serde(rename = "zone")]
    pub zone: String,
    #[serde(rename = "services")]
    pub services: Vec<Map<String, Value>>,
}

/// returns the element of the list view, tagged with the zone
pub fn element(zone: &str, summary: Summary) -> Map<String, Value> {
    let mut element = Map::new();

    element.insert("name".to_string(), Value::from(summary.name));
    element.insert("type".to_string(), Value::from(summary.kind));
    element.insert("plan".to_string(), Value::from(summary.plan));
    element.insert("state".to_string(), Value::from(summary.state));
    element.insert("zone".to_string(), Value::from(zone));
    element.insert("node_count".to_string(), Value::from(summary.node_count));
    element.insert("disk_size".to_string(), Value::from(summary.disk_size));
    element.insert("termination_protection".to_string(), Value::from(summary.termination_protection));
    element.insert(
        "created_at".to_string(),
        Value::from(summary.created_at.map(|at| at.to_rfc3339())),
    );

    element
}

/// returns a deterministic identifier of the list, computed from the zone
/// and the sorted names of its elements
pub fn aggregate_id(zone: &str, names: &[&str]) -> String {
    let mut names = names.to_vec();
    names.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(zone.as_bytes());
    for name in names {
        hasher.update(b"\n");
        hasher.update(name.as_bytes());
    }

    format!("{:x}", hasher.finalize())
}

/// returns the services of the zone which match the filter
pub async fn services<C>(ctrl: &Controller<C>, zone: &str, config: &Map<String, Value>) -> Result<ServiceList, Error>
where
    C: RestClient,
{
    let filter = Filter::new(&SERVICE_SCHEMA, config)?;
    let client = ctrl.zoned(zone);

    info!(zone = zone, predicates = filter.predicates.len(), "List services");
    let services = apis::dbaas::list(&client)
        .await?
        .into_iter()
        .map(|summary| element(zone, summary))
        .filter(|element| check_for_match(element, &filter))
        .collect::<Vec<_>>();

    let names = services
        .iter()
        .filter_map(|element| element.get("name").and_then(Value::as_str))
        .collect::<Vec<_>>();

    debug!(zone = zone, count = services.len(), "Services matched the filter");
    Ok(ServiceList {
        id: aggregate_id(zone, &names),
        zone: zone.to_string(),
        services,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::svc::{apis::testing::Fake, cfg::Configuration};

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(object) => object,
            _ => panic!("expect an object"),
        }
    }

    #[test]
    fn regex_and_exact_map_values() {
        let schema = [("labels", AttrType::Map)];
        let datum = object(json!({"labels": {"env": "production"}}));

        let filter = Filter::new(&schema, &object(json!({"labels": {"env": "/prod.*/"}}))).expect("filter to build");
        assert!(check_for_match(&datum, &filter));

        let filter = Filter::new(&schema, &object(json!({"labels": {"env": "prod"}}))).expect("filter to build");
        assert!(!check_for_match(&datum, &filter));

        let filter = Filter::new(&schema, &object(json!({"labels": {"team": "/.*/"}}))).expect("filter to build");
        assert!(!check_for_match(&datum, &filter));
    }

    #[test]
    fn predicates_are_typed() {
        let datum = object(json!({"name": "t1", "node_count": 3, "termination_protection": true, "state": null}));

        let filter = Filter::new(&SERVICE_SCHEMA, &object(json!({"name": "t1", "node_count": 3}))).expect("filter to build");
        assert!(check_for_match(&datum, &filter));

        let filter = Filter::new(&SERVICE_SCHEMA, &object(json!({"termination_protection": false}))).expect("filter to build");
        assert!(!check_for_match(&datum, &filter));

        let filter = Filter::new(&SERVICE_SCHEMA, &object(json!({"state": "/.*/"}))).expect("filter to build");
        assert!(!check_for_match(&datum, &filter));

        assert!(check_for_match(&datum, &Filter::default()));
    }

    #[test]
    fn invalid_filters_are_rejected() {
        assert!(matches!(
            Filter::new(&SERVICE_SCHEMA, &object(json!({"labels": {}}))),
            Err(Error::UnknownAttribute(_))
        ));
        assert!(matches!(
            Filter::new(&SERVICE_SCHEMA, &object(json!({"node_count": "3"}))),
            Err(Error::Type(_, AttrType::Int))
        ));
        assert!(matches!(
            Filter::new(&SERVICE_SCHEMA, &object(json!({"name": "/(/"}))),
            Err(Error::Regex(_, _))
        ));
    }

    #[test]
    fn lone_slash_is_an_exact_value() {
        assert!(matches!(Matcher::parse("name", "/"), Ok(Matcher::Exact(_))));
        assert!(matches!(Matcher::parse("name", "//"), Ok(Matcher::Regex(_))));
    }

    #[test]
    fn aggregate_id_is_deterministic() {
        assert_eq!(aggregate_id("z1", &["b", "a"]), aggregate_id("z1", &["a", "b"]));
        assert_ne!(aggregate_id("z1", &["a"]), aggregate_id("z2", &["a"]));
        assert_eq!(64, aggregate_id("z1", &[]).len());
    }

    #[tokio::test]
    async fn services_are_listed_per_zone() {
        let client = Fake::new("z1");
        let ctrl = Controller::new(client.to_owned(), Arc::new(Configuration::default()));

        client.insert_service("z1", json!({"name": "t1", "type": "pg", "plan": "hobbyist-2", "state": "running"}));
        client.insert_service("z1", json!({"name": "k1", "type": "kafka", "plan": "business-4", "state": "rebuilding"}));
        client.insert_service("z2", json!({"name": "t2", "type": "pg", "plan": "hobbyist-2", "state": "running"}));

        let list = services(&ctrl, "z1", &object(json!({"type": "pg"}))).await.expect("services to be listed");
        assert_eq!(1, list.services.len());
        assert_eq!(Some(&json!("t1")), list.services[0].get("name"));
        assert_eq!(Some(&json!("z1")), list.services[0].get("zone"));
        assert_eq!(aggregate_id("z1", &["t1"]), list.id);

        let list = services(&ctrl, "z1", &Map::new()).await.expect("services to be listed");
        assert_eq!(2, list.services.len());
    }
}
