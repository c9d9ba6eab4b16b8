//! # Settings module
//!
//! This module provide the validator of free-form settings documents against
//! the json schema published by the api, and the patch used to reconcile a
//! sparse user document with the server one.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::svc::{
    apis::{
        self,
        dbaas::{Document, Settings},
        RestClient,
    },
    dbaas::{
        kind::{Family, Kind},
        Diagnostic, Error,
    },
};

// -----------------------------------------------------------------------------
// Helpers functions

/// returns the settings document parsed as a json object
pub fn parse(path: &str, doc: &str) -> Result<Document, Diagnostic> {
    match serde_json::from_str::<Value>(doc) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Diagnostic {
            path: path.to_string(),
            summary: "failed to parse settings, expected a json object".to_string(),
        }),
        Err(err) => Err(Diagnostic {
            path: path.to_string(),
            summary: format!("failed to parse settings, {}", err),
        }),
    }
}

/// returns the settings document serialized as stored in state
pub fn serialize(doc: &Document) -> String {
    Value::Object(doc.to_owned()).to_string()
}

/// returns if both documents hold the same settings, whatever their layout
pub fn same(a: &str, b: &str) -> bool {
    match (
        serde_json::from_str::<Value>(a),
        serde_json::from_str::<Value>(b),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// validate the document against the schema and returns it parsed, a schema
/// that cannot be loaded locally skips validation as the server validates
/// authoritatively
pub fn validate(path: &str, doc: &str, schema: &Value) -> Result<Document, Diagnostic> {
    let map = parse(path, doc)?;
    let validator = match jsonschema::validator_for(schema) {
        Ok(validator) => validator,
        Err(err) => {
            warn!(
                path = path,
                error = err.to_string(),
                "Could not load settings schema, skip local validation"
            );
            return Ok(map);
        }
    };

    let instance = Value::Object(map.to_owned());
    let errors = validator
        .iter_errors(&instance)
        .map(|err| {
            let location = err.instance_path.to_string();
            if location.is_empty() {
                err.to_string()
            } else {
                format!("{}: {}", location, err)
            }
        })
        .collect::<Vec<_>>();

    if !errors.is_empty() {
        return Err(Diagnostic {
            path: path.to_string(),
            summary: format!("invalid settings, {}", errors.join(", ")),
        });
    }

    Ok(map)
}

/// returns the user document where each key takes the server value, keys
/// the server does not know anymore are dropped
pub fn partial_patch(user: &Document, server: &Document) -> Document {
    user.keys()
        .filter_map(|key| server.get(key).map(|value| (key.to_owned(), value.to_owned())))
        .collect()
}

// -----------------------------------------------------------------------------
// SchemaCache structure

/// fetches the settings schemas of a kind at most once per invocation
#[derive(Clone, Debug, Default)]
pub struct SchemaCache {
    schemas: BTreeMap<Kind, Settings>,
}

impl SchemaCache {
    pub async fn get<C>(
        &mut self,
        client: &C,
        kind: Kind,
        family: &Family,
    ) -> Result<Option<Value>, Error>
    where
        C: RestClient,
    {
        if !self.schemas.contains_key(&kind) {
            debug!(kind = kind.to_string(), "Retrieve settings schemas");
            let settings = apis::dbaas::settings(client, kind).await?;
            self.schemas.insert(kind, settings);
        }

        Ok(self
            .schemas
            .get(&kind)
            .and_then(|settings| settings.settings.get(family.schema))
            .map(ToOwned::to_owned))
    }

    /// validate the document of the family against the latest server schema
    pub async fn validate<C>(
        &mut self,
        client: &C,
        kind: Kind,
        family: &Family,
        path: &str,
        doc: &str,
    ) -> Result<Document, Error>
    where
        C: RestClient,
    {
        match self.get(client, kind, family).await? {
            Some(schema) => Ok(validate(path, doc, &schema)?),
            None => {
                warn!(
                    kind = kind.to_string(),
                    family = family.schema,
                    "No settings schema published for family, skip local validation"
                );
                Ok(parse(path, doc)?)
            }
        }
    }
}
