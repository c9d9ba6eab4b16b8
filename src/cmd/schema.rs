//! # Schema module
//!
//! This module provide the command that prints the json schema of the
//! declarative resources

use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
    sync::Arc,
};

use async_trait::async_trait;
use clap::Args;
use schemars::{schema::RootSchema, schema_for};

use crate::{
    cmd::{self, Executor, IoError, Output},
    svc::{
        cfg::Configuration,
        dbaas::{
            model::Service,
            sub::{database::Database, user::User},
            uri::ConnectionUri,
        },
    },
};

// -----------------------------------------------------------------------------
// Error enum

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Io(IoError),
}

impl From<IoError> for Error {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

// -----------------------------------------------------------------------------
// Resource enum

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Resource {
    Service,
    User,
    Database,
    Connection,
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "service" => Ok(Self::Service),
            "user" => Ok(Self::User),
            "database" => Ok(Self::Database),
            "connection" => Ok(Self::Connection),
            _ => Err(format!(
                "failed to parse resource '{}', available options are 'service', 'user', 'database' or 'connection'",
                s
            )),
        }
    }
}

impl Display for Resource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service => write!(f, "service"),
            Self::User => write!(f, "user"),
            Self::Database => write!(f, "database"),
            Self::Connection => write!(f, "connection"),
        }
    }
}

impl Resource {
    pub fn schema(&self) -> RootSchema {
        match self {
            Self::Service => schema_for!(Service),
            Self::User => schema_for!(User),
            Self::Database => schema_for!(Database),
            Self::Connection => schema_for!(ConnectionUri),
        }
    }
}

// -----------------------------------------------------------------------------
// Schema structure

#[derive(Args, Clone, Debug)]
pub struct Schema {
    /// Resource to describe, 'service', 'user', 'database' or 'connection'
    #[clap(default_value_t = Resource::Service)]
    pub resource: Resource,
}

#[async_trait]
impl Executor for Schema {
    type Error = Error;

    async fn execute(&self, _config: Arc<Configuration>, output: Output) -> Result<(), Self::Error> {
        cmd::print(output, &self.resource.schema())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resources_are_described() {
        let schema = serde_json::to_value(Resource::Service.schema()).expect("schema to serialize");
        let properties = &schema["properties"];

        assert!(properties.get("name").is_some());
        assert!(properties.get("pg").is_some());
        assert!(properties.get("timeouts").is_some());

        let schema = serde_json::to_value(Resource::User.schema()).expect("schema to serialize");
        assert!(schema["properties"].get("username").is_some());

        assert_eq!(Ok(Resource::Database), "Database".parse());
        assert!("cluster".parse::<Resource>().is_err());
    }
}
