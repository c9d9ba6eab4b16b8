//! # List module
//!
//! This module provide the read-only views of the command line interface

use std::sync::Arc;

use async_trait::async_trait;
use clap::{Args, Subcommand};
use serde_json::{Map, Value};

use crate::{
    cmd::{self, Executor, IoError, Output},
    svc::{
        cfg::Configuration,
        dbaas::{self, uri},
        filter,
    },
};

// -----------------------------------------------------------------------------
// Error enum

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Io(IoError),
    #[error("failed to parse filter, {0}")]
    Filter(serde_json::Error),
    #[error("failed to parse filter, expect a json object")]
    FilterNotAnObject,
    #[error("{0}")]
    List(filter::Error),
    #[error("{0}")]
    Controller(dbaas::Error),
}

impl From<IoError> for Error {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl From<filter::Error> for Error {
    fn from(err: filter::Error) -> Self {
        Self::List(err)
    }
}

impl From<dbaas::Error> for Error {
    fn from(err: dbaas::Error) -> Self {
        Self::Controller(err)
    }
}

// -----------------------------------------------------------------------------
// Helpers functions

/// returns the filter given as a json object, no filter match everything
pub fn parse_filter(filter: Option<&str>) -> Result<Map<String, Value>, Error> {
    match filter {
        None => Ok(Map::new()),
        Some(filter) => match serde_json::from_str(filter).map_err(Error::Filter)? {
            Value::Object(object) => Ok(object),
            _ => Err(Error::FilterNotAnObject),
        },
    }
}

// -----------------------------------------------------------------------------
// List enum

#[derive(Subcommand, Clone, Debug)]
pub enum List {
    /// List the database services of a zone
    #[clap(name = "services", aliases = &["svc"])]
    Services {
        /// Zone to list
        #[clap(short = 'z', long = "zone")]
        zone: String,
        /// Filter as a json object, strings written as '/.../' are regular
        /// expressions
        #[clap(short = 'f', long = "filter")]
        filter: Option<String>,
    },
}

#[async_trait]
impl Executor for List {
    type Error = Error;

    async fn execute(&self, config: Arc<Configuration>, output: Output) -> Result<(), Self::Error> {
        let ctrl = cmd::controller(config);

        match self {
            Self::Services { zone, filter } => {
                let filter = parse_filter(filter.as_deref())?;
                let list = filter::services(&ctrl, zone, &filter).await?;

                cmd::print(output, &list)?;
            }
        }

        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Connection structure

#[derive(Args, Clone, Debug)]
pub struct Connection {
    /// Type of the service, 'redis' is accepted for valkey services
    #[clap(short = 't', long = "type")]
    pub kind: String,
    /// Name of the service
    #[clap(short = 'n', long = "name")]
    pub name: String,
    /// Zone of the service
    #[clap(short = 'z', long = "zone")]
    pub zone: String,
}

#[async_trait]
impl Executor for Connection {
    type Error = Error;

    async fn execute(&self, config: Arc<Configuration>, output: Output) -> Result<(), Self::Error> {
        let ctrl = cmd::controller(config);
        let connection = uri::read(&ctrl, &self.kind, &self.name, &self.zone).await?;

        cmd::print(output, &connection)?;
        Ok(())
    }
}
