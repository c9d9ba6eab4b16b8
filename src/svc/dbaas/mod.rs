//! # Database-as-a-service module
//!
//! This module provide the resource controllers of managed database services
//! and their sub-resources, along with the helpers they are built on.

use std::{sync::Arc, time::Duration};

use tokio::time::Instant;

use crate::svc::{
    apis::{self, RestClient},
    cfg::Configuration,
};

pub mod attr;
pub mod diag;
pub mod id;
pub mod kind;
pub mod model;
pub mod service;
pub mod settings;
pub mod state;
pub mod sub;
pub mod uri;
pub mod waiter;

pub use diag::{Diagnostic, Diagnostics};

// -----------------------------------------------------------------------------
// Error enum

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to validate configuration, {0}")]
    Validation(Diagnostics),
    #[error("failed to find resource '{0}', it has been removed upstream")]
    NotFound(String),
    #[error("failed to execute request, got unexpected status '{0}'")]
    UnexpectedStatus(String),
    #[error("failed to execute request on the api, {0}")]
    Transport(apis::Error),
    #[error("failed to wait for operation '{0}', {1}")]
    OperationFailed(String, String),
    #[error("failed to wait for {0}, context deadline exceeded")]
    DeadlineExceeded(String),
    #[error("failed to parse import identifier '{0}', expected format is '{1}'")]
    Import(String, &'static str),
    #[error("failed to find {0} '{1}' in service '{2}'")]
    NotFoundInParent(&'static str, String, String),
}

impl From<apis::Error> for Error {
    fn from(err: apis::Error) -> Self {
        match err {
            apis::Error::NotFound(path) => Self::NotFound(path),
            apis::Error::UnexpectedStatus(status) => Self::UnexpectedStatus(status),
            apis::Error::StatusCode(status, body) => Self::UnexpectedStatus(format!("{}, {}", status, body)),
            err => Self::Transport(err),
        }
    }
}

impl From<Diagnostics> for Error {
    fn from(diagnostics: Diagnostics) -> Self {
        Self::Validation(diagnostics)
    }
}

impl From<Diagnostic> for Error {
    fn from(diagnostic: Diagnostic) -> Self {
        Self::Validation(Diagnostics::from(diagnostic))
    }
}

impl Error {
    /// returns if the host should drop the resource from its state
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::NotFoundInParent(_, _, _))
    }
}

// -----------------------------------------------------------------------------
// Operation enum

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

// -----------------------------------------------------------------------------
// Context structure

/// deadline of a single resource invocation, every waiter honours it
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Context {
    deadline: Instant,
}

impl Context {
    pub fn new(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

// -----------------------------------------------------------------------------
// Controller structure

/// contains the client to interact with the api and the configuration
#[derive(Clone, Debug)]
pub struct Controller<C> {
    pub apis: C,
    pub config: Arc<Configuration>,
}

impl<C> From<(C, Arc<Configuration>)> for Controller<C> {
    fn from((apis, config): (C, Arc<Configuration>)) -> Self {
        Self { apis, config }
    }
}

impl<C> Controller<C>
where
    C: RestClient,
{
    pub fn new(apis: C, config: Arc<Configuration>) -> Self {
        Self::from((apis, config))
    }

    /// returns a client bound to the zone, sharing the same credentials
    pub fn zoned(&self, zone: &str) -> C {
        self.apis.with_zone(zone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_map_onto_the_taxonomy() {
        let err = Error::from(apis::Error::NotFound("/dbaas-postgres/t1".into()));
        assert!(err.is_not_found());

        let err = Error::from(apis::Error::UnexpectedStatus("202 Accepted".into()));
        assert!(matches!(err, Error::UnexpectedStatus(ref status) if status == "202 Accepted"));
        assert!(!err.is_not_found());

        let err = Error::from(apis::Error::StatusCode(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"message":"boom"}"#.into(),
        ));
        assert!(matches!(err, Error::UnexpectedStatus(ref status) if status.contains("500") && status.contains("boom")));

        let err = Error::NotFoundInParent("user", "foo".into(), "k1".into());
        assert!(err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn context_expires_after_timeout() {
        let ctx = Context::new(Duration::from_secs(10));
        assert!(Instant::now() < ctx.deadline());

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(Instant::now() >= ctx.deadline());
    }
}
