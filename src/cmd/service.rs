//! # Service module
//!
//! This module provide the command line interface of the service resource,
//! the state is read from and written to state documents

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use clap::Subcommand;
use tokio::time::{sleep, timeout_at};
use tracing::{info, warn};

use crate::{
    cmd::{self, Executor, IoError, Output},
    svc::{
        cfg::Configuration,
        dbaas::{self, model, model::Service as Model, service, Context, Operation},
    },
};

// -----------------------------------------------------------------------------
// Error enum

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Io(IoError),
    #[error("{0}")]
    Controller(dbaas::Error),
    #[error("failed to wait for service '{0}' to be destroyed, context deadline exceeded")]
    DestroyCheck(String),
}

impl From<IoError> for Error {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl From<dbaas::Error> for Error {
    fn from(err: dbaas::Error) -> Self {
        Self::Controller(err)
    }
}

impl From<dbaas::Diagnostic> for Error {
    fn from(err: dbaas::Diagnostic) -> Self {
        Self::Controller(err.into())
    }
}

// -----------------------------------------------------------------------------
// Service enum

#[derive(Subcommand, Clone, Debug)]
pub enum Service {
    /// Validate the declarative model of a service
    #[clap(name = "validate")]
    Validate {
        /// Location of the declarative model
        planned: PathBuf,
    },
    /// Create the service and print its state
    #[clap(name = "create")]
    Create {
        /// Location of the declarative model
        planned: PathBuf,
    },
    /// Refresh the state of the service
    #[clap(name = "refresh")]
    Refresh {
        /// Location of the state document
        state: PathBuf,
    },
    /// Apply the changes between the state and the declarative model
    #[clap(name = "update")]
    Update {
        /// Location of the state document
        state: PathBuf,
        /// Location of the declarative model
        planned: PathBuf,
    },
    /// Destroy the service
    #[clap(name = "destroy")]
    Destroy {
        /// Location of the state document
        state: PathBuf,
        /// Wait for the service to be removed upstream
        #[clap(short = 'w', long = "wait")]
        wait: bool,
    },
    /// Import an existing service, the identifier is 'name@zone'
    #[clap(name = "import")]
    Import { id: String },
}

#[async_trait]
impl Executor for Service {
    type Error = Error;

    async fn execute(&self, config: Arc<Configuration>, output: Output) -> Result<(), Self::Error> {
        let ctrl = cmd::controller(config);

        match self {
            Self::Validate { planned } => {
                let planned: Model = cmd::read(planned)?;
                let diagnostics = service::validate(&ctrl, &planned);

                cmd::print(output, &diagnostics)?;
                diagnostics.into_result()?;
            }
            Self::Create { planned } => {
                let state = service::create(&ctrl, cmd::read(planned)?).await?;

                cmd::print_state(output, &state)?;
            }
            Self::Refresh { state } => {
                let state: Model = cmd::read_state(state)?;
                let name = state.name.to_owned();

                match service::read(&ctrl, state).await {
                    Ok(state) => cmd::print_state(output, &state)?,
                    Err(err) if err.is_not_found() => {
                        warn!(name = &name, "Service has been removed upstream, drop it from state");
                        cmd::print(output, &serde_json::Value::Null)?;
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            Self::Update { state, planned } => {
                let state = service::update(&ctrl, cmd::read_state(state)?, cmd::read(planned)?).await?;

                cmd::print_state(output, &state)?;
            }
            Self::Destroy { state, wait } => {
                let state: Model = cmd::read_state(state)?;

                service::delete(&ctrl, &state).await?;
                if *wait {
                    destroy_check(&ctrl, &state).await?;
                }

                info!(name = &state.name, zone = &state.zone, "Service destroyed");
            }
            Self::Import { id } => {
                let state = service::import(&ctrl, id).await?;
                let state = service::read(&ctrl, state).await?;

                cmd::print_state(output, &state)?;
            }
        }

        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Helpers functions

/// polls the service until it is reported as not found
pub async fn destroy_check<C>(ctrl: &dbaas::Controller<C>, state: &Model) -> Result<(), Error>
where
    C: crate::svc::apis::RestClient,
{
    let ctx = Context::new(model::timeout(&state.timeouts, Operation::Delete, &ctrl.config)?);
    let poll = async {
        loop {
            match service::read(ctrl, state.to_owned()).await {
                Err(err) if err.is_not_found() => return Ok(()),
                Err(err) => return Err(Error::Controller(err)),
                Ok(_) => sleep(ctrl.config.dbaas.poll_interval).await,
            }
        }
    };

    timeout_at(ctx.deadline(), poll)
        .await
        .map_err(|_| Error::DestroyCheck(state.name.to_owned()))?
}
