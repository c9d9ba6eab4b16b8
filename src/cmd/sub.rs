//! # Sub-resource module
//!
//! This module provide the command line interface of users and databases,
//! both share the same verbs

use std::{path::PathBuf, sync::Arc};

use clap::Subcommand;
use tracing::{info, warn};

use crate::{
    cmd::{self, IoError, Output},
    svc::{
        cfg::Configuration,
        dbaas::{
            self,
            sub::{self, SubResource},
        },
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

// -----------------------------------------------------------------------------
// Verb enum

#[derive(Subcommand, Clone, Debug)]
pub enum Verb {
    /// Validate the declarative model
    #[clap(name = "validate")]
    Validate {
        /// Location of the declarative model
        planned: PathBuf,
    },
    /// Create the resource once its service is ready and print its state
    #[clap(name = "create")]
    Create {
        /// Location of the declarative model
        planned: PathBuf,
    },
    /// Refresh the state of the resource
    #[clap(name = "refresh")]
    Refresh {
        /// Location of the state document
        state: PathBuf,
    },
    /// Carry the declarative model over the state, any other change requires
    /// a replacement
    #[clap(name = "update")]
    Update {
        /// Location of the state document
        state: PathBuf,
        /// Location of the declarative model
        planned: PathBuf,
    },
    /// Destroy the resource
    #[clap(name = "destroy")]
    Destroy {
        /// Location of the state document
        state: PathBuf,
    },
    /// Import an existing resource, the identifier is 'service/name@zone'
    #[clap(name = "import")]
    Import { id: String },
}

/// execute the verb on the sub-resource of the given type
pub async fn execute<S>(verb: &Verb, config: Arc<Configuration>, output: Output) -> Result<(), Error>
where
    S: SubResource,
{
    let ctrl = cmd::controller(config);

    match verb {
        Verb::Validate { planned } => {
            let planned: S = cmd::read(planned)?;
            let diagnostics = sub::validate(&ctrl.config, &planned);

            cmd::print(output, &diagnostics)?;
            diagnostics.into_result()?;
        }
        Verb::Create { planned } => {
            let state = sub::create::<_, S>(&ctrl, cmd::read(planned)?).await?;

            cmd::print_state(output, &state)?;
        }
        Verb::Refresh { state } => {
            let state: S = cmd::read_state(state)?;
            let id = state.generate_id();

            match sub::read(&ctrl, state).await {
                Ok(state) => cmd::print_state(output, &state)?,
                Err(err) if err.is_not_found() => {
                    warn!(id = &id, kind = S::NAME, "Resource has been removed upstream, drop it from state");
                    cmd::print(output, &serde_json::Value::Null)?;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Verb::Update { state, planned } => {
            let state = sub::update::<_, S>(&ctrl, cmd::read_state(state)?, cmd::read(planned)?).await?;

            cmd::print_state(output, &state)?;
        }
        Verb::Destroy { state } => {
            let state: S = cmd::read_state(state)?;

            sub::delete(&ctrl, &state).await?;
            info!(id = state.generate_id(), kind = S::NAME, "Resource destroyed");
        }
        Verb::Import { id } => {
            let state = sub::import::<_, S>(&ctrl, id).await?;
            let state = sub::read(&ctrl, state).await?;

            cmd::print_state(output, &state)?;
        }
    }

    Ok(())
}
