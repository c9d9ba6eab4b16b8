//! # Operation module
//!
//! This module provide the asynchronous operation structure returned by
//! mutating endpoints and the helper to poll it

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::svc::apis::{Error, RestClient};

// -----------------------------------------------------------------------------
// State enum

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug)]
#[serde(rename_all = "kebab-case")]
pub enum State {
    Pending,
    Running,
    Success,
    Failure,
    Timeout,
}

impl State {
    /// returns if the operation reached a state it will never leave
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure | Self::Timeout)
    }
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

// -----------------------------------------------------------------------------
// Reference structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct Reference {
    #[serde(rename = "id", default)]
    pub id: Option<String>,
    #[serde(rename = "link", default)]
    pub link: Option<String>,
    #[serde(rename = "command", default)]
    pub command: Option<String>,
}

// -----------------------------------------------------------------------------
// Operation structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Operation {
    #[serde(rename = "id")]
    pub id: String,
    #[serde(rename = "state")]
    pub state: State,
    #[serde(rename = "reason", default)]
    pub reason: Option<String>,
    #[serde(rename = "message", default)]
    pub message: Option<String>,
    #[serde(rename = "reference", default)]
    pub reference: Option<Reference>,
}

// -----------------------------------------------------------------------------
// Helpers functions

/// returns the current view of the operation
pub async fn get<C>(client: &C, id: &str) -> Result<Operation, Error>
where
    C: RestClient,
{
    let path = format!("/operation/{}", id);

    debug!(path = &path, zone = client.zone(), "Execute a request to get an operation");
    client.get(&path).await?.ok()
}
