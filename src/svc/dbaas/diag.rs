//! # Diagnostics module
//!
//! This module provide the diagnostics bag which accumulates attribute errors
//! of a validation step before reporting them together

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

// -----------------------------------------------------------------------------
// Diagnostic structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Diagnostic {
    #[serde(rename = "path")]
    pub path: String,
    #[serde(rename = "summary")]
    pub summary: String,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "attribute '{}', {}", self.path, self.summary)
    }
}

// -----------------------------------------------------------------------------
// Diagnostics structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct Diagnostics(pub Vec<Diagnostic>);

impl Display for Diagnostics {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let messages = self.0.iter().map(ToString::to_string).collect::<Vec<_>>();

        write!(f, "{}", messages.join("; "))
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self(vec![diagnostic])
    }
}

impl Diagnostics {
    pub fn push<P, S>(&mut self, path: P, summary: S)
    where
        P: Into<String>,
        S: Into<String>,
    {
        self.0.push(Diagnostic {
            path: path.into(),
            summary: summary.into(),
        });
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn has_error(&self) -> bool {
        !self.0.is_empty()
    }

    /// returns if one of the diagnostics is reported on the given path
    pub fn contains(&self, path: &str) -> bool {
        self.0.iter().any(|diagnostic| diagnostic.path == path)
    }

    /// aborts with the accumulated diagnostics, if any
    pub fn into_result(self) -> Result<(), super::Error> {
        if self.has_error() {
            return Err(super::Error::Validation(self));
        }

        Ok(())
    }
}
