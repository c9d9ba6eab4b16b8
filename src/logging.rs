//! # Logging module
//!
//! This module provide the tracing subscriber of the controller. Events
//! describe the lifecycle of services and sub-resources (create, read,
//! update, delete, import), the readiness polling and every request sent
//! to the dbaas api. They are written on the standard error, the standard
//! output being reserved to the json or yaml documents printed by commands.

use tracing::Level;

// -----------------------------------------------------------------------------
// Error enumeration

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to install tracing subscriber as global default, {0}")]
    GlobalDefaultSubscriber(tracing::subscriber::SetGlobalDefaultError),
}

// -----------------------------------------------------------------------------
// helpers

/// maps the number of `-v` flags onto a level, errors only by default and
/// request payloads from `-vvvv`
pub const fn level(verbosity: usize) -> Level {
    match verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

pub fn initialize(verbosity: usize) -> Result<(), Error> {
    tracing::subscriber::set_global_default(
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(level(verbosity))
            .with_line_number(true)
            .with_target(true)
            .finish(),
    )
    .map_err(Error::GlobalDefaultSubscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_the_level() {
        assert_eq!(Level::ERROR, level(0));
        assert_eq!(Level::INFO, level(2));
        assert_eq!(Level::TRACE, level(4));
        assert_eq!(Level::TRACE, level(12));
    }
}
