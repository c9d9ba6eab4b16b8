//! # Command module
//!
//! This module provide command line interface structures and helpers
use std::{
    fmt::{self, Display, Formatter},
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use async_trait::async_trait;
use clap::{ArgAction, Parser, Subcommand};
use serde::{de::DeserializeOwned, Serialize};

use crate::svc::{
    apis::Client,
    cfg::Configuration,
    dbaas::{
        state,
        sub::{database::Database, user::User},
        Controller,
    },
};

pub mod list;
pub mod schema;
pub mod service;
pub mod sub;

// -----------------------------------------------------------------------------
// Executor trait

#[async_trait]
pub trait Executor {
    type Error;

    async fn execute(&self, config: Arc<Configuration>, output: Output) -> Result<(), Self::Error>;
}

// -----------------------------------------------------------------------------
// Output enum

#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub enum Output {
    #[default]
    Json,
    Yaml,
}

impl FromStr for Output {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            _ => Err(format!("failed to parse output '{}', available options are 'json' or 'yaml'", s)),
        }
    }
}

impl Display for Output {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}

// -----------------------------------------------------------------------------
// IoError enum

#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error("failed to read file '{0}', {1}")]
    Read(PathBuf, std::io::Error),
    #[error("failed to parse file '{0}', {1}")]
    Parse(PathBuf, serde_json::Error),
    #[error("failed to serialize to json, {0}")]
    Json(serde_json::Error),
    #[error("failed to serialize to yaml, {0}")]
    Yaml(serde_yaml::Error),
    #[error("failed to load state, {0}")]
    State(state::Error),
}

// -----------------------------------------------------------------------------
// Helpers functions

/// returns the document stored in the file
pub fn read<T>(path: &Path) -> Result<T, IoError>
where
    T: DeserializeOwned,
{
    let buf = fs::read(path).map_err(|err| IoError::Read(path.to_owned(), err))?;

    serde_json::from_slice(&buf).map_err(|err| IoError::Parse(path.to_owned(), err))
}

/// returns the resource of the state document stored in the file, upgraded
/// to the current schema version
pub fn read_state<T>(path: &Path) -> Result<T, IoError>
where
    T: DeserializeOwned,
{
    read::<state::Document>(path)?
        .into_resource()
        .map_err(IoError::State)
}

/// prints the value in the requested format
pub fn print<T>(output: Output, value: &T) -> Result<(), IoError>
where
    T: Serialize,
{
    let buf = match output {
        Output::Json => serde_json::to_string_pretty(value).map_err(IoError::Json)?,
        Output::Yaml => serde_yaml::to_string(value).map_err(IoError::Yaml)?,
    };

    println!("{}", buf.trim_end());
    Ok(())
}

/// prints the resource wrapped in a state document
pub fn print_state<T>(output: Output, resource: &T) -> Result<(), IoError>
where
    T: Serialize,
{
    print(output, &state::Document::new(resource).map_err(IoError::State)?)
}

/// returns the controller bound to the first configured zone, flows switch
/// to the zone of the resource they handle
pub fn controller(config: Arc<Configuration>) -> Controller<Client> {
    let zone = config.dbaas.zones.first().cloned().unwrap_or_default();

    Controller::new(Client::new(config.to_owned(), &zone), config)
}

// -----------------------------------------------------------------------------
// CommandError enum

#[derive(thiserror::Error, Debug)]
pub enum CommandError {
    #[error("failed to execute command '{0}', {1}")]
    Execution(String, Arc<CommandError>),
    #[error("failed to execute command, {0}")]
    Service(service::Error),
    #[error("failed to execute command, {0}")]
    SubResource(sub::Error),
    #[error("failed to execute command, {0}")]
    List(list::Error),
    #[error("failed to execute command, {0}")]
    Schema(schema::Error),
}

// -----------------------------------------------------------------------------
// Command enum

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Manage a database service
    #[clap(name = "service", aliases = &["svc"], subcommand)]
    Service(service::Service),
    /// Manage a user of a database service
    #[clap(name = "user", subcommand)]
    User(sub::Verb),
    /// Manage a logical database of a database service
    #[clap(name = "database", aliases = &["db"], subcommand)]
    Database(sub::Verb),
    /// List resources of a zone
    #[clap(name = "list", aliases = &["ls"], subcommand)]
    List(list::List),
    /// Print the connection parameters of a database service
    #[clap(name = "connection")]
    Connection(list::Connection),
    /// Print the json schema of a declarative resource
    #[clap(name = "schema")]
    Schema(schema::Schema),
}

#[async_trait]
impl Executor for Command {
    type Error = CommandError;

    async fn execute(&self, config: Arc<Configuration>, output: Output) -> Result<(), Self::Error> {
        let (name, result) = match self {
            Self::Service(cmd) => (
                "service",
                cmd.execute(config, output).await.map_err(CommandError::Service),
            ),
            Self::User(verb) => (
                "user",
                sub::execute::<User>(verb, config, output)
                    .await
                    .map_err(CommandError::SubResource),
            ),
            Self::Database(verb) => (
                "database",
                sub::execute::<Database>(verb, config, output)
                    .await
                    .map_err(CommandError::SubResource),
            ),
            Self::List(cmd) => (
                "list",
                cmd.execute(config, output).await.map_err(CommandError::List),
            ),
            Self::Connection(cmd) => (
                "connection",
                cmd.execute(config, output).await.map_err(CommandError::List),
            ),
            Self::Schema(cmd) => (
                "schema",
                cmd.execute(config, output).await.map_err(CommandError::Schema),
            ),
        };

        result.map_err(|err| CommandError::Execution(name.into(), Arc::new(err)))
    }
}

// -----------------------------------------------------------------------------
// Args struct

#[derive(Parser, Clone, Debug)]
#[clap(author, version, about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Args {
    /// Increase log verbosity
    #[clap(short = 'v', global = true, action = ArgAction::Count)]
    pub verbosity: u8,
    /// Specify location of configuration
    #[clap(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,
    /// Check if configuration is healthy
    #[clap(long = "check", global = true)]
    pub check: bool,
    /// Output format, 'json' or 'yaml'
    #[clap(short = 'o', long = "output", global = true, default_value_t = Output::Json)]
    pub output: Output,
    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn arguments_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn verbosity_and_output_are_global() {
        let args = Args::parse_from(["dbaas-controller", "schema", "-vvv", "-o", "yaml"]);

        assert_eq!(3, args.verbosity);
        assert_eq!(Output::Yaml, args.output);
    }

    #[test]
    fn connection_type_does_not_clash_with_global_flags() {
        let args = Args::parse_from([
            "dbaas-controller", "connection", "-t", "pg", "-n", "t1", "-z", "z1", "--check",
        ]);

        assert!(args.check);
        match args.command {
            Some(Command::Connection(connection)) => {
                assert_eq!("pg", connection.kind);
                assert_eq!("t1", connection.name);
                assert_eq!("z1", connection.zone);
            }
            command => panic!("expect a connection command, got {:?}", command),
        }
    }

    #[test]
    fn state_documents_are_upgraded_on_read() {
        let dir = tempfile::tempdir().expect("temporary directory to be created");
        let path = dir.path().join("state.json");

        fs::write(
            &path,
            r#"{"schema_version": 0, "resource": {"name": "t1", "zone": "z1", "type": "pg", "plan": "hobbyist-2", "pg": [{"version": "15"}]}}"#,
        )
        .expect("state to be written");

        let service: crate::svc::dbaas::model::Service = read_state(&path).expect("state to be read");
        assert!(service.pg.value().is_some());

        let err = read_state::<crate::svc::dbaas::model::Service>(&dir.path().join("missing.json"))
            .expect_err("file to be missing");
        assert!(matches!(err, IoError::Read(_, _)));
    }
}
