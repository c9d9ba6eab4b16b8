//! # Identifier module
//!
//! This module provide parsers and formatters of the identifiers of services
//! and their sub-resources

use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use crate::svc::dbaas::Error;

// -----------------------------------------------------------------------------
// Constants

pub const SERVICE_FORMAT: &str = "name@zone";
pub const SUB_RESOURCE_FORMAT: &str = "service/name@zone";

// -----------------------------------------------------------------------------
// ServiceId structure

/// import identifier of a service, `name@zone`
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ServiceId {
    pub name: String,
    pub zone: String,
}

impl FromStr for ServiceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s.split('@').collect::<Vec<_>>();
        match parts.as_slice() {
            [name, zone] if !name.is_empty() && !zone.is_empty() => Ok(Self {
                name: name.to_string(),
                zone: zone.to_string(),
            }),
            _ => Err(Error::Import(s.to_string(), SERVICE_FORMAT)),
        }
    }
}

impl Display for ServiceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.zone)
    }
}

// -----------------------------------------------------------------------------
// SubResourceId structure

/// import identifier of a user or a database, `service/name@zone`
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct SubResourceId {
    pub service: String,
    pub name: String,
    pub zone: String,
}

impl SubResourceId {
    /// returns the identifier stored in state, `service/name`
    pub fn state_id(&self) -> String {
        state_id(&self.service, &self.name)
    }
}

impl FromStr for SubResourceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || Error::Import(s.to_string(), SUB_RESOURCE_FORMAT);
        let parts = s.split('@').collect::<Vec<_>>();
        let (path, zone) = match parts.as_slice() {
            [path, zone] if !zone.is_empty() => (*path, *zone),
            _ => return Err(err()),
        };

        let parts = path.split('/').collect::<Vec<_>>();
        match parts.as_slice() {
            [service, name] if !service.is_empty() && !name.is_empty() => Ok(Self {
                service: service.to_string(),
                name: name.to_string(),
                zone: zone.to_string(),
            }),
            _ => Err(err()),
        }
    }
}

impl Display for SubResourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.service, self.name, self.zone)
    }
}

// -----------------------------------------------------------------------------
// Helpers functions

pub fn state_id(service: &str, name: &str) -> String {
    format!("{}/{}", service, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_identifier_round_trips() {
        for (name, zone) in [("t1", "z1"), ("my-pg", "ch-gva-2"), ("a.b", "de-fra-1")] {
            let id = ServiceId {
                name: name.to_string(),
                zone: zone.to_string(),
            };

            assert_eq!(id, id.to_string().parse::<ServiceId>().expect("id to parse"));
        }
    }

    #[test]
    fn malformed_service_identifiers_are_rejected() {
        for s in ["only-name", "@z1", "t1@", "t1@z1@z2", ""] {
            let err = s.parse::<ServiceId>().expect_err("id to be rejected");

            assert!(matches!(err, Error::Import(_, SERVICE_FORMAT)));
            assert!(err.to_string().contains("name@zone"), "{}", err);
        }
    }

    #[test]
    fn sub_resource_identifier_round_trips() {
        let id = "k1/foo@z1".parse::<SubResourceId>().expect("id to parse");

        assert_eq!("k1", id.service);
        assert_eq!("foo", id.name);
        assert_eq!("z1", id.zone);
        assert_eq!("k1/foo", id.state_id());
        assert_eq!("k1/foo@z1", id.to_string());
    }

    #[test]
    fn malformed_sub_resource_identifiers_are_rejected() {
        for s in ["k1@z1", "k1/foo", "/foo@z1", "k1/@z1", "k1/foo@", "k1/foo/bar@z1", "k1/foo@z1@z2"] {
            let err = s.parse::<SubResourceId>().expect_err("id to be rejected");

            assert!(err.to_string().contains(SUB_RESOURCE_FORMAT), "{}", err);
        }
    }
}
