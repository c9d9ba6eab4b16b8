//! # Service kind registry
//!
//! This module provide the table of supported kinds of service along with
//! their settings families, sub-resources and connection scheme

pub use crate::svc::apis::dbaas::Kind;

// -----------------------------------------------------------------------------
// Family structure

/// a free-form settings document of a kind, `attribute` is the name of the
/// declarative attribute and `schema` the key of its json schema in the
/// settings endpoint response
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Family {
    pub attribute: &'static str,
    pub schema: &'static str,
}

// -----------------------------------------------------------------------------
// Readiness enum

/// condition a service has to meet before users can be created on it
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Readiness {
    Running,
    UsersReady,
}

// -----------------------------------------------------------------------------
// Spec structure

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Spec {
    pub kind: Kind,
    pub settings: &'static [Family],
    pub users: Option<Readiness>,
    pub databases: bool,
    pub scheme: Option<&'static str>,
    /// number of version components kept in state, zero when the kind has
    /// no version attribute
    pub version_components: usize,
    pub backup_schedule: bool,
}

// -----------------------------------------------------------------------------
// Registry

pub const PG: Spec = Spec {
    kind: Kind::Pg,
    settings: &[
        Family {
            attribute: "pg_settings",
            schema: "pg",
        },
        Family {
            attribute: "pgbouncer_settings",
            schema: "pgbouncer",
        },
        Family {
            attribute: "pglookout_settings",
            schema: "pglookout",
        },
    ],
    users: Some(Readiness::UsersReady),
    databases: true,
    scheme: Some("postgres"),
    version_components: 1,
    backup_schedule: true,
};

pub const MYSQL: Spec = Spec {
    kind: Kind::Mysql,
    settings: &[Family {
        attribute: "mysql_settings",
        schema: "mysql",
    }],
    users: Some(Readiness::Running),
    databases: true,
    scheme: Some("mysql"),
    version_components: 1,
    backup_schedule: true,
};

pub const KAFKA: Spec = Spec {
    kind: Kind::Kafka,
    settings: &[
        Family {
            attribute: "kafka_settings",
            schema: "kafka",
        },
        Family {
            attribute: "kafka_connect_settings",
            schema: "kafka-connect",
        },
        Family {
            attribute: "kafka_rest_settings",
            schema: "kafka-rest",
        },
        Family {
            attribute: "schema_registry_settings",
            schema: "schema-registry",
        },
    ],
    users: Some(Readiness::UsersReady),
    databases: false,
    scheme: None,
    version_components: 2,
    backup_schedule: false,
};

pub const OPENSEARCH: Spec = Spec {
    kind: Kind::Opensearch,
    settings: &[Family {
        attribute: "settings",
        schema: "opensearch",
    }],
    users: Some(Readiness::UsersReady),
    databases: false,
    scheme: Some("https"),
    version_components: 1,
    backup_schedule: false,
};

pub const VALKEY: Spec = Spec {
    kind: Kind::Valkey,
    settings: &[Family {
        attribute: "valkey_settings",
        schema: "valkey",
    }],
    users: None,
    databases: false,
    scheme: Some("rediss"),
    version_components: 1,
    backup_schedule: false,
};

pub const GRAFANA: Spec = Spec {
    kind: Kind::Grafana,
    settings: &[Family {
        attribute: "grafana_settings",
        schema: "grafana",
    }],
    users: None,
    databases: false,
    scheme: Some("https"),
    version_components: 0,
    backup_schedule: false,
};

pub const THANOS: Spec = Spec {
    kind: Kind::Thanos,
    settings: &[Family {
        attribute: "thanos_settings",
        schema: "thanos",
    }],
    users: None,
    databases: false,
    scheme: Some("https"),
    version_components: 0,
    backup_schedule: false,
};

/// returns the registry entry of the kind
pub fn spec(kind: Kind) -> &'static Spec {
    match kind {
        Kind::Pg => &PG,
        Kind::Mysql => &MYSQL,
        Kind::Kafka => &KAFKA,
        Kind::Opensearch => &OPENSEARCH,
        Kind::Valkey => &VALKEY,
        Kind::Grafana => &GRAFANA,
        Kind::Thanos => &THANOS,
    }
}

impl Spec {
    /// returns the settings family bound to the declarative attribute
    pub fn family(&self, attribute: &str) -> Option<&'static Family> {
        self.settings.iter().find(|family| family.attribute == attribute)
    }

    /// returns the version as stored in state, only the leading components
    /// are kept (e.g. `15.4` becomes `15` and `3.7.1` becomes `3.7`)
    pub fn normalize_version(&self, version: &str) -> String {
        if self.version_components == 0 {
            return version.to_string();
        }

        version
            .split('.')
            .take(self.version_components)
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_an_entry() {
        for kind in Kind::ALL {
            assert_eq!(kind, spec(kind).kind);
            assert!(!spec(kind).settings.is_empty());
        }
    }

    #[test]
    fn versions_are_normalized_by_kind() {
        assert_eq!("15", spec(Kind::Pg).normalize_version("15.4"));
        assert_eq!("8", spec(Kind::Mysql).normalize_version("8.0.30"));
        assert_eq!("2", spec(Kind::Opensearch).normalize_version("2.11.0"));
        assert_eq!("3.7", spec(Kind::Kafka).normalize_version("3.7.1"));
        assert_eq!("3.7", spec(Kind::Kafka).normalize_version("3.7"));
        assert_eq!("16", spec(Kind::Pg).normalize_version("16"));
        assert_eq!("7", spec(Kind::Valkey).normalize_version("7.2.5"));
    }

    #[test]
    fn connection_schemes() {
        assert_eq!(Some("postgres"), spec(Kind::Pg).scheme);
        assert_eq!(Some("mysql"), spec(Kind::Mysql).scheme);
        assert_eq!(Some("rediss"), spec(Kind::Valkey).scheme);
        assert_eq!(Some("https"), spec(Kind::Opensearch).scheme);
        assert_eq!(Some("https"), spec(Kind::Grafana).scheme);
        assert_eq!(None, spec(Kind::Kafka).scheme);
    }

    #[test]
    fn settings_families_are_bound_to_attributes() {
        assert_eq!(
            Some("pgbouncer"),
            spec(Kind::Pg).family("pgbouncer_settings").map(|f| f.schema)
        );
        assert_eq!(None, spec(Kind::Mysql).family("pg_settings"));
    }
}
