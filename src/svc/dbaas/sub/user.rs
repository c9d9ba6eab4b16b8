//! # User module
//!
//! This module provide the user of a managed database service, available on
//! kafka, mysql, opensearch and pg services. Every attribute forces a
//! replacement, secrets are revealed on each read.

use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::svc::{
    apis::{
        dbaas::{self as api, CreateUserOpts},
        operation::Operation,
        RestClient,
    },
    dbaas::{
        attr::Attr,
        id::SubResourceId,
        kind::{self, Kind, Readiness},
        model::{Timeouts, REPLACEMENT},
        sub::SubResource,
        Diagnostics, Error,
    },
};

// -----------------------------------------------------------------------------
// Authentication enum

/// authentication plugin of a mysql user
#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug)]
#[serde(rename_all = "snake_case")]
pub enum Authentication {
    CachingSha2Password,
    MysqlNativePassword,
}

impl FromStr for Authentication {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "caching_sha2_password" => Ok(Self::CachingSha2Password),
            "mysql_native_password" => Ok(Self::MysqlNativePassword),
            _ => Err(format!("failed to parse authentication '{}', available options are 'caching_sha2_password' and 'mysql_native_password'", s)),
        }
    }
}

impl Display for Authentication {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::CachingSha2Password => write!(f, "caching_sha2_password"),
            Self::MysqlNativePassword => write!(f, "mysql_native_password"),
        }
    }
}

// -----------------------------------------------------------------------------
// User structure

/// declarative model of a user of a managed database service
#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct User {
    /// computed, `service/username`
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub id: Attr<String>,
    pub service: String,
    pub username: String,
    pub zone: String,
    #[serde(rename = "type")]
    pub kind: Kind,
    /// mysql only
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub authentication: Attr<Authentication>,
    /// pg only
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub allow_replication: Attr<bool>,

    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub user_type: Attr<String>,
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub password: Attr<String>,
    /// kafka only
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub access_key: Attr<String>,
    /// kafka only
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub access_cert: Attr<String>,
    /// kafka only
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub access_cert_expiry: Attr<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeouts: Option<Timeouts>,
}

impl User {
    pub fn new(service: &str, username: &str, zone: &str, kind: Kind) -> Self {
        Self {
            id: Attr::Unknown,
            service: service.to_string(),
            username: username.to_string(),
            zone: zone.to_string(),
            kind,
            authentication: Attr::Unknown,
            allow_replication: Attr::Unknown,
            user_type: Attr::Unknown,
            password: Attr::Unknown,
            access_key: Attr::Unknown,
            access_cert: Attr::Unknown,
            access_cert_expiry: Attr::Unknown,
            timeouts: None,
        }
    }
}

#[async_trait]
impl SubResource for User {
    const NAME: &'static str = "user";
    const NAME_ATTRIBUTE: &'static str = "username";

    fn id(&self) -> &Attr<String> {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = Attr::Value(id);
    }

    fn service(&self) -> &str {
        &self.service
    }

    fn name(&self) -> &str {
        &self.username
    }

    fn zone(&self) -> &str {
        &self.zone
    }

    fn kind(&self) -> Kind {
        self.kind
    }

    fn timeouts(&self) -> &Option<Timeouts> {
        &self.timeouts
    }

    fn set_timeouts(&mut self, timeouts: Option<Timeouts>) {
        self.timeouts = timeouts;
    }

    fn readiness(&self) -> Option<Readiness> {
        kind::spec(self.kind).users
    }

    fn imported(id: &SubResourceId, kind: Kind) -> Self {
        let mut user = Self::new(&id.service, &id.name, &id.zone, kind);
        user.id = Attr::Value(id.state_id());
        user
    }

    fn validate(&self, diagnostics: &mut Diagnostics) {
        if self.authentication.is_known() && self.kind != Kind::Mysql {
            diagnostics.push("authentication", "is only supported by mysql users");
        }

        if self.allow_replication.is_known() && self.kind != Kind::Pg {
            diagnostics.push("allow_replication", "is only supported by pg users");
        }
    }

    fn replacements(&self, state: &Self, diagnostics: &mut Diagnostics) {
        if self.authentication.value().is_some() && self.authentication != state.authentication {
            diagnostics.push("authentication", REPLACEMENT);
        }

        if self.allow_replication.value().is_some() && self.allow_replication != state.allow_replication {
            diagnostics.push("allow_replication", REPLACEMENT);
        }
    }

    async fn create_resource<C>(&mut self, client: &C) -> Result<Operation, Error>
    where
        C: RestClient,
    {
        let opts = CreateUserOpts {
            username: self.username.to_owned(),
            authentication: self.authentication.value().map(ToString::to_string),
            allow_replication: self.allow_replication.value().copied(),
        };

        Ok(api::create_user(client, self.kind, &self.service, &opts).await?)
    }

    async fn read_resource<C>(&mut self, client: &C) -> Result<(), Error>
    where
        C: RestClient,
    {
        let head = api::head(client, self.kind, &self.service).await?;
        let user = head
            .common
            .users
            .into_iter()
            .find(|user| user.username == self.username)
            .ok_or_else(|| Error::NotFoundInParent("user", self.username.to_owned(), self.service.to_owned()))?;

        debug!(service = &self.service, username = &self.username, "Reveal user secrets");
        let revealed = api::reveal_user_password(client, self.kind, &self.service, &self.username).await?;

        self.id = Attr::Value(self.generate_id());
        self.user_type = Attr::from_option(user.kind);
        self.password = Attr::from_option(revealed.password);

        self.authentication = match self.kind {
            Kind::Mysql => std::mem::take(&mut self.authentication)
                .observe(user.authentication.and_then(|a| a.parse().ok())),
            _ => std::mem::take(&mut self.authentication).or_null(),
        };

        self.allow_replication = match self.kind {
            Kind::Pg => std::mem::take(&mut self.allow_replication).observe(user.allow_replication),
            _ => std::mem::take(&mut self.allow_replication).or_null(),
        };

        if self.kind == Kind::Kafka {
            self.access_key = Attr::from_option(revealed.access_key);
            self.access_cert = Attr::from_option(revealed.access_cert);
            self.access_cert_expiry = Attr::from_option(revealed.access_cert_expiry.or(user.access_cert_expiry));
        } else {
            self.access_key = Attr::Null;
            self.access_cert = Attr::Null;
            self.access_cert_expiry = Attr::Null;
        }

        Ok(())
    }

    async fn delete_resource<C>(&self, client: &C) -> Result<Operation, Error>
    where
        C: RestClient,
    {
        Ok(api::delete_user(client, self.kind, &self.service, &self.username).await?)
    }
}
