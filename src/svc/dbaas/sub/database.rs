//! # Database module
//!
//! This module provide the logical database of a mysql or pg service

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::svc::{
    apis::{
        dbaas::{self as api, CreateDatabaseOpts},
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
// Database structure

/// declarative model of a logical database of a managed database service
#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Database {
    /// computed, `service/database_name`
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub id: Attr<String>,
    pub service: String,
    pub database_name: String,
    pub zone: String,
    #[serde(rename = "type")]
    pub kind: Kind,
    /// pg only, create-only
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub lc_collate: Attr<String>,
    /// pg only, create-only
    #[serde(default, skip_serializing_if = "Attr::is_unknown")]
    pub lc_ctype: Attr<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeouts: Option<Timeouts>,
}

impl Database {
    pub fn new(service: &str, database_name: &str, zone: &str, kind: Kind) -> Self {
        Self {
            id: Attr::Unknown,
            service: service.to_string(),
            database_name: database_name.to_string(),
            zone: zone.to_string(),
            kind,
            lc_collate: Attr::Unknown,
            lc_ctype: Attr::Unknown,
            timeouts: None,
        }
    }
}

#[async_trait]
impl SubResource for Database {
    const NAME: &'static str = "database";
    const NAME_ATTRIBUTE: &'static str = "database_name";

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
        &self.database_name
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
        match kind::spec(self.kind).databases {
            true => Some(Readiness::Running),
            false => None,
        }
    }

    fn imported(id: &SubResourceId, kind: Kind) -> Self {
        let mut database = Self::new(&id.service, &id.name, &id.zone, kind);
        database.id = Attr::Value(id.state_id());
        database
    }

    fn validate(&self, diagnostics: &mut Diagnostics) {
        if self.kind != Kind::Pg {
            if self.lc_collate.is_known() {
                diagnostics.push("lc_collate", "is only supported by pg databases");
            }

            if self.lc_ctype.is_known() {
                diagnostics.push("lc_ctype", "is only supported by pg databases");
            }
        }
    }

    fn replacements(&self, state: &Self, diagnostics: &mut Diagnostics) {
        if self.lc_collate.differs(&state.lc_collate) {
            diagnostics.push("lc_collate", REPLACEMENT);
        }

        if self.lc_ctype.differs(&state.lc_ctype) {
            diagnostics.push("lc_ctype", REPLACEMENT);
        }
    }

    async fn create_resource<C>(&mut self, client: &C) -> Result<Operation, Error>
    where
        C: RestClient,
    {
        let opts = CreateDatabaseOpts {
            database_name: self.database_name.to_owned(),
            lc_collate: self.lc_collate.value().cloned(),
            lc_ctype: self.lc_ctype.value().cloned(),
        };

        Ok(api::create_database(client, self.kind, &self.service, &opts).await?)
    }

    async fn read_resource<C>(&mut self, client: &C) -> Result<(), Error>
    where
        C: RestClient,
    {
        let head = api::head(client, self.kind, &self.service).await?;
        if !head.databases.contains(&self.database_name) {
            return Err(Error::NotFoundInParent(
                "database",
                self.database_name.to_owned(),
                self.service.to_owned(),
            ));
        }

        // locales are never reported back
        self.id = Attr::Value(self.generate_id());
        self.lc_collate = std::mem::take(&mut self.lc_collate).or_null();
        self.lc_ctype = std::mem::take(&mut self.lc_ctype).or_null();

        Ok(())
    }

    async fn delete_resource<C>(&self, client: &C) -> Result<Operation, Error>
    where
        C: RestClient,
    {
        Ok(api::delete_database(client, self.kind, &self.service, &self.database_name).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::svc::{
        apis::testing::Fake,
        cfg::Configuration,
        dbaas::{service, sub, Controller},
    };

    use super::*;

    async fn setup(client: &Fake) -> Controller<Fake> {
        let ctrl = Controller::new(client.to_owned(), Arc::new(Configuration::default()));
        let planned = serde_json::from_value(json!({
            "name": "t1", "zone": "z1", "type": "pg", "plan": "hobbyist-2", "pg": {}
        }))
        .expect("model to deserialize");

        service::create(&ctrl, planned).await.expect("service to be created");
        ctrl
    }

    #[tokio::test(start_paused = true)]
    async fn locales_are_sent_to_their_own_field() {
        let client = Fake::new("z1");
        let ctrl = setup(&client).await;

        let mut database = Database::new("t1", "app", "z1", Kind::Pg);
        database.lc_collate = Attr::Value("fr_CH.UTF-8".to_string());
        database.lc_ctype = Attr::Value("C".to_string());

        let database = sub::create(&ctrl, database).await.expect("database to be created");
        let post = client.mutations().pop().expect("a creation to be sent");
        let body = post.body.expect("a body to be sent");

        assert_eq!("/dbaas-postgres/t1/database", post.path);
        assert_eq!(json!("fr_CH.UTF-8"), body["lc-collate"]);
        assert_eq!(json!("C"), body["lc-ctype"]);
        assert_eq!(Attr::Value("t1/app".to_string()), database.id);
        assert_eq!(Attr::Value("C".to_string()), database.lc_ctype);
    }

    #[tokio::test(start_paused = true)]
    async fn import_resolves_locales_to_null() {
        let client = Fake::new("z1");
        let ctrl = setup(&client).await;

        sub::create(&ctrl, Database::new("t1", "app", "z1", Kind::Pg))
            .await
            .expect("database to be created");

        let imported = sub::import::<_, Database>(&ctrl, "t1/app@z1").await.expect("database to be imported");
        assert_eq!(Kind::Pg, imported.kind);

        let imported = sub::read(&ctrl, imported).await.expect("database to be read");
        assert_eq!(Attr::Null, imported.lc_collate);
        assert_eq!(Attr::Null, imported.lc_ctype);

        sub::delete(&ctrl, &imported).await.expect("database to be deleted");
        let err = sub::read(&ctrl, imported).await.expect_err("database to be gone");
        assert!(matches!(err, Error::NotFoundInParent("database", _, _)), "{}", err);
    }

    #[tokio::test(start_paused = true)]
    async fn update_keeps_the_observed_state() {
        let client = Fake::new("z1");
        let ctrl = setup(&client).await;

        let state = sub::create(&ctrl, Database::new("t1", "app", "z1", Kind::Pg))
            .await
            .expect("database to be created");
        let count = client.mutations().len();

        let mut planned = Database::new("t1", "app", "z1", Kind::Pg);
        planned.timeouts = Some(Timeouts {
            create: Some("5m".to_string()),
            ..Default::default()
        });

        let updated = sub::update(&ctrl, state.to_owned(), planned).await.expect("update to succeed");
        assert_eq!(count, client.mutations().len());
        assert_eq!(state.id, updated.id);
        assert_eq!(Some("5m".to_string()), updated.timeouts.and_then(|t| t.create));
    }

    #[tokio::test(start_paused = true)]
    async fn changed_locales_have_to_be_replaced() {
        let client = Fake::new("z1");
        let ctrl = setup(&client).await;

        let mut database = Database::new("t1", "app", "z1", Kind::Pg);
        database.lc_collate = Attr::Value("C".to_string());
        let state = sub::create(&ctrl, database).await.expect("database to be created");

        let mut planned = Database::new("t1", "app", "z2", Kind::Pg);
        planned.lc_collate = Attr::Value("fr_CH.UTF-8".to_string());

        let err = sub::update(&ctrl, state.to_owned(), planned).await.expect_err("update to be rejected");
        match err {
            Error::Validation(diagnostics) => {
                assert!(diagnostics.contains("zone"), "{}", diagnostics);
                assert!(diagnostics.contains("lc_collate"), "{}", diagnostics);
                assert!(!diagnostics.contains("lc_ctype"), "{}", diagnostics);
            }
            err => panic!("expect a validation error, got {}", err),
        }

        // locales left unset at creation are never read back
        let mut planned = Database::new("t1", "app", "z1", Kind::Pg);
        planned.lc_ctype = Attr::Value("C".to_string());
        sub::update(&ctrl, state, planned).await.expect("unset locales to be accepted");
    }

    #[test]
    fn locales_are_pg_only() {
        let mut database = Database::new("m1", "app", "z1", Kind::Mysql);
        database.lc_collate = Attr::Value("C".to_string());

        let diagnostics = sub::validate(&Configuration::default(), &database);
        assert!(diagnostics.contains("lc_collate"));
        assert!(!diagnostics.contains("lc_ctype"));

        let database = Database::new("k1", "app", "z1", Kind::Kafka);
        assert!(sub::validate(&Configuration::default(), &database).contains("type"));
    }
}
