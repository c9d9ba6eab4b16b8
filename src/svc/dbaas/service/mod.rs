//! # Service controller module
//!
//! This module provide the create, read, update, delete and import flows of a
//! managed database service. Each flow dispatches on the kind of the service
//! to the module building its requests and observing its responses.

use std::collections::BTreeSet;

use tokio::time::timeout_at;
use tracing::{debug, info};

use crate::svc::{
    apis::{
        self,
        dbaas::{BackupSchedule, Common, Document, Maintenance},
        operation::{Operation as ApiOperation, State},
        RestClient,
    },
    dbaas::{
        attr::Attr,
        id::ServiceId,
        kind::{self, Kind},
        model::{self, MaintenanceDow, Service},
        settings::{self, SchemaCache},
        waiter, Context, Controller, Diagnostic, Diagnostics, Error, Operation,
    },
};

pub mod grafana;
pub mod kafka;
pub mod mysql;
pub mod opensearch;
pub mod pg;
pub mod thanos;
pub mod valkey;

// -----------------------------------------------------------------------------
// Builder structure

/// accumulates the diagnostics raised while building a request, so that
/// every invalid attribute is reported before aborting
pub struct Builder<'a, C> {
    client: &'a C,
    kind: Kind,
    cache: SchemaCache,
    diagnostics: Diagnostics,
}

impl<'a, C> Builder<'a, C>
where
    C: RestClient,
{
    pub fn new(client: &'a C, kind: Kind) -> Self {
        Self {
            client,
            kind,
            cache: SchemaCache::default(),
            diagnostics: Diagnostics::default(),
        }
    }

    /// returns the settings document validated against the latest schema
    pub async fn settings(
        &mut self,
        attribute: &str,
        doc: &Attr<String>,
    ) -> Result<Option<Document>, Error> {
        let doc = match doc.value() {
            Some(doc) => doc,
            None => return Ok(None),
        };

        let path = format!("{}.{}", self.kind, attribute);
        let result = match kind::spec(self.kind).family(attribute) {
            Some(family) => {
                self.cache
                    .validate(self.client, self.kind, family, &path, doc)
                    .await
            }
            None => settings::parse(&path, doc).map_err(Error::from),
        };

        match result {
            Ok(doc) => Ok(Some(doc)),
            Err(Error::Validation(diagnostics)) => {
                self.diagnostics.extend(diagnostics);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// returns the settings document when it changed between state and plan
    pub async fn changed_settings(
        &mut self,
        attribute: &str,
        planned: &Attr<String>,
        state: &Attr<String>,
    ) -> Result<Option<Document>, Error> {
        match (planned.value(), state.value()) {
            (Some(planned), Some(state)) if settings::same(planned, state) => Ok(None),
            (Some(_), _) => {
                debug!(attribute = attribute, "Settings changed, validate them against the latest schema");
                self.settings(attribute, planned).await
            }
            _ => Ok(None),
        }
    }

    pub fn backup_schedule(&mut self, schedule: &Attr<String>) -> Option<BackupSchedule> {
        let path = format!("{}.backup_schedule", self.kind);
        match schedule.value().map(|s| model::parse_backup_schedule(&path, s)) {
            Some(Ok(schedule)) => Some(schedule),
            Some(Err(diagnostic)) => {
                self.diagnostics.extend(diagnostic.into());
                None
            }
            None => None,
        }
    }

    /// aborts before any remote mutation when something went wrong
    pub fn finish(self) -> Result<(), Error> {
        self.diagnostics.into_result()
    }
}

// -----------------------------------------------------------------------------
// CommonUpdate structure

/// changes of the attributes shared by every kind
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct CommonUpdate {
    pub plan: Option<String>,
    pub termination_protection: Option<bool>,
    pub maintenance: Option<Maintenance>,
}

impl CommonUpdate {
    pub fn diff(state: &Service, planned: &Service) -> Self {
        let plan = (planned.plan != state.plan).then(|| planned.plan.to_owned());

        let termination_protection = if planned
            .termination_protection
            .changed(&state.termination_protection)
        {
            planned.termination_protection.value().copied()
        } else {
            None
        };

        let maintenance = if planned.maintenance_dow.changed(&state.maintenance_dow)
            || planned.maintenance_time.changed(&state.maintenance_time)
        {
            planned.maintenance()
        } else {
            None
        };

        Self {
            plan,
            termination_protection,
            maintenance,
        }
    }
}

// -----------------------------------------------------------------------------
// Helpers functions

/// returns the block of the kind, its presence is checked by the validation
pub fn block<T>(attr: &Attr<T>, kind: Kind) -> Result<&T, Error> {
    attr.value().ok_or_else(|| {
        Error::from(Diagnostic {
            path: kind.to_string(),
            summary: format!("block is required when type is '{}'", kind),
        })
    })
}

pub fn ip_filter(attr: &Attr<BTreeSet<String>>) -> Option<Vec<String>> {
    attr.value().map(|cidrs| cidrs.iter().cloned().collect())
}

/// returns the ip filter to send when it changed, null clears it
pub fn ip_filter_update(
    planned: &Attr<BTreeSet<String>>,
    state: &Attr<BTreeSet<String>>,
) -> Option<Vec<String>> {
    if !planned.changed(state) {
        return None;
    }

    Some(ip_filter(planned).unwrap_or_default())
}

pub fn observe_ip_filter(
    attr: Attr<BTreeSet<String>>,
    server: Option<Vec<String>>,
) -> Attr<BTreeSet<String>> {
    attr.observe(
        server
            .filter(|cidrs| !cidrs.is_empty())
            .map(|cidrs| cidrs.into_iter().collect()),
    )
}

/// returns the settings as stored in state, only the keys of a document the
/// user wrote are kept
pub fn observe_settings(attr: Attr<String>, server: Option<Document>) -> Attr<String> {
    match (attr, server) {
        (Attr::Null, _) => Attr::Null,
        (_, None) => Attr::Null,
        (Attr::Value(user), Some(server)) => match serde_json::from_str::<Document>(&user) {
            Ok(user) => Attr::Value(settings::serialize(&settings::partial_patch(&user, &server))),
            Err(_) => Attr::Value(settings::serialize(&server)),
        },
        (Attr::Unknown, Some(server)) => Attr::Value(settings::serialize(&server)),
    }
}

pub fn observe_version(attr: Attr<String>, server: Option<String>, kind: Kind) -> Attr<String> {
    attr.observe(server.map(|version| kind::spec(kind).normalize_version(&version)))
}

fn schedule(schedule: &str) -> Option<BackupSchedule> {
    model::parse_backup_schedule("backup_schedule", schedule).ok()
}

/// returns the backup schedule as stored in state, the spelling of the user
/// is kept when it designates the schedule reported by the api
pub fn observe_backup_schedule(attr: Attr<String>, server: Option<BackupSchedule>) -> Attr<String> {
    let same = match (attr.value(), server.as_ref()) {
        (Some(planned), Some(server)) => schedule(planned).as_ref() == Some(server),
        _ => false,
    };

    if same {
        return attr;
    }

    attr.observe(server.as_ref().map(model::format_backup_schedule))
}

/// returns if the planned backup schedule differs from the state, schedules
/// are compared once parsed so that `1:23` equals `01:23`
pub fn backup_schedule_changed(planned: &Attr<String>, state: &Attr<String>) -> bool {
    match (planned.value(), state.value()) {
        (Some(planned), Some(state)) => match schedule(planned) {
            Some(planned) => Some(planned) != schedule(state),
            None => true,
        },
        _ => planned.changed(state),
    }
}

/// copies the computed and server-defaulted attributes shared by every kind
pub fn observe_common(model: &mut Service, common: &Common) {
    model.id = Attr::Value(model.name.to_owned());
    model.plan = common.plan.to_owned();
    model.termination_protection = Attr::from_option(common.termination_protection);

    match &common.maintenance {
        Some(maintenance) => {
            model.maintenance_dow = Attr::from_option(maintenance.dow.parse::<MaintenanceDow>().ok());
            model.maintenance_time = Attr::Value(maintenance.time.to_owned());
        }
        None => {
            model.maintenance_dow = Attr::Null;
            model.maintenance_time = Attr::Null;
        }
    }

    model.created_at = Attr::from_option(common.created_at);
    model.updated_at = Attr::from_option(common.updated_at);
    model.state = Attr::from_option(common.state.to_owned());
    model.disk_size = Attr::from_option(common.disk_size);
    model.node_cpus = Attr::from_option(common.node_cpu_count);
    model.node_memory = Attr::from_option(common.node_memory);
    model.node_count = Attr::from_option(common.node_count);
}

fn context(model: &Service, op: Operation, ctrl: &Controller<impl RestClient>) -> Result<Context, Error> {
    Ok(Context::new(model::timeout(&model.timeouts, op, &ctrl.config)?))
}

// -----------------------------------------------------------------------------
// Flows

/// returns the configuration diagnostics of the model
pub fn validate<C>(ctrl: &Controller<C>, model: &Service) -> Diagnostics
where
    C: RestClient,
{
    model.validate(&ctrl.config)
}

/// create the service, wait for its operation and returns the observed model
pub async fn create<C>(ctrl: &Controller<C>, planned: Service) -> Result<Service, Error>
where
    C: RestClient,
{
    validate(ctrl, &planned).into_result()?;

    let mut planned = planned;
    planned.id = Attr::Value(planned.name.to_owned());

    let ctx = context(&planned, Operation::Create, ctrl)?;
    let client = ctrl.zoned(&planned.zone);

    info!(name = &planned.name, zone = &planned.zone, kind = planned.kind.to_string(), "Create service");
    let op = match planned.kind {
        Kind::Pg => pg::create(&client, &planned).await?,
        Kind::Mysql => mysql::create(&client, &planned).await?,
        Kind::Kafka => kafka::create(&client, &planned).await?,
        Kind::Opensearch => opensearch::create(&client, &planned).await?,
        Kind::Valkey => valkey::create(&client, &planned).await?,
        Kind::Grafana => grafana::create(&client, &planned).await?,
        Kind::Thanos => thanos::create(&client, &planned).await?,
    };

    settle(&client, ctrl, op, &ctx).await?;
    refresh(&client, planned, &ctx).await
}

/// returns the model refreshed from the api
pub async fn read<C>(ctrl: &Controller<C>, state: Service) -> Result<Service, Error>
where
    C: RestClient,
{
    let ctx = context(&state, Operation::Read, ctrl)?;
    let client = ctrl.zoned(&state.zone);

    refresh(&client, state, &ctx).await
}

/// update the attributes that changed between state and plan, the call is
/// skipped when nothing changed and attributes that can not be updated in
/// place abort it
pub async fn update<C>(ctrl: &Controller<C>, state: Service, planned: Service) -> Result<Service, Error>
where
    C: RestClient,
{
    let mut diagnostics = validate(ctrl, &planned);
    diagnostics.extend(planned.replacements(&state));
    diagnostics.into_result()?;

    let mut planned = planned;
    planned.id = Attr::Value(planned.name.to_owned());

    let ctx = context(&planned, Operation::Update, ctrl)?;
    let client = ctrl.zoned(&planned.zone);

    let op = match planned.kind {
        Kind::Pg => pg::update(&client, &state, &planned).await?,
        Kind::Mysql => mysql::update(&client, &state, &planned).await?,
        Kind::Kafka => kafka::update(&client, &state, &planned).await?,
        Kind::Opensearch => opensearch::update(&client, &state, &planned).await?,
        Kind::Valkey => valkey::update(&client, &state, &planned).await?,
        Kind::Grafana => grafana::update(&client, &state, &planned).await?,
        Kind::Thanos => thanos::update(&client, &state, &planned).await?,
    };

    match op {
        Some(op) => {
            info!(name = &planned.name, zone = &planned.zone, "Update service");
            settle(&client, ctrl, op, &ctx).await?;
        }
        None => info!(name = &planned.name, zone = &planned.zone, "No updates detected"),
    }

    refresh(&client, planned, &ctx).await
}

/// delete the service, the removal is not awaited and a service that does
/// not exist anymore counts as deleted
pub async fn delete<C>(ctrl: &Controller<C>, state: &Service) -> Result<(), Error>
where
    C: RestClient,
{
    let ctx = context(state, Operation::Delete, ctrl)?;
    let client = ctrl.zoned(&state.zone);

    info!(name = &state.name, zone = &state.zone, "Delete service");
    let result = timeout_at(ctx.deadline(), apis::dbaas::delete(&client, &state.name))
        .await
        .map_err(|_| Error::DeadlineExceeded(format!("service '{}' to be deleted", state.name)))?;

    match result {
        Ok(op) => {
            debug!(name = &state.name, operation = &op.id, "Service deletion requested");
            Ok(())
        }
        Err(err) if err.is_not_found() => {
            info!(name = &state.name, zone = &state.zone, "Service is already deleted");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

/// returns the minimal identifying model of the service designated by a
/// `name@zone` identifier, the full model is filled by the next read
pub async fn import<C>(ctrl: &Controller<C>, id: &str) -> Result<Service, Error>
where
    C: RestClient,
{
    let id = id.parse::<ServiceId>()?;
    let client = ctrl.zoned(&id.zone);

    info!(name = &id.name, zone = &id.zone, "Import service");
    let summary = apis::dbaas::list(&client)
        .await?
        .into_iter()
        .find(|summary| summary.name == id.name)
        .ok_or_else(|| Error::NotFound(id.to_string()))?;

    let kind = Kind::from_import(&summary.kind).map_err(|err| Diagnostic {
        path: "type".to_string(),
        summary: err.to_string(),
    })?;

    Ok(Service::new(&id.name, &id.zone, kind, &summary.plan))
}

async fn settle<C>(client: &C, ctrl: &Controller<C>, op: ApiOperation, ctx: &Context) -> Result<(), Error>
where
    C: RestClient,
{
    let op = waiter::wait(client, op, State::Success, ctx, ctrl.config.dbaas.poll_interval).await?;

    debug!(operation = &op.id, "Operation succeeded");
    Ok(())
}

async fn refresh<C>(client: &C, model: Service, ctx: &Context) -> Result<Service, Error>
where
    C: RestClient,
{
    let name = model.name.to_owned();
    let read = async {
        let mut model = model;
        let certificate = apis::dbaas::ca_certificate(client).await?;

        debug!(name = &model.name, zone = client.zone(), "Read service");
        match model.kind {
            Kind::Pg => pg::read(client, &mut model).await?,
            Kind::Mysql => mysql::read(client, &mut model).await?,
            Kind::Kafka => kafka::read(client, &mut model).await?,
            Kind::Opensearch => opensearch::read(client, &mut model).await?,
            Kind::Valkey => valkey::read(client, &mut model).await?,
            Kind::Grafana => grafana::read(client, &mut model).await?,
            Kind::Thanos => thanos::read(client, &mut model).await?,
        }

        model.ca_certificate = Attr::Value(certificate);
        Ok::<_, Error>(model)
    };

    timeout_at(ctx.deadline(), read)
        .await
        .map_err(|_| Error::DeadlineExceeded(format!("service '{}' to be read", name)))?
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::svc::{apis::testing::Fake, cfg::Configuration};

    fn controller(client: &Fake) -> Controller<Fake> {
        Controller::new(client.to_owned(), Arc::new(Configuration::default()))
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_import_identifier_is_rejected() {
        let client = Fake::new("z1");
        let err = import(&controller(&client), "only-name")
            .await
            .expect_err("import to fail");

        assert!(matches!(err, Error::Import(_, _)), "{}", err);
        assert!(err.to_string().contains("name@zone"), "{}", err);
        assert!(client.journal().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn import_accepts_the_redis_alias() {
        let client = Fake::new("z1");
        client.insert_service("z2", json!({"name": "r1", "type": "redis", "plan": "hobbyist-2"}));

        let model = import(&controller(&client), "r1@z2").await.expect("service to be imported");
        assert_eq!(Kind::Valkey, model.kind);
        assert_eq!("z2", model.zone);
        assert_eq!(Attr::Value("r1".to_string()), model.id);
        assert!(model.valkey.is_unknown());
    }

    #[tokio::test(start_paused = true)]
    async fn import_of_a_missing_service_is_not_found() {
        let client = Fake::new("z1");
        let err = import(&controller(&client), "t9@z1").await.expect_err("import to fail");

        assert!(err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_model_aborts_before_any_request() {
        let client = Fake::new("z1");
        let model: Service = serde_json::from_value(json!({
            "name": "t1", "zone": "z1", "type": "pg", "plan": "hobbyist-2",
            "mysql": {"ip_filter": ["nope"]}
        }))
        .expect("model to deserialize");

        let err = create(&controller(&client), model).await.expect_err("creation to fail");
        match err {
            Error::Validation(diagnostics) => {
                assert!(diagnostics.contains("pg"), "{}", diagnostics);
                assert!(diagnostics.contains("mysql"), "{}", diagnostics);
            }
            err => panic!("expect a validation error, got {}", err),
        }

        assert!(client.journal().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn read_of_a_removed_service_is_not_found() {
        let client = Fake::new("z1");
        let model = Service::new("t1", "z1", Kind::Pg, "hobbyist-2");

        let err = read(&controller(&client), model).await.expect_err("read to fail");
        assert!(err.is_not_found(), "{}", err);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_does_not_wait_and_tolerates_missing_services() {
        let client = Fake::new("z1");
        client.insert_service("z1", json!({"name": "v1", "type": "valkey", "plan": "hobbyist-2"}));
        let ctrl = controller(&client);

        let model = Service::new("v1", "z1", Kind::Valkey, "hobbyist-2");
        delete(&ctrl, &model).await.expect("service to be deleted");
        delete(&ctrl, &model).await.expect("missing service to count as deleted");

        assert!(!client.journal().iter().any(|r| r.path.starts_with("/operation/")));
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_status_is_fatal() {
        let client = Fake::new("z1");
        client.respond_with("/dbaas-valkey/v1", StatusCode::ACCEPTED);

        let model: Service = serde_json::from_value(json!({
            "name": "v1", "zone": "z1", "type": "valkey", "plan": "hobbyist-2", "valkey": {}
        }))
        .expect("model to deserialize");

        let err = create(&controller(&client), model).await.expect_err("creation to fail");
        assert!(matches!(err, Error::UnexpectedStatus(ref status) if status.contains("202")), "{}", err);
    }

    #[tokio::test(start_paused = true)]
    async fn changes_requiring_a_replacement_are_rejected() {
        let client = Fake::new("z1");
        let ctrl = controller(&client);
        let planned: Service = serde_json::from_value(json!({
            "name": "t1", "zone": "z1", "type": "pg", "plan": "hobbyist-2",
            "pg": {"version": "15", "admin_username": "admin", "admin_password": "secret"}
        }))
        .expect("model to deserialize");

        let state = create(&ctrl, planned.to_owned()).await.expect("service to be created");
        let count = client.mutations().len();

        let mut renamed = planned.to_owned();
        renamed.name = "t2".to_string();
        renamed.zone = "z2".to_string();
        if let Attr::Value(variant) = &mut renamed.pg {
            variant.version = Attr::Value("16".to_string());
            variant.admin_password = Attr::Value("other".to_string());
        }

        let err = update(&ctrl, state.to_owned(), renamed).await.expect_err("update to be rejected");
        match err {
            Error::Validation(diagnostics) => {
                for path in ["name", "zone", "pg.version", "pg.admin_password"] {
                    assert!(diagnostics.contains(path), "{}: {}", path, diagnostics);
                }
                assert!(!diagnostics.contains("pg.admin_username"), "{}", diagnostics);
                assert!(diagnostics.to_string().contains("requires replacement"));
            }
            err => panic!("expect a validation error, got {}", err),
        }

        let retyped: Service = serde_json::from_value(json!({
            "name": "t1", "zone": "z1", "type": "mysql", "plan": "hobbyist-2", "mysql": {}
        }))
        .expect("model to deserialize");

        let err = update(&ctrl, state.to_owned(), retyped).await.expect_err("update to be rejected");
        assert!(matches!(err, Error::Validation(ref diagnostics) if diagnostics.contains("type")), "{}", err);
        assert_eq!(count, client.mutations().len());

        // a patch-level version designates the same major version
        let mut patched = planned;
        if let Attr::Value(variant) = &mut patched.pg {
            variant.version = Attr::Value("15.4".to_string());
        }

        update(&ctrl, state, patched).await.expect("update to succeed");
    }

    #[test]
    fn settings_observation_keeps_user_keys() {
        let server: Document = serde_json::from_value(json!({"timezone": "Europe/Zurich", "jit": true}))
            .expect("document to deserialize");

        assert_eq!(
            Attr::Value(r#"{"timezone":"Europe/Zurich"}"#.to_string()),
            observe_settings(Attr::Value(r#"{"timezone":"UTC"}"#.to_string()), Some(server.to_owned()))
        );
        assert_eq!(Attr::Null, observe_settings(Attr::Null, Some(server.to_owned())));
        assert_eq!(
            Attr::Value(r#"{"timezone":"Europe/Zurich","jit":true}"#.to_string()),
            observe_settings(Attr::Unknown, Some(server))
        );
    }

    #[test]
    fn backup_schedules_are_compared_once_parsed() {
        let server = BackupSchedule { hour: 1, minute: 23 };

        assert_eq!(
            Attr::Value("1:23".to_string()),
            observe_backup_schedule(Attr::Value("1:23".to_string()), Some(server.to_owned()))
        );
        assert_eq!(
            Attr::Value("01:23".to_string()),
            observe_backup_schedule(Attr::Unknown, Some(server.to_owned()))
        );
        assert_eq!(
            Attr::Value("01:23".to_string()),
            observe_backup_schedule(Attr::Value("2:00".to_string()), Some(server))
        );

        let state = Attr::Value("01:23".to_string());
        assert!(!backup_schedule_changed(&Attr::Value("1:23".to_string()), &state));
        assert!(!backup_schedule_changed(&Attr::Unknown, &state));
        assert!(backup_schedule_changed(&Attr::Value("1:24".to_string()), &state));
        assert!(backup_schedule_changed(&Attr::Value("bogus".to_string()), &state));
    }

    #[test]
    fn empty_ip_filter_is_observed_as_null() {
        assert_eq!(Attr::Null, observe_ip_filter(Attr::Unknown, Some(vec![])));
        assert_eq!(Attr::Null, observe_ip_filter(Attr::Unknown, None));
        assert_eq!(
            Attr::Value(["1.2.3.4/32".to_string()].into_iter().collect()),
            observe_ip_filter(Attr::Unknown, Some(vec!["1.2.3.4/32".to_string()]))
        );
    }

    #[test]
    fn maintenance_is_sent_when_one_component_changes() {
        let mut state = Service::new("t1", "z1", Kind::Pg, "hobbyist-2");
        state.maintenance_dow = Attr::Value(MaintenanceDow::Monday);
        state.maintenance_time = Attr::Value("01:00:00".to_string());

        let mut planned = state.to_owned();
        assert_eq!(CommonUpdate::default(), CommonUpdate::diff(&state, &planned));

        planned.maintenance_dow = Attr::Value(MaintenanceDow::Friday);
        let update = CommonUpdate::diff(&state, &planned);
        assert_eq!(
            Some(Maintenance {
                dow: "friday".to_string(),
                time: "01:00:00".to_string()
            }),
            update.maintenance
        );
        assert_eq!(None, update.plan);
    }
}
