//! # Sub-resource module
//!
//! This module provide the generic flows of the resources living inside a
//! managed database service, users and logical databases. Each of them
//! implements the [`SubResource`] trait and the flows below drive them.

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::time::timeout_at;
use tracing::{debug, info};

use crate::svc::{
    apis::{
        self,
        dbaas::Head,
        operation::{Operation as ApiOperation, State},
        RestClient,
    },
    cfg::{self, Configuration},
    dbaas::{
        attr::Attr,
        id::{self, SubResourceId},
        kind::{Kind, Readiness},
        model::{self, Timeouts, REPLACEMENT},
        waiter, Context, Controller, Diagnostic, Diagnostics, Error, Operation,
    },
};

pub mod database;
pub mod user;

// -----------------------------------------------------------------------------
// SubResource trait

#[async_trait]
pub trait SubResource: Serialize + DeserializeOwned + Clone + Debug + Send + Sync {
    /// singular noun used in logs and errors, e.g. `user`
    const NAME: &'static str;

    /// attribute holding the name of the sub-resource
    const NAME_ATTRIBUTE: &'static str;

    fn id(&self) -> &Attr<String>;

    fn set_id(&mut self, id: String);

    fn service(&self) -> &str;

    fn name(&self) -> &str;

    fn zone(&self) -> &str;

    fn kind(&self) -> Kind;

    fn timeouts(&self) -> &Option<Timeouts>;

    fn set_timeouts(&mut self, timeouts: Option<Timeouts>);

    /// returns the identifier stored in state, `service/name`
    fn generate_id(&self) -> String {
        id::state_id(self.service(), self.name())
    }

    /// returns the condition the service has to meet before the creation,
    /// `None` if the kind does not support this sub-resource
    fn readiness(&self) -> Option<Readiness>;

    /// returns the minimal model designated by an import identifier
    fn imported(id: &SubResourceId, kind: Kind) -> Self;

    /// kind-specific checks, the common ones are done by [`validate`]
    fn validate(&self, _diagnostics: &mut Diagnostics) {}

    /// kind-specific attributes whose change requires a replacement, the
    /// identifying ones are checked by [`update`]
    fn replacements(&self, _state: &Self, _diagnostics: &mut Diagnostics) {}

    async fn wait_for_service<C>(&self, client: &C, ctx: &Context, config: &cfg::Dbaas) -> Result<Head, Error>
    where
        C: RestClient,
    {
        let readiness = self.readiness().ok_or_else(|| Diagnostic {
            path: "type".to_string(),
            summary: format!("service type '{}' has no {}s", self.kind(), Self::NAME),
        })?;

        waiter::wait_for_service(
            client,
            self.kind(),
            self.service(),
            waiter::predicate(readiness),
            ctx,
            config,
        )
        .await
    }

    async fn create_resource<C>(&mut self, client: &C) -> Result<ApiOperation, Error>
    where
        C: RestClient;

    async fn read_resource<C>(&mut self, client: &C) -> Result<(), Error>
    where
        C: RestClient;

    /// every attribute of a sub-resource forces a replacement, there is
    /// nothing to update in place
    async fn update_resource<C>(&mut self, _client: &C) -> Result<(), Error>
    where
        C: RestClient,
    {
        Ok(())
    }

    async fn delete_resource<C>(&self, client: &C) -> Result<ApiOperation, Error>
    where
        C: RestClient;
}

// -----------------------------------------------------------------------------
// Helpers functions

fn context<S>(resource: &S, op: Operation, config: &Configuration) -> Result<Context, Error>
where
    S: SubResource,
{
    Ok(Context::new(model::timeout(resource.timeouts(), op, config)?))
}

async fn refresh<C, S>(client: &C, resource: S, ctx: &Context) -> Result<S, Error>
where
    C: RestClient,
    S: SubResource,
{
    let id = resource.generate_id();
    let read = async {
        let mut resource = resource;

        debug!(id = &id, zone = client.zone(), kind = S::NAME, "Read sub-resource");
        resource.read_resource(client).await?;
        Ok::<_, Error>(resource)
    };

    timeout_at(ctx.deadline(), read)
        .await
        .map_err(|_| Error::DeadlineExceeded(format!("{} '{}' to be read", S::NAME, id)))?
}

// -----------------------------------------------------------------------------
// Flows

/// returns the configuration diagnostics of the sub-resource
pub fn validate<S>(config: &Configuration, resource: &S) -> Diagnostics
where
    S: SubResource,
{
    let mut diagnostics = Diagnostics::default();
    if resource.service().is_empty() {
        diagnostics.push("service", "must not be empty");
    }

    if resource.name().is_empty() {
        diagnostics.push(S::NAME_ATTRIBUTE, "must not be empty");
    }

    if !config.dbaas.accepts(resource.zone()) {
        diagnostics.push(
            "zone",
            format!("zone '{}' is not one of '{}'", resource.zone(), config.dbaas.zones.join("', '")),
        );
    }

    if resource.readiness().is_none() {
        diagnostics.push(
            "type",
            format!("service type '{}' has no {}s", resource.kind(), S::NAME),
        );
    }

    for op in [Operation::Create, Operation::Read, Operation::Update, Operation::Delete] {
        if let Err(diagnostic) = model::timeout(resource.timeouts(), op, config) {
            diagnostics.0.push(diagnostic);
        }
    }

    resource.validate(&mut diagnostics);
    diagnostics
}

/// create the sub-resource once its service is ready and returns the
/// observed model
pub async fn create<C, S>(ctrl: &Controller<C>, planned: S) -> Result<S, Error>
where
    C: RestClient,
    S: SubResource,
{
    validate(&ctrl.config, &planned).into_result()?;

    let mut planned = planned;
    let ctx = context(&planned, Operation::Create, &ctrl.config)?;
    planned.set_id(planned.generate_id());

    let client = ctrl.zoned(planned.zone());

    info!(service = planned.service(), name = planned.name(), zone = planned.zone(), kind = S::NAME, "Wait for service to be ready");
    planned.wait_for_service(&client, &ctx, &ctrl.config.dbaas).await?;

    info!(service = planned.service(), name = planned.name(), zone = planned.zone(), kind = S::NAME, "Create sub-resource");
    let op = planned.create_resource(&client).await?;
    let op = waiter::wait(&client, op, State::Success, &ctx, ctrl.config.dbaas.poll_interval).await?;

    debug!(operation = &op.id, "Operation succeeded");
    refresh(&client, planned, &ctx).await
}

/// returns the sub-resource refreshed from the api
pub async fn read<C, S>(ctrl: &Controller<C>, state: S) -> Result<S, Error>
where
    C: RestClient,
    S: SubResource,
{
    let ctx = context(&state, Operation::Read, &ctrl.config)?;
    let client = ctrl.zoned(state.zone());

    refresh(&client, state, &ctx).await
}

/// returns a diagnostic on each attribute that differs between state and
/// plan, none of them can be updated in place
pub fn replacements<S>(state: &S, planned: &S) -> Diagnostics
where
    S: SubResource,
{
    let mut diagnostics = Diagnostics::default();
    if planned.service() != state.service() {
        diagnostics.push("service", REPLACEMENT);
    }

    if planned.name() != state.name() {
        diagnostics.push(S::NAME_ATTRIBUTE, REPLACEMENT);
    }

    if planned.zone() != state.zone() {
        diagnostics.push("zone", REPLACEMENT);
    }

    if planned.kind() != state.kind() {
        diagnostics.push("type", REPLACEMENT);
    }

    planned.replacements(state, &mut diagnostics);
    diagnostics
}

/// returns the state with the planned timeouts, attributes of sub-resources
/// are never updated in place and a change of any of them is rejected
pub async fn update<C, S>(ctrl: &Controller<C>, state: S, planned: S) -> Result<S, Error>
where
    C: RestClient,
    S: SubResource,
{
    let mut diagnostics = validate(&ctrl.config, &planned);
    diagnostics.extend(replacements(&state, &planned));
    diagnostics.into_result()?;

    let mut state = state;
    let client = ctrl.zoned(planned.zone());

    state.set_timeouts(planned.timeouts().to_owned());
    state.update_resource(&client).await?;
    Ok(state)
}

/// delete the sub-resource, a sub-resource that does not exist anymore
/// counts as deleted
pub async fn delete<C, S>(ctrl: &Controller<C>, state: &S) -> Result<(), Error>
where
    C: RestClient,
    S: SubResource,
{
    let ctx = context(state, Operation::Delete, &ctrl.config)?;
    let client = ctrl.zoned(state.zone());

    info!(service = state.service(), name = state.name(), zone = state.zone(), kind = S::NAME, "Delete sub-resource");
    let result = timeout_at(ctx.deadline(), state.delete_resource(&client))
        .await
        .map_err(|_| Error::DeadlineExceeded(format!("{} '{}' to be deleted", S::NAME, state.generate_id())))?;

    match result {
        Ok(op) => {
            debug!(id = state.generate_id(), operation = &op.id, "Sub-resource deletion requested");
            Ok(())
        }
        Err(err) if err.is_not_found() => {
            info!(service = state.service(), name = state.name(), zone = state.zone(), kind = S::NAME, "Sub-resource is already deleted");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

/// returns the minimal model of the sub-resource designated by a
/// `service/name@zone` identifier, the full model is filled by the next read
pub async fn import<C, S>(ctrl: &Controller<C>, id: &str) -> Result<S, Error>
where
    C: RestClient,
    S: SubResource,
{
    let id = id.parse::<SubResourceId>()?;
    let client = ctrl.zoned(&id.zone);

    info!(service = &id.service, name = &id.name, zone = &id.zone, kind = S::NAME, "Import sub-resource");
    let summary = apis::dbaas::list(&client)
        .await?
        .into_iter()
        .find(|summary| summary.name == id.service)
        .ok_or_else(|| Error::NotFound(format!("{}@{}", id.service, id.zone)))?;

    let kind = Kind::from_import(&summary.kind).map_err(|err| Diagnostic {
        path: "type".to_string(),
        summary: err.to_string(),
    })?;

    let resource = S::imported(&id, kind);
    if resource.readiness().is_none() {
        return Err(Diagnostic {
            path: "type".to_string(),
            summary: format!("service type '{}' has no {}s", kind, S::NAME),
        }
        .into());
    }

    Ok(resource)
}
