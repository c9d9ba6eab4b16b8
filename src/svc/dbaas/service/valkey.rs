//! # Valkey service module

use tracing::info;

use crate::svc::{
    apis::{dbaas::valkey, operation::Operation, RestClient},
    dbaas::{
        attr::Attr,
        kind::{self, Kind},
        model::{Service, ValkeyVariant},
        service::{
            block, ip_filter, ip_filter_update, observe_common, observe_ip_filter,
            observe_settings, Builder, CommonUpdate,
        },
        Error,
    },
};

pub async fn create<C>(client: &C, model: &Service) -> Result<Operation, Error>
where
    C: RestClient,
{
    let variant = block(&model.valkey, Kind::Valkey)?;
    let mut builder = Builder::new(client, Kind::Valkey);

    let opts = valkey::CreateOpts {
        plan: model.plan.to_owned(),
        termination_protection: model.termination_protection.value().copied(),
        maintenance: model.maintenance(),
        ip_filter: ip_filter(&variant.ip_filter),
        valkey_settings: builder.settings("valkey_settings", &variant.valkey_settings).await?,
    };

    builder.finish()?;
    Ok(valkey::create(client, &model.name, &opts).await?)
}

pub async fn read<C>(client: &C, model: &mut Service) -> Result<(), Error>
where
    C: RestClient,
{
    let service = valkey::get(client, &model.name).await?;
    observe_common(model, &service.common);

    let prior = match std::mem::take(&mut model.valkey) {
        Attr::Value(variant) => variant,
        _ => ValkeyVariant::default(),
    };

    let spec = kind::spec(Kind::Valkey);
    model.valkey = Attr::Value(ValkeyVariant {
        ip_filter: observe_ip_filter(prior.ip_filter, service.ip_filter),
        valkey_settings: observe_settings(prior.valkey_settings, service.valkey_settings),
        version: Attr::from_option(service.version.map(|version| spec.normalize_version(&version))),
    });

    Ok(())
}

pub async fn update<C>(client: &C, state: &Service, planned: &Service) -> Result<Option<Operation>, Error>
where
    C: RestClient,
{
    let variant = block(&planned.valkey, Kind::Valkey)?;
    let prior = state.valkey.value().cloned().unwrap_or_default();
    let common = CommonUpdate::diff(state, planned);
    let mut builder = Builder::new(client, Kind::Valkey);

    let opts = valkey::UpdateOpts {
        plan: common.plan,
        termination_protection: common.termination_protection,
        maintenance: common.maintenance,
        ip_filter: ip_filter_update(&variant.ip_filter, &prior.ip_filter),
        valkey_settings: builder
            .changed_settings("valkey_settings", &variant.valkey_settings, &prior.valkey_settings)
            .await?,
    };

    builder.finish()?;
    if opts.is_empty() {
        return Ok(None);
    }

    info!(name = &planned.name, zone = client.zone(), "Execute update of valkey service");
    Ok(Some(valkey::update(client, &planned.name, &opts).await?))
}
