//! # Thanos service module

use tracing::info;

use crate::svc::{
    apis::{dbaas::thanos, operation::Operation, RestClient},
    dbaas::{
        attr::Attr,
        kind::Kind,
        model::{Service, ThanosVariant},
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
    let variant = block(&model.thanos, Kind::Thanos)?;
    let mut builder = Builder::new(client, Kind::Thanos);

    let opts = thanos::CreateOpts {
        plan: model.plan.to_owned(),
        termination_protection: model.termination_protection.value().copied(),
        maintenance: model.maintenance(),
        ip_filter: ip_filter(&variant.ip_filter),
        thanos_settings: builder.settings("thanos_settings", &variant.thanos_settings).await?,
    };

    builder.finish()?;
    Ok(thanos::create(client, &model.name, &opts).await?)
}

pub async fn read<C>(client: &C, model: &mut Service) -> Result<(), Error>
where
    C: RestClient,
{
    let service = thanos::get(client, &model.name).await?;
    observe_common(model, &service.common);

    let prior = match std::mem::take(&mut model.thanos) {
        Attr::Value(variant) => variant,
        _ => ThanosVariant::default(),
    };

    let info = service.connection_info.unwrap_or_default();
    model.thanos = Attr::Value(ThanosVariant {
        ip_filter: observe_ip_filter(prior.ip_filter, service.ip_filter),
        thanos_settings: observe_settings(prior.thanos_settings, service.thanos_settings),
        uri: Attr::from_option(service.common.uri),
        query_frontend_uri: Attr::from_option(info.query_frontend_uri),
        query_uri: Attr::from_option(info.query_uri),
        receiver_remote_write_uri: Attr::from_option(info.receiver_remote_write_uri),
    });

    Ok(())
}

pub async fn update<C>(client: &C, state: &Service, planned: &Service) -> Result<Option<Operation>, Error>
where
    C: RestClient,
{
    let variant = block(&planned.thanos, Kind::Thanos)?;
    let prior = state.thanos.value().cloned().unwrap_or_default();
    let common = CommonUpdate::diff(state, planned);
    let mut builder = Builder::new(client, Kind::Thanos);

    let opts = thanos::UpdateOpts {
        plan: common.plan,
        termination_protection: common.termination_protection,
        maintenance: common.maintenance,
        ip_filter: ip_filter_update(&variant.ip_filter, &prior.ip_filter),
        thanos_settings: builder
            .changed_settings("thanos_settings", &variant.thanos_settings, &prior.thanos_settings)
            .await?,
    };

    builder.finish()?;
    if opts.is_empty() {
        return Ok(None);
    }

    info!(name = &planned.name, zone = client.zone(), "Execute update of thanos service");
    Ok(Some(thanos::update(client, &planned.name, &opts).await?))
}
