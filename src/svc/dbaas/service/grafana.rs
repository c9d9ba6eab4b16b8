//! # Grafana service module

use tracing::info;

use crate::svc::{
    apis::{dbaas::grafana, operation::Operation, RestClient},
    dbaas::{
        attr::Attr,
        kind::Kind,
        model::{GrafanaVariant, Service},
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
    let variant = block(&model.grafana, Kind::Grafana)?;
    let mut builder = Builder::new(client, Kind::Grafana);

    let opts = grafana::CreateOpts {
        plan: model.plan.to_owned(),
        termination_protection: model.termination_protection.value().copied(),
        maintenance: model.maintenance(),
        ip_filter: ip_filter(&variant.ip_filter),
        grafana_settings: builder.settings("grafana_settings", &variant.grafana_settings).await?,
    };

    builder.finish()?;
    Ok(grafana::create(client, &model.name, &opts).await?)
}

pub async fn read<C>(client: &C, model: &mut Service) -> Result<(), Error>
where
    C: RestClient,
{
    let service = grafana::get(client, &model.name).await?;
    observe_common(model, &service.common);

    let prior = match std::mem::take(&mut model.grafana) {
        Attr::Value(variant) => variant,
        _ => GrafanaVariant::default(),
    };

    model.grafana = Attr::Value(GrafanaVariant {
        ip_filter: observe_ip_filter(prior.ip_filter, service.ip_filter),
        grafana_settings: observe_settings(prior.grafana_settings, service.grafana_settings),
    });

    Ok(())
}

pub async fn update<C>(client: &C, state: &Service, planned: &Service) -> Result<Option<Operation>, Error>
where
    C: RestClient,
{
    let variant = block(&planned.grafana, Kind::Grafana)?;
    let prior = state.grafana.value().cloned().unwrap_or_default();
    let common = CommonUpdate::diff(state, planned);
    let mut builder = Builder::new(client, Kind::Grafana);

    let opts = grafana::UpdateOpts {
        plan: common.plan,
        termination_protection: common.termination_protection,
        maintenance: common.maintenance,
        ip_filter: ip_filter_update(&variant.ip_filter, &prior.ip_filter),
        grafana_settings: builder
            .changed_settings("grafana_settings", &variant.grafana_settings, &prior.grafana_settings)
            .await?,
    };

    builder.finish()?;
    if opts.is_empty() {
        return Ok(None);
    }

    info!(name = &planned.name, zone = client.zone(), "Execute update of grafana service");
    Ok(Some(grafana::update(client, &planned.name, &opts).await?))
}
