//! # PostgreSQL service module

use tracing::{debug, info};

use crate::svc::{
    apis::{dbaas::pg, operation::Operation, RestClient},
    dbaas::{
        attr::Attr,
        kind::Kind,
        model::{self, PgVariant, Service},
        service::{
            backup_schedule_changed, block, ip_filter, ip_filter_update, observe_backup_schedule,
            observe_common, observe_ip_filter, observe_settings, observe_version, Builder,
            CommonUpdate,
        },
        Error,
    },
};

pub async fn create<C>(client: &C, model: &Service) -> Result<Operation, Error>
where
    C: RestClient,
{
    let variant = block(&model.pg, Kind::Pg)?;
    let mut builder = Builder::new(client, Kind::Pg);

    let opts = pg::CreateOpts {
        plan: model.plan.to_owned(),
        termination_protection: model.termination_protection.value().copied(),
        maintenance: model.maintenance(),
        backup_schedule: builder.backup_schedule(&variant.backup_schedule),
        ip_filter: ip_filter(&variant.ip_filter),
        version: variant.version.value().cloned(),
        admin_username: variant.admin_username.value().cloned(),
        admin_password: variant.admin_password.value().cloned(),
        pg_settings: builder.settings("pg_settings", &variant.pg_settings).await?,
        pgbouncer_settings: builder
            .settings("pgbouncer_settings", &variant.pgbouncer_settings)
            .await?,
        pglookout_settings: builder
            .settings("pglookout_settings", &variant.pglookout_settings)
            .await?,
    };

    builder.finish()?;
    Ok(pg::create(client, &model.name, &opts).await?)
}

pub async fn read<C>(client: &C, model: &mut Service) -> Result<(), Error>
where
    C: RestClient,
{
    let service = pg::get(client, &model.name).await?;
    observe_common(model, &service.common);

    let prior = match std::mem::take(&mut model.pg) {
        Attr::Value(variant) => variant,
        _ => PgVariant::default(),
    };

    model.pg = Attr::Value(PgVariant {
        admin_username: prior.admin_username.or_null(),
        admin_password: prior.admin_password.or_null(),
        backup_schedule: observe_backup_schedule(prior.backup_schedule, service.backup_schedule),
        ip_filter: observe_ip_filter(prior.ip_filter, service.ip_filter),
        version: observe_version(prior.version, service.version, Kind::Pg),
        pg_settings: observe_settings(prior.pg_settings, service.pg_settings),
        pgbouncer_settings: observe_settings(prior.pgbouncer_settings, service.pgbouncer_settings),
        pglookout_settings: observe_settings(prior.pglookout_settings, service.pglookout_settings),
    });

    Ok(())
}

pub async fn update<C>(client: &C, state: &Service, planned: &Service) -> Result<Option<Operation>, Error>
where
    C: RestClient,
{
    let variant = block(&planned.pg, Kind::Pg)?;
    let prior = state.pg.value().cloned().unwrap_or_default();
    let common = CommonUpdate::diff(state, planned);
    let mut builder = Builder::new(client, Kind::Pg);

    let backup_schedule = if backup_schedule_changed(&variant.backup_schedule, &prior.backup_schedule) {
        builder.backup_schedule(&variant.backup_schedule)
    } else {
        None
    };

    let mut opts = pg::UpdateOpts {
        plan: common.plan,
        termination_protection: common.termination_protection,
        maintenance: common.maintenance,
        backup_schedule,
        ip_filter: ip_filter_update(&variant.ip_filter, &prior.ip_filter),
        pg_settings: builder
            .changed_settings("pg_settings", &variant.pg_settings, &prior.pg_settings)
            .await?,
        pgbouncer_settings: builder
            .changed_settings("pgbouncer_settings", &variant.pgbouncer_settings, &prior.pgbouncer_settings)
            .await?,
        pglookout_settings: builder
            .changed_settings("pglookout_settings", &variant.pglookout_settings, &prior.pglookout_settings)
            .await?,
    };

    builder.finish()?;
    if opts.is_empty() {
        return Ok(None);
    }

    // an update without schedule makes the api pick a new random one
    if opts.backup_schedule.is_none() {
        if let Some(schedule) = variant.backup_schedule.value().or(prior.backup_schedule.value()) {
            debug!(name = &planned.name, schedule = schedule, "Re-send backup schedule");
            opts.backup_schedule = Some(model::parse_backup_schedule("pg.backup_schedule", schedule)?);
        }
    }

    info!(name = &planned.name, zone = client.zone(), "Execute update of postgresql service");
    Ok(Some(pg::update(client, &planned.name, &opts).await?))
}
