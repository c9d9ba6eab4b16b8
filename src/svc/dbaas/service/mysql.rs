//! # MySQL service module

use tracing::{debug, info};

use crate::svc::{
    apis::{dbaas::mysql, operation::Operation, RestClient},
    dbaas::{
        attr::Attr,
        kind::Kind,
        model::{self, MysqlVariant, Service},
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
    let variant = block(&model.mysql, Kind::Mysql)?;
    let mut builder = Builder::new(client, Kind::Mysql);

    let opts = mysql::CreateOpts {
        plan: model.plan.to_owned(),
        termination_protection: model.termination_protection.value().copied(),
        maintenance: model.maintenance(),
        backup_schedule: builder.backup_schedule(&variant.backup_schedule),
        ip_filter: ip_filter(&variant.ip_filter),
        version: variant.version.value().cloned(),
        admin_username: variant.admin_username.value().cloned(),
        admin_password: variant.admin_password.value().cloned(),
        mysql_settings: builder.settings("mysql_settings", &variant.mysql_settings).await?,
    };

    builder.finish()?;
    Ok(mysql::create(client, &model.name, &opts).await?)
}

pub async fn read<C>(client: &C, model: &mut Service) -> Result<(), Error>
where
    C: RestClient,
{
    let service = mysql::get(client, &model.name).await?;
    observe_common(model, &service.common);

    let prior = match std::mem::take(&mut model.mysql) {
        Attr::Value(variant) => variant,
        _ => MysqlVariant::default(),
    };

    model.mysql = Attr::Value(MysqlVariant {
        admin_username: prior.admin_username.or_null(),
        admin_password: prior.admin_password.or_null(),
        backup_schedule: observe_backup_schedule(prior.backup_schedule, service.backup_schedule),
        ip_filter: observe_ip_filter(prior.ip_filter, service.ip_filter),
        version: observe_version(prior.version, service.version, Kind::Mysql),
        mysql_settings: observe_settings(prior.mysql_settings, service.mysql_settings),
    });

    Ok(())
}

pub async fn update<C>(client: &C, state: &Service, planned: &Service) -> Result<Option<Operation>, Error>
where
    C: RestClient,
{
    let variant = block(&planned.mysql, Kind::Mysql)?;
    let prior = state.mysql.value().cloned().unwrap_or_default();
    let common = CommonUpdate::diff(state, planned);
    let mut builder = Builder::new(client, Kind::Mysql);

    let backup_schedule = if backup_schedule_changed(&variant.backup_schedule, &prior.backup_schedule) {
        builder.backup_schedule(&variant.backup_schedule)
    } else {
        None
    };

    let mut opts = mysql::UpdateOpts {
        plan: common.plan,
        termination_protection: common.termination_protection,
        maintenance: common.maintenance,
        backup_schedule,
        ip_filter: ip_filter_update(&variant.ip_filter, &prior.ip_filter),
        mysql_settings: builder
            .changed_settings("mysql_settings", &variant.mysql_settings, &prior.mysql_settings)
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
            opts.backup_schedule = Some(model::parse_backup_schedule("mysql.backup_schedule", schedule)?);
        }
    }

    info!(name = &planned.name, zone = client.zone(), "Execute update of mysql service");
    Ok(Some(mysql::update(client, &planned.name, &opts).await?))
}
