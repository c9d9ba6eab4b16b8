//! # Kafka service module

use tracing::info;

use crate::svc::{
    apis::{
        dbaas::kafka::{self, AuthenticationMethods},
        operation::Operation,
        RestClient,
    },
    dbaas::{
        attr::Attr,
        kind::Kind,
        model::{KafkaVariant, Service},
        service::{
            block, ip_filter, ip_filter_update, observe_common, observe_ip_filter,
            observe_settings, observe_version, Builder, CommonUpdate,
        },
        Error,
    },
};

fn authentication_methods(variant: &KafkaVariant) -> Option<AuthenticationMethods> {
    let methods = AuthenticationMethods {
        certificate: variant.enable_cert_auth.value().copied(),
        sasl: variant.enable_sasl_auth.value().copied(),
    };

    (methods != AuthenticationMethods::default()).then_some(methods)
}

pub async fn create<C>(client: &C, model: &Service) -> Result<Operation, Error>
where
    C: RestClient,
{
    let variant = block(&model.kafka, Kind::Kafka)?;
    let mut builder = Builder::new(client, Kind::Kafka);

    let opts = kafka::CreateOpts {
        plan: model.plan.to_owned(),
        termination_protection: model.termination_protection.value().copied(),
        maintenance: model.maintenance(),
        ip_filter: ip_filter(&variant.ip_filter),
        version: variant.version.value().cloned(),
        authentication_methods: authentication_methods(variant),
        kafka_connect_enabled: variant.enable_kafka_connect.value().copied(),
        kafka_rest_enabled: variant.enable_kafka_rest.value().copied(),
        schema_registry_enabled: variant.enable_schema_registry.value().copied(),
        kafka_settings: builder.settings("kafka_settings", &variant.kafka_settings).await?,
        kafka_connect_settings: builder
            .settings("kafka_connect_settings", &variant.kafka_connect_settings)
            .await?,
        kafka_rest_settings: builder
            .settings("kafka_rest_settings", &variant.kafka_rest_settings)
            .await?,
        schema_registry_settings: builder
            .settings("schema_registry_settings", &variant.schema_registry_settings)
            .await?,
    };

    builder.finish()?;
    Ok(kafka::create(client, &model.name, &opts).await?)
}

pub async fn read<C>(client: &C, model: &mut Service) -> Result<(), Error>
where
    C: RestClient,
{
    let service = kafka::get(client, &model.name).await?;
    observe_common(model, &service.common);

    let prior = match std::mem::take(&mut model.kafka) {
        Attr::Value(variant) => variant,
        _ => KafkaVariant::default(),
    };

    let methods = service.authentication_methods.unwrap_or_default();
    model.kafka = Attr::Value(KafkaVariant {
        enable_cert_auth: prior.enable_cert_auth.observe(methods.certificate),
        enable_kafka_connect: prior.enable_kafka_connect.observe(service.kafka_connect_enabled),
        enable_kafka_rest: prior.enable_kafka_rest.observe(service.kafka_rest_enabled),
        enable_sasl_auth: prior.enable_sasl_auth.observe(methods.sasl),
        enable_schema_registry: prior.enable_schema_registry.observe(service.schema_registry_enabled),
        ip_filter: observe_ip_filter(prior.ip_filter, service.ip_filter),
        version: observe_version(prior.version, service.version, Kind::Kafka),
        kafka_settings: observe_settings(prior.kafka_settings, service.kafka_settings),
        kafka_connect_settings: observe_settings(prior.kafka_connect_settings, service.kafka_connect_settings),
        kafka_rest_settings: observe_settings(prior.kafka_rest_settings, service.kafka_rest_settings),
        schema_registry_settings: observe_settings(prior.schema_registry_settings, service.schema_registry_settings),
    });

    Ok(())
}

pub async fn update<C>(client: &C, state: &Service, planned: &Service) -> Result<Option<Operation>, Error>
where
    C: RestClient,
{
    let variant = block(&planned.kafka, Kind::Kafka)?;
    let prior = state.kafka.value().cloned().unwrap_or_default();
    let common = CommonUpdate::diff(state, planned);
    let mut builder = Builder::new(client, Kind::Kafka);

    let changed = |planned: &Attr<bool>, state: &Attr<bool>| {
        if planned.changed(state) {
            planned.value().copied()
        } else {
            None
        }
    };

    let authentication_methods = if variant.enable_cert_auth.changed(&prior.enable_cert_auth)
        || variant.enable_sasl_auth.changed(&prior.enable_sasl_auth)
    {
        authentication_methods(variant)
    } else {
        None
    };

    let opts = kafka::UpdateOpts {
        plan: common.plan,
        termination_protection: common.termination_protection,
        maintenance: common.maintenance,
        ip_filter: ip_filter_update(&variant.ip_filter, &prior.ip_filter),
        authentication_methods,
        kafka_connect_enabled: changed(&variant.enable_kafka_connect, &prior.enable_kafka_connect),
        kafka_rest_enabled: changed(&variant.enable_kafka_rest, &prior.enable_kafka_rest),
        schema_registry_enabled: changed(&variant.enable_schema_registry, &prior.enable_schema_registry),
        kafka_settings: builder
            .changed_settings("kafka_settings", &variant.kafka_settings, &prior.kafka_settings)
            .await?,
        kafka_connect_settings: builder
            .changed_settings("kafka_connect_settings", &variant.kafka_connect_settings, &prior.kafka_connect_settings)
            .await?,
        kafka_rest_settings: builder
            .changed_settings("kafka_rest_settings", &variant.kafka_rest_settings, &prior.kafka_rest_settings)
            .await?,
        schema_registry_settings: builder
            .changed_settings("schema_registry_settings", &variant.schema_registry_settings, &prior.schema_registry_settings)
            .await?,
    };

    builder.finish()?;
    if opts.is_empty() {
        return Ok(None);
    }

    info!(name = &planned.name, zone = client.zone(), "Execute update of kafka service");
    Ok(Some(kafka::update(client, &planned.name, &opts).await?))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::svc::{
        apis::testing::Fake,
        cfg::Configuration,
        dbaas::{service, Controller},
    };

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn versions_keep_major_and_minor() {
        let client = Fake::new("z1");
        let ctrl = Controller::new(client.to_owned(), Arc::new(Configuration::default()));

        let planned = serde_json::from_value(json!({
            "name": "k1", "zone": "z1", "type": "kafka", "plan": "business-4",
            "kafka": {"enable_cert_auth": true, "version": "3.7"}
        }))
        .expect("model to deserialize");

        let state = service::create(&ctrl, planned).await.expect("service to be created");
        let variant = state.kafka.value().expect("kafka block to be set");

        assert_eq!(Attr::Value("3.7".to_string()), variant.version);
        assert_eq!(Attr::Value(true), variant.enable_cert_auth);

        let post = client.mutations().pop().expect("a creation to be sent");
        assert_eq!(
            Some(&json!({"certificate": true})),
            post.body.as_ref().and_then(|b| b.get("authentication-methods"))
        );
    }
}
