//! # OpenSearch service module
//!
//! The `max_index_count` attribute is deprecated, it is still accepted and
//! validated but never sent to the api.

use tracing::{info, warn};

use crate::svc::{
    apis::{dbaas::opensearch, operation::Operation, RestClient},
    dbaas::{
        attr::Attr,
        kind::Kind,
        model::{Dashboards, IndexPattern, IndexTemplate, OpensearchVariant, Service, SortingAlgorithm},
        service::{
            block, ip_filter, ip_filter_update, observe_common, observe_ip_filter,
            observe_settings, observe_version, Builder, CommonUpdate,
        },
        Error,
    },
};

// -----------------------------------------------------------------------------
// Conversions

fn index_patterns(patterns: &[IndexPattern]) -> Vec<opensearch::IndexPattern> {
    patterns
        .iter()
        .map(|pattern| opensearch::IndexPattern {
            max_index_count: pattern.max_index_count.value().copied(),
            pattern: pattern.pattern.value().cloned(),
            sorting_algorithm: pattern.sorting_algorithm.value().map(ToString::to_string),
        })
        .collect()
}

fn index_template(template: &IndexTemplate) -> opensearch::IndexTemplate {
    opensearch::IndexTemplate {
        mapping_nested_objects_limit: template.mapping_nested_objects_limit.value().copied(),
        number_of_replicas: template.number_of_replicas.value().copied(),
        number_of_shards: template.number_of_shards.value().copied(),
    }
}

fn dashboards(dashboards: &Dashboards) -> opensearch::Dashboards {
    opensearch::Dashboards {
        enabled: dashboards.enabled.value().copied(),
        max_old_space_size: dashboards.max_old_space_size.value().copied(),
        request_timeout: dashboards.request_timeout.value().copied(),
    }
}

fn observe_index_patterns(patterns: Vec<opensearch::IndexPattern>) -> Vec<IndexPattern> {
    patterns
        .into_iter()
        .map(|pattern| IndexPattern {
            max_index_count: Attr::from_option(pattern.max_index_count),
            pattern: Attr::from_option(pattern.pattern),
            sorting_algorithm: Attr::from_option(
                pattern
                    .sorting_algorithm
                    .and_then(|algorithm| algorithm.parse::<SortingAlgorithm>().ok()),
            ),
        })
        .collect()
}

fn observe_index_template(template: opensearch::IndexTemplate) -> IndexTemplate {
    IndexTemplate {
        mapping_nested_objects_limit: Attr::from_option(template.mapping_nested_objects_limit),
        number_of_replicas: Attr::from_option(template.number_of_replicas),
        number_of_shards: Attr::from_option(template.number_of_shards),
    }
}

fn observe_dashboards(dashboards: opensearch::Dashboards) -> Dashboards {
    Dashboards {
        enabled: Attr::from_option(dashboards.enabled),
        max_old_space_size: Attr::from_option(dashboards.max_old_space_size),
        request_timeout: Attr::from_option(dashboards.request_timeout),
    }
}

/// returns if a nested block changed, a block is compared attribute by
/// attribute when both sides are set
fn nested_changed<T, F>(planned: &Attr<T>, state: &Attr<T>, differs: F) -> bool
where
    T: PartialEq,
    F: Fn(&T, &T) -> bool,
{
    match (planned, state) {
        (Attr::Value(planned), Attr::Value(state)) => differs(planned, state),
        _ => planned.changed(state),
    }
}

// -----------------------------------------------------------------------------
// Helpers functions

pub async fn create<C>(client: &C, model: &Service) -> Result<Operation, Error>
where
    C: RestClient,
{
    let variant = block(&model.opensearch, Kind::Opensearch)?;
    let mut builder = Builder::new(client, Kind::Opensearch);

    if variant.max_index_count.value().is_some() {
        warn!(name = &model.name, "Attribute 'max_index_count' is deprecated and ignored, use 'index_pattern' instead");
    }

    let opts = opensearch::CreateOpts {
        plan: model.plan.to_owned(),
        termination_protection: model.termination_protection.value().copied(),
        maintenance: model.maintenance(),
        ip_filter: ip_filter(&variant.ip_filter),
        version: variant.version.value().cloned(),
        fork_from_service: variant.fork_from_service.value().cloned(),
        recovery_backup_name: variant.recovery_backup_name.value().cloned(),
        keep_index_refresh_interval: variant.keep_index_refresh_interval.value().copied(),
        index_patterns: variant.index_pattern.value().map(|patterns| index_patterns(patterns)),
        index_template: variant.index_template.value().map(index_template),
        dashboards: variant.dashboards.value().map(dashboards),
        opensearch_settings: builder.settings("settings", &variant.settings).await?,
    };

    builder.finish()?;
    Ok(opensearch::create(client, &model.name, &opts).await?)
}

pub async fn read<C>(client: &C, model: &mut Service) -> Result<(), Error>
where
    C: RestClient,
{
    let service = opensearch::get(client, &model.name).await?;
    observe_common(model, &service.common);

    let prior = match std::mem::take(&mut model.opensearch) {
        Attr::Value(variant) => variant,
        _ => OpensearchVariant::default(),
    };

    model.opensearch = Attr::Value(OpensearchVariant {
        fork_from_service: prior.fork_from_service.or_null(),
        recovery_backup_name: prior.recovery_backup_name.or_null(),
        ip_filter: observe_ip_filter(prior.ip_filter, service.ip_filter),
        keep_index_refresh_interval: prior
            .keep_index_refresh_interval
            .observe(service.keep_index_refresh_interval),
        max_index_count: prior.max_index_count.or_null(),
        version: observe_version(prior.version, service.version, Kind::Opensearch),
        settings: observe_settings(prior.settings, service.opensearch_settings),
        index_pattern: prior.index_pattern.observe(
            service
                .index_patterns
                .filter(|patterns| !patterns.is_empty())
                .map(observe_index_patterns),
        ),
        index_template: prior
            .index_template
            .observe(service.index_template.map(observe_index_template)),
        dashboards: prior.dashboards.observe(service.dashboards.map(observe_dashboards)),
    });

    Ok(())
}

pub async fn update<C>(client: &C, state: &Service, planned: &Service) -> Result<Option<Operation>, Error>
where
    C: RestClient,
{
    let variant = block(&planned.opensearch, Kind::Opensearch)?;
    let prior = state.opensearch.value().cloned().unwrap_or_default();
    let common = CommonUpdate::diff(state, planned);
    let mut builder = Builder::new(client, Kind::Opensearch);

    let index_patterns = nested_changed(&variant.index_pattern, &prior.index_pattern, |planned, state| {
        planned.len() != state.len() || planned.iter().zip(state).any(|(planned, state)| planned.differs(state))
    })
    .then(|| index_patterns(variant.index_pattern.value().map(Vec::as_slice).unwrap_or_default()));

    let opts = opensearch::UpdateOpts {
        plan: common.plan,
        termination_protection: common.termination_protection,
        maintenance: common.maintenance,
        ip_filter: ip_filter_update(&variant.ip_filter, &prior.ip_filter),
        keep_index_refresh_interval: if variant
            .keep_index_refresh_interval
            .changed(&prior.keep_index_refresh_interval)
        {
            variant.keep_index_refresh_interval.value().copied()
        } else {
            None
        },
        index_patterns,
        index_template: if nested_changed(&variant.index_template, &prior.index_template, IndexTemplate::differs) {
            variant.index_template.value().map(index_template)
        } else {
            None
        },
        dashboards: if nested_changed(&variant.dashboards, &prior.dashboards, Dashboards::differs) {
            variant.dashboards.value().map(dashboards)
        } else {
            None
        },
        opensearch_settings: builder
            .changed_settings("settings", &variant.settings, &prior.settings)
            .await?,
    };

    builder.finish()?;
    if opts.is_empty() {
        return Ok(None);
    }

    info!(name = &planned.name, zone = client.zone(), "Execute update of opensearch service");
    Ok(Some(opensearch::update(client, &planned.name, &opts).await?))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::Method;
    use serde_json::json;

    use crate::svc::{
        apis::testing::Fake,
        cfg::Configuration,
        dbaas::{service, Controller},
    };

    use super::*;

    fn planned() -> Service {
        serde_json::from_value(json!({
            "name": "o1", "zone": "z1", "type": "opensearch", "plan": "startup-4",
            "opensearch": {
                "max_index_count": 4,
                "index_pattern": [
                    {"max_index_count": 2, "pattern": "log.?", "sorting_algorithm": "alphabetical"},
                    {"max_index_count": 12, "pattern": "internet.*", "sorting_algorithm": "creation_date"}
                ],
                "index_template": {"mapping_nested_objects_limit": 5, "number_of_replicas": 4, "number_of_shards": 3},
                "dashboards": {"enabled": true, "max_old_space_size": 129, "request_timeout": 30001}
            }
        }))
        .expect("model to deserialize")
    }

    #[tokio::test(start_paused = true)]
    async fn partial_nested_blocks_do_not_trigger_updates() {
        let client = Fake::new("z1");
        let ctrl = Controller::new(client.to_owned(), Arc::new(Configuration::default()));
        let planned: Service = serde_json::from_value(json!({
            "name": "o1", "zone": "z1", "type": "opensearch", "plan": "startup-4",
            "opensearch": {
                "index_template": {"number_of_shards": 3},
                "dashboards": {"enabled": true}
            }
        }))
        .expect("model to deserialize");

        let state = service::create(&ctrl, planned.to_owned()).await.expect("service to be created");
        let variant = state.opensearch.value().expect("opensearch block to be set");
        assert!(variant
            .index_template
            .value()
            .map(|template| template.number_of_replicas.value().is_some())
            .unwrap_or(false));

        let before = client.mutations().len();
        let state = service::update(&ctrl, state, planned.to_owned()).await.expect("service to be updated");
        assert_eq!(before, client.mutations().len());

        let mut planned = planned;
        if let Attr::Value(variant) = &mut planned.opensearch {
            if let Attr::Value(dashboards) = &mut variant.dashboards {
                dashboards.enabled = Attr::Value(false);
            }
        }

        service::update(&ctrl, state, planned).await.expect("service to be updated");
        let put = client.mutations().pop().expect("an update to be sent");
        assert_eq!(Method::PUT, put.method);
        assert_eq!(
            Some(&json!(false)),
            put.body.as_ref().and_then(|b| b.pointer("/opensearch-dashboards/enabled"))
        );
        assert_eq!(None, put.body.as_ref().and_then(|b| b.get("index-template")));
    }

    #[tokio::test(start_paused = true)]
    async fn nested_blocks_are_read_verbatim_and_updated_in_place() {
        let client = Fake::new("z1");
        let ctrl = Controller::new(client.to_owned(), Arc::new(Configuration::default()));

        let state = service::create(&ctrl, planned()).await.expect("service to be created");
        let variant = state.opensearch.value().expect("opensearch block to be set");
        let expected = planned();
        let expected = expected.opensearch.value().expect("opensearch block to be set");

        assert_eq!(expected.index_pattern, variant.index_pattern);
        assert_eq!(expected.index_template, variant.index_template);
        assert_eq!(expected.dashboards, variant.dashboards);
        assert_eq!(Attr::Value(4), variant.max_index_count);

        let post = client.mutations().pop().expect("a creation to be sent");
        assert_eq!(None, post.body.as_ref().and_then(|b| b.get("max-index-count")));

        let mut planned = planned();
        if let Attr::Value(variant) = &mut planned.opensearch {
            if let Attr::Value(patterns) = &mut variant.index_pattern {
                patterns[0].max_index_count = Attr::Value(4);
            }
        }

        let state = service::update(&ctrl, state, planned).await.expect("service to be updated");
        let put = client.mutations().pop().expect("an update to be sent");
        assert_eq!(Method::PUT, put.method);
        assert_eq!(
            Some(&json!(4)),
            put.body
                .as_ref()
                .and_then(|b| b.pointer("/index-patterns/0/max-index-count"))
        );

        let variant = state.opensearch.value().expect("opensearch block to be set");
        assert_eq!(
            Some(&Attr::Value(4)),
            variant.index_pattern.value().map(|patterns| &patterns[0].max_index_count)
        );
    }
}
