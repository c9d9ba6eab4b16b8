//! # Waiter module
//!
//! This module provide the two pollers used by controllers, one watching an
//! asynchronous operation until it reaches a state and one watching a service
//! until it meets a readiness predicate.

use std::time::Duration;

use tokio::time::{sleep, timeout_at};
use tracing::{debug, info, trace};

use crate::svc::{
    apis::{
        dbaas::{self, Head},
        operation::{self, Operation, State},
        RestClient,
    },
    cfg,
    dbaas::{
        kind::{Kind, Readiness},
        Context, Error,
    },
};

// -----------------------------------------------------------------------------
// Predicates

pub fn running(head: &Head) -> bool {
    head.common.state.as_deref() == Some("running")
}

pub fn users_ready(head: &Head) -> bool {
    !head.common.users.is_empty()
}

/// returns the predicate a service has to meet before users are created
pub fn predicate(readiness: Readiness) -> fn(&Head) -> bool {
    match readiness {
        Readiness::Running => running,
        Readiness::UsersReady => users_ready,
    }
}

// -----------------------------------------------------------------------------
// Helpers functions

/// polls the operation until it reaches the target state, a terminal state
/// other than the target fails the wait
pub async fn wait<C>(
    client: &C,
    op: Operation,
    target: State,
    ctx: &Context,
    interval: Duration,
) -> Result<Operation, Error>
where
    C: RestClient,
{
    let id = op.id.to_owned();
    let poll = async move {
        let mut op = op;
        loop {
            trace!(id = &op.id, state = op.state.to_string(), "Poll operation");
            if op.state == target {
                return Ok(op);
            }

            if op.state.is_terminal() {
                let reason = op
                    .message
                    .or(op.reason)
                    .unwrap_or_else(|| format!("operation reached state '{}'", op.state));

                return Err(Error::OperationFailed(op.id, reason));
            }

            sleep(interval).await;
            op = operation::get(client, &op.id).await?;
        }
    };

    let op = timeout_at(ctx.deadline(), poll)
        .await
        .map_err(|_| Error::DeadlineExceeded(format!("operation '{}'", id)))??;

    debug!(id = &op.id, state = op.state.to_string(), "Operation reached target state");
    Ok(op)
}

/// polls the service until the predicate holds, then waits the settling
/// delay before returning its view
pub async fn wait_for_service<C, P>(
    client: &C,
    kind: Kind,
    name: &str,
    predicate: P,
    ctx: &Context,
    config: &cfg::Dbaas,
) -> Result<Head, Error>
where
    C: RestClient,
    P: Fn(&Head) -> bool + Send,
{
    let poll = async {
        loop {
            let head = dbaas::head(client, kind, name).await?;
            if predicate(&head) {
                info!(name = name, zone = client.zone(), "Service is ready, wait for settling delay");
                sleep(config.settling_delay).await;
                return Ok::<_, Error>(head);
            }

            trace!(name = name, state = head.common.state.as_deref().unwrap_or_default(), users = head.common.users.len(), "Service is not ready yet");
            sleep(config.poll_interval).await;
        }
    };

    timeout_at(ctx.deadline(), poll)
        .await
        .map_err(|_| Error::DeadlineExceeded(format!("service '{}' to be ready", name)))?
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::svc::apis::testing::Fake;

    fn config() -> cfg::Dbaas {
        cfg::Dbaas::default()
    }

    #[tokio::test(start_paused = true)]
    async fn operation_is_polled_until_success() {
        let client = Fake::new("z1");
        let op = client.operation_in(State::Pending, 2);

        let op = wait(&client, op, State::Success, &Context::new(Duration::from_secs(60)), Duration::from_secs(3))
            .await
            .expect("operation to succeed");

        assert_eq!(State::Success, op.state);
        assert_eq!(2, client.journal().iter().filter(|r| r.path.starts_with("/operation/")).count());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_operation_fails_the_wait() {
        let client = Fake::new("z1");
        let op = client.operation_in(State::Failure, 0);

        let err = wait(&client, op, State::Success, &Context::new(Duration::from_secs(60)), Duration::from_secs(3))
            .await
            .expect_err("operation to fail");

        assert!(matches!(err, Error::OperationFailed(_, _)), "{}", err);
    }

    #[tokio::test(start_paused = true)]
    async fn operation_wait_honours_the_deadline() {
        let client = Fake::new("z1");
        let op = client.operation_in(State::Running, 1000);

        let err = wait(&client, op, State::Success, &Context::new(Duration::from_secs(10)), Duration::from_secs(3))
            .await
            .expect_err("deadline to be exceeded");

        assert!(matches!(err, Error::DeadlineExceeded(_)), "{}", err);
    }

    #[tokio::test(start_paused = true)]
    async fn service_is_polled_until_users_are_ready() {
        let client = Fake::new("z1");
        client.insert_service("z1", json!({"name": "k1", "type": "kafka", "plan": "business-4", "state": "rebuilding", "users": []}));
        client.ready_after("k1", 2);

        let head = wait_for_service(&client, Kind::Kafka, "k1", users_ready, &Context::new(Duration::from_secs(60)), &config())
            .await
            .expect("service to be ready");

        assert!(!head.common.users.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn service_wait_honours_the_deadline() {
        let client = Fake::new("z1");
        client.insert_service("z1", json!({"name": "m1", "type": "mysql", "plan": "hobbyist-2", "state": "rebuilding", "users": []}));

        let err = wait_for_service(&client, Kind::Mysql, "m1", running, &Context::new(Duration::from_secs(20)), &config())
            .await
            .expect_err("deadline to be exceeded");

        assert!(matches!(err, Error::DeadlineExceeded(_)), "{}", err);
    }
}
