use std::net::Ipv4Addr;
use std::sync::Arc;

use rolemap_common::config::RunOptions;
use rolemap_common::error::{EngineError, RunError, TargetError, ValidationError};
use rolemap_common::models::{Confidence, PortState, Role, RoleSource};
use rolemap_common::network::target::TargetSpec;
use rolemap_core::network::scripted::ScriptedNetwork;

use crate::support::{engine, outcomes};

const APP_01: Ipv4Addr = Ipv4Addr::new(10, 20, 0, 11);
const SQL_01: Ipv4Addr = Ipv4Addr::new(10, 20, 0, 21);
const CTX_01: Ipv4Addr = Ipv4Addr::new(10, 20, 0, 31);
const DEAD_01: Ipv4Addr = Ipv4Addr::new(10, 20, 0, 99);

fn fleet() -> ScriptedNetwork {
    ScriptedNetwork::new()
        .host("srv-app-01", APP_01)
        .host("srv-sql-01", SQL_01)
        .host("srv-ctx-01", CTX_01)
        .host("srv-dead-01", DEAD_01)
        .open(APP_01, 80)
        .open(APP_01, 443)
        .open(APP_01, 135)
        .open(SQL_01, 1433)
        .open(SQL_01, 1434)
        .open(SQL_01, 135)
        .open(CTX_01, 3389)
        .open(CTX_01, 135)
        .silent(DEAD_01)
}

fn options(concurrency: usize) -> RunOptions {
    RunOptions {
        concurrency,
        run_deadline: None,
    }
}

#[tokio::test]
async fn declared_roles_are_authoritative() {
    let net = Arc::new(fleet());
    let spec = TargetSpec::new()
        .hosts("srv-app-01,srv-sql-01")
        .declarations("srv-app-01=APP;srv-sql-01=SQL");

    let run = engine(&net).run(&spec, &options(4)).await.unwrap();

    assert_eq!(run.results.len(), 2);
    assert_eq!(run.results[0].target.host, "srv-app-01");
    assert_eq!(run.results[0].inferred_roles(), vec![Role::App]);
    assert_eq!(run.results[1].inferred_roles(), vec![Role::Sql]);
    for result in &run.results {
        assert_eq!(result.role_source, RoleSource::Declared);
        assert_eq!(result.roles[0].confidence, Confidence::High);
        assert!(result.is_ok());
    }
}

#[tokio::test]
async fn one_unroutable_server_does_not_fail_the_run() {
    let net = Arc::new(fleet());
    let spec = TargetSpec::new().hosts("srv-sql-01,srv-dead-01,srv-ctx-01");

    let run = engine(&net).run(&spec, &options(3)).await.unwrap();

    let hosts: Vec<&str> = run.results.iter().map(|r| r.target.host.as_str()).collect();
    assert_eq!(hosts, vec!["srv-sql-01", "srv-dead-01", "srv-ctx-01"]);

    assert!(run.results[0].is_ok());
    assert_eq!(run.results[0].inferred_roles(), vec![Role::Sql]);

    assert_eq!(run.results[1].error, Some(TargetError::Unreachable));
    assert!(run.results[1].roles.is_empty());

    assert!(run.results[2].is_ok());
    assert_eq!(run.results[2].inferred_roles(), vec![Role::Ctx]);

    assert_eq!(run.context.summary.error_count, 1);
    assert_eq!(run.context.summary.targets_analyzed, 3);
}

#[tokio::test]
async fn concurrency_does_not_change_results() {
    let spec = TargetSpec::new()
        .hosts("srv-ctx-01,srv-dead-01,srv-app-01,srv-missing,srv-sql-01")
        .declarations("srv-dead-01=SQL");

    let net = Arc::new(fleet());
    let serial = engine(&net).run(&spec, &options(1)).await.unwrap();
    let parallel = engine(&net).run(&spec, &options(8)).await.unwrap();

    assert_eq!(serial.context.concurrency, 1);
    assert_eq!(parallel.context.concurrency, 5);
    assert_eq!(outcomes(&serial.results), outcomes(&parallel.results));
    assert_eq!(serial.context.summary, parallel.context.summary);
}

#[tokio::test]
async fn run_id_is_shared_within_a_run_and_fresh_across_runs() {
    let net = Arc::new(fleet());
    let engine = engine(&net);
    let spec = TargetSpec::new().hosts("srv-app-01,srv-sql-01,srv-ctx-01");

    let first = engine.run(&spec, &options(3)).await.unwrap();
    let second = engine.run(&spec, &options(3)).await.unwrap();

    assert!(first.results.iter().all(|r| r.run_id == first.context.run_id));
    assert!(second.results.iter().all(|r| r.run_id == second.context.run_id));
    assert_ne!(first.context.run_id, second.context.run_id);
}

#[tokio::test]
async fn declaration_holds_with_every_port_closed() {
    let net = Arc::new(ScriptedNetwork::new().host("srv-sql-02", Ipv4Addr::new(10, 20, 0, 22)));
    let spec = TargetSpec::new().hosts("srv-sql-02").declarations("srv-sql-02=SQL");

    let run = engine(&net).run(&spec, &options(1)).await.unwrap();
    let result = &run.results[0];

    assert!(result.is_ok());
    assert!(result.ports.iter().all(|p| p.state == PortState::Closed));
    assert_eq!(result.inferred_roles(), vec![Role::Sql]);
    assert!(!result.notes.is_empty());
}

#[tokio::test]
async fn declaration_holds_when_the_name_does_not_resolve() {
    let net = Arc::new(fleet());
    let spec = TargetSpec::new()
        .hosts("srv-gone,srv-app-01")
        .declarations("srv-gone=SQL");

    let run = engine(&net).run(&spec, &options(2)).await.unwrap();
    let gone = &run.results[0];

    assert!(matches!(gone.error, Some(TargetError::Resolution { .. })));
    assert_eq!(gone.inferred_roles(), vec![Role::Sql]);
    assert_eq!(gone.roles[0].confidence, Confidence::High);
    assert_eq!(gone.role_source, RoleSource::Declared);
    assert!(run.results[1].is_ok());
}

#[tokio::test]
async fn no_open_ports_means_no_roles_and_no_error() {
    let net = Arc::new(ScriptedNetwork::new().host("srv-blank", Ipv4Addr::new(10, 20, 0, 40)));
    let spec = TargetSpec::new().hosts("srv-blank");

    let run = engine(&net).run(&spec, &options(1)).await.unwrap();
    let result = &run.results[0];

    assert!(result.is_ok());
    assert!(result.roles.is_empty());
    assert_eq!(result.open_ports().count(), 0);
    assert_eq!(result.ports.len(), engine(&net).config().profile.len());
}

#[tokio::test]
async fn validation_happens_before_any_socket() {
    let net = Arc::new(fleet());

    let bad_range = TargetSpec::new().hosts("srv-app-01").discover("192.168.10", 10, 5);
    let err = engine(&net).run(&bad_range, &options(2)).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::InvalidRange { .. })
    ));

    let bad_role = TargetSpec::new()
        .hosts("srv-app-01")
        .declarations("srv-app-01=SQL,APP");
    let err = engine(&net).run(&bad_role, &options(2)).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::UnknownRole { .. })
    ));

    assert_eq!(net.connect_attempts(), 0);
    assert_eq!(net.resolve_attempts(), 0);
}

#[tokio::test]
async fn empty_specification_is_no_targets() {
    let net = Arc::new(fleet());
    let err = engine(&net)
        .run(&TargetSpec::new().hosts(" , "), &options(2))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Run(RunError::NoTargets));
}

#[tokio::test]
async fn summary_counts_open_role_ports() {
    let net = Arc::new(fleet());
    let spec = TargetSpec::new().hosts("srv-app-01,srv-sql-01,srv-ctx-01");

    let run = engine(&net).run(&spec, &options(3)).await.unwrap();
    let by_role = &run.context.summary.open_ports_by_role;

    assert_eq!(by_role.get(&Role::App), Some(&2));
    assert_eq!(by_role.get(&Role::Sql), Some(&2));
    assert_eq!(by_role.get(&Role::Ctx), Some(&1));
    assert_eq!(run.results[0].roles[0].confidence, Confidence::Medium);
}
