use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use rolemap_common::config::{DiscoveryConfig, EngineConfig, RunOptions};
use rolemap_common::error::{EngineError, RunError};
use rolemap_common::models::{DiscoveredHost, Role, TargetOrigin};
use rolemap_common::network::range::DiscoveryRange;
use rolemap_common::network::target::TargetSpec;
use rolemap_core::Engine;
use rolemap_core::network::scripted::ScriptedNetwork;
use tokio::net::TcpListener;

use crate::support::engine;

/// Only 192.168.10.5 answers; the sweep must yield exactly that target.
#[tokio::test]
async fn discovery_finds_the_single_live_host() {
    let live = Ipv4Addr::new(192, 168, 10, 5);
    let net = Arc::new(ScriptedNetwork::new().open(live, 135).open(live, 1433));
    let spec = TargetSpec::new().discover("192.168.10", 1, 50);

    let run = engine(&net).run(&spec, &RunOptions::default()).await.unwrap();

    assert_eq!(run.results.len(), 1);
    let result = &run.results[0];
    assert_eq!(result.target.host, "192.168.10.5");
    assert_eq!(result.target.origin, TargetOrigin::Discovered);
    assert_eq!(result.inferred_roles(), vec![Role::Sql]);
}

#[tokio::test]
async fn explicit_hosts_precede_discovered_ones() {
    let net = Arc::new(
        ScriptedNetwork::new()
            .host("srv-app-01", Ipv4Addr::new(10, 0, 0, 200))
            .open(Ipv4Addr::new(10, 0, 0, 9), 135)
            .open(Ipv4Addr::new(10, 0, 0, 3), 135)
            .open(Ipv4Addr::new(10, 0, 0, 200), 80),
    );
    let spec = TargetSpec::new()
        .hosts("srv-app-01, 10.0.0.9")
        .discover_text("10.0.0.1-20")
        .declarations("10.0.0.3=CTX");

    let run = engine(&net).run(&spec, &RunOptions::default()).await.unwrap();

    let hosts: Vec<&str> = run.results.iter().map(|r| r.target.host.as_str()).collect();
    assert_eq!(hosts, vec!["srv-app-01", "10.0.0.9", "10.0.0.3"]);
    assert_eq!(run.results[2].inferred_roles(), vec![Role::Ctx]);
}

/// PTR names replace bare addresses, and a name that matches an explicit
/// host (short name vs FQDN) is not analyzed twice.
#[tokio::test]
async fn discovered_hosts_are_named_and_merged_with_explicit_ones() {
    let sql = Ipv4Addr::new(10, 0, 5, 21);
    let ctx = Ipv4Addr::new(10, 0, 5, 31);
    let net = Arc::new(
        ScriptedNetwork::new()
            .host("srv-sql-01", sql)
            .open(sql, 135)
            .open(sql, 1433)
            .open(ctx, 135)
            .open(ctx, 3389)
            .ptr(sql, "srv-sql-01.corp.local")
            .ptr(ctx, "srv-ctx-01.corp.local"),
    );
    let spec = TargetSpec::new()
        .hosts("srv-sql-01")
        .discover("10.0.5", 1, 40)
        .declarations("srv-ctx-01=APP");

    let run = engine(&net).run(&spec, &RunOptions::default()).await.unwrap();

    let hosts: Vec<&str> = run.results.iter().map(|r| r.target.host.as_str()).collect();
    assert_eq!(hosts, vec!["srv-sql-01", "srv-ctx-01.corp.local"]);
    assert_eq!(run.results[0].inferred_roles(), vec![Role::Sql]);
    assert_eq!(run.results[1].inferred_roles(), vec![Role::App]);
    assert_eq!(run.results[1].target.origin, TargetOrigin::Discovered);
}

#[tokio::test]
async fn discovery_finding_nothing_is_no_targets() {
    let net = Arc::new(ScriptedNetwork::new());
    let spec = TargetSpec::new().discover("192.168.77", 1, 10);

    let err = engine(&net).run(&spec, &RunOptions::default()).await.unwrap_err();
    assert_eq!(err, EngineError::Run(RunError::NoTargets));
    assert_eq!(net.connect_attempts(), 10);
}

#[tokio::test]
async fn discovery_is_bounded_by_the_run_deadline() {
    let net = Arc::new(ScriptedNetwork::new().silent(Ipv4Addr::new(10, 1, 1, 1)));
    let config = EngineConfig {
        discovery: DiscoveryConfig {
            probe_timeout: Duration::from_secs(5),
            ..DiscoveryConfig::default()
        },
        ..EngineConfig::default()
    };
    let engine = Engine::new(config).with_network(net);
    let options = RunOptions {
        concurrency: 2,
        run_deadline: Some(Duration::from_millis(100)),
    };

    let err = engine
        .run(&TargetSpec::new().discover("10.1.1", 1, 1), &options)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Run(RunError::DeadlineExceeded));
}

/// Real handshakes against loopback: only the bound address answers.
#[tokio::test]
async fn discovery_single_loopback() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let config = EngineConfig {
        discovery: DiscoveryConfig {
            liveness_port: port,
            probe_timeout: Duration::from_millis(300),
            pool_size: 4,
            reverse_dns: false,
        },
        ..EngineConfig::default()
    };
    let engine = Engine::new(config);

    let range: DiscoveryRange = "127.0.0.1-1".parse().unwrap();
    let live = engine.discover(&[range]).await;

    assert_eq!(live, vec![DiscoveredHost::new(Ipv4Addr::LOCALHOST)]);
    drop(listener);
}
