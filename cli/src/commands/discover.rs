use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::*;
use rolemap_common::models::DiscoveredHost;
use rolemap_common::network::range::DiscoveryRange;
use rolemap_core::Engine;

use crate::commands::DiscoverArgs;
use crate::terminal::{colors, print, spinner};

pub async fn discover(args: DiscoverArgs) -> anyhow::Result<()> {
    let ranges: Vec<DiscoveryRange> = args
        .ranges
        .iter()
        .map(|range| range.parse())
        .collect::<Result<_, _>>()?;

    let engine = Engine::new(args.probe.engine_config()?).with_progress(Arc::new(spinner::report));
    let liveness_port = engine.config().discovery.liveness_port;

    spinner::start("Searching for live hosts...");
    let start_time: Instant = Instant::now();
    let hosts: Vec<DiscoveredHost> = engine.discover(&ranges).await;
    spinner::stop();

    discovery_ends(&hosts, start_time.elapsed(), liveness_port);
    Ok(())
}

fn discovery_ends(hosts: &[DiscoveredHost], total_time: Duration, liveness_port: u16) {
    if hosts.is_empty() {
        print::header("zero hosts detected");
        print::no_results();
        return;
    }

    print::header("network discovery");
    for (idx, host) in hosts.iter().enumerate() {
        print::tree_head(idx, &host.label(), None);
        let answered: ColoredString = format!("tcp/{liveness_port}").color(colors::PORT_OPEN);
        let mut details = vec![("Answered".to_string(), answered)];
        if host.name.is_some() {
            details.push(("Address".to_string(), host.addr.to_string().normal()));
        }
        print::as_tree_one_level(details);
    }
    print_summary(hosts.len(), total_time);
}

fn print_summary(hosts_len: usize, total_time: Duration) {
    let active_hosts: ColoredString = format!("{hosts_len} active hosts").bold().green();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let output: String = format!("Discovery Complete: {active_hosts} identified in {total_time}");

    print::fat_separator();
    print::centerln(&output);
}
