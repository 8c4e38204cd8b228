use colored::*;
use rolemap_common::config::EngineConfig;

use crate::commands::ProfileArgs;
use crate::terminal::format::{self, Detail};
use crate::terminal::print;

pub fn profile(args: ProfileArgs) -> anyhow::Result<()> {
    let config = args.probe.engine_config()?;
    print_ports(&config);
    print::blank();
    print_markers(&config);
    print::blank();
    print_limits(&config);
    Ok(())
}

fn print_ports(config: &EngineConfig) {
    print::tree_head(0, "ports", None);
    let details: Vec<Detail> = config
        .profile
        .iter()
        .map(|(port, rule)| {
            let hint = match rule.role {
                Some(role) => format!(
                    "{} {} (weight {})",
                    rule.label,
                    role.as_str().color(format::role_color(role)),
                    rule.weight
                ),
                None => format!("{} {}", rule.label, "no role".bright_black()),
            };
            (port.to_string(), hint.normal())
        })
        .collect();
    print::as_tree_one_level(details);
}

fn print_markers(config: &EngineConfig) {
    print::tree_head(1, "markers", None);
    let details: Vec<Detail> = config
        .markers
        .iter()
        .map(|marker| {
            let role = marker.role.as_str().color(format::role_color(marker.role));
            (marker.keyword.clone(), format!("{role} (weight {})", marker.weight).normal())
        })
        .collect();
    print::as_tree_one_level(details);
}

fn print_limits(config: &EngineConfig) {
    print::tree_head(2, "limits", None);
    let details: Vec<Detail> = vec![
        (
            "High".to_string(),
            format!("score >= {}", config.thresholds.high()).normal(),
        ),
        (
            "Medium".to_string(),
            format!("score >= {}", config.thresholds.medium()).normal(),
        ),
        (
            "Port timeout".to_string(),
            format!("{} ms", config.port_timeout.as_millis()).normal(),
        ),
        (
            "Target deadline".to_string(),
            format!("{} s", config.target_deadline.as_secs()).normal(),
        ),
        (
            "Liveness port".to_string(),
            config.discovery.liveness_port.to_string().normal(),
        ),
    ];
    print::as_tree_one_level(details);
}
