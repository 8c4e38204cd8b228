use std::net::IpAddr;

use colored::*;
use rolemap_common::models::{AnalysisResult, Confidence, InferredRole, PortCheckResult, Role, RoleSource};

use crate::terminal::colors;

pub type Detail = (String, ColoredString);

pub fn role_color(role: Role) -> Color {
    match role {
        Role::App => colors::ROLE_APP,
        Role::Sql => colors::ROLE_SQL,
        Role::Ctx => colors::ROLE_CTX,
    }
}

pub fn inferred_role(inferred: &InferredRole) -> ColoredString {
    let role = inferred.role.as_str().color(role_color(inferred.role)).bold();
    let confidence = match inferred.confidence {
        Confidence::High => "high".green(),
        Confidence::Medium => "medium".yellow(),
        Confidence::Low => "low".bright_black(),
    };
    format!("{role} ({confidence})").normal()
}

pub fn addresses_to_detail(addrs: &[IpAddr]) -> Option<Detail> {
    if addrs.is_empty() {
        return None;
    }
    let joined: Vec<String> = addrs
        .iter()
        .map(|addr| match addr {
            IpAddr::V4(v4) => v4.to_string().color(colors::IPV4_ADDR).to_string(),
            IpAddr::V6(v6) => v6.to_string().color(colors::IPV6_ADDR).to_string(),
        })
        .collect();
    Some(("Address".to_string(), joined.join(", ").normal()))
}

pub fn roles_to_detail(result: &AnalysisResult) -> Detail {
    let key = match result.role_source {
        RoleSource::Declared => "Roles (declared)",
        RoleSource::Inferred => "Roles",
    };
    let value = if result.roles.is_empty() {
        "none".bright_black()
    } else {
        let roles: Vec<String> = result.roles.iter().map(|r| inferred_role(r).to_string()).collect();
        roles.join(", ").normal()
    };
    (key.to_string(), value)
}

pub fn port_label(port: &PortCheckResult) -> String {
    match &port.service {
        Some(service) => format!("{} {}", port.port, service.bright_black()),
        None => port.port.to_string(),
    }
}

pub fn open_ports_to_detail(result: &AnalysisResult) -> Option<Detail> {
    if result.ports.is_empty() {
        return None;
    }
    let open: Vec<String> = result.open_ports().map(port_label).collect();
    let value = if open.is_empty() {
        "none".bright_black()
    } else {
        open.join(", ").color(colors::PORT_OPEN)
    };
    Some(("Open".to_string(), value))
}

pub fn result_details(result: &AnalysisResult) -> Vec<Detail> {
    let mut details: Vec<Detail> = Vec::new();

    details.extend(addresses_to_detail(&result.addresses));
    details.push(roles_to_detail(result));
    details.extend(open_ports_to_detail(result));

    if let Some(error) = &result.error {
        details.push(("Error".to_string(), error.to_string().color(colors::ERROR)));
    }
    for note in &result.notes {
        details.push(("Note".to_string(), note.italic()));
    }
    details
}
