pub mod discover;
pub mod profile;
pub mod scan;

use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use rolemap_common::config::{DEFAULT_CONCURRENCY, DEFAULT_LIVENESS_PORT, EngineConfig};

#[derive(Parser)]
#[command(name = "rolemap")]
#[command(about = "Maps APP, SQL and CTX roles across a Windows server fleet.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze servers and infer their roles
    #[command(alias = "s")]
    Scan(ScanArgs),
    /// Find live hosts in one or more ranges
    #[command(alias = "d")]
    Discover(DiscoverArgs),
    /// Show the port profile and role markers in use
    #[command(alias = "p")]
    Profile(ProfileArgs),
}

#[derive(Args)]
pub struct ScanArgs {
    /// Comma-separated hostnames or addresses
    #[arg(long, default_value = "")]
    pub servers: String,

    /// Role declarations, e.g. "srv-app-01=APP;srv-sql-01=SQL"
    #[arg(long, default_value = "")]
    pub declare: String,

    /// Discovery base prefix, e.g. 192.168.10
    #[arg(long)]
    pub discover_base: Option<String>,

    #[arg(long, default_value_t = 1)]
    pub discover_start: u32,

    #[arg(long, default_value_t = 254)]
    pub discover_end: u32,

    /// Extra discovery ranges, e.g. 10.0.0.1-20 or 10.0.0.0/24
    #[arg(long = "discover")]
    pub discover: Vec<String>,

    /// Targets analyzed at the same time
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Abort outstanding work after this many seconds
    #[arg(long)]
    pub run_deadline_secs: Option<u64>,

    #[command(flatten)]
    pub probe: ProbeArgs,
}

#[derive(Args)]
pub struct DiscoverArgs {
    /// Ranges to sweep, e.g. 192.168.10.1-50
    #[arg(required = true)]
    pub ranges: Vec<String>,

    #[command(flatten)]
    pub probe: ProbeArgs,
}

#[derive(Args)]
pub struct ProfileArgs {
    #[command(flatten)]
    pub probe: ProbeArgs,
}

#[derive(Args)]
pub struct ProbeArgs {
    #[arg(long, default_value_t = 800)]
    pub port_timeout_ms: u64,

    /// Budget for one target, name resolution included
    #[arg(long, default_value_t = 10)]
    pub target_deadline_secs: u64,

    /// Port used to decide whether a discovered host is alive
    #[arg(long, default_value_t = DEFAULT_LIVENESS_PORT)]
    pub liveness_port: u16,

    /// Keep discovered hosts as bare addresses instead of their PTR names
    #[arg(long)]
    pub no_reverse_dns: bool,

    /// Extra port rule PORT[=ROLE[:WEIGHT]], repeatable
    #[arg(long = "port")]
    pub ports: Vec<String>,
}

impl ProbeArgs {
    pub fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let mut config = EngineConfig {
            port_timeout: Duration::from_millis(self.port_timeout_ms),
            target_deadline: Duration::from_secs(self.target_deadline_secs),
            ..EngineConfig::default()
        };
        config.discovery.liveness_port = self.liveness_port;
        config.discovery.reverse_dns = !self.no_reverse_dns;

        for rule in &self.ports {
            config.profile = config.profile.with_rule_str(rule)?;
        }
        Ok(config)
    }
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
