use std::sync::Arc;
use std::time::Duration;

use colored::*;
use rolemap_common::config::RunOptions;
use rolemap_common::models::{Role, RunResult};
use rolemap_common::network::target::TargetSpec;
use rolemap_core::Engine;

use crate::commands::ScanArgs;
use crate::terminal::{colors, format, print, spinner};

pub async fn scan(args: ScanArgs) -> anyhow::Result<()> {
    let engine = Engine::new(args.probe.engine_config()?).with_progress(Arc::new(spinner::report));

    let mut spec = TargetSpec::new()
        .hosts(&args.servers)
        .declarations(&args.declare);
    if let Some(base) = &args.discover_base {
        spec = spec.discover(base, args.discover_start, args.discover_end);
    }
    for range in &args.discover {
        spec = spec.discover_text(range);
    }

    let options = RunOptions {
        concurrency: args.concurrency,
        run_deadline: args.run_deadline_secs.map(Duration::from_secs),
    };

    spinner::start("Analyzing servers...");
    let outcome = engine.run(&spec, &options).await;
    spinner::stop();

    let run = outcome?;
    print_results(&run);
    print_summary(&run);
    Ok(())
}

fn print_results(run: &RunResult) {
    print::header("server roles");
    for (idx, result) in run.results.iter().enumerate() {
        let tag = result
            .roles
            .first()
            .map(|top| top.role.as_str().color(format::role_color(top.role)).bold());
        print::tree_head(idx, &result.target.host, tag);
        print::as_tree_one_level(format::result_details(result));
        if idx + 1 != run.results.len() {
            print::blank();
        }
    }
}

fn print_summary(run: &RunResult) {
    let ctx = &run.context;
    let summary = &ctx.summary;
    let elapsed = (ctx.finished_at - ctx.started_at).num_milliseconds() as f64 / 1000.0;

    let analyzed: ColoredString = format!("{}/{} servers", summary.targets_analyzed, summary.targets_total)
        .bold()
        .green();
    let errors: ColoredString = match summary.error_count {
        0 => "no errors".green(),
        n => format!("{n} with errors").bold().color(colors::ERROR),
    };
    let total_time: ColoredString = format!("{elapsed:.2}s").bold().yellow();

    let by_role: Vec<String> = Role::ALL
        .iter()
        .map(|role| {
            let count = summary.open_ports_by_role.get(role).copied().unwrap_or(0);
            format!("{} {count}", role.as_str().color(format::role_color(*role)))
        })
        .collect();

    print::fat_separator();
    print::centerln(&format!("Analysis Complete: {analyzed} in {total_time}, {errors}"));
    print::centerln(&format!("open role ports: {}", by_role.join("  ")));
    print::centerln(&format!("{}", ctx.run_id.as_str().bright_black()));
}
