use std::io::{self, Write};
use std::sync::OnceLock;
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use rolemap_core::progress::Progress;

static SPINNER: OnceLock<ProgressBar> = OnceLock::new();

fn get_spinner() -> &'static ProgressBar {
    SPINNER.get_or_init(init_spinner)
}

fn init_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&[
            "▁▁▁▁▁",
            "▁▂▂▂▁",
            "▁▄▂▄▁",
            "▂▄▆▄▂",
            "▄▆█▆▄",
            "▂▄▆▄▂",
            "▁▄▂▄▁",
            "▁▂▂▂▁",
        ]);
    pb.set_style(style);
    pb
}

pub fn start(message: &str) {
    let pb = get_spinner();
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
}

pub fn stop() {
    let pb = get_spinner();
    pb.disable_steady_tick();
    pb.finish_and_clear();
}

/// Progress sink handed to the engine.
pub fn report(progress: Progress) {
    let message = match progress {
        Progress::HostFound { live } => format!(
            "Identified {} hosts so far...",
            live.to_string().green().bold()
        ),
        Progress::TargetFinished { done, total } => format!(
            "Analyzed {} of {} servers...",
            done.to_string().green().bold(),
            total.to_string().bold()
        ),
    };
    get_spinner().set_message(message);
}

/// Log writer that keeps lines from tearing through the spinner.
pub struct SpinnerWriter;

impl Write for SpinnerWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        get_spinner().suspend(|| io::stdout().write_all(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}
