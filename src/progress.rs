// progress.rs

use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use prettytable::{row, Table};
use std::io::{self, IsTerminal, Write};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// Forwards a message to the `log` facade at the matching level.
pub fn log(level: LogLevel, message: &str) {
    match level {
        LogLevel::Debug => log::debug!("{}", message),
        LogLevel::Info => log::info!("{}", message),
        LogLevel::Warning => log::warn!("{}", message),
        LogLevel::Error => log::error!("{}", message),
    }
}

/// A titled block of key/value statistics shown to the user after a step.
pub struct StatusBox {
    pub title: String,
    pub stats: Vec<(String, String)>,
}

/// Creates a spinner on stderr. Hidden when stderr is not a terminal so
/// library callers and tests get no escape codes.
pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = if io::stderr().is_terminal() {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden())
    };
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Renders the box as a two-column table. Also logged at debug level.
pub fn render_status_box(status: &StatusBox) -> String {
    let mut table = Table::new();
    table.add_row(row!["Statistic", "Value"]);
    for (key, value) in &status.stats {
        table.add_row(row![key, value]);
    }
    format!("{}\n{}", status.title.green().bold(), table)
}

pub fn display_status_box(status: StatusBox) {
    for (key, value) in &status.stats {
        log::debug!("{}: {} = {}", status.title, key, value);
    }
    let rendered = render_status_box(&status);
    let mut stdout = io::stdout().lock();
    // A closed stdout is not worth failing an analysis over
    let _ = writeln!(stdout, "\n{}", rendered);
    let _ = stdout.flush();
}
