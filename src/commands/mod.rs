mod config_cmd;
mod course;
mod import;
mod person;
mod schedule;
mod session;

pub use config_cmd::ConfigCommand;
pub use course::CourseCommand;
pub use import::ImportCommand;
pub use person::PersonCommand;
pub use schedule::ScheduleCommand;
pub use session::SessionCommand;

use clap::ValueEnum;
use std::io::{self, Write};

use classplan::{PendingSync, SyncOutcome};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Waits for a command's remote write. The local change has already been
/// applied either way; a failed write is reported as the command's error.
pub async fn settle(pending: PendingSync) -> Result<(), Box<dyn std::error::Error>> {
    match pending.settled().await {
        SyncOutcome::Synced => Ok(()),
        SyncOutcome::Failed(e) => Err(format!("Remote sync failed: {}", e.user_message()).into()),
    }
}

/// Asks for a y/N confirmation on stdin.
pub fn confirm(prompt: &str) -> Result<bool, Box<dyn std::error::Error>> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Shortens a cell to `width` characters for table output.
pub fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() > width {
        let cut: String = value.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        value.to_string()
    }
}

/// Splits comma-separated ids given on the command line.
pub fn split_ids(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.split(','))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}
