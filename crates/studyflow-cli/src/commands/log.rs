use chrono::{Local, NaiveDate};
use clap::Subcommand;
use studyflow_core::{Command, DailyLog};

use super::{applied, open_repository};

#[derive(Subcommand)]
pub enum LogAction {
    /// Record today's (or a given day's) stress and sleep
    Add {
        /// Stress level, 0 to 10
        #[arg(long)]
        stress: f64,
        /// Hours slept
        #[arg(long)]
        sleep: f64,
        /// Day of the entry (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show journal entries, newest last
    List {
        /// Only the last N entries
        #[arg(long)]
        last: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: LogAction) -> Result<(), Box<dyn std::error::Error>> {
    let (mut repo, _) = open_repository()?;

    match action {
        LogAction::Add {
            stress,
            sleep,
            date,
        } => {
            if !(0.0..=10.0).contains(&stress) {
                return Err(format!("stress must be between 0 and 10, got {stress}").into());
            }
            if !(0.0..=24.0).contains(&sleep) {
                return Err(format!("sleep must be between 0 and 24 hours, got {sleep}").into());
            }
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            applied(repo.apply(Command::AppendLog(DailyLog::new(date, stress, sleep))))?;
            println!(
                "logged {date}: stress {stress}, sleep {sleep}h (streak {})",
                repo.state().gamification.streak
            );
        }
        LogAction::List { last, json } => {
            let logs = &repo.state().logs;
            let start = last.map_or(0, |n| logs.len().saturating_sub(n));
            let shown = &logs[start..];

            if json {
                println!("{}", serde_json::to_string_pretty(shown)?);
            } else if shown.is_empty() {
                println!("no entries");
            } else {
                for log in shown {
                    println!("{}  stress {:>4}  sleep {:>4}h", log.date, log.stress, log.sleep);
                }
            }
        }
    }
    Ok(())
}
