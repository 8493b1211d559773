use chrono::{Local, Timelike};
use clap::Args;
use studyflow_core::{is_quiet_at, is_quiet_hour};

use super::open_repository;

#[derive(Args)]
pub struct QuietHoursArgs {
    /// Hour to check (0-23), defaults to the current local hour
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..24))]
    hour: Option<u32>,
}

pub fn run(args: QuietHoursArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (repo, config) = open_repository()?;
    let window = &config.quiet_hours;
    let settings = &repo.state().settings;
    let (hour, quiet) = match args.hour {
        Some(hour) => (hour, is_quiet_hour(settings, window, hour)),
        None => {
            let now = Local::now();
            (now.hour(), is_quiet_at(settings, window, &now))
        }
    };

    let state = if quiet {
        "quiet"
    } else {
        "active"
    };
    let enabled = if settings.quiet_hours {
        ""
    } else {
        " (quiet hours disabled)"
    };
    println!(
        "{hour:02}:00 is {state}; window {:02}:00-{:02}:00{enabled}",
        window.start, window.end
    );
    Ok(())
}
