use clap::Args;
use studyflow_core::WeeklyOverview;

use super::open_repository;

#[derive(Args)]
pub struct StatsArgs {
    /// Number of recent journal entries to average (defaults to the
    /// safe-mode window)
    #[arg(long)]
    window: Option<usize>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: StatsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (repo, config) = open_repository()?;
    let window = args.window.unwrap_or(config.safe_mode.window_days);
    let overview = WeeklyOverview::from_state(repo.state(), window);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&overview)?);
        return Ok(());
    }

    println!("Slots:        {}", overview.total_slots);
    println!("Weekly load:  {}", overview.weekly_load);
    println!("Rest ratio:   {:.0}%", overview.rest_ratio * 100.0);
    for (slot_type, count) in &overview.by_type {
        println!("  {slot_type:<10} {count}");
    }
    if overview.recent.count == 0 {
        println!("Recent:       no entries yet");
    } else {
        println!(
            "Recent ({}):   stress {:.1}/10, sleep {:.1}h",
            overview.recent.count, overview.recent.avg_stress, overview.recent.avg_sleep
        );
    }
    println!("Streak:       {} day(s)", overview.streak);
    Ok(())
}
