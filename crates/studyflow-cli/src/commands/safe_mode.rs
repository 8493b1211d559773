use clap::Subcommand;
use studyflow_core::{Command, SafeModeEvaluator};

use super::{applied, open_repository};

#[derive(Subcommand)]
pub enum SafeModeAction {
    /// Evaluate the current week and store the result
    Check {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Acknowledge the current alert
    Dismiss,
}

pub fn run(action: SafeModeAction) -> Result<(), Box<dyn std::error::Error>> {
    let (mut repo, config) = open_repository()?;

    match action {
        SafeModeAction::Check { json } => {
            let evaluator = SafeModeEvaluator::from_config(&config.safe_mode);
            let evaluation = evaluator.evaluate_state(repo.state(), config.safe_mode.window_days);
            applied(repo.apply(evaluation.to_command()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&evaluation)?);
                return Ok(());
            }
            match evaluation.tier {
                Some(tier) => {
                    println!("Safe mode: {tier} (score {:.0})", evaluation.score);
                    for reason in &evaluation.reasons {
                        println!("  - {reason}");
                    }
                    if let Some(at) = repo.state().safe_mode.dismissed_at {
                        println!("Last dismissed: {}", at.format("%Y-%m-%d %H:%M"));
                    }
                }
                None => println!("Safe mode: off (score {:.0})", evaluation.score),
            }
        }
        SafeModeAction::Dismiss => {
            applied(repo.apply(Command::DismissSafeMode))?;
            println!("dismissed");
        }
    }
    Ok(())
}
