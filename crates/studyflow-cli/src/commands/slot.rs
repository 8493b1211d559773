use clap::Subcommand;
use studyflow_core::{Command, Day, SlotKey, SlotType};

use super::{applied, open_repository};

#[derive(Subcommand)]
pub enum SlotAction {
    /// Place a slot, replacing any slot already there
    Add {
        /// Day of the week (Mon..Sun)
        day: Day,
        /// Hour of the day
        hour: u8,
        /// Slot type (class, revision, rest, sport, social, admin, meal)
        #[arg(value_name = "TYPE")]
        slot_type: SlotType,
    },
    /// Remove the slot at a day and hour
    Remove {
        day: Day,
        hour: u8,
    },
    /// List all slots, Monday first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: SlotAction) -> Result<(), Box<dyn std::error::Error>> {
    let (mut repo, _) = open_repository()?;

    match action {
        SlotAction::Add {
            day,
            hour,
            slot_type,
        } => {
            let key = SlotKey::new(day, hour);
            applied(repo.apply(Command::PlaceSlot {
                key,
                slot_type: slot_type.clone(),
            }))?;
            println!("{key}: {slot_type}");
        }
        SlotAction::Remove { day, hour } => {
            let key = SlotKey::new(day, hour);
            if repo.state().slot(&key).is_none() {
                return Err(format!("no slot at {key}").into());
            }
            applied(repo.apply(Command::ClearSlot { key }))?;
            println!("removed {key}");
        }
        SlotAction::List { json } => {
            // Keys that do not parse (hand-edited documents) sort last.
            let mut slots: Vec<_> = repo
                .state()
                .timetable
                .iter()
                .map(|(key, slot)| (key.parse::<SlotKey>().ok(), key, slot))
                .collect();
            slots.sort_by(|a, b| {
                (a.0.is_none(), a.0)
                    .cmp(&(b.0.is_none(), b.0))
                    .then_with(|| a.1.cmp(b.1))
            });

            if json {
                let rows: Vec<_> = slots
                    .iter()
                    .map(|(_, key, slot)| serde_json::json!({ "key": key, "type": slot.slot_type }))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if slots.is_empty() {
                println!("timetable is empty");
            } else {
                for (_, key, slot) in slots {
                    println!("{key:<8} {}", slot.slot_type);
                }
            }
        }
    }
    Ok(())
}
