use clap::Subcommand;
use serde_json::Value;

use super::{applied, open_repository};

#[derive(Subcommand)]
pub enum StateAction {
    /// Print the whole state document
    Show,
    /// Print the value at a dotted path (e.g. "settings.sound")
    Get {
        /// Dotted path
        path: String,
    },
    /// Set the value at a dotted path
    Set {
        /// Dotted path
        path: String,
        /// JSON value; anything that is not valid JSON is stored as a string
        value: String,
    },
    /// Shallow-merge a JSON object into the top level of the document
    Merge {
        /// JSON object, e.g. '{"templates": {}}'
        fields: String,
    },
    /// List backups of unreadable state
    Backups,
}

pub fn run(action: StateAction) -> Result<(), Box<dyn std::error::Error>> {
    let (mut repo, _) = open_repository()?;

    match action {
        StateAction::Show => {
            let doc = repo.get("").unwrap_or(Value::Null);
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        StateAction::Get { path } => match repo.get(&path) {
            Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            None => return Err(format!("no value at '{path}'").into()),
        },
        StateAction::Set { path, value } => {
            let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            applied(repo.set(&path, value))?;
            println!("ok");
        }
        StateAction::Merge { fields } => {
            let Value::Object(partial) = serde_json::from_str::<Value>(&fields)? else {
                return Err("merge expects a JSON object".into());
            };
            applied(repo.update(partial))?;
            println!("ok");
        }
        StateAction::Backups => {
            let backups = repo.backups()?;
            if backups.is_empty() {
                println!("no backups");
            }
            for key in backups {
                println!("{key}");
            }
        }
    }
    Ok(())
}
