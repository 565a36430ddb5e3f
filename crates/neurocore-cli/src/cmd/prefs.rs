use crate::output::print_json;
use clap::Subcommand;
use neurocore_core::prefs::{JsonFileStore, KeyValueStore};
use serde_json::{json, Value};
use std::path::Path;

#[derive(Subcommand)]
pub enum PrefsSubcommand {
    /// Print a stored value (exit 1 when unset)
    Get { key: String },

    /// Store a value. Valid JSON is stored as-is, anything else as a string.
    Set { key: String, value: String },

    /// Remove a key
    Delete { key: String },

    /// Print whether a key is set
    Has { key: String },
}

pub fn run(root: &Path, subcmd: PrefsSubcommand, json: bool) -> anyhow::Result<()> {
    let store = JsonFileStore::open(root);
    match subcmd {
        PrefsSubcommand::Get { key } => {
            let Some(value) = store.get(&key)? else {
                anyhow::bail!("preference '{key}' is not set");
            };
            if json {
                print_json(&json!({ "key": key, "value": value }))?;
            } else {
                match value {
                    Value::String(s) => println!("{s}"),
                    other => println!("{other}"),
                }
            }
        }
        PrefsSubcommand::Set { key, value } => {
            let parsed = parse_value(&value);
            store.set(&key, parsed.clone())?;
            if json {
                print_json(&json!({ "key": key, "value": parsed }))?;
            } else {
                println!("Set {key}");
            }
        }
        PrefsSubcommand::Delete { key } => {
            let deleted = store.delete(&key)?;
            if json {
                print_json(&json!({ "key": key, "deleted": deleted }))?;
            } else if deleted {
                println!("Deleted {key}");
            } else {
                println!("{key} was not set");
            }
        }
        PrefsSubcommand::Has { key } => {
            let has = store.has(&key)?;
            if json {
                print_json(&json!({ "key": key, "has": has }))?;
            } else {
                println!("{has}");
            }
        }
    }
    Ok(())
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_parse_as_json_when_possible() {
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value("{\"a\":1}"), json!({"a": 1}));
        assert_eq!(parse_value("neon"), json!("neon"));
    }
}
