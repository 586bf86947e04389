use std::collections::BTreeMap;

use anyhow::anyhow;
use serde_json::{Map, Value};
use sluice_options::{OptionStore, OptionValue, OptionsManager};

use crate::cli::{OutputFormat, PrefsGetArgs, PrefsSetArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{render_changes, render_settings};

const GET_CONFIG: &str = "core.get_config";
const SET_CONFIG: &str = "core.set_config";

async fn fetch_config(ctx: &AppContext) -> CliResult<Map<String, Value>> {
    match ctx.client.method(GET_CONFIG)?.invoke(Vec::new()).await? {
        Value::Object(config) => Ok(config),
        other => Err(CliError::failure(anyhow!(
            "{GET_CONFIG} returned {} instead of an object",
            json_kind(&other)
        ))),
    }
}

/// Preferences as an options manager. Scalar settings become options; lists
/// and nested objects cannot be edited here and are left out.
fn preferences_manager(config: &Map<String, Value>) -> OptionsManager {
    let mut manager = OptionsManager::new();
    manager.set_many(config.iter().filter_map(|(key, value)| {
        OptionValue::from_json(value).map(|value| (key.clone(), value))
    }));
    manager
}

pub(crate) async fn handle_prefs_get(ctx: &AppContext, args: PrefsGetArgs, format: OutputFormat) -> CliResult<()> {
    let config = fetch_config(ctx).await?;
    let selected: BTreeMap<String, Value> = if args.keys.is_empty() {
        config.into_iter().collect()
    } else {
        let mut selected = BTreeMap::new();
        for key in args.keys {
            let value = config
                .get(&key)
                .cloned()
                .ok_or_else(|| CliError::validation(format!("unknown preference '{key}'")))?;
            selected.insert(key, value);
        }
        selected
    };
    render_settings(&selected, format)
}

pub(crate) async fn handle_prefs_set(ctx: &AppContext, args: PrefsSetArgs, format: OutputFormat) -> CliResult<()> {
    let config = fetch_config(ctx).await?;
    let mut manager = preferences_manager(&config);
    if let Some(assignment) = args
        .assignments
        .iter()
        .find(|assignment| config.contains_key(&assignment.key) && !manager.is_registered(&assignment.key))
    {
        return Err(CliError::validation(format!(
            "preference '{}' is not a scalar and cannot be set from the command line",
            assignment.key
        )));
    }

    manager.update_many(
        args.assignments
            .into_iter()
            .map(|assignment| (assignment.key, assignment.value)),
    )?;

    let dirty = manager.get_dirty();
    if !dirty.is_empty() {
        let payload: Map<String, Value> = dirty
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect();
        ctx.client
            .method(SET_CONFIG)?
            .invoke(vec![Value::Object(payload)])
            .await?;
        manager.commit();
        tracing::info!(keys = ?dirty.keys().collect::<Vec<_>>(), "preferences saved");
    }
    render_changes(&dirty, format)
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
