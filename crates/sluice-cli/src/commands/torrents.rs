use anyhow::anyhow;
use serde_json::{Map, Value, json};
use sluice_options::{MultiOptionsManager, OptionStore, OptionValue};

use crate::cli::{OutputFormat, TorrentOptionsArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{TorrentOptionsReport, render_torrent_options};

const GET_STATUS: &str = "web.get_torrent_status";
const SET_OPTIONS: &str = "core.set_torrent_options";

/// Reported by the daemon under a different name than the option it sets.
const AUTO_MANAGED_STATUS_KEY: &str = "is_auto_managed";
const AUTO_MANAGED: &str = "auto_managed";

/// Shown but never sent back.
const READ_ONLY: [&str; 1] = ["private"];

/// Defaults the options form starts from before a torrent's status arrives.
pub(crate) fn torrent_option_defaults() -> Vec<(&'static str, OptionValue)> {
    vec![
        ("max_download_speed", OptionValue::Number(-1.0)),
        ("max_upload_speed", OptionValue::Number(-1.0)),
        ("max_connections", OptionValue::Number(-1.0)),
        ("max_upload_slots", OptionValue::Number(-1.0)),
        (AUTO_MANAGED, OptionValue::Bool(false)),
        ("stop_at_ratio", OptionValue::Bool(false)),
        ("stop_ratio", OptionValue::Number(2.0)),
        ("remove_at_ratio", OptionValue::Bool(false)),
        ("move_completed", OptionValue::Bool(false)),
        ("move_completed_path", OptionValue::from("")),
        ("private", OptionValue::Bool(false)),
        ("prioritize_first_last", OptionValue::Bool(false)),
        ("super_seeding", OptionValue::Bool(false)),
    ]
}

/// Status keys requested for every torrent, in option order.
pub(crate) fn status_keys() -> Vec<&'static str> {
    torrent_option_defaults()
        .into_iter()
        .map(|(option, _)| {
            if option == AUTO_MANAGED {
                AUTO_MANAGED_STATUS_KEY
            } else {
                option
            }
        })
        .collect()
}

fn option_name(status_key: &str) -> &str {
    if status_key == AUTO_MANAGED_STATUS_KEY {
        AUTO_MANAGED
    } else {
        status_key
    }
}

pub(crate) async fn handle_torrent_options(
    ctx: &AppContext,
    args: TorrentOptionsArgs,
    format: OutputFormat,
) -> CliResult<()> {
    if let Some(assignment) = args
        .set
        .iter()
        .find(|assignment| READ_ONLY.contains(&assignment.key.as_str()))
    {
        return Err(CliError::validation(format!(
            "option '{}' is read-only",
            assignment.key
        )));
    }

    let get_status = ctx.client.method(GET_STATUS)?;
    let set_options = if args.set.is_empty() {
        None
    } else {
        Some(ctx.client.method(SET_OPTIONS)?)
    };

    let mut manager: MultiOptionsManager = MultiOptionsManager::with_options(torrent_option_defaults());
    let mut reports = Vec::with_capacity(args.ids.len());

    for id in args.ids {
        manager.change_id(Some(id.clone()), true);

        let status = match get_status.invoke(vec![json!(id), json!(status_keys())]).await? {
            Value::Object(status) if !status.is_empty() => status,
            Value::Object(_) => {
                return Err(CliError::validation(format!("unknown torrent '{id}'")));
            }
            other => {
                return Err(CliError::failure(anyhow!(
                    "{GET_STATUS} returned {other} instead of an object"
                )));
            }
        };
        let reported: Vec<(String, OptionValue)> = status
            .iter()
            .filter_map(|(key, value)| {
                let option = option_name(key);
                if !manager.is_registered(option) {
                    return None;
                }
                OptionValue::from_json(value).map(|value| (option.to_string(), value))
            })
            .collect();
        manager.set_defaults(reported)?;

        let mut changed = Vec::new();
        if let Some(set_options) = &set_options {
            manager.update_many(
                args.set
                    .iter()
                    .map(|assignment| (assignment.key.clone(), assignment.value.clone())),
            )?;
            let dirty = manager.get_dirty();
            if !dirty.is_empty() {
                let payload: Map<String, Value> = dirty
                    .iter()
                    .map(|(option, value)| (option.clone(), value.to_json()))
                    .collect();
                set_options
                    .invoke(vec![json!([id]), Value::Object(payload)])
                    .await?;
                manager.commit();
                tracing::info!(torrent = %id, options = ?dirty.keys().collect::<Vec<_>>(), "torrent options saved");
                changed = dirty.into_keys().collect();
            }
        }

        reports.push(TorrentOptionsReport {
            options: manager.get_all(),
            id,
            changed,
        });
    }

    render_torrent_options(&reports, format)
}
