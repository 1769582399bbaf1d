use crate::services::cli_runner::run_cmdline_to_json;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::thread;

pub fn get_by_path<'a>(v: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    let mut cur = v;
    for seg in path.split('.') {
        cur = cur.get(seg)?;
    }
    Some(cur)
}

/// Extract the variable-name list out of the collaborator envelope.
/// Accepts `{"keys": [...]}` or the wrapped `{"data": {"keys": [...]}}`;
/// anything else is a malformed body.
pub(crate) fn parse_env_keys_from_json(v: &JsonValue) -> Option<Vec<String>> {
    let arr = get_by_path(v, "keys")
        .or_else(|| get_by_path(v, "data.keys"))
        .and_then(|x| x.as_array())?;
    Some(
        arr.iter()
            .filter_map(|k| k.as_str().map(|s| s.to_string()))
            .collect(),
    )
}

/// Fetch the known variable names on a worker thread. Every failure mode
/// (spawn, exit status, parse, envelope shape) is reported uniformly as a
/// fetch failure; the generation ties the answer back to its cache ticket.
pub fn spawn_fetch_env_keys(cmdline: String, generation: u64, tx: Sender<crate::ui::LoadMsg>) {
    thread::spawn(move || {
        let outcome = run_cmdline_to_json(&cmdline)
            .map_err(|e| format!("{e}"))
            .and_then(|v| {
                parse_env_keys_from_json(&v)
                    .ok_or_else(|| "malformed env-keys envelope".to_string())
            })
            .map(crate::ui::LoadOutcome::Keys);
        let _ = tx.send(crate::ui::LoadMsg {
            kind: crate::ui::LoadKind::EnvKeys { generation },
            outcome,
        });
    });
}

/// Write the serialized fragment on a worker thread.
pub fn spawn_save_entry(path: PathBuf, text: String, tx: Sender<crate::ui::LoadMsg>) {
    thread::spawn(move || {
        let outcome = fs::write(&path, &text)
            .map(|_| crate::ui::LoadOutcome::Saved(path.display().to_string()))
            .map_err(|e| format!("writing {path:?}: {e}"));
        let _ = tx.send(crate::ui::LoadMsg {
            kind: crate::ui::LoadKind::SaveEntry,
            outcome,
        });
    });
}

#[cfg(test)]
mod loader_tests;
