use crate::dash_core::env_cache::FetchState;
use crate::ui::AppState;
use crate::widgets::form::{self, FieldKind};
use crate::widgets::form_widget::FormWidget;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::Arc;

#[cfg(test)]
mod tests;

pub enum AppMsg {
    OpenEditor {
        type_name: String,
    },
    LoadedEnvKeys {
        generation: u64,
        outcome: Result<Vec<String>, String>,
    },
    SavedEntry {
        outcome: Result<String, String>,
    },
}

pub enum Effect {
    // Fetch the variable names unless loaded or already in flight.
    EnsureEnvKeys,
    // Fetch unconditionally; supersedes any in-flight answer.
    ReloadEnvKeys,
    // A committed value references `name`; verify it exists.
    CheckEnvRef {
        field: String,
        name: String,
    },
    SaveEntry {
        fragment: JsonMap<String, JsonValue>,
    },
    CloseEditor,
    ShowToast {
        text: String,
        level: crate::ui::ToastLevel,
        seconds: u64,
    },
}

pub fn update(state: &mut AppState, msg: AppMsg) -> Vec<Effect> {
    use AppMsg::*;
    let mut effects: Vec<Effect> = Vec::new();
    match msg {
        OpenEditor { type_name } => {
            let Some(schema) = state
                .catalog
                .widgets
                .iter()
                .find(|w| w.type_name == type_name)
                .cloned()
            else {
                effects.push(Effect::ShowToast {
                    text: format!("Unknown widget type: {type_name}"),
                    level: crate::ui::ToastLevel::Error,
                    seconds: 3,
                });
                return effects;
            };
            // Seed from the existing entry only when its discriminator
            // matches the opened schema.
            let initial = state.entry_data.as_ref().and_then(|v| v.as_object()).filter(
                |m| {
                    m.get("type").and_then(|t| t.as_str()) == Some(type_name.as_str())
                },
            );
            let form = form::form_from_schema(&schema, initial);
            state.editor = Some(FormWidget::new(form));
            state.view = crate::ui::View::Editor;
            state.editor_focus = crate::ui::EditorPane::Form;
            state.preview_scroll = 0;
            sync_env_views(state);
            state.dbg(format!("open editor for '{type_name}'"));
        }
        LoadedEnvKeys {
            generation,
            outcome,
        } => {
            state.status_text = None;
            let failure = outcome.as_ref().err().cloned();
            if !state.env_keys.resolve(generation, outcome) {
                state.dbg(format!("env keys: dropped stale result gen={generation}"));
                return effects;
            }
            match failure {
                Some(e) => {
                    state.pending_ref_check = None;
                    state.dbg(format!("env keys fetch failed: {e}"));
                    effects.push(Effect::ShowToast {
                        text: "Could not load variable names".into(),
                        level: crate::ui::ToastLevel::Warn,
                        seconds: 4,
                    });
                }
                None => {
                    state.dbg(format!(
                        "env keys loaded: {} names",
                        state.env_keys.keys().len()
                    ));
                    sync_env_views(state);
                    // A commit asked for a check while the set was unloaded.
                    if let Some((field, name)) = state.pending_ref_check.take() {
                        if !state.env_keys.keys().is_empty() && !state.env_keys.contains(&name) {
                            state.dbg(format!("unknown reference in {field}: {name}"));
                            effects.push(unknown_reference_toast(&name));
                        }
                    }
                }
            }
        }
        SavedEntry { outcome } => {
            state.submitting = false;
            state.status_text = None;
            if let Some(ed) = &mut state.editor {
                ed.form.disabled = false;
            }
            match outcome {
                Ok(path) => {
                    if let Some(ed) = &mut state.editor {
                        form::capture_initial(&mut ed.form);
                        ed.form.message = None;
                    }
                    effects.push(Effect::ShowToast {
                        text: format!("Saved to {path}"),
                        level: crate::ui::ToastLevel::Success,
                        seconds: 3,
                    });
                }
                Err(e) => {
                    state.dbg(format!("save failed: {e}"));
                    if let Some(ed) = &mut state.editor {
                        ed.form.message = Some(e);
                    }
                    effects.push(Effect::ShowToast {
                        text: "Save failed".into(),
                        level: crate::ui::ToastLevel::Error,
                        seconds: 3,
                    });
                }
            }
        }
    }
    effects
}

fn unknown_reference_toast(name: &str) -> Effect {
    Effect::ShowToast {
        text: format!("{name} is not a known variable"),
        level: crate::ui::ToastLevel::Warn,
        seconds: 4,
    }
}

/// Decide what a committed reference needs, given the cache state. A loaded
/// non-empty set that lacks the name warns immediately; an unloaded set
/// forces a reload and defers the check; a failed fetch suppresses it (the
/// failure was already surfaced). The warning never blocks saving.
pub fn env_ref_effects(state: &mut AppState, field: String, name: String) -> Vec<Effect> {
    match state.env_keys.state() {
        FetchState::Loaded => {
            if !state.env_keys.keys().is_empty() && !state.env_keys.contains(&name) {
                state.dbg(format!("unknown reference in {field}: {name}"));
                vec![unknown_reference_toast(&name)]
            } else {
                Vec::new()
            }
        }
        FetchState::Failed => Vec::new(),
        FetchState::NotStarted => {
            state.pending_ref_check = Some((field, name));
            vec![Effect::ReloadEnvKeys]
        }
        FetchState::InFlight => {
            // Single flight: ride the fetch that is already on its way.
            state.pending_ref_check = Some((field, name));
            Vec::new()
        }
    }
}

/// Hand the cache's current view to every reference-aware field.
pub(crate) fn sync_env_views(state: &mut AppState) {
    let view = state.env_keys.view();
    let failed = state.env_keys.state() == FetchState::Failed;
    if let Some(ed) = &mut state.editor {
        for fld in &mut ed.form.fields {
            if let FieldKind::EnvRef(env) = &mut fld.kind {
                env.keys = Arc::clone(&view);
                env.fetch_failed = failed;
            }
        }
    }
}
