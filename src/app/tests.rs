use super::*;
use crate::model::{FieldSpec, FieldSpecKind, WidgetCatalog, WidgetSchema};
use crate::ui::ToastLevel;
use serde_json::json;

fn state_with_catalog() -> AppState {
    let mut st = AppState::default();
    st.catalog = WidgetCatalog {
        widgets: vec![WidgetSchema {
            type_name: "glances".into(),
            label: "Glances".into(),
            fields: vec![
                FieldSpec {
                    name: "url".into(),
                    required: true,
                    ..Default::default()
                },
                FieldSpec {
                    name: "password".into(),
                    kind: FieldSpecKind::Secret,
                    ..Default::default()
                },
            ],
            ..Default::default()
        }],
    };
    st
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn open_editor_builds_form_and_seeds_matching_entry() {
    let mut st = state_with_catalog();
    st.entry_data = Some(json!({"type": "glances", "url": "http://host:61208"}));
    let effs = update(
        &mut st,
        AppMsg::OpenEditor {
            type_name: "glances".into(),
        },
    );
    assert!(effs.is_empty());
    assert!(matches!(st.view, crate::ui::View::Editor));
    let ed = st.editor.as_ref().unwrap();
    assert_eq!(
        ed.form.fields[0].value,
        crate::widgets::form::FieldValue::Text("http://host:61208".into())
    );
    // The report is derived on mount.
    assert_eq!(ed.form.fragment.get("type"), Some(&json!("glances")));
    assert!(ed.form.errors.is_empty());
}

#[test]
fn open_editor_ignores_entry_of_other_type() {
    let mut st = state_with_catalog();
    st.entry_data = Some(json!({"type": "sonarr", "url": "http://other"}));
    let _ = update(
        &mut st,
        AppMsg::OpenEditor {
            type_name: "glances".into(),
        },
    );
    let ed = st.editor.as_ref().unwrap();
    assert_eq!(
        ed.form.fields[0].value,
        crate::widgets::form::FieldValue::Text(String::new())
    );
}

#[test]
fn open_editor_with_unknown_type_toasts() {
    let mut st = state_with_catalog();
    let effs = update(
        &mut st,
        AppMsg::OpenEditor {
            type_name: "nope".into(),
        },
    );
    assert!(matches!(
        effs.as_slice(),
        [Effect::ShowToast {
            level: ToastLevel::Error,
            ..
        }]
    ));
    assert!(st.editor.is_none());
}

#[test]
fn loaded_env_keys_runs_deferred_existence_check() {
    let mut st = state_with_catalog();
    let generation = st.env_keys.force_reload();
    st.pending_ref_check = Some(("password".into(), "HOMEPAGE_VAR_MISSING".into()));
    let effs = update(
        &mut st,
        AppMsg::LoadedEnvKeys {
            generation,
            outcome: Ok(names(&["HOMEPAGE_VAR_GLANCES"])),
        },
    );
    match effs.as_slice() {
        [Effect::ShowToast { text, level, .. }] => {
            assert!(text.contains("HOMEPAGE_VAR_MISSING"));
            assert!(matches!(level, ToastLevel::Warn));
        }
        _ => panic!("expected exactly one warning toast"),
    }
    assert!(st.pending_ref_check.is_none());
}

#[test]
fn loaded_env_keys_known_reference_stays_silent() {
    let mut st = state_with_catalog();
    let generation = st.env_keys.force_reload();
    st.pending_ref_check = Some(("password".into(), "HOMEPAGE_VAR_GLANCES".into()));
    let effs = update(
        &mut st,
        AppMsg::LoadedEnvKeys {
            generation,
            outcome: Ok(names(&["HOMEPAGE_VAR_GLANCES"])),
        },
    );
    assert!(effs.is_empty());
}

#[test]
fn stale_env_keys_result_is_dropped() {
    let mut st = state_with_catalog();
    let first = st.env_keys.ensure_loaded().unwrap();
    let forced = st.env_keys.force_reload();
    let effs = update(
        &mut st,
        AppMsg::LoadedEnvKeys {
            generation: first,
            outcome: Ok(names(&["HOMEPAGE_VAR_STALE"])),
        },
    );
    assert!(effs.is_empty());
    assert!(st.env_keys.keys().is_empty());
    let _ = update(
        &mut st,
        AppMsg::LoadedEnvKeys {
            generation: forced,
            outcome: Ok(names(&["HOMEPAGE_VAR_FRESH"])),
        },
    );
    assert!(st.env_keys.contains("HOMEPAGE_VAR_FRESH"));
}

#[test]
fn failed_fetch_warns_and_clears_pending_check() {
    let mut st = state_with_catalog();
    let generation = st.env_keys.force_reload();
    st.pending_ref_check = Some(("password".into(), "HOMEPAGE_VAR_X".into()));
    let effs = update(
        &mut st,
        AppMsg::LoadedEnvKeys {
            generation,
            outcome: Err("connection refused".into()),
        },
    );
    assert!(matches!(
        effs.as_slice(),
        [Effect::ShowToast {
            level: ToastLevel::Warn,
            ..
        }]
    ));
    assert!(st.pending_ref_check.is_none());
    assert_eq!(
        st.env_keys.state(),
        crate::dash_core::env_cache::FetchState::Failed
    );
}

#[test]
fn loaded_env_keys_pushes_views_into_editor_fields() {
    let mut st = state_with_catalog();
    let _ = update(
        &mut st,
        AppMsg::OpenEditor {
            type_name: "glances".into(),
        },
    );
    let generation = st.env_keys.force_reload();
    let _ = update(
        &mut st,
        AppMsg::LoadedEnvKeys {
            generation,
            outcome: Ok(names(&["HOMEPAGE_VAR_GLANCES"])),
        },
    );
    let ed = st.editor.as_ref().unwrap();
    let FieldKind::EnvRef(env) = &ed.form.fields[1].kind else {
        panic!("expected env field");
    };
    assert_eq!(env.keys.as_slice(), ["HOMEPAGE_VAR_GLANCES".to_string()]);
    assert!(!env.fetch_failed);
}

#[test]
fn env_ref_effects_warns_only_for_unknown_names() {
    let mut st = state_with_catalog();
    let generation = st.env_keys.force_reload();
    st.env_keys
        .resolve(generation, Ok(names(&["HOMEPAGE_VAR_FOO"])));
    let effs = env_ref_effects(&mut st, "password".into(), "HOMEPAGE_VAR_BAR".into());
    assert!(matches!(
        effs.as_slice(),
        [Effect::ShowToast {
            level: ToastLevel::Warn,
            ..
        }]
    ));
    let effs = env_ref_effects(&mut st, "password".into(), "HOMEPAGE_VAR_FOO".into());
    assert!(effs.is_empty());
}

#[test]
fn env_ref_effects_forces_reload_when_never_fetched() {
    let mut st = state_with_catalog();
    let effs = env_ref_effects(&mut st, "password".into(), "HOMEPAGE_VAR_X".into());
    assert!(matches!(effs.as_slice(), [Effect::ReloadEnvKeys]));
    assert_eq!(
        st.pending_ref_check,
        Some(("password".to_string(), "HOMEPAGE_VAR_X".to_string()))
    );
}

#[test]
fn env_ref_effects_rides_an_in_flight_fetch() {
    let mut st = state_with_catalog();
    let _ = st.env_keys.ensure_loaded();
    let effs = env_ref_effects(&mut st, "password".into(), "HOMEPAGE_VAR_X".into());
    assert!(effs.is_empty());
    assert!(st.pending_ref_check.is_some());
}

#[test]
fn env_ref_effects_skips_check_after_failed_fetch() {
    let mut st = state_with_catalog();
    let generation = st.env_keys.force_reload();
    st.env_keys.resolve(generation, Err("down".into()));
    let effs = env_ref_effects(&mut st, "password".into(), "HOMEPAGE_VAR_X".into());
    assert!(effs.is_empty());
    assert!(st.pending_ref_check.is_none());
}

#[test]
fn saved_entry_success_recaptures_initial_and_toasts() {
    let mut st = state_with_catalog();
    let _ = update(
        &mut st,
        AppMsg::OpenEditor {
            type_name: "glances".into(),
        },
    );
    {
        let ed = st.editor.as_mut().unwrap();
        crate::widgets::form::apply_change(
            &mut ed.form,
            crate::widgets::form::ChangeEvent {
                name: "url".into(),
                value: "http://host:61208".into(),
            },
        );
        assert!(ed.form.dirty);
        ed.form.disabled = true;
    }
    let effs = update(
        &mut st,
        AppMsg::SavedEntry {
            outcome: Ok("widget.yaml".into()),
        },
    );
    assert!(matches!(
        effs.as_slice(),
        [Effect::ShowToast {
            level: ToastLevel::Success,
            ..
        }]
    ));
    let ed = st.editor.as_ref().unwrap();
    assert!(!ed.form.dirty);
    assert!(!ed.form.disabled);
}

#[test]
fn saved_entry_failure_surfaces_message() {
    let mut st = state_with_catalog();
    let _ = update(
        &mut st,
        AppMsg::OpenEditor {
            type_name: "glances".into(),
        },
    );
    let effs = update(
        &mut st,
        AppMsg::SavedEntry {
            outcome: Err("disk full".into()),
        },
    );
    assert!(matches!(
        effs.as_slice(),
        [Effect::ShowToast {
            level: ToastLevel::Error,
            ..
        }]
    ));
    let ed = st.editor.as_ref().unwrap();
    assert_eq!(ed.form.message.as_deref(), Some("disk full"));
}
