use crate::dash_core::refsyntax;
use crate::model::{FieldRule, FieldSpecKind, WidgetSchema};
use crate::widgets::chrome::panel_block;
use ratatui::prelude::*;
use ratatui::widgets::*;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
}

/// Per-instance state of a reference-aware input. The suggestion list is
/// advisory only: any free text is a legal value. `requested` caps the
/// suggestion fetch at one per instance lifetime, independent of the
/// cache-level de-duplication.
#[derive(Clone, Debug, Default)]
pub struct EnvRefState {
    pub secret: bool,
    // Render-only toggle; never affects the emitted value.
    pub reveal: bool,
    pub open: bool,
    pub cursor: usize,
    pub offset: usize,
    pub requested: bool,
    // Read-only view of the cache's key set.
    pub keys: Arc<Vec<String>>,
    pub fetch_failed: bool,
}

#[derive(Clone, Debug)]
pub enum FieldKind {
    Text,
    EnvRef(EnvRefState),
    Number {
        is_integer: bool,
        minimum: Option<f64>,
        maximum: Option<f64>,
    },
    Checkbox {
        default_on: bool,
    },
    Select {
        options: Vec<String>,
        default: usize,
        cursor: usize,
        selected: usize,
        offset: usize,
    },
}

pub const OPTIONS_VISIBLE: usize = 8;
pub const SUGGESTIONS_VISIBLE: usize = 8;

#[derive(Clone, Debug)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub required: bool,
    pub kind: FieldKind,
    pub value: FieldValue,
    pub error: Option<String>,
    pub placeholder: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct FormState {
    pub title: String,
    // Discriminator emitted as the fragment's `type` key.
    pub type_name: String,
    pub fields: Vec<FormField>,
    pub rules: Vec<FieldRule>,
    pub selected: usize,
    pub editing: bool,
    pub message: Option<String>,
    pub disabled: bool,
    pub dirty: bool,
    pub initial: Vec<FieldInitial>,
    pub confirm: Option<ConfirmAction>,
    // The report pair, recomputed wholesale on every change: `errors` is
    // empty exactly when `fragment` is a valid configuration.
    pub fragment: JsonMap<String, JsonValue>,
    pub errors: BTreeMap<String, String>,
}

#[derive(Clone, Debug)]
pub struct FieldInitial {
    pub name: String,
    pub value: FieldValue,
    pub select_value: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmAction {
    Reset,
    Cancel,
}

/// What an input hands to its owning field group. `name` echoes the field
/// name the input was constructed with; owners treat it as opaque.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeEvent {
    pub name: String,
    pub value: String,
}

fn seed_text(initial: Option<&JsonMap<String, JsonValue>>, name: &str, fallback: &str) -> String {
    match initial.and_then(|m| m.get(name)) {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Number(n)) => n.to_string(),
        Some(JsonValue::Bool(b)) => b.to_string(),
        _ => fallback.to_string(),
    }
}

/// Build the runtime fields for one widget schema, seeding recognized keys
/// from an existing fragment. Keys the schema does not declare are ignored.
pub fn fields_from_schema(
    schema: &WidgetSchema,
    initial: Option<&JsonMap<String, JsonValue>>,
) -> Vec<FormField> {
    let mut fields: Vec<FormField> = Vec::new();
    for spec in &schema.fields {
        let label = spec.label.clone().unwrap_or_else(|| spec.name.clone());
        let default_text = spec.default.clone().unwrap_or_default();
        let (kind, value) = match spec.kind {
            FieldSpecKind::Text if !spec.env => (
                FieldKind::Text,
                FieldValue::Text(seed_text(initial, &spec.name, &default_text)),
            ),
            FieldSpecKind::Text => (
                FieldKind::EnvRef(EnvRefState::default()),
                FieldValue::Text(seed_text(initial, &spec.name, &default_text)),
            ),
            FieldSpecKind::Secret => (
                FieldKind::EnvRef(EnvRefState {
                    secret: true,
                    ..Default::default()
                }),
                FieldValue::Text(seed_text(initial, &spec.name, &default_text)),
            ),
            FieldSpecKind::Integer | FieldSpecKind::Number => (
                FieldKind::Number {
                    is_integer: spec.kind == FieldSpecKind::Integer,
                    minimum: spec.minimum,
                    maximum: spec.maximum,
                },
                FieldValue::Text(seed_text(initial, &spec.name, &default_text)),
            ),
            FieldSpecKind::Bool => {
                let default_on = spec.default.as_deref() == Some("true");
                let on = match initial.and_then(|m| m.get(&spec.name)) {
                    Some(JsonValue::Bool(b)) => *b,
                    Some(JsonValue::String(s)) => s == "true",
                    _ => default_on,
                };
                (FieldKind::Checkbox { default_on }, FieldValue::Bool(on))
            }
            FieldSpecKind::Select => {
                let default = spec
                    .default
                    .as_ref()
                    .and_then(|d| spec.options.iter().position(|o| o == d))
                    .unwrap_or(0);
                let selected = match initial.and_then(|m| m.get(&spec.name)) {
                    Some(JsonValue::String(s)) => {
                        spec.options.iter().position(|o| o == s).unwrap_or(default)
                    }
                    _ => default,
                };
                (
                    FieldKind::Select {
                        options: spec.options.clone(),
                        default,
                        cursor: selected,
                        selected,
                        offset: 0,
                    },
                    FieldValue::Text(String::new()),
                )
            }
        };
        fields.push(FormField {
            name: spec.name.clone(),
            label,
            required: spec.required,
            kind,
            value,
            error: None,
            placeholder: spec.placeholder.clone(),
        });
    }
    fields
}

/// Build a form for a schema, optionally seeded from an existing fragment.
/// The report pair is derived immediately so the owner sees a consistent
/// snapshot from the first render on.
pub fn form_from_schema(
    schema: &WidgetSchema,
    initial: Option<&JsonMap<String, JsonValue>>,
) -> FormState {
    let mut form = FormState {
        title: schema.label.clone(),
        type_name: schema.type_name.clone(),
        fields: fields_from_schema(schema, initial),
        rules: schema.rules.clone(),
        ..Default::default()
    };
    capture_initial(&mut form);
    recompute_report(&mut form);
    form
}

pub fn capture_initial(form: &mut FormState) {
    let mut init: Vec<FieldInitial> = Vec::new();
    for f in &form.fields {
        let mut fi = FieldInitial {
            name: f.name.clone(),
            value: f.value.clone(),
            select_value: None,
        };
        if let FieldKind::Select {
            options, selected, ..
        } = &f.kind
        {
            fi.select_value = options.get(*selected).cloned();
        }
        init.push(fi);
    }
    form.initial = init;
    form.dirty = false;
}

pub fn compute_dirty(form: &mut FormState) -> bool {
    let mut any = false;
    for f in &form.fields {
        if let Some(init) = form.initial.iter().find(|i| i.name == f.name) {
            match &f.kind {
                FieldKind::Select {
                    options, selected, ..
                } => {
                    if options.get(*selected).cloned() != init.select_value {
                        any = true;
                        break;
                    }
                }
                _ => {
                    if f.value != init.value {
                        any = true;
                        break;
                    }
                }
            }
        }
    }
    form.dirty = any;
    any
}

pub fn reset_to_initial(form: &mut FormState) {
    for f in &mut form.fields {
        if let Some(init) = form.initial.iter().find(|i| i.name == f.name) {
            match &mut f.kind {
                FieldKind::Select {
                    options,
                    selected,
                    cursor,
                    offset,
                    ..
                } => {
                    if let Some(target) = &init.select_value {
                        if let Some(idx) = options.iter().position(|o| o == target) {
                            *selected = idx;
                        }
                    }
                    *cursor = *selected;
                    *offset = 0;
                }
                FieldKind::EnvRef(env) => {
                    env.open = false;
                    env.cursor = 0;
                    env.offset = 0;
                    f.value = init.value.clone();
                }
                _ => {
                    f.value = init.value.clone();
                }
            }
        }
    }
    form.message = Some("Reset to saved values".into());
    compute_dirty(form);
    recompute_report(form);
}

/// Apply one change event and rederive the report from the new snapshot.
pub fn apply_change(form: &mut FormState, ev: ChangeEvent) {
    if let Some(fld) = form.fields.iter_mut().find(|f| f.name == ev.name) {
        if let FieldValue::Text(s) = &mut fld.value {
            *s = ev.value;
        }
    }
    compute_dirty(form);
    recompute_report(form);
}

fn field_is_set(form: &FormState, name: &str) -> bool {
    form.fields
        .iter()
        .find(|f| f.name == name)
        .map(|f| match &f.value {
            FieldValue::Text(s) => !s.trim().is_empty(),
            FieldValue::Bool(b) => *b,
        })
        .unwrap_or(false)
}

fn parse_number(raw: &str, is_integer: bool) -> Result<(JsonValue, f64), String> {
    if is_integer {
        raw.parse::<i64>()
            .map(|v| (JsonValue::from(v), v as f64))
            .map_err(|_| "Invalid integer".to_string())
    } else {
        let v = raw.parse::<f64>().map_err(|_| "Invalid number".to_string())?;
        let num = serde_json::Number::from_f64(v).ok_or_else(|| "Invalid number".to_string())?;
        Ok((JsonValue::Number(num), v))
    }
}

/// Wholesale sanitize + validate over the current snapshot.
///
/// The fragment carries the `type` discriminator, every required key (even
/// when empty, so the parent can see incompleteness), and optional keys only
/// when non-empty and different from their default. The error map gets one
/// entry per violated required/domain/cross-field constraint; raw text is
/// never rewritten here, only reported.
pub fn recompute_report(form: &mut FormState) {
    let mut fragment = JsonMap::new();
    let mut errors: BTreeMap<String, String> = BTreeMap::new();
    fragment.insert(
        "type".to_string(),
        JsonValue::String(form.type_name.clone()),
    );
    for fld in &form.fields {
        match (&fld.kind, &fld.value) {
            (FieldKind::Text, FieldValue::Text(s)) | (FieldKind::EnvRef(_), FieldValue::Text(s)) => {
                let trimmed = s.trim();
                if fld.required {
                    fragment.insert(fld.name.clone(), JsonValue::String(trimmed.to_string()));
                    if trimmed.is_empty() {
                        errors.insert(fld.name.clone(), "This field is required".into());
                    }
                } else if !trimmed.is_empty() {
                    fragment.insert(fld.name.clone(), JsonValue::String(trimmed.to_string()));
                }
            }
            (
                FieldKind::Number {
                    is_integer,
                    minimum,
                    maximum,
                },
                FieldValue::Text(s),
            ) => {
                let raw = s.trim();
                if raw.is_empty() {
                    if fld.required {
                        fragment.insert(fld.name.clone(), JsonValue::String(String::new()));
                        errors.insert(fld.name.clone(), "This field is required".into());
                    }
                } else {
                    match parse_number(raw, *is_integer) {
                        Ok((num, v)) => {
                            let mut bound_err: Option<String> = None;
                            if let Some(minv) = minimum {
                                if v < *minv {
                                    bound_err = Some(format!("Must be at least {minv}"));
                                }
                            }
                            if bound_err.is_none() {
                                if let Some(maxv) = maximum {
                                    if v > *maxv {
                                        bound_err = Some(format!("Must be at most {maxv}"));
                                    }
                                }
                            }
                            match bound_err {
                                Some(msg) => {
                                    // Raw text stays in local state; the
                                    // fragment only carries it for required
                                    // keys so the parent still sees the slot.
                                    if fld.required {
                                        fragment.insert(
                                            fld.name.clone(),
                                            JsonValue::String(raw.to_string()),
                                        );
                                    }
                                    errors.insert(fld.name.clone(), msg);
                                }
                                None => {
                                    fragment.insert(fld.name.clone(), num);
                                }
                            }
                        }
                        Err(msg) => {
                            if fld.required {
                                fragment
                                    .insert(fld.name.clone(), JsonValue::String(raw.to_string()));
                            }
                            errors.insert(fld.name.clone(), msg);
                        }
                    }
                }
            }
            (FieldKind::Checkbox { default_on }, FieldValue::Bool(b)) => {
                if b != default_on {
                    fragment.insert(fld.name.clone(), JsonValue::Bool(*b));
                }
            }
            (
                FieldKind::Select {
                    options,
                    default,
                    selected,
                    ..
                },
                _,
            ) => {
                if options.is_empty() {
                    if fld.required {
                        errors.insert(fld.name.clone(), "No options available".into());
                    }
                } else if selected != default {
                    if let Some(opt) = options.get(*selected) {
                        fragment.insert(fld.name.clone(), JsonValue::String(opt.clone()));
                    }
                }
            }
            _ => {}
        }
    }
    for rule in &form.rules {
        if let Some(names) = &rule.any_of {
            if !names.iter().any(|n| field_is_set(form, n)) {
                if let Some(first) = names.first() {
                    errors
                        .entry(first.clone())
                        .or_insert_with(|| format!("Set at least one of: {}", names.join(", ")));
                }
            }
        }
        if let (Some(src), Some(dst)) = (&rule.if_set, &rule.then_required) {
            if field_is_set(form, src) && !field_is_set(form, dst) {
                errors
                    .entry(dst.clone())
                    .or_insert_with(|| format!("Required when {src} is set"));
            }
        }
    }
    for fld in &mut form.fields {
        fld.error = errors.get(&fld.name).cloned();
    }
    form.fragment = fragment;
    form.errors = errors;
}

/// Commit a reference-aware field: close the suggestion list, repair the
/// wrapping, propagate the change, and return `(field, NAME)` when the
/// committed value is a reference the caller should verify.
pub fn commit_env_ref(form: &mut FormState, idx: usize) -> Option<(String, String)> {
    let (name, rewritten) = {
        let fld = form.fields.get_mut(idx)?;
        let FieldKind::EnvRef(env) = &mut fld.kind else {
            return None;
        };
        env.open = false;
        env.cursor = 0;
        env.offset = 0;
        let FieldValue::Text(s) = &fld.value else {
            return None;
        };
        (fld.name.clone(), refsyntax::wrap_on_commit(s))
    };
    apply_change(
        form,
        ChangeEvent {
            name: name.clone(),
            value: rewritten.clone(),
        },
    );
    refsyntax::reference_name(&rewritten).map(|r| (name, r))
}

/// Filter the key view against the current text. An empty query or an
/// already-wrapped reference shows everything.
pub fn filter_suggestions<'a>(keys: &'a [String], query: &str) -> Vec<&'a str> {
    let bare = query
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .trim();
    if bare.is_empty() {
        return keys.iter().map(|k| k.as_str()).collect();
    }
    let needle = bare.to_ascii_lowercase();
    keys.iter()
        .filter(|k| k.to_ascii_lowercase().contains(&needle))
        .map(|k| k.as_str())
        .collect()
}

pub fn draw_form(
    f: &mut Frame,
    area: Rect,
    form: &mut FormState,
    highlight: bool,
    cursor_on: bool,
) {
    let mut lines: Vec<Line> = Vec::new();
    for (i, fld) in form.fields.iter().enumerate() {
        let sel = if i == form.selected { '›' } else { ' ' };
        let req = if fld.required { " *" } else { "" };
        let value_style = if i == form.selected {
            if form.editing {
                crate::theme::text_editing_bold()
            } else {
                crate::theme::text_active_bold()
            }
        } else {
            Style::default()
        };
        match &fld.kind {
            FieldKind::Text | FieldKind::Number { .. } => {
                let mut val = match &fld.value {
                    FieldValue::Text(s) => s.clone(),
                    FieldValue::Bool(b) => b.to_string(),
                };
                if val.is_empty() && !form.editing {
                    if let Some(ph) = &fld.placeholder {
                        lines.push(Line::from(vec![
                            Span::raw(format!("{sel} {}{req}: ", fld.label)),
                            Span::styled(format!("({ph})"), crate::theme::text_muted()),
                        ]));
                        if let Some(err) = &fld.error {
                            lines.push(Line::from(Span::styled(
                                format!("  ! {err}"),
                                crate::theme::text_error(),
                            )));
                        }
                        continue;
                    }
                }
                if form.editing && i == form.selected && cursor_on {
                    val.push('▏');
                }
                lines.push(Line::from(vec![
                    Span::raw(format!("{sel} {}{req}: ", fld.label)),
                    Span::styled(val, value_style),
                ]));
            }
            FieldKind::EnvRef(env) => {
                // Masked unless revealed; the toggle never touches the value.
                let mut shown = String::new();
                if let FieldValue::Text(s) = &fld.value {
                    if env.secret && !env.reveal {
                        shown = "•".repeat(s.chars().count());
                    } else {
                        shown = s.clone();
                    }
                }
                if form.editing && i == form.selected && cursor_on {
                    shown.push('▏');
                }
                let marker = if env.secret { " [secret]" } else { "" };
                lines.push(Line::from(vec![
                    Span::raw(format!("{sel} {}{req}: ", fld.label)),
                    Span::styled(shown, value_style),
                    Span::styled(marker.to_string(), crate::theme::text_muted()),
                ]));
                if form.editing && i == form.selected && env.open {
                    if env.fetch_failed {
                        lines.push(Line::from(Span::styled(
                            "  (suggestions unavailable)",
                            crate::theme::text_muted(),
                        )));
                    } else if env.keys.is_empty() {
                        lines.push(Line::from(Span::styled(
                            "  (loading suggestions...)",
                            crate::theme::text_muted(),
                        )));
                    } else {
                        let query = match &fld.value {
                            FieldValue::Text(s) => s.as_str(),
                            FieldValue::Bool(_) => "",
                        };
                        let matches = filter_suggestions(&env.keys, query);
                        let start = env.offset.min(matches.len());
                        let end = (start + SUGGESTIONS_VISIBLE).min(matches.len());
                        for (ki, key) in matches.iter().enumerate().take(end).skip(start) {
                            let cur = if ki == env.cursor { '›' } else { ' ' };
                            let st = if ki == env.cursor {
                                crate::theme::list_cursor_style()
                            } else {
                                crate::theme::text_muted()
                            };
                            lines.push(Line::from(Span::styled(format!("  {cur} {key}"), st)));
                        }
                        if matches.is_empty() {
                            lines.push(Line::from(Span::styled(
                                "  (no matching names)",
                                crate::theme::text_muted(),
                            )));
                        }
                    }
                }
            }
            FieldKind::Checkbox { .. } => {
                let checked = matches!(fld.value, FieldValue::Bool(true));
                let val = if checked { "[x]" } else { "[ ]" };
                let style = if i == form.selected {
                    Style::default()
                        .fg(crate::theme::ACTIVE)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                lines.push(Line::from(vec![
                    Span::raw(format!("{sel} {}{req}: ", fld.label)),
                    Span::styled(val.to_string(), style),
                ]));
            }
            FieldKind::Select {
                options,
                cursor,
                selected,
                offset,
                ..
            } => {
                let summary = options
                    .get(*selected)
                    .cloned()
                    .unwrap_or_else(|| "(none)".into());
                lines.push(Line::from(vec![
                    Span::raw(format!("{sel} {}{req}: ", fld.label)),
                    Span::styled(summary, value_style),
                ]));
                if form.editing && i == form.selected {
                    let start = (*offset).min(options.len());
                    let end = (start + OPTIONS_VISIBLE).min(options.len());
                    for (oi, opt) in options.iter().enumerate().take(end).skip(start) {
                        let mark = if oi == *selected { "(•)" } else { "( )" };
                        let cur = if oi == *cursor { '›' } else { ' ' };
                        let st = if oi == *cursor {
                            crate::theme::list_cursor_style()
                        } else {
                            crate::theme::text_muted()
                        };
                        lines.push(Line::from(vec![Span::styled(
                            format!("  {cur} {mark} {opt}"),
                            st,
                        )]));
                    }
                }
            }
        }
        if let Some(err) = &fld.error {
            lines.push(Line::from(Span::styled(
                format!("  ! {err}"),
                crate::theme::text_error(),
            )));
        }
    }
    // Buttons: Save | Reset | Cancel
    if !form.fields.is_empty() {
        lines.push(Line::from(""));
    }
    let save_idx = form.fields.len();
    let reset_idx = form.fields.len() + 1;
    let cancel_idx = form.fields.len() + 2;
    let can_save = !form.disabled && form.dirty;
    let can_reset = form.dirty && !form.disabled;
    let mut save_style = if can_save {
        crate::theme::text_active_bold()
    } else {
        crate::theme::text_muted()
    };
    let mut reset_style = if can_reset {
        Style::default().fg(crate::theme::ACTIVE)
    } else {
        crate::theme::text_muted()
    };
    let mut cancel_style = crate::theme::text_muted();
    if form.selected == save_idx {
        save_style = if can_save {
            crate::theme::list_cursor_style()
        } else {
            Style::default().fg(crate::theme::MUTED).bg(Color::Blue)
        };
    }
    if form.selected == reset_idx {
        reset_style = crate::theme::list_cursor_style();
    }
    if form.selected == cancel_idx {
        cancel_style = crate::theme::list_cursor_style();
    }
    lines.push(Line::from(vec![
        Span::styled("  [ Save ]  ".to_string(), save_style),
        Span::styled("Reset  ".to_string(), reset_style),
        Span::styled("Cancel".to_string(), cancel_style),
    ]));
    if let Some(msg) = &form.message {
        lines.push(Line::from(Span::styled(
            msg.clone(),
            crate::theme::text_muted(),
        )));
    }
    let title = if form.editing {
        format!("{} — editing", form.title)
    } else {
        form.title.clone()
    };
    let block = panel_block(&title, highlight);
    let p = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldSpec, WidgetSchema};
    use serde_json::json;

    fn glances_schema() -> WidgetSchema {
        WidgetSchema {
            type_name: "glances".into(),
            label: "Glances".into(),
            fields: vec![
                FieldSpec {
                    name: "url".into(),
                    required: true,
                    env: true,
                    ..Default::default()
                },
                FieldSpec {
                    name: "password".into(),
                    kind: FieldSpecKind::Secret,
                    ..Default::default()
                },
                FieldSpec {
                    name: "metrics".into(),
                    kind: FieldSpecKind::Bool,
                    ..Default::default()
                },
                FieldSpec {
                    name: "refresh".into(),
                    kind: FieldSpecKind::Integer,
                    minimum: Some(0.0),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    fn set_text(form: &mut FormState, name: &str, value: &str) {
        apply_change(
            form,
            ChangeEvent {
                name: name.into(),
                value: value.into(),
            },
        );
    }

    #[test]
    fn schema_fields_map_kinds_and_seed_initial() {
        let initial = json!({
            "url": "http://host:61208",
            "metrics": true,
            "refresh": 5,
            "leftover": "ignored"
        });
        let fields = fields_from_schema(&glances_schema(), initial.as_object());
        assert_eq!(fields.len(), 4);
        assert_eq!(
            fields[0].value,
            FieldValue::Text("http://host:61208".into())
        );
        assert!(matches!(&fields[1].kind, FieldKind::EnvRef(e) if e.secret));
        assert_eq!(fields[2].value, FieldValue::Bool(true));
        assert_eq!(fields[3].value, FieldValue::Text("5".into()));
        // No field was invented for the unrecognized key.
        assert!(!fields.iter().any(|f| f.name == "leftover"));
    }

    #[test]
    fn report_keeps_required_keys_even_when_empty() {
        let mut form = form_from_schema(&glances_schema(), None);
        assert_eq!(form.fragment.get("type"), Some(&json!("glances")));
        assert_eq!(form.fragment.get("url"), Some(&json!("")));
        assert_eq!(
            form.errors.get("url").map(String::as_str),
            Some("This field is required")
        );
        set_text(&mut form, "url", "http://host:61208");
        assert_eq!(form.fragment.get("url"), Some(&json!("http://host:61208")));
        assert!(form.errors.is_empty());
    }

    #[test]
    fn report_omits_default_flag_and_includes_toggled() {
        let mut form = form_from_schema(&glances_schema(), None);
        set_text(&mut form, "url", "x");
        assert!(!form.fragment.contains_key("metrics"));
        if let Some(fld) = form.fields.iter_mut().find(|f| f.name == "metrics") {
            fld.value = FieldValue::Bool(true);
        }
        recompute_report(&mut form);
        assert_eq!(form.fragment.get("metrics"), Some(&json!(true)));
        assert!(form.errors.is_empty());
    }

    #[test]
    fn numeric_coercion_empty_absent_invalid_preserved() {
        let mut form = form_from_schema(&glances_schema(), None);
        set_text(&mut form, "url", "x");
        // Empty optional numeric: omitted, no error.
        assert!(!form.fragment.contains_key("refresh"));
        assert!(form.errors.is_empty());
        // Below the non-negative bound: error, raw text untouched.
        set_text(&mut form, "refresh", "-1");
        assert_eq!(
            form.errors.get("refresh").map(String::as_str),
            Some("Must be at least 0")
        );
        let raw = form
            .fields
            .iter()
            .find(|f| f.name == "refresh")
            .unwrap()
            .value
            .clone();
        assert_eq!(raw, FieldValue::Text("-1".into()));
        assert!(!form.fragment.contains_key("refresh"));
        // Unparsable: reported, not cleared.
        set_text(&mut form, "refresh", "soon");
        assert_eq!(
            form.errors.get("refresh").map(String::as_str),
            Some("Invalid integer")
        );
        // Valid: serialized as a number.
        set_text(&mut form, "refresh", "5");
        assert_eq!(form.fragment.get("refresh"), Some(&json!(5)));
        assert!(form.errors.is_empty());
    }

    #[test]
    fn select_default_is_omitted_and_choice_included() {
        let schema = WidgetSchema {
            type_name: "speedtest".into(),
            label: "Speedtest".into(),
            fields: vec![FieldSpec {
                name: "version".into(),
                kind: FieldSpecKind::Select,
                options: vec!["v1".into(), "v2".into()],
                default: Some("v1".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut form = form_from_schema(&schema, None);
        assert!(!form.fragment.contains_key("version"));
        if let FieldKind::Select { selected, .. } = &mut form.fields[0].kind {
            *selected = 1;
        }
        recompute_report(&mut form);
        assert_eq!(form.fragment.get("version"), Some(&json!("v2")));
    }

    #[test]
    fn any_of_rule_reports_until_one_is_set() {
        let schema = WidgetSchema {
            type_name: "docker".into(),
            label: "Docker".into(),
            fields: vec![
                FieldSpec {
                    name: "url".into(),
                    ..Default::default()
                },
                FieldSpec {
                    name: "socket".into(),
                    ..Default::default()
                },
            ],
            rules: vec![FieldRule {
                any_of: Some(vec!["url".into(), "socket".into()]),
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut form = form_from_schema(&schema, None);
        assert!(form
            .errors
            .get("url")
            .is_some_and(|m| m.contains("at least one of")));
        set_text(&mut form, "socket", "/var/run/docker.sock");
        assert!(form.errors.is_empty());
    }

    #[test]
    fn if_set_rule_requires_companion_field() {
        let schema = WidgetSchema {
            type_name: "proxmox".into(),
            label: "Proxmox".into(),
            fields: vec![
                FieldSpec {
                    name: "username".into(),
                    ..Default::default()
                },
                FieldSpec {
                    name: "password".into(),
                    kind: FieldSpecKind::Secret,
                    ..Default::default()
                },
            ],
            rules: vec![FieldRule {
                if_set: Some("username".into()),
                then_required: Some("password".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut form = form_from_schema(&schema, None);
        assert!(form.errors.is_empty());
        set_text(&mut form, "username", "admin");
        assert_eq!(
            form.errors.get("password").map(String::as_str),
            Some("Required when username is set")
        );
        set_text(&mut form, "password", "{{HOMEPAGE_VAR_PROXMOX}}");
        assert!(form.errors.is_empty());
    }

    #[test]
    fn errors_empty_exactly_when_fragment_valid() {
        // Walk a handful of snapshots and check the duality both ways.
        let mut form = form_from_schema(&glances_schema(), None);
        let cases = [
            ("", "", false),
            ("http://host", "", true),
            ("http://host", "-3", false),
            ("http://host", "10", true),
            ("", "10", false),
        ];
        for (url, refresh, expect_valid) in cases {
            set_text(&mut form, "url", url);
            set_text(&mut form, "refresh", refresh);
            assert_eq!(
                form.errors.is_empty(),
                expect_valid,
                "url={url:?} refresh={refresh:?}"
            );
        }
    }

    #[test]
    fn commit_wraps_and_reports_reference_name() {
        let mut form = form_from_schema(&glances_schema(), None);
        let idx = form.fields.iter().position(|f| f.name == "password").unwrap();
        set_text(&mut form, "password", "HOMEPAGE_VAR_GLANCES");
        let check = commit_env_ref(&mut form, idx);
        assert_eq!(
            check,
            Some(("password".to_string(), "HOMEPAGE_VAR_GLANCES".to_string()))
        );
        assert_eq!(
            form.fields[idx].value,
            FieldValue::Text("{{HOMEPAGE_VAR_GLANCES}}".into())
        );
        // Committing again is a no-op on the value.
        let again = commit_env_ref(&mut form, idx);
        assert_eq!(
            again,
            Some(("password".to_string(), "HOMEPAGE_VAR_GLANCES".to_string()))
        );
        assert_eq!(
            form.fields[idx].value,
            FieldValue::Text("{{HOMEPAGE_VAR_GLANCES}}".into())
        );
    }

    #[test]
    fn commit_passes_plain_values_through() {
        let mut form = form_from_schema(&glances_schema(), None);
        let idx = form.fields.iter().position(|f| f.name == "password").unwrap();
        set_text(&mut form, "password", "plain-value");
        let check = commit_env_ref(&mut form, idx);
        assert!(check.is_none());
        assert_eq!(form.fields[idx].value, FieldValue::Text("plain-value".into()));
    }

    #[test]
    fn suggestions_filter_is_advisory_substring_match() {
        let keys = vec![
            "HOMEPAGE_VAR_GLANCES".to_string(),
            "HOMEPAGE_VAR_SONARR".to_string(),
            "HOMEPAGE_FILE_CERT".to_string(),
        ];
        assert_eq!(filter_suggestions(&keys, "").len(), 3);
        assert_eq!(filter_suggestions(&keys, "sonarr"), vec!["HOMEPAGE_VAR_SONARR"]);
        // A wrapped value filters on the bare name.
        assert_eq!(
            filter_suggestions(&keys, "{{HOMEPAGE_FILE_CERT}}"),
            vec!["HOMEPAGE_FILE_CERT"]
        );
        assert!(filter_suggestions(&keys, "nothing").is_empty());
    }

    #[test]
    fn masked_secret_renders_bullets_not_value() {
        use ratatui::backend::TestBackend;
        use ratatui::Terminal;
        let mut form = form_from_schema(&glances_schema(), None);
        set_text(&mut form, "url", "x");
        set_text(&mut form, "password", "hunter2");
        let backend = TestBackend::new(48, 12);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| {
                let area = Rect::new(0, 0, 48, 12);
                draw_form(f, area, &mut form, true, false);
            })
            .unwrap();
        let buf = terminal.backend().buffer().clone();
        let mut text = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                text.push_str(buf[(x, y)].symbol());
            }
            text.push('\n');
        }
        assert!(text.contains("•••••••"));
        assert!(!text.contains("hunter2"));
        assert!(text.contains("[secret]"));
    }
}
