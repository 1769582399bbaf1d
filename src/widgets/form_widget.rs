use crate::widgets::form::{
    self, draw_form, FieldKind, FieldValue, FormState, OPTIONS_VISIBLE, SUGGESTIONS_VISIBLE,
};
use crossterm::event::KeyCode;
use ratatui::prelude::*;

pub struct FormWidget {
    pub form: FormState,
}

impl FormWidget {
    pub fn new(form: FormState) -> Self {
        Self { form }
    }

    fn suggestion_count(fld: &crate::widgets::form::FormField) -> usize {
        let FieldKind::EnvRef(env) = &fld.kind else {
            return 0;
        };
        let query = match &fld.value {
            FieldValue::Text(s) => s.as_str(),
            FieldValue::Bool(_) => "",
        };
        form::filter_suggestions(&env.keys, query).len()
    }

    /// Commit the selected field on leaving edit mode. Reference-aware
    /// fields run the full commit protocol and may ask for an existence
    /// check; everything else just keeps the already-derived report.
    fn commit_selected(&mut self) -> Vec<crate::app::Effect> {
        let sel = self.form.selected;
        let is_env = matches!(
            self.form.fields.get(sel).map(|f| &f.kind),
            Some(FieldKind::EnvRef(_))
        );
        self.form.editing = false;
        if is_env {
            if let Some((field, name)) = form::commit_env_ref(&mut self.form, sel) {
                return vec![crate::app::Effect::CheckEnvRef { field, name }];
            }
        }
        Vec::new()
    }
}

impl crate::widgets::Widget for FormWidget {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, tick: u64) {
        let cursor_on = tick % 2 == 0;
        draw_form(f, area, &mut self.form, focused, cursor_on);
    }

    fn on_key(&mut self, key: KeyCode) -> Vec<crate::app::Effect> {
        use crate::app::Effect;
        let mut effects: Vec<Effect> = Vec::new();
        match key {
            KeyCode::Up => {
                if self.form.editing {
                    let sel = self.form.selected;
                    if let Some(fld) = self.form.fields.get_mut(sel) {
                        match &mut fld.kind {
                            FieldKind::EnvRef(env) => {
                                if env.open && env.cursor > 0 {
                                    env.cursor -= 1;
                                    if env.cursor < env.offset {
                                        env.offset = env.cursor;
                                    }
                                }
                            }
                            FieldKind::Select { cursor, offset, .. } => {
                                if *cursor > 0 {
                                    *cursor -= 1;
                                }
                                if *cursor < *offset {
                                    *offset = *cursor;
                                }
                            }
                            _ => {}
                        }
                    }
                } else if self.form.selected > 0 {
                    self.form.selected -= 1;
                }
                effects
            }
            KeyCode::Down => {
                if self.form.editing {
                    let sel = self.form.selected;
                    if let Some(fld) = self.form.fields.get_mut(sel) {
                        let matches = Self::suggestion_count(fld);
                        match &mut fld.kind {
                            FieldKind::EnvRef(env) => {
                                if env.open && env.cursor + 1 < matches {
                                    env.cursor += 1;
                                    if env.cursor >= env.offset + SUGGESTIONS_VISIBLE {
                                        env.offset = env.cursor + 1 - SUGGESTIONS_VISIBLE;
                                    }
                                }
                            }
                            FieldKind::Select {
                                cursor,
                                options,
                                offset,
                                ..
                            } => {
                                if *cursor + 1 < options.len() {
                                    *cursor += 1;
                                }
                                if *cursor >= *offset + OPTIONS_VISIBLE {
                                    *offset = *cursor + 1 - OPTIONS_VISIBLE;
                                }
                            }
                            _ => {}
                        }
                    }
                } else {
                    let max_idx = self.form.fields.len() + 2; // include Reset and Cancel
                    if self.form.selected < max_idx {
                        self.form.selected += 1;
                    }
                }
                effects
            }
            KeyCode::Left | KeyCode::Right => {
                if self.form.editing {
                    let sel = self.form.selected;
                    if let Some(fld) = self.form.fields.get_mut(sel) {
                        if let FieldKind::Select {
                            cursor, selected, ..
                        } = &mut fld.kind
                        {
                            *selected = *cursor;
                            self.form.editing = false;
                            form::compute_dirty(&mut self.form);
                            form::recompute_report(&mut self.form);
                        }
                    }
                } else {
                    let sel = self.form.selected;
                    if sel < self.form.fields.len() {
                        // Quick change for Select when browsing.
                        if let Some(fld) = self.form.fields.get_mut(sel) {
                            if let FieldKind::Select {
                                options,
                                selected,
                                cursor,
                                ..
                            } = &mut fld.kind
                            {
                                if !options.is_empty() {
                                    if key == KeyCode::Left {
                                        *selected = if *selected == 0 {
                                            options.len() - 1
                                        } else {
                                            *selected - 1
                                        };
                                    } else {
                                        *selected = (*selected + 1) % options.len();
                                    }
                                    *cursor = *selected;
                                    form::compute_dirty(&mut self.form);
                                    form::recompute_report(&mut self.form);
                                }
                            }
                        }
                    } else {
                        // Move between the Save / Reset / Cancel buttons.
                        let save_idx = self.form.fields.len();
                        let cancel_idx = self.form.fields.len() + 2;
                        if key == KeyCode::Left && self.form.selected > save_idx {
                            self.form.selected -= 1;
                        } else if key == KeyCode::Right && self.form.selected < cancel_idx {
                            self.form.selected += 1;
                        }
                    }
                }
                effects
            }
            KeyCode::Enter => {
                let save_idx = self.form.fields.len();
                let reset_idx = self.form.fields.len() + 1;
                let cancel_idx = self.form.fields.len() + 2;
                if !self.form.editing && self.form.selected == save_idx {
                    if self.form.disabled || !self.form.dirty {
                        return effects;
                    }
                    if self.form.errors.is_empty() {
                        effects.push(Effect::SaveEntry {
                            fragment: self.form.fragment.clone(),
                        });
                    } else {
                        self.form.message = Some("Please fix the highlighted errors".into());
                    }
                } else if !self.form.editing && self.form.selected == reset_idx {
                    if self.form.dirty {
                        if self.form.confirm == Some(form::ConfirmAction::Reset) {
                            form::reset_to_initial(&mut self.form);
                            effects.push(Effect::ShowToast {
                                text: "Reset".into(),
                                level: crate::ui::ToastLevel::Info,
                                seconds: 2,
                            });
                            self.form.confirm = None;
                        } else {
                            self.form.confirm = Some(form::ConfirmAction::Reset);
                            self.form.message =
                                Some("Press Enter to confirm Reset • Esc to cancel".into());
                        }
                    }
                } else if !self.form.editing && self.form.selected == cancel_idx {
                    if self.form.confirm == Some(form::ConfirmAction::Cancel) {
                        effects.push(Effect::CloseEditor);
                        self.form.confirm = None;
                    } else {
                        self.form.confirm = Some(form::ConfirmAction::Cancel);
                        self.form.message =
                            Some("Press Enter to confirm Cancel • Esc to stay".into());
                    }
                } else if self.form.editing {
                    // Enter commits the field being edited.
                    let sel = self.form.selected;
                    match self.form.fields.get_mut(sel).map(|f| &mut f.kind) {
                        Some(FieldKind::Select {
                            cursor, selected, ..
                        }) => {
                            *selected = *cursor;
                            self.form.editing = false;
                            form::compute_dirty(&mut self.form);
                            form::recompute_report(&mut self.form);
                        }
                        _ => {
                            effects.extend(self.commit_selected());
                        }
                    }
                } else {
                    let sel = self.form.selected;
                    if let Some(fld) = self.form.fields.get_mut(sel) {
                        match (&mut fld.kind, &mut fld.value) {
                            (FieldKind::Checkbox { .. }, FieldValue::Bool(b)) => {
                                *b = !*b;
                                form::compute_dirty(&mut self.form);
                                form::recompute_report(&mut self.form);
                            }
                            (FieldKind::Text, _) | (FieldKind::Number { .. }, _) => {
                                self.form.editing = true;
                            }
                            (FieldKind::EnvRef(env), _) => {
                                self.form.editing = true;
                                env.open = true;
                                env.cursor = 0;
                                env.offset = 0;
                                // One suggestion fetch per input lifetime,
                                // before cache-level de-duplication.
                                if !env.requested {
                                    env.requested = true;
                                    effects.push(Effect::EnsureEnvKeys);
                                }
                            }
                            (
                                FieldKind::Select {
                                    cursor, selected, ..
                                },
                                _,
                            ) => {
                                *cursor = *selected;
                                self.form.editing = true;
                            }
                            _ => {}
                        }
                    }
                }
                effects
            }
            KeyCode::Tab => {
                // Accept the highlighted suggestion into the text; the value
                // still commits (and wraps) on Enter/Esc.
                if self.form.editing {
                    let sel = self.form.selected;
                    if let Some(fld) = self.form.fields.get_mut(sel) {
                        let picked: Option<String> = {
                            let query = match &fld.value {
                                FieldValue::Text(s) => s.clone(),
                                FieldValue::Bool(_) => String::new(),
                            };
                            if let FieldKind::EnvRef(env) = &fld.kind {
                                if env.open {
                                    form::filter_suggestions(&env.keys, &query)
                                        .get(env.cursor)
                                        .map(|k| k.to_string())
                                } else {
                                    None
                                }
                            } else {
                                None
                            }
                        };
                        if let Some(key_name) = picked {
                            if let FieldValue::Text(s) = &mut fld.value {
                                *s = key_name;
                            }
                            // Selection dismisses the list.
                            if let FieldKind::EnvRef(env) = &mut fld.kind {
                                env.open = false;
                                env.cursor = 0;
                                env.offset = 0;
                            }
                            form::compute_dirty(&mut self.form);
                            form::recompute_report(&mut self.form);
                        }
                    }
                }
                effects
            }
            KeyCode::Backspace => {
                if self.form.editing {
                    let sel = self.form.selected;
                    if let Some(fld) = self.form.fields.get_mut(sel) {
                        if let FieldValue::Text(s) = &mut fld.value {
                            s.pop();
                        }
                        if let FieldKind::EnvRef(env) = &mut fld.kind {
                            env.cursor = 0;
                            env.offset = 0;
                        }
                        form::compute_dirty(&mut self.form);
                        form::recompute_report(&mut self.form);
                    }
                }
                effects
            }
            KeyCode::Esc => {
                if self.form.confirm.is_some() {
                    self.form.confirm = None;
                    self.form.message = None;
                } else if self.form.editing {
                    let sel = self.form.selected;
                    let close_only = match self.form.fields.get_mut(sel).map(|f| &mut f.kind) {
                        Some(FieldKind::EnvRef(env)) if env.open => {
                            env.open = false;
                            true
                        }
                        _ => false,
                    };
                    if !close_only {
                        effects.extend(self.commit_selected());
                        self.form.message = None;
                    }
                }
                effects
            }
            KeyCode::Char(c) => {
                if self.form.editing {
                    let sel = self.form.selected;
                    if let Some(fld) = self.form.fields.get_mut(sel) {
                        match (&mut fld.kind, &mut fld.value) {
                            (FieldKind::Text, FieldValue::Text(s)) => {
                                s.push(c);
                            }
                            (FieldKind::EnvRef(env), FieldValue::Text(s)) => {
                                s.push(c);
                                env.cursor = 0;
                                env.offset = 0;
                            }
                            (FieldKind::Number { is_integer, .. }, FieldValue::Text(s)) => {
                                if c.is_ascii_digit()
                                    || (c == '.' && !*is_integer && !s.contains('.'))
                                    || (c == '-' && s.is_empty())
                                {
                                    s.push(c);
                                }
                            }
                            _ => {}
                        }
                        form::compute_dirty(&mut self.form);
                        form::recompute_report(&mut self.form);
                    }
                } else {
                    let sel = self.form.selected;
                    if let Some(fld) = self.form.fields.get_mut(sel) {
                        match (c, &mut fld.kind, &mut fld.value) {
                            // Reveal toggle: rendering only, value untouched.
                            ('v', FieldKind::EnvRef(env), _) if env.secret => {
                                env.reveal = !env.reveal;
                            }
                            // Force-refresh the suggestion set.
                            ('r', FieldKind::EnvRef(env), _) => {
                                env.requested = true;
                                effects.push(Effect::ReloadEnvKeys);
                            }
                            (' ', FieldKind::Checkbox { .. }, FieldValue::Bool(b)) => {
                                *b = !*b;
                                form::compute_dirty(&mut self.form);
                                form::recompute_report(&mut self.form);
                            }
                            _ => {}
                        }
                    }
                }
                effects
            }
            _ => effects,
        }
    }
}
