use crate::app::{update, AppMsg, Effect};
use crate::dash_core::env_cache::EnvKeyCache;
use crate::model::{AppConfig, WidgetCatalog};
use crate::services::loader::{spawn_fetch_env_keys, spawn_save_entry};
use crate::widgets::form_widget::FormWidget;
use crate::widgets::status_bar::draw_footer;
use crate::widgets::Widget;
use anyhow::{anyhow, Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::prelude::*;
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

#[derive(Default)]
pub(crate) struct AppState {
    pub(crate) config: AppConfig,
    pub(crate) config_dir: PathBuf,
    pub(crate) catalog: WidgetCatalog,
    // Existing entry (parsed YAML), used to seed a matching editor.
    pub(crate) entry_data: Option<JsonValue>,
    pub(crate) view: View,
    // Picker state
    pub(crate) selected: usize,
    pub(crate) picker_offset: usize,
    pub(crate) picker_viewport_h: u16,
    // Editor state
    pub(crate) editor: Option<FormWidget>,
    pub(crate) editor_focus: EditorPane,
    pub(crate) preview_scroll: u16,
    // Shared variable-name cache; every reference-aware input reads from it.
    pub(crate) env_keys: EnvKeyCache,
    // Existence check deferred until the in-flight fetch resolves.
    pub(crate) pending_ref_check: Option<(String, String)>,
    pub(crate) status_text: Option<String>,
    pub(crate) submitting: bool,
    pub(crate) toast: Option<Toast>,
    pub(crate) tick: u64,
    tx: Option<Sender<LoadMsg>>,
    rx: Option<Receiver<LoadMsg>>,
    pub(crate) theme: crate::theme::Theme,
    // Debug ring (last line surfaces in the footer with DASHCFG_DEBUG=1)
    pub(crate) debug_log: VecDeque<String>,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum View {
    #[default]
    Picker,
    Editor,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EditorPane {
    #[default]
    Form,
    Preview,
}

impl AppState {
    pub fn dbg(&mut self, msg: impl Into<String>) {
        const MAX_LOG_LINES: usize = 200;
        if self.debug_log.len() >= MAX_LOG_LINES {
            self.debug_log.pop_front();
        }
        self.debug_log.push_back(msg.into());
    }
}

#[derive(Clone, Copy)]
pub enum ToastLevel {
    Info,
    Success,
    Warn,
    Error,
}

pub struct Toast {
    pub text: String,
    pub level: ToastLevel,
    pub expires_at_tick: u64,
}

pub enum LoadKind {
    EnvKeys { generation: u64 },
    SaveEntry,
}

pub enum LoadOutcome {
    Keys(Vec<String>),
    Saved(String),
}

pub struct LoadMsg {
    pub kind: LoadKind,
    pub outcome: Result<LoadOutcome, String>,
}

fn run_effects(state: &mut AppState, effects: Vec<Effect>) {
    for eff in effects {
        match eff {
            Effect::EnsureEnvKeys => {
                if let Some(generation) = state.env_keys.ensure_loaded() {
                    state.dbg(format!("fetch env keys gen={generation}"));
                    state.status_text = Some("Loading variable names...".into());
                    if let Some(tx) = &state.tx {
                        spawn_fetch_env_keys(
                            state.config.env_keys_cmd.clone(),
                            generation,
                            tx.clone(),
                        );
                    }
                }
            }
            Effect::ReloadEnvKeys => {
                let generation = state.env_keys.force_reload();
                state.dbg(format!("reload env keys gen={generation}"));
                state.status_text = Some("Refreshing variable names...".into());
                if let Some(tx) = &state.tx {
                    spawn_fetch_env_keys(state.config.env_keys_cmd.clone(), generation, tx.clone());
                }
            }
            Effect::CheckEnvRef { field, name } => {
                state.dbg(format!("check reference {field} -> {name}"));
                let more = crate::app::env_ref_effects(state, field, name);
                run_effects(state, more);
            }
            Effect::SaveEntry { fragment } => {
                if state.submitting {
                    continue;
                }
                state.submitting = true;
                state.status_text = Some("Saving...".into());
                if let Some(ed) = &mut state.editor {
                    ed.form.disabled = true;
                    ed.form.editing = false;
                    ed.form.message = Some("Saving...".into());
                }
                let path = state.config_dir.join(&state.config.output);
                state.dbg(format!("save entry -> {path:?}"));
                let text = crate::widgets::preview::fragment_yaml(&fragment);
                if let Some(tx) = &state.tx {
                    spawn_save_entry(path, text, tx.clone());
                }
            }
            Effect::CloseEditor => {
                state.editor = None;
                state.view = View::Picker;
                state.editor_focus = EditorPane::Form;
                state.pending_ref_check = None;
            }
            Effect::ShowToast {
                text,
                level,
                seconds,
            } => {
                let ticks = seconds.saturating_mul(5); // ~200ms tick
                let exp = state.tick.saturating_add(ticks);
                state.toast = Some(Toast {
                    text,
                    level,
                    expires_at_tick: exp,
                });
            }
        }
    }
}

fn pump_load_msgs(state: &mut AppState) {
    let mut drained: Vec<LoadMsg> = Vec::new();
    if let Some(rx) = &state.rx {
        while let Ok(msg) = rx.try_recv() {
            drained.push(msg);
        }
    }
    for msg in drained {
        let effects = match msg.kind {
            LoadKind::EnvKeys { generation } => {
                let outcome = msg.outcome.and_then(|o| match o {
                    LoadOutcome::Keys(keys) => Ok(keys),
                    LoadOutcome::Saved(_) => Err("unexpected payload".to_string()),
                });
                update(
                    state,
                    AppMsg::LoadedEnvKeys {
                        generation,
                        outcome,
                    },
                )
            }
            LoadKind::SaveEntry => {
                let outcome = msg.outcome.and_then(|o| match o {
                    LoadOutcome::Saved(path) => Ok(path),
                    LoadOutcome::Keys(_) => Err("unexpected payload".to_string()),
                });
                update(state, AppMsg::SavedEntry { outcome })
            }
        };
        run_effects(state, effects);
    }
}

fn prune_toast(state: &mut AppState) {
    if let Some(t) = &state.toast {
        if state.tick >= t.expires_at_tick {
            state.toast = None;
        }
    }
}

fn adjust_picker_offset(state: &mut AppState) {
    let ih = state.picker_viewport_h as usize;
    if ih == 0 {
        return;
    }
    if state.selected < state.picker_offset {
        state.picker_offset = state.selected;
    } else if state.selected >= state.picker_offset + ih {
        state.picker_offset = state.selected + 1 - ih;
    }
}

/// Handle one key event; returns true when the app should exit.
fn handle_key(state: &mut AppState, key: event::KeyEvent) -> bool {
    // Ctrl+C copies the preview YAML to the clipboard.
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        if let Some(ed) = &state.editor {
            let text = crate::widgets::preview::fragment_yaml(&ed.form.fragment);
            if !text.is_empty() {
                if let Ok(mut clipboard) = arboard::Clipboard::new() {
                    let _ = clipboard.set_text(&text);
                    state.status_text = Some("Copied to clipboard!".to_string());
                }
            }
        }
        return false;
    }
    match state.view {
        View::Picker => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => {
                if state.selected > 0 {
                    state.selected -= 1;
                }
                adjust_picker_offset(state);
            }
            KeyCode::Down => {
                if state.selected + 1 < state.catalog.widgets.len() {
                    state.selected += 1;
                }
                adjust_picker_offset(state);
            }
            KeyCode::PageUp => {
                let step = state.picker_viewport_h.max(1) as usize;
                state.selected = state.selected.saturating_sub(step);
                adjust_picker_offset(state);
            }
            KeyCode::PageDown => {
                let step = state.picker_viewport_h.max(1) as usize;
                let last = state.catalog.widgets.len().saturating_sub(1);
                state.selected = (state.selected + step).min(last);
                adjust_picker_offset(state);
            }
            KeyCode::Home => {
                state.selected = 0;
                adjust_picker_offset(state);
            }
            KeyCode::End => {
                state.selected = state.catalog.widgets.len().saturating_sub(1);
                adjust_picker_offset(state);
            }
            KeyCode::Enter => {
                if let Some(w) = state.catalog.widgets.get(state.selected) {
                    let type_name = w.type_name.clone();
                    let effs = update(state, AppMsg::OpenEditor { type_name });
                    run_effects(state, effs);
                }
            }
            _ => {}
        },
        View::Editor => {
            let (editing, confirming) = state
                .editor
                .as_ref()
                .map(|ed| (ed.form.editing, ed.form.confirm.is_some()))
                .unwrap_or((false, false));
            match key.code {
                KeyCode::Tab if !editing => {
                    state.editor_focus = match state.editor_focus {
                        EditorPane::Form => EditorPane::Preview,
                        EditorPane::Preview => EditorPane::Form,
                    };
                    return false;
                }
                KeyCode::Char('q') if !editing && !confirming => return true,
                KeyCode::Esc if !editing && !confirming => {
                    let dirty = state.editor.as_ref().map(|e| e.form.dirty).unwrap_or(false);
                    if !dirty {
                        run_effects(state, vec![Effect::CloseEditor]);
                    } else if let Some(ed) = &mut state.editor {
                        ed.form.message = Some("Unsaved changes — use Cancel to discard".into());
                    }
                    return false;
                }
                _ => {}
            }
            match state.editor_focus {
                EditorPane::Form => {
                    let effs = if let Some(ed) = &mut state.editor {
                        ed.on_key(key.code)
                    } else {
                        Vec::new()
                    };
                    run_effects(state, effs);
                }
                EditorPane::Preview => match key.code {
                    KeyCode::Up => state.preview_scroll = state.preview_scroll.saturating_sub(1),
                    KeyCode::Down => state.preview_scroll = state.preview_scroll.saturating_add(1),
                    KeyCode::PageUp => {
                        state.preview_scroll = state.preview_scroll.saturating_sub(8)
                    }
                    KeyCode::PageDown => {
                        state.preview_scroll = state.preview_scroll.saturating_add(8)
                    }
                    _ => {}
                },
            }
        }
    }
    false
}

fn ui(f: &mut Frame, state: &mut AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(f.area());
    crate::widgets::header::draw_header(f, chunks[0], state);
    match state.view {
        View::Picker => {
            state.picker_viewport_h = chunks[1].height.saturating_sub(2);
            crate::widgets::menu::draw_picker(f, chunks[1], state);
            draw_footer(f, chunks[2], state, "↑/↓ select • Enter edit • q quit");
        }
        View::Editor => {
            let panes = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                .split(chunks[1]);
            let focus_form = matches!(state.editor_focus, EditorPane::Form);
            let tick = state.tick;
            if let Some(ed) = &mut state.editor {
                ed.render(f, panes[0], focus_form, tick);
            }
            crate::widgets::preview::draw_preview(f, panes[1], state, !focus_form);
            draw_footer(
                f,
                chunks[2],
                state,
                "Enter edit/commit • Tab preview • v reveal • r refresh names • q quit",
            );
        }
    }
}

pub fn run() -> Result<()> {
    let (cfg, config_dir) = load_config()?;
    let catalog = load_catalog(&config_dir, &cfg)?;
    let entry_data = load_entry(&config_dir, &cfg);
    let mut state = AppState {
        config: cfg,
        config_dir,
        catalog,
        entry_data,
        theme: crate::theme::Theme::harbor_dark(),
        ..Default::default()
    };
    let (tx, rx) = mpsc::channel::<LoadMsg>();
    state.tx = Some(tx);
    state.rx = Some(rx);
    // Headless smoke mode
    let headless = std::env::var("DASHCFG_HEADLESS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
        .unwrap_or(false);
    if headless {
        let ticks: u64 = std::env::var("DASHCFG_TICKS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(10);
        let open_type: Option<String> = std::env::var("DASHCFG_HEADLESS_OPEN").ok();
        let summary: bool = std::env::var("DASHCFG_SMOKE_SUMMARY")
            .ok()
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
            .unwrap_or(false);
        let backend = ratatui::backend::TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend)?;
        let mut opened = false;
        for _ in 0..ticks {
            if !opened {
                if let Some(t) = open_type.clone() {
                    let effs = update(&mut state, AppMsg::OpenEditor { type_name: t });
                    run_effects(&mut state, effs);
                    opened = true;
                }
            }
            terminal.draw(|f| ui(f, &mut state))?;
            pump_load_msgs(&mut state);
            state.tick = state.tick.wrapping_add(1);
            prune_toast(&mut state);
            std::thread::sleep(Duration::from_millis(50));
        }
        if summary {
            let view = match state.view {
                View::Picker => "Picker",
                View::Editor => "Editor",
            };
            let out = serde_json::json!({
                "ok": true,
                "view": view,
                "widgets": state.catalog.widgets.len(),
                "editor_open": state.editor.is_some(),
                "errors": state
                    .editor
                    .as_ref()
                    .map(|e| e.form.errors.len())
                    .unwrap_or(0),
            });
            println!("{out}");
        }
        return Ok(());
    }
    // Setup terminal (interactive)
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();
    let res = loop {
        terminal.draw(|f| ui(f, &mut state))?;
        pump_load_msgs(&mut state);
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if handle_key(&mut state, key) {
                    break Ok(());
                }
            }
        }
        if last_tick.elapsed() >= tick_rate {
            state.tick = state.tick.wrapping_add(1);
            prune_toast(&mut state);
            last_tick = Instant::now();
        }
    };
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    res
}

fn load_config() -> Result<(AppConfig, PathBuf)> {
    // 1) If DASHCFG_CONFIG_DIR is set, expect dashcfg.yaml inside it
    if let Ok(base) = std::env::var("DASHCFG_CONFIG_DIR") {
        let base_dir = PathBuf::from(&base);
        let entry = base_dir.join("dashcfg.yaml");
        let s = fs::read_to_string(&entry).with_context(|| format!("reading {entry:?}"))?;
        let cfg: AppConfig =
            serde_yaml::from_str(&s).with_context(|| format!("parsing {entry:?}"))?;
        return Ok((cfg, base_dir));
    }
    // 2) Discover dashcfg.yaml from CWD
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let candidates = [
        cwd.join("dashcfg.yaml"),
        cwd.join("config").join("dashcfg.yaml"),
        cwd.join(".dashcfg").join("dashcfg.yaml"),
    ];
    for p in &candidates {
        if p.exists() {
            let base_dir = p.parent().unwrap_or(&cwd).to_path_buf();
            let s = fs::read_to_string(p).with_context(|| format!("reading {p:?}"))?;
            let cfg: AppConfig =
                serde_yaml::from_str(&s).with_context(|| format!("parsing {p:?}"))?;
            return Ok((cfg, base_dir));
        }
    }
    // 3) Last attempt: ~/.dashcfg/dashcfg.yaml
    if let Some(home) = std::env::var("HOME")
        .ok()
        .or_else(|| std::env::var("USERPROFILE").ok())
        .map(PathBuf::from)
    {
        let p = home.join(".dashcfg").join("dashcfg.yaml");
        if p.exists() {
            let base_dir = p.parent().unwrap_or(&home).to_path_buf();
            let s = fs::read_to_string(&p).with_context(|| format!("reading {p:?}"))?;
            let cfg: AppConfig =
                serde_yaml::from_str(&s).with_context(|| format!("parsing {p:?}"))?;
            return Ok((cfg, base_dir));
        }
    }
    Err(anyhow!(
        "no dashcfg.yaml found — set DASHCFG_CONFIG_DIR or create ./dashcfg.yaml"
    ))
}

fn load_catalog(config_dir: &Path, cfg: &AppConfig) -> Result<WidgetCatalog> {
    let path = config_dir.join(&cfg.catalog);
    let s = fs::read_to_string(&path).with_context(|| format!("reading {path:?}"))?;
    let cat: WidgetCatalog =
        serde_yaml::from_str(&s).with_context(|| format!("parsing {path:?}"))?;
    crate::model::validate_catalog(&cat).map_err(|e| anyhow!("invalid catalog: {e}"))?;
    Ok(cat)
}

fn load_entry(config_dir: &Path, cfg: &AppConfig) -> Option<JsonValue> {
    let rel = cfg.entry.as_ref()?;
    let path = config_dir.join(rel);
    let s = fs::read_to_string(&path).ok()?;
    serde_yaml::from_str::<JsonValue>(&s).ok()
}
