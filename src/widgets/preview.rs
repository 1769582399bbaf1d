use crate::ui::AppState;
use crate::widgets::chrome::panel_block;
use ratatui::prelude::*;
use ratatui::widgets::*;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::OnceLock;

// syntect setup (lazy)
use syntect::easy::HighlightLines;
use syntect::highlighting::{Style as SynStyle, Theme as SynTheme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};

/// Serialize a sanitized fragment the way it lands in the config file.
pub fn fragment_yaml(fragment: &JsonMap<String, JsonValue>) -> String {
    serde_yaml::to_string(&JsonValue::Object(fragment.clone())).unwrap_or_default()
}

static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
static THEME_SET: OnceLock<ThemeSet> = OnceLock::new();
static THEME: OnceLock<SynTheme> = OnceLock::new();

fn get_syntax_set() -> &'static SyntaxSet {
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn get_theme() -> &'static SynTheme {
    THEME.get_or_init(|| {
        let ts = THEME_SET.get_or_init(ThemeSet::load_defaults);
        ts.themes
            .get("base16-ocean.dark")
            .cloned()
            .unwrap_or_else(|| ts.themes.values().next().cloned().unwrap_or_default())
    })
}

fn syn_to_tui_color(c: syntect::highlighting::Color) -> Color {
    Color::Rgb(c.r, c.g, c.b)
}

fn highlight_yaml(text: &str) -> Vec<Line<'static>> {
    let ps = get_syntax_set();
    let theme = get_theme();
    let syn: &SyntaxReference = ps
        .find_syntax_by_token("yaml")
        .unwrap_or_else(|| ps.find_syntax_plain_text());
    let mut high = HighlightLines::new(syn, theme);
    let mut out: Vec<Line<'static>> = Vec::new();
    for line in text.lines() {
        let regions: Vec<(SynStyle, &str)> = high.highlight_line(line, ps).unwrap_or_default();
        let mut spans: Vec<Span<'static>> = Vec::new();
        for (st, seg) in regions {
            let style = Style::default().fg(syn_to_tui_color(st.foreground));
            spans.push(Span::styled(seg.to_string(), style));
        }
        out.push(Line::from(spans));
    }
    out
}

/// Live view of the report pair: the fragment as it would be saved, plus
/// whatever currently blocks saving.
pub fn draw_preview(f: &mut Frame, area: Rect, state: &mut AppState, focused: bool) {
    let mut lines: Vec<Line> = Vec::new();
    if let Some(ed) = &state.editor {
        let yaml = fragment_yaml(&ed.form.fragment);
        lines.extend(highlight_yaml(&yaml));
        lines.push(Line::from(""));
        if ed.form.errors.is_empty() {
            lines.push(Line::from(Span::styled(
                "Valid — ready to save",
                crate::theme::text_muted(),
            )));
        } else {
            for (name, msg) in &ed.form.errors {
                lines.push(Line::from(Span::styled(
                    format!("! {name}: {msg}"),
                    crate::theme::text_error(),
                )));
            }
        }
    }
    let viewport_h = area.height.saturating_sub(2);
    let max_scroll = (lines.len() as u16).saturating_sub(viewport_h);
    if state.preview_scroll > max_scroll {
        state.preview_scroll = max_scroll;
    }
    let block = panel_block("Preview", focused);
    let p = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((state.preview_scroll, 0));
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fragment_yaml_serializes_minimal_map() {
        let v = json!({"type": "glances", "url": "http://host:61208", "metrics": true});
        let yaml = fragment_yaml(v.as_object().unwrap());
        assert!(yaml.contains("type: glances"));
        assert!(yaml.contains("url: http://host:61208"));
        assert!(yaml.contains("metrics: true"));
    }
}
