use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::*;

use crate::ui::AppState;

pub fn draw_footer(f: &mut Frame, area: Rect, state: &AppState, help_text: &str) {
    let mut spans: Vec<Span> = Vec::new();
    if let Some(msg) = &state.status_text {
        let spinner = ["⠋", "⠙", "⠸", "⠴", "⠦", "⠇"][state.tick as usize % 6];
        spans.push(Span::raw(format!(" {spinner} {msg}")));
        spans.push(Span::raw("  |  "));
    }
    if let Some(t) = &state.toast {
        let color = crate::theme::toast_color(t.level);
        let tag = match t.level {
            crate::ui::ToastLevel::Success => "[OK]",
            crate::ui::ToastLevel::Warn => "[WARN]",
            crate::ui::ToastLevel::Error => "[ERROR]",
            crate::ui::ToastLevel::Info => "[INFO]",
        };
        spans.push(Span::styled(
            format!("{tag} "),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(
            format!("{}  |  ", t.text),
            Style::default().fg(color),
        ));
    }
    if let Some(ed) = &state.editor {
        if ed.form.editing {
            spans.push(Span::raw("editing  |  "));
        }
    }
    spans.push(Span::styled(
        help_text.to_string(),
        Style::default().fg(Color::DarkGray),
    ));
    if std::env::var("DASHCFG_DEBUG").ok().as_deref() == Some("1") {
        if let Some(last) = state.debug_log.back() {
            spans.push(Span::styled(
                format!("  |  {last}"),
                Style::default().fg(Color::DarkGray),
            ));
        }
    }
    let p = Paragraph::new(Line::from(spans));
    f.render_widget(p, area);
}
