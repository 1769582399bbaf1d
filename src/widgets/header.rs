use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::ui::{AppState, View};

pub fn draw_header(f: &mut Frame, area: Rect, state: &AppState) {
    let title = state
        .config
        .title
        .clone()
        .unwrap_or_else(|| "DASHCFG".to_string());
    let subtitle = match state.view {
        View::Picker => format!(
            "{} widget types — Enter to edit",
            state.catalog.widgets.len()
        ),
        View::Editor => state
            .editor
            .as_ref()
            .map(|ed| format!("Editing a {} entry", ed.form.title))
            .unwrap_or_default(),
    };
    let lines = vec![
        Line::from(Span::styled(
            title,
            Style::default()
                .fg(state.theme.accent)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(subtitle, state.theme.text_muted())),
    ];
    let block = Block::default().borders(Borders::ALL);
    let p = Paragraph::new(lines).block(block);
    f.render_widget(p, area);
}
