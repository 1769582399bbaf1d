use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::ui::AppState;
use crate::widgets::chrome::panel_block;

#[allow(dead_code)]
pub(crate) fn compute_scroll_window(total: usize, selected: usize, inner_h: u16) -> (usize, usize) {
    if inner_h == 0 || total == 0 {
        return (0, 0);
    }
    let sel = selected.min(total.saturating_sub(1));
    let ih = inner_h as usize;
    let start = sel.saturating_sub(ih - 1);
    let end = (start + ih).min(total);
    (start, end)
}

/// Widget-type picker: one row per catalog entry.
pub fn draw_picker(f: &mut Frame, area: Rect, state: &AppState) {
    let total = state.catalog.widgets.len();
    let inner_h = area.height.saturating_sub(2);
    let ih = inner_h as usize;
    let max_start = total.saturating_sub(ih);
    let start = state.picker_offset.min(max_start);
    let end = (start + ih).min(total);
    let items: Vec<ListItem> = state
        .catalog
        .widgets
        .iter()
        .enumerate()
        .skip(start)
        .take(end - start)
        .map(|(idx, w)| {
            let is_sel = idx == state.selected;
            let sel = if is_sel { "› " } else { "  " };
            let label_style = if is_sel {
                crate::theme::text_active_bold()
            } else {
                Style::default()
            };
            let mut spans = vec![
                Span::raw(sel.to_string()),
                Span::styled(w.label.clone(), label_style),
                Span::styled(format!("  ({})", w.type_name), crate::theme::text_muted()),
            ];
            if let Some(desc) = &w.description {
                spans.push(Span::styled(
                    format!(" — {desc}"),
                    crate::theme::text_muted(),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();
    let block = panel_block("Widgets", true);
    let list = List::new(items).block(block);
    f.render_widget(list, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_window_tracks_selection() {
        assert_eq!(compute_scroll_window(10, 0, 4), (0, 4));
        assert_eq!(compute_scroll_window(10, 3, 4), (0, 4));
        assert_eq!(compute_scroll_window(10, 5, 4), (2, 6));
        assert_eq!(compute_scroll_window(10, 9, 4), (6, 10));
        assert_eq!(compute_scroll_window(0, 0, 4), (0, 0));
        assert_eq!(compute_scroll_window(10, 5, 0), (0, 0));
    }
}
