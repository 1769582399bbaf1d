use ratatui::style::{Color, Modifier, Style};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ThemeMode {
    #[allow(dead_code)]
    Light,
    Dark,
}

#[derive(Clone, Debug)]
pub struct Theme {
    #[allow(dead_code)]
    pub mode: ThemeMode,
    pub bg: Color,
    #[allow(dead_code)]
    pub fg: Color,
    pub accent: Color,
    pub frame: Color,
    pub selected: Color,
    pub success: Color,
    pub warn: Color,
    pub error: Color,
    pub muted: Color,
}

impl Theme {
    pub fn harbor_dark() -> Self {
        Self {
            mode: ThemeMode::Dark,
            bg: Color::Rgb(22, 24, 28),
            fg: Color::White,
            accent: Color::Rgb(80, 170, 255),
            frame: Color::Rgb(90, 95, 105),
            selected: Color::Rgb(255, 140, 40),
            success: Color::Green,
            warn: Color::Rgb(230, 180, 60),
            error: Color::Red,
            muted: Color::DarkGray,
        }
    }

    #[allow(dead_code)]
    pub fn harbor_light() -> Self {
        Self {
            mode: ThemeMode::Light,
            bg: Color::Rgb(244, 245, 248),
            fg: Color::Rgb(22, 24, 28),
            accent: Color::Rgb(30, 110, 210),
            frame: Color::Rgb(190, 195, 205),
            selected: Color::Rgb(215, 105, 20),
            success: Color::Rgb(0, 140, 0),
            warn: Color::Rgb(170, 130, 20),
            error: Color::Rgb(195, 0, 0),
            muted: Color::Rgb(120, 125, 135),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::harbor_dark()
    }
}

// Style helpers that use the theme
impl Theme {
    pub fn border_focused(&self) -> Style {
        Style::default().fg(self.selected)
    }

    #[allow(dead_code)]
    pub fn border_unfocused(&self) -> Style {
        Style::default().fg(self.frame)
    }

    pub fn text_active_bold(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text_editing_bold(&self) -> Style {
        Style::default()
            .fg(self.selected)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text_muted(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn text_error(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn list_cursor_style(&self) -> Style {
        Style::default()
            .fg(self.bg)
            .bg(self.selected)
            .add_modifier(Modifier::BOLD)
    }

    pub fn toast_color(&self, level: crate::ui::ToastLevel) -> Color {
        match level {
            crate::ui::ToastLevel::Success => self.success,
            crate::ui::ToastLevel::Warn => self.warn,
            crate::ui::ToastLevel::Error => self.error,
            crate::ui::ToastLevel::Info => self.accent,
        }
    }
}

pub const ACTIVE: Color = Color::Cyan;
pub const MUTED: Color = Color::DarkGray;

// Free helpers over the default theme, for widgets that do not carry one.
pub fn border_focused() -> Style {
    Theme::default().border_focused()
}

pub fn text_active_bold() -> Style {
    Theme::default().text_active_bold()
}

pub fn text_editing_bold() -> Style {
    Theme::default().text_editing_bold()
}

pub fn text_muted() -> Style {
    Theme::default().text_muted()
}

pub fn text_error() -> Style {
    Theme::default().text_error()
}

pub fn toast_color(level: crate::ui::ToastLevel) -> Color {
    Theme::default().toast_color(level)
}

pub fn list_cursor_style() -> Style {
    Theme::default().list_cursor_style()
}
