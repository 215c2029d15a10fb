use ratatui::style::{Color, Modifier, Style};

/// Colours of the playground.
#[derive(Clone, Debug)]
pub struct Theme {
    /// Background color for both panes
    pub background: Color,

    /// Foreground (text) color for the status bar
    pub status_bar_fg: Color,

    /// Background color for the status bar
    pub status_bar_bg: Color,

    /// Color for the current file name in the status bar
    pub filename_color: Color,

    /// Color of bullets, numbers and to-do boxes
    pub marker_color: Color,

    /// Color of the indent guides left of nested items
    pub indent_guide_color: Color,

    /// Color of block names such as `<heading1>`
    pub block_name_color: Color,

    /// Color of element names in the markup pane
    pub tag_color: Color,

    /// Color of attributes, classes and styles in the markup pane
    pub attribute_color: Color,

    /// Color of text nodes in the markup pane
    pub text_color: Color,

    /// Background of blocks the last change re-rendered indirectly
    pub reconverted_bg: Color,

    /// Foreground of enabled commands in the status bar
    pub command_enabled_fg: Color,

    /// Foreground of disabled commands in the status bar
    pub command_disabled_fg: Color,

    /// Foreground color for the scrollbar knob
    pub scrollbar_knob_fg: Color,

    /// Foreground color for the scrollbar track
    pub scrollbar_track_fg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::Reset,
            status_bar_fg: Color::White,
            status_bar_bg: Color::Blue,
            filename_color: Color::LightYellow,
            marker_color: Color::LightCyan,
            indent_guide_color: Color::DarkGray,
            block_name_color: Color::Magenta,
            tag_color: Color::LightBlue,
            attribute_color: Color::Yellow,
            text_color: Color::Reset,
            reconverted_bg: Color::DarkGray,
            command_enabled_fg: Color::White,
            command_disabled_fg: Color::Gray,
            scrollbar_knob_fg: Color::Reset,
            scrollbar_track_fg: Color::DarkGray,
        }
    }
}

impl Theme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_bar_style(&self) -> Style {
        Style::default()
            .fg(self.status_bar_fg)
            .bg(self.status_bar_bg)
    }

    pub fn filename_style(&self) -> Style {
        Style::default().fg(self.filename_color)
    }

    pub fn marker_style(&self) -> Style {
        Style::default()
            .fg(self.marker_color)
            .add_modifier(Modifier::BOLD)
    }

    pub fn indent_guide_style(&self) -> Style {
        Style::default().fg(self.indent_guide_color)
    }

    pub fn block_name_style(&self) -> Style {
        Style::default().fg(self.block_name_color)
    }

    pub fn tag_style(&self) -> Style {
        Style::default().fg(self.tag_color)
    }

    pub fn attribute_style(&self) -> Style {
        Style::default().fg(self.attribute_color)
    }

    pub fn text_style(&self) -> Style {
        Style::default().fg(self.text_color)
    }

    pub fn reconverted_style(&self) -> Style {
        Style::default().bg(self.reconverted_bg)
    }

    /// Style of a command name in the status bar; active commands are bold.
    pub fn command_style(&self, enabled: bool, active: bool) -> Style {
        let style = if enabled {
            Style::default().fg(self.command_enabled_fg)
        } else {
            Style::default()
                .fg(self.command_disabled_fg)
                .add_modifier(Modifier::DIM)
        };
        if active {
            style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            style
        }
    }

    pub fn scrollbar_knob_style(&self) -> Style {
        Style::default().fg(self.scrollbar_knob_fg)
    }

    pub fn scrollbar_track_style(&self) -> Style {
        Style::default().fg(self.scrollbar_track_fg)
    }
}
