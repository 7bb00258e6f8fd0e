use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Main screen layout regions
pub struct ScreenLayout {
    pub header: Rect,
    pub main: Rect,
    pub footer: Rect,
}

impl ScreenLayout {
    pub fn new(area: Rect) -> Self {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),  // Header (engine + transport status)
                Constraint::Min(10),    // Main content
                Constraint::Length(2),  // Footer (key hints)
            ])
            .split(area);

        Self {
            header: chunks[0],
            main: chunks[1],
            footer: chunks[2],
        }
    }
}

/// Performance view: parameters and pads left, waveform right
pub struct PerformLayout {
    pub controls: Rect,
    pub waveform: Rect,
}

impl PerformLayout {
    pub fn new(area: Rect) -> Self {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(42), Constraint::Min(20)])
            .split(area);

        Self {
            controls: chunks[0],
            waveform: chunks[1],
        }
    }
}
