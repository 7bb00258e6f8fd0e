use ratatui::style::Color;

/// Night-garden palette
pub const BG: Color = Color::Rgb(12, 10, 26);
pub const FG: Color = Color::Rgb(205, 200, 220);
pub const DIM: Color = Color::Rgb(85, 80, 105);
pub const ACCENT: Color = Color::Rgb(170, 110, 255); // Orchid violet
pub const RECORD_RED: Color = Color::Rgb(220, 50, 50);
pub const SYNC_GREEN: Color = Color::Rgb(60, 220, 130);
pub const BEAT_GOLD: Color = Color::Rgb(255, 200, 60);
pub const OFFBEAT_BLUE: Color = Color::Rgb(90, 160, 255);
pub const WAVE: Color = Color::Rgb(120, 220, 200);
pub const HEADER_BG: Color = Color::Rgb(28, 24, 48);
