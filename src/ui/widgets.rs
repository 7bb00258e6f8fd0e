use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::Widget;

use crate::ui::theme;

pub struct KeyboardHintWidget {
    pub hints: Vec<(&'static str, &'static str)>,
}

impl Widget for KeyboardHintWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 1 {
            return;
        }

        let mut x = area.x + 1;
        let y = area.y;

        for (key, desc) in &self.hints {
            if x + (key.len() + desc.len() + 3) as u16 > area.x + area.width {
                break;
            }
            buf.set_string(x, y, key, Style::default().fg(theme::ACCENT));
            x += key.len() as u16;
            buf.set_string(x, y, ":", Style::default().fg(theme::DIM));
            x += 1;
            buf.set_string(x, y, desc, Style::default().fg(theme::FG));
            x += desc.len() as u16 + 2;
        }
    }
}

/// Magnitude waveform drawn up from the midline, one column per bucket.
pub struct WaveformWidget {
    pub data: Vec<f32>,
}

impl Widget for WaveformWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 4 || area.height < 3 {
            return;
        }

        let wave_width = area.width.saturating_sub(2) as usize;
        let wave_height = area.height.saturating_sub(1);
        let mid_y = area.y + area.height / 2;

        if self.data.is_empty() {
            for x in 0..wave_width as u16 {
                buf.set_string(area.x + 1 + x, mid_y, "·", Style::default().fg(theme::DIM));
            }
            return;
        }

        let half_h = wave_height as f32 / 2.0;
        for i in 0..wave_width {
            let idx = i * self.data.len() / wave_width;
            let sample = self.data[idx.min(self.data.len() - 1)].clamp(0.0, 1.0);
            let height = (sample * half_h * 4.0).min(half_h) as u16;

            let x = area.x + 1 + i as u16;
            if height == 0 {
                buf.set_string(x, mid_y, "·", Style::default().fg(theme::DIM));
            } else {
                for dy in 0..=height {
                    if mid_y >= dy && mid_y - dy >= area.y {
                        buf.set_string(x, mid_y - dy, "│", Style::default().fg(theme::WAVE));
                    }
                    let below = mid_y + dy;
                    if below < area.y + area.height {
                        buf.set_string(x, below, "│", Style::default().fg(theme::WAVE));
                    }
                }
            }
        }
    }
}

/// One-line parameter bar: label, gauge, value.
pub struct ParamBarWidget {
    pub label: &'static str,
    pub value: f32, // 0-100
    pub selected: bool,
}

impl Widget for ParamBarWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 24 || area.height < 1 {
            return;
        }
        let color = if self.selected {
            theme::ACCENT
        } else {
            theme::FG
        };
        let marker = if self.selected { ">" } else { " " };
        buf.set_string(area.x, area.y, marker, Style::default().fg(theme::ACCENT));
        buf.set_string(area.x + 1, area.y, self.label, Style::default().fg(color));

        let bar_x = area.x + 10;
        let bar_len = (area.width - 16) as usize;
        let filled = (self.value / 100.0 * bar_len as f32).round() as usize;
        for i in 0..bar_len {
            let (ch, c) = if i < filled {
                ("█", color)
            } else {
                ("─", theme::DIM)
            };
            buf.set_string(bar_x + i as u16, area.y, ch, Style::default().fg(c));
        }
        let val = format!("{:>3.0}", self.value);
        buf.set_string(
            bar_x + bar_len as u16 + 1,
            area.y,
            val,
            Style::default().fg(color),
        );
    }
}
