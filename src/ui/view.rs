use std::time::{Duration, Instant};

use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::{AppState, PadAction, PADS};
use crate::input;
use crate::params::ALL_PARAMS;
use crate::synth::engines::ALL_ENGINES;
use crate::ui::layout::{PerformLayout, ScreenLayout};
use crate::ui::theme;
use crate::ui::widgets::{KeyboardHintWidget, ParamBarWidget, WaveformWidget};

/// How long a beat light stays lit.
const FLASH: Duration = Duration::from_millis(150);

pub fn render(state: &AppState, frame: &mut Frame) {
    let layout = ScreenLayout::new(frame.area());
    render_header(state, frame, layout.header);

    let main = PerformLayout::new(layout.main);
    render_controls(state, frame, main.controls);
    render_waveform(state, frame, main.waveform);

    frame.render_widget(
        KeyboardHintWidget {
            hints: input::key_hints(),
        },
        layout.footer,
    );
}

fn flash_active(stamp: Option<Instant>) -> bool {
    stamp.map(|t| t.elapsed() < FLASH).unwrap_or(false)
}

fn render_header(state: &AppState, frame: &mut Frame, area: Rect) {
    let mut spans: Vec<Span> = Vec::new();
    for engine in ALL_ENGINES {
        let label = format!(" {} ", engine.label());
        let style = if engine == state.engine {
            Style::default().fg(theme::BG).bg(theme::ACCENT)
        } else {
            Style::default().fg(theme::DIM)
        };
        spans.push(Span::styled(label, style));
        spans.push(Span::raw(" "));
    }

    spans.push(Span::styled("  KEY ", Style::default().fg(theme::DIM)));
    spans.push(Span::styled(state.key(), Style::default().fg(theme::FG)));

    if state.clock_synced {
        spans.push(Span::styled("  SYNC", Style::default().fg(theme::SYNC_GREEN)));
        let bpm = state
            .external_bpm
            .map(|b| format!(" {:>3.0}", b))
            .unwrap_or_else(|| " ---".to_string());
        spans.push(Span::styled(bpm, Style::default().fg(theme::SYNC_GREEN)));
    } else {
        spans.push(Span::styled("  FREE", Style::default().fg(theme::DIM)));
    }

    let beat = if flash_active(state.last_beat) {
        Span::styled(" ●", Style::default().fg(theme::BEAT_GOLD))
    } else {
        Span::styled(" ○", Style::default().fg(theme::DIM))
    };
    spans.push(beat);
    let off = if flash_active(state.last_off_beat) {
        Span::styled("●", Style::default().fg(theme::OFFBEAT_BLUE))
    } else {
        Span::styled("○", Style::default().fg(theme::DIM))
    };
    spans.push(off);

    if state.recording {
        spans.push(Span::styled("  ● REC", Style::default().fg(theme::RECORD_RED)));
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .style(Style::default().bg(theme::HEADER_BG));
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_controls(state: &AppState, frame: &mut Frame, area: Rect) {
    if area.height < 4 {
        return;
    }

    // Arp status line
    let mut spans: Vec<Span> = vec![Span::styled("ARP ", Style::default().fg(theme::DIM))];
    match state.arp_pattern {
        Some(pattern) => {
            let color = if state.arp_active {
                theme::ACCENT
            } else {
                theme::DIM
            };
            spans.push(Span::styled(pattern.label(), Style::default().fg(color)));
            if state.arp_active {
                spans.push(Span::styled(" ▶", Style::default().fg(theme::SYNC_GREEN)));
            }
        }
        None => spans.push(Span::styled("OFF", Style::default().fg(theme::DIM))),
    }
    spans.push(Span::styled(
        format!("   VOICES {}", state.voice_count),
        Style::default().fg(theme::DIM),
    ));
    let level_blocks = (state.master_level * 24.0).min(8.0) as usize;
    let bar: String = (0..8usize)
        .map(|i| if i < level_blocks { '▮' } else { '·' })
        .collect();
    spans.push(Span::styled("   LVL ", Style::default().fg(theme::DIM)));
    spans.push(Span::styled(bar, Style::default().fg(theme::SYNC_GREEN)));
    frame.render_widget(
        Paragraph::new(Line::from(spans)),
        Rect { height: 1, ..area },
    );

    // Pad labels
    let mut pad_spans: Vec<Span> = Vec::new();
    for (i, (label, action)) in PADS.iter().enumerate() {
        let armed = matches!(
            (*action, state.arp_pattern),
            (PadAction::Arp(p), Some(q)) if p == q
        );
        let style = if armed {
            Style::default().fg(theme::BG).bg(theme::ACCENT)
        } else {
            Style::default().fg(theme::FG)
        };
        pad_spans.push(Span::styled(format!("F{}:{}", i + 1, label), style));
        pad_spans.push(Span::raw(" "));
    }
    frame.render_widget(
        Paragraph::new(Line::from(pad_spans)),
        Rect {
            y: area.y + 1,
            height: 1,
            ..area
        },
    );

    // Parameter bars
    for (i, param) in ALL_PARAMS.iter().enumerate() {
        let y = area.y + 3 + i as u16;
        if y >= area.y + area.height {
            break;
        }
        frame.render_widget(
            ParamBarWidget {
                label: param.label(),
                value: state.params.get(*param),
                selected: i == state.selected_param,
            },
            Rect {
                y,
                height: 1,
                ..area
            },
        );
    }
}

fn render_waveform(state: &AppState, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::LEFT)
        .style(Style::default().fg(theme::DIM));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(
        WaveformWidget {
            data: state.waveform.clone(),
        },
        inner,
    );
}
