use crossterm::event::{KeyCode, KeyEvent};

use crate::messages::UiEvent;

/// Map keyboard input to a UI event.
pub fn handle_key(key: KeyEvent) -> Option<UiEvent> {
    // Global keys first; Q stays a piano key, so Esc is the only quit
    match key.code {
        KeyCode::Esc => return Some(UiEvent::Quit),
        KeyCode::Char(' ') => return Some(UiEvent::Play),
        KeyCode::Enter => return Some(UiEvent::Stop),
        KeyCode::Char('r') => return Some(UiEvent::RecordToggle),
        KeyCode::Char('k') => return Some(UiEvent::CycleKey),
        _ => {}
    }

    // Performance pads on F1-F8
    if let KeyCode::F(n @ 1..=8) = key.code {
        return Some(UiEvent::Pad(n as usize - 1));
    }

    // QWERTY piano mapping
    // Bottom row: Z=C3, S=C#3, X=D3, D=D#3, C=E3, V=F3, G=F#3, B=G3, H=G#3, N=A3, J=A#3, M=B3
    // Top row: Q=C4, 2=C#4, W=D4, 3=D#4, E=E4, 4=F4, 5=F#4, T=G4, 6=G#4, Y=A4, 7=A#4, U=B4
    let note = match key.code {
        // C3 = MIDI 48
        KeyCode::Char('z') => Some(48u8),
        KeyCode::Char('s') => Some(49),
        KeyCode::Char('x') => Some(50),
        KeyCode::Char('d') => Some(51),
        KeyCode::Char('c') => Some(52),
        KeyCode::Char('v') => Some(53),
        KeyCode::Char('g') => Some(54),
        KeyCode::Char('b') => Some(55),
        KeyCode::Char('h') => Some(56),
        KeyCode::Char('n') => Some(57),
        KeyCode::Char('j') => Some(58),
        KeyCode::Char('m') => Some(59),
        // C4 = MIDI 60
        KeyCode::Char('q') => Some(60),
        KeyCode::Char('2') => Some(61),
        KeyCode::Char('w') => Some(62),
        KeyCode::Char('3') => Some(63),
        KeyCode::Char('e') => Some(64),
        KeyCode::Char('4') => Some(65),
        KeyCode::Char('5') => Some(66),
        KeyCode::Char('t') => Some(67),
        KeyCode::Char('6') => Some(68),
        KeyCode::Char('y') => Some(69),
        KeyCode::Char('7') => Some(70),
        KeyCode::Char('u') => Some(71),
        _ => None,
    };
    if let Some(n) = note {
        return Some(UiEvent::NoteOn(n));
    }

    match key.code {
        KeyCode::Left => Some(UiEvent::SelectEngine(-1)),
        KeyCode::Right => Some(UiEvent::SelectEngine(1)),
        KeyCode::Up => Some(UiEvent::AdjustParam(5.0)),
        KeyCode::Down => Some(UiEvent::AdjustParam(-5.0)),
        KeyCode::Char('[') => Some(UiEvent::SelectParam(-1)),
        KeyCode::Char(']') => Some(UiEvent::SelectParam(1)),
        _ => None,
    }
}

/// Key labels for the hint bar
pub fn key_hints() -> Vec<(&'static str, &'static str)> {
    vec![
        ("Z-M/Q-U", "Play"),
        ("F1-F4", "Chords"),
        ("F5-F8", "Arp"),
        ("[/]", "Param"),
        ("↑/↓", "Value"),
        ("←/→", "Engine"),
        ("Space", "Play"),
        ("Enter", "Stop"),
        ("R", "Arm"),
        ("K", "Key"),
        ("Esc", "Quit"),
    ]
}
