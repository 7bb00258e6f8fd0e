#![allow(dead_code)]

mod app;
mod arp;
mod audio;
mod chord;
mod constants;
mod controller;
mod input;
mod messages;
mod params;
mod synth;
mod ui;

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::app::{AppState, PadAction, PADS};
use crate::audio::engine::AudioEngine;
use crate::audio::tap;
use crate::constants::{CHANNEL_CAPACITY, UI_FPS};
use crate::controller::Controller;
use crate::messages::{AudioMsg, InputEvent, UiEvent, UiUpdate};

fn init_logging(verbose: bool) {
    use simplelog::{Config, LevelFilter, WriteLogger};

    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let log_file = File::create("orchid.log")
        .or_else(|_| File::create("/tmp/orchid.log"));
    if let Ok(file) = log_file {
        let _ = WriteLogger::init(level, Config::default(), file);
    }
    log::info!("orchid starting (log level: {:?})", level);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let verbose = std::env::args().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    // --- Setup channels ---
    let (audio_cmd_tx, audio_cmd_rx) = bounded(CHANNEL_CAPACITY);
    let (audio_msg_tx, audio_msg_rx) = bounded(CHANNEL_CAPACITY);
    let (input_tx, input_rx) = bounded::<InputEvent>(CHANNEL_CAPACITY);
    let (ui_update_tx, ui_update_rx) = bounded(CHANNEL_CAPACITY);

    // --- Audio engine ---
    let engine = AudioEngine::new();
    let tap_handle = Arc::clone(&engine.tap);

    // If no device exists the command channel hangs up and every engine
    // call degrades to a silent no-op; the control surface keeps working.
    let _stream = match engine.start(audio_cmd_rx, audio_msg_tx) {
        Ok(stream) => Some(stream),
        Err(e) => {
            eprintln!("Warning: audio engine failed to start: {}", e);
            eprintln!("Running without sound.");
            None
        }
    };

    // --- Control thread ---
    let controller = Controller::new(audio_cmd_tx, ui_update_tx);
    std::thread::spawn(move || controller.run(input_rx));

    run_ui_loop(input_tx, ui_update_rx, audio_msg_rx, tap_handle)
}

fn run_ui_loop(
    input_tx: Sender<InputEvent>,
    ui_update_rx: Receiver<UiUpdate>,
    audio_msg_rx: Receiver<AudioMsg>,
    tap_handle: Arc<Mutex<Vec<f32>>>,
) -> Result<(), Box<dyn std::error::Error>> {
    // --- Terminal setup ---
    enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut state = AppState::new();
    let frame_duration = Duration::from_millis(1000 / UI_FPS);

    // Most terminals don't report key releases, so notes and chord pads
    // auto-release after a hold window
    let mut active_notes: HashMap<u8, Instant> = HashMap::new();
    let mut chord_pressed_at: Option<Instant> = None;
    let note_duration = Duration::from_millis(200);
    let chord_duration = Duration::from_millis(350);
    let mut frame_count: u64 = 0;

    loop {
        let frame_start = Instant::now();

        // --- Control-thread updates ---
        while let Ok(update) = ui_update_rx.try_recv() {
            match update {
                UiUpdate::ExternalBpm(bpm) => state.external_bpm = bpm,
                UiUpdate::ClockSynced(synced) => state.clock_synced = synced,
                UiUpdate::Beat => state.last_beat = Some(Instant::now()),
                UiUpdate::OffBeat => state.last_off_beat = Some(Instant::now()),
                UiUpdate::ArpStatus { active, pattern } => {
                    state.arp_active = active;
                    state.arp_pattern = pattern;
                }
                UiUpdate::Param(param, value) => state.params.set(param, value),
                UiUpdate::Recording(on) => state.recording = on,
            }
        }

        // --- Audio-thread updates ---
        while let Ok(msg) = audio_msg_rx.try_recv() {
            match msg {
                AudioMsg::MasterLevel(level) => state.master_level = level,
                AudioMsg::ActiveVoices(count) => state.voice_count = count,
            }
        }

        // --- Keyboard input ---
        if event::poll(Duration::from_millis(1))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(evt) = input::handle_key(key) {
                        handle_ui_event(
                            &mut state,
                            evt,
                            &input_tx,
                            &mut active_notes,
                            &mut chord_pressed_at,
                        );
                    }
                }
            }
        }

        // --- Auto-release held notes and chord pads ---
        let expired: Vec<u8> = active_notes
            .iter()
            .filter(|(_, pressed)| pressed.elapsed() >= note_duration)
            .map(|(note, _)| *note)
            .collect();
        for note in expired {
            active_notes.remove(&note);
            let _ = input_tx.try_send(InputEvent::NoteOff(note));
        }
        if chord_pressed_at.map(|t| t.elapsed() >= chord_duration) == Some(true) {
            chord_pressed_at = None;
            let _ = input_tx.try_send(InputEvent::ChordOff);
        }

        if state.should_quit {
            break;
        }

        // --- Refresh the analysis-tap waveform periodically ---
        frame_count += 1;
        if frame_count % 4 == 0 {
            if let Ok(snapshot) = tap_handle.try_lock() {
                state.waveform = tap::downsample(&snapshot, 160);
            }
        }

        terminal.draw(|frame| ui::view::render(&state, frame))?;

        let elapsed = frame_start.elapsed();
        if elapsed < frame_duration {
            std::thread::sleep(frame_duration - elapsed);
        }
    }

    // --- Cleanup ---
    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}

fn handle_ui_event(
    state: &mut AppState,
    event: UiEvent,
    input_tx: &Sender<InputEvent>,
    active_notes: &mut HashMap<u8, Instant>,
    chord_pressed_at: &mut Option<Instant>,
) {
    match event {
        UiEvent::Quit => state.should_quit = true,
        UiEvent::NoteOn(note) => {
            active_notes.insert(note, Instant::now());
            let _ = input_tx.try_send(InputEvent::NoteOn(note, 100));
        }
        UiEvent::Pad(index) => match PADS[index].1 {
            PadAction::Chord(quality) => {
                *chord_pressed_at = Some(Instant::now());
                let _ = input_tx.try_send(InputEvent::ChordOn(quality.to_string()));
            }
            PadAction::Arp(pattern) => {
                let _ = input_tx.try_send(InputEvent::SelectPattern(pattern));
            }
        },
        UiEvent::SelectEngine(direction) => {
            state.engine = if direction < 0 {
                state.engine.prev()
            } else {
                state.engine.next()
            };
            let _ = input_tx.try_send(InputEvent::SetEngine(state.engine));
        }
        UiEvent::SelectParam(direction) => {
            if direction < 0 {
                state.select_prev_param();
            } else {
                state.select_next_param();
            }
        }
        UiEvent::AdjustParam(delta) => {
            let param = state.selected();
            let value = (state.params.get(param) + delta).clamp(0.0, 100.0);
            state.params.set(param, value);
            let _ = input_tx.try_send(InputEvent::SetParam(param, value));
        }
        UiEvent::Play => {
            let _ = input_tx.try_send(InputEvent::Play);
        }
        UiEvent::Stop => {
            let _ = input_tx.try_send(InputEvent::Stop);
        }
        UiEvent::RecordToggle => {
            let _ = input_tx.try_send(InputEvent::RecordToggle);
        }
        UiEvent::CycleKey => {
            state.cycle_key();
            let _ = input_tx.try_send(InputEvent::SetKey(state.key().to_string()));
        }
    }
}
