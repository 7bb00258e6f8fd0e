use std::time::Instant;

use crate::arp::ArpPattern;
use crate::params::{Param, ParamStore, ALL_PARAMS, PARAM_COUNT};
use crate::synth::engines::EngineKind;

pub const KEYS: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// What a performance pad does when struck.
#[derive(Debug, Clone, Copy)]
pub enum PadAction {
    Chord(&'static str),
    Arp(ArpPattern),
}

pub const PADS: [(&str, PadAction); 8] = [
    ("MAJ", PadAction::Chord("maj")),
    ("MIN", PadAction::Chord("min")),
    ("SUS4", PadAction::Chord("sus4")),
    ("DIM", PadAction::Chord("dim")),
    ("UP", PadAction::Arp(ArpPattern::Up)),
    ("DOWN", PadAction::Arp(ArpPattern::Down)),
    ("RAND", PadAction::Arp(ArpPattern::Random)),
    ("EVOLVE", PadAction::Arp(ArpPattern::AsPlayed)),
];

pub struct AppState {
    pub engine: EngineKind,
    pub params: ParamStore,
    /// Index into ALL_PARAMS for keyboard editing
    pub selected_param: usize,
    pub arp_active: bool,
    pub arp_pattern: Option<ArpPattern>,
    pub clock_synced: bool,
    pub external_bpm: Option<f64>,
    pub last_beat: Option<Instant>,
    pub last_off_beat: Option<Instant>,
    pub recording: bool,
    pub master_level: f32,
    pub voice_count: usize,
    pub key_index: usize,
    pub waveform: Vec<f32>,
    pub should_quit: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            engine: EngineKind::Analog,
            params: ParamStore::new(),
            selected_param: Param::FilterCutoff.index(),
            arp_active: false,
            arp_pattern: None,
            clock_synced: false,
            external_bpm: None,
            last_beat: None,
            last_off_beat: None,
            recording: false,
            master_level: 0.0,
            voice_count: 0,
            key_index: 0,
            waveform: Vec::new(),
            should_quit: false,
        }
    }

    pub fn selected(&self) -> Param {
        ALL_PARAMS[self.selected_param]
    }

    pub fn select_next_param(&mut self) {
        self.selected_param = (self.selected_param + 1) % PARAM_COUNT;
    }

    pub fn select_prev_param(&mut self) {
        self.selected_param = (self.selected_param + PARAM_COUNT - 1) % PARAM_COUNT;
    }

    pub fn key(&self) -> &'static str {
        KEYS[self.key_index]
    }

    pub fn cycle_key(&mut self) {
        self.key_index = (self.key_index + 1) % KEYS.len();
    }
}
