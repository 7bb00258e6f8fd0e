use crate::arp::ArpPattern;
use crate::params::Param;
use crate::synth::engines::EngineKind;

/// Messages from UI thread → control thread. Note/CC/clock/transport events
/// arrive here already decoded, whether they came from the keyboard map or a
/// MIDI front end.
#[derive(Debug, Clone)]
pub enum InputEvent {
    /// (note_number, velocity)
    NoteOn(u8, u8),
    NoteOff(u8),
    /// (controller, value 0-127)
    ControlChange(u8, u8),
    ClockTick,
    TransportStart,
    TransportContinue,
    TransportStop,
    /// User-facing play control (distinct from external transport)
    Play,
    Stop,
    RecordToggle,
    /// Arm/disarm an arp pattern pad
    SelectPattern(ArpPattern),
    /// Chord pad down, descriptor string ("Am7", "maj", ...)
    ChordOn(String),
    /// Chord pad up: release the sounding chord
    ChordOff,
    /// Direct parameter write, value 0-100
    SetParam(Param, f32),
    SetEngine(EngineKind),
    /// Root key for bare chord qualities
    SetKey(String),
}

/// Messages from control thread → audio thread. Parameter values cross raw
/// (0-100); the audio side maps them through its own curves.
#[derive(Debug, Clone, Copy)]
pub enum AudioCmd {
    NoteOn(u8),
    NoteOff(u8),
    SetEngine(EngineKind),
    SetTimbre(f32),
    /// (attack, decay, sustain, release)
    SetAdsr(f32, f32, f32, f32),
    SetGlide(f32),
    SetFilterCutoff(f32),
    SetFilterResonance(f32),
    SetFxDepth(f32),
    SetMixFx(f32),
}

/// Messages from audio thread → UI thread
#[derive(Debug, Clone, Copy)]
pub enum AudioMsg {
    MasterLevel(f32),
    ActiveVoices(usize),
}

/// Messages from control thread → UI thread
#[derive(Debug, Clone)]
pub enum UiUpdate {
    ExternalBpm(Option<f64>),
    ClockSynced(bool),
    /// Quarter-note boundary on the external clock
    Beat,
    /// Swing-adjusted off-beat on the external clock
    OffBeat,
    ArpStatus {
        active: bool,
        pattern: Option<ArpPattern>,
    },
    /// Parameter changed outside the UI (control-change input)
    Param(Param, f32),
    Recording(bool),
}

/// Key-driven UI actions resolved by the main loop
#[derive(Debug, Clone)]
pub enum UiEvent {
    Quit,
    /// Piano key press (auto-released after a hold window)
    NoteOn(u8),
    /// Performance pad 1-8 (chords and arp patterns)
    Pad(usize),
    /// Cycle engine: -1 previous, +1 next
    SelectEngine(i8),
    /// Move parameter selection: -1 left, +1 right
    SelectParam(i8),
    /// Adjust the selected parameter by a 0-100 delta
    AdjustParam(f32),
    Play,
    Stop,
    RecordToggle,
    CycleKey,
}
