use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::arp::Arpeggiator;
use crate::chord;
use crate::messages::{AudioCmd, InputEvent, UiUpdate};
use crate::params::{Param, ParamStore, CC_PLAY, CC_RECORD, CC_STOP};
use crate::synth::engines::EngineKind;

/// Fallback wait when no timer is pending.
const IDLE_WAIT: Duration = Duration::from_millis(100);

/// The control core: owns the parameter store, the arpeggiator and the
/// chord/key state, and serializes every event source (decoded controller
/// events, the free-running step timer, user controls) on one thread.
pub struct Controller {
    params: ParamStore,
    arp: Arpeggiator,
    engine: EngineKind,
    /// Notes sounded by the current chord pad, stopped on pad release
    chord_notes: Vec<u8>,
    key: String,
    recording: bool,
    audio_tx: Sender<AudioCmd>,
    ui_tx: Sender<UiUpdate>,
}

impl Controller {
    pub fn new(audio_tx: Sender<AudioCmd>, ui_tx: Sender<UiUpdate>) -> Self {
        Self {
            params: ParamStore::new(),
            arp: Arpeggiator::new(),
            engine: EngineKind::Analog,
            chord_notes: Vec::new(),
            key: "C".to_string(),
            recording: false,
            audio_tx,
            ui_tx,
        }
    }

    /// Event loop: wait for input until the next timer deadline, then fire
    /// whatever came due. Exits when the input side hangs up.
    pub fn run(mut self, rx: Receiver<InputEvent>) {
        self.push_all_params();
        loop {
            let now = Instant::now();
            let timeout = self
                .arp
                .next_deadline()
                .map(|at| at.saturating_duration_since(now))
                .unwrap_or(IDLE_WAIT);
            match rx.recv_timeout(timeout) {
                Ok(event) => self.handle(event, Instant::now()),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            self.arp
                .run_due(Instant::now(), &self.params, &self.audio_tx);
        }
    }

    fn handle(&mut self, event: InputEvent, now: Instant) {
        match event {
            InputEvent::NoteOn(note, _velocity) => {
                if !self.arp.note_on(note, now, &self.params, &self.audio_tx) {
                    let _ = self.audio_tx.try_send(AudioCmd::NoteOn(note));
                }
            }
            InputEvent::NoteOff(note) => {
                if !self.arp.note_off(note, &self.audio_tx) {
                    let _ = self.audio_tx.try_send(AudioCmd::NoteOff(note));
                }
            }
            InputEvent::ControlChange(cc, value) => self.control_change(cc, value, now),
            InputEvent::ClockTick => {
                if let Some(summary) = self.arp.on_clock_tick(now, &self.params, &self.audio_tx) {
                    let _ = self.ui_tx.try_send(UiUpdate::ClockSynced(true));
                    let _ = self.ui_tx.try_send(UiUpdate::ExternalBpm(summary.bpm));
                    if summary.events.beat {
                        let _ = self.ui_tx.try_send(UiUpdate::Beat);
                    }
                    if summary.events.off_beat {
                        let _ = self.ui_tx.try_send(UiUpdate::OffBeat);
                    }
                }
            }
            InputEvent::TransportStart => {
                self.arp.transport_start();
                let _ = self.ui_tx.try_send(UiUpdate::ClockSynced(true));
                self.send_arp_status();
            }
            InputEvent::TransportContinue => {
                self.arp.transport_continue();
                let _ = self.ui_tx.try_send(UiUpdate::ClockSynced(true));
                self.send_arp_status();
            }
            InputEvent::TransportStop => {
                self.arp.transport_stop(&self.audio_tx);
                let _ = self.ui_tx.try_send(UiUpdate::ClockSynced(false));
                let _ = self.ui_tx.try_send(UiUpdate::ExternalBpm(None));
                self.send_arp_status();
            }
            InputEvent::Play => {
                self.arp.handle_play(now, &self.params, &self.audio_tx);
                self.send_arp_status();
            }
            InputEvent::Stop => {
                self.arp.handle_stop(&self.audio_tx);
                self.send_arp_status();
            }
            InputEvent::RecordToggle => {
                self.recording = !self.recording;
                let _ = self.ui_tx.try_send(UiUpdate::Recording(self.recording));
            }
            InputEvent::SelectPattern(pattern) => {
                self.arp
                    .select_pattern(pattern, now, &self.params, &self.audio_tx);
                self.send_arp_status();
            }
            InputEvent::ChordOn(descriptor) => {
                self.stop_chord();
                let notes = chord::resolve(&descriptor, &self.key);
                for &note in &notes {
                    let _ = self.audio_tx.try_send(AudioCmd::NoteOn(note));
                }
                self.chord_notes = notes;
            }
            InputEvent::ChordOff => self.stop_chord(),
            InputEvent::SetParam(param, value) => self.set_param(param, value, false),
            InputEvent::SetEngine(kind) => {
                self.engine = kind;
                let _ = self.audio_tx.try_send(AudioCmd::SetEngine(kind));
            }
            InputEvent::SetKey(key) => self.key = key,
        }
    }

    fn control_change(&mut self, cc: u8, value: u8, now: Instant) {
        match cc {
            CC_PLAY | CC_STOP | CC_RECORD if value > 64 => match cc {
                CC_PLAY => {
                    self.arp.handle_play(now, &self.params, &self.audio_tx);
                    self.send_arp_status();
                }
                CC_STOP => {
                    self.arp.handle_stop(&self.audio_tx);
                    self.send_arp_status();
                }
                _ => {
                    self.recording = !self.recording;
                    let _ = self.ui_tx.try_send(UiUpdate::Recording(self.recording));
                }
            },
            CC_PLAY | CC_STOP | CC_RECORD => {}
            _ => {
                if let Some(param) = Param::from_cc(cc) {
                    let scaled = (value as f32 / 127.0 * 100.0).round();
                    self.set_param(param, scaled, true);
                }
            }
        }
    }

    fn set_param(&mut self, param: Param, value: f32, from_cc: bool) {
        self.params.set(param, value);
        let value = self.params.get(param);
        match param {
            Param::FilterCutoff => {
                let _ = self.audio_tx.try_send(AudioCmd::SetFilterCutoff(value));
            }
            Param::FilterResonance => {
                let _ = self.audio_tx.try_send(AudioCmd::SetFilterResonance(value));
            }
            Param::FxDepth => {
                let _ = self.audio_tx.try_send(AudioCmd::SetFxDepth(value));
            }
            Param::MixFx => {
                let _ = self.audio_tx.try_send(AudioCmd::SetMixFx(value));
            }
            Param::Timbre => {
                let _ = self.audio_tx.try_send(AudioCmd::SetTimbre(value));
            }
            Param::Glide => {
                let _ = self.audio_tx.try_send(AudioCmd::SetGlide(value));
            }
            Param::Attack | Param::Decay | Param::Sustain | Param::Release => {
                let _ = self.audio_tx.try_send(AudioCmd::SetAdsr(
                    self.params.get(Param::Attack),
                    self.params.get(Param::Decay),
                    self.params.get(Param::Sustain),
                    self.params.get(Param::Release),
                ));
            }
            // Density, swing and complexity are consumed on this thread
            Param::ArpDensity | Param::Swing | Param::ChordComplexity => {}
        }
        if from_cc {
            let _ = self.ui_tx.try_send(UiUpdate::Param(param, value));
        }
    }

    fn push_all_params(&mut self) {
        for param in crate::params::ALL_PARAMS {
            let value = self.params.get(param);
            self.set_param(param, value, false);
        }
        let _ = self.audio_tx.try_send(AudioCmd::SetEngine(self.engine));
    }

    fn stop_chord(&mut self) {
        for note in std::mem::take(&mut self.chord_notes) {
            let _ = self.audio_tx.try_send(AudioCmd::NoteOff(note));
        }
    }

    fn send_arp_status(&self) {
        let _ = self.ui_tx.try_send(UiUpdate::ArpStatus {
            active: self.arp.is_active(),
            pattern: self.arp.pattern(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arp::ArpPattern;
    use crossbeam_channel::unbounded;

    fn setup() -> (
        Controller,
        Receiver<AudioCmd>,
        Receiver<UiUpdate>,
    ) {
        let (audio_tx, audio_rx) = unbounded();
        let (ui_tx, ui_rx) = unbounded();
        (Controller::new(audio_tx, ui_tx), audio_rx, ui_rx)
    }

    fn drain_audio(rx: &Receiver<AudioCmd>) -> Vec<AudioCmd> {
        rx.try_iter().collect()
    }

    #[test]
    fn direct_notes_reach_the_voice_engine() {
        let (mut ctl, audio_rx, _ui) = setup();
        let now = Instant::now();
        ctl.handle(InputEvent::NoteOn(60, 100), now);
        ctl.handle(InputEvent::NoteOff(60), now);
        let cmds = drain_audio(&audio_rx);
        assert!(matches!(cmds[0], AudioCmd::NoteOn(60)));
        assert!(matches!(cmds[1], AudioCmd::NoteOff(60)));
    }

    #[test]
    fn armed_arp_consumes_notes() {
        let (mut ctl, audio_rx, _ui) = setup();
        let now = Instant::now();
        ctl.handle(InputEvent::SelectPattern(ArpPattern::Up), now);
        let _ = drain_audio(&audio_rx);
        ctl.handle(InputEvent::NoteOn(60, 100), now);
        // The arp sounds the note itself (first step fires immediately)
        let cmds = drain_audio(&audio_rx);
        assert!(matches!(cmds[0], AudioCmd::NoteOn(60)));
        assert!(ctl.arp.is_active());
    }

    #[test]
    fn cutoff_cc_maps_and_reports() {
        let (mut ctl, audio_rx, ui_rx) = setup();
        ctl.handle(InputEvent::ControlChange(74, 127), Instant::now());
        let cmds = drain_audio(&audio_rx);
        assert!(cmds
            .iter()
            .any(|c| matches!(c, AudioCmd::SetFilterCutoff(v) if (*v - 100.0).abs() < 1e-6)));
        let updates: Vec<UiUpdate> = ui_rx.try_iter().collect();
        assert!(updates
            .iter()
            .any(|u| matches!(u, UiUpdate::Param(Param::FilterCutoff, _))));
    }

    #[test]
    fn envelope_ccs_dispatch_the_whole_adsr() {
        let (mut ctl, audio_rx, _ui) = setup();
        ctl.handle(InputEvent::ControlChange(82, 0), Instant::now());
        let cmds = drain_audio(&audio_rx);
        match cmds.last() {
            Some(AudioCmd::SetAdsr(a, d, s, r)) => {
                assert_eq!(*a, 5.0);
                assert_eq!(*d, 20.0);
                assert_eq!(*s, 0.0);
                assert_eq!(*r, 30.0);
            }
            other => panic!("expected SetAdsr, got {:?}", other),
        }
    }

    #[test]
    fn transport_ccs_need_the_press_threshold() {
        let (mut ctl, _audio, ui_rx) = setup();
        ctl.handle(InputEvent::ControlChange(CC_RECORD, 10), Instant::now());
        assert!(ui_rx.try_iter().count() == 0);
        ctl.handle(InputEvent::ControlChange(CC_RECORD, 127), Instant::now());
        let updates: Vec<UiUpdate> = ui_rx.try_iter().collect();
        assert!(updates
            .iter()
            .any(|u| matches!(u, UiUpdate::Recording(true))));
    }

    #[test]
    fn chord_pads_play_and_release_voicings() {
        let (mut ctl, audio_rx, _ui) = setup();
        let now = Instant::now();
        ctl.handle(InputEvent::ChordOn("Am7".to_string()), now);
        let ons: Vec<u8> = drain_audio(&audio_rx)
            .into_iter()
            .filter_map(|c| match c {
                AudioCmd::NoteOn(n) => Some(n),
                _ => None,
            })
            .collect();
        assert_eq!(ons.len(), 4);

        ctl.handle(InputEvent::ChordOff, now);
        let offs: Vec<u8> = drain_audio(&audio_rx)
            .into_iter()
            .filter_map(|c| match c {
                AudioCmd::NoteOff(n) => Some(n),
                _ => None,
            })
            .collect();
        assert_eq!(offs, ons);
    }

    #[test]
    fn new_chord_stops_the_previous_one() {
        let (mut ctl, audio_rx, _ui) = setup();
        let now = Instant::now();
        ctl.handle(InputEvent::ChordOn("C".to_string()), now);
        let first = drain_audio(&audio_rx).len();
        assert_eq!(first, 3);
        ctl.handle(InputEvent::ChordOn("G".to_string()), now);
        let cmds = drain_audio(&audio_rx);
        let offs = cmds
            .iter()
            .filter(|c| matches!(c, AudioCmd::NoteOff(_)))
            .count();
        let ons = cmds
            .iter()
            .filter(|c| matches!(c, AudioCmd::NoteOn(_)))
            .count();
        assert_eq!(offs, 3);
        assert_eq!(ons, 3);
    }

    #[test]
    fn bare_quality_uses_the_selected_key() {
        let (mut ctl, audio_rx, _ui) = setup();
        let now = Instant::now();
        ctl.handle(InputEvent::SetKey("D".to_string()), now);
        ctl.handle(InputEvent::ChordOn("maj".to_string()), now);
        let ons: Vec<u8> = drain_audio(&audio_rx)
            .into_iter()
            .filter_map(|c| match c {
                AudioCmd::NoteOn(n) => Some(n),
                _ => None,
            })
            .collect();
        assert_eq!(ons[0] % 12, 2);
    }

    #[test]
    fn clock_ticks_report_sync_and_tempo() {
        let (mut ctl, _audio, ui_rx) = setup();
        let start = Instant::now();
        for i in 0..4u64 {
            ctl.handle(InputEvent::ClockTick, start + Duration::from_millis(i * 21));
        }
        let updates: Vec<UiUpdate> = ui_rx.try_iter().collect();
        assert!(updates
            .iter()
            .any(|u| matches!(u, UiUpdate::ClockSynced(true))));
        assert!(updates
            .iter()
            .any(|u| matches!(u, UiUpdate::ExternalBpm(Some(_)))));
        assert!(updates.iter().any(|u| matches!(u, UiUpdate::Beat)));
    }

    #[test]
    fn transport_stop_reports_free_running() {
        let (mut ctl, _audio, ui_rx) = setup();
        let now = Instant::now();
        ctl.handle(InputEvent::TransportStart, now);
        let _ = ui_rx.try_iter().count();
        ctl.handle(InputEvent::TransportStop, now);
        let updates: Vec<UiUpdate> = ui_rx.try_iter().collect();
        assert!(updates
            .iter()
            .any(|u| matches!(u, UiUpdate::ClockSynced(false))));
        assert!(updates
            .iter()
            .any(|u| matches!(u, UiUpdate::ExternalBpm(None))));
    }

    #[test]
    fn unknown_chord_root_degrades_to_silence() {
        let (mut ctl, audio_rx, _ui) = setup();
        ctl.handle(InputEvent::SetKey("X".to_string()), Instant::now());
        ctl.handle(InputEvent::ChordOn("maj".to_string()), Instant::now());
        assert!(drain_audio(&audio_rx).is_empty());
    }
}
