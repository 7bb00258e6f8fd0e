//! Arpeggiator: held-note tracking, pattern stepping, swing timing and the
//! handoff between the internal step timer and an external MIDI clock.

pub mod clock;
pub mod timers;

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;

use crate::messages::AudioCmd;
use crate::params::{self, Param, ParamStore};
use clock::{ClockSync, TickEvents};
use timers::{TimerKind, TimerQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpPattern {
    Up,
    Down,
    Random,
    AsPlayed,
}

impl ArpPattern {
    pub fn label(self) -> &'static str {
        match self {
            ArpPattern::Up => "UP",
            ArpPattern::Down => "DOWN",
            ArpPattern::Random => "RANDOM",
            ArpPattern::AsPlayed => "EVOLVE",
        }
    }
}

/// Summary of one external clock tick, for the front end.
#[derive(Debug, Clone, Copy)]
pub struct TickSummary {
    pub events: TickEvents,
    pub bpm: Option<f64>,
}

/// The arpeggiator state machine.
///
/// Exactly one timing source drives steps at any moment: the internal
/// deadline queue while free-running, the external clock while synced.
/// Every entry point that changes the owner cancels the step timer first.
pub struct Arpeggiator {
    pattern: Option<ArpPattern>,
    active: bool,
    synced: bool,
    /// Set on transport stop so stray ticks don't re-engage sync.
    clock_stopped: bool,
    step: u64,
    last_note: Option<u8>,
    held: BTreeSet<u8>,
    timers: TimerQueue,
    clock: ClockSync,
    rng_state: u64,
}

impl Arpeggiator {
    pub fn new() -> Self {
        Self {
            pattern: None,
            active: false,
            synced: false,
            clock_stopped: false,
            step: 0,
            last_note: None,
            held: BTreeSet::new(),
            timers: TimerQueue::new(),
            clock: ClockSync::new(),
            rng_state: 0x93c4_67e3_7db0_c7a4,
        }
    }

    pub fn pattern(&self) -> Option<ArpPattern> {
        self.pattern
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub fn bpm(&self) -> Option<f64> {
        self.clock.bpm()
    }

    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    /// Earliest pending timer deadline, for the control loop's wait.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Pad press: arm a pattern, or disarm when the armed one is re-selected.
    pub fn select_pattern(
        &mut self,
        pattern: ArpPattern,
        now: Instant,
        params: &ParamStore,
        tx: &Sender<AudioCmd>,
    ) {
        if self.pattern == Some(pattern) {
            self.pattern = None;
            self.active = false;
            self.stop_sounding(tx);
            return;
        }
        self.pattern = Some(pattern);
        self.active = true;
        if !self.held.is_empty() && !self.synced {
            self.start(now, params, tx);
        }
    }

    /// Physical key down. Returns true when the arpeggiator consumed the
    /// note; false means the caller should sound it directly.
    pub fn note_on(
        &mut self,
        note: u8,
        now: Instant,
        params: &ParamStore,
        tx: &Sender<AudioCmd>,
    ) -> bool {
        let was_empty = self.held.is_empty();
        self.held.insert(note);
        if !self.active {
            return false;
        }
        if was_empty && !self.synced {
            self.start(now, params, tx);
        }
        true
    }

    /// Physical key up. Returns true when the arpeggiator consumed it.
    pub fn note_off(&mut self, note: u8, tx: &Sender<AudioCmd>) -> bool {
        self.held.remove(&note);
        if !self.active {
            return false;
        }
        if self.held.is_empty() {
            // Back to armed: silence everything, keep the pattern
            self.stop_sounding(tx);
        }
        true
    }

    /// User play control: resume a previously armed pattern.
    pub fn handle_play(&mut self, now: Instant, params: &ParamStore, tx: &Sender<AudioCmd>) {
        if self.synced || self.pattern.is_none() {
            return;
        }
        self.active = true;
        if !self.held.is_empty() {
            self.start(now, params, tx);
        }
    }

    /// User stop control.
    pub fn handle_stop(&mut self, tx: &Sender<AudioCmd>) {
        if self.synced || !self.active {
            return;
        }
        self.active = false;
        self.stop_sounding(tx);
    }

    /// External transport start: the clock owns stepping from here on. The
    /// sounding note is left for the first synced step to gate-release.
    pub fn transport_start(&mut self) {
        self.synced = true;
        self.clock_stopped = false;
        self.active = true;
        self.clock.reset();
        self.step = 0;
        self.timers.cancel_step();
    }

    pub fn transport_continue(&mut self) {
        self.synced = true;
        self.clock_stopped = false;
        self.active = true;
        self.timers.cancel_step();
    }

    /// External transport stop: silence and clear arp-owned state. The held
    /// set tracks physically depressed keys and is left alone.
    pub fn transport_stop(&mut self, tx: &Sender<AudioCmd>) {
        self.synced = false;
        self.clock_stopped = true;
        self.active = false;
        self.clock.reset();
        self.stop_sounding(tx);
    }

    /// One external clock tick. Returns None for stray ticks after a stop.
    pub fn on_clock_tick(
        &mut self,
        now: Instant,
        params: &ParamStore,
        tx: &Sender<AudioCmd>,
    ) -> Option<TickSummary> {
        if !self.synced {
            if self.clock_stopped {
                return None;
            }
            // A running clock engages sync even without an explicit start
            self.synced = true;
            self.timers.cancel_step();
        }

        let swing = params.get(Param::Swing);
        let density = params.get(Param::ArpDensity);
        let events = self.clock.on_tick(now, swing, density);

        if events.step && self.active && self.pattern.is_some() && !self.held.is_empty() {
            self.step_forward(now, params, tx);
        }

        Some(TickSummary {
            events,
            bpm: self.clock.bpm(),
        })
    }

    /// Fire timers that have come due.
    pub fn run_due(&mut self, now: Instant, params: &ParamStore, tx: &Sender<AudioCmd>) {
        while let Some(kind) = self.timers.pop_due(now) {
            match kind {
                TimerKind::Step => self.fire_step(now, params, tx),
                TimerKind::Release(note) => {
                    let _ = tx.try_send(AudioCmd::NoteOff(note));
                }
            }
        }
    }

    /// Begin free-running: silence leftovers, step once, chain the timer.
    fn start(&mut self, now: Instant, params: &ParamStore, tx: &Sender<AudioCmd>) {
        self.stop_sounding(tx);
        if self.synced {
            return;
        }
        self.fire_step(now, params, tx);
    }

    /// One free-running step plus the schedule for the next.
    fn fire_step(&mut self, now: Instant, params: &ParamStore, tx: &Sender<AudioCmd>) {
        if !self.active || self.held.is_empty() || self.synced {
            self.stop_sounding(tx);
            return;
        }
        self.step_forward(now, params, tx);

        let base = params::arp_interval_ms(params.get(Param::ArpDensity));
        let swing_amt = params::swing_amount(params.get(Param::Swing));
        // Parity of the post-increment counter alternates long/short steps
        let interval = if self.step % 2 != 0 {
            base * (1.0 + swing_amt)
        } else {
            base * (1.0 - swing_amt)
        };
        let interval = interval.max(params::MIN_STEP_MS);
        self.timers
            .schedule_step(now + Duration::from_secs_f64(interval / 1000.0));
    }

    /// Sound the next pattern note and schedule the gated release of the
    /// previous one.
    fn step_forward(&mut self, now: Instant, params: &ParamStore, tx: &Sender<AudioCmd>) {
        let notes: Vec<u8> = self.held.iter().copied().collect();
        if notes.is_empty() {
            return;
        }
        let len = notes.len();
        let idx = (self.step % len as u64) as usize;
        let note = match self.pattern.unwrap_or(ArpPattern::AsPlayed) {
            ArpPattern::Up | ArpPattern::AsPlayed => notes[idx],
            ArpPattern::Down => notes[len - 1 - idx],
            ArpPattern::Random => notes[self.next_random(len)],
        };

        // A retrigger must not be clobbered by its own stale gated note-off
        self.timers.cancel_release(note);

        let prev = self.last_note;
        let _ = tx.try_send(AudioCmd::NoteOn(note));
        self.last_note = Some(note);

        if let Some(prev_note) = prev {
            if prev_note != note {
                let delay = self.gate_delay_ms(params);
                self.timers
                    .schedule_release(prev_note, now + Duration::from_secs_f64(delay / 1000.0));
            }
        }
        self.step += 1;
    }

    /// How long the previous note keeps ringing, in ms.
    fn gate_delay_ms(&self, params: &ParamStore) -> f64 {
        let gate = params::gate_fraction(params.get(Param::Release));
        let density = params.get(Param::ArpDensity);
        let step_ms = match (self.synced, self.clock.avg_ms_per_tick()) {
            (true, Some(avg)) => avg * params::clock_divider(density) as f64,
            _ => params::arp_interval_ms(density),
        };
        (step_ms * gate).max(params::MIN_GATE_MS)
    }

    /// Release the sounding note and every pending gated note-off, cancel
    /// the step chain, rewind the step counter.
    fn stop_sounding(&mut self, tx: &Sender<AudioCmd>) {
        self.timers.cancel_step();
        let mut to_stop: BTreeSet<u8> = self.timers.pending_releases().into_iter().collect();
        if let Some(note) = self.last_note.take() {
            to_stop.insert(note);
        }
        for note in to_stop {
            let _ = tx.try_send(AudioCmd::NoteOff(note));
        }
        self.timers.clear_releases();
        self.step = 0;
    }

    fn next_random(&mut self, len: usize) -> usize {
        self.rng_state = self
            .rng_state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.rng_state >> 33) as usize) % len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{unbounded, Receiver};

    fn setup() -> (Arpeggiator, ParamStore, Sender<AudioCmd>, Receiver<AudioCmd>) {
        let (tx, rx) = unbounded();
        (Arpeggiator::new(), ParamStore::new(), tx, rx)
    }

    fn note_ons(rx: &Receiver<AudioCmd>) -> Vec<u8> {
        rx.try_iter()
            .filter_map(|cmd| match cmd {
                AudioCmd::NoteOn(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    fn note_offs(rx: &Receiver<AudioCmd>) -> Vec<u8> {
        rx.try_iter()
            .filter_map(|cmd| match cmd {
                AudioCmd::NoteOff(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    /// Drive every pending timer (steps and gated releases) whose deadline
    /// falls before `until`.
    fn run_until(arp: &mut Arpeggiator, params: &ParamStore, tx: &Sender<AudioCmd>, until: Instant) {
        while let Some(at) = arp.next_deadline() {
            if at > until {
                break;
            }
            arp.run_due(at, params, tx);
        }
    }

    #[test]
    fn arming_with_held_notes_starts_stepping() {
        let (mut arp, params, tx, rx) = setup();
        let now = Instant::now();
        arp.note_on(60, now, &params, &tx); // held tracked even while off
        arp.select_pattern(ArpPattern::Up, now, &params, &tx);
        assert!(arp.is_active());
        assert_eq!(note_ons(&rx), vec![60]);
    }

    #[test]
    fn note_on_while_armed_starts_the_timer() {
        let (mut arp, params, tx, rx) = setup();
        let now = Instant::now();
        arp.select_pattern(ArpPattern::Up, now, &params, &tx);
        assert!(arp.next_deadline().is_none());
        assert!(arp.note_on(64, now, &params, &tx));
        assert_eq!(note_ons(&rx), vec![64]);
        assert!(arp.next_deadline().is_some());
    }

    #[test]
    fn up_pattern_cycles_ascending() {
        let (mut arp, params, tx, rx) = setup();
        let now = Instant::now();
        arp.note_on(67, now, &params, &tx);
        arp.note_on(60, now, &params, &tx);
        arp.note_on(64, now, &params, &tx);
        arp.select_pattern(ArpPattern::Up, now, &params, &tx);
        // density 50 -> 325 ms per step; five more steps after the immediate one
        run_until(&mut arp, &params, &tx, now + Duration::from_millis(5 * 325 + 10));
        assert_eq!(note_ons(&rx), vec![60, 64, 67, 60, 64, 67]);
    }

    #[test]
    fn down_pattern_is_the_mirror() {
        let (mut arp, params, tx, rx) = setup();
        let now = Instant::now();
        for n in [60, 64, 67] {
            arp.note_on(n, now, &params, &tx);
        }
        arp.select_pattern(ArpPattern::Down, now, &params, &tx);
        run_until(&mut arp, &params, &tx, now + Duration::from_millis(2 * 325 + 10));
        assert_eq!(note_ons(&rx), vec![67, 64, 60]);
    }

    #[test]
    fn random_pattern_stays_within_held_set() {
        let (mut arp, params, tx, rx) = setup();
        let now = Instant::now();
        for n in [60, 64, 67] {
            arp.note_on(n, now, &params, &tx);
        }
        arp.select_pattern(ArpPattern::Random, now, &params, &tx);
        run_until(&mut arp, &params, &tx, now + Duration::from_millis(20 * 325));
        let played = note_ons(&rx);
        assert!(played.len() > 10);
        for n in played {
            assert!([60, 64, 67].contains(&n));
        }
    }

    #[test]
    fn reselecting_armed_pattern_disarms() {
        let (mut arp, params, tx, rx) = setup();
        let now = Instant::now();
        arp.note_on(60, now, &params, &tx);
        arp.select_pattern(ArpPattern::Up, now, &params, &tx);
        let _ = rx.try_iter().count();
        arp.select_pattern(ArpPattern::Up, now, &params, &tx);
        assert!(!arp.is_active());
        assert_eq!(arp.pattern(), None);
        assert_eq!(note_offs(&rx), vec![60]);
        assert!(arp.next_deadline().is_none());
    }

    #[test]
    fn emptying_held_set_silences_and_rearms() {
        let (mut arp, params, tx, rx) = setup();
        let now = Instant::now();
        arp.note_on(60, now, &params, &tx);
        arp.note_on(64, now, &params, &tx);
        arp.select_pattern(ArpPattern::Up, now, &params, &tx);
        run_until(&mut arp, &params, &tx, now + Duration::from_millis(3 * 325 + 10));
        let _ = rx.try_iter().count();

        assert!(arp.note_off(60, &tx));
        assert!(arp.note_off(64, &tx));
        // Everything pending was flushed as note-offs, nothing scheduled
        assert!(!note_offs(&rx).is_empty());
        assert!(arp.next_deadline().is_none());
        assert!(arp.is_active(), "stays armed");
        assert_eq!(arp.pattern(), Some(ArpPattern::Up));
    }

    /// Measure the gaps between successive step deadlines. A single held
    /// note keeps the queue free of gated releases, so every deadline is a
    /// step timer.
    fn step_gaps(arp: &mut Arpeggiator, params: &ParamStore, tx: &Sender<AudioCmd>, n: usize) -> Vec<f64> {
        let now = Instant::now();
        arp.note_on(60, now, params, tx);
        arp.select_pattern(ArpPattern::Up, now, params, tx);
        let mut gaps = Vec::new();
        let mut at = now;
        for _ in 0..n {
            let d = arp.next_deadline().unwrap();
            gaps.push(d.duration_since(at).as_secs_f64() * 1000.0);
            at = d;
            arp.run_due(d, params, tx);
        }
        gaps
    }

    #[test]
    fn swing_zero_spaces_steps_evenly() {
        let (mut arp, params, tx, _rx) = setup();
        for gap in step_gaps(&mut arp, &params, &tx, 4) {
            assert!((gap - 325.0).abs() < 1.0, "gap {gap}");
        }
    }

    #[test]
    fn full_swing_alternates_intervals_by_66_percent() {
        let (mut arp, mut params, tx, _rx) = setup();
        params.set(Param::Swing, 100.0);
        let gaps = step_gaps(&mut arp, &params, &tx, 4);
        // Post-increment parity: the first fired step schedules the long side
        assert!((gaps[0] - 325.0 * 1.66).abs() < 1.0, "long {}", gaps[0]);
        assert!((gaps[1] - 325.0 * 0.34).abs() < 1.0, "short {}", gaps[1]);
        assert!((gaps[2] - 325.0 * 1.66).abs() < 1.0);
        assert!((gaps[3] - 325.0 * 0.34).abs() < 1.0);
    }

    #[test]
    fn interval_is_clamped_at_minimum() {
        let (mut arp, mut params, tx, _rx) = setup();
        params.set(Param::ArpDensity, 100.0);
        params.set(Param::Swing, 100.0);
        for gap in step_gaps(&mut arp, &params, &tx, 4) {
            assert!(gap >= params::MIN_STEP_MS - 1e-6, "gap {gap}");
        }
    }

    #[test]
    fn retrigger_cancels_the_notes_stale_release() {
        let (mut arp, mut params, tx, rx) = setup();
        // Long gate so releases outlive several steps
        params.set(Param::Release, 100.0);
        let now = Instant::now();
        arp.note_on(60, now, &params, &tx);
        arp.note_on(64, now, &params, &tx);
        arp.pattern = Some(ArpPattern::Up);
        arp.active = true;

        arp.step_forward(now, &params, &tx); // 60
        arp.step_forward(now, &params, &tx); // 64, release(60) pending
        arp.step_forward(now, &params, &tx); // 60 again: stale release gone
        assert_eq!(note_ons(&rx), vec![60, 64, 60]);
        assert_eq!(arp.timers.pending_releases(), vec![64]);
    }

    #[test]
    fn transport_start_hands_stepping_to_the_clock() {
        let (mut arp, params, tx, rx) = setup();
        let now = Instant::now();
        arp.note_on(60, now, &params, &tx);
        arp.select_pattern(ArpPattern::Up, now, &params, &tx);
        assert!(arp.next_deadline().is_some());

        arp.transport_start();
        assert!(arp.is_synced());
        assert!(arp.next_deadline().is_none(), "internal timer cancelled");
        let _ = rx.try_iter().count();

        // density 50 -> divider 6: ticks 0 and 6 step, 1-5 do not
        let mut played = Vec::new();
        for i in 0..12u64 {
            let at = now + Duration::from_millis(i * 20);
            arp.on_clock_tick(at, &params, &tx).unwrap();
            played.extend(note_ons(&rx));
        }
        assert_eq!(played, vec![60, 60]);
    }

    #[test]
    fn transport_stop_silences_but_keeps_held_keys() {
        let (mut arp, params, tx, rx) = setup();
        let now = Instant::now();
        arp.note_on(60, now, &params, &tx);
        arp.note_on(64, now, &params, &tx);
        arp.select_pattern(ArpPattern::Up, now, &params, &tx);
        arp.transport_start();
        for i in 0..7u64 {
            arp.on_clock_tick(now + Duration::from_millis(i * 20), &params, &tx);
        }
        let _ = rx.try_iter().count();

        arp.transport_stop(&tx);
        assert!(!arp.is_synced());
        assert!(!arp.is_active());
        assert!(!note_offs(&rx).is_empty());
        assert_eq!(arp.held_count(), 2);
        assert!(arp.bpm().is_none());

        // Stray ticks after a stop are ignored
        assert!(arp
            .on_clock_tick(now + Duration::from_millis(200), &params, &tx)
            .is_none());
        assert!(!arp.is_synced());
    }

    #[test]
    fn running_clock_engages_sync_without_transport_start() {
        let (mut arp, params, tx, _rx) = setup();
        let now = Instant::now();
        assert!(arp.on_clock_tick(now, &params, &tx).is_some());
        assert!(arp.is_synced());
    }

    #[test]
    fn direct_notes_pass_through_when_inactive() {
        let (mut arp, params, tx, _rx) = setup();
        let now = Instant::now();
        assert!(!arp.note_on(60, now, &params, &tx));
        assert!(!arp.note_off(60, &tx));
        assert_eq!(arp.held_count(), 0);
    }
}
