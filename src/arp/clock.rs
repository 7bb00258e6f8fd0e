use std::collections::VecDeque;
use std::time::Instant;

use crate::constants::TICKS_PER_BEAT;

/// Tick timestamps kept for tempo averaging.
const MAX_TEMPO_SAMPLES: usize = 48;
/// Samples required before a tempo estimate exists.
const MIN_TEMPO_SAMPLES: usize = 3;

/// Events derived from one external clock tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickEvents {
    /// Tick landed on a quarter-note boundary.
    pub beat: bool,
    /// Tick landed on the swing-adjusted off-beat (fixed eighth-note grid).
    pub off_beat: bool,
    /// The arpeggiator should advance one step on this tick.
    pub step: bool,
}

/// Rolling tempo estimator over an external MIDI clock stream.
///
/// Keeps a bounded FIFO of tick timestamps and a free-running tick counter.
/// The off-beat indicator and the arp step trigger use deliberately separate
/// swing formulas: the indicator works on a fixed 12-ticks-per-eighth grid,
/// the step trigger on the current clock divider.
pub struct ClockSync {
    timestamps: VecDeque<Instant>,
    tick_count: u64,
}

impl ClockSync {
    pub fn new() -> Self {
        Self {
            timestamps: VecDeque::with_capacity(MAX_TEMPO_SAMPLES),
            tick_count: 0,
        }
    }

    /// Clear all timing state (transport stop, or re-zero on start).
    pub fn reset(&mut self) {
        self.timestamps.clear();
        self.tick_count = 0;
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Average milliseconds per tick, once enough samples exist.
    pub fn avg_ms_per_tick(&self) -> Option<f64> {
        if self.timestamps.len() < MIN_TEMPO_SAMPLES {
            return None;
        }
        let first = *self.timestamps.front().unwrap();
        let last = *self.timestamps.back().unwrap();
        let span_ms = last.duration_since(first).as_secs_f64() * 1000.0;
        Some(span_ms / (self.timestamps.len() - 1) as f64)
    }

    /// Estimated tempo in BPM; None until three ticks have been recorded.
    pub fn bpm(&self) -> Option<f64> {
        self.avg_ms_per_tick()
            .map(|ms| 60_000.0 / (ms * TICKS_PER_BEAT as f64))
    }

    /// Record one external tick and derive beat/off-beat/step events.
    ///
    /// `swing` and `density` are raw 0-100 parameter values.
    pub fn on_tick(&mut self, now: Instant, swing: f32, density: f32) -> TickEvents {
        self.timestamps.push_back(now);
        if self.timestamps.len() > MAX_TEMPO_SAMPLES {
            self.timestamps.pop_front();
        }

        let tick = self.tick_count;
        self.tick_count += 1;

        let tick_in_beat = tick % TICKS_PER_BEAT;
        let swing_ratio = crate::params::swing_ratio(swing);

        let mut events = TickEvents {
            beat: tick_in_beat == 0,
            ..TickEvents::default()
        };

        // Off-beat indicator: an eighth note is 12 ticks, swing delays it by
        // up to 2/3 of that.
        if swing > 0.0 {
            let delay = (12.0 * swing_ratio).round() as u64;
            events.off_beat = tick_in_beat == 12 + delay;
        }

        // Arp step trigger against the density-derived divider. With swing,
        // steps pair up into a 2*divider period with a delayed second step.
        let divider = crate::params::clock_divider(density);
        if swing == 0.0 {
            events.step = tick % divider == 0;
        } else {
            let period = divider * 2;
            let within = tick % period;
            let delay = (divider as f64 * swing_ratio).round() as u64;
            let off_step = (divider + delay).min(period - 1);
            events.step = within == 0 || within == off_step;
        }

        events
    }
}
