use std::f32::consts::PI;

use crate::synth::engines::Lag;
use crate::synth::{polyblep_saw, ToneGenerator};

/// Sawtooth through a soft-clip waveshaper. The timbre morph scales the
/// drive; an internal quick-attack/decay-to-bed envelope gives the
/// electric-piano character underneath the shared ADSR.
pub struct ReedPianoTone {
    phase: f64,
    freq: f64,
    drive: Lag,
    elapsed: f64,
    sample_rate: f64,
}

const ATTACK_SECS: f64 = 0.02;
const DECAY_END_SECS: f64 = 0.5;
const PEAK: f32 = 0.8;
const BED: f32 = 0.1;

impl ReedPianoTone {
    pub fn new(freq: f64, timbre: f32, sample_rate: f64) -> Self {
        Self {
            phase: 0.0,
            freq,
            drive: Lag::new(timbre / 10.0, sample_rate),
            elapsed: 0.0,
            sample_rate,
        }
    }

    /// Percussive character: linear attack to the peak, exponential decay
    /// down to a quiet bed that rings for as long as the ADSR holds it.
    fn character(&self) -> f32 {
        let t = self.elapsed;
        if t < ATTACK_SECS {
            PEAK * (t / ATTACK_SECS) as f32
        } else if t < DECAY_END_SECS {
            let frac = ((t - ATTACK_SECS) / (DECAY_END_SECS - ATTACK_SECS)) as f32;
            PEAK * (BED / PEAK).powf(frac)
        } else {
            BED
        }
    }

    fn shape(x: f32, k: f32) -> f32 {
        let deg = PI / 180.0;
        (3.0 + k) * x * 20.0 * deg / (PI + k * x.abs())
    }
}

impl ToneGenerator for ReedPianoTone {
    fn set_freq(&mut self, freq: f64) {
        self.freq = freq;
    }

    fn set_timbre(&mut self, value: f32) {
        self.drive.set(value / 10.0);
    }

    fn next_sample(&mut self) -> f32 {
        let dt = self.freq / self.sample_rate;
        let raw = polyblep_saw(self.phase, dt);
        let k = self.drive.next();
        let out = Self::shape(raw, k) * self.character();

        self.phase += dt;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        self.elapsed += 1.0 / self.sample_rate;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn character_envelope_peaks_then_settles() {
        let mut tone = ReedPianoTone::new(220.0, 50.0, 44_100.0);
        tone.elapsed = ATTACK_SECS;
        assert!((tone.character() - PEAK).abs() < 1e-3);
        tone.elapsed = DECAY_END_SECS;
        assert!((tone.character() - BED).abs() < 1e-3);
        tone.elapsed = 2.0;
        assert_eq!(tone.character(), BED);
    }

    #[test]
    fn drive_increases_saturation() {
        // The shaper compresses peaks harder as k rises
        let soft = ReedPianoTone::shape(1.0, 0.0);
        let hard = ReedPianoTone::shape(1.0, 10.0);
        assert!(soft > 0.0 && hard > 0.0);
        let soft_mid = ReedPianoTone::shape(0.5, 0.0) / soft;
        let hard_mid = ReedPianoTone::shape(0.5, 10.0) / hard;
        assert!(hard_mid > soft_mid, "drive should flatten the curve");
    }
}
