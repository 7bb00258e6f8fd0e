use std::f64::consts::TAU;

use crate::synth::engines::Lag;
use crate::synth::ToneGenerator;

/// Three sine partials (fundamental, octave, octave+fifth). The timbre morph
/// fades the upper partials in; an internal long exponential decay gives the
/// percussive ring regardless of the shared sustain stage.
pub struct HangDrumTone {
    phase1: f64,
    phase2: f64,
    phase3: f64,
    freq: f64,
    partials: Lag,
    elapsed: f64,
    sample_rate: f64,
}

const ATTACK_SECS: f64 = 0.01;
const DECAY_SECS: f64 = 4.0;
const PEAK: f32 = 0.6;
const FLOOR: f32 = 0.0001;

impl HangDrumTone {
    pub fn new(freq: f64, timbre: f32, sample_rate: f64) -> Self {
        Self {
            phase1: 0.0,
            phase2: 0.0,
            phase3: 0.0,
            freq,
            partials: Lag::new(timbre / 100.0, sample_rate),
            elapsed: 0.0,
            sample_rate,
        }
    }

    fn strike_env(&self) -> f32 {
        let t = self.elapsed;
        if t < ATTACK_SECS {
            PEAK * (t / ATTACK_SECS) as f32
        } else if t < DECAY_SECS {
            let frac = ((t - ATTACK_SECS) / (DECAY_SECS - ATTACK_SECS)) as f32;
            PEAK * (FLOOR / PEAK).powf(frac)
        } else {
            0.0
        }
    }
}

impl ToneGenerator for HangDrumTone {
    fn set_freq(&mut self, freq: f64) {
        self.freq = freq;
    }

    fn set_timbre(&mut self, value: f32) {
        self.partials.set(value / 100.0);
    }

    fn next_sample(&mut self) -> f32 {
        let mix = self.partials.next();
        let fundamental = (self.phase1 * TAU).sin() as f32;
        let octave = (self.phase2 * TAU).sin() as f32;
        let fifth = (self.phase3 * TAU).sin() as f32;
        let out = (fundamental + octave * 0.5 * mix + fifth * 0.3 * mix) * self.strike_env();

        self.phase1 += self.freq / self.sample_rate;
        self.phase2 += self.freq * 2.0 / self.sample_rate;
        self.phase3 += self.freq * 3.0 / self.sample_rate;
        for p in [&mut self.phase1, &mut self.phase2, &mut self.phase3] {
            if *p >= 1.0 {
                *p -= 1.0;
            }
        }
        self.elapsed += 1.0 / self.sample_rate;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strike_decays_to_silence_independently_of_sustain() {
        let mut tone = HangDrumTone::new(220.0, 50.0, 44_100.0);
        tone.elapsed = ATTACK_SECS;
        assert!((tone.strike_env() - PEAK).abs() < 1e-3);
        tone.elapsed = 2.0;
        let mid = tone.strike_env();
        assert!(mid < PEAK && mid > 0.0);
        tone.elapsed = 4.5;
        assert_eq!(tone.strike_env(), 0.0);
    }

    #[test]
    fn zero_timbre_is_pure_fundamental() {
        let mut pure = HangDrumTone::new(200.0, 0.0, 44_100.0);
        let mut rich = HangDrumTone::new(200.0, 100.0, 44_100.0);
        let mut pure_energy = 0.0f64;
        let mut rich_energy = 0.0f64;
        for _ in 0..4410 {
            pure_energy += (pure.next_sample() as f64).powi(2);
            rich_energy += (rich.next_sample() as f64).powi(2);
        }
        assert!(rich_energy > pure_energy, "partials should add energy");
    }
}
