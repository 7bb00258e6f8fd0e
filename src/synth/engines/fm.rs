use std::f64::consts::TAU;

use crate::synth::engines::Lag;
use crate::synth::ToneGenerator;

/// Two-operator FM at a 1:1 carrier/modulator ratio. The timbre morph scales
/// the modulation index linearly up to a 1000 Hz deviation.
pub struct FmTone {
    carrier_phase: f64,
    mod_phase: f64,
    freq: f64,
    index: Lag,
    sample_rate: f64,
}

impl FmTone {
    pub fn new(freq: f64, timbre: f32, sample_rate: f64) -> Self {
        Self {
            carrier_phase: 0.0,
            mod_phase: 0.0,
            freq,
            index: Lag::new(timbre * 10.0, sample_rate),
            sample_rate,
        }
    }
}

impl ToneGenerator for FmTone {
    fn set_freq(&mut self, freq: f64) {
        self.freq = freq;
    }

    fn set_timbre(&mut self, value: f32) {
        self.index.set(value * 10.0);
    }

    fn next_sample(&mut self) -> f32 {
        let index = self.index.next() as f64;
        let modulator = (self.mod_phase * TAU).sin();
        let carrier_freq = self.freq + modulator * index;
        let out = (self.carrier_phase * TAU).sin() as f32;

        self.carrier_phase += carrier_freq / self.sample_rate;
        self.mod_phase += self.freq / self.sample_rate;
        self.carrier_phase = self.carrier_phase.rem_euclid(1.0);
        if self.mod_phase >= 1.0 {
            self.mod_phase -= 1.0;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timbre_is_a_plain_sine() {
        let mut tone = FmTone::new(441.0, 0.0, 44_100.0);
        let mut reference = 0.0f64;
        for _ in 0..1000 {
            let s = tone.next_sample();
            let expected = (reference * TAU).sin() as f32;
            assert!((s - expected).abs() < 1e-4);
            reference += 441.0 / 44_100.0;
            reference = reference.rem_euclid(1.0);
        }
    }

    #[test]
    fn modulation_bends_the_carrier() {
        let mut plain = FmTone::new(440.0, 0.0, 44_100.0);
        let mut modulated = FmTone::new(440.0, 100.0, 44_100.0);
        let mut diverged = false;
        for _ in 0..2000 {
            let a = plain.next_sample();
            let b = modulated.next_sample();
            assert!(b.abs() <= 1.0001);
            if (a - b).abs() > 0.1 {
                diverged = true;
            }
        }
        assert!(diverged);
    }
}
