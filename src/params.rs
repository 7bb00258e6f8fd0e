use crate::constants::SAMPLE_RATE;

/// Normalized control parameters. Every stored value lives in [0, 100];
/// consumers map to native units through the curve functions below at the
/// point of use, never in the store itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    ChordComplexity,
    ArpDensity,
    Swing,
    FxDepth,
    FilterCutoff,
    FilterResonance,
    Timbre,
    MixFx,
    Glide,
    Attack,
    Decay,
    Sustain,
    Release,
}

pub const PARAM_COUNT: usize = 13;

pub const ALL_PARAMS: [Param; PARAM_COUNT] = [
    Param::ChordComplexity,
    Param::ArpDensity,
    Param::Swing,
    Param::FxDepth,
    Param::FilterCutoff,
    Param::FilterResonance,
    Param::Timbre,
    Param::MixFx,
    Param::Glide,
    Param::Attack,
    Param::Decay,
    Param::Sustain,
    Param::Release,
];

/// Transport control-change numbers (sent with value > 64)
pub const CC_STOP: u8 = 117;
pub const CC_PLAY: u8 = 118;
pub const CC_RECORD: u8 = 119;

impl Param {
    pub fn index(self) -> usize {
        match self {
            Param::ChordComplexity => 0,
            Param::ArpDensity => 1,
            Param::Swing => 2,
            Param::FxDepth => 3,
            Param::FilterCutoff => 4,
            Param::FilterResonance => 5,
            Param::Timbre => 6,
            Param::MixFx => 7,
            Param::Glide => 8,
            Param::Attack => 9,
            Param::Decay => 10,
            Param::Sustain => 11,
            Param::Release => 12,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Param::ChordComplexity => "COMPLEX",
            Param::ArpDensity => "DENSITY",
            Param::Swing => "SWING",
            Param::FxDepth => "FX DEPTH",
            Param::FilterCutoff => "CUTOFF",
            Param::FilterResonance => "RESO",
            Param::Timbre => "TIMBRE",
            Param::MixFx => "MIX FX",
            Param::Glide => "GLIDE",
            Param::Attack => "ATTACK",
            Param::Decay => "DECAY",
            Param::Sustain => "SUSTAIN",
            Param::Release => "RELEASE",
        }
    }

    /// Map an incoming control-change number to a parameter.
    /// 70-78 and 80-83 are the primary knob CCs; 79, 91 and 93 are the
    /// conventional aliases many controllers send for the same targets.
    pub fn from_cc(cc: u8) -> Option<Param> {
        match cc {
            70 => Some(Param::ChordComplexity),
            71 => Some(Param::ArpDensity),
            72 => Some(Param::Swing),
            73 => Some(Param::FxDepth),
            74 => Some(Param::FilterCutoff),
            75 | 79 => Some(Param::FilterResonance),
            76 => Some(Param::Timbre),
            77 | 93 => Some(Param::MixFx),
            78 => Some(Param::Glide),
            80 => Some(Param::Attack),
            81 => Some(Param::Decay),
            82 => Some(Param::Sustain),
            83 => Some(Param::Release),
            91 => Some(Param::FxDepth),
            _ => None,
        }
    }

    pub fn default_value(self) -> f32 {
        match self {
            Param::ChordComplexity => 30.0,
            Param::ArpDensity => 50.0,
            Param::Swing => 0.0,
            Param::FxDepth => 40.0,
            Param::FilterCutoff => 80.0,
            Param::FilterResonance => 20.0,
            Param::Timbre => 0.0,
            Param::MixFx => 10.0,
            Param::Glide => 0.0,
            Param::Attack => 5.0,
            Param::Decay => 20.0,
            Param::Sustain => 70.0,
            Param::Release => 30.0,
        }
    }
}

/// Process-wide parameter values, single writer, mapped per-consumer.
#[derive(Debug, Clone)]
pub struct ParamStore {
    values: [f32; PARAM_COUNT],
}

impl ParamStore {
    pub fn new() -> Self {
        let mut values = [0.0; PARAM_COUNT];
        for p in ALL_PARAMS {
            values[p.index()] = p.default_value();
        }
        Self { values }
    }

    pub fn get(&self, param: Param) -> f32 {
        self.values[param.index()]
    }

    pub fn set(&mut self, param: Param, value: f32) {
        self.values[param.index()] = value.clamp(0.0, 100.0);
    }
}

// --- Mapping curves ---------------------------------------------------------
//
// Fixed curves from raw 0-100 control values to engine-native units.

const MIN_CUTOFF_HZ: f32 = 40.0;

/// Logarithmic sweep from 40 Hz to Nyquist.
pub fn cutoff_hz(v: f32) -> f32 {
    let max = SAMPLE_RATE as f32 / 2.0;
    MIN_CUTOFF_HZ * (max / MIN_CUTOFF_HZ).powf(v / 100.0)
}

/// Filter Q, 0-20.
pub fn resonance_q(v: f32) -> f32 {
    v / 100.0 * 20.0
}

/// Delay feedback gain, hard-capped at 0.7 to prevent runaway self-oscillation.
pub fn fx_feedback(v: f32) -> f32 {
    v / 100.0 * 0.7
}

/// Delay time in seconds, 0-1.
pub fn fx_delay_secs(v: f32) -> f32 {
    v / 100.0
}

/// Portamento time in seconds, squared taper up to 1.5 s.
pub fn glide_secs(v: f32) -> f32 {
    (v / 100.0) * (v / 100.0) * 1.5
}

/// Attack and decay share one taper: 5 ms floor up to ~2 s.
pub fn attack_secs(v: f32) -> f32 {
    0.005 + (v / 100.0) * (v / 100.0) * 2.0
}

pub fn decay_secs(v: f32) -> f32 {
    attack_secs(v)
}

/// Sustain is a plain gain fraction.
pub fn sustain_level(v: f32) -> f32 {
    v / 100.0
}

/// Release: 5 ms floor up to ~5 s.
pub fn release_secs(v: f32) -> f32 {
    0.005 + (v / 100.0) * (v / 100.0) * 5.0
}

// --- Arpeggiator derivations ------------------------------------------------

/// Shortest allowed free-running step, ms.
pub const MIN_STEP_MS: f64 = 50.0;
/// Shortest allowed gated-release delay, ms.
pub const MIN_GATE_MS: f64 = 10.0;

/// Free-running step interval before swing, ms. Density 0 -> 600 ms,
/// density 100 -> 50 ms.
pub fn arp_interval_ms(density: f32) -> f64 {
    600.0 - density as f64 * 5.5
}

/// Fraction of the step interval the previous note keeps ringing.
pub fn gate_fraction(release: f32) -> f64 {
    0.1 + (release as f64 / 100.0) * 0.9
}

/// Free-running swing: alternating steps stretch/shrink by this fraction
/// of the base interval.
pub fn swing_amount(swing: f32) -> f64 {
    swing as f64 / 100.0 * 0.66
}

/// Clock-synced swing ratio: max delay is 2/3 of a step.
pub fn swing_ratio(swing: f32) -> f64 {
    swing as f64 / 100.0 * (2.0 / 3.0)
}

/// Density to MIDI-clock divider (ticks per arp step, 24 ticks = quarter).
pub fn clock_divider(density: f32) -> u64 {
    if density < 17.0 {
        24 // 1/4
    } else if density < 34.0 {
        12 // 1/8
    } else if density < 50.0 {
        8 // 1/8 triplet
    } else if density < 67.0 {
        6 // 1/16
    } else if density < 84.0 {
        4 // 1/16 triplet
    } else {
        3 // 1/32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cutoff_curve_hits_documented_endpoints() {
        assert!((cutoff_hz(0.0) - 40.0).abs() < 1e-3);
        assert!((cutoff_hz(100.0) - SAMPLE_RATE as f32 / 2.0).abs() < 0.5);
    }

    #[test]
    fn cutoff_curve_is_idempotent_per_value() {
        let a = cutoff_hz(63.0);
        let b = cutoff_hz(63.0);
        assert_eq!(a, b);
    }

    #[test]
    fn resonance_and_feedback_scale_linearly() {
        assert_eq!(resonance_q(50.0), 10.0);
        assert_eq!(resonance_q(100.0), 20.0);
        assert!((fx_feedback(100.0) - 0.7).abs() < 1e-6);
        assert_eq!(fx_delay_secs(100.0), 1.0);
    }

    #[test]
    fn envelope_curves_have_floors() {
        assert!((attack_secs(0.0) - 0.005).abs() < 1e-6);
        assert!((attack_secs(100.0) - 2.005).abs() < 1e-6);
        assert!((release_secs(100.0) - 5.005).abs() < 1e-6);
        assert_eq!(sustain_level(70.0), 0.7);
        assert!((glide_secs(100.0) - 1.5).abs() < 1e-6);
        assert_eq!(glide_secs(0.0), 0.0);
    }

    #[test]
    fn interval_spans_documented_range() {
        assert_eq!(arp_interval_ms(0.0), 600.0);
        assert_eq!(arp_interval_ms(100.0), 50.0);
        assert!((arp_interval_ms(50.0) - 325.0).abs() < 1e-9);
    }

    #[test]
    fn gate_fraction_maps_release_to_10_100_percent() {
        assert!((gate_fraction(0.0) - 0.1).abs() < 1e-9);
        assert!((gate_fraction(100.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn divider_table_edges() {
        assert_eq!(clock_divider(0.0), 24);
        assert_eq!(clock_divider(16.9), 24);
        assert_eq!(clock_divider(17.0), 12);
        assert_eq!(clock_divider(34.0), 8);
        assert_eq!(clock_divider(50.0), 6);
        assert_eq!(clock_divider(67.0), 4);
        assert_eq!(clock_divider(84.0), 3);
        assert_eq!(clock_divider(100.0), 3);
    }

    #[test]
    fn store_clamps_and_defaults() {
        let mut store = ParamStore::new();
        assert_eq!(store.get(Param::ArpDensity), 50.0);
        store.set(Param::Swing, 130.0);
        assert_eq!(store.get(Param::Swing), 100.0);
        store.set(Param::Swing, -5.0);
        assert_eq!(store.get(Param::Swing), 0.0);
    }

    #[test]
    fn cc_map_covers_knobs_and_aliases() {
        assert_eq!(Param::from_cc(74), Some(Param::FilterCutoff));
        assert_eq!(Param::from_cc(79), Some(Param::FilterResonance));
        assert_eq!(Param::from_cc(91), Some(Param::FxDepth));
        assert_eq!(Param::from_cc(93), Some(Param::MixFx));
        assert_eq!(Param::from_cc(84), None);
    }
}
