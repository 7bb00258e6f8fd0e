use crate::params;

/// One-pole parameter smoother, ~10 ms time constant. Every bus target runs
/// through one of these so fast sweeps never step audibly.
#[derive(Debug, Clone, Copy)]
pub struct Smoothed {
    current: f32,
    target: f32,
    coeff: f32,
}

impl Smoothed {
    pub fn new(initial: f32, sample_rate: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coeff: 1.0 - (-1.0 / (0.010 * sample_rate)).exp(),
        }
    }

    pub fn set(&mut self, target: f32) {
        self.target = target;
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn next(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }
}

/// Maximum delay line length in seconds.
const MAX_DELAY_SECS: f32 = 1.0;
/// Master stage headroom ahead of the filter.
const MASTER_GAIN: f32 = 0.3;

/// Fixed-topology shared processing chain. Every voice sums into the master
/// gain, through a resonant low-pass, then splits into the dry output (which
/// also feeds the analysis tap) and a feedback delay loop.
pub struct SignalBus {
    cutoff_hz: Smoothed,
    resonance_q: Smoothed,
    feedback: Smoothed,
    delay_secs: Smoothed,
    // Chamberlin state-variable integrators
    lp: f32,
    bp: f32,
    delay_buf: Vec<f32>,
    write_pos: usize,
    sample_rate: f32,
}

/// One processed sample: the final output and the dry (pre-delay) tap feed.
#[derive(Debug, Clone, Copy)]
pub struct BusOutput {
    pub out: f32,
    pub dry: f32,
}

impl SignalBus {
    pub fn new(sample_rate: f32) -> Self {
        let defaults = crate::params::ParamStore::new();
        Self {
            cutoff_hz: Smoothed::new(
                params::cutoff_hz(defaults.get(params::Param::FilterCutoff)),
                sample_rate,
            ),
            resonance_q: Smoothed::new(
                params::resonance_q(defaults.get(params::Param::FilterResonance)),
                sample_rate,
            ),
            feedback: Smoothed::new(
                params::fx_feedback(defaults.get(params::Param::FxDepth)),
                sample_rate,
            ),
            delay_secs: Smoothed::new(
                params::fx_delay_secs(defaults.get(params::Param::MixFx)),
                sample_rate,
            ),
            lp: 0.0,
            bp: 0.0,
            delay_buf: vec![0.0; (sample_rate * MAX_DELAY_SECS) as usize],
            write_pos: 0,
            sample_rate,
        }
    }

    /// All setters take raw 0-100 values and map through the shared curves.
    pub fn set_filter_cutoff(&mut self, v: f32) {
        self.cutoff_hz.set(params::cutoff_hz(v));
    }

    pub fn set_filter_resonance(&mut self, v: f32) {
        self.resonance_q.set(params::resonance_q(v));
    }

    pub fn set_fx_depth(&mut self, v: f32) {
        self.feedback.set(params::fx_feedback(v));
    }

    pub fn set_mix_fx(&mut self, v: f32) {
        self.delay_secs.set(params::fx_delay_secs(v));
    }

    pub fn cutoff_target_hz(&self) -> f32 {
        self.cutoff_hz.target()
    }

    pub fn process(&mut self, input: f32) -> BusOutput {
        let x = input * MASTER_GAIN;

        // Chamberlin SVF low-pass. The f coefficient saturates near the top
        // of the sweep, where the filter is effectively wide open anyway.
        let fc = self.cutoff_hz.next();
        let f = (2.0 * (std::f32::consts::PI * fc / self.sample_rate).sin()).clamp(0.001, 0.99);
        let q = 1.0 / self.resonance_q.next().clamp(0.5, 20.0);
        self.lp += f * self.bp;
        let hp = x - self.lp - q * self.bp;
        self.bp += f * hp;
        let dry = self.lp;

        // Feedback delay loop, feedback hard-capped upstream at 0.7
        let len = self.delay_buf.len();
        let delay_samples = ((self.delay_secs.next() * self.sample_rate) as usize).clamp(1, len - 1);
        let read_pos = (self.write_pos + len - delay_samples) % len;
        let delayed = self.delay_buf[read_pos];
        let fb = self.feedback.next();
        self.delay_buf[self.write_pos] = dry + delayed * fb;
        self.write_pos = (self.write_pos + 1) % len;

        BusOutput {
            out: dry + delayed,
            dry,
        }
    }
}
