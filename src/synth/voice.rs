use crate::params::{self, Param};
use crate::synth::engines::{self, EngineKind};
use crate::synth::{midi_to_freq, ToneGenerator};

/// Per-voice headroom: several voices plus release tails must sum without
/// slamming the master stage.
const VOICE_GAIN: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnvStage {
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Linear ADSR stepped once per sample. Stage times are locked in when the
/// voice is created; release ramps from whatever level is current when the
/// note is let go.
struct Envelope {
    stage: EnvStage,
    level: f32,
    attack_rate: f32,
    decay_rate: f32,
    sustain: f32,
    release_secs: f32,
    release_rate: f32,
    sample_rate: f32,
}

impl Envelope {
    fn new(attack_secs: f32, decay_secs: f32, sustain: f32, release_secs: f32, sample_rate: f32) -> Self {
        Self {
            stage: EnvStage::Attack,
            level: 0.0,
            attack_rate: 1.0 / (attack_secs * sample_rate).max(1.0),
            decay_rate: (1.0 - sustain) / (decay_secs * sample_rate).max(1.0),
            sustain,
            release_secs,
            release_rate: 0.0,
            sample_rate,
        }
    }

    fn next(&mut self) -> f32 {
        match self.stage {
            EnvStage::Attack => {
                self.level += self.attack_rate;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvStage::Decay;
                }
            }
            EnvStage::Decay => {
                self.level -= self.decay_rate;
                if self.level <= self.sustain {
                    self.level = self.sustain;
                    self.stage = EnvStage::Sustain;
                }
            }
            EnvStage::Sustain => {}
            EnvStage::Release => {
                self.level -= self.release_rate;
                if self.level <= 0.0 {
                    self.level = 0.0;
                }
            }
        }
        self.level
    }

    fn release(&mut self) {
        self.release_rate = self.level / (self.release_secs * self.sample_rate).max(1.0);
        self.stage = EnvStage::Release;
    }

    fn is_done(&self) -> bool {
        self.stage == EnvStage::Release && self.level <= 0.0
    }
}

/// One sounding note: generator, envelope and glide ramp.
struct Voice {
    note: u8,
    tone: Box<dyn ToneGenerator>,
    env: Envelope,
    freq: f64,
    target_freq: f64,
    /// Per-sample frequency increment; zero when not gliding
    glide_step: f64,
}

impl Voice {
    fn render(&mut self) -> f32 {
        if self.glide_step != 0.0 {
            self.freq += self.glide_step;
            let done = (self.glide_step > 0.0 && self.freq >= self.target_freq)
                || (self.glide_step < 0.0 && self.freq <= self.target_freq);
            if done {
                self.freq = self.target_freq;
                self.glide_step = 0.0;
            }
            self.tone.set_freq(self.freq);
        }
        self.env.next() * self.tone.next_sample()
    }
}

/// The voice table: at most one active voice per note number, plus release
/// tails ringing out on their own.
pub struct VoiceBank {
    engine: EngineKind,
    voices: Vec<Voice>,
    tails: Vec<Voice>,
    timbre: f32,
    attack: f32,
    decay: f32,
    sustain: f32,
    release: f32,
    glide: f32,
    last_freq: Option<f64>,
    sample_rate: f64,
}

impl VoiceBank {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            engine: EngineKind::Analog,
            voices: Vec::new(),
            tails: Vec::new(),
            timbre: Param::Timbre.default_value(),
            attack: Param::Attack.default_value(),
            decay: Param::Decay.default_value(),
            sustain: Param::Sustain.default_value(),
            release: Param::Release.default_value(),
            glide: Param::Glide.default_value(),
            last_freq: None,
            sample_rate,
        }
    }

    /// Selecting an engine affects voices created afterwards.
    pub fn set_engine(&mut self, engine: EngineKind) {
        self.engine = engine;
    }

    pub fn engine(&self) -> EngineKind {
        self.engine
    }

    /// Broadcast a timbre morph to every active voice.
    pub fn set_timbre(&mut self, value: f32) {
        self.timbre = value;
        for voice in &mut self.voices {
            voice.tone.set_timbre(value);
        }
    }

    /// Raw 0-100 stage values; in-flight envelopes are not altered.
    pub fn set_adsr(&mut self, attack: f32, decay: f32, sustain: f32, release: f32) {
        self.attack = attack;
        self.decay = decay;
        self.sustain = sustain;
        self.release = release;
    }

    pub fn set_glide(&mut self, value: f32) {
        self.glide = value;
    }

    /// Start a note. A note that is already sounding is left untouched.
    pub fn note_on(&mut self, note: u8) {
        if self.voices.iter().any(|v| v.note == note) {
            return;
        }
        let target = midi_to_freq(note);
        let glide_secs = params::glide_secs(self.glide) as f64;

        // Legato: glide from the previous target only while another voice
        // still holds
        let start = if glide_secs > 0.0 && !self.voices.is_empty() {
            self.last_freq.unwrap_or(target)
        } else {
            target
        };
        let glide_step = if (target - start).abs() > f64::EPSILON {
            (target - start) / (glide_secs * self.sample_rate)
        } else {
            0.0
        };

        let tone = engines::create_generator(self.engine, start, self.timbre, self.sample_rate);
        let env = Envelope::new(
            params::attack_secs(self.attack),
            params::decay_secs(self.decay),
            params::sustain_level(self.sustain),
            params::release_secs(self.release),
            self.sample_rate as f32,
        );
        self.voices.push(Voice {
            note,
            tone,
            env,
            freq: start,
            target_freq: target,
            glide_step,
        });
        self.last_freq = Some(target);
    }

    /// Release a note. The voice leaves the active table immediately so the
    /// same number can retrigger over the old tail.
    pub fn note_off(&mut self, note: u8) {
        if let Some(pos) = self.voices.iter().position(|v| v.note == note) {
            let mut voice = self.voices.swap_remove(pos);
            voice.env.release();
            self.tails.push(voice);
        }
    }

    /// One mono output sample: all voices and tails summed.
    pub fn render(&mut self) -> f32 {
        let mut sum = 0.0f32;
        for voice in &mut self.voices {
            sum += voice.render() * VOICE_GAIN;
        }
        for tail in &mut self.tails {
            sum += tail.render() * VOICE_GAIN;
        }
        self.tails.retain(|t| !t.env.is_done());
        sum
    }

    pub fn active_count(&self) -> usize {
        self.voices.len()
    }

    pub fn tail_count(&self) -> usize {
        self.tails.len()
    }
}
