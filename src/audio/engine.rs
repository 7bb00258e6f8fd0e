use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};
use crossbeam_channel::{Receiver, Sender};
use std::sync::{Arc, Mutex};

use crate::audio::bus::SignalBus;
use crate::audio::tap::AnalysisTap;
use crate::constants::SAMPLE_RATE;
use crate::messages::{AudioCmd, AudioMsg};
use crate::synth::voice::VoiceBank;

struct LevelMeter {
    sum_sq: f32,
    count: usize,
}

impl LevelMeter {
    fn new() -> Self {
        Self {
            sum_sq: 0.0,
            count: 0,
        }
    }

    fn push(&mut self, sample: f32) {
        self.sum_sq += sample * sample;
        self.count += 1;
    }

    fn take_rms(&mut self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        let rms = (self.sum_sq / self.count as f32).sqrt();
        self.sum_sq = 0.0;
        self.count = 0;
        rms
    }
}

pub struct AudioEngine {
    /// Analysis-tap snapshot, shared read-only with the UI
    pub tap: Arc<Mutex<Vec<f32>>>,
}

impl AudioEngine {
    pub fn new() -> Self {
        Self {
            tap: AnalysisTap::shared_handle(),
        }
    }

    pub fn start(
        &self,
        cmd_rx: Receiver<AudioCmd>,
        msg_tx: Sender<AudioMsg>,
    ) -> Result<cpal::Stream, Box<dyn std::error::Error>> {
        let host = cpal::default_host();
        let output_device = host
            .default_output_device()
            .ok_or("No output device available")?;

        let output_config = StreamConfig {
            channels: 2,
            sample_rate: SampleRate(SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Default,
        };

        // --- All audio state lives inside the output callback closure ---
        let mut bank = VoiceBank::new(SAMPLE_RATE as f64);
        let mut bus = SignalBus::new(SAMPLE_RATE as f32);
        let mut tap = AnalysisTap::new(Arc::clone(&self.tap));
        let mut master_meter = LevelMeter::new();
        let mut report_counter: usize = 0;
        let report_interval = SAMPLE_RATE as usize / 30;

        let output_stream = output_device.build_output_stream(
            &output_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                // --- Process commands ---
                while let Ok(cmd) = cmd_rx.try_recv() {
                    match cmd {
                        AudioCmd::NoteOn(note) => bank.note_on(note),
                        AudioCmd::NoteOff(note) => bank.note_off(note),
                        AudioCmd::SetEngine(kind) => bank.set_engine(kind),
                        AudioCmd::SetTimbre(v) => bank.set_timbre(v),
                        AudioCmd::SetAdsr(a, d, s, r) => bank.set_adsr(a, d, s, r),
                        AudioCmd::SetGlide(v) => bank.set_glide(v),
                        AudioCmd::SetFilterCutoff(v) => bus.set_filter_cutoff(v),
                        AudioCmd::SetFilterResonance(v) => bus.set_filter_resonance(v),
                        AudioCmd::SetFxDepth(v) => bus.set_fx_depth(v),
                        AudioCmd::SetMixFx(v) => bus.set_mix_fx(v),
                    }
                }

                // --- Generate output frame by frame ---
                for frame in data.chunks_mut(2) {
                    let voices = bank.render();
                    let y = bus.process(voices);
                    tap.push(y.dry);

                    let out = y.out.clamp(-1.0, 1.0);
                    frame[0] = out;
                    if let Some(right) = frame.get_mut(1) {
                        *right = out;
                    }
                    master_meter.push(out);

                    report_counter += 1;
                    if report_counter >= report_interval {
                        report_counter = 0;
                        let _ = msg_tx.try_send(AudioMsg::MasterLevel(master_meter.take_rms()));
                        let _ = msg_tx.try_send(AudioMsg::ActiveVoices(bank.active_count()));
                    }
                }
            },
            |err| {
                log::error!("audio output error: {}", err);
            },
            None,
        )?;

        output_stream.play()?;
        Ok(output_stream)
    }
}
