pub const SAMPLE_RATE: u32 = 44_100;
/// UI refresh rate target
pub const UI_FPS: u64 = 60;
/// Channel capacity for inter-thread messages
pub const CHANNEL_CAPACITY: usize = 1024;
/// Analysis tap window: time-domain samples exposed to the waveform view
pub const TAP_SIZE: usize = 2048;
/// Frequency bins the tap advertises to downstream consumers
pub const TAP_FREQ_BINS: usize = TAP_SIZE / 2;
/// MIDI clock resolution: pulses per quarter note
pub const TICKS_PER_BEAT: u64 = 24;
