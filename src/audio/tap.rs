use std::sync::{Arc, Mutex};

use crate::constants::{TAP_FREQ_BINS, TAP_SIZE};

/// Time-domain analysis tap on the bus output. The audio callback pushes
/// samples into a local ring and periodically publishes an ordered snapshot
/// through a shared handle; readers only ever see whole windows.
pub struct AnalysisTap {
    ring: Vec<f32>,
    pos: usize,
    since_publish: usize,
    shared: Arc<Mutex<Vec<f32>>>,
}

/// Publish roughly four snapshots per window.
const PUBLISH_INTERVAL: usize = TAP_SIZE / 4;

impl AnalysisTap {
    pub fn new(shared: Arc<Mutex<Vec<f32>>>) -> Self {
        Self {
            ring: vec![0.0; TAP_SIZE],
            pos: 0,
            since_publish: 0,
            shared,
        }
    }

    pub fn shared_handle() -> Arc<Mutex<Vec<f32>>> {
        Arc::new(Mutex::new(vec![0.0; TAP_SIZE]))
    }

    /// Frequency resolution advertised to downstream analyzers.
    pub fn freq_bins() -> usize {
        TAP_FREQ_BINS
    }

    pub fn push(&mut self, sample: f32) {
        self.ring[self.pos] = sample;
        self.pos = (self.pos + 1) % TAP_SIZE;
        self.since_publish += 1;
        if self.since_publish >= PUBLISH_INTERVAL {
            self.since_publish = 0;
            // Never block in the callback; skip the snapshot under contention
            if let Ok(mut shared) = self.shared.try_lock() {
                let (tail, head) = self.ring.split_at(self.pos);
                shared[..head.len()].copy_from_slice(head);
                shared[head.len()..].copy_from_slice(tail);
            }
        }
    }
}

/// Reduce a sample window to `target_len` display magnitudes.
pub fn downsample(samples: &[f32], target_len: usize) -> Vec<f32> {
    if samples.is_empty() || target_len == 0 {
        return Vec::new();
    }
    let chunk = (samples.len() / target_len).max(1);
    samples
        .chunks(chunk)
        .take(target_len)
        .map(|c| c.iter().map(|s| s.abs()).fold(0.0f32, f32::max))
        .collect()
}
