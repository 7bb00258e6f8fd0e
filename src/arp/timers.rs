use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Instant;

/// What a due timer asks the arpeggiator to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Fire the next free-running arp step.
    Step,
    /// Send the gated note-off for a previously sounded note.
    Release(u8),
}

#[derive(Debug, PartialEq, Eq)]
struct Entry {
    at: Instant,
    seq: u64,
    generation: u64,
    kind: TimerKind,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.at.cmp(&other.at).then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Deadline queue for the arpeggiator's two timer families.
///
/// Cancellation is per-handle: every scheduled entry carries the generation
/// current at schedule time, and bumping a generation orphans all entries
/// stamped with older ones. An orphaned entry still sits in the heap but is
/// discarded on pop, so a cancelled timer can never fire.
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<Entry>>,
    next_seq: u64,
    step_generation: u64,
    /// Live gated releases: note -> generation of its pending entry.
    releases: HashMap<u8, u64>,
    release_generation: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
            step_generation: 0,
            releases: HashMap::new(),
            release_generation: 0,
        }
    }

    fn push(&mut self, at: Instant, generation: u64, kind: TimerKind) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Entry {
            at,
            seq,
            generation,
            kind,
        }));
    }

    /// Schedule the next step, replacing any pending one.
    pub fn schedule_step(&mut self, at: Instant) {
        self.step_generation += 1;
        self.push(at, self.step_generation, TimerKind::Step);
    }

    /// Invalidate the pending step timer, if any.
    pub fn cancel_step(&mut self) {
        self.step_generation += 1;
    }

    /// Schedule a gated release for `note`, replacing any pending one.
    pub fn schedule_release(&mut self, note: u8, at: Instant) {
        self.release_generation += 1;
        self.releases.insert(note, self.release_generation);
        self.push(at, self.release_generation, TimerKind::Release(note));
    }

    /// Invalidate the pending release for `note`, if any.
    pub fn cancel_release(&mut self, note: u8) {
        self.releases.remove(&note);
    }

    /// Notes that still have a live gated release pending.
    pub fn pending_releases(&self) -> Vec<u8> {
        self.releases.keys().copied().collect()
    }

    pub fn clear_releases(&mut self) {
        self.releases.clear();
    }

    fn is_live(&self, entry: &Entry) -> bool {
        match entry.kind {
            TimerKind::Step => entry.generation == self.step_generation,
            TimerKind::Release(note) => self.releases.get(&note) == Some(&entry.generation),
        }
    }

    /// Earliest live deadline; prunes orphaned heads as a side effect.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        while let Some(Reverse(head)) = self.heap.peek() {
            if self.is_live(head) {
                return Some(head.at);
            }
            self.heap.pop();
        }
        None
    }

    /// Pop one due, live timer. Orphaned entries are silently dropped.
    pub fn pop_due(&mut self, now: Instant) -> Option<TimerKind> {
        while let Some(Reverse(head)) = self.heap.peek() {
            if head.at > now {
                return None;
            }
            let Reverse(entry) = self.heap.pop().unwrap();
            if !self.is_live(&entry) {
                continue;
            }
            if let TimerKind::Release(note) = entry.kind {
                self.releases.remove(&note);
            }
            return Some(entry.kind);
        }
        None
    }
}
