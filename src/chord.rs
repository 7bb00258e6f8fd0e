//! Chord-name resolution: turns descriptor strings ("Am7", "maj", "F#dim7")
//! into concrete MIDI note sets voiced around middle C.

/// Pitch class for a root name, accepting sharps and flats.
fn note_value(name: &str) -> Option<i16> {
    let v = match name {
        "C" => 0,
        "C#" | "Db" => 1,
        "D" => 2,
        "D#" | "Eb" => 3,
        "E" => 4,
        "F" => 5,
        "F#" | "Gb" => 6,
        "G" => 7,
        "G#" | "Ab" => 8,
        "A" => 9,
        "A#" | "Bb" => 10,
        "B" => 11,
        _ => return None,
    };
    Some(v)
}

/// Semitone intervals for a quality token, root first.
fn quality_intervals(quality: &str) -> Option<&'static [i16]> {
    let intervals: &'static [i16] = match quality {
        "maj" => &[0, 4, 7],
        "min" | "m" => &[0, 3, 7],
        "dim" => &[0, 3, 6],
        "sus4" => &[0, 5, 7],
        "sus2" => &[0, 2, 7],
        "maj7" => &[0, 4, 7, 11],
        "m7" => &[0, 3, 7, 10],
        "7" => &[0, 4, 7, 10],
        "dim7" => &[0, 3, 6, 9],
        "m7b5" => &[0, 3, 6, 10],
        _ => return None,
    };
    Some(intervals)
}

/// Split a descriptor into root and quality. A leading A-G (with optional
/// accidental) names the root; otherwise the whole string is a bare quality
/// rooted on `key`.
fn parse(descriptor: &str, key: &str) -> (String, String) {
    let trimmed = descriptor.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(c @ 'A'..='G') => {
            let mut root = String::from(c);
            let rest = chars.as_str();
            let quality = if let Some(acc) = rest.chars().next().filter(|&a| a == '#' || a == 'b') {
                root.push(acc);
                &rest[1..]
            } else {
                rest
            };
            (root, quality.to_string())
        }
        _ => (key.to_string(), trimmed.to_string()),
    }
}

/// Resolve a chord descriptor to MIDI notes.
///
/// Unknown quality tokens fall back to a major triad; an unknown root
/// resolves to no notes at all. The voicing ascends from the root and is
/// shifted by whole octaves so its average pitch lands near MIDI 60.
pub fn resolve(descriptor: &str, key: &str) -> Vec<u8> {
    let (root, mut quality) = parse(descriptor, key);
    quality = quality.trim().to_lowercase();
    if quality.is_empty() {
        quality = "maj".to_string();
    }

    let intervals = match quality_intervals(&quality) {
        Some(iv) => iv,
        None => {
            log::warn!("unknown chord quality {:?}, defaulting to major triad", quality);
            quality_intervals("maj").unwrap()
        }
    };

    let root_value = match note_value(&root) {
        Some(v) => v,
        None => {
            log::warn!("unknown chord root {:?}", root);
            return Vec::new();
        }
    };

    let base = 48 + root_value;
    let mut notes: Vec<i16> = intervals.iter().map(|iv| base + iv).collect();

    // Force ascending order within the chord
    for i in 1..notes.len() {
        while notes[i] < notes[i - 1] {
            notes[i] += 12;
        }
    }

    // Shift whole octaves to center the average pitch near middle C
    let average = notes.iter().sum::<i16>() as f64 / notes.len() as f64;
    let octave_shift = ((60.0 - average) / 12.0).round() as i16 * 12;

    notes
        .into_iter()
        .map(|n| n + octave_shift)
        .filter(|n| (0..=127).contains(n))
        .map(|n| n as u8)
        .collect()
}
