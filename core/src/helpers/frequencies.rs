use lazy_static::lazy_static;

/// Create an array of note frequencies for note ids 0-127
fn build_frequencies() -> [f32; 128] {
    let mut freqs = [0.0f32; 128];
    for (note, freq) in freqs.iter_mut().enumerate() {
        *freq = 2.0f32.powf((note as f32 - 69.0) / 12.0) * 440.0;
    }
    freqs
}

lazy_static! {
    /// Static array of all frequencies for note ids 0-127.
    pub static ref FREQS: [f32; 128] = build_frequencies();
}

#[cfg(test)]
mod tests {
    use super::FREQS;

    #[test]
    fn concert_pitch_reference() {
        assert!((FREQS[69] - 440.0).abs() < 1e-3);
        assert!((FREQS[57] - 220.0).abs() < 1e-3);
        assert!((FREQS[60] - 261.6256).abs() < 1e-2);
    }
}
