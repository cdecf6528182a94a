mod frequencies;
pub use frequencies::*;

/// Multiplier that detunes a frequency by the given amount of cents.
pub fn cents_factor(cents: f32) -> f32 {
    2.0f32.powf(cents / 1200.0)
}

/// Convert a duration in milliseconds to frames at the given rate.
/// Nonzero durations never round down to zero.
pub fn frames_from_ms(ms: u32, sample_rate: u32) -> i32 {
    if ms == 0 {
        return 0;
    }
    let frames = (ms as u64 * sample_rate as u64) / 1000;
    (frames as i32).max(1)
}
