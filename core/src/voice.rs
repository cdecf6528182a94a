//! Tuned voices: one enveloped oscillator per sounding note.

use std::sync::Arc;

use crate::envelope::Envelope;
use crate::pool::PoolSlot;
use crate::wave::Wavetable;

pub const VOICE_LIMIT: usize = 16;

/// Channel id marking a voice or proc that can no longer be addressed by
/// channel events. It keeps sounding, but note-off and retune pass it by.
pub(crate) const UNADDRESSED: u8 = 0xff;

/// Who started a signal object. Song-origin objects are the ones a song
/// transition waits for; user-origin objects ride out transitions untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    User,
    Song,
}

/// Oscillator behavior past the shared phase accumulator.
pub(crate) enum OscMode {
    /// Wavetable lookup, nothing else.
    Wave,
    /// Envelope-driven crossfade between the reference sine and the
    /// channel's own wave. The growl intensifies and fades with `mix`.
    Rock { mix: Envelope },
    /// Phase modulation by a sine modulator. `moddp` is fixed at note start:
    /// a multiple of the carrier rate (relative mode) or an absolute rate.
    Fm { modp: u32, moddp: u32, range: Envelope },
}

pub struct Voice {
    pub(crate) chid: u8,
    pub(crate) noteid: u8,
    origin: Option<Origin>,
    birthday: u64,
    p: u32,
    dp: u32,
    dp0: u32, // before the pitch wheel
    wave: Arc<Wavetable>,
    level: Envelope,
    osc: OscMode,
}

impl Voice {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        chid: u8,
        noteid: u8,
        origin: Origin,
        birthday: u64,
        dp0: u32,
        bend: f32,
        wave: Arc<Wavetable>,
        level: Envelope,
        osc: OscMode,
    ) -> Self {
        Voice {
            chid,
            noteid,
            origin: Some(origin),
            birthday,
            p: 0,
            dp: apply_bend(dp0, bend),
            dp0,
            wave,
            level,
            osc,
        }
    }

    pub(crate) fn origin(&self) -> Option<Origin> {
        self.origin
    }

    pub(crate) fn is_song(&self) -> bool {
        self.origin == Some(Origin::Song)
    }

    pub(crate) fn is_live_note(&self, chid: u8, noteid: u8) -> bool {
        self.origin.is_some() && self.chid == chid && self.noteid == noteid
    }

    /// Ask the envelopes to wind down; the pool reclaims the slot once the
    /// level envelope reports finished.
    pub(crate) fn release(&mut self) {
        self.level.release();
        match &mut self.osc {
            OscMode::Rock { mix } => mix.release(),
            OscMode::Fm { range, .. } => range.release(),
            OscMode::Wave => {}
        }
    }

    /// Detach from channel addressing so a replacement note can take over
    /// the (chid, noteid) identity while this one drains.
    pub(crate) fn unaddress(&mut self) {
        self.chid = UNADDRESSED;
    }

    /// Re-derive the effective increment from the unbent one. Called when
    /// the owning channel's pitch wheel turns; the note does not restart.
    pub(crate) fn retune(&mut self, bend: f32) {
        self.dp = apply_bend(self.dp0, bend);
    }

    pub(crate) fn update(&mut self, buf: &mut [f32], sine: &Wavetable) {
        match &mut self.osc {
            OscMode::Wave => {
                for v in buf.iter_mut() {
                    *v += self.wave.at(self.p) * self.level.next();
                    self.p = self.p.wrapping_add(self.dp);
                }
            }
            OscMode::Rock { mix } => {
                for v in buf.iter_mut() {
                    let m = mix.next();
                    let wet = self.wave.at(self.p);
                    let dry = sine.at(self.p);
                    *v += (wet * m + dry * (1.0 - m)) * self.level.next();
                    self.p = self.p.wrapping_add(self.dp);
                }
            }
            OscMode::Fm { modp, moddp, range } => {
                let fdp = self.dp as f32;
                for v in buf.iter_mut() {
                    *v += self.wave.at(self.p) * self.level.next();
                    let m = sine.at(*modp) * range.next();
                    *modp = modp.wrapping_add(*moddp);
                    let dp = self.dp.wrapping_add((fdp * m) as i64 as u32);
                    self.p = self.p.wrapping_add(dp);
                }
            }
        }
        if self.level.is_finished() {
            self.origin = None;
        }
    }
}

pub(crate) fn apply_bend(dp0: u32, bend: f32) -> u32 {
    (dp0 as f32 * bend) as u32
}

impl PoolSlot for Voice {
    fn is_defunct(&self) -> bool {
        self.origin.is_none()
    }

    fn eviction_rank(&self) -> u64 {
        self.birthday
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::EnvelopeConfig;

    fn test_voice(dp0: u32) -> Voice {
        let config = EnvelopeConfig::level(44100, 0x20, 0x20, 0x80, 0x40, 0x00);
        let mut level = Envelope::init(&config, 127);
        level.set_sustain(i32::MAX);
        Voice::new(
            0,
            60,
            Origin::User,
            0,
            dp0,
            1.0,
            Arc::new(Wavetable::sine()),
            level,
            OscMode::Wave,
        )
    }

    #[test]
    fn phase_accumulator_wraps_bit_exact() {
        // An increment that divides 2^32 exactly: the phase must return to
        // its starting table index with no drift whatsoever.
        let dp = 1u32 << 22; // 1024-sample period
        let mut voice = test_voice(dp);
        let sine = Wavetable::sine();
        let mut buf = [0.0f32; 1024];
        voice.update(&mut buf, &sine);
        assert_eq!(voice.p, 0);
    }

    #[test]
    fn phase_accumulator_is_pure_wrapping_arithmetic() {
        let dp = 0x01234567u32;
        let mut voice = test_voice(dp);
        let sine = Wavetable::sine();
        let mut buf = [0.0f32; 300];
        voice.update(&mut buf, &sine);
        assert_eq!(voice.p, dp.wrapping_mul(300));
    }

    #[test]
    fn retune_scales_unbent_increment() {
        let mut voice = test_voice(1 << 20);
        voice.retune(2.0);
        assert_eq!(voice.dp, 1 << 21);
        voice.retune(1.0);
        assert_eq!(voice.dp, 1 << 20);
    }

    #[test]
    fn voice_goes_defunct_when_envelope_finishes() {
        let config = EnvelopeConfig::level(44100, 0x00, 0x00, 0x80, 0x40, 0x00);
        let level = Envelope::init(&config, 127);
        let mut voice = Voice::new(
            0,
            60,
            Origin::Song,
            0,
            1 << 20,
            1.0,
            Arc::new(Wavetable::sine()),
            level,
            OscMode::Wave,
        );
        voice.release();
        let sine = Wavetable::sine();
        let mut buf = vec![0.0f32; 44100];
        voice.update(&mut buf, &sine);
        assert!(voice.is_defunct());
    }
}
