//! Channel slots: the unit songs and the control API address.
//!
//! A channel binds an instrument program to trim, pan and pitch-bend state.
//! Applying a program header rebuilds everything from the program table;
//! per-channel trim is baked into the level envelope config once at that
//! point so voices never multiply it per sample.

use std::sync::Arc;

use crate::envelope::EnvelopeConfig;
use crate::helpers::cents_factor;
use crate::program::{self, Builtin, SubSynth, PARAM_VARIATION};
use crate::proc::Processor;
use crate::wave::{WaveShape, Wavetable};

mod event;
pub use event::*;

pub const CHANNEL_COUNT: usize = 8;

/// Default pitch-wheel deflection range, in cents.
const WHEEL_RANGE_DEFAULT: f32 = 200.0;
const WHEEL_CENTER: u8 = 0x40;

/// Level envelope used by Blip programs and as the fallback for anything
/// the table cannot resolve.
const BLIP_LEVEL: u8 = 0x4a; // pluck, attack 1, release 2

/// Per-channel synthesis data resolved from the program table.
pub(crate) enum ChannelMode {
    /// Straight wavetable lookup.
    Wave,
    /// Wavetable with a sine crossfade driven by a second envelope.
    Rock { mix: EnvelopeConfig },
    /// FM, modulator rate a multiple of the note's pitch.
    FmRel { rate: f32, range: EnvelopeConfig },
    /// FM, modulator rate fixed; the increment is precomputed.
    FmAbs { moddp: u32, range: EnvelopeConfig },
    /// Notes are consumed by the channel-attached proc.
    Sub,
    /// Notes trigger one-shot sound effects from this kit.
    Drum { base: u16 },
}

pub struct Channel {
    pub(crate) chid: u8,
    pub(crate) pid: u8,
    trim: f32,
    pan: f32,
    wheel: u8,
    wheel_range: f32, // cents
    bend: f32,
    mode: ChannelMode,
    wave: Arc<Wavetable>,
    level_raw: EnvelopeConfig,
    level: EnvelopeConfig, // trim baked in
}

impl Channel {
    /// The state a channel has before any song header touches it: the
    /// reference sine and a middling envelope, so API-injected notes are
    /// audible on a fresh context.
    pub(crate) fn new_default(chid: u8, sample_rate: u32, sine: &Arc<Wavetable>) -> Self {
        let level_raw = default_level(sample_rate);
        let mut channel = Channel {
            chid,
            pid: 0,
            trim: 0.5,
            pan: 0.0,
            wheel: WHEEL_CENTER,
            wheel_range: WHEEL_RANGE_DEFAULT,
            bend: 1.0,
            mode: ChannelMode::Wave,
            wave: sine.clone(),
            level_raw,
            level: level_raw,
        };
        channel.rebake();
        channel
    }

    /// Build a channel from a song's 4-byte per-channel header.
    ///
    /// Returns the channel, a processor to attach for proc-backed modes,
    /// and whether the program could not be honored and fell back to
    /// default behavior.
    pub(crate) fn from_header(
        chid: u8,
        header: &[u8; 4],
        sample_rate: u32,
        sine: &Arc<Wavetable>,
        seed: u64,
    ) -> (Self, Option<Box<dyn Processor>>, bool) {
        let pid = header[0];
        let trim = header[1] as f32 / 255.0;
        let pan = header[2] as f32 / 128.0 - 1.0;
        Self::with_program(chid, pid, trim, pan, sample_rate, sine, seed)
    }

    pub(crate) fn with_program(
        chid: u8,
        pid: u8,
        trim: f32,
        pan: f32,
        sample_rate: u32,
        sine: &Arc<Wavetable>,
        seed: u64,
    ) -> (Self, Option<Box<dyn Processor>>, bool) {
        let mut spawned: Option<Box<dyn Processor>> = None;
        let mut fallback = false;

        let (mode, wave, level_raw) = if pid >= 0x80 {
            // Drum kit: the level config is unused, notes become one-shots.
            (
                ChannelMode::Drum {
                    base: (pid as u16 - 0x80) * 0x80,
                },
                sine.clone(),
                EnvelopeConfig::default(),
            )
        } else {
            match *program::builtin(pid) {
                Builtin::Blip => (
                    ChannelMode::Wave,
                    Arc::new(Wavetable::shape(WaveShape::Square)),
                    EnvelopeConfig::tiny(sample_rate, BLIP_LEVEL),
                ),
                Builtin::Wave { wave, level } => (
                    ChannelMode::Wave,
                    Arc::new(Wavetable::harmonics(sine, &wave)),
                    EnvelopeConfig::tiny(sample_rate, level),
                ),
                Builtin::Rock { wave, mix, level } => {
                    let level_cfg = EnvelopeConfig::tiny(sample_rate, level);
                    let mix_cfg = EnvelopeConfig::parameter(
                        &level_cfg,
                        program::packed_points(mix),
                        PARAM_VARIATION,
                    );
                    (
                        ChannelMode::Rock { mix: mix_cfg },
                        Arc::new(Wavetable::harmonics(sine, &wave)),
                        level_cfg,
                    )
                }
                Builtin::FmRel {
                    rate,
                    scale,
                    range,
                    level,
                } => {
                    let level_cfg = EnvelopeConfig::tiny(sample_rate, level);
                    let mut range_cfg = EnvelopeConfig::parameter(
                        &level_cfg,
                        program::packed_points(range),
                        PARAM_VARIATION,
                    );
                    range_cfg.gain(scale as f32 / 16.0);
                    (
                        ChannelMode::FmRel {
                            rate: rate as f32 / 16.0,
                            range: range_cfg,
                        },
                        sine.clone(),
                        level_cfg,
                    )
                }
                Builtin::FmAbs {
                    rate,
                    scale,
                    range,
                    level,
                } => {
                    let level_cfg = EnvelopeConfig::tiny(sample_rate, level);
                    let mut range_cfg = EnvelopeConfig::parameter(
                        &level_cfg,
                        program::packed_points(range),
                        PARAM_VARIATION,
                    );
                    range_cfg.gain(scale as f32 / 16.0);
                    // rate is 8.8 fixed-point Hz; precompute the phase step.
                    let nrate = rate as f32 / (256.0 * sample_rate as f32);
                    let moddp = (nrate as f64 * 4294967296.0) as u32;
                    (
                        ChannelMode::FmAbs {
                            moddp,
                            range: range_cfg,
                        },
                        sine.clone(),
                        level_cfg,
                    )
                }
                Builtin::Sub {
                    width1,
                    width2,
                    gain,
                    level,
                } => {
                    let level_cfg = EnvelopeConfig::tiny(sample_rate, level);
                    spawned = Some(Box::new(SubSynth::new(
                        sample_rate,
                        width1,
                        width2,
                        gain,
                        level_cfg,
                        trim,
                        seed,
                    )));
                    (ChannelMode::Sub, sine.clone(), level_cfg)
                }
                Builtin::Fx { .. } | Builtin::Alias(_) => {
                    // Unimplemented or dangling; the update path must never
                    // fail, so fall back to default behavior.
                    fallback = true;
                    (ChannelMode::Wave, sine.clone(), default_level(sample_rate))
                }
            }
        };

        let mut channel = Channel {
            chid,
            pid,
            trim,
            pan,
            wheel: WHEEL_CENTER,
            wheel_range: WHEEL_RANGE_DEFAULT,
            bend: 1.0,
            mode,
            wave,
            level_raw,
            level: level_raw,
        };
        channel.rebake();
        (channel, spawned, fallback)
    }

    fn rebake(&mut self) {
        self.level = self.level_raw;
        self.level.gain(self.trim);
    }

    pub(crate) fn mode(&self) -> &ChannelMode {
        &self.mode
    }

    pub(crate) fn level(&self) -> &EnvelopeConfig {
        &self.level
    }

    pub(crate) fn wave(&self) -> Arc<Wavetable> {
        self.wave.clone()
    }

    pub(crate) fn bend(&self) -> f32 {
        self.bend
    }

    pub(crate) fn trim(&self) -> f32 {
        self.trim
    }

    pub(crate) fn pan(&self) -> f32 {
        self.pan
    }

    /// Control change. Only volume and pan are honored.
    pub(crate) fn control(&mut self, key: u8, value: u8) {
        match key {
            CONTROL_VOLUME => {
                self.trim = (value & 0x7f) as f32 / 127.0;
                self.rebake();
            }
            CONTROL_PAN => {
                self.pan = (value & 0x7f) as f32 / 64.0 - 1.0;
            }
            _ => {}
        }
    }

    /// Turn the pitch wheel. Returns the new bend multiplier when live
    /// voices on this channel need retuning in place.
    pub(crate) fn set_wheel(&mut self, value: u8) -> Option<f32> {
        if value == self.wheel {
            return None;
        }
        self.wheel = value;
        if self.wheel_range <= 0.0 {
            return None;
        }
        if matches!(self.mode, ChannelMode::Drum { .. }) {
            return None;
        }
        self.bend = cents_factor(
            ((value as f32 - WHEEL_CENTER as f32) * self.wheel_range) / 128.0,
        );
        Some(self.bend)
    }
}

fn default_level(sample_rate: u32) -> EnvelopeConfig {
    EnvelopeConfig::level(sample_rate, 0x80, 0x80, 0x80, 0x80, 0x80)
}
