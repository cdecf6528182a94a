//! Queue-fronted wrapper around the synthesizer engine.
//!
//! The engine itself is single-threaded: every control operation must be
//! excluded from the render call. This crate implements the lock-free way
//! of doing that: control threads append commands to an unbounded channel,
//! and the audio callback drains the whole queue at the top of each render.
//! The callback never takes a lock and never allocates for a command.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;

use bleep_core::{AudioPipe, AudioStreamParams, Synth, SynthError, SynthStatsReader};

mod config;
pub use config::*;

mod command;
pub use command::*;

/// The audio-side half: owns the engine and the receiving end of the
/// command queue. Hand this to the audio thread and call a render method
/// once per hardware buffer.
pub struct RealtimeSynth {
    synth: Synth,
    receiver: Receiver<SynthCommand>,
    playhead_ms: Arc<AtomicI64>,
}

impl RealtimeSynth {
    pub fn new(config: RealtimeSynthConfig) -> Result<(Self, SynthCommandSender), SynthError> {
        let synth = Synth::new(config.audio_params, config.resources)?;
        let (sender, receiver) = crossbeam_channel::unbounded();
        let playhead_ms = Arc::new(AtomicI64::new(-1));
        let handle = SynthCommandSender::new(sender, playhead_ms.clone());
        Ok((
            RealtimeSynth {
                synth,
                receiver,
                playhead_ms,
            },
            handle,
        ))
    }

    pub fn stream_params(&self) -> &AudioStreamParams {
        self.synth.stream_params()
    }

    pub fn stats_reader(&self) -> SynthStatsReader {
        self.synth.stats_reader()
    }

    /// Drain pending commands, then fill an interleaved float buffer.
    pub fn render_f32(&mut self, buf: &mut [f32]) {
        self.apply_pending_commands();
        self.synth.read_samples_f32(buf);
        self.publish_playhead();
    }

    /// Drain pending commands, then fill an interleaved i16 buffer.
    pub fn render_i16(&mut self, buf: &mut [i16]) {
        self.apply_pending_commands();
        self.synth.read_samples_i16(buf);
        self.publish_playhead();
    }

    fn apply_pending_commands(&mut self) {
        while let Ok(command) = self.receiver.try_recv() {
            match command {
                SynthCommand::PlaySong {
                    qual,
                    id,
                    force,
                    repeat,
                } => self.synth.play_song(qual, id, force, repeat),
                SynthCommand::PlaySongBytes {
                    bytes,
                    force,
                    repeat,
                } => self.synth.play_song_from_bytes(&bytes, force, repeat),
                SynthCommand::StopSong => self.synth.play_song_from_bytes(&[], false, false),
                SynthCommand::PlaySound {
                    qual,
                    id,
                    trim,
                    pan,
                } => self.synth.play_sound(qual, id, trim, pan),
                SynthCommand::PlaySoundBytes { bytes, trim, pan } => {
                    self.synth.play_sound_from_bytes(&bytes, trim, pan)
                }
                SynthCommand::ChannelEvent { chid, opcode, a, b } => {
                    self.synth.channel_event(chid, opcode, a, b)
                }
                SynthCommand::SetQuantizeLevel(level) => self.synth.set_quantize_level(level),
            }
        }
        // Commands issued after this point wait for the next buffer.
    }

    fn publish_playhead(&self) {
        let ms = self.synth.get_playhead().map_or(-1, |v| v as i64);
        self.playhead_ms.store(ms, Ordering::Relaxed);
    }
}

impl AudioPipe for RealtimeSynth {
    fn stream_params(&self) -> &AudioStreamParams {
        self.synth.stream_params()
    }

    fn read_samples_unchecked(&mut self, to: &mut [f32]) {
        self.render_f32(to);
    }
}
