use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;

/// One control operation, queued from any thread and applied at the top of
/// the next render. Exactly the operations of the engine's control surface.
#[derive(Debug, Clone)]
pub enum SynthCommand {
    PlaySong {
        qual: u32,
        id: u32,
        force: bool,
        repeat: bool,
    },
    PlaySongBytes {
        bytes: Arc<[u8]>,
        force: bool,
        repeat: bool,
    },
    StopSong,
    PlaySound {
        qual: u32,
        id: u32,
        trim: f32,
        pan: f32,
    },
    PlaySoundBytes {
        bytes: Arc<[u8]>,
        trim: f32,
        pan: f32,
    },
    ChannelEvent {
        chid: u8,
        opcode: u8,
        a: u8,
        b: u8,
    },
    SetQuantizeLevel(f32),
}

/// Cloneable, non-blocking handle to the command queue. Sends never block
/// and never touch the synthesizer directly; the audio side applies them
/// before its next buffer.
#[derive(Clone)]
pub struct SynthCommandSender {
    sender: Sender<SynthCommand>,
    playhead_ms: Arc<AtomicI64>,
}

impl SynthCommandSender {
    pub(crate) fn new(sender: Sender<SynthCommand>, playhead_ms: Arc<AtomicI64>) -> Self {
        Self {
            sender,
            playhead_ms,
        }
    }

    pub fn send(&self, command: SynthCommand) {
        // The queue is unbounded; a send can only fail when the audio side
        // is gone, and then there is nobody left to care.
        let _ = self.sender.send(command);
    }

    pub fn play_song(&self, qual: u32, id: u32, force: bool, repeat: bool) {
        self.send(SynthCommand::PlaySong {
            qual,
            id,
            force,
            repeat,
        });
    }

    pub fn play_song_from_bytes(&self, bytes: Arc<[u8]>, force: bool, repeat: bool) {
        self.send(SynthCommand::PlaySongBytes {
            bytes,
            force,
            repeat,
        });
    }

    pub fn stop_song(&self) {
        self.send(SynthCommand::StopSong);
    }

    pub fn play_sound(&self, qual: u32, id: u32, trim: f32, pan: f32) {
        self.send(SynthCommand::PlaySound {
            qual,
            id,
            trim,
            pan,
        });
    }

    pub fn play_sound_from_bytes(&self, bytes: Arc<[u8]>, trim: f32, pan: f32) {
        self.send(SynthCommand::PlaySoundBytes { bytes, trim, pan });
    }

    pub fn channel_event(&self, chid: u8, opcode: u8, a: u8, b: u8) {
        self.send(SynthCommand::ChannelEvent { chid, opcode, a, b });
    }

    /// Song position as of the last completed render, in milliseconds.
    /// None when no song is active.
    pub fn playhead(&self) -> Option<u32> {
        let ms = self.playhead_ms.load(Ordering::Relaxed);
        if ms < 0 {
            None
        } else {
            Some(ms as u32)
        }
    }
}
