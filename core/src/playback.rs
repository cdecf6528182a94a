//! Verbatim playback of pre-rendered PCM, for percussion and one-shot
//! effects. No envelope, no tuning: a cursor, a gain, and the buffer.

use std::sync::Arc;

use crate::pool::PoolSlot;

pub const PLAYBACK_LIMIT: usize = 32;

/// Where a playback's samples come from: a finished cached sound, or a
/// print still being rendered (addressed by print id; the synth resolves
/// the printed prefix each tick).
pub(crate) enum PlaybackSource {
    Cached(Arc<[f32]>),
    Print(u64),
}

pub struct Playback {
    pub(crate) src: PlaybackSource,
    srcp: usize,
    total: usize,
    trim: f32,
    /// Rides along for when the mixer grows true stereo; today's mono sum
    /// ignores it.
    #[allow(dead_code)]
    pan: f32,
    done: bool,
}

impl Playback {
    pub(crate) fn new_cached(pcm: Arc<[f32]>, trim: f32, pan: f32) -> Self {
        let total = pcm.len();
        Playback {
            src: PlaybackSource::Cached(pcm),
            srcp: 0,
            total,
            trim,
            pan,
            done: total == 0,
        }
    }

    pub(crate) fn new_print(print_id: u64, total: usize, trim: f32, pan: f32) -> Self {
        Playback {
            src: PlaybackSource::Print(print_id),
            srcp: 0,
            total,
            trim,
            pan,
            done: total == 0,
        }
    }

    /// Give up on a playback whose print source disappeared.
    pub(crate) fn cancel(&mut self) {
        self.done = true;
    }

    /// Swap an in-progress print source for its finished buffer, keeping
    /// the cursor.
    pub(crate) fn repoint(&mut self, print_id: u64, pcm: &Arc<[f32]>) {
        if let PlaybackSource::Print(id) = self.src {
            if id == print_id {
                self.src = PlaybackSource::Cached(pcm.clone());
            }
        }
    }

    /// Mix into `buf` from `src`, the currently readable samples. When the
    /// source is a live print, `src` is the printed prefix and the cursor
    /// stalls at its end rather than finishing early.
    pub(crate) fn mix(&mut self, buf: &mut [f32], src: &[f32]) {
        let avail = src.len().min(self.total).saturating_sub(self.srcp);
        let n = avail.min(buf.len());
        for (v, s) in buf[..n].iter_mut().zip(&src[self.srcp..self.srcp + n]) {
            *v += s * self.trim;
        }
        self.srcp += n;
        if self.srcp >= self.total {
            self.done = true;
        }
    }
}

impl PoolSlot for Playback {
    fn is_defunct(&self) -> bool {
        self.done
    }

    /// Playbacks have no release semantics, so capacity pressure takes the
    /// one nearest completion.
    fn eviction_rank(&self) -> u64 {
        (self.total - self.srcp.min(self.total)) as u64
    }
}
