//! Custom per-channel signal generators.
//!
//! A proc is the attachment point for anything a plain [`Voice`] cannot
//! express: private state, internal polyphony, post-processing. The
//! subtractive instrument mode lives behind this trait; future modes with
//! their own state shapes slot in the same way.
//!
//! [`Voice`]: crate::voice::Voice

use crate::pool::PoolSlot;
use crate::voice::Origin;

pub const PROC_LIMIT: usize = 16;

/// Noteid marking a proc attached to its channel rather than to one note.
/// Channel-attached procs consume every note event on their channel.
pub(crate) const NOTE_UNADDRESSED: u8 = 0xff;

/// The capability set of a custom generator. Only `update` and `finished`
/// are required; the rest default to ignoring the event, like an absent
/// capability. Cleanup on deletion or eviction is `Drop`.
pub trait Processor: Send {
    /// Add this generator's signal into `buf` (mono frames).
    fn update(&mut self, buf: &mut [f32]);

    /// True once the generator has fully wound down after `release` and its
    /// slot may be reclaimed.
    fn finished(&self) -> bool;

    /// A note event addressed to this proc's channel.
    fn note(&mut self, noteid: u8, velocity: u8, dur_frames: i32) {
        let _ = (noteid, velocity, dur_frames);
    }

    /// The channel's pitch wheel turned.
    fn wheel(&mut self, value: u8) {
        let _ = value;
    }

    /// Begin winding down. The proc keeps rendering until `finished`.
    fn release(&mut self) {}
}

/// A pooled proc slot: a boxed generator plus the addressing and eviction
/// bookkeeping shared with voices.
pub struct Proc {
    pub(crate) chid: u8,
    pub(crate) noteid: u8,
    origin: Option<Origin>,
    birthday: u64,
    released: bool,
    inner: Box<dyn Processor>,
}

impl Proc {
    pub(crate) fn new_for_channel(
        chid: u8,
        origin: Origin,
        birthday: u64,
        inner: Box<dyn Processor>,
    ) -> Self {
        Proc {
            chid,
            noteid: NOTE_UNADDRESSED,
            origin: Some(origin),
            birthday,
            released: false,
            inner,
        }
    }

    pub(crate) fn origin(&self) -> Option<Origin> {
        self.origin
    }

    pub(crate) fn is_song(&self) -> bool {
        self.origin == Some(Origin::Song)
    }

    /// True for the proc that should consume note events on `chid`.
    pub(crate) fn consumes_notes_for(&self, chid: u8) -> bool {
        self.origin.is_some() && self.chid == chid && self.noteid == NOTE_UNADDRESSED
    }

    pub(crate) fn note(&mut self, noteid: u8, velocity: u8, dur_frames: i32) {
        self.inner.note(noteid, velocity, dur_frames);
    }

    pub(crate) fn wheel(&mut self, value: u8) {
        self.inner.wheel(value);
    }

    pub(crate) fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.inner.release();
        }
    }

    pub(crate) fn unaddress(&mut self) {
        self.chid = crate::voice::UNADDRESSED;
    }

    pub(crate) fn update(&mut self, buf: &mut [f32]) {
        self.inner.update(buf);
        if self.released && self.inner.finished() {
            self.origin = None;
        }
    }
}

impl PoolSlot for Proc {
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
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct Counting {
        drops: Arc<AtomicU32>,
        notes: u32,
        released: bool,
    }

    impl Processor for Counting {
        fn update(&mut self, buf: &mut [f32]) {
            for v in buf.iter_mut() {
                *v += 1.0;
            }
        }
        fn finished(&self) -> bool {
            self.released
        }
        fn note(&mut self, _noteid: u8, _velocity: u8, _dur: i32) {
            self.notes += 1;
        }
        fn release(&mut self) {
            self.released = true;
        }
    }

    impl Drop for Counting {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn released_proc_retires_after_update() {
        let drops = Arc::new(AtomicU32::new(0));
        let mut proc = Proc::new_for_channel(
            3,
            Origin::Song,
            0,
            Box::new(Counting {
                drops: drops.clone(),
                notes: 0,
                released: false,
            }),
        );
        assert!(proc.consumes_notes_for(3));
        assert!(!proc.consumes_notes_for(2));

        let mut buf = [0.0f32; 8];
        proc.update(&mut buf);
        assert!(!proc.is_defunct());

        proc.release();
        proc.update(&mut buf);
        assert!(proc.is_defunct());

        drop(proc);
        assert_eq!(drops.load(Ordering::SeqCst), 1, "cleanup runs on drop");
    }
}
