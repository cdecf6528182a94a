//! External collaborator seams: resource lookup and one-shot PCM printing.
//!
//! The synthesizer does not know how songs and sounds are stored, and it
//! does not know how to decode a sound description into PCM. Both live
//! behind these traits; the host wires in its archive reader and its sound
//! compiler at construction.

use std::sync::Arc;

/// Maps (qualifier, id) pairs to read-only serial data and constructs
/// printers for encoded sounds.
pub trait SynthResources: Send + Sync {
    /// Serial bytes of a song resource, or None if absent.
    fn song(&self, qual: u32, id: u32) -> Option<Arc<[u8]>>;

    /// Serial bytes of a sound-effect resource, or None if absent.
    fn sound(&self, qual: u32, id: u32) -> Option<Arc<[u8]>>;

    /// Start decoding an encoded sound into PCM at the given rate.
    /// None if the serial data is malformed.
    fn begin_print(&self, sample_rate: u32, serial: &[u8]) -> Option<Box<dyn PcmPrinter>>;
}

/// An in-progress one-shot PCM render.
///
/// Printers are driven incrementally: each update tick advances every live
/// printer by the tick's frame count, so an expensive decode spreads across
/// buffers instead of stalling one. Playback may begin against the printed
/// prefix before the print completes.
pub trait PcmPrinter: Send {
    /// Total length of the finished PCM, in frames. Known up front.
    fn len(&self) -> usize;

    /// Frames rendered so far.
    fn printed(&self) -> usize;

    /// The rendered prefix, `printed()` frames long.
    fn pcm(&self) -> &[f32];

    /// Render up to `frames` more frames.
    fn update(&mut self, frames: usize);

    /// Hand the finished PCM over for caching, without a copy.
    fn finish(self: Box<Self>) -> Arc<[f32]>;

    fn is_finished(&self) -> bool {
        self.printed() >= self.len()
    }
}
