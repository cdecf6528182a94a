pub mod channel;

pub mod envelope;

pub mod helpers;

pub mod playback;

pub mod pool;

pub mod proc;

pub mod program;

pub mod resources;

pub mod song;

pub mod voice;

pub mod wave;

mod audio_pipe;
pub use audio_pipe::*;

mod audio_stream;
pub use audio_stream::*;

mod synth;
pub use synth::*;

/// Per-chunk ceiling on rendered samples, regardless of rate and channel
/// count. Limits memory exposure only; callers may request any buffer size.
pub const UPDATE_CHUNK: usize = 1024;
