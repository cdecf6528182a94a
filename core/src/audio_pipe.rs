use crate::AudioStreamParams;

/// An object to read audio samples from.
///
/// The host audio driver's callback is expected to hold whatever lock it
/// uses to exclude control calls, then pull samples from here once per
/// hardware buffer.
pub trait AudioPipe {
    /// The audio stream parameters of the audio pipe.
    fn stream_params(&self) -> &'_ AudioStreamParams;

    /// Reads interleaved samples from the pipe.
    ///
    /// The amount of samples read determines how far the song sequencer and
    /// every live note advance. For example, reading 44100 samples at a
    /// 44.1kHz mono stream renders exactly one second of the active song.
    fn read_samples(&mut self, to: &mut [f32]) {
        assert!(to.len() % self.stream_params().channels as usize == 0);
        self.read_samples_unchecked(to);
    }

    /// Reads samples from the pipe without checking the channel count of the output.
    fn read_samples_unchecked(&mut self, to: &mut [f32]);
}
