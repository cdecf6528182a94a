//! The synthesizer context: pools, channels, sequencer and mixer.
//!
//! Everything here runs on whichever thread the host audio driver calls
//! from. Control entry points must be excluded from the render call by the
//! caller (driver lock or a command queue drained before rendering); inside
//! a render there is no allocation, no blocking and no error path. All
//! fallibility is either construction-time or silently absorbed into the
//! stats counters.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::channel::{decode_event, Channel, ChannelAudioEvent, ChannelMode, CHANNEL_COUNT};
use crate::envelope::Envelope;
use crate::helpers::{frames_from_ms, FREQS};
use crate::playback::{Playback, PlaybackSource, PLAYBACK_LIMIT};
use crate::pool::{Pool, PoolSlot};
use crate::proc::{Proc, PROC_LIMIT};
use crate::resources::{PcmPrinter, SynthResources};
use crate::song::{Song, SongEvent};
use crate::voice::{apply_bend, Origin, OscMode, Voice, VOICE_LIMIT};
use crate::wave::Wavetable;
use crate::{AudioPipe, AudioStreamParams, UPDATE_CHUNK};

/// Default scale applied when quantizing float samples to i16.
pub const QUANTIZE_LEVEL_DEFAULT: f32 = 32000.0;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("unsupported sample rate {0}")]
    InvalidSampleRate(u32),
    #[error("unsupported channel count {0}")]
    InvalidChannelCount(u16),
}

#[derive(Default)]
struct StatsInner {
    malformed_songs: AtomicU32,
    malformed_sounds: AtomicU32,
    missing_resources: AtomicU32,
    program_fallbacks: AtomicU32,
    voice_evictions: AtomicU32,
    proc_evictions: AtomicU32,
    playback_evictions: AtomicU32,
    dropped_events: AtomicU32,
}

fn bump(counter: &AtomicU32) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Snapshot of the silently-absorbed-error counters. The render path never
/// reports errors; these are the side channel for noticing them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SynthStats {
    pub malformed_songs: u32,
    pub malformed_sounds: u32,
    pub missing_resources: u32,
    pub program_fallbacks: u32,
    pub voice_evictions: u32,
    pub proc_evictions: u32,
    pub playback_evictions: u32,
    pub dropped_events: u32,
}

/// Cloneable handle for sampling [`SynthStats`] from any thread without
/// touching the audio path.
#[derive(Clone)]
pub struct SynthStatsReader {
    inner: Arc<StatsInner>,
}

impl SynthStatsReader {
    pub fn read(&self) -> SynthStats {
        let s = &self.inner;
        SynthStats {
            malformed_songs: s.malformed_songs.load(Ordering::Relaxed),
            malformed_sounds: s.malformed_sounds.load(Ordering::Relaxed),
            missing_resources: s.missing_resources.load(Ordering::Relaxed),
            program_fallbacks: s.program_fallbacks.load(Ordering::Relaxed),
            voice_evictions: s.voice_evictions.load(Ordering::Relaxed),
            proc_evictions: s.proc_evictions.load(Ordering::Relaxed),
            playback_evictions: s.playback_evictions.load(Ordering::Relaxed),
            dropped_events: s.dropped_events.load(Ordering::Relaxed),
        }
    }
}

struct PrintSlot {
    id: u64,
    ident: Option<(u32, u32)>,
    printer: Box<dyn PcmPrinter>,
}

struct CacheEntry {
    key: (u32, u32),
    pcm: Arc<[f32]>,
}

pub struct Synth {
    stream_params: AudioStreamParams,
    resources: Option<Arc<dyn SynthResources>>,
    framec: u64,
    quantize_level: f32,
    staging: Vec<f32>,
    channels: [Channel; CHANNEL_COUNT],
    voices: Pool<Voice, VOICE_LIMIT>,
    procs: Pool<Proc, PROC_LIMIT>,
    playbacks: Pool<Playback, PLAYBACK_LIMIT>,
    song: Option<Song>,
    song_next: Option<Song>,
    transition: bool,
    freq_i: [u32; 128],
    sine: Arc<Wavetable>,
    prints: Vec<PrintSlot>,
    next_print_id: u64,
    cache: Vec<CacheEntry>,
    preprint_frames: usize,
    stats: Arc<StatsInner>,
}

impl Synth {
    /// Construct a context. The resource provider maps (qualifier, id)
    /// pairs to song and sound serial data and builds PCM printers; without
    /// one, only the `*_from_bytes` entry points do anything.
    pub fn new(
        params: AudioStreamParams,
        resources: Option<Arc<dyn SynthResources>>,
    ) -> Result<Synth, SynthError> {
        if !(200..=200_000).contains(&params.sample_rate) {
            return Err(SynthError::InvalidSampleRate(params.sample_rate));
        }
        if !(1..=8).contains(&params.channels) {
            return Err(SynthError::InvalidChannelCount(params.channels));
        }
        let sine = Arc::new(Wavetable::sine());
        let rate = params.sample_rate;
        let freq_i = std::array::from_fn(|noteid| {
            let normalized = FREQS[noteid] / rate as f32;
            (normalized as f64 * 4294967296.0) as u32
        });
        let chanc = params.channels as usize;
        let staging_len = (UPDATE_CHUNK / chanc) * chanc;
        Ok(Synth {
            stream_params: params,
            resources,
            framec: 0,
            quantize_level: QUANTIZE_LEVEL_DEFAULT,
            staging: vec![0.0; staging_len],
            channels: std::array::from_fn(|chid| Channel::new_default(chid as u8, rate, &sine)),
            voices: Pool::new(),
            procs: Pool::new(),
            playbacks: Pool::new(),
            song: None,
            song_next: None,
            transition: false,
            freq_i,
            sine,
            prints: Vec::new(),
            next_print_id: 1,
            cache: Vec::new(),
            preprint_frames: 0,
            stats: Arc::new(StatsInner::default()),
        })
    }

    pub fn stream_params(&self) -> &AudioStreamParams {
        &self.stream_params
    }

    /// Scale used by [`read_samples_i16`](Self::read_samples_i16).
    pub fn set_quantize_level(&mut self, level: f32) {
        self.quantize_level = level;
    }

    pub fn stats(&self) -> SynthStats {
        self.stats_reader().read()
    }

    pub fn stats_reader(&self) -> SynthStatsReader {
        SynthStatsReader {
            inner: self.stats.clone(),
        }
    }

    /// The program id currently bound to a channel.
    pub fn channel_program(&self, chid: u8) -> Option<u8> {
        self.channels.get(chid as usize).map(|c| c.pid)
    }

    /// Count of live (not yet finished) voices, for diagnostics.
    pub fn live_voices(&self) -> usize {
        self.voices.iter().filter(|v| !v.is_defunct()).count()
    }

    /* Rendering.
     *************************************************************/

    /// Fill an interleaved float buffer. The length should be a multiple of
    /// the channel count; a ragged tail is left untouched.
    pub fn read_samples_f32(&mut self, buf: &mut [f32]) {
        let chanc = self.stream_params.channels as usize;
        let usable = buf.len() - buf.len() % chanc;
        let buf = &mut buf[..usable];
        self.run_printers(buf.len() / chanc);
        buf.fill(0.0);
        let chunk = (UPDATE_CHUNK / chanc).max(1) * chanc;
        for part in buf.chunks_mut(chunk) {
            self.update_chunk(part);
        }
        self.preprint_frames = 0;
        self.finalize_prints();
        // Defunct objects retire from the end of each pool; stragglers in
        // the middle are found at the next insertion.
        self.voices.retire_tail();
        self.procs.retire_tail();
        self.playbacks.retire_tail();
    }

    /// Fill an interleaved i16 buffer, quantizing by the configured level
    /// and clamping to the integer range.
    pub fn read_samples_i16(&mut self, buf: &mut [i16]) {
        let mut staging = std::mem::take(&mut self.staging);
        let mut pos = 0;
        while pos < buf.len() {
            let n = staging.len().min(buf.len() - pos);
            self.read_samples_f32(&mut staging[..n]);
            for (dst, src) in buf[pos..pos + n].iter_mut().zip(&staging[..n]) {
                *dst = (src * self.quantize_level)
                    .clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            }
            pos += n;
        }
        self.staging = staging;
    }

    fn update_chunk(&mut self, buf: &mut [f32]) {
        let chanc = self.stream_params.channels as usize;
        let framec = buf.len() / chanc;
        self.update_mono(&mut buf[..framec]);
        expand_channels(buf, framec, chanc);
    }

    fn update_mono(&mut self, buf: &mut [f32]) {
        self.framec += buf.len() as u64;
        if self.transition && !self.has_song_voices() {
            self.complete_song_transition();
        }
        let sample_rate = self.stream_params.sample_rate;
        let mut pos = 0;
        while pos < buf.len() {
            let mut updc = buf.len() - pos;

            // Apply every token at the cursor; the sequencer parks on a
            // delay or runs out. Token application is atomic within a tick.
            loop {
                if self.transition {
                    break;
                }
                let event = match &mut self.song {
                    Some(song) if song.delay <= 0 => song.read_event(),
                    _ => break,
                };
                match event {
                    SongEvent::DelayMs(ms) => {
                        if let Some(song) = &mut self.song {
                            song.delay = frames_from_ms(ms, sample_rate);
                        }
                    }
                    SongEvent::RepeatTick => {
                        if let Some(song) = &mut self.song {
                            song.delay = 1;
                        }
                    }
                    SongEvent::Note {
                        chid,
                        noteid,
                        velocity,
                        dur_ms,
                    } => {
                        let dur = frames_from_ms(dur_ms, sample_rate);
                        self.play_note(chid, noteid, velocity, dur.max(1), Origin::Song);
                    }
                    SongEvent::Wheel { chid, value } => self.turn_wheel(chid, value),
                    SongEvent::Finished => {
                        self.end_song();
                        break;
                    }
                }
            }

            if let Some(song) = &mut self.song {
                if song.delay > 0 {
                    let n = (song.delay as usize).min(updc);
                    updc = n;
                    song.delay -= n as i32;
                    song.advance_playhead(n as u64);
                }
            }

            let out = &mut buf[pos..pos + updc];
            let Self {
                voices,
                procs,
                playbacks,
                prints,
                sine,
                ..
            } = self;
            for voice in voices.iter_mut() {
                if !voice.is_defunct() {
                    voice.update(out, sine);
                }
            }
            for proc in procs.iter_mut() {
                if !proc.is_defunct() {
                    proc.update(out);
                }
            }
            for playback in playbacks.iter_mut() {
                if playback.is_defunct() {
                    continue;
                }
                match &playback.src {
                    PlaybackSource::Cached(pcm) => {
                        let pcm = pcm.clone();
                        playback.mix(out, &pcm);
                    }
                    PlaybackSource::Print(id) => {
                        let id = *id;
                        match prints.iter().find(|p| p.id == id) {
                            Some(print) => playback.mix(out, print.printer.pcm()),
                            None => playback.cancel(),
                        }
                    }
                }
            }

            pos += updc;
        }
    }

    /* One-shot PCM printing.
     *************************************************************/

    fn run_printers(&mut self, framec: usize) {
        self.preprint_frames = framec;
        for print in self.prints.iter_mut() {
            print.printer.update(framec);
        }
    }

    fn finalize_prints(&mut self) {
        let mut i = 0;
        while i < self.prints.len() {
            if !self.prints[i].printer.is_finished() {
                i += 1;
                continue;
            }
            let slot = self.prints.remove(i);
            let pcm = slot.printer.finish();
            for playback in self.playbacks.iter_mut() {
                playback.repoint(slot.id, &pcm);
            }
            if let Some(key) = slot.ident {
                if let Err(pos) = self.cache.binary_search_by_key(&key, |e| e.key) {
                    self.cache.insert(pos, CacheEntry { key, pcm });
                }
            }
        }
    }

    /* Songs.
     *************************************************************/

    /// Begin a song resource. With `force` false this is a no-op when the
    /// requested song is already active or pending; `repeat` loops the song
    /// at its loop point. A missing or malformed resource plays silence.
    pub fn play_song(&mut self, qual: u32, id: u32, force: bool, repeat: bool) {
        if !force {
            if let Some(next) = &self.song_next {
                if next.is_resource(qual, id) {
                    return;
                }
            } else if let Some(song) = &self.song {
                if song.is_resource(qual, id) {
                    return;
                }
            }
        }
        let serial = self.resources.as_ref().and_then(|r| r.song(qual, id));
        if serial.is_none() {
            bump(&self.stats.missing_resources);
        }
        let parsed = serial.and_then(|bytes| {
            match Song::parse(bytes, repeat, Some((qual, id))) {
                Ok(song) => Some(song),
                Err(_) => {
                    bump(&self.stats.malformed_songs);
                    None
                }
            }
        });
        self.install_song(parsed);
    }

    /// Begin a song from raw serial data. Empty data stops the music.
    pub fn play_song_from_bytes(&mut self, bytes: &[u8], force: bool, repeat: bool) {
        if bytes.is_empty() {
            self.song_next = None;
            self.transition = false;
            self.end_song();
            return;
        }
        if !force {
            if let Some(next) = &self.song_next {
                if next.same_serial(bytes) {
                    return;
                }
            } else if let Some(song) = &self.song {
                if song.same_serial(bytes) {
                    return;
                }
            }
        }
        let parsed = match Song::parse(bytes.into(), repeat, None) {
            Ok(song) => Some(song),
            Err(_) => {
                bump(&self.stats.malformed_songs);
                None
            }
        };
        self.install_song(parsed);
    }

    /// Current song position in milliseconds, or None when no song is
    /// active. A pending song reports from the moment it was requested,
    /// holding at zero until its transition completes.
    pub fn get_playhead(&self) -> Option<u32> {
        let rate = self.stream_params.sample_rate;
        if let Some(next) = &self.song_next {
            return Some(next.playhead_ms(rate));
        }
        self.song.as_ref().map(|s| s.playhead_ms(rate))
    }

    fn install_song(&mut self, song: Option<Song>) {
        if self.song.is_none() && self.song_next.is_none() && !self.has_song_voices() {
            self.song = song;
            self.transition = false;
            self.apply_song_headers();
            return;
        }
        // Do not cut the old song off: release its voices, park the new one,
        // and let the mixer complete the hand-over once they have drained.
        self.transition = song.is_some();
        self.song_next = song;
        self.end_song();
    }

    fn end_song(&mut self) {
        for voice in self.voices.iter_mut() {
            if voice.is_song() {
                voice.release();
            }
        }
        for proc in self.procs.iter_mut() {
            if proc.is_song() {
                proc.release();
            }
        }
        // Nothing equivalent for playbacks; they always run to completion.
        // Channels stay as they are: the draining voices may depend on them.
        self.song = None;
    }

    fn has_song_voices(&self) -> bool {
        self.voices.iter().any(|v| v.is_song()) || self.procs.iter().any(|p| p.is_song())
    }

    fn complete_song_transition(&mut self) {
        if let Some(next) = self.song_next.take() {
            self.song = Some(next);
            self.apply_song_headers();
        }
        self.transition = false;
    }

    fn apply_song_headers(&mut self) {
        let mut headers = [[0u8; 4]; CHANNEL_COUNT];
        match &self.song {
            Some(song) => {
                for (chid, header) in song.channel_headers() {
                    headers[chid as usize] = header;
                }
            }
            None => return,
        }
        for (chid, header) in headers.iter().enumerate() {
            self.apply_channel_header(chid as u8, header);
        }
    }

    fn apply_channel_header(&mut self, chid: u8, header: &[u8; 4]) {
        if chid as usize >= CHANNEL_COUNT {
            return;
        }
        // Whatever is still sounding here winds down against the old
        // program; the new program never retunes or cuts it.
        for voice in self.voices.iter_mut() {
            if !voice.is_defunct() && voice.chid == chid {
                voice.release();
                voice.unaddress();
            }
        }
        for proc in self.procs.iter_mut() {
            if proc.origin().is_some() && proc.chid == chid {
                proc.release();
                proc.unaddress();
            }
        }
        let seed = self.framec ^ ((chid as u64) << 56);
        let (channel, spawned, fallback) = Channel::from_header(
            chid,
            header,
            self.stream_params.sample_rate,
            &self.sine,
            seed,
        );
        if fallback {
            bump(&self.stats.program_fallbacks);
        }
        self.channels[chid as usize] = channel;
        if let Some(processor) = spawned {
            let proc = Proc::new_for_channel(chid, Origin::Song, self.framec, processor);
            if self.procs.insert(proc) {
                bump(&self.stats.proc_evictions);
            }
        }
    }

    /* Sounds.
     *************************************************************/

    /// Play a one-shot sound effect. Decoded PCM is cached per (qualifier,
    /// id); the first request starts an incremental print.
    pub fn play_sound(&mut self, qual: u32, id: u32, trim: f32, pan: f32) {
        if trim <= 0.0 {
            return;
        }
        let key = (qual, id);
        if let Ok(idx) = self.cache.binary_search_by_key(&key, |e| e.key) {
            let pcm = self.cache[idx].pcm.clone();
            self.start_playback(Playback::new_cached(pcm, trim, pan));
            return;
        }
        if let Some(print) = self.prints.iter().find(|p| p.ident == Some(key)) {
            let playback = Playback::new_print(print.id, print.printer.len(), trim, pan);
            self.start_playback(playback);
            return;
        }
        let Some(serial) = self.resources.as_ref().and_then(|r| r.sound(qual, id)) else {
            bump(&self.stats.missing_resources);
            return;
        };
        self.begin_sound_print(Some(key), &serial, trim, pan);
    }

    /// Play a one-shot sound straight from serial data. More expensive than
    /// the resource form: nothing is cached.
    pub fn play_sound_from_bytes(&mut self, bytes: &[u8], trim: f32, pan: f32) {
        if trim <= 0.0 || bytes.is_empty() {
            return;
        }
        let bytes = bytes.to_vec();
        self.begin_sound_print(None, &bytes, trim, pan);
    }

    fn begin_sound_print(&mut self, ident: Option<(u32, u32)>, serial: &[u8], trim: f32, pan: f32) {
        let Some(resources) = self.resources.as_ref() else {
            bump(&self.stats.missing_resources);
            return;
        };
        let Some(mut printer) =
            resources.begin_print(self.stream_params.sample_rate, serial)
        else {
            bump(&self.stats.malformed_sounds);
            return;
        };
        // A sound requested mid-update catches up to the tick in progress.
        if self.preprint_frames > 0 {
            printer.update(self.preprint_frames);
        }
        let id = self.next_print_id;
        self.next_print_id += 1;
        let total = printer.len();
        self.prints.push(PrintSlot {
            id,
            ident,
            printer,
        });
        self.start_playback(Playback::new_print(id, total, trim, pan));
    }

    fn start_playback(&mut self, playback: Playback) {
        if self.playbacks.insert(playback) {
            bump(&self.stats.playback_evictions);
        }
    }

    /* Channel events.
     *************************************************************/

    /// Raw event injection, shaped like one token from the song byte-code.
    /// Used by interactive tools; out-of-range operands are clamped or
    /// dropped, never an error.
    pub fn channel_event(&mut self, chid: u8, opcode: u8, a: u8, b: u8) {
        match decode_event(opcode, a, b) {
            Some(event) => self.apply_channel_event(chid, event, Origin::User),
            None => bump(&self.stats.dropped_events),
        }
    }

    fn apply_channel_event(&mut self, chid: u8, event: ChannelAudioEvent, origin: Origin) {
        let sample_rate = self.stream_params.sample_rate;
        match event {
            ChannelAudioEvent::NoteOn { key, vel } => {
                self.play_note(chid, key, vel, i32::MAX, origin);
            }
            ChannelAudioEvent::NoteOnce { key, vel, dur_ms } => {
                let dur = frames_from_ms(dur_ms, sample_rate).max(1);
                self.play_note(chid, key, vel, dur, origin);
            }
            ChannelAudioEvent::NoteOff { key } => self.release_note(chid, key),
            ChannelAudioEvent::Control { key, value } => {
                if let Some(channel) = self.channels.get_mut(chid as usize) {
                    channel.control(key, value);
                }
            }
            ChannelAudioEvent::Wheel { value } => self.turn_wheel(chid, value),
        }
    }

    fn play_note(&mut self, chid: u8, noteid: u8, velocity: u8, dur_frames: i32, origin: Origin) {
        if noteid >= 0x80 || chid as usize >= CHANNEL_COUNT {
            bump(&self.stats.dropped_events);
            return;
        }

        // A channel-attached proc consumes the note.
        for proc in self.procs.iter_mut() {
            if proc.consumes_notes_for(chid) {
                proc.note(noteid, velocity, dur_frames);
                return;
            }
        }

        // Drum kits bypass the voice machinery entirely.
        if let ChannelMode::Drum { base } = self.channels[chid as usize].mode() {
            let sound_id = (*base + noteid as u16) as u32;
            let channel = &self.channels[chid as usize];
            let trim = 0.2 + (channel.trim() * velocity as f32) / 100.0;
            let pan = channel.pan();
            self.play_sound(0, sound_id, trim, pan);
            return;
        }

        // One live voice per (chid, noteid): a replacement takes over the
        // address while the old voice drains unaddressed.
        for voice in self.voices.iter_mut() {
            if voice.is_live_note(chid, noteid) {
                voice.release();
                voice.unaddress();
            }
        }

        let channel = &self.channels[chid as usize];
        let dp0 = self.freq_i[noteid as usize];
        let mut level = Envelope::init(channel.level(), velocity);
        level.set_sustain(dur_frames);
        let osc = match channel.mode() {
            ChannelMode::Wave => OscMode::Wave,
            ChannelMode::Rock { mix } => OscMode::Rock {
                mix: Envelope::init(mix, velocity),
            },
            ChannelMode::FmRel { rate, range } => OscMode::Fm {
                modp: 0,
                moddp: apply_bend(dp0, *rate),
                range: Envelope::init(range, velocity),
            },
            ChannelMode::FmAbs { moddp, range } => OscMode::Fm {
                modp: 0,
                moddp: *moddp,
                range: Envelope::init(range, velocity),
            },
            ChannelMode::Sub | ChannelMode::Drum { .. } => {
                // The proc that should own this note is gone (evicted).
                bump(&self.stats.dropped_events);
                return;
            }
        };
        let voice = Voice::new(
            chid,
            noteid,
            origin,
            self.framec,
            dp0,
            channel.bend(),
            channel.wave(),
            level,
            osc,
        );
        if self.voices.insert(voice) {
            bump(&self.stats.voice_evictions);
        }
    }

    fn release_note(&mut self, chid: u8, noteid: u8) {
        for voice in self.voices.iter_mut() {
            if voice.is_live_note(chid, noteid) {
                voice.release();
            }
        }
    }

    fn turn_wheel(&mut self, chid: u8, value: u8) {
        let Some(channel) = self.channels.get_mut(chid as usize) else {
            return;
        };
        let Some(bend) = channel.set_wheel(value) else {
            return;
        };
        // Live voices retune in place; they do not restart.
        for voice in self.voices.iter_mut() {
            if !voice.is_defunct() && voice.chid == chid {
                voice.retune(bend);
            }
        }
        for proc in self.procs.iter_mut() {
            if proc.origin().is_some() && proc.chid == chid {
                proc.wheel(value);
            }
        }
    }
}

impl AudioPipe for Synth {
    fn stream_params(&self) -> &AudioStreamParams {
        &self.stream_params
    }

    fn read_samples_unchecked(&mut self, to: &mut [f32]) {
        self.read_samples_f32(to);
    }
}

fn expand_channels(buf: &mut [f32], framec: usize, chanc: usize) {
    if chanc <= 1 {
        return;
    }
    for frame in (0..framec).rev() {
        let sample = buf[frame];
        let base = frame * chanc;
        for slot in buf[base..base + chanc].iter_mut() {
            *slot = sample;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::encode::SongBuilder;
    use std::collections::HashMap;

    const RATE: u32 = 44100;

    struct TestPrinter {
        pcm: Vec<f32>,
        printed: usize,
    }

    impl PcmPrinter for TestPrinter {
        fn len(&self) -> usize {
            self.pcm.len()
        }
        fn printed(&self) -> usize {
            self.printed
        }
        fn pcm(&self) -> &[f32] {
            &self.pcm[..self.printed]
        }
        fn update(&mut self, frames: usize) {
            self.printed = (self.printed + frames).min(self.pcm.len());
        }
        fn finish(self: Box<Self>) -> Arc<[f32]> {
            self.pcm.into()
        }
    }

    #[derive(Default)]
    struct TestResources {
        songs: HashMap<(u32, u32), Arc<[u8]>>,
        sounds: HashMap<(u32, u32), Arc<[u8]>>,
    }

    impl SynthResources for TestResources {
        fn song(&self, qual: u32, id: u32) -> Option<Arc<[u8]>> {
            self.songs.get(&(qual, id)).cloned()
        }
        fn sound(&self, qual: u32, id: u32) -> Option<Arc<[u8]>> {
            self.sounds.get(&(qual, id)).cloned()
        }
        // Test sounds decode each serial byte to one frame.
        fn begin_print(&self, _sample_rate: u32, serial: &[u8]) -> Option<Box<dyn PcmPrinter>> {
            if serial.is_empty() {
                return None;
            }
            Some(Box::new(TestPrinter {
                pcm: serial.iter().map(|&b| b as f32 / 255.0).collect(),
                printed: 0,
            }))
        }
    }

    fn mono_synth() -> Synth {
        Synth::new(AudioStreamParams::new(RATE, 1), None).unwrap()
    }

    fn render(synth: &mut Synth, frames: usize) -> Vec<f32> {
        let mut buf = vec![0.0f32; frames];
        synth.read_samples_f32(&mut buf);
        buf
    }

    #[test]
    fn construction_validates_params() {
        assert!(matches!(
            Synth::new(AudioStreamParams::new(100, 1), None),
            Err(SynthError::InvalidSampleRate(100))
        ));
        assert!(matches!(
            Synth::new(AudioStreamParams::new(44100, 0), None),
            Err(SynthError::InvalidChannelCount(0))
        ));
        assert!(matches!(
            Synth::new(AudioStreamParams::new(44100, 9), None),
            Err(SynthError::InvalidChannelCount(9))
        ));
        assert!(Synth::new(AudioStreamParams::new(48000, 2), None).is_ok());
    }

    #[test]
    fn three_token_song_scenario() {
        // delay 100ms, note(ch 0, note 60, vel ~100, dur ~50ms), EOF.
        let song = SongBuilder::new()
            .channel(0, 0x50, 0xc0, 0x80)
            .delay_ms(100)
            .note(0, 60, 100, 50)
            .build();
        let mut synth = mono_synth();
        synth.play_song_from_bytes(&song, false, false);
        assert_eq!(synth.channel_program(0), Some(0x50));
        assert_eq!(synth.get_playhead(), Some(0));

        // The delay is 4410 frames; no voice yet after exactly that many.
        render(&mut synth, 4410);
        assert_eq!(synth.live_voices(), 0);

        // One more frame reads the note and the EOF behind it.
        render(&mut synth, 1);
        assert_eq!(synth.live_voices(), 1);
        // EOF without repeat: the song is done, playhead reports none.
        assert_eq!(synth.get_playhead(), None);

        // The released voice winds down within attack+decay+50ms+release.
        render(&mut synth, RATE as usize * 3);
        assert_eq!(synth.live_voices(), 0);
    }

    #[test]
    fn seventeenth_note_evicts_the_oldest_voice() {
        let mut synth = mono_synth();
        for noteid in 0..17u8 {
            synth.channel_event(0, 0x90, noteid, 100);
        }
        let live: Vec<u8> = synth
            .voices
            .iter()
            .filter(|v| !v.is_defunct())
            .map(|v| v.noteid)
            .collect();
        assert_eq!(live.len(), VOICE_LIMIT);
        assert!(!live.contains(&0), "oldest voice must be evicted");
        assert!(live.contains(&16), "newest voice must be present");
        assert_eq!(synth.stats().voice_evictions, 1);
    }

    #[test]
    fn transition_defers_next_songs_headers() {
        // Song A: long-release FM program, one long note.
        let song_a = SongBuilder::new()
            .channel(0, 0x08, 0xff, 0x80)
            .delay_ms(10)
            .note(0, 60, 127, 1984)
            .delay_ms(100)
            .build();
        // Song B: different program on the same channel.
        let song_b = SongBuilder::new()
            .channel(0, 0x14, 0xff, 0x80)
            .delay_ms(100)
            .build();

        let mut synth = mono_synth();
        synth.play_song_from_bytes(&song_a, false, true);
        assert_eq!(synth.channel_program(0), Some(0x08));

        // Let the note start.
        render(&mut synth, 1024);
        assert_eq!(synth.live_voices(), 1);

        synth.play_song_from_bytes(&song_b, false, true);
        // B is pending; its headers are not applied yet.
        assert_eq!(synth.channel_program(0), Some(0x08));
        assert_eq!(synth.get_playhead(), Some(0));

        // While A's voice is still alive, B's program must not appear.
        let mut saw_live = false;
        for _ in 0..2000 {
            render(&mut synth, 512);
            if synth.live_voices() > 0 {
                saw_live = true;
                assert_eq!(synth.channel_program(0), Some(0x08));
            } else {
                break;
            }
        }
        assert!(saw_live, "song A's voice should outlive the request");

        // Once drained, the next render completes the hand-over.
        render(&mut synth, 512);
        assert_eq!(synth.channel_program(0), Some(0x14));
    }

    #[test]
    fn force_false_ignores_the_active_song() {
        let song = SongBuilder::new()
            .channel(0, 0x50, 0xc0, 0x80)
            .delay_ms(100)
            .build();
        let mut synth = mono_synth();
        synth.play_song_from_bytes(&song, false, true);
        render(&mut synth, 2000);
        let playhead = synth.get_playhead();
        assert!(playhead.is_some());

        // Same serial, no force: nothing restarts.
        synth.play_song_from_bytes(&song, false, true);
        assert_eq!(synth.get_playhead(), playhead);

        // Force restarts from zero (via a transition if voices linger).
        synth.play_song_from_bytes(&song, true, true);
        assert_eq!(synth.get_playhead(), Some(0));
    }

    #[test]
    fn malformed_song_degrades_to_silence() {
        let mut synth = mono_synth();
        synth.play_song_from_bytes(&[1, 2, 3], false, true);
        assert_eq!(synth.get_playhead(), None);
        assert_eq!(synth.stats().malformed_songs, 1);
        // The render path keeps flowing.
        let buf = render(&mut synth, 256);
        assert!(buf.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn song_round_trip_total_elapsed_frames() {
        // Delays must sum to the same elapsed frame count on replay.
        let song = SongBuilder::new()
            .channel(0, 0x50, 0xc0, 0x80)
            .delay_ms(100)
            .note_once(0, 60, 0x30)
            .delay_ms(50)
            .wheel(0, 0x60)
            .delay_ms(25)
            .build();
        let mut synth = mono_synth();
        synth.play_song_from_bytes(&song, false, false);
        // 175ms at 44100 = 7717.5 -> 7717 frames of delay tokens.
        render(&mut synth, 7716);
        assert!(synth.get_playhead().is_some());
        render(&mut synth, 2);
        assert_eq!(synth.get_playhead(), None, "song should end after its delays");
    }

    #[test]
    fn wheel_retunes_live_voices_in_place() {
        let mut synth = mono_synth();
        synth.channel_event(0, 0x90, 69, 100);
        assert_eq!(synth.live_voices(), 1);
        let before: Vec<u64> = synth.voices.iter().map(|v| v.eviction_rank()).collect();
        synth.channel_event(0, 0xe0, 0, 0xc0);
        // Still the same voice; no restart.
        assert_eq!(synth.live_voices(), 1);
        let after: Vec<u64> = synth.voices.iter().map(|v| v.eviction_rank()).collect();
        assert_eq!(before, after, "retune must not recreate the voice");
    }

    #[test]
    fn sound_playback_round_trip() {
        let mut resources = TestResources::default();
        resources.sounds.insert((0, 7), vec![255u8; 100].into());
        let mut synth = Synth::new(
            AudioStreamParams::new(RATE, 1),
            Some(Arc::new(resources)),
        )
        .unwrap();

        synth.play_sound(0, 7, 1.0, 0.0);
        let buf = render(&mut synth, 100);
        assert!(
            buf.iter().all(|&v| (v - 1.0).abs() < 1e-6),
            "sound should play verbatim at full trim"
        );
        // Drained; next buffer is silent again.
        let buf = render(&mut synth, 64);
        assert!(buf.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn sounds_are_cached_after_first_print() {
        let mut resources = TestResources::default();
        resources.sounds.insert((0, 7), vec![128u8; 10].into());
        let mut synth = Synth::new(
            AudioStreamParams::new(RATE, 1),
            Some(Arc::new(resources)),
        )
        .unwrap();

        synth.play_sound(0, 7, 0.5, 0.0);
        render(&mut synth, 32);
        assert_eq!(synth.cache.len(), 1);
        synth.play_sound(0, 7, 0.5, 0.0);
        assert_eq!(synth.prints.len(), 0, "second play must hit the cache");
    }

    #[test]
    fn zero_trim_sounds_are_dropped_early() {
        let mut resources = TestResources::default();
        resources.sounds.insert((0, 7), vec![128u8; 10].into());
        let mut synth = Synth::new(
            AudioStreamParams::new(RATE, 1),
            Some(Arc::new(resources)),
        )
        .unwrap();
        synth.play_sound(0, 7, 0.0, 0.0);
        assert_eq!(synth.prints.len(), 0);
    }

    #[test]
    fn drum_channels_trigger_sound_effects() {
        let mut resources = TestResources::default();
        // Kit 0x81, note 60 -> sound id 0x80 + 60.
        resources.sounds.insert((0, 0x80 + 60), vec![200u8; 50].into());
        let mut synth = Synth::new(
            AudioStreamParams::new(RATE, 1),
            Some(Arc::new(resources)),
        )
        .unwrap();

        let song = SongBuilder::new()
            .channel(0, 0x81, 0xff, 0x80)
            .delay_ms(1)
            .note_once(0, 60, 0x30)
            .delay_ms(100)
            .build();
        synth.play_song_from_bytes(&song, false, false);
        render(&mut synth, 1024);
        assert_eq!(synth.live_voices(), 0, "drums start no voices");
        assert_eq!(synth.prints.len() + synth.cache.len(), 1);
    }

    #[test]
    fn i16_output_quantizes_and_clamps() {
        let mut resources = TestResources::default();
        resources.sounds.insert((0, 1), vec![255u8; 400].into());
        let mut synth = Synth::new(
            AudioStreamParams::new(RATE, 1),
            Some(Arc::new(resources)),
        )
        .unwrap();
        // Four full-scale playbacks sum to 4.0; must clamp, not wrap.
        for _ in 0..4 {
            synth.play_sound(0, 1, 1.0, 0.0);
        }
        let mut buf = vec![0i16; 256];
        synth.read_samples_i16(&mut buf);
        assert!(buf.iter().all(|&v| v == i16::MAX));
    }

    #[test]
    fn multi_channel_output_duplicates_the_mono_frame() {
        let mut resources = TestResources::default();
        resources.sounds.insert((0, 1), (0u8..=99).collect::<Vec<u8>>().into());
        let mut synth = Synth::new(
            AudioStreamParams::new(RATE, 4),
            Some(Arc::new(resources)),
        )
        .unwrap();
        synth.play_sound(0, 1, 1.0, 0.0);
        let mut buf = vec![0.0f32; 64 * 4];
        synth.read_samples_f32(&mut buf);
        for frame in buf.chunks(4) {
            for sample in frame {
                assert_eq!(*sample, frame[0]);
            }
        }
    }

    #[test]
    fn out_of_range_events_are_absorbed() {
        let mut synth = mono_synth();
        synth.channel_event(99, 0x90, 60, 100); // bad channel
        synth.channel_event(0, 0x90, 0xff, 100); // note id clamped to 0x7f
        synth.channel_event(0, 0x70, 0, 0); // unknown opcode
        // No panic, audio still flows.
        render(&mut synth, 64);
        assert!(synth.stats().dropped_events >= 2);
    }

    #[test]
    fn sub_program_routes_notes_to_its_proc() {
        let song = SongBuilder::new()
            .channel(0, 0x4c, 0xff, 0x80)
            .delay_ms(1)
            .note(0, 60, 127, 992)
            .delay_ms(100)
            .build();
        let mut synth = mono_synth();
        synth.play_song_from_bytes(&song, false, false);
        let buf = render(&mut synth, 8192);
        assert_eq!(synth.live_voices(), 0, "sub notes start no plain voices");
        assert!(buf.iter().any(|&v| v != 0.0), "the proc should be audible");
    }
}
