//! Definitions for the 128 General MIDI instruments.
//!
//! Entries marked as aliases reuse their group's base definition until a
//! proper patch is designed for them.

use super::Builtin::{self, *};

// Tiny envelope byte: shape family in bits 6-7, attack 0..7 in bits 3-5,
// release 0..7 in bits 0-2.
const IMPULSE: u8 = 0x00;
const PLUCK: u8 = 0x40;
const TONE: u8 = 0x80;
const BOW: u8 = 0xc0;

const fn env(shape: u8, attack: u8, release: u8) -> u8 {
    shape | (attack << 3) | release
}

pub(crate) static BUILTINS: [Builtin; 128] = [
    // 0..7: Piano
    Blip,        // 0x00 Acoustic Grand Piano
    Alias(0x00), // 0x01 Bright Acoustic Piano
    Alias(0x00), // 0x02 Electric Grand Piano
    Alias(0x00), // 0x03 Honky-tonk Piano
    Alias(0x00), // 0x04 EP 1 (Rhodes)
    // 0x05 EP 2 (Chorus). The Spooky Organ.
    FmAbs {
        rate: 0x0800,
        scale: 0x01,
        range: 0x0f30,
        level: env(PLUCK, 2, 4),
    },
    Alias(0x00), // 0x06 Harpsichord
    Alias(0x00), // 0x07 Clavinet
    // 8..15: Chromatic
    // 0x08 Celesta
    FmRel {
        rate: 0x7a,
        scale: 0x87,
        range: 0xf87a,
        level: env(IMPULSE, 0, 6),
    },
    Alias(0x08), // 0x09 Glockenspiel
    Alias(0x08), // 0x0a Music Box
    Alias(0x08), // 0x0b Vibraphone
    Alias(0x08), // 0x0c Marimba
    Alias(0x08), // 0x0d Xylophone
    // 0x0e Tubular Bells
    FmRel {
        rate: 0x38,
        scale: 0x67,
        range: 0xf8ff,
        level: env(IMPULSE, 1, 6),
    },
    Alias(0x08), // 0x0f Dulcimer
    // 16..23: Organ
    Blip,        // 0x10 Drawbar Organ
    Alias(0x10), // 0x11 Percussive Organ
    Alias(0x10), // 0x12 Rock Organ
    Alias(0x10), // 0x13 Church Organ
    // 0x14 Reed Organ
    Rock {
        wave: [0x00, 0x7c, 0xa5, 0x80, 0x33, 0x60, 0x11, 0x00],
        mix: 0x0ff0,
        level: env(TONE, 2, 3),
    },
    Alias(0x10), // 0x15 Accordion (French)
    Alias(0x10), // 0x16 Harmonica
    Alias(0x10), // 0x17 Tango Accordion
    // 24..31: Guitar
    // 0x18 Nylon Acoustic Guitar
    FmRel {
        rate: 0x20,
        scale: 0x10,
        range: 0x4fc0,
        level: env(IMPULSE, 0, 5),
    },
    Alias(0x18), // 0x19 Steel Acoustic Guitar
    Alias(0x18), // 0x1a Jazz Electric Guitar
    Alias(0x18), // 0x1b Clean Electric Guitar
    Alias(0x18), // 0x1c Muted Electric Guitar
    // 0x1d Overdriven Guitar
    Fx {
        level: env(PLUCK, 1, 4),
    },
    Alias(0x18), // 0x1e Distortion Guitar
    Alias(0x18), // 0x1f Guitar Harmonics
    // 32..39: Bass
    Blip,        // 0x20 Acoustic Bass
    Alias(0x20), // 0x21 Fingered Electric Bass
    Alias(0x20), // 0x22 Picked Electric Bass
    Alias(0x20), // 0x23 Fretless Bass
    // 0x24 Slap Bass 1
    FmRel {
        rate: 0x08,
        scale: 0x28,
        range: 0x6f61,
        level: env(PLUCK, 1, 3),
    },
    Alias(0x20), // 0x25 Slap Bass 2
    Alias(0x20), // 0x26 Synth Bass 1
    Alias(0x20), // 0x27 Synth Bass 2
    // 40..47: Solo String
    Blip,        // 0x28 Violin
    Alias(0x28), // 0x29 Viola
    Alias(0x28), // 0x2a Cello
    Alias(0x28), // 0x2b Contrabass
    Alias(0x28), // 0x2c Tremolo Strings
    Alias(0x28), // 0x2d Pizzicato Strings
    Alias(0x28), // 0x2e Orchestral Harp
    Alias(0x28), // 0x2f Timpani
    // 48..55: String Ensemble
    Blip,        // 0x30 String Ensemble 1
    Alias(0x30), // 0x31 String Ensemble 2
    Alias(0x30), // 0x32 Synth Strings 1
    Alias(0x30), // 0x33 Synth Strings 2
    Alias(0x30), // 0x34 Choir Aahs
    Alias(0x30), // 0x35 Voice Oohs
    Alias(0x30), // 0x36 Synth Voice
    Alias(0x30), // 0x37 Orchestra Hit
    // 56..63: Brass
    Blip,        // 0x38 Trumpet
    Alias(0x38), // 0x39 Trombone
    Alias(0x38), // 0x3a Tuba
    Alias(0x38), // 0x3b Muted Trumpet
    Alias(0x38), // 0x3c French Horn
    Alias(0x38), // 0x3d Brass Section
    Alias(0x38), // 0x3e Synth Brass 1
    Alias(0x38), // 0x3f Synth Brass 2
    // 64..71: Solo Reed
    Blip,        // 0x40 Soprano Sax
    Alias(0x40), // 0x41 Alto Sax
    Alias(0x40), // 0x42 Tenor Sax
    Alias(0x40), // 0x43 Baritone Sax
    Alias(0x40), // 0x44 Oboe
    Alias(0x40), // 0x45 English Horn
    Alias(0x40), // 0x46 Bassoon
    // 0x47 Clarinet
    Rock {
        wave: [0x20, 0x8c, 0xe0, 0x00, 0x73, 0x00, 0x31, 0x00],
        mix: 0x00ff,
        level: env(PLUCK, 1, 4),
    },
    // 72..79: Solo Flute
    Blip,        // 0x48 Piccolo
    Alias(0x48), // 0x49 Flute
    // 0x4a Recorder
    Wave {
        wave: [0x80, 0x10, 0xf5, 0x00, 0x33, 0x00, 0x11, 0x04],
        level: env(TONE, 4, 3),
    },
    Alias(0x48), // 0x4b Pan Flute
    // 0x4c Blown Bottle
    Sub {
        width1: 25,
        width2: 15,
        gain: 45,
        level: env(TONE, 1, 4),
    },
    // 0x4d Shakuhachi
    FmRel {
        rate: 0x43,
        scale: 0x18,
        range: 0x0f30,
        level: env(PLUCK, 2, 4),
    },
    Alias(0x48), // 0x4e Whistle
    Alias(0x48), // 0x4f Ocarina
    // 80..87: Synth Lead
    Blip,        // 0x50 Square Lead. Not a placeholder; square is the point.
    Alias(0x50), // 0x51 Saw Lead
    Alias(0x50), // 0x52 Calliope
    Alias(0x50), // 0x53 Chiffer
    Alias(0x50), // 0x54 Charang
    Alias(0x50), // 0x55 Voice Solo
    Alias(0x50), // 0x56 Fifths
    Alias(0x50), // 0x57 Bass and Lead
    // 88..95: Synth Pad
    Blip,        // 0x58 Fantasia Pad
    Alias(0x58), // 0x59 Warm Pad
    Alias(0x58), // 0x5a Polysynth Pad
    // 0x5b Choir Space Voice
    Sub {
        width1: 40,
        width2: 25,
        gain: 40,
        level: env(BOW, 3, 4),
    },
    Alias(0x58), // 0x5c Bowed Glass
    Alias(0x58), // 0x5d Metallic Pad
    Alias(0x58), // 0x5e Halo Pad
    Alias(0x58), // 0x5f Sweep Pad
    // 96..103: Synth Effects
    Blip,        // 0x60 Rain
    Alias(0x60), // 0x61 Soundtrack
    Alias(0x60), // 0x62 Crystal
    Alias(0x60), // 0x63 Atmosphere
    Alias(0x60), // 0x64 Brightness
    Alias(0x60), // 0x65 Goblins
    Alias(0x60), // 0x66 Echoes, Drops
    Alias(0x60), // 0x67 Sci-Fi Star Theme
    // 104..111: World
    Blip,        // 0x68 Sitar
    Alias(0x68), // 0x69 Banjo
    Alias(0x68), // 0x6a Shamisen
    Alias(0x68), // 0x6b Koto
    Alias(0x68), // 0x6c Kalimba
    Alias(0x68), // 0x6d Bag Pipe
    Alias(0x68), // 0x6e Fiddle
    Alias(0x68), // 0x6f Shanai
    // 112..119: Percussion
    Blip,        // 0x70 Tinkle Bell
    Alias(0x70), // 0x71 Agogo
    Alias(0x70), // 0x72 Steel Drums
    Alias(0x70), // 0x73 Wood Block
    Alias(0x70), // 0x74 Taiko
    Alias(0x70), // 0x75 Melodic Tom
    Alias(0x70), // 0x76 Synth Drum
    Alias(0x70), // 0x77 Reverse Cymbal
    // 120..127: Insert Joke Here
    Blip,        // 0x78 Guitar Fret Noise
    Alias(0x78), // 0x79 Breath Noise
    Alias(0x78), // 0x7a Seashore
    Alias(0x78), // 0x7b Bird Tweet
    Alias(0x78), // 0x7c Telephone Ring
    Alias(0x78), // 0x7d Helicopter
    Alias(0x78), // 0x7e Applause
    Alias(0x78), // 0x7f Gunshot
];
