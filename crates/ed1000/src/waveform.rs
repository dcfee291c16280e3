//! Waveform parameters and tone tables for ED1000

use strum::IntoEnumIterator;

/// Audio sampling rate (Hz)
///
/// Both audio streams run at this rate, mono, signed 16-bit.
pub const SAMPLE_RATE: u32 = 48000;

/// Peak amplitude of synthesized tones
///
/// About 98% of `i16` full scale.
pub const TONE_AMPLITUDE: f64 = 32000.0;

/// Length of one framed character, in bits
///
/// One start bit, five data bits, and one and a half stop bits.
pub const BITS_PER_CHARACTER: f64 = 7.5;

/// Quarter-bit slices per bit
pub const SLICES_PER_BIT: u32 = 4;

/// Samples per bit at the given sampling rate `fs` and `baud` rate
pub fn frames_per_bit(fs: u32, baud: u32) -> usize {
    round_half_up(fs as f64 / baud as f64)
}

/// Samples per quarter-bit slice
pub fn frames_per_slice(fs: u32, baud: u32) -> usize {
    round_half_up(fs as f64 / baud as f64 / SLICES_PER_BIT as f64)
}

/// Samples per framed character, given `fpb` samples per bit
pub fn frames_per_character(fpb: usize) -> usize {
    round_half_up(fpb as f64 * BITS_PER_CHARACTER)
}

fn round_half_up(v: f64) -> usize {
    (v + 0.5) as usize
}

/// Logical line tone
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::EnumIter, strum_macros::Display,
)]
pub enum Tone {
    /// Space, logical 0
    Space,

    /// Mark, logical 1
    Mark,

    /// Midway between mark and space
    ///
    /// Generated with the table but never keyed by the
    /// transmitter.
    Reference,
}

impl Tone {
    /// Tone for a line bit
    #[inline]
    pub fn from_bit(bit: bool) -> Self {
        if bit {
            Tone::Mark
        } else {
            Tone::Space
        }
    }
}

/// Precomputed one-bit tone bursts
///
/// Holds one bit period of PCM for each [`Tone`]. Every burst
/// starts at phase zero, so a bit boundary is a phase
/// discontinuity whenever the tone frequency is not a multiple
/// of the baud rate. ED1000 receivers detect energy, not phase,
/// and do not care.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToneTable {
    frames_per_bit: usize,
    frames_per_character: usize,
    tones: [Vec<i16>; 3],
}

impl ToneTable {
    /// Build tones for `space_hz` and `mark_hz`
    ///
    /// Bursts are one bit long at the given `baud` rate and
    /// sampling rate `fs`.
    pub fn new(fs: u32, baud: u32, space_hz: f32, mark_hz: f32) -> Self {
        let fpb = frames_per_bit(fs, baud);
        let mut tones: [Vec<i16>; 3] = Default::default();
        for (tone, out) in Tone::iter().zip(tones.iter_mut()) {
            let freq = match tone {
                Tone::Space => space_hz,
                Tone::Mark => mark_hz,
                Tone::Reference => (space_hz + mark_hz) / 2.0,
            };
            *out = sine_burst(fs, freq as f64, fpb);
        }

        Self {
            frames_per_bit: fpb,
            frames_per_character: frames_per_character(fpb),
            tones,
        }
    }

    /// One bit period of the given `tone`
    #[inline]
    pub fn tone(&self, tone: Tone) -> &[i16] {
        &self.tones[tone as usize]
    }

    /// Samples per bit
    #[inline]
    pub fn frames_per_bit(&self) -> usize {
        self.frames_per_bit
    }

    /// Samples per framed character (7.5 bits)
    #[inline]
    pub fn frames_per_character(&self) -> usize {
        self.frames_per_character
    }
}

// Quantized sine starting at phase zero
fn sine_burst(fs: u32, freq: f64, len: usize) -> Vec<i16> {
    (0..len)
        .map(|n| {
            let t = n as f64 / fs as f64;
            (f64::sin(t * 2.0 * std::f64::consts::PI * freq) * TONE_AMPLITUDE) as i16
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_counts() {
        assert_eq!(960, frames_per_bit(SAMPLE_RATE, 50));
        assert_eq!(240, frames_per_slice(SAMPLE_RATE, 50));
        assert_eq!(7200, frames_per_character(960));

        // 75 Bd and 45.45 Bd do not divide evenly
        assert_eq!(640, frames_per_bit(SAMPLE_RATE, 75));
        assert_eq!(160, frames_per_slice(SAMPLE_RATE, 75));
        assert_eq!(4800, frames_per_character(640));
        assert_eq!(1067, frames_per_bit(SAMPLE_RATE, 45));
        assert_eq!(267, frames_per_slice(SAMPLE_RATE, 45));
        assert_eq!(8003, frames_per_character(1067));
    }

    #[test]
    fn test_tone_table() {
        let table = ToneTable::new(SAMPLE_RATE, 50, 500.0, 700.0);
        assert_eq!(960, table.frames_per_bit());
        assert_eq!(7200, table.frames_per_character());

        for tone in Tone::iter() {
            let burst = table.tone(tone);
            assert_eq!(960, burst.len());
            assert_eq!(0, burst[0]);
            let peak = burst.iter().map(|sa| sa.unsigned_abs()).max().unwrap();
            assert!(peak <= TONE_AMPLITUDE as u16);
            assert!(peak > 31900);
        }

        // 500 Hz: quarter period is 24 samples
        assert_eq!(32000, table.tone(Tone::Space)[24]);
        assert_ne!(table.tone(Tone::Space), table.tone(Tone::Mark));

        // reference tone at 600 Hz: period is 80 samples
        let reference = table.tone(Tone::Reference);
        assert_eq!(reference[1], reference[81]);
        assert_eq!(32000, reference[20]);
    }

    #[test]
    fn test_from_bit() {
        assert_eq!(Tone::Mark, Tone::from_bit(true));
        assert_eq!(Tone::Space, Tone::from_bit(false));
        assert_eq!("Reference", Tone::Reference.to_string());
    }
}
