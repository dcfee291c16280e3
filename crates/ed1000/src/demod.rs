//! FSK energy demodulation
//!
//! A demodulator for the ED1000 two-tone line signal. Each call
//! to [`Demod::demod()`] consumes one block of audio, normally a
//! quarter of a bit, and decides whether the line carried mark,
//! space, or nothing at all during that block.
//!
//! The decision is a plain energy comparison:
//!
//! 1. the block is run through a bandpass filter centered on
//!    each tone,
//! 2. each filter output is rectified and averaged, giving the
//!    band energies `E0` (space) and `E1` (mark),
//! 3. mark wins if `E1 > E0`, unless `E0 + E1` is below the
//!    squelch threshold, which means no carrier.
//!
//! This is non-coherent: tone phase is irrelevant, which suits
//! transmitters that restart their oscillators at every bit.

use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::Path;

#[cfg(not(test))]
use log::warn;

#[cfg(test)]
use std::println as warn;

use crate::filter::SosFilter;

/// Order of the tone bandpass filters
pub const BANDPASS_ORDER: usize = 4;

/// Bandpass edges, as a ratio of the tone frequency
///
/// The passband runs from `f / BANDPASS_RATIO` to
/// `f * BANDPASS_RATIO`.
pub const BANDPASS_RATIO: f64 = 1.05;

/// Demodulated line state for one block
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Level {
    /// Space tone dominates
    Space,

    /// Mark tone dominates
    Mark,

    /// Not enough energy in either band
    NoCarrier,
}

impl Level {
    /// True for a definite mark
    ///
    /// Space and no-carrier are both logical zero.
    #[inline]
    pub fn is_mark(&self) -> bool {
        *self == Level::Mark
    }
}

/// Demodulator output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Detection {
    /// Line state decision
    pub level: Level,

    /// Mean rectified output of the space and mark filters
    ///
    /// In `i16` sample units, truncated. Index 0 is space.
    pub energy: [u32; 2],
}

/// A demodulator
///
/// Demodulators are stateful. Blocks must be supplied in the
/// order they were received, without gaps or overlap.
pub trait Demod: std::fmt::Debug + Send {
    /// Demodulate the next block of samples
    fn demod(&mut self, block: &[i16]) -> Detection;

    /// Reset to zero initial conditions
    fn reset(&mut self);
}

/// Bandpass energy detector
///
/// See [module documentation](self).
#[derive(Debug)]
pub struct EnergyDemod {
    space: SosFilter,
    mark: SosFilter,
    squelch: u32,
    debug_log: Option<DebugLog>,
}

impl EnergyDemod {
    /// Create for the given tone frequencies
    ///
    /// `space_hz` and `mark_hz` are the receive tones, at
    /// sampling rate `fs`. If `E0 + E1 < squelch`, blocks are
    /// reported as [`Level::NoCarrier`].
    pub fn new(fs: u32, space_hz: f32, mark_hz: f32, squelch: u32) -> Self {
        Self {
            space: tone_filter(fs, space_hz),
            mark: tone_filter(fs, mark_hz),
            squelch,
            debug_log: None,
        }
    }

    /// Record every decision's band energies
    ///
    /// Each call to [`demod()`](Demod::demod) appends a line
    /// `E0,E1` to `log`.
    pub fn with_debug_log(mut self, log: DebugLog) -> Self {
        self.debug_log = Some(log);
        self
    }

    /// Squelch threshold
    pub fn squelch(&self) -> u32 {
        self.squelch
    }

    // rectify and average one filter's output
    fn band_energy(filter: &mut SosFilter, block: &[i16]) -> u32 {
        let sum: f64 = block.iter().map(|&sa| filter.filter(sa as f64).abs()).sum();
        (sum / block.len() as f64) as u32
    }
}

impl Demod for EnergyDemod {
    fn demod(&mut self, block: &[i16]) -> Detection {
        if block.is_empty() {
            return Detection {
                level: Level::NoCarrier,
                energy: [0, 0],
            };
        }

        let energy = [
            Self::band_energy(&mut self.space, block),
            Self::band_energy(&mut self.mark, block),
        ];

        let level = if energy[0].saturating_add(energy[1]) < self.squelch {
            Level::NoCarrier
        } else if energy[1] > energy[0] {
            Level::Mark
        } else {
            Level::Space
        };

        if let Some(log) = &mut self.debug_log {
            if let Err(e) = log.record(&energy) {
                warn!("receive debug log disabled: {}", e);
                self.debug_log = None;
            }
        }

        Detection { level, energy }
    }

    fn reset(&mut self) {
        self.space.reset();
        self.mark.reset();
    }
}

/// Append-only log of demodulator energies
///
/// One line per demodulated block, `E0,E1`, for plotting
/// receive levels and choosing a squelch threshold.
#[derive(Debug)]
pub struct DebugLog {
    out: LineWriter<File>,
}

impl DebugLog {
    /// Default log file name
    pub const DEFAULT_PATH: &'static str = "recv_debug.log";

    /// Open `path` for appending, creating it if necessary
    pub fn open<P>(path: P) -> std::io::Result<Self>
    where
        P: AsRef<Path>,
    {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            out: LineWriter::new(file),
        })
    }

    fn record(&mut self, energy: &[u32; 2]) -> std::io::Result<()> {
        writeln!(self.out, "{},{}", energy[0], energy[1])
    }
}

fn tone_filter(fs: u32, freq: f32) -> SosFilter {
    let freq = freq as f64;
    SosFilter::butterworth_bandpass(
        BANDPASS_ORDER,
        freq / BANDPASS_RATIO,
        freq * BANDPASS_RATIO,
        fs as f64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::waveform::{frames_per_slice, Tone, ToneTable, SAMPLE_RATE};

    fn demod_bits(demod: &mut EnergyDemod, table: &ToneTable, bits: &[bool]) -> Vec<Detection> {
        let fps = frames_per_slice(SAMPLE_RATE, 50);
        let mut audio = Vec::new();
        for &bit in bits {
            audio.extend_from_slice(table.tone(Tone::from_bit(bit)));
        }
        audio.chunks(fps).map(|block| demod.demod(block)).collect()
    }

    #[test]
    fn test_demod_tones() {
        let table = ToneTable::new(SAMPLE_RATE, 50, 2250.0, 3150.0);
        let mut demod = EnergyDemod::new(SAMPLE_RATE, 2250.0, 3150.0, 100);

        let out = demod_bits(&mut demod, &table, &[true, true, false, false, true]);
        assert_eq!(20, out.len());

        // skip the first slice of each bit, where the filters ring
        for (i, det) in out.iter().enumerate() {
            if i % 4 == 0 {
                continue;
            }
            let expect = match i / 4 {
                2 | 3 => Level::Space,
                _ => Level::Mark,
            };
            assert_eq!(expect, det.level, "slice {}: {:?}", i, det);
        }

        // a clean tone carries about 2/π of its amplitude
        let mark = out[5].energy[1];
        assert!(mark > 19000 && mark < 21500, "{}", mark);
        assert!(out[5].energy[0] < 500);
    }

    #[test]
    fn test_demod_squelch() {
        let mut demod = EnergyDemod::new(SAMPLE_RATE, 2250.0, 3150.0, 100);
        let silence = [0i16; 240];
        let det = demod.demod(&silence);
        assert_eq!(Level::NoCarrier, det.level);
        assert_eq!([0, 0], det.energy);
        assert!(!det.level.is_mark());

        // the transmit tones are out of band for the receiver
        let table = ToneTable::new(SAMPLE_RATE, 50, 500.0, 700.0);
        let out = demod_bits(&mut demod, &table, &[true; 4]);
        for det in &out[2..] {
            assert_eq!(Level::NoCarrier, det.level);
        }

        // empty blocks carry nothing
        assert_eq!(Level::NoCarrier, demod.demod(&[]).level);
    }

    #[test]
    fn test_demod_debug_log() {
        let path = std::env::temp_dir().join(format!("ed1000-demod-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let log = DebugLog::open(&path).expect("open debug log");
        let mut demod = EnergyDemod::new(SAMPLE_RATE, 2250.0, 3150.0, 100).with_debug_log(log);
        demod.demod(&[0i16; 240]);
        demod.demod(&[0i16; 240]);
        drop(demod);

        let text = std::fs::read_to_string(&path).expect("read debug log");
        assert_eq!("0,0\n0,0\n", text);
        let _ = std::fs::remove_file(&path);
    }
}
