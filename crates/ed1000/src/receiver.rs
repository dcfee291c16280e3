//! Full receiver chain

#[cfg(not(test))]
use log::{error, info, trace};

#[cfg(test)]
use std::println as trace;
#[cfg(test)]
use std::println as info;
#[cfg(test)]
use std::println as error;

use std::time::Duration;

use crate::audio::AudioSource;
use crate::codec::SymbolDecoder;
use crate::control::Link;
use crate::demod::{Demod, Detection};
use crate::error::AudioError;
use crate::framing::{Framer, LineEvent, LineWatch};

/// Longest sleep on the online gate between blocks while offline
pub const OFFLINE_POLL: Duration = Duration::from_secs(2);

/// Receiver output for one slice
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SliceOut {
    /// Demodulator decision and band energies
    pub detection: Detection,

    /// Line supervision event, if any
    pub event: Option<LineEvent>,

    /// Decoded character, if any
    pub character: Option<char>,
}

/// A complete ED1000 receiver chain
///
/// The receive chain takes one quarter-bit block of `i16`
/// audio at a time and performs the following operations:
///
/// 1. Energy demodulation into mark, space, or no carrier
/// 2. Line supervision, which watches for the teleprinter
///    going on or off line
/// 3. Start/stop framing, while online
/// 4. Symbol decoding into characters
///
/// The receiver is normally driven by the modem's receive
/// worker, but it can be fed directly:
///
/// ```
/// use ed1000::{EnergyDemod, Receiver};
///
/// let demod = EnergyDemod::new(48000, 2250.0, 3150.0, 100);
/// let mut rx = Receiver::new(Box::new(demod), Box::new(murray::Decoder::new()), 240);
/// let out = rx.slice(&[0i16; 240], false);
/// assert!(out.event.is_none());
/// assert!(out.character.is_none());
/// ```
#[derive(Debug)]
pub struct Receiver {
    demod: Box<dyn Demod>,
    watch: LineWatch,
    framer: Framer,
    decoder: Box<dyn SymbolDecoder>,
    block_len: usize,
    slices_processed: u64,
}

impl Receiver {
    /// New receiver
    ///
    /// The receiver expects blocks of `block_len` samples, one
    /// quarter of a bit.
    pub fn new(demod: Box<dyn Demod>, decoder: Box<dyn SymbolDecoder>, block_len: usize) -> Self {
        Self {
            demod,
            watch: LineWatch::new(),
            framer: Framer::new(),
            decoder,
            block_len,
            slices_processed: 0,
        }
    }

    /// Samples per block
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Number of slices processed since creation or reset
    pub fn slices_processed(&self) -> u64 {
        self.slices_processed
    }

    /// True once a mark has been seen since going online
    pub fn is_properly_online(&self) -> bool {
        self.framer.is_properly_online()
    }

    /// Process one slice
    ///
    /// `block` should be [`block_len()`](Receiver::block_len)
    /// samples long, but a short block is demodulated as-is.
    /// `online` is the current online state of the device.
    pub fn slice(&mut self, block: &[i16], online: bool) -> SliceOut {
        self.slices_processed = self.slices_processed.wrapping_add(1);

        let detection = self.demod.demod(block);
        let mark = detection.level.is_mark();
        trace!(
            "rx: slice {}: {} {:?}",
            self.slices_processed,
            detection.level,
            detection.energy
        );

        let event = self.watch.input(mark, online);
        let character = self
            .framer
            .input(mark, online)
            .and_then(|symbol| self.decoder.decode(symbol));

        SliceOut {
            detection,
            event,
            character,
        }
    }

    /// Reset to zero initial conditions
    ///
    /// Forgets the filter state, the line supervision counters,
    /// any partial character, and the decoder shift.
    pub fn reset(&mut self) {
        self.demod.reset();
        self.watch.reset();
        self.framer.reset();
        self.decoder.reset();
        self.slices_processed = 0;
    }
}

/// Run the receiver until shutdown, error, or end of input
///
/// While offline, waits up to [`OFFLINE_POLL`] on the online
/// gate before each block.
pub(crate) fn run(mut rx: Receiver, link: &Link, source: &mut dyn AudioSource) {
    info!("rx: started");
    let mut block = vec![0i16; rx.block_len()];
    while link.is_running() {
        link.gate().wait(Some(OFFLINE_POLL));
        if !link.is_running() {
            break;
        }

        let len = match source.read(&mut block) {
            Ok(0) => {
                error!("rx: {}", AudioError::Closed);
                break;
            }
            Ok(len) => len,
            Err(err) => {
                error!("rx: {}", err);
                break;
            }
        };

        let out = rx.slice(&block[..len], link.is_online());
        if let Some(event) = out.event {
            info!("rx: {}", event);
            if event == LineEvent::Stop {
                link.press_stop();
            }
            link.push_incoming(event.escape().to_owned());
        }
        if let Some(c) = out.character {
            link.push_incoming(c.to_string());
        }
    }
    info!("rx: stopped");
}
