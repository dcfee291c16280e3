//! Transmit scheduler
//!
//! The [`Transmitter`] turns the outgoing queue of the
//! [`Link`] into tone bursts. Every call to
//! [`step()`](Transmitter::step) performs one unit of work:
//!
//! | state                      | output                        |
//! |----------------------------|-------------------------------|
//! | queue holds a signal       | 16 unframed bits              |
//! | queue holds a character    | one framed burst per symbol   |
//! | online, queue empty        | one bit of mark (idle)        |
//! | offline, delay armed       | 150 bits of mark, then below  |
//! | offline, zero carrier      | one bit of space              |
//! | offline                    | nothing; caller should wait   |
//!
//! Characters are framed with a start bit (space), five data
//! bits LSb first, and 1.5 stop bits (mark).

use std::thread;
use std::time::Duration;

#[cfg(not(test))]
use log::{debug, error, info, trace};

#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as error;
#[cfg(test)]
use std::println as info;
#[cfg(test)]
use std::println as trace;

use crate::audio::AudioSink;
use crate::codec::SymbolEncoder;
use crate::control::{Link, Signal, TxUnit};
use crate::error::AudioError;
use crate::waveform::{Tone, ToneTable};

/// Bits of mark held before going offline
///
/// Three seconds at 50 Bd.
pub const OFFLINE_DELAY_BITS: usize = 150;

// pause between scheduler iterations
const YIELD: Duration = Duration::from_millis(1);

/// Outcome of one scheduler step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TxStep {
    /// Samples were written
    Sent(usize),

    /// A character produced no symbols
    Skipped,

    /// Offline with nothing to send
    ///
    /// The caller should wait until the link goes online.
    Idle,
}

/// Transmit scheduler
///
/// See [module documentation](self).
#[derive(Debug)]
pub struct Transmitter {
    tones: ToneTable,
    encoder: Box<dyn SymbolEncoder>,
    zero_carrier: bool,
    burst: Vec<i16>,
}

impl Transmitter {
    /// New scheduler
    ///
    /// Characters are encoded with `encoder` and keyed with the
    /// bursts in `tones`. With `zero_carrier`, the line carries
    /// space tone while offline instead of silence.
    pub fn new(tones: ToneTable, encoder: Box<dyn SymbolEncoder>, zero_carrier: bool) -> Self {
        let capacity = tones.frames_per_bit() * Signal::BITS as usize;
        Self {
            tones,
            encoder,
            zero_carrier,
            burst: Vec::with_capacity(capacity),
        }
    }

    /// Tone table
    pub fn tones(&self) -> &ToneTable {
        &self.tones
    }

    /// Perform one unit of work
    ///
    /// Writes to `sink` as described in the
    /// [module documentation](self). Errors from the sink are
    /// returned.
    pub fn step(&mut self, link: &Link, sink: &mut dyn AudioSink) -> Result<TxStep, AudioError> {
        if link.is_online() || link.outgoing_len() > 0 {
            match link.pop_outgoing() {
                Some(TxUnit::Signal(sig)) => {
                    debug!("tx: signal {}", sig);
                    self.encoder.reset();
                    self.key_signal(sig);
                    sink.write(&self.burst)?;
                    Ok(TxStep::Sent(self.burst.len()))
                }
                Some(TxUnit::Char(c)) => {
                    let symbols = self.encoder.encode(c);
                    if symbols.is_empty() {
                        return Ok(TxStep::Skipped);
                    }

                    trace!("tx: {:?} → {:02x?}", c, symbols.as_slice());
                    let mut sent = 0;
                    for symbol in symbols {
                        self.key_character(symbol);
                        sink.write(&self.burst)?;
                        sent += self.burst.len();
                    }
                    Ok(TxStep::Sent(sent))
                }
                None => {
                    let mark = self.tones.tone(Tone::Mark);
                    sink.write(mark)?;
                    Ok(TxStep::Sent(mark.len()))
                }
            }
        } else {
            let mut sent = 0;
            if link.take_delay_offline() {
                debug!("tx: holding mark before going offline");
                let mark = self.tones.tone(Tone::Mark);
                for _ in 0..OFFLINE_DELAY_BITS {
                    sink.write(mark)?;
                    sent += mark.len();
                }
            }

            if self.zero_carrier {
                let space = self.tones.tone(Tone::Space);
                sink.write(space)?;
                sent += space.len();
            }

            if sent > 0 {
                Ok(TxStep::Sent(sent))
            } else {
                Ok(TxStep::Idle)
            }
        }
    }

    // unframed signal word
    fn key_signal(&mut self, sig: Signal) {
        self.burst.clear();
        for bit in sig.bits() {
            self.burst.extend_from_slice(self.tones.tone(Tone::from_bit(bit)));
        }
    }

    // start bit, five data bits, 1.5 stop bits
    fn key_character(&mut self, symbol: u8) {
        self.burst.clear();
        self.burst.extend_from_slice(self.tones.tone(Tone::Space));
        for i in 0..5 {
            let bit = symbol & (1 << i) != 0;
            self.burst.extend_from_slice(self.tones.tone(Tone::from_bit(bit)));
        }
        self.burst.extend_from_slice(self.tones.tone(Tone::Mark));
        self.burst.extend_from_slice(self.tones.tone(Tone::Mark));
        self.burst.truncate(self.tones.frames_per_character());
    }
}

/// Run the transmitter until shutdown or error
///
/// While offline and idle, sleeps on the link's online gate.
pub(crate) fn run(mut tx: Transmitter, link: &Link, sink: &mut dyn AudioSink) {
    info!("tx: started");
    while link.is_running() {
        match tx.step(link, sink) {
            Ok(TxStep::Skipped) => continue,
            Ok(TxStep::Sent(_)) => {}
            Ok(TxStep::Idle) => {
                link.gate().wait(None);
            }
            Err(err) => {
                error!("tx: {}", err);
                break;
            }
        }
        thread::sleep(YIELD);
    }
    info!("tx: stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::waveform::SAMPLE_RATE;

    const FPB: usize = 960;

    #[derive(Debug, Default)]
    struct VecSink {
        out: Vec<i16>,
        fail: bool,
    }

    impl AudioSink for VecSink {
        fn write(&mut self, samples: &[i16]) -> Result<(), AudioError> {
            if self.fail {
                return Err(AudioError::Closed);
            }
            self.out.extend_from_slice(samples);
            Ok(())
        }
    }

    fn make_tx(zero_carrier: bool) -> Transmitter {
        let tones = ToneTable::new(SAMPLE_RATE, 50, 500.0, 700.0);
        Transmitter::new(tones, Box::new(murray::Encoder::new()), zero_carrier)
    }

    // classify each bit period of `out` by comparing against the tones
    fn bits_of(tx: &Transmitter, out: &[i16]) -> Vec<bool> {
        out.chunks(FPB)
            .map(|bit| {
                let n = bit.len();
                if bit == &tx.tones().tone(Tone::Mark)[..n] {
                    true
                } else if bit == &tx.tones().tone(Tone::Space)[..n] {
                    false
                } else {
                    panic!("not a tone")
                }
            })
            .collect()
    }

    #[test]
    fn test_idle_offline() {
        let mut tx = make_tx(false);
        let link = Link::new();
        let mut sink = VecSink::default();
        for _ in 0..10 {
            assert_eq!(TxStep::Idle, tx.step(&link, &mut sink).unwrap());
        }
        assert!(sink.out.is_empty());
        assert_eq!(0, link.outgoing_len());
    }

    #[test]
    fn test_zero_carrier() {
        let mut tx = make_tx(true);
        let link = Link::new();
        let mut sink = VecSink::default();
        assert_eq!(TxStep::Sent(FPB), tx.step(&link, &mut sink).unwrap());
        assert_eq!(tx.tones().tone(Tone::Space), sink.out.as_slice());
    }

    #[test]
    fn test_connect_and_characters() {
        let mut tx = make_tx(false);
        let link = Link::new();
        let mut sink = VecSink::default();

        link.write("\x1bA", "test");
        link.write("E", "test");
        link.write("E", "test");

        // connection signal
        assert_eq!(TxStep::Sent(16 * FPB), tx.step(&link, &mut sink).unwrap());
        let bits = bits_of(&tx, &sink.out);
        assert_eq!(vec![false; 6], bits[..6]);
        assert_eq!(vec![true; 10], bits[6..]);
        sink.out.clear();

        // first E carries a letters shift
        assert_eq!(TxStep::Sent(2 * 7200), tx.step(&link, &mut sink).unwrap());
        let bits = bits_of(&tx, &sink.out[..7200]);
        assert_eq!(vec![false, true, true, true, true, true, true, true], bits);
        let bits = bits_of(&tx, &sink.out[7200..]);
        assert_eq!(
            vec![false, true, false, false, false, false, true, true],
            bits
        );
        sink.out.clear();

        assert_eq!(TxStep::Sent(7200), tx.step(&link, &mut sink).unwrap());
        sink.out.clear();

        // idle mark while online
        assert_eq!(TxStep::Sent(FPB), tx.step(&link, &mut sink).unwrap());
        assert_eq!(tx.tones().tone(Tone::Mark), sink.out.as_slice());

        // unmappable characters are skipped
        link.write("{", "test");
        assert_eq!(TxStep::Skipped, tx.step(&link, &mut sink).unwrap());
        assert_eq!(0, link.outgoing_len());
    }

    #[test]
    fn test_signal_resets_encoder() {
        let mut tx = make_tx(false);
        let link = Link::new();
        let mut sink = VecSink::default();

        link.write("\x1bA", "test");
        link.write("T", "test");
        tx.step(&link, &mut sink).unwrap();
        assert_eq!(TxStep::Sent(2 * 7200), tx.step(&link, &mut sink).unwrap());

        link.write("\x1bWB", "test");
        link.write("T", "test");
        tx.step(&link, &mut sink).unwrap();
        assert_eq!(TxStep::Sent(2 * 7200), tx.step(&link, &mut sink).unwrap());
    }

    #[test]
    fn test_remote_disconnect_drains() {
        let mut tx = make_tx(false);
        let link = Link::new();
        let mut sink = VecSink::default();

        link.write("\x1bA", "test");
        link.write(" ", "test");
        link.write("\x1bZ", "test");
        assert!(!link.is_online());

        // queue drains after going offline
        assert_eq!(TxStep::Sent(16 * FPB), tx.step(&link, &mut sink).unwrap());
        assert_eq!(TxStep::Sent(7200), tx.step(&link, &mut sink).unwrap());

        // then three seconds of mark
        sink.out.clear();
        assert_eq!(
            TxStep::Sent(OFFLINE_DELAY_BITS * FPB),
            tx.step(&link, &mut sink).unwrap()
        );
        assert!(bits_of(&tx, &sink.out).iter().all(|&b| b));

        // then nothing
        assert_eq!(TxStep::Idle, tx.step(&link, &mut sink).unwrap());
    }

    #[test]
    fn test_local_disconnect_no_delay() {
        let mut tx = make_tx(false);
        let link = Link::new();
        let mut sink = VecSink::default();

        link.write("\x1bA", "test");
        tx.step(&link, &mut sink).unwrap();
        link.write("R", "test");
        link.write("Y", "test");

        // the teleprinter's stop key, then the dispatcher hangs up
        link.press_stop();
        link.write("\x1bZ", "test");

        sink.out.clear();
        assert_eq!(TxStep::Idle, tx.step(&link, &mut sink).unwrap());
        assert!(sink.out.is_empty());
    }

    #[test]
    fn test_delay_with_zero_carrier() {
        let mut tx = make_tx(true);
        let link = Link::new();
        let mut sink = VecSink::default();

        link.write("\x1bA", "test");
        link.write("\x1bZ", "test");
        tx.step(&link, &mut sink).unwrap();

        sink.out.clear();
        assert_eq!(
            TxStep::Sent((OFFLINE_DELAY_BITS + 1) * FPB),
            tx.step(&link, &mut sink).unwrap()
        );
        let bits = bits_of(&tx, &sink.out);
        assert!(bits[..OFFLINE_DELAY_BITS].iter().all(|&b| b));
        assert!(!bits[OFFLINE_DELAY_BITS]);
    }

    #[test]
    fn test_run_stops_on_error() {
        let tx = make_tx(true);
        let link = Link::new();
        let mut sink = VecSink {
            out: Vec::new(),
            fail: true,
        };
        run(tx, &link, &mut sink);
        assert!(link.is_running());
    }

    #[test]
    fn test_run_stops_on_shutdown() {
        let tx = make_tx(false);
        let link = std::sync::Arc::new(Link::new());
        let handle = {
            let link = link.clone();
            thread::spawn(move || {
                let mut sink = VecSink::default();
                run(tx, &link, &mut sink);
                sink.out.len()
            })
        };
        thread::sleep(Duration::from_millis(20));
        link.shutdown();
        assert_eq!(0, handle.join().unwrap());
    }
}
