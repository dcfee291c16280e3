//! # ed1000: sound-card modem for ED1000 teleprinters
//!
//! This crate lets a historic start-stop teleprinter talk to a
//! computer through an ordinary sound card. The teleprinter is
//! connected with an *ED1000* line adapter, which signals with
//! audio frequency-shift keying (AFSK):
//!
//! | direction              | space (0) | mark (1) |
//! |------------------------|-----------|----------|
//! | computer → teleprinter | 500 Hz    | 700 Hz   |
//! | teleprinter → computer | 2250 Hz   | 3150 Hz  |
//!
//! Characters are five-bit Baudot-Murray (ITA2) codes with a
//! start bit and one and a half stop bits, normally at 50 Bd.
//! Audio is mono, signed 16-bit, at 48 kHz.
//!
//! ## Example
//!
//! The modem binds to any [`AudioBackend`]. The simplest is a
//! pair of raw PCM streams, which may be files, pipes, or FIFOs
//! fed by your sound server.
//!
//! ```
//! use ed1000::{ModemBuilder, RawPcmBackend};
//!
//! # let capture = std::io::empty();
//! # let playback = std::io::sink();
//! let mut backend = RawPcmBackend::new(capture, playback);
//! let modem = ModemBuilder::new()
//!     .with_baud_rate(50)
//!     .with_squelch(100)
//!     .build(&mut backend)
//!     .expect("unable to start modem");
//!
//! // connect: sends the connection signal and goes online
//! modem.write("\x1bA", "example");
//! assert!(modem.is_online());
//!
//! // characters are sent while online
//! for c in "RYRY".chars() {
//!     modem.write(&c.to_string(), "example");
//! }
//!
//! // poll for received characters and line events
//! while let Some(text) = modem.read() {
//!     match text.as_str() {
//!         "\x1bAT" => println!("teleprinter wants to go online"),
//!         "\x1bST" => println!("teleprinter wants to go offline"),
//!         c => print!("{}", c),
//!     }
//! }
//!
//! modem.write("\x1bZ", "example");
//! modem.shutdown();
//! ```
//!
//! ## Interface
//!
//! The modem is driven by a *dispatcher*, such as a telex
//! switching program, which polls
//! [`read()`](SoundcardModem::read) and calls
//! [`write()`](SoundcardModem::write). Single characters are
//! sent to the teleprinter. Escape sequences control the
//! connection:
//!
//! | write      | effect                                        |
//! |------------|-----------------------------------------------|
//! | `ESC "A"`  | go online, send the connection signal         |
//! | `ESC "WB"` | go online, send the ready-to-dial signal      |
//! | `ESC "Z"`  | go offline                                    |
//! | `#`        | sent as `@`, "Who are you?"                   |
//!
//! [`read()`](SoundcardModem::read) returns decoded characters
//! and two line events: `ESC "AT"` when the teleprinter goes to
//! mark while offline, and `ESC "ST"` when its line has been
//! space or silent for half a second.
//!
//! ## Receive level
//!
//! The demodulator compares the energy in narrow bands around
//! the two receive tones. Quiet lines are cut off by a squelch
//! threshold. To choose a threshold, enable the receive debug
//! log with [`ModemBuilder::with_recv_debug()`] and look at the
//! energies while the teleprinter is idle and while it is
//! disconnected.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod audio;
mod builder;
mod codec;
mod control;
mod demod;
mod error;
mod filter;
mod framing;
mod modem;
mod receiver;
mod transmit;
mod waveform;

pub use audio::{AudioBackend, AudioSink, AudioSource, RawPcmBackend, RawPcmSink, RawPcmSource};
pub use builder::ModemBuilder;
pub use codec::{SymbolDecoder, SymbolEncoder, Symbols};
pub use control::{Command, Link, OnlineGate, Signal, TxUnit};
pub use demod::{DebugLog, Demod, Detection, EnergyDemod, Level, BANDPASS_ORDER, BANDPASS_RATIO};
pub use error::{AudioError, ConfigError};
pub use filter::{Biquad, SosFilter};
pub use framing::{Framer, LineEvent, LineWatch};
pub use modem::{SoundcardModem, RX_THREAD_NAME, TX_THREAD_NAME};
pub use receiver::{Receiver, SliceOut, OFFLINE_POLL};
pub use transmit::{Transmitter, TxStep, OFFLINE_DELAY_BITS};
pub use waveform::{
    frames_per_bit, frames_per_character, frames_per_slice, Tone, ToneTable, BITS_PER_CHARACTER,
    SAMPLE_RATE, SLICES_PER_BIT, TONE_AMPLITUDE,
};
