//! # murray: Baudot-Murray teleprinter code
//!
//! This crate converts between characters and the five-bit
//! *Baudot-Murray* code (ITA2) spoken by start-stop
//! teleprinters. ITA2 has two character sets, *letters* and
//! *figures*, selected by the [`LTRS`] and [`FIGS`] shift codes.
//! The [`Encoder`] and [`Decoder`] track the shift state of the
//! machine at the other end of the line.
//!
//! For a complete sound-card modem, see our companion library
//! `ed1000`.
//!
//! ## Example
//!
//! ```
//! use murray::{Decoder, Encoder};
//!
//! let mut enc = Encoder::new();
//! let mut dec = Decoder::new();
//!
//! let mut line = Vec::new();
//! for c in "CQ 73".chars() {
//!     line.extend(enc.encode(c).expect("no such character"));
//! }
//!
//! let text: String = line.iter().filter_map(|&code| dec.decode(code)).collect();
//! assert_eq!("CQ 73", text);
//! ```
//!
//! ## Character conventions
//!
//! Control functions are mapped onto printable characters:
//!
//! * `~` is the NULL code (all five bits space);
//! * `@` is "Who are you?" (WRU), which asks the remote machine
//!   to send its answerback;
//! * `%` rings the bell;
//! * `[` and `]` force a letters or figures shift.
//!
//! Letters decode to upper case.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codebook;
mod codec;

pub use codebook::{CODE_MASK, FIGS, LTRS};
pub use codec::{Codes, Decoder, EncodeError, Encoder, Shift};
