//! Stateful encoder and decoder

use arrayvec::ArrayVec;
use thiserror::Error;

use crate::codebook::{self, Entry, CODE_MASK, FIGS, FIGURES, LETTERS, LTRS};

/// Teleprinter shift state
///
/// ITA2 has only 32 codes, so most of them carry two meanings.
/// The receiving machine remembers which of the two character
/// sets is active. The `Display` form is the usual teleprinter
/// key legend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Shift {
    /// Letters shift, entered with [`LTRS`]
    #[strum(serialize = "LTRS")]
    Letters,

    /// Figures shift, entered with [`FIGS`]
    #[strum(serialize = "FIGS")]
    Figures,
}

impl Shift {
    /// Code which selects this shift
    pub fn code(&self) -> u8 {
        match self {
            Shift::Letters => LTRS,
            Shift::Figures => FIGS,
        }
    }
}

/// Codes for one encoded character
///
/// A character encodes to at most one shift code followed by
/// one printing code.
pub type Codes = ArrayVec<u8, 2>;

/// Error encoding a character
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EncodeError {
    /// The character has no ITA2 representation
    #[error("character {0:?} has no Baudot-Murray code")]
    Unmapped(char),
}

/// Character to Baudot-Murray encoder
///
/// The encoder tracks the shift state of the receiving
/// machine and inserts [`LTRS`] or [`FIGS`] whenever the
/// next character needs the other shift.
///
/// ```
/// use murray::{Encoder, LTRS, FIGS};
///
/// let mut enc = Encoder::new();
/// assert_eq!(&[LTRS, 0x01], enc.encode('e').unwrap().as_slice());
/// assert_eq!(&[0x03], enc.encode('A').unwrap().as_slice());
/// assert_eq!(&[FIGS, 0x17], enc.encode('1').unwrap().as_slice());
/// assert_eq!(&[0x04], enc.encode(' ').unwrap().as_slice());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Encoder {
    // None until the first shift code is sent
    shift: Option<Shift>,
}

impl Encoder {
    /// New encoder with unknown shift state
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the receiver's shift state
    ///
    /// The next character which depends on the shift will be
    /// preceded by a shift code.
    pub fn reset(&mut self) {
        self.shift = None;
    }

    /// Current shift state, if known
    pub fn shift(&self) -> Option<Shift> {
        self.shift
    }

    /// Encode one character
    ///
    /// Letters are accepted in either case. The result may be
    /// empty if `c` is an explicit shift request (`[` or `]`)
    /// for the shift which is already active.
    pub fn encode(&mut self, c: char) -> Result<Codes, EncodeError> {
        let entry = codebook::lookup(c.to_ascii_uppercase())
            .ok_or(EncodeError::Unmapped(c))?;

        let mut out = Codes::new();
        match entry {
            Entry::Either(code) => out.push(code),
            Entry::Shifted(shift, code) => {
                if self.shift != Some(shift) {
                    out.push(shift.code());
                    self.shift = Some(shift);
                }
                out.push(code);
            }
            Entry::ShiftOnly(shift) => {
                if self.shift != Some(shift) {
                    out.push(shift.code());
                    self.shift = Some(shift);
                }
            }
        }
        Ok(out)
    }
}

/// Baudot-Murray to character decoder
///
/// Shift codes change the decoder state and produce no
/// character. Machines power up in the letters shift, and
/// so does the decoder.
///
/// ```
/// use murray::{Decoder, FIGS};
///
/// let mut dec = Decoder::new();
/// assert_eq!(Some('E'), dec.decode(0x01));
/// assert_eq!(None, dec.decode(FIGS));
/// assert_eq!(Some('3'), dec.decode(0x01));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoder {
    shift: Shift,
}

impl Decoder {
    /// New decoder in the letters shift
    pub fn new() -> Self {
        Self {
            shift: Shift::Letters,
        }
    }

    /// Return to the letters shift
    pub fn reset(&mut self) {
        self.shift = Shift::Letters;
    }

    /// Current shift state
    pub fn shift(&self) -> Shift {
        self.shift
    }

    /// Decode one five-bit code
    ///
    /// Bits above the fifth are ignored. Returns `None` for
    /// shift codes and for codes which are unassigned in the
    /// current shift.
    pub fn decode(&mut self, code: u8) -> Option<char> {
        match code & CODE_MASK {
            LTRS => {
                self.shift = Shift::Letters;
                None
            }
            FIGS => {
                self.shift = Shift::Figures;
                None
            }
            code => match self.shift {
                Shift::Letters => LETTERS[code as usize],
                Shift::Figures => FIGURES[code as usize],
            },
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
