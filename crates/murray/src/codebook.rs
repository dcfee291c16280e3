//! ITA2 code tables
//!
//! Codes are five bits wide and are numbered with bit 1 (the
//! first data bit on the line) as the least significant bit.
//!
//! | code   | letters | figures |
//! |--------|---------|---------|
//! | `0x00` | NULL `~`| NULL `~`|
//! | `0x01` | `E`     | `3`     |
//! | `0x02` | LF      | LF      |
//! | `0x03` | `A`     | `-`     |
//! | `0x04` | space   | space   |
//! | `0x09` | `D`     | WRU `@` |
//! | `0x0B` | `J`     | bell `%`|
//! | `0x1B` | FIGS    | FIGS    |
//! | `0x1F` | LTRS    | LTRS    |
//!
//! The remaining entries follow the international ITA2 layout.
//! Figure positions which are reserved for national use
//! (`F`, `H`, `G`) are unassigned.

use phf::phf_map;

use crate::Shift;

/// Letters shift code
pub const LTRS: u8 = 0x1F;

/// Figures shift code
pub const FIGS: u8 = 0x1B;

/// Mask for the five data bits
pub const CODE_MASK: u8 = 0x1F;

/// Decode table for the letters shift
pub(crate) static LETTERS: [Option<char>; 32] = [
    Some('~'),
    Some('E'),
    Some('\n'),
    Some('A'),
    Some(' '),
    Some('S'),
    Some('I'),
    Some('U'),
    Some('\r'),
    Some('D'),
    Some('R'),
    Some('J'),
    Some('N'),
    Some('F'),
    Some('C'),
    Some('K'),
    Some('T'),
    Some('Z'),
    Some('L'),
    Some('W'),
    Some('H'),
    Some('Y'),
    Some('P'),
    Some('Q'),
    Some('O'),
    Some('B'),
    Some('G'),
    None, // FIGS
    Some('M'),
    Some('X'),
    Some('V'),
    None, // LTRS
];

/// Decode table for the figures shift
pub(crate) static FIGURES: [Option<char>; 32] = [
    Some('~'),
    Some('3'),
    Some('\n'),
    Some('-'),
    Some(' '),
    Some('\''),
    Some('8'),
    Some('7'),
    Some('\r'),
    Some('@'),
    Some('4'),
    Some('%'),
    Some(','),
    None,
    Some(':'),
    Some('('),
    Some('5'),
    Some('+'),
    Some(')'),
    Some('2'),
    None,
    Some('6'),
    Some('0'),
    Some('1'),
    Some('9'),
    Some('?'),
    None,
    None, // FIGS
    Some('.'),
    Some('/'),
    Some('='),
    None, // LTRS
];

/// An entry in [`CODEBOOK`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Entry {
    /// Same code in either shift
    Either(u8),

    /// Code which requires the given shift
    Shifted(Shift, u8),

    /// Explicit shift request, no printing code
    ShiftOnly(Shift),
}

/// Lookup the encoding of an upper-case character
pub(crate) fn lookup(c: char) -> Option<Entry> {
    CODEBOOK.get(&c).copied()
}

/// Upper-case character to code
static CODEBOOK: phf::Map<char, Entry> = phf_map! {
    // either shift
    '~' => Entry::Either(0x00),
    '\n' => Entry::Either(0x02),
    ' ' => Entry::Either(0x04),
    '\r' => Entry::Either(0x08),

    // shift requests
    '[' => Entry::ShiftOnly(Shift::Letters),
    ']' => Entry::ShiftOnly(Shift::Figures),

    // letters
    'E' => Entry::Shifted(Shift::Letters, 0x01),
    'A' => Entry::Shifted(Shift::Letters, 0x03),
    'S' => Entry::Shifted(Shift::Letters, 0x05),
    'I' => Entry::Shifted(Shift::Letters, 0x06),
    'U' => Entry::Shifted(Shift::Letters, 0x07),
    'D' => Entry::Shifted(Shift::Letters, 0x09),
    'R' => Entry::Shifted(Shift::Letters, 0x0A),
    'J' => Entry::Shifted(Shift::Letters, 0x0B),
    'N' => Entry::Shifted(Shift::Letters, 0x0C),
    'F' => Entry::Shifted(Shift::Letters, 0x0D),
    'C' => Entry::Shifted(Shift::Letters, 0x0E),
    'K' => Entry::Shifted(Shift::Letters, 0x0F),
    'T' => Entry::Shifted(Shift::Letters, 0x10),
    'Z' => Entry::Shifted(Shift::Letters, 0x11),
    'L' => Entry::Shifted(Shift::Letters, 0x12),
    'W' => Entry::Shifted(Shift::Letters, 0x13),
    'H' => Entry::Shifted(Shift::Letters, 0x14),
    'Y' => Entry::Shifted(Shift::Letters, 0x15),
    'P' => Entry::Shifted(Shift::Letters, 0x16),
    'Q' => Entry::Shifted(Shift::Letters, 0x17),
    'O' => Entry::Shifted(Shift::Letters, 0x18),
    'B' => Entry::Shifted(Shift::Letters, 0x19),
    'G' => Entry::Shifted(Shift::Letters, 0x1A),
    'M' => Entry::Shifted(Shift::Letters, 0x1C),
    'X' => Entry::Shifted(Shift::Letters, 0x1D),
    'V' => Entry::Shifted(Shift::Letters, 0x1E),

    // figures
    '3' => Entry::Shifted(Shift::Figures, 0x01),
    '-' => Entry::Shifted(Shift::Figures, 0x03),
    '\'' => Entry::Shifted(Shift::Figures, 0x05),
    '8' => Entry::Shifted(Shift::Figures, 0x06),
    '7' => Entry::Shifted(Shift::Figures, 0x07),
    '@' => Entry::Shifted(Shift::Figures, 0x09),
    '4' => Entry::Shifted(Shift::Figures, 0x0A),
    '%' => Entry::Shifted(Shift::Figures, 0x0B),
    ',' => Entry::Shifted(Shift::Figures, 0x0C),
    ':' => Entry::Shifted(Shift::Figures, 0x0E),
    '(' => Entry::Shifted(Shift::Figures, 0x0F),
    '5' => Entry::Shifted(Shift::Figures, 0x10),
    '+' => Entry::Shifted(Shift::Figures, 0x11),
    ')' => Entry::Shifted(Shift::Figures, 0x12),
    '2' => Entry::Shifted(Shift::Figures, 0x13),
    '6' => Entry::Shifted(Shift::Figures, 0x15),
    '0' => Entry::Shifted(Shift::Figures, 0x16),
    '1' => Entry::Shifted(Shift::Figures, 0x17),
    '9' => Entry::Shifted(Shift::Figures, 0x18),
    '?' => Entry::Shifted(Shift::Figures, 0x19),
    '.' => Entry::Shifted(Shift::Figures, 0x1C),
    '/' => Entry::Shifted(Shift::Figures, 0x1D),
    '=' => Entry::Shifted(Shift::Figures, 0x1E),
};
