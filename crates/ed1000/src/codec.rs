//! Character codec seam
//!
//! The modem moves five-bit symbols. Turning characters into
//! symbols and back is the job of a teleprinter code, which the
//! modem reaches through [`SymbolEncoder`] and [`SymbolDecoder`].
//! The Baudot-Murray codec from the `murray` crate implements
//! both and is what [`ModemBuilder`](crate::ModemBuilder) uses.

use arrayvec::ArrayVec;

#[cfg(not(test))]
use log::debug;

#[cfg(test)]
use std::println as debug;

/// Symbols for one character
///
/// A shift code and a printing code, at most.
pub type Symbols = ArrayVec<u8, 2>;

/// Character to symbol encoder
pub trait SymbolEncoder: std::fmt::Debug + Send {
    /// Encode one character
    ///
    /// Returns the five-bit symbols to transmit, in order. An
    /// empty result means there is nothing to send for `c`,
    /// either because it needs no code right now or because the
    /// code cannot represent it.
    fn encode(&mut self, c: char) -> Symbols;

    /// Forget any shift state
    ///
    /// Called at the start of every connection.
    fn reset(&mut self);
}

/// Symbol to character decoder
pub trait SymbolDecoder: std::fmt::Debug + Send {
    /// Decode one five-bit symbol
    ///
    /// Returns `None` for symbols which only change decoder
    /// state or have no meaning.
    fn decode(&mut self, symbol: u8) -> Option<char>;

    /// Return to the power-on state
    fn reset(&mut self);
}

impl SymbolEncoder for murray::Encoder {
    fn encode(&mut self, c: char) -> Symbols {
        match murray::Encoder::encode(self, c) {
            Ok(codes) => codes,
            Err(err) => {
                debug!("encoder: {}", err);
                Symbols::new()
            }
        }
    }

    fn reset(&mut self) {
        murray::Encoder::reset(self)
    }
}

impl SymbolDecoder for murray::Decoder {
    fn decode(&mut self, symbol: u8) -> Option<char> {
        murray::Decoder::decode(self, symbol)
    }

    fn reset(&mut self) {
        murray::Decoder::reset(self)
    }
}
