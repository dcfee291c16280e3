//! Start/stop framing and line supervision
//!
//! Both state machines here are clocked by the demodulator at
//! four *slices* per bit. They watch the same stream of
//! mark/space decisions but are otherwise independent:
//!
//! * [`LineWatch`] notices the teleprinter going on or off line,
//!   whether or not we are online;
//! * [`Framer`] assembles start/stop characters, but only while
//!   we are online.
//!
//! A framed character looks like this on the line, in slices:
//!
//! ```txt
//!  slice  0   4   8   12  16  20  24      30
//!         +---+---+---+---+---+---+-------+
//!  idle   |st |b0 |b1 |b2 |b3 |b4 | stop  | next start
//!         +---+---+---+---+---+---+-------+
//!           ^   ^   ^   ^   ^   ^     ^ ^
//!         1,2   6  10  14  18  22    26 28
//! ```
//!
//! Slices 1 and 2 must still be space, 6 through 22 are the
//! data bits, and 26 must be mark. The symbol is delivered at
//! slice 28.

#[cfg(not(test))]
use log::{debug, trace};

#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as trace;

/// Line supervision event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum LineEvent {
    /// The teleprinter went to mark while we were offline
    ///
    /// This is a request to go online.
    Attention,

    /// The line has been space or silent for a long time
    ///
    /// This is a request to go offline.
    Stop,
}

impl LineEvent {
    /// Escape sequence which reports this event to the dispatcher
    pub fn escape(&self) -> &'static str {
        match self {
            LineEvent::Attention => "\x1bAT",
            LineEvent::Stop => "\x1bST",
        }
    }
}

/// Online/offline hysteresis
///
/// Counts consecutive mark slices and consecutive
/// space-or-no-carrier slices.
///
/// * The first mark slice seen while offline raises
///   [`LineEvent::Attention`] at once, with no debounce.
/// * Exactly [`STOP_SLICES`](LineWatch::STOP_SLICES)
///   consecutive zero slices raise [`LineEvent::Stop`].
///
/// The zero counter starts out already past the stop
/// threshold. No stop is reported until a mark has been seen,
/// which keeps a freshly started receiver from hanging up a
/// connection that is already in progress.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineWatch {
    zeros: u32,
    ones: u32,
}

impl LineWatch {
    /// Consecutive zero slices which mean "offline"
    ///
    /// Half a second at 50 Bd.
    pub const STOP_SLICES: u32 = 100;

    /// New supervisor
    pub fn new() -> Self {
        Self {
            zeros: Self::STOP_SLICES,
            ones: 0,
        }
    }

    /// Reset to power-on state
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Process one slice
    ///
    /// `mark` is the demodulator's decision for the slice;
    /// no-carrier counts as zero. `online` is the current
    /// online state of the device.
    pub fn input(&mut self, mark: bool, online: bool) -> Option<LineEvent> {
        if mark {
            self.zeros = 0;
            self.ones = self.ones.saturating_add(1);
            if self.ones == 1 && !online {
                debug!("line: attention");
                return Some(LineEvent::Attention);
            }
        } else {
            self.ones = 0;
            self.zeros = self.zeros.saturating_add(1);
            if self.zeros == Self::STOP_SLICES {
                debug!("line: stop after {} zero slices", Self::STOP_SLICES);
                return Some(LineEvent::Stop);
            }
        }
        None
    }

    /// Current run of zero slices
    pub fn zero_run(&self) -> u32 {
        self.zeros
    }

    /// Current run of mark slices
    pub fn one_run(&self) -> u32 {
        self.ones
    }
}

impl Default for LineWatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Quarter-bit character framer
///
/// The `Framer` is fed one mark/space decision per slice
/// and emits a five-bit symbol for every well-formed
/// start/stop character.
///
/// Framing only begins once the device is *properly online*:
/// online, and at least one mark has been received since going
/// online. A teleprinter which is switching from the idle space
/// level to mark would otherwise look like a start bit followed
/// by a short run of zeros, and the framer would invent a NULL,
/// `T`, `O`, `M`, `V`, or letters shift.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Framer {
    // slices since the start bit was detected; zero while
    // searching and negative while sitting out a framing error
    slice: i32,

    // symbol under assembly, LSb first
    symbol: u8,

    properly_online: bool,
}

impl Framer {
    /// New framer, searching and not properly online
    pub fn new() -> Self {
        Self {
            slice: 0,
            symbol: 0,
            properly_online: false,
        }
    }

    /// Reset to zero initial conditions
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// True once a mark has been seen since going online
    pub fn is_properly_online(&self) -> bool {
        self.properly_online
    }

    /// True while searching for a start bit
    pub fn is_searching(&self) -> bool {
        self.slice == 0
    }

    /// Process one slice
    ///
    /// `mark` is the demodulator's decision for the slice, and
    /// `online` is the current online state of the device.
    /// Returns the symbol when a character is complete.
    pub fn input(&mut self, mark: bool, online: bool) -> Option<u8> {
        if !online {
            if self.properly_online {
                debug!("framer: offline");
            }
            self.reset();
            return None;
        }

        if !self.properly_online {
            if !mark {
                return None;
            }
            debug!("framer: properly online");
            self.properly_online = true;
            self.slice = 0;
        }

        if self.slice == 0 {
            if !mark {
                self.symbol = 0;
                self.slice = 1;
            }
            return None;
        }

        if START_CHECK_SLICES.contains(&self.slice) && mark {
            trace!("framer: false start at slice {}", self.slice);
            self.slice = -1;
        }

        if let Some(bit) = DATA_SLICES.iter().position(|&s| s == self.slice) {
            if mark {
                self.symbol |= 1 << bit;
            }
        }

        if self.slice == STOP_SLICE && !mark {
            debug!(
                "framer: stop bit missing, symbol {:#04x} dropped",
                self.symbol
            );
            self.slice = STOP_FAILED_SLICE;
        }

        if self.slice >= END_SLICE {
            self.slice = 0;
            trace!("framer: symbol {:#04x}", self.symbol);
            return Some(self.symbol);
        }

        self.slice += 1;
        None
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

// the start bit must still be space here
const START_CHECK_SLICES: [i32; 2] = [1, 2];

// middle of data bits 1 … 5
const DATA_SLICES: [i32; 5] = [6, 10, 14, 18, 22];

// middle of the stop bit
const STOP_SLICE: i32 = 26;

// end of the stop margin; the symbol is delivered here
const END_SLICE: i32 = 28;

// after a stop bit error, sit out four more slices before
// searching again
const STOP_FAILED_SLICE: i32 = -5;
