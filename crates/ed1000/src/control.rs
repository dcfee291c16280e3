//! Online/offline control
//!
//! The [`Link`] is the state shared by the dispatcher and the two
//! modem workers:
//!
//! * the [`OnlineGate`], which says whether the teleprinter is
//!   connected and lets the workers sleep while it is not;
//! * the outgoing queue of [`TxUnit`], filled by
//!   [`write()`](Link::write) and drained by the transmitter;
//! * the incoming queue of decoded characters and line events,
//!   filled by the receiver and drained by [`read()`](Link::read);
//! * two flags which shape the way a connection ends.
//!
//! ## Going offline
//!
//! A connection which ends remotely should not cut the
//! teleprinter off mid-sentence. [`Command::Disconnect`] leaves
//! the outgoing queue alone so the transmitter can finish it, and
//! every [`Command::Connect`] arms a *delayed offline*: once the
//! queue is empty, the transmitter holds mark for another three
//! seconds at 50 Bd so the operator can read the last line.
//!
//! When the operator ends the connection with the teleprinter's
//! stop key, the receiver reports [`LineEvent::Stop`] and
//! [`press_stop()`](Link::press_stop) is called. The next
//! disconnect is then locally initiated: the queue is flushed and
//! there is no delay.
//!
//! [`LineEvent::Stop`]: crate::LineEvent::Stop

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[cfg(not(test))]
use log::debug;

#[cfg(test)]
use std::println as debug;

/// Escape command from the dispatcher
///
/// Parse with [`FromStr`]; the string form is the escape
/// sequence.
///
/// ```
/// use std::str::FromStr;
/// use ed1000::Command;
///
/// assert_eq!(Command::Connect, Command::from_str("\x1bA").unwrap());
/// assert_eq!("\x1bWB", <&'static str>::from(Command::ReadyToDial));
/// assert!(Command::from_str("\x1bQ").is_err());
/// ```
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::EnumString, strum_macros::IntoStaticStr,
)]
pub enum Command {
    /// Go online and send the connection signal
    #[strum(serialize = "\x1bA")]
    Connect,

    /// Go offline
    #[strum(serialize = "\x1bZ")]
    Disconnect,

    /// Go online and send the ready-to-dial signal
    #[strum(serialize = "\x1bWB")]
    ReadyToDial,
}

/// Line signal
///
/// Signals are sent as a raw bit pattern with no start/stop
/// framing. The `Display` form is the signalling type letter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Signal {
    /// Connection established (type A)
    #[strum(serialize = "A")]
    Connect,

    /// Ready for dialling (type W)
    #[strum(serialize = "W")]
    ReadyToDial,
}

impl Signal {
    /// Number of bits in a signal word
    pub const BITS: u32 = 16;

    /// Bit pattern, sent LSb first
    ///
    /// Both signals share a pattern: six bits of space followed
    /// by ten of mark.
    pub fn word(&self) -> u16 {
        match self {
            Signal::Connect => 0xFFC0,
            Signal::ReadyToDial => 0xFFC0,
        }
    }

    /// Line bits, in transmission order
    pub fn bits(&self) -> impl Iterator<Item = bool> {
        let word = self.word();
        (0..Self::BITS).map(move |i| word & (1 << i) != 0)
    }
}

/// One unit of outgoing work
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TxUnit {
    /// A character to encode and send
    Char(char),

    /// A line signal
    Signal(Signal),
}

/// Online flag with blocking wait
///
/// A boolean which threads can sleep on until it becomes set.
/// The gate also carries the modem's run flag:
/// [`shutdown()`](OnlineGate::shutdown) wakes every waiter,
/// online or not.
#[derive(Debug)]
pub struct OnlineGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

#[derive(Clone, Copy, Debug)]
struct GateState {
    online: bool,
    running: bool,
}

impl OnlineGate {
    /// New gate, offline and running
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                online: false,
                running: true,
            }),
            changed: Condvar::new(),
        }
    }

    /// Go online and wake all waiters
    pub fn set(&self) {
        lock(&self.state).online = true;
        self.changed.notify_all();
    }

    /// Go offline
    pub fn clear(&self) {
        lock(&self.state).online = false;
    }

    /// True if online
    pub fn is_set(&self) -> bool {
        lock(&self.state).online
    }

    /// Wait until online
    ///
    /// Blocks until the gate is set, until `timeout` elapses, or
    /// until shutdown. Returns the online state on wake.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let guard = lock(&self.state);
        let blocked = |s: &mut GateState| !s.online && s.running;
        let guard = match timeout {
            None => self
                .changed
                .wait_while(guard, blocked)
                .unwrap_or_else(PoisonError::into_inner),
            Some(timeout) => {
                self.changed
                    .wait_timeout_while(guard, timeout, blocked)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
        };
        guard.online
    }

    /// Stop running and wake all waiters
    pub fn shutdown(&self) {
        lock(&self.state).running = false;
        self.changed.notify_all();
    }

    /// True until shutdown
    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }
}

impl Default for OnlineGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared link state
///
/// See [module documentation](self).
#[derive(Debug, Default)]
pub struct Link {
    gate: OnlineGate,
    delay_offline: AtomicBool,
    st_pressed: AtomicBool,
    outgoing: Mutex<VecDeque<TxUnit>>,
    incoming: Mutex<VecDeque<String>>,
}

impl Link {
    /// New link, offline with empty queues
    pub fn new() -> Self {
        Self::default()
    }

    /// Online gate
    pub fn gate(&self) -> &OnlineGate {
        &self.gate
    }

    /// True if online
    pub fn is_online(&self) -> bool {
        self.gate.is_set()
    }

    /// True until shutdown
    pub fn is_running(&self) -> bool {
        self.gate.is_running()
    }

    /// Stop both workers
    pub fn shutdown(&self) {
        self.gate.shutdown();
    }

    /// Submit text from the dispatcher
    ///
    /// A single character is queued for transmission if we are
    /// online and dropped otherwise; `#` is sent as `@`, the
    /// "Who are you?" code. Anything longer is an escape
    /// [`Command`]. Unknown commands are ignored. `source` names
    /// the caller, for the log.
    pub fn write(&self, unit: &str, source: &str) {
        debug!("write from {:?}: {:?}", source, unit);

        let mut chars = unit.chars();
        let c = match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => return self.command(unit),
        };

        let c = if c == '#' { '@' } else { c };
        if self.is_online() {
            lock(&self.outgoing).push_back(TxUnit::Char(c));
        }
    }

    /// Oldest received character or line event
    ///
    /// Line events are reported as `ESC "AT"` and `ESC "ST"`.
    pub fn read(&self) -> Option<String> {
        let out = lock(&self.incoming).pop_front();
        if let Some(text) = &out {
            debug!("read: {:?}", text);
        }
        out
    }

    /// Parse and execute an escape command
    pub fn command(&self, text: &str) {
        match Command::from_str(text) {
            Ok(cmd) => self.execute(cmd),
            Err(_) => debug!("ignoring command {:?}", text),
        }
    }

    /// Execute an escape command
    pub fn execute(&self, cmd: Command) {
        match cmd {
            Command::Connect => {
                debug!("going online");
                self.replace_outgoing(TxUnit::Signal(Signal::Connect));
                self.set_online(true);
            }
            Command::Disconnect => {
                let st_pressed = self.st_pressed.swap(false, Ordering::SeqCst);
                debug!("going offline (ST pressed: {})", st_pressed);

                // disarm before the transmitter can see us offline
                if st_pressed {
                    self.delay_offline.store(false, Ordering::SeqCst);
                    lock(&self.outgoing).clear();
                }
                self.set_online(false);
            }
            Command::ReadyToDial => {
                debug!("ready to dial");
                self.replace_outgoing(TxUnit::Signal(Signal::ReadyToDial));
                self.set_online(true);
            }
        }
    }

    /// Change the online state
    ///
    /// Going online arms the delayed offline.
    pub fn set_online(&self, online: bool) {
        if online {
            debug!("set online");
            self.gate.set();
            self.delay_offline.store(true, Ordering::SeqCst);
        } else {
            debug!("set offline");
            self.gate.clear();
        }
    }

    /// Record that the teleprinter's stop key was pressed
    pub fn press_stop(&self) {
        self.st_pressed.store(true, Ordering::SeqCst);
    }

    /// True if a stop has been seen since the last disconnect
    pub fn is_stop_pressed(&self) -> bool {
        self.st_pressed.load(Ordering::SeqCst)
    }

    /// True if the delayed offline is armed
    pub fn is_delay_offline(&self) -> bool {
        self.delay_offline.load(Ordering::SeqCst)
    }

    /// Disarm the delayed offline, returning its previous state
    pub fn take_delay_offline(&self) -> bool {
        self.delay_offline.swap(false, Ordering::SeqCst)
    }

    /// Next unit to transmit
    pub fn pop_outgoing(&self) -> Option<TxUnit> {
        lock(&self.outgoing).pop_front()
    }

    /// Number of units waiting to be transmitted
    pub fn outgoing_len(&self) -> usize {
        lock(&self.outgoing).len()
    }

    /// Report received text to the dispatcher
    pub fn push_incoming(&self, text: String) {
        lock(&self.incoming).push_back(text);
    }

    // flush the outgoing queue and leave only `unit` in it
    fn replace_outgoing(&self, unit: TxUnit) {
        let mut queue = lock(&self.outgoing);
        queue.clear();
        queue.push_back(unit);
    }
}

// A panicked worker cannot leave a queue or flag half-written,
// so a poisoned lock is still good.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
