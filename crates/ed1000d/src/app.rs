//! Console dispatcher
//!
//! A minimal stand-in for a telex switching program. It polls
//! the modem and the console in turn:
//!
//! ```txt
//!   console line ==> ConsoleLine ==> write() ==> modem
//!   modem ==> read() ==> text ==> stdout
//!                    ==> ESC "AT" ==> write(ESC "A")
//!                    ==> ESC "ST" ==> write(ESC "Z")
//! ```
//!
//! Answering the line events is what a switching program does
//! in local mode: the teleprinter goes online when the operator
//! switches it on and offline when they press the stop key.
//!
//! The loop ends on `/q`, at the end of console input, or when
//! a modem worker dies.

use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context};
use ed1000::{Command, SoundcardModem};
use log::{debug, info};

/// Name we give the modem for its log
const SOURCE: &str = "console";

// pause between polls
const POLL: Duration = Duration::from_millis(10);

/// Run the dispatcher until quit
pub fn run(modem: &SoundcardModem) -> Result<(), anyhow::Error> {
    let console = spawn_console()?;
    let stdout = io::stdout();

    loop {
        if !modem.is_alive() {
            return Err(anyhow!("the modem has stopped; see log for details"));
        }

        while let Some(text) = modem.read() {
            match answer(&text) {
                Some(cmd) => {
                    info!("teleprinter requests {:?}", cmd);
                    modem.write(<&'static str>::from(cmd), SOURCE);
                }
                None => {
                    let mut out = stdout.lock();
                    write!(out, "{}", text)?;
                    out.flush()?;
                }
            }
        }

        match console.try_recv() {
            Ok(line) => {
                if !dispatch(modem, ConsoleLine::from(line.as_str())) {
                    return Ok(());
                }
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                debug!("end of console input");
                return Ok(());
            }
        }

        thread::sleep(POLL);
    }
}

/// One line of console input
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsoleLine {
    /// Exit the program
    Quit,

    /// Send an escape command
    Command(Command),

    /// Ask for the answerback
    WhoAreYou,

    /// Send text, then a new line
    Text(String),
}

impl From<&str> for ConsoleLine {
    fn from(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        match line.trim() {
            "/q" => ConsoleLine::Quit,
            "/a" => ConsoleLine::Command(Command::Connect),
            "/z" => ConsoleLine::Command(Command::Disconnect),
            "/wb" => ConsoleLine::Command(Command::ReadyToDial),
            "/wru" => ConsoleLine::WhoAreYou,
            _ => ConsoleLine::Text(line.to_owned()),
        }
    }
}

impl FromStr for ConsoleLine {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ConsoleLine::from(s))
    }
}

/// Hand one console line to the modem
///
/// Returns `false` when the user asks to quit.
pub fn dispatch(modem: &SoundcardModem, line: ConsoleLine) -> bool {
    match line {
        ConsoleLine::Quit => return false,
        ConsoleLine::Command(cmd) => modem.write(<&'static str>::from(cmd), SOURCE),
        ConsoleLine::WhoAreYou => modem.write("#", SOURCE),
        ConsoleLine::Text(text) => {
            let mut buf = [0u8; 4];
            for c in text.chars().chain("\r\n".chars()) {
                modem.write(c.encode_utf8(&mut buf), SOURCE);
            }
        }
    }
    true
}

/// Command which answers a line event, if `text` is one
pub fn answer(text: &str) -> Option<Command> {
    match text {
        "\x1bAT" => Some(Command::Connect),
        "\x1bST" => Some(Command::Disconnect),
        _ => None,
    }
}

// read console lines on their own thread, since stdin blocks
fn spawn_console() -> Result<Receiver<String>, anyhow::Error> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("console".to_owned())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!("console: {}", e);
                        break;
                    }
                }
            }
        })
        .context("unable to start console")?;
    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    use ed1000::{ModemBuilder, RawPcmBackend};

    #[test]
    fn test_console_line() {
        assert_eq!(ConsoleLine::Quit, ConsoleLine::from("/q"));
        assert_eq!(ConsoleLine::Quit, ConsoleLine::from("/q\r\n"));
        assert_eq!(
            ConsoleLine::Command(Command::Connect),
            ConsoleLine::from(" /a ")
        );
        assert_eq!(
            ConsoleLine::Command(Command::Disconnect),
            ConsoleLine::from("/z")
        );
        assert_eq!(
            ConsoleLine::Command(Command::ReadyToDial),
            ConsoleLine::from("/wb")
        );
        assert_eq!(ConsoleLine::WhoAreYou, "/wru".parse().unwrap());
        assert_eq!(
            ConsoleLine::Text("RYRY /A".to_owned()),
            ConsoleLine::from("RYRY /A\n")
        );
        assert_eq!(ConsoleLine::Text(String::new()), ConsoleLine::from(""));
    }

    #[test]
    fn test_answer() {
        assert_eq!(Some(Command::Connect), answer("\x1bAT"));
        assert_eq!(Some(Command::Disconnect), answer("\x1bST"));
        assert_eq!(None, answer("A"));
        assert_eq!(None, answer("\x1bA"));
    }

    #[test]
    fn test_dispatch() {
        let mut backend = RawPcmBackend::new(io::empty(), io::sink());
        let modem = ModemBuilder::new().build(&mut backend).unwrap();

        assert!(dispatch(&modem, ConsoleLine::from("/a")));
        assert!(modem.is_online());
        assert!(dispatch(&modem, ConsoleLine::from("HELLO")));
        assert!(dispatch(&modem, ConsoleLine::from("/wru")));
        assert!(dispatch(&modem, ConsoleLine::from("/z")));
        assert!(!modem.is_online());
        assert!(!dispatch(&modem, ConsoleLine::from("/q")));
        modem.shutdown();
    }
}
