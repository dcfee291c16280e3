//! The sound-card modem device
//!
//! A [`SoundcardModem`] runs two worker threads for as long as
//! it lives:
//!
//! * `ED1000tx` runs the [`Transmitter`] against the playback
//!   stream;
//! * `ED1000rx` runs the [`Receiver`] against the capture stream.
//!
//! The dispatcher talks to the modem only through
//! [`write()`](SoundcardModem::write) and
//! [`read()`](SoundcardModem::read), which never block.
//!
//! A worker which fails logs the error and exits. The modem
//! then stops doing whatever that worker did, and
//! [`is_alive()`](SoundcardModem::is_alive) turns false. There
//! is no automatic restart.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

#[cfg(not(test))]
use log::{error, info};

#[cfg(test)]
use std::println as error;
#[cfg(test)]
use std::println as info;

use crate::audio::{AudioSink, AudioSource};
use crate::control::Link;
use crate::error::ConfigError;
use crate::receiver::{self, Receiver};
use crate::transmit::{self, Transmitter};

/// Transmit worker thread name
pub const TX_THREAD_NAME: &str = "ED1000tx";

/// Receive worker thread name
pub const RX_THREAD_NAME: &str = "ED1000rx";

/// ED1000 teleprinter attached to a sound card
///
/// Create with [`ModemBuilder`](crate::ModemBuilder). See
/// [module documentation](self).
#[derive(Debug)]
pub struct SoundcardModem {
    link: Arc<Link>,
    tx: Worker,
    rx: Worker,
}

impl SoundcardModem {
    /// Start both workers
    pub(crate) fn start(
        transmitter: Transmitter,
        receiver: Receiver,
        mut source: Box<dyn AudioSource>,
        mut sink: Box<dyn AudioSink>,
    ) -> Result<Self, ConfigError> {
        let link = Arc::new(Link::new());

        let tx = Worker::spawn(TX_THREAD_NAME, link.clone(), move |link| {
            transmit::run(transmitter, link, sink.as_mut())
        })?;

        let rx = match Worker::spawn(RX_THREAD_NAME, link.clone(), move |link| {
            receiver::run(receiver, link, source.as_mut())
        }) {
            Ok(rx) => rx,
            Err(e) => {
                link.shutdown();
                return Err(e);
            }
        };

        info!("modem: started");
        Ok(Self { link, tx, rx })
    }

    /// Oldest received character or line event
    ///
    /// Returns `None` if nothing has been received. Line events
    /// are the escape sequences `ESC "AT"`, when the teleprinter
    /// asks to go online, and `ESC "ST"`, when it asks to go
    /// offline.
    pub fn read(&self) -> Option<String> {
        self.link.read()
    }

    /// Submit a character or an escape command
    ///
    /// See [`Link::write()`]. `source` names the caller.
    pub fn write(&self, unit: &str, source: &str) {
        self.link.write(unit, source)
    }

    /// True if online
    pub fn is_online(&self) -> bool {
        self.link.is_online()
    }

    /// True if both workers are running
    pub fn is_alive(&self) -> bool {
        self.tx.is_alive() && self.rx.is_alive()
    }

    /// Stop both workers and wait for them to exit
    ///
    /// A worker blocked on audio I/O exits once its current
    /// read or write completes.
    pub fn shutdown(mut self) {
        self.link.shutdown();
        self.tx.join();
        self.rx.join();
        info!("modem: stopped");
    }
}

impl Drop for SoundcardModem {
    fn drop(&mut self) {
        self.link.shutdown();
    }
}

#[derive(Debug)]
struct Worker {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
    alive: Arc<AtomicBool>,
}

impl Worker {
    fn spawn<F>(name: &'static str, link: Arc<Link>, body: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(&Link) + Send + 'static,
    {
        let alive = Arc::new(AtomicBool::new(true));
        let guard = AliveGuard(alive.clone());

        let handle = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                let _guard = guard;
                if panic::catch_unwind(AssertUnwindSafe(|| body(&link))).is_err() {
                    error!("{}: worker panicked", name);
                }
            })
            .map_err(|e| {
                error!("{}: {}", name, e);
                ConfigError::Worker(name)
            })?;

        Ok(Self {
            name,
            handle: Some(handle),
            alive,
        })
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("{}: join failed", self.name);
            }
        }
    }
}

// clears the liveness flag when the worker exits, however it exits
#[derive(Debug)]
struct AliveGuard(Arc<AtomicBool>);

impl Drop for AliveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use crate::audio::AudioBackend;
    use crate::error::AudioError;
    use crate::waveform::{Tone, ToneTable, SAMPLE_RATE};
    use crate::ModemBuilder;

    const FPB: usize = 960;

    // plays a script, then silence forever
    #[derive(Debug)]
    struct ScriptSource(VecDeque<i16>);

    impl AudioSource for ScriptSource {
        fn read(&mut self, buf: &mut [i16]) -> Result<usize, AudioError> {
            thread::sleep(Duration::from_millis(1));
            for sa in buf.iter_mut() {
                *sa = self.0.pop_front().unwrap_or(0);
            }
            Ok(buf.len())
        }
    }

    #[derive(Clone, Debug, Default)]
    struct SharedSink {
        out: Arc<Mutex<Vec<i16>>>,
        fail: bool,
    }

    impl SharedSink {
        fn len(&self) -> usize {
            self.out.lock().unwrap().len()
        }
    }

    impl AudioSink for SharedSink {
        fn write(&mut self, samples: &[i16]) -> Result<(), AudioError> {
            if self.fail {
                return Err(AudioError::Closed);
            }
            self.out.lock().unwrap().extend_from_slice(samples);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct MemoryBackend {
        script: Vec<i16>,
        sink: SharedSink,
    }

    impl AudioBackend for MemoryBackend {
        fn open_source(
            &mut self,
            _device: Option<usize>,
            rate: u32,
            block: usize,
        ) -> Result<Box<dyn AudioSource>, ConfigError> {
            assert_eq!(SAMPLE_RATE, rate);
            assert_eq!(240, block);
            let script = std::mem::take(&mut self.script);
            Ok(Box::new(ScriptSource(script.into())))
        }

        fn open_sink(
            &mut self,
            _device: Option<usize>,
            _rate: u32,
        ) -> Result<Box<dyn AudioSink>, ConfigError> {
            Ok(Box::new(self.sink.clone()))
        }
    }

    fn start(script: Vec<i16>, sink: SharedSink, zero_carrier: bool) -> SoundcardModem {
        let mut backend = MemoryBackend { script, sink };
        ModemBuilder::new()
            .with_zero_carrier(zero_carrier)
            .build(&mut backend)
            .expect("build modem")
    }

    // teleprinter audio: `marks` bits of idle mark, then framed codes
    fn teleprinter(marks: usize, codes: &[u8]) -> Vec<i16> {
        let tones = ToneTable::new(SAMPLE_RATE, 50, 2250.0, 3150.0);
        let mut out = Vec::new();
        for _ in 0..marks {
            out.extend_from_slice(tones.tone(Tone::Mark));
        }
        for &code in codes {
            let start = out.len();
            out.extend_from_slice(tones.tone(Tone::Space));
            for i in 0..5 {
                out.extend_from_slice(tones.tone(Tone::from_bit(code & (1 << i) != 0)));
            }
            out.extend_from_slice(tones.tone(Tone::Mark));
            out.extend_from_slice(tones.tone(Tone::Mark));
            out.truncate(start + tones.frames_per_character());
        }
        for _ in 0..4 {
            out.extend_from_slice(tones.tone(Tone::Mark));
        }
        out
    }

    // poll `read()` until `want` arrives, collecting everything
    fn read_until(modem: &SoundcardModem, want: &str, timeout: Duration) -> Vec<String> {
        let deadline = Instant::now() + timeout;
        let mut got = Vec::new();
        while Instant::now() < deadline {
            while let Some(text) = modem.read() {
                let done = text == want;
                got.push(text);
                if done {
                    return got;
                }
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("timed out waiting for {:?}; got {:?}", want, got);
    }

    #[test]
    fn test_idle_offline() {
        let sink = SharedSink::default();
        let modem = start(Vec::new(), sink.clone(), false);

        thread::sleep(Duration::from_secs(2));
        assert!(modem.is_alive());
        assert!(!modem.is_online());
        assert_eq!(0, sink.len());
        assert_eq!(None, modem.read());
        assert_eq!(0, modem.link.outgoing_len());

        // shutdown wakes both workers
        let start = Instant::now();
        modem.shutdown();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_receive_character() {
        let sink = SharedSink::default();
        let modem = start(teleprinter(4, &[0x01]), sink.clone(), false);
        modem.write("\x1bA", "test");
        assert!(modem.is_online());

        // the line then goes quiet, which reads as the stop key
        let got = read_until(&modem, "\x1bST", Duration::from_secs(5));
        assert_eq!(vec!["E".to_owned(), "\x1bST".to_owned()], got);
        assert!(modem.is_alive());

        // the connection signal went out first
        assert!(sink.len() >= 16 * FPB);
        modem.shutdown();
    }

    #[test]
    fn test_local_stop() {
        let sink = SharedSink::default();
        let modem = start(teleprinter(20, &[]), sink.clone(), false);

        // the teleprinter asks to go online, and we agree
        let got = read_until(&modem, "\x1bAT", Duration::from_secs(5));
        assert_eq!(vec!["\x1bAT".to_owned()], got);
        modem.write("\x1bA", "test");

        // the operator presses the stop key, and we hang up
        let got = read_until(&modem, "\x1bST", Duration::from_secs(5));
        assert_eq!(vec!["\x1bST".to_owned()], got);
        modem.write("\x1bZ", "test");
        assert!(!modem.is_online());
        assert_eq!(0, modem.link.outgoing_len());
        assert!(!modem.link.is_delay_offline());

        // no three-second grace period: at most one unit in flight
        let before = sink.len();
        thread::sleep(Duration::from_millis(200));
        let after = sink.len();
        assert!(
            after - before <= 16 * FPB,
            "{} samples after stop",
            after - before
        );
        thread::sleep(Duration::from_millis(100));
        assert_eq!(after, sink.len());

        modem.shutdown();
    }

    #[test]
    fn test_worker_failure() {
        let sink = SharedSink {
            fail: true,
            ..Default::default()
        };
        let modem = start(Vec::new(), sink, true);

        let deadline = Instant::now() + Duration::from_secs(2);
        while modem.is_alive() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!modem.is_alive());
        assert!(modem.rx.is_alive());
        modem.shutdown();
    }
}
