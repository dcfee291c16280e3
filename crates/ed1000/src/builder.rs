use std::path::{Path, PathBuf};

use crate::audio::AudioBackend;
use crate::demod::{DebugLog, EnergyDemod, BANDPASS_RATIO};
use crate::error::ConfigError;
use crate::modem::SoundcardModem;
use crate::receiver::Receiver;
use crate::transmit::Transmitter;
use crate::waveform::{frames_per_slice, ToneTable, SAMPLE_RATE};

/// Builds an ED1000 sound-card modem
///
/// The builder comes with the usual ED1000 settings: 50 Bd,
/// transmitting on 500/700 Hz and receiving on 2250/3150 Hz.
/// These suit a teleprinter wired to the sound card through a
/// standard ED1000 line adapter. All you need to provide is an
/// [`AudioBackend`].
///
/// ```
/// use ed1000::{ModemBuilder, RawPcmBackend};
///
/// let mut builder = ModemBuilder::new();
/// builder.with_baud_rate(50).with_squelch(150);
///
/// let mut backend = RawPcmBackend::new(std::io::empty(), std::io::sink());
/// let modem = builder.build(&mut backend).expect("bad configuration");
/// assert!(!modem.is_online());
/// modem.shutdown();
/// ```
///
/// Settings are checked by [`build()`](ModemBuilder::build),
/// not by the setters.
#[derive(Clone, Debug, PartialEq)]
pub struct ModemBuilder {
    device: Option<usize>,
    baud_rate: u32,
    send_space: f32,
    send_mark: f32,
    recv_space: f32,
    recv_mark: f32,
    squelch: u32,
    zero_carrier: bool,
    recv_debug: Option<PathBuf>,
}

impl ModemBuilder {
    /// New modem with ED1000 defaults
    pub fn new() -> Self {
        Self {
            device: None,
            baud_rate: 50,
            send_space: 500.0,
            send_mark: 700.0,
            recv_space: 2250.0,
            recv_mark: 3150.0,
            squelch: 100,
            zero_carrier: false,
            recv_debug: None,
        }
    }

    /// Build and start the modem
    ///
    /// Opens both audio streams from `backend` and starts the
    /// transmit and receive workers. The modem starts offline.
    /// Invalid settings, and streams which the backend cannot
    /// open, are reported as a [`ConfigError`].
    pub fn build(&self, backend: &mut dyn AudioBackend) -> Result<SoundcardModem, ConfigError> {
        self.validate()?;

        let block = frames_per_slice(SAMPLE_RATE, self.baud_rate);
        let mut demod =
            EnergyDemod::new(SAMPLE_RATE, self.recv_space, self.recv_mark, self.squelch);
        if let Some(path) = &self.recv_debug {
            let log = DebugLog::open(path)
                .map_err(|e| ConfigError::DebugLog(format!("{}: {}", path.display(), e)))?;
            demod = demod.with_debug_log(log);
        }
        let receiver = Receiver::new(Box::new(demod), Box::new(murray::Decoder::new()), block);

        let tones = ToneTable::new(SAMPLE_RATE, self.baud_rate, self.send_space, self.send_mark);
        let transmitter =
            Transmitter::new(tones, Box::new(murray::Encoder::new()), self.zero_carrier);

        let source = backend.open_source(self.device, SAMPLE_RATE, block)?;
        let sink = backend.open_sink(self.device, SAMPLE_RATE)?;

        SoundcardModem::start(transmitter, receiver, source, sink)
    }

    /// Check all settings
    ///
    /// The baud rate must be positive and slow enough that a
    /// quarter bit is at least one sample. Every tone, together
    /// with the upper edge of its receive filter, must lie below
    /// the Nyquist frequency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baud_rate == 0 || frames_per_slice(SAMPLE_RATE, self.baud_rate) == 0 {
            return Err(ConfigError::BaudRate(self.baud_rate));
        }

        for (which, freq) in [
            ("send space", self.send_space),
            ("send mark", self.send_mark),
            ("receive space", self.recv_space),
            ("receive mark", self.recv_mark),
        ] {
            let nyquist = SAMPLE_RATE as f64 / 2.0;
            if !freq.is_finite() || freq <= 0.0 || freq as f64 * BANDPASS_RATIO >= nyquist {
                return Err(ConfigError::Frequency { which, freq });
            }
        }

        Ok(())
    }

    /// Audio device index
    ///
    /// Selects a host device by index. `None`, the default, is
    /// the backend's default device.
    pub fn with_device(&mut self, device: Option<usize>) -> &mut Self {
        self.device = device;
        self
    }

    /// Baud rate (Bd)
    ///
    /// ED1000 teleprinters run at 50 Bd. Some machines also
    /// support 75 Bd.
    pub fn with_baud_rate(&mut self, baud: u32) -> &mut Self {
        self.baud_rate = baud;
        self
    }

    /// Transmit tones (Hz)
    ///
    /// Frequencies for space (logical 0) and mark (logical 1)
    /// sent to the teleprinter.
    pub fn with_send_tones(&mut self, space: f32, mark: f32) -> &mut Self {
        self.send_space = space;
        self.send_mark = mark;
        self
    }

    /// Receive tones (Hz)
    ///
    /// Frequencies for space (logical 0) and mark (logical 1)
    /// sent by the teleprinter.
    pub fn with_recv_tones(&mut self, space: f32, mark: f32) -> &mut Self {
        self.recv_space = space;
        self.recv_mark = mark;
        self
    }

    /// Squelch threshold
    ///
    /// If the summed band energies of a quarter bit are below
    /// `squelch`, the line is considered silent. Energies are in
    /// `i16` sample units; use the receive debug log to pick a
    /// value for your adapter.
    pub fn with_squelch(&mut self, squelch: u32) -> &mut Self {
        self.squelch = squelch;
        self
    }

    /// Send space tone while offline
    ///
    /// Some line adapters need a carrier at all times. When
    /// enabled, the modem sends space tone instead of silence
    /// while offline.
    pub fn with_zero_carrier(&mut self, zero_carrier: bool) -> &mut Self {
        self.zero_carrier = zero_carrier;
        self
    }

    /// Log receive band energies to a file
    ///
    /// Every quarter bit, the line `E0,E1` is appended to the
    /// file at `path`. `None`, the default, disables the log.
    pub fn with_recv_debug<P>(&mut self, path: Option<P>) -> &mut Self
    where
        P: AsRef<Path>,
    {
        self.recv_debug = path.map(|p| p.as_ref().to_owned());
        self
    }

    /// Audio device index
    pub fn device(&self) -> Option<usize> {
        self.device
    }

    /// Baud rate (Bd)
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Transmit (space, mark) tones (Hz)
    pub fn send_tones(&self) -> (f32, f32) {
        (self.send_space, self.send_mark)
    }

    /// Receive (space, mark) tones (Hz)
    pub fn recv_tones(&self) -> (f32, f32) {
        (self.recv_space, self.recv_mark)
    }

    /// Squelch threshold
    pub fn squelch(&self) -> u32 {
        self.squelch
    }

    /// True if space tone is sent while offline
    pub fn zero_carrier(&self) -> bool {
        self.zero_carrier
    }

    /// Receive debug log path
    pub fn recv_debug(&self) -> Option<&Path> {
        self.recv_debug.as_deref()
    }
}

impl std::default::Default for ModemBuilder {
    fn default() -> Self {
        Self::new()
    }
}
