//! Audio streams
//!
//! The modem exchanges mono, signed 16-bit PCM with the host
//! through two blocking stream traits, [`AudioSource`] and
//! [`AudioSink`]. An [`AudioBackend`] opens them.
//!
//! [`RawPcmBackend`] is the simplest possible backend. It wraps
//! any [`Read`] and [`Write`], which may be files, pipes, or the
//! FIFOs of a sound server:
//!
//! ```txt
//! parec --channels 1 --format s16ne --rate 48000 > rx.fifo
//! pacat --channels 1 --format s16ne --rate 48000 < tx.fifo
//! ```
//!
//! Samples are native-endian.

use std::fmt;
use std::io::{self, BufReader, BufWriter, Read, Write};

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{AudioError, ConfigError};

/// Blocking source of PCM samples
pub trait AudioSource: Send {
    /// Read up to `buf.len()` samples
    ///
    /// Blocks until `buf` is full or the stream ends. Returns the
    /// number of samples read, which is less than `buf.len()`
    /// only at the end of the stream. `Ok(0)` means the stream
    /// has ended.
    fn read(&mut self, buf: &mut [i16]) -> Result<usize, AudioError>;
}

/// Blocking sink for PCM samples
pub trait AudioSink: Send {
    /// Write all of `samples`
    ///
    /// Blocks until the stream has accepted every sample.
    fn write(&mut self, samples: &[i16]) -> Result<(), AudioError>;
}

/// Opens audio streams
///
/// Streams are mono at the requested sampling rate. `device`
/// selects a host device by index; `None` is the default device.
pub trait AudioBackend {
    /// Open the capture stream
    ///
    /// The modem will read `block` samples at a time.
    fn open_source(
        &mut self,
        device: Option<usize>,
        rate: u32,
        block: usize,
    ) -> Result<Box<dyn AudioSource>, ConfigError>;

    /// Open the playback stream
    fn open_sink(
        &mut self,
        device: Option<usize>,
        rate: u32,
    ) -> Result<Box<dyn AudioSink>, ConfigError>;
}

/// PCM source reading raw samples from a byte stream
pub struct RawPcmSource<R> {
    input: BufReader<R>,
}

impl<R> RawPcmSource<R>
where
    R: Read,
{
    /// Read native-endian `i16` samples from `input`
    pub fn new(input: R) -> Self {
        Self {
            input: BufReader::new(input),
        }
    }
}

impl<R> AudioSource for RawPcmSource<R>
where
    R: Read + Send,
{
    fn read(&mut self, buf: &mut [i16]) -> Result<usize, AudioError> {
        for (i, sa) in buf.iter_mut().enumerate() {
            match self.input.read_i16::<NativeEndian>() {
                Ok(val) => *sa = val,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(i),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(buf.len())
    }
}

impl<R> fmt::Debug for RawPcmSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawPcmSource").finish_non_exhaustive()
    }
}

/// PCM sink writing raw samples to a byte stream
pub struct RawPcmSink<W>
where
    W: Write,
{
    output: BufWriter<W>,
}

impl<W> RawPcmSink<W>
where
    W: Write,
{
    /// Write native-endian `i16` samples to `output`
    pub fn new(output: W) -> Self {
        Self {
            output: BufWriter::new(output),
        }
    }
}

impl<W> AudioSink for RawPcmSink<W>
where
    W: Write + Send,
{
    fn write(&mut self, samples: &[i16]) -> Result<(), AudioError> {
        for &sa in samples {
            self.output.write_i16::<NativeEndian>(sa)?;
        }
        self.output.flush()?;
        Ok(())
    }
}

impl<W> fmt::Debug for RawPcmSink<W>
where
    W: Write,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawPcmSink").finish_non_exhaustive()
    }
}

/// Backend over a pair of byte streams
///
/// Each stream can be opened once. Raw streams have no device
/// index, so opening with `Some(device)` is a configuration
/// error.
pub struct RawPcmBackend {
    input: Option<Box<dyn Read + Send>>,
    output: Option<Box<dyn Write + Send>>,
}

impl RawPcmBackend {
    /// Backend which reads from `input` and writes to `output`
    pub fn new<R, W>(input: R, output: W) -> Self
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        Self {
            input: Some(Box::new(input)),
            output: Some(Box::new(output)),
        }
    }
}

impl AudioBackend for RawPcmBackend {
    fn open_source(
        &mut self,
        device: Option<usize>,
        _rate: u32,
        _block: usize,
    ) -> Result<Box<dyn AudioSource>, ConfigError> {
        check_no_device(device)?;
        let input = self.input.take().ok_or_else(|| ConfigError::Device {
            device,
            reason: "input stream is already open".to_owned(),
        })?;
        Ok(Box::new(RawPcmSource::new(input)))
    }

    fn open_sink(
        &mut self,
        device: Option<usize>,
        _rate: u32,
    ) -> Result<Box<dyn AudioSink>, ConfigError> {
        check_no_device(device)?;
        let output = self.output.take().ok_or_else(|| ConfigError::Device {
            device,
            reason: "output stream is already open".to_owned(),
        })?;
        Ok(Box::new(RawPcmSink::new(output)))
    }
}

impl fmt::Debug for RawPcmBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawPcmBackend")
            .field("input_open", &self.input.is_none())
            .field("output_open", &self.output.is_none())
            .finish()
    }
}

fn check_no_device(device: Option<usize>) -> Result<(), ConfigError> {
    match device {
        None => Ok(()),
        Some(_) => Err(ConfigError::Device {
            device,
            reason: "raw PCM streams have no device index".to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    // Write half of a shared buffer
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_raw_source() {
        let mut bytes = Vec::new();
        for sa in [1i16, -2, 32000, -32768, 7] {
            bytes.write_i16::<NativeEndian>(sa).unwrap();
        }
        // a trailing half sample is discarded
        bytes.push(0xff);

        let mut src = RawPcmSource::new(Cursor::new(bytes));
        let mut buf = [0i16; 3];
        assert_eq!(3, src.read(&mut buf).unwrap());
        assert_eq!([1, -2, 32000], buf);

        // short read at the end of the stream
        assert_eq!(2, src.read(&mut buf).unwrap());
        assert_eq!([-32768, 7], buf[..2]);
        assert_eq!(0, src.read(&mut buf).unwrap());
    }

    #[test]
    fn test_raw_sink() {
        let out = SharedBuf::default();
        let mut sink = RawPcmSink::new(out.clone());
        sink.write(&[0x0102, -1]).unwrap();

        // flushed on every write
        let bytes = out.0.lock().unwrap().clone();
        let mut rdr = Cursor::new(bytes);
        assert_eq!(0x0102, rdr.read_i16::<NativeEndian>().unwrap());
        assert_eq!(-1, rdr.read_i16::<NativeEndian>().unwrap());
    }

    #[test]
    fn test_raw_backend() {
        let out = SharedBuf::default();
        let mut backend = RawPcmBackend::new(Cursor::new(vec![0u8; 4]), out.clone());

        assert!(matches!(
            backend.open_source(Some(2), 48000, 240),
            Err(ConfigError::Device {
                device: Some(2),
                ..
            })
        ));

        let mut src = backend.open_source(None, 48000, 240).unwrap();
        let mut buf = [1i16; 4];
        assert_eq!(2, src.read(&mut buf).unwrap());
        assert!(backend.open_source(None, 48000, 240).is_err());

        let mut sink = backend.open_sink(None, 48000).unwrap();
        sink.write(&[5]).unwrap();
        assert_eq!(2, out.0.lock().unwrap().len());
        assert!(backend.open_sink(None, 48000).is_err());
    }
}
