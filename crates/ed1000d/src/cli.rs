use std::fmt::Display;
use std::path::PathBuf;

use clap::{error::ErrorKind, CommandFactory, Parser};
use ed1000::{DebugLog, ModemBuilder};

const USAGE_SHORT: &str = r#"
This program runs an ED1000 teleprinter over raw PCM audio streams in signed 16-bit (i16) format, mono, at 48000 Hz. Type text to send it; received text is printed.

See --help for more details.
"#;

const USAGE_LONG: &str = r#"
This program runs an ED1000 teleprinter over raw PCM audio streams in signed 16-bit (i16) format, mono, at 48000 Hz. Type text to send it; received text is printed.

The --rx and --tx streams may be files or named pipes. With PulseAudio or PipeWire:

    mkfifo rx.fifo tx.fifo
    parec --channels 1 --format s16ne --rate 48000 > rx.fifo &
    pacat --channels 1 --format s16ne --rate 48000 < tx.fifo &
    ed1000d --rx rx.fifo --tx tx.fifo

Console commands, each on a line by itself:

  /a     connect (go online)
  /wb    ready to dial (go online)
  /z     disconnect (go offline)
  /wru   ask the teleprinter for its answerback
  /q     quit

Any other line is sent to the teleprinter, followed by a carriage return and line feed. When the teleprinter goes online or offline by itself, this program follows.
"#;

const ADVANCED: &str = "Advanced Modem Options";

/// Top-level program arguments
#[derive(Parser, Clone, Debug)]
#[command(version)]
#[command(about, long_about = None)]
#[command(after_help = USAGE_SHORT, after_long_help = USAGE_LONG)]
#[command(max_term_width = 100)]
pub struct Args {
    /// Verbosity level (-vvv for more)
    #[arg(short, long, default_value_t = 0, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable logging
    #[arg(short, long)]
    pub quiet: bool,

    /// Receive audio: file or pipe to read
    #[arg(long, value_name = "PATH")]
    pub rx: PathBuf,

    /// Transmit audio: file or pipe to write
    #[arg(long, value_name = "PATH")]
    pub tx: PathBuf,

    /// Audio device index
    ///
    /// Raw PCM streams have no device index; the modem refuses to
    /// start if one is given.
    #[arg(long, value_name = "INDEX")]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub device: Option<usize>,

    /// Baud rate (Bd)
    #[arg(long, default_value_t = 50)]
    pub baud: u32,

    /// Transmit space frequency (Hz)
    #[arg(long, default_value_t = 500.0)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub send_f0: f32,

    /// Transmit mark frequency (Hz)
    #[arg(long, default_value_t = 700.0)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub send_f1: f32,

    /// Receive space frequency (Hz)
    #[arg(long, default_value_t = 2250.0)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub recv_f0: f32,

    /// Receive mark frequency (Hz)
    #[arg(long, default_value_t = 3150.0)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub recv_f1: f32,

    /// Receive squelch threshold (sum of band energies)
    #[arg(long, default_value_t = 100)]
    #[arg(help_heading = ADVANCED)]
    pub squelch: u32,

    /// Send space tone while offline
    #[arg(long)]
    #[arg(help_heading = ADVANCED)]
    pub zcarrier: bool,

    /// Append receive band energies to a file
    ///
    /// One line "E0,E1" per quarter bit, for choosing a --squelch.
    #[arg(long, value_name = "PATH")]
    #[arg(num_args = 0..=1, default_missing_value = DebugLog::DEFAULT_PATH)]
    #[arg(help_heading = ADVANCED)]
    pub recv_debug: Option<PathBuf>,
}

impl Args {
    /// Modem configuration
    pub fn modem_builder(&self) -> ModemBuilder {
        let mut builder = ModemBuilder::new();
        builder
            .with_device(self.device)
            .with_baud_rate(self.baud)
            .with_send_tones(self.send_f0, self.send_f1)
            .with_recv_tones(self.recv_f0, self.recv_f1)
            .with_squelch(self.squelch)
            .with_zero_carrier(self.zcarrier)
            .with_recv_debug(self.recv_debug.as_ref());
        builder
    }
}

/// A program-level error with exit code
#[derive(Debug)]
pub struct CliError {
    error: anyhow::Error,
    exit_code: i32,
}

impl CliError {
    /// Create new error with a custom exit code
    pub fn new(error: anyhow::Error, code: i32) -> CliError {
        CliError {
            error,
            exit_code: code,
        }
    }

    /// Print this error to the terminal
    ///
    /// Errors from clap are printed verbatim. Other types of errors
    /// are printed indirectly via clap's fancy formatter.
    pub fn print(&self) -> std::io::Result<()> {
        if let Some(e) = self.error.downcast_ref::<clap::Error>() {
            e.print()
        } else {
            Args::command()
                .error(ErrorKind::Format, self.to_string())
                .print()
        }
    }

    /// Print this error to the terminal and exit
    pub fn exit(&self) -> ! {
        drop(self.print());
        std::process::exit(self.exit_code);
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.error)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> CliError {
        CliError::new(err, 1)
    }
}

impl From<clap::Error> for CliError {
    fn from(err: clap::Error) -> CliError {
        let code = if err.use_stderr() { 1 } else { 0 };
        CliError::new(err.into(), code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clap() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["ed1000d", "--rx", "in.raw", "--tx", "out.raw"]).unwrap();
        assert_eq!(None, args.recv_debug);
        assert_eq!(ModemBuilder::new(), args.modem_builder());
    }

    #[test]
    fn test_modem_options() {
        let args = Args::try_parse_from([
            "ed1000d",
            "--rx",
            "in.raw",
            "--tx",
            "out.raw",
            "--baud",
            "75",
            "--recv-f0",
            "1300",
            "--recv-f1",
            "2100",
            "--squelch",
            "250",
            "--zcarrier",
            "--recv-debug",
        ])
        .unwrap();

        let builder = args.modem_builder();
        assert_eq!(75, builder.baud_rate());
        assert_eq!((500.0, 700.0), builder.send_tones());
        assert_eq!((1300.0, 2100.0), builder.recv_tones());
        assert_eq!(250, builder.squelch());
        assert!(builder.zero_carrier());
        assert_eq!(
            Some(std::path::Path::new("recv_debug.log")),
            builder.recv_debug()
        );
    }

    #[test]
    fn test_device() {
        let args = Args::try_parse_from([
            "ed1000d",
            "--rx",
            "in.raw",
            "--tx",
            "out.raw",
            "--device",
            "2",
        ])
        .unwrap();
        assert_eq!(Some(2), args.device);
        assert_eq!(Some(2), args.modem_builder().device());

        // raw PCM streams refuse a device index
        let mut backend = ed1000::RawPcmBackend::new(std::io::empty(), std::io::sink());
        let err = args.modem_builder().build(&mut backend).unwrap_err();
        assert!(matches!(
            err,
            ed1000::ConfigError::Device {
                device: Some(2),
                ..
            }
        ));
    }

    #[test]
    fn test_streams_required() {
        let err = Args::try_parse_from(["ed1000d", "--rx", "in.raw"]).unwrap_err();
        assert_eq!(ErrorKind::MissingRequiredArgument, err.kind());
    }
}
