use std::fs::{File, OpenOptions};

use anyhow::Context;
use clap::Parser;
use log::{info, LevelFilter};

use ed1000::RawPcmBackend;

mod app;
mod cli;

use cli::{Args, CliError};

fn main() {
    match ed1000d() {
        Ok(()) => {}
        Err(cli_error) => cli_error.exit(),
    }
}

fn ed1000d() -> Result<(), CliError> {
    // Parse options and start logging
    let args = Args::try_parse()?;
    log_setup(&args);

    // audio streams: FIFOs block here until the other end opens
    let mut backend = file_setup(&args)?;

    // create the modem
    let modem = args
        .modem_builder()
        .build(&mut backend)
        .context("unable to start modem")?;

    // processing: console ⇄ modem until /q or end of input
    let result = app::run(&modem);
    modem.shutdown();
    Ok(result?)
}

fn log_setup(args: &Args) {
    if args.quiet {
        // no logging
        return;
    } else if std::env::var_os("RUST_LOG").is_none() {
        // parameter controls
        let log_filter = match args.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        pretty_env_logger::formatted_builder()
            .filter_module("ed1000", log_filter)
            .filter_module("ed1000d", log_filter)
            .filter_module("murray", log_filter)
            .init();
    } else {
        // environment controls
        pretty_env_logger::init();
    }
}

fn file_setup(args: &Args) -> Result<RawPcmBackend, anyhow::Error> {
    info!("ED1000 modem reading {}", args.rx.display());
    let input = File::open(&args.rx)
        .with_context(|| format!("Unable to open --rx \"{}\"", args.rx.display()))?;

    info!("ED1000 modem writing {}", args.tx.display());
    let output = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&args.tx)
        .with_context(|| format!("Unable to open --tx \"{}\"", args.tx.display()))?;

    Ok(RawPcmBackend::new(input, output))
}
