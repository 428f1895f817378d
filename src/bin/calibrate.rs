use std::path::PathBuf;

use clap::Parser;

use redpitaya::{Device, Error, Procedure, TerminalOperator, DEFAULT_CALIBRATION_FILE};

/// Red Pitaya calibration utility
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Write the coefficients from this file to the instrument instead of calibrating
    #[clap(value_parser)]
    restore: Option<PathBuf>,

    /// File the measured coefficients are saved to
    #[clap(short, long, value_parser, default_value = DEFAULT_CALIBRATION_FILE)]
    output: PathBuf,
}

fn main() -> redpitaya::Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("Library version: {}", Device::open().version()?);
    let result = Device::with(|device| {
        let mut procedure = Procedure::new(TerminalOperator::stdio(), &args.output);
        match &args.restore {
            Some(path) => procedure.restore(device, path)?,
            None => procedure.run(device)?,
        };
        Ok(())
    });
    match result {
        Err(Error::Aborted) => std::process::exit(1),
        result => result,
    }
}
