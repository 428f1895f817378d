use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;

use redpitaya::{Channel, Device, TriggerSource, Waveform};

/// Red Pitaya signal generator
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Output channel
    #[clap(short, long, value_parser = clap::value_parser!(u8).range(1..=2), default_value_t = 1)]
    channel: u8,

    /// Signal shape
    #[clap(short, long, value_parser, default_value_t = Waveform::Sine)]
    waveform: Waveform,

    /// Signal frequency in Hz
    #[clap(short, long, value_parser, default_value_t = 1000.0)]
    frequency: f64,

    /// Peak amplitude in V
    #[clap(short, long, value_parser, default_value_t = 1.0)]
    amplitude: f64,

    /// DC offset in V
    #[clap(short, long, value_parser, default_value_t = 0.0, allow_hyphen_values = true)]
    offset: f64,

    /// Phase in degrees
    #[clap(short, long, value_parser, default_value_t = 0.0, allow_hyphen_values = true)]
    phase: f64,

    /// PWM duty cycle
    #[clap(short, long, value_parser, default_value_t = 0.5)]
    duty_cycle: f64,

    /// Load the arbitrary waveform from a file with one sample per line
    #[clap(long, value_parser)]
    arbitrary: Option<PathBuf>,

    /// Wait for the external trigger input instead of starting immediately
    #[clap(long)]
    external_trigger: bool,

    /// Configure the channel without enabling the output
    #[clap(long)]
    disabled: bool,

    /// Write one period of the synthesized signal to a file, one sample per line
    #[clap(long, value_parser)]
    dump: Option<PathBuf>,
}

fn write_samples(path: &Path, samples: &[f32]) -> redpitaya::Result<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    for sample in samples {
        writeln!(file, "{}", sample)?;
    }
    file.flush()?;
    Ok(())
}

fn main() -> redpitaya::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let channel = Channel::ALL[args.channel as usize - 1];

    Device::with(|device| {
        device.set_default_values()?;

        let mut config = device.configuration();
        let channel_config = config.channel_mut(channel);
        channel_config.enabled = !args.disabled;
        channel_config.waveform = args.waveform;
        channel_config.frequency = args.frequency;
        channel_config.amplitude = args.amplitude;
        channel_config.offset = args.offset;
        channel_config.phase = args.phase;
        channel_config.duty_cycle = args.duty_cycle;
        if args.external_trigger {
            channel_config.trigger_source = TriggerSource::External;
        }

        if let Some(path) = &args.arbitrary {
            let samples = redpitaya::load_samples(path)?;
            device.set_arb_waveform(channel, &samples)?;
            config.channel_mut(channel).waveform = Waveform::Arbitrary;
        }
        device.apply(&config)?;

        println!("{}: {} at {} Hz, {} V amplitude, {} V offset, {} deg phase ({})",
            channel, device.waveform(channel), device.frequency(channel),
            device.amplitude(channel), device.offset(channel), device.phase(channel),
            if device.is_enabled(channel) { "enabled" } else { "disabled" });

        if let Some(path) = &args.dump {
            write_samples(path, &device.samples(channel))?;
        }
        Ok(())
    })
}
