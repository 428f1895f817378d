//! Closed-form synthesis of one period of each supported waveform.
//!
//! Every function fills a buffer of `BUFFER_LENGTH` samples normalized to `-1.0..=1.0`; the
//! hardware scales the buffer by the channel amplitude and adds the DC offset during playback.

use std::f64::consts::PI;
use std::path::Path;
use std::str::FromStr;

use crate::{Error, Result};

/// Length of the generator sample buffer in the FPGA.
pub const BUFFER_LENGTH: usize = 16 * 1024;

const N: f64 = BUFFER_LENGTH as f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Triangle,
    RampUp,
    RampDown,
    Dc,
    Pwm,
    Arbitrary,
}

impl Waveform {
    pub const ALL: [Waveform; 8] = [
        Waveform::Sine, Waveform::Square, Waveform::Triangle, Waveform::RampUp,
        Waveform::RampDown, Waveform::Dc, Waveform::Pwm, Waveform::Arbitrary,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Sine      => "sine",
            Self::Square    => "square",
            Self::Triangle  => "triangle",
            Self::RampUp    => "ramp-up",
            Self::RampDown  => "ramp-down",
            Self::Dc        => "dc",
            Self::Pwm       => "pwm",
            Self::Arbitrary => "arbitrary",
        }
    }
}

impl std::fmt::Display for Waveform {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Waveform {
    type Err = Error;

    fn from_str(name: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL.into_iter()
            .find(|waveform| waveform.name().eq_ignore_ascii_case(name))
            .ok_or(Error::InvalidParameter)
    }
}

fn phase(index: usize) -> f64 {
    index as f64 / N
}

pub fn sine(data: &mut [f32; BUFFER_LENGTH]) {
    for (i, sample) in data.iter_mut().enumerate() {
        *sample = (2.0 * PI * phase(i)).sin() as f32;
    }
}

pub fn triangle(data: &mut [f32; BUFFER_LENGTH]) {
    for (i, sample) in data.iter_mut().enumerate() {
        *sample = ((2.0 * PI * phase(i)).sin().asin() / PI * 2.0) as f32;
    }
}

fn ramp_down_at(index: usize) -> f32 {
    (-1.0 * ((PI * phase(index)).cos().acos() / PI - 1.0)) as f32
}

pub fn ramp_down(data: &mut [f32; BUFFER_LENGTH]) {
    for (i, sample) in data.iter_mut().enumerate() {
        *sample = ramp_down_at(i);
    }
}

/// Mirror image of `ramp_down`, shifted by one sample so that the period ends at zero.
pub fn ramp_up(data: &mut [f32; BUFFER_LENGTH]) {
    data[BUFFER_LENGTH - 1] = 0.0;
    for i in 0..BUFFER_LENGTH - 1 {
        data[BUFFER_LENGTH - i - 2] = ramp_down_at(i);
    }
}

pub fn dc(data: &mut [f32; BUFFER_LENGTH]) {
    data.fill(1.0);
}

/// High for `ratio` of the period, centered around the period boundary.
pub fn pwm(ratio: f64, data: &mut [f32; BUFFER_LENGTH]) {
    // number of samples that are high on each side of the period boundary
    let high = (BUFFER_LENGTH as f64 / 2.0 * ratio) as usize;
    for (i, sample) in data.iter_mut().enumerate() {
        *sample = if i < high || i >= BUFFER_LENGTH - high { 1.0 } else { -1.0 };
    }
}

/// Square wave derived from the sign of a sine, with edges whose width follows the output
/// frequency, which keeps the analog frontend from ringing at high frequencies.
///
/// The falling edge is quantized to whole levels while the rising edge is a linear ramp. Both
/// edges sit at fixed points of the period, not at the zero crossings of the sine.
pub fn square(frequency: f64, data: &mut [f32; BUFFER_LENGTH]) {
    // 300 samples per edge at 1 MHz, and never narrower than 30 samples
    const TRANS_MIN: usize = 30;
    const TRANS_PER_MHZ: f64 = 300.0;
    const FALLING_EDGE: f64 = 0.249;
    const RISING_EDGE: f64 = 0.75;

    let trans = match (frequency / 1e6 * TRANS_PER_MHZ) as usize {
        trans if trans <= 10 => TRANS_MIN,
        trans => trans,
    } as f64;

    let falling = (N * FALLING_EDGE, N * FALLING_EDGE + trans);
    let rising = (N * RISING_EDGE, N * RISING_EDGE + trans);
    let within = |x: f64, (x1, x2): (f64, f64)| x > x1 && x <= x2;
    let line = |x: f64, (x1, x2): (f64, f64), y1: f64, y2: f64| {
        let slope = (y2 - y1) / (x2 - x1);
        slope * x + (y1 - slope * x1)
    };

    for (i, sample) in data.iter_mut().enumerate() {
        let x = i as f64;
        // the rising edge takes precedence where both edges overlap
        *sample = if within(x, rising) {
            line(x, rising, -1.0, 1.0) as f32
        } else if within(x, falling) {
            line(x, falling, 1.0, -1.0).round() as i32 as f32
        } else if (2.0 * PI * phase(i)).sin() as f32 > 0.0 {
            1.0
        } else {
            -1.0
        };
    }
}

/// Parse arbitrary waveform samples written one per line. Blank lines and lines starting
/// with `#` are skipped.
pub fn parse_samples(text: &str) -> Result<Vec<f32>> {
    let mut samples = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue
        }
        match line.parse::<f32>() {
            Ok(sample) => samples.push(sample),
            Err(error) =>
                return Err(Error::Other(format!("line {}: {:?}: {}", number + 1, line, error).into())),
        }
    }
    Ok(samples)
}

pub fn load_samples(path: impl AsRef<Path>) -> Result<Vec<f32>> {
    let path = path.as_ref();
    let samples = parse_samples(&std::fs::read_to_string(path)?)?;
    log::debug!("loaded {} samples from {}", samples.len(), path.display());
    Ok(samples)
}

#[cfg(test)]
mod test {
    use super::*;

    macro_rules! assert_close {
        ($left:expr, $right:expr, $epsilon:expr) => {
            let (left, right) = ($left as f64, $right as f64);
            assert!((left - right).abs() < $epsilon, "{} is not close to {}", left, right);
        };
        ($left:expr, $right:expr) => {
            assert_close!($left, $right, 1e-6)
        };
    }

    fn buffer() -> Box<[f32; BUFFER_LENGTH]> {
        Box::new([f32::NAN; BUFFER_LENGTH])
    }

    #[test]
    fn test_sine() {
        let mut data = buffer();
        sine(&mut data);
        assert_close!(data[0], 0.0);
        assert_close!(data[BUFFER_LENGTH / 4], 1.0);
        assert_close!(data[BUFFER_LENGTH / 2], 0.0);
        assert_close!(data[BUFFER_LENGTH * 3 / 4], -1.0);
    }

    #[test]
    fn test_triangle() {
        let mut data = buffer();
        triangle(&mut data);
        assert_close!(data[0], 0.0);
        assert_close!(data[BUFFER_LENGTH / 8], 0.5, 1e-5);
        assert_close!(data[BUFFER_LENGTH / 4], 1.0);
        assert_close!(data[BUFFER_LENGTH / 2], 0.0, 1e-5);
        assert_close!(data[BUFFER_LENGTH * 3 / 4], -1.0);
        assert!(data.iter().all(|&sample| sample >= -1.0 && sample <= 1.0));
    }

    #[test]
    fn test_ramp_down() {
        let mut data = buffer();
        ramp_down(&mut data);
        assert_close!(data[0], 1.0);
        assert_close!(data[BUFFER_LENGTH / 2], 0.5, 1e-5);
        assert_close!(data[BUFFER_LENGTH - 1], 1.0 / BUFFER_LENGTH as f64, 1e-5);
        assert!(data.windows(2).all(|pair| pair[1] <= pair[0]));
    }

    #[test]
    fn test_ramp_up() {
        let mut data = buffer();
        ramp_up(&mut data);
        assert_eq!(data[BUFFER_LENGTH - 1], 0.0);
        assert_close!(data[BUFFER_LENGTH - 2], 1.0);
        assert_close!(data[0], 2.0 / BUFFER_LENGTH as f64, 1e-5);
        assert!(data[..BUFFER_LENGTH - 1].windows(2).all(|pair| pair[1] >= pair[0]));
    }

    #[test]
    fn test_dc() {
        let mut data = buffer();
        dc(&mut data);
        assert!(data.iter().all(|&sample| sample == 1.0));
    }

    #[test]
    fn test_pwm_half() {
        let mut data = buffer();
        pwm(0.5, &mut data);
        assert_eq!(data[0], 1.0);
        assert_eq!(data[4095], 1.0);
        assert_eq!(data[4096], -1.0);
        assert_eq!(data[12287], -1.0);
        assert_eq!(data[12288], 1.0);
        assert_eq!(data[BUFFER_LENGTH - 1], 1.0);
        assert_eq!(data.iter().filter(|&&sample| sample == 1.0).count(), BUFFER_LENGTH / 2);
    }

    #[test]
    fn test_pwm_extremes() {
        let mut data = buffer();
        pwm(0.0, &mut data);
        assert!(data.iter().all(|&sample| sample == -1.0));
        pwm(1.0, &mut data);
        assert!(data.iter().all(|&sample| sample == 1.0));
    }

    #[test]
    fn test_square_slow_edges() {
        // 1 kHz is far below the threshold, so edges are 30 samples wide
        let mut data = buffer();
        square(1e3, &mut data);
        // sign of the sine away from the edges
        assert_eq!(data[0], -1.0);
        assert_eq!(data[1], 1.0);
        assert_eq!(data[4079], 1.0);
        assert_eq!(data[8193], -1.0);
        // falling edge over (4079.616, 4109.616] rounded to 1, 0, -1
        assert_eq!(data[4087], 1.0);
        assert_eq!(data[4088], 0.0);
        assert_eq!(data[4090], 0.0);
        assert_eq!(data[4102], 0.0);
        assert_eq!(data[4103], -1.0);
        assert_eq!(data[4109], -1.0);
        // the sine is still positive after the falling edge
        assert_eq!(data[4110], 1.0);
        assert_eq!(data[6000], 1.0);
        // rising edge over (12288, 12318] is a linear ramp
        assert_eq!(data[12288], -1.0);
        assert_close!(data[12289], -1.0 + 2.0 / 30.0, 1e-5);
        assert_close!(data[12303], 0.0, 1e-5);
        assert_close!(data[12318], 1.0, 1e-5);
        assert_eq!(data[12319], -1.0);
        assert_eq!(data[BUFFER_LENGTH - 1], -1.0);
    }

    #[test]
    fn test_square_fast_edges() {
        // 300 samples per edge at 1 MHz
        let mut data = buffer();
        square(1e6, &mut data);
        assert_eq!(data[4079 + 75], 1.0);
        assert_eq!(data[4079 + 150], 0.0);
        assert_eq!(data[4079 + 300], -1.0);
        assert_eq!(data[4079 + 301], 1.0);
        assert_close!(data[12288 + 150], 0.0, 1e-5);
        assert_close!(data[12288 + 300], 1.0, 1e-5);
        assert!(data.iter().all(|&sample| sample >= -1.0 && sample <= 1.0));
        // the falling edge only ever takes whole levels
        assert!(data[4080..4380].iter().all(|&sample| sample == sample.round()));
    }

    #[test]
    fn test_square_overlapping_edges() {
        // at 62.5 MHz both edges extend past the end of the buffer and the rising one wins
        let mut data = buffer();
        square(62.5e6, &mut data);
        assert_eq!(data[4079], 1.0);
        assert_eq!(data[4080], 1.0);
        assert_eq!(data[12288], 0.0);
        assert!(data[12289] > -1.0 && data[12289] < -0.99);
        assert!(data.iter().all(|&sample| sample >= -1.0 && sample <= 1.0));
    }

    #[test]
    fn test_parse_samples() {
        let text = "# one period\n0\n  0.5\n\n1.0\n# peak above\n-1e-1\n\t\n";
        assert_eq!(parse_samples(text).unwrap(), [0.0, 0.5, 1.0, -0.1]);
        assert!(parse_samples("").unwrap().is_empty());
        assert!(parse_samples("# nothing\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_samples_bad_line() {
        match parse_samples("0.25\n# fine\n0.5x\n") {
            Err(Error::Other(error)) => assert!(error.to_string().starts_with("line 3: \"0.5x\"")),
            result => panic!("unexpected {:?}", result),
        }
        assert!(matches!(parse_samples("1, 2"), Err(Error::Other(_))));
    }

    #[test]
    fn test_load_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.txt");
        std::fs::write(&path, "1\n-1\n").unwrap();
        assert_eq!(load_samples(&path).unwrap(), [1.0, -1.0]);
        assert!(matches!(load_samples(dir.path().join("missing.txt")), Err(Error::Io(_))));
    }

    #[test]
    fn test_waveform_names() {
        for waveform in Waveform::ALL {
            assert_eq!(waveform.name().parse::<Waveform>().unwrap(), waveform);
        }
        assert_eq!("SINE".parse::<Waveform>().unwrap(), Waveform::Sine);
        assert!(matches!("sawtooth".parse::<Waveform>(), Err(Error::InvalidParameter)));
    }
}
