//! Signal generator parameter handler.
//!
//! Validates user-supplied parameters, keeps the per-channel state that the generate layer of
//! the vendor library does not retain, and resynthesizes the sample buffer whenever a parameter
//! that affects its shape changes.

use crate::{Channel, ChannelMask, Error, GenMode, Result, TriggerSource};
use crate::{ChannelConfiguration, GeneratorConfiguration};
use crate::sys::Driver;
use crate::device::Device;
use crate::waveform::{self, Waveform, BUFFER_LENGTH};

use self::limits::*;

pub mod limits {
    /// Maximum of `|amplitude| + |offset|`, in V.
    pub const LEVEL_MAX: f64 = 1.0;
    pub const FREQUENCY_MIN: f64 = 0.0;
    pub const FREQUENCY_MAX: f64 = 62.5e6;
    pub const PHASE_MIN: f64 = -360.0;
    pub const PHASE_MAX: f64 = 360.0;
    pub const DUTY_CYCLE_MIN: f64 = 0.0;
    pub const DUTY_CYCLE_MAX: f64 = 1.0;
    pub const ARBITRARY_MIN: f32 = -1.0;
    pub const ARBITRARY_MAX: f32 = 1.0;
}

#[derive(Debug, Clone)]
pub(crate) struct ChannelState {
    enabled: bool,
    amplitude: f64,
    offset: f64,
    frequency: f64,
    phase: f64,
    duty_cycle: f64,
    waveform: Waveform,
    mode: GenMode,
    burst_count: u32,
    trigger_source: TriggerSource,
    arbitrary: Box<[f32; BUFFER_LENGTH]>,
    // number of samples of the buffer that are played back
    size: usize,
}

impl Default for ChannelState {
    fn default() -> Self {
        ChannelState {
            enabled: false,
            amplitude: 1.0,
            offset: 0.0,
            frequency: 0.0,
            phase: 0.0,
            duty_cycle: 0.0,
            waveform: Waveform::Sine,
            mode: GenMode::Continuous,
            burst_count: 1,
            trigger_source: TriggerSource::Internal,
            arbitrary: Box::new([0.0; BUFFER_LENGTH]),
            size: BUFFER_LENGTH,
        }
    }
}

fn check_range(value: f64, min: f64, max: f64) -> Result<()> {
    if (min..=max).contains(&value) { Ok(()) } else { Err(Error::OutOfRange) }
}

fn check_amplitude_and_offset(amplitude: f64, offset: f64) -> Result<()> {
    if amplitude.abs() + offset.abs() <= LEVEL_MAX { Ok(()) } else { Err(Error::OutOfRange) }
}

impl<D: Driver> Device<D> {
    fn channel(&self, channel: Channel) -> &ChannelState {
        &self.channels[channel.index()]
    }

    fn channel_mut(&mut self, channel: Channel) -> &mut ChannelState {
        &mut self.channels[channel.index()]
    }

    /// Put both channels into the power-on configuration: disabled, 1 kHz sine at 1 V.
    pub fn set_default_values(&mut self) -> Result<()> {
        self.apply(&GeneratorConfiguration::default())
    }

    /// Program both channels from `config`.
    ///
    /// The whole configuration is validated before anything is written. Outputs are disabled
    /// while being reconfigured and enabled at the end if requested.
    pub fn apply(&mut self, config: &GeneratorConfiguration) -> Result<()> {
        for channel_config in config.channels.iter() {
            check_range(channel_config.frequency, FREQUENCY_MIN, FREQUENCY_MAX)?;
            check_amplitude_and_offset(channel_config.amplitude, channel_config.offset)?;
            check_range(channel_config.phase, PHASE_MIN, PHASE_MAX)?;
            check_range(channel_config.duty_cycle, DUTY_CYCLE_MIN, DUTY_CYCLE_MAX)?;
            if channel_config.burst_count != 1 {
                return Err(Error::Unsupported)
            }
        }

        let channels = Channel::ALL.map(|channel| (channel, config.channel(channel)));
        for (channel, _) in channels {
            self.disable(channel)?;
        }
        for (channel, channel_config) in channels {
            self.set_frequency(channel, channel_config.frequency)?;
        }
        for (channel, channel_config) in channels {
            self.set_waveform(channel, channel_config.waveform)?;
        }
        // checked together above, so the intermediate combinations need no check
        for (channel, channel_config) in channels {
            self.write_amplitude(channel, channel_config.amplitude)?;
        }
        for (channel, channel_config) in channels {
            self.write_offset(channel, channel_config.offset)?;
        }
        for (channel, channel_config) in channels {
            self.set_phase(channel, channel_config.phase)?;
        }
        for (channel, channel_config) in channels {
            self.set_duty_cycle(channel, channel_config.duty_cycle)?;
        }
        for (channel, channel_config) in channels {
            self.set_mode(channel, channel_config.mode)?;
        }
        for (channel, channel_config) in channels {
            self.set_burst_count(channel, channel_config.burst_count)?;
        }
        for (channel, channel_config) in channels {
            self.set_trigger_source(channel, channel_config.trigger_source)?;
        }
        for (channel, channel_config) in channels {
            if channel_config.enabled {
                self.enable(channel)?;
            }
        }
        Ok(())
    }

    /// Snapshot of the current state of both channels.
    pub fn configuration(&self) -> GeneratorConfiguration {
        GeneratorConfiguration {
            channels: Channel::ALL.map(|channel| {
                let state = self.channel(channel);
                ChannelConfiguration {
                    enabled: state.enabled,
                    frequency: state.frequency,
                    waveform: state.waveform,
                    amplitude: state.amplitude,
                    offset: state.offset,
                    phase: state.phase,
                    duty_cycle: state.duty_cycle,
                    mode: state.mode,
                    burst_count: state.burst_count,
                    trigger_source: state.trigger_source,
                }
            })
        }
    }

    pub fn enable(&mut self, channel: Channel) -> Result<()> {
        log::debug!("enable({})", channel);
        self.driver.set_output_disable(channel, false)?;
        self.channel_mut(channel).enabled = true;
        Ok(())
    }

    pub fn disable(&mut self, channel: Channel) -> Result<()> {
        log::debug!("disable({})", channel);
        self.driver.set_output_disable(channel, true)?;
        self.channel_mut(channel).enabled = false;
        Ok(())
    }

    pub fn is_enabled(&self, channel: Channel) -> bool {
        self.channel(channel).enabled
    }

    fn write_amplitude(&mut self, channel: Channel, amplitude: f64) -> Result<()> {
        self.channel_mut(channel).amplitude = amplitude;
        self.driver.set_amplitude(channel, amplitude as f32)
    }

    fn write_offset(&mut self, channel: Channel, offset: f64) -> Result<()> {
        self.channel_mut(channel).offset = offset;
        self.driver.set_dc_offset(channel, offset as f32)
    }

    /// Set the peak amplitude in V; `|amplitude| + |offset|` may not exceed `LEVEL_MAX`.
    pub fn set_amplitude(&mut self, channel: Channel, amplitude: f64) -> Result<()> {
        log::debug!("set_amplitude({}, {})", channel, amplitude);
        check_amplitude_and_offset(amplitude, self.channel(channel).offset)?;
        self.write_amplitude(channel, amplitude)
    }

    pub fn amplitude(&self, channel: Channel) -> f64 {
        self.channel(channel).amplitude
    }

    /// Set the DC offset in V; `|amplitude| + |offset|` may not exceed `LEVEL_MAX`.
    pub fn set_offset(&mut self, channel: Channel, offset: f64) -> Result<()> {
        log::debug!("set_offset({}, {})", channel, offset);
        check_amplitude_and_offset(self.channel(channel).amplitude, offset)?;
        self.write_offset(channel, offset)
    }

    pub fn offset(&self, channel: Channel) -> f64 {
        self.channel(channel).offset
    }

    /// Set amplitude and offset together, which allows moving between two valid combinations
    /// whose intermediate state would exceed `LEVEL_MAX`.
    pub fn set_amplitude_and_offset(&mut self, channel: Channel, amplitude: f64, offset: f64)
            -> Result<()> {
        log::debug!("set_amplitude_and_offset({}, {}, {})", channel, amplitude, offset);
        check_amplitude_and_offset(amplitude, offset)?;
        self.write_amplitude(channel, amplitude)?;
        self.write_offset(channel, offset)
    }

    pub fn set_frequency(&mut self, channel: Channel, frequency: f64) -> Result<()> {
        log::debug!("set_frequency({}, {})", channel, frequency);
        check_range(frequency, FREQUENCY_MIN, FREQUENCY_MAX)?;
        self.channel_mut(channel).frequency = frequency;
        self.driver.set_frequency(channel, frequency as f32)?;
        self.synthesize_signal(channel)
    }

    pub fn frequency(&self, channel: Channel) -> f64 {
        self.channel(channel).frequency
    }

    /// Set the phase in degrees.
    pub fn set_phase(&mut self, channel: Channel, phase: f64) -> Result<()> {
        log::debug!("set_phase({}, {})", channel, phase);
        check_range(phase, PHASE_MIN, PHASE_MAX)?;
        self.channel_mut(channel).phase = phase;
        self.driver.set_phase(channel, phase as f32)
    }

    pub fn phase(&self, channel: Channel) -> f64 {
        self.channel(channel).phase
    }

    pub fn set_waveform(&mut self, channel: Channel, waveform: Waveform) -> Result<()> {
        log::debug!("set_waveform({}, {})", channel, waveform);
        let state = self.channel_mut(channel);
        state.waveform = waveform;
        if waveform != Waveform::Arbitrary {
            state.size = BUFFER_LENGTH;
        }
        self.synthesize_signal(channel)
    }

    pub fn waveform(&self, channel: Channel) -> Waveform {
        self.channel(channel).waveform
    }

    /// Load a user-defined waveform normalized to `ARBITRARY_MIN..=ARBITRARY_MAX` and switch
    /// the channel to it. Shorter buffers are played back with a correspondingly shorter period.
    pub fn set_arb_waveform(&mut self, channel: Channel, data: &[f32]) -> Result<()> {
        log::debug!("set_arb_waveform({}, [..{}])", channel, data.len());
        if data.is_empty() || data.len() > BUFFER_LENGTH {
            return Err(Error::OutOfRange)
        }
        if !data.iter().all(|sample| (ARBITRARY_MIN..=ARBITRARY_MAX).contains(sample)) {
            return Err(Error::NotNormalized)
        }
        let state = self.channel_mut(channel);
        let (head, tail) = state.arbitrary.split_at_mut(data.len());
        head.copy_from_slice(data);
        tail.fill(0.0);
        state.waveform = Waveform::Arbitrary;
        state.size = data.len();
        self.synthesize_signal(channel)
    }

    /// Samples of the user-defined waveform, as many as are played back.
    pub fn arb_waveform(&self, channel: Channel) -> &[f32] {
        let state = self.channel(channel);
        &state.arbitrary[..state.size]
    }

    /// Set the fraction of the period the PWM waveform is high.
    pub fn set_duty_cycle(&mut self, channel: Channel, ratio: f64) -> Result<()> {
        log::debug!("set_duty_cycle({}, {})", channel, ratio);
        check_range(ratio, DUTY_CYCLE_MIN, DUTY_CYCLE_MAX)?;
        self.channel_mut(channel).duty_cycle = ratio;
        self.synthesize_signal(channel)
    }

    pub fn duty_cycle(&self, channel: Channel) -> f64 {
        self.channel(channel).duty_cycle
    }

    pub fn set_mode(&mut self, channel: Channel, mode: GenMode) -> Result<()> {
        log::debug!("set_mode({}, {:?})", channel, mode);
        match mode {
            GenMode::Continuous =>
                self.driver.set_one_time_trigger(channel, false)?,
            GenMode::Burst =>
                self.driver.trigger(channel)?,
            // streaming is not implemented by the generate layer
            GenMode::Stream => (),
        }
        self.channel_mut(channel).mode = mode;
        Ok(())
    }

    pub fn mode(&self, channel: Channel) -> GenMode {
        self.channel(channel).mode
    }

    /// Only single-period bursts are supported by the hardware.
    pub fn set_burst_count(&mut self, channel: Channel, count: u32) -> Result<()> {
        log::debug!("set_burst_count({}, {})", channel, count);
        if count != 1 {
            return Err(Error::Unsupported)
        }
        self.channel_mut(channel).burst_count = count;
        Ok(())
    }

    pub fn burst_count(&self, channel: Channel) -> u32 {
        self.channel(channel).burst_count
    }

    pub fn set_trigger_source(&mut self, channel: Channel, source: TriggerSource) -> Result<()> {
        log::debug!("set_trigger_source({}, {:?})", channel, source);
        self.driver.set_trigger_source(channel, source.code())?;
        self.channel_mut(channel).trigger_source = source;
        Ok(())
    }

    pub fn trigger_source(&self, channel: Channel) -> TriggerSource {
        self.channel(channel).trigger_source
    }

    /// Trigger the channels in `mask` (1 for CH1, 2 for CH2, 3 for both).
    pub fn trigger(&mut self, mask: u32) -> Result<()> {
        log::debug!("trigger({:#b})", mask);
        let mask = match ChannelMask::from_bits(mask) {
            Some(mask) if !mask.is_empty() => mask,
            _ => return Err(Error::OutOfRange)
        };
        for channel in mask.channels() {
            self.driver.trigger(channel)?;
        }
        Ok(())
    }

    /// Fill a sample buffer according to the current waveform parameters of `channel` and
    /// write it to the generator.
    pub fn synthesize_signal(&mut self, channel: Channel) -> Result<()> {
        let (data, size) = self.render(channel);
        log::trace!("synthesize_signal({}) = {} [..{}]", channel, self.waveform(channel), size);
        self.driver.write_data(channel, &data[..], size as u32)
    }

    /// Samples of one period of the signal `channel` is currently set up to generate.
    pub fn samples(&self, channel: Channel) -> Vec<f32> {
        let (data, size) = self.render(channel);
        data[..size].to_vec()
    }

    fn render(&self, channel: Channel) -> (Box<[f32; BUFFER_LENGTH]>, usize) {
        let state = self.channel(channel);
        let mut data = Box::new([0.0f32; BUFFER_LENGTH]);
        match state.waveform {
            Waveform::Sine      => waveform::sine(&mut data),
            Waveform::Triangle  => waveform::triangle(&mut data),
            Waveform::Square    => waveform::square(state.frequency, &mut data),
            Waveform::RampUp    => waveform::ramp_up(&mut data),
            Waveform::RampDown  => waveform::ramp_down(&mut data),
            Waveform::Dc        => waveform::dc(&mut data),
            Waveform::Pwm       => waveform::pwm(state.duty_cycle, &mut data),
            Waveform::Arbitrary => data.copy_from_slice(&state.arbitrary[..]),
        }
        (data, state.size)
    }
}
