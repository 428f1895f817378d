//! Configuration of the signal generator in terms of physical qualities.

use bitflags::bitflags;

use crate::Waveform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Ch1,
    Ch2,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Ch1, Channel::Ch2];

    pub fn index(self) -> usize {
        match self {
            Self::Ch1 => 0,
            Self::Ch2 => 1,
        }
    }

    /// Channel number as printed on the board, starting at 1.
    pub fn number(self) -> usize {
        self.index() + 1
    }

    pub(crate) fn mask(self) -> ChannelMask {
        match self {
            Self::Ch1 => ChannelMask::CH1,
            Self::Ch2 => ChannelMask::CH2,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "CH{}", self.number())
    }
}

bitflags! {
    /// Set of output channels triggered at once.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ChannelMask: u32 {
        const CH1 = 1<<0;
        const CH2 = 1<<1;
    }
}

impl ChannelMask {
    pub fn channels(self) -> impl Iterator<Item = Channel> {
        Channel::ALL.into_iter().filter(move |channel| self.contains(channel.mask()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenMode {
    #[default]
    Continuous,
    Burst,
    Stream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerSource {
    #[default]
    Internal,
    External,
}

impl TriggerSource {
    pub(crate) fn code(self) -> u32 {
        match self {
            Self::Internal => 1,
            Self::External => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfiguration {
    pub enabled: bool,
    /// Signal frequency in Hz.
    pub frequency: f64,
    pub waveform: Waveform,
    /// Peak amplitude in V.
    pub amplitude: f64,
    /// DC offset in V.
    pub offset: f64,
    /// Phase in degrees.
    pub phase: f64,
    /// Fraction of the period the PWM output is high.
    pub duty_cycle: f64,
    pub mode: GenMode,
    pub burst_count: u32,
    pub trigger_source: TriggerSource,
}

impl Default for ChannelConfiguration {
    fn default() -> Self {
        Self {
            enabled: false,
            frequency: 1000.0,
            waveform: Waveform::Sine,
            amplitude: 1.0,
            offset: 0.0,
            phase: 0.0,
            duty_cycle: 0.5,
            mode: Default::default(),
            burst_count: 1,
            trigger_source: Default::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeneratorConfiguration {
    pub channels: [ChannelConfiguration; 2]
}

impl GeneratorConfiguration {
    pub fn channel(&self, channel: Channel) -> &ChannelConfiguration {
        &self.channels[channel.index()]
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut ChannelConfiguration {
        &mut self.channels[channel.index()]
    }
}
