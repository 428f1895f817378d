use crate::{CalibrationParams, Channel, Result};

/// Operations provided by the vendor hardware abstraction library.
///
/// The generate layer writes FPGA registers directly and performs no validation of its own;
/// validation of user-supplied parameters is done by the generator handler on top of it.
pub trait Driver {
    fn init(&mut self) -> Result<()>;
    fn release(&mut self) -> Result<()>;
    fn version(&mut self) -> Result<String>;

    fn set_output_disable(&mut self, channel: Channel, disable: bool) -> Result<()>;
    fn set_amplitude(&mut self, channel: Channel, amplitude: f32) -> Result<()>;
    fn set_dc_offset(&mut self, channel: Channel, offset: f32) -> Result<()>;
    fn set_frequency(&mut self, channel: Channel, frequency: f32) -> Result<()>;
    fn set_phase(&mut self, channel: Channel, phase: f32) -> Result<()>;
    /// Write a full sample buffer; only the first `size` samples are played back.
    fn write_data(&mut self, channel: Channel, data: &[f32], size: u32) -> Result<()>;
    fn set_one_time_trigger(&mut self, channel: Channel, one_time: bool) -> Result<()>;
    fn trigger(&mut self, channel: Channel) -> Result<()>;
    /// `source` is the hardware trigger source code, see `TriggerSource::code`.
    fn set_trigger_source(&mut self, channel: Channel, source: u32) -> Result<()>;

    fn calibration_reset(&mut self) -> Result<()>;
    fn calibrate_front_end_offset(&mut self, channel: Channel) -> Result<()>;
    fn calibrate_front_end_scale_hv(&mut self, channel: Channel, reference: f32) -> Result<()>;
    fn calibrate_front_end_scale_lv(&mut self, channel: Channel, reference: f32) -> Result<()>;
    fn calibrate_back_end(&mut self, channel: Channel) -> Result<()>;
    fn calibration_settings(&mut self) -> Result<CalibrationParams>;
    fn write_calibration(&mut self, params: &CalibrationParams) -> Result<()>;
}

impl<D: Driver + ?Sized> Driver for &mut D {
    fn init(&mut self) -> Result<()> { (**self).init() }
    fn release(&mut self) -> Result<()> { (**self).release() }
    fn version(&mut self) -> Result<String> { (**self).version() }

    fn set_output_disable(&mut self, channel: Channel, disable: bool) -> Result<()> {
        (**self).set_output_disable(channel, disable)
    }
    fn set_amplitude(&mut self, channel: Channel, amplitude: f32) -> Result<()> {
        (**self).set_amplitude(channel, amplitude)
    }
    fn set_dc_offset(&mut self, channel: Channel, offset: f32) -> Result<()> {
        (**self).set_dc_offset(channel, offset)
    }
    fn set_frequency(&mut self, channel: Channel, frequency: f32) -> Result<()> {
        (**self).set_frequency(channel, frequency)
    }
    fn set_phase(&mut self, channel: Channel, phase: f32) -> Result<()> {
        (**self).set_phase(channel, phase)
    }
    fn write_data(&mut self, channel: Channel, data: &[f32], size: u32) -> Result<()> {
        (**self).write_data(channel, data, size)
    }
    fn set_one_time_trigger(&mut self, channel: Channel, one_time: bool) -> Result<()> {
        (**self).set_one_time_trigger(channel, one_time)
    }
    fn trigger(&mut self, channel: Channel) -> Result<()> {
        (**self).trigger(channel)
    }
    fn set_trigger_source(&mut self, channel: Channel, source: u32) -> Result<()> {
        (**self).set_trigger_source(channel, source)
    }

    fn calibration_reset(&mut self) -> Result<()> {
        (**self).calibration_reset()
    }
    fn calibrate_front_end_offset(&mut self, channel: Channel) -> Result<()> {
        (**self).calibrate_front_end_offset(channel)
    }
    fn calibrate_front_end_scale_hv(&mut self, channel: Channel, reference: f32) -> Result<()> {
        (**self).calibrate_front_end_scale_hv(channel, reference)
    }
    fn calibrate_front_end_scale_lv(&mut self, channel: Channel, reference: f32) -> Result<()> {
        (**self).calibrate_front_end_scale_lv(channel, reference)
    }
    fn calibrate_back_end(&mut self, channel: Channel) -> Result<()> {
        (**self).calibrate_back_end(channel)
    }
    fn calibration_settings(&mut self) -> Result<CalibrationParams> {
        (**self).calibration_settings()
    }
    fn write_calibration(&mut self, params: &CalibrationParams) -> Result<()> {
        (**self).write_calibration(params)
    }
}

pub mod sim;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod librp;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod imp {
    pub type DriverImpl = super::librp::LibRpDriver;
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub mod imp {
    pub type DriverImpl = super::sim::SimulatedDriver;
}
