//! Simulated instrument, used when the crate is built without the `hardware` feature.
//!
//! Every call is logged and recorded so that the sequence of operations a real instrument
//! would see can be inspected. Calibration coefficients are derived from a simulated analog
//! frontend with configurable gain errors and offsets.

use crate::{BUFFER_LENGTH, CalibrationParams, Channel, Error, Result};
use crate::full_scale_from_volts;

const VERSION: &str = "simulated";

/// Nominal full scale voltages of the frontend with HV and LV jumpers, and of the backend.
const FULL_SCALE_HV: f32 = 20.0;
const FULL_SCALE_LV: f32 = 1.0;
const FULL_SCALE_BACK_END: f32 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Init,
    Release,
    SetOutputDisable { channel: Channel, disable: bool },
    SetAmplitude { channel: Channel, amplitude: f32 },
    SetDcOffset { channel: Channel, offset: f32 },
    SetFrequency { channel: Channel, frequency: f32 },
    SetPhase { channel: Channel, phase: f32 },
    WriteData { channel: Channel, size: u32 },
    SetOneTimeTrigger { channel: Channel, one_time: bool },
    Trigger { channel: Channel },
    SetTriggerSource { channel: Channel, source: u32 },
    CalibrationReset,
    CalibrateFrontEndOffset { channel: Channel },
    CalibrateFrontEndScaleHv { channel: Channel, reference: f32 },
    CalibrateFrontEndScaleLv { channel: Channel, reference: f32 },
    CalibrateBackEnd { channel: Channel },
    WriteCalibration,
}

/// Imperfections of the simulated analog paths, per channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedFrontEnd {
    pub gain_hv: [f32; 2],
    pub gain_lv: [f32; 2],
    pub dc_offset: [i32; 2],
    pub back_end_gain: [f32; 2],
    pub back_end_dc_offset: [i32; 2],
}

impl Default for SimulatedFrontEnd {
    fn default() -> Self {
        SimulatedFrontEnd {
            gain_hv: [1.0; 2],
            gain_lv: [1.0; 2],
            dc_offset: [0; 2],
            back_end_gain: [1.0; 2],
            back_end_dc_offset: [0; 2],
        }
    }
}

/// State of one generator output as programmed into the simulated FPGA.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedOutput {
    pub disabled: bool,
    pub amplitude: f32,
    pub offset: f32,
    pub frequency: f32,
    pub phase: f32,
    pub data: Vec<f32>,
    pub size: u32,
    pub one_time_trigger: bool,
    pub trigger_source: u32,
    pub trigger_count: usize,
}

impl Default for SimulatedOutput {
    fn default() -> Self {
        SimulatedOutput {
            disabled: true,
            amplitude: 0.0,
            offset: 0.0,
            frequency: 0.0,
            phase: 0.0,
            data: vec![0.0; BUFFER_LENGTH],
            size: BUFFER_LENGTH as u32,
            one_time_trigger: false,
            trigger_source: 0,
            trigger_count: 0,
        }
    }
}

#[derive(Debug)]
pub struct SimulatedDriver {
    front_end: SimulatedFrontEnd,
    initialized: bool,
    calibration: CalibrationParams,
    outputs: [SimulatedOutput; 2],
    calls: Vec<Call>,
}

fn nominal_calibration() -> CalibrationParams {
    CalibrationParams {
        fe_ch1_fs_g_hi: full_scale_from_volts(FULL_SCALE_HV),
        fe_ch2_fs_g_hi: full_scale_from_volts(FULL_SCALE_HV),
        fe_ch1_fs_g_lo: full_scale_from_volts(FULL_SCALE_LV),
        fe_ch2_fs_g_lo: full_scale_from_volts(FULL_SCALE_LV),
        be_ch1_fs: full_scale_from_volts(FULL_SCALE_BACK_END),
        be_ch2_fs: full_scale_from_volts(FULL_SCALE_BACK_END),
        ..Default::default()
    }
}

impl SimulatedDriver {
    pub fn new() -> SimulatedDriver {
        Self::with_front_end(SimulatedFrontEnd::default())
    }

    pub fn with_front_end(front_end: SimulatedFrontEnd) -> SimulatedDriver {
        SimulatedDriver {
            front_end,
            initialized: false,
            calibration: nominal_calibration(),
            outputs: Default::default(),
            calls: Vec::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls[..]
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear()
    }

    pub fn output(&self, channel: Channel) -> &SimulatedOutput {
        &self.outputs[channel.index()]
    }

    fn record(&mut self, call: Call) {
        log::debug!("[sim] {:?}", call);
        self.calls.push(call)
    }

    fn output_mut(&mut self, channel: Channel) -> &mut SimulatedOutput {
        &mut self.outputs[channel.index()]
    }

    fn check_reference(reference: f32) -> Result<()> {
        if reference > 0.0 { Ok(()) } else { Err(Error::OutOfRange) }
    }
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Driver for SimulatedDriver {
    fn init(&mut self) -> Result<()> {
        self.record(Call::Init);
        self.initialized = true;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.record(Call::Release);
        self.initialized = false;
        Ok(())
    }

    fn version(&mut self) -> Result<String> {
        Ok(VERSION.to_owned())
    }

    fn set_output_disable(&mut self, channel: Channel, disable: bool) -> Result<()> {
        self.record(Call::SetOutputDisable { channel, disable });
        self.output_mut(channel).disabled = disable;
        Ok(())
    }

    fn set_amplitude(&mut self, channel: Channel, amplitude: f32) -> Result<()> {
        self.record(Call::SetAmplitude { channel, amplitude });
        self.output_mut(channel).amplitude = amplitude;
        Ok(())
    }

    fn set_dc_offset(&mut self, channel: Channel, offset: f32) -> Result<()> {
        self.record(Call::SetDcOffset { channel, offset });
        self.output_mut(channel).offset = offset;
        Ok(())
    }

    fn set_frequency(&mut self, channel: Channel, frequency: f32) -> Result<()> {
        self.record(Call::SetFrequency { channel, frequency });
        self.output_mut(channel).frequency = frequency;
        Ok(())
    }

    fn set_phase(&mut self, channel: Channel, phase: f32) -> Result<()> {
        self.record(Call::SetPhase { channel, phase });
        self.output_mut(channel).phase = phase;
        Ok(())
    }

    fn write_data(&mut self, channel: Channel, data: &[f32], size: u32) -> Result<()> {
        if data.len() != BUFFER_LENGTH || size as usize > BUFFER_LENGTH {
            return Err(Error::OutOfRange)
        }
        self.record(Call::WriteData { channel, size });
        let output = self.output_mut(channel);
        output.data.copy_from_slice(data);
        output.size = size;
        Ok(())
    }

    fn set_one_time_trigger(&mut self, channel: Channel, one_time: bool) -> Result<()> {
        self.record(Call::SetOneTimeTrigger { channel, one_time });
        self.output_mut(channel).one_time_trigger = one_time;
        Ok(())
    }

    fn trigger(&mut self, channel: Channel) -> Result<()> {
        self.record(Call::Trigger { channel });
        self.output_mut(channel).trigger_count += 1;
        Ok(())
    }

    fn set_trigger_source(&mut self, channel: Channel, source: u32) -> Result<()> {
        self.record(Call::SetTriggerSource { channel, source });
        self.output_mut(channel).trigger_source = source;
        Ok(())
    }

    fn calibration_reset(&mut self) -> Result<()> {
        self.record(Call::CalibrationReset);
        self.calibration = nominal_calibration();
        Ok(())
    }

    fn calibrate_front_end_offset(&mut self, channel: Channel) -> Result<()> {
        self.record(Call::CalibrateFrontEndOffset { channel });
        let measured = self.front_end.dc_offset[channel.index()];
        *self.calibration.front_end_dc_offset(channel) = measured;
        Ok(())
    }

    fn calibrate_front_end_scale_hv(&mut self, channel: Channel, reference: f32) -> Result<()> {
        Self::check_reference(reference)?;
        self.record(Call::CalibrateFrontEndScaleHv { channel, reference });
        let gain = self.front_end.gain_hv[channel.index()];
        *self.calibration.front_end_full_scale_hv(channel) = full_scale_from_volts(FULL_SCALE_HV / gain);
        Ok(())
    }

    fn calibrate_front_end_scale_lv(&mut self, channel: Channel, reference: f32) -> Result<()> {
        Self::check_reference(reference)?;
        self.record(Call::CalibrateFrontEndScaleLv { channel, reference });
        let gain = self.front_end.gain_lv[channel.index()];
        *self.calibration.front_end_full_scale_lv(channel) = full_scale_from_volts(FULL_SCALE_LV / gain);
        Ok(())
    }

    fn calibrate_back_end(&mut self, channel: Channel) -> Result<()> {
        self.record(Call::CalibrateBackEnd { channel });
        let gain = self.front_end.back_end_gain[channel.index()];
        *self.calibration.back_end_full_scale(channel) = full_scale_from_volts(FULL_SCALE_BACK_END / gain);
        *self.calibration.back_end_dc_offset(channel) = self.front_end.back_end_dc_offset[channel.index()];
        Ok(())
    }

    fn calibration_settings(&mut self) -> Result<CalibrationParams> {
        Ok(self.calibration)
    }

    fn write_calibration(&mut self, params: &CalibrationParams) -> Result<()> {
        self.record(Call::WriteCalibration);
        self.calibration = *params;
        Ok(())
    }
}
