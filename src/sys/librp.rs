use std::ffi::CStr;
use libc::{c_char, c_float, c_int, c_uint};

use crate::{CalibrationParams, Channel, Error, Result};

type RpChannel = c_int;

const RP_CH_1: RpChannel = 0;
const RP_CH_2: RpChannel = 1;

#[link(name = "rp")]
extern "C" {
    fn rp_Init() -> c_int;
    fn rp_Release() -> c_int;
    fn rp_GetVersion() -> *const c_char;
    fn rp_GetError(error_code: c_int) -> *const c_char;

    fn rp_CalibrationReset() -> c_int;
    fn rp_CalibrateFrontEndOffset(channel: RpChannel, out_params: *mut CalibrationParams) -> c_int;
    fn rp_CalibrateFrontEndScaleHV(channel: RpChannel, reference: c_float,
                                   out_params: *mut CalibrationParams) -> c_int;
    fn rp_CalibrateFrontEndScaleLV(channel: RpChannel, reference: c_float,
                                   out_params: *mut CalibrationParams) -> c_int;
    fn rp_CalibrateBackEnd(channel: RpChannel, out_params: *mut CalibrationParams) -> c_int;
    fn rp_GetCalibrationSettings() -> CalibrationParams;
    fn rp_CalibrationWriteParams(params: CalibrationParams) -> c_int;

    // The generate layer is internal to librp, but its symbols are exported.
    fn generate_setOutputDisable(channel: RpChannel, disable: bool) -> c_int;
    fn generate_setAmplitude(channel: RpChannel, amplitude: c_float) -> c_int;
    fn generate_setDCOffset(channel: RpChannel, offset: c_float) -> c_int;
    fn generate_setFrequency(channel: RpChannel, frequency: c_float) -> c_int;
    fn generate_setPhase(channel: RpChannel, phase: c_float) -> c_int;
    fn generate_writeData(channel: RpChannel, data: *const c_float, size: c_uint) -> c_int;
    fn generate_setOneTimeTrigger(channel: RpChannel, one_time: c_uint) -> c_int;
    fn generate_GenTrigger(channel: RpChannel) -> c_int;
    fn generate_setTriggerSource(channel: RpChannel, source: c_uint) -> c_int;
}

fn rp_channel(channel: Channel) -> RpChannel {
    match channel {
        Channel::Ch1 => RP_CH_1,
        Channel::Ch2 => RP_CH_2,
    }
}

fn error_text(code: c_int) -> String {
    // SAFETY: `rp_GetError` returns a pointer to a static NUL-terminated string.
    unsafe {
        let text = rp_GetError(code);
        if text.is_null() {
            String::from("unknown error")
        } else {
            CStr::from_ptr(text).to_string_lossy().into_owned()
        }
    }
}

fn check(function: &str, code: c_int) -> Result<()> {
    if code == crate::status::OK {
        Ok(())
    } else {
        log::error!("{}() failed: {} (status {})", function, error_text(code), code);
        Err(Error::Library(code))
    }
}

macro_rules! rp_call {
    ($function:ident ( $( $arg:expr ),* )) => {
        // SAFETY: All arguments are plain values or pointers valid for the duration of the call.
        check(stringify!($function), unsafe { $function( $( $arg ),* ) })
    };
}

/// Driver backed by the vendor `librp` shared library.
#[derive(Debug, Default)]
pub struct LibRpDriver {
    _private: (),
}

impl LibRpDriver {
    pub fn new() -> LibRpDriver {
        LibRpDriver { _private: () }
    }
}

impl super::Driver for LibRpDriver {
    fn init(&mut self) -> Result<()> {
        log::debug!("rp_Init()");
        rp_call!(rp_Init())
    }

    fn release(&mut self) -> Result<()> {
        log::debug!("rp_Release()");
        rp_call!(rp_Release())
    }

    fn version(&mut self) -> Result<String> {
        // SAFETY: `rp_GetVersion` returns a pointer to a static NUL-terminated string.
        let version = unsafe { rp_GetVersion() };
        if version.is_null() {
            return Ok(String::new())
        }
        Ok(unsafe { CStr::from_ptr(version) }.to_string_lossy().into_owned())
    }

    fn set_output_disable(&mut self, channel: Channel, disable: bool) -> Result<()> {
        log::debug!("generate_setOutputDisable({}, {})", channel, disable);
        rp_call!(generate_setOutputDisable(rp_channel(channel), disable))
    }

    fn set_amplitude(&mut self, channel: Channel, amplitude: f32) -> Result<()> {
        log::debug!("generate_setAmplitude({}, {})", channel, amplitude);
        rp_call!(generate_setAmplitude(rp_channel(channel), amplitude))
    }

    fn set_dc_offset(&mut self, channel: Channel, offset: f32) -> Result<()> {
        log::debug!("generate_setDCOffset({}, {})", channel, offset);
        rp_call!(generate_setDCOffset(rp_channel(channel), offset))
    }

    fn set_frequency(&mut self, channel: Channel, frequency: f32) -> Result<()> {
        log::debug!("generate_setFrequency({}, {})", channel, frequency);
        rp_call!(generate_setFrequency(rp_channel(channel), frequency))
    }

    fn set_phase(&mut self, channel: Channel, phase: f32) -> Result<()> {
        log::debug!("generate_setPhase({}, {})", channel, phase);
        rp_call!(generate_setPhase(rp_channel(channel), phase))
    }

    fn write_data(&mut self, channel: Channel, data: &[f32], size: u32) -> Result<()> {
        log::debug!("generate_writeData({}, [..{}], {})", channel, data.len(), size);
        if size as usize > data.len() {
            return Err(Error::OutOfRange)
        }
        rp_call!(generate_writeData(rp_channel(channel), data.as_ptr(), size))
    }

    fn set_one_time_trigger(&mut self, channel: Channel, one_time: bool) -> Result<()> {
        log::debug!("generate_setOneTimeTrigger({}, {})", channel, one_time);
        rp_call!(generate_setOneTimeTrigger(rp_channel(channel), one_time as c_uint))
    }

    fn trigger(&mut self, channel: Channel) -> Result<()> {
        log::debug!("generate_GenTrigger({})", channel);
        rp_call!(generate_GenTrigger(rp_channel(channel)))
    }

    fn set_trigger_source(&mut self, channel: Channel, source: u32) -> Result<()> {
        log::debug!("generate_setTriggerSource({}, {})", channel, source);
        rp_call!(generate_setTriggerSource(rp_channel(channel), source))
    }

    fn calibration_reset(&mut self) -> Result<()> {
        log::debug!("rp_CalibrationReset()");
        rp_call!(rp_CalibrationReset())
    }

    fn calibrate_front_end_offset(&mut self, channel: Channel) -> Result<()> {
        log::debug!("rp_CalibrateFrontEndOffset({})", channel);
        rp_call!(rp_CalibrateFrontEndOffset(rp_channel(channel), std::ptr::null_mut()))
    }

    fn calibrate_front_end_scale_hv(&mut self, channel: Channel, reference: f32) -> Result<()> {
        log::debug!("rp_CalibrateFrontEndScaleHV({}, {})", channel, reference);
        rp_call!(rp_CalibrateFrontEndScaleHV(rp_channel(channel), reference, std::ptr::null_mut()))
    }

    fn calibrate_front_end_scale_lv(&mut self, channel: Channel, reference: f32) -> Result<()> {
        log::debug!("rp_CalibrateFrontEndScaleLV({}, {})", channel, reference);
        rp_call!(rp_CalibrateFrontEndScaleLV(rp_channel(channel), reference, std::ptr::null_mut()))
    }

    fn calibrate_back_end(&mut self, channel: Channel) -> Result<()> {
        log::debug!("rp_CalibrateBackEnd({})", channel);
        rp_call!(rp_CalibrateBackEnd(rp_channel(channel), std::ptr::null_mut()))
    }

    fn calibration_settings(&mut self) -> Result<CalibrationParams> {
        // SAFETY: Returns the record by value; `CalibrationParams` has the C layout.
        let params = unsafe { rp_GetCalibrationSettings() };
        log::debug!("rp_GetCalibrationSettings() = {:?}", params);
        Ok(params)
    }

    fn write_calibration(&mut self, params: &CalibrationParams) -> Result<()> {
        log::debug!("rp_CalibrationWriteParams({:?})", params);
        rp_call!(rp_CalibrationWriteParams(*params))
    }
}
