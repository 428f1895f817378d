//! Calibration coefficients as stored by the vendor library.

use std::fmt;
use std::path::Path;

use bytemuck::{Pod, Zeroable};

use crate::{Channel, Error, Result};
use crate::sys::Driver;
use crate::device::Device;

/// File the calibration utility backs the coefficients up to.
pub const DEFAULT_CALIBRATION_FILE: &str = "calib_params.dat";

/// Calibration record with the exact layout of `rp_calib_params_t`.
///
/// Full scale coefficients are encoded with `full_scale_from_volts`; DC offsets are in ADC/DAC
/// counts.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct CalibrationParams {
    /// High gain front end full scale voltage, channel A
    pub fe_ch1_fs_g_hi: u32,
    /// High gain front end full scale voltage, channel B
    pub fe_ch2_fs_g_hi: u32,
    /// Low gain front end full scale voltage, channel A
    pub fe_ch1_fs_g_lo: u32,
    /// Low gain front end full scale voltage, channel B
    pub fe_ch2_fs_g_lo: u32,
    /// Front end DC offset, channel A
    pub fe_ch1_dc_offs: i32,
    /// Front end DC offset, channel B
    pub fe_ch2_dc_offs: i32,
    /// Back end full scale voltage, channel A
    pub be_ch1_fs: u32,
    /// Back end full scale voltage, channel B
    pub be_ch2_fs: u32,
    /// Back end DC offset, on channel A
    pub be_ch1_dc_offs: i32,
    /// Back end DC offset, on channel B
    pub be_ch2_dc_offs: i32,
}

impl CalibrationParams {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Decode a record from the raw bytes written by `to_bytes` (or by the vendor tools).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::SIZE {
            return Err(Error::CorruptCalibration { len: bytes.len() })
        }
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    pub fn to_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let params = Self::from_bytes(&bytes)?;
        log::debug!("loaded calibration from {}: {:?}", path.display(), params);
        Ok(params)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        log::debug!("saving calibration to {}: {:?}", path.display(), self);
        std::fs::write(path, self.to_bytes())?;
        Ok(())
    }

    pub fn front_end_full_scale_hv(&mut self, channel: Channel) -> &mut u32 {
        match channel {
            Channel::Ch1 => &mut self.fe_ch1_fs_g_hi,
            Channel::Ch2 => &mut self.fe_ch2_fs_g_hi,
        }
    }

    pub fn front_end_full_scale_lv(&mut self, channel: Channel) -> &mut u32 {
        match channel {
            Channel::Ch1 => &mut self.fe_ch1_fs_g_lo,
            Channel::Ch2 => &mut self.fe_ch2_fs_g_lo,
        }
    }

    pub fn front_end_dc_offset(&mut self, channel: Channel) -> &mut i32 {
        match channel {
            Channel::Ch1 => &mut self.fe_ch1_dc_offs,
            Channel::Ch2 => &mut self.fe_ch2_dc_offs,
        }
    }

    pub fn back_end_full_scale(&mut self, channel: Channel) -> &mut u32 {
        match channel {
            Channel::Ch1 => &mut self.be_ch1_fs,
            Channel::Ch2 => &mut self.be_ch2_fs,
        }
    }

    pub fn back_end_dc_offset(&mut self, channel: Channel) -> &mut i32 {
        match channel {
            Channel::Ch1 => &mut self.be_ch1_dc_offs,
            Channel::Ch2 => &mut self.be_ch2_dc_offs,
        }
    }
}

impl fmt::Display for CalibrationParams {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // signed offsets are printed as their two's complement bit pattern
        let rows: [(&str, u32, &str); 10] = [
            ("fe_ch1_fs_g_hi", self.fe_ch1_fs_g_hi, "High gain front end full scale voltage, channel A"),
            ("fe_ch2_fs_g_hi", self.fe_ch2_fs_g_hi, "High gain front end full scale voltage, channel B"),
            ("fe_ch1_fs_g_lo", self.fe_ch1_fs_g_lo, "Low gain front end full scale voltage, channel A"),
            ("fe_ch2_fs_g_lo", self.fe_ch2_fs_g_lo, "Low gain front end full scale voltage, channel B"),
            ("fe_ch1_dc_offs", self.fe_ch1_dc_offs as u32, "Front end DC offset, channel A"),
            ("fe_ch2_dc_offs", self.fe_ch2_dc_offs as u32, "Front end DC offset, channel B"),
            ("be_ch1_fs", self.be_ch1_fs, "Back end full scale voltage, channel A"),
            ("be_ch2_fs", self.be_ch2_fs, "Back end full scale voltage, channel B"),
            ("be_ch1_dc_offs", self.be_ch1_dc_offs as u32, "Back end DC offset, on channel A"),
            ("be_ch2_dc_offs", self.be_ch2_dc_offs as u32, "Back end DC offset, on channel B"),
        ];
        writeln!(f, "Current calibration params:")?;
        for (name, value, description) in rows {
            writeln!(f, "{} = {:#010X} //!< {}", name, value, description)?;
        }
        Ok(())
    }
}

impl<D: Driver> Device<D> {
    /// Revert the calibration coefficients to the factory defaults.
    pub fn calibration_reset(&mut self) -> Result<()> {
        log::debug!("calibration_reset()");
        self.driver.calibration_reset()
    }

    /// Measure the frontend DC offset; the input must be connected to ground.
    pub fn calibrate_front_end_offset(&mut self, channel: Channel) -> Result<()> {
        log::debug!("calibrate_front_end_offset({})", channel);
        self.driver.calibrate_front_end_offset(channel)
    }

    /// Measure the frontend gain with HV jumpers against a `reference` voltage source.
    pub fn calibrate_front_end_scale_hv(&mut self, channel: Channel, reference: f32) -> Result<()> {
        log::debug!("calibrate_front_end_scale_hv({}, {})", channel, reference);
        self.driver.calibrate_front_end_scale_hv(channel, reference)
    }

    /// Measure the frontend gain with LV jumpers against a `reference` voltage source.
    pub fn calibrate_front_end_scale_lv(&mut self, channel: Channel, reference: f32) -> Result<()> {
        log::debug!("calibrate_front_end_scale_lv({}, {})", channel, reference);
        self.driver.calibrate_front_end_scale_lv(channel, reference)
    }

    /// Measure the backend gain and offset; the output must be looped back to the input.
    pub fn calibrate_back_end(&mut self, channel: Channel) -> Result<()> {
        log::debug!("calibrate_back_end({})", channel);
        self.driver.calibrate_back_end(channel)
    }

    pub fn calibration_settings(&mut self) -> Result<CalibrationParams> {
        self.driver.calibration_settings()
    }

    pub fn write_calibration(&mut self, params: &CalibrationParams) -> Result<()> {
        log::debug!("write_calibration({:?})", params);
        self.driver.write_calibration(params)
    }
}

/// Encode a full scale voltage the way the vendor library stores it: the fraction of 100 V,
/// in units of 2^-32.
pub fn full_scale_from_volts(volts: f32) -> u32 {
    (volts as f64 / 100.0 * (1u64 << 32) as f64) as u32
}

pub fn full_scale_to_volts(full_scale: u32) -> f32 {
    (full_scale as f64 * 100.0 / (1u64 << 32) as f64) as f32
}
