//! Operator-guided calibration of both input and output channels.

use std::path::{Path, PathBuf};

use crate::{CalibrationParams, Channel, Error, Result};
use crate::sys::Driver;
use crate::device::Device;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Quit,
}

/// The person connecting test points while the calibration runs.
pub trait Operator {
    fn notify(&mut self, message: &str) -> Result<()>;

    /// Wait until the operator decides to continue with the next step or to quit.
    fn confirm(&mut self) -> Result<Decision>;

    /// Ask for a voltage. Returns `None` if the answer is not a number.
    fn read_voltage(&mut self, prompt: &str) -> Result<Option<f32>>;
}

impl<O: Operator + ?Sized> Operator for &mut O {
    fn notify(&mut self, message: &str) -> Result<()> {
        (**self).notify(message)
    }

    fn confirm(&mut self) -> Result<Decision> {
        (**self).confirm()
    }

    fn read_voltage(&mut self, prompt: &str) -> Result<Option<f32>> {
        (**self).read_voltage(prompt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Input connected to ground.
    FrontEndOffset(Channel),
    /// Input connected to a reference voltage source, jumpers in HV position.
    FrontEndScaleHv(Channel),
    /// Input connected to a reference voltage source, jumpers in LV position.
    FrontEndScaleLv(Channel),
    /// Output looped back to the input.
    BackEnd(Channel),
}

impl Step {
    /// All steps in the order they are performed.
    pub fn sequence() -> Vec<Step> {
        Channel::ALL.into_iter()
            .flat_map(|channel| [
                Step::FrontEndOffset(channel),
                Step::FrontEndScaleHv(channel),
                Step::FrontEndScaleLv(channel),
                Step::BackEnd(channel),
            ])
            .collect()
    }

    pub fn instruction(self) -> String {
        match self {
            Step::FrontEndOffset(channel) =>
                format!("Connect {} to ground.", channel),
            Step::FrontEndScaleHv(channel) =>
                format!("Connect {} to reference voltage source and set jumpers to HV.", channel),
            Step::FrontEndScaleLv(channel) =>
                format!("Connect {} to reference voltage source and set jumpers to LV.", channel),
            Step::BackEnd(channel) =>
                format!("Connect {} Output to {} Input.", channel, channel),
        }
    }

    /// Largest reference voltage accepted by the step, if it needs one.
    pub fn reference_limit(self) -> Option<f32> {
        match self {
            Step::FrontEndScaleHv(_) => Some(20.0),
            Step::FrontEndScaleLv(_) => Some(1.0),
            Step::FrontEndOffset(_) | Step::BackEnd(_) => None,
        }
    }
}

pub struct Procedure<O: Operator> {
    operator: O,
    output: PathBuf,
}

impl<O: Operator> Procedure<O> {
    /// Create a procedure that saves the resulting coefficients to `output`.
    pub fn new(operator: O, output: impl Into<PathBuf>) -> Procedure<O> {
        Procedure { operator, output: output.into() }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Reset the calibration, walk the operator through every step, then display and save
    /// the resulting coefficients.
    pub fn run<D: Driver>(&mut self, device: &mut Device<D>) -> Result<CalibrationParams> {
        device.calibration_reset()?;
        self.operator.notify("---Calibration application---\n")?;
        self.operator.notify("Calibration process started.")?;
        for step in Step::sequence() {
            self.run_step(device, step)?;
        }
        let params = device.calibration_settings()?;
        self.operator.notify(&params.to_string())?;
        params.save(&self.output)?;
        log::info!("calibration saved to {}", self.output.display());
        Ok(params)
    }

    pub fn run_step<D: Driver>(&mut self, device: &mut Device<D>, step: Step) -> Result<()> {
        log::debug!("run_step({:?})", step);
        match step {
            Step::FrontEndOffset(channel) => {
                self.wait_for_operator(step)?;
                device.calibrate_front_end_offset(channel)
            }
            Step::FrontEndScaleHv(channel) => {
                let reference = self.read_reference(step)?;
                device.calibrate_front_end_scale_hv(channel, reference)
            }
            Step::FrontEndScaleLv(channel) => {
                let reference = self.read_reference(step)?;
                device.calibrate_front_end_scale_lv(channel, reference)
            }
            Step::BackEnd(channel) => {
                self.wait_for_operator(step)?;
                device.calibrate_back_end(channel)
            }
        }
    }

    /// Load coefficients from `path` into the instrument instead of measuring them.
    pub fn restore<D: Driver>(&mut self, device: &mut Device<D>, path: impl AsRef<Path>)
            -> Result<CalibrationParams> {
        let params = CalibrationParams::load(path)?;
        device.write_calibration(&params)?;
        self.operator.notify(&params.to_string())?;
        Ok(params)
    }

    fn wait_for_operator(&mut self, step: Step) -> Result<()> {
        self.operator.notify(&step.instruction())?;
        match self.operator.confirm()? {
            Decision::Continue => Ok(()),
            Decision::Quit => {
                log::info!("calibration aborted at {:?}", step);
                Err(Error::Aborted)
            }
        }
    }

    fn read_reference(&mut self, step: Step) -> Result<f32> {
        let limit = step.reference_limit().unwrap_or(f32::MAX);
        loop {
            self.operator.notify(&step.instruction())?;
            match self.operator.read_voltage("Enter reference voltage: ")? {
                Some(voltage) if voltage > 0.0 && voltage <= limit => {
                    self.operator.notify(&format!("Calibrating to {:.6} V", voltage))?;
                    return Ok(voltage)
                }
                Some(voltage) =>
                    self.operator.notify(&format!(
                        "Reference voltage {} V is outside of 0..{} V.", voltage, limit))?,
                None =>
                    self.operator.notify("Reference voltage must be a number.")?,
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::VecDeque;

    use super::*;
    use crate::{Call, SimulatedDriver, SimulatedFrontEnd, DEFAULT_CALIBRATION_FILE};
    use Channel::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Answer {
        Key(Decision),
        Voltage(Option<f32>),
    }

    #[derive(Debug, Default)]
    struct ScriptedOperator {
        answers: VecDeque<Answer>,
        messages: Vec<String>,
    }

    impl ScriptedOperator {
        fn new(answers: impl IntoIterator<Item = Answer>) -> ScriptedOperator {
            ScriptedOperator { answers: answers.into_iter().collect(), messages: Vec::new() }
        }

        fn next(&mut self) -> Result<Answer> {
            self.answers.pop_front().ok_or_else(||
                std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into())
        }
    }

    impl Operator for ScriptedOperator {
        fn notify(&mut self, message: &str) -> Result<()> {
            self.messages.push(message.to_owned());
            Ok(())
        }

        fn confirm(&mut self) -> Result<Decision> {
            match self.next()? {
                Answer::Key(decision) => Ok(decision),
                answer => panic!("expected key, got {:?}", answer),
            }
        }

        fn read_voltage(&mut self, _prompt: &str) -> Result<Option<f32>> {
            match self.next()? {
                Answer::Voltage(voltage) => Ok(voltage),
                answer => panic!("expected voltage, got {:?}", answer),
            }
        }
    }

    fn full_run() -> Vec<Answer> {
        use Answer::*;
        vec![
            Key(Decision::Continue), Voltage(Some(5.0)), Voltage(Some(0.5)), Key(Decision::Continue),
            Key(Decision::Continue), Voltage(Some(10.0)), Voltage(Some(1.0)), Key(Decision::Continue),
        ]
    }

    #[test]
    fn test_sequence() {
        let sequence = Step::sequence();
        assert_eq!(sequence.len(), 8);
        assert_eq!(sequence[0], Step::FrontEndOffset(Ch1));
        assert_eq!(sequence[3], Step::BackEnd(Ch1));
        assert_eq!(sequence[4], Step::FrontEndOffset(Ch2));
        assert_eq!(sequence[7], Step::BackEnd(Ch2));
    }

    #[test]
    fn test_instructions() {
        assert_eq!(Step::FrontEndOffset(Ch2).instruction(), "Connect CH2 to ground.");
        assert_eq!(Step::BackEnd(Ch1).instruction(), "Connect CH1 Output to CH1 Input.");
        assert_eq!(Step::FrontEndScaleLv(Ch1).reference_limit(), Some(1.0));
        assert_eq!(Step::BackEnd(Ch1).reference_limit(), None);
    }

    #[test]
    fn test_full_run() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join(DEFAULT_CALIBRATION_FILE);
        let mut device = Device::new(SimulatedDriver::with_front_end(SimulatedFrontEnd {
            dc_offset: [-3, 5],
            ..Default::default()
        }));
        let mut operator = ScriptedOperator::new(full_run());
        let params = Procedure::new(&mut operator, &output).run(&mut device).unwrap();

        assert_eq!(params.fe_ch1_dc_offs, -3);
        assert_eq!(params.fe_ch2_dc_offs, 5);
        assert_eq!(CalibrationParams::load(&output).unwrap(), params);
        assert_eq!(device.driver().calls(), [
            Call::CalibrationReset,
            Call::CalibrateFrontEndOffset { channel: Ch1 },
            Call::CalibrateFrontEndScaleHv { channel: Ch1, reference: 5.0 },
            Call::CalibrateFrontEndScaleLv { channel: Ch1, reference: 0.5 },
            Call::CalibrateBackEnd { channel: Ch1 },
            Call::CalibrateFrontEndOffset { channel: Ch2 },
            Call::CalibrateFrontEndScaleHv { channel: Ch2, reference: 10.0 },
            Call::CalibrateFrontEndScaleLv { channel: Ch2, reference: 1.0 },
            Call::CalibrateBackEnd { channel: Ch2 },
        ]);
        assert!(operator.messages.contains(&"Calibrating to 5.000000 V".to_owned()));
        assert_eq!(operator.messages.last(), Some(&params.to_string()));
    }

    #[test]
    fn test_reprompt_reference() {
        use Answer::*;
        let mut device = Device::new(SimulatedDriver::new());
        let mut operator = ScriptedOperator::new([
            Voltage(None), Voltage(Some(0.0)), Voltage(Some(20.5)), Voltage(Some(20.0)),
        ]);
        Procedure::new(&mut operator, DEFAULT_CALIBRATION_FILE)
            .run_step(&mut device, Step::FrontEndScaleHv(Ch2)).unwrap();
        assert_eq!(device.driver().calls(), [
            Call::CalibrateFrontEndScaleHv { channel: Ch2, reference: 20.0 },
        ]);
        let instruction = Step::FrontEndScaleHv(Ch2).instruction();
        assert_eq!(operator.messages.iter().filter(|&message| *message == instruction).count(), 4);
    }

    #[test]
    fn test_lv_limit() {
        use Answer::*;
        let mut device = Device::new(SimulatedDriver::new());
        let mut operator = ScriptedOperator::new([Voltage(Some(1.5)), Voltage(Some(0.9))]);
        Procedure::new(&mut operator, DEFAULT_CALIBRATION_FILE)
            .run_step(&mut device, Step::FrontEndScaleLv(Ch1)).unwrap();
        assert_eq!(device.driver().calls(), [
            Call::CalibrateFrontEndScaleLv { channel: Ch1, reference: 0.9 },
        ]);
    }

    #[test]
    fn test_quit() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join(DEFAULT_CALIBRATION_FILE);
        let mut device = Device::new(SimulatedDriver::new());
        let mut operator = ScriptedOperator::new([
            Answer::Key(Decision::Continue), Answer::Voltage(Some(5.0)), Answer::Voltage(Some(0.5)),
            Answer::Key(Decision::Quit),
        ]);
        let result = Procedure::new(&mut operator, &output).run(&mut device);
        assert!(matches!(result, Err(Error::Aborted)));
        assert!(!output.exists());
        assert_eq!(device.driver().calls().last(),
                   Some(&Call::CalibrateFrontEndScaleLv { channel: Ch1, reference: 0.5 }));
    }

    #[test]
    fn test_end_of_input() {
        let mut device = Device::new(SimulatedDriver::new());
        let mut operator = ScriptedOperator::new([]);
        let result = Procedure::new(&mut operator, DEFAULT_CALIBRATION_FILE)
            .run_step(&mut device, Step::BackEnd(Ch1));
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(device.driver().calls().is_empty());
    }

    #[test]
    fn test_restore() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CALIBRATION_FILE);
        let saved = CalibrationParams { fe_ch1_dc_offs: 42, be_ch2_fs: 7, ..Default::default() };
        saved.save(&path).unwrap();

        let mut device = Device::new(SimulatedDriver::new());
        let mut operator = ScriptedOperator::default();
        let restored = Procedure::new(&mut operator, &path).restore(&mut device, &path).unwrap();
        assert_eq!(restored, saved);
        assert_eq!(device.calibration_settings().unwrap(), saved);
        assert_eq!(device.driver().calls(), [Call::WriteCalibration]);
        assert_eq!(operator.messages, [saved.to_string()]);
    }

    #[test]
    fn test_restore_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut device = Device::new(SimulatedDriver::new());
        let mut operator = ScriptedOperator::default();
        let result = Procedure::new(&mut operator, DEFAULT_CALIBRATION_FILE)
            .restore(&mut device, dir.path().join("missing.dat"));
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(device.driver().calls().is_empty());
    }
}
