use crate::Result;
use crate::sys::Driver;
use crate::generator::ChannelState;

#[derive(Debug)]
pub struct Device<D: Driver> {
    pub(crate) driver: D,
    pub(crate) channels: [ChannelState; 2],
}

impl Device<crate::sys::imp::DriverImpl> {
    /// Open the instrument using the backend selected at build time.
    pub fn open() -> Device<crate::sys::imp::DriverImpl> {
        Device::new(crate::sys::imp::DriverImpl::new())
    }

    /// Like `with_driver`, using the backend selected at build time.
    pub fn with<T, F>(f: F) -> Result<T>
            where F: FnOnce(&mut Device<crate::sys::imp::DriverImpl>) -> Result<T> {
        Device::with_driver(crate::sys::imp::DriverImpl::new(), f)
    }
}

impl<D: Driver> Device<D> {
    pub fn new(driver: D) -> Device<D> {
        Device { driver, channels: Default::default() }
    }

    /// Initialize the library, run `f`, and release the library even if `f` fails.
    pub fn with_driver<T, F>(driver: D, f: F) -> Result<T>
            where F: FnOnce(&mut Device<D>) -> Result<T> {
        let mut device = Device::new(driver);
        device.init()?;
        let result = f(&mut device);
        let released = device.release();
        let value = result?;
        released?;
        Ok(value)
    }

    pub fn init(&mut self) -> Result<()> {
        log::debug!("init()");
        self.driver.init()
    }

    pub fn release(&mut self) -> Result<()> {
        log::debug!("release()");
        self.driver.release()
    }

    pub fn version(&mut self) -> Result<String> {
        self.driver.version()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Call, Error, SimulatedDriver};

    #[test]
    fn test_with_releases() {
        let mut seen_initialized = false;
        let result = Device::with_driver(SimulatedDriver::new(), |device| {
            seen_initialized = device.driver().is_initialized();
            device.version()
        });
        assert!(seen_initialized);
        assert_eq!(result.unwrap(), "simulated");
    }

    #[test]
    fn test_with_releases_on_error() {
        let mut driver = SimulatedDriver::new();
        let result: Result<()> = Device::with_driver(&mut driver, |device| {
            device.set_burst_count(crate::Channel::Ch1, 2)
        });
        assert!(matches!(result, Err(Error::Unsupported)));
        assert!(!driver.is_initialized());
        assert_eq!(driver.calls(), [Call::Init, Call::Release]);
    }

    #[cfg(not(feature = "hardware"))]
    #[test]
    fn test_open_before_init() {
        let mut device = Device::open();
        assert_eq!(device.version().unwrap(), "simulated");
        assert!(!device.driver().is_initialized());
        assert!(device.driver().calls().is_empty());
    }

    #[test]
    fn test_lifecycle_calls() {
        let mut device = Device::new(SimulatedDriver::new());
        device.init().unwrap();
        device.release().unwrap();
        assert_eq!(device.into_driver().calls(), [Call::Init, Call::Release]);
    }
}
