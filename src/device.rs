use embedded_hal::{delay::DelayNs, i2c::I2c};

use crate::{
    port::{I2cPort, RegisterPort},
    ranging::{self, RangingEngine, RangingObserver},
    register::{Register, DEVICE_ID, PRIMED_CONFIGURATION},
    setting::{CalibratedReading, GainTimeSetting, RawReading},
    Error,
};

/// Default 7-bit I2C address of the VEML7700.
pub const DEFAULT_ADDRESS: u8 = 0x10;

/// VEML7700 ambient light sensor driver.
///
/// Owns the I2C bus and a delay, and exposes the auto-ranging
/// [`measure`](Self::measure) along with the primitives it is built from.
pub struct Veml7700<I2C, D> {
    port: I2cPort<I2C, D>,
}

impl<I2C, E, D> Veml7700<I2C, D>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
    D: DelayNs,
{
    /// Creates a new driver for a sensor at the default address (0x10).
    ///
    /// Nothing is sent on the bus; call [`init`](Self::init) once before the
    /// first measurement.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use veml7700_autorange::Veml7700;
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    ///
    /// let mut sensor = Veml7700::new(i2c, delay);
    /// ```
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self::new_with_address(i2c, delay, DEFAULT_ADDRESS)
    }

    /// Creates a new driver for a sensor at `address`.
    pub fn new_with_address(i2c: I2C, delay: D, address: u8) -> Self {
        Self {
            port: I2cPort::new(i2c, delay, address),
        }
    }

    /// Checks the sensor is present and primes it for ranging.
    ///
    /// Reads the identification register, then disables power saving mode and
    /// writes the starting configuration: gain x1/8, 100 ms integration,
    /// interrupt disabled, powered on. Must run once before
    /// [`measure`](Self::measure).
    ///
    /// # Returns
    ///
    /// * `Ok(u16)` - The full identification register; the low byte is 0x81 on a VEML7700
    ///
    /// # Errors
    ///
    /// * `Err(Error::DeviceAbsent)` - If the identification register could not be read
    /// * `Err(Error::Bus(E))` - If priming the registers failed
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use veml7700_autorange::{Error, Veml7700};
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    /// let mut sensor = Veml7700::new(i2c, delay);
    ///
    /// match sensor.init() {
    ///     Ok(id) => println!("VEML7700 found, ID 0x{:04X}", id),
    ///     Err(Error::DeviceAbsent) => println!("No sensor on the bus"),
    ///     Err(e) => println!("Bus error: {:?}", e),
    /// }
    /// ```
    pub fn init(&mut self) -> Result<u16, Error<E>> {
        let id = self
            .port
            .read_register(Register::Id.into())
            .map_err(|_| Error::DeviceAbsent)?;
        if id.to_le_bytes()[0] != DEVICE_ID {
            warn!("Unexpected device id 0x{:04X}", id);
        }

        info!("Priming sensor at 0x{:02X}", self.port.address());
        self.port.write_register(Register::PowerSaving.into(), 0)?;
        self.port
            .write_register(Register::AlsConf.into(), PRIMED_CONFIGURATION)?;
        Ok(id)
    }

    /// Puts the sensor in shutdown. The configuration is kept.
    ///
    /// # Errors
    ///
    /// * `Err(Error::Bus(E))` - If there was an I2C communication error
    pub fn shutdown(&mut self) -> Result<(), Error<E>> {
        self.port.set_shutdown(true)?;
        Ok(())
    }

    /// Wakes the sensor from shutdown with its previous configuration.
    ///
    /// Counts are only valid after a full integration period has elapsed.
    ///
    /// # Errors
    ///
    /// * `Err(Error::Bus(E))` - If there was an I2C communication error
    pub fn wake_up(&mut self) -> Result<(), Error<E>> {
        self.port.set_shutdown(false)?;
        Ok(())
    }

    /// Reads the ALS and WHITE counts without any ranging.
    ///
    /// # Errors
    ///
    /// * `Err(Error::Bus(E))` - If there was an I2C communication error
    pub fn read_raw(&mut self) -> Result<RawReading, Error<E>> {
        ranging::read_raw(&mut self.port)
    }

    /// Reads the gain and integration time currently configured.
    ///
    /// An unknown field code reads back as index 0.
    ///
    /// # Errors
    ///
    /// * `Err(Error::Bus(E))` - If there was an I2C communication error
    pub fn read_gain_time(&mut self) -> Result<GainTimeSetting, Error<E>> {
        ranging::read_gain_time(&mut self.port)
    }

    /// Applies a gain and integration time.
    ///
    /// The sensor is briefly shut down while `ALS_CONF` is rewritten; all
    /// other configuration bits are preserved. No settle delay is inserted.
    ///
    /// # Errors
    ///
    /// * `Err(Error::Bus(E))` - If there was an I2C communication error
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use veml7700_autorange::{GainTimeSetting, Veml7700};
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    /// let mut sensor = Veml7700::new(i2c, delay);
    ///
    /// sensor.init().unwrap();
    /// // gain x1, 200 ms
    /// let setting = GainTimeSetting::new(2, 3).unwrap();
    /// sensor.write_gain_time(setting).unwrap();
    /// assert_eq!(sensor.read_gain_time().unwrap(), setting);
    /// ```
    pub fn write_gain_time(&mut self, setting: GainTimeSetting) -> Result<(), Error<E>> {
        ranging::write_gain_time(&mut self.port, setting)
    }

    /// Applies a gain and integration time given as table indices.
    ///
    /// # Errors
    ///
    /// * `Err(Error::InvalidArgument)` - If `gain_index > 3` or `time_index > 5`
    /// * `Err(Error::Bus(E))` - If there was an I2C communication error
    pub fn write_gain_time_indices(&mut self, gain_index: u8, time_index: u8) -> Result<(), Error<E>> {
        let Some(setting) = GainTimeSetting::new(gain_index, time_index) else {
            error!("Invalid gain/time index: {}, {}", gain_index, time_index);
            return Err(Error::InvalidArgument);
        };
        self.write_gain_time(setting)
    }

    /// Measures illuminance with auto-ranging.
    ///
    /// Adjusts gain and integration time until the ALS count lies within
    /// 1000..=10000, then converts both channels to lux. Depending on the light
    /// level this blocks from a few hundred milliseconds to several seconds.
    /// At the limits of the sensor's range a best-effort reading is returned.
    ///
    /// # Errors
    ///
    /// * `Err(Error::Bus(E))` - If there was an I2C communication error
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use veml7700_autorange::Veml7700;
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    /// let mut sensor = Veml7700::new(i2c, delay);
    ///
    /// sensor.init().unwrap();
    /// let reading = sensor.measure().unwrap();
    /// println!("ALS: {} lx, WHITE: {} lx", reading.als, reading.white);
    /// ```
    pub fn measure(&mut self) -> Result<CalibratedReading, Error<E>> {
        RangingEngine::new(&mut self.port).measure()
    }

    /// Measures like [`measure`](Self::measure), reporting every pass to `observer`.
    ///
    /// # Errors
    ///
    /// * `Err(Error::Bus(E))` - If there was an I2C communication error
    pub fn measure_with_observer<O: RangingObserver>(
        &mut self,
        observer: O,
    ) -> Result<CalibratedReading, Error<E>> {
        RangingEngine::with_observer(&mut self.port, observer).measure()
    }

    /// Gives back the I2C bus and the delay.
    pub fn release(self) -> (I2C, D) {
        self.port.release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern crate std;
    use std::vec;

    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    const ADDR: u8 = DEFAULT_ADDRESS;

    fn read(command: u8, value: u16) -> I2cTransaction {
        I2cTransaction::write_read(ADDR, vec![command], value.to_le_bytes().to_vec())
    }

    fn write(command: u8, value: u16) -> I2cTransaction {
        let [lsb, msb] = value.to_le_bytes();
        I2cTransaction::write(ADDR, vec![command, lsb, msb])
    }

    #[test]
    fn init_primes_sensor() {
        let expectations = [read(7, 0xC481), write(3, 0x0000), write(0, 0x1000)];
        let mut sensor = Veml7700::new(I2cMock::new(&expectations), NoopDelay::new());

        assert_eq!(sensor.init().unwrap(), 0xC481);

        let (mut i2c, _) = sensor.release();
        i2c.done();
    }

    #[test]
    fn init_reports_absent_device() {
        let expectations =
            [I2cTransaction::write_read(ADDR, vec![7], vec![0, 0]).with_error(ErrorKind::Other)];
        let mut sensor = Veml7700::new(I2cMock::new(&expectations), NoopDelay::new());

        assert!(matches!(sensor.init(), Err(Error::DeviceAbsent)));

        let (mut i2c, _) = sensor.release();
        i2c.done();
    }

    #[test]
    fn init_propagates_priming_failure() {
        let expectations = [
            read(7, 0xC481),
            I2cTransaction::write(ADDR, vec![3, 0, 0]).with_error(ErrorKind::Other),
        ];
        let mut sensor = Veml7700::new(I2cMock::new(&expectations), NoopDelay::new());

        assert!(matches!(sensor.init(), Err(Error::Bus(ErrorKind::Other))));

        let (mut i2c, _) = sensor.release();
        i2c.done();
    }

    #[test]
    fn custom_address_is_used() {
        let expectations = [I2cTransaction::write_read(0x48, vec![4], vec![0x10, 0x00])];
        let mut sensor =
            Veml7700::new_with_address(I2cMock::new(&expectations), NoopDelay::new(), 0x48);

        assert_eq!(sensor.port.read_register(4).unwrap(), 0x0010);

        let (mut i2c, _) = sensor.release();
        i2c.done();
    }

    #[test]
    fn shutdown_and_wake_up_toggle_bit_zero() {
        let expectations = [
            read(0, 0x1000),
            write(0, 0x1001),
            read(0, 0x1001),
            write(0, 0x1000),
        ];
        let mut sensor = Veml7700::new(I2cMock::new(&expectations), NoopDelay::new());

        sensor.shutdown().unwrap();
        sensor.wake_up().unwrap();

        let (mut i2c, _) = sensor.release();
        i2c.done();
    }

    #[test]
    fn read_raw_reads_als_then_white() {
        let expectations = [read(4, 1234), read(5, 2345)];
        let mut sensor = Veml7700::new(I2cMock::new(&expectations), NoopDelay::new());

        let raw = sensor.read_raw().unwrap();
        assert_eq!(raw, RawReading { als: 1234, white: 2345 });

        let (mut i2c, _) = sensor.release();
        i2c.done();
    }

    #[test]
    fn write_gain_time_keeps_persistence_and_interrupt_bits() {
        // persistence 8 and interrupt enabled on top of x1/8, 100 ms
        let live = 0x1000 | 0x0030 | 0x0002;
        let expectations = [
            read(0, live),
            write(0, live | 1),
            read(0, live | 1),
            // gain x1 (0b00), 200 ms (0b0001)
            write(0, 0x0040 | 0x0030 | 0x0002 | 1),
            read(0, 0x0073),
            write(0, 0x0072),
        ];
        let mut sensor = Veml7700::new(I2cMock::new(&expectations), NoopDelay::new());

        sensor.write_gain_time_indices(2, 3).unwrap();

        let (mut i2c, _) = sensor.release();
        i2c.done();
    }

    #[test]
    fn write_gain_time_rejects_bad_indices() {
        let mut sensor = Veml7700::new(I2cMock::new(&[]), NoopDelay::new());

        assert!(matches!(
            sensor.write_gain_time_indices(4, 0),
            Err(Error::InvalidArgument)
        ));
        assert!(matches!(
            sensor.write_gain_time_indices(0, 6),
            Err(Error::InvalidArgument)
        ));

        let (mut i2c, _) = sensor.release();
        i2c.done();
    }

    #[test]
    fn measure_in_range_needs_no_adjustment() {
        let expectations = [
            read(0, 0x1000),
            read(4, 5000),
            read(5, 6000),
            read(4, 5000),
            read(5, 6000),
        ];
        let mut sensor = Veml7700::new(I2cMock::new(&expectations), NoopDelay::new());

        let reading = sensor.measure().unwrap();

        // x1/8, 100 ms: 0.5376 lx per count
        assert_eq!(reading, CalibratedReading { als: 2688, white: 3226 });

        let (mut i2c, _) = sensor.release();
        i2c.done();
    }

    #[test]
    fn measure_raises_gain_when_dim() {
        let expectations = [
            read(0, 0x1000),
            read(4, 500),
            read(5, 600),
            // shut down, switch to x1/4, wake up
            read(0, 0x1000),
            write(0, 0x1001),
            read(0, 0x1001),
            write(0, 0x1801),
            read(0, 0x1801),
            write(0, 0x1800),
            read(4, 2000),
            read(5, 2500),
            read(4, 2000),
            read(5, 2500),
        ];
        let mut sensor = Veml7700::new(I2cMock::new(&expectations), NoopDelay::new());

        let reading = sensor.measure().unwrap();

        // x1/4, 100 ms: 0.2688 lx per count
        assert_eq!(reading, CalibratedReading { als: 538, white: 672 });

        let (mut i2c, _) = sensor.release();
        i2c.done();
    }

    #[test]
    fn measure_propagates_bus_error() {
        let expectations = [
            read(0, 0x1000),
            I2cTransaction::write_read(ADDR, vec![4], vec![0, 0]).with_error(ErrorKind::Other),
        ];
        let mut sensor = Veml7700::new(I2cMock::new(&expectations), NoopDelay::new());

        assert!(matches!(sensor.measure(), Err(Error::Bus(ErrorKind::Other))));

        let (mut i2c, _) = sensor.release();
        i2c.done();
    }
}
