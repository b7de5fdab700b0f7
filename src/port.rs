use embedded_hal::{delay::DelayNs, i2c::I2c};

use crate::register::{Register, SHUTDOWN};

/// Blocking access to the sensor's 16-bit registers.
///
/// The ranging engine only talks to the device through this trait, so the
/// search can be exercised against a simulated sensor. [`I2cPort`] is the
/// implementation for real hardware.
pub trait RegisterPort {
    /// Error raised when a bus transaction cannot complete.
    type Error: core::fmt::Debug;

    /// Reads the register with the given command code.
    ///
    /// # Errors
    ///
    /// Returns the bus error if the transaction is not acknowledged or the read is short.
    fn read_register(&mut self, command: u8) -> Result<u16, Self::Error>;

    /// Writes `value` to the register with the given command code.
    ///
    /// # Errors
    ///
    /// Returns the bus error if the transaction is not acknowledged.
    fn write_register(&mut self, command: u8, value: u16) -> Result<(), Self::Error>;

    /// Blocks for at least `ms` milliseconds.
    fn sleep_ms(&mut self, ms: u32);

    /// Sets or clears the `ALS_SD` bit, leaving the rest of `ALS_CONF` untouched.
    ///
    /// # Errors
    ///
    /// Returns the bus error of the read or the write.
    fn set_shutdown(&mut self, enabled: bool) -> Result<(), Self::Error> {
        let config = self.read_register(Register::AlsConf.into())?;
        let config = if enabled {
            config | SHUTDOWN
        } else {
            config & !SHUTDOWN
        };
        self.write_register(Register::AlsConf.into(), config)
    }
}

impl<P: RegisterPort + ?Sized> RegisterPort for &mut P {
    type Error = P::Error;

    fn read_register(&mut self, command: u8) -> Result<u16, Self::Error> {
        (**self).read_register(command)
    }

    fn write_register(&mut self, command: u8, value: u16) -> Result<(), Self::Error> {
        (**self).write_register(command, value)
    }

    fn sleep_ms(&mut self, ms: u32) {
        (**self).sleep_ms(ms);
    }

    fn set_shutdown(&mut self, enabled: bool) -> Result<(), Self::Error> {
        (**self).set_shutdown(enabled)
    }
}

/// [`RegisterPort`] over an `embedded-hal` I2C bus and delay.
///
/// Registers travel little-endian: the command byte, then LSB, then MSB.
pub struct I2cPort<I2C, D> {
    i2c: I2C,
    address: u8,
    delay: D,
}

impl<I2C, D> I2cPort<I2C, D> {
    /// Wraps a bus and delay for the device at `address`.
    pub fn new(i2c: I2C, delay: D, address: u8) -> Self {
        Self {
            i2c,
            address,
            delay,
        }
    }

    /// 7-bit I2C address the port talks to.
    #[must_use]
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Gives back the bus and the delay.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }
}

impl<I2C, E, D> RegisterPort for I2cPort<I2C, D>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
    D: DelayNs,
{
    type Error = E;

    fn read_register(&mut self, command: u8) -> Result<u16, E> {
        let mut read_buffer = [0u8; 2];
        self.i2c
            .write_read(self.address, &[command], &mut read_buffer)?;
        let value = u16::from_le_bytes(read_buffer);
        trace!("read  reg {} = 0x{:04X}", command, value);
        Ok(value)
    }

    fn write_register(&mut self, command: u8, value: u16) -> Result<(), E> {
        trace!("write reg {} = 0x{:04X}", command, value);
        let [lsb, msb] = value.to_le_bytes();
        self.i2c.write(self.address, &[command, lsb, msb])
    }

    fn sleep_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}
