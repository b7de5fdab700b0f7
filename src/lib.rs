//! # VEML7700 Ambient Light Sensor Driver with Auto-Ranging
//!
//! This crate provides a blocking, `no_std` driver for Vishay's VEML7700
//! ambient light sensor. A fixed gain / integration time setting only covers
//! a narrow slice of the sensor's dynamic range, so [`Veml7700::measure`]
//! searches the 4 x 6 table of settings until the ALS count falls in a usable
//! window, then converts both channels to lux with the resolution of the
//! setting it ended on.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use veml7700_autorange::Veml7700;
//!
//! let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
//! let delay = embedded_hal_mock::eh1::delay::NoopDelay;
//! let mut sensor = Veml7700::new(i2c, delay);
//!
//! // Check the sensor is there and put it in a known state, once.
//! let id = sensor.init().unwrap();
//! println!("ID: 0x{:04X}", id);
//!
//! let reading = sensor.measure().unwrap();
//! println!("ALS: {} lx, WHITE: {} lx", reading.als, reading.white);
//! ```
//!
//! ## Without a bus
//!
//! [`RangingEngine`] only needs a [`RegisterPort`], so the search can run
//! against anything that can read and write 16-bit registers and sleep.
//! Pass a [`RangingObserver`] to follow each pass of the search.
//!
//! ## Features
//!
//! * `log` - emit diagnostics through the `log` crate
//! * `defmt` - emit diagnostics through `defmt` and derive `defmt::Format` on public types
#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod fmt; // <-- must be first module!

mod device;
pub mod port;
pub mod ranging;
pub mod register;
pub mod setting;

pub use device::{Veml7700, DEFAULT_ADDRESS};
pub use port::{I2cPort, RegisterPort};
pub use ranging::{RangingEngine, RangingObserver, Termination, Verdict};
pub use register::Register;
pub use setting::{CalibratedReading, GainTimeSetting, RawReading};

/// Error type for VEML7700 operations.
///
/// # Examples
///
/// ```rust,no_run
/// use veml7700_autorange::Error;
///
/// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
/// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
/// let mut sensor = veml7700_autorange::Veml7700::new(i2c, delay);
///
/// match sensor.init() {
///     Ok(id) => println!("Sensor ID 0x{:04X}", id),
///     Err(Error::DeviceAbsent) => println!("No sensor answered"),
///     Err(Error::InvalidArgument) => println!("Invalid parameter provided"),
///     Err(Error::Bus(e)) => println!("I2C communication error: {:?}", e),
/// }
/// ```
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E: core::fmt::Debug> {
    /// A register read or write did not complete
    Bus(E),
    /// The identification register could not be read
    DeviceAbsent,
    /// Invalid parameter value provided
    InvalidArgument,
}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl<E: core::fmt::Debug> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Error::Bus(error)
    }
}
