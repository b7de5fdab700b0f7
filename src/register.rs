//! Register map and configuration-register bit layout of the VEML7700.
//!
//! ```text
//! #  NAME     | 15 14 13 12 11 10  9  8  7  6  5  4  3  2  1  0
//! 0  ALS_CONF |  0  0  0 [GAIN]  0 [   IT    ] [PERS]  0  0 IE SD
//! 1  ALS_WH   | high threshold window
//! 2  ALS_WL   | low threshold window
//! 3  PSM      | reserved <15:3>, PSM <2:1>, PSM_EN <0>
//! 4  ALS      | 16 bit ALS count
//! 5  WHITE    | 16 bit WHITE count
//! 6  ALS_INT  | int_th_low <15>, int_th_high <14>
//! 7  ID       | slave address option <15:8>, device id 0x81 <7:0>
//! ```

/// Command codes of the VEML7700 16-bit registers.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// ALS configuration: gain, integration time, persistence, interrupt enable, shutdown (0)
    AlsConf = 0,
    /// ALS high threshold window (1)
    AlsWindowHigh = 1,
    /// ALS low threshold window (2)
    AlsWindowLow = 2,
    /// Power saving mode (3)
    PowerSaving = 3,
    /// ALS channel output count (4)
    Als = 4,
    /// WHITE channel output count (5)
    White = 5,
    /// ALS threshold interrupt status (6)
    AlsInterrupt = 6,
    /// Device identification (7)
    Id = 7,
}

impl From<Register> for u8 {
    fn from(r: Register) -> Self {
        r as u8
    }
}

/// Bit offset of the 2-bit gain field in `ALS_CONF`.
pub const GAIN_SHIFT: u16 = 11;
/// Mask of the gain field in `ALS_CONF`, bits 11..=12.
pub const GAIN_MASK: u16 = 0b11 << GAIN_SHIFT;
/// Bit offset of the 4-bit integration time field in `ALS_CONF`.
pub const TIME_SHIFT: u16 = 6;
/// Mask of the integration time field in `ALS_CONF`, bits 6..=9.
pub const TIME_MASK: u16 = 0b1111 << TIME_SHIFT;
/// Mask of the persistence protect field in `ALS_CONF`, bits 4..=5.
pub const PERSISTENCE_MASK: u16 = 0b11 << 4;
/// Interrupt enable bit of `ALS_CONF`.
pub const INTERRUPT_ENABLE: u16 = 1 << 1;
/// Shutdown bit of `ALS_CONF`.
pub const SHUTDOWN: u16 = 1 << 0;

/// Fixed device id reported in the low byte of the `ID` register.
pub const DEVICE_ID: u8 = 0x81;

/// `ALS_CONF` written during priming: gain x1/8, 100 ms, interrupt disabled, powered on.
pub const PRIMED_CONFIGURATION: u16 = 0x1000;

/// Extracts the raw gain code from an `ALS_CONF` value.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn gain_field(config: u16) -> u8 {
    ((config & GAIN_MASK) >> GAIN_SHIFT) as u8
}

/// Extracts the raw integration time code from an `ALS_CONF` value.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn time_field(config: u16) -> u8 {
    ((config & TIME_MASK) >> TIME_SHIFT) as u8
}

/// Replaces the gain and integration time fields of `config`, leaving every other bit as is.
#[must_use]
pub fn with_gain_time(config: u16, gain_code: u8, time_code: u8) -> u16 {
    (config & !(GAIN_MASK | TIME_MASK))
        | ((u16::from(gain_code) << GAIN_SHIFT) & GAIN_MASK)
        | ((u16::from(time_code) << TIME_SHIFT) & TIME_MASK)
}
