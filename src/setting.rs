//! Gain / integration time tables and the readings derived from them.
//!
//! Both tables are ordered from least to most sensitive, so a larger index
//! always means more signal per count. The hardware codes themselves are not
//! monotonic in that order and must be kept exactly as listed.

use crate::register;

/// Number of selectable gains.
pub const GAIN_COUNT: usize = 4;
/// Number of selectable integration times.
pub const TIME_COUNT: usize = 6;

/// `ALS_GAIN` codes by gain index: x1/8, x1/4, x1, x2.
pub const GAIN_CODES: [u8; GAIN_COUNT] = [0b10, 0b11, 0b00, 0b01];

/// `ALS_IT` codes by time index: 25, 50, 100, 200, 400, 800 ms.
pub const TIME_CODES: [u8; TIME_COUNT] = [0b1100, 0b1000, 0b0000, 0b0001, 0b0010, 0b0011];

/// Nominal integration time in milliseconds by time index.
pub const INTEGRATION_TIME_MS: [u16; TIME_COUNT] = [25, 50, 100, 200, 400, 800];

/// Minimum wait after a configuration change before the counts reflect it, by time index.
pub const SETTLE_DELAY_MS: [u16; TIME_COUNT] = [25, 50, 100, 200, 400, 800];

/// Extra wait added to every settle delay for the sensor's internal refresh.
pub const SETTLE_MARGIN_MS: u32 = 100;

/// Denominator of [`RESOLUTION`]: coefficients are stored in units of 0.0001 lx per count.
pub const RESOLUTION_SCALE: u32 = 10_000;

/// Lux per count, scaled by [`RESOLUTION_SCALE`], indexed `[gain_index][time_index]`.
///
/// Stored as integers so conversion rounds exactly; every entry is 0.0042 lx
/// times a power of two.
pub const RESOLUTION: [[u32; TIME_COUNT]; GAIN_COUNT] = [
    [21504, 10752, 5376, 2688, 1344, 672],
    [10752, 5376, 2688, 1344, 672, 336],
    [2688, 1344, 672, 336, 168, 84],
    [1344, 672, 336, 168, 84, 42],
];

/// A position in the gain / integration time table.
///
/// Always holds valid indices into [`GAIN_CODES`] and [`TIME_CODES`], never raw
/// hardware codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GainTimeSetting {
    pub(crate) gain_index: u8,
    pub(crate) time_index: u8,
}

impl GainTimeSetting {
    /// Gain x1/8, 25 ms.
    pub const LEAST_SENSITIVE: Self = Self {
        gain_index: 0,
        time_index: 0,
    };

    /// Gain x2, 800 ms.
    pub const MOST_SENSITIVE: Self = Self {
        gain_index: 3,
        time_index: 5,
    };

    /// The 100 ms tier the search returns to before touching the gain.
    pub const HOME_TIME_INDEX: u8 = 2;

    /// Creates a setting from table indices, or `None` if either is out of range.
    #[must_use]
    pub fn new(gain_index: u8, time_index: u8) -> Option<Self> {
        if usize::from(gain_index) < GAIN_COUNT && usize::from(time_index) < TIME_COUNT {
            Some(Self {
                gain_index,
                time_index,
            })
        } else {
            None
        }
    }

    /// Recovers the setting encoded in a live `ALS_CONF` value.
    ///
    /// A field holding a code that is not in the table falls back to index 0.
    /// That can hide a misconfigured device, so the fallback is logged.
    #[must_use]
    pub fn from_config(config: u16) -> Self {
        let gain_code = register::gain_field(config);
        let time_code = register::time_field(config);

        let gain_index = index_of(&GAIN_CODES, gain_code).unwrap_or_else(|| {
            warn!("Unknown gain code {} in ALS_CONF 0x{:04X}, using index 0", gain_code, config);
            0
        });
        let time_index = index_of(&TIME_CODES, time_code).unwrap_or_else(|| {
            warn!("Unknown time code {} in ALS_CONF 0x{:04X}, using index 0", time_code, config);
            0
        });

        Self {
            gain_index,
            time_index,
        }
    }

    /// Index into the gain table, 0 (x1/8) ..= 3 (x2).
    #[must_use]
    pub fn gain_index(self) -> u8 {
        self.gain_index
    }

    /// Index into the integration time table, 0 (25 ms) ..= 5 (800 ms).
    #[must_use]
    pub fn time_index(self) -> u8 {
        self.time_index
    }

    /// Hardware code for the `ALS_GAIN` field.
    #[must_use]
    pub fn gain_code(self) -> u8 {
        GAIN_CODES[usize::from(self.gain_index)]
    }

    /// Hardware code for the `ALS_IT` field.
    #[must_use]
    pub fn time_code(self) -> u8 {
        TIME_CODES[usize::from(self.time_index)]
    }

    /// Integration time in milliseconds.
    #[must_use]
    pub fn integration_time_ms(self) -> u16 {
        INTEGRATION_TIME_MS[usize::from(self.time_index)]
    }

    /// Total time to wait after applying this setting, margin included.
    #[must_use]
    pub fn settle_time_ms(self) -> u32 {
        u32::from(SETTLE_DELAY_MS[usize::from(self.time_index)]) + SETTLE_MARGIN_MS
    }

    /// Resolution coefficient in units of 1 / [`RESOLUTION_SCALE`] lux per count.
    #[must_use]
    pub fn resolution_scaled(self) -> u32 {
        RESOLUTION[usize::from(self.gain_index)][usize::from(self.time_index)]
    }

    /// Resolution coefficient in lux per count.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn resolution(self) -> f32 {
        self.resolution_scaled() as f32 / RESOLUTION_SCALE as f32
    }

    /// Both indices sit at the same end of their tables; no further range is available.
    #[must_use]
    pub fn is_exhausted(self) -> bool {
        self == Self::LEAST_SENSITIVE || self == Self::MOST_SENSITIVE
    }

    /// Converts counts taken under this setting to lux.
    #[must_use]
    pub fn calibrate(self, raw: RawReading) -> CalibratedReading {
        let scaled = self.resolution_scaled();
        CalibratedReading {
            als: scale_count(raw.als, scaled),
            white: scale_count(raw.white, scaled),
        }
    }
}

/// Counts of both channels taken under one setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawReading {
    /// ALS channel count
    pub als: u16,
    /// WHITE channel count
    pub white: u16,
}

/// Calibrated illuminance of both channels, rounded to whole lux.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibratedReading {
    /// ALS channel in lux
    pub als: u32,
    /// WHITE channel in lux
    pub white: u32,
}

#[allow(clippy::cast_possible_truncation)]
fn index_of(codes: &[u8], code: u8) -> Option<u8> {
    codes.iter().position(|&c| c == code).map(|i| i as u8)
}

// Round half up; counts and coefficients are never negative.
fn scale_count(count: u16, scaled: u32) -> u32 {
    (u32::from(count) * scaled + RESOLUTION_SCALE / 2) / RESOLUTION_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::cast_possible_truncation)]
    fn all_settings() -> impl Iterator<Item = GainTimeSetting> {
        (0..GAIN_COUNT as u8).flat_map(|g| {
            (0..TIME_COUNT as u8).map(move |t| GainTimeSetting::new(g, t).unwrap())
        })
    }

    #[test]
    fn every_coefficient_is_positive() {
        for setting in all_settings() {
            assert!(setting.resolution_scaled() > 0);
            assert!(setting.resolution() > 0.0);
        }
    }

    #[test]
    fn coefficients_shrink_with_sensitivity() {
        for row in &RESOLUTION {
            assert!(row.windows(2).all(|w| w[0] > w[1]));
        }
        for t in 0..TIME_COUNT {
            assert!((1..GAIN_COUNT).all(|g| RESOLUTION[g - 1][t] > RESOLUTION[g][t]));
        }
    }

    #[test]
    fn coefficients_match_datasheet_values() {
        let s = GainTimeSetting::new(2, 2).unwrap();
        assert!((s.resolution() - 0.0672).abs() < 1e-6);
        assert!((GainTimeSetting::LEAST_SENSITIVE.resolution() - 2.1504).abs() < 1e-6);
        assert!((GainTimeSetting::MOST_SENSITIVE.resolution() - 0.0042).abs() < 1e-6);
    }

    #[test]
    fn new_rejects_out_of_range_indices() {
        assert!(GainTimeSetting::new(4, 0).is_none());
        assert!(GainTimeSetting::new(0, 6).is_none());
        assert_eq!(
            GainTimeSetting::new(3, 5),
            Some(GainTimeSetting::MOST_SENSITIVE)
        );
    }

    #[test]
    fn from_config_reverse_maps_codes() {
        for setting in all_settings() {
            let config = register::with_gain_time(0x0032, setting.gain_code(), setting.time_code());
            assert_eq!(GainTimeSetting::from_config(config), setting);
        }
    }

    #[test]
    fn from_config_falls_back_to_index_zero_for_unknown_time_code() {
        // 0b0111 is not a valid ALS_IT code; gain 0b00 is index 2.
        let config = register::with_gain_time(0, 0b00, 0b0111);
        let setting = GainTimeSetting::from_config(config);
        assert_eq!(setting.gain_index(), 2);
        assert_eq!(setting.time_index(), 0);
    }

    #[test]
    fn settle_time_includes_margin() {
        assert_eq!(GainTimeSetting::MOST_SENSITIVE.settle_time_ms(), 900);
        assert_eq!(GainTimeSetting::LEAST_SENSITIVE.settle_time_ms(), 125);
    }

    #[test]
    fn calibrate_rounds_half_up() {
        let s = GainTimeSetting::new(2, 2).unwrap();
        let lux = s.calibrate(RawReading {
            als: 5000,
            white: 5,
        });
        // 5000 * 0.0672 = 336, 5 * 0.0672 = 0.336
        assert_eq!(lux, CalibratedReading { als: 336, white: 0 });

        let s = GainTimeSetting::new(1, 2).unwrap();
        let lux = s.calibrate(RawReading {
            als: 2000,
            white: 2500,
        });
        // 537.6 rounds up, 672.0 is exact
        assert_eq!(lux, CalibratedReading { als: 538, white: 672 });

        // 2500 * 0.0042 = 10.5
        let lux = GainTimeSetting::MOST_SENSITIVE.calibrate(RawReading {
            als: 2500,
            white: 0,
        });
        assert_eq!(lux, CalibratedReading { als: 11, white: 0 });

        let s = GainTimeSetting::new(3, 0).unwrap();
        let lux = s.calibrate(RawReading {
            als: 625,
            white: u16::MAX,
        });
        // 625 * 0.1344 = 84.0, 65535 * 0.1344 = 8807.904
        assert_eq!(lux, CalibratedReading { als: 84, white: 8808 });
    }

    #[test]
    fn calibrate_saturated_count_does_not_overflow() {
        let lux = GainTimeSetting::LEAST_SENSITIVE.calibrate(RawReading {
            als: u16::MAX,
            white: u16::MAX,
        });
        // 65535 * 2.1504 = 140926.464
        assert_eq!(lux.als, 140_926);
    }

    #[test]
    fn exhausted_only_at_corners() {
        assert!(GainTimeSetting::LEAST_SENSITIVE.is_exhausted());
        assert!(GainTimeSetting::MOST_SENSITIVE.is_exhausted());
        assert!(!GainTimeSetting::new(3, 0).unwrap().is_exhausted());
        assert!(!GainTimeSetting::new(0, 5).unwrap().is_exhausted());
    }
}
