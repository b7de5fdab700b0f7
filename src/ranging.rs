//! Auto-ranging search over gain and integration time.
//!
//! The policy half of this module ([`evaluate`], [`next_setting`]) is pure and
//! knows nothing about the bus. [`RangingEngine`] drives it against a
//! [`RegisterPort`]: sample, evaluate, adjust, apply, settle, and finally
//! convert the last sample with the coefficient of the setting it was taken
//! under.

use crate::{
    port::RegisterPort,
    register::{self, Register},
    setting::{CalibratedReading, GainTimeSetting, RawReading, GAIN_COUNT, TIME_COUNT},
    Error,
};

/// Lowest ALS count accepted without adjusting.
pub const LOW_COUNT: u16 = 1000;
/// Highest ALS count accepted without adjusting.
pub const HIGH_COUNT: u16 = 10_000;
/// Upper bound on sample/adjust passes in one [`RangingEngine::measure`].
pub const MAX_ATTEMPTS: u8 = 24;

/// Where an ALS count falls relative to the target window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Verdict {
    /// `LOW_COUNT..=HIGH_COUNT`
    InRange,
    /// Below the window, more sensitivity needed
    TooDim,
    /// Above the window, less sensitivity needed
    TooBright,
}

/// Why the search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Termination {
    /// The count landed in the window.
    InRange,
    /// The setting reached a corner of the table.
    Exhausted,
    /// [`MAX_ATTEMPTS`] passes ran without settling.
    BudgetSpent,
}

/// Classifies an ALS count against the inclusive target window.
#[must_use]
pub fn evaluate(count: u16) -> Verdict {
    if count < LOW_COUNT {
        Verdict::TooDim
    } else if count > HIGH_COUNT {
        Verdict::TooBright
    } else {
        Verdict::InRange
    }
}

/// Picks the setting to try after a sample with the given verdict.
///
/// The integration time is first moved to the 100 ms tier, then the gain is
/// stepped, and only once the gain is at its end is the time stepped further.
/// Returns `setting` unchanged when the verdict is in range or no step is left
/// in the requested direction.
#[must_use]
pub fn next_setting(setting: GainTimeSetting, verdict: Verdict) -> GainTimeSetting {
    const HOME: u8 = GainTimeSetting::HOME_TIME_INDEX;
    #[allow(clippy::cast_possible_truncation)]
    const MAX_GAIN: u8 = GAIN_COUNT as u8 - 1;
    #[allow(clippy::cast_possible_truncation)]
    const MAX_TIME: u8 = TIME_COUNT as u8 - 1;

    let GainTimeSetting {
        mut gain_index,
        mut time_index,
    } = setting;

    match verdict {
        Verdict::InRange => {}
        Verdict::TooDim => {
            if time_index < HOME {
                time_index = HOME;
            } else if gain_index < MAX_GAIN {
                gain_index += 1;
            } else if time_index < MAX_TIME {
                time_index += 1;
            }
        }
        Verdict::TooBright => {
            if time_index > HOME {
                time_index -= 1;
            } else if gain_index > 0 {
                gain_index -= 1;
            } else if time_index > 0 {
                time_index -= 1;
            }
        }
    }

    GainTimeSetting {
        gain_index,
        time_index,
    }
}

/// Receives a trace of each ranging pass.
///
/// All methods default to doing nothing; `()` is the silent observer.
pub trait RangingObserver {
    /// A sample was taken under `setting` on pass `attempt` (0-based).
    fn on_sample(&mut self, attempt: u8, setting: GainTimeSetting, raw: RawReading) {
        let _ = (attempt, setting, raw);
    }

    /// The search is about to apply `to` in place of `from`.
    fn on_adjust(&mut self, from: GainTimeSetting, to: GainTimeSetting) {
        let _ = (from, to);
    }

    /// The final sample was converted.
    fn on_finish(
        &mut self,
        termination: Termination,
        setting: GainTimeSetting,
        raw: RawReading,
        reading: CalibratedReading,
    ) {
        let _ = (termination, setting, raw, reading);
    }
}

impl RangingObserver for () {}

impl<O: RangingObserver + ?Sized> RangingObserver for &mut O {
    fn on_sample(&mut self, attempt: u8, setting: GainTimeSetting, raw: RawReading) {
        (**self).on_sample(attempt, setting, raw);
    }

    fn on_adjust(&mut self, from: GainTimeSetting, to: GainTimeSetting) {
        (**self).on_adjust(from, to);
    }

    fn on_finish(
        &mut self,
        termination: Termination,
        setting: GainTimeSetting,
        raw: RawReading,
        reading: CalibratedReading,
    ) {
        (**self).on_finish(termination, setting, raw, reading);
    }
}

/// Reads the gain / integration time currently live on the device.
///
/// # Errors
///
/// * `Err(Error::Bus(E))` - If the configuration register could not be read
pub fn read_gain_time<P: RegisterPort>(port: &mut P) -> Result<GainTimeSetting, Error<P::Error>> {
    let config = port.read_register(Register::AlsConf.into())?;
    Ok(GainTimeSetting::from_config(config))
}

/// Applies `setting` to the device.
///
/// The sensor is shut down while the gain and time fields of `ALS_CONF` are
/// rewritten, then woken. Persistence, interrupt enable and reserved bits keep
/// their live values. No settle delay is inserted.
///
/// # Errors
///
/// * `Err(Error::Bus(E))` - If any register access failed; the device may be left shut down
pub fn write_gain_time<P: RegisterPort>(
    port: &mut P,
    setting: GainTimeSetting,
) -> Result<(), Error<P::Error>> {
    port.set_shutdown(true)?;
    let config = port.read_register(Register::AlsConf.into())?;
    let config = register::with_gain_time(config, setting.gain_code(), setting.time_code());
    port.write_register(Register::AlsConf.into(), config)?;
    port.set_shutdown(false)?;
    Ok(())
}

/// Reads the ALS and WHITE counts, in that order.
///
/// # Errors
///
/// * `Err(Error::Bus(E))` - If either data register could not be read
pub fn read_raw<P: RegisterPort>(port: &mut P) -> Result<RawReading, Error<P::Error>> {
    let als = port.read_register(Register::Als.into())?;
    let white = port.read_register(Register::White.into())?;
    Ok(RawReading { als, white })
}

/// Drives the auto-ranging search on one device.
///
/// The engine assumes exclusive use of the device for the duration of
/// [`measure`](Self::measure); callers sharing a device must serialize.
pub struct RangingEngine<P, O = ()> {
    port: P,
    observer: O,
    setting: Option<GainTimeSetting>,
}

impl<P: RegisterPort> RangingEngine<P> {
    /// Creates an engine without an observer.
    pub fn new(port: P) -> Self {
        Self::with_observer(port, ())
    }
}

impl<P: RegisterPort, O: RangingObserver> RangingEngine<P, O> {
    /// Creates an engine that reports every pass to `observer`.
    pub fn with_observer(port: P, observer: O) -> Self {
        Self {
            port,
            observer,
            setting: None,
        }
    }

    /// The setting last applied or read back, `None` before the first measurement.
    #[must_use]
    pub fn setting(&self) -> Option<GainTimeSetting> {
        self.setting
    }

    /// The observer passed at construction.
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Gives back the port and the observer.
    pub fn release(self) -> (P, O) {
        (self.port, self.observer)
    }

    /// Ranges the sensor and returns calibrated illuminance.
    ///
    /// Starts from the setting read back from the device, and adjusts it until
    /// the ALS count falls within `LOW_COUNT..=HIGH_COUNT`, a corner of the
    /// table is reached, or [`MAX_ATTEMPTS`] passes have run. The last two
    /// cases still return a reading taken under the final setting.
    ///
    /// # Errors
    ///
    /// * `Err(Error::Bus(E))` - If any register access failed. The device
    ///   configuration is left as the failing access left it.
    pub fn measure(&mut self) -> Result<CalibratedReading, Error<P::Error>> {
        let mut setting = read_gain_time(&mut self.port)?;
        self.setting = Some(setting);

        let mut termination = Termination::BudgetSpent;
        for attempt in 0..MAX_ATTEMPTS {
            let raw = read_raw(&mut self.port)?;
            debug!(
                "Attempt #{} ALS={} WHITE={} gain_idx={} time_idx={}",
                attempt,
                raw.als,
                raw.white,
                setting.gain_index(),
                setting.time_index()
            );
            self.observer.on_sample(attempt, setting, raw);

            let verdict = evaluate(raw.als);
            if verdict == Verdict::InRange {
                termination = Termination::InRange;
                break;
            }

            let next = next_setting(setting, verdict);
            self.observer.on_adjust(setting, next);
            write_gain_time(&mut self.port, next)?;
            setting = next;
            self.setting = Some(setting);
            self.port.sleep_ms(setting.settle_time_ms());

            if setting.is_exhausted() {
                termination = Termination::Exhausted;
                break;
            }
        }

        if termination == Termination::BudgetSpent {
            warn!("Ranging gave up after {} attempts", MAX_ATTEMPTS);
        }

        let raw = read_raw(&mut self.port)?;
        let reading = setting.calibrate(raw);
        debug!(
            "ALS={} WHITE={} gain_idx={} time_idx={} lux={} white_lux={}",
            raw.als,
            raw.white,
            setting.gain_index(),
            setting.time_index(),
            reading.als,
            reading.white
        );
        self.observer.on_finish(termination, setting, raw, reading);
        Ok(reading)
    }
}
