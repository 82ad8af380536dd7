//! PWM clock sources and timing search.

use crate::error::{Error, Result};

/// Fast clock source in Hertz.
pub const FAST_CLOCK_HZ: u32 = 40_000_000;

/// Slow clock source in Hertz.
pub const SLOW_CLOCK_HZ: u32 = 100_000;

/// Largest divider exponent, the fast clock is divided by at most `2^7`.
pub const MAX_DIVIDER: u8 = 7;

/// Largest period in ticks the hardware handles reliably (found empirically).
pub const MAX_DURATION: u32 = 15_000;

/// PWM clock family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockMode {
    /// 40MHz source, divider applies.
    Fast,
    /// 100kHz source, always undivided.
    Slow,
}

impl ClockMode {
    /// Undivided source speed in Hertz.
    #[inline]
    pub fn speed(self) -> u32 {
        match self {
            ClockMode::Fast => FAST_CLOCK_HZ,
            ClockMode::Slow => SLOW_CLOCK_HZ,
        }
    }
}

/// Timing parameters for one PWM waveform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    pub mode: ClockMode,
    /// Divider exponent, always 0 for [ClockMode::Slow].
    pub divider: u8,
    /// Ticks per period.
    pub duration: u32,
    /// Ticks in the high phase.
    pub high: u32,
    /// Ticks in the low phase.
    pub low: u32,
    /// Requested duty [%].
    pub duty: u8,
}

impl Timing {
    /// Finds the clock, divider and durations for `frequency` [Hz] at `duty` [%].
    ///
    /// Picks the smallest divider of the fast clock that keeps the period within
    /// [MAX_DURATION], falling back to the slow clock for low frequencies.
    ///
    /// Returns [Err] for a zero frequency, a duty above 100, or a frequency above
    /// [FAST_CLOCK_HZ] (which would yield a zero-length period).
    pub fn new(frequency: u32, duty: u8) -> Result<Self> {
        if frequency == 0 {
            return Err(Error::ZeroFrequency);
        }
        if duty > 100 {
            return Err(Error::InvalidDuty(duty));
        }
        if frequency > FAST_CLOCK_HZ {
            return Err(Error::FrequencyTooHigh(frequency));
        }

        let (mode, divider, duration) = search(frequency);
        let (high, low) = split(duration, duty);
        log::debug!("{} ticks high, {} ticks low", high, low);

        Ok(Self {
            mode,
            divider,
            duration,
            high,
            low,
            duty,
        })
    }

    /// Effective tick rate in Hertz.
    #[inline]
    pub fn clock_hz(&self) -> u32 {
        self.mode.speed() >> self.divider
    }

    /// Output frequency actually produced, in Hertz.
    #[inline]
    pub fn actual_frequency(&self) -> u32 {
        self.clock_hz() / self.duration.max(1)
    }
}

/// Period in ticks of `frequency` on `speed` divided by `2^divider`.
#[inline]
fn duration(speed: u32, divider: u8, frequency: u32) -> u32 {
    (speed as u64 / ((1u64 << divider) * frequency as u64)) as u32
}

/// Divider search, assumes `0 < frequency <= FAST_CLOCK_HZ`.
fn search(frequency: u32) -> (ClockMode, u8, u32) {
    let mut divider = 0;
    let mut ticks = duration(FAST_CLOCK_HZ, divider, frequency);
    log::debug!("fast clock /{}: {} ticks", 1u32 << divider, ticks);

    while divider < MAX_DIVIDER && ticks > MAX_DURATION {
        divider += 1;
        ticks = duration(FAST_CLOCK_HZ, divider, frequency);
        log::debug!("fast clock /{}: {} ticks", 1u32 << divider, ticks);
    }

    if ticks <= MAX_DURATION {
        return (ClockMode::Fast, divider, ticks);
    }

    // Out of fast dividers.
    let ticks = duration(SLOW_CLOCK_HZ, 0, frequency);
    log::debug!("slow clock: {} ticks", ticks);
    if ticks > MAX_DURATION {
        log::warn!(
            "{}Hz needs {} ticks on the slow clock, above the {} tick limit",
            frequency,
            ticks,
            MAX_DURATION
        );
    }
    (ClockMode::Slow, 0, ticks)
}

/// Splits `duration` into high and low ticks.
///
/// Both halves truncate, the sum may fall one tick short of `duration`.
#[inline]
fn split(duration: u32, duty: u8) -> (u32, u32) {
    let duration = duration as u64;
    let duty = duty as u64;
    (
        (duration * duty / 100) as u32,
        (duration * (100 - duty) / 100) as u32,
    )
}
