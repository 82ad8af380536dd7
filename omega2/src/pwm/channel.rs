use super::pac;
use crate::clock::ClockMode;
use crate::error::{Error, Result};

/// PWM channel.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    C0 = 0,
    C1 = 1,
    C2 = 2,
    C3 = 3,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::C0, Channel::C1, Channel::C2, Channel::C3];

    /// Bit of this channel in the enable register.
    #[inline]
    pub fn mask(self) -> u32 {
        1 << self as u8
    }
}

impl TryFrom<u8> for Channel {
    type Error = Error;

    fn try_from(nr: u8) -> Result<Self> {
        Channel::ALL
            .get(nr as usize)
            .copied()
            .ok_or(Error::InvalidChannel(nr))
    }
}

impl core::fmt::Display for Channel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PWM{}", *self as u8)
    }
}

/// Channel configuration as read back from the hardware.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelState {
    pub enabled: bool,
    pub mode: ClockMode,
    pub divider: u8,
    pub high: u32,
    pub low: u32,
    /// Send data 0 pattern.
    pub pattern: u32,
}

impl ChannelState {
    /// Effective tick rate in Hertz.
    #[inline]
    pub fn clock_hz(&self) -> u32 {
        self.mode.speed() >> self.divider
    }

    /// Ticks per period, may exceed `u32`.
    #[inline]
    fn period(&self) -> u64 {
        self.high as u64 + self.low as u64
    }

    /// Output frequency in Hertz, [None] for an empty period.
    pub fn frequency(&self) -> Option<u32> {
        match self.period() {
            0 => None,
            period => Some((self.clock_hz() as u64 / period) as u32),
        }
    }

    /// Duty [%], taking the forced low/high patterns into account.
    pub fn duty(&self) -> Option<u8> {
        match self.pattern {
            pac::SEND_DATA_LOW => Some(0),
            pac::SEND_DATA_HIGH => Some(100),
            _ => match self.period() {
                0 => None,
                period => Some((self.high as u64 * 100 / period) as u8),
            },
        }
    }
}
