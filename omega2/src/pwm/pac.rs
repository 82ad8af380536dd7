use super::Channel;
use crate::clock::ClockMode;

/// PWM enable register, one bit per channel.
pub const PWM_ENABLE: u32 = 0x1000_5000;

/// Distance between the register blocks of two channels.
pub const CHANNEL_STRIDE: u32 = 0x40;

/// Control: new pwm mode.
const CON_NEW_MODE: u32 = 0x0200;
/// Control: "8-bit position", undocumented but required.
const CON_BIT_POSITION: u32 = 0x0800;
/// Control: 40MHz clock family when set, 100kHz when clear.
const CON_FAST_CLOCK: u32 = 0x0008;
/// Control: divider exponent.
const CON_DIVIDER: u32 = 0x0007;

/// Send data pattern for a regular two-level waveform.
pub const SEND_DATA_PWM: u32 = 0xAAAA_AAAA;
/// Send data pattern forcing the output low.
pub const SEND_DATA_LOW: u32 = 0x0000_0000;
/// Send data pattern forcing the output high.
pub const SEND_DATA_HIGH: u32 = 0xFFFF_FFFF;

/// Per-channel registers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Register {
    Control,
    HighDuration,
    LowDuration,
    GuardDuration,
    SendData0,
    SendData1,
    WaveNumber,
}

impl Register {
    /// Address of this register for channel 0.
    #[rustfmt::skip]
    #[inline]
    pub fn base(self) -> u32 {
        match self {
            Register::Control       => 0x1000_5010,
            Register::HighDuration  => 0x1000_5014,
            Register::LowDuration   => 0x1000_5018,
            Register::GuardDuration => 0x1000_501C,
            Register::SendData0     => 0x1000_5030,
            Register::SendData1     => 0x1000_5034,
            Register::WaveNumber    => 0x1000_5038,
        }
    }

    /// Address of this register for the given channel.
    #[inline]
    pub fn address(self, channel: Channel) -> u32 {
        self.base() + CHANNEL_STRIDE * channel as u32
    }
}

/// Control register word for the given clock.
#[inline]
pub(crate) fn control_word(mode: ClockMode, divider: u8) -> u32 {
    let fast = match mode {
        ClockMode::Fast => CON_FAST_CLOCK,
        ClockMode::Slow => 0,
    };
    CON_NEW_MODE | CON_BIT_POSITION | fast | (divider as u32 & CON_DIVIDER)
}

/// Clock family and divider from a control register word.
#[inline]
pub(crate) fn decode_control(word: u32) -> (ClockMode, u8) {
    let mode = if (word & CON_FAST_CLOCK) > 0 {
        ClockMode::Fast
    } else {
        ClockMode::Slow
    };
    (mode, (word & CON_DIVIDER) as u8)
}
