//! PWM peripheral.
//!
//! Example usage:
//!
//! ```no_run
//! use omega2::devmem::DevMem;
//! use omega2::pwm::{Channel, Pwm};
//!
//! let mut pwm = Pwm::new(DevMem::open()?);
//!
//! // 1kHz at 25% duty on PWM1.
//! pwm.program(Channel::C1, 1000, 25)?;
//!
//! // Turn it off again.
//! pwm.disable(Channel::C1)?;
//! # Ok::<(), omega2::Error>(())
//! ```

mod channel;
pub mod pac;

pub use channel::{Channel, ChannelState};
pub use pac::Register;

use crate::clock::Timing;
use crate::devmem::Registers;
use crate::error::Result;

/// Requested waveform.
///
/// A zero frequency turns the channel off.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Frequency [Hz].
    pub frequency: u32,
    /// Duty [%] = [0...100]
    pub duty: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frequency: 0,
            duty: 50,
        }
    }
}

impl Config {
    /// Timing for this configuration, [None] when the channel should stay off.
    #[inline]
    pub fn timing(self) -> Result<Option<Timing>> {
        if self.frequency == 0 {
            return Ok(None);
        }
        Timing::new(self.frequency, self.duty).map(Some)
    }
}

/// PWM programmer.
///
/// Owns the register access session for as long as it lives.
pub struct Pwm<R> {
    registers: R,
}

impl<R: Registers> Pwm<R> {
    #[inline]
    pub fn new(registers: R) -> Self {
        Self { registers }
    }

    /// Releases the register access session.
    #[inline]
    pub fn free(self) -> R {
        self.registers
    }

    /// Programs `channel` to `frequency` [Hz] at `duty` [%].
    ///
    /// See [Pwm::configure].
    #[inline]
    pub fn program(
        &mut self,
        channel: Channel,
        frequency: u32,
        duty: u8,
    ) -> Result<Option<Timing>> {
        self.configure(channel, Config { frequency, duty })
    }

    /// Disables, reprograms and re-enables the channel.
    ///
    /// The channel is disabled before any other register is touched and enabled only after
    /// all of them are written, so it never outputs a half-configured waveform. A zero
    /// frequency leaves the channel disabled and returns [None].
    ///
    /// An unachievable request returns [Err] without touching the hardware.
    pub fn configure(&mut self, channel: Channel, config: Config) -> Result<Option<Timing>> {
        log::debug!(
            "Configuring {} with frequency {}Hz, duty {}%",
            channel,
            config.frequency,
            config.duty
        );
        let timing = config.timing()?;
        self.apply(channel, timing)
    }

    /// Writes an already computed timing, [None] leaves the channel disabled.
    ///
    /// Same register sequence as [Pwm::configure].
    pub fn apply(&mut self, channel: Channel, timing: Option<Timing>) -> Result<Option<Timing>> {
        self.disable(channel)?;

        let timing = match timing {
            Some(timing) => timing,
            None => return Ok(None),
        };

        let control = pac::control_word(timing.mode, timing.divider);
        log::debug!("{} control word {:#06x}", channel, control);

        self.write(Register::Control, channel, control)?;
        self.write(Register::HighDuration, channel, timing.high)?;
        self.write(Register::LowDuration, channel, timing.low)?;
        self.write(Register::GuardDuration, channel, 0)?;
        self.write(Register::SendData0, channel, pac::SEND_DATA_PWM)?;
        self.write(Register::SendData1, channel, pac::SEND_DATA_PWM)?;
        self.write(Register::WaveNumber, channel, 0)?;

        // Durations alone cannot express exactly 0% or 100%.
        let forced = match timing.duty {
            0 => Some(pac::SEND_DATA_LOW),
            100 => Some(pac::SEND_DATA_HIGH),
            _ => None,
        };
        if let Some(pattern) = forced {
            log::debug!("{} forced to {:#010x}", channel, pattern);
            self.write(Register::SendData0, channel, pattern)?;
            self.write(Register::SendData1, channel, pattern)?;
        }

        self.set_enabled(channel, true)?;
        Ok(Some(timing))
    }

    /// Clears the channel enable bit.
    #[inline]
    pub fn disable(&mut self, channel: Channel) -> Result<()> {
        self.set_enabled(channel, false)
    }

    /// Reads back the channel configuration.
    pub fn state(&mut self, channel: Channel) -> Result<ChannelState> {
        let enabled = (self.registers.read32(pac::PWM_ENABLE)? & channel.mask()) > 0;
        let (mode, divider) = pac::decode_control(self.read(Register::Control, channel)?);
        Ok(ChannelState {
            enabled,
            mode,
            divider,
            high: self.read(Register::HighDuration, channel)?,
            low: self.read(Register::LowDuration, channel)?,
            pattern: self.read(Register::SendData0, channel)?,
        })
    }

    fn set_enabled(&mut self, channel: Channel, enable: bool) -> Result<()> {
        let value = self.registers.read32(pac::PWM_ENABLE)?;
        let value = if enable {
            value | channel.mask()
        } else {
            value & !channel.mask()
        };
        self.registers.write32(pac::PWM_ENABLE, value)
    }

    #[inline]
    fn read(&mut self, register: Register, channel: Channel) -> Result<u32> {
        self.registers.read32(register.address(channel))
    }

    #[inline]
    fn write(&mut self, register: Register, channel: Channel, value: u32) -> Result<()> {
        self.registers.write32(register.address(channel), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockMode;
    use crate::error::Error;
    use std::collections::BTreeMap;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Access {
        Read(u32),
        Write(u32, u32),
    }

    /// Register file recording every access in order.
    #[derive(Default)]
    struct Fake {
        memory: BTreeMap<u32, u32>,
        log: Vec<Access>,
    }

    impl Fake {
        fn with_enable(enable: u32) -> Self {
            let mut fake = Self::default();
            fake.memory.insert(pac::PWM_ENABLE, enable);
            fake
        }

        fn writes(&self) -> Vec<(u32, u32)> {
            self.log
                .iter()
                .filter_map(|access| match *access {
                    Access::Write(address, value) => Some((address, value)),
                    Access::Read(_) => None,
                })
                .collect()
        }

        fn get(&self, address: u32) -> u32 {
            self.memory.get(&address).copied().unwrap_or(0)
        }
    }

    impl Registers for Fake {
        fn read32(&mut self, address: u32) -> Result<u32> {
            self.log.push(Access::Read(address));
            Ok(self.get(address))
        }

        fn write32(&mut self, address: u32, value: u32) -> Result<()> {
            self.log.push(Access::Write(address, value));
            self.memory.insert(address, value);
            Ok(())
        }
    }

    #[test]
    fn register_addresses() {
        assert_eq!(Register::Control.address(Channel::C0), 0x1000_5010);
        assert_eq!(Register::HighDuration.address(Channel::C1), 0x1000_5054);
        assert_eq!(Register::WaveNumber.address(Channel::C2), 0x1000_50b8);
        assert_eq!(Register::SendData1.address(Channel::C3), 0x1000_50f4);
    }

    #[test]
    fn written_registers_stay_in_channel_block() {
        const WRITTEN: [Register; 7] = [
            Register::Control,
            Register::HighDuration,
            Register::LowDuration,
            Register::GuardDuration,
            Register::SendData0,
            Register::SendData1,
            Register::WaveNumber,
        ];
        for channel in Channel::ALL {
            let block = pac::PWM_ENABLE + pac::CHANNEL_STRIDE * channel as u32;
            for register in WRITTEN {
                let address = register.address(channel);
                assert!(address > block && address < block + pac::CHANNEL_STRIDE);
            }
        }
    }

    #[test]
    fn channel_from_number() {
        assert_eq!(Channel::try_from(3).unwrap(), Channel::C3);
        assert!(matches!(Channel::try_from(4), Err(Error::InvalidChannel(4))));
    }

    #[test]
    fn zero_frequency_only_disables() {
        let mut pwm = Pwm::new(Fake::with_enable(0b1111));
        assert_eq!(pwm.program(Channel::C2, 0, 200).unwrap(), None);

        let fake = pwm.free();
        assert_eq!(
            fake.log,
            [
                Access::Read(pac::PWM_ENABLE),
                Access::Write(pac::PWM_ENABLE, 0b1011),
            ]
        );
    }

    #[test]
    fn write_sequence() {
        let mut pwm = Pwm::new(Fake::with_enable(0b0001));
        let timing = pwm.program(Channel::C1, 1000, 25).unwrap().unwrap();
        assert_eq!(timing.divider, 2);
        assert_eq!(timing.duration, 10_000);

        let at = |register: Register| register.address(Channel::C1);
        assert_eq!(
            pwm.free().writes(),
            [
                (pac::PWM_ENABLE, 0b0001),
                (at(Register::Control), 0x0200 | 0x0800 | 0x8 | 2),
                (at(Register::HighDuration), 2500),
                (at(Register::LowDuration), 7500),
                (at(Register::GuardDuration), 0),
                (at(Register::SendData0), 0xAAAA_AAAA),
                (at(Register::SendData1), 0xAAAA_AAAA),
                (at(Register::WaveNumber), 0),
                (pac::PWM_ENABLE, 0b0011),
            ]
        );
    }

    #[test]
    fn enable_is_written_last() {
        let mut pwm = Pwm::new(Fake::with_enable(0b0100));
        pwm.program(Channel::C2, 10, 50).unwrap();

        let writes = pwm.free().writes();
        let (first, last) = (writes[0], writes[writes.len() - 1]);
        assert_eq!(first, (pac::PWM_ENABLE, 0b0000));
        assert_eq!(last, (pac::PWM_ENABLE, 0b0100));
        assert!(writes[1..writes.len() - 1]
            .iter()
            .all(|&(address, _)| address != pac::PWM_ENABLE));
    }

    #[test]
    fn slow_clock_control_word() {
        let mut pwm = Pwm::new(Fake::default());
        let timing = pwm.program(Channel::C2, 10, 50).unwrap().unwrap();
        assert_eq!(timing.mode, ClockMode::Slow);

        let fake = pwm.free();
        assert_eq!(fake.get(Register::Control.address(Channel::C2)), 0x0a00);
        assert_eq!(fake.get(Register::HighDuration.address(Channel::C2)), 5000);
        assert_eq!(fake.get(Register::LowDuration.address(Channel::C2)), 5000);
    }

    #[test]
    fn zero_duty_forces_low() {
        let mut pwm = Pwm::new(Fake::default());
        pwm.program(Channel::C0, 1000, 0).unwrap();

        let fake = pwm.free();
        assert_eq!(fake.get(Register::SendData0.address(Channel::C0)), 0);
        assert_eq!(fake.get(Register::SendData1.address(Channel::C0)), 0);
        assert_eq!(fake.get(pac::PWM_ENABLE), 0b0001);
    }

    #[test]
    fn full_duty_forces_high() {
        let mut pwm = Pwm::new(Fake::default());
        pwm.program(Channel::C3, 1000, 100).unwrap();

        let fake = pwm.free();
        assert_eq!(fake.get(Register::SendData0.address(Channel::C3)), 0xFFFF_FFFF);
        assert_eq!(fake.get(Register::SendData1.address(Channel::C3)), 0xFFFF_FFFF);
    }

    #[test]
    fn reprogramming_is_idempotent() {
        let mut once = Pwm::new(Fake::with_enable(0b1000));
        once.program(Channel::C1, 44_100, 33).unwrap();

        let mut twice = Pwm::new(Fake::with_enable(0b1000));
        twice.program(Channel::C1, 44_100, 33).unwrap();
        twice.program(Channel::C1, 44_100, 33).unwrap();

        assert_eq!(once.free().memory, twice.free().memory);
    }

    #[test]
    fn too_high_frequency_touches_nothing() {
        let mut pwm = Pwm::new(Fake::with_enable(0b0001));
        let err = pwm.program(Channel::C0, 40_000_001, 50).unwrap_err();
        assert!(matches!(err, Error::FrequencyTooHigh(40_000_001)));
        assert!(!err.is_environment());
        assert!(pwm.free().log.is_empty());
    }

    #[test]
    fn max_frequency_is_accepted() {
        let mut pwm = Pwm::new(Fake::default());
        let timing = pwm.program(Channel::C0, 40_000_000, 50).unwrap().unwrap();
        assert_eq!((timing.mode, timing.divider, timing.duration), (ClockMode::Fast, 0, 1));
    }

    #[test]
    fn state_reads_back_configuration() {
        let mut pwm = Pwm::new(Fake::default());
        pwm.program(Channel::C1, 1000, 25).unwrap();

        let state = pwm.state(Channel::C1).unwrap();
        assert!(state.enabled);
        assert_eq!(state.mode, ClockMode::Fast);
        assert_eq!(state.divider, 2);
        assert_eq!(state.frequency(), Some(1000));
        assert_eq!(state.duty(), Some(25));

        pwm.disable(Channel::C1).unwrap();
        assert!(!pwm.state(Channel::C1).unwrap().enabled);
    }

    #[test]
    fn state_reports_forced_duty() {
        let mut pwm = Pwm::new(Fake::default());
        pwm.program(Channel::C0, 500, 100).unwrap();
        assert_eq!(pwm.state(Channel::C0).unwrap().duty(), Some(100));

        pwm.program(Channel::C0, 500, 0).unwrap();
        assert_eq!(pwm.state(Channel::C0).unwrap().duty(), Some(0));
    }

    #[test]
    fn apply_matches_configure() {
        let config = Config {
            frequency: 2_000,
            duty: 30,
        };

        let mut configured = Pwm::new(Fake::with_enable(0b0110));
        configured.configure(Channel::C2, config).unwrap();

        let mut applied = Pwm::new(Fake::with_enable(0b0110));
        let timing = config.timing().unwrap();
        assert_eq!(applied.apply(Channel::C2, timing).unwrap(), timing);

        assert_eq!(configured.free().log, applied.free().log);
    }

    #[test]
    fn apply_nothing_only_disables() {
        let mut pwm = Pwm::new(Fake::with_enable(0b0001));
        assert_eq!(pwm.apply(Channel::C0, None).unwrap(), None);
        assert_eq!(pwm.free().writes(), [(pac::PWM_ENABLE, 0)]);
    }

    #[test]
    fn default_config_is_off() {
        assert_eq!(Config::default().timing().unwrap(), None);
    }
}
