//! Drives PWM0 at 2kHz, 30% duty, for five seconds, then turns it off.
//!
//! Must run as root on the Omega2.

use std::{thread, time::Duration};

use omega2::{
    devmem::DevMem,
    pwm::{self, Channel, Pwm},
};

fn main() -> Result<(), omega2::Error> {
    let mut pwm = Pwm::new(DevMem::open()?);

    // Set the pwm frequency and duty.
    let config = pwm::Config {
        frequency: 2_000,
        duty: 30,
    };

    if let Some(timing) = pwm.configure(Channel::C0, config)? {
        println!(
            "{:?} clock, divider {}, {} high / {} low ticks",
            timing.mode, timing.divider, timing.high, timing.low
        );
    }

    println!("{:?}", pwm.state(Channel::C0)?);

    thread::sleep(Duration::from_secs(5));

    pwm.disable(Channel::C0)
}
