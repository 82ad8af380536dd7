//! Minimal hardware access crate for the Onion Omega2 (MT7688) PWM peripheral.
//!
//! Programs the PWM registers directly through `/dev/mem`, for systems without a kernel PWM
//! driver. The register access is behind the [devmem::Registers] trait, the timing search in
//! [clock] does not touch the hardware at all.

pub mod clock;
pub mod devmem;
pub mod pwm;

mod error;

pub use error::{Error, Result};
