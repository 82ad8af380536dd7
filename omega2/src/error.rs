//! Crate error type.

use std::io;

/// Errors returned by the register accessor and the PWM programmer.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Permission denied opening /dev/mem: {}", .0)]
    PermissionDenied(#[source] io::Error),
    #[error("Error opening /dev/mem: {}", .0)]
    Open(#[source] io::Error),
    #[error("Error mapping physical address {:#010x}: {}", .0, .1)]
    MappingFailed(u32, #[source] nix::Error),
    #[error("Error unmapping physical address {:#010x}: {}", .0, .1)]
    UnmappingFailed(u32, #[source] nix::Error),
    #[error("Unable to determine the system page size.")]
    PageSize,
    #[error("Invalid access size {}, expected 1, 2 or 4 bytes.", .0)]
    InvalidSize(u8),
    #[error("Invalid channel number {}, expected 0..=3.", .0)]
    InvalidChannel(u8),
    #[error("Invalid duty {}, expected 0..=100.", .0)]
    InvalidDuty(u8),
    #[error("Frequency must be non-zero.")]
    ZeroFrequency,
    #[error("Frequency {}Hz is above the {}Hz source clock.", .0, crate::clock::FAST_CLOCK_HZ)]
    FrequencyTooHigh(u32),
}

impl Error {
    /// True for errors caused by the environment rather than by the request.
    pub fn is_environment(&self) -> bool {
        matches!(
            self,
            Error::PermissionDenied(_)
                | Error::Open(_)
                | Error::MappingFailed(..)
                | Error::UnmappingFailed(..)
                | Error::PageSize
        )
    }
}

pub type Result<T> = core::result::Result<T, Error>;
