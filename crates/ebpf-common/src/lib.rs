#![cfg_attr(not(feature = "std"), no_std)]

pub mod routes;
pub mod session;

/// Error returned when decoding a fixed-size kernel-boundary record from a
/// byte slice of the wrong length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrongLength {
    pub expected: usize,
    pub got: usize,
}

impl core::fmt::Display for WrongLength {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "record length mismatch: expected {} bytes, got {}",
            self.expected, self.got
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for WrongLength {}
