// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Standard error enum for the SAM3X8E peripheral drivers.

/// Errors returned by the peripheral drivers in this crate.
///
/// Every mutating driver operation returns `Result<(), ErrorCode>`. A failed
/// operation never leaves a partially written register configuration behind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum ErrorCode {
    /// Generic failure condition, e.g. a peripheral clock that did not
    /// report the requested state.
    FAIL = 0,
    /// The requested frequency cannot be produced by any prescaler/divisor
    /// combination.
    FREQUENCY = 1,
    /// The requested duty cycle exceeds the channel period.
    DUTY = 2,
    /// An invalid channel, clock or peripheral identifier was passed.
    INVAL = 3,
}

impl From<ErrorCode> for usize {
    fn from(err: ErrorCode) -> usize {
        err as usize
    }
}

/// Map a driver result onto the C-style status convention of the vendor
/// driver API: `1` on success and `0` on failure.
pub fn into_status(result: Result<(), ErrorCode>) -> u32 {
    match result {
        Ok(()) => 1,
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_convention() {
        assert_eq!(into_status(Ok(())), 1);
        assert_eq!(into_status(Err(ErrorCode::FREQUENCY)), 0);
        assert_eq!(into_status(Err(ErrorCode::DUTY)), 0);
        assert_eq!(into_status(Err(ErrorCode::INVAL)), 0);
    }

    #[test]
    fn discriminants() {
        assert_eq!(usize::from(ErrorCode::FAIL), 0);
        assert_eq!(usize::from(ErrorCode::INVAL), 3);
    }
}
