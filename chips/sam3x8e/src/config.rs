// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Compile-time configuration of the SAM3X8E drivers.
//!
//! Boolean options are derived from Cargo features here and nowhere else, so
//! the rest of the crate branches on plain constants and every code path is
//! type-checked regardless of the enabled feature set.

/// Data structure holding compile-time configuration options.
pub(crate) struct Config {
    /// Frequency of the master clock (MCK) feeding the peripherals, in Hz.
    ///
    /// The Arduino Due runs the SAM3X8E from the PLLA at 84 MHz.
    pub(crate) master_clock_hz: u32,

    /// Whether the PWM frequency resolver should log every prescaler and
    /// divisor candidate it evaluates.
    pub(crate) trace_pwm: bool,
}

/// The unique instance of `Config` used by the drivers.
pub(crate) const CONFIG: Config = Config {
    master_clock_hz: 84_000_000,
    trace_pwm: cfg!(feature = "trace_pwm"),
};
