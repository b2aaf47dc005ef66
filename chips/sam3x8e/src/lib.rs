// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Peripheral implementations for the Atmel SAM3X8E MCU.
//!
//! The PWM controller driver resolves requested output frequencies into
//! prescaler, divisor and period register values. The PMC and PIO drivers
//! provide the peripheral clock gating and pin multiplexing it relies on.

#![cfg_attr(not(test), no_std)]

mod config;
mod static_ref;

pub mod errorcode;
pub mod pio;
pub mod pmc;
pub mod pwm;
pub mod test;

pub use crate::errorcode::ErrorCode;
pub use crate::static_ref::StaticRef;
