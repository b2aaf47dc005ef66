// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Integration tests for the PWM controller
//!
//! The tests drive the real registers and are meant to be watched on the
//! Arduino Due headers with a scope or an LED.
//!
//! ## hello_pwm
//!
//! Channel 0 runs at 1 kHz with a 50% duty cycle on PWML0 (PC2, pin 34)
//! and its complement on PWMH0 (PC3, pin 35).
//!
//! ## clocked_pwm
//!
//! Channel 1 runs center aligned at 100 Hz through clock A with a 25% duty
//! cycle on PWML1 (PC4, pin 36).
//!
//! ## reconfigure_running_pwm
//!
//! Channel 0 is moved to 2 kHz and 10% duty cycle while it is running. The
//! output should change without the channel stopping.
//!
//! ## unrepresentable_pwm
//!
//! Requests no prescaler or divisor can produce. Nothing observable should
//! change.
//!
//! ## Running the tests
//!
//! ```rust,ignore
//! let pwm_test = sam3x8e::test::pwm::integration_tests::new(pwm, pmc, pioc);
//! pwm_test.run_all();
//! ```
//!
//! For more details, see [PwmTest].

use log::info;

use crate::pio::{Pio, PwmOutput};
use crate::pmc::{ClockGate, PeripheralId, Pmc};
use crate::pwm::{
    Alignment, AuxClock, ChannelMask, ChannelNumber, ChannelSetting, FrequencySource, Polarity,
    Pwm,
};
use crate::ErrorCode;

/// Struct used to run integration tests
pub struct PwmTest {
    pwm: &'static Pwm,
    pmc: &'static Pmc,
    pioc: &'static Pio,
}

/// Create a PwmTest to run tests
pub fn new(pwm: &'static Pwm, pmc: &'static Pmc, pioc: &'static Pio) -> PwmTest {
    PwmTest { pwm, pmc, pioc }
}

impl PwmTest {
    fn start(&self) {
        if !self.pmc.is_enabled(PeripheralId::PWM) {
            assert_eq!(self.pwm.init_default(self.pmc), Ok(()));
        }
        assert_eq!(self.pioc.enable_clock(self.pmc), Ok(()));
    }

    /// Run hello_pwm test
    pub fn hello_pwm(&self) {
        self.start();
        let ch0 = ChannelMask::from(ChannelNumber::Ch0);
        assert_eq!(
            self.pioc.route_pwm_output(PwmOutput::Low(ChannelNumber::Ch0)),
            Ok(())
        );
        assert_eq!(
            self.pioc.route_pwm_output(PwmOutput::High(ChannelNumber::Ch0)),
            Ok(())
        );

        assert_eq!(
            self.pwm.init_channel(ChannelSetting {
                channels: ch0,
                polarity: Polarity::High,
                alignment: Alignment::Left,
                duty_cycle: 0,
                source: FrequencySource::Prescaler,
                frequency_hz: 1_000,
            }),
            Ok(())
        );
        let period = self.pwm.period(ChannelNumber::Ch0);
        assert_eq!(self.pwm.set_duty_cycle(ch0, period / 2), Ok(()));
        assert_eq!(self.pwm.enable(ch0), Ok(()));
        assert!(self.pwm.is_enabled(ChannelNumber::Ch0));
        assert_eq!(self.pwm.output_frequency(ChannelNumber::Ch0), Some(1_000));
        info!("PWM channel 0 started, period {}", period);
    }

    /// Run clocked_pwm test
    pub fn clocked_pwm(&self) {
        self.start();
        let ch1 = ChannelMask::from(ChannelNumber::Ch1);
        assert_eq!(
            self.pioc.route_pwm_output(PwmOutput::Low(ChannelNumber::Ch1)),
            Ok(())
        );

        assert_eq!(self.pwm.set_alignment(ch1, Alignment::Center), Ok(()));
        assert_eq!(
            self.pwm.set_frequency_with_clock(ch1, 100, AuxClock::A),
            Ok(())
        );
        let period = self.pwm.period(ChannelNumber::Ch1);
        assert_eq!(self.pwm.set_duty_cycle(ch1, period / 4), Ok(()));
        assert_eq!(self.pwm.enable(ch1), Ok(()));
        assert_eq!(self.pwm.output_frequency(ChannelNumber::Ch1), Some(100));
        info!(
            "PWM channel 1 started from clock A at {:?} Hz",
            self.pwm.clock_frequency(AuxClock::A)
        );
    }

    /// Run reconfigure_running_pwm test
    pub fn reconfigure_running_pwm(&self) {
        let ch0 = ChannelMask::from(ChannelNumber::Ch0);
        if !self.pwm.is_enabled(ChannelNumber::Ch0) {
            self.hello_pwm();
        }
        let running = self.pwm.enabled_channels();

        assert_eq!(self.pwm.set_frequency(ch0, 2_000), Ok(()));
        let period = self.pwm.period(ChannelNumber::Ch0);
        assert_eq!(self.pwm.set_duty_cycle(ch0, period / 10), Ok(()));
        assert_eq!(self.pwm.enabled_channels(), running);
        info!("PWM channel 0 moved to 2 kHz while running");
    }

    /// Run unrepresentable_pwm test
    pub fn unrepresentable_pwm(&self) {
        self.start();
        let ch2 = ChannelMask::from(ChannelNumber::Ch2);
        assert_eq!(self.pwm.set_period(ch2, 1_000), Ok(()));
        let period = self.pwm.period(ChannelNumber::Ch2);
        let clock_b = self.pwm.clock_setting(AuxClock::B);

        assert_eq!(self.pwm.set_frequency(ch2, 1), Err(ErrorCode::FREQUENCY));
        assert_eq!(
            self.pwm.set_clock_frequency(AuxClock::B, 300),
            Err(ErrorCode::FREQUENCY)
        );
        assert_eq!(
            self.pwm.set_duty_cycle(ch2, period + 1),
            Err(ErrorCode::DUTY)
        );
        assert_eq!(self.pwm.period(ChannelNumber::Ch2), period);
        assert_eq!(self.pwm.clock_setting(AuxClock::B), clock_b);
        info!("PWM rejected unrepresentable settings");
    }

    /// Run all integration tests
    pub fn run_all(&self) {
        self.hello_pwm();
        self.clocked_pwm();
        self.reconfigure_running_pwm();
        self.unrepresentable_pwm();
    }
}
