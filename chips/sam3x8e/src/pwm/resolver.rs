// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Search of the prescaler/divisor/period space for a requested frequency.
//!
//! A channel counts `period` ticks of its clock per output period, or
//! `2 * period` ticks when center aligned. Its clock is either MCK divided by
//! one of the eleven fixed prescalers, or one of the auxiliary clocks, which
//! divide a prescaled MCK further by an 8-bit divisor. Every search walks the
//! prescalers from the smallest divider up and accepts the first candidate
//! that fits the register widths, which yields the largest period and thus
//! the finest duty cycle resolution. Quotients are rounded to the nearest
//! integer, halves up.
//!
//! The functions here are pure; [`Pwm`](super::Pwm) commits their results.

use log::trace;

use super::{Alignment, ClockSetting, Prescaler};
use crate::config::CONFIG;

/// Largest value of `PWM_CPRDx`.
pub const MAX_PERIOD: u32 = 0xFFFF;
/// Largest auxiliary clock divisor.
pub const MAX_DIVISOR: u32 = 0xFF;

/// Prescaler and period register values producing a channel frequency.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelTiming {
    pub prescaler: Prescaler,
    pub period: u16,
}

/// The alignments present among a set of channels that must share one
/// auxiliary clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AlignmentSet {
    pub left: bool,
    pub center: bool,
}

impl AlignmentSet {
    pub fn single(alignment: Alignment) -> Self {
        let mut set = AlignmentSet::default();
        set.insert(alignment);
        set
    }

    pub fn insert(&mut self, alignment: Alignment) {
        match alignment {
            Alignment::Left => self.left = true,
            Alignment::Center => self.center = true,
        }
    }

    fn iter(self) -> impl Iterator<Item = Alignment> {
        [
            (self.left, Alignment::Left),
            (self.center, Alignment::Center),
        ]
        .into_iter()
        .filter_map(|(present, alignment)| present.then_some(alignment))
    }
}

pub(crate) fn div_round(numerator: u64, denominator: u64) -> u64 {
    (numerator + denominator / 2) / denominator
}

/// Whether `frequency_hz` is outside what any counter could produce from
/// `master_clock_hz`, even with a period of one MCK tick.
fn out_of_range(master_clock_hz: u32, frequency_hz: u32, alignment: Alignment) -> bool {
    frequency_hz == 0
        || u64::from(frequency_hz) * u64::from(alignment.factor()) > u64::from(master_clock_hz)
}

fn fits(value: u64, max: u32) -> bool {
    value >= 1 && value <= u64::from(max)
}

/// Period of a channel running at `frequency_hz` from a clock of
/// `MCK / ticks_per_clock`, if it fits `PWM_CPRDx`.
fn period_for(
    master_clock_hz: u32,
    ticks_per_clock: u64,
    frequency_hz: u32,
    alignment: Alignment,
) -> Option<u16> {
    let period = div_round(
        u64::from(master_clock_hz),
        ticks_per_clock * u64::from(alignment.factor()) * u64::from(frequency_hz),
    );
    if fits(period, MAX_PERIOD) {
        Some(period as u16)
    } else {
        None
    }
}

/// Resolve a channel frequency against the fixed prescalers.
pub fn resolve_channel(
    master_clock_hz: u32,
    frequency_hz: u32,
    alignment: Alignment,
) -> Option<ChannelTiming> {
    if out_of_range(master_clock_hz, frequency_hz, alignment) {
        return None;
    }

    Prescaler::ALL.into_iter().find_map(|prescaler| {
        let period = period_for(
            master_clock_hz,
            u64::from(prescaler.divider()),
            frequency_hz,
            alignment,
        );
        if CONFIG.trace_pwm {
            trace!(
                "pwm: {} Hz {:?}: prescaler {} -> period {:?}",
                frequency_hz,
                alignment,
                prescaler.divider(),
                period
            );
        }
        period.map(|period| ChannelTiming { prescaler, period })
    })
}

/// Resolve an auxiliary clock frequency.
///
/// The divisor is only 8 bits wide, so most requests are approximated: at
/// 84 MHz the largest prescaler still needs a divisor of 256 below about
/// 321 Hz, and no clock below that can be produced.
pub fn resolve_clock(master_clock_hz: u32, frequency_hz: u32) -> Option<ClockSetting> {
    if out_of_range(master_clock_hz, frequency_hz, Alignment::Left) {
        return None;
    }

    Prescaler::ALL.into_iter().find_map(|prescaler| {
        let divisor = div_round(
            u64::from(master_clock_hz),
            u64::from(prescaler.divider()) * u64::from(frequency_hz),
        );
        if CONFIG.trace_pwm {
            trace!(
                "pwm: clock {} Hz: prescaler {} -> divisor {}",
                frequency_hz,
                prescaler.divider(),
                divisor
            );
        }
        fits(divisor, MAX_DIVISOR).then_some(ClockSetting {
            prescaler,
            divisor: divisor as u8,
        })
    })
}

/// Period of a channel running at `frequency_hz` from the auxiliary clock
/// `clock`, if the clock is on and the period fits `PWM_CPRDx`.
pub fn clocked_period(
    master_clock_hz: u32,
    clock: ClockSetting,
    frequency_hz: u32,
    alignment: Alignment,
) -> Option<u16> {
    if clock.divisor == 0 || out_of_range(master_clock_hz, frequency_hz, alignment) {
        return None;
    }
    period_for(
        master_clock_hz,
        u64::from(clock.prescaler.divider()) * u64::from(clock.divisor),
        frequency_hz,
        alignment,
    )
}

/// Resolve an auxiliary clock setting from which every alignment in
/// `alignments` can produce `frequency_hz` with a period in range.
///
/// Candidates are ordered by prescaler, then by divisor, both ascending.
pub fn resolve_clocked(
    master_clock_hz: u32,
    frequency_hz: u32,
    alignments: AlignmentSet,
) -> Option<ClockSetting> {
    let mut candidates = Prescaler::ALL.into_iter().flat_map(|prescaler| {
        (1..=MAX_DIVISOR as u8).map(move |divisor| ClockSetting { prescaler, divisor })
    });

    candidates.find(|clock| {
        let fits_all = alignments
            .iter()
            .all(|alignment| {
                clocked_period(master_clock_hz, *clock, frequency_hz, alignment).is_some()
            });
        if CONFIG.trace_pwm && fits_all {
            trace!(
                "pwm: {} Hz via clock: prescaler {} divisor {}",
                frequency_hz,
                clock.prescaler.divider(),
                clock.divisor
            );
        }
        fits_all
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MCK: u32 = 84_000_000;

    #[test]
    fn nearest_integer_rounding() {
        assert_eq!(div_round(10, 4), 3);
        assert_eq!(div_round(9, 4), 2);
        assert_eq!(div_round(11, 4), 3);
        assert_eq!(div_round(8, 4), 2);
    }

    #[test]
    fn channel_at_84khz() {
        assert_eq!(
            resolve_channel(MCK, 84_000, Alignment::Left),
            Some(ChannelTiming {
                prescaler: Prescaler::Div1,
                period: 1000
            })
        );
        assert_eq!(
            resolve_channel(MCK, 84_000, Alignment::Center),
            Some(ChannelTiming {
                prescaler: Prescaler::Div1,
                period: 500
            })
        );
    }

    #[test]
    fn channel_range_limits() {
        assert_eq!(resolve_channel(MCK, 0, Alignment::Left), None);
        assert_eq!(resolve_channel(MCK, 1, Alignment::Left), None);
        assert_eq!(
            resolve_channel(MCK, 2, Alignment::Left),
            Some(ChannelTiming {
                prescaler: Prescaler::Div1024,
                period: 41016
            })
        );
        assert_eq!(
            resolve_channel(MCK, MCK, Alignment::Left),
            Some(ChannelTiming {
                prescaler: Prescaler::Div1,
                period: 1
            })
        );
        assert_eq!(resolve_channel(MCK, MCK + 1, Alignment::Left), None);
        assert_eq!(resolve_channel(MCK, MCK / 2 + 1, Alignment::Center), None);
        assert_eq!(resolve_channel(MCK, u32::MAX, Alignment::Center), None);
    }

    #[test]
    fn smallest_fitting_prescaler_is_chosen() {
        for frequency in [2, 3, 7, 50, 333, 1_000, 1_281, 1_282, 20_000, 999_999] {
            let timing = resolve_channel(MCK, frequency, Alignment::Left).unwrap();
            let index = timing.prescaler.code() as usize;
            if index > 0 {
                let smaller = Prescaler::ALL[index - 1];
                let period = div_round(
                    u64::from(MCK),
                    u64::from(smaller.divider()) * u64::from(frequency),
                );
                assert!(period > u64::from(MAX_PERIOD), "{} Hz", frequency);
            }
        }
    }

    #[test]
    fn realized_frequency_within_one_step() {
        for frequency in [2, 5, 99, 440, 1_000, 12_345, 84_000, 3_000_000, 84_000_000] {
            for alignment in [Alignment::Left, Alignment::Center] {
                let Some(timing) = resolve_channel(MCK, frequency, alignment) else {
                    assert_eq!(alignment, Alignment::Center);
                    continue;
                };
                // Nearest rounding keeps the error within half a period step.
                let ticks = u64::from(timing.prescaler.divider())
                    * u64::from(alignment.factor())
                    * u64::from(frequency);
                let realized = ticks * u64::from(timing.period);
                assert!(u64::from(MCK).abs_diff(realized) <= ticks / 2);
            }
        }
    }

    #[test]
    fn clock_at_1khz() {
        let clock = resolve_clock(MCK, 1_000).unwrap();
        assert_eq!(
            clock,
            ClockSetting {
                prescaler: Prescaler::Div512,
                divisor: 164
            }
        );
        assert_eq!(clock.frequency_hz(MCK), Some(1_000));
    }

    #[test]
    fn clock_lower_bound() {
        assert_eq!(resolve_clock(MCK, 300), None);
        assert_eq!(resolve_clock(MCK, 321), None);
        assert_eq!(
            resolve_clock(MCK, 322),
            Some(ClockSetting {
                prescaler: Prescaler::Div1024,
                divisor: 255
            })
        );
        assert_eq!(resolve_clock(MCK, 0), None);
    }

    #[test]
    fn channel_at_100hz_through_clock() {
        let clock = resolve_clocked(MCK, 100, AlignmentSet::single(Alignment::Left)).unwrap();
        assert_eq!(
            clock,
            ClockSetting {
                prescaler: Prescaler::Div1,
                divisor: 13
            }
        );
        assert_eq!(
            clocked_period(MCK, clock, 100, Alignment::Left),
            Some(64615)
        );
    }

    #[test]
    fn shared_clock_satisfies_every_alignment() {
        let mut both = AlignmentSet::single(Alignment::Left);
        both.insert(Alignment::Center);
        let clock = resolve_clocked(MCK, 100, both).unwrap();
        assert!(clocked_period(MCK, clock, 100, Alignment::Left).is_some());
        assert!(clocked_period(MCK, clock, 100, Alignment::Center).is_some());
    }

    #[test]
    fn clock_off_has_no_period() {
        let clock = ClockSetting {
            prescaler: Prescaler::Div8,
            divisor: 0,
        };
        assert_eq!(clocked_period(MCK, clock, 100, Alignment::Left), None);
        assert_eq!(clock.frequency_hz(MCK), None);
    }
}
