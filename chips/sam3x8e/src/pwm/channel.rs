// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! PWM channel addressing and enable-state bookkeeping.

use core::ops::{BitAnd, BitOr};

use super::registers::PwmRegisterBank;
use crate::ErrorCode;

pub const NUM_CHANNELS: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelNumber {
    Ch0 = 0,
    Ch1 = 1,
    Ch2 = 2,
    Ch3 = 3,
    Ch4 = 4,
    Ch5 = 5,
    Ch6 = 6,
    Ch7 = 7,
}

impl ChannelNumber {
    pub const ALL: [ChannelNumber; NUM_CHANNELS] = [
        ChannelNumber::Ch0,
        ChannelNumber::Ch1,
        ChannelNumber::Ch2,
        ChannelNumber::Ch3,
        ChannelNumber::Ch4,
        ChannelNumber::Ch5,
        ChannelNumber::Ch6,
        ChannelNumber::Ch7,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u32> for ChannelNumber {
    type Error = ErrorCode;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        usize::try_from(id)
            .ok()
            .and_then(|index| ChannelNumber::ALL.get(index).copied())
            .ok_or(ErrorCode::INVAL)
    }
}

/// A set of channels, bit N selecting channel N.
///
/// This is the layout of `PWM_ENA`, `PWM_DIS` and `PWM_SR`, so masks are
/// written to and read from those registers unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelMask(u8);

impl ChannelMask {
    pub const NONE: ChannelMask = ChannelMask(0);
    pub const ALL: ChannelMask = ChannelMask(0xFF);

    pub const fn from_bits(bits: u8) -> Self {
        ChannelMask(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, channel: ChannelNumber) -> bool {
        self.0 & (1 << channel as u8) != 0
    }

    /// The selected channels in ascending order.
    pub fn channels(self) -> impl Iterator<Item = ChannelNumber> {
        ChannelNumber::ALL
            .into_iter()
            .filter(move |channel| self.contains(*channel))
    }

    /// Operations addressing channels by mask reject the empty mask.
    pub(crate) fn require_nonempty(self) -> Result<Self, ErrorCode> {
        if self.is_empty() {
            Err(ErrorCode::INVAL)
        } else {
            Ok(self)
        }
    }
}

impl From<ChannelNumber> for ChannelMask {
    fn from(channel: ChannelNumber) -> Self {
        ChannelMask(1 << channel as u8)
    }
}

impl TryFrom<u32> for ChannelMask {
    type Error = ErrorCode;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        u8::try_from(bits)
            .map(ChannelMask)
            .map_err(|_| ErrorCode::INVAL)
    }
}

impl BitOr for ChannelMask {
    type Output = ChannelMask;

    fn bitor(self, rhs: Self) -> Self {
        ChannelMask(self.0 | rhs.0)
    }
}

impl BitOr<ChannelNumber> for ChannelMask {
    type Output = ChannelMask;

    fn bitor(self, rhs: ChannelNumber) -> Self {
        self | ChannelMask::from(rhs)
    }
}

impl BitAnd for ChannelMask {
    type Output = ChannelMask;

    fn bitand(self, rhs: Self) -> Self {
        ChannelMask(self.0 & rhs.0)
    }
}

/// Scoped suspension of running channels.
///
/// The controller ignores writes to the mode and period registers of an
/// enabled channel. Creating a `ChannelSuspension` disables the selected
/// channels that are currently running; dropping it enables exactly those
/// channels again, whichever way the enclosing scope is left.
pub struct ChannelSuspension<'a, B: PwmRegisterBank + ?Sized> {
    registers: &'a B,
    suspended: ChannelMask,
}

impl<'a, B: PwmRegisterBank + ?Sized> ChannelSuspension<'a, B> {
    pub fn new(registers: &'a B, channels: ChannelMask) -> Self {
        let suspended = registers.status() & channels;
        if !suspended.is_empty() {
            registers.disable(suspended);
        }
        ChannelSuspension {
            registers,
            suspended,
        }
    }

    /// The channels that were running and will be enabled again on drop.
    pub fn suspended(&self) -> ChannelMask {
        self.suspended
    }
}

impl<B: PwmRegisterBank + ?Sized> Drop for ChannelSuspension<'_, B> {
    fn drop(&mut self) {
        if !self.suspended.is_empty() {
            self.registers.enable(self.suspended);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pwm::sim::SimulatedPwmRegisters;

    #[test]
    fn raw_identifiers() {
        assert_eq!(ChannelNumber::try_from(0), Ok(ChannelNumber::Ch0));
        assert_eq!(ChannelNumber::try_from(7), Ok(ChannelNumber::Ch7));
        assert_eq!(ChannelNumber::try_from(8), Err(ErrorCode::INVAL));
        assert_eq!(ChannelMask::try_from(0xFF), Ok(ChannelMask::ALL));
        assert_eq!(ChannelMask::try_from(0x100), Err(ErrorCode::INVAL));
    }

    #[test]
    fn mask_iteration() {
        let mask = ChannelMask::from(ChannelNumber::Ch1) | ChannelNumber::Ch6;
        assert_eq!(mask.bits(), 0b0100_0010);
        let mut channels = mask.channels();
        assert_eq!(channels.next(), Some(ChannelNumber::Ch1));
        assert_eq!(channels.next(), Some(ChannelNumber::Ch6));
        assert_eq!(channels.next(), None);
        assert_eq!(ChannelMask::ALL.channels().count(), NUM_CHANNELS);
        assert_eq!(ChannelMask::NONE.require_nonempty(), Err(ErrorCode::INVAL));
    }

    #[test]
    fn suspension_restores_running_channels_only() {
        let regs = SimulatedPwmRegisters::new();
        regs.enable(ChannelMask::from_bits(0b0000_0101));

        {
            let suspension = ChannelSuspension::new(&regs, ChannelMask::from_bits(0b0000_0011));
            assert_eq!(suspension.suspended(), ChannelMask::from_bits(0b0000_0001));
            assert_eq!(regs.status(), ChannelMask::from_bits(0b0000_0100));
        }

        assert_eq!(regs.status(), ChannelMask::from_bits(0b0000_0101));
    }

    #[test]
    fn suspension_of_idle_channels_writes_nothing() {
        let regs = SimulatedPwmRegisters::new();
        let enables = regs.enable_writes();
        let disables = regs.disable_writes();

        drop(ChannelSuspension::new(&regs, ChannelMask::ALL));

        assert_eq!(regs.enable_writes(), enables);
        assert_eq!(regs.disable_writes(), disables);
    }
}
