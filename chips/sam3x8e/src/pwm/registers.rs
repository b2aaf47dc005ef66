// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! PWM controller register map and the register bank abstraction the driver
//! is written against.

use tock_registers::fields::FieldValue;
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::registers::{ReadOnly, ReadWrite, WriteOnly};
use tock_registers::{register_bitfields, register_structs, LocalRegisterCopy};

use super::channel::{ChannelMask, ChannelNumber};
use crate::static_ref::StaticRef;

register_structs! {
    // Per-channel register block, repeated every 0x20 bytes from 0x200.
    PwmChannelRegisters {
        /// Channel mode register
        (0x00 => cmr: ReadWrite<u32, CMR::Register>),
        /// Channel duty cycle register
        (0x04 => cdty: ReadWrite<u32, CDTY::Register>),
        /// Channel duty cycle update register, latched at the end of the
        /// current period
        (0x08 => cdtyupd: WriteOnly<u32, CDTY::Register>),
        /// Channel period register
        (0x0C => cprd: ReadWrite<u32, CPRD::Register>),
        (0x10 => _reserved0),
        (0x20 => @END),
    },
    pub PwmRegisters {
        /// PWM clock register
        (0x000 => clk: ReadWrite<u32, CLK::Register>),
        /// PWM enable register
        (0x004 => ena: WriteOnly<u32, CHID::Register>),
        /// PWM disable register
        (0x008 => dis: WriteOnly<u32, CHID::Register>),
        /// PWM status register
        (0x00C => sr: ReadOnly<u32, CHID::Register>),
        (0x010 => _reserved0),
        (0x200 => ch: [PwmChannelRegisters; 8]),
        (0x300 => @END),
    }
}

register_bitfields![u32,
    pub CLK [
        /// Clock A divide factor, 0 turns clock A off
        DIVA OFFSET(0) NUMBITS(8) [],
        /// Clock A prescaler code
        PREA OFFSET(8) NUMBITS(4) [],
        /// Clock B divide factor, 0 turns clock B off
        DIVB OFFSET(16) NUMBITS(8) [],
        /// Clock B prescaler code
        PREB OFFSET(24) NUMBITS(4) []
    ],
    pub CHID [
        /// One bit per channel
        CHID OFFSET(0) NUMBITS(8) []
    ],
    pub CMR [
        /// Channel prescaler: MCK/2^n for 0..=10, 11 selects CLKA, 12 CLKB
        CPRE OFFSET(0) NUMBITS(4) [],
        /// Channel alignment
        CALG OFFSET(8) NUMBITS(1) [
            Left = 0,
            Center = 1
        ],
        /// Channel polarity
        CPOL OFFSET(9) NUMBITS(1) [
            Low = 0,
            High = 1
        ],
        /// Counter event selection
        CES OFFSET(10) NUMBITS(1) []
    ],
    pub CDTY [
        CDTY OFFSET(0) NUMBITS(16) []
    ],
    pub CPRD [
        CPRD OFFSET(0) NUMBITS(16) []
    ]
];

/// Typed access to the registers of one PWM controller.
///
/// The driver only ever talks to the controller through this trait so that it
/// can run against the memory-mapped peripheral as well as against
/// [`SimulatedPwmRegisters`](super::sim::SimulatedPwmRegisters) on the host.
pub trait PwmRegisterBank {
    /// Current value of `PWM_CLK`.
    fn clock(&self) -> LocalRegisterCopy<u32, CLK::Register>;
    /// Read-modify-write of `PWM_CLK`, unrelated fields are preserved.
    fn modify_clock(&self, field: FieldValue<u32, CLK::Register>);
    /// Overwrite `PWM_CLK`.
    fn write_clock(&self, field: FieldValue<u32, CLK::Register>);

    /// Current value of `PWM_CMRx`.
    fn mode(&self, channel: ChannelNumber) -> LocalRegisterCopy<u32, CMR::Register>;
    /// Read-modify-write of `PWM_CMRx`, unrelated fields are preserved.
    fn modify_mode(&self, channel: ChannelNumber, field: FieldValue<u32, CMR::Register>);
    /// Overwrite `PWM_CMRx`.
    fn write_mode(&self, channel: ChannelNumber, field: FieldValue<u32, CMR::Register>);

    fn period(&self, channel: ChannelNumber) -> u16;
    fn write_period(&self, channel: ChannelNumber, period: u16);

    fn duty(&self, channel: ChannelNumber) -> u16;
    /// Write `PWM_CDTYx`. Only valid while the channel is disabled.
    fn write_duty(&self, channel: ChannelNumber, duty: u16);
    /// Write `PWM_CDTYUPDx`, taken over by the running channel at the next
    /// period boundary.
    fn write_duty_update(&self, channel: ChannelNumber, duty: u16);

    /// Write-1-to-set `PWM_ENA`.
    fn enable(&self, channels: ChannelMask);
    /// Write-1-to-set `PWM_DIS`.
    fn disable(&self, channels: ChannelMask);
    /// Channels currently enabled according to `PWM_SR`.
    fn status(&self) -> ChannelMask;
}

pub const PWM_BASE: StaticRef<PwmRegisters> =
    unsafe { StaticRef::new(0x4009_4000 as *const PwmRegisters) };

/// The memory-mapped PWM controller of the SAM3X8E.
pub struct Sam3xPwmRegisters {
    registers: StaticRef<PwmRegisters>,
}

impl Sam3xPwmRegisters {
    pub const fn new() -> Self {
        Self::with_base(PWM_BASE)
    }

    pub const fn with_base(registers: StaticRef<PwmRegisters>) -> Self {
        Sam3xPwmRegisters { registers }
    }

    fn channel(&self, channel: ChannelNumber) -> &PwmChannelRegisters {
        &self.registers.ch[channel.index()]
    }
}

impl Default for Sam3xPwmRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl PwmRegisterBank for Sam3xPwmRegisters {
    fn clock(&self) -> LocalRegisterCopy<u32, CLK::Register> {
        self.registers.clk.extract()
    }

    fn modify_clock(&self, field: FieldValue<u32, CLK::Register>) {
        self.registers.clk.modify(field);
    }

    fn write_clock(&self, field: FieldValue<u32, CLK::Register>) {
        self.registers.clk.write(field);
    }

    fn mode(&self, channel: ChannelNumber) -> LocalRegisterCopy<u32, CMR::Register> {
        self.channel(channel).cmr.extract()
    }

    fn modify_mode(&self, channel: ChannelNumber, field: FieldValue<u32, CMR::Register>) {
        self.channel(channel).cmr.modify(field);
    }

    fn write_mode(&self, channel: ChannelNumber, field: FieldValue<u32, CMR::Register>) {
        self.channel(channel).cmr.write(field);
    }

    fn period(&self, channel: ChannelNumber) -> u16 {
        self.channel(channel).cprd.read(CPRD::CPRD) as u16
    }

    fn write_period(&self, channel: ChannelNumber, period: u16) {
        self.channel(channel)
            .cprd
            .write(CPRD::CPRD.val(period as u32));
    }

    fn duty(&self, channel: ChannelNumber) -> u16 {
        self.channel(channel).cdty.read(CDTY::CDTY) as u16
    }

    fn write_duty(&self, channel: ChannelNumber, duty: u16) {
        self.channel(channel).cdty.write(CDTY::CDTY.val(duty as u32));
    }

    fn write_duty_update(&self, channel: ChannelNumber, duty: u16) {
        self.channel(channel)
            .cdtyupd
            .write(CDTY::CDTY.val(duty as u32));
    }

    fn enable(&self, channels: ChannelMask) {
        self.registers
            .ena
            .write(CHID::CHID.val(channels.bits() as u32));
    }

    fn disable(&self, channels: ChannelMask) {
        self.registers
            .dis
            .write(CHID::CHID.val(channels.bits() as u32));
    }

    fn status(&self) -> ChannelMask {
        ChannelMask::from_bits(self.registers.sr.read(CHID::CHID) as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::{offset_of, size_of};

    #[test]
    fn channel_blocks_start_at_0x200() {
        assert_eq!(size_of::<PwmChannelRegisters>(), 0x20);
        assert_eq!(offset_of!(PwmChannelRegisters, cprd), 0x0C);
        assert_eq!(offset_of!(PwmRegisters, ch), 0x200);
        assert_eq!(size_of::<PwmRegisters>(), 0x300);
    }
}
