// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! An in-memory PWM register bank for running the driver off target.
//!
//! The bank reproduces the parts of the controller behavior the driver
//! depends on: `PWM_ENA`/`PWM_DIS` set and clear bits of `PWM_SR`, and a
//! duty cycle written to `PWM_CDTYUPDx` only reaches `PWM_CDTYx` once
//! [`SimulatedPwmRegisters::latch_updates`] is called, standing in for the
//! end of a PWM period.

use core::cell::Cell;

use tock_registers::fields::FieldValue;
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::registers::InMemoryRegister;
use tock_registers::LocalRegisterCopy;

use super::channel::{ChannelMask, ChannelNumber, NUM_CHANNELS};
use super::registers::{PwmRegisterBank, CDTY, CHID, CLK, CMR, CPRD};

/// A copy of every modeled register, for comparing the bank before and after
/// an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterSnapshot {
    pub clk: u32,
    pub status: u8,
    pub mode: [u32; NUM_CHANNELS],
    pub period: [u16; NUM_CHANNELS],
    pub duty: [u16; NUM_CHANNELS],
    pub duty_update: [u16; NUM_CHANNELS],
}

pub struct SimulatedPwmRegisters {
    clk: InMemoryRegister<u32, CLK::Register>,
    sr: InMemoryRegister<u32, CHID::Register>,
    cmr: [InMemoryRegister<u32, CMR::Register>; NUM_CHANNELS],
    cprd: [InMemoryRegister<u32, CPRD::Register>; NUM_CHANNELS],
    cdty: [InMemoryRegister<u32, CDTY::Register>; NUM_CHANNELS],
    cdtyupd: [InMemoryRegister<u32, CDTY::Register>; NUM_CHANNELS],
    pending_updates: Cell<ChannelMask>,
    enable_writes: Cell<usize>,
    disable_writes: Cell<usize>,
}

impl SimulatedPwmRegisters {
    /// A bank in its reset state: all registers zero, all channels disabled.
    pub fn new() -> Self {
        SimulatedPwmRegisters {
            clk: InMemoryRegister::new(0),
            sr: InMemoryRegister::new(0),
            cmr: core::array::from_fn(|_| InMemoryRegister::new(0)),
            cprd: core::array::from_fn(|_| InMemoryRegister::new(0)),
            cdty: core::array::from_fn(|_| InMemoryRegister::new(0)),
            cdtyupd: core::array::from_fn(|_| InMemoryRegister::new(0)),
            pending_updates: Cell::new(ChannelMask::NONE),
            enable_writes: Cell::new(0),
            disable_writes: Cell::new(0),
        }
    }

    /// End the current period of every channel: pending duty cycle updates
    /// are copied into `PWM_CDTYx`.
    pub fn latch_updates(&self) {
        for channel in self.pending_updates.get().channels() {
            let index = channel.index();
            self.cdty[index].set(self.cdtyupd[index].get());
        }
        self.pending_updates.set(ChannelMask::NONE);
    }

    /// The value last written to `PWM_CDTYUPDx`, if it has not been latched
    /// yet.
    pub fn pending_duty_update(&self, channel: ChannelNumber) -> Option<u16> {
        if self.pending_updates.get().contains(channel) {
            Some(self.cdtyupd[channel.index()].read(CDTY::CDTY) as u16)
        } else {
            None
        }
    }

    /// Number of writes to `PWM_ENA` so far.
    pub fn enable_writes(&self) -> usize {
        self.enable_writes.get()
    }

    /// Number of writes to `PWM_DIS` so far.
    pub fn disable_writes(&self) -> usize {
        self.disable_writes.get()
    }

    pub fn snapshot(&self) -> RegisterSnapshot {
        RegisterSnapshot {
            clk: self.clk.get(),
            status: self.sr.read(CHID::CHID) as u8,
            mode: core::array::from_fn(|i| self.cmr[i].get()),
            period: core::array::from_fn(|i| self.cprd[i].read(CPRD::CPRD) as u16),
            duty: core::array::from_fn(|i| self.cdty[i].read(CDTY::CDTY) as u16),
            duty_update: core::array::from_fn(|i| self.cdtyupd[i].read(CDTY::CDTY) as u16),
        }
    }
}

impl Default for SimulatedPwmRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl PwmRegisterBank for SimulatedPwmRegisters {
    fn clock(&self) -> LocalRegisterCopy<u32, CLK::Register> {
        self.clk.extract()
    }

    fn modify_clock(&self, field: FieldValue<u32, CLK::Register>) {
        self.clk.modify(field);
    }

    fn write_clock(&self, field: FieldValue<u32, CLK::Register>) {
        self.clk.write(field);
    }

    fn mode(&self, channel: ChannelNumber) -> LocalRegisterCopy<u32, CMR::Register> {
        self.cmr[channel.index()].extract()
    }

    fn modify_mode(&self, channel: ChannelNumber, field: FieldValue<u32, CMR::Register>) {
        self.cmr[channel.index()].modify(field);
    }

    fn write_mode(&self, channel: ChannelNumber, field: FieldValue<u32, CMR::Register>) {
        self.cmr[channel.index()].write(field);
    }

    fn period(&self, channel: ChannelNumber) -> u16 {
        self.cprd[channel.index()].read(CPRD::CPRD) as u16
    }

    fn write_period(&self, channel: ChannelNumber, period: u16) {
        self.cprd[channel.index()].write(CPRD::CPRD.val(period as u32));
    }

    fn duty(&self, channel: ChannelNumber) -> u16 {
        self.cdty[channel.index()].read(CDTY::CDTY) as u16
    }

    fn write_duty(&self, channel: ChannelNumber, duty: u16) {
        self.cdty[channel.index()].write(CDTY::CDTY.val(duty as u32));
    }

    fn write_duty_update(&self, channel: ChannelNumber, duty: u16) {
        self.cdtyupd[channel.index()].write(CDTY::CDTY.val(duty as u32));
        self.pending_updates
            .set(self.pending_updates.get() | ChannelMask::from(channel));
    }

    fn enable(&self, channels: ChannelMask) {
        self.enable_writes.set(self.enable_writes.get() + 1);
        let status = self.status() | channels;
        self.sr.write(CHID::CHID.val(status.bits() as u32));
    }

    fn disable(&self, channels: ChannelMask) {
        self.disable_writes.set(self.disable_writes.get() + 1);
        let status = self.status().bits() & !channels.bits();
        self.sr.write(CHID::CHID.val(status as u32));
    }

    fn status(&self) -> ChannelMask {
        ChannelMask::from_bits(self.sr.read(CHID::CHID) as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_and_disable_are_write_one_to_set() {
        let regs = SimulatedPwmRegisters::new();
        regs.enable(ChannelMask::from_bits(0b0011));
        regs.enable(ChannelMask::from_bits(0b1000));
        assert_eq!(regs.status(), ChannelMask::from_bits(0b1011));

        regs.disable(ChannelMask::from_bits(0b0001));
        assert_eq!(regs.status(), ChannelMask::from_bits(0b1010));
        assert_eq!(regs.enable_writes(), 2);
        assert_eq!(regs.disable_writes(), 1);
    }

    #[test]
    fn duty_update_waits_for_period_boundary() {
        let regs = SimulatedPwmRegisters::new();
        regs.write_duty(ChannelNumber::Ch2, 10);
        regs.write_duty_update(ChannelNumber::Ch2, 40);

        assert_eq!(regs.duty(ChannelNumber::Ch2), 10);
        assert_eq!(regs.pending_duty_update(ChannelNumber::Ch2), Some(40));

        regs.latch_updates();
        assert_eq!(regs.duty(ChannelNumber::Ch2), 40);
        assert_eq!(regs.pending_duty_update(ChannelNumber::Ch2), None);
    }

    #[test]
    fn clock_fields_are_independent() {
        let regs = SimulatedPwmRegisters::new();
        regs.write_clock(CLK::DIVA.val(0x12) + CLK::PREA.val(3));
        regs.modify_clock(CLK::DIVB.val(0xAB) + CLK::PREB.val(10));
        assert_eq!(regs.snapshot().clk, 0x0AAB_0312);
    }
}
