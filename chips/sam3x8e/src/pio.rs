// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Parallel I/O controllers (PIOA-PIOD).
//!
//! Each controller drives 32 pins. A pin is either under PIO control, where
//! it is a plain input or output, or handed to one of two peripherals (A or
//! B) that share the pin.

use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::registers::{ReadOnly, ReadWrite, WriteOnly};
use tock_registers::register_structs;

use crate::pmc::{ClockGate, PeripheralId};
use crate::pwm::ChannelNumber;
use crate::static_ref::StaticRef;
use crate::ErrorCode;

register_structs! {
    pub PioRegisters {
        /// PIO enable register
        (0x00 => per: WriteOnly<u32>),
        /// PIO disable register
        (0x04 => pdr: WriteOnly<u32>),
        /// PIO status register
        (0x08 => psr: ReadOnly<u32>),
        (0x0C => _reserved0),
        /// Output enable register
        (0x10 => oer: WriteOnly<u32>),
        /// Output disable register
        (0x14 => odr: WriteOnly<u32>),
        /// Output status register
        (0x18 => osr: ReadOnly<u32>),
        (0x1C => _reserved1),
        /// Set output data register
        (0x30 => sodr: WriteOnly<u32>),
        /// Clear output data register
        (0x34 => codr: WriteOnly<u32>),
        /// Output data status register
        (0x38 => odsr: ReadOnly<u32>),
        /// Pin data status register
        (0x3C => pdsr: ReadOnly<u32>),
        (0x40 => _reserved2),
        /// Pull-up disable register
        (0x60 => pudr: WriteOnly<u32>),
        /// Pull-up enable register
        (0x64 => puer: WriteOnly<u32>),
        /// Pad pull-up status register
        (0x68 => pusr: ReadOnly<u32>),
        (0x6C => _reserved3),
        /// Peripheral AB select register, 0 selects A and 1 selects B
        (0x70 => absr: ReadWrite<u32>),
        (0x74 => @END),
    }
}

const PIOA_BASE: StaticRef<PioRegisters> =
    unsafe { StaticRef::new(0x400E_0E00 as *const PioRegisters) };
const PIOB_BASE: StaticRef<PioRegisters> =
    unsafe { StaticRef::new(0x400E_1000 as *const PioRegisters) };
const PIOC_BASE: StaticRef<PioRegisters> =
    unsafe { StaticRef::new(0x400E_1200 as *const PioRegisters) };
const PIOD_BASE: StaticRef<PioRegisters> =
    unsafe { StaticRef::new(0x400E_1400 as *const PioRegisters) };

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Port {
    A,
    B,
    C,
    D,
}

impl Port {
    pub const fn peripheral_id(self) -> PeripheralId {
        match self {
            Port::A => PeripheralId::PIOA,
            Port::B => PeripheralId::PIOB,
            Port::C => PeripheralId::PIOC,
            Port::D => PeripheralId::PIOD,
        }
    }

    const fn base(self) -> StaticRef<PioRegisters> {
        match self {
            Port::A => PIOA_BASE,
            Port::B => PIOB_BASE,
            Port::C => PIOC_BASE,
            Port::D => PIOD_BASE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// Which of the two peripherals multiplexed on a pin drives it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Peripheral {
    A,
    B,
}

/// The PWM outputs reachable on PIOC, all on peripheral B.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PwmOutput {
    High(ChannelNumber),
    Low(ChannelNumber),
}

impl PwmOutput {
    /// The PIOC pin carrying this output, `None` for PWMH4 to PWMH7 which
    /// are not routed to PIOC.
    pub fn pin(self) -> Option<u32> {
        let pin = match self {
            PwmOutput::Low(channel) => match channel {
                ChannelNumber::Ch0 => 2,
                ChannelNumber::Ch1 => 4,
                ChannelNumber::Ch2 => 6,
                ChannelNumber::Ch3 => 8,
                ChannelNumber::Ch4 => 21,
                ChannelNumber::Ch5 => 22,
                ChannelNumber::Ch6 => 23,
                ChannelNumber::Ch7 => 24,
            },
            PwmOutput::High(channel) => match channel {
                ChannelNumber::Ch0 => 3,
                ChannelNumber::Ch1 => 5,
                ChannelNumber::Ch2 => 7,
                ChannelNumber::Ch3 => 9,
                _ => return None,
            },
        };
        Some(pin)
    }
}

fn pin_mask(pin: u32) -> Result<u32, ErrorCode> {
    1u32.checked_shl(pin).ok_or(ErrorCode::INVAL)
}

pub struct Pio {
    registers: StaticRef<PioRegisters>,
    port: Port,
}

impl Pio {
    pub const fn new(port: Port) -> Self {
        Self::with_base(port, port.base())
    }

    pub const fn with_base(port: Port, registers: StaticRef<PioRegisters>) -> Self {
        Pio { registers, port }
    }

    pub fn port(&self) -> Port {
        self.port
    }

    pub fn enable_clock<C: ClockGate + ?Sized>(&self, pmc: &C) -> Result<(), ErrorCode> {
        pmc.enable(self.port.peripheral_id())
    }

    pub fn disable_clock<C: ClockGate + ?Sized>(&self, pmc: &C) -> Result<(), ErrorCode> {
        pmc.disable(self.port.peripheral_id())
    }

    /// Put the pins in `mask` under PIO control as inputs or outputs.
    pub fn configure_pins(&self, mask: u32, direction: Direction, pull_up: bool) {
        self.registers.per.set(mask);
        match direction {
            Direction::Input => self.registers.odr.set(mask),
            Direction::Output => self.registers.oer.set(mask),
        }
        if pull_up {
            self.registers.puer.set(mask);
        } else {
            self.registers.pudr.set(mask);
        }
    }

    pub fn configure_pin(
        &self,
        pin: u32,
        direction: Direction,
        pull_up: bool,
    ) -> Result<(), ErrorCode> {
        self.configure_pins(pin_mask(pin)?, direction, pull_up);
        Ok(())
    }

    /// Put the whole port under PIO control. Set bits of `inputs` are
    /// inputs, the others outputs; set bits of `pull_ups` get a pull-up.
    pub fn configure_port(&self, inputs: u32, pull_ups: u32) {
        self.registers.per.set(!0);
        self.registers.odr.set(inputs);
        self.registers.oer.set(!inputs);
        self.registers.puer.set(pull_ups);
        self.registers.pudr.set(!pull_ups);
    }

    pub fn set_pins(&self, mask: u32, high: bool) {
        if high {
            self.registers.sodr.set(mask);
        } else {
            self.registers.codr.set(mask);
        }
    }

    pub fn set_pin(&self, pin: u32, high: bool) -> Result<(), ErrorCode> {
        self.set_pins(pin_mask(pin)?, high);
        Ok(())
    }

    /// Drive every output of the port to the matching bit of `levels`.
    pub fn set_port(&self, levels: u32) {
        self.registers.sodr.set(levels);
        self.registers.codr.set(!levels);
    }

    pub fn read_pin(&self, pin: u32) -> Result<bool, ErrorCode> {
        Ok(self.read_port() & pin_mask(pin)? != 0)
    }

    /// Level of every pin, whatever drives it.
    pub fn read_port(&self) -> u32 {
        self.registers.pdsr.get()
    }

    /// Levels the PIO drives on its outputs.
    pub fn output_levels(&self) -> u32 {
        self.registers.odsr.get()
    }

    pub fn outputs(&self) -> u32 {
        self.registers.osr.get()
    }

    pub fn pull_ups(&self) -> u32 {
        self.registers.pusr.get()
    }

    /// Pins under PIO control, as opposed to a peripheral.
    pub fn pio_controlled(&self) -> u32 {
        self.registers.psr.get()
    }

    /// Hand the pins in `mask` to `peripheral`.
    pub fn select_peripheral(&self, mask: u32, peripheral: Peripheral) {
        let absr = self.registers.absr.get();
        self.registers.absr.set(match peripheral {
            Peripheral::A => absr & !mask,
            Peripheral::B => absr | mask,
        });
        self.registers.pdr.set(mask);
    }

    /// Route `output` to its pin. Only valid on PIOC.
    pub fn route_pwm_output(&self, output: PwmOutput) -> Result<(), ErrorCode> {
        if self.port != Port::C {
            return Err(ErrorCode::INVAL);
        }
        let pin = output.pin().ok_or(ErrorCode::INVAL)?;
        self.select_peripheral(pin_mask(pin)?, Peripheral::B);
        Ok(())
    }
}
