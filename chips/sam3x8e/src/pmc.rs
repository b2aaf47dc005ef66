// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Peripheral clock gating of the Power Management Controller (PMC).
//!
//! Every peripheral has a clock that is gated off after reset; its registers
//! cannot be accessed until the clock is enabled. Identifiers below 32 are
//! controlled by the first `PCER`/`PCDR`/`PCSR` bank, the rest by the second.

use log::warn;
use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::registers::{ReadOnly, WriteOnly};
use tock_registers::register_structs;

use crate::static_ref::StaticRef;
use crate::ErrorCode;

register_structs! {
    pub PmcRegisters {
        (0x000 => _reserved0),
        /// Peripheral clock enable register 0
        (0x010 => pcer0: WriteOnly<u32>),
        /// Peripheral clock disable register 0
        (0x014 => pcdr0: WriteOnly<u32>),
        /// Peripheral clock status register 0
        (0x018 => pcsr0: ReadOnly<u32>),
        (0x01C => _reserved1),
        /// Peripheral clock enable register 1
        (0x100 => pcer1: WriteOnly<u32>),
        /// Peripheral clock disable register 1
        (0x104 => pcdr1: WriteOnly<u32>),
        /// Peripheral clock status register 1
        (0x108 => pcsr1: ReadOnly<u32>),
        (0x10C => @END),
    }
}

pub const PMC_BASE: StaticRef<PmcRegisters> =
    unsafe { StaticRef::new(0x400E_0600 as *const PmcRegisters) };

/// Peripheral identifiers with a gated clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum PeripheralId {
    UART = 8,
    SMC = 9,
    PIOA = 11,
    PIOB = 12,
    PIOC = 13,
    PIOD = 14,
    USART0 = 17,
    USART1 = 18,
    USART2 = 19,
    USART3 = 20,
    HSMCI = 21,
    TWI0 = 22,
    TWI1 = 23,
    SPI0 = 24,
    SSC = 26,
    TC0 = 27,
    TC1 = 28,
    TC2 = 29,
    TC3 = 30,
    TC4 = 31,
    TC5 = 32,
    TC6 = 33,
    TC7 = 34,
    TC8 = 35,
    PWM = 36,
    ADC = 37,
    DACC = 38,
    DMAC = 39,
    UOTGHS = 40,
    TRNG = 41,
    EMAC = 42,
    CAN0 = 43,
    CAN1 = 44,
}

impl PeripheralId {
    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Index of the register bank and bit within it.
    fn bank_bit(self) -> (usize, u32) {
        let id = self.id();
        ((id / 32) as usize, 1 << (id % 32))
    }
}

impl TryFrom<u32> for PeripheralId {
    type Error = ErrorCode;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        let peripheral = match id {
            8 => PeripheralId::UART,
            9 => PeripheralId::SMC,
            11 => PeripheralId::PIOA,
            12 => PeripheralId::PIOB,
            13 => PeripheralId::PIOC,
            14 => PeripheralId::PIOD,
            17 => PeripheralId::USART0,
            18 => PeripheralId::USART1,
            19 => PeripheralId::USART2,
            20 => PeripheralId::USART3,
            21 => PeripheralId::HSMCI,
            22 => PeripheralId::TWI0,
            23 => PeripheralId::TWI1,
            24 => PeripheralId::SPI0,
            26 => PeripheralId::SSC,
            27 => PeripheralId::TC0,
            28 => PeripheralId::TC1,
            29 => PeripheralId::TC2,
            30 => PeripheralId::TC3,
            31 => PeripheralId::TC4,
            32 => PeripheralId::TC5,
            33 => PeripheralId::TC6,
            34 => PeripheralId::TC7,
            35 => PeripheralId::TC8,
            36 => PeripheralId::PWM,
            37 => PeripheralId::ADC,
            38 => PeripheralId::DACC,
            39 => PeripheralId::DMAC,
            40 => PeripheralId::UOTGHS,
            41 => PeripheralId::TRNG,
            42 => PeripheralId::EMAC,
            43 => PeripheralId::CAN0,
            44 => PeripheralId::CAN1,
            _ => return Err(ErrorCode::INVAL),
        };
        Ok(peripheral)
    }
}

/// Gating of peripheral clocks.
pub trait ClockGate {
    fn enable(&self, peripheral: PeripheralId) -> Result<(), ErrorCode>;
    fn disable(&self, peripheral: PeripheralId) -> Result<(), ErrorCode>;
    fn is_enabled(&self, peripheral: PeripheralId) -> bool;
}

pub struct Pmc {
    registers: StaticRef<PmcRegisters>,
}

impl Pmc {
    pub const fn new() -> Self {
        Self::with_base(PMC_BASE)
    }

    pub const fn with_base(registers: StaticRef<PmcRegisters>) -> Self {
        Pmc { registers }
    }
}

impl Default for Pmc {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockGate for Pmc {
    /// Enable the clock of `peripheral` and check that the status register
    /// reports it running.
    fn enable(&self, peripheral: PeripheralId) -> Result<(), ErrorCode> {
        match peripheral.bank_bit() {
            (0, bit) => self.registers.pcer0.set(bit),
            (_, bit) => self.registers.pcer1.set(bit),
        }
        if self.is_enabled(peripheral) {
            Ok(())
        } else {
            warn!("pmc: clock of {:?} did not start", peripheral);
            Err(ErrorCode::FAIL)
        }
    }

    fn disable(&self, peripheral: PeripheralId) -> Result<(), ErrorCode> {
        match peripheral.bank_bit() {
            (0, bit) => self.registers.pcdr0.set(bit),
            (_, bit) => self.registers.pcdr1.set(bit),
        }
        if self.is_enabled(peripheral) {
            warn!("pmc: clock of {:?} did not stop", peripheral);
            Err(ErrorCode::FAIL)
        } else {
            Ok(())
        }
    }

    fn is_enabled(&self, peripheral: PeripheralId) -> bool {
        let (bank, bit) = peripheral.bank_bit();
        let status = if bank == 0 {
            self.registers.pcsr0.get()
        } else {
            self.registers.pcsr1.get()
        };
        status & bit != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    const WORDS: usize = 0x10C / 4;

    /// Plain memory laid out like the PMC. Status bits do not follow the
    /// enable and disable registers, they are set by the test.
    struct Memory(Box<[Cell<u32>; WORDS]>);

    impl Memory {
        fn new() -> Self {
            Memory(Box::new(core::array::from_fn(|_| Cell::new(0))))
        }

        fn pmc(&self) -> Pmc {
            Pmc::with_base(unsafe { StaticRef::new(self.0.as_ptr() as *const PmcRegisters) })
        }

        fn read(&self, offset: usize) -> u32 {
            self.0[offset / 4].get()
        }

        fn write(&self, offset: usize, value: u32) {
            self.0[offset / 4].set(value)
        }
    }

    #[test]
    fn raw_identifiers() {
        assert_eq!(PeripheralId::try_from(36), Ok(PeripheralId::PWM));
        assert_eq!(PeripheralId::try_from(13), Ok(PeripheralId::PIOC));
        assert_eq!(PeripheralId::try_from(10), Err(ErrorCode::INVAL));
        assert_eq!(PeripheralId::try_from(45), Err(ErrorCode::INVAL));
        for id in 0..64 {
            if let Ok(peripheral) = PeripheralId::try_from(id) {
                assert_eq!(peripheral.id(), id);
            }
        }
    }

    #[test]
    fn enable_writes_the_matching_bank() {
        let memory = Memory::new();
        let pmc = memory.pmc();

        memory.write(0x108, 1 << 4);
        assert_eq!(pmc.enable(PeripheralId::PWM), Ok(()));
        assert_eq!(memory.read(0x100), 1 << 4);
        assert_eq!(memory.read(0x010), 0);

        memory.write(0x018, 1 << 13);
        assert_eq!(pmc.enable(PeripheralId::PIOC), Ok(()));
        assert_eq!(memory.read(0x010), 1 << 13);
    }

    #[test]
    fn status_is_verified() {
        let memory = Memory::new();
        let pmc = memory.pmc();

        assert_eq!(pmc.enable(PeripheralId::ADC), Err(ErrorCode::FAIL));
        assert!(!pmc.is_enabled(PeripheralId::ADC));

        memory.write(0x108, 1 << 5);
        assert!(pmc.is_enabled(PeripheralId::ADC));
        assert_eq!(pmc.disable(PeripheralId::ADC), Err(ErrorCode::FAIL));
        assert_eq!(memory.read(0x104), 1 << 5);

        memory.write(0x108, 0);
        assert_eq!(pmc.disable(PeripheralId::ADC), Ok(()));
    }
}
