// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! PWM controller driver for the SAM3X8E.
//!
//! The controller has eight channels. Each channel counts ticks of its clock
//! up to its period and toggles its output when the counter crosses the duty
//! cycle. A channel clock is MCK divided by one of eleven fixed prescalers,
//! or one of the two auxiliary clocks A and B, which divide a prescaled MCK
//! by an 8-bit divisor and are shared by all channels assigned to them.
//!
//! The driver turns frequencies in Hz into those register values (see
//! [`resolver`]) and commits them. Every operation validates and resolves all
//! of its inputs before touching a register, so a failed call leaves the
//! controller exactly as it found it. Mode and period registers are only
//! written while the affected channels are suspended, and channels that were
//! running are enabled again afterwards.
//!
//! Usage
//! -----
//!
//! ```rust,ignore
//! let pwm = sam3x8e::pwm::Pwm::new();
//! pwm.init_default(&pmc)?;
//! pwm.set_alignment(ChannelNumber::Ch0.into(), Alignment::Center)?;
//! pwm.set_frequency(ChannelNumber::Ch0.into(), 20_000)?;
//! pwm.set_duty_cycle(ChannelNumber::Ch0.into(), pwm.period(ChannelNumber::Ch0) / 4)?;
//! pwm.enable(ChannelNumber::Ch0.into())?;
//! ```

pub mod channel;
pub mod registers;
pub mod resolver;
pub mod sim;

pub use self::channel::{ChannelMask, ChannelNumber, ChannelSuspension, NUM_CHANNELS};
pub use self::registers::{PwmRegisterBank, Sam3xPwmRegisters, PWM_BASE};

use log::debug;
use tock_registers::fields::FieldValue;
use tock_registers::LocalRegisterCopy;

use self::registers::{CLK, CMR};
use self::resolver::AlignmentSet;
use crate::config::CONFIG;
use crate::pmc::{ClockGate, PeripheralId};
use crate::ErrorCode;

/// Fixed MCK prescalers, in `CPRE`/`PREx` code order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Prescaler {
    Div1 = 0,
    Div2 = 1,
    Div4 = 2,
    Div8 = 3,
    Div16 = 4,
    Div32 = 5,
    Div64 = 6,
    Div128 = 7,
    Div256 = 8,
    Div512 = 9,
    Div1024 = 10,
}

impl Prescaler {
    pub const ALL: [Prescaler; 11] = [
        Prescaler::Div1,
        Prescaler::Div2,
        Prescaler::Div4,
        Prescaler::Div8,
        Prescaler::Div16,
        Prescaler::Div32,
        Prescaler::Div64,
        Prescaler::Div128,
        Prescaler::Div256,
        Prescaler::Div512,
        Prescaler::Div1024,
    ];

    /// The factor MCK is divided by.
    pub const fn divider(self) -> u32 {
        1 << self as u32
    }

    pub const fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Prescaler> {
        usize::try_from(code)
            .ok()
            .and_then(|index| Prescaler::ALL.get(index).copied())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alignment {
    /// The counter ramps up and restarts from zero.
    Left,
    /// The counter ramps up then down, halving the output frequency.
    Center,
}

impl Alignment {
    /// Clock ticks per period unit.
    pub const fn factor(self) -> u32 {
        match self {
            Alignment::Left => 1,
            Alignment::Center => 2,
        }
    }

    fn field(self) -> FieldValue<u32, CMR::Register> {
        match self {
            Alignment::Left => CMR::CALG::Left,
            Alignment::Center => CMR::CALG::Center,
        }
    }
}

/// Output level at the start of a period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Polarity {
    Low,
    High,
}

impl Polarity {
    fn field(self) -> FieldValue<u32, CMR::Register> {
        match self {
            Polarity::Low => CMR::CPOL::Low,
            Polarity::High => CMR::CPOL::High,
        }
    }
}

/// One of the two auxiliary clocks of the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuxClock {
    A,
    B,
}

impl AuxClock {
    fn fields(self, setting: ClockSetting) -> FieldValue<u32, CLK::Register> {
        let prescaler = setting.prescaler.code();
        let divisor = setting.divisor as u32;
        match self {
            AuxClock::A => CLK::PREA.val(prescaler) + CLK::DIVA.val(divisor),
            AuxClock::B => CLK::PREB.val(prescaler) + CLK::DIVB.val(divisor),
        }
    }

    fn divisor_field(self, divisor: u8) -> FieldValue<u32, CLK::Register> {
        match self {
            AuxClock::A => CLK::DIVA.val(divisor as u32),
            AuxClock::B => CLK::DIVB.val(divisor as u32),
        }
    }

    fn setting(self, clk: LocalRegisterCopy<u32, CLK::Register>) -> Option<ClockSetting> {
        let (prescaler, divisor) = match self {
            AuxClock::A => (clk.read(CLK::PREA), clk.read(CLK::DIVA)),
            AuxClock::B => (clk.read(CLK::PREB), clk.read(CLK::DIVB)),
        };
        Prescaler::from_code(prescaler).map(|prescaler| ClockSetting {
            prescaler,
            divisor: divisor as u8,
        })
    }
}

impl TryFrom<u32> for AuxClock {
    type Error = ErrorCode;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(AuxClock::A),
            1 => Ok(AuxClock::B),
            _ => Err(ErrorCode::INVAL),
        }
    }
}

/// `CPRE` codes selecting the auxiliary clocks.
const CPRE_CLOCK_A: u32 = 11;
const CPRE_CLOCK_B: u32 = 12;

/// The clock a channel counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockSource {
    Prescaler(Prescaler),
    Clock(AuxClock),
}

impl ClockSource {
    /// The `CPRE` field value selecting this source.
    pub fn code(self) -> u32 {
        match self {
            ClockSource::Prescaler(prescaler) => prescaler.code(),
            ClockSource::Clock(AuxClock::A) => CPRE_CLOCK_A,
            ClockSource::Clock(AuxClock::B) => CPRE_CLOCK_B,
        }
    }

    pub fn from_code(code: u32) -> Option<ClockSource> {
        match code {
            CPRE_CLOCK_A => Some(ClockSource::Clock(AuxClock::A)),
            CPRE_CLOCK_B => Some(ClockSource::Clock(AuxClock::B)),
            _ => Prescaler::from_code(code).map(ClockSource::Prescaler),
        }
    }

    fn field(self) -> FieldValue<u32, CMR::Register> {
        CMR::CPRE.val(self.code())
    }
}

/// Prescaler and divisor of an auxiliary clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockSetting {
    pub prescaler: Prescaler,
    /// Divides the prescaled MCK, 0 turns the clock off.
    pub divisor: u8,
}

impl ClockSetting {
    pub const OFF: ClockSetting = ClockSetting {
        prescaler: Prescaler::Div1,
        divisor: 0,
    };

    /// MCK ticks per tick of this clock, `None` while the clock is off.
    fn ticks(self) -> Option<u64> {
        match self.divisor {
            0 => None,
            divisor => Some(u64::from(self.prescaler.divider()) * u64::from(divisor)),
        }
    }

    /// The clock frequency realized from `master_clock_hz`, rounded to the
    /// nearest Hz.
    pub fn frequency_hz(self, master_clock_hz: u32) -> Option<u32> {
        self.ticks()
            .map(|ticks| resolver::div_round(u64::from(master_clock_hz), ticks) as u32)
    }
}

/// Settings of both auxiliary clocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockSettings {
    pub a: ClockSetting,
    pub b: ClockSetting,
}

impl Default for ClockSettings {
    fn default() -> Self {
        ClockSettings {
            a: ClockSetting::OFF,
            b: ClockSetting::OFF,
        }
    }
}

/// Where [`Pwm::init_channel`] derives the channel frequency from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrequencySource {
    /// Pick one of the fixed prescalers.
    Prescaler,
    /// Program the auxiliary clock for the frequency and count it.
    Clock(AuxClock),
}

/// Complete configuration of one or more channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelSetting {
    pub channels: ChannelMask,
    pub polarity: Polarity,
    pub alignment: Alignment,
    pub duty_cycle: u16,
    pub source: FrequencySource,
    pub frequency_hz: u32,
}

fn unrepresentable(frequency_hz: u32) -> ErrorCode {
    debug!("pwm: {} Hz cannot be represented", frequency_hz);
    ErrorCode::FREQUENCY
}

pub struct Pwm<B: PwmRegisterBank = Sam3xPwmRegisters> {
    registers: B,
    master_clock_hz: u32,
}

impl Pwm<Sam3xPwmRegisters> {
    /// The PWM controller of the chip, clocked from the configured MCK.
    pub const fn new() -> Self {
        Pwm {
            registers: Sam3xPwmRegisters::new(),
            master_clock_hz: CONFIG.master_clock_hz,
        }
    }
}

impl<B: PwmRegisterBank> Pwm<B> {
    pub fn with_registers(registers: B) -> Self {
        Self::with_master_clock(registers, CONFIG.master_clock_hz)
    }

    pub fn with_master_clock(registers: B, master_clock_hz: u32) -> Self {
        Pwm {
            registers,
            master_clock_hz,
        }
    }

    pub fn registers(&self) -> &B {
        &self.registers
    }

    pub fn master_clock_hz(&self) -> u32 {
        self.master_clock_hz
    }

    // Peripheral lifecycle

    /// Enable the peripheral clock with both auxiliary clocks off.
    pub fn init_default<C: ClockGate + ?Sized>(&self, pmc: &C) -> Result<(), ErrorCode> {
        self.init(pmc, ClockSettings::default())
    }

    /// Enable the peripheral clock and program both auxiliary clocks.
    pub fn init<C: ClockGate + ?Sized>(
        &self,
        pmc: &C,
        clocks: ClockSettings,
    ) -> Result<(), ErrorCode> {
        pmc.enable(PeripheralId::PWM)?;
        self.registers
            .write_clock(AuxClock::A.fields(clocks.a) + AuxClock::B.fields(clocks.b));
        debug!("pwm: initialized with clock A {:?} and clock B {:?}", clocks.a, clocks.b);
        Ok(())
    }

    /// Gate the peripheral clock off. Register contents are retained.
    pub fn shutdown<C: ClockGate + ?Sized>(&self, pmc: &C) -> Result<(), ErrorCode> {
        pmc.disable(PeripheralId::PWM)
    }

    /// Disable every channel and return the clock, mode, period and duty
    /// cycle registers to their reset values.
    pub fn reset(&self) {
        self.registers.disable(ChannelMask::ALL);
        self.registers.write_clock(
            AuxClock::A.fields(ClockSetting::OFF) + AuxClock::B.fields(ClockSetting::OFF),
        );
        for channel in ChannelNumber::ALL {
            self.registers
                .write_mode(channel, ClockSource::Prescaler(Prescaler::Div1).field());
            self.registers.write_period(channel, 0);
            self.set_duty_now(channel, 0);
        }
    }

    pub fn close<C: ClockGate + ?Sized>(&self, pmc: &C) -> Result<(), ErrorCode> {
        self.reset();
        self.shutdown(pmc)
    }

    // Channel state

    pub fn enable(&self, channels: ChannelMask) -> Result<(), ErrorCode> {
        self.registers.enable(channels.require_nonempty()?);
        Ok(())
    }

    pub fn disable(&self, channels: ChannelMask) -> Result<(), ErrorCode> {
        self.registers.disable(channels.require_nonempty()?);
        Ok(())
    }

    pub fn is_enabled(&self, channel: ChannelNumber) -> bool {
        self.registers.status().contains(channel)
    }

    pub fn enabled_channels(&self) -> ChannelMask {
        self.registers.status()
    }

    /// Suspend the running channels among `channels` until the returned guard
    /// is dropped.
    pub fn suspend(&self, channels: ChannelMask) -> ChannelSuspension<'_, B> {
        ChannelSuspension::new(&self.registers, channels)
    }

    // Frequency

    /// Set the frequency of every selected channel using the fixed
    /// prescalers, taking each channel's alignment into account.
    pub fn set_frequency(&self, channels: ChannelMask, frequency_hz: u32) -> Result<(), ErrorCode> {
        let channels = channels.require_nonempty()?;

        let mut timings = [None; NUM_CHANNELS];
        for channel in channels.channels() {
            let alignment = self.alignment(channel);
            let timing = resolver::resolve_channel(self.master_clock_hz, frequency_hz, alignment)
                .ok_or_else(|| unrepresentable(frequency_hz))?;
            debug!("pwm: {:?} at {} Hz: {:?}", channel, frequency_hz, timing);
            timings[channel.index()] = Some(timing);
        }

        let _suspension = self.suspend(channels);
        for (channel, timing) in ChannelNumber::ALL.into_iter().zip(timings) {
            if let Some(timing) = timing {
                self.registers
                    .modify_mode(channel, ClockSource::Prescaler(timing.prescaler).field());
                self.commit_period(channel, timing.period);
            }
        }
        Ok(())
    }

    /// Set the frequency of an auxiliary clock. Only the fields of `clock`
    /// are written.
    ///
    /// Running channels that count `clock` are suspended for the write and
    /// continue at the new clock frequency.
    pub fn set_clock_frequency(&self, clock: AuxClock, frequency_hz: u32) -> Result<(), ErrorCode> {
        let setting = resolver::resolve_clock(self.master_clock_hz, frequency_hz)
            .ok_or_else(|| unrepresentable(frequency_hz))?;
        debug!("pwm: clock {:?} at {} Hz: {:?}", clock, frequency_hz, setting);
        let _suspension = self.suspend(self.channels_on(clock));
        self.registers.modify_clock(clock.fields(setting));
        Ok(())
    }

    /// Set the frequency of every selected channel by programming `clock`
    /// and counting it.
    ///
    /// The clock is shared, so a single setting is searched for that gives
    /// every selected channel, whatever its alignment, a period in range.
    pub fn set_frequency_with_clock(
        &self,
        channels: ChannelMask,
        frequency_hz: u32,
        clock: AuxClock,
    ) -> Result<(), ErrorCode> {
        let channels = channels.require_nonempty()?;
        let mck = self.master_clock_hz;

        let mut alignments = AlignmentSet::default();
        for channel in channels.channels() {
            alignments.insert(self.alignment(channel));
        }
        let setting = resolver::resolve_clocked(mck, frequency_hz, alignments)
            .ok_or_else(|| unrepresentable(frequency_hz))?;

        let mut periods = [0; NUM_CHANNELS];
        for channel in channels.channels() {
            periods[channel.index()] =
                resolver::clocked_period(mck, setting, frequency_hz, self.alignment(channel))
                    .ok_or(ErrorCode::FREQUENCY)?;
        }
        debug!(
            "pwm: {:?} at {} Hz through clock {:?}: {:?}",
            channels, frequency_hz, clock, setting
        );

        let _suspension = self.suspend(channels);
        self.registers.modify_clock(clock.fields(setting));
        for channel in channels.channels() {
            self.registers
                .modify_mode(channel, ClockSource::Clock(clock).field());
            self.commit_period(channel, periods[channel.index()]);
        }
        Ok(())
    }

    /// Set the divisor of `clock` to zero. The prescaler and the other
    /// clock are left alone. Channels counting `clock` stop counting but
    /// keep their enable state.
    pub fn turn_off_clock(&self, clock: AuxClock) {
        let _suspension = self.suspend(self.channels_on(clock));
        self.registers.modify_clock(clock.divisor_field(0));
    }

    /// Program `clock` verbatim, suspending the running channels that count
    /// it.
    pub fn set_clock(&self, clock: AuxClock, setting: ClockSetting) {
        let _suspension = self.suspend(self.channels_on(clock));
        self.registers.modify_clock(clock.fields(setting));
    }

    /// The programmed setting of `clock`, `None` if its prescaler field holds
    /// a reserved code.
    pub fn clock_setting(&self, clock: AuxClock) -> Option<ClockSetting> {
        clock.setting(self.registers.clock())
    }

    /// Realized frequency of `clock`, `None` while it is off.
    pub fn clock_frequency(&self, clock: AuxClock) -> Option<u32> {
        self.clock_setting(clock)?.frequency_hz(self.master_clock_hz)
    }

    /// Realized output frequency of `channel`, `None` while its period is
    /// zero or the auxiliary clock it counts is off.
    pub fn output_frequency(&self, channel: ChannelNumber) -> Option<u32> {
        let period = self.registers.period(channel);
        if period == 0 {
            return None;
        }
        let ticks_per_clock = match self.clock_source(channel)? {
            ClockSource::Prescaler(prescaler) => u64::from(prescaler.divider()),
            ClockSource::Clock(clock) => self.clock_setting(clock)?.ticks()?,
        };
        let ticks =
            ticks_per_clock * u64::from(self.alignment(channel).factor()) * u64::from(period);
        Some(resolver::div_round(u64::from(self.master_clock_hz), ticks) as u32)
    }

    // Clock source

    /// Make the selected channels count `clock`. The clock itself is not
    /// touched.
    pub fn assign_clock(&self, channels: ChannelMask, clock: AuxClock) -> Result<(), ErrorCode> {
        self.set_clock_source(channels, ClockSource::Clock(clock))
    }

    pub fn set_clock_source(
        &self,
        channels: ChannelMask,
        source: ClockSource,
    ) -> Result<(), ErrorCode> {
        self.modify_modes(channels, source.field())
    }

    /// The clock `channel` counts, `None` for a reserved `CPRE` code.
    pub fn clock_source(&self, channel: ChannelNumber) -> Option<ClockSource> {
        ClockSource::from_code(self.registers.mode(channel).read(CMR::CPRE))
    }

    // Mode

    pub fn set_polarity(&self, channels: ChannelMask, polarity: Polarity) -> Result<(), ErrorCode> {
        self.modify_modes(channels, polarity.field())
    }

    pub fn polarity(&self, channel: ChannelNumber) -> Polarity {
        if self.registers.mode(channel).is_set(CMR::CPOL) {
            Polarity::High
        } else {
            Polarity::Low
        }
    }

    /// Change the alignment of the selected channels. The period is kept, so
    /// the output frequency doubles or halves until the frequency is set
    /// again.
    pub fn set_alignment(
        &self,
        channels: ChannelMask,
        alignment: Alignment,
    ) -> Result<(), ErrorCode> {
        self.modify_modes(channels, alignment.field())
    }

    pub fn alignment(&self, channel: ChannelNumber) -> Alignment {
        if self.registers.mode(channel).is_set(CMR::CALG) {
            Alignment::Center
        } else {
            Alignment::Left
        }
    }

    // Period and duty cycle

    pub fn set_period(&self, channels: ChannelMask, period: u16) -> Result<(), ErrorCode> {
        let channels = channels.require_nonempty()?;
        let _suspension = self.suspend(channels);
        for channel in channels.channels() {
            self.commit_period(channel, period);
        }
        Ok(())
    }

    pub fn period(&self, channel: ChannelNumber) -> u16 {
        self.registers.period(channel)
    }

    /// Set the duty cycle of every selected channel.
    ///
    /// Fails without writing anything if `duty_cycle` exceeds the period of
    /// any selected channel. Running channels take the new value over at the
    /// end of their current period.
    pub fn set_duty_cycle(&self, channels: ChannelMask, duty_cycle: u16) -> Result<(), ErrorCode> {
        let channels = channels.require_nonempty()?;
        if let Some(channel) = channels
            .channels()
            .find(|channel| duty_cycle > self.registers.period(*channel))
        {
            debug!("pwm: duty cycle {} exceeds period of {:?}", duty_cycle, channel);
            return Err(ErrorCode::DUTY);
        }

        let running = self.registers.status();
        for channel in channels.channels() {
            if running.contains(channel) {
                self.registers.write_duty_update(channel, duty_cycle);
            } else {
                self.set_duty_now(channel, duty_cycle);
            }
        }
        Ok(())
    }

    /// The duty cycle currently in effect. A pending update of a running
    /// channel is not visible until the channel latched it.
    pub fn duty_cycle(&self, channel: ChannelNumber) -> u16 {
        self.registers.duty(channel)
    }

    // Channel initialization

    /// Configure mode, clock, period and duty cycle of the selected channels
    /// in one step.
    pub fn init_channel(&self, setting: ChannelSetting) -> Result<(), ErrorCode> {
        let channels = setting.channels.require_nonempty()?;
        let mck = self.master_clock_hz;
        let frequency_hz = setting.frequency_hz;

        let (source, clock, period) = match setting.source {
            FrequencySource::Prescaler => {
                let timing = resolver::resolve_channel(mck, frequency_hz, setting.alignment)
                    .ok_or_else(|| unrepresentable(frequency_hz))?;
                (ClockSource::Prescaler(timing.prescaler), None, timing.period)
            }
            FrequencySource::Clock(clock) => {
                let clock_setting = resolver::resolve_clocked(
                    mck,
                    frequency_hz,
                    AlignmentSet::single(setting.alignment),
                )
                .ok_or_else(|| unrepresentable(frequency_hz))?;
                let period =
                    resolver::clocked_period(mck, clock_setting, frequency_hz, setting.alignment)
                        .ok_or(ErrorCode::FREQUENCY)?;
                (ClockSource::Clock(clock), Some((clock, clock_setting)), period)
            }
        };
        if setting.duty_cycle > period {
            debug!("pwm: duty cycle {} exceeds period {}", setting.duty_cycle, period);
            return Err(ErrorCode::DUTY);
        }

        let _suspension = self.suspend(channels);
        if let Some((clock, clock_setting)) = clock {
            self.registers.modify_clock(clock.fields(clock_setting));
        }
        for channel in channels.channels() {
            self.registers.write_mode(
                channel,
                setting.alignment.field() + setting.polarity.field() + source.field(),
            );
            self.registers.write_period(channel, period);
            self.set_duty_now(channel, setting.duty_cycle);
        }
        debug!(
            "pwm: {:?} initialized, {:?} period {} duty cycle {}",
            channels, source, period, setting.duty_cycle
        );
        Ok(())
    }

    /// Channels whose mode selects `clock`.
    fn channels_on(&self, clock: AuxClock) -> ChannelMask {
        ChannelNumber::ALL
            .into_iter()
            .filter(|channel| self.clock_source(*channel) == Some(ClockSource::Clock(clock)))
            .fold(ChannelMask::NONE, |mask, channel| mask | channel)
    }

    fn modify_modes(
        &self,
        channels: ChannelMask,
        field: FieldValue<u32, CMR::Register>,
    ) -> Result<(), ErrorCode> {
        let channels = channels.require_nonempty()?;
        let _suspension = self.suspend(channels);
        for channel in channels.channels() {
            self.registers.modify_mode(channel, field);
        }
        Ok(())
    }

    /// Write the period of a suspended or disabled channel, lowering its duty
    /// cycle to the new period if needed.
    ///
    /// A duty cycle update still waiting in `CDTYUPDx` is replaced by the
    /// bounded value in effect, since it may exceed the new period.
    fn commit_period(&self, channel: ChannelNumber, period: u16) {
        self.registers.write_period(channel, period);
        self.set_duty_now(channel, self.registers.duty(channel).min(period));
    }

    /// Write the duty cycle of a suspended or disabled channel.
    ///
    /// `CDTYUPDx` gets the same value so that a pending update from an
    /// earlier run cannot overwrite it once the channel runs again.
    fn set_duty_now(&self, channel: ChannelNumber, duty_cycle: u16) {
        self.registers.write_duty(channel, duty_cycle);
        self.registers.write_duty_update(channel, duty_cycle);
    }
}
