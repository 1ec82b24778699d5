// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! General purpose timers TIM2, TIM3 and TIM4.
//!
//! Capture/compare channel setup is staged in a [`ChannelConfig`] owned by
//! the caller and written in one go with [`Timer::apply`]. The CCxS
//! selection bits of CCMRx are only writable while the channel is off, so
//! `apply` turns every channel off, writes both mode registers and then
//! restores CCER.

use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::register_bitfields;

use crate::mmio::{Reg, RegisterBus};
use crate::rcc::Peripheral;

const CR1: usize = 0x00;
const DIER: usize = 0x0C;
const SR: usize = 0x10;
const EGR: usize = 0x14;
const CCMR1: usize = 0x18;
const CCMR2: usize = 0x1C;
const CCER: usize = 0x20;
const CNT: usize = 0x24;
const PSC: usize = 0x28;
const ARR: usize = 0x2C;
const CCR1: usize = 0x34;

/// CC1E | CC2E | CC3E | CC4E
const CCER_ENABLE_ALL: u32 = 0x1111;

register_bitfields![u32,
    CR1 [
        /// Clock division
        CKD OFFSET(8) NUMBITS(2) [],
        /// Auto-reload preload enable
        ARPE OFFSET(7) NUMBITS(1) [],
        /// Center-aligned mode selection
        CMS OFFSET(5) NUMBITS(2) [],
        /// Direction
        DIR OFFSET(4) NUMBITS(1) [],
        /// One-pulse mode
        OPM OFFSET(3) NUMBITS(1) [],
        /// Update request source
        URS OFFSET(2) NUMBITS(1) [],
        /// Update disable
        UDIS OFFSET(1) NUMBITS(1) [],
        /// Counter enable
        CEN OFFSET(0) NUMBITS(1) []
    ],
    DIER [
        CC4IE OFFSET(4) NUMBITS(1) [],
        CC3IE OFFSET(3) NUMBITS(1) [],
        CC2IE OFFSET(2) NUMBITS(1) [],
        CC1IE OFFSET(1) NUMBITS(1) [],
        /// Update interrupt enable
        UIE OFFSET(0) NUMBITS(1) []
    ],
    SR [
        CC4IF OFFSET(4) NUMBITS(1) [],
        CC3IF OFFSET(3) NUMBITS(1) [],
        CC2IF OFFSET(2) NUMBITS(1) [],
        CC1IF OFFSET(1) NUMBITS(1) [],
        /// Update interrupt flag
        UIF OFFSET(0) NUMBITS(1) []
    ],
    EGR [
        /// Update generation
        UG OFFSET(0) NUMBITS(1) []
    ]
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerInstance {
    Tim2,
    Tim3,
    Tim4,
}

impl TimerInstance {
    pub const fn peripheral(self) -> Peripheral {
        match self {
            TimerInstance::Tim2 => Peripheral::Tim2,
            TimerInstance::Tim3 => Peripheral::Tim3,
            TimerInstance::Tim4 => Peripheral::Tim4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    Ch1 = 0,
    Ch2 = 1,
    Ch3 = 2,
    Ch4 = 3,
}

impl Channel {
    /// Shift of the channel's byte within its CCMR register.
    const fn ccmr_shift(self) -> u32 {
        (self as u32 % 2) * 8
    }

    const fn ccer_shift(self) -> u32 {
        self as u32 * 4
    }

    const fn uses_ccmr2(self) -> bool {
        self as u32 >= 2
    }
}

/// OCxM
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputCompareMode {
    Frozen = 0,
    ActiveOnMatch = 1,
    InactiveOnMatch = 2,
    Toggle = 3,
    ForceInactive = 4,
    ForceActive = 5,
    Pwm1 = 6,
    Pwm2 = 7,
}

/// CCxS for input capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CaptureInput {
    /// ICx mapped on TIx
    Direct = 1,
    /// ICx mapped on the neighbouring channel's input
    Indirect = 2,
    /// ICx mapped on TRC
    Trc = 3,
}

/// Capture/compare setup of all four channels: the CCMR1, CCMR2 and CCER
/// values that [`Timer::apply`] writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelConfig {
    pub ccmr1: u32,
    pub ccmr2: u32,
    pub ccer: u32,
}

impl ChannelConfig {
    pub const fn new() -> ChannelConfig {
        ChannelConfig {
            ccmr1: 0,
            ccmr2: 0,
            ccer: 0,
        }
    }

    fn ccmr_mut(&mut self, channel: Channel) -> &mut u32 {
        if channel.uses_ccmr2() {
            &mut self.ccmr2
        } else {
            &mut self.ccmr1
        }
    }

    fn set_ccmr_byte(&mut self, channel: Channel, byte: u32) {
        let shift = channel.ccmr_shift();
        let ccmr = self.ccmr_mut(channel);
        *ccmr = (*ccmr & !(0xFF << shift)) | (byte << shift);
    }

    /// Output compare with CCxS = output, OCxM = `mode`, and OCxPE set when
    /// `preload` is true.
    pub fn set_output_compare(
        &mut self,
        channel: Channel,
        mode: OutputCompareMode,
        preload: bool,
    ) -> &mut Self {
        let byte = ((mode as u32) << 4) | ((preload as u32) << 3);
        self.set_ccmr_byte(channel, byte);
        self
    }

    /// Input capture from `input`, with a digital filter (ICxF, 0..=15) and
    /// an event prescaler (ICxPSC, capture every 1, 2, 4 or 8 events as
    /// 0..=3).
    pub fn set_input_capture(
        &mut self,
        channel: Channel,
        input: CaptureInput,
        filter: u8,
        prescaler: u8,
    ) -> &mut Self {
        let byte =
            ((filter as u32 & 0xF) << 4) | ((prescaler as u32 & 0x3) << 2) | input as u32;
        self.set_ccmr_byte(channel, byte);
        self
    }

    /// Turn the channel on (CCxE), with CCxP selecting inverted polarity or
    /// the falling capture edge.
    pub fn enable_channel(&mut self, channel: Channel, inverted: bool) -> &mut Self {
        let shift = channel.ccer_shift();
        self.ccer = (self.ccer & !(0xF << shift)) | ((1 | ((inverted as u32) << 1)) << shift);
        self
    }

    pub fn disable_channel(&mut self, channel: Channel) -> &mut Self {
        self.ccer &= !(1 << channel.ccer_shift());
        self
    }
}

pub struct Timer<'a, B: RegisterBus> {
    bus: &'a B,
    base: usize,
}

impl<'a, B: RegisterBus> Timer<'a, B> {
    pub const fn new(bus: &'a B, instance: TimerInstance) -> Timer<'a, B> {
        Timer {
            bus,
            base: instance.peripheral().base(),
        }
    }

    fn reg(&self, offset: usize) -> Reg<'a, B> {
        Reg::new(self.bus, self.base + offset)
    }

    fn cr1(&self) -> Reg<'a, B, CR1::Register> {
        Reg::new(self.bus, self.base + CR1)
    }

    fn dier(&self) -> Reg<'a, B, DIER::Register> {
        Reg::new(self.bus, self.base + DIER)
    }

    fn sr(&self) -> Reg<'a, B, SR::Register> {
        Reg::new(self.bus, self.base + SR)
    }

    fn egr(&self) -> Reg<'a, B, EGR::Register> {
        Reg::new(self.bus, self.base + EGR)
    }

    /// Write a staged channel configuration.
    pub fn apply(&self, config: &ChannelConfig) {
        let ccer = self.reg(CCER);
        ccer.set(ccer.get() & !CCER_ENABLE_ALL);
        self.reg(CCMR1).set(config.ccmr1);
        self.reg(CCMR2).set(config.ccmr2);
        ccer.set(config.ccer);
    }

    /// Program prescaler and period, load them with an update event and
    /// start counting.
    pub fn start(&self, prescaler: u16, auto_reload: u16) {
        self.reg(PSC).set(prescaler as u32);
        self.reg(ARR).set(auto_reload as u32);
        self.egr().write(EGR::UG::SET);
        // UG raises UIF as well.
        self.clear_update();
        self.cr1().modify(CR1::CEN::SET);
    }

    pub fn stop(&self) {
        self.cr1().modify(CR1::CEN::CLEAR);
    }

    pub fn is_running(&self) -> bool {
        self.cr1().is_set(CR1::CEN)
    }

    pub fn counter(&self) -> u16 {
        self.reg(CNT).get() as u16
    }

    pub fn set_compare(&self, channel: Channel, value: u16) {
        self.reg(CCR1 + 4 * channel as usize).set(value as u32);
    }

    /// Last captured value, or the compare value for output channels.
    pub fn capture(&self, channel: Channel) -> u16 {
        self.reg(CCR1 + 4 * channel as usize).get() as u16
    }

    pub fn enable_update_interrupt(&self) {
        self.dier().modify(DIER::UIE::SET);
    }

    pub fn is_update_pending(&self) -> bool {
        self.sr().is_set(SR::UIF)
    }

    pub fn clear_update(&self) {
        self.sr().modify(SR::UIF::CLEAR);
    }
}
