// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Reset and clock control, and the peripheral instance table.
//!
//! Every peripheral instance the crate drives has one entry in a `const`
//! table giving its register base address and, where it has one, its
//! enable/reset bit. Drivers resolve their instance through
//! [`Peripheral::info`] once, when they are constructed.

use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::register_bitfields;

use crate::mmio::{Reg, RegisterBus};
use crate::poll::Timeout;

const RCC_BASE: usize = 0x4002_3800;

const AHBRSTR: usize = 0x10;
const APB1RSTR: usize = 0x18;
const AHBENR: usize = 0x1C;
const APB1ENR: usize = 0x24;
const CSR: usize = 0x34;

register_bitfields![u32,
    CSR [
        /// Internal low-speed oscillator enable
        LSION OFFSET(0) NUMBITS(1) [],
        /// Internal low-speed oscillator ready
        LSIRDY OFFSET(1) NUMBITS(1) [],
        /// External low-speed oscillator enable
        LSEON OFFSET(8) NUMBITS(1) [],
        /// External low-speed oscillator ready
        LSERDY OFFSET(9) NUMBITS(1) [],
        /// External low-speed oscillator bypass
        LSEBYP OFFSET(10) NUMBITS(1) [],
        /// RTC and LCD clock source selection
        RTCSEL OFFSET(16) NUMBITS(2) [
            NoClock = 0,
            Lse = 1,
            Lsi = 2,
            Hse = 3
        ],
        /// RTC clock enable
        RTCEN OFFSET(22) NUMBITS(1) [],
        /// RTC software reset
        RTCRST OFFSET(23) NUMBITS(1) []
    ]
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bus {
    Ahb,
    Apb1,
}

/// Enable and reset bit of a peripheral. Both registers of a bus use the
/// same bit position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeripheralClock {
    pub bus: Bus,
    pub bit: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeripheralInfo {
    pub base: usize,
    pub clock: Option<PeripheralClock>,
}

/// Peripheral instances known to this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Peripheral {
    Tim2,
    Tim3,
    Tim4,
    Rtc,
    Lcd,
    Wwdg,
    Iwdg,
    I2c1,
    I2c2,
    Usb,
    Pwr,
    Flash,
}

const fn on(bus: Bus, bit: u8) -> Option<PeripheralClock> {
    Some(PeripheralClock { bus, bit })
}

const fn entry(base: usize, clock: Option<PeripheralClock>) -> PeripheralInfo {
    PeripheralInfo { base, clock }
}

// Indexed by `Peripheral as usize`; keep in declaration order.
const PERIPHERALS: [PeripheralInfo; 12] = [
    entry(0x4000_0000, on(Bus::Apb1, 0)),  // TIM2
    entry(0x4000_0400, on(Bus::Apb1, 1)),  // TIM3
    entry(0x4000_0800, on(Bus::Apb1, 2)),  // TIM4
    entry(0x4000_2800, None),              // RTC, clocked through CSR.RTCEN
    entry(0x4000_2400, on(Bus::Apb1, 9)),  // LCD
    entry(0x4000_2C00, on(Bus::Apb1, 11)), // WWDG
    entry(0x4000_3000, None),              // IWDG, runs from the LSI
    entry(0x4000_5400, on(Bus::Apb1, 21)), // I2C1
    entry(0x4000_5800, on(Bus::Apb1, 22)), // I2C2
    entry(0x4000_5C00, on(Bus::Apb1, 23)), // USB
    entry(0x4000_7000, on(Bus::Apb1, 28)), // PWR
    entry(0x4002_3C00, on(Bus::Ahb, 15)),  // FLASH interface
];

impl Peripheral {
    pub const fn info(self) -> PeripheralInfo {
        PERIPHERALS[self as usize]
    }

    pub const fn base(self) -> usize {
        self.info().base
    }
}

/// RTC/LCD clock source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RtcClockSource {
    Lse,
    Lsi,
    Hse,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The oscillator did not report ready within the budget.
    Timeout,
}

pub struct Rcc<'a, B: RegisterBus> {
    bus: &'a B,
}

impl<'a, B: RegisterBus> Rcc<'a, B> {
    pub const fn new(bus: &'a B) -> Rcc<'a, B> {
        Rcc { bus }
    }

    fn reg(&self, offset: usize) -> Reg<'a, B> {
        Reg::new(self.bus, RCC_BASE + offset)
    }

    fn csr(&self) -> Reg<'a, B, CSR::Register> {
        Reg::new(self.bus, RCC_BASE + CSR)
    }

    fn enable_register(&self, bus: Bus) -> Reg<'a, B> {
        match bus {
            Bus::Ahb => self.reg(AHBENR),
            Bus::Apb1 => self.reg(APB1ENR),
        }
    }

    fn reset_register(&self, bus: Bus) -> Reg<'a, B> {
        match bus {
            Bus::Ahb => self.reg(AHBRSTR),
            Bus::Apb1 => self.reg(APB1RSTR),
        }
    }

    pub fn is_clock_enabled(&self, peripheral: Peripheral) -> bool {
        match peripheral.info().clock {
            Some(clock) => self.enable_register(clock.bus).get() & (1 << clock.bit) != 0,
            None => true,
        }
    }

    /// Enable the bus clock of `peripheral`. Peripherals without a gate in
    /// the enable registers are left alone.
    pub fn enable_clock(&self, peripheral: Peripheral) {
        if let Some(clock) = peripheral.info().clock {
            let reg = self.enable_register(clock.bus);
            reg.set(reg.get() | (1 << clock.bit));
        }
    }

    pub fn disable_clock(&self, peripheral: Peripheral) {
        if let Some(clock) = peripheral.info().clock {
            let reg = self.enable_register(clock.bus);
            reg.set(reg.get() & !(1 << clock.bit));
        }
    }

    /// Pulse the peripheral's reset line.
    pub fn reset(&self, peripheral: Peripheral) {
        if let Some(clock) = peripheral.info().clock {
            let reg = self.reset_register(clock.bus);
            reg.set(reg.get() | (1 << clock.bit));
            reg.set(reg.get() & !(1 << clock.bit));
        }
    }

    pub fn enable_lsi(&self, timeout: Timeout) -> Result<(), Error> {
        self.csr().modify(CSR::LSION::SET);
        timeout
            .poll(|| self.csr().is_set(CSR::LSIRDY).then_some(()))
            .ok_or(Error::Timeout)
    }

    /// Start the 32.768 kHz crystal oscillator.
    ///
    /// The LSE lives in the backup domain, so backup access must be enabled
    /// first (see [`crate::pwr::Pwr::enable_backup_access`]).
    pub fn enable_lse(&self, timeout: Timeout) -> Result<(), Error> {
        self.csr().modify(CSR::LSEON::SET);
        timeout
            .poll(|| self.csr().is_set(CSR::LSERDY).then_some(()))
            .ok_or_else(|| {
                log::warn!("rcc: LSE did not start");
                Error::Timeout
            })
    }

    /// Select the RTC/LCD clock and enable the RTC.
    ///
    /// RTCSEL can only be changed once per backup domain reset; the backup
    /// domain must be writable.
    pub fn enable_rtc_clock(&self, source: RtcClockSource) {
        let sel = match source {
            RtcClockSource::Lse => CSR::RTCSEL::Lse,
            RtcClockSource::Lsi => CSR::RTCSEL::Lsi,
            RtcClockSource::Hse => CSR::RTCSEL::Hse,
        };
        self.csr().modify(sel + CSR::RTCEN::SET);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Memory, SimBus};

    #[test]
    fn table_matches_reference_manual() {
        assert_eq!(Peripheral::I2c1.base(), 0x4000_5400);
        assert_eq!(Peripheral::I2c2.base(), 0x4000_5800);
        assert_eq!(Peripheral::Usb.base(), 0x4000_5C00);
        assert_eq!(
            Peripheral::I2c2.info().clock,
            Some(PeripheralClock {
                bus: Bus::Apb1,
                bit: 22
            })
        );
        assert_eq!(
            Peripheral::Flash.info().clock,
            Some(PeripheralClock {
                bus: Bus::Ahb,
                bit: 15
            })
        );
        assert_eq!(Peripheral::Iwdg.info().clock, None);
    }

    #[test]
    fn enable_and_disable_touch_only_their_bit() {
        let bus = SimBus::new(Memory::new());
        bus.device_mut().poke(RCC_BASE + APB1ENR, 0x1000_0000);
        let rcc = Rcc::new(&bus);

        rcc.enable_clock(Peripheral::I2c1);
        rcc.enable_clock(Peripheral::Usb);
        assert_eq!(bus.device().peek(RCC_BASE + APB1ENR), 0x10A0_0000);
        assert!(rcc.is_clock_enabled(Peripheral::Usb));

        rcc.disable_clock(Peripheral::I2c1);
        assert_eq!(bus.device().peek(RCC_BASE + APB1ENR), 0x1080_0000);
        assert!(!rcc.is_clock_enabled(Peripheral::I2c1));
    }

    #[test]
    fn flash_interface_clock_is_on_ahb() {
        let bus = SimBus::new(Memory::new());
        let rcc = Rcc::new(&bus);

        rcc.enable_clock(Peripheral::Flash);
        rcc.reset(Peripheral::Flash);
        assert_eq!(bus.device().peek(RCC_BASE + AHBENR), 1 << 15);
        assert_eq!(bus.writes_to(RCC_BASE + AHBRSTR), vec![1 << 15, 0]);
        assert_eq!(bus.device().peek(RCC_BASE + APB1ENR), 0);
    }

    #[test]
    fn reset_pulses_the_reset_bit() {
        let bus = SimBus::new(Memory::new());
        let rcc = Rcc::new(&bus);

        rcc.reset(Peripheral::I2c2);
        assert_eq!(bus.writes_to(RCC_BASE + APB1RSTR), vec![1 << 22, 0]);
    }

    #[test]
    fn lse_start_respects_budget() {
        let bus = SimBus::new(Memory::new());
        let rcc = Rcc::new(&bus);

        assert_eq!(rcc.enable_lse(Timeout::Iterations(5)), Err(Error::Timeout));
        assert_eq!(bus.reads_of(RCC_BASE + CSR), 1 + 5);

        bus.device_mut().poke(RCC_BASE + CSR, 1 << 9);
        assert_eq!(rcc.enable_lse(Timeout::Iterations(5)), Ok(()));
    }
}
