// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Window watchdog.
//!
//! The 7-bit down-counter resets the chip when it passes 0x3F, and also when
//! it is refreshed while still above the window value.

use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::register_bitfields;

use crate::mmio::{Reg, RegisterBus};
use crate::rcc::Peripheral;

const CR: usize = 0x00;
const CFR: usize = 0x04;
const SR: usize = 0x08;

/// Lowest counter value that does not reset the chip.
pub const COUNTER_MIN: u8 = 0x40;
pub const COUNTER_MAX: u8 = 0x7F;

register_bitfields![u32,
    CR [
        /// 7-bit counter
        T OFFSET(0) NUMBITS(7) [],
        /// Activation bit, cleared only by reset
        WDGA OFFSET(7) NUMBITS(1) []
    ],
    CFR [
        /// 7-bit window value
        W OFFSET(0) NUMBITS(7) [],
        /// Timer base
        WDGTB OFFSET(7) NUMBITS(2) [],
        /// Early wakeup interrupt
        EWI OFFSET(9) NUMBITS(1) []
    ],
    SR [
        /// Early wakeup interrupt flag
        EWIF OFFSET(0) NUMBITS(1) []
    ]
];

/// Counter clock is PCLK1 / 4096 / prescaler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Prescaler {
    Div1 = 0,
    Div2 = 1,
    Div4 = 2,
    Div8 = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Counter outside 0x40..=0x7F.
    InvalidCounter,
    /// Window below 0x40 or above 0x7F.
    InvalidWindow,
    /// The counter is still above the window; refreshing now would reset.
    TooEarly,
}

fn check_counter(counter: u8) -> Result<(), Error> {
    if (COUNTER_MIN..=COUNTER_MAX).contains(&counter) {
        Ok(())
    } else {
        Err(Error::InvalidCounter)
    }
}

pub struct Wwdg<'a, B: RegisterBus> {
    bus: &'a B,
    base: usize,
}

impl<'a, B: RegisterBus> Wwdg<'a, B> {
    pub const fn new(bus: &'a B) -> Wwdg<'a, B> {
        Wwdg {
            bus,
            base: Peripheral::Wwdg.base(),
        }
    }

    fn cr(&self) -> Reg<'a, B, CR::Register> {
        Reg::new(self.bus, self.base + CR)
    }

    fn cfr(&self) -> Reg<'a, B, CFR::Register> {
        Reg::new(self.bus, self.base + CFR)
    }

    fn sr(&self) -> Reg<'a, B, SR::Register> {
        Reg::new(self.bus, self.base + SR)
    }

    pub fn start(&self, prescaler: Prescaler, window: u8, counter: u8) -> Result<(), Error> {
        check_counter(counter)?;
        if !(COUNTER_MIN..=COUNTER_MAX).contains(&window) {
            return Err(Error::InvalidWindow);
        }

        self.cfr()
            .modify(CFR::W.val(window as u32) + CFR::WDGTB.val(prescaler as u32));
        self.cr()
            .write(CR::WDGA::SET + CR::T.val(counter as u32));
        log::debug!("wwdg: started, window {:#04x} counter {:#04x}", window, counter);
        Ok(())
    }

    pub fn counter(&self) -> u8 {
        self.cr().read(CR::T) as u8
    }

    /// Reload the counter with `counter`, refusing to do so while the counter
    /// is above the window.
    pub fn feed(&self, counter: u8) -> Result<(), Error> {
        check_counter(counter)?;
        let window = self.cfr().read(CFR::W);
        if self.cr().read(CR::T) > window {
            return Err(Error::TooEarly);
        }
        self.cr()
            .write(CR::WDGA::SET + CR::T.val(counter as u32));
        Ok(())
    }

    pub fn enable_early_wakeup_interrupt(&self) {
        self.cfr().modify(CFR::EWI::SET);
    }

    pub fn is_early_wakeup_pending(&self) -> bool {
        self.sr().is_set(SR::EWIF)
    }

    pub fn clear_early_wakeup(&self) {
        self.sr().write(SR::EWIF::CLEAR);
    }
}
