// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Real-time clock: write protection, initialization mode and shadow
//! register synchronisation.
//!
//! The RTC sits in the backup domain: backup access has to be enabled in
//! PWR and the RTC clock selected in RCC before any of this works.

use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::register_bitfields;

use crate::config::CONFIG;
use crate::mmio::{Reg, RegisterBus};
use crate::poll::Timeout;
use crate::rcc::Peripheral;

const ISR: usize = 0x0C;
const PRER: usize = 0x10;
const WPR: usize = 0x24;

register_bitfields![u32,
    ISR [
        /// Alarm A write allowed
        ALRAWF OFFSET(0) NUMBITS(1) [],
        /// Shift operation pending
        SHPF OFFSET(3) NUMBITS(1) [],
        /// Calendar initialized
        INITS OFFSET(4) NUMBITS(1) [],
        /// Registers synchronization flag
        RSF OFFSET(5) NUMBITS(1) [],
        /// Initialization flag
        INITF OFFSET(6) NUMBITS(1) [],
        /// Initialization mode
        INIT OFFSET(7) NUMBITS(1) []
    ],
    PRER [
        /// Synchronous prescaler factor
        PREDIV_S OFFSET(0) NUMBITS(15) [],
        /// Asynchronous prescaler factor
        PREDIV_A OFFSET(16) NUMBITS(7) []
    ],
    WPR [
        KEY OFFSET(0) NUMBITS(8) []
    ]
];

const WPR_KEY1: u32 = 0xCA;
const WPR_KEY2: u32 = 0x53;
const WPR_LOCK: u32 = 0xFF;

pub const PREDIV_A_MAX: u8 = 0x7F;
pub const PREDIV_S_MAX: u16 = 0x7FFF;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    Timeout,
    InvalidPrescaler,
}

pub struct Rtc<'a, B: RegisterBus> {
    bus: &'a B,
    base: usize,
}

impl<'a, B: RegisterBus> Rtc<'a, B> {
    pub const fn new(bus: &'a B) -> Rtc<'a, B> {
        Rtc {
            bus,
            base: Peripheral::Rtc.base(),
        }
    }

    fn isr(&self) -> Reg<'a, B, ISR::Register> {
        Reg::new(self.bus, self.base + ISR)
    }

    fn prer(&self) -> Reg<'a, B, PRER::Register> {
        Reg::new(self.bus, self.base + PRER)
    }

    fn wpr(&self) -> Reg<'a, B, WPR::Register> {
        Reg::new(self.bus, self.base + WPR)
    }

    pub fn disable_write_protection(&self) {
        self.wpr().write(WPR::KEY.val(WPR_KEY1));
        self.wpr().write(WPR::KEY.val(WPR_KEY2));
    }

    pub fn enable_write_protection(&self) {
        self.wpr().write(WPR::KEY.val(WPR_LOCK));
    }

    pub fn is_in_init_mode(&self) -> bool {
        self.isr().is_set(ISR::INITF)
    }

    /// Stop the calendar so that it and the prescalers can be programmed.
    pub fn enter_init_mode(&self, timeout: Timeout) -> Result<(), Error> {
        if self.is_in_init_mode() {
            return Ok(());
        }
        self.isr().modify(ISR::INIT::SET);
        timeout
            .poll(|| self.is_in_init_mode().then_some(()))
            .ok_or_else(|| {
                log::warn!("rtc: INITF not set");
                Error::Timeout
            })
    }

    pub fn exit_init_mode(&self) {
        self.isr().modify(ISR::INIT::CLEAR);
    }

    /// Wait for the calendar shadow registers to be resynchronised, e.g.
    /// after a wakeup from low-power mode. Needs write access.
    pub fn wait_for_synchro(&self, timeout: Timeout) -> Result<(), Error> {
        self.isr().modify(ISR::RSF::CLEAR);
        timeout
            .poll(|| self.isr().is_set(ISR::RSF).then_some(()))
            .ok_or(Error::Timeout)
    }

    /// Write both prescalers. Only allowed in initialization mode; the
    /// synchronous factor has to be written before the asynchronous one.
    pub fn set_prescaler(&self, asynchronous: u8, synchronous: u16) -> Result<(), Error> {
        if asynchronous > PREDIV_A_MAX || synchronous > PREDIV_S_MAX {
            return Err(Error::InvalidPrescaler);
        }
        self.prer().write(PRER::PREDIV_S.val(synchronous as u32));
        self.prer().modify(PRER::PREDIV_A.val(asynchronous as u32));
        Ok(())
    }

    /// Complete prescaler change: unlock, enter init mode, program, leave
    /// init mode and relock. Write protection is restored on failure too.
    pub fn configure_prescaler(&self, asynchronous: u8, synchronous: u16) -> Result<(), Error> {
        self.disable_write_protection();
        let result = self
            .enter_init_mode(CONFIG.rtc_init)
            .and_then(|()| self.set_prescaler(asynchronous, synchronous));
        self.exit_init_mode();
        self.enable_write_protection();
        if result.is_ok() {
            log::debug!(
                "rtc: prescaler async {} sync {}",
                asynchronous,
                synchronous
            );
        }
        result
    }
}
