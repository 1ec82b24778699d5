// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Peripheral drivers for the STM32L1 family.
//!
//! STM32L151/152/162: <https://www.st.com/en/microcontrollers-microprocessors/stm32l1-series.html>
//!
//! The drivers are synchronous: every operation that waits on hardware
//! busy-polls a status register under a [`poll::Timeout`] budget. Register
//! access goes through [`mmio::RegisterBus`] so the same driver code runs on
//! the chip and against simulated peripherals in host tests.

#![cfg_attr(not(test), no_std)]

pub mod chip;
pub mod config;
pub mod eeprom;
pub mod flash;
pub mod i2c;
pub mod iwdg;
pub mod lcd;
pub mod mmio;
pub mod poll;
pub mod pwr;
pub mod rcc;
pub mod rtc;
pub mod signature;
pub mod timer;
pub mod usb;
pub mod wwdg;

#[cfg(test)]
mod sim;
