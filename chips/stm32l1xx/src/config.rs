// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Compile-time configuration of the chip drivers.
//!
//! Like the kernel's `CONFIG` object this is a typed `const` rather than a
//! set of cargo features: every value is type-checked, and the compiler
//! folds the constants into the polling loops that use them.
//!
//! These budgets apply to operations whose signature has no `Timeout`
//! argument. Operations that take a `Timeout` use the caller's budget.

use crate::poll::Timeout;

pub struct Config {
    /// Budget for the flash interface to drop `BSY` after an erase or program
    /// operation. A page erase takes about 3.2 ms, which at 32 MHz is well
    /// inside this many status reads.
    pub flash_busy: Timeout,

    /// Budget for the RTC to enter initialization mode (INITF). Entry takes
    /// up to two RTCCLK periods, about 61 us from the LSE.
    pub rtc_init: Timeout,

    /// Budget for the LCD to move RAM to the display (UDR to UDD). The
    /// transfer happens at the start of the next frame.
    pub lcd_update: Timeout,

    /// Budget for the START, STOP and pending-action waits of the EEPROM
    /// client. Address and data transfers wait without a bound.
    pub eeprom_step: Timeout,

    /// Number of start + address attempts the EEPROM client makes while the
    /// device NACKs during its internal write cycle.
    pub eeprom_ack_poll_retries: u32,
}

pub const CONFIG: Config = Config {
    flash_busy: Timeout::Iterations(200_000),
    rtc_init: Timeout::Iterations(50_000),
    lcd_update: Timeout::Iterations(500_000),
    eeprom_step: Timeout::Iterations(10_000),
    eeprom_ack_poll_retries: 1_000,
};
