// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Power control: backup domain write access.

use tock_registers::interfaces::{ReadWriteable, Readable};
use tock_registers::register_bitfields;

use crate::mmio::{Reg, RegisterBus};
use crate::rcc::Peripheral;

const CR: usize = 0x00;

register_bitfields![u32,
    CR [
        /// Disable backup write protection
        DBP OFFSET(8) NUMBITS(1) []
    ]
];

pub struct Pwr<'a, B: RegisterBus> {
    bus: &'a B,
    base: usize,
}

impl<'a, B: RegisterBus> Pwr<'a, B> {
    pub const fn new(bus: &'a B) -> Pwr<'a, B> {
        Pwr {
            bus,
            base: Peripheral::Pwr.base(),
        }
    }

    fn cr(&self) -> Reg<'a, B, CR::Register> {
        Reg::new(self.bus, self.base + CR)
    }

    /// Allow writes to the RTC, the LSE configuration and RCC_CSR.RTCSEL.
    pub fn enable_backup_access(&self) {
        self.cr().modify(CR::DBP::SET);
    }

    pub fn disable_backup_access(&self) {
        self.cr().modify(CR::DBP::CLEAR);
    }

    pub fn is_backup_access_enabled(&self) -> bool {
        self.cr().is_set(CR::DBP)
    }
}
