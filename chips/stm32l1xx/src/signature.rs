// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Device electronic signature: device ID, flash size and the 96-bit unique
//! ID. Where the last two live depends on the device category.

use crate::mmio::RegisterBus;

const DBGMCU_IDCODE: usize = 0xE004_2000;

/// Category 1 and 2 devices.
const SIGNATURE_LOW_DENSITY: usize = 0x1FF8_0050;
/// Category 3 and above.
const SIGNATURE_HIGH_DENSITY: usize = 0x1FF8_00D0;

const FLASH_SIZE_LOW_DENSITY: usize = 0x1FF8_004C;
const FLASH_SIZE_HIGH_DENSITY: usize = 0x1FF8_00CC;

const UID_OFFSETS: [usize; 3] = [0x00, 0x04, 0x14];

pub mod dev_id {
    pub const CAT1: u16 = 0x416;
    pub const CAT2: u16 = 0x429;
    pub const CAT3: u16 = 0x427;
    pub const CAT4: u16 = 0x436;
    pub const CAT5: u16 = 0x437;
}

pub struct Signature<'a, B: RegisterBus> {
    bus: &'a B,
}

impl<'a, B: RegisterBus> Signature<'a, B> {
    pub const fn new(bus: &'a B) -> Signature<'a, B> {
        Signature { bus }
    }

    /// DEV_ID field of DBGMCU_IDCODE.
    pub fn device_id(&self) -> u16 {
        (self.bus.read(DBGMCU_IDCODE) & 0xFFF) as u16
    }

    pub fn revision_id(&self) -> u16 {
        (self.bus.read(DBGMCU_IDCODE) >> 16) as u16
    }

    fn is_low_density(&self) -> bool {
        matches!(self.device_id(), dev_id::CAT1 | dev_id::CAT2)
    }

    pub fn flash_size_kib(&self) -> u32 {
        if self.is_low_density() {
            return self.bus.read(FLASH_SIZE_LOW_DENSITY) & 0xFFFF;
        }
        let size = self.bus.read(FLASH_SIZE_HIGH_DENSITY) & 0xFFFF;
        if self.device_id() == dev_id::CAT4 {
            // Category 4 encodes the size as a flag.
            return if size == 0 { 384 } else { 256 };
        }
        size
    }

    pub fn unique_id(&self) -> [u32; 3] {
        let base = if self.is_low_density() {
            SIGNATURE_LOW_DENSITY
        } else {
            SIGNATURE_HIGH_DENSITY
        };
        UID_OFFSETS.map(|offset| self.bus.read(base + offset))
    }
}
