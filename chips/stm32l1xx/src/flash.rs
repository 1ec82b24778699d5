// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Flash program/erase controller.
//!
//! Program memory and data EEPROM share one controller. PECR itself is
//! locked after reset and is unlocked with the PEKEY pair; program memory
//! additionally needs the PRGKEY pair. A wrong key locks the controller
//! until the next reset.
//!
//! Erase and program are started by an ordinary store to the target
//! address and then run with BSY set. All operations here block until BSY
//! clears (within `CONFIG.flash_busy`) and translate the SR error flags.

use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::{register_bitfields, LocalRegisterCopy};

use crate::config::CONFIG;
use crate::mmio::{Reg, RegisterBus};
use crate::poll::Timeout;
use crate::rcc::Peripheral;

const ACR: usize = 0x00;
const PECR: usize = 0x04;
const PEKEYR: usize = 0x0C;
const PRGKEYR: usize = 0x10;
const SR: usize = 0x18;

pub const PEKEY1: u32 = 0x89AB_CDEF;
pub const PEKEY2: u32 = 0x0203_0405;
pub const PRGKEY1: u32 = 0x8C9D_AEBF;
pub const PRGKEY2: u32 = 0x1314_1516;

pub const PAGE_SIZE: usize = 256;

register_bitfields![u32,
    ACR [
        /// One wait state
        LATENCY OFFSET(0) NUMBITS(1) [],
        /// Prefetch enable
        PRFTEN OFFSET(1) NUMBITS(1) [],
        /// 64-bit access
        ACC64 OFFSET(2) NUMBITS(1) [],
        /// Flash power-down in sleep
        SLEEP_PD OFFSET(3) NUMBITS(1) [],
        /// Flash power-down in run
        RUN_PD OFFSET(4) NUMBITS(1) []
    ],
    PECR [
        /// FLASH_PECR and data EEPROM lock
        PELOCK OFFSET(0) NUMBITS(1) [],
        /// Program memory lock
        PRGLOCK OFFSET(1) NUMBITS(1) [],
        /// Option bytes block lock
        OPTLOCK OFFSET(2) NUMBITS(1) [],
        /// Program memory selection
        PROG OFFSET(3) NUMBITS(1) [],
        /// Data EEPROM selection
        DATA OFFSET(4) NUMBITS(1) [],
        /// Fixed time data write
        FTDW OFFSET(8) NUMBITS(1) [],
        /// Page or double word erase
        ERASE OFFSET(9) NUMBITS(1) [],
        /// Half page programming
        FPRG OFFSET(10) NUMBITS(1) []
    ],
    SR [
        /// Write/erase operation in progress
        BSY OFFSET(0) NUMBITS(1) [],
        /// End of operation
        EOP OFFSET(1) NUMBITS(1) [],
        /// High voltage ended
        ENDHV OFFSET(2) NUMBITS(1) [],
        /// Ready for programming
        READY OFFSET(3) NUMBITS(1) [],
        /// Write protection error
        WRPERR OFFSET(8) NUMBITS(1) [],
        /// Programming alignment error
        PGAERR OFFSET(9) NUMBITS(1) [],
        /// Size error
        SIZERR OFFSET(10) NUMBITS(1) [],
        /// Option validity error
        OPTVERR OFFSET(11) NUMBITS(1) []
    ]
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// BSY did not clear within the budget.
    Timeout,
    /// WRPERR: target locked or write protected.
    WriteProtected,
    /// PGAERR, or an address not aligned for the operation.
    Alignment,
    /// SIZERR: access width not allowed.
    Size,
    /// The key sequence did not unlock the controller.
    Locked,
}

pub struct Flash<'a, B: RegisterBus> {
    bus: &'a B,
    base: usize,
}

impl<'a, B: RegisterBus> Flash<'a, B> {
    pub const fn new(bus: &'a B) -> Flash<'a, B> {
        Flash {
            bus,
            base: Peripheral::Flash.base(),
        }
    }

    fn acr(&self) -> Reg<'a, B, ACR::Register> {
        Reg::new(self.bus, self.base + ACR)
    }

    fn pecr(&self) -> Reg<'a, B, PECR::Register> {
        Reg::new(self.bus, self.base + PECR)
    }

    fn pekeyr(&self) -> Reg<'a, B> {
        Reg::new(self.bus, self.base + PEKEYR)
    }

    fn prgkeyr(&self) -> Reg<'a, B> {
        Reg::new(self.bus, self.base + PRGKEYR)
    }

    fn sr(&self) -> Reg<'a, B, SR::Register> {
        Reg::new(self.bus, self.base + SR)
    }

    /// Select one wait state (needed above 16 MHz in range 1) or zero. The
    /// 64-bit access mode has to be on before the wait state is added.
    pub fn set_latency(&self, one_wait_state: bool) {
        if one_wait_state {
            self.acr().modify(ACR::ACC64::SET);
            self.acr().modify(ACR::LATENCY::SET);
        } else {
            self.acr().modify(ACR::LATENCY::CLEAR);
        }
    }

    pub fn enable_prefetch(&self) {
        self.acr().modify(ACR::ACC64::SET);
        self.acr().modify(ACR::PRFTEN::SET);
    }

    pub fn is_pecr_locked(&self) -> bool {
        self.pecr().is_set(PECR::PELOCK)
    }

    pub fn is_program_memory_locked(&self) -> bool {
        self.pecr().is_set(PECR::PRGLOCK)
    }

    /// Unlock PECR and the data EEPROM.
    pub fn unlock_pecr(&self) -> Result<(), Error> {
        if !self.is_pecr_locked() {
            return Ok(());
        }
        self.pekeyr().set(PEKEY1);
        self.pekeyr().set(PEKEY2);
        if self.is_pecr_locked() {
            log::warn!("flash: PECR did not unlock");
            return Err(Error::Locked);
        }
        Ok(())
    }

    /// Unlock program memory, unlocking PECR first if needed.
    pub fn unlock_program_memory(&self) -> Result<(), Error> {
        self.unlock_pecr()?;
        if !self.is_program_memory_locked() {
            return Ok(());
        }
        self.prgkeyr().set(PRGKEY1);
        self.prgkeyr().set(PRGKEY2);
        if self.is_program_memory_locked() {
            log::warn!("flash: program memory did not unlock");
            return Err(Error::Locked);
        }
        Ok(())
    }

    /// Relock everything. Setting PELOCK also sets PRGLOCK and OPTLOCK.
    pub fn lock(&self) {
        self.pecr().modify(PECR::PELOCK::SET);
    }

    fn status(&self) -> LocalRegisterCopy<u32, SR::Register> {
        self.sr().extract()
    }

    /// Wait for the current operation to finish, then report and clear its
    /// error flags.
    pub fn wait_busy(&self, timeout: Timeout) -> Result<(), Error> {
        let sr = timeout
            .poll(|| {
                let sr = self.status();
                (!sr.is_set(SR::BSY)).then_some(sr)
            })
            .ok_or_else(|| {
                log::warn!("flash: still busy");
                Error::Timeout
            })?;

        let error = if sr.is_set(SR::WRPERR) {
            Some(Error::WriteProtected)
        } else if sr.is_set(SR::PGAERR) {
            Some(Error::Alignment)
        } else if sr.is_set(SR::SIZERR) {
            Some(Error::Size)
        } else {
            None
        };

        // Flags are cleared by writing 1.
        self.sr().write(
            SR::EOP::SET + SR::WRPERR::SET + SR::PGAERR::SET + SR::SIZERR::SET + SR::OPTVERR::SET,
        );

        match error {
            Some(e) => {
                log::warn!("flash: operation failed: {:?}", e);
                Err(e)
            }
            None => Ok(()),
        }
    }

    /// Erase the 256-byte page starting at `address`. Program memory must be
    /// unlocked.
    pub fn erase_page(&self, address: usize) -> Result<(), Error> {
        if address % PAGE_SIZE != 0 {
            return Err(Error::Alignment);
        }
        if self.is_program_memory_locked() {
            return Err(Error::Locked);
        }

        self.pecr().modify(PECR::ERASE::SET + PECR::PROG::SET);
        self.bus.write(address, 0);
        let result = self.wait_busy(CONFIG.flash_busy);
        self.pecr().modify(PECR::ERASE::CLEAR + PECR::PROG::CLEAR);

        log::debug!("flash: erased page {:#010x}", address);
        result
    }

    /// Program one word of program memory. The word must be erased.
    pub fn program_word(&self, address: usize, word: u32) -> Result<(), Error> {
        if address % 4 != 0 {
            return Err(Error::Alignment);
        }
        if self.is_program_memory_locked() {
            return Err(Error::Locked);
        }
        self.bus.write(address, word);
        self.wait_busy(CONFIG.flash_busy)
    }

    /// Write one word of data EEPROM. The word is erased by the hardware
    /// first (fixed-time write).
    pub fn write_data_eeprom_word(&self, address: usize, word: u32) -> Result<(), Error> {
        if address % 4 != 0 {
            return Err(Error::Alignment);
        }
        if self.is_pecr_locked() {
            return Err(Error::Locked);
        }
        self.pecr().modify(PECR::FTDW::SET);
        self.bus.write(address, word);
        self.wait_busy(CONFIG.flash_busy)
    }
}
