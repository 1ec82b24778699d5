// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Client for 24xx-series I2C EEPROMs.
//!
//! After a write the device runs an internal programming cycle of a few
//! milliseconds during which it NACKs its own address. Every transaction
//! therefore opens with acknowledge polling: START + address is repeated
//! until the device answers, up to `CONFIG.eeprom_ack_poll_retries` times.
//! Writes return as soon as the data is on the bus; the next transaction
//! waits for the programming cycle.

use core::num::NonZeroU16;

use crate::config::CONFIG;
use crate::i2c::{self, Direction, I2c};
use crate::mmio::RegisterBus;

/// Width of the memory address sent after the device address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressWidth {
    /// 24C01/24C02 class parts.
    OneByte,
    /// 24C32 and larger.
    TwoBytes,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    I2c(i2c::Error),
    /// The device kept NACKing its address for the whole retry budget.
    Busy,
    /// A page write would wrap around inside the page.
    PageOverflow,
    /// The memory address does not fit in the address width.
    OutOfRange,
}

impl From<i2c::Error> for Error {
    fn from(error: i2c::Error) -> Self {
        Error::I2c(error)
    }
}

pub struct Eeprom<'a, B: RegisterBus> {
    i2c: &'a I2c<'a, B>,
    address: u8,
    page_size: NonZeroU16,
    width: AddressWidth,
}

impl<'a, B: RegisterBus> Eeprom<'a, B> {
    pub const fn new(
        i2c: &'a I2c<'a, B>,
        address: u8,
        page_size: NonZeroU16,
        width: AddressWidth,
    ) -> Eeprom<'a, B> {
        Eeprom {
            i2c,
            address,
            page_size,
            width,
        }
    }

    /// START + device address, repeated while the device NACKs. Returns with
    /// the bus addressed.
    fn select(&self, direction: Direction) -> Result<(), Error> {
        let step = CONFIG.eeprom_step;
        for attempt in 0..CONFIG.eeprom_ack_poll_retries {
            self.i2c.start(step)?;
            match self.i2c.addr(self.address, direction) {
                Ok(()) => {
                    if attempt > 0 {
                        log::trace!("eeprom {:#04x}: ready after {} polls", self.address, attempt);
                    }
                    return Ok(());
                }
                Err(i2c::Error::Status(flags)) if flags.is_nack() => {
                    self.i2c.clear_error_flags();
                    self.i2c.stop(step)?;
                }
                Err(e) => return Err(e.into()),
            }
        }
        log::warn!("eeprom {:#04x}: no acknowledge", self.address);
        Err(Error::Busy)
    }

    fn send_memory_address(&self, memory_address: u16) -> Result<(), Error> {
        match self.width {
            AddressWidth::OneByte => {
                let byte = u8::try_from(memory_address).map_err(|_| Error::OutOfRange)?;
                self.i2c.write(&[byte])?;
            }
            AddressWidth::TwoBytes => {
                self.i2c.write(&memory_address.to_be_bytes())?;
            }
        }
        Ok(())
    }

    fn check_address(&self, memory_address: u16) -> Result<(), Error> {
        match self.width {
            AddressWidth::OneByte if memory_address > 0xFF => Err(Error::OutOfRange),
            _ => Ok(()),
        }
    }

    /// Block until the device finished its programming cycle.
    pub fn wait_ready(&self) -> Result<(), Error> {
        self.select(Direction::Write)?;
        self.i2c.stop(CONFIG.eeprom_step)?;
        Ok(())
    }

    pub fn write_byte(&self, memory_address: u16, byte: u8) -> Result<(), Error> {
        self.write_page(memory_address, &[byte])
    }

    /// Write `data` within a single page.
    pub fn write_page(&self, memory_address: u16, data: &[u8]) -> Result<(), Error> {
        let page_size = self.page_size.get();
        let offset = (memory_address % page_size) as usize;
        if offset + data.len() > page_size as usize {
            return Err(Error::PageOverflow);
        }
        self.check_address(memory_address)?;

        self.select(Direction::Write)?;
        self.send_memory_address(memory_address)?;
        self.i2c.write(data)?;
        self.i2c.stop(CONFIG.eeprom_step)?;
        log::debug!(
            "eeprom {:#04x}: wrote {} bytes at {:#06x}",
            self.address,
            data.len(),
            memory_address
        );
        Ok(())
    }

    /// Write `data` starting at `memory_address`, split at page boundaries.
    pub fn write(&self, memory_address: u16, data: &[u8]) -> Result<(), Error> {
        let page_size = self.page_size.get();
        let mut address = memory_address;
        let mut rest = data;
        while !rest.is_empty() {
            let room = (page_size - address % page_size) as usize;
            let (chunk, tail) = rest.split_at(room.min(rest.len()));
            self.write_page(address, chunk)?;
            address = address.wrapping_add(chunk.len() as u16);
            rest = tail;
        }
        Ok(())
    }

    /// Random read: set the address pointer with a dummy write, then read
    /// sequentially after a repeated START. An empty `buffer` leaves the
    /// bus untouched.
    pub fn read(&self, memory_address: u16, buffer: &mut [u8]) -> Result<(), Error> {
        self.check_address(memory_address)?;
        if buffer.is_empty() {
            return Ok(());
        }
        self.select(Direction::Write)?;
        self.send_memory_address(memory_address)?;
        self.i2c.start(CONFIG.eeprom_step)?;
        self.i2c.addr(self.address, Direction::Read)?;
        self.i2c.read(buffer)?;
        self.i2c.wait_previous_action(CONFIG.eeprom_step)?;
        Ok(())
    }

    /// Sequential read from the device's current address pointer.
    pub fn read_current(&self, buffer: &mut [u8]) -> Result<(), Error> {
        if buffer.is_empty() {
            return Ok(());
        }
        self.select(Direction::Read)?;
        self.i2c.read(buffer)?;
        self.i2c.wait_previous_action(CONFIG.eeprom_step)?;
        Ok(())
    }
}
