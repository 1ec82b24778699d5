// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Packet memory area.
//!
//! 512 bytes of dedicated SRAM shared with the USB controller. The CPU sees
//! it as 16-bit halfwords on a 32-bit stride: PMA byte offset `o` (even)
//! lives in the low half of the word at `PMA_BASE + 2 * o`.
//!
//! The buffer descriptor table starts at BTABLE and has one 8-byte entry per
//! endpoint: ADDR_TX, COUNT_TX, ADDR_RX, COUNT_RX.

use crate::mmio::RegisterBus;
use crate::usb::endpoint::NUM_ENDPOINTS;

pub const PMA_BASE: usize = 0x4000_6000;
pub const PMA_SIZE: u16 = 512;

const ADDR_TX: u16 = 0;
const COUNT_TX: u16 = 2;
const ADDR_RX: u16 = 4;
const COUNT_RX: u16 = 6;

const COUNT_MASK: u16 = 0x03FF;
const BL_SIZE: u16 = 1 << 15;
const NUM_BLOCK_SHIFT: u16 = 10;

/// Largest packet the controller can receive into one buffer.
pub const MAX_RX_BUFFER: u16 = 512;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Buffer does not fit in the packet memory.
    OutOfRange,
    /// Buffers and the descriptor table sit on 2-byte boundaries.
    Misaligned,
    /// Receive buffers are limited to 512 bytes.
    TooLarge,
    /// No such endpoint in the buffer descriptor table.
    InvalidEndpoint,
}

/// COUNT_RX value reserving room for `size` bytes, and the number of bytes
/// actually reserved. Sizes up to 62 bytes use 2-byte blocks, larger ones
/// 32-byte blocks.
pub const fn count_rx_allocation(size: u16) -> Option<(u16, u16)> {
    if size > MAX_RX_BUFFER {
        return None;
    }
    if size <= 62 {
        let blocks = size.div_ceil(2);
        Some((blocks << NUM_BLOCK_SHIFT, blocks * 2))
    } else {
        let blocks = size.div_ceil(32);
        Some((BL_SIZE | ((blocks - 1) << NUM_BLOCK_SHIFT), blocks * 32))
    }
}

pub struct Pma<'a, B: RegisterBus> {
    bus: &'a B,
    btable: u16,
}

impl<'a, B: RegisterBus> Pma<'a, B> {
    pub(crate) const fn new(bus: &'a B, btable: u16) -> Pma<'a, B> {
        Pma { bus, btable }
    }

    const fn cpu_address(offset: u16) -> usize {
        PMA_BASE + 2 * (offset & !1) as usize
    }

    fn read_u16(&self, offset: u16) -> u16 {
        self.bus.read(Self::cpu_address(offset)) as u16
    }

    fn write_u16(&self, offset: u16, value: u16) {
        self.bus.write(Self::cpu_address(offset), value as u32);
    }

    /// PMA offset of one descriptor field. The whole entry must lie inside
    /// the packet memory.
    fn descriptor(&self, endpoint: u8, field: u16) -> Result<u16, Error> {
        if endpoint >= NUM_ENDPOINTS {
            return Err(Error::InvalidEndpoint);
        }
        let offset = self.btable as u32 + 8 * endpoint as u32 + field as u32;
        if offset + 2 > PMA_SIZE as u32 {
            return Err(Error::OutOfRange);
        }
        Ok(offset as u16)
    }

    fn check(offset: u16, len: u16) -> Result<(), Error> {
        if offset & 1 != 0 {
            return Err(Error::Misaligned);
        }
        if offset as u32 + len as u32 > PMA_SIZE as u32 {
            return Err(Error::OutOfRange);
        }
        Ok(())
    }

    /// Copy `data` into packet memory at `offset`. An odd trailing byte is
    /// padded with zero.
    pub fn write(&self, offset: u16, data: &[u8]) -> Result<(), Error> {
        let len = u16::try_from(data.len()).map_err(|_| Error::OutOfRange)?;
        Self::check(offset, len)?;
        for (i, pair) in data.chunks(2).enumerate() {
            let low = pair[0] as u16;
            let high = pair.get(1).copied().unwrap_or(0) as u16;
            self.write_u16(offset + 2 * i as u16, low | (high << 8));
        }
        Ok(())
    }

    pub fn read(&self, offset: u16, data: &mut [u8]) -> Result<(), Error> {
        let len = u16::try_from(data.len()).map_err(|_| Error::OutOfRange)?;
        Self::check(offset, len)?;
        for (i, pair) in data.chunks_mut(2).enumerate() {
            let [low, high] = self.read_u16(offset + 2 * i as u16).to_le_bytes();
            pair[0] = low;
            if let Some(byte) = pair.get_mut(1) {
                *byte = high;
            }
        }
        Ok(())
    }

    pub fn set_tx_buffer(&self, endpoint: u8, offset: u16) -> Result<(), Error> {
        Self::check(offset, 0)?;
        self.write_u16(self.descriptor(endpoint, ADDR_TX)?, offset);
        Ok(())
    }

    /// Length of the next IN packet.
    pub fn set_tx_count(&self, endpoint: u8, count: u16) -> Result<(), Error> {
        self.write_u16(self.descriptor(endpoint, COUNT_TX)?, count & COUNT_MASK);
        Ok(())
    }

    pub fn tx_count(&self, endpoint: u8) -> Result<u16, Error> {
        Ok(self.read_u16(self.descriptor(endpoint, COUNT_TX)?) & COUNT_MASK)
    }

    /// Reserve a receive buffer of at least `size` bytes at `offset`.
    /// Returns the number of bytes the controller may write there.
    pub fn set_rx_buffer(&self, endpoint: u8, offset: u16, size: u16) -> Result<u16, Error> {
        let (count, reserved) = count_rx_allocation(size).ok_or(Error::TooLarge)?;
        Self::check(offset, reserved)?;
        let addr_rx = self.descriptor(endpoint, ADDR_RX)?;
        let count_rx = self.descriptor(endpoint, COUNT_RX)?;
        self.write_u16(addr_rx, offset);
        self.write_u16(count_rx, count);
        Ok(reserved)
    }

    /// Length of the last OUT or SETUP packet received on `endpoint`.
    pub fn rx_count(&self, endpoint: u8) -> Result<u16, Error> {
        Ok(self.read_u16(self.descriptor(endpoint, COUNT_RX)?) & COUNT_MASK)
    }

    pub fn tx_buffer(&self, endpoint: u8) -> Result<u16, Error> {
        Ok(self.read_u16(self.descriptor(endpoint, ADDR_TX)?))
    }

    pub fn rx_buffer(&self, endpoint: u8) -> Result<u16, Error> {
        Ok(self.read_u16(self.descriptor(endpoint, ADDR_RX)?))
    }

    /// Write `data` into the endpoint's transmit buffer and set its count.
    pub fn load_tx(&self, endpoint: u8, data: &[u8]) -> Result<(), Error> {
        self.write(self.tx_buffer(endpoint)?, data)?;
        self.set_tx_count(endpoint, data.len() as u16)
    }

    /// Copy the last received packet of `endpoint` into `data`. Returns the
    /// packet length, which may exceed `data.len()`; only what fits is
    /// copied.
    pub fn take_rx(&self, endpoint: u8, data: &mut [u8]) -> Result<usize, Error> {
        let count = self.rx_count(endpoint)? as usize;
        let n = count.min(data.len());
        self.read(self.rx_buffer(endpoint)?, &mut data[..n])?;
        Ok(count)
    }
}
