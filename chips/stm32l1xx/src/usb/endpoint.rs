// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! USB endpoint registers (EPnR).
//!
//! One 16-bit EPnR register per endpoint mixes three write semantics:
//!
//! | bits                         | writing 1        | writing 0 |
//! |------------------------------|------------------|-----------|
//! | STAT_TX, STAT_RX, DTOG_TX/RX | toggles the bit  | no effect |
//! | CTR_TX, CTR_RX               | no effect        | clears    |
//! | EA, EP_KIND, EP_TYPE         | stores 1         | stores 0  |
//!
//! A plain read-modify-write therefore flips toggle bits that happened to be
//! set and clears transfer flags the hardware raised in between. All writes
//! go through [`Endpoint::set_ep_bit`], which builds the word to write from
//! the current value and the requested target bits. The register address is
//! private to [`Endpoint`], so nothing else in the crate can write it.

use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::{register_bitfields, LocalRegisterCopy};

use crate::mmio::{Reg, RegisterBus};

register_bitfields![u32,
    pub EPR [
        /// Endpoint address
        EA OFFSET(0) NUMBITS(4) [],
        /// Status bits, for transmission transfers
        STAT_TX OFFSET(4) NUMBITS(2) [
            Disabled = 0,
            Stall = 1,
            Nak = 2,
            Valid = 3
        ],
        /// Data toggle, for transmission transfers
        DTOG_TX OFFSET(6) NUMBITS(1) [],
        /// Correct transfer for transmission
        CTR_TX OFFSET(7) NUMBITS(1) [],
        /// Endpoint kind (DBL_BUF for bulk, STATUS_OUT for control)
        EP_KIND OFFSET(8) NUMBITS(1) [],
        /// Endpoint type
        EP_TYPE OFFSET(9) NUMBITS(2) [
            Bulk = 0,
            Control = 1,
            Isochronous = 2,
            Interrupt = 3
        ],
        /// Setup transaction completed
        SETUP OFFSET(11) NUMBITS(1) [],
        /// Status bits, for reception transfers
        STAT_RX OFFSET(12) NUMBITS(2) [
            Disabled = 0,
            Stall = 1,
            Nak = 2,
            Valid = 3
        ],
        /// Data toggle, for reception transfers
        DTOG_RX OFFSET(14) NUMBITS(1) [],
        /// Correct transfer for reception
        CTR_RX OFFSET(15) NUMBITS(1) []
    ]
];

/// Bit masks of EPnR, for building `set_ep_bit` arguments.
pub mod mask {
    pub const EA: u16 = 0x000F;
    pub const STAT_TX: u16 = 0x0030;
    pub const DTOG_TX: u16 = 0x0040;
    pub const CTR_TX: u16 = 0x0080;
    pub const EP_KIND: u16 = 0x0100;
    pub const EP_TYPE: u16 = 0x0600;
    pub const SETUP: u16 = 0x0800;
    pub const STAT_RX: u16 = 0x3000;
    pub const DTOG_RX: u16 = 0x4000;
    pub const CTR_RX: u16 = 0x8000;

    /// Toggle on write 1.
    pub const TOGGLE: u16 = STAT_TX | DTOG_TX | STAT_RX | DTOG_RX;
    /// Clear on write 0.
    pub const STICKY: u16 = CTR_TX | CTR_RX;
    /// Ordinary read/write.
    pub const READ_WRITE: u16 = EA | EP_KIND | EP_TYPE;
}

/// Endpoint number of the default control endpoint.
pub const CONTROL_ENDPOINT: u8 = 0;

pub const NUM_ENDPOINTS: u8 = 8;

/// STAT_TX / STAT_RX encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Status {
    Disabled = 0b00,
    Stall = 0b01,
    Nak = 0b10,
    Valid = 0b11,
}

impl Status {
    pub const fn from_bits(bits: u32) -> Status {
        match bits & 0b11 {
            0b00 => Status::Disabled,
            0b01 => Status::Stall,
            0b10 => Status::Nak,
            _ => Status::Valid,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Device to host (IN).
    Tx,
    /// Host to device (OUT).
    Rx,
}

impl Direction {
    const fn shift(self) -> u16 {
        match self {
            Direction::Tx => 4,
            Direction::Rx => 12,
        }
    }

    const fn toggle(self) -> u16 {
        match self {
            Direction::Tx => mask::DTOG_TX,
            Direction::Rx => mask::DTOG_RX,
        }
    }
}

/// EP_TYPE encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum EndpointKind {
    Bulk = 0b00,
    Control = 0b01,
    Isochronous = 0b10,
    Interrupt = 0b11,
}

impl EndpointKind {
    pub const fn from_bits(bits: u32) -> EndpointKind {
        match bits & 0b11 {
            0b00 => EndpointKind::Bulk,
            0b01 => EndpointKind::Control,
            0b10 => EndpointKind::Isochronous,
            _ => EndpointKind::Interrupt,
        }
    }
}

/// `(set_mask, reset_mask)` that moves `direction` to `status`.
pub const fn status_masks(direction: Direction, status: Status) -> (u16, u16) {
    let bits = status as u16;
    let shift = direction.shift();
    (bits << shift, (!bits & 0b11) << shift)
}

/// Word to write to EPnR so that the register ends up with every bit of
/// `set_mask` at 1, every bit of `reset_mask` at 0, and everything else as in
/// `current`. `set_mask` wins where the two overlap.
pub const fn ep_write_value(current: u16, set_mask: u16, reset_mask: u16) -> u16 {
    let target = (current & !reset_mask) | set_mask;

    // Toggle bits: write 1 exactly where the bit has to change.
    let toggles = (current ^ target) & mask::TOGGLE;
    // Transfer flags: write 0 only to clear. Writing 1 also covers a flag the
    // hardware sets after `current` was read.
    let sticky = mask::STICKY & !(reset_mask & !set_mask);
    let plain = target & mask::READ_WRITE;

    toggles | sticky | plain
}

pub struct Endpoint<'a, B: RegisterBus> {
    bus: &'a B,
    address: usize,
    index: u8,
}

impl<'a, B: RegisterBus> Endpoint<'a, B> {
    pub(crate) const fn new(bus: &'a B, usb_base: usize, index: u8) -> Endpoint<'a, B> {
        Endpoint {
            bus,
            address: usb_base + 4 * index as usize,
            index,
        }
    }

    fn register(&self) -> Reg<'a, B, EPR::Register> {
        Reg::new(self.bus, self.address)
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn read(&self) -> LocalRegisterCopy<u32, EPR::Register> {
        self.register().extract()
    }

    /// The single read-modify-write primitive on this endpoint.
    ///
    /// Bits in `set_mask` end at 1 and bits in `reset_mask` end at 0.
    /// Toggle bits not named keep their value, pending transfer flags are
    /// only cleared when named in `reset_mask`, and SETUP is read-only.
    pub fn set_ep_bit(&self, set_mask: u16, reset_mask: u16) {
        let current = self.register().get() as u16;
        let value = ep_write_value(current, set_mask, reset_mask);
        self.register().set(value as u32);
    }

    /// One-time configuration of type and address. This is a plain overwrite
    /// and must only be done while both directions are disabled.
    pub fn setup(&self, kind: EndpointKind, address: u8) {
        let value = ((kind as u16) << 9) | (address as u16 & mask::EA);
        self.register().set(value as u32);
    }

    pub fn kind(&self) -> EndpointKind {
        EndpointKind::from_bits(self.read().read(EPR::EP_TYPE))
    }

    pub fn status(&self, direction: Direction) -> Status {
        let epr = self.read();
        match direction {
            Direction::Tx => Status::from_bits(epr.read(EPR::STAT_TX)),
            Direction::Rx => Status::from_bits(epr.read(EPR::STAT_RX)),
        }
    }

    pub fn tx_status(&self) -> Status {
        self.status(Direction::Tx)
    }

    pub fn rx_status(&self) -> Status {
        self.status(Direction::Rx)
    }

    /// Last received transaction on this endpoint was a SETUP.
    pub fn is_setup(&self) -> bool {
        self.read().is_set(EPR::SETUP)
    }

    pub fn is_ctr_tx(&self) -> bool {
        self.read().is_set(EPR::CTR_TX)
    }

    pub fn is_ctr_rx(&self) -> bool {
        self.read().is_set(EPR::CTR_RX)
    }

    pub fn clear_ctr_tx(&self) {
        self.set_ep_bit(0, mask::CTR_TX);
    }

    pub fn clear_ctr_rx(&self) {
        self.set_ep_bit(0, mask::CTR_RX);
    }

    /// EP_KIND: double buffering for bulk endpoints, STATUS_OUT for control
    /// endpoints.
    pub fn set_ep_kind(&self, enabled: bool) {
        if enabled {
            self.set_ep_bit(mask::EP_KIND, 0);
        } else {
            self.set_ep_bit(0, mask::EP_KIND);
        }
    }

    pub fn set_status(&self, direction: Direction, status: Status) {
        let (set, reset) = status_masks(direction, status);
        self.set_ep_bit(set, reset);
    }

    /// Write `status`, then re-read. If the controller changed STAT between
    /// the read and the write of `set_ep_bit` (a transfer completing moves
    /// VALID to NAK), the toggle pattern landed on the wrong state and one
    /// corrective write is issued from the new value.
    fn force_status(&self, direction: Direction, status: Status) {
        self.set_status(direction, status);
        let now = self.status(direction);
        if now != status {
            log::debug!(
                "usb ep{}: {:?} is {:?} instead of {:?}, rewriting",
                self.index,
                direction,
                now,
                status
            );
            self.set_status(direction, status);
        }
    }

    /// Bring the IN direction out of DISABLED or STALL. Isochronous endpoints
    /// go straight to VALID; the others wait in NAK until
    /// [`Endpoint::start_tx`]. The data toggle restarts at DATA0.
    pub fn enable_tx(&self, kind: EndpointKind) {
        match self.tx_status() {
            Status::Disabled | Status::Stall => {}
            other => {
                log::debug!("usb ep{}: tx already {:?}", self.index, other);
                return;
            }
        }
        self.enable(Direction::Tx, kind);
    }

    /// Bring the OUT direction out of DISABLED, see [`Endpoint::enable_tx`].
    pub fn enable_rx(&self, kind: EndpointKind) {
        if self.rx_status() != Status::Disabled {
            log::debug!("usb ep{}: rx already enabled", self.index);
            return;
        }
        self.enable(Direction::Rx, kind);
    }

    fn enable(&self, direction: Direction, kind: EndpointKind) {
        let target = match kind {
            EndpointKind::Isochronous => Status::Valid,
            _ => Status::Nak,
        };
        let (set, reset) = status_masks(direction, target);
        self.set_ep_bit(set, reset | direction.toggle());
    }

    /// Arm the IN direction: the next IN token gets the prepared buffer.
    pub fn start_tx(&self) {
        self.set_status(Direction::Tx, Status::Valid);
    }

    /// Arm the OUT direction for the next packet.
    pub fn start_rx(&self) {
        self.set_status(Direction::Rx, Status::Valid);
    }

    pub fn disable_tx(&self) {
        if self.tx_status() != Status::Disabled {
            self.force_status(Direction::Tx, Status::Disabled);
        }
    }

    pub fn disable_rx(&self) {
        if self.rx_status() != Status::Disabled {
            self.force_status(Direction::Rx, Status::Disabled);
        }
    }

    pub fn halt_tx(&self) {
        self.force_status(Direction::Tx, Status::Stall);
    }

    pub fn halt_rx(&self) {
        self.force_status(Direction::Rx, Status::Stall);
    }

    /// Leave STALL for NAK with the data toggle reset, as a CLEAR_FEATURE
    /// (ENDPOINT_HALT) requires.
    pub fn unhalt(&self, direction: Direction) {
        if self.status(direction) == Status::Stall {
            let (set, reset) = status_masks(direction, Status::Nak);
            self.set_ep_bit(set, reset | direction.toggle());
        }
    }
}
