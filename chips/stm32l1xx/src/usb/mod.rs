// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! USB full-speed device controller.

pub mod control;
pub mod endpoint;
pub mod pma;

use tock_registers::fields::FieldValue;
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::{register_bitfields, LocalRegisterCopy};

use crate::mmio::{Reg, RegisterBus};
use crate::rcc::Peripheral;

pub use control::ControlPhase;
pub use endpoint::{Direction, Endpoint, EndpointKind, Status};
pub use pma::Pma;

const CNTR: usize = 0x40;
const ISTR: usize = 0x44;
const FNR: usize = 0x48;
const DADDR: usize = 0x4C;
const BTABLE: usize = 0x50;

register_bitfields![u32,
    pub CNTR [
        /// Force USB reset
        FRES OFFSET(0) NUMBITS(1) [],
        /// Power down
        PDWN OFFSET(1) NUMBITS(1) [],
        /// Low-power mode
        LP_MODE OFFSET(2) NUMBITS(1) [],
        /// Force suspend
        FSUSP OFFSET(3) NUMBITS(1) [],
        /// Resume request
        RESUME OFFSET(4) NUMBITS(1) [],
        ESOFM OFFSET(8) NUMBITS(1) [],
        SOFM OFFSET(9) NUMBITS(1) [],
        RESETM OFFSET(10) NUMBITS(1) [],
        SUSPM OFFSET(11) NUMBITS(1) [],
        WKUPM OFFSET(12) NUMBITS(1) [],
        ERRM OFFSET(13) NUMBITS(1) [],
        PMAOVRM OFFSET(14) NUMBITS(1) [],
        CTRM OFFSET(15) NUMBITS(1) []
    ],
    pub ISTR [
        /// Endpoint that raised CTR
        EP_ID OFFSET(0) NUMBITS(4) [],
        /// Direction of the transaction: 0 IN, 1 OUT
        DIR OFFSET(4) NUMBITS(1) [],
        ESOF OFFSET(8) NUMBITS(1) [],
        SOF OFFSET(9) NUMBITS(1) [],
        RESET OFFSET(10) NUMBITS(1) [],
        SUSP OFFSET(11) NUMBITS(1) [],
        WKUP OFFSET(12) NUMBITS(1) [],
        ERR OFFSET(13) NUMBITS(1) [],
        PMAOVR OFFSET(14) NUMBITS(1) [],
        /// Correct transfer, cleared through the endpoint register
        CTR OFFSET(15) NUMBITS(1) []
    ],
    FNR [
        FN OFFSET(0) NUMBITS(11) [],
        LSOF OFFSET(11) NUMBITS(2) [],
        LCK OFFSET(13) NUMBITS(1) [],
        RXDM OFFSET(14) NUMBITS(1) [],
        RXDP OFFSET(15) NUMBITS(1) []
    ],
    DADDR [
        ADD OFFSET(0) NUMBITS(7) [],
        /// Enable function
        EF OFFSET(7) NUMBITS(1) []
    ]
];

/// Write-0-to-clear interrupt flags of ISTR.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Interrupt {
    Esof = 8,
    Sof = 9,
    Reset = 10,
    Suspend = 11,
    Wakeup = 12,
    Error = 13,
    PmaOverrun = 14,
}

pub struct Usb<'a, B: RegisterBus> {
    bus: &'a B,
    base: usize,
}

impl<'a, B: RegisterBus> Usb<'a, B> {
    pub const fn new(bus: &'a B) -> Usb<'a, B> {
        Usb {
            bus,
            base: Peripheral::Usb.base(),
        }
    }

    fn cntr(&self) -> Reg<'a, B, CNTR::Register> {
        Reg::new(self.bus, self.base + CNTR)
    }

    fn istr(&self) -> Reg<'a, B, ISTR::Register> {
        Reg::new(self.bus, self.base + ISTR)
    }

    fn fnr(&self) -> Reg<'a, B, FNR::Register> {
        Reg::new(self.bus, self.base + FNR)
    }

    fn daddr(&self) -> Reg<'a, B, DADDR::Register> {
        Reg::new(self.bus, self.base + DADDR)
    }

    fn btable(&self) -> Reg<'a, B> {
        Reg::new(self.bus, self.base + BTABLE)
    }

    /// Leave power-down while holding the controller in reset, release the
    /// reset and drop any pending interrupts.
    pub fn power_up(&self) {
        self.cntr().write(CNTR::FRES::SET);
        self.cntr().write(CNTR::FRES::CLEAR);
        self.istr().set(0);
        log::debug!("usb: powered up");
    }

    pub fn power_down(&self) {
        self.cntr().write(CNTR::FRES::SET + CNTR::PDWN::SET);
    }

    pub fn enable_interrupts(&self, mask: FieldValue<u32, CNTR::Register>) {
        self.cntr().modify(mask);
    }

    pub fn interrupt_status(&self) -> LocalRegisterCopy<u32, ISTR::Register> {
        self.istr().extract()
    }

    pub fn clear_interrupt(&self, interrupt: Interrupt) {
        self.istr().set(!(1u32 << interrupt as u32) & 0xFFFF);
    }

    /// Respond to the default address only. Done after every bus reset.
    pub fn reset_address(&self) {
        self.set_address(0);
    }

    pub fn set_address(&self, address: u8) {
        self.daddr()
            .write(DADDR::EF::SET + DADDR::ADD.val(address as u32 & 0x7F));
    }

    pub fn address(&self) -> u8 {
        self.daddr().read(DADDR::ADD) as u8
    }

    /// Place the buffer descriptor table at `offset` bytes into the packet
    /// memory. The three low bits are ignored by the hardware.
    pub fn set_btable(&self, offset: u16) {
        self.btable().set(offset as u32 & 0xFFF8);
    }

    pub fn frame_number(&self) -> u16 {
        self.fnr().read(FNR::FN) as u16
    }

    pub fn endpoint(&self, index: u8) -> Option<Endpoint<'a, B>> {
        (index < endpoint::NUM_ENDPOINTS).then(|| Endpoint::new(self.bus, self.base, index))
    }

    pub fn pma(&self) -> Pma<'a, B> {
        Pma::new(self.bus, self.btable().get() as u16)
    }
}
