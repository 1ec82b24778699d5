// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Segment LCD controller.
//!
//! The CPU writes segment data into LCD_RAM and then requests a transfer to
//! the display buffer with SR.UDR. While UDR is set the RAM is frozen;
//! hardware clears UDR and raises UDD once the transfer is done. FCR lives
//! in the LCD clock domain and is only usable once FCRSF is set again after
//! a write.

use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::register_bitfields;

use crate::config::CONFIG;
use crate::mmio::{Reg, RegisterBus};
use crate::poll::Timeout;
use crate::rcc::Peripheral;

const CR: usize = 0x00;
const FCR: usize = 0x04;
const SR: usize = 0x08;
const CLR: usize = 0x0C;
const RAM: usize = 0x14;

pub const RAM_WORDS: usize = 16;

register_bitfields![u32,
    CR [
        LCDEN OFFSET(0) NUMBITS(1) [],
        /// Voltage source: 0 internal step-up, 1 external VLCD
        VSEL OFFSET(1) NUMBITS(1) [],
        DUTY OFFSET(2) NUMBITS(3) [
            Static = 0,
            Half = 1,
            Third = 2,
            Quarter = 3,
            Eighth = 4
        ],
        BIAS OFFSET(5) NUMBITS(2) [
            Quarter = 0,
            Half = 1,
            Third = 2
        ],
        MUX_SEG OFFSET(7) NUMBITS(1) []
    ],
    FCR [
        /// High drive
        HD OFFSET(0) NUMBITS(1) [],
        SOFIE OFFSET(1) NUMBITS(1) [],
        UDDIE OFFSET(3) NUMBITS(1) [],
        /// Pulse on duration
        PON OFFSET(4) NUMBITS(3) [],
        /// Dead time duration
        DEAD OFFSET(7) NUMBITS(3) [],
        /// Contrast control
        CC OFFSET(10) NUMBITS(3) [],
        BLINKF OFFSET(13) NUMBITS(3) [],
        BLINK OFFSET(16) NUMBITS(2) [],
        /// Clock divider, 16 + DIV
        DIV OFFSET(18) NUMBITS(4) [],
        /// Clock prescaler, 2^PS
        PS OFFSET(22) NUMBITS(4) []
    ],
    SR [
        /// LCD enabled status
        ENS OFFSET(0) NUMBITS(1) [],
        /// Start of frame
        SOF OFFSET(1) NUMBITS(1) [],
        /// Update display request
        UDR OFFSET(2) NUMBITS(1) [],
        /// Update display done
        UDD OFFSET(3) NUMBITS(1) [],
        /// Step-up converter ready
        RDY OFFSET(4) NUMBITS(1) [],
        /// FCR synchronized
        FCRSF OFFSET(5) NUMBITS(1) []
    ],
    CLR [
        SOFC OFFSET(1) NUMBITS(1) [],
        UDDC OFFSET(3) NUMBITS(1) []
    ]
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Duty {
    Static = 0,
    Half = 1,
    Third = 2,
    Quarter = 3,
    Eighth = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bias {
    Quarter = 0,
    Half = 1,
    Third = 2,
}

/// Frame rate and drive settings written to FCR.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameControl {
    /// log2 of the LCDCLK prescaler, 0..=15
    pub prescaler: u8,
    /// Divider is `16 + divider`, 0..=15
    pub divider: u8,
    /// Contrast 0..=7
    pub contrast: u8,
    /// Dead time in phase periods, 0..=7
    pub dead_time: u8,
    /// Pulse-on duration, 0..=7
    pub pulse_on: u8,
    pub high_drive: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    Timeout,
    /// RAM index outside 0..16.
    InvalidIndex,
}

pub struct Lcd<'a, B: RegisterBus> {
    bus: &'a B,
    base: usize,
}

impl<'a, B: RegisterBus> Lcd<'a, B> {
    pub const fn new(bus: &'a B) -> Lcd<'a, B> {
        Lcd {
            bus,
            base: Peripheral::Lcd.base(),
        }
    }

    fn cr(&self) -> Reg<'a, B, CR::Register> {
        Reg::new(self.bus, self.base + CR)
    }

    fn fcr(&self) -> Reg<'a, B, FCR::Register> {
        Reg::new(self.bus, self.base + FCR)
    }

    fn sr(&self) -> Reg<'a, B, SR::Register> {
        Reg::new(self.bus, self.base + SR)
    }

    fn clr(&self) -> Reg<'a, B, CLR::Register> {
        Reg::new(self.bus, self.base + CLR)
    }

    fn ram(&self, index: usize) -> Reg<'a, B> {
        Reg::new(self.bus, self.base + RAM + 4 * index)
    }

    fn wait_sr(
        &self,
        timeout: Timeout,
        done: impl Fn(&Self) -> bool,
        what: &str,
    ) -> Result<(), Error> {
        timeout.poll(|| done(self).then_some(())).ok_or_else(|| {
            log::warn!("lcd: timeout waiting for {}", what);
            Error::Timeout
        })
    }

    /// Select duty and bias. Only allowed while the controller is disabled.
    pub fn configure(&self, duty: Duty, bias: Bias) {
        self.cr()
            .modify(CR::DUTY.val(duty as u32) + CR::BIAS.val(bias as u32));
    }

    pub fn enable(&self, timeout: Timeout) -> Result<(), Error> {
        self.cr().modify(CR::LCDEN::SET);
        self.wait_sr(timeout, |lcd| lcd.sr().is_set(SR::RDY), "RDY")
    }

    pub fn disable(&self) {
        self.cr().modify(CR::LCDEN::CLEAR);
    }

    pub fn is_enabled(&self) -> bool {
        self.sr().is_set(SR::ENS)
    }

    /// Wait until the last FCR write reached the LCD clock domain.
    pub fn wait_for_sync(&self, timeout: Timeout) -> Result<(), Error> {
        self.wait_sr(timeout, |lcd| lcd.sr().is_set(SR::FCRSF), "FCRSF")
    }

    pub fn set_frame_control(&self, frame: FrameControl, timeout: Timeout) -> Result<(), Error> {
        self.wait_for_sync(timeout)?;
        self.fcr().write(
            FCR::PS.val(frame.prescaler as u32 & 0xF)
                + FCR::DIV.val(frame.divider as u32 & 0xF)
                + FCR::CC.val(frame.contrast as u32 & 0x7)
                + FCR::DEAD.val(frame.dead_time as u32 & 0x7)
                + FCR::PON.val(frame.pulse_on as u32 & 0x7)
                + FCR::HD.val(frame.high_drive as u32),
        );
        self.wait_for_sync(timeout)
    }

    /// Write one word of segment RAM, waiting for a pending display update
    /// to release the RAM first.
    pub fn write_ram(&self, index: usize, value: u32, timeout: Timeout) -> Result<(), Error> {
        if index >= RAM_WORDS {
            return Err(Error::InvalidIndex);
        }
        self.wait_sr(timeout, |lcd| !lcd.sr().is_set(SR::UDR), "UDR clear")?;
        self.ram(index).set(value);
        Ok(())
    }

    /// Transfer the RAM to the display and wait until it is shown.
    pub fn update_display(&self, timeout: Timeout) -> Result<(), Error> {
        self.sr().write(SR::UDR::SET);
        self.wait_sr(timeout, |lcd| lcd.sr().is_set(SR::UDD), "UDD")?;
        self.clr().write(CLR::UDDC::SET);
        Ok(())
    }

    /// Write `ram` from index 0 and update the display.
    pub fn show(&self, ram: &[u32]) -> Result<(), Error> {
        if ram.len() > RAM_WORDS {
            return Err(Error::InvalidIndex);
        }
        for (index, &word) in ram.iter().enumerate() {
            self.write_ram(index, word, CONFIG.lcd_update)?;
        }
        self.update_display(CONFIG.lcd_update)
    }
}
