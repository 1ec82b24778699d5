// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Host-side register bus for unit tests.
//!
//! A [`SimBus`] forwards every access to a [`Device`] model and records it,
//! so tests can check both the peripheral's final state and the exact order
//! of register accesses a driver performed.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::{BTreeMap, VecDeque};
use std::vec::Vec;

use crate::mmio::RegisterBus;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Access {
    Read(usize, u32),
    Write(usize, u32),
}

/// A peripheral that reacts to reads and writes at absolute addresses.
pub(crate) trait Device {
    fn read(&mut self, address: usize) -> u32;
    fn write(&mut self, address: usize, value: u32);
}

pub(crate) struct SimBus<D> {
    device: RefCell<D>,
    log: RefCell<Vec<Access>>,
}

impl<D: Device> SimBus<D> {
    pub(crate) fn new(device: D) -> Self {
        SimBus {
            device: RefCell::new(device),
            log: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn device(&self) -> Ref<'_, D> {
        self.device.borrow()
    }

    pub(crate) fn device_mut(&self) -> RefMut<'_, D> {
        self.device.borrow_mut()
    }

    pub(crate) fn log(&self) -> Vec<Access> {
        self.log.borrow().clone()
    }

    pub(crate) fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }

    pub(crate) fn reads_of(&self, address: usize) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|a| matches!(a, Access::Read(addr, _) if *addr == address))
            .count()
    }

    pub(crate) fn writes_to(&self, address: usize) -> Vec<u32> {
        self.log
            .borrow()
            .iter()
            .filter_map(|a| match a {
                Access::Write(addr, value) if *addr == address => Some(*value),
                _ => None,
            })
            .collect()
    }

    /// Position in the log of the first access matching `f`.
    pub(crate) fn position(&self, f: impl Fn(&Access) -> bool) -> Option<usize> {
        self.log.borrow().iter().position(f)
    }
}

impl<D: Device> RegisterBus for SimBus<D> {
    fn read(&self, address: usize) -> u32 {
        let value = self.device.borrow_mut().read(address);
        self.log.borrow_mut().push(Access::Read(address, value));
        value
    }

    fn write(&self, address: usize, value: u32) {
        self.log.borrow_mut().push(Access::Write(address, value));
        self.device.borrow_mut().write(address, value);
    }
}

/// Plain storage. Unwritten words read as zero.
pub(crate) struct Memory {
    words: BTreeMap<usize, u32>,
}

impl Memory {
    pub(crate) fn new() -> Self {
        Memory {
            words: BTreeMap::new(),
        }
    }

    pub(crate) fn poke(&mut self, address: usize, value: u32) {
        self.words.insert(address, value);
    }

    pub(crate) fn peek(&self, address: usize) -> u32 {
        self.words.get(&address).copied().unwrap_or(0)
    }
}

impl Device for Memory {
    fn read(&mut self, address: usize) -> u32 {
        self.peek(address)
    }

    fn write(&mut self, address: usize, value: u32) {
        self.poke(address, value);
    }
}

// I2C --------------------------------------------------------------------

/// Target device on a simulated I2C bus.
pub(crate) trait Slave {
    /// Address phase. Returning `false` NACKs.
    fn address(&mut self, read: bool) -> bool;
    /// One byte written by the master. Returning `false` NACKs.
    fn write(&mut self, byte: u8) -> bool;
    /// Next byte for the master.
    fn read(&mut self) -> u8;
    fn stop(&mut self) {}
}

/// Acknowledges everything, records writes, replays queued reads.
pub(crate) struct AckAll {
    pub(crate) written: Vec<u8>,
    pub(crate) to_read: VecDeque<u8>,
}

impl AckAll {
    pub(crate) fn new() -> Self {
        AckAll {
            written: Vec::new(),
            to_read: VecDeque::new(),
        }
    }
}

impl Slave for AckAll {
    fn address(&mut self, _read: bool) -> bool {
        true
    }

    fn write(&mut self, byte: u8) -> bool {
        self.written.push(byte);
        true
    }

    fn read(&mut self) -> u8 {
        self.to_read.pop_front().unwrap_or(0xFF)
    }
}

mod i2c_bits {
    pub(super) const CR1_START: u32 = 1 << 8;
    pub(super) const CR1_STOP: u32 = 1 << 9;
    pub(super) const CR1_SWRST: u32 = 1 << 15;

    pub(super) const SR1_SB: u32 = 1 << 0;
    pub(super) const SR1_ADDR: u32 = 1 << 1;
    pub(super) const SR1_BTF: u32 = 1 << 2;
    pub(super) const SR1_RXNE: u32 = 1 << 6;
    pub(super) const SR1_TXE: u32 = 1 << 7;
    pub(super) const SR1_AF: u32 = 1 << 10;
    pub(super) const SR1_ERRORS: u32 = 0xDF00;

    pub(super) const SR2_MSL: u32 = 1 << 0;
    pub(super) const SR2_BUSY: u32 = 1 << 1;
    pub(super) const SR2_TRA: u32 = 1 << 2;
}

/// Behavioural model of one STM32 I2C v1 block in master mode.
pub(crate) struct I2cModel<S> {
    base: usize,
    pub(crate) slave_address: u8,
    pub(crate) slave: S,
    pub(crate) cr1: u32,
    pub(crate) cr2: u32,
    pub(crate) oar1: u32,
    pub(crate) ccr: u32,
    pub(crate) trise: u32,
    pub(crate) sr1: u32,
    pub(crate) sr2: u32,
    /// When false START is ignored and SB never rises.
    pub(crate) respond_to_start: bool,
    /// BUSY stays set through a software reset.
    pub(crate) stuck_busy: bool,
    /// Number of CR1 reads that still observe STOP after it was written.
    pub(crate) stop_delay: u32,
    stop_pending: u32,
    stop_requested: bool,
    receiving: bool,
    rx_byte: u8,
}

impl<S: Slave> I2cModel<S> {
    pub(crate) fn new(base: usize, slave_address: u8, slave: S) -> Self {
        I2cModel {
            base,
            slave_address,
            slave,
            cr1: 0,
            cr2: 0,
            oar1: 0,
            ccr: 0,
            trise: 0,
            sr1: 0,
            sr2: 0,
            respond_to_start: true,
            stuck_busy: false,
            stop_delay: 1,
            stop_pending: 0,
            stop_requested: false,
            receiving: false,
            rx_byte: 0,
        }
    }

    fn finish_stop(&mut self) {
        use i2c_bits::*;
        self.cr1 &= !CR1_STOP;
        self.sr2 &= !(SR2_MSL | SR2_BUSY | SR2_TRA);
        self.sr1 &= !(SR1_TXE | SR1_BTF);
        self.receiving = false;
        self.slave.stop();
    }

    fn load_rx(&mut self) {
        self.rx_byte = self.slave.read();
        self.sr1 |= i2c_bits::SR1_RXNE;
    }
}

impl<S: Slave> Device for I2cModel<S> {
    fn read(&mut self, address: usize) -> u32 {
        use i2c_bits::*;
        match address - self.base {
            0x00 => {
                let value = self.cr1;
                if self.stop_pending > 0 {
                    self.stop_pending -= 1;
                    if self.stop_pending == 0 {
                        self.finish_stop();
                    }
                }
                value
            }
            0x04 => self.cr2,
            0x08 => self.oar1,
            0x10 => {
                if self.receiving && self.sr1 & SR1_RXNE != 0 {
                    self.sr1 &= !SR1_RXNE;
                    let byte = self.rx_byte;
                    if !self.stop_requested {
                        self.load_rx();
                    }
                    byte as u32
                } else {
                    0
                }
            }
            0x14 => self.sr1,
            0x18 => {
                let value = self.sr2;
                if self.sr1 & SR1_ADDR != 0 {
                    self.sr1 &= !SR1_ADDR;
                    if self.receiving {
                        self.load_rx();
                    } else {
                        self.sr1 |= SR1_TXE;
                    }
                }
                value
            }
            0x1C => self.ccr,
            0x20 => self.trise,
            _ => 0,
        }
    }

    fn write(&mut self, address: usize, value: u32) {
        use i2c_bits::*;
        match address - self.base {
            0x00 => {
                if value & CR1_SWRST != 0 {
                    self.cr1 = value;
                    self.sr1 = 0;
                    self.sr2 = if self.stuck_busy { SR2_BUSY } else { 0 };
                    self.receiving = false;
                    return;
                }
                self.cr1 = value;
                if value & CR1_START != 0 && self.respond_to_start {
                    self.cr1 &= !CR1_START;
                    self.sr1 |= SR1_SB;
                    self.sr2 |= SR2_MSL | SR2_BUSY;
                    self.stop_requested = false;
                }
                if value & CR1_STOP != 0 && !self.stop_requested {
                    self.stop_requested = true;
                    self.stop_pending = self.stop_delay;
                    if self.stop_delay == 0 {
                        self.finish_stop();
                    }
                }
            }
            0x04 => self.cr2 = value,
            0x08 => self.oar1 = value,
            0x10 => {
                if self.sr1 & SR1_SB != 0 {
                    self.sr1 &= !SR1_SB;
                    let read = value & 1 != 0;
                    if (value >> 1) as u8 == self.slave_address && self.slave.address(read) {
                        self.sr1 |= SR1_ADDR;
                        self.receiving = read;
                        if !read {
                            self.sr2 |= SR2_TRA;
                        }
                    } else {
                        self.sr1 |= SR1_AF;
                    }
                } else if self.sr2 & SR2_TRA != 0 {
                    self.sr1 &= !(SR1_TXE | SR1_BTF);
                    if self.slave.write(value as u8) {
                        self.sr1 |= SR1_TXE | SR1_BTF;
                    } else {
                        self.sr1 |= SR1_AF;
                    }
                }
            }
            0x14 => self.sr1 = (self.sr1 & !SR1_ERRORS) | (self.sr1 & value & SR1_ERRORS),
            0x1C => self.ccr = value,
            0x20 => self.trise = value,
            _ => {}
        }
    }
}

// USB --------------------------------------------------------------------

pub(crate) const EPR_TOGGLE: u16 = 0x7070;
pub(crate) const EPR_CTR: u16 = 0x8080;
pub(crate) const EPR_RW: u16 = 0x070F;
pub(crate) const EPR_SETUP: u16 = 0x0800;

/// Hardware changing an endpoint register on its own, e.g. a transfer
/// completing. Fires right after the `after_reads`-th read of `endpoint`.
pub(crate) struct Race {
    pub(crate) endpoint: usize,
    pub(crate) after_reads: u32,
    pub(crate) apply: fn(u16) -> u16,
}

/// Behavioural model of the USB device controller registers and packet
/// memory.
pub(crate) struct UsbModel {
    pub(crate) epr: [u16; 8],
    pub(crate) cntr: u32,
    pub(crate) istr: u32,
    pub(crate) daddr: u32,
    pub(crate) btable: u32,
    pub(crate) pma: [u16; 256],
    pub(crate) race: Option<Race>,
    epr_reads: [u32; 8],
}

impl UsbModel {
    pub(crate) fn new() -> Self {
        UsbModel {
            epr: [0; 8],
            cntr: 0x0003,
            istr: 0,
            daddr: 0,
            btable: 0,
            pma: [0; 256],
            race: None,
            epr_reads: [0; 8],
        }
    }
}

impl Device for UsbModel {
    fn read(&mut self, address: usize) -> u32 {
        match address {
            0x4000_5C00..=0x4000_5C1C => {
                let n = (address - 0x4000_5C00) / 4;
                let value = self.epr[n];
                self.epr_reads[n] += 1;
                let fire = self
                    .race
                    .as_ref()
                    .is_some_and(|r| r.endpoint == n && r.after_reads == self.epr_reads[n]);
                if fire {
                    if let Some(race) = self.race.take() {
                        self.epr[n] = (race.apply)(self.epr[n]);
                    }
                }
                value as u32
            }
            0x4000_5C40 => self.cntr,
            0x4000_5C44 => self.istr,
            0x4000_5C4C => self.daddr,
            0x4000_5C50 => self.btable,
            0x4000_6000..=0x4000_63FC => self.pma[(address - 0x4000_6000) / 4] as u32,
            _ => 0,
        }
    }

    fn write(&mut self, address: usize, value: u32) {
        match address {
            0x4000_5C00..=0x4000_5C1C => {
                let n = (address - 0x4000_5C00) / 4;
                let old = self.epr[n];
                let w = value as u16;
                self.epr[n] = ((old ^ (w & EPR_TOGGLE)) & EPR_TOGGLE)
                    | (old & w & EPR_CTR)
                    | (w & EPR_RW)
                    | (old & EPR_SETUP);
            }
            0x4000_5C40 => self.cntr = value & 0xFFFF,
            0x4000_5C44 => {
                self.istr = (self.istr & !0x7F00) | (self.istr & value & 0x7F00);
            }
            0x4000_5C4C => self.daddr = value & 0xFF,
            0x4000_5C50 => self.btable = value & 0xFFF8,
            0x4000_6000..=0x4000_63FC => self.pma[(address - 0x4000_6000) / 4] = value as u16,
            _ => {}
        }
    }
}

// Flash --------------------------------------------------------------------

pub(crate) mod flash_bits {
    pub(crate) const PECR_PELOCK: u32 = 1 << 0;
    pub(crate) const PECR_PRGLOCK: u32 = 1 << 1;
    pub(crate) const PECR_OPTLOCK: u32 = 1 << 2;
    pub(crate) const PECR_PROG: u32 = 1 << 3;
    pub(crate) const PECR_ERASE: u32 = 1 << 9;
    pub(crate) const PECR_LOCKS: u32 = PECR_PELOCK | PECR_PRGLOCK | PECR_OPTLOCK;

    pub(crate) const SR_BSY: u32 = 1 << 0;
    pub(crate) const SR_EOP: u32 = 1 << 1;
    pub(crate) const SR_READY: u32 = 1 << 3;
    pub(crate) const SR_WRPERR: u32 = 1 << 8;
    pub(crate) const SR_PGAERR: u32 = 1 << 9;
    pub(crate) const SR_SIZERR: u32 = 1 << 10;
    pub(crate) const SR_CLEARABLE: u32 = SR_EOP | SR_WRPERR | SR_PGAERR | SR_SIZERR | (1 << 11);
}

/// Flash program/erase controller with its key sequences, and the program
/// and data EEPROM arrays behind it.
pub(crate) struct FlashModel {
    pub(crate) acr: u32,
    pub(crate) pecr: u32,
    pub(crate) sr: u32,
    pub(crate) memory: BTreeMap<usize, u32>,
    /// Number of SR reads that report BSY after an operation starts.
    pub(crate) busy_reads: u32,
    /// SR error flags raised by the next operation.
    pub(crate) fail_with: u32,
    pub(crate) accept_keys: bool,
    busy: u32,
    pekey_stage: bool,
    prgkey_stage: bool,
}

impl FlashModel {
    pub(crate) fn new() -> Self {
        FlashModel {
            acr: 0,
            pecr: flash_bits::PECR_LOCKS,
            sr: flash_bits::SR_READY,
            memory: BTreeMap::new(),
            busy_reads: 2,
            fail_with: 0,
            accept_keys: true,
            busy: 0,
            pekey_stage: false,
            prgkey_stage: false,
        }
    }

    fn operate(&mut self, address: usize, value: u32) {
        use flash_bits::*;
        let data_eeprom = (0x0808_0000..0x0808_4000).contains(&address);
        let locked = if data_eeprom {
            self.pecr & PECR_PELOCK != 0
        } else {
            self.pecr & PECR_PRGLOCK != 0
        };
        if locked || self.fail_with != 0 {
            self.sr |= if locked { SR_WRPERR } else { self.fail_with };
            self.fail_with = 0;
            return;
        }
        if self.pecr & (PECR_ERASE | PECR_PROG) == PECR_ERASE | PECR_PROG {
            let page = address & !0xFF;
            for word in (page..page + 256).step_by(4) {
                self.memory.insert(word, 0);
            }
        } else {
            self.memory.insert(address, value);
        }
        self.busy = self.busy_reads;
        self.sr |= SR_EOP;
    }
}

impl Device for FlashModel {
    fn read(&mut self, address: usize) -> u32 {
        use flash_bits::*;
        match address {
            0x4002_3C00 => self.acr,
            0x4002_3C04 => self.pecr,
            0x4002_3C18 => {
                if self.busy > 0 {
                    self.busy -= 1;
                    self.sr | SR_BSY
                } else {
                    self.sr
                }
            }
            _ => self.memory.get(&address).copied().unwrap_or(0),
        }
    }

    fn write(&mut self, address: usize, value: u32) {
        use flash_bits::*;
        match address {
            0x4002_3C00 => self.acr = value,
            0x4002_3C04 => {
                if value & PECR_PELOCK != 0 {
                    self.pecr = PECR_LOCKS;
                } else if self.pecr & PECR_PELOCK == 0 {
                    self.pecr = (value & !PECR_LOCKS) | (self.pecr & PECR_LOCKS) | (value & PECR_LOCKS);
                }
            }
            0x4002_3C0C => {
                if !self.accept_keys {
                    return;
                }
                match (self.pekey_stage, value) {
                    (false, 0x89AB_CDEF) => self.pekey_stage = true,
                    (true, 0x0203_0405) => {
                        self.pecr &= !PECR_PELOCK;
                        self.pekey_stage = false;
                    }
                    _ => self.pekey_stage = false,
                }
            }
            0x4002_3C10 => {
                if !self.accept_keys || self.pecr & PECR_PELOCK != 0 {
                    return;
                }
                match (self.prgkey_stage, value) {
                    (false, 0x8C9D_AEBF) => self.prgkey_stage = true,
                    (true, 0x1314_1516) => {
                        self.pecr &= !PECR_PRGLOCK;
                        self.prgkey_stage = false;
                    }
                    _ => self.prgkey_stage = false,
                }
            }
            0x4002_3C18 => self.sr &= !(value & SR_CLEARABLE),
            0x0800_0000..=0x0808_3FFF => self.operate(address, value),
            _ => {}
        }
    }
}

// Watchdog, RTC, LCD ---------------------------------------------------------

/// Independent watchdog. PR and RLR are only writable after the 0x5555 key
/// and report PVU/RVU for `update_reads` SR reads after a write.
pub(crate) struct IwdgModel {
    pub(crate) pr: u32,
    pub(crate) rlr: u32,
    pub(crate) started: bool,
    pub(crate) reloads: u32,
    pub(crate) update_reads: u32,
    access: bool,
    pvu: u32,
    rvu: u32,
}

impl IwdgModel {
    pub(crate) fn new() -> Self {
        IwdgModel {
            pr: 0,
            rlr: 0xFFF,
            started: false,
            reloads: 0,
            update_reads: 3,
            access: false,
            pvu: 0,
            rvu: 0,
        }
    }
}

impl Device for IwdgModel {
    fn read(&mut self, address: usize) -> u32 {
        match address {
            0x4000_3004 => self.pr,
            0x4000_3008 => self.rlr,
            0x4000_300C => {
                let value = (self.pvu > 0) as u32 | (((self.rvu > 0) as u32) << 1);
                self.pvu = self.pvu.saturating_sub(1);
                self.rvu = self.rvu.saturating_sub(1);
                value
            }
            _ => 0,
        }
    }

    fn write(&mut self, address: usize, value: u32) {
        match address {
            0x4000_3000 => match value & 0xFFFF {
                0x5555 => self.access = true,
                0xAAAA => {
                    self.access = false;
                    self.reloads += 1;
                }
                0xCCCC => self.started = true,
                _ => self.access = false,
            },
            0x4000_3004 if self.access => {
                self.pr = value & 0x7;
                self.pvu = self.update_reads;
            }
            0x4000_3008 if self.access => {
                self.rlr = value & 0xFFF;
                self.rvu = self.update_reads;
            }
            _ => {}
        }
    }
}

pub(crate) mod rtc_bits {
    pub(crate) const ISR_RSF: u32 = 1 << 5;
    pub(crate) const ISR_INITF: u32 = 1 << 6;
    pub(crate) const ISR_INIT: u32 = 1 << 7;
}

/// RTC with write protection, initialization mode and shadow register
/// synchronisation. INITF and RSF rise `ready_reads` ISR reads after they
/// were requested.
pub(crate) struct RtcModel {
    pub(crate) isr: u32,
    pub(crate) prer: u32,
    pub(crate) ready_reads: u32,
    pub(crate) respond: bool,
    unlock_stage: u8,
    pending_initf: u32,
    pending_rsf: u32,
}

impl RtcModel {
    pub(crate) fn new() -> Self {
        RtcModel {
            isr: rtc_bits::ISR_RSF,
            prer: 0x007F_00FF,
            ready_reads: 2,
            respond: true,
            unlock_stage: 0,
            pending_initf: 0,
            pending_rsf: 0,
        }
    }

    pub(crate) fn is_unlocked(&self) -> bool {
        self.unlock_stage == 2
    }
}

impl Device for RtcModel {
    fn read(&mut self, address: usize) -> u32 {
        use rtc_bits::*;
        match address {
            0x4000_280C => {
                let value = self.isr;
                if self.respond && self.pending_initf > 0 {
                    self.pending_initf -= 1;
                    if self.pending_initf == 0 {
                        self.isr |= ISR_INITF;
                    }
                }
                if self.respond && self.pending_rsf > 0 {
                    self.pending_rsf -= 1;
                    if self.pending_rsf == 0 {
                        self.isr |= ISR_RSF;
                    }
                }
                value
            }
            0x4000_2810 => self.prer,
            _ => 0,
        }
    }

    fn write(&mut self, address: usize, value: u32) {
        use rtc_bits::*;
        match address {
            0x4000_2824 => {
                self.unlock_stage = match (self.unlock_stage, value & 0xFF) {
                    (0, 0xCA) => 1,
                    (1, 0x53) => 2,
                    _ => 0,
                };
            }
            0x4000_280C if self.is_unlocked() => {
                if value & ISR_INIT != 0 && self.isr & ISR_INIT == 0 {
                    self.pending_initf = self.ready_reads;
                }
                if value & ISR_INIT == 0 {
                    self.isr &= !ISR_INITF;
                }
                if value & ISR_RSF == 0 && self.isr & ISR_RSF != 0 {
                    self.pending_rsf = self.ready_reads;
                }
                self.isr = (self.isr & (ISR_INITF | ISR_RSF) & (value | ISR_INITF))
                    | (value & ISR_INIT);
            }
            0x4000_2810 if self.is_unlocked() && self.isr & ISR_INITF != 0 => {
                self.prer = value & 0x007F_7FFF;
            }
            _ => {}
        }
    }
}

pub(crate) mod lcd_bits {
    pub(crate) const SR_ENS: u32 = 1 << 0;
    pub(crate) const SR_UDR: u32 = 1 << 2;
    pub(crate) const SR_UDD: u32 = 1 << 3;
    pub(crate) const SR_RDY: u32 = 1 << 4;
    pub(crate) const SR_FCRSF: u32 = 1 << 5;
}

/// LCD controller. RDY, FCRSF and the UDR to UDD hand-over each settle
/// `settle_reads` SR reads after the triggering write.
pub(crate) struct LcdModel {
    pub(crate) cr: u32,
    pub(crate) fcr: u32,
    pub(crate) sr: u32,
    pub(crate) ram: [u32; 16],
    /// RAM as last transferred to the display.
    pub(crate) displayed: [u32; 16],
    pub(crate) settle_reads: u32,
    pending_rdy: u32,
    pending_fcrsf: u32,
    pending_update: u32,
}

impl LcdModel {
    pub(crate) fn new() -> Self {
        LcdModel {
            cr: 0,
            fcr: 0,
            sr: lcd_bits::SR_FCRSF,
            ram: [0; 16],
            displayed: [0; 16],
            settle_reads: 2,
            pending_rdy: 0,
            pending_fcrsf: 0,
            pending_update: 0,
        }
    }

    fn settle(pending: &mut u32) -> bool {
        if *pending > 0 {
            *pending -= 1;
            return *pending == 0;
        }
        false
    }
}

impl Device for LcdModel {
    fn read(&mut self, address: usize) -> u32 {
        use lcd_bits::*;
        match address {
            0x4000_2400 => self.cr,
            0x4000_2404 => self.fcr,
            0x4000_2408 => {
                let value = self.sr;
                if Self::settle(&mut self.pending_rdy) {
                    self.sr |= SR_RDY;
                }
                if Self::settle(&mut self.pending_fcrsf) {
                    self.sr |= SR_FCRSF;
                }
                if Self::settle(&mut self.pending_update) {
                    self.displayed = self.ram;
                    self.sr = (self.sr & !SR_UDR) | SR_UDD;
                }
                value
            }
            0x4000_2414..=0x4000_2450 => self.ram[(address - 0x4000_2414) / 4],
            _ => 0,
        }
    }

    fn write(&mut self, address: usize, value: u32) {
        use lcd_bits::*;
        match address {
            0x4000_2400 => {
                if value & 1 != 0 && self.cr & 1 == 0 {
                    self.sr |= SR_ENS;
                    self.pending_rdy = self.settle_reads;
                } else if value & 1 == 0 {
                    self.sr &= !(SR_ENS | SR_RDY);
                }
                self.cr = value;
            }
            0x4000_2404 => {
                self.fcr = value;
                self.sr &= !SR_FCRSF;
                self.pending_fcrsf = self.settle_reads;
            }
            0x4000_2408 => {
                if value & SR_UDR != 0 && self.sr & SR_UDR == 0 {
                    self.sr |= SR_UDR;
                    self.pending_update = self.settle_reads;
                }
            }
            0x4000_240C => {
                if value & (1 << 3) != 0 {
                    self.sr &= !SR_UDD;
                }
            }
            0x4000_2414..=0x4000_2450 if self.sr & SR_UDR == 0 => {
                self.ram[(address - 0x4000_2414) / 4] = value;
            }
            _ => {}
        }
    }
}
