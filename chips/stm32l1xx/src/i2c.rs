// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Polled I2C master.
//!
//! The driver exposes the five bus primitives (start, address, write, read,
//! stop) and leaves their ordering to the caller:
//!
//! ```text
//! IDLE --start--> STARTED --addr--> ADDRESSED --write*/read*--> --stop--> IDLE
//! ```
//!
//! Nothing is buffered and nothing is retried. Each primitive busy-waits on
//! the status registers and reports either a hardware error, with the SR1
//! error flags attached, or an exhausted polling budget.
//!
//! ```rust,ignore
//! let i2c = I2c::new(&bus, I2cInstance::I2c1);
//! i2c.set_clock(16_000_000, Mode::Fast, 400_000, 300)?;
//! i2c.start(Timeout::Iterations(1000))?;
//! i2c.addr(0x50, Direction::Write)?;
//! i2c.write(&[0x00, 0x10, 0xAB])?;
//! i2c.stop(Timeout::Iterations(1000))?;
//! ```

use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::{register_bitfields, LocalRegisterCopy};

use crate::mmio::{Reg, RegisterBus};
use crate::poll::Timeout;
use crate::rcc::Peripheral;

const CR1: usize = 0x00;
const CR2: usize = 0x04;
const OAR1: usize = 0x08;
const DR: usize = 0x10;
const SR1: usize = 0x14;
const SR2: usize = 0x18;
const CCR: usize = 0x1C;
const TRISE: usize = 0x20;

register_bitfields![u32,
    CR1 [
        /// Peripheral enable
        PE OFFSET(0) NUMBITS(1) [],
        /// SMBus mode
        SMBUS OFFSET(1) NUMBITS(1) [],
        /// SMBus type
        SMBTYPE OFFSET(3) NUMBITS(1) [
            Device = 0,
            Host = 1
        ],
        /// ARP enable
        ENARP OFFSET(4) NUMBITS(1) [],
        /// PEC enable
        ENPEC OFFSET(5) NUMBITS(1) [],
        /// General call enable
        ENGC OFFSET(6) NUMBITS(1) [],
        /// Clock stretching disable (slave mode)
        NOSTRETCH OFFSET(7) NUMBITS(1) [],
        /// Start generation
        START OFFSET(8) NUMBITS(1) [],
        /// Stop generation
        STOP OFFSET(9) NUMBITS(1) [],
        /// Acknowledge enable
        ACK OFFSET(10) NUMBITS(1) [],
        /// Acknowledge/PEC position (for data reception)
        POS OFFSET(11) NUMBITS(1) [],
        /// Packet error checking
        PEC OFFSET(12) NUMBITS(1) [],
        /// SMBus alert
        ALERT OFFSET(13) NUMBITS(1) [],
        /// Software reset
        SWRST OFFSET(15) NUMBITS(1) []
    ],
    CR2 [
        /// Peripheral clock frequency in MHz
        FREQ OFFSET(0) NUMBITS(6) [],
        /// Error interrupt enable
        ITERREN OFFSET(8) NUMBITS(1) [],
        /// Event interrupt enable
        ITEVTEN OFFSET(9) NUMBITS(1) [],
        /// Buffer interrupt enable
        ITBUFEN OFFSET(10) NUMBITS(1) [],
        /// DMA requests enable
        DMAEN OFFSET(11) NUMBITS(1) [],
        /// DMA last transfer
        LAST OFFSET(12) NUMBITS(1) []
    ],
    OAR1 [
        /// Interface address
        ADD OFFSET(0) NUMBITS(10) [],
        /// Must be kept at 1 by software
        ONE OFFSET(14) NUMBITS(1) [],
        /// Addressing mode (slave mode)
        ADDMODE OFFSET(15) NUMBITS(1) [
            SevenBit = 0,
            TenBit = 1
        ]
    ],
    DR [
        /// 8-bit data register
        DR OFFSET(0) NUMBITS(8) []
    ],
    SR1 [
        /// Start bit (master mode)
        SB OFFSET(0) NUMBITS(1) [],
        /// Address sent (master) / matched (slave)
        ADDR OFFSET(1) NUMBITS(1) [],
        /// Byte transfer finished
        BTF OFFSET(2) NUMBITS(1) [],
        /// 10-bit header sent
        ADD10 OFFSET(3) NUMBITS(1) [],
        /// Stop detection (slave mode)
        STOPF OFFSET(4) NUMBITS(1) [],
        /// Data register not empty (receivers)
        RXNE OFFSET(6) NUMBITS(1) [],
        /// Data register empty (transmitters)
        TXE OFFSET(7) NUMBITS(1) [],
        /// Bus error
        BERR OFFSET(8) NUMBITS(1) [],
        /// Arbitration lost (master mode)
        ARLO OFFSET(9) NUMBITS(1) [],
        /// Acknowledge failure
        AF OFFSET(10) NUMBITS(1) [],
        /// Overrun/Underrun
        OVR OFFSET(11) NUMBITS(1) [],
        /// PEC error in reception
        PECERR OFFSET(12) NUMBITS(1) [],
        /// Timeout or Tlow error
        TIMEOUT OFFSET(14) NUMBITS(1) [],
        /// SMBus alert
        SMBALERT OFFSET(15) NUMBITS(1) []
    ],
    SR2 [
        /// Master/slave
        MSL OFFSET(0) NUMBITS(1) [],
        /// Bus busy
        BUSY OFFSET(1) NUMBITS(1) [],
        /// Transmitter/receiver
        TRA OFFSET(2) NUMBITS(1) [],
        /// General call address (slave mode)
        GENCALL OFFSET(4) NUMBITS(1) [],
        /// SMBus device default address (slave mode)
        SMBDEFAULT OFFSET(5) NUMBITS(1) [],
        /// SMBus host header (slave mode)
        SMBHOST OFFSET(6) NUMBITS(1) [],
        /// Dual flag (slave mode)
        DUALF OFFSET(7) NUMBITS(1) [],
        /// Packet error checking register
        PEC OFFSET(8) NUMBITS(8) []
    ],
    CCR [
        /// Clock control in fast/standard mode (master mode)
        CCR OFFSET(0) NUMBITS(12) [],
        /// Fast mode duty cycle
        DUTY OFFSET(14) NUMBITS(1) [
            Tlow2Thigh1 = 0,
            Tlow16Thigh9 = 1
        ],
        /// Master mode selection
        FS OFFSET(15) NUMBITS(1) [
            Standard = 0,
            Fast = 1
        ]
    ],
    TRISE [
        /// Maximum rise time in master mode
        TRISE OFFSET(0) NUMBITS(6) []
    ]
];

/// All SR1 bits that signal a fault rather than progress.
const SR1_ERROR_MASK: u32 = 0xDF00;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cInstance {
    I2c1,
    I2c2,
}

impl I2cInstance {
    pub const fn peripheral(self) -> Peripheral {
        match self {
            I2cInstance::I2c1 => Peripheral::I2c1,
            I2cInstance::I2c2 => Peripheral::I2c2,
        }
    }
}

/// SCL timing mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Up to 100 kHz, Tlow = Thigh.
    Standard,
    /// Up to 400 kHz, Tlow/Thigh = 2.
    Fast,
    /// Up to 400 kHz, Tlow/Thigh = 16/9.
    FastDuty,
}

impl Mode {
    /// Number of peripheral clock periods per CCR unit of SCL period.
    const fn divisor(self) -> u32 {
        match self {
            Mode::Standard => 2,
            Mode::Fast => 3,
            Mode::FastDuty => 25,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusMode {
    I2c,
    SmbusDevice,
    SmbusHost,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Write,
    Read,
}

/// Snapshot of the SR1 error flags at the time an operation failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ErrorFlags(u32);

impl ErrorFlags {
    fn from_sr1(sr1: u32) -> ErrorFlags {
        ErrorFlags(sr1 & SR1_ERROR_MASK)
    }

    fn flags(&self) -> LocalRegisterCopy<u32, SR1::Register> {
        LocalRegisterCopy::new(self.0)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// The addressed device or the data byte was not acknowledged.
    pub fn is_nack(&self) -> bool {
        self.flags().is_set(SR1::AF)
    }

    pub fn is_bus_error(&self) -> bool {
        self.flags().is_set(SR1::BERR)
    }

    pub fn is_arbitration_lost(&self) -> bool {
        self.flags().is_set(SR1::ARLO)
    }

    pub fn is_overrun(&self) -> bool {
        self.flags().is_set(SR1::OVR)
    }

    pub fn is_pec_error(&self) -> bool {
        self.flags().is_set(SR1::PECERR)
    }

    /// SMBus timeout or Tlow error. Not the polling budget.
    pub fn is_bus_timeout(&self) -> bool {
        self.flags().is_set(SR1::TIMEOUT)
    }

    pub fn is_smbus_alert(&self) -> bool {
        self.flags().is_set(SR1::SMBALERT)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The peripheral raised an error flag. Inspect the flags to tell a NACK
    /// from a bus error or lost arbitration.
    Status(ErrorFlags),
    /// The polling budget ran out before the awaited condition.
    Timeout,
    /// The requested SCL timing cannot be expressed with this peripheral
    /// clock.
    InvalidClock,
}

/// Register values derived from the peripheral clock and SCL requirements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockSettings {
    /// CR2.FREQ, peripheral clock in MHz.
    pub freq_mhz: u32,
    /// CCR.CCR divider.
    pub ccr: u32,
    pub mode: Mode,
    /// TRISE.TRISE.
    pub trise: u32,
}

impl ClockSettings {
    /// Compute the clock control and rise time values.
    ///
    /// The CCR divider is `pclk / (k * scl_hz)` with `k` of 2, 3 or 25 for
    /// standard, fast and fast-duty modes, rounded up so SCL never exceeds
    /// the requested rate.
    pub fn compute(
        pclk: u32,
        mode: Mode,
        scl_hz: u32,
        max_rise_ns: u32,
    ) -> Result<ClockSettings, Error> {
        let freq_mhz = pclk / 1_000_000;
        // FREQ is a 6-bit field and the peripheral needs at least 2 MHz.
        if !(2..=50).contains(&freq_mhz) || scl_hz == 0 {
            return Err(Error::InvalidClock);
        }

        let period = mode.divisor().checked_mul(scl_hz).ok_or(Error::InvalidClock)?;
        let ccr = pclk.div_ceil(period);

        let min_ccr = match mode {
            Mode::Standard => 4,
            Mode::Fast | Mode::FastDuty => 1,
        };
        if ccr < min_ccr || ccr > 0xFFF {
            return Err(Error::InvalidClock);
        }

        let trise = max_rise_ns.checked_mul(freq_mhz).ok_or(Error::InvalidClock)? / 1000 + 1;
        if trise > 0x3F {
            return Err(Error::InvalidClock);
        }

        Ok(ClockSettings {
            freq_mhz,
            ccr,
            mode,
            trise,
        })
    }
}

pub struct I2c<'a, B: RegisterBus> {
    bus: &'a B,
    base: usize,
    instance: I2cInstance,
}

impl<'a, B: RegisterBus> I2c<'a, B> {
    pub const fn new(bus: &'a B, instance: I2cInstance) -> I2c<'a, B> {
        I2c {
            bus,
            base: instance.peripheral().base(),
            instance,
        }
    }

    pub fn instance(&self) -> I2cInstance {
        self.instance
    }

    fn cr1(&self) -> Reg<'a, B, CR1::Register> {
        Reg::new(self.bus, self.base + CR1)
    }

    fn cr2(&self) -> Reg<'a, B, CR2::Register> {
        Reg::new(self.bus, self.base + CR2)
    }

    fn oar1(&self) -> Reg<'a, B, OAR1::Register> {
        Reg::new(self.bus, self.base + OAR1)
    }

    fn dr(&self) -> Reg<'a, B, DR::Register> {
        Reg::new(self.bus, self.base + DR)
    }

    fn sr1(&self) -> Reg<'a, B, SR1::Register> {
        Reg::new(self.bus, self.base + SR1)
    }

    fn sr2(&self) -> Reg<'a, B, SR2::Register> {
        Reg::new(self.bus, self.base + SR2)
    }

    fn ccr(&self) -> Reg<'a, B, CCR::Register> {
        Reg::new(self.bus, self.base + CCR)
    }

    fn trise(&self) -> Reg<'a, B, TRISE::Register> {
        Reg::new(self.bus, self.base + TRISE)
    }

    /// Poll SR1 until `done` holds or an error flag shows up.
    fn wait_sr1(
        &self,
        timeout: Timeout,
        done: impl Fn(LocalRegisterCopy<u32, SR1::Register>) -> bool,
    ) -> Result<(), Error> {
        let outcome = timeout.poll(|| {
            let sr1 = self.sr1().extract();
            let errors = ErrorFlags::from_sr1(sr1.get());
            if !errors.is_empty() {
                Some(Err(Error::Status(errors)))
            } else if done(sr1) {
                Some(Ok(()))
            } else {
                None
            }
        });
        match outcome {
            Some(result) => result,
            None => Err(Error::Timeout),
        }
    }

    pub fn enable(&self) {
        self.cr1().modify(CR1::PE::SET);
    }

    pub fn disable(&self) {
        self.cr1().modify(CR1::PE::CLEAR);
    }

    pub fn is_busy(&self) -> bool {
        self.sr2().is_set(SR2::BUSY)
    }

    /// Reset the peripheral's internal state and wait for the bus to be
    /// released.
    pub fn software_reset(&self, timeout: Timeout) -> Result<(), Error> {
        self.cr1().modify(CR1::SWRST::SET);
        self.cr1().modify(CR1::SWRST::CLEAR);
        timeout
            .poll(|| (!self.sr2().is_set(SR2::BUSY)).then_some(()))
            .ok_or_else(|| {
                log::warn!("i2c {:?}: bus still busy after reset", self.instance);
                Error::Timeout
            })
    }

    /// Program FREQ, CCR and TRISE for the requested SCL rate.
    ///
    /// The peripheral is disabled while CCR and TRISE are written and
    /// re-enabled afterwards if it was on.
    pub fn set_clock(
        &self,
        pclk: u32,
        mode: Mode,
        scl_hz: u32,
        max_rise_ns: u32,
    ) -> Result<ClockSettings, Error> {
        let settings = ClockSettings::compute(pclk, mode, scl_hz, max_rise_ns)?;

        let was_enabled = self.cr1().is_set(CR1::PE);
        self.cr1().modify(CR1::PE::CLEAR);

        self.cr2().modify(CR2::FREQ.val(settings.freq_mhz));
        let timing = match settings.mode {
            Mode::Standard => CCR::FS::Standard + CCR::DUTY::Tlow2Thigh1,
            Mode::Fast => CCR::FS::Fast + CCR::DUTY::Tlow2Thigh1,
            Mode::FastDuty => CCR::FS::Fast + CCR::DUTY::Tlow16Thigh9,
        };
        self.ccr().write(timing + CCR::CCR.val(settings.ccr));
        self.trise().write(TRISE::TRISE.val(settings.trise));

        if was_enabled {
            self.cr1().modify(CR1::PE::SET);
        }

        log::debug!(
            "i2c {:?}: {:?} scl {} Hz, ccr {} trise {}",
            self.instance,
            mode,
            scl_hz,
            settings.ccr,
            settings.trise
        );
        Ok(settings)
    }

    pub fn set_bus_mode(&self, mode: BusMode) {
        let value = match mode {
            BusMode::I2c => CR1::SMBUS::CLEAR + CR1::SMBTYPE::Device,
            BusMode::SmbusDevice => CR1::SMBUS::SET + CR1::SMBTYPE::Device,
            BusMode::SmbusHost => CR1::SMBUS::SET + CR1::SMBTYPE::Host,
        };
        self.cr1().modify(value);
    }

    /// Set the 7-bit own address used when the peripheral is addressed as a
    /// slave.
    pub fn set_own_address(&self, address: u8) {
        self.oar1().write(
            OAR1::ADDMODE::SevenBit + OAR1::ONE::SET + OAR1::ADD.val(((address & 0x7F) as u32) << 1),
        );
    }

    /// Error flags currently latched in SR1.
    pub fn error_flags(&self) -> ErrorFlags {
        ErrorFlags::from_sr1(self.sr1().get())
    }

    /// Clear every latched error flag. The SR1 error bits clear on a write of
    /// zero; the remaining SR1 bits are read-only.
    pub fn clear_error_flags(&self) {
        self.sr1().set(0);
    }

    /// Generate a START (or repeated START) and wait until it is on the bus.
    pub fn start(&self, timeout: Timeout) -> Result<(), Error> {
        self.cr1().modify(CR1::START::SET);
        self.wait_sr1(timeout, |sr1| sr1.is_set(SR1::SB))
    }

    /// Send the 7-bit `address` with the R/W bit and wait for the slave's
    /// acknowledge.
    ///
    /// A NACK is reported as `Error::Status` with `is_nack()` set. Devices
    /// such as EEPROMs NACK their address while busy, so callers may retry
    /// the start + address pair.
    pub fn addr(&self, address: u8, direction: Direction) -> Result<(), Error> {
        let rw = match direction {
            Direction::Write => 0,
            Direction::Read => 1,
        };
        self.dr().write(DR::DR.val(((address as u32) << 1) | rw));
        self.wait_sr1(Timeout::Forever, |sr1| sr1.is_set(SR1::ADDR))
            .inspect_err(|e| log::debug!("i2c {:?}: address {:#04x}: {:?}", self.instance, address, e))?;
        // ADDR is cleared by reading SR1 then SR2.
        let _ = self.sr2().get();
        Ok(())
    }

    /// Transmit `buffer`, returning the number of bytes written.
    pub fn write(&self, buffer: &[u8]) -> Result<usize, Error> {
        for &byte in buffer {
            self.wait_sr1(Timeout::Forever, |sr1| sr1.is_set(SR1::TXE))?;
            self.dr().write(DR::DR.val(byte as u32));
            log::trace!("i2c {:?}: tx {:#04x}", self.instance, byte);
        }
        self.wait_sr1(Timeout::Forever, |sr1| sr1.is_set(SR1::BTF))?;
        Ok(buffer.len())
    }

    /// Receive `buffer.len()` bytes, returning the number read.
    ///
    /// The STOP condition is requested before the final byte is taken out of
    /// DR: the peripheral only NACKs the last byte correctly in that order.
    /// No separate `stop` is needed after a read. An empty `buffer` returns
    /// `Ok(0)` without touching the bus.
    pub fn read(&self, buffer: &mut [u8]) -> Result<usize, Error> {
        let n = buffer.len();
        if n == 0 {
            return Ok(0);
        }
        if n > 1 {
            self.cr1().modify(CR1::ACK::SET);
        }

        for slot in buffer[..n - 1].iter_mut() {
            self.wait_sr1(Timeout::Forever, |sr1| sr1.is_set(SR1::RXNE))?;
            *slot = self.dr().read(DR::DR) as u8;
        }

        self.cr1().modify(CR1::ACK::CLEAR + CR1::STOP::SET);
        self.wait_sr1(Timeout::Forever, |sr1| sr1.is_set(SR1::RXNE))?;
        buffer[n - 1] = self.dr().read(DR::DR) as u8;
        Ok(n)
    }

    /// Generate a STOP and wait for the peripheral to clear the request.
    pub fn stop(&self, timeout: Timeout) -> Result<(), Error> {
        self.cr1().modify(CR1::STOP::SET);
        timeout
            .poll(|| (!self.cr1().is_set(CR1::STOP)).then_some(()))
            .ok_or(Error::Timeout)
    }

    /// Wait until no START, STOP or PEC request is pending, so the bus can be
    /// used for a new transaction.
    pub fn wait_previous_action(&self, timeout: Timeout) -> Result<(), Error> {
        timeout
            .poll(|| {
                let cr1 = self.cr1().extract();
                (!cr1.is_set(CR1::START) && !cr1.is_set(CR1::STOP) && !cr1.is_set(CR1::PEC))
                    .then_some(())
            })
            .ok_or(Error::Timeout)
    }
}
