// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Independent watchdog, clocked from the LSI. Once started it cannot be
//! stopped until reset.

use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::register_bitfields;

use crate::mmio::{Reg, RegisterBus};
use crate::poll::Timeout;
use crate::rcc::Peripheral;

const KR: usize = 0x00;
const PR: usize = 0x04;
const RLR: usize = 0x08;
const SR: usize = 0x0C;

/// Nominal LSI frequency. The real oscillator may be off by a large margin.
pub const LSI_HZ: u32 = 37_000;

pub const MAX_RELOAD: u16 = 0xFFF;

register_bitfields![u32,
    KR [
        KEY OFFSET(0) NUMBITS(16) [
            Enable = 0x5555,
            Reload = 0xAAAA,
            Start = 0xCCCC
        ]
    ],
    PR [
        PR OFFSET(0) NUMBITS(3) []
    ],
    RLR [
        RL OFFSET(0) NUMBITS(12) []
    ],
    SR [
        /// Prescaler value update
        PVU OFFSET(0) NUMBITS(1) [],
        /// Reload value update
        RVU OFFSET(1) NUMBITS(1) []
    ]
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Prescaler {
    Div4 = 0,
    Div8 = 1,
    Div16 = 2,
    Div32 = 3,
    Div64 = 4,
    Div128 = 5,
    Div256 = 6,
}

impl Prescaler {
    const ALL: [Prescaler; 7] = [
        Prescaler::Div4,
        Prescaler::Div8,
        Prescaler::Div16,
        Prescaler::Div32,
        Prescaler::Div64,
        Prescaler::Div128,
        Prescaler::Div256,
    ];

    pub const fn divider(self) -> u32 {
        4 << self as u32
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub prescaler: Prescaler,
    pub reload: u16,
}

/// Smallest prescaler that reaches `period_ms` with the nominal LSI, or
/// `None` if the period is beyond the watchdog's range (about 28 s).
pub fn period_to_config(period_ms: u32) -> Option<Config> {
    let ticks = period_ms.checked_mul(LSI_HZ / 1000)?;
    Prescaler::ALL.iter().find_map(|&prescaler| {
        let reload = ticks.div_ceil(prescaler.divider()).saturating_sub(1);
        (reload <= MAX_RELOAD as u32).then_some(Config {
            prescaler,
            reload: reload as u16,
        })
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// PVU/RVU did not clear within the budget.
    Timeout,
    /// Reload value above 0xFFF.
    InvalidReload,
}

pub struct Iwdg<'a, B: RegisterBus> {
    bus: &'a B,
    base: usize,
}

impl<'a, B: RegisterBus> Iwdg<'a, B> {
    pub const fn new(bus: &'a B) -> Iwdg<'a, B> {
        Iwdg {
            bus,
            base: Peripheral::Iwdg.base(),
        }
    }

    fn kr(&self) -> Reg<'a, B, KR::Register> {
        Reg::new(self.bus, self.base + KR)
    }

    fn pr(&self) -> Reg<'a, B, PR::Register> {
        Reg::new(self.bus, self.base + PR)
    }

    fn rlr(&self) -> Reg<'a, B, RLR::Register> {
        Reg::new(self.bus, self.base + RLR)
    }

    fn sr(&self) -> Reg<'a, B, SR::Register> {
        Reg::new(self.bus, self.base + SR)
    }

    /// Start the watchdog with the given timing. The prescaler and reload
    /// registers cross into the LSI domain, which is waited for before the
    /// counter is reloaded.
    pub fn start(&self, prescaler: Prescaler, reload: u16, timeout: Timeout) -> Result<(), Error> {
        if reload > MAX_RELOAD {
            return Err(Error::InvalidReload);
        }

        self.kr().write(KR::KEY::Start);
        self.kr().write(KR::KEY::Enable);
        self.pr().write(PR::PR.val(prescaler as u32));
        self.rlr().write(RLR::RL.val(reload as u32));

        timeout
            .poll(|| {
                let sr = self.sr().extract();
                (!sr.is_set(SR::PVU) && !sr.is_set(SR::RVU)).then_some(())
            })
            .ok_or_else(|| {
                log::warn!("iwdg: prescaler/reload update did not complete");
                Error::Timeout
            })?;

        self.feed();
        log::debug!("iwdg: started, {:?} reload {}", prescaler, reload);
        Ok(())
    }

    pub fn feed(&self) {
        self.kr().write(KR::KEY::Reload);
    }
}
