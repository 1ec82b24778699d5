// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Register access.
//!
//! Every driver in this crate reaches its peripheral through a
//! [`RegisterBus`]. On the chip this is [`Mmio`], which performs volatile
//! 32-bit loads and stores. Host tests substitute a simulated bus that
//! models the peripheral's reaction to each access.
//!
//! Drivers never handle raw pointers. They build a [`Reg`] for the register
//! they need, and `Reg` implements the `tock-registers` interface traits, so
//! register code reads the same as it would over a `register_structs!`
//! block:
//!
//! ```rust,ignore
//! self.cr1().modify(CR1::START::SET);
//! while !self.sr1().is_set(SR1::SB) {}
//! ```

use core::marker::PhantomData;

use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::RegisterLongName;

/// A 32-bit register address space.
pub trait RegisterBus {
    /// Read the 32-bit word at `address`.
    fn read(&self, address: usize) -> u32;

    /// Write `value` to the 32-bit word at `address`.
    fn write(&self, address: usize, value: u32);
}

/// Memory-mapped peripheral bus of the running chip.
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// # Safety
    ///
    /// The caller must be running on an STM32L1 part, and every address later
    /// passed to this bus must be one of the peripheral or system memory
    /// addresses used by the drivers of this crate. Only one context may
    /// drive a given peripheral at a time.
    pub const unsafe fn new() -> Mmio {
        Mmio { _private: () }
    }
}

impl RegisterBus for Mmio {
    #[inline]
    fn read(&self, address: usize) -> u32 {
        // SAFETY: `Mmio::new` requires addresses to be valid, aligned
        // peripheral registers.
        unsafe { core::ptr::read_volatile(address as *const u32) }
    }

    #[inline]
    fn write(&self, address: usize, value: u32) {
        // SAFETY: see `read`.
        unsafe { core::ptr::write_volatile(address as *mut u32, value) }
    }
}

/// Handle to one register on a [`RegisterBus`].
///
/// `R` ties the handle to the bitfield definitions generated by
/// `register_bitfields!`, so only that register's fields can be used with it.
pub struct Reg<'a, B: RegisterBus, R: RegisterLongName = ()> {
    bus: &'a B,
    address: usize,
    _register: PhantomData<R>,
}

impl<'a, B: RegisterBus, R: RegisterLongName> Reg<'a, B, R> {
    pub const fn new(bus: &'a B, address: usize) -> Reg<'a, B, R> {
        Reg {
            bus,
            address,
            _register: PhantomData,
        }
    }

    pub const fn address(&self) -> usize {
        self.address
    }
}

impl<B: RegisterBus, R: RegisterLongName> Readable for Reg<'_, B, R> {
    type T = u32;
    type R = R;

    #[inline]
    fn get(&self) -> u32 {
        self.bus.read(self.address)
    }
}

impl<B: RegisterBus, R: RegisterLongName> Writeable for Reg<'_, B, R> {
    type T = u32;
    type R = R;

    #[inline]
    fn set(&self, value: u32) {
        self.bus.write(self.address, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Access, Memory, SimBus};
    use tock_registers::interfaces::ReadWriteable;
    use tock_registers::register_bitfields;

    register_bitfields![u32,
        CTRL [
            EN OFFSET(0) NUMBITS(1) [],
            MODE OFFSET(4) NUMBITS(3) []
        ]
    ];

    #[test]
    fn modify_is_one_read_then_one_write() {
        let bus = SimBus::new(Memory::new());
        bus.device_mut().poke(0x100, 0xF0F0_0000);

        let reg: Reg<_, CTRL::Register> = Reg::new(&bus, 0x100);
        reg.modify(CTRL::EN::SET + CTRL::MODE.val(5));

        assert_eq!(
            bus.log(),
            vec![
                Access::Read(0x100, 0xF0F0_0000),
                Access::Write(0x100, 0xF0F0_0051),
            ]
        );
        assert_eq!(reg.read(CTRL::MODE), 5);
        assert!(reg.is_set(CTRL::EN));
    }
}
