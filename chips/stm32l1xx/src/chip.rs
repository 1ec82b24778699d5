// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Default peripheral set of an STM32L1 board.

use crate::mmio::RegisterBus;
use crate::rcc::Peripheral;

pub struct Stm32l1xxDefaultPeripherals<'a, B: RegisterBus> {
    pub rcc: crate::rcc::Rcc<'a, B>,
    pub pwr: crate::pwr::Pwr<'a, B>,
    pub flash: crate::flash::Flash<'a, B>,
    pub i2c1: crate::i2c::I2c<'a, B>,
    pub i2c2: crate::i2c::I2c<'a, B>,
    pub usb: crate::usb::Usb<'a, B>,
    pub iwdg: crate::iwdg::Iwdg<'a, B>,
    pub wwdg: crate::wwdg::Wwdg<'a, B>,
    pub rtc: crate::rtc::Rtc<'a, B>,
    pub lcd: crate::lcd::Lcd<'a, B>,
    pub tim2: crate::timer::Timer<'a, B>,
    pub tim3: crate::timer::Timer<'a, B>,
    pub tim4: crate::timer::Timer<'a, B>,
    pub signature: crate::signature::Signature<'a, B>,
}

impl<'a, B: RegisterBus> Stm32l1xxDefaultPeripherals<'a, B> {
    pub const fn new(bus: &'a B) -> Self {
        Self {
            rcc: crate::rcc::Rcc::new(bus),
            pwr: crate::pwr::Pwr::new(bus),
            flash: crate::flash::Flash::new(bus),
            i2c1: crate::i2c::I2c::new(bus, crate::i2c::I2cInstance::I2c1),
            i2c2: crate::i2c::I2c::new(bus, crate::i2c::I2cInstance::I2c2),
            usb: crate::usb::Usb::new(bus),
            iwdg: crate::iwdg::Iwdg::new(bus),
            wwdg: crate::wwdg::Wwdg::new(bus),
            rtc: crate::rtc::Rtc::new(bus),
            lcd: crate::lcd::Lcd::new(bus),
            tim2: crate::timer::Timer::new(bus, crate::timer::TimerInstance::Tim2),
            tim3: crate::timer::Timer::new(bus, crate::timer::TimerInstance::Tim3),
            tim4: crate::timer::Timer::new(bus, crate::timer::TimerInstance::Tim4),
            signature: crate::signature::Signature::new(bus),
        }
    }

    /// Turn on the bus clocks of `peripherals` and make the backup domain
    /// writable if the RTC or LCD is among them.
    pub fn enable_clocks(&self, peripherals: &[Peripheral]) {
        for &peripheral in peripherals {
            self.rcc.enable_clock(peripheral);
        }
        if peripherals
            .iter()
            .any(|p| matches!(p, Peripheral::Rtc | Peripheral::Lcd))
        {
            self.rcc.enable_clock(Peripheral::Pwr);
            self.pwr.enable_backup_access();
        }
    }
}
