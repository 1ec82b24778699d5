// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Iteration-budget polling.
//!
//! Busy-wait loops in this crate are bounded by a number of polling
//! iterations rather than by wall-clock time: most of them run before any
//! timer is configured. The budget is consumed before the condition is
//! sampled, so `Timeout::Iterations(0)` fails without touching the hardware.

/// Polling budget for a blocking operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Timeout {
    /// Poll until the condition holds.
    Forever,
    /// Poll at most this many times.
    Iterations(u32),
}

impl Timeout {
    /// Call `f` until it returns `Some`, or until the budget is used up.
    ///
    /// Returns `None` if the budget ran out.
    pub fn poll<T>(self, mut f: impl FnMut() -> Option<T>) -> Option<T> {
        match self {
            Timeout::Forever => loop {
                if let Some(value) = f() {
                    return Some(value);
                }
            },
            Timeout::Iterations(budget) => {
                for _ in 0..budget {
                    if let Some(value) = f() {
                        return Some(value);
                    }
                }
                None
            }
        }
    }
}

/// Negative counts mean "wait forever".
impl From<i32> for Timeout {
    fn from(count: i32) -> Timeout {
        if count < 0 {
            Timeout::Forever
        } else {
            Timeout::Iterations(count as u32)
        }
    }
}
