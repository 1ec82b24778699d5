// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Control transfer phases of a control endpoint.
//!
//! Each phase fixes both STAT fields at once, so a phase change is a single
//! [`Endpoint::set_ep_bit`] write. The direction opposite to the data stage
//! stays armed (or NAKing on the last packet) so that a premature status
//! stage from the host is accepted. Status stages also reset both data
//! toggles.

use super::endpoint::{mask, status_masks, Direction, Endpoint, Status};
use crate::mmio::RegisterBus;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlPhase {
    /// Protocol stall: both directions answer STALL until the next SETUP.
    Stall,
    /// Waiting for more OUT data.
    DataOut,
    /// Waiting for the last OUT data packet.
    LastDataOut,
    /// Waiting for the host's zero-length OUT status packet.
    StatusOut,
    /// Sending IN data.
    DataIn,
    /// Sending the last IN data packet.
    LastDataIn,
    /// Sending the zero-length IN status packet.
    StatusIn,
}

/// Endpoint register state a phase establishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseTarget {
    pub tx: Status,
    pub rx: Status,
    /// Reset DTOG_TX and DTOG_RX to zero.
    pub reset_toggles: bool,
}

impl ControlPhase {
    pub const ALL: [ControlPhase; 7] = [
        ControlPhase::Stall,
        ControlPhase::DataOut,
        ControlPhase::LastDataOut,
        ControlPhase::StatusOut,
        ControlPhase::DataIn,
        ControlPhase::LastDataIn,
        ControlPhase::StatusIn,
    ];

    pub const fn target(self) -> PhaseTarget {
        let (tx, rx, reset_toggles) = match self {
            ControlPhase::Stall => (Status::Stall, Status::Stall, false),
            ControlPhase::DataOut => (Status::Stall, Status::Valid, false),
            ControlPhase::LastDataOut => (Status::Nak, Status::Valid, false),
            ControlPhase::StatusOut => (Status::Stall, Status::Valid, true),
            ControlPhase::DataIn => (Status::Valid, Status::Stall, false),
            ControlPhase::LastDataIn => (Status::Valid, Status::Nak, false),
            ControlPhase::StatusIn => (Status::Valid, Status::Stall, true),
        };
        PhaseTarget {
            tx,
            rx,
            reset_toggles,
        }
    }

    /// `(set_mask, reset_mask)` for [`Endpoint::set_ep_bit`].
    pub const fn masks(self) -> (u16, u16) {
        let target = self.target();
        let (tx_set, tx_reset) = status_masks(Direction::Tx, target.tx);
        let (rx_set, rx_reset) = status_masks(Direction::Rx, target.rx);
        let toggles = if target.reset_toggles {
            mask::DTOG_TX | mask::DTOG_RX
        } else {
            0
        };
        (tx_set | rx_set, tx_reset | rx_reset | toggles)
    }
}

impl<B: RegisterBus> Endpoint<'_, B> {
    pub fn set_control_state(&self, phase: ControlPhase) {
        let (set, reset) = phase.masks();
        self.set_ep_bit(set, reset);
    }
}
