// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! System-control-processor firmware for Allwinner H6-class SoCs.
//!
//! The firmware manages system power states on behalf of the rich OS
//! running on the application processors: booting, idling, suspending,
//! resuming, rebooting, and powering off. It communicates with the AP's
//! secure monitor and kernel over a shared-memory mailbox using the SCPI
//! protocol.
//!
//! Everything runs in a single cooperative control thread; see
//! [`system::state_machine`] for the top-level loop. Interrupts only wake
//! that loop, they never drive concurrent handlers.

#![cfg_attr(not(test), no_std)]
#![warn(clippy::undocumented_unsafe_blocks)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod counter;
pub mod css;
pub mod debug;
pub mod device;
pub mod drivers;
pub mod error;
pub mod logger;
pub mod mmio;
pub mod platform;
pub mod scpi;
pub mod steps;
pub mod system;
pub mod version;
