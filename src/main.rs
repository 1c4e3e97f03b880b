// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The firmware image entry point.
//!
//! The startup code (out of tree, alongside the linker script) sets up
//! the stack and exception vectors, records any trap that caused a
//! restart, and jumps here with the decoded cause word.

#![no_std]
#![no_main]

use sunxi_scp::system;

/// Called by the startup code once a Rust environment exists.
#[unsafe(no_mangle)]
extern "C" fn scp_main(exception: u32) -> ! {
    system::state_machine(exception)
}
