// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The set of SoC platforms this firmware can be built for.
//!
//! A platform is selected by passing `--cfg platform="<name>"` in
//! `RUSTFLAGS`. Builds without a platform cfg (including unit tests) use
//! the host platform with fake hardware.

pub const PLATFORMS: [&str; 1] = ["h6"];
