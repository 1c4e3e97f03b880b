// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The closed set of error kinds shared by all firmware components.

/// An error returned by a driver or framework operation.
///
/// Each component function documents which of these kinds it may return.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// The device or bus is busy; try again later.
    Busy,
    /// The object already exists.
    Exists,
    /// An argument to the function was invalid.
    Invalid,
    /// Communication with the hardware failed.
    Io,
    /// The device does not exist.
    NoDevice,
    /// The operation is not supported.
    NotSupported,
    /// An argument to the function was out of range.
    Range,
}

/// The result type used throughout the firmware.
pub type Result<T> = core::result::Result<T, Error>;
