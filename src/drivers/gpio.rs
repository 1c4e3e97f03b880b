// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The GPIO framework.
//!
//! A pin handle carries its full configuration (mode, drive strength,
//! pull direction). Acquiring the handle configures the pin; releasing
//! it returns the pin to the disabled state.

use crate::device::{self, Driver};
use crate::error::Result;

/// Drive strength: 10 mA.
pub const DRIVE_10MA: u8 = 0;
/// Drive strength: 20 mA.
pub const DRIVE_20MA: u8 = 1;
/// Drive strength: 30 mA.
pub const DRIVE_30MA: u8 = 2;
/// Drive strength: 40 mA.
pub const DRIVE_40MA: u8 = 3;

/// Pin mode: input.
pub const MODE_INPUT: u8 = 0;
/// Pin mode: output.
pub const MODE_OUTPUT: u8 = 1;
/// Pin mode: disabled.
pub const MODE_DISABLE: u8 = 7;

/// No pull resistor.
pub const PULL_NONE: u8 = 0;
/// Pull-up resistor.
pub const PULL_UP: u8 = 1;
/// Pull-down resistor.
pub const PULL_DOWN: u8 = 2;

/// Encodes a (port, index) pair as a pin id.
pub const fn pin(port: u8, index: u8) -> u8 {
    32 * port + index
}

/// A pin controller.
pub trait GpioController: Driver {
    /// Applies a handle's mode, drive strength, and pull configuration.
    fn init_pin(&self, gpio: &GpioHandle) -> Result<()>;

    /// Returns a pin to the disabled state.
    fn release_pin(&self, gpio: &GpioHandle);

    /// Reads the value of a pin.
    ///
    /// If the pin mode is not input, this may not reflect the actual
    /// hardware state.
    fn get_value(&self, gpio: &GpioHandle) -> Result<bool>;

    /// Writes the value of a pin.
    ///
    /// If the pin mode is not output, this may have no hardware effect.
    fn set_value(&self, gpio: &GpioHandle, value: bool) -> Result<()>;
}

/// A reference to a single pin and its configuration.
#[derive(Clone, Copy)]
pub struct GpioHandle {
    /// The pin controller providing this pin.
    pub ctrl: &'static dyn GpioController,
    /// The controller-specific pin id (see [`pin`]).
    pub id: u8,
    /// The drive strength to configure.
    pub drive: u8,
    /// The pin mode to configure.
    pub mode: u8,
    /// The pull direction to configure.
    pub pull: u8,
}

impl GpioHandle {
    /// Acquires the pin's controller and configures the pin.
    ///
    /// May fail with the controller's probe errors.
    pub fn get(&self) -> Result<()> {
        device::get(self.ctrl)?;

        if let Err(err) = self.ctrl.init_pin(self) {
            device::put(self.ctrl);
            return Err(err);
        }

        Ok(())
    }

    /// Disables the pin and releases the controller.
    pub fn put(&self) {
        self.ctrl.release_pin(self);
        device::put(self.ctrl);
    }

    /// Reads the value of the pin.
    ///
    /// May fail with `Io`.
    pub fn value(&self) -> Result<bool> {
        self.ctrl.get_value(self)
    }

    /// Writes the value of the pin.
    ///
    /// May fail with `Io`.
    pub fn set_value(&self, value: bool) -> Result<()> {
        self.ctrl.set_value(self, value)
    }
}
