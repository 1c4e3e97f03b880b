// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Bus-independent register maps.
//!
//! A register map names a device address on some control bus. Consumers
//! of a map (PMIC, regulator, fuel gauge drivers) do not know whether
//! the bus is RSB, I²C, or a test fake.

use crate::device::{self, Driver};
use crate::error::Result;

/// A bus that provides byte-wide register access to addressed devices.
pub trait RegmapBus: Driver {
    /// Prepares the bus for talking to the given device address.
    ///
    /// May fail with `Io` or `NoDevice`.
    fn prepare(&self, _addr: u8) -> Result<()> {
        Ok(())
    }

    /// Reads a device register.
    ///
    /// May fail with `Io`.
    fn read(&self, addr: u8, reg: u8) -> Result<u8>;

    /// Writes a device register.
    ///
    /// May fail with `Io`.
    fn write(&self, addr: u8, reg: u8, value: u8) -> Result<()>;
}

/// A reference to the register file of one device on a control bus.
#[derive(Clone, Copy)]
pub struct Regmap {
    /// The bus providing access to the device.
    pub bus: &'static dyn RegmapBus,
    /// The device's address on the bus.
    pub addr: u8,
}

impl Regmap {
    /// Creates a register map for device `addr` on `bus`.
    pub const fn new(bus: &'static dyn RegmapBus, addr: u8) -> Self {
        Self { bus, addr }
    }

    /// Acquires the provider bus and verifies the device is reachable.
    ///
    /// May fail with `Io` or `NoDevice`.
    pub fn get(&self) -> Result<()> {
        device::get(self.bus)?;

        if let Err(err) = self.bus.prepare(self.addr) {
            device::put(self.bus);
            return Err(err);
        }

        Ok(())
    }

    /// Releases the provider bus.
    pub fn put(&self) {
        device::put(self.bus);
    }

    /// Reads a register. May fail with `Io`.
    pub fn read(&self, reg: u8) -> Result<u8> {
        self.bus.read(self.addr, reg)
    }

    /// Writes a register. May fail with `Io`.
    pub fn write(&self, reg: u8, value: u8) -> Result<()> {
        self.bus.write(self.addr, reg, value)
    }

    /// Sets bits in a register. May fail with `Io`.
    pub fn set_bits(&self, reg: u8, set: u8) -> Result<()> {
        self.update_bits(reg, set, set)
    }

    /// Updates a bitfield in a register. May fail with `Io`.
    pub fn update_bits(&self, reg: u8, mask: u8, value: u8) -> Result<()> {
        let old = self.read(reg)?;

        self.write(reg, old ^ ((value ^ old) & mask))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Device;
    use spin::mutex::SpinMutex;

    struct ArrayBus {
        dev: Device,
        regs: SpinMutex<[u8; 8]>,
    }

    impl Driver for ArrayBus {
        fn device(&self) -> &Device {
            &self.dev
        }
    }

    impl RegmapBus for ArrayBus {
        fn read(&self, _addr: u8, reg: u8) -> Result<u8> {
            Ok(self.regs.lock()[usize::from(reg)])
        }

        fn write(&self, _addr: u8, reg: u8, value: u8) -> Result<()> {
            self.regs.lock()[usize::from(reg)] = value;
            Ok(())
        }
    }

    #[test]
    fn update_bits_touches_only_the_mask() {
        let bus: &'static ArrayBus = Box::leak(Box::new(ArrayBus {
            dev: Device::new("array-bus"),
            regs: SpinMutex::new([0; 8]),
        }));
        let map = Regmap::new(bus, 0x2d);

        map.write(3, 0b1010_0101).unwrap();
        map.update_bits(3, 0b0000_1111, 0b0000_0110).unwrap();
        assert_eq!(map.read(3).unwrap(), 0b1010_0110);

        map.set_bits(3, 0b0100_0000).unwrap();
        assert_eq!(map.read(3).unwrap(), 0b1110_0110);
    }
}
