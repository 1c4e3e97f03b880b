// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The reference-counted device model.
//!
//! Device descriptors are statically declared inside each driver
//! instance. A device is probed when its first reference is acquired and
//! released when the last reference is dropped, so holding a reference
//! guarantees the device (and, transitively, its clocks, pins, and buses)
//! stays running.
//!
//! Reference counts are relaxed atomics purely so the statics are `Sync`;
//! only the single cooperative control thread ever mutates them.

use crate::error::Result;
use core::sync::atomic::{AtomicU8, Ordering::Relaxed};
use log::{debug, error};

/// The descriptor and mutable state embedded in every driver instance.
#[derive(Debug)]
pub struct Device {
    name: &'static str,
    refcount: AtomicU8,
}

impl Device {
    /// Creates a device descriptor with the given name.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            refcount: AtomicU8::new(0),
        }
    }

    /// The unique name of this device.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The current number of references to this device.
    pub fn refcount(&self) -> u8 {
        self.refcount.load(Relaxed)
    }
}

/// A driver bound to a statically-declared device.
///
/// Drivers live in statics and are referenced from other statics, so
/// they must be `Sync`; the embedded state is atomic for the same
/// reason.
pub trait Driver: Sync {
    /// The device descriptor embedded in this driver instance.
    fn device(&self) -> &Device;

    /// Detects and initialises the hardware on first acquisition.
    ///
    /// May fail with any error kind the underlying resources produce.
    fn probe(&self) -> Result<()> {
        Ok(())
    }

    /// Uninitialises the hardware after the last reference is dropped.
    ///
    /// Release never fails.
    fn release(&self) {}
}

/// Acquires a reference to a device.
///
/// If this is the first reference, the driver's probe runs first; a probe
/// failure propagates and leaves the device unreferenced. The device
/// remains running until the reference is released with [`put`].
pub fn get<T: Driver + ?Sized>(drv: &T) -> Result<()> {
    let dev = drv.device();

    if dev.refcount() == 0 {
        debug!("{}: Probing", dev.name());
        if let Err(err) = drv.probe() {
            error!("{}: Probe failed: {:?}", dev.name(), err);
            return Err(err);
        }
    }

    // Increment the refcount only after successful initialization.
    dev.refcount.fetch_add(1, Relaxed);

    Ok(())
}

/// Acquires a reference to a device, returning the device on success.
pub fn get_or_none<T: Driver + ?Sized>(drv: &'static T) -> Option<&'static T> {
    get(drv).ok().map(|()| drv)
}

/// Releases a reference to a device.
///
/// The last release runs the driver's release hook.
pub fn put<T: Driver + ?Sized>(drv: &T) {
    let dev = drv.device();

    if dev.refcount.fetch_sub(1, Relaxed) == 1 {
        debug!("{}: Releasing", dev.name());
        drv.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use core::sync::atomic::{AtomicBool, AtomicU32};

    struct Probes {
        dev: Device,
        probes: AtomicU32,
        releases: AtomicU32,
        fail: AtomicBool,
    }

    impl Probes {
        fn new() -> Self {
            Self {
                dev: Device::new("probes"),
                probes: AtomicU32::new(0),
                releases: AtomicU32::new(0),
                fail: AtomicBool::new(false),
            }
        }
    }

    impl Driver for Probes {
        fn device(&self) -> &Device {
            &self.dev
        }

        fn probe(&self) -> Result<()> {
            if self.fail.load(Relaxed) {
                return Err(Error::Io);
            }
            self.probes.fetch_add(1, Relaxed);
            Ok(())
        }

        fn release(&self) {
            self.releases.fetch_add(1, Relaxed);
        }
    }

    #[test]
    fn probe_on_first_get_release_on_last_put() {
        let drv = Probes::new();

        get(&drv).unwrap();
        get(&drv).unwrap();
        assert_eq!(drv.probes.load(Relaxed), 1);
        assert_eq!(drv.dev.refcount(), 2);

        put(&drv);
        assert_eq!(drv.releases.load(Relaxed), 0);
        put(&drv);
        assert_eq!(drv.releases.load(Relaxed), 1);
        assert_eq!(drv.dev.refcount(), 0);

        // The next get probes again.
        get(&drv).unwrap();
        assert_eq!(drv.probes.load(Relaxed), 2);
        put(&drv);
    }

    #[test]
    fn probe_failure_leaves_device_unreferenced() {
        let drv = Probes::new();
        drv.fail.store(true, Relaxed);

        assert_eq!(get(&drv), Err(Error::Io));
        assert_eq!(drv.dev.refcount(), 0);

        drv.fail.store(false, Relaxed);
        let leaked: &'static Probes = Box::leak(Box::new(Probes::new()));
        assert!(get_or_none(leaked).is_some());
        assert_eq!(leaked.dev.refcount(), 1);
    }
}
