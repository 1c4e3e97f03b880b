// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Checkpoints written to non-volatile scratch storage before hazardous
//! hardware steps.
//!
//! The scratch registers survive a firmware restart but not a SoC reset.
//! If a step hangs the firmware badly enough that the watchdog restarts
//! it, the tag left behind identifies the last step attempted. Tags embed
//! the firmware version so a stale tag from an older build is still
//! meaningful in logs.

use crate::platform::{Platform, PlatformImpl};
use crate::version::{VERSION_MAJOR, VERSION_MINOR};
use log::error;

const fn step_kind(kind: u32) -> u32 {
    (VERSION_MAJOR as u32) << 12 | (VERSION_MINOR as u32) << 8 | kind << 4
}

/// No step is in progress.
pub const NONE: u32 = 0;

/// About to suspend a CPU core.
pub const SUSPEND_CORE: u32 = step_kind(0) + 1;
/// About to suspend a cluster.
pub const SUSPEND_CLUSTER: u32 = step_kind(0) + 2;
/// About to suspend the compute subsystem.
pub const SUSPEND_CSS: u32 = step_kind(0) + 3;
/// About to synchronise and release runtime devices.
pub const SUSPEND_DEVICES: u32 = step_kind(0) + 4;
/// About to checkpoint and suspend DRAM.
pub const SUSPEND_DRAM: u32 = step_kind(0) + 5;
/// About to suspend the main clock tree.
pub const SUSPEND_CCU: u32 = step_kind(0) + 6;
/// About to gate the always-on power domains.
pub const SUSPEND_PRCM: u32 = step_kind(0) + 7;
/// About to suspend or shut down the PMIC.
pub const SUSPEND_PMIC: u32 = step_kind(0) + 8;
/// About to disable the supply regulators.
pub const SUSPEND_REGULATORS: u32 = step_kind(0) + 9;
/// Suspend finished.
pub const SUSPEND_COMPLETE: u32 = step_kind(0) + 10;

/// About to resume the PMIC.
pub const RESUME_PMIC: u32 = step_kind(1) + 1;
/// About to manually re-enable the supply regulators.
pub const RESUME_REGULATORS: u32 = step_kind(1) + 2;
/// About to resume the always-on power domains.
pub const RESUME_PRCM: u32 = step_kind(1) + 3;
/// About to resume the main clock tree.
pub const RESUME_CCU: u32 = step_kind(1) + 4;
/// About to resume DRAM.
pub const RESUME_DRAM: u32 = step_kind(1) + 5;
/// About to verify the retained-memory checksum.
pub const RESUME_DRAM_CHECKSUM: u32 = step_kind(1) + 6;
/// About to release wake sources and reacquire runtime devices.
pub const RESUME_DEVICES: u32 = step_kind(1) + 7;
/// About to resume execution on the compute subsystem.
pub const RESUME_CSS: u32 = step_kind(1) + 8;
/// Resume finished.
pub const RESUME_COMPLETE: u32 = step_kind(1) + 9;

/// Records a step tag before attempting a hazardous hardware step.
pub fn record(step: u32) {
    PlatformImpl::record_step(step);
}

/// Records the cause of an exception for post-restart diagnosis.
pub fn record_exception(kind: u8, pc: u32) {
    PlatformImpl::record_exception((kind as u32) << 24 | pc & 0x00ff_ffff);
}

/// Reports the last recorded step, if a previous run left one behind.
pub fn report_last() {
    let step = PlatformImpl::last_step();

    if step != NONE {
        error!("Step {:04x} failed!", step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::host;

    #[test]
    fn record_and_read_back() {
        let _guard = host::test_lock();
        record(SUSPEND_DRAM);
        assert_eq!(PlatformImpl::last_step(), SUSPEND_DRAM);
        record(NONE);
        assert_eq!(PlatformImpl::last_step(), NONE);
    }

    #[test]
    fn tags_embed_version_and_sequence() {
        assert_eq!(SUSPEND_CORE & 0xf, 1);
        assert_ne!(SUSPEND_CORE >> 4, RESUME_PMIC >> 4);
        assert_eq!(SUSPEND_COMPLETE >> 8, (VERSION_MAJOR as u32) << 4 | VERSION_MINOR as u32);
    }
}
