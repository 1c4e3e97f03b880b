// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Compute-subsystem power sequencing for the H6's single Cortex-A53
//! cluster.

use super::devices::{DEV_CPUCFG, DEV_R_CPUCFG, mmio};
use crate::counter::udelay;
use crate::css::PowerState;
use crate::mmio::Mmio;
use crate::platform::Platform;
use core::sync::atomic::{AtomicU32, Ordering::Relaxed};

// CPUCFG registers.
const C0_RST_CTRL_REG: usize = 0x0000;
const C0_CTRL_REG0: usize = 0x0010;
const C0_CTRL_REG1: usize = 0x0014;
const C0_CTRL_REG2: usize = 0x0018;
const C0_CPU_STATUS_REG: usize = 0x0080;
const L2_STATUS_REG: usize = 0x0084;
const DBG_REG0: usize = 0x00c0;

const C0_CTRL_REG0_AA64_MASK: u32 = 0xf << 24;
const C0_CTRL_REG0_L2RSTDISABLE: u32 = 1 << 4;
const C0_CTRL_REG1_ACINACTM: u32 = 1 << 0;
const C0_CTRL_REG2_L2FLUSHREQ: u32 = 1 << 8;
const C0_CPU_STATUS_STANDBYWFIL2: u32 = 1 << 0;
const L2_STATUS_L2FLUSHDONE: u32 = 1 << 10;

// All deasserted: DDR, MBIST, SoC debug, ETM, per-core debug, L2.
const C0_RST_CTRL_REG_MASK: u32 =
    1 << 28 | 1 << 25 | 1 << 24 | 0xf << 20 | 0xf << 16 | 1 << 8;

fn rvba_lo_reg(core: usize) -> usize {
    0x0040 + 0x08 * core
}

fn standby_wfi(core: usize) -> u32 {
    1 << (16 + core)
}

// R_CPUCFG registers.
const C0_PWRON_RESET_REG: usize = 0x0040;
const C0_PWRON_RESET_REG_NH_RST: u32 = 1 << 16;
const C0_PWROFF_GATING_REG: usize = 0x0044;
const CPU_SYS_RESET_REG: usize = 0x00a0;
const CPU_SYS_RESET: u32 = 1 << 0;

fn pwr_switch_reg(core: usize) -> usize {
    0x0050 + 0x04 * core
}

/// Power-on reset vector base address, saved across cluster power-off.
static RVBA: AtomicU32 = AtomicU32::new(0);

const POWER_SWITCH_ON_SEQUENCE: [u32; 6] = [0xfe, 0xf8, 0xe0, 0xc0, 0x80, 0x00];

/// Enables or disables power to a core power domain.
///
/// When enabling, the switch is closed gradually to limit inrush current
/// and voltage droop on the neighbouring domains.
fn set_power_switch(regs: Mmio, reg: usize, enable: bool) {
    if enable {
        // Avoid killing the power if the switch is already enabled.
        if regs.read_32(reg) == 0x00 {
            return;
        }

        // Allwinner's blob uses 10, 20, and 30μs delays, depending on
        // the iteration. However, the same code works fine in ATF with
        // no delays. The 10μs delay is here just to be extra safe.
        for value in POWER_SWITCH_ON_SEQUENCE {
            regs.write_32(reg, value);
            udelay(10);
        }
    } else {
        regs.write_32(reg, 0xff);
    }
}

/// Saves boot-time CSS state and applies static configuration.
pub fn init() {
    let cpucfg = mmio(DEV_CPUCFG);

    // Save the power-on reset vector base address from core 0.
    RVBA.store(cpucfg.read_32(rvba_lo_reg(0)), Relaxed);
    // Program all cores to start in AArch64 mode.
    cpucfg.set_32(C0_CTRL_REG0, C0_CTRL_REG0_AA64_MASK);
}

/// Nothing to do: the CSS-level domain has no controls of its own.
pub fn suspend_css(_new_state: PowerState) {}

/// Nothing to do: the CSS-level domain has no controls of its own.
pub fn resume_css(_old_state: PowerState) {}

/// Suspends the cluster once every core has stopped.
pub fn suspend_cluster(_cluster: usize, new_state: PowerState) {
    let cpucfg = mmio(DEV_CPUCFG);
    let r_cpucfg = mmio(DEV_R_CPUCFG);

    if new_state < PowerState::Off {
        return;
    }

    // Assert L2FLUSHREQ to clean the cluster L2 cache.
    cpucfg.set_32(C0_CTRL_REG2, C0_CTRL_REG2_L2FLUSHREQ);
    // Wait for L2FLUSHDONE to go high.
    cpucfg.poll_32(L2_STATUS_REG, L2_STATUS_L2FLUSHDONE);
    // Deassert L2FLUSHREQ.
    cpucfg.clr_32(C0_CTRL_REG2, C0_CTRL_REG2_L2FLUSHREQ);
    // Remove the cluster from coherency (assert ACINACTM).
    cpucfg.set_32(C0_CTRL_REG1, C0_CTRL_REG1_ACINACTM);
    // Wait for the cluster (L2 cache) to be idle.
    cpucfg.poll_32(C0_CPU_STATUS_REG, C0_CPU_STATUS_STANDBYWFIL2);
    // Assert all cluster resets (active-low).
    cpucfg.write_32(C0_RST_CTRL_REG, 0);
    // Assert all power-on resets (active-low).
    r_cpucfg.write_32(C0_PWRON_RESET_REG, 0);
    // Assert the CPU subsystem reset (active-low).
    r_cpucfg.write_32(CPU_SYS_RESET_REG, 0);
}

/// Prepares the cluster to resume execution.
pub fn resume_cluster(_cluster: usize, old_state: PowerState) {
    let cpucfg = mmio(DEV_CPUCFG);
    let r_cpucfg = mmio(DEV_R_CPUCFG);

    if old_state < PowerState::Off {
        return;
    }

    // Deassert the CPU subsystem reset (active-low).
    r_cpucfg.write_32(CPU_SYS_RESET_REG, CPU_SYS_RESET);
    // Deassert the cluster hard reset (active-low).
    r_cpucfg.write_32(C0_PWRON_RESET_REG, C0_PWRON_RESET_REG_NH_RST);
    // Deassert DBGPWRDUP for all cores.
    cpucfg.write_32(DBG_REG0, 0);
    // Assert all cluster and core resets (active-low).
    cpucfg.write_32(C0_RST_CTRL_REG, 0);
    // Enable hardware L2 cache flush (active-low).
    cpucfg.clr_32(C0_CTRL_REG0, C0_CTRL_REG0_L2RSTDISABLE);
    // Program all cores to start in AArch64 mode.
    cpucfg.set_32(C0_CTRL_REG0, C0_CTRL_REG0_AA64_MASK);
    // Put the cluster back into coherency (deassert ACINACTM).
    cpucfg.clr_32(C0_CTRL_REG1, C0_CTRL_REG1_ACINACTM);
    // Deassert all cluster resets (active-low).
    cpucfg.write_32(C0_RST_CTRL_REG, C0_RST_CTRL_REG_MASK);
    // Restore the reset vector base addresses for all cores.
    for core in 0..super::H6::CORES_PER_CLUSTER {
        cpucfg.write_32(rvba_lo_reg(core), RVBA.load(Relaxed));
    }
}

/// Powers a core down once it has entered WFI.
pub fn suspend_core(_cluster: usize, core: usize, new_state: PowerState) {
    let cpucfg = mmio(DEV_CPUCFG);
    let r_cpucfg = mmio(DEV_R_CPUCFG);

    if new_state < PowerState::Off {
        return;
    }

    // Wait for the core to be in WFI and ready to shut down.
    cpucfg.poll_32(C0_CPU_STATUS_REG, standby_wfi(core));
    // Deassert DBGPWRDUP (prevent debug access to the core).
    cpucfg.clr_32(DBG_REG0, 1 << core);
    // Activate the core output clamps.
    r_cpucfg.set_32(C0_PWROFF_GATING_REG, 1 << core);
    // Assert core reset (active-low).
    cpucfg.clr_32(C0_RST_CTRL_REG, 1 << core);
    // Assert core power-on reset (active-low).
    r_cpucfg.clr_32(C0_PWRON_RESET_REG, 1 << core);
    // Remove power from the core power domain.
    set_power_switch(r_cpucfg, pwr_switch_reg(core), false);
}

/// Begins or resumes execution on a core.
pub fn resume_core(_cluster: usize, core: usize, old_state: PowerState) {
    let cpucfg = mmio(DEV_CPUCFG);
    let r_cpucfg = mmio(DEV_R_CPUCFG);

    if old_state < PowerState::Off {
        return;
    }

    // Assert core reset (active-low).
    cpucfg.clr_32(C0_RST_CTRL_REG, 1 << core);
    // Assert core power-on reset (active-low).
    r_cpucfg.clr_32(C0_PWRON_RESET_REG, 1 << core);
    // Turn on power to the core power domain.
    set_power_switch(r_cpucfg, pwr_switch_reg(core), true);
    // Release the core output clamps.
    r_cpucfg.clr_32(C0_PWROFF_GATING_REG, 1 << core);
    // Deassert core power-on reset (active-low).
    r_cpucfg.set_32(C0_PWRON_RESET_REG, 1 << core);
    // Deassert core reset (active-low).
    cpucfg.set_32(C0_RST_CTRL_REG, 1 << core);
    // Assert DBGPWRDUP (allow debug access to the core).
    cpucfg.set_32(DBG_REG0, 1 << core);
}
