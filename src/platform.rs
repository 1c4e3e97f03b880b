// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Platform selection and the platform interface.
//!
//! A SoC platform is chosen at build time with `--cfg platform="..."`;
//! builds without a platform cfg (host builds and unit tests) get the
//! host platform, whose hardware is faked.

use crate::css::PowerState;
use crate::drivers::irq::SunxiRIntc;
use crate::drivers::msgbox::SunxiMsgbox;
use crate::drivers::pmic::{Axp20x, Pmic};
use crate::drivers::regulator::SystemSupplies;
use crate::drivers::watchdog::Watchdog;
use crate::drivers::wakeup::WakeSource;
use crate::drivers::clock::ClockHandle;
use crate::logger::LogSink;
use crate::scpi::ScpiShmem;
use crate::system::SuspendDepth;

macro_rules! select_platform {
    (platform = $condition:literal, $mod:ident::$plat_impl:ident) => {
        #[cfg(platform = $condition)]
        mod $mod;

        #[cfg(platform = $condition)]
        pub use $mod::$plat_impl as PlatformImpl;
    };
    (host, $mod:ident::$plat_impl:ident) => {
        #[cfg(not(platform = "h6"))]
        pub mod $mod;

        #[cfg(not(platform = "h6"))]
        pub use $mod::$plat_impl as PlatformImpl;
    };
}

select_platform!(platform = "h6", h6::H6);
select_platform!(host, host::Host);

/// Type alias for convenience, to avoid spelling out the associated type
/// everywhere.
pub type LogSinkImpl = <PlatformImpl as Platform>::LogSinkImpl;

/// The hooks implemented by all platforms.
///
/// Everything the generic core needs from the SoC binding goes through
/// this trait: topology constants, board configuration, the CSS and
/// power-domain sequencing primitives, and the statically-declared
/// device instances.
pub trait Platform {
    /// The number of clusters in the compute subsystem.
    const CLUSTER_COUNT: usize;

    /// The number of cores in each cluster.
    const CORES_PER_CLUSTER: usize;

    /// Cycle-counter ticks per microsecond.
    const CYCLES_PER_MICROSECOND: u32;

    /// The reference oscillator frequency in Hz.
    const REFCLK_HZ: u32;

    /// Whether DRAM contents can be retained across suspend.
    const HAVE_DRAM_SUSPEND: bool;

    /// Whether shutdown powers off the board through the PMIC.
    const PMIC_SHUTDOWN: bool;

    /// The console sink used by the logger.
    type LogSinkImpl: LogSink;

    /// Reads the free-running cycle counter.
    fn cycle_counter_read() -> u32;

    /// Initialises the console and logger. Idempotent.
    fn init_serial();

    /// Restarts the firmware without resetting the SoC.
    ///
    /// Used by the panic path; the restarted firmware diagnoses from the
    /// persistent scratch registers.
    fn restart_firmware() -> !;

    /// Writes the hazardous-step scratch register.
    fn record_step(step: u32);

    /// Reads the hazardous-step scratch register.
    fn last_step() -> u32;

    /// Writes the exception scratch register.
    fn record_exception(value: u32);

    /// Reads the exception scratch register.
    fn last_exception() -> u32;

    /// Performs one-time CSS setup at boot.
    fn css_init();

    /// Returns a bitmap of cores with pending interrupts, ordered
    /// cluster-major, or zero if the platform cannot tell.
    fn css_irq_status() -> u32;

    /// Suspends the CSS level. Idempotent for a given target state.
    fn css_suspend_css(new_state: PowerState);

    /// Resumes the CSS level from `old_state`.
    fn css_resume_css(old_state: PowerState);

    /// Suspends one cluster. Idempotent for a given target state.
    fn css_suspend_cluster(cluster: usize, new_state: PowerState);

    /// Resumes one cluster from `old_state`.
    fn css_resume_cluster(cluster: usize, old_state: PowerState);

    /// Suspends one core. Idempotent for a given target state.
    fn css_suspend_core(cluster: usize, core: usize, new_state: PowerState);

    /// Resumes one core from `old_state`.
    fn css_resume_core(cluster: usize, core: usize, old_state: PowerState);

    /// Performs one-time main clock tree setup at boot.
    fn ccu_init();

    /// Slows the main clock tree down for suspend.
    fn ccu_suspend();

    /// Restores the main clock tree to full speed.
    fn ccu_resume();

    /// Performs one-time always-on clock tree setup at boot.
    fn r_ccu_init();

    /// Collapses the always-on domain to the given depth.
    fn r_ccu_suspend(depth: SuspendDepth);

    /// Restores the always-on domain.
    ///
    /// The resume steps are incremental and idempotent, so they run
    /// unconditionally; this also handles a firmware restart where the
    /// suspend depth is unknown.
    fn r_ccu_resume();

    /// The high-speed oscillator, whose consumers block deep suspend.
    fn osc24m() -> ClockHandle;

    /// References the DRAM clocks left running by the boot loader.
    fn dram_init();

    /// Puts DRAM into self-refresh.
    fn dram_suspend();

    /// Takes DRAM out of self-refresh.
    fn dram_resume();

    /// Records the retained-memory checksum before suspend.
    fn dram_save_checksum();

    /// Panics if retained memory changed across suspend.
    fn dram_verify_checksum();

    /// The wake-IRQ controller.
    fn wake_irq() -> &'static SunxiRIntc;

    /// Aligns the pin controllers' refcounts with the AP's pinmux state.
    fn sync_pin_controllers();

    /// The mailbox device.
    fn mailbox() -> &'static SunxiMsgbox;

    /// The SCPI shared-memory area.
    fn scpi_shmem() -> ScpiShmem;

    /// The system watchdog.
    fn watchdog() -> &'static dyn Watchdog;

    /// The board's PMIC, if one is configured.
    fn pmic() -> Option<&'static dyn Pmic>;

    /// The HDMI-CEC wake source, if present.
    fn cec() -> Option<&'static dyn WakeSource>;

    /// The infrared wake source, if present.
    fn cir() -> Option<&'static dyn WakeSource>;

    /// The battery fuel gauge, if present.
    fn fuel_gauge() -> Option<&'static Axp20x>;

    /// The named system supply rails.
    fn supplies() -> SystemSupplies;
}
