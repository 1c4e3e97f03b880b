// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The system power state machine.
//!
//! The state variable persists across firmware restarts (it lives in
//! initialised data, which only a SoC reset reinitialises) but not
//! across a SoC reset, which is why BOOT is the reset default. The state
//! values are arranged in parallel transition pairs so that adding two
//! advances a sequence:
//!
//! 1. AWAKE  => REBOOT     [=> RESET] => BOOT => AWAKE
//! 2. OFF    => PRE_RESET  => RESET   => BOOT => AWAKE
//! 3. ASLEEP => PRE_RESUME => RESUME          => AWAKE
//!
//! Every iteration of the main loop dispatches on the state: stable
//! states poll for events, transition states perform their hardware work
//! and advance. Long operations never block the loop for more than a
//! bounded busy-wait.

use crate::counter::udelay;
use crate::css::{CSS, Css};
use crate::device;
use crate::drivers::pmic;
use crate::drivers::regulator::{disable_supply, enable_supply};
use crate::drivers::watchdog::Watchdog;
use crate::drivers::wakeup::WakeSource;
use crate::error::Result;
use crate::platform::{Platform, PlatformImpl};
use crate::scpi::protocol::CMD_SCP_READY;
use crate::scpi::{CLIENT_SECURE, Scpi, cmds::HandlerContext};
use crate::steps;
use crate::version::{VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH};
use core::sync::atomic::{AtomicU8, AtomicU32, Ordering::Relaxed};
use log::{debug, error, info};
use num_enum::TryFromPrimitive;

/// The state of the system as a whole.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, TryFromPrimitive)]
#[repr(u8)]
pub enum SystemState {
    /// The system is awake; the rich OS is running.
    Awake = 0x0,
    /// First firmware boot after a SoC reset.
    Boot = 0x1,
    /// Attempting a board-level (PMIC) reboot.
    Reboot = 0x2,
    /// Transition from awake to off.
    Shutdown = 0x3,
    /// Transition from awake to asleep.
    Suspend = 0x4,
    /// The system is off; RAM contents are lost.
    Off = 0x5,
    /// The system is asleep; RAM contents are kept.
    Asleep = 0x6,
    /// Common part of the reset transition.
    PreReset = 0x7,
    /// Common part of the resume transition.
    PreResume = 0x8,
    /// Transition from off to boot via SoC reset.
    Reset = 0x9,
    /// Transition from asleep to awake.
    Resume = 0xa,
}

/// How aggressively power rails are collapsed during suspend.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum SuspendDepth {
    /// Perform no extra suspend actions.
    None,
    /// Power down the high-speed oscillator and PLLs.
    Osc24m,
    /// Gate the AVCC power domain.
    Avcc,
    /// Gate the VDD-SYS power domain.
    VddSys,
}

/// The system state variable and its transitions.
///
/// External transitions assert the current state; the hardware work
/// happens on the next iteration of the main loop.
pub struct SystemStateMachine {
    state: AtomicU8,
}

/// The global state machine driven by [`state_machine`].
pub static SYSTEM: SystemStateMachine = SystemStateMachine::new();

impl SystemStateMachine {
    /// Creates a state machine in the BOOT state.
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(SystemState::Boot as u8),
        }
    }

    /// The current system state.
    pub fn state(&self) -> SystemState {
        SystemState::try_from(self.state.load(Relaxed)).unwrap()
    }

    pub(crate) fn force(&self, state: SystemState) {
        self.state.store(state as u8, Relaxed);
    }

    /// Advances to the paired successor state.
    fn advance(&self) {
        let next = self.state.load(Relaxed) + 2;

        debug_assert!(SystemState::try_from(next).is_ok());
        self.state.store(next, Relaxed);
    }

    /// Reboots the board, including the SoC and external peripherals.
    ///
    /// Must only be called while the system is awake.
    pub fn reboot(&self) {
        // This transition skips PRE_RESET, so the system must be awake.
        assert_eq!(self.state(), SystemState::Awake);

        self.force(SystemState::Reboot);
    }

    /// Resets the SoC, including all CPUs and internal peripherals.
    ///
    /// Must only be called while the system is awake.
    pub fn reset(&self) {
        // This transition skips PRE_RESET, so the system must be awake.
        assert_eq!(self.state(), SystemState::Awake);

        self.force(SystemState::Reset);
    }

    /// Shuts down the SoC and turns off all possible power domains.
    ///
    /// Must only be called while the system is awake.
    pub fn shutdown(&self) {
        assert_eq!(self.state(), SystemState::Awake);

        self.force(SystemState::Shutdown);
    }

    /// Suspends the SoC and turns off all non-wakeup power domains.
    ///
    /// Must only be called while the system is awake.
    pub fn suspend(&self) {
        assert_eq!(self.state(), SystemState::Awake);

        self.force(SystemState::Suspend);
    }

    /// Wakes the system from any stable state, resetting the SoC or the
    /// whole board if necessary.
    pub fn wake(&self) {
        self.advance();
    }
}

/// The runtime-only device references held across loop iterations.
#[derive(Default)]
struct RuntimeDevices {
    mailbox: Option<Scpi>,
    watchdog: Option<&'static dyn Watchdog>,
    cec: Option<&'static dyn WakeSource>,
    cir: Option<&'static dyn WakeSource>,
}

/// Chooses how deeply the always-on domain can be powered down.
///
/// The DRAM controller keeping its clocks, or any peripheral holding the
/// high-speed oscillator, forbids extra actions entirely. Wake sources
/// needing AVCC cap the depth at OSC24M, and ones needing VDD-SYS cap it
/// at AVCC; only a shutdown with no such wake sources collapses VDD-SYS.
fn select_suspend_depth(current: SystemState) -> SuspendDepth {
    // Bail if the DRAM controller or peripherals need running clocks.
    if !PlatformImpl::HAVE_DRAM_SUSPEND || PlatformImpl::osc24m().is_active() {
        return SuspendDepth::None;
    }
    // Wakeup sources needing AVCC are only supported while asleep.
    if current != SystemState::Shutdown && PlatformImpl::wake_irq().needs_avcc() != 0 {
        return SuspendDepth::Osc24m;
    }
    if current != SystemState::Shutdown || PlatformImpl::wake_irq().needs_vdd_sys() != 0 {
        return SuspendDepth::Avcc;
    }

    SuspendDepth::VddSys
}

/// Logs battery power draw while off or asleep, at a slow interval.
fn battery_poll() {
    static TIMEOUT: AtomicU32 = AtomicU32::new(0);
    const INTERVAL_US: u32 = 30_000_000;

    fn sample() -> Result<(u32, u32)> {
        let mfd = PlatformImpl::fuel_gauge().ok_or(crate::error::Error::NoDevice)?;
        device::get(mfd)?;

        let result = (|| {
            let map = mfd.map();

            // Battery present and not charging?
            if map.read(0x01)? & 1 << 5 == 0 || map.read(0x00)? & 1 << 2 != 0 {
                return Err(crate::error::Error::NoDevice);
            }

            let hi = map.read(0x78)?;
            let lo = map.read(0x79)?;
            let voltage = (u32::from(hi) << 4 | u32::from(lo) & 0xf) * 1100 / 1000;

            let hi = map.read(0x7c)?;
            let lo = map.read(0x7d)?;
            let current = u32::from(hi) << 4 | u32::from(lo) & 0xf;

            Ok((current, voltage))
        })();

        device::put(mfd);
        result
    }

    if !crate::counter::timeout_expired(TIMEOUT.load(Relaxed)) {
        return;
    }

    if let Ok((current, voltage)) = sample() {
        info!(
            "Using {} mW ({} mA @ {} mV)",
            current * voltage / 1000,
            current,
            voltage
        );
    }

    TIMEOUT.store(crate::counter::timeout_set(INTERVAL_US), Relaxed);
}

fn awake_step(system: &SystemStateMachine, css: &Css, devices: &mut RuntimeDevices) {
    // Poll runtime devices.
    css.poll(system);
    if let Some(watchdog) = devices.watchdog {
        watchdog.restart();
    }

    // Poll runtime services.
    if let Some(mailbox) = &mut devices.mailbox {
        mailbox.poll(&HandlerContext { css, system });
    }
}

fn suspend_step(system: &SystemStateMachine, devices: &mut RuntimeDevices) {
    debug!("Suspending...");

    // Synchronize device state with the rich OS.
    steps::record(steps::SUSPEND_DEVICES);
    PlatformImpl::sync_pin_controllers();

    // Release runtime-only devices.
    devices.mailbox = None;

    // Acquire wakeup sources.
    devices.cec = PlatformImpl::cec().and_then(|cec| device::get_or_none(cec));
    devices.cir = PlatformImpl::cir().and_then(|cir| device::get_or_none(cir));

    // Configure the SoC for minimal power consumption.
    steps::record(steps::SUSPEND_DRAM);
    PlatformImpl::dram_save_checksum();
    PlatformImpl::dram_suspend();
    steps::record(steps::SUSPEND_CCU);
    PlatformImpl::ccu_suspend();

    // Disable watchdog protection. Once devices outside the SoC
    // (oscillators and regulators) are disabled, the watchdog cannot
    // successfully reset the SoC.
    if let Some(watchdog) = devices.watchdog.take() {
        device::put(watchdog);
    }

    // Gate the rest of the SoC before removing power.
    steps::record(steps::SUSPEND_PRCM);
    let depth = select_suspend_depth(system.state());
    PlatformImpl::r_ccu_suspend(depth);

    // Perform PMIC-specific actions.
    steps::record(steps::SUSPEND_PMIC);
    let pmic = pmic::get();
    if let Some(pmic) = pmic {
        if system.state() == SystemState::Shutdown && PlatformImpl::PMIC_SHUTDOWN {
            let _ = pmic.shutdown();
        } else {
            let _ = pmic.suspend();
        }
    }

    // Turn off all unnecessary power domains.
    steps::record(steps::SUSPEND_REGULATORS);
    let supplies = PlatformImpl::supplies();
    disable_supply(supplies.cpu);
    if system.state() == SystemState::Shutdown {
        disable_supply(supplies.dram);
        if depth >= SuspendDepth::Osc24m {
            disable_supply(supplies.vcc_pll);
        }
        if depth >= SuspendDepth::VddSys {
            disable_supply(supplies.vdd_sys);
        }
    }

    // The regulator provider is often part of the same device as the
    // PMIC. Reduce churn by doing both PMIC and regulator actions before
    // releasing the PMIC.
    if let Some(pmic) = pmic {
        device::put(pmic);
    }

    steps::record(steps::SUSPEND_COMPLETE);
    debug!("Suspend to {:?} complete!", depth);

    // The system is now off or asleep.
    system.advance();
}

fn off_step(system: &SystemStateMachine, devices: &mut RuntimeDevices) {
    battery_poll();

    // Poll wakeup sources. Reset or resume on wakeup.
    let wake = devices.cec.is_some_and(|cec| cec.pending() != 0)
        || devices.cir.is_some_and(|cir| cir.pending() != 0)
        || PlatformImpl::wake_irq().poll() != 0;

    if wake {
        system.advance();
    }
}

fn pre_resume_step(system: &SystemStateMachine, devices: &mut RuntimeDevices) {
    // Perform PMIC-specific resume actions. The PMIC is expected to
    // restore regulator state. If it fails, manually turn the
    // regulators back on.
    steps::record(steps::RESUME_PMIC);
    let pmic = pmic::get();
    let restored = pmic.is_some_and(|pmic| pmic.resume().is_ok());
    if !restored {
        steps::record(steps::RESUME_REGULATORS);
        let supplies = PlatformImpl::supplies();
        enable_supply(supplies.vdd_sys);
        enable_supply(supplies.vcc_pll);
        enable_supply(supplies.dram);
        enable_supply(supplies.cpu);
    }
    if let Some(pmic) = pmic {
        device::put(pmic);
    }

    // Give regulator outputs time to rise.
    udelay(5000);

    // Restore SoC-internal power domains.
    steps::record(steps::RESUME_PRCM);
    PlatformImpl::r_ccu_resume();

    // Enable watchdog protection.
    devices.watchdog = device::get_or_none(PlatformImpl::watchdog());

    // The system is now ready to reset or resume.
    system.advance();
}

fn resume_step(system: &SystemStateMachine, css: &Css, devices: &mut RuntimeDevices) {
    debug!("Resuming...");

    // Configure the SoC for full functionality.
    steps::record(steps::RESUME_CCU);
    PlatformImpl::ccu_resume();
    steps::record(steps::RESUME_DRAM);
    PlatformImpl::dram_resume();
    PlatformImpl::dram_verify_checksum();

    // Release wakeup sources.
    steps::record(steps::RESUME_DEVICES);
    if let Some(cir) = devices.cir.take() {
        device::put(cir);
    }
    if let Some(cec) = devices.cec.take() {
        device::put(cec);
    }

    // Acquire runtime-only devices.
    devices.mailbox = Scpi::new(PlatformImpl::mailbox(), PlatformImpl::scpi_shmem()).ok();

    // Resume execution on the CSS.
    css.resume(system);

    steps::record(steps::RESUME_COMPLETE);
    debug!("Resume complete!");

    // The system is now awake.
    system.force(SystemState::Awake);
}

fn reboot_step() {
    // Attempt to reset the board using the PMIC.
    if let Some(pmic) = pmic::get() {
        let _ = pmic.reset();
        device::put(pmic);
    }
}

fn reset_step(devices: &mut RuntimeDevices) {
    // Attempt to reset the SoC using the watchdog.
    if let Some(watchdog) = devices.watchdog {
        watchdog.set_timeout(1);
    }
}

/// Performs the one-shot startup work and normalises the initial state.
///
/// If the firmware started in any state other than BOOT or AWAKE, assume
/// the system is off. It could be transitioning or asleep, but resetting
/// the board after a wake event is safer than attempting to resume in an
/// unpredictable environment.
fn startup(system: &SystemStateMachine, exception: u32) -> RuntimeDevices {
    let initial_state = system.state();
    let mut devices = RuntimeDevices::default();

    if initial_state > SystemState::Boot {
        system.force(SystemState::Off);
    } else {
        // Otherwise, perform BOOT actions and switch to AWAKE.
        system.force(SystemState::Awake);

        // First, enable watchdog protection.
        devices.watchdog = device::get_or_none(PlatformImpl::watchdog());

        // Perform one-time device driver initialization.
        PlatformImpl::r_ccu_init();
        PlatformImpl::ccu_init();
        PlatformImpl::css_init();
        PlatformImpl::dram_init();

        // Acquire runtime-only devices.
        devices.mailbox = Scpi::new(PlatformImpl::mailbox(), PlatformImpl::scpi_shmem()).ok();
    }

    // Initialize the serial port. Errors occurring before this point are
    // not logged anywhere.
    PlatformImpl::init_serial();

    info!(
        "sunxi-scp {}.{}.{}",
        VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH
    );
    if exception != 0 {
        error!("Unhandled exception {:#010x}!", exception);
    }
    steps::report_last();

    // If the firmware started in the initial state, the secure monitor
    // is waiting for an SCP_READY message. Otherwise, assume nothing is
    // listening, and skip the message to avoid filling up the mailbox.
    if initial_state == SystemState::Boot {
        if let Some(mailbox) = &mut devices.mailbox {
            mailbox.create_message(CLIENT_SECURE, CMD_SCP_READY);
        }
    }

    devices
}

/// Runs one iteration of the state machine.
fn step(system: &SystemStateMachine, css: &Css, devices: &mut RuntimeDevices) {
    match system.state() {
        SystemState::Awake => awake_step(system, css, devices),
        SystemState::Shutdown | SystemState::Suspend => suspend_step(system, devices),
        SystemState::Off | SystemState::Asleep => off_step(system, devices),
        SystemState::PreReset | SystemState::PreResume => pre_resume_step(system, devices),
        SystemState::Resume => resume_step(system, css, devices),
        SystemState::Reboot => {
            reboot_step();
            // Continue through to resetting the SoC.
            reset_step(devices);
        }
        SystemState::Reset => reset_step(devices),
        // The startup path replaces BOOT before the loop starts.
        SystemState::Boot => unreachable!(),
    }
}

/// Performs system state management.
///
/// This is the main loop of the firmware; it never returns. `exception`
/// is the decoded cause word recorded by the startup code when the
/// firmware restarted after a trap, or zero on a clean boot.
pub fn state_machine(exception: u32) -> ! {
    let mut devices = startup(&SYSTEM, exception);

    loop {
        step(&SYSTEM, &CSS, &mut devices);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Driver;
    use crate::platform::host::{self, PlatformCall};
    use crate::scpi::protocol::SCPI_VIRTUAL_CHANNEL;

    fn awake() -> SystemStateMachine {
        let system = SystemStateMachine::new();
        system.force(SystemState::Awake);
        system
    }

    #[test]
    fn transitions_advance_in_pairs() {
        let system = awake();

        system.suspend();
        assert_eq!(system.state(), SystemState::Suspend);
        system.wake();
        assert_eq!(system.state(), SystemState::Asleep);
        system.wake();
        assert_eq!(system.state(), SystemState::PreResume);
        system.wake();
        assert_eq!(system.state(), SystemState::Resume);

        let system = awake();
        system.shutdown();
        assert_eq!(system.state(), SystemState::Shutdown);
        system.wake();
        assert_eq!(system.state(), SystemState::Off);
        system.wake();
        assert_eq!(system.state(), SystemState::PreReset);
        system.wake();
        assert_eq!(system.state(), SystemState::Reset);

        let system = awake();
        system.wake();
        assert_eq!(system.state(), SystemState::Reboot);
    }

    #[test]
    #[should_panic]
    fn suspend_requires_awake() {
        let system = SystemStateMachine::new();
        system.force(SystemState::Off);
        system.suspend();
    }

    #[test]
    #[should_panic]
    fn reboot_requires_awake() {
        let system = SystemStateMachine::new();
        system.force(SystemState::Asleep);
        system.reboot();
    }

    #[test]
    fn startup_normalises_a_mid_transition_restart() {
        let _guard = host::test_lock();
        host::reset_all_fakes();

        let system = SystemStateMachine::new();
        system.force(SystemState::Suspend);

        let devices = startup(&system, 0);
        assert_eq!(system.state(), SystemState::Off);
        assert!(devices.mailbox.is_none());
        assert!(devices.watchdog.is_none());
    }

    #[test]
    fn suspend_depth_follows_the_rail_rules() {
        let _guard = host::test_lock();
        host::reset_all_fakes();

        // A plain suspend with no wake IRQs stops at AVCC.
        assert_eq!(
            select_suspend_depth(SystemState::Suspend),
            SuspendDepth::Avcc
        );
        // A shutdown with no wake IRQs reaches VDD-SYS.
        assert_eq!(
            select_suspend_depth(SystemState::Shutdown),
            SuspendDepth::VddSys
        );

        // An AVCC-dependent wake IRQ caps a suspend at OSC24M.
        host::set_wake_irq_mux(host::MUX_NEEDS_AVCC);
        assert_eq!(
            select_suspend_depth(SystemState::Suspend),
            SuspendDepth::Osc24m
        );
        // But not a shutdown, which ignores AVCC wake sources.
        assert_eq!(
            select_suspend_depth(SystemState::Shutdown),
            SuspendDepth::VddSys
        );

        // A VDD-SYS-dependent wake IRQ caps a shutdown at AVCC.
        host::set_wake_irq_mux(host::MUX_NEEDS_VDD_SYS);
        assert_eq!(
            select_suspend_depth(SystemState::Shutdown),
            SuspendDepth::Avcc
        );

        // A held high-speed oscillator forbids extra actions entirely.
        host::set_wake_irq_mux(0);
        PlatformImpl::osc24m().get().unwrap();
        assert_eq!(
            select_suspend_depth(SystemState::Suspend),
            SuspendDepth::None
        );
        PlatformImpl::osc24m().put();
    }

    /// Drives the full scenario: fresh boot, suspend via the CSS
    /// coordinator, sleep, wake by IRQ, resume.
    #[test]
    fn full_power_cycle() {
        let _guard = host::test_lock();
        host::reset_all_fakes();

        let system = SystemStateMachine::new();
        let css = Css::new();

        // Fresh boot: one iteration initialises everything, announces
        // SCP_READY on the secure channel, and lands in AWAKE.
        let mut devices = startup(&system, 0);
        assert_eq!(system.state(), SystemState::Awake);
        assert!(devices.watchdog.is_some());
        assert!(devices.mailbox.is_some());

        let sent = host::msgbox_regs().read_32(0x0184);
        assert_eq!(sent, SCPI_VIRTUAL_CHANNEL, "SCP_READY signalled on TX 1");
        // SAFETY: The fake shared memory is always mapped in tests.
        let secure_tx = unsafe { &(*host::scpi_shmem_raw().wrapping_add(1)).tx };
        assert_eq!(secure_tx.command, crate::scpi::protocol::CMD_SCP_READY);
        assert_eq!(secure_tx.size, 0);

        // A few awake iterations restart the watchdog.
        step(&system, &css, &mut devices);
        step(&system, &css, &mut devices);
        assert!(host::watchdog_restarts() >= 2);

        // Power off every core through the coordinator; the last one
        // triggers a system suspend.
        for cluster in 0..crate::css::MAX_CLUSTERS {
            for core in 0..crate::css::MAX_CORES_PER_CLUSTER {
                if !(cluster == 0 && core == 0) {
                    css.set_power_state(
                        &system,
                        cluster,
                        core,
                        crate::css::PowerState::On,
                        crate::css::PowerState::On,
                        crate::css::PowerState::On,
                    )
                    .unwrap();
                }
            }
        }
        for cluster in 0..crate::css::MAX_CLUSTERS {
            for core in 0..crate::css::MAX_CORES_PER_CLUSTER {
                css.set_power_state(
                    &system,
                    cluster,
                    core,
                    crate::css::PowerState::Off,
                    crate::css::PowerState::Off,
                    crate::css::PowerState::Off,
                )
                .unwrap();
            }
        }
        assert_eq!(system.state(), SystemState::Suspend);

        // The suspend iteration walks the documented sequence and ends
        // up asleep with the mailbox and watchdog released.
        host::take_platform_calls();
        step(&system, &css, &mut devices);
        assert_eq!(system.state(), SystemState::Asleep);
        assert!(devices.mailbox.is_none());
        assert!(devices.watchdog.is_none());
        let calls = host::take_platform_calls();
        assert_eq!(
            calls,
            [
                PlatformCall::SyncPins,
                PlatformCall::DramSaveChecksum,
                PlatformCall::DramSuspend,
                PlatformCall::CcuSuspend,
                PlatformCall::RCcuSuspend(SuspendDepth::Avcc),
            ]
        );
        // The PMIC was told to suspend (wakeup control bit set).
        assert_ne!(host::bus_reg(0x31) & 1 << 6, 0);

        // Nothing pending: the system stays asleep.
        step(&system, &css, &mut devices);
        assert_eq!(system.state(), SystemState::Asleep);

        // A pending wake IRQ starts the resume sequence.
        host::set_wake_irq_pending(1 << 3);
        step(&system, &css, &mut devices);
        assert_eq!(system.state(), SystemState::PreResume);
        host::set_wake_irq_pending(0);

        step(&system, &css, &mut devices);
        assert_eq!(system.state(), SystemState::Resume);
        assert!(devices.watchdog.is_some());

        step(&system, &css, &mut devices);
        assert_eq!(system.state(), SystemState::Awake);
        assert!(devices.mailbox.is_some());

        // The CSS vector is back to the lead core running, and the
        // retained-memory checksum verified along the way.
        assert_eq!(css.css_state(), crate::css::PowerState::On);
        let calls = host::take_platform_calls();
        assert!(calls.contains(&PlatformCall::RCcuResume));
        assert!(calls.contains(&PlatformCall::DramResume));
        assert!(calls.contains(&PlatformCall::DramVerifyChecksum));
        assert_eq!(
            PlatformImpl::last_step(),
            steps::RESUME_COMPLETE,
            "the last hazardous step was recorded"
        );
    }

    #[test]
    fn reset_request_programs_the_minimum_watchdog_timeout() {
        let _guard = host::test_lock();
        host::reset_all_fakes();

        let system = SystemStateMachine::new();
        let css = Css::new();
        let mut devices = startup(&system, 0);
        assert_eq!(system.state(), SystemState::Awake);

        system.reset();
        step(&system, &css, &mut devices);
        assert_eq!(host::watchdog_timeout(), 1);
        // The state stays RESET, retrying until the SoC goes down.
        assert_eq!(system.state(), SystemState::Reset);
    }

    #[test]
    fn shutdown_disables_the_supply_rails() {
        let _guard = host::test_lock();
        host::reset_all_fakes();

        let system = SystemStateMachine::new();
        let css = Css::new();
        let mut devices = startup(&system, 0);

        // All rails start enabled.
        host::set_bus_reg(0x10, 0xff);
        host::set_bus_reg(0x11, 0xff);

        system.shutdown();
        step(&system, &css, &mut devices);
        assert_eq!(system.state(), SystemState::Off);

        // A full shutdown with no wake sources collapses every rail.
        let supplies = PlatformImpl::supplies();
        assert!(!supplies.cpu.unwrap().get_state().unwrap());
        assert!(!supplies.dram.unwrap().get_state().unwrap());
        assert!(!supplies.vcc_pll.unwrap().get_state().unwrap());
        assert!(!supplies.vdd_sys.unwrap().get_state().unwrap());
    }

    #[test]
    fn battery_poll_reports_at_most_once_per_interval() {
        let _guard = host::test_lock();
        host::reset_all_fakes();

        // Battery present, discharging flag clear, some ADC counts.
        host::set_bus_reg(0x01, 1 << 5);
        host::set_bus_reg(0x78, 0x12);
        host::set_bus_reg(0x79, 0x03);
        host::set_bus_reg(0x7c, 0x04);
        host::set_bus_reg(0x7d, 0x05);

        battery_poll();
        battery_poll();

        // The fuel gauge was released both times.
        assert_eq!(PlatformImpl::fuel_gauge().unwrap().device().refcount(), 0);
    }
}
