// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! A host platform with fake hardware, for development builds and unit
//! tests.
//!
//! Register-backed drivers (mailbox, wake-IRQ controller, clock
//! controllers, shared memory) run against in-memory register blocks;
//! sequencing hooks that would spin on real hardware (CSS, DRAM, the
//! always-on domain) are recorded instead so tests can assert on the
//! call order. The PMIC and regulator stack runs for real over an
//! array-backed register-map bus.
//!
//! The topology is deliberately richer than the real SoC's (two
//! clusters) so coordination across clusters is exercised.

use crate::css::PowerState;
use crate::device::{Device, Driver};
use crate::drivers::ccu::{self, Ccu, CcuClockDesc};
use crate::drivers::clock::ClockHandle;
use crate::drivers::dram::Dram;
use crate::drivers::irq::SunxiRIntc;
use crate::drivers::msgbox::SunxiMsgbox;
use crate::drivers::pmic::{Axp20x, Axp805Pmic, Pmic};
use crate::drivers::regmap::{Regmap, RegmapBus};
use crate::drivers::regulator::{Axp20xRegulator, RegulatorHandle, SystemSupplies, axp805};
use crate::drivers::watchdog::Watchdog;
use crate::drivers::wakeup::WakeSource;
use crate::error::{Error, Result};
use crate::logger::LogSink;
use crate::mmio::Mmio;
use crate::platform::Platform;
use crate::scpi::ScpiShmem;
use crate::scpi::protocol::ScpiMem;
use crate::system::SuspendDepth;
use core::cell::UnsafeCell;
use core::fmt::Arguments;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering::Relaxed};
use spin::mutex::{SpinMutex, SpinMutexGuard};
use spin::Lazy;

/// A fake register block backing an [`Mmio`] window.
#[repr(C, align(4))]
struct FakeRegs<const WORDS: usize> {
    words: UnsafeCell<[u32; WORDS]>,
}

// SAFETY: Tests serialise access to the shared fake hardware with
// `test_lock`, and the firmware itself is single-threaded.
unsafe impl<const WORDS: usize> Sync for FakeRegs<WORDS> {}

impl<const WORDS: usize> FakeRegs<WORDS> {
    const fn new() -> Self {
        Self {
            words: UnsafeCell::new([0; WORDS]),
        }
    }

    fn mmio(&self) -> Mmio {
        // SAFETY: The backing array lives in a static and covers
        // `WORDS` words.
        unsafe { Mmio::new(self.words.get() as usize) }
    }

    fn clear(&self) {
        for offset in 0..WORDS {
            self.mmio().write_32(4 * offset, 0);
        }
    }
}

static MSGBOX_REGS: FakeRegs<128> = FakeRegs::new();
static INTC_REGS: FakeRegs<64> = FakeRegs::new();
static CCU_REGS: FakeRegs<16> = FakeRegs::new();
static R_CCU_REGS: FakeRegs<16> = FakeRegs::new();
static DRAM_WINDOW: FakeRegs<128> = FakeRegs::new();
static SHMEM: FakeRegs<256> = FakeRegs::new();

static CYCLES: AtomicU32 = AtomicU32::new(0);
static LAST_STEP: AtomicU32 = AtomicU32::new(0);
static LAST_EXCEPTION: AtomicU32 = AtomicU32::new(0);
static CSS_IRQ_STATUS: AtomicU32 = AtomicU32::new(0);

static TEST_LOCK: SpinMutex<()> = SpinMutex::new(());

/// Serialises tests that touch the shared fake hardware.
pub fn test_lock() -> SpinMutexGuard<'static, ()> {
    TEST_LOCK.lock()
}

/// Sets the fake cycle counter.
pub fn set_cycles(value: u32) {
    CYCLES.store(value, Relaxed);
}

/// Advances the fake cycle counter.
pub fn advance_cycles(count: u32) {
    CYCLES.fetch_add(count, Relaxed);
}

/// Sets the bitmap returned by [`Platform::css_irq_status`].
pub fn set_css_irq_status(status: u32) {
    CSS_IRQ_STATUS.store(status, Relaxed);
}

/// One recorded CSS sequencing call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CssCall {
    /// `css_suspend_core(cluster, core, new_state)`.
    SuspendCore(usize, usize, PowerState),
    /// `css_suspend_cluster(cluster, new_state)`.
    SuspendCluster(usize, PowerState),
    /// `css_suspend_css(new_state)`.
    SuspendCss(PowerState),
    /// `css_resume_css(old_state)`.
    ResumeCss(PowerState),
    /// `css_resume_cluster(cluster, old_state)`.
    ResumeCluster(usize, PowerState),
    /// `css_resume_core(cluster, core, old_state)`.
    ResumeCore(usize, usize, PowerState),
}

/// One recorded power-domain or pin-sync call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlatformCall {
    /// `ccu_init`.
    CcuInit,
    /// `ccu_suspend`.
    CcuSuspend,
    /// `ccu_resume`.
    CcuResume,
    /// `r_ccu_init`.
    RCcuInit,
    /// `r_ccu_suspend(depth)`.
    RCcuSuspend(SuspendDepth),
    /// `r_ccu_resume`.
    RCcuResume,
    /// `dram_init`.
    DramInit,
    /// `dram_suspend`.
    DramSuspend,
    /// `dram_resume`.
    DramResume,
    /// `dram_save_checksum`.
    DramSaveChecksum,
    /// `dram_verify_checksum`.
    DramVerifyChecksum,
    /// `sync_pin_controllers`.
    SyncPins,
}

#[cfg(test)]
mod recorder {
    use super::{CssCall, PlatformCall};
    use spin::mutex::SpinMutex;

    static CSS_CALLS: SpinMutex<Vec<CssCall>> = SpinMutex::new(Vec::new());
    static PLATFORM_CALLS: SpinMutex<Vec<PlatformCall>> = SpinMutex::new(Vec::new());

    pub(super) fn record_css(call: CssCall) {
        CSS_CALLS.lock().push(call);
    }

    pub(super) fn record_platform(call: PlatformCall) {
        PLATFORM_CALLS.lock().push(call);
    }

    pub(super) fn take_css() -> Vec<CssCall> {
        core::mem::take(&mut CSS_CALLS.lock())
    }

    pub(super) fn take_platform() -> Vec<PlatformCall> {
        core::mem::take(&mut PLATFORM_CALLS.lock())
    }
}

#[cfg(test)]
fn record_css(call: CssCall) {
    recorder::record_css(call);
}

#[cfg(not(test))]
fn record_css(_call: CssCall) {}

#[cfg(test)]
fn record_platform(call: PlatformCall) {
    recorder::record_platform(call);
}

#[cfg(not(test))]
fn record_platform(_call: PlatformCall) {}

/// Takes the CSS sequencing calls recorded since the last call.
#[cfg(test)]
pub fn take_css_calls() -> Vec<CssCall> {
    recorder::take_css()
}

/// Takes the power-domain calls recorded since the last call.
#[cfg(test)]
pub fn take_platform_calls() -> Vec<PlatformCall> {
    recorder::take_platform()
}

// Host clock controller: a root oscillator plus a gated mailbox clock.

/// The fixed host oscillator clock id.
pub const CLK_HOSC: u8 = 0;
/// The gated mailbox bus clock id.
pub const CLK_BUS_MSGBOX: u8 = 1;

fn hosc_rate(_ccu: &Ccu, _id: u8, _parent_rate: u32) -> u32 {
    24_000_000
}

fn hosc_parent(ccu: &'static Ccu, _id: u8) -> Option<ClockHandle> {
    Some(ClockHandle::new(ccu, CLK_HOSC))
}

const HOST_CLOCKS: [CcuClockDesc; 2] = [
    CcuClockDesc::new(ccu::parent_none, hosc_rate),
    CcuClockDesc::new(hosc_parent, ccu::rate_parent).with_gate(crate::mmio::bitmap_index(0x04, 0)),
];

const ATOMIC_U8_ZERO: core::sync::atomic::AtomicU8 = core::sync::atomic::AtomicU8::new(0);

static CCU_REFCOUNTS: [core::sync::atomic::AtomicU8; 2] = [ATOMIC_U8_ZERO; 2];
static R_CCU_REFCOUNTS: [core::sync::atomic::AtomicU8; 1] = [ATOMIC_U8_ZERO; 1];

const R_CLOCKS: [CcuClockDesc; 1] = [CcuClockDesc::new(ccu::parent_none, hosc_rate)];

static CCU: Lazy<Ccu> = Lazy::new(|| Ccu::new("ccu", CCU_REGS.mmio(), &HOST_CLOCKS, &CCU_REFCOUNTS));

static R_CCU: Lazy<Ccu> =
    Lazy::new(|| Ccu::new("r_ccu", R_CCU_REGS.mmio(), &R_CLOCKS, &R_CCU_REFCOUNTS));

static MSGBOX: Lazy<SunxiMsgbox> = Lazy::new(|| {
    SunxiMsgbox::new(
        MSGBOX_REGS.mmio(),
        ClockHandle::new(Lazy::force(&CCU), CLK_BUS_MSGBOX),
    )
});

static WAKE_IRQ: Lazy<SunxiRIntc> = Lazy::new(|| {
    SunxiRIntc::new(
        INTC_REGS.mmio(),
        2,
        [MUX_NEEDS_AVCC, 0, 0, 0],
        [MUX_NEEDS_VDD_SYS, 0, 0, 0],
    )
});

static DRAM: Lazy<Dram> = Lazy::new(|| {
    let hosc = ClockHandle::new(Lazy::force(&CCU), CLK_HOSC);
    Dram::new(
        DRAM_WINDOW.mmio(),
        DRAM_WINDOW.mmio(),
        DRAM_WINDOW.mmio(),
        hosc,
        hosc,
        hosc,
        DRAM_WINDOW.mmio(),
        0x40,
    )
});

/// The wake-IRQ mux bit whose interrupt needs AVCC.
pub const MUX_NEEDS_AVCC: u32 = 1 << 0;

/// The wake-IRQ mux bit whose interrupt needs VDD-SYS.
pub const MUX_NEEDS_VDD_SYS: u32 = 1 << 1;

/// Sets the wake-IRQ mux enable register.
pub fn set_wake_irq_mux(bits: u32) {
    INTC_REGS.mmio().write_32(0xc0, bits);
}

/// Sets the first wake-IRQ pending register.
pub fn set_wake_irq_pending(bits: u32) {
    INTC_REGS.mmio().write_32(0x10, bits);
}

/// The fake mailbox register window, for injecting traffic in tests.
pub fn msgbox_regs() -> Mmio {
    MSGBOX_REGS.mmio()
}

/// The real mailbox driver over the fake register block.
pub fn mailbox() -> &'static SunxiMsgbox {
    Lazy::force(&MSGBOX)
}

/// The SCPI shared-memory view over the fake buffer.
pub fn scpi_shmem() -> ScpiShmem {
    // SAFETY: The fake buffer is statically allocated, large enough for
    // both client areas, and only touched by cooperative test code.
    unsafe { ScpiShmem::new(scpi_shmem_raw()) }
}

/// The raw base of the fake shared-memory buffer.
pub fn scpi_shmem_raw() -> *mut ScpiMem {
    SHMEM.words.get() as *mut ScpiMem
}

/// Clears the fake mailbox registers and shared memory.
pub fn reset_scpi_fakes() {
    MSGBOX_REGS.clear();
    SHMEM.clear();
}

/// Clears every fake register block, knob, and recorded call.
pub fn reset_all_fakes() {
    reset_scpi_fakes();
    INTC_REGS.clear();
    DRAM_WINDOW.clear();
    LAST_STEP.store(0, Relaxed);
    LAST_EXCEPTION.store(0, Relaxed);
    CSS_IRQ_STATUS.store(0, Relaxed);
    WATCHDOG.restarts.store(0, Relaxed);
    WATCHDOG.timeout.store(0, Relaxed);
    BUS.reset();
    #[cfg(test)]
    {
        let _ = take_css_calls();
        let _ = take_platform_calls();
    }
}

/// A watchdog that records how it is driven.
pub struct HostWatchdog {
    dev: Device,
    restarts: AtomicU32,
    timeout: AtomicU32,
}

static WATCHDOG: HostWatchdog = HostWatchdog {
    dev: Device::new("host-watchdog"),
    restarts: AtomicU32::new(0),
    timeout: AtomicU32::new(0),
};

/// The number of watchdog restarts since the fakes were reset.
pub fn watchdog_restarts() -> u32 {
    WATCHDOG.restarts.load(Relaxed)
}

/// The last programmed watchdog timeout.
pub fn watchdog_timeout() -> u32 {
    WATCHDOG.timeout.load(Relaxed)
}

impl Driver for HostWatchdog {
    fn device(&self) -> &Device {
        &self.dev
    }
}

impl Watchdog for HostWatchdog {
    fn restart(&self) {
        self.restarts.fetch_add(1, Relaxed);
    }

    fn set_timeout(&self, ticks: u32) {
        self.timeout.store(ticks, Relaxed);
    }
}

/// An array-backed register-map bus.
pub struct HostBus {
    dev: Device,
    regs: SpinMutex<[u8; 256]>,
    failing: AtomicBool,
}

const fn bus_initial_regs() -> [u8; 256] {
    let mut regs = [0; 256];
    // The AXP805 identification register.
    regs[0x03] = 0x40;
    regs
}

static BUS: HostBus = HostBus {
    dev: Device::new("host-bus"),
    regs: SpinMutex::new(bus_initial_regs()),
    failing: AtomicBool::new(false),
};

impl HostBus {
    fn reset(&self) {
        *self.regs.lock() = bus_initial_regs();
        self.failing.store(false, Relaxed);
    }
}

impl Driver for HostBus {
    fn device(&self) -> &Device {
        &self.dev
    }
}

impl RegmapBus for HostBus {
    fn read(&self, _addr: u8, reg: u8) -> Result<u8> {
        if self.failing.load(Relaxed) {
            return Err(Error::Io);
        }
        Ok(self.regs.lock()[usize::from(reg)])
    }

    fn write(&self, _addr: u8, reg: u8, value: u8) -> Result<()> {
        if self.failing.load(Relaxed) {
            return Err(Error::Io);
        }
        self.regs.lock()[usize::from(reg)] = value;
        Ok(())
    }
}

/// Reads a register of the fake register-map bus.
pub fn bus_reg(reg: u8) -> u8 {
    BUS.regs.lock()[usize::from(reg)]
}

/// Writes a register of the fake register-map bus.
pub fn set_bus_reg(reg: u8, value: u8) {
    BUS.regs.lock()[usize::from(reg)] = value;
}

/// Makes every bus transfer fail with an I/O error.
pub fn set_bus_failing(failing: bool) {
    BUS.failing.store(failing, Relaxed);
}

static AXP: Axp20x = Axp20x::new("axp20x", Regmap::new(&BUS, 0x36), 0x40);

static PMIC: Axp805Pmic = Axp805Pmic::new(&AXP);

static REGULATOR: Axp20xRegulator =
    Axp20xRegulator::new("axp805-regulator", &AXP, &axp805::INFO);

/// A wake source driven by a test knob.
pub struct HostWakeSource {
    dev: Device,
    pending: AtomicU32,
}

static CEC: HostWakeSource = HostWakeSource {
    dev: Device::new("host-cec"),
    pending: AtomicU32::new(0),
};

/// Latches a pending wake condition on the fake CEC source.
pub fn set_cec_pending(value: u32) {
    CEC.pending.store(value, Relaxed);
}

impl Driver for HostWakeSource {
    fn device(&self) -> &Device {
        &self.dev
    }
}

impl WakeSource for HostWakeSource {
    fn pending(&self) -> u32 {
        self.pending.swap(0, Relaxed)
    }
}

/// A log sink that writes to standard output.
#[cfg(test)]
pub struct StdOutSink;

#[cfg(test)]
impl LogSink for StdOutSink {
    fn write_fmt(&self, args: Arguments) {
        use std::io::Write;

        let _ = std::io::stdout().write_fmt(args);
    }
}

/// A log sink that discards everything.
#[cfg(not(test))]
pub struct NullSink;

#[cfg(not(test))]
impl LogSink for NullSink {
    fn write_fmt(&self, _args: Arguments) {}
}

/// The host platform.
pub struct Host;

impl Platform for Host {
    const CLUSTER_COUNT: usize = 2;
    const CORES_PER_CLUSTER: usize = 4;
    const CYCLES_PER_MICROSECOND: u32 = 1;
    const REFCLK_HZ: u32 = 24_000_000;
    const HAVE_DRAM_SUSPEND: bool = true;
    const PMIC_SHUTDOWN: bool = true;

    #[cfg(test)]
    type LogSinkImpl = StdOutSink;
    #[cfg(not(test))]
    type LogSinkImpl = NullSink;

    fn cycle_counter_read() -> u32 {
        // Advance on every read so bounded busy-waits terminate.
        CYCLES.fetch_add(1, Relaxed)
    }

    fn init_serial() {
        #[cfg(test)]
        let _ = crate::logger::init(StdOutSink);
        #[cfg(not(test))]
        let _ = crate::logger::init(NullSink);
    }

    fn restart_firmware() -> ! {
        unimplemented!("the host platform cannot restart")
    }

    fn record_step(step: u32) {
        LAST_STEP.store(step, Relaxed);
    }

    fn last_step() -> u32 {
        LAST_STEP.load(Relaxed)
    }

    fn record_exception(value: u32) {
        LAST_EXCEPTION.store(value, Relaxed);
    }

    fn last_exception() -> u32 {
        LAST_EXCEPTION.load(Relaxed)
    }

    fn css_init() {}

    fn css_irq_status() -> u32 {
        CSS_IRQ_STATUS.load(Relaxed)
    }

    fn css_suspend_css(new_state: PowerState) {
        record_css(CssCall::SuspendCss(new_state));
    }

    fn css_resume_css(old_state: PowerState) {
        record_css(CssCall::ResumeCss(old_state));
    }

    fn css_suspend_cluster(cluster: usize, new_state: PowerState) {
        record_css(CssCall::SuspendCluster(cluster, new_state));
    }

    fn css_resume_cluster(cluster: usize, old_state: PowerState) {
        record_css(CssCall::ResumeCluster(cluster, old_state));
    }

    fn css_suspend_core(cluster: usize, core: usize, new_state: PowerState) {
        record_css(CssCall::SuspendCore(cluster, core, new_state));
    }

    fn css_resume_core(cluster: usize, core: usize, old_state: PowerState) {
        record_css(CssCall::ResumeCore(cluster, core, old_state));
    }

    fn ccu_init() {
        record_platform(PlatformCall::CcuInit);
    }

    fn ccu_suspend() {
        record_platform(PlatformCall::CcuSuspend);
    }

    fn ccu_resume() {
        record_platform(PlatformCall::CcuResume);
    }

    fn r_ccu_init() {
        record_platform(PlatformCall::RCcuInit);
    }

    fn r_ccu_suspend(depth: SuspendDepth) {
        record_platform(PlatformCall::RCcuSuspend(depth));
    }

    fn r_ccu_resume() {
        record_platform(PlatformCall::RCcuResume);
    }

    fn osc24m() -> ClockHandle {
        ClockHandle::new(Lazy::force(&R_CCU), 0)
    }

    fn dram_init() {
        record_platform(PlatformCall::DramInit);
    }

    fn dram_suspend() {
        record_platform(PlatformCall::DramSuspend);
    }

    fn dram_resume() {
        record_platform(PlatformCall::DramResume);
    }

    fn dram_save_checksum() {
        record_platform(PlatformCall::DramSaveChecksum);
        Lazy::force(&DRAM).save_checksum();
    }

    fn dram_verify_checksum() {
        record_platform(PlatformCall::DramVerifyChecksum);
        Lazy::force(&DRAM).verify_checksum();
    }

    fn wake_irq() -> &'static SunxiRIntc {
        Lazy::force(&WAKE_IRQ)
    }

    fn sync_pin_controllers() {
        record_platform(PlatformCall::SyncPins);
    }

    fn mailbox() -> &'static SunxiMsgbox {
        mailbox()
    }

    fn scpi_shmem() -> ScpiShmem {
        scpi_shmem()
    }

    fn watchdog() -> &'static dyn Watchdog {
        &WATCHDOG
    }

    fn pmic() -> Option<&'static dyn Pmic> {
        Some(&PMIC)
    }

    fn cec() -> Option<&'static dyn WakeSource> {
        Some(&CEC)
    }

    fn cir() -> Option<&'static dyn WakeSource> {
        None
    }

    fn fuel_gauge() -> Option<&'static Axp20x> {
        Some(&AXP)
    }

    fn supplies() -> SystemSupplies {
        SystemSupplies {
            cpu: Some(RegulatorHandle::new(&REGULATOR, axp805::DCDCA)),
            dram: Some(RegulatorHandle::new(&REGULATOR, axp805::DCDCE)),
            vcc_pll: Some(RegulatorHandle::new(&REGULATOR, axp805::BLDO1)),
            vdd_sys: Some(RegulatorHandle::new(&REGULATOR, axp805::DCDCD)),
        }
    }
}
