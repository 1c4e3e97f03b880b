// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The Allwinner H6 platform: a quad-core Cortex-A53 cluster managed by
//! an always-on core in the RTC power domain.

mod ccu;
mod css;
mod devices;

use crate::css::PowerState;
use crate::drivers::clock::ClockHandle;
use crate::drivers::irq::SunxiRIntc;
use crate::drivers::msgbox::SunxiMsgbox;
use crate::drivers::pmic::{Axp20x, Pmic};
use crate::drivers::regulator::{RegulatorHandle, SystemSupplies, axp805};
use crate::drivers::watchdog::Watchdog;
use crate::drivers::wakeup::WakeSource;
use crate::logger::{self, LockedWriter};
use crate::mmio::Mmio;
use crate::platform::Platform;
use crate::scpi::ScpiShmem;
use crate::scpi::protocol::ScpiMem;
use crate::system::SuspendDepth;
use core::fmt;
use devices::mmio;

/// Whether the board wires the PMIC to the RSB bus rather than R_I2C.
const PMIC_USES_RSB: bool = true;

/// The SCPI shared-memory area at the top of SRAM A2.
const SCPI_MEM_BASE: usize = 0x0001_7c00;

// RTC general-purpose data registers, preserved across firmware
// restarts but cleared by a SoC reset.
const LAST_EXCEPTION_REG: usize = 0x0108;
const LAST_STEP_REG: usize = 0x010c;

// The free-running 24 MHz counter in the CPU subsystem.
const CNT_LOW_REG: usize = 0x0000;

// R_CPUCFG: the management core's own reset line.
const CPUS_RESET_REG: usize = 0x0000;

// R_UART, 16550-compatible.
const UART_THR: usize = 0x0000;
const UART_DLL: usize = 0x0000;
const UART_DLH: usize = 0x0004;
const UART_FCR: usize = 0x0008;
const UART_LCR: usize = 0x000c;
const UART_LSR: usize = 0x0014;
const UART_LSR_THRE: u32 = 1 << 5;
const UART_LCR_DLAB: u32 = 1 << 7;
const UART_LCR_8N1: u32 = 0x03;

/// A write-only view of the always-on UART.
pub struct Uart {
    regs: Mmio,
}

impl fmt::Write for Uart {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.putc(b'\r');
            }
            self.putc(byte);
        }
        Ok(())
    }
}

impl Uart {
    fn putc(&self, byte: u8) {
        self.regs.poll_32(UART_LSR, UART_LSR_THRE);
        self.regs.write_32(UART_THR, byte.into());
    }
}

fn rtc() -> Mmio {
    mmio(devices::DEV_RTC)
}

/// The H6 platform.
pub struct H6;

impl Platform for H6 {
    const CLUSTER_COUNT: usize = 1;
    const CORES_PER_CLUSTER: usize = 4;
    // The management core and its counter both run from OSC24M.
    const CYCLES_PER_MICROSECOND: u32 = 24;
    const REFCLK_HZ: u32 = 24_000_000;
    const HAVE_DRAM_SUSPEND: bool = true;
    const PMIC_SHUTDOWN: bool = true;

    type LogSinkImpl = LockedWriter<Uart>;

    fn cycle_counter_read() -> u32 {
        mmio(devices::DEV_CNT_R).read_32(CNT_LOW_REG)
    }

    fn init_serial() {
        let uart = Uart {
            regs: mmio(devices::DEV_R_UART),
        };

        if ClockHandle::new(&ccu::R_CCU, ccu::r_clk::BUS_R_UART)
            .get()
            .is_err()
        {
            return;
        }

        // 115200n8 from the 24 MHz APB2 clock.
        uart.regs.write_32(UART_LCR, UART_LCR_DLAB);
        uart.regs.write_32(UART_DLL, 13);
        uart.regs.write_32(UART_DLH, 0);
        uart.regs.write_32(UART_LCR, UART_LCR_8N1);
        uart.regs.write_32(UART_FCR, 1);

        let _ = logger::init(LockedWriter::new(uart));
    }

    fn restart_firmware() -> ! {
        // Assert the management core's own reset (active-low); the boot
        // vector runs again with persistent state intact.
        mmio(devices::DEV_R_CPUCFG).write_32(CPUS_RESET_REG, 0);

        loop {
            core::hint::spin_loop();
        }
    }

    fn record_step(step: u32) {
        rtc().write_32(LAST_STEP_REG, step);
    }

    fn last_step() -> u32 {
        rtc().read_32(LAST_STEP_REG)
    }

    fn record_exception(value: u32) {
        rtc().write_32(LAST_EXCEPTION_REG, value);
    }

    fn last_exception() -> u32 {
        rtc().read_32(LAST_EXCEPTION_REG)
    }

    fn css_init() {
        css::init();
    }

    fn css_irq_status() -> u32 {
        // The H6 has no per-core wake-IRQ visibility.
        0
    }

    fn css_suspend_css(new_state: PowerState) {
        css::suspend_css(new_state);
    }

    fn css_resume_css(old_state: PowerState) {
        css::resume_css(old_state);
    }

    fn css_suspend_cluster(cluster: usize, new_state: PowerState) {
        css::suspend_cluster(cluster, new_state);
    }

    fn css_resume_cluster(cluster: usize, old_state: PowerState) {
        css::resume_cluster(cluster, old_state);
    }

    fn css_suspend_core(cluster: usize, core: usize, new_state: PowerState) {
        css::suspend_core(cluster, core, new_state);
    }

    fn css_resume_core(cluster: usize, core: usize, old_state: PowerState) {
        css::resume_core(cluster, core, old_state);
    }

    fn ccu_init() {
        ccu::ccu_init();
    }

    fn ccu_suspend() {
        ccu::ccu_suspend();
    }

    fn ccu_resume() {
        ccu::ccu_resume();
    }

    fn r_ccu_init() {
        ccu::r_ccu_init();
    }

    fn r_ccu_suspend(depth: SuspendDepth) {
        ccu::r_ccu_suspend(depth);
    }

    fn r_ccu_resume() {
        ccu::r_ccu_resume();
    }

    fn osc24m() -> ClockHandle {
        ClockHandle::new(&ccu::R_CCU, ccu::r_clk::OSC24M)
    }

    fn dram_init() {
        devices::DRAM.init();
    }

    fn dram_suspend() {
        devices::DRAM.suspend();
    }

    fn dram_resume() {
        devices::DRAM.resume();
    }

    fn dram_save_checksum() {
        devices::DRAM.save_checksum();
    }

    fn dram_verify_checksum() {
        devices::DRAM.verify_checksum();
    }

    fn wake_irq() -> &'static SunxiRIntc {
        &devices::WAKE_IRQ
    }

    fn sync_pin_controllers() {
        devices::PIO.sync();
        devices::R_PIO.sync();
    }

    fn mailbox() -> &'static SunxiMsgbox {
        &devices::MSGBOX
    }

    fn scpi_shmem() -> ScpiShmem {
        // SAFETY: The shared-memory window is carved out of SRAM A2 by
        // the memory map; nothing else in the firmware uses it, and the
        // AP follows the mailbox ownership protocol.
        unsafe { ScpiShmem::new(SCPI_MEM_BASE as *mut ScpiMem) }
    }

    fn watchdog() -> &'static dyn Watchdog {
        &devices::R_TWD
    }

    fn pmic() -> Option<&'static dyn Pmic> {
        Some(&devices::PMIC)
    }

    fn cec() -> Option<&'static dyn WakeSource> {
        Some(&devices::CEC)
    }

    fn cir() -> Option<&'static dyn WakeSource> {
        Some(&devices::CIR)
    }

    fn fuel_gauge() -> Option<&'static Axp20x> {
        Some(&devices::AXP)
    }

    fn supplies() -> SystemSupplies {
        SystemSupplies {
            cpu: Some(RegulatorHandle::new(&devices::REGULATOR, axp805::DCDCA)),
            dram: Some(RegulatorHandle::new(&devices::REGULATOR, axp805::DCDCE)),
            vcc_pll: Some(RegulatorHandle::new(&devices::REGULATOR, axp805::BLDO1)),
            vdd_sys: Some(RegulatorHandle::new(&devices::REGULATOR, axp805::DCDCD)),
        }
    }
}
