// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The SCPI command table and handlers.

use crate::css::{Css, MAX_CLUSTERS, PowerState};
use crate::scpi::protocol::*;
use crate::system::SystemStateMachine;
use crate::version;
use bitflags::bitflags;
use log::debug;
use zerocopy::IntoBytes;

bitflags! {
    /// Per-command dispatch behaviour.
    #[derive(Clone, Copy)]
    struct CmdFlags: u8 {
        /// Do not send a reply after a successful handler run.
        const NO_REPLY = 1 << 0;
        /// Reject this command from the non-secure channel.
        const SECURE_ONLY = 1 << 1;
    }
}

/// The services the firmware performs for its clients.
///
/// Handlers mutate the coordinator and state machine through this
/// context, which the main loop threads into [`crate::scpi::Scpi::poll`].
pub struct HandlerContext<'a> {
    /// The CSS power coordinator.
    pub css: &'a Css,
    /// The system state machine.
    pub system: &'a SystemStateMachine,
}

type Handler = fn(
    &HandlerContext,
    &[u32; SCPI_PAYLOAD_WORDS],
    &mut [u32; SCPI_PAYLOAD_WORDS],
) -> Result<u16, ScpiStatus>;

struct ScpiCmd {
    /// Handler that can process a message and create a dynamic reply.
    handler: Option<Handler>,
    /// Expected size of the received payload.
    rx_size: u16,
    flags: CmdFlags,
}

const fn unimplemented_cmd() -> ScpiCmd {
    ScpiCmd {
        handler: None,
        rx_size: 0,
        flags: CmdFlags::empty(),
    }
}

fn scp_ready_handler(
    _ctx: &HandlerContext,
    _rx: &[u32; SCPI_PAYLOAD_WORDS],
    _tx: &mut [u32; SCPI_PAYLOAD_WORDS],
) -> Result<u16, ScpiStatus> {
    // Response to SCP ready; nothing to do.
    Ok(0)
}

const fn protocol_version(major: u16, minor: u16) -> u32 {
    (major as u32) << 16 | minor as u32
}

const fn payload_limits(tx: u32, rx: u32) -> u32 {
    (tx & 0x1ff) << 16 | (rx & 0x1ff)
}

fn get_scp_cap_handler(
    _ctx: &HandlerContext,
    _rx: &[u32; SCPI_PAYLOAD_WORDS],
    tx: &mut [u32; SCPI_PAYLOAD_WORDS],
) -> Result<u16, ScpiStatus> {
    // SCPI protocol version.
    tx[0] = protocol_version(1, 2);
    // Payload size limits.
    tx[1] = payload_limits(SCPI_PAYLOAD_SIZE as u32, SCPI_PAYLOAD_SIZE as u32);
    // Firmware version.
    tx[2] = version::scp_firmware_version();
    // Commands enabled 0.
    tx[3] = 1 << CMD_SCP_READY
        | 1 << CMD_GET_SCP_CAP
        | 1 << CMD_SET_CSS_POWER
        | 1 << CMD_GET_CSS_POWER
        | 1 << CMD_SET_SYS_POWER;
    // Commands enabled 1 through 3.
    tx[4] = 0;
    tx[5] = 0;
    tx[6] = 0;

    Ok(7 * 4)
}

fn power_state_field(descriptor: u32, start: u32) -> Result<PowerState, ScpiStatus> {
    PowerState::try_from(crate::mmio::bitfield_get(descriptor, start, 4) as u8)
        .map_err(|_| ScpiStatus::PwrState)
}

/// Sets the power state of a single core, its parent cluster, and the
/// CSS.
///
/// The power state provided by the secure monitor is already
/// coordinated; the coordinator turns domains on from highest to lowest
/// power level and off from lowest to highest, and moves the system
/// state machine to SUSPEND when the whole CSS powers off.
fn set_css_power_handler(
    ctx: &HandlerContext,
    rx: &[u32; SCPI_PAYLOAD_WORDS],
    _tx: &mut [u32; SCPI_PAYLOAD_WORDS],
) -> Result<u16, ScpiStatus> {
    let descriptor = rx[0];
    let core = crate::mmio::bitfield_get(descriptor, 0x00, 4) as usize;
    let cluster = crate::mmio::bitfield_get(descriptor, 0x04, 4) as usize;
    let core_state = power_state_field(descriptor, 0x08)?;
    let cluster_state = power_state_field(descriptor, 0x0c)?;
    let css_state = power_state_field(descriptor, 0x10)?;

    ctx.css
        .set_power_state(ctx.system, cluster, core, core_state, cluster_state, css_state)?;

    Ok(0)
}

/// Reports the power states of all clusters and the cores they contain.
fn get_css_power_handler(
    ctx: &HandlerContext,
    _rx: &[u32; SCPI_PAYLOAD_WORDS],
    tx: &mut [u32; SCPI_PAYLOAD_WORDS],
) -> Result<u16, ScpiStatus> {
    let bytes = tx.as_mut_bytes();

    // Each cluster has its own power state descriptor.
    for cluster in 0..MAX_CLUSTERS {
        let (state, online_cores) = ctx.css.get_power_state(cluster)?;
        let descriptor =
            cluster as u16 & 0xf | (state as u16 & 0xf) << 4 | (online_cores as u16) << 8;

        // Compensate for the hardware byte swapping, since this is an
        // array of elements each aligned to less than 4 bytes.
        let slot = (cluster ^ 1) * 2;
        bytes[slot..slot + 2].copy_from_slice(&descriptor.to_le_bytes());
    }

    Ok((MAX_CLUSTERS * 2) as u16)
}

/// System power commands accepted by SET_SYS_POWER.
mod sys_power {
    /// Shut the system down.
    pub const SHUTDOWN: u32 = 1;
    /// Reboot the board.
    pub const REBOOT: u32 = 2;
    /// Reset the SoC.
    pub const RESET: u32 = 3;
}

fn set_sys_power_handler(
    ctx: &HandlerContext,
    rx: &[u32; SCPI_PAYLOAD_WORDS],
    _tx: &mut [u32; SCPI_PAYLOAD_WORDS],
) -> Result<u16, ScpiStatus> {
    match rx[0] & 0xff {
        sys_power::SHUTDOWN => ctx.system.shutdown(),
        sys_power::REBOOT => ctx.system.reboot(),
        sys_power::RESET => ctx.system.reset(),
        _ => return Err(ScpiStatus::Param),
    }

    Ok(0)
}

/// The list of supported SCPI commands, indexed by command number.
const COMMANDS: [ScpiCmd; 6] = [
    unimplemented_cmd(),
    // CMD_SCP_READY
    ScpiCmd {
        handler: Some(scp_ready_handler),
        rx_size: 0,
        flags: CmdFlags::NO_REPLY.union(CmdFlags::SECURE_ONLY),
    },
    // CMD_GET_SCP_CAP
    ScpiCmd {
        handler: Some(get_scp_cap_handler),
        rx_size: 0,
        flags: CmdFlags::empty(),
    },
    // CMD_SET_CSS_POWER
    ScpiCmd {
        handler: Some(set_css_power_handler),
        rx_size: 4,
        flags: CmdFlags::NO_REPLY.union(CmdFlags::SECURE_ONLY),
    },
    // CMD_GET_CSS_POWER
    ScpiCmd {
        handler: Some(get_css_power_handler),
        rx_size: 0,
        flags: CmdFlags::empty(),
    },
    // CMD_SET_SYS_POWER
    ScpiCmd {
        handler: Some(set_sys_power_handler),
        rx_size: 1,
        flags: CmdFlags::SECURE_ONLY,
    },
];

/// Handles one received command, writing the reply in place.
///
/// Returns whether the reply should be transmitted. Dispatcher-level
/// failures (unknown command, wrong payload size, access denial) always
/// generate a reply so the client is not left waiting; only a
/// successfully dispatched `NO_REPLY` command stays silent.
pub(super) fn handle(ctx: &HandlerContext, client: u8, mem: &mut ScpiMem) -> bool {
    let ScpiMem { rx, tx } = mem;

    // Initialize the response (defaults for unsupported commands).
    tx.command = rx.command;
    tx.sender = rx.sender;
    tx.size = 0;
    tx.set_status(ScpiStatus::Support);

    // Avoid reading past the end of the table; reply with the error.
    let Some(cmd) = COMMANDS.get(usize::from(rx.command)) else {
        return true;
    };

    if cmd.flags.contains(CmdFlags::SECURE_ONLY) && client != super::CLIENT_SECURE {
        // Prevent the rich OS from sending commands that bypass PSCI.
        tx.set_status(ScpiStatus::Access);
        return true;
    }
    if rx.size != cmd.rx_size {
        // Check that the request payload matches the expected size.
        tx.set_status(ScpiStatus::Size);
        return true;
    }

    match cmd.handler {
        Some(handler) => match handler(ctx, &rx.payload, &mut tx.payload) {
            Ok(size) => {
                tx.size = size;
                tx.set_status(ScpiStatus::Ok);
            }
            Err(status) => tx.set_status(status),
        },
        None => {
            debug!("SCPI{}: Bad command: {}", client, rx.command);
            return true;
        }
    }

    // Report back if a reply should be sent.
    !cmd.flags.contains(CmdFlags::NO_REPLY)
}
