// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The SCPI request/response engine.
//!
//! Each client has a dedicated pair of mailbox channels and a fixed
//! region of shared memory. The engine enforces at-most-one-outstanding
//! semantics per client: a new request is only dequeued once the
//! previous reply was acknowledged or timed out, and the request buffer
//! is only acknowledged back to the AP after its handler has run.

pub mod cmds;
pub mod protocol;

use self::cmds::HandlerContext;
use self::protocol::{SCPI_SENDER_SCP, SCPI_VIRTUAL_CHANNEL, ScpiMem, ScpiStatus};
use crate::counter;
use crate::device;
use crate::drivers::msgbox::SunxiMsgbox;
use crate::error::Result;
use core::sync::atomic::{Ordering, fence};
use log::error;

/// The number of mailbox clients.
pub const SCPI_CLIENTS: usize = 2;

/// Client 0: the secure monitor (EL3).
///
/// CPU, cluster, and system power state changes must go through PSCI so
/// the secure monitor can coordinate with a secure OS, so those requests
/// are only allowed from this client.
pub const CLIENT_SECURE: u8 = 0;

/// Client 1: the rich OS kernel (EL2/EL1).
pub const CLIENT_NONSECURE: u8 = 1;

/// How long the AP has to acknowledge an outgoing reply.
const SCPI_TX_TIMEOUT_US: u32 = 10_000;

fn rx_chan(client: u8) -> u8 {
    2 * client
}

fn tx_chan(client: u8) -> u8 {
    2 * client + 1
}

/// A pointer to the per-client shared-memory regions.
#[derive(Clone, Copy)]
pub struct ScpiShmem {
    base: *mut ScpiMem,
}

impl ScpiShmem {
    /// Creates a view of the shared-memory area.
    ///
    /// # Safety
    ///
    /// `base` must point to [`SCPI_CLIENTS`] consecutive [`ScpiMem`]
    /// regions that stay valid for the lifetime of the program and are
    /// only otherwise accessed by the AP under the protocol's ownership
    /// rules.
    pub const unsafe fn new(base: *mut ScpiMem) -> Self {
        Self { base }
    }

    /// The memory area for one client.
    ///
    /// Client areas are laid out in reverse client order.
    fn area(self, client: u8) -> *mut ScpiMem {
        self.base
            .wrapping_add(SCPI_CLIENTS - usize::from(client) - 1)
    }
}

#[derive(Clone, Copy, Default)]
struct ClientState {
    timeout: u32,
    tx_full: bool,
}

/// The protocol engine.
///
/// Holds a reference to the mailbox device for its whole lifetime, so
/// dropping the engine (on suspend) lets the mailbox clock gate.
pub struct Scpi {
    mailbox: &'static SunxiMsgbox,
    shmem: ScpiShmem,
    clients: [ClientState; SCPI_CLIENTS],
}

impl Scpi {
    /// Acquires the mailbox and creates the engine.
    ///
    /// Propagates the mailbox's probe errors.
    pub fn new(mailbox: &'static SunxiMsgbox, shmem: ScpiShmem) -> Result<Self> {
        device::get(mailbox)?;

        Ok(Self {
            mailbox,
            shmem,
            clients: [ClientState::default(); SCPI_CLIENTS],
        })
    }

    /// Whether a reply to `client` is still waiting to be acknowledged.
    pub fn tx_full(&self, client: u8) -> bool {
        self.clients[usize::from(client)].tx_full
    }

    fn mem(&mut self, client: u8) -> &mut ScpiMem {
        // SAFETY: The shmem contract in `ScpiShmem::new` guarantees the
        // area is valid, and the engine only touches a buffer while the
        // protocol says the firmware owns it (RX between receive and
        // ack, TX while !tx_full).
        unsafe { &mut *self.shmem.area(client) }
    }

    /// Sends the reply already written to the client's TX buffer,
    /// recording the deadline for the client to acknowledge it.
    fn send_message(&mut self, client: u8) {
        // Ensure the outgoing message is fully written at this point.
        fence(Ordering::SeqCst);

        // Ensure the timeout is updated before triggering transmission.
        let state = &mut self.clients[usize::from(client)];
        state.timeout = counter::timeout_set(SCPI_TX_TIMEOUT_US);
        state.tx_full = true;
        fence(Ordering::SeqCst);

        // Notify the client that the message has been sent.
        if let Err(err) = self.mailbox.send(tx_chan(client), SCPI_VIRTUAL_CHANNEL) {
            error!("SCPI.{}: Send error: {:?}", client, err);
        }
    }

    /// Creates and sends a firmware-initiated message.
    ///
    /// Silently does nothing if the client's TX buffer is busy.
    pub fn create_message(&mut self, client: u8, command: u8) {
        if self.clients[usize::from(client)].tx_full {
            return;
        }

        // Write the message header.
        let tx = &mut self.mem(client).tx;
        tx.command = command;
        tx.sender = SCPI_SENDER_SCP;
        tx.size = 0;
        tx.set_status(ScpiStatus::Ok);

        self.send_message(client);
    }

    /// Attempts as much forward progress as possible for one client:
    /// reclaim the TX buffer, then respond to one incoming message.
    fn poll_client(&mut self, ctx: &HandlerContext, client: u8) {
        let index = usize::from(client);

        // Flush any outgoing messages. The TX buffer becomes free when a
        // previously-sent message is acknowledged or when it times out.
        if self.clients[index].tx_full
            && (self.mailbox.last_tx_done(tx_chan(client))
                || counter::timeout_expired(self.clients[index].timeout))
        {
            self.clients[index].tx_full = false;
        }

        // Once the TX buffer is free, we can process new messages,
        // reading from the RX buffer and generating responses in the TX
        // buffer.
        if self.clients[index].tx_full {
            return;
        }

        let mut reply_needed = false;

        // Try to grab a new message. All errors are handled by retrying
        // on the next iteration through the main loop.
        if let Some(msg) = self.mailbox.receive(rx_chan(client)) {
            // Only process messages sent with the correct protocol,
            // which SCPI calls a "virtual channel".
            if msg == SCPI_VIRTUAL_CHANNEL {
                let mem = self.mem(client);

                // The handler relays if a reply is needed.
                reply_needed = cmds::handle(ctx, client, mem);
            }

            // Acknowledging the message allows the client to reuse the
            // RX buffer, so the handler must run first.
            self.mailbox.ack_rx(rx_chan(client));
        }

        // If the TX buffer now contains a reply, send it.
        if reply_needed {
            self.send_message(client);
        }
    }

    /// Polls every client once.
    pub fn poll(&mut self, ctx: &HandlerContext) {
        for client in 0..SCPI_CLIENTS as u8 {
            self.poll_client(ctx, client);
        }
    }
}

impl Drop for Scpi {
    fn drop(&mut self) {
        // Drop the mailbox reference so its clock can gate in suspend.
        device::put(self.mailbox);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::Css;
    use crate::platform::host;
    use crate::scpi::protocol::*;
    use crate::system::{SystemState, SystemStateMachine};
    use zerocopy::FromZeros;

    // Mailbox register offsets, for poking the fake hardware.
    const IRQ_STAT_REG: usize = 0x0050;
    const REMOTE_IRQ_STAT_REG: usize = 0x0070;

    fn msg_stat_reg(chan: u8) -> usize {
        0x0140 + 4 * usize::from(chan)
    }

    fn msg_data_reg(chan: u8) -> usize {
        0x0180 + 4 * usize::from(chan)
    }

    struct Harness {
        scpi: Scpi,
        css: Css,
        system: SystemStateMachine,
    }

    impl Harness {
        fn new() -> Self {
            host::reset_scpi_fakes();
            let system = SystemStateMachine::new();
            system.force(SystemState::Awake);
            Self {
                scpi: Scpi::new(host::mailbox(), host::scpi_shmem()).unwrap(),
                css: Css::new(),
                system,
            }
        }

        fn poll(&mut self) {
            let ctx = HandlerContext {
                css: &self.css,
                system: &self.system,
            };
            self.scpi.poll(&ctx);
        }

        /// Places a request in a client's RX buffer and raises the
        /// mailbox message.
        fn inject(&mut self, client: u8, command: u8, sender: u8, payload: &[u32]) {
            let mem = self.scpi.mem(client);
            mem.rx = ScpiMsg::new_zeroed();
            mem.rx.command = command;
            mem.rx.sender = sender;
            mem.rx.size = (payload.len() * 4) as u16;
            mem.rx.payload[..payload.len()].copy_from_slice(payload);

            let regs = host::msgbox_regs();
            regs.write_32(msg_stat_reg(rx_chan(client)), 1);
            regs.write_32(msg_data_reg(rx_chan(client)), SCPI_VIRTUAL_CHANNEL);
        }

        /// Clears the injected message, as popping the FIFO would.
        fn drain_rx(&self, client: u8) {
            host::msgbox_regs().write_32(msg_stat_reg(rx_chan(client)), 0);
        }

        fn reply(&mut self, client: u8) -> (u8, u16, u32, [u32; SCPI_PAYLOAD_WORDS]) {
            let tx = &self.scpi.mem(client).tx;
            (tx.command, tx.size, tx.status, tx.payload)
        }
    }

    #[test]
    fn get_scp_cap_round_trip() {
        let _guard = host::test_lock();
        let mut h = Harness::new();

        h.inject(CLIENT_SECURE, CMD_GET_SCP_CAP, 1, &[]);
        h.poll();
        h.drain_rx(CLIENT_SECURE);

        let (command, size, status, payload) = h.reply(CLIENT_SECURE);
        assert_eq!(command, CMD_GET_SCP_CAP);
        assert_eq!(status, ScpiStatus::Ok as u32);
        assert_eq!(size, 28);
        assert_eq!(payload[0], 0x0001_0002);
        assert_eq!(payload[1], 0x00f8_00f8);
        assert_eq!(payload[2], crate::version::scp_firmware_version());
        assert_eq!(payload[3], 1 << 1 | 1 << 2 | 1 << 3 | 1 << 4 | 1 << 5);
        assert_eq!(payload[4..7], [0, 0, 0]);

        // The reply was signalled on the secure TX channel.
        assert!(h.scpi.tx_full(CLIENT_SECURE));
        let sent = host::msgbox_regs().read_32(msg_data_reg(tx_chan(CLIENT_SECURE)));
        assert_eq!(sent, SCPI_VIRTUAL_CHANNEL);
    }

    #[test]
    fn unknown_command_returns_support_error() {
        let _guard = host::test_lock();
        let mut h = Harness::new();

        h.inject(CLIENT_SECURE, 0x55, 1, &[]);
        h.poll();
        h.drain_rx(CLIENT_SECURE);

        let (_, size, status, _) = h.reply(CLIENT_SECURE);
        assert_eq!(status, ScpiStatus::Support as u32);
        assert_eq!(size, 0);
    }

    #[test]
    fn payload_size_mismatch_returns_size_error() {
        let _guard = host::test_lock();
        let mut h = Harness::new();

        // SET_SYS_POWER expects a 1-byte payload, not 4 bytes.
        h.inject(CLIENT_SECURE, CMD_SET_SYS_POWER, 1, &[1]);
        h.poll();
        h.drain_rx(CLIENT_SECURE);

        let (_, _, status, _) = h.reply(CLIENT_SECURE);
        assert_eq!(status, ScpiStatus::Size as u32);
    }

    #[test]
    fn secure_only_command_from_nonsecure_client_is_denied() {
        let _guard = host::test_lock();
        let mut h = Harness::new();

        h.inject(CLIENT_NONSECURE, CMD_SET_CSS_POWER, 2, &[0x0000_0302]);
        h.poll();
        h.drain_rx(CLIENT_NONSECURE);

        // Even though SET_CSS_POWER is NO_REPLY, dispatcher errors reply.
        let (_, size, status, _) = h.reply(CLIENT_NONSECURE);
        assert_eq!(status, ScpiStatus::Access as u32);
        assert_eq!(size, 0);
        assert!(h.scpi.tx_full(CLIENT_NONSECURE));
    }

    #[test]
    fn set_css_power_succeeds_silently() {
        let _guard = host::test_lock();
        let mut h = Harness::new();
        for core in 1..crate::css::MAX_CORES_PER_CLUSTER {
            h.css
                .set_power_state(
                    &h.system,
                    0,
                    core,
                    crate::css::PowerState::On,
                    crate::css::PowerState::On,
                    crate::css::PowerState::On,
                )
                .unwrap();
        }

        // core=2, cluster=0, core_state=OFF, others ON.
        let descriptor = 2 | 3 << 8;
        h.inject(CLIENT_SECURE, CMD_SET_CSS_POWER, 1, &[descriptor]);
        h.poll();
        h.drain_rx(CLIENT_SECURE);

        assert_eq!(h.css.core_state(0, 2), crate::css::PowerState::Off);
        assert_eq!(h.system.state(), SystemState::Awake);
        // NO_REPLY: nothing was transmitted.
        assert!(!h.scpi.tx_full(CLIENT_SECURE));
    }

    #[test]
    fn get_css_power_uses_swapped_descriptor_slots() {
        let _guard = host::test_lock();
        let mut h = Harness::new();

        h.inject(CLIENT_SECURE, CMD_GET_CSS_POWER, 1, &[]);
        h.poll();
        h.drain_rx(CLIENT_SECURE);

        let (_, size, status, payload) = h.reply(CLIENT_SECURE);
        assert_eq!(status, ScpiStatus::Ok as u32);
        assert_eq!(size, (crate::css::MAX_CLUSTERS * 2) as u16);

        // Cluster 0's descriptor lands in byte slot 1 ^ 0 = 1.
        let bytes = payload[0].to_le_bytes();
        let cluster0 = u16::from_le_bytes([bytes[2], bytes[3]]);
        assert_eq!(cluster0 & 0xf, 0);
        assert_eq!(cluster0 >> 4 & 0xf, crate::css::PowerState::On as u16);
        assert_eq!(cluster0 >> 8, 1, "only the boot core is online");
    }

    #[test]
    fn set_sys_power_validates_its_argument() {
        let _guard = host::test_lock();
        let mut h = Harness::new();

        h.inject(CLIENT_SECURE, CMD_SET_SYS_POWER, 1, &[7]);
        h.scpi.mem(CLIENT_SECURE).rx.size = 1;
        h.poll();
        h.drain_rx(CLIENT_SECURE);

        let (_, _, status, _) = h.reply(CLIENT_SECURE);
        assert_eq!(status, ScpiStatus::Param as u32);
        assert_eq!(h.system.state(), SystemState::Awake);
    }

    #[test]
    fn set_sys_power_shutdown_moves_the_state_machine() {
        let _guard = host::test_lock();
        let mut h = Harness::new();

        h.inject(CLIENT_SECURE, CMD_SET_SYS_POWER, 1, &[1]);
        h.scpi.mem(CLIENT_SECURE).rx.size = 1;
        h.poll();
        h.drain_rx(CLIENT_SECURE);

        let (_, _, status, _) = h.reply(CLIENT_SECURE);
        assert_eq!(status, ScpiStatus::Ok as u32);
        assert_eq!(h.system.state(), SystemState::Shutdown);
    }

    #[test]
    fn tx_slot_is_reclaimed_by_ack_or_timeout() {
        let _guard = host::test_lock();
        let mut h = Harness::new();
        let regs = host::msgbox_regs();

        h.inject(CLIENT_SECURE, CMD_GET_SCP_CAP, 1, &[]);
        // The remote side has not drained the TX channel yet.
        regs.write_32(REMOTE_IRQ_STAT_REG, 1 << (2 * tx_chan(CLIENT_SECURE)));
        h.poll();
        h.drain_rx(CLIENT_SECURE);
        assert!(h.scpi.tx_full(CLIENT_SECURE));

        // Still busy and within the deadline: the slot stays occupied.
        h.poll();
        assert!(h.scpi.tx_full(CLIENT_SECURE));

        // An acknowledgement frees the slot.
        regs.write_32(REMOTE_IRQ_STAT_REG, 0);
        h.poll();
        assert!(!h.scpi.tx_full(CLIENT_SECURE));

        // Send again; this time let the deadline lapse instead.
        h.inject(CLIENT_SECURE, CMD_GET_SCP_CAP, 1, &[]);
        regs.write_32(REMOTE_IRQ_STAT_REG, 1 << (2 * tx_chan(CLIENT_SECURE)));
        h.poll();
        h.drain_rx(CLIENT_SECURE);
        assert!(h.scpi.tx_full(CLIENT_SECURE));
        host::advance_cycles(2 * SCPI_TX_TIMEOUT_US);
        h.poll();
        assert!(!h.scpi.tx_full(CLIENT_SECURE));
    }

    #[test]
    fn unrecognized_virtual_channel_is_acked_and_ignored() {
        let _guard = host::test_lock();
        let mut h = Harness::new();
        let regs = host::msgbox_regs();

        regs.write_32(msg_stat_reg(rx_chan(CLIENT_SECURE)), 1);
        regs.write_32(msg_data_reg(rx_chan(CLIENT_SECURE)), 0xdead);
        h.poll();
        h.drain_rx(CLIENT_SECURE);

        // The message was acknowledged but produced no reply.
        assert!(!h.scpi.tx_full(CLIENT_SECURE));
        assert_ne!(regs.read_32(IRQ_STAT_REG) & 1, 0, "RX IRQ acknowledged");
    }

    #[test]
    fn create_message_writes_the_ready_header() {
        let _guard = host::test_lock();
        let mut h = Harness::new();

        h.scpi.create_message(CLIENT_SECURE, CMD_SCP_READY);

        let (command, size, status, _) = h.reply(CLIENT_SECURE);
        assert_eq!(command, CMD_SCP_READY);
        assert_eq!(size, 0);
        assert_eq!(status, ScpiStatus::Ok as u32);
        assert!(h.scpi.tx_full(CLIENT_SECURE));
    }
}
