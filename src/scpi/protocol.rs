// Copyright The sunxi-scp Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The SCPI wire format.
//!
//! Each client owns a fixed 512-byte region of shared memory holding one
//! request and one reply message. A message is an 8-byte header followed
//! by a payload of 32-bit words. The mailbox hardware swaps bytes within
//! each 32-bit word on the wire; the header fields are laid out so the
//! firmware reads them as little-endian, and sub-word arrays must be
//! stored with their indices XORed (see the CSS power-state reply).

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// The size of the SCPI message header in bytes.
pub const SCPI_HEADER_SIZE: usize = 8;

/// The full size of one SCPI message in bytes.
pub const SCPI_MESSAGE_SIZE: usize = 0x100;

/// The size of an SCPI message payload in bytes.
pub const SCPI_PAYLOAD_SIZE: usize = SCPI_MESSAGE_SIZE - SCPI_HEADER_SIZE;

/// The payload length in 32-bit words.
pub const SCPI_PAYLOAD_WORDS: usize = SCPI_PAYLOAD_SIZE / 4;

/// The sender id the SCP uses for messages it initiates.
pub const SCPI_SENDER_SCP: u8 = 0;

/// The only valid on-wire mailbox message value.
///
/// The virtual channel number theoretically allows several message
/// protocols to share one memory area; here it is simply the whole
/// mailbox payload, and anything else is acknowledged and ignored.
pub const SCPI_VIRTUAL_CHANNEL: u32 = 1 << 0;

/// SCP ready (firmware-initiated).
pub const CMD_SCP_READY: u8 = 0x01;
/// Get SCP capability.
pub const CMD_GET_SCP_CAP: u8 = 0x02;
/// Set CSS power state.
pub const CMD_SET_CSS_POWER: u8 = 0x03;
/// Get CSS power state.
pub const CMD_GET_CSS_POWER: u8 = 0x04;
/// Set system power state.
pub const CMD_SET_SYS_POWER: u8 = 0x05;

/// Status codes carried in the message header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ScpiStatus {
    /// Success.
    Ok = 0,
    /// Invalid parameters.
    Param = 1,
    /// Invalid alignment.
    Align = 2,
    /// Invalid size.
    Size = 3,
    /// Invalid handler or callback.
    Handler = 4,
    /// Invalid access or permission denied.
    Access = 5,
    /// Value out of range.
    Range = 6,
    /// Timeout occurred.
    Timeout = 7,
    /// Invalid memory area or pointer.
    NoMem = 8,
    /// Invalid power state.
    PwrState = 9,
    /// Feature not supported or disabled.
    Support = 10,
    /// Device error.
    Device = 11,
    /// Device busy.
    Busy = 12,
    /// Unexpected or invalid data received.
    Data = 14,
    /// Invalid or unattainable state requested.
    State = 15,
}

impl From<crate::error::Error> for ScpiStatus {
    fn from(err: crate::error::Error) -> Self {
        use crate::error::Error;

        match err {
            Error::Busy => ScpiStatus::Busy,
            Error::Exists | Error::Invalid => ScpiStatus::Param,
            Error::Io | Error::NoDevice => ScpiStatus::Device,
            Error::NotSupported => ScpiStatus::Support,
            Error::Range => ScpiStatus::Range,
        }
    }
}

/// One SCPI message as it appears in shared memory.
#[derive(FromBytes, Immutable, IntoBytes, KnownLayout)]
#[repr(C)]
pub struct ScpiMsg {
    /// The command number.
    pub command: u8,
    /// The sending agent.
    pub sender: u8,
    /// The payload size in bytes.
    pub size: u16,
    /// The status code (zero in requests).
    pub status: u32,
    /// The payload, as 32-bit words to match the hardware lane swap.
    pub payload: [u32; SCPI_PAYLOAD_WORDS],
}

impl ScpiMsg {
    /// Stores `status` in the header.
    pub fn set_status(&mut self, status: ScpiStatus) {
        self.status = status as u32;
    }
}

/// One client's region of shared memory.
#[derive(FromBytes, Immutable, IntoBytes, KnownLayout)]
#[repr(C)]
pub struct ScpiMem {
    /// The AP-to-SCP request message.
    pub rx: ScpiMsg,
    /// The SCP-to-AP reply message.
    pub tx: ScpiMsg,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_bit_exact() {
        assert_eq!(size_of::<ScpiMsg>(), SCPI_MESSAGE_SIZE);
        assert_eq!(size_of::<ScpiMem>(), 2 * SCPI_MESSAGE_SIZE);
        assert_eq!(core::mem::offset_of!(ScpiMsg, command), 0);
        assert_eq!(core::mem::offset_of!(ScpiMsg, sender), 1);
        assert_eq!(core::mem::offset_of!(ScpiMsg, size), 2);
        assert_eq!(core::mem::offset_of!(ScpiMsg, status), 4);
        assert_eq!(core::mem::offset_of!(ScpiMsg, payload), SCPI_HEADER_SIZE);
    }
}
