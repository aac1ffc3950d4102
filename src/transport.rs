//! Opcode constants and the command send/receive layer sitting on top of
//! [`crate::serial::SerialChannel`] and [`crate::slip`], grounded in
//! `espdefines.h` and `esptoolqt.cpp`'s `slipCommandSend`/`read_reg`/`write_reg`.

use std::time::Duration;

use crate::serial::SerialChannel;
use crate::slip::{self, SlipReply};
use crate::targets::{ReadPort, RegisterPort};

pub const FLASH_BEGIN: u8 = 0x02;
pub const FLASH_DATA: u8 = 0x03;
pub const FLASH_END: u8 = 0x04;
pub const MEM_BEGIN: u8 = 0x05;
pub const MEM_END: u8 = 0x06;
pub const MEM_DATA: u8 = 0x07;
pub const SYNC: u8 = 0x08;
pub const WRITE_REG: u8 = 0x09;
pub const READ_REG: u8 = 0x0A;
pub const CHANGE_BAUD: u8 = 0x0F;
pub const FLASH_DEFL_BEGIN: u8 = 0x10;
pub const FLASH_DEFL_DATA: u8 = 0x11;
pub const FLASH_DEFL_END: u8 = 0x12;
pub const SPI_FLASH_MD5: u8 = 0x13;
pub const READ_FLASH: u8 = 0xD2;

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);

/// The command/reply layer for a connected target. Owns the physical port;
/// all register, memory and flash commands ultimately funnel through
/// [`Transport::send`] or [`Transport::send_raw`].
pub struct Transport {
    port: Box<dyn SerialChannel>,
}

impl Transport {
    pub fn new(port: impl SerialChannel + 'static) -> Self {
        Self { port: Box::new(port) }
    }

    pub fn port_mut(&mut self) -> &mut dyn SerialChannel {
        &mut *self.port
    }

    pub fn into_port(self) -> Box<dyn SerialChannel> {
        self.port
    }

    /// Sends one framed command and waits up to `timeout` for a reply frame.
    pub fn send(&mut self, opcode: u8, data: &[u8], checksum: u32, timeout: Duration) -> SlipReply {
        let packet = slip::encode_command(opcode, data, checksum);
        if self.port.write_all(&packet, timeout).is_err() {
            return SlipReply::default();
        }
        let frame = self.port.read_one_frame(timeout);
        slip::parse_reply(&frame)
    }

    /// Convenience for commands whose only expected outcome is "status byte
    /// zero", using the default command timeout.
    pub fn ok(&mut self, opcode: u8, data: &[u8], checksum: u32) -> bool {
        let reply = self.send(opcode, data, checksum, DEFAULT_TIMEOUT);
        reply.valid && reply.command == opcode && reply.data.first() == Some(&0)
    }

    /// Sends a raw (non-command) SLIP frame, used for the flash-read
    /// incremental byte-count acknowledgements.
    pub fn send_raw(&mut self, data: &[u8], timeout: Duration) -> bool {
        let framed = slip::encode_frame(data);
        self.port.write_all(&framed, timeout).is_ok()
    }

    /// Reads one raw SLIP frame without parsing it as a command reply.
    pub fn read_one_frame(&mut self, timeout: Duration) -> Vec<u8> {
        self.port.read_one_frame(timeout)
    }

    /// Reads a 32-bit target register (`READ_REG`). Returns 0 on any
    /// transport-level failure, matching the original tool's best-effort read.
    pub fn read_reg(&mut self, address: u32) -> u32 {
        let reply = self.send(READ_REG, &address.to_le_bytes(), 0, DEFAULT_TIMEOUT);
        if reply.valid {
            reply.value
        } else {
            0
        }
    }

    /// Writes a 32-bit target register (`WRITE_REG`), with an
    /// all-ones write-mask and a zero delay field.
    pub fn write_reg(&mut self, address: u32, value: u32) -> bool {
        let mut data = Vec::with_capacity(16);
        data.extend_from_slice(&address.to_le_bytes());
        data.extend_from_slice(&value.to_le_bytes());
        data.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        self.ok(WRITE_REG, &data, 0)
    }
}

impl ReadPort for Transport {
    fn read_reg(&mut self, address: u32) -> u32 {
        Transport::read_reg(self, address)
    }
}

impl RegisterPort for Transport {
    fn write_reg(&mut self, address: u32, value: u32) -> bool {
        Transport::write_reg(self, address, value)
    }
}
