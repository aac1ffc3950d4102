//! `CHANGE_BAUD` handshake, grounded in `esp_serial.cpp`'s `changeBaud`.
//!
//! The original hard-codes the post-switch baud to `460800` regardless of
//! what the caller asked for. This implementation honors the caller's
//! requested baud instead, so a session opened at e.g. `921600` ends up
//! running at `921600`, not silently downgraded.

use std::thread::sleep;
use std::time::Duration;

use crate::targets::TargetDescriptor;
use crate::transport::{Transport, CHANGE_BAUD};

const CHIP_DETECT_MAGIC_REG_ADDR: u32 = 0x4000_1000;

/// Switches the link to `new_baud` and confirms the target is still
/// reachable by re-reading its chip-detect magic register.
pub fn rebaud(
    transport: &mut Transport,
    target: &dyn TargetDescriptor,
    current_baud: u32,
    new_baud: u32,
) -> bool {
    let mut data = Vec::with_capacity(8);
    data.extend_from_slice(&new_baud.to_le_bytes());
    data.extend_from_slice(&current_baud.to_le_bytes());
    let _ = transport.send(CHANGE_BAUD, &data, 0, Duration::from_millis(3000));

    if transport.port_mut().set_baud(new_baud).is_err() {
        return false;
    }
    sleep(Duration::from_millis(50));
    let _ = transport.port_mut().read_for(Duration::from_millis(20));

    target.chip_compare_magic_value(transport.read_reg(CHIP_DETECT_MAGIC_REG_ADDR))
}
