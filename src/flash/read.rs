//! Chunked flash read with incremental byte-count acknowledgements and an
//! MD5 trailer, grounded in `esp_serial.cpp`'s `readFlash`.

use std::time::Duration;

use crate::digest::md5;
use crate::targets::TargetDescriptor;
use crate::transport::{Transport, READ_FLASH};

const READ_TIMEOUT: Duration = Duration::from_millis(5000);

/// Reads `size` bytes of flash starting at `offset`, acknowledging each
/// inbound chunk with the running received-byte count, and validates the
/// device's trailing MD5 digest against the locally-computed one.
///
/// Calls `on_progress` with the running percent (`0..=100`) after each
/// chunk, mirroring the original's `progress()` callback.
pub fn read_flash(
    transport: &mut Transport,
    target: &dyn TargetDescriptor,
    offset: u32,
    size: u32,
    mut on_progress: impl FnMut(u32),
) -> Option<Vec<u8>> {
    on_progress(0);

    let mut data_field = Vec::with_capacity(16);
    data_field.extend_from_slice(&offset.to_le_bytes());
    data_field.extend_from_slice(&size.to_le_bytes());
    data_field.extend_from_slice(&target.flash_sector_size().to_le_bytes());
    data_field.extend_from_slice(&1u32.to_le_bytes());

    let reply = transport.send(READ_FLASH, &data_field, 0, READ_TIMEOUT);
    if !reply.valid {
        return None;
    }

    let mut received = Vec::with_capacity(size as usize);
    while (received.len() as u32) < size {
        let chunk = transport.read_one_frame(READ_TIMEOUT);
        if chunk.is_empty() {
            return None;
        }

        let still_short = (received.len() as u32 + chunk.len() as u32) < size;
        if still_short && chunk.len() as u32 != target.flash_sector_size() {
            return None;
        }

        received.extend_from_slice(&chunk);
        on_progress(received.len() as u32 * 100 / size);

        let mut ack = Vec::with_capacity(4);
        ack.extend_from_slice(&(received.len() as u32).to_le_bytes());
        transport.send_raw(&ack, READ_TIMEOUT);
    }

    on_progress(100);

    let trailer = transport.read_one_frame(READ_TIMEOUT);
    if trailer != md5(&received) {
        return None;
    }

    Some(received)
}
