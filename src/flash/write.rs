//! Flash write/verify pipeline, grounded in `esp_serial.cpp`'s `flashData`/
//! `flashDataOneBlock`/`flashUpload`/`verifyFlashPr`/`verifyFlash`.
//!
//! Compression uses raw DEFLATE (`flate2::write::DeflateEncoder`), not zlib
//! framing: the stub's `FLASH_DEFL_DATA` handler inflates the payload
//! directly and does not expect zlib's 2-byte header or Adler32 trailer.

use std::io::Write;
use std::time::Duration;

use flate2::write::DeflateEncoder;
use flate2::Compression;
use log::debug;

use crate::digest::{md5, to_hex};
use crate::error::{Error, Result};
use crate::slip::esp_checksum;
use crate::targets::TargetDescriptor;
use crate::transport::{Transport, FLASH_BEGIN, FLASH_DATA, FLASH_DEFL_BEGIN, FLASH_DEFL_DATA};

const MD5_TIMEOUT_PER_MB: u64 = 5000;
const WRITE_TIMEOUT: Duration = Duration::from_millis(5000);
const WRITE_ATTEMPTS: usize = 3;

fn append_u32(data: &mut Vec<u8>, value: u32) {
    data.extend_from_slice(&value.to_le_bytes());
}

fn compress(source: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(source).expect("in-memory compression cannot fail");
    encoder.finish().expect("in-memory compression cannot fail")
}

fn flash_begin(
    transport: &mut Transport,
    size: u32,
    packets: u32,
    max_packet: u32,
    offset: u32,
    compressed: bool,
) -> bool {
    let mut data = Vec::with_capacity(16);
    append_u32(&mut data, size);
    append_u32(&mut data, packets);
    append_u32(&mut data, max_packet);
    append_u32(&mut data, offset);
    let opcode = if compressed { FLASH_DEFL_BEGIN } else { FLASH_BEGIN };
    transport.ok(opcode, &data, 0)
}

fn flash_data_one_block(
    transport: &mut Transport,
    sequence: u32,
    block: &mut Vec<u8>,
    block_size: u32,
    compressed: bool,
) -> bool {
    if !compressed && (block.len() as u32) < block_size {
        block.resize(block_size as usize, 0xFF);
    }

    let checksum = esp_checksum(block) as u32;
    let mut data = Vec::with_capacity(16 + block.len());
    append_u32(&mut data, block.len() as u32);
    append_u32(&mut data, sequence);
    append_u32(&mut data, 0);
    append_u32(&mut data, 0);
    data.extend_from_slice(block);

    let opcode = if compressed { FLASH_DEFL_DATA } else { FLASH_DATA };
    let reply = transport.send(opcode, &data, checksum, WRITE_TIMEOUT);
    reply.valid && reply.command == opcode && reply.data.first() == Some(&0)
}

/// Uploads one macro-block's worth of flash data, splitting it into
/// `FLASH_WRITE_SIZE` frames.
fn flash_data(
    transport: &mut Transport,
    target: &dyn TargetDescriptor,
    offset: u32,
    data: &[u8],
    compress_it: bool,
) -> bool {
    let max_packet = target.flash_write_size();
    let upload = if compress_it { compress(data) } else { data.to_vec() };

    let packets = (upload.len() as f64 / max_packet as f64).ceil() as u32;
    if !flash_begin(transport, data.len() as u32, packets, max_packet, offset, compress_it) {
        return false;
    }

    let mut sequence = 0u32;
    for chunk in upload.chunks(max_packet as usize) {
        let mut block = chunk.to_vec();
        if !flash_data_one_block(transport, sequence, &mut block, max_packet, compress_it) {
            return false;
        }
        sequence += 1;
    }

    // The stub only commits a block to flash after acking the next one, so a
    // trailing register read forces the last block out before we verify it.
    transport.read_reg(0x4000_1000);
    true
}

/// The macro-block size for a write/verify pass over `total_length` bytes:
/// at least two 4KiB sectors, or roughly one percent of the payload,
/// whichever is larger (§4.8 step 3).
fn macro_block_size(total_length: usize) -> usize {
    let blocks_per_percent = (total_length / 4096 / 100).max(2);
    blocks_per_percent * 4096
}

fn verify_flash_range(transport: &mut Transport, offset: u32, data: &[u8]) -> bool {
    let mut command = Vec::with_capacity(16);
    append_u32(&mut command, offset);
    append_u32(&mut command, data.len() as u32);
    append_u32(&mut command, 0);
    append_u32(&mut command, 0);

    let megabytes = (data.len() as f64 / (1024.0 * 1024.0)).ceil().max(1.0) as u64;
    let timeout = Duration::from_millis(MD5_TIMEOUT_PER_MB * megabytes);
    let reply = transport.send(0x13, &command, 0, timeout);

    if !reply.valid || reply.data.len() < 18 {
        return false;
    }

    let digest_bytes = &reply.data[..reply.data.len() - 2];
    let expected = md5(data);
    let matches = digest_bytes == expected;
    if !matches {
        debug!(
            "verify mismatch at 0x{offset:08x}: device reported {}, expected {}",
            to_hex(digest_bytes),
            to_hex(&expected),
        );
    }
    matches
}

/// Splits `data` into ~1%-of-total macro-blocks (at least two 4KiB sectors
/// each), writing and verifying each with up to three attempts, reporting
/// progress via `on_progress` (`0..=100`).
pub fn flash_upload(
    transport: &mut Transport,
    target: &dyn TargetDescriptor,
    memory_offset: u32,
    mut data: Vec<u8>,
    compressed: bool,
    mut on_progress: impl FnMut(u32),
) -> Result<()> {
    if data.is_empty() {
        return Ok(());
    }

    let padding = (4 - data.len() % 4) % 4;
    data.resize(data.len() + padding, 0xFF);

    let total_length = data.len();
    let block_size = macro_block_size(total_length);

    let mut offset = memory_offset as usize;
    let base = memory_offset as usize;
    while offset < base + total_length {
        let data_left = total_length - (offset - base);
        let current_block_size = data_left.min(block_size);
        let block = &data[(offset - base)..(offset - base + current_block_size)];

        let mut succeeded = false;
        for _ in 0..WRITE_ATTEMPTS {
            if flash_data(transport, target, offset as u32, block, compressed)
                && verify_flash_range(transport, offset as u32, block)
            {
                succeeded = true;
                break;
            }
        }

        if !succeeded {
            return Err(Error::FlashWriteExhausted {
                offset: offset as u32,
                end: (offset + current_block_size) as u32,
            });
        }

        on_progress(((offset + current_block_size - base) * 100 / total_length) as u32);
        offset += block_size;
    }

    Ok(())
}

/// Verifies previously-written flash content without rewriting it, using the
/// same macro-block/retry structure as [`flash_upload`].
pub fn verify_flash(
    transport: &mut Transport,
    memory_offset: u32,
    data: &[u8],
    mut on_progress: impl FnMut(u32),
) -> Result<()> {
    if data.is_empty() {
        return Ok(());
    }

    let total_length = data.len();
    let block_size = macro_block_size(total_length);

    let mut offset = memory_offset as usize;
    let base = memory_offset as usize;
    while offset < base + total_length {
        let data_left = total_length - (offset - base);
        let current_block_size = data_left.min(block_size);
        let block = &data[(offset - base)..(offset - base + current_block_size)];

        let mut succeeded = false;
        for _ in 0..WRITE_ATTEMPTS {
            if verify_flash_range(transport, offset as u32, block) {
                succeeded = true;
                break;
            }
        }

        if !succeeded {
            return Err(Error::Md5Mismatch(offset as u32));
        }

        on_progress(((offset + current_block_size - base) * 100 / total_length) as u32);
        offset += block_size;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::DeflateDecoder;
    use std::io::Read as _;

    #[test]
    fn compress_round_trips() {
        let source = b"the quick brown fox jumps over the lazy dog".repeat(16);
        let compressed = compress(&source);
        assert!(compressed.len() < source.len());

        let mut decoder = DeflateDecoder::new(&compressed[..]);
        let mut restored = Vec::new();
        decoder.read_to_end(&mut restored).unwrap();
        assert_eq!(restored, source);
    }

    #[test]
    fn macro_block_size_floors_at_two_sectors() {
        assert_eq!(macro_block_size(0), 2 * 4096);
        assert_eq!(macro_block_size(8192), 2 * 4096);
        assert_eq!(macro_block_size(100 * 4096), 2 * 4096);
        assert_eq!(macro_block_size(1000 * 4096), 10 * 4096);
    }

    #[test]
    fn uncompressed_block_padding_is_exact_write_size() {
        let mut block = vec![0x11, 0x22, 0x33];
        block.resize(4096, 0xFF);
        assert_eq!(block.len(), 4096);
        assert!(block[3..].iter().all(|&b| b == 0xFF));
    }
}
