//! RAM-stub upload: `MEM_BEGIN`/`MEM_DATA`/`MEM_END` plus the `OHAI`
//! handshake, grounded in `esp_serial.cpp`'s `stubUpload`/`mem_begin`/
//! `mem_data`/`mem_end`.

use std::time::Duration;

use crate::slip::esp_checksum;
use crate::targets::TargetDescriptor;
use crate::transport::{Transport, MEM_BEGIN, MEM_DATA, MEM_END};

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);
const OHAI: [u8; 4] = [0x4F, 0x48, 0x41, 0x49];

fn append_u32(data: &mut Vec<u8>, value: u32) {
    data.extend_from_slice(&value.to_le_bytes());
}

fn mem_begin(transport: &mut Transport, size: u32, offset: u32, max_packet: u32) -> bool {
    let packets = (size as f64 / max_packet as f64).ceil() as u32;
    let mut data = Vec::with_capacity(16);
    append_u32(&mut data, size);
    append_u32(&mut data, packets);
    append_u32(&mut data, max_packet);
    append_u32(&mut data, offset);
    transport.ok(MEM_BEGIN, &data, 0)
}

fn mem_data_one_block(transport: &mut Transport, sequence: u32, block: &[u8]) -> bool {
    let checksum = esp_checksum(block) as u32;
    let mut data = Vec::with_capacity(16 + block.len());
    append_u32(&mut data, block.len() as u32);
    append_u32(&mut data, sequence);
    append_u32(&mut data, 0);
    append_u32(&mut data, 0);
    data.extend_from_slice(block);
    transport.ok(MEM_DATA, &data, checksum)
}

fn mem_data(transport: &mut Transport, data: &[u8], max_packet: u32) -> bool {
    let max_packet = max_packet as usize;
    let mut sequence = 0u32;
    for chunk in data.chunks(max_packet) {
        if !mem_data_one_block(transport, sequence, chunk) {
            return false;
        }
        sequence += 1;
    }
    true
}

fn mem_end(transport: &mut Transport, entry_address: u32) -> bool {
    let mut data = Vec::with_capacity(8);
    append_u32(&mut data, 0);
    append_u32(&mut data, entry_address);
    if !transport.ok(MEM_END, &data, 0) {
        return false;
    }
    transport.read_one_frame(DEFAULT_TIMEOUT) == OHAI
}

/// Uploads the target's RAM stub (text then data segment) and jumps to its
/// entry point, confirmed by the stub's out-of-band `OHAI` greeting.
pub fn upload_stub(transport: &mut Transport, target: &dyn TargetDescriptor) -> bool {
    let max_packet = target.esp_ram_block(transport);

    let text = target.stub_text();
    if !mem_begin(transport, text.len() as u32, target.stub_text_start(), max_packet) {
        return false;
    }
    if !mem_data(transport, &text, max_packet) {
        return false;
    }

    let data = target.stub_data();
    if !mem_begin(transport, data.len() as u32, target.stub_data_start(), max_packet) {
        return false;
    }
    if !mem_data(transport, &data, max_packet) {
        return false;
    }

    mem_end(transport, target.stub_entry())
}
