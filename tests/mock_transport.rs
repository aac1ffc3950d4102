//! Integration test for the stub-loader, rebaud and flash pipelines against
//! an in-process mock [`SerialChannel`], standing in for real hardware
//! (SPEC_FULL §8, "Ambient test tooling" / §10 "Test tooling").
//!
//! `Session::auto_connect` itself opens a named OS serial device by path and
//! is not exercised here; everything downstream of a resolved `Transport` —
//! stub upload, rebaud, and both flash pipelines — is.

use std::collections::VecDeque;
use std::time::Duration;

use esp_flash_core::digest::md5;
use esp_flash_core::serial::SerialChannel;
use esp_flash_core::targets::{ReadPort, RegisterPort, TargetDescriptor};
use esp_flash_core::transport::{self, Transport};
use esp_flash_core::{flash, rebaud, stub};

/// A scripted serial channel: `read_one_frame` pops pre-seeded "decoded
/// frame" byte strings in order; outbound writes are discarded, matching the
/// mock's only job of driving the reply side of the protocol.
struct MockChannel {
    replies: VecDeque<Vec<u8>>,
}

impl MockChannel {
    fn new(replies: Vec<Vec<u8>>) -> Self {
        Self { replies: replies.into() }
    }
}

impl SerialChannel for MockChannel {
    fn write_all(&mut self, _data: &[u8], _timeout: Duration) -> std::io::Result<()> {
        Ok(())
    }

    fn read_for(&mut self, _timeout: Duration) -> Vec<u8> {
        Vec::new()
    }

    fn read_one_frame(&mut self, _timeout: Duration) -> Vec<u8> {
        self.replies.pop_front().unwrap_or_default()
    }

    fn set_baud(&mut self, _baud: u32) -> std::io::Result<()> {
        Ok(())
    }

    fn set_dtr(&mut self, _asserted: bool) -> std::io::Result<()> {
        Ok(())
    }

    fn set_rts(&mut self, _asserted: bool) -> std::io::Result<()> {
        Ok(())
    }
}

/// Builds one command-reply frame exactly as [`crate::slip::parse_reply`]
/// expects to decode it: an 8-byte header followed by `data`.
fn reply_frame(opcode: u8, value: u32, data: &[u8]) -> Vec<u8> {
    let mut out = vec![0x01, opcode];
    out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    out.extend_from_slice(&value.to_le_bytes());
    out.extend_from_slice(data);
    out
}

fn ok_frame(opcode: u8) -> Vec<u8> {
    reply_frame(opcode, 0, &[0])
}

/// Minimal descriptor exercising only the fields the stub/rebaud/flash
/// pipelines actually touch.
struct FakeTarget;

impl TargetDescriptor for FakeTarget {
    fn chip_name(&self) -> &'static str {
        "FakeChip"
    }

    fn chip_targets(&self) -> &'static [&'static str] {
        &["FakeChip"]
    }

    fn chip_detect_magic_value(&self) -> u32 {
        0x1234_5678
    }

    fn stub_entry(&self) -> u32 {
        0x4000_1000
    }

    fn stub_text(&self) -> Vec<u8> {
        vec![1, 2, 3, 4, 5, 6, 7, 8]
    }

    fn stub_text_start(&self) -> u32 {
        0x4010_0000
    }

    fn stub_data(&self) -> Vec<u8> {
        vec![9, 10, 11]
    }

    fn stub_data_start(&self) -> u32 {
        0x3FF8_0000
    }

    fn esp_ram_block(&self, _port: &mut dyn RegisterPort) -> u32 {
        4
    }

    fn spi_reg_base(&self) -> u32 {
        0x6000_3000
    }

    fn spi_usr_reg(&self) -> u32 {
        0x6000_3018
    }

    fn spi_usr1_reg(&self) -> u32 {
        0x6000_301C
    }

    fn spi_usr2_reg(&self) -> u32 {
        0x6000_3020
    }

    fn spi_w0_reg(&self) -> u32 {
        0x6000_3024
    }

    fn spi_mosi_dlen_offs(&self) -> bool {
        true
    }

    fn spi_mosi_dlen_reg(&self) -> u32 {
        0x6000_3028
    }

    fn spi_miso_dlen_reg(&self) -> u32 {
        0x6000_302C
    }

    fn efuse_rd_reg_base(&self) -> u32 {
        0x6000_5000
    }

    fn chip_description(&self, _port: &mut dyn RegisterPort) -> String {
        "FakeChip (revision v0.0)".to_string()
    }

    fn chip_features(&self, _port: &mut dyn RegisterPort) -> String {
        "None".to_string()
    }

    fn crystal_freq_mhz(&self, _port: &mut dyn RegisterPort, _baud: u32) -> u32 {
        40
    }
}

#[test]
fn stub_upload_succeeds_on_ohai_greeting() {
    let target = FakeTarget;

    // text: 8 bytes / ram_block 4 => 2 MEM_DATA packets.
    // data: 3 bytes / ram_block 4 => 1 MEM_DATA packet.
    let replies = vec![
        ok_frame(transport::MEM_BEGIN),
        ok_frame(transport::MEM_DATA),
        ok_frame(transport::MEM_DATA),
        ok_frame(transport::MEM_BEGIN),
        ok_frame(transport::MEM_DATA),
        ok_frame(transport::MEM_END),
        b"OHAI".to_vec(),
    ];
    let mut transport = Transport::new(MockChannel::new(replies));

    assert!(stub::upload_stub(&mut transport, &target));
}

#[test]
fn stub_upload_fails_without_ohai() {
    let target = FakeTarget;
    let replies = vec![
        ok_frame(transport::MEM_BEGIN),
        ok_frame(transport::MEM_DATA),
        ok_frame(transport::MEM_DATA),
        ok_frame(transport::MEM_BEGIN),
        ok_frame(transport::MEM_DATA),
        ok_frame(transport::MEM_END),
        b"NOPE".to_vec(),
    ];
    let mut transport = Transport::new(MockChannel::new(replies));

    assert!(!stub::upload_stub(&mut transport, &target));
}

#[test]
fn rebaud_confirms_via_matching_magic() {
    let target = FakeTarget;
    let replies = vec![
        ok_frame(transport::CHANGE_BAUD),
        reply_frame(transport::READ_REG, target.chip_detect_magic_value(), &[]),
    ];
    let mut transport = Transport::new(MockChannel::new(replies));

    assert!(rebaud::rebaud(&mut transport, &target, 115_200, 460_800));
}

#[test]
fn rebaud_fails_on_mismatched_magic() {
    let target = FakeTarget;
    let replies = vec![
        ok_frame(transport::CHANGE_BAUD),
        reply_frame(transport::READ_REG, 0xDEAD_BEEF, &[]),
    ];
    let mut transport = Transport::new(MockChannel::new(replies));

    assert!(!rebaud::rebaud(&mut transport, &target, 115_200, 460_800));
}

#[test]
fn flash_upload_commits_single_macro_block() {
    let target = FakeTarget;
    let data = vec![0x42u8; 8192];
    let digest = md5(&data);

    let replies = vec![
        ok_frame(transport::FLASH_BEGIN),
        ok_frame(transport::FLASH_DATA),
        reply_frame(transport::READ_REG, 0, &[]), // post-write fence read_reg
        {
            let mut v = digest.to_vec();
            v.extend_from_slice(&[0, 0]);
            reply_frame(transport::SPI_FLASH_MD5, 0, &v)
        },
    ];
    let mut transport = Transport::new(MockChannel::new(replies));

    let mut last_progress = 0;
    flash::flash_upload(&mut transport, &target, 0x10_0000, data, false, |pct| last_progress = pct)
        .expect("flash_upload should commit the single macro-block");
    assert_eq!(last_progress, 100);
}

#[test]
fn flash_upload_exhausts_retries_on_persistent_mismatch() {
    let target = FakeTarget;
    let data = vec![0x7Eu8; 8192];

    let mut replies = Vec::new();
    for _ in 0..3 {
        replies.push(ok_frame(transport::FLASH_BEGIN));
        replies.push(ok_frame(transport::FLASH_DATA));
        replies.push(reply_frame(transport::READ_REG, 0, &[]));
        let mut bad_digest = vec![0u8; 16];
        bad_digest.extend_from_slice(&[0, 0]);
        replies.push(reply_frame(transport::SPI_FLASH_MD5, 0, &bad_digest));
    }
    let mut transport = Transport::new(MockChannel::new(replies));

    let result = flash::flash_upload(&mut transport, &target, 0x10_0000, data, false, |_| {});
    assert!(result.is_err());
}

#[test]
fn read_flash_validates_md5_trailer() {
    let target = FakeTarget;
    let sector = vec![0xABu8; target.flash_sector_size() as usize];
    let trailer = md5(&sector).to_vec();

    let replies = vec![
        ok_frame(transport::READ_FLASH),
        sector.clone(),
        trailer,
    ];
    let mut transport = Transport::new(MockChannel::new(replies));

    let result = flash::read_flash(&mut transport, &target, 0x10_0000, sector.len() as u32, |_| {});
    assert_eq!(result, Some(sector));
}

#[test]
fn read_flash_rejects_bad_trailer() {
    let target = FakeTarget;
    let sector = vec![0xABu8; target.flash_sector_size() as usize];

    let replies = vec![
        ok_frame(transport::READ_FLASH),
        sector.clone(),
        vec![0u8; 16],
    ];
    let mut transport = Transport::new(MockChannel::new(replies));

    let result = flash::read_flash(&mut transport, &target, 0x10_0000, sector.len() as u32, |_| {});
    assert_eq!(result, None);
}
