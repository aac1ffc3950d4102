//! Arbitrary SPI flash "user command" register programming, grounded in
//! `esp_spi.cpp`'s `runSpiFlashCommand` and `esptoolqt.cpp`'s
//! `flashSizeIdToBytes`/`getFlashSize`.

use bitflags::bitflags;

use crate::targets::{RegisterPort, TargetDescriptor};

bitflags! {
    /// `SPI_USR_REG` control bits.
    struct UsrFlags: u32 {
        const COMMAND = 1 << 31;
        const ADDR    = 1 << 30;
        const DUMMY   = 1 << 29;
        const MISO    = 1 << 28;
        const MOSI    = 1 << 27;
    }
}

const SPI_CMD_USR: u32 = 1 << 18;
const SPI_USR2_COMMAND_LEN_SHIFT: u32 = 28;
const SPI_USR_ADDR_LEN_SHIFT: u32 = 26;
const SPI_MOSI_BITLEN_S: u32 = 17;
const SPI_MISO_BITLEN_S: u32 = 8;

const SPIFLASH_RDID: u32 = 0x9F;

/// Issues one SPI flash "user command" transaction (JEDEC RDID, status
/// register reads, etc.) directly through the SPI controller's registers,
/// and returns the bits the device shifted back on MISO.
pub fn run_spi_flash_command(
    target: &dyn TargetDescriptor,
    port: &mut dyn RegisterPort,
    command: u32,
    mut data: Vec<u8>,
    read_bits: u32,
    addr: u32,
    addr_len: u32,
    dummy_len: u32,
) -> u32 {
    let old_spi_usr = port.read_reg(target.spi_usr_reg());
    let old_spi_usr2 = port.read_reg(target.spi_usr2_reg());

    let data_bits = (data.len() * 8) as u32;
    let mosi_bits = data_bits;
    let miso_bits = read_bits;

    if target.spi_mosi_dlen_offs() {
        if mosi_bits > 0 {
            port.write_reg(target.spi_mosi_dlen_reg(), mosi_bits - 1);
        }
        if miso_bits > 0 {
            port.write_reg(target.spi_miso_dlen_reg(), miso_bits - 1);
        }
        let mut length_flags = 0u32;
        if dummy_len > 0 {
            length_flags |= dummy_len - 1;
        }
        if addr_len > 0 {
            length_flags |= (addr_len - 1) << SPI_USR_ADDR_LEN_SHIFT;
        }
        if length_flags != 0 && !port.write_reg(target.spi_usr1_reg(), length_flags) {
            return 0;
        }
    } else {
        let mosi_mask = mosi_bits.saturating_sub(1);
        let miso_mask = miso_bits.saturating_sub(1);
        let mut length_flags = (miso_mask << SPI_MISO_BITLEN_S) | (mosi_mask << SPI_MOSI_BITLEN_S);
        if dummy_len > 0 {
            length_flags |= dummy_len - 1;
        }
        if addr_len > 0 {
            length_flags |= (addr_len - 1) << SPI_USR_ADDR_LEN_SHIFT;
        }
        if !port.write_reg(target.spi_usr1_reg(), length_flags) {
            return 0;
        }
    }

    let mut flags = UsrFlags::COMMAND;
    if read_bits > 0 {
        flags |= UsrFlags::MISO;
    }
    if data_bits > 0 {
        flags |= UsrFlags::MOSI;
    }
    if addr_len > 0 {
        flags |= UsrFlags::ADDR;
    }
    if dummy_len > 0 {
        flags |= UsrFlags::DUMMY;
    }
    port.write_reg(target.spi_usr_reg(), flags.bits());
    port.write_reg(target.spi_usr2_reg(), (7 << SPI_USR2_COMMAND_LEN_SHIFT) | command);

    if addr != 0 && addr_len != 0 {
        port.write_reg(target.spi_addr_reg(), addr);
    }

    if data_bits == 0 {
        port.write_reg(target.spi_w0_reg(), 0);
    } else {
        let padding_required = (4 - data.len() % 4) % 4;
        data.resize(data.len() + padding_required, 0x00);
        let mut next_reg = target.spi_w0_reg();
        for word in data.chunks(4) {
            let x = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
            port.write_reg(next_reg, x);
            next_reg += 4;
        }
    }

    port.write_reg(target.spi_cmd_reg(), SPI_CMD_USR);

    let mut done = false;
    for _ in 0..10 {
        if port.read_reg(target.spi_cmd_reg()) & SPI_CMD_USR == 0 {
            done = true;
            break;
        }
    }
    if !done {
        return 0;
    }

    let status = port.read_reg(target.spi_w0_reg());

    port.write_reg(target.spi_usr_reg(), old_spi_usr);
    port.write_reg(target.spi_usr2_reg(), old_spi_usr2);

    status
}

/// Maps a JEDEC RDID size-id byte to a flash size in bytes. The `0x3A` entry
/// is `64 * 1024 * 1024` (64MB) — the original carried a transcription typo
/// (`1042` instead of `1024`) that this implementation does not reproduce.
pub fn flash_size_id_to_bytes(size_id: u8) -> u32 {
    match size_id {
        0x12 | 0x32 => 256 * 1024,
        0x13 | 0x33 => 512 * 1024,
        0x14 | 0x34 => 1 * 1024 * 1024,
        0x15 | 0x35 => 2 * 1024 * 1024,
        0x16 | 0x36 => 4 * 1024 * 1024,
        0x17 | 0x37 => 8 * 1024 * 1024,
        0x18 | 0x38 => 16 * 1024 * 1024,
        0x19 | 0x39 => 32 * 1024 * 1024,
        0x1A | 0x20 | 0x3A => 64 * 1024 * 1024,
        0x1B | 0x21 => 128 * 1024 * 1024,
        0x1C | 0x22 => 256 * 1024 * 1024,
        _ => 0,
    }
}

/// Reads the flash chip's JEDEC ID and resolves it to a capacity in bytes.
pub fn get_flash_size(target: &dyn TargetDescriptor, port: &mut dyn RegisterPort) -> u32 {
    let flash_id = run_spi_flash_command(target, port, SPIFLASH_RDID, Vec::new(), 24, 0, 0, 0);
    let size_id = (flash_id >> 16) as u8;
    flash_size_id_to_bytes(size_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrected_0x3a_entry() {
        assert_eq!(flash_size_id_to_bytes(0x3A), 64 * 1024 * 1024);
    }

    #[test]
    fn unknown_id_is_zero() {
        assert_eq!(flash_size_id_to_bytes(0xFF), 0);
    }
}
