//! The target registry: one [`TargetDescriptor`] implementation per chip
//! family, grounded in `targets/esp_base.h`'s `EspBase` abstract interface.
//!
//! The original's descriptors took an untyped `void* esp_tool` back-pointer
//! to read registers/efuses while decoding chip identity. Rust has no
//! untyped pointer escape hatch that stays safe, so decoders here take a
//! `&mut dyn RegisterPort` capability instead — a minimal trait implemented
//! by [`crate::session::Session`] giving just the register/efuse access a
//! descriptor needs, without the descriptor owning or cloning the session.

use std::sync::Arc;

pub mod esp32;
pub mod esp32c2;
pub mod esp32c3;
pub mod esp32c6;
pub mod esp32h2;
pub mod esp32s2;
pub mod esp32s3;
pub mod esp8266;

/// Read-only register access, enough for efuse decoding.
pub trait ReadPort {
    fn read_reg(&mut self, address: u32) -> u32;
}

/// Extends [`ReadPort`] with register writes, needed by SPI user-command
/// programming (flash-size detection) during chip identification.
pub trait RegisterPort: ReadPort {
    fn write_reg(&mut self, address: u32, value: u32) -> bool;
}

/// One ROM-bootloader chip family: its detect magic, RAM-stub blobs, SPI/efuse
/// register map, and the efuse-decoding logic for description/features/xtal.
pub trait TargetDescriptor: Send + Sync {
    fn chip_name(&self) -> &'static str;
    fn chip_targets(&self) -> &'static [&'static str];

    /// The value the `CHIP_DETECT_MAGIC_REG_ADDR` (`0x40001000`) register
    /// reads back as on this family.
    fn chip_detect_magic_value(&self) -> u32;

    fn chip_compare_magic_value(&self, value: u32) -> bool {
        value == self.chip_detect_magic_value()
    }

    /// Entry point address for the uploaded RAM stub.
    fn stub_entry(&self) -> u32;
    /// Base64-decoded `.text` section of the RAM stub.
    fn stub_text(&self) -> Vec<u8>;
    fn stub_text_start(&self) -> u32;
    /// Base64-decoded `.data` section of the RAM stub.
    fn stub_data(&self) -> Vec<u8>;
    fn stub_data_start(&self) -> u32;

    /// Maximum block size for RAM writes (`MEM_DATA`). Families with a
    /// native USB-OTG/UART console pair (ESP32-S2/S3) need to read which
    /// console is live to pick the right block size, hence the `port`
    /// parameter; most families ignore it.
    fn esp_ram_block(&self, _port: &mut dyn RegisterPort) -> u32 {
        0x1800
    }
    fn flash_sector_size(&self) -> u32 {
        0x1000
    }
    fn flash_write_size(&self) -> u32 {
        0x4000
    }

    fn spi_reg_base(&self) -> u32;
    fn spi_cmd_reg(&self) -> u32 {
        self.spi_reg_base()
    }
    fn spi_addr_reg(&self) -> u32 {
        self.spi_reg_base() + 0x04
    }
    fn spi_usr_reg(&self) -> u32;
    fn spi_usr1_reg(&self) -> u32;
    fn spi_usr2_reg(&self) -> u32;
    fn spi_w0_reg(&self) -> u32;
    fn spi_mosi_dlen_offs(&self) -> bool;
    fn spi_mosi_dlen_reg(&self) -> u32;
    fn spi_miso_dlen_reg(&self) -> u32;

    fn efuse_rd_reg_base(&self) -> u32;

    fn chip_description(&self, port: &mut dyn RegisterPort) -> String;
    fn chip_features(&self, port: &mut dyn RegisterPort) -> String;
    fn crystal_freq_mhz(&self, port: &mut dyn RegisterPort, baud: u32) -> u32;
}

/// Reads efuse word `n` through the descriptor's own efuse base address.
pub fn read_efuse(target: &dyn TargetDescriptor, port: &mut dyn RegisterPort, n: u32) -> u32 {
    port.read_reg(target.efuse_rd_reg_base() + 4 * n)
}

/// Builds the registry in the same order the original tool registers its
/// families, so probing order (and therefore which magic value wins ties,
/// if any ever existed) matches.
pub fn registry() -> Vec<Arc<dyn TargetDescriptor>> {
    vec![
        Arc::new(esp8266::Esp8266),
        Arc::new(esp32::Esp32),
        Arc::new(esp32s2::Esp32S2),
        Arc::new(esp32s3::Esp32S3),
        Arc::new(esp32c2::Esp32C2),
        Arc::new(esp32c3::Esp32C3),
        Arc::new(esp32c6::Esp32C6),
        Arc::new(esp32h2::Esp32H2),
    ]
}

/// Crystal frequency estimate shared by every family whose UART clock
/// divider directly encodes `xtal * divider_factor == baud * uart_div`,
/// grounded in `esp32.cpp`'s `get_crystal_freq`.
pub(crate) fn estimate_xtal_freq(uart_div: u32, baud: u32, divider_factor: u32) -> u32 {
    let est = (baud as f64 * uart_div as f64) / 1e6 / divider_factor as f64;
    if est > 33.0 {
        40
    } else {
        26
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_registered_magic_resolves_to_exactly_one_family() {
        let registry = registry();
        for candidate in &registry {
            let magic = candidate.chip_detect_magic_value();
            let matches: Vec<_> = registry
                .iter()
                .filter(|d| d.chip_compare_magic_value(magic))
                .collect();
            assert_eq!(
                matches.len(),
                1,
                "magic 0x{magic:08x} for {} matched {} families",
                candidate.chip_name(),
                matches.len()
            );
        }
    }

    #[test]
    fn unknown_magic_matches_nothing() {
        let registry = registry();
        assert!(!registry.iter().any(|d| d.chip_compare_magic_value(0xDEAD_BEEF)));
    }

    #[test]
    fn xtal_estimate_picks_40_above_33mhz_else_26() {
        // uart_div chosen so baud*uart_div/1e6 straddles the 33MHz threshold.
        assert_eq!(estimate_xtal_freq(350, 115_200, 1), 40);
        assert_eq!(estimate_xtal_freq(225, 115_200, 1), 26);
    }
}
