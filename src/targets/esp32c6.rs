//! ESP32-C6 descriptor, grounded in `targets/esp32c6.cpp`.

use super::{RegisterPort, TargetDescriptor};

const EFUSE_BASE: u32 = 0x600B_0800;
const EFUSE_BLOCK1_ADDR: u32 = EFUSE_BASE + 0x044;

fn pkg_version(port: &mut dyn RegisterPort) -> u32 {
    (port.read_reg(EFUSE_BLOCK1_ADDR + 4 * 3) >> 24) & 0x07
}

fn minor_chip_version(port: &mut dyn RegisterPort) -> u32 {
    (port.read_reg(EFUSE_BLOCK1_ADDR + 4 * 3) >> 18) & 0x0F
}

fn major_chip_version(port: &mut dyn RegisterPort) -> u32 {
    (port.read_reg(EFUSE_BLOCK1_ADDR + 4 * 3) >> 22) & 0x03
}

pub struct Esp32C6;

impl TargetDescriptor for Esp32C6 {
    fn chip_name(&self) -> &'static str {
        "ESP32-C6"
    }

    fn chip_targets(&self) -> &'static [&'static str] {
        &["ESP32-C6", "ESP32-C6FH4"]
    }

    fn chip_detect_magic_value(&self) -> u32 {
        0x2CE0_806F
    }

    fn stub_entry(&self) -> u32 {
        0x4080_0400
    }

    fn stub_text(&self) -> Vec<u8> {
        Vec::new()
    }

    fn stub_text_start(&self) -> u32 {
        0x4080_0000
    }

    fn stub_data(&self) -> Vec<u8> {
        Vec::new()
    }

    fn stub_data_start(&self) -> u32 {
        0x4086_0000
    }

    fn spi_reg_base(&self) -> u32 {
        0x6000_3000
    }

    fn spi_usr_reg(&self) -> u32 {
        self.spi_reg_base() + 0x18
    }

    fn spi_usr1_reg(&self) -> u32 {
        self.spi_reg_base() + 0x1C
    }

    fn spi_usr2_reg(&self) -> u32 {
        self.spi_reg_base() + 0x20
    }

    fn spi_w0_reg(&self) -> u32 {
        self.spi_reg_base() + 0x58
    }

    fn spi_mosi_dlen_offs(&self) -> bool {
        false
    }

    fn spi_mosi_dlen_reg(&self) -> u32 {
        self.spi_reg_base() + 0x24
    }

    fn spi_miso_dlen_reg(&self) -> u32 {
        self.spi_reg_base() + 0x28
    }

    fn efuse_rd_reg_base(&self) -> u32 {
        EFUSE_BASE
    }

    fn chip_description(&self, port: &mut dyn RegisterPort) -> String {
        let chip_name = match pkg_version(port) {
            0 => "ESP32-C6 (QFN40)",
            1 => "ESP32-C6FH4 (QFN32)",
            _ => "unknown ESP32-C6",
        };
        let major_rev = major_chip_version(port);
        let minor_rev = minor_chip_version(port);
        format!("{} (revision v{}.{})", chip_name, major_rev, minor_rev)
    }

    fn chip_features(&self, _port: &mut dyn RegisterPort) -> String {
        "WiFi 6, BT 5, IEEE802.15.4".to_string()
    }

    fn crystal_freq_mhz(&self, _port: &mut dyn RegisterPort, _baud: u32) -> u32 {
        // ESP32-C6's XTAL is fixed to 40MHz.
        40
    }
}
